use std::error::Error;
use std::str::FromStr;

use sqlx::postgres::PgRow;
use sqlx::Row;

use civic_core_api::{CoreError, CoreResult};

/// A trait for converting a database row into a model.
pub trait TryFromRow<R>: Sized {
    /// Performs the conversion.
    fn try_from_row(row: &R) -> Result<Self, Box<dyn Error + Send + Sync>>;
}

/// Reads a required TEXT column and parses it through `FromStr`.
///
/// Enums persist as their lowercase wire strings, so any parse failure
/// means the row predates the value or was written out-of-band.
pub fn get_parsed<T: FromStr>(
    row: &PgRow,
    col_name: &str,
) -> Result<T, Box<dyn Error + Send + Sync>> {
    let s: String = row.try_get(col_name)?;
    T::from_str(&s).map_err(|_| format!("Invalid value '{s}' in column '{col_name}'").into())
}

/// Maps a driver error into the caller-visible taxonomy.
pub fn pg_err(err: sqlx::Error) -> CoreError {
    CoreError::Persistence(err.to_string())
}

/// Maps a row-decoding error into the caller-visible taxonomy.
pub fn row_err(err: Box<dyn Error + Send + Sync>) -> CoreError {
    CoreError::Persistence(err.to_string())
}

/// Decodes a full result set through `TryFromRow`.
pub fn map_rows<T: TryFromRow<PgRow>>(rows: &[PgRow]) -> CoreResult<Vec<T>> {
    rows.iter()
        .map(|row| T::try_from_row(row).map_err(row_err))
        .collect()
}
