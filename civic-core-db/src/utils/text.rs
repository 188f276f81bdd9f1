use civic_core_api::CoreError;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("text contains malformed byte sequences")]
    Malformed,
}

impl From<EncodingError> for CoreError {
    fn from(err: EncodingError) -> Self {
        CoreError::Validation(err.to_string())
    }
}

/// Free text validated to be well-formed for storage.
///
/// Input that went through a lossy UTF-8 decode upstream arrives with
/// U+FFFD replacement characters; those mark malformed byte sequences.
/// `new` rejects such input, `sanitize` strips it with a logged warning.
/// Stripping is never silent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanText(String);

impl CleanText {
    /// Strict constructor: malformed input is an error.
    pub fn new(s: &str) -> Result<CleanText, EncodingError> {
        if s.contains('\u{FFFD}') {
            return Err(EncodingError::Malformed);
        }
        Ok(CleanText(s.to_string()))
    }

    /// Tolerant constructor: strips replacement characters and logs how
    /// many were dropped.
    pub fn sanitize(s: &str) -> CleanText {
        let stripped: String = s.chars().filter(|c| *c != '\u{FFFD}').collect();
        let dropped = s.chars().count() - stripped.chars().count();
        if dropped > 0 {
            warn!(dropped, "stripped malformed sequences from free text");
        }
        CleanText(stripped)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for CleanText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
