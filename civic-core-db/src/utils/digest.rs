use serde::Serialize;

/// Hashes serializable data into a hex digest using CBOR serialization
/// and BLAKE3.
///
/// This provides a stable digest across different runs and systems by:
/// - Serializing the data to CBOR format (deterministic binary representation)
/// - Hashing the CBOR bytes with BLAKE3 and hex-encoding the result
pub fn content_digest<T: Serialize>(data: &T) -> Result<String, String> {
    let mut cbor = Vec::new();
    ciborium::ser::into_writer(data, &mut cbor)
        .map_err(|e| format!("Failed to serialize data for hashing: {e}"))?;
    Ok(blake3::hash(&cbor).to_hex().to_string())
}
