use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::error::{IntakeError, Result};

/// Standard-alphabet, `=`-padded base64 of the uploaded bytes.
pub fn encode_file(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

pub fn decode_file(encoded: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(encoded.trim())
        .map_err(|e| IntakeError::BadRequest(format!("invalid base64 content: {}", e)))
}
