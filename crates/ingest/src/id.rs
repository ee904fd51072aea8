//! Bundle identifier generation.

use rand::RngCore;
use rand::rngs::OsRng;

use crate::IdError;

/// Length of a generated id.
pub const ID_LEN: usize = 10;

const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Largest multiple of 62 that fits in a byte; bytes at or above it are
/// rejected so every symbol is equally likely.
const ACCEPT_BELOW: u8 = 248;

/// Generates a 10-character `[0-9A-Za-z]` id from the OS CSPRNG.
pub fn generate() -> Result<String, IdError> {
    let mut id = String::with_capacity(ID_LEN);
    let mut buf = [0u8; 2 * ID_LEN];

    while id.len() < ID_LEN {
        OsRng
            .try_fill_bytes(&mut buf)
            .map_err(|e| IdError::GenerationFailed(e.to_string()))?;
        for &b in buf.iter().filter(|&&b| b < ACCEPT_BELOW) {
            if id.len() == ID_LEN {
                break;
            }
            id.push(ALPHABET[usize::from(b % 62)] as char);
        }
    }
    Ok(id)
}

/// Returns true if `s` has the shape of a generated id.
pub fn is_valid_id(s: &str) -> bool {
    s.len() == ID_LEN && s.bytes().all(|b| b.is_ascii_alphanumeric())
}
