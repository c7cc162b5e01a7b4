use base64::{engine::general_purpose, Engine as _};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

/// The size of a session token in bytes.
const SESSION_TOKEN_SIZE: usize = 32;

/// Generates a new random session token.
///
/// # Returns
///
/// A URL-safe base64-encoded token.
pub fn generate_session_token() -> String {
    let mut token = [0u8; SESSION_TOKEN_SIZE];
    OsRng.fill_bytes(&mut token);

    general_purpose::URL_SAFE_NO_PAD.encode(token)
}

/// Returns the storage key for `token`, or `None` if it is not a token this
/// service could have issued.
pub fn session_key(token: &str) -> Option<String> {
    let raw = general_purpose::URL_SAFE_NO_PAD.decode(token).ok()?;
    if raw.len() != SESSION_TOKEN_SIZE {
        return None;
    }

    Some(hex::encode(Sha256::digest(&raw)))
}
