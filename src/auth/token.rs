use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::AuthError;

/// Bytes of entropy behind every generated token.
const TOKEN_BYTES: usize = 32;

/// Generate an opaque URL-safe token from the OS random source.
///
/// 32 bytes of entropy make collisions negligible, so no uniqueness retry
/// is attempted; the store's unique index is the backstop. If the OS source
/// fails the operation fails — there is no weaker fallback.
pub fn generate() -> Result<String, AuthError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(AuthError::EntropyUnavailable)?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_url_safe() {
        let token = generate().expect("generate");
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn tokens_encode_32_bytes() {
        let token = generate().expect("generate");
        // 32 bytes -> 43 base64url chars without padding.
        assert_eq!(token.len(), 43);
    }

    #[test]
    fn tokens_do_not_repeat() {
        let a = generate().expect("generate");
        let b = generate().expect("generate");
        assert_ne!(a, b);
    }
}
