//! Secret generation and hashing for invite tokens, sign-in codes and
//! activity check-in codes.
//!
//! Invite tokens and sign-in codes are never stored in clear text; the
//! database only holds an HMAC-SHA256 keyed by the session secret.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Bytes of entropy in an invite token.
pub const INVITE_TOKEN_BYTES: usize = 32;

/// Length of an activity check-in code.
pub const ACTIVITY_CODE_LEN: usize = 6;

const ACTIVITY_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Debug, thiserror::Error)]
#[error("invalid HMAC key")]
pub struct TokenError;

/// A fresh invite token: 32 random bytes, base64url without padding.
#[must_use]
pub fn generate_invite_token() -> String {
    let mut bytes = [0u8; INVITE_TOKEN_BYTES];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// A random activity code of six uppercase letters or digits.
#[must_use]
pub fn generate_activity_code() -> String {
    let mut rng = rand::rng();
    (0..ACTIVITY_CODE_LEN)
        .map(|_| {
            let idx = rng.random_range(0..ACTIVITY_CODE_ALPHABET.len());
            char::from(ACTIVITY_CODE_ALPHABET[idx])
        })
        .collect()
}

/// Returns true if `code` has the shape of an activity code.
#[must_use]
pub fn is_activity_code(code: &str) -> bool {
    code.len() == ACTIVITY_CODE_LEN
        && code
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

/// Hex HMAC-SHA256 of `value` keyed by `secret`.
///
/// # Errors
///
/// Returns `TokenError` if the key is rejected by the MAC.
pub fn hash_secret(secret: &SecretString, value: &str) -> Result<String, TokenError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.expose_secret().as_bytes()).map_err(|_| TokenError)?;
    mac.update(value.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of `value` against a stored hex HMAC.
#[must_use]
pub fn verify_secret(secret: &SecretString, value: &str, expected_hex: &str) -> bool {
    let Ok(expected) = hex::decode(expected_hex) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.expose_secret().as_bytes()) else {
        return false;
    };
    mac.update(value.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn secret() -> SecretString {
        SecretString::from("k3y-for-tests-Zq8!vN2@pL5#wR9$")
    }

    #[test]
    fn test_invite_token_shape() {
        let token = generate_invite_token();
        assert_eq!(URL_SAFE_NO_PAD.decode(&token).unwrap().len(), INVITE_TOKEN_BYTES);
        assert!(!token.contains('='));
        assert_ne!(token, generate_invite_token());
    }

    #[test]
    fn test_activity_code_shape() {
        for _ in 0..200 {
            let code = generate_activity_code();
            assert!(is_activity_code(&code), "bad code {code}");
        }
        assert!(!is_activity_code("abc123"));
        assert!(!is_activity_code("ABC12"));
    }

    #[test]
    fn test_hash_round_trip() {
        let hash = hash_secret(&secret(), "482913").unwrap();
        assert_eq!(hash.len(), 64);
        assert!(verify_secret(&secret(), "482913", &hash));
        assert!(!verify_secret(&secret(), "482914", &hash));
        assert!(!verify_secret(&SecretString::from("other"), "482913", &hash));
        assert!(!verify_secret(&secret(), "482913", "not-hex"));
    }
}
