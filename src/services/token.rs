//! Token helpers
//!
//! Two kinds of tokens, neither stored in plaintext:
//!
//! - Unsubscribe tokens: deterministic HMAC-SHA256 over the normalized
//!   subscriber email, keyed by the configured secret. Nothing is stored;
//!   verification recomputes the MAC and compares in constant time.
//! - Password-reset tokens: 32 random bytes, handed to the user once via
//!   email. Only the SHA-256 of the token is persisted, so a database leak
//!   does not expose usable reset links.

use anyhow::{Context, Result};
use data_encoding::{BASE64URL_NOPAD, HEXLOWER};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Number of random bytes in a password-reset token
const RESET_TOKEN_BYTES: usize = 32;

/// Mint an unsubscribe token for a normalized email address
pub fn mint_unsubscribe_token(secret: &str, email: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(email.as_bytes());
    BASE64URL_NOPAD.encode(&mac.finalize().into_bytes())
}

/// Verify an unsubscribe token against a normalized email address.
///
/// Comparison happens inside the MAC verification, which is constant time.
/// A token that fails to decode is simply invalid.
pub fn verify_unsubscribe_token(secret: &str, email: &str, token: &str) -> bool {
    let Ok(presented) = BASE64URL_NOPAD.decode(token.as_bytes()) else {
        return false;
    };

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(email.as_bytes());
    mac.verify_slice(&presented).is_ok()
}

/// Generate a password-reset token.
///
/// Returns `(token, token_hash)`: the token goes into the reset email, the
/// hash into the user row.
pub fn generate_reset_token() -> Result<(String, String)> {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    getrandom::fill(&mut bytes).context("Failed to gather randomness for reset token")?;

    let token = BASE64URL_NOPAD.encode(&bytes);
    let hash = hash_reset_token(&token);
    Ok((token, hash))
}

/// SHA-256 of a reset token, hex-encoded, as stored in the database
pub fn hash_reset_token(token: &str) -> String {
    HEXLOWER.encode(&Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsubscribe_token_roundtrip() {
        let token = mint_unsubscribe_token("secret", "reader@example.com");
        assert!(verify_unsubscribe_token("secret", "reader@example.com", &token));
    }

    #[test]
    fn unsubscribe_token_is_deterministic() {
        let a = mint_unsubscribe_token("secret", "reader@example.com");
        let b = mint_unsubscribe_token("secret", "reader@example.com");
        assert_eq!(a, b);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let token = mint_unsubscribe_token("secret", "reader@example.com");

        let mut tampered = token.clone();
        let flipped = if tampered.ends_with('A') { 'B' } else { 'A' };
        tampered.pop();
        tampered.push(flipped);

        assert!(!verify_unsubscribe_token("secret", "reader@example.com", &tampered));
        assert!(!verify_unsubscribe_token("secret", "other@example.com", &token));
        assert!(!verify_unsubscribe_token("other-secret", "reader@example.com", &token));
        assert!(!verify_unsubscribe_token("secret", "reader@example.com", "not base64!!"));
    }

    #[test]
    fn reset_token_hash_matches_stored_hash() {
        let (token, hash) = generate_reset_token().unwrap();
        assert_eq!(hash_reset_token(&token), hash);
        assert_eq!(hash.len(), 64);
    }

    #[test]
    fn reset_tokens_are_unique() {
        let (a, _) = generate_reset_token().unwrap();
        let (b, _) = generate_reset_token().unwrap();
        assert_ne!(a, b);
    }
}
