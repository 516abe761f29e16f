use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Compare a presented token with the configured one by SHA-256 digest, so
/// the work done never depends on where the inputs differ.
pub fn token_matches(presented: &str, expected: &str) -> bool {
    let a = Sha256::digest(presented.as_bytes());
    let b = Sha256::digest(expected.as_bytes());
    a.as_slice().ct_eq(b.as_slice()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_tokens() {
        assert!(token_matches("secret", "secret"));
    }

    #[test]
    fn different_tokens() {
        assert!(!token_matches("secret", "secreT"));
        assert!(!token_matches("secret", "secret "));
        assert!(!token_matches("", "secret"));
    }

    #[test]
    fn length_mismatch_does_not_match() {
        assert!(!token_matches("sec", "secret"));
        assert!(!token_matches(&"secret".repeat(64), "secret"));
    }
}
