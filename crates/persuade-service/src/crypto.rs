//! HMAC signature helpers for webhook verification.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute an HMAC-SHA256 signature over `payload` and return it hex-encoded.
#[must_use]
pub fn hmac_sha256_hex(secret: &str, payload: &[u8]) -> String {
    // HMAC accepts keys of any length (RFC 2104), so new_from_slice cannot fail.
    #[allow(clippy::expect_used)]
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time equality check for signature strings.
///
/// Short-circuits only on length mismatch; the comparison itself does not
/// leak where the first differing byte is.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_deterministic() {
        let a = hmac_sha256_hex("secret", b"payload");
        let b = hmac_sha256_hex("secret", b"payload");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn signature_varies_with_key_and_payload() {
        let base = hmac_sha256_hex("secret", b"payload");
        assert_ne!(base, hmac_sha256_hex("other", b"payload"));
        assert_ne!(base, hmac_sha256_hex("secret", b"other"));
    }

    #[test]
    fn constant_time_eq_matches() {
        assert!(constant_time_eq("abc123", "abc123"));
        assert!(!constant_time_eq("abc123", "abc124"));
        assert!(!constant_time_eq("abc123", "abc12"));
        assert!(constant_time_eq("", ""));
    }
}
