//! GitHub webhook signature verification.
//!
//! GitHub signs each delivery with HMAC-SHA256 over the raw request body and
//! sends the digest as `X-Hub-Signature-256: sha256=<hex>`.
//! Reference: https://docs.github.com/en/webhooks/using-webhooks/validating-webhook-deliveries

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_PREFIX: &str = "sha256=";

/// Verify a GitHub webhook signature.
///
/// # Arguments
///
/// * `secret` - The webhook secret configured on the GitHub hook
/// * `payload` - The raw request body, exactly as received
/// * `signature_header` - The `X-Hub-Signature-256` header value
///
/// # Returns
///
/// `true` if the header carries the expected digest, `false` otherwise.
pub fn verify_github_signature(secret: &str, payload: &[u8], signature_header: &str) -> bool {
    if secret.is_empty() || signature_header.is_empty() {
        warn!(
            has_secret = !secret.is_empty(),
            has_signature = !signature_header.is_empty(),
            "github_signature_missing_fields"
        );
        return false;
    }

    let signature = match signature_header.strip_prefix(SIGNATURE_PREFIX) {
        Some(s) => s,
        None => {
            warn!("github_signature_unsupported_scheme");
            return false;
        }
    };

    let expected_signature = match sign(secret, payload) {
        Some(s) => s,
        None => {
            warn!("github_signature_invalid_key");
            return false;
        }
    };
    let valid = constant_time_compare(&expected_signature, signature);

    if !valid {
        warn!(
            expected_length = expected_signature.len(),
            actual_length = signature.len(),
            payload_length = payload.len(),
            "github_signature_mismatch"
        );
    }

    valid
}

/// Hex HMAC-SHA256 of `payload` under `secret`.
pub fn sign(secret: &str, payload: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(payload);
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

/// Check if GitHub signature verification is enabled.
pub fn is_signature_verification_enabled(secret: &Option<String>) -> bool {
    secret
        .as_ref()
        .map(|s| !s.trim().is_empty())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &[u8] = br#"{"zen":"Keep it logically awesome.","hook_id":1}"#;

    #[test]
    fn test_verify_signature_missing_fields() {
        assert!(!verify_github_signature("", PAYLOAD, "sha256=abc"));
        assert!(!verify_github_signature("secret", PAYLOAD, ""));
    }

    #[test]
    fn test_verify_signature_wrong_scheme() {
        let digest = sign("secret", PAYLOAD).unwrap();
        assert!(!verify_github_signature(
            "secret",
            PAYLOAD,
            &format!("sha1={}", digest)
        ));
    }

    #[test]
    fn test_verify_signature_valid() {
        let header = format!("sha256={}", sign("secret", PAYLOAD).unwrap());
        assert!(verify_github_signature("secret", PAYLOAD, &header));
    }

    #[test]
    fn test_verify_signature_tampered_payload() {
        let header = format!("sha256={}", sign("secret", PAYLOAD).unwrap());
        assert!(!verify_github_signature("secret", b"{}", &header));
        assert!(!verify_github_signature("other-secret", PAYLOAD, &header));
    }

    #[test]
    fn test_sign_known_vector() {
        // Example from GitHub's documentation.
        assert_eq!(
            sign("It's a Secret to Everybody", b"Hello, World!").unwrap(),
            "757107ea0eb2509fc211221cce984b8a37570b6d7586c22c46f4379c8b043e17"
        );
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }

    #[test]
    fn test_is_signature_verification_enabled() {
        assert!(!is_signature_verification_enabled(&None));
        assert!(!is_signature_verification_enabled(&Some("".to_string())));
        assert!(!is_signature_verification_enabled(&Some("   ".to_string())));
        assert!(is_signature_verification_enabled(&Some(
            "secret".to_string()
        )));
    }
}
