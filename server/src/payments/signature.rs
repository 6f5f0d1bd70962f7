//! Webhook body authentication and payload digests.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::errors::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Checks an `X-Signature` header (lowercase hex HMAC-SHA256 of the raw
/// body) against the shared secret. Comparison is constant-time via the
/// `hmac` crate's verify.
pub fn verify_hmac_sha256(secret: &str, payload: &[u8], signature_hex: Option<&str>) -> Result<()> {
  let signature_hex = signature_hex.ok_or_else(|| AppError::Auth("Missing webhook signature".to_string()))?;
  let signature =
    hex::decode(signature_hex.trim()).map_err(|_| AppError::Auth("Malformed webhook signature".to_string()))?;

  let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
    .map_err(|e| AppError::Internal(format!("HMAC key setup failed: {}", e)))?;
  mac.update(payload);
  mac
    .verify_slice(&signature)
    .map_err(|_| AppError::Auth("Invalid webhook signature".to_string()))
}

/// Lowercase hex SHA-256 of a payload, used as the audit dedup key.
pub fn sha256_hex(payload: &[u8]) -> String {
  let mut hasher = Sha256::new();
  hasher.update(payload);
  hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sign(secret: &str, payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
  }

  #[test]
  fn accepts_a_valid_signature() {
    let body = br#"{"status":"SUCCESSFUL"}"#;
    let sig = sign("topsecret", body);
    assert!(verify_hmac_sha256("topsecret", body, Some(&sig)).is_ok());
  }

  #[test]
  fn rejects_missing_tampered_and_malformed_signatures() {
    let body = br#"{"status":"SUCCESSFUL"}"#;
    let sig = sign("topsecret", body);

    assert!(matches!(verify_hmac_sha256("topsecret", body, None), Err(AppError::Auth(_))));
    assert!(matches!(
      verify_hmac_sha256("topsecret", br#"{"status":"FAILED"}"#, Some(&sig)),
      Err(AppError::Auth(_))
    ));
    assert!(matches!(
      verify_hmac_sha256("othersecret", body, Some(&sig)),
      Err(AppError::Auth(_))
    ));
    assert!(matches!(
      verify_hmac_sha256("topsecret", body, Some("zz-not-hex")),
      Err(AppError::Auth(_))
    ));
  }

  #[test]
  fn digest_is_stable_lowercase_hex() {
    let a = sha256_hex(b"payload");
    let b = sha256_hex(b"payload");
    assert_eq!(a, b);
    assert_eq!(a.len(), 64);
    assert_eq!(a, a.to_lowercase());
    assert_ne!(a, sha256_hex(b"payload2"));
  }
}
