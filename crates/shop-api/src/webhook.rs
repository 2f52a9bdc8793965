//! # Payment Webhook Verification
//!
//! The payment service signs each notification with HMAC-SHA256 over
//! `"{timestamp}.{body}"` and sends it as `X-Signature: t=<unix>,v1=<hex>`.
//! Several `v1` entries may be present while the secret is being rotated.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use shop_core::{PaymentStatus, ShopError, ShopResult};

pub const SIGNATURE_HEADER: &str = "x-signature";

/// Maximum age of a signed notification, in seconds
const TOLERANCE_SECS: i64 = 300;

/// Body of a payment notification
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentNotification {
    pub order_id: String,
    pub status: PaymentStatus,
}

#[derive(Debug)]
struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<String>,
}

fn parse_signature_header(header: &str) -> ShopResult<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => signatures.push(value.to_string()),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        ShopError::WebhookVerificationFailed("missing timestamp in signature".to_string())
    })?;

    if signatures.is_empty() {
        return Err(ShopError::WebhookVerificationFailed(
            "no v1 signature found".to_string(),
        ));
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

/// Check the signature and parse the notification
pub fn verify_notification(
    secret: &str,
    payload: &[u8],
    header: &str,
    now: i64,
) -> ShopResult<PaymentNotification> {
    let parsed = parse_signature_header(header)?;

    if (now - parsed.timestamp).abs() > TOLERANCE_SECS {
        return Err(ShopError::WebhookVerificationFailed(
            "signature timestamp outside tolerance".to_string(),
        ));
    }

    let expected = sign(secret, parsed.timestamp, payload)?;
    let valid = parsed
        .signatures
        .iter()
        .any(|sig| constant_time_compare(sig, &expected));

    if !valid {
        return Err(ShopError::WebhookVerificationFailed(
            "signature mismatch".to_string(),
        ));
    }

    Ok(serde_json::from_slice(payload)?)
}

/// Hex HMAC-SHA256 of `"{timestamp}.{payload}"`
pub fn sign(secret: &str, timestamp: i64, payload: &[u8]) -> ShopResult<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| ShopError::Configuration(format!("invalid webhook secret: {}", e)))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const BODY: &[u8] = br#"{"order_id":"order-1","status":"approved"}"#;

    #[test]
    fn test_parse_signature_header() {
        let parsed = parse_signature_header("t=1234567890,v1=abc123,v1=def456").unwrap();
        assert_eq!(parsed.timestamp, 1234567890);
        assert_eq!(parsed.signatures, vec!["abc123", "def456"]);

        assert!(parse_signature_header("v1=abc").is_err());
        assert!(parse_signature_header("t=1").is_err());
    }

    #[test]
    fn test_valid_notification() {
        let sig = sign(SECRET, 1_000, BODY).unwrap();
        assert_eq!(sig.len(), 64);

        let header = format!("t=1000,v1=deadbeef,v1={}", sig);
        let notification = verify_notification(SECRET, BODY, &header, 1_100).unwrap();
        assert_eq!(notification.order_id, "order-1");
        assert_eq!(notification.status, PaymentStatus::Approved);
    }

    #[test]
    fn test_rejects_tampering_and_replays() {
        let sig = sign(SECRET, 1_000, BODY).unwrap();
        let header = format!("t=1000,v1={}", sig);

        let tampered = br#"{"order_id":"order-2","status":"approved"}"#;
        assert!(matches!(
            verify_notification(SECRET, tampered, &header, 1_000),
            Err(ShopError::WebhookVerificationFailed(_))
        ));
        assert!(matches!(
            verify_notification("other-secret", BODY, &header, 1_000),
            Err(ShopError::WebhookVerificationFailed(_))
        ));
        assert!(matches!(
            verify_notification(SECRET, BODY, &header, 1_000 + TOLERANCE_SECS + 1),
            Err(ShopError::WebhookVerificationFailed(_))
        ));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc123", "abc123"));
        assert!(!constant_time_compare("abc123", "abc124"));
        assert!(!constant_time_compare("abc", "abcd"));
    }
}
