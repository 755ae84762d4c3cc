//! Stripe webhook signature verification.
//!
//! HMAC-SHA256 over `"{t}.{payload}"`, compared in constant time, with a
//! timestamp window against replay.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::{StripeEvent, WebhookError};

/// Maximum allowed age for webhook events (5 minutes).
const MAX_EVENT_AGE_SECS: i64 = 300;

/// Maximum allowed clock skew for future events (1 minute).
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Parsed components from the Stripe-Signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Unix timestamp when the signature was generated.
    pub timestamp: i64,
    /// All `v1` signatures; Stripe sends several while a secret is rolled.
    pub v1_signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    /// Parses `t=<timestamp>,v1=<signature>[,v1=…][,v0=<legacy>]`.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::ParseError` if the header format is invalid.
    pub fn parse(header: &str) -> Result<Self, WebhookError> {
        let mut timestamp: Option<i64> = None;
        let mut v1_signatures = Vec::new();

        for part in header.split(',') {
            let (key, value) = part
                .trim()
                .split_once('=')
                .ok_or_else(|| WebhookError::ParseError("invalid header format".to_string()))?;

            match key {
                "t" => {
                    timestamp = Some(value.parse().map_err(|_| {
                        WebhookError::ParseError("invalid timestamp".to_string())
                    })?);
                }
                "v1" => {
                    v1_signatures.push(hex::decode(value).map_err(|_| {
                        WebhookError::ParseError("invalid v1 signature hex".to_string())
                    })?);
                }
                // v0 is Stripe's test-mode legacy scheme; never trusted.
                _ => {}
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| WebhookError::ParseError("missing timestamp".to_string()))?;
        if v1_signatures.is_empty() {
            return Err(WebhookError::ParseError("missing v1 signature".to_string()));
        }

        Ok(SignatureHeader {
            timestamp,
            v1_signatures,
        })
    }
}

/// Verifier for Stripe webhook signatures.
pub struct StripeWebhookVerifier {
    /// Endpoint signing secret (`whsec_…`).
    secret: SecretString,
}

impl StripeWebhookVerifier {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Verifies the webhook signature against the current clock and parses the event.
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<StripeEvent, WebhookError> {
        self.verify_and_parse_at(payload, signature_header, chrono::Utc::now().timestamp())
    }

    /// Verifies the webhook signature as of `now` (Unix seconds) and parses the event.
    ///
    /// # Errors
    ///
    /// - `InvalidSignature` - no `v1` signature matches
    /// - `TimestampOutOfRange` - event is older than 5 minutes
    /// - `InvalidTimestamp` - event timestamp is in the future
    /// - `ParseError` - malformed header or JSON payload
    pub fn verify_and_parse_at(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: i64,
    ) -> Result<StripeEvent, WebhookError> {
        let header = SignatureHeader::parse(signature_header)?;

        validate_timestamp(header.timestamp, now)?;

        let expected = self.compute_signature(header.timestamp, payload);
        let matched = header
            .v1_signatures
            .iter()
            .any(|candidate| constant_time_compare(&expected, candidate));
        if !matched {
            return Err(WebhookError::InvalidSignature);
        }

        serde_json::from_slice(payload).map_err(|e| WebhookError::ParseError(e.to_string()))
    }

    /// Produces the hex `v1` signature Stripe would send for this payload.
    pub fn sign(&self, timestamp: i64, payload: &[u8]) -> String {
        hex::encode(self.compute_signature(timestamp, payload))
    }

    fn compute_signature(&self, timestamp: i64, payload: &[u8]) -> Vec<u8> {
        // HMAC accepts keys of any length, so construction cannot fail.
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.expose_secret().as_bytes())
            .expect("HMAC accepts any key");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}

fn validate_timestamp(timestamp: i64, now: i64) -> Result<(), WebhookError> {
    let age = now
        .checked_sub(timestamp)
        .ok_or(WebhookError::InvalidTimestamp)?;

    if age > MAX_EVENT_AGE_SECS {
        return Err(WebhookError::TimestampOutOfRange);
    }
    if age < -MAX_CLOCK_SKEW_SECS {
        return Err(WebhookError::InvalidTimestamp);
    }
    Ok(())
}

fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "whsec_test_secret_12345";
    const NOW: i64 = 1_704_067_200;
    const PAYLOAD: &str = r#"{"id":"evt_test123","type":"checkout.session.completed","created":1704067200,"data":{"object":{}}}"#;

    fn verifier(secret: &str) -> StripeWebhookVerifier {
        StripeWebhookVerifier::new(SecretString::new(secret.to_string()))
    }

    fn signed_header(secret: &str, timestamp: i64, payload: &str) -> String {
        let sig = verifier(secret).sign(timestamp, payload.as_bytes());
        format!("t={},v1={}", timestamp, sig)
    }

    // ══════════════════════════════════════════════════════════════
    // SignatureHeader Parsing Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn parse_header_collects_every_v1() {
        let header = format!(
            "t=1234567890,v1={},v1={},v0={}",
            "a".repeat(64),
            "b".repeat(64),
            "c".repeat(64)
        );
        let parsed = SignatureHeader::parse(&header).unwrap();

        assert_eq!(parsed.timestamp, 1234567890);
        assert_eq!(parsed.v1_signatures.len(), 2);
        assert_eq!(parsed.v1_signatures[0].len(), 32);
    }

    #[test]
    fn parse_header_missing_parts_fails() {
        assert!(matches!(
            SignatureHeader::parse(&format!("v1={}", "a".repeat(64))),
            Err(WebhookError::ParseError(_))
        ));
        assert!(matches!(
            SignatureHeader::parse("t=1234567890"),
            Err(WebhookError::ParseError(_))
        ));
        assert!(matches!(
            SignatureHeader::parse("t1234567890"),
            Err(WebhookError::ParseError(_))
        ));
    }

    #[test]
    fn parse_header_rejects_bad_hex() {
        assert!(matches!(
            SignatureHeader::parse("t=1234567890,v1=not_valid_hex"),
            Err(WebhookError::ParseError(_))
        ));
    }

    // ══════════════════════════════════════════════════════════════
    // Signature Verification Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn valid_signature_parses_event() {
        let header = signed_header(TEST_SECRET, NOW, PAYLOAD);
        let event = verifier(TEST_SECRET)
            .verify_and_parse_at(PAYLOAD.as_bytes(), &header, NOW)
            .unwrap();
        assert_eq!(event.id, "evt_test123");
    }

    #[test]
    fn wrong_secret_fails() {
        let header = signed_header("whsec_other", NOW, PAYLOAD);
        let result = verifier(TEST_SECRET).verify_and_parse_at(PAYLOAD.as_bytes(), &header, NOW);
        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[test]
    fn tampered_payload_fails() {
        let header = signed_header(TEST_SECRET, NOW, PAYLOAD);
        let tampered = PAYLOAD.replace("evt_test123", "evt_hacked");
        let result = verifier(TEST_SECRET).verify_and_parse_at(tampered.as_bytes(), &header, NOW);
        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[test]
    fn any_matching_v1_is_accepted_during_secret_rotation() {
        let good = verifier(TEST_SECRET).sign(NOW, PAYLOAD.as_bytes());
        let header = format!("t={},v1={},v1={}", NOW, "0".repeat(64), good);
        assert!(verifier(TEST_SECRET)
            .verify_and_parse_at(PAYLOAD.as_bytes(), &header, NOW)
            .is_ok());
    }

    #[test]
    fn signature_is_checked_before_json() {
        let header = format!("t={},v1={}", NOW, "a".repeat(64));
        let result = verifier(TEST_SECRET).verify_and_parse_at(b"not json", &header, NOW);
        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[test]
    fn signed_garbage_is_a_parse_error() {
        let header = signed_header(TEST_SECRET, NOW, "not json");
        let result = verifier(TEST_SECRET).verify_and_parse_at(b"not json", &header, NOW);
        assert!(matches!(result, Err(WebhookError::ParseError(_))));
    }

    // ══════════════════════════════════════════════════════════════
    // Timestamp Validation Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn timestamp_at_five_minute_boundary_succeeds() {
        assert!(validate_timestamp(NOW - 300, NOW).is_ok());
    }

    #[test]
    fn timestamp_just_past_boundary_fails() {
        assert!(matches!(
            validate_timestamp(NOW - 301, NOW),
            Err(WebhookError::TimestampOutOfRange)
        ));
    }

    #[test]
    fn future_timestamp_within_skew_succeeds() {
        assert!(validate_timestamp(NOW + 30, NOW).is_ok());
    }

    #[test]
    fn future_timestamp_beyond_skew_fails() {
        assert!(matches!(
            validate_timestamp(NOW + 120, NOW),
            Err(WebhookError::InvalidTimestamp)
        ));
    }

    #[test]
    fn extreme_timestamp_is_rejected_without_overflow() {
        let result =
            verifier(TEST_SECRET).verify_and_parse_at(b"{}", "t=-9223372036854775808,v1=00", NOW);
        assert!(matches!(result, Err(WebhookError::InvalidTimestamp)));
        assert!(matches!(
            validate_timestamp(i64::MIN, i64::MAX),
            Err(WebhookError::InvalidTimestamp)
        ));
    }

    #[test]
    fn stale_but_correctly_signed_event_is_rejected() {
        let header = signed_header(TEST_SECRET, NOW - 3600, PAYLOAD);
        let result = verifier(TEST_SECRET).verify_and_parse_at(PAYLOAD.as_bytes(), &header, NOW);
        assert!(matches!(result, Err(WebhookError::TimestampOutOfRange)));
    }
}
