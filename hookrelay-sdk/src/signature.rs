//! Signature algorithm and verification for Hookrelay deliveries.
//!
//! Every delivery body is signed with HMAC-SHA256 keyed by the subscription
//! secret. The wire format for the header is:
//!
//! ```text
//! X-Signature: sha256={hex_signature}
//! ```
//!
//! The MAC covers the exact body bytes that were sent. Receivers must verify
//! against the raw request body, never a re-serialization of the parsed JSON.

use crate::objects::envelope::WebhookEnvelope;

/// Header carrying the HMAC signature.
pub const SIGNATURE_HEADER: &str = "X-Signature";

/// Header carrying the envelope id.
pub const WEBHOOK_ID_HEADER: &str = "X-Webhook-ID";

/// Header carrying the event type.
pub const EVENT_TYPE_HEADER: &str = "X-Event-Type";

/// Header carrying the envelope timestamp (RFC 3339).
pub const TIMESTAMP_HEADER: &str = "X-Timestamp";

/// Prefix of the signature header value.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Management API: identity of the calling owner, set by the gateway.
pub const OWNER_ID_HEADER: &str = "Hookrelay-Owner-Id";

/// Management API: plaintext admin secret for the producer endpoints.
pub const ADMIN_AUTH_HEADER: &str = "Hookrelay-Admin-Authorization";

/// Errors produced by signature operations.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("invalid signature header format")]
    InvalidFormat,
    #[error("invalid hex encoding")]
    InvalidHex,
    #[error("invalid signature")]
    SignatureMismatch,
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ring::error::Unspecified> for SignatureError {
    fn from(_: ring::error::Unspecified) -> Self {
        Self::SignatureMismatch
    }
}

// ---------------------------------------------------------------------------
// Signing
// ---------------------------------------------------------------------------

/// Compute `hex(HMAC-SHA256(secret, body))`.
pub fn sign_body(body: &[u8], secret: &[u8]) -> String {
    let tag = ring::hmac::sign(
        &ring::hmac::Key::new(ring::hmac::HMAC_SHA256, secret),
        body,
    );
    hex::encode(tag.as_ref())
}

/// Format the full `X-Signature` header value (`sha256={hex}`).
pub fn format_signature_header(signature_hex: &str) -> String {
    format!("{SIGNATURE_PREFIX}{signature_hex}")
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Parse an `X-Signature` value into raw MAC bytes.
///
/// The `sha256=` prefix is optional so bare hex digests are accepted too.
pub fn parse_signature_header(value: &str) -> Result<Vec<u8>, SignatureError> {
    let digest = value
        .trim()
        .strip_prefix(SIGNATURE_PREFIX)
        .unwrap_or_else(|| value.trim());
    if digest.is_empty() {
        return Err(SignatureError::InvalidFormat);
    }
    hex::decode(digest).map_err(|_| SignatureError::InvalidHex)
}

/// Recompute the MAC over `raw_body` and compare it with `provided` in
/// constant time.
pub fn verify_signature(raw_body: &[u8], provided: &str, secret: &[u8]) -> bool {
    let Ok(expected) = parse_signature_header(provided) else {
        return false;
    };
    ring::hmac::verify(
        &ring::hmac::Key::new(ring::hmac::HMAC_SHA256, secret),
        raw_body,
        &expected,
    )
    .is_ok()
}

/// Verify an incoming delivery and deserialize its envelope.
///
/// * `signature_header` – value of the `X-Signature` request header.
/// * `raw_body` – request body exactly as received.
/// * `secret` – the subscription's signing secret.
pub fn verify_webhook(
    signature_header: &str,
    raw_body: &[u8],
    secret: &[u8],
) -> Result<WebhookEnvelope, SignatureError> {
    let expected = parse_signature_header(signature_header)?;
    ring::hmac::verify(
        &ring::hmac::Key::new(ring::hmac::HMAC_SHA256, secret),
        raw_body,
        &expected,
    )?;
    Ok(serde_json::from_slice(raw_body)?)
}
