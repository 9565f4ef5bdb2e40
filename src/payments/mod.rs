//! Stripe integration: PaymentIntent creation over the REST API and
//! webhook signature verification.

use std::time::Duration;

use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use uuid::Uuid;

use crate::config;

const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";

/// Signed webhook timestamps older than this are rejected.
const WEBHOOK_TOLERANCE_SECS: i64 = 300;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, thiserror::Error)]
pub enum StripeError {
    #[error("Stripe configuration missing: {0}")]
    MissingConfig(&'static str),

    #[error("Stripe request failed: {0}")]
    Request(String),

    #[error("Stripe response was invalid: {0}")]
    InvalidResponse(String),

    #[error("Stripe API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid webhook signature: {0}")]
    InvalidSignature(String),
}

/// A PaymentIntent as returned by the Stripe API (subset of fields we use).
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub status: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StripeClient {
    api_base_url: String,
    secret_key: String,
    http: Client,
}

impl StripeClient {
    /// Build a client from the application config. Fails when the secret
    /// key is not configured, matching the 500 the order endpoints return.
    pub fn from_config() -> Result<Self, StripeError> {
        let secret_key = config::config().stripe.secret_key.clone();
        if secret_key.is_empty() {
            return Err(StripeError::MissingConfig("STRIPE_SECRET_KEY"));
        }

        let api_base_url = std::env::var("STRIPE_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());

        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| StripeError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_base_url,
            secret_key,
            http,
        })
    }

    /// Create a PaymentIntent for an order. Amount is in minor units (cents).
    pub async fn create_payment_intent(
        &self,
        amount_cents: i64,
        currency: &str,
        order_id: i64,
        user_id: i64,
        description: &str,
    ) -> Result<PaymentIntent, StripeError> {
        let url = format!("{}/v1/payment_intents", self.api_base_url);

        let amount = amount_cents.to_string();
        let order_id = order_id.to_string();
        let user_id = user_id.to_string();
        let params: Vec<(&str, &str)> = vec![
            ("amount", amount.as_str()),
            ("currency", currency),
            ("description", description),
            ("metadata[order_id]", order_id.as_str()),
            ("metadata[user_id]", user_id.as_str()),
            ("automatic_payment_methods[enabled]", "true"),
        ];

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.secret_key, None::<&str>)
            .header("Idempotency-Key", Uuid::new_v4().to_string())
            .form(&params)
            .send()
            .await
            .map_err(|e| StripeError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<StripeErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(StripeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<PaymentIntent>()
            .await
            .map_err(|e| StripeError::InvalidResponse(e.to_string()))
    }
}

/// Verify a Stripe webhook signature header against the raw request body.
///
/// The header has the form `t=<unix>,v1=<hex>[,v1=<hex>...]`; the signed
/// payload is `"{t}.{body}"` and the expected MAC is HMAC-SHA256 keyed with
/// the endpoint secret. Verification is constant-time via the `hmac` crate.
pub fn verify_webhook_signature(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
    now_unix: i64,
) -> Result<(), StripeError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<Vec<u8>> = Vec::new();

    for part in sig_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => {
                timestamp = v.parse().ok();
            }
            Some(("v1", v)) => {
                if let Some(bytes) = decode_hex(v) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| StripeError::InvalidSignature("missing timestamp".into()))?;
    if signatures.is_empty() {
        return Err(StripeError::InvalidSignature("missing v1 signature".into()));
    }

    if (now_unix - timestamp).abs() > WEBHOOK_TOLERANCE_SECS {
        return Err(StripeError::InvalidSignature(
            "timestamp outside tolerance".into(),
        ));
    }

    for candidate in &signatures {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| StripeError::InvalidSignature("bad signing secret".into()))?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        if mac.verify_slice(candidate).is_ok() {
            return Ok(());
        }
    }

    Err(StripeError::InvalidSignature("no matching signature".into()))
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    // Byte-offset slicing below requires ASCII input.
    if !s.is_ascii() || s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{}.", timestamp).as_bytes());
        mac.update(payload);
        let digest = mac.finalize().into_bytes();
        let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        format!("t={},v1={}", timestamp, hex)
    }

    #[test]
    fn accepts_valid_signature() {
        let payload = br#"{"type":"payment_intent.succeeded"}"#;
        let header = sign(payload, "whsec_test", 1_700_000_000);
        assert!(verify_webhook_signature(payload, &header, "whsec_test", 1_700_000_000).is_ok());
    }

    #[test]
    fn rejects_wrong_secret() {
        let payload = b"{}";
        let header = sign(payload, "whsec_test", 1_700_000_000);
        assert!(verify_webhook_signature(payload, &header, "whsec_other", 1_700_000_000).is_err());
    }

    #[test]
    fn rejects_tampered_payload() {
        let header = sign(b"{}", "whsec_test", 1_700_000_000);
        assert!(
            verify_webhook_signature(b"{tampered}", &header, "whsec_test", 1_700_000_000).is_err()
        );
    }

    #[test]
    fn rejects_stale_timestamp() {
        let payload = b"{}";
        let header = sign(payload, "whsec_test", 1_700_000_000);
        let now = 1_700_000_000 + WEBHOOK_TOLERANCE_SECS + 1;
        assert!(verify_webhook_signature(payload, &header, "whsec_test", now).is_err());
    }

    #[test]
    fn rejects_malformed_header() {
        assert!(verify_webhook_signature(b"{}", "v1=abcd", "whsec_test", 0).is_err());
        assert!(verify_webhook_signature(b"{}", "t=100", "whsec_test", 100).is_err());
        assert!(verify_webhook_signature(b"{}", "", "whsec_test", 0).is_err());
    }

    #[test]
    fn hex_decoding() {
        assert_eq!(decode_hex("00ff"), Some(vec![0x00, 0xff]));
        assert_eq!(decode_hex("0f1"), None);
        assert_eq!(decode_hex("zz"), None);
    }

    #[test]
    fn non_ascii_signature_values_are_rejected() {
        // Multibyte characters land on non-boundary byte offsets.
        assert_eq!(decode_hex("aéa"), None);
        assert_eq!(decode_hex("ффff"), None);
        assert!(verify_webhook_signature(b"{}", "t=100,v1=aéa", "whsec_test", 100).is_err());
        assert!(verify_webhook_signature(b"{}", "t=100,v1=ффff", "whsec_test", 100).is_err());
    }
}
