use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::config::AppConfig;

type HmacSha256 = Hmac<Sha256>;

/// HTTP client for the payment provider's order API (Razorpay-compatible).
///
/// Orders are created server-side with basic auth; captured payments are
/// verified offline against the provider's HMAC signature, so verification
/// never needs a network round trip.
#[derive(Clone)]
pub struct PaymentGateway {
    http: reqwest::Client,
    api_base: String,
    key_id: String,
    key_secret: String,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("payment provider rejected the request ({status}): {description}")]
    Api { status: u16, description: String },
    #[error("payment provider unreachable: {0}")]
    Network(#[from] reqwest::Error),
}

/// Order as echoed back by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorBody {
    error: GatewayErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorDetail {
    #[serde(default)]
    description: String,
}

impl PaymentGateway {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: config.payment_api_base.trim_end_matches('/').to_string(),
            key_id: config.payment_key_id.clone(),
            key_secret: config.payment_key_secret.clone(),
        }
    }

    pub async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, GatewayError> {
        let url = format!("{}/v1/orders", self.api_base);
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&serde_json::json!({
                "amount": amount,
                "currency": currency,
                "receipt": receipt,
            }))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(response.json::<GatewayOrder>().await?)
        } else {
            let description = response
                .json::<GatewayErrorBody>()
                .await
                .map(|body| body.error.description)
                .unwrap_or_else(|_| "unknown provider error".to_string());
            Err(GatewayError::Api {
                status: status.as_u16(),
                description,
            })
        }
    }

    /// Signature the provider computes for a captured payment:
    /// HMAC-SHA256 over "<order_id>|<payment_id>" with the key secret, hex-encoded.
    pub fn payment_signature(&self, provider_order_id: &str, payment_id: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.key_secret.as_bytes())
            .expect("hmac accepts keys of any length");
        mac.update(provider_order_id.as_bytes());
        mac.update(b"|");
        mac.update(payment_id.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Constant-time check of a client-supplied payment signature.
    pub fn verify_payment_signature(
        &self,
        provider_order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> bool {
        let expected = self.payment_signature(provider_order_id, payment_id);
        expected.as_bytes().ct_eq(signature.as_bytes()).into()
    }
}
