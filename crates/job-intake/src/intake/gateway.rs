use async_trait::async_trait;
use ring::hmac;
use serde::Deserialize;
use serde_json::json;

use super::domain::PaymentProof;
use crate::config::PaymentConfig;

/// Fixed application fee. Set by policy; no request field can change it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplicationFee {
    pub amount_minor_units: u64,
    pub currency: &'static str,
}

/// 50 INR, expressed in paise.
pub const APPLICATION_FEE: ApplicationFee = ApplicationFee {
    amount_minor_units: 5000,
    currency: "INR",
};

/// Gateway-side order as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayOrder {
    pub order_id: String,
    pub amount: u64,
    pub currency: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("payment gateway credentials are not configured")]
    MissingCredentials,
    #[error("payment gateway unreachable: {0}")]
    Transport(String),
    #[error("payment gateway rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("payment gateway returned an unexpected response: {0}")]
    MalformedResponse(String),
    #[error("payment signature does not match")]
    SignatureMismatch,
}

/// Boundary to the external payment provider. Implementations must not
/// retry; the intake workflow treats every `verify` error as a decline.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Public key identifier the checkout widget needs.
    fn key_id(&self) -> &str;

    async fn create_order(
        &self,
        amount_minor_units: u64,
        currency: &str,
    ) -> Result<GatewayOrder, GatewayError>;

    async fn verify(&self, proof: &PaymentProof) -> Result<(), GatewayError>;
}

/// Signature the provider attaches to a completed checkout:
/// hex(HMAC-SHA256(secret, "{order_id}|{payment_id}")).
pub fn payment_signature(key_secret: &str, order_id: &str, payment_id: &str) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, key_secret.as_bytes());
    let tag = hmac::sign(&key, signature_payload(order_id, payment_id).as_bytes());
    hex::encode(tag.as_ref())
}

fn signature_payload(order_id: &str, payment_id: &str) -> String {
    format!("{order_id}|{payment_id}")
}

/// Razorpay REST adapter.
pub struct RazorpayGateway {
    client: reqwest::Client,
    api_base: String,
    key_id: String,
    key_secret: String,
}

#[derive(Debug, Deserialize)]
struct RazorpayOrder {
    id: String,
    amount: u64,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct RazorpayErrorEnvelope {
    error: RazorpayErrorBody,
}

#[derive(Debug, Deserialize)]
struct RazorpayErrorBody {
    #[serde(default)]
    description: String,
}

impl RazorpayGateway {
    pub fn new(config: &PaymentConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: &PaymentConfig) -> Self {
        Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
        }
    }

    fn has_credentials(&self) -> bool {
        !self.key_id.is_empty() && !self.key_secret.is_empty()
    }
}

impl std::fmt::Debug for RazorpayGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayGateway")
            .field("api_base", &self.api_base)
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    fn key_id(&self) -> &str {
        &self.key_id
    }

    async fn create_order(
        &self,
        amount_minor_units: u64,
        currency: &str,
    ) -> Result<GatewayOrder, GatewayError> {
        if !self.has_credentials() {
            return Err(GatewayError::MissingCredentials);
        }

        let response = self
            .client
            .post(format!("{}/v1/orders", self.api_base))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&json!({
                "amount": amount_minor_units,
                "currency": currency,
                "payment_capture": 1,
            }))
            .send()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<RazorpayErrorEnvelope>(&body)
                .map(|envelope| envelope.error.description)
                .unwrap_or(body);
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let order: RazorpayOrder = serde_json::from_str(&body)
            .map_err(|err| GatewayError::MalformedResponse(err.to_string()))?;

        Ok(GatewayOrder {
            order_id: order.id,
            amount: order.amount,
            currency: order.currency,
        })
    }

    async fn verify(&self, proof: &PaymentProof) -> Result<(), GatewayError> {
        if self.key_secret.is_empty() {
            return Err(GatewayError::MissingCredentials);
        }

        let tag = hex::decode(proof.signature.trim()).map_err(|_| GatewayError::SignatureMismatch)?;
        let key = hmac::Key::new(hmac::HMAC_SHA256, self.key_secret.as_bytes());
        hmac::verify(
            &key,
            signature_payload(&proof.order_id, &proof.payment_id).as_bytes(),
            &tag,
        )
        .map_err(|_| GatewayError::SignatureMismatch)
    }
}
