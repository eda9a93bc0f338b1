//! Kartapay payment provider client.
//!
//! Implements the OAuth2 client-credentials flow, payment creation for
//! checkout, and webhook signature verification.

use anyhow::{anyhow, Result};
use hmac::{Hmac, Mac};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::config::KartapayConfig;

/// Header carrying the webhook HMAC signature.
pub const WEBHOOK_SIGNATURE_HEADER: &str = "X-Kartapay-Signature";

#[derive(Clone)]
pub struct KartapayClient {
    client: Client,
    config: KartapayConfig,
}

/// OAuth2 token endpoint response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: u64,
}

/// Request to create a payment.
#[derive(Debug, Serialize)]
pub struct CreatePaymentRequest {
    pub merchant_id: String,
    pub amount: i64,
    pub currency: String,
    pub description: String,
    /// Correlates the provider callback to our subscription row.
    pub reference: Uuid,
    pub success_url: String,
    pub cancel_url: String,
    pub webhook_url: String,
}

/// Response from payment creation. The provider has used both `checkout_url`
/// and `payment_url` for the redirect target across API revisions.
#[derive(Debug, Deserialize)]
pub struct PaymentCreated {
    pub transaction_id: Option<String>,
    pub checkout_url: Option<String>,
    pub payment_url: Option<String>,
}

impl PaymentCreated {
    pub fn redirect_url(&self) -> Option<&str> {
        self.checkout_url.as_deref().or(self.payment_url.as_deref())
    }
}

impl KartapayClient {
    pub fn new(config: KartapayConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Check if Kartapay credentials are set.
    pub fn is_configured(&self) -> bool {
        !self.config.client_id.is_empty()
            && !self.config.client_secret.expose_secret().is_empty()
            && !self.config.merchant_id.is_empty()
    }

    pub fn merchant_id(&self) -> &str {
        &self.config.merchant_id
    }

    /// Obtain an OAuth2 access token via client credentials.
    async fn fetch_token(&self) -> Result<String> {
        if !self.is_configured() {
            return Err(anyhow!("Kartapay credentials not configured"));
        }

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.expose_secret()),
        ];

        let response = self
            .client
            .post(&self.config.auth_url)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(status = %status, body = %body, "Kartapay token request failed");
            return Err(anyhow!("Failed to get Kartapay token: {}", body));
        }

        let token: TokenResponse = serde_json::from_str(&body)?;
        Ok(token.access_token)
    }

    /// Create a payment and return the redirect target plus transaction id.
    pub async fn create_payment(&self, request: &CreatePaymentRequest) -> Result<PaymentCreated> {
        let access_token = self.fetch_token().await?;

        let url = format!("{}/payments", self.config.api_base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&access_token)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(status = %status, body = %body, "Kartapay create_payment response");

        if status.is_success() {
            let payment: PaymentCreated = serde_json::from_str(&body)?;
            tracing::info!(
                reference = %request.reference,
                transaction_id = ?payment.transaction_id,
                "Kartapay payment created"
            );
            Ok(payment)
        } else {
            tracing::error!(status = %status, body = %body, "Kartapay payment creation failed");
            Err(anyhow!("Payment creation failed: {}", body))
        }
    }

    /// Whether webhook calls must carry a valid signature.
    pub fn requires_webhook_signature(&self) -> bool {
        self.config.webhook_secret.is_some()
    }

    /// Verify a webhook signature.
    ///
    /// The signature is computed as `HMAC-SHA256(request_body, webhook_secret)`
    /// and transmitted hex-encoded.
    pub fn verify_webhook_signature(&self, body: &str, signature: &str) -> Result<bool> {
        let Some(secret) = self.config.webhook_secret.as_ref() else {
            // No secret configured: correlation-only trust, nothing to check.
            return Ok(true);
        };

        let expected_signature = compute_signature(body, secret.expose_secret())?;
        let is_valid = expected_signature == signature;

        if !is_valid {
            tracing::warn!("Webhook signature verification failed");
        }

        Ok(is_valid)
    }

    pub fn frontend_base_url(&self) -> &str {
        &self.config.frontend_base_url
    }

    pub fn webhook_base_url(&self) -> &str {
        &self.config.webhook_base_url
    }
}

/// Compute a hex-encoded HMAC-SHA256 signature.
fn compute_signature(payload: &str, secret: &str) -> Result<String> {
    type HmacSha256 = Hmac<Sha256>;
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| anyhow!("Invalid key length"))?;
    mac.update(payload.as_bytes());
    let result = mac.finalize();
    Ok(hex::encode(result.into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;

    fn test_config(webhook_secret: Option<&str>) -> KartapayConfig {
        KartapayConfig {
            client_id: "kp_test_123".to_string(),
            client_secret: Secret::new("test_secret".to_string()),
            merchant_id: "merchant_1".to_string(),
            auth_url: "https://auth.kartapay.test/token".to_string(),
            api_base_url: "https://api.kartapay.test/v1".to_string(),
            webhook_secret: webhook_secret.map(|s| Secret::new(s.to_string())),
            frontend_base_url: "https://shop.example".to_string(),
            webhook_base_url: "https://entitlement.example".to_string(),
        }
    }

    #[test]
    fn is_configured_requires_all_credentials() {
        let client = KartapayClient::new(test_config(None));
        assert!(client.is_configured());

        let mut config = test_config(None);
        config.client_id.clear();
        let client = KartapayClient::new(config);
        assert!(!client.is_configured());
    }

    #[test]
    fn webhook_signature_round_trips() {
        let client = KartapayClient::new(test_config(Some("webhook_secret")));
        assert!(client.requires_webhook_signature());

        let body = r#"{"reference":"abc","status":"paid"}"#;
        let signature = compute_signature(body, "webhook_secret").unwrap();

        assert!(client.verify_webhook_signature(body, &signature).unwrap());
        assert!(!client.verify_webhook_signature(body, "deadbeef").unwrap());
        assert!(!client
            .verify_webhook_signature(r#"{"tampered":true}"#, &signature)
            .unwrap());
    }

    #[test]
    fn missing_secret_skips_verification() {
        let client = KartapayClient::new(test_config(None));
        assert!(!client.requires_webhook_signature());
        assert!(client.verify_webhook_signature("anything", "x").unwrap());
    }
}
