//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` port against the Stripe REST API using
//! form-encoded requests authenticated with the secret key.
//!
//! ```ignore
//! let config = StripeConfig::new(api_key);
//! let adapter = StripePaymentAdapter::new(config);
//! ```

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::ports::{
    CheckoutMode, CheckoutSession, CreateCheckoutRequest, CreateCustomerRequest, Customer,
    PaymentError, PaymentErrorCode, PaymentProvider,
};
use crate::domain::webhook::METADATA_USER_ID;

const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,
}

impl StripeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }

    /// Set a custom API base URL (for testing against a stub server).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }
}

/// Stripe payment provider adapter.
pub struct StripePaymentAdapter {
    config: StripeConfig,
    http_client: reqwest::Client,
}

/// Minimal customer shape returned by `POST /v1/customers`.
#[derive(Debug, Deserialize)]
struct StripeCustomer {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

/// Minimal session shape returned by `POST /v1/checkout/sessions`.
#[derive(Debug, Deserialize)]
struct StripeCheckoutSession {
    id: String,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl StripePaymentAdapter {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T, PaymentError> {
        let url = format!("{}{}", self.config.api_base_url, path);

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(params)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(operation, error = %e, "Stripe request failed");
                PaymentError::network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = error_from_response(status.as_u16(), &body);
            tracing::error!(
                operation,
                status = status.as_u16(),
                provider_code = error.provider_code.as_deref().unwrap_or("-"),
                error = %error.message,
                "Stripe API error"
            );
            return Err(error);
        }

        response.json::<T>().await.map_err(|e| {
            PaymentError::provider(format!("Failed to parse Stripe response: {}", e))
        })
    }
}

/// Maps a non-2xx Stripe response to a `PaymentError`.
fn error_from_response(status: u16, body: &str) -> PaymentError {
    let parsed = serde_json::from_str::<StripeErrorEnvelope>(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|e| e.error.message.clone())
        .unwrap_or_else(|| format!("Stripe API error (HTTP {})", status));

    let code = match status {
        401 | 403 => PaymentErrorCode::AuthenticationError,
        404 => PaymentErrorCode::NotFound,
        429 => PaymentErrorCode::RateLimitExceeded,
        400 | 402 => PaymentErrorCode::InvalidRequest,
        s if s >= 500 => PaymentErrorCode::NetworkError,
        _ => PaymentErrorCode::ProviderError,
    };

    let mut error = PaymentError::new(code, message);
    if let Some(provider_code) = parsed.and_then(|e| e.error.code) {
        error = error.with_provider_code(provider_code);
    }
    error
}

fn customer_params(request: &CreateCustomerRequest) -> Vec<(String, String)> {
    let mut params = vec![
        ("email".to_string(), request.email.clone()),
        (
            format!("metadata[{}]", METADATA_USER_ID),
            request.user_id.as_str().to_string(),
        ),
    ];
    if let Some(name) = &request.name {
        params.push(("name".to_string(), name.clone()));
    }
    params
}

fn checkout_params(request: &CreateCheckoutRequest) -> Vec<(String, String)> {
    let mut params = vec![
        ("mode".to_string(), request.mode.as_str().to_string()),
        ("customer".to_string(), request.customer_id.clone()),
        ("payment_method_types[]".to_string(), "card".to_string()),
        ("line_items[0][price]".to_string(), request.price_id.clone()),
        ("line_items[0][quantity]".to_string(), "1".to_string()),
        ("allow_promotion_codes".to_string(), "true".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
    ];

    // Sorted so the request body is stable.
    let mut metadata: Vec<_> = request.metadata.iter().collect();
    metadata.sort();
    for (key, value) in metadata {
        params.push((format!("metadata[{}]", key), value.clone()));
    }

    if request.mode == CheckoutMode::Subscription {
        if let Some(user_id) = request.metadata.get(METADATA_USER_ID) {
            params.push((
                format!("subscription_data[metadata][{}]", METADATA_USER_ID),
                user_id.clone(),
            ));
        }
    }
    params
}

#[async_trait]
impl PaymentProvider for StripePaymentAdapter {
    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<Customer, PaymentError> {
        let params = customer_params(&request);
        let customer: StripeCustomer = self
            .post_form("create_customer", "/v1/customers", &params)
            .await?;

        tracing::info!(
            customer_id = %customer.id,
            user_id = %request.user_id.as_str(),
            "Created Stripe customer"
        );

        Ok(Customer {
            id: customer.id,
            email: customer.email.or(Some(request.email)),
        })
    }

    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let params = checkout_params(&request);
        let session: StripeCheckoutSession = self
            .post_form("create_checkout_session", "/v1/checkout/sessions", &params)
            .await?;

        let url = session
            .url
            .ok_or_else(|| PaymentError::provider("Checkout session has no URL"))?;

        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }

    async fn cancel_subscription_at_period_end(
        &self,
        stripe_subscription_id: &str,
    ) -> Result<(), PaymentError> {
        let params = vec![("cancel_at_period_end".to_string(), "true".to_string())];
        let _: serde_json::Value = self
            .post_form(
                "cancel_subscription",
                &format!("/v1/subscriptions/{}", stripe_subscription_id),
                &params,
            )
            .await?;

        tracing::info!(
            subscription_id = %stripe_subscription_id,
            "Scheduled Stripe subscription cancellation"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;
    use std::collections::HashMap;

    fn checkout_request(mode: CheckoutMode) -> CreateCheckoutRequest {
        let mut metadata = HashMap::new();
        metadata.insert(METADATA_USER_ID.to_string(), "user-1".to_string());
        metadata.insert("product_name".to_string(), "Pro".to_string());
        CreateCheckoutRequest {
            customer_id: "cus_123".to_string(),
            price_id: "price_sub_pro_monthly".to_string(),
            mode,
            success_url: "https://app.test/success".to_string(),
            cancel_url: "https://app.test/pricing".to_string(),
            metadata,
        }
    }

    fn has(params: &[(String, String)], key: &str, value: &str) -> bool {
        params.iter().any(|(k, v)| k == key && v == value)
    }

    #[test]
    fn config_defaults_to_stripe_api() {
        let config = StripeConfig::new("sk_test_123");
        assert_eq!(config.api_base_url(), "https://api.stripe.com");
    }

    #[test]
    fn config_with_base_url_strips_trailing_slash() {
        let config = StripeConfig::new("sk_test_123").with_base_url("http://localhost:12111/");
        assert_eq!(config.api_base_url(), "http://localhost:12111");
    }

    #[test]
    fn customer_params_carry_user_id_metadata() {
        let request = CreateCustomerRequest {
            user_id: UserId::new("user-1").unwrap(),
            email: "a@example.com".to_string(),
            name: None,
        };

        let params = customer_params(&request);

        assert!(has(&params, "email", "a@example.com"));
        assert!(has(&params, "metadata[user_id]", "user-1"));
        assert!(!params.iter().any(|(k, _)| k == "name"));
    }

    #[test]
    fn subscription_checkout_copies_user_id_to_subscription_metadata() {
        let params = checkout_params(&checkout_request(CheckoutMode::Subscription));

        assert!(has(&params, "mode", "subscription"));
        assert!(has(&params, "line_items[0][quantity]", "1"));
        assert!(has(&params, "allow_promotion_codes", "true"));
        assert!(has(&params, "metadata[product_name]", "Pro"));
        assert!(has(&params, "subscription_data[metadata][user_id]", "user-1"));
    }

    #[test]
    fn payment_checkout_has_no_subscription_data() {
        let params = checkout_params(&checkout_request(CheckoutMode::Payment));

        assert!(has(&params, "mode", "payment"));
        assert!(!params.iter().any(|(k, _)| k.starts_with("subscription_data")));
    }

    #[test]
    fn error_response_maps_status_and_provider_code() {
        let body = r#"{"error":{"type":"invalid_request_error","code":"resource_missing","message":"No such price: 'price_x'"}}"#;

        let err = error_from_response(400, body);

        assert_eq!(err.code, PaymentErrorCode::InvalidRequest);
        assert_eq!(err.message, "No such price: 'price_x'");
        assert_eq!(err.provider_code.as_deref(), Some("resource_missing"));
    }

    #[test]
    fn unparseable_error_body_still_maps_status() {
        assert_eq!(
            error_from_response(401, "nope").code,
            PaymentErrorCode::AuthenticationError
        );
        assert!(error_from_response(503, "").is_retryable());
        assert!(error_from_response(429, "").is_retryable());
    }
}
