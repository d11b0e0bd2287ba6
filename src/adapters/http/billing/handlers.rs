//! HTTP handlers for billing endpoints.
//!
//! These handlers connect Axum routes to application layer command/query handlers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Json, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use super::dto::{
    CanPurchaseParams, CanPurchaseResponse, CancelSubscriptionRequest, CancelSubscriptionResponse,
    CheckoutSessionResponse, CreateCheckoutSessionRequest, CurrentUserResponse,
    ProviderSubscriptionView, SubscriptionOverviewResponse, UserPurchasesResponse,
    WebhookAckResponse,
};
use crate::adapters::http::error::ErrorResponse;
use crate::adapters::http::middleware::{OptionalAuth, RequireAuth};
use crate::application::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CheckPurchaseEligibilityHandler,
    CheckPurchaseEligibilityQuery, CheckoutUrls, CreateCheckoutSessionCommand,
    CreateCheckoutSessionHandler, GetUserPurchasesHandler, GetUserPurchasesQuery,
    HandleStripeWebhookCommand, HandleStripeWebhookHandler,
};
use crate::domain::billing::{BillingError, PlanCatalog};
use crate::domain::foundation::ErrorCode;
use crate::domain::webhook::WebhookError;
use crate::ports::{CustomerRepository, PaymentProvider, PaymentRepository, SubscriptionRepository};

/// Header carrying the provider's webhook signature.
pub const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all billing dependencies.
///
/// Cloned per request; everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct BillingAppState {
    pub payments: Arc<dyn PaymentRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub customers: Arc<dyn CustomerRepository>,
    pub payment_provider: Arc<dyn PaymentProvider>,
    pub catalog: Arc<PlanCatalog>,
    pub checkout_urls: CheckoutUrls,
    /// Holds the signing secret, so it is built once at startup.
    pub webhook_handler: Arc<HandleStripeWebhookHandler>,
}

impl BillingAppState {
    /// Create handlers on demand from the shared state.
    pub fn create_checkout_session_handler(&self) -> CreateCheckoutSessionHandler {
        CreateCheckoutSessionHandler::new(
            self.payments.clone(),
            self.subscriptions.clone(),
            self.customers.clone(),
            self.payment_provider.clone(),
            self.catalog.clone(),
            self.checkout_urls.clone(),
        )
    }

    pub fn user_purchases_handler(&self) -> GetUserPurchasesHandler {
        GetUserPurchasesHandler::new(self.payments.clone(), self.subscriptions.clone())
    }

    pub fn eligibility_handler(&self) -> CheckPurchaseEligibilityHandler {
        CheckPurchaseEligibilityHandler::new(self.payments.clone(), self.subscriptions.clone())
    }

    pub fn cancel_subscription_handler(&self) -> CancelSubscriptionHandler {
        CancelSubscriptionHandler::new(self.subscriptions.clone(), self.payment_provider.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/stripe/user-purchases - Payments and subscriptions, newest first
pub async fn get_user_purchases(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, BillingApiError> {
    let result = state
        .user_purchases_handler()
        .handle(GetUserPurchasesQuery { user_id: user.id })
        .await?;

    Ok(Json(UserPurchasesResponse::from(&result)))
}

/// GET /api/stripe/subscription - Same rows in the provider's object shape
pub async fn get_subscription_overview(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, BillingApiError> {
    let result = state
        .user_purchases_handler()
        .handle(GetUserPurchasesQuery { user_id: user.id })
        .await?;

    Ok(Json(SubscriptionOverviewResponse::from(&result)))
}

/// GET /api/stripe/can-purchase - Eligibility verdict for the pricing page
pub async fn can_purchase(
    State(state): State<BillingAppState>,
    OptionalAuth(user): OptionalAuth,
    Query(params): Query<CanPurchaseParams>,
) -> Result<impl IntoResponse, BillingApiError> {
    let plan_name = params.plan_name.trim();
    if plan_name.is_empty() {
        return Err(BillingError::validation("plan_name", "Plan name is required").into());
    }

    let query = CheckPurchaseEligibilityQuery {
        user_id: user.map(|u| u.id),
        plan_name: plan_name.to_string(),
        is_subscription: params.is_subscription,
    };
    let eligibility = state.eligibility_handler().handle(query).await;

    Ok(Json(CanPurchaseResponse::from(eligibility)))
}

/// GET /api/me - Identity of the current session
pub async fn get_current_user(RequireAuth(user): RequireAuth) -> impl IntoResponse {
    Json(CurrentUserResponse::from(user))
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/stripe/create-checkout-session - Start a hosted checkout
pub async fn create_checkout_session(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<CreateCheckoutSessionRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let cmd = CreateCheckoutSessionCommand {
        user,
        price_id: request.price_id,
        success_url: request.success_url,
        cancel_url: request.cancel_url,
    };

    let result = state.create_checkout_session_handler().handle(cmd).await?;

    Ok(Json(CheckoutSessionResponse::from(result)))
}

/// POST /api/stripe/cancel-subscription - Cancel at the end of the paid period
pub async fn cancel_subscription(
    State(state): State<BillingAppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<CancelSubscriptionRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let cmd = CancelSubscriptionCommand {
        user_id: user.id,
        subscription_id: request.subscription_id,
    };

    let subscription = state.cancel_subscription_handler().handle(cmd).await?;

    Ok(Json(CancelSubscriptionResponse {
        subscription: ProviderSubscriptionView::from(&subscription),
    }))
}

/// POST /api/stripe/webhook - Signed provider events
///
/// Takes the raw body: the signature covers the exact bytes sent.
pub async fn handle_stripe_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let cmd = HandleStripeWebhookCommand {
        payload: body.to_vec(),
        signature,
    };

    let result = state.webhook_handler.handle(cmd).await?;

    Ok(Json(WebhookAckResponse::from(result)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts billing errors to HTTP responses.
#[derive(Debug)]
pub struct BillingApiError(BillingError);

impl From<BillingError> for BillingApiError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

impl BillingApiError {
    fn status(&self) -> StatusCode {
        match self.0.code() {
            ErrorCode::ValidationFailed | ErrorCode::InvalidFormat | ErrorCode::UnknownPlan => {
                StatusCode::BAD_REQUEST
            }
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden | ErrorCode::PurchaseNotAllowed => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::PaymentProviderError => StatusCode::BAD_GATEWAY,
            ErrorCode::InvalidWebhookSignature => StatusCode::BAD_REQUEST,
            ErrorCode::DatabaseError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() || status == StatusCode::BAD_GATEWAY {
            tracing::error!(error = %self.0, status = status.as_u16(), "Billing request failed");
        }

        let body = match &self.0 {
            BillingError::ValidationFailed { field, message } if !field.is_empty() => {
                ErrorResponse::with_details(
                    self.0.code().to_string(),
                    message.clone(),
                    serde_json::json!({ "field": field }),
                )
            }
            BillingError::PurchaseNotAllowed(reason) => ErrorResponse::with_details(
                self.0.code().to_string(),
                self.0.message(),
                serde_json::json!({ "reason_code": reason.code() }),
            ),
            other => ErrorResponse::new(other.code().to_string(), other.message()),
        };
        body.into_response_with(status)
    }
}

/// API error type for webhook deliveries.
///
/// The status decides whether the provider redelivers: 4xx is final,
/// 5xx is retried.
#[derive(Debug)]
pub struct WebhookApiError(WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> Response {
        let code = match &self.0 {
            WebhookError::MissingSignature
            | WebhookError::InvalidSignature
            | WebhookError::TimestampOutOfRange
            | WebhookError::InvalidTimestamp => ErrorCode::InvalidWebhookSignature,
            WebhookError::Database(_) => ErrorCode::DatabaseError,
            _ => ErrorCode::ValidationFailed,
        };
        ErrorResponse::new(code.to_string(), self.0.public_message())
            .into_response_with(self.0.status_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::DenialReason;

    #[test]
    fn billing_errors_map_to_statuses() {
        let cases = [
            (BillingError::validation("price_id", "Price ID is required"), StatusCode::BAD_REQUEST),
            (BillingError::unknown_plan("price_x"), StatusCode::BAD_REQUEST),
            (
                BillingError::PurchaseNotAllowed(DenialReason::AlreadyPurchased),
                StatusCode::FORBIDDEN,
            ),
            (BillingError::SubscriptionNotFound("sub_1".into()), StatusCode::NOT_FOUND),
            (BillingError::PaymentProvider("timeout".into()), StatusCode::BAD_GATEWAY),
            (BillingError::infrastructure("pool closed"), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(BillingApiError(err).into_response().status(), expected);
        }
    }

    #[tokio::test]
    async fn infrastructure_detail_is_not_leaked() {
        let response = BillingApiError(BillingError::infrastructure("password=hunter2")).into_response();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(body.contains("DATABASE_ERROR"));
        assert!(!body.contains("hunter2"));
    }

    #[test]
    fn webhook_storage_failure_asks_for_redelivery() {
        let response = WebhookApiError(WebhookError::Database("down".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = WebhookApiError(WebhookError::InvalidSignature).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
