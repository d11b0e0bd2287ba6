//! Request and response DTOs for the billing endpoints.
//!
//! Request bodies accept both snake_case and the camelCase names the
//! browser client sends.

use serde::{Deserialize, Serialize};

use crate::application::CreateCheckoutSessionResult;
use crate::domain::billing::{
    Entitlements, PaymentStatus, PurchaseEligibility, PurchaseRecord, SubscriptionRecord,
    SubscriptionStatus,
};
use crate::domain::foundation::{AuthenticatedUser, Timestamp};
use crate::ports::WebhookResult;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Body of `POST /api/stripe/create-checkout-session`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCheckoutSessionRequest {
    /// Missing is reported as a validation error by the handler.
    #[serde(default, alias = "priceId")]
    pub price_id: String,
    #[serde(default, alias = "successUrl")]
    pub success_url: Option<String>,
    #[serde(default, alias = "cancelUrl")]
    pub cancel_url: Option<String>,
}

/// Query string of `GET /api/stripe/can-purchase`.
#[derive(Debug, Clone, Deserialize)]
pub struct CanPurchaseParams {
    #[serde(default, alias = "planName")]
    pub plan_name: String,
    #[serde(default, alias = "isSubscription")]
    pub is_subscription: bool,
}

/// Body of `POST /api/stripe/cancel-subscription`.
#[derive(Debug, Clone, Deserialize)]
pub struct CancelSubscriptionRequest {
    #[serde(default, alias = "subscriptionId")]
    pub subscription_id: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Checkout / Eligibility Responses
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSessionResponse {
    pub session_id: String,
    /// Same value as `session_id`; existing clients read the camelCase key.
    #[serde(rename = "sessionId")]
    pub session_id_camel: String,
    pub url: String,
}

impl From<CreateCheckoutSessionResult> for CheckoutSessionResponse {
    fn from(result: CreateCheckoutSessionResult) -> Self {
        Self {
            session_id_camel: result.session_id.clone(),
            session_id: result.session_id,
            url: result.url,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CanPurchaseResponse {
    pub can_purchase: bool,
    pub reason: Option<String>,
    pub reason_code: Option<String>,
}

impl From<PurchaseEligibility> for CanPurchaseResponse {
    fn from(eligibility: PurchaseEligibility) -> Self {
        Self {
            can_purchase: eligibility.allowed,
            reason: eligibility.reason.map(|r| r.message().to_string()),
            reason_code: eligibility.reason.map(|r| r.code().to_string()),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Purchase History Responses
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseResponse {
    pub id: String,
    pub product_name: String,
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub created_at: Timestamp,
}

impl From<&PurchaseRecord> for PurchaseResponse {
    fn from(record: &PurchaseRecord) -> Self {
        Self {
            id: record.id.to_string(),
            product_name: record.product_name.clone(),
            amount: record.amount,
            currency: record.currency.clone(),
            status: record.status,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionSummaryResponse {
    pub id: String,
    pub plan_name: String,
    pub status: SubscriptionStatus,
    pub current_period_end: Timestamp,
    pub cancel_at_period_end: bool,
    pub created_at: Timestamp,
}

impl From<&SubscriptionRecord> for SubscriptionSummaryResponse {
    fn from(record: &SubscriptionRecord) -> Self {
        Self {
            id: record.id.to_string(),
            plan_name: record.plan_name.clone(),
            status: record.status,
            current_period_end: record.current_period_end,
            cancel_at_period_end: record.cancel_at_period_end,
            created_at: record.created_at,
        }
    }
}

/// Response of `GET /api/stripe/user-purchases`.
#[derive(Debug, Clone, Serialize)]
pub struct UserPurchasesResponse {
    pub purchases: Vec<PurchaseResponse>,
    pub subscriptions: Vec<SubscriptionSummaryResponse>,
}

impl From<&Entitlements> for UserPurchasesResponse {
    fn from(entitlements: &Entitlements) -> Self {
        Self {
            purchases: entitlements.purchases().iter().map(Into::into).collect(),
            subscriptions: entitlements.subscriptions().iter().map(Into::into).collect(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Provider-Shaped Subscription Responses
// ════════════════════════════════════════════════════════════════════════════════
//
// `GET /api/stripe/subscription` mirrors the shape of Stripe's own
// subscription and invoice objects so billing UI written against the
// provider API renders it unchanged.

#[derive(Debug, Clone, Serialize)]
pub struct RecurringView {
    pub interval: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceView {
    pub nickname: String,
    pub unit_amount: i64,
    pub recurring: RecurringView,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemView {
    pub price: PriceView,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemsView {
    pub data: Vec<ItemView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderSubscriptionView {
    /// Provider subscription id.
    pub id: String,
    pub status: SubscriptionStatus,
    pub items: ItemsView,
    /// Unix seconds.
    pub current_period_start: i64,
    /// Unix seconds.
    pub current_period_end: i64,
    pub cancel_at_period_end: bool,
}

impl From<&SubscriptionRecord> for ProviderSubscriptionView {
    fn from(record: &SubscriptionRecord) -> Self {
        Self {
            id: record.stripe_subscription_id.clone(),
            status: record.status,
            items: ItemsView {
                data: vec![ItemView {
                    price: PriceView {
                        nickname: record.plan_name.clone(),
                        unit_amount: record.plan_price,
                        recurring: RecurringView {
                            interval: record.plan_interval.clone(),
                        },
                    },
                }],
            },
            current_period_start: record.current_period_start.as_unix_secs(),
            current_period_end: record.current_period_end.as_unix_secs(),
            cancel_at_period_end: record.cancel_at_period_end,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceView {
    /// Checkout session id of the payment.
    pub id: String,
    pub amount_paid: i64,
    pub status: PaymentStatus,
    /// Unix seconds.
    pub created: i64,
    /// One-time payments have no hosted invoice.
    pub hosted_invoice_url: Option<String>,
}

impl From<&PurchaseRecord> for InvoiceView {
    fn from(record: &PurchaseRecord) -> Self {
        Self {
            id: record.stripe_session_id.clone(),
            amount_paid: record.amount,
            status: record.status,
            created: record.created_at.as_unix_secs(),
            hosted_invoice_url: None,
        }
    }
}

/// Response of `GET /api/stripe/subscription`.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionOverviewResponse {
    pub subscriptions: Vec<ProviderSubscriptionView>,
    pub invoices: Vec<InvoiceView>,
}

impl From<&Entitlements> for SubscriptionOverviewResponse {
    fn from(entitlements: &Entitlements) -> Self {
        Self {
            subscriptions: entitlements.subscriptions().iter().map(Into::into).collect(),
            invoices: entitlements.purchases().iter().map(Into::into).collect(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Cancellation / Webhook / Session Responses
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct CancelSubscriptionResponse {
    pub subscription: ProviderSubscriptionView,
}

#[derive(Debug, Clone, Serialize)]
pub struct WebhookAckResponse {
    pub received: bool,
    pub status: &'static str,
}

impl From<WebhookResult> for WebhookAckResponse {
    fn from(result: WebhookResult) -> Self {
        Self {
            received: true,
            status: result.as_str(),
        }
    }
}

/// Response of `GET /api/me`.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUserResponse {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub email_verified: bool,
}

impl From<AuthenticatedUser> for CurrentUserResponse {
    fn from(user: AuthenticatedUser) -> Self {
        Self {
            id: user.id.as_str().to_string(),
            email: user.email,
            display_name: user.display_name,
            email_verified: user.email_verified,
        }
    }
}
