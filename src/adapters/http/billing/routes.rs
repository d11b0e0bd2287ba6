//! Axum router configuration for billing endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    can_purchase, cancel_subscription, create_checkout_session, get_current_user,
    get_subscription_overview, get_user_purchases, handle_stripe_webhook, BillingAppState,
};

/// Create the Stripe API router, mounted at `/api/stripe`.
///
/// # Routes
///
/// ## User Endpoints (require authentication)
/// - `POST /create-checkout-session` - Start a hosted checkout
/// - `GET /user-purchases` - Payments and subscriptions
/// - `GET /subscription` - Provider-shaped subscriptions and invoices
/// - `POST /cancel-subscription` - Cancel at period end
///
/// ## Public Endpoints
/// - `GET /can-purchase` - Eligibility verdict (session optional)
/// - `POST /webhook` - Provider events, verified by signature
pub fn stripe_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/create-checkout-session", post(create_checkout_session))
        .route("/user-purchases", get(get_user_purchases))
        .route("/subscription", get(get_subscription_overview))
        .route("/can-purchase", get(can_purchase))
        .route("/cancel-subscription", post(cancel_subscription))
        .route("/webhook", post(handle_stripe_webhook))
}

/// Create the complete billing router, suitable for mounting at `/api`.
pub fn billing_router() -> Router<BillingAppState> {
    Router::new()
        .nest("/stripe", stripe_routes())
        .route("/me", get(get_current_user))
}
