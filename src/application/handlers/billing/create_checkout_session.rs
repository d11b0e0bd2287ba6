//! CreateCheckoutSessionHandler - Command handler for starting a hosted checkout.
//!
//! The purchase itself is recorded later by the webhook ingester; this
//! handler only refuses purchases the user is not entitled to make and
//! hands the browser a provider URL.

use std::collections::HashMap;
use std::sync::Arc;

use super::load_entitlements;
use crate::domain::billing::{BillingError, PlanCatalog, PricingPlan};
use crate::domain::foundation::{AuthenticatedUser, Timestamp};
use crate::domain::webhook::{METADATA_PRICE_ID, METADATA_PRODUCT_NAME, METADATA_USER_ID};
use crate::ports::{
    CheckoutMode, CreateCheckoutRequest, CreateCustomerRequest, CustomerRepository,
    PaymentProvider, PaymentRepository, SaveResult, SubscriptionRepository,
};

/// Command to open a checkout session for one price.
#[derive(Debug, Clone)]
pub struct CreateCheckoutSessionCommand {
    pub user: AuthenticatedUser,
    pub price_id: String,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCheckoutSessionResult {
    pub session_id: String,
    pub url: String,
}

/// Redirect targets used when the request does not supply its own.
#[derive(Debug, Clone)]
pub struct CheckoutUrls {
    app_url: String,
}

impl CheckoutUrls {
    pub fn new(app_url: impl Into<String>) -> Self {
        Self {
            app_url: app_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// `{CHECKOUT_SESSION_ID}` is substituted by the provider.
    pub fn success_url(&self) -> String {
        format!("{}/success?session_id={{CHECKOUT_SESSION_ID}}", self.app_url)
    }

    pub fn cancel_url(&self) -> String {
        format!("{}/pricing", self.app_url)
    }
}

pub struct CreateCheckoutSessionHandler {
    payments: Arc<dyn PaymentRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    customers: Arc<dyn CustomerRepository>,
    provider: Arc<dyn PaymentProvider>,
    catalog: Arc<PlanCatalog>,
    urls: CheckoutUrls,
}

impl CreateCheckoutSessionHandler {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        customers: Arc<dyn CustomerRepository>,
        provider: Arc<dyn PaymentProvider>,
        catalog: Arc<PlanCatalog>,
        urls: CheckoutUrls,
    ) -> Self {
        Self {
            payments,
            subscriptions,
            customers,
            provider,
            catalog,
            urls,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateCheckoutSessionCommand,
    ) -> Result<CreateCheckoutSessionResult, BillingError> {
        // 1. Resolve the plan
        let price_id = cmd.price_id.trim();
        if price_id.is_empty() {
            return Err(BillingError::validation("price_id", "Price ID is required"));
        }
        let plan = self
            .catalog
            .find_by_price_id(price_id)
            .ok_or_else(|| BillingError::unknown_plan(price_id))?;

        // 2. Refuse what the user already owns
        let entitlements = load_entitlements(
            self.payments.as_ref(),
            self.subscriptions.as_ref(),
            &cmd.user.id,
        )
        .await?;
        let eligibility =
            entitlements.can_purchase(&plan.name, plan.is_subscription(), Timestamp::now());
        if let Some(reason) = eligibility.reason {
            tracing::info!(
                user_id = %cmd.user.id,
                plan_name = %plan.name,
                reason = reason.code(),
                "Checkout refused"
            );
            return Err(BillingError::PurchaseNotAllowed(reason));
        }

        // 3. Find or create the provider customer
        let customer_id = self.customer_for(&cmd.user).await?;

        // 4. Open the session
        let session = self
            .provider
            .create_checkout_session(CreateCheckoutRequest {
                customer_id,
                price_id: plan.price_id.clone(),
                mode: CheckoutMode::for_plan(plan),
                success_url: cmd.success_url.unwrap_or_else(|| self.urls.success_url()),
                cancel_url: cmd.cancel_url.unwrap_or_else(|| self.urls.cancel_url()),
                metadata: checkout_metadata(&cmd.user, plan),
            })
            .await
            .map_err(|e| {
                tracing::error!(user_id = %cmd.user.id, error = %e, "Checkout session creation failed");
                BillingError::from(e)
            })?;

        tracing::info!(
            user_id = %cmd.user.id,
            session_id = %session.id,
            plan_name = %plan.name,
            "Checkout session created"
        );

        Ok(CreateCheckoutSessionResult {
            session_id: session.id,
            url: session.url,
        })
    }

    async fn customer_for(&self, user: &AuthenticatedUser) -> Result<String, BillingError> {
        if let Some(existing) = self.customers.find_customer_id(&user.id).await? {
            return Ok(existing);
        }

        let customer = self
            .provider
            .create_customer(CreateCustomerRequest {
                user_id: user.id.clone(),
                email: user.email.clone(),
                name: user.display_name.clone(),
            })
            .await?;

        match self.customers.save(&user.id, &customer.id).await? {
            SaveResult::Inserted => Ok(customer.id),
            SaveResult::AlreadyExists => {
                // A concurrent request stored a mapping first; use it.
                tracing::warn!(
                    user_id = %user.id,
                    orphan_customer_id = %customer.id,
                    "Customer mapping already existed"
                );
                let stored = self.customers.find_customer_id(&user.id).await?;
                Ok(stored.unwrap_or(customer.id))
            }
        }
    }
}

fn checkout_metadata(user: &AuthenticatedUser, plan: &PricingPlan) -> HashMap<String, String> {
    HashMap::from([
        (METADATA_USER_ID.to_string(), user.id.as_str().to_string()),
        (METADATA_PRODUCT_NAME.to_string(), plan.name.clone()),
        (METADATA_PRICE_ID.to_string(), plan.price_id.clone()),
    ])
}
