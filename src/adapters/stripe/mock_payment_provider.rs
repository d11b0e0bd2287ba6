//! Mock payment provider for testing.
//!
//! Configurable implementation of `PaymentProvider` for unit and
//! integration tests. Supports error injection and call tracking.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::ports::{
    CheckoutSession, CreateCheckoutRequest, CreateCustomerRequest, Customer, PaymentError,
    PaymentProvider,
};

/// Mock payment provider for testing.
///
/// ```ignore
/// let mock = MockPaymentProvider::new();
/// mock.set_method_error("create_checkout_session", PaymentError::network("down"));
/// ```
#[derive(Default)]
pub struct MockPaymentProvider {
    inner: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    /// Specific errors by method name.
    method_errors: HashMap<String, PaymentError>,

    /// Track method calls for assertions.
    call_log: Vec<MethodCall>,

    customer_counter: u32,
    session_counter: u32,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set an error for a specific method.
    pub fn set_method_error(&self, method: &str, error: PaymentError) {
        self.state()
            .method_errors
            .insert(method.to_string(), error);
    }

    pub fn clear_errors(&self) {
        self.state().method_errors.clear();
    }

    /// Get all recorded method calls.
    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.state().call_log.iter().any(|c| c.method == method)
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    fn record(&self, method: &str, args: Vec<String>) -> Result<(), PaymentError> {
        let mut state = self.state();
        state.call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });
        match state.method_errors.get(method) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<Customer, PaymentError> {
        self.record(
            "create_customer",
            vec![request.user_id.as_str().to_string(), request.email.clone()],
        )?;

        let mut state = self.state();
        state.customer_counter += 1;
        Ok(Customer {
            id: format!("cus_mock_{}", state.customer_counter),
            email: Some(request.email),
        })
    }

    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        self.record(
            "create_checkout_session",
            vec![
                request.customer_id.clone(),
                request.price_id.clone(),
                request.mode.as_str().to_string(),
            ],
        )?;

        let mut state = self.state();
        state.session_counter += 1;
        let id = format!("cs_mock_{}", state.session_counter);
        Ok(CheckoutSession {
            url: format!("https://checkout.stripe.com/c/pay/{}", id),
            id,
        })
    }

    async fn cancel_subscription_at_period_end(
        &self,
        stripe_subscription_id: &str,
    ) -> Result<(), PaymentError> {
        self.record(
            "cancel_subscription_at_period_end",
            vec![stripe_subscription_id.to_string()],
        )
    }
}
