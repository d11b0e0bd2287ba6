//! Signed event envelope delivered to `POST /api/stripe/webhook`.
//!
//! Only `id`, `type`, `created`, `livemode` and `data.object` are read.
//! Unknown envelope fields are skipped by serde.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEvent {
    /// `evt_...`; the idempotency key of the event log.
    pub id: String,

    #[serde(rename = "type")]
    pub event_type: String,

    /// Unix seconds at which the provider emitted the event. Used to order
    /// deliveries that arrive out of sequence.
    pub created: i64,

    pub data: EventPayload,

    #[serde(default)]
    pub livemode: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventPayload {
    /// Shape depends on the event type; see `objects`.
    pub object: serde_json::Value,
}

impl StripeEvent {
    pub fn is_live(&self) -> bool {
        self.livemode
    }

    pub fn deserialize_object<T: serde::de::DeserializeOwned>(
        &self,
    ) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data.object)
    }

    pub fn parsed_type(&self) -> StripeEventType {
        StripeEventType::parse(&self.event_type)
    }
}

#[cfg(test)]
impl StripeEvent {
    /// Test-mode event emitted now.
    pub fn for_test(event_type: &str, object: serde_json::Value) -> Self {
        Self {
            id: format!("evt_test_{}", uuid::Uuid::new_v4().simple()),
            event_type: event_type.to_string(),
            created: chrono::Utc::now().timestamp(),
            data: EventPayload { object },
            livemode: false,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Overrides the emission time (unix seconds).
    pub fn emitted_at(mut self, created: i64) -> Self {
        self.created = created;
        self
    }
}

/// Event types the ingester acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StripeEventType {
    CheckoutSessionCompleted,
    CustomerSubscriptionCreated,
    CustomerSubscriptionUpdated,
    CustomerSubscriptionDeleted,
    /// Acknowledged and ignored.
    Unknown,
}

impl StripeEventType {
    pub fn parse(s: &str) -> Self {
        match s {
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "customer.subscription.created" => Self::CustomerSubscriptionCreated,
            "customer.subscription.updated" => Self::CustomerSubscriptionUpdated,
            "customer.subscription.deleted" => Self::CustomerSubscriptionDeleted,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckoutSessionCompleted => "checkout.session.completed",
            Self::CustomerSubscriptionCreated => "customer.subscription.created",
            Self::CustomerSubscriptionUpdated => "customer.subscription.updated",
            Self::CustomerSubscriptionDeleted => "customer.subscription.deleted",
            Self::Unknown => "unknown",
        }
    }
}
