//! Stripe objects carried in `event.data.object`.
//!
//! Fields are optional wherever Stripe may omit or null them, so that one
//! missing field does not fail the whole event.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata key carrying the local user id.
pub const METADATA_USER_ID: &str = "user_id";

/// Metadata key carrying the purchased product name.
pub const METADATA_PRODUCT_NAME: &str = "product_name";

/// Metadata key carrying the purchased price id.
pub const METADATA_PRICE_ID: &str = "price_id";

/// `checkout.session` object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CheckoutSessionObject {
    /// Session id (cs_...).
    pub id: String,

    #[serde(default)]
    pub customer: Option<String>,

    #[serde(default)]
    pub payment_intent: Option<String>,

    /// Total in minor units.
    #[serde(default)]
    pub amount_total: Option<i64>,

    #[serde(default)]
    pub currency: Option<String>,

    /// `paid`, `unpaid` or `no_payment_required`.
    pub payment_status: String,

    /// `payment`, `subscription` or `setup`.
    #[serde(default)]
    pub mode: Option<String>,

    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSessionObject {
    /// Returns a metadata value, treating empty strings as absent.
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        metadata_value(&self.metadata, key)
    }

    /// A session without `mode` is treated as a one-time payment.
    pub fn is_one_time_payment(&self) -> bool {
        matches!(self.mode.as_deref(), None | Some("payment"))
    }
}

/// `subscription` object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubscriptionObject {
    /// Subscription id (sub_...).
    pub id: String,

    /// Owning customer (cus_...).
    pub customer: String,

    pub status: String,

    /// Top-level period bounds. Newer API versions only report them per item.
    #[serde(default)]
    pub current_period_start: Option<i64>,

    #[serde(default)]
    pub current_period_end: Option<i64>,

    #[serde(default)]
    pub cancel_at_period_end: bool,

    #[serde(default)]
    pub metadata: HashMap<String, String>,

    #[serde(default)]
    pub items: SubscriptionItems,
}

/// Subscription items container.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SubscriptionItems {
    #[serde(default)]
    pub data: Vec<SubscriptionItem>,
}

/// Single subscription item.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubscriptionItem {
    #[serde(default)]
    pub price: Option<Price>,

    #[serde(default)]
    pub current_period_start: Option<i64>,

    #[serde(default)]
    pub current_period_end: Option<i64>,
}

/// `price` object as embedded in subscription items.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Price {
    pub id: String,

    #[serde(default)]
    pub nickname: Option<String>,

    #[serde(default)]
    pub unit_amount: Option<i64>,

    #[serde(default)]
    pub recurring: Option<Recurring>,
}

/// Recurring billing settings of a price.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Recurring {
    pub interval: String,
}

impl SubscriptionObject {
    fn first_item(&self) -> Option<&SubscriptionItem> {
        self.items.data.first()
    }

    /// Price of the first subscription item.
    pub fn first_price(&self) -> Option<&Price> {
        self.first_item().and_then(|item| item.price.as_ref())
    }

    pub fn period_start(&self) -> Option<i64> {
        self.current_period_start
            .or_else(|| self.first_item().and_then(|i| i.current_period_start))
    }

    pub fn period_end(&self) -> Option<i64> {
        self.current_period_end
            .or_else(|| self.first_item().and_then(|i| i.current_period_end))
    }

    /// Returns a metadata value, treating empty strings as absent.
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        metadata_value(&self.metadata, key)
    }
}

fn metadata_value<'a>(metadata: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    metadata
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}
