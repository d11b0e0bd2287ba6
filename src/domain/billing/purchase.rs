//! One-time purchase records.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{PurchaseId, Timestamp, UserId, ValidationError};

/// Product name stored when a checkout carries no product metadata.
pub const UNKNOWN_PRODUCT: &str = "Unknown Product";

/// Outcome of a completed checkout, as stored on the payment row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Funds were captured. Only this status grants an entitlement.
    Succeeded,

    /// Checkout completed but payment has not been captured yet
    /// (delayed payment methods).
    Unpaid,

    /// Checkout completed for a zero-amount order.
    NoPaymentRequired,
}

impl PaymentStatus {
    /// Maps Stripe's `checkout.session.payment_status` onto a stored status.
    ///
    /// `paid` becomes `succeeded`; the other documented values pass through.
    pub fn from_checkout_payment_status(value: &str) -> Option<Self> {
        match value {
            "paid" => Some(PaymentStatus::Succeeded),
            "unpaid" => Some(PaymentStatus::Unpaid),
            "no_payment_required" => Some(PaymentStatus::NoPaymentRequired),
            _ => None,
        }
    }

    /// Parses the stored column value.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value {
            "succeeded" => Ok(PaymentStatus::Succeeded),
            "unpaid" => Ok(PaymentStatus::Unpaid),
            "no_payment_required" => Ok(PaymentStatus::NoPaymentRequired),
            other => Err(ValidationError::invalid_format(
                "payment_status",
                format!("unknown value '{}'", other),
            )),
        }
    }

    /// Returns the stored column value.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::NoPaymentRequired => "no_payment_required",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A payment row written when a checkout session completes.
///
/// Rows are only created by the webhook ingester and are never edited by
/// the application apart from their status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseRecord {
    pub id: PurchaseId,
    pub user_id: UserId,
    pub product_name: String,
    /// Amount in the currency's minor unit (cents for USD).
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    /// Provider checkout session id, unique per row.
    pub stripe_session_id: String,
    pub stripe_payment_intent_id: Option<String>,
    pub created_at: Timestamp,
}

impl PurchaseRecord {
    /// Returns true if this row grants ownership of `product_name`.
    pub fn grants(&self, product_name: &str) -> bool {
        self.status == PaymentStatus::Succeeded && self.product_name == product_name
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Builder for purchase rows in tests.
    pub struct PurchaseRecordBuilder {
        record: PurchaseRecord,
    }

    impl PurchaseRecordBuilder {
        pub fn new(user_id: &str) -> Self {
            Self {
                record: PurchaseRecord {
                    id: PurchaseId::new(),
                    user_id: UserId::new(user_id).unwrap(),
                    product_name: "Starter Kit".to_string(),
                    amount: 2900,
                    currency: "usd".to_string(),
                    status: PaymentStatus::Succeeded,
                    stripe_session_id: format!("cs_test_{}", PurchaseId::new()),
                    stripe_payment_intent_id: None,
                    created_at: Timestamp::now(),
                },
            }
        }

        pub fn product(mut self, name: &str) -> Self {
            self.record.product_name = name.to_string();
            self
        }

        pub fn status(mut self, status: PaymentStatus) -> Self {
            self.record.status = status;
            self
        }

        pub fn session_id(mut self, id: &str) -> Self {
            self.record.stripe_session_id = id.to_string();
            self
        }

        pub fn created_at(mut self, at: Timestamp) -> Self {
            self.record.created_at = at;
            self
        }

        pub fn build(self) -> PurchaseRecord {
            self.record
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::PurchaseRecordBuilder;
    use super::*;

    #[test]
    fn paid_checkout_maps_to_succeeded() {
        assert_eq!(
            PaymentStatus::from_checkout_payment_status("paid"),
            Some(PaymentStatus::Succeeded)
        );
        assert_eq!(
            PaymentStatus::from_checkout_payment_status("unpaid"),
            Some(PaymentStatus::Unpaid)
        );
        assert_eq!(PaymentStatus::from_checkout_payment_status("refunded"), None);
    }

    #[test]
    fn parse_accepts_every_stored_value() {
        for status in [
            PaymentStatus::Succeeded,
            PaymentStatus::Unpaid,
            PaymentStatus::NoPaymentRequired,
        ] {
            assert_eq!(PaymentStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(PaymentStatus::parse("paid").is_err());
    }

    #[test]
    fn only_succeeded_rows_grant_the_product() {
        let paid = PurchaseRecordBuilder::new("u1").product("Starter Kit").build();
        let unpaid = PurchaseRecordBuilder::new("u1")
            .product("Starter Kit")
            .status(PaymentStatus::Unpaid)
            .build();

        assert!(paid.grants("Starter Kit"));
        assert!(!paid.grants("Pro"));
        assert!(!unpaid.grants("Starter Kit"));
    }
}
