//! Pricing plan catalog.
//!
//! Maps provider price ids to the product and plan names stored on payment
//! and subscription rows. The catalog is what lets checkout decide between a
//! one-time payment and a subscription, and what the entitlement check keys on.

use serde::{Deserialize, Serialize};

/// How often a plan is billed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanInterval {
    OneTime,
    Month,
    Year,
}

impl PlanInterval {
    /// Returns the provider's `recurring.interval` value, if recurring.
    pub fn recurring_interval(&self) -> Option<&'static str> {
        match self {
            PlanInterval::OneTime => None,
            PlanInterval::Month => Some("month"),
            PlanInterval::Year => Some("year"),
        }
    }
}

/// A purchasable plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPlan {
    /// Name stored on rows and used for entitlement checks.
    pub name: String,
    /// Provider price id (`price_...`).
    pub price_id: String,
    /// Price in minor units.
    pub amount: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub interval: PlanInterval,
}

fn default_currency() -> String {
    "usd".to_string()
}

impl PricingPlan {
    pub fn new(
        name: impl Into<String>,
        price_id: impl Into<String>,
        amount: i64,
        interval: PlanInterval,
    ) -> Self {
        Self {
            name: name.into(),
            price_id: price_id.into(),
            amount,
            currency: default_currency(),
            interval,
        }
    }

    /// True for plans billed on a recurring interval.
    pub fn is_subscription(&self) -> bool {
        self.interval != PlanInterval::OneTime
    }
}

/// The set of plans the service sells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanCatalog {
    plans: Vec<PricingPlan>,
}

impl PlanCatalog {
    /// Creates a catalog from configured plans.
    pub fn new(plans: Vec<PricingPlan>) -> Self {
        Self { plans }
    }

    /// The plans shipped with the starter template.
    pub fn standard() -> Self {
        use PlanInterval::*;
        Self::new(vec![
            PricingPlan::new("Starter Kit", "price_1RZUWH2cmOQ9qmEBMH8d9GFg", 2900, OneTime),
            PricingPlan::new("Pro", "price_onetime_pro", 9900, OneTime),
            PricingPlan::new("Enterprise Kit", "price_onetime_enterprise", 29900, OneTime),
            PricingPlan::new("Basic", "price_sub_basic_monthly", 900, Month),
            PricingPlan::new("Pro", "price_sub_pro_monthly", 2900, Month),
            PricingPlan::new("Enterprise", "price_sub_enterprise_monthly", 9900, Month),
            PricingPlan::new("Basic", "price_sub_basic_yearly", 9000, Year),
            PricingPlan::new("Pro", "price_sub_pro_yearly", 29000, Year),
            PricingPlan::new("Enterprise", "price_sub_enterprise_yearly", 99000, Year),
        ])
    }

    /// Uses the configured plans, or the standard catalog when none are set.
    pub fn from_config(plans: &[PricingPlan]) -> Self {
        if plans.is_empty() {
            Self::standard()
        } else {
            Self::new(plans.to_vec())
        }
    }

    pub fn find_by_price_id(&self, price_id: &str) -> Option<&PricingPlan> {
        self.plans.iter().find(|p| p.price_id == price_id)
    }

    pub fn plans(&self) -> &[PricingPlan] {
        &self.plans
    }
}

impl Default for PlanCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_resolves_starter_kit() {
        let catalog = PlanCatalog::standard();
        let plan = catalog
            .find_by_price_id("price_1RZUWH2cmOQ9qmEBMH8d9GFg")
            .unwrap();

        assert_eq!(plan.name, "Starter Kit");
        assert_eq!(plan.amount, 2900);
        assert!(!plan.is_subscription());
    }

    #[test]
    fn pro_exists_as_one_time_and_subscription() {
        let catalog = PlanCatalog::standard();
        let one_time = catalog.find_by_price_id("price_onetime_pro").unwrap();
        let monthly = catalog.find_by_price_id("price_sub_pro_monthly").unwrap();

        assert_eq!(one_time.name, monthly.name);
        assert!(!one_time.is_subscription());
        assert!(monthly.is_subscription());
        assert_eq!(monthly.interval.recurring_interval(), Some("month"));
    }

    #[test]
    fn unknown_price_id_is_not_found() {
        assert!(PlanCatalog::standard().find_by_price_id("price_nope").is_none());
    }

    #[test]
    fn from_config_falls_back_to_standard_when_empty() {
        assert_eq!(PlanCatalog::from_config(&[]), PlanCatalog::standard());

        let custom = vec![PricingPlan::new("Solo", "price_solo", 500, PlanInterval::Month)];
        let catalog = PlanCatalog::from_config(&custom);
        assert_eq!(catalog.plans().len(), 1);
        assert!(catalog.find_by_price_id("price_onetime_pro").is_none());
    }

    #[test]
    fn plan_deserializes_with_default_currency() {
        let plan: PricingPlan = serde_json::from_str(
            r#"{"name":"Team","price_id":"price_team","amount":4900,"interval":"year"}"#,
        )
        .unwrap();

        assert_eq!(plan.currency, "usd");
        assert_eq!(plan.interval, PlanInterval::Year);
    }
}
