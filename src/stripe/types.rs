use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Customer {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub deleted: bool,
}

/// A charge or a payment intent. Both carry the amount, status and creation
/// time the reconciliation math needs; `object` says which one it is.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentRecord {
    pub id: String,
    #[serde(default)]
    pub object: String,
    pub amount: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub status: String,
    pub created: i64,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub invoice: Option<String>,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub receipt_url: Option<String>,
}

impl PaymentRecord {
    pub fn is_succeeded(&self) -> bool {
        self.status == "succeeded"
    }
}

pub type Charge = PaymentRecord;
pub type PaymentIntent = PaymentRecord;

fn default_currency() -> String {
    "usd".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Invoice {
    pub id: String,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub amount_paid: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub created: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub hosted_invoice_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Day,
    Week,
    Month,
    Year,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Recurring {
    pub interval: Interval,
    #[serde(default = "default_interval_count")]
    pub interval_count: u32,
}

fn default_interval_count() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Price {
    pub id: String,
    #[serde(default)]
    pub unit_amount: Option<i64>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub recurring: Option<Recurring>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubscriptionItem {
    pub id: String,
    #[serde(default)]
    pub price: Option<Price>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubscriptionItems {
    #[serde(default)]
    pub data: Vec<SubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Subscription {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub customer: Option<String>,
    pub created: i64,
    pub items: SubscriptionItems,
    #[serde(default)]
    pub current_period_start: Option<i64>,
    #[serde(default)]
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub trial_end: Option<i64>,
    #[serde(default)]
    pub latest_invoice: Option<String>,
}

/// The recurring price of a subscription item, with every field present.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemPrice {
    pub unit_amount: i64,
    pub interval: Interval,
    pub interval_count: u32,
}

impl Subscription {
    /// Price of the first item that has both a unit amount and a recurring
    /// interval. Later items are ignored.
    pub fn first_price(&self) -> Option<ItemPrice> {
        self.items.data.iter().find_map(|item| {
            let price = item.price.as_ref()?;
            let recurring = price.recurring.as_ref()?;
            Some(ItemPrice {
                unit_amount: price.unit_amount?,
                interval: recurring.interval,
                interval_count: recurring.interval_count.max(1),
            })
        })
    }

    pub fn currency(&self) -> String {
        self.items
            .data
            .iter()
            .find_map(|item| item.price.as_ref().map(|p| p.currency.clone()))
            .unwrap_or_else(default_currency)
    }
}

/// Envelope of every Stripe list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct List<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_first_price() {
        let sub: Subscription = serde_json::from_value(serde_json::json!({
            "id": "sub_1",
            "status": "active",
            "customer": "cus_1",
            "created": 1700000000,
            "items": {"data": [
                {"id": "si_1", "price": {"id": "price_1", "unit_amount": 10000, "currency": "usd",
                    "recurring": {"interval": "month", "interval_count": 1}}},
                {"id": "si_2", "price": {"id": "price_2", "unit_amount": 500, "currency": "usd",
                    "recurring": {"interval": "year", "interval_count": 1}}}
            ]}
        }))
        .unwrap();
        let price = sub.first_price().unwrap();
        assert_eq!(price.unit_amount, 10000);
        assert_eq!(price.interval, Interval::Month);
        assert_eq!(price.interval_count, 1);
    }

    #[test]
    fn test_subscription_without_priced_items() {
        let sub: Subscription = serde_json::from_value(serde_json::json!({
            "id": "sub_2",
            "status": "active",
            "created": 1700000000,
            "items": {"data": [{"id": "si_1", "price": {"id": "price_1", "currency": "usd"}}]}
        }))
        .unwrap();
        assert!(sub.first_price().is_none());
        assert!(sub.customer.is_none());
    }

    #[test]
    fn test_payment_record_defaults() {
        let rec: PaymentRecord = serde_json::from_value(serde_json::json!({
            "id": "pi_1",
            "object": "payment_intent",
            "amount": 50000,
            "status": "succeeded",
            "created": 1700000000
        }))
        .unwrap();
        assert!(rec.is_succeeded());
        assert_eq!(rec.currency, "usd");
        assert!(rec.customer.is_none());
    }
}
