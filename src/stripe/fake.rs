use std::collections::HashMap;

use crate::models::StripeEnvironment;

use super::types::{Charge, Customer, Invoice, PaymentIntent, PaymentRecord, Subscription};
use super::{ApiError, ApiResult, PaymentGateway};

#[derive(Default)]
pub(crate) struct FakeGateway {
    pub environment: StripeEnvironment,
    pub customers: HashMap<String, Customer>,
    pub payments: HashMap<String, PaymentRecord>,
    pub subscriptions: HashMap<String, Subscription>,
    pub charges: Vec<Charge>,
    pub invoices: Vec<Invoice>,
    pub subscription_list: Vec<Subscription>,
    pub payment_intents: Vec<PaymentIntent>,
    /// Bulk lists that fail: "charges", "invoices", "subscriptions", "payment_intents".
    pub failing_lists: Vec<&'static str>,
}

fn missing(kind: &str, id: &str) -> ApiError {
    ApiError {
        message: format!("No such {kind}: '{id}'"),
        error_type: "invalid_request_error".to_string(),
        code: Some("resource_missing".to_string()),
        status: Some(404),
    }
}

impl FakeGateway {
    pub fn new(environment: StripeEnvironment) -> Self {
        Self {
            environment,
            ..Self::default()
        }
    }

    fn list_or_fail<T: Clone>(&self, name: &str, items: &[T]) -> ApiResult<Vec<T>> {
        if self.failing_lists.iter().any(|l| *l == name) {
            return Err(ApiError::new("service unavailable", "api_error", None));
        }
        Ok(items.to_vec())
    }
}

impl PaymentGateway for FakeGateway {
    fn environment(&self) -> StripeEnvironment {
        self.environment
    }

    fn get_customer(&self, id: &str) -> ApiResult<Customer> {
        self.customers.get(id).cloned().ok_or_else(|| missing("customer", id))
    }

    fn get_payment_record(&self, id: &str) -> ApiResult<PaymentRecord> {
        self.payments.get(id).cloned().ok_or_else(|| missing("payment_intent", id))
    }

    fn get_subscription(&self, id: &str) -> ApiResult<Subscription> {
        self.subscriptions.get(id).cloned().ok_or_else(|| missing("subscription", id))
    }

    fn list_charges(&self, _limit: u32) -> ApiResult<Vec<Charge>> {
        self.list_or_fail("charges", &self.charges)
    }

    fn list_invoices(&self, _limit: u32) -> ApiResult<Vec<Invoice>> {
        self.list_or_fail("invoices", &self.invoices)
    }

    fn list_subscriptions(&self, _limit: u32) -> ApiResult<Vec<Subscription>> {
        self.list_or_fail("subscriptions", &self.subscription_list)
    }

    fn list_payment_intents(&self, _limit: u32) -> ApiResult<Vec<PaymentIntent>> {
        self.list_or_fail("payment_intents", &self.payment_intents)
    }
}

// Builders for Stripe-shaped records.

pub(crate) fn customer(id: &str) -> Customer {
    Customer {
        id: id.to_string(),
        name: None,
        email: None,
        created: Some(1_700_000_000),
        deleted: false,
    }
}

pub(crate) fn payment(id: &str, amount: i64, status: &str, created: i64) -> PaymentRecord {
    PaymentRecord {
        id: id.to_string(),
        object: if id.starts_with("pi_") { "payment_intent" } else { "charge" }.to_string(),
        amount,
        currency: "usd".to_string(),
        status: status.to_string(),
        created,
        customer: None,
        invoice: None,
        payment_intent: None,
        description: None,
        receipt_url: None,
    }
}

pub(crate) fn invoice(id: &str, customer: &str, amount_paid: i64, status: &str, created: i64) -> Invoice {
    Invoice {
        id: id.to_string(),
        number: None,
        customer: Some(customer.to_string()),
        status: Some(status.to_string()),
        amount_paid,
        currency: "usd".to_string(),
        created,
        description: None,
        subscription: None,
        hosted_invoice_url: None,
    }
}

pub(crate) fn subscription(
    id: &str,
    status: &str,
    created: i64,
    unit_amount: i64,
    interval: &str,
    interval_count: u32,
) -> Subscription {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "status": status,
        "customer": "cus_1",
        "created": created,
        "current_period_start": created,
        "current_period_end": created + 30 * 86_400,
        "latest_invoice": format!("in_{id}"),
        "items": {"data": [{
            "id": format!("si_{id}"),
            "price": {
                "id": format!("price_{id}"),
                "unit_amount": unit_amount,
                "currency": "usd",
                "recurring": {"interval": interval, "interval_count": interval_count}
            }
        }]}
    }))
    .unwrap()
}
