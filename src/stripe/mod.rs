mod client;
#[cfg(test)]
pub(crate) mod fake;
mod types;

pub use client::StripeClient;
pub use types::{Charge, Customer, Interval, Invoice, PaymentRecord, Subscription};

use types::PaymentIntent;

use crate::models::{FetchError, StripeEnvironment};

/// Error returned by Stripe for one request, or a transport failure
/// reported in the same shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub message: String,
    pub error_type: String,
    pub code: Option<String>,
    pub status: Option<u16>,
}

impl ApiError {
    pub fn new(message: impl Into<String>, error_type: impl Into<String>, code: Option<&str>) -> Self {
        Self {
            message: message.into(),
            error_type: error_type.into(),
            code: code.map(str::to_string),
            status: None,
        }
    }

    /// Build from a non-2xx response body (`{"error": {...}}`).
    pub fn from_response(status: u16, body: &serde_json::Value) -> Self {
        let err = &body["error"];
        Self {
            message: err["message"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {status}")),
            error_type: err["type"].as_str().unwrap_or("api_error").to_string(),
            code: err["code"].as_str().map(str::to_string),
            status: Some(status),
        }
    }

    pub fn into_fetch_error(self, id: &str) -> FetchError {
        FetchError {
            id: id.to_string(),
            message: self.message,
            error_type: self.error_type,
            code: self.code,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.error_type)
    }
}

impl std::error::Error for ApiError {}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Stripe operations for one account. An instance is bound to a single
/// environment for its whole lifetime.
pub trait PaymentGateway: Sync {
    fn environment(&self) -> StripeEnvironment;

    fn get_customer(&self, id: &str) -> ApiResult<Customer>;

    /// Retrieve a one-time payment by id: a payment intent (`pi_`) or a charge.
    fn get_payment_record(&self, id: &str) -> ApiResult<PaymentRecord>;

    fn get_subscription(&self, id: &str) -> ApiResult<Subscription>;

    fn list_charges(&self, limit: u32) -> ApiResult<Vec<Charge>>;

    fn list_invoices(&self, limit: u32) -> ApiResult<Vec<Invoice>>;

    /// Subscriptions in every status, canceled included.
    fn list_subscriptions(&self, limit: u32) -> ApiResult<Vec<Subscription>>;

    fn list_payment_intents(&self, limit: u32) -> ApiResult<Vec<PaymentIntent>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_from_response() {
        let body = serde_json::json!({
            "error": {
                "type": "invalid_request_error",
                "code": "resource_missing",
                "message": "No such payment_intent: 'pi_2'"
            }
        });
        let err = ApiError::from_response(404, &body);
        assert_eq!(err.error_type, "invalid_request_error");
        assert_eq!(err.code.as_deref(), Some("resource_missing"));
        assert_eq!(err.status, Some(404));

        let fetch = err.into_fetch_error("pi_2");
        assert_eq!(fetch.id, "pi_2");
        assert!(fetch.message.contains("No such payment_intent"));
    }

    #[test]
    fn test_api_error_from_unparsable_body() {
        let err = ApiError::from_response(502, &serde_json::Value::Null);
        assert_eq!(err.message, "HTTP 502");
        assert_eq!(err.error_type, "api_error");
        assert!(err.code.is_none());
    }
}
