use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::models::StripeEnvironment;
use crate::settings::Settings;

use super::types::{Charge, Customer, Invoice, List, PaymentIntent, PaymentRecord, Subscription};
use super::{ApiError, ApiResult, PaymentGateway};

const STRIPE_API_BASE: &str = "https://api.stripe.com";
const USER_AGENT: &str = concat!("clerk/", env!("CARGO_PKG_VERSION"));
/// Stripe rejects list requests above this page size.
const MAX_PAGE_LIMIT: u32 = 100;

/// Blocking Stripe REST client bound to one environment's secret key.
pub struct StripeClient {
    http: reqwest::blocking::Client,
    api_key: String,
    base_url: String,
    environment: StripeEnvironment,
}

impl StripeClient {
    /// Client for `env`, with the secret key taken from that environment's
    /// variable and the timeout and base URL from settings.
    pub fn for_environment(settings: &Settings, env: StripeEnvironment) -> Result<Self> {
        let api_key = Settings::resolve_api_key(env)?;
        let base_url = settings
            .stripe_api_base
            .clone()
            .unwrap_or_else(|| STRIPE_API_BASE.to_string());
        Self::with_base_url(
            api_key,
            env,
            base_url,
            Duration::from_secs(settings.request_timeout_secs),
        )
    }

    pub fn with_base_url(
        api_key: String,
        environment: StripeEnvironment,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            environment,
        })
    }

    fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> ApiResult<T> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(env = %self.environment, %url, "stripe request");

        let resp = self
            .http
            .get(&url)
            .basic_auth(&self.api_key, Some(""))
            .query(query)
            .send()
            .map_err(transport_error)?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let body: serde_json::Value = resp.json().unwrap_or(serde_json::Value::Null);
            return Err(ApiError::from_response(status, &body));
        }

        resp.json::<T>().map_err(|e| ApiError {
            message: format!("malformed Stripe response: {e}"),
            error_type: "api_error".to_string(),
            code: None,
            status: Some(status),
        })
    }

    fn list<T: DeserializeOwned>(
        &self,
        path: &str,
        limit: u32,
        extra: &[(&str, &str)],
    ) -> ApiResult<Vec<T>> {
        let mut query = vec![("limit", limit.clamp(1, MAX_PAGE_LIMIT).to_string())];
        query.extend(extra.iter().map(|(k, v)| (*k, v.to_string())));
        let page: List<T> = self.get(path, &query)?;
        if page.has_more {
            tracing::debug!(%path, returned = page.data.len(), "stripe list truncated to one page");
        }
        Ok(page.data)
    }
}

fn transport_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::new("request to Stripe timed out", "api_connection_error", Some("timeout"))
    } else {
        ApiError::new(
            format!("could not reach Stripe: {e}"),
            "api_connection_error",
            None,
        )
    }
}

impl PaymentGateway for StripeClient {
    fn environment(&self) -> StripeEnvironment {
        self.environment
    }

    fn get_customer(&self, id: &str) -> ApiResult<Customer> {
        self.get(&format!("/v1/customers/{id}"), &[])
    }

    fn get_payment_record(&self, id: &str) -> ApiResult<PaymentRecord> {
        if id.starts_with("pi_") {
            self.get(&format!("/v1/payment_intents/{id}"), &[])
        } else {
            self.get(&format!("/v1/charges/{id}"), &[])
        }
    }

    fn get_subscription(&self, id: &str) -> ApiResult<Subscription> {
        self.get(&format!("/v1/subscriptions/{id}"), &[])
    }

    fn list_charges(&self, limit: u32) -> ApiResult<Vec<Charge>> {
        self.list("/v1/charges", limit, &[])
    }

    fn list_invoices(&self, limit: u32) -> ApiResult<Vec<Invoice>> {
        self.list("/v1/invoices", limit, &[])
    }

    fn list_subscriptions(&self, limit: u32) -> ApiResult<Vec<Subscription>> {
        self.list("/v1/subscriptions", limit, &[("status", "all")])
    }

    fn list_payment_intents(&self, limit: u32) -> ApiResult<Vec<PaymentIntent>> {
        self.list("/v1/payment_intents", limit, &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client(server: &MockServer) -> StripeClient {
        StripeClient::with_base_url(
            "sk_test_key".into(),
            StripeEnvironment::Test,
            server.base_url(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn list_response(data: Vec<serde_json::Value>) -> serde_json::Value {
        serde_json::json!({"object": "list", "data": data, "has_more": false})
    }

    #[test]
    fn test_payment_intent_routes_by_prefix() {
        let server = MockServer::start();
        let pi_mock = server.mock(|when, then| {
            when.method(GET).path("/v1/payment_intents/pi_1");
            then.status(200).json_body(serde_json::json!({
                "id": "pi_1", "object": "payment_intent", "amount": 50000,
                "currency": "usd", "status": "succeeded", "created": 1700000000,
                "customer": "cus_1"
            }));
        });
        let ch_mock = server.mock(|when, then| {
            when.method(GET).path("/v1/charges/ch_1");
            then.status(200).json_body(serde_json::json!({
                "id": "ch_1", "object": "charge", "amount": 1500,
                "currency": "usd", "status": "failed", "created": 1700000100
            }));
        });

        let c = client(&server);
        let pi = c.get_payment_record("pi_1").unwrap();
        let ch = c.get_payment_record("ch_1").unwrap();

        pi_mock.assert();
        ch_mock.assert();
        assert_eq!(pi.amount, 50000);
        assert_eq!(pi.customer.as_deref(), Some("cus_1"));
        assert_eq!(ch.status, "failed");
    }

    #[test]
    fn test_not_found_maps_to_api_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v1/customers/cus_missing");
            then.status(404).json_body(serde_json::json!({
                "error": {
                    "type": "invalid_request_error",
                    "code": "resource_missing",
                    "message": "No such customer: 'cus_missing'"
                }
            }));
        });

        let err = client(&server).get_customer("cus_missing").unwrap_err();
        assert_eq!(err.status, Some(404));
        assert_eq!(err.code.as_deref(), Some("resource_missing"));
        assert_eq!(err.error_type, "invalid_request_error");
    }

    #[test]
    fn test_list_subscriptions_requests_all_statuses() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v1/subscriptions")
                .query_param("status", "all")
                .query_param("limit", "100");
            then.status(200).json_body(list_response(vec![serde_json::json!({
                "id": "sub_1", "status": "canceled", "customer": "cus_1",
                "created": 1700000000, "items": {"data": []}
            })]));
        });

        let subs = client(&server).list_subscriptions(500).unwrap();
        mock.assert();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].status, "canceled");
    }

    #[test]
    fn test_sends_basic_auth() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v1/charges")
                .header_exists("authorization");
            then.status(200).json_body(list_response(vec![]));
        });

        let charges = client(&server).list_charges(10).unwrap();
        mock.assert();
        assert!(charges.is_empty());
    }

    #[test]
    fn test_malformed_body_is_api_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v1/invoices");
            then.status(200).body("not json");
        });

        let err = client(&server).list_invoices(10).unwrap_err();
        assert_eq!(err.error_type, "api_error");
        assert!(err.message.contains("malformed"), "message: {}", err.message);
    }

    #[test]
    fn test_unreachable_host_is_connection_error() {
        let c = StripeClient::with_base_url(
            "sk_test_key".into(),
            StripeEnvironment::Test,
            "http://127.0.0.1:9".into(),
            Duration::from_secs(2),
        )
        .unwrap();
        let err = c.get_subscription("sub_1").unwrap_err();
        assert_eq!(err.error_type, "api_connection_error");
    }

    #[test]
    fn test_slow_response_is_timeout_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v1/subscriptions/sub_slow");
            then.status(200)
                .delay(Duration::from_secs(3))
                .json_body(serde_json::json!({"id": "sub_slow", "status": "active"}));
        });
        let c = StripeClient::with_base_url(
            "sk_test_key".into(),
            StripeEnvironment::Test,
            server.base_url(),
            Duration::from_millis(300),
        )
        .unwrap();

        let err = c.get_subscription("sub_slow").unwrap_err();
        assert_eq!(err.error_type, "api_connection_error");
        assert_eq!(err.code.as_deref(), Some("timeout"));
        assert_eq!(err.status, None);
    }

    #[test]
    fn test_list_returns_first_page_when_more_exist() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v1/charges");
            then.status(200).json_body(serde_json::json!({
                "object": "list", "has_more": true,
                "data": [{"id": "ch_1", "amount": 100, "status": "succeeded", "created": 1700000000}]
            }));
        });

        let charges = client(&server).list_charges(1).unwrap();
        assert_eq!(charges.len(), 1);
        assert_eq!(charges[0].id, "ch_1");
    }
}
