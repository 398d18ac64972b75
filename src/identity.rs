use serde::Serialize;

use crate::models::Client;

/// A local client (or clients) that a Stripe record belongs to.
///
/// Several clients may share one Stripe customer (a shared billing account),
/// so a lookup can resolve to more than one record. That case is kept
/// explicit instead of picking one of them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ClientMatch {
    Single {
        id: i64,
        business_name: String,
        contact_name: Option<String>,
        email: Option<String>,
    },
    Multiple {
        /// Comma-joined client ids.
        id: String,
        /// Comma-joined business names.
        business_name: String,
        multiple_matches: bool,
        client_count: usize,
        #[serde(skip)]
        client_ids: Vec<i64>,
    },
}

impl ClientMatch {
    pub fn single(client: &Client) -> Self {
        Self::Single {
            id: client.id,
            business_name: client.business_name.clone(),
            contact_name: client.contact_name.clone(),
            email: client.email.clone(),
        }
    }

    fn multiple(clients: &[&Client]) -> Self {
        let ids: Vec<i64> = clients.iter().map(|c| c.id).collect();
        Self::Multiple {
            id: ids.iter().map(i64::to_string).collect::<Vec<_>>().join(","),
            business_name: clients
                .iter()
                .map(|c| c.business_name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            multiple_matches: true,
            client_count: clients.len(),
            client_ids: ids,
        }
    }

    pub fn business_name(&self) -> &str {
        match self {
            Self::Single { business_name, .. } | Self::Multiple { business_name, .. } => business_name,
        }
    }

    pub fn contains(&self, client_id: i64) -> bool {
        match self {
            Self::Single { id, .. } => *id == client_id,
            Self::Multiple { client_ids, .. } => client_ids.contains(&client_id),
        }
    }

    pub fn is_multiple(&self) -> bool {
        matches!(self, Self::Multiple { .. })
    }
}

/// Clients whose `stripe_customer_id` equals `customer_ref` exactly.
pub fn map_client(customer_ref: &str, clients: &[Client]) -> Option<ClientMatch> {
    let matched: Vec<&Client> = clients
        .iter()
        .filter(|c| c.stripe_customer_id.as_deref() == Some(customer_ref))
        .collect();
    match matched.as_slice() {
        [] => None,
        [one] => Some(ClientMatch::single(one)),
        many => Some(ClientMatch::multiple(many)),
    }
}

/// First client whose stored payment intent ids include `payment_intent`.
pub fn find_by_payment_intent(payment_intent: &str, clients: &[Client]) -> Option<ClientMatch> {
    clients
        .iter()
        .find(|c| c.stripe_payment_intent_ids.iter().any(|id| id == payment_intent))
        .map(ClientMatch::single)
}

#[cfg(test)]
pub(crate) fn test_client(id: i64, name: &str, customer: Option<&str>) -> Client {
    use crate::models::{ClientStatus, PaymentStatus, StripeEnvironment};
    Client {
        id,
        business_name: name.to_string(),
        contact_name: None,
        email: Some(format!("{}@example.com", name.to_lowercase())),
        phone: None,
        website: None,
        status: ClientStatus::Active,
        payment_status: PaymentStatus::Overdue,
        stripe_environment: StripeEnvironment::Test,
        stripe_customer_id: customer.map(str::to_string),
        stripe_payment_intent_ids: vec![],
        stripe_subscription_ids: vec![],
        total_paid: 0.0,
        subscription_monthly_value: 0.0,
        subscription_status: None,
        last_payment_date: None,
        notes: vec![],
        sync_errors: None,
        last_synced_at: None,
        created_at: chrono::Utc::now(),
    }
}
