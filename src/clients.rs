use chrono::Utc;

use crate::error::{ClerkError, Result};
use crate::models::{Client, ClientUpdate, Note};
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    /// A payment intent or charge id.
    Payment,
    Subscription,
}

impl RefKind {
    fn label(&self) -> &'static str {
        match self {
            Self::Payment => "payment",
            Self::Subscription => "subscription",
        }
    }
}

/// Stripe ids are non-empty and made of ASCII letters, digits and underscores.
pub fn validate_stripe_id(id: &str) -> Result<&str> {
    let id = id.trim();
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ClerkError::Validation(format!("invalid Stripe id: {id:?}")));
    }
    Ok(id)
}

fn refs_of(client: &Client, kind: RefKind) -> &Vec<String> {
    match kind {
        RefKind::Payment => &client.stripe_payment_intent_ids,
        RefKind::Subscription => &client.stripe_subscription_ids,
    }
}

fn with_refs(kind: RefKind, ids: Vec<String>) -> ClientUpdate {
    match kind {
        RefKind::Payment => ClientUpdate {
            stripe_payment_intent_ids: Some(ids),
            ..ClientUpdate::default()
        },
        RefKind::Subscription => ClientUpdate {
            stripe_subscription_ids: Some(ids),
            ..ClientUpdate::default()
        },
    }
}

/// Append a reference. An id already on the client is rejected.
pub fn add_reference<S: Store>(store: &S, client_id: i64, kind: RefKind, id: &str) -> Result<Client> {
    let id = validate_stripe_id(id)?;
    let client = store.get_client(client_id)?;
    let mut ids = refs_of(&client, kind).clone();
    if ids.iter().any(|existing| existing == id) {
        return Err(ClerkError::Validation(format!(
            "{} {id} is already linked to {}",
            kind.label(),
            client.business_name
        )));
    }
    ids.push(id.to_string());
    store.update_client(client_id, &with_refs(kind, ids))
}

pub fn remove_reference<S: Store>(store: &S, client_id: i64, kind: RefKind, id: &str) -> Result<Client> {
    let client = store.get_client(client_id)?;
    let mut ids = refs_of(&client, kind).clone();
    let before = ids.len();
    ids.retain(|existing| existing != id.trim());
    if ids.len() == before {
        return Err(ClerkError::Validation(format!(
            "{} {} is not linked to {}",
            kind.label(),
            id.trim(),
            client.business_name
        )));
    }
    store.update_client(client_id, &with_refs(kind, ids))
}

/// Set or clear the Stripe customer id.
pub fn set_customer<S: Store>(store: &S, client_id: i64, customer: Option<&str>) -> Result<Client> {
    let customer = customer.map(validate_stripe_id).transpose()?;
    store.update_client(
        client_id,
        &ClientUpdate {
            stripe_customer_id: Some(customer.map(str::to_string)),
            ..ClientUpdate::default()
        },
    )
}

pub fn append_note<S: Store>(store: &S, client_id: i64, text: &str) -> Result<Client> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ClerkError::Validation("note text is required".to_string()));
    }
    let client = store.get_client(client_id)?;
    let mut notes = client.notes;
    notes.push(Note {
        at: Utc::now(),
        text: text.to_string(),
    });
    store.update_client(
        client_id,
        &ClientUpdate {
            notes: Some(notes),
            ..ClientUpdate::default()
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;
    use crate::models::NewClient;
    use rusqlite::Connection;

    fn client(conn: &Connection) -> Client {
        conn.create_client(&NewClient {
            business_name: "Acme".to_string(),
            ..NewClient::default()
        })
        .unwrap()
    }

    #[test]
    fn test_validate_stripe_id() {
        assert_eq!(validate_stripe_id(" pi_123 ").unwrap(), "pi_123");
        assert!(validate_stripe_id("").is_err());
        assert!(validate_stripe_id("pi-123").is_err());
        assert!(validate_stripe_id("pi_1; DROP").is_err());
    }

    #[test]
    fn test_add_reference_keeps_order_and_rejects_duplicates() {
        let (_dir, conn) = test_db();
        let c = client(&conn);
        add_reference(&conn, c.id, RefKind::Payment, "pi_2").unwrap();
        let updated = add_reference(&conn, c.id, RefKind::Payment, "pi_1").unwrap();
        assert_eq!(updated.stripe_payment_intent_ids, vec!["pi_2", "pi_1"]);

        let err = add_reference(&conn, c.id, RefKind::Payment, "pi_2").unwrap_err();
        assert!(err.to_string().contains("already linked"));
        assert!(updated.stripe_subscription_ids.is_empty());
    }

    #[test]
    fn test_remove_reference() {
        let (_dir, conn) = test_db();
        let c = client(&conn);
        add_reference(&conn, c.id, RefKind::Subscription, "sub_1").unwrap();
        add_reference(&conn, c.id, RefKind::Subscription, "sub_2").unwrap();
        let updated = remove_reference(&conn, c.id, RefKind::Subscription, "sub_1").unwrap();
        assert_eq!(updated.stripe_subscription_ids, vec!["sub_2"]);
        assert!(remove_reference(&conn, c.id, RefKind::Subscription, "sub_1").is_err());
    }

    #[test]
    fn test_references_on_unknown_client() {
        let (_dir, conn) = test_db();
        assert!(matches!(
            add_reference(&conn, 42, RefKind::Payment, "pi_1"),
            Err(ClerkError::UnknownClient(42))
        ));
    }

    #[test]
    fn test_set_and_clear_customer() {
        let (_dir, conn) = test_db();
        let c = client(&conn);
        let set = set_customer(&conn, c.id, Some("cus_9")).unwrap();
        assert_eq!(set.stripe_customer_id.as_deref(), Some("cus_9"));
        let cleared = set_customer(&conn, c.id, None).unwrap();
        assert!(cleared.stripe_customer_id.is_none());
        assert!(set_customer(&conn, c.id, Some("cus 9")).is_err());
    }

    #[test]
    fn test_notes_are_appended() {
        let (_dir, conn) = test_db();
        let c = client(&conn);
        append_note(&conn, c.id, "first call").unwrap();
        let updated = append_note(&conn, c.id, "  sent invoice ").unwrap();
        let texts: Vec<&str> = updated.notes.iter().map(|n| n.text.as_str()).collect();
        assert_eq!(texts, vec!["first call", "sent invoice"]);
        assert!(append_note(&conn, c.id, "   ").is_err());
    }
}
