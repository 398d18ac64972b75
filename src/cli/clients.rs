use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::clients::{add_reference, append_note, remove_reference, set_customer, RefKind};
use crate::db::open_default;
use crate::error::{ClerkError, Result};
use crate::fmt::money;
use crate::models::{
    Client, ClientFilter, ClientStatus, ClientUpdate, NewClient, PaymentStatus,
    StripeEnvironment, SyncErrors,
};
use crate::settings::load_settings;
use crate::store::Store;

use super::RefKindArg;

pub struct ContactFields {
    pub contact: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
}

pub fn add(
    business_name: &str,
    contact: ContactFields,
    env: Option<StripeEnvironment>,
    customer: Option<&str>,
) -> Result<()> {
    let conn = open_default()?;
    let customer = customer
        .map(crate::clients::validate_stripe_id)
        .transpose()?
        .map(str::to_string);
    let client = conn.create_client(&NewClient {
        business_name: business_name.to_string(),
        contact_name: contact.contact,
        email: contact.email,
        phone: contact.phone,
        website: contact.website,
        stripe_environment: env.unwrap_or(load_settings().stripe_environment),
        stripe_customer_id: customer,
    })?;
    println!(
        "Added client #{}: {} ({})",
        client.id, client.business_name, client.stripe_environment
    );
    Ok(())
}

pub(crate) fn payment_status_cell(status: PaymentStatus) -> String {
    match status {
        PaymentStatus::Current => status.as_str().green().to_string(),
        PaymentStatus::PastDue => status.as_str().yellow().to_string(),
        PaymentStatus::Overdue | PaymentStatus::Cancelled => status.as_str().red().to_string(),
    }
}

pub fn list(
    status: Option<ClientStatus>,
    env: Option<StripeEnvironment>,
    payment_status: Option<PaymentStatus>,
) -> Result<()> {
    let conn = open_default()?;
    let clients = conn.list_clients(&ClientFilter {
        status,
        environment: env,
        payment_status,
    })?;

    if clients.is_empty() {
        println!("No clients found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        "ID", "Business", "Env", "Status", "Payment", "Subscription", "Total Paid", "Monthly",
        "Last Sync",
    ]);
    for c in &clients {
        table.add_row(vec![
            Cell::new(c.id),
            Cell::new(&c.business_name),
            Cell::new(c.stripe_environment),
            Cell::new(c.status),
            Cell::new(payment_status_cell(c.payment_status)),
            Cell::new(c.subscription_status.map(|s| s.as_str()).unwrap_or("-")),
            Cell::new(money(c.total_paid)),
            Cell::new(money(c.subscription_monthly_value)),
            Cell::new(
                c.last_synced_at
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "never".to_string()),
            ),
        ]);
    }
    println!("Clients\n{table}");
    Ok(())
}

pub(crate) fn print_sync_errors(errors: &SyncErrors) {
    println!("{}", "Some Stripe records could not be fetched:".yellow().bold());
    if let Some(e) = &errors.customer {
        println!("  customer {}: {}", e.id, e.message);
    }
    for e in &errors.payment_intents {
        println!("  payment {}: {}", e.id, e.message);
    }
    for e in &errors.subscriptions {
        println!("  subscription {}: {}", e.id, e.message);
    }
}

fn print_client(c: &Client) {
    let opt = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    println!("{} (#{})", c.business_name.bold(), c.id);
    println!("Contact:       {}", opt(&c.contact_name));
    println!("Email:         {}", opt(&c.email));
    println!("Phone:         {}", opt(&c.phone));
    println!("Website:       {}", opt(&c.website));
    println!("Status:        {}", c.status);
    println!();
    println!("Environment:   {}", c.stripe_environment);
    println!("Customer:      {}", opt(&c.stripe_customer_id));
    println!("Payments:      {}", c.stripe_payment_intent_ids.join(", "));
    println!("Subscriptions: {}", c.stripe_subscription_ids.join(", "));
    println!();
    println!("Total paid:    {}", money(c.total_paid));
    println!("Monthly value: {}", money(c.subscription_monthly_value));
    println!("Payment:       {}", payment_status_cell(c.payment_status));
    println!(
        "Subscription:  {}",
        c.subscription_status.map(|s| s.as_str()).unwrap_or("-")
    );
    println!(
        "Last payment:  {}",
        c.last_payment_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    println!(
        "Last sync:     {}",
        c.last_synced_at
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".to_string())
    );

    if let Some(errors) = &c.sync_errors {
        println!();
        print_sync_errors(errors);
    }

    if !c.notes.is_empty() {
        println!();
        println!("Notes");
        for note in &c.notes {
            println!("  {}  {}", note.at.format("%Y-%m-%d %H:%M"), note.text);
        }
    }
}

pub fn show(id: i64) -> Result<()> {
    let conn = open_default()?;
    print_client(&conn.get_client(id)?);
    Ok(())
}

/// Empty strings clear an optional field.
fn nullable(v: Option<String>) -> Option<Option<String>> {
    v.map(|s| {
        let s = s.trim().to_string();
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    })
}

pub fn edit(
    id: i64,
    name: Option<String>,
    contact: ContactFields,
    status: Option<ClientStatus>,
    env: Option<StripeEnvironment>,
) -> Result<()> {
    let conn = open_default()?;
    if let Some(n) = &name {
        if n.trim().is_empty() {
            return Err(ClerkError::Validation("business name cannot be empty".to_string()));
        }
    }
    let client = conn.update_client(
        id,
        &ClientUpdate {
            business_name: name.map(|n| n.trim().to_string()),
            contact_name: nullable(contact.contact),
            email: nullable(contact.email),
            phone: nullable(contact.phone),
            website: nullable(contact.website),
            status,
            stripe_environment: env,
            ..ClientUpdate::default()
        },
    )?;
    println!("Updated client #{}: {}", client.id, client.business_name);
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let conn = open_default()?;
    let client = conn.get_client(id)?;
    conn.delete_client(id)?;
    println!("Deleted client #{id}: {}", client.business_name);
    Ok(())
}

pub fn note(id: i64, text: &str) -> Result<()> {
    let conn = open_default()?;
    let client = append_note(&conn, id, text)?;
    println!("Added note to {} ({} total)", client.business_name, client.notes.len());
    Ok(())
}

pub fn ref_add(id: i64, kind: RefKindArg, stripe_id: &str) -> Result<()> {
    let conn = open_default()?;
    let client = match kind {
        RefKindArg::Payment => add_reference(&conn, id, RefKind::Payment, stripe_id)?,
        RefKindArg::Subscription => add_reference(&conn, id, RefKind::Subscription, stripe_id)?,
        RefKindArg::Customer => set_customer(&conn, id, Some(stripe_id))?,
    };
    println!("Linked {} to {}", stripe_id.trim(), client.business_name);
    Ok(())
}

pub fn ref_remove(id: i64, kind: RefKindArg, stripe_id: &str) -> Result<()> {
    let conn = open_default()?;
    let client = match kind {
        RefKindArg::Payment => remove_reference(&conn, id, RefKind::Payment, stripe_id)?,
        RefKindArg::Subscription => remove_reference(&conn, id, RefKind::Subscription, stripe_id)?,
        RefKindArg::Customer => {
            let current = conn.get_client(id)?;
            if current.stripe_customer_id.as_deref() != Some(stripe_id.trim()) {
                return Err(ClerkError::Validation(format!(
                    "customer {} is not linked to {}",
                    stripe_id.trim(),
                    current.business_name
                )));
            }
            set_customer(&conn, id, None)?
        }
    };
    println!("Unlinked {} from {}", stripe_id.trim(), client.business_name);
    Ok(())
}
