use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::db::open_default;
use crate::error::{ClerkError, Result};
use crate::fmt::money;
use crate::settings::load_settings;
use crate::store::Store;
use crate::stripe::StripeClient;
use crate::sync::{AutoSync, Reconciler, SyncReferences, SyncResult};

use super::clients::{payment_status_cell, print_sync_errors};

fn print_result(result: &SyncResult) {
    let s = &result.summary;
    println!(
        "{} (#{}, {})",
        result.client.business_name.bold(),
        result.client.id,
        s.environment
    );
    println!("  Total paid:    ${}", s.total_paid);
    println!("  Monthly value: ${}", s.subscription_monthly_value);
    println!("  Payments:      {} succeeded", s.succeeded_payments);
    println!("  Subscriptions: {}", s.subscription_count);
    println!("  Payment:       {}", payment_status_cell(s.payment_status));
    println!("  Subscription:  {}", s.subscription_status);

    if !s.subscriptions.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Subscription", "Amount", "Every", "Monthly", "Est. Paid", "Status", "Started"]);
        for d in &s.subscriptions {
            table.add_row(vec![
                Cell::new(&d.id),
                Cell::new(money(d.amount)),
                Cell::new(format!("{} {}", d.interval_count, d.interval.as_str())),
                Cell::new(money(d.monthly_equivalent)),
                Cell::new(money(d.total_paid)),
                Cell::new(&d.status),
                Cell::new(d.start_date.format("%Y-%m-%d")),
            ]);
        }
        println!("{table}");
    }

    if s.has_errors {
        print_sync_errors(&s.errors);
    }
}

pub fn run(client_ids: &[i64], all: bool) -> Result<()> {
    let settings = load_settings();
    let conn = open_default()?;
    let gateway = StripeClient::for_environment(&settings, settings.stripe_environment)?;
    let engine = Reconciler::new(&gateway, &conn);

    if all {
        let report = engine.sync_all()?;
        for result in &report.results {
            print_result(result);
            println!();
        }
        for (id, err) in &report.failures {
            println!("{} client #{id}: {err}", "Failed".red().bold());
        }
        println!(
            "Synced {} client(s), {} failed, {} without Stripe references.",
            report.results.len(),
            report.failures.len(),
            report.skipped
        );
        if !report.failures.is_empty() {
            return Err(ClerkError::Other(format!(
                "{} client(s) could not be synced",
                report.failures.len()
            )));
        }
        return Ok(());
    }

    let mut auto = AutoSync::new();
    for &id in client_ids {
        let client = conn.get_client(id)?;
        if let Some(result) = auto.sync_once(&engine, id, &SyncReferences::from_client(&client))? {
            print_result(&result);
            println!();
        }
    }
    Ok(())
}
