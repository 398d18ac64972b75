use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::db::open_default;
use crate::error::{ClerkError, Result};
use crate::fmt::money;
use crate::ledger::{
    build_ledger, filter_ledger, find_transaction, merge_transactions, reassign_transaction,
    write_csv, Bucket, Ledger, LedgerFilter, Transaction,
};
use crate::models::{ClientFilter, ExpenseFilter};
use crate::settings::load_settings;
use crate::store::Store;
use crate::stripe::StripeClient;

use super::LedgerFilterArgs;

fn load_ledger() -> Result<Ledger> {
    let settings = load_settings();
    let conn = open_default()?;
    let gateway = StripeClient::for_environment(&settings, settings.stripe_environment)?;
    build_ledger(&gateway, &conn, settings.fetch_limit)
}

impl LedgerFilterArgs {
    fn to_filter(&self) -> Result<LedgerFilter> {
        Ok(LedgerFilter {
            tx_type: self.tx_type.parse().map_err(ClerkError::Validation)?,
            status: self.status.clone(),
            client_id: self.client,
            from: self.from,
            to: self.to,
            search: self.search.clone(),
        })
    }
}

fn amount_cell(amount: f64) -> String {
    if amount < 0.0 {
        money(amount.abs()).red().to_string()
    } else if amount > 0.0 {
        money(amount).green().to_string()
    } else {
        money(amount)
    }
}

fn client_label(tx: &Transaction) -> String {
    match &tx.client {
        Some(c) if c.is_multiple() => format!("{} (shared)", c.business_name()),
        Some(c) => c.business_name().to_string(),
        None => String::new(),
    }
}

fn transactions_table(txs: &[Transaction]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Date", "ID", "Type", "Description", "Client", "Amount", "Status"]);
    for tx in txs {
        table.add_row(vec![
            Cell::new(tx.date.format("%Y-%m-%d")),
            Cell::new(&tx.id),
            Cell::new(tx.tx_type),
            Cell::new(&tx.description),
            Cell::new(client_label(tx)),
            Cell::new(amount_cell(tx.amount)),
            Cell::new(&tx.status),
        ]);
    }
    table
}

pub fn list(args: &LedgerFilterArgs, json: bool) -> Result<()> {
    let filter = args.to_filter()?;
    let ledger = load_ledger()?;
    let txs = filter_ledger(&ledger.transactions, &filter);

    if json {
        println!("{}", serde_json::to_string_pretty(&txs)?);
        return Ok(());
    }
    if txs.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }
    println!("Transactions\n{}", transactions_table(&txs));
    println!("{} transaction(s)", txs.len());
    Ok(())
}

fn bucket_table<'a>(label: &str, rows: impl Iterator<Item = (String, &'a Bucket)>) -> Table {
    let mut table = Table::new();
    table.set_header(vec![label, "Count", "Income", "Expenses"]);
    for (key, b) in rows {
        table.add_row(vec![
            Cell::new(key),
            Cell::new(b.count),
            Cell::new(money(b.income)),
            Cell::new(money(b.expenses)),
        ]);
    }
    table
}

pub fn summary(json: bool) -> Result<()> {
    let ledger = load_ledger()?;
    let s = &ledger.summary;

    if json {
        println!("{}", serde_json::to_string_pretty(s)?);
        return Ok(());
    }

    println!("Income:       {}", money(s.total_income).green());
    println!("Expenses:     {}", money(s.total_expenses).red());
    let net = if s.net >= 0.0 {
        money(s.net).green().bold()
    } else {
        money(s.net).red().bold()
    };
    println!("Net:          {net}");
    println!("Transactions: {}", s.count);
    println!();
    println!(
        "{}",
        bucket_table("Type", s.by_type.iter().map(|(k, b)| (k.to_string(), b)))
    );
    println!(
        "{}",
        bucket_table("Status", s.by_status.iter().map(|(k, b)| (k.clone(), b)))
    );
    println!(
        "{}",
        bucket_table("Month", s.by_month.iter().rev().map(|(k, b)| (k.clone(), b)))
    );
    if !s.recent.is_empty() {
        println!("Recent\n{}", transactions_table(&s.recent));
    }
    Ok(())
}

/// Reassignment only touches local expenses, so it works from the store
/// alone without calling Stripe.
pub fn assign(transaction_id: &str, client_id: Option<i64>) -> Result<()> {
    let conn = open_default()?;
    let clients = conn.list_clients(&ClientFilter::default())?;
    let expenses = conn.list_expenses(&ExpenseFilter::default())?;
    let local = merge_transactions(&clients, &[], &expenses, &[], &[], &[]);

    let Ok(tx) = find_transaction(&local, transaction_id) else {
        if ["charge_", "invoice_", "subscription_"]
            .iter()
            .any(|p| transaction_id.starts_with(p))
        {
            return Err(ClerkError::Validation(format!(
                "{transaction_id} comes from Stripe; link the client's customer id instead"
            )));
        }
        return Err(ClerkError::Other(format!("No transaction with id {transaction_id}")));
    };
    reassign_transaction(&conn, tx, client_id)?;
    match client_id {
        Some(id) => println!("Assigned {transaction_id} to client #{id}"),
        None => println!("Unassigned {transaction_id}"),
    }
    Ok(())
}

pub fn export(args: &LedgerFilterArgs, output: Option<&str>) -> Result<()> {
    let filter = args.to_filter()?;
    let ledger = load_ledger()?;
    let txs = filter_ledger(&ledger.transactions, &filter);

    match output {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            write_csv(&txs, std::io::BufWriter::new(file))?;
            eprintln!("Exported {} transaction(s) to {path}", txs.len());
        }
        None => write_csv(&txs, std::io::stdout().lock())?,
    }
    Ok(())
}
