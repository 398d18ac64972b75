use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Write;
use std::thread;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use crate::error::{ClerkError, Result};
use crate::fmt::{fixed2, money};
use crate::identity::{find_by_payment_intent, map_client, ClientMatch};
use crate::models::{
    Client, ClientFilter, Expense, ExpenseCategory, ExpenseFilter, RecurringFrequency,
};
use crate::normalize::{epoch_to_datetime, normalize_amount};
use crate::store::Store;
use crate::stripe::{ApiResult, Charge, Invoice, PaymentGateway, Subscription};

const RECENT_COUNT: usize = 5;

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Expense,
    Charge,
    Invoice,
    Subscription,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Charge => "charge",
            Self::Invoice => "invoice",
            Self::Subscription => "subscription",
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s {
            "expense" => Ok(Self::Expense),
            "charge" => Ok(Self::Charge),
            "invoice" => Ok(Self::Invoice),
            "subscription" => Ok(Self::Subscription),
            other => Err(format!("unknown transaction type: {other}")),
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source-specific details carried alongside a transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum TransactionMetadata {
    Expense {
        expense_id: i64,
        category: ExpenseCategory,
        is_recurring: bool,
        recurring_frequency: Option<RecurringFrequency>,
        next_due_date: Option<NaiveDate>,
    },
    Charge {
        customer: Option<String>,
        payment_intent: Option<String>,
        invoice: Option<String>,
        receipt_url: Option<String>,
    },
    Invoice {
        customer: Option<String>,
        number: Option<String>,
        subscription: Option<String>,
        hosted_invoice_url: Option<String>,
    },
    Subscription {
        customer: Option<String>,
        current_period_start: Option<DateTime<Utc>>,
        current_period_end: Option<DateTime<Utc>>,
        trial_end: Option<DateTime<Utc>>,
        latest_invoice: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub id: String,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub description: String,
    /// Major units. Expenses are negative, income positive, subscriptions 0.
    pub amount: f64,
    pub currency: String,
    pub status: String,
    pub date: DateTime<Utc>,
    pub client: Option<ClientMatch>,
    pub metadata: TransactionMetadata,
    pub stripe_id: Option<String>,
}

fn expense_status(e: &Expense) -> &'static str {
    match (e.is_recurring, e.is_paused) {
        (true, false) => "recurring",
        (true, true) => "paused",
        (false, _) => "completed",
    }
}

fn expense_entry(e: &Expense, clients_by_id: &HashMap<i64, &Client>) -> Transaction {
    Transaction {
        id: format!("expense_{}", e.id),
        tx_type: TransactionType::Expense,
        description: e.description.clone(),
        amount: -e.amount,
        currency: "usd".to_string(),
        status: expense_status(e).to_string(),
        date: e.expense_date.and_time(NaiveTime::MIN).and_utc(),
        client: e
            .client_id
            .and_then(|id| clients_by_id.get(&id))
            .map(|c| ClientMatch::single(c)),
        metadata: TransactionMetadata::Expense {
            expense_id: e.id,
            category: e.category,
            is_recurring: e.is_recurring,
            recurring_frequency: e.recurring_frequency,
            next_due_date: e.next_due_date,
        },
        stripe_id: None,
    }
}

fn charge_entry(c: &Charge, clients: &[Client]) -> Transaction {
    let client = c
        .customer
        .as_deref()
        .and_then(|cus| map_client(cus, clients))
        .or_else(|| {
            c.payment_intent
                .as_deref()
                .and_then(|pi| find_by_payment_intent(pi, clients))
        });
    Transaction {
        id: format!("charge_{}", c.id),
        tx_type: TransactionType::Charge,
        description: c.description.clone().unwrap_or_else(|| "Payment".to_string()),
        amount: normalize_amount(c.amount),
        currency: c.currency.clone(),
        status: c.status.clone(),
        date: epoch_to_datetime(c.created),
        client,
        metadata: TransactionMetadata::Charge {
            customer: c.customer.clone(),
            payment_intent: c.payment_intent.clone(),
            invoice: c.invoice.clone(),
            receipt_url: c.receipt_url.clone(),
        },
        stripe_id: Some(c.id.clone()),
    }
}

fn invoice_entry(inv: &Invoice, clients: &[Client]) -> Transaction {
    let description = inv.description.clone().unwrap_or_else(|| match &inv.number {
        Some(n) => format!("Invoice {n}"),
        None => "Invoice".to_string(),
    });
    Transaction {
        id: format!("invoice_{}", inv.id),
        tx_type: TransactionType::Invoice,
        description,
        amount: normalize_amount(inv.amount_paid),
        currency: inv.currency.clone(),
        status: inv.status.clone().unwrap_or_default(),
        date: epoch_to_datetime(inv.created),
        client: inv.customer.as_deref().and_then(|cus| map_client(cus, clients)),
        metadata: TransactionMetadata::Invoice {
            customer: inv.customer.clone(),
            number: inv.number.clone(),
            subscription: inv.subscription.clone(),
            hosted_invoice_url: inv.hosted_invoice_url.clone(),
        },
        stripe_id: Some(inv.id.clone()),
    }
}

fn subscription_description(sub: &Subscription) -> String {
    match sub.first_price() {
        Some(p) if p.interval_count == 1 => format!(
            "Subscription: {}/{}",
            money(normalize_amount(p.unit_amount)),
            p.interval.as_str()
        ),
        Some(p) => format!(
            "Subscription: {} every {} {}s",
            money(normalize_amount(p.unit_amount)),
            p.interval_count,
            p.interval.as_str()
        ),
        None => "Subscription".to_string(),
    }
}

fn subscription_entry(sub: &Subscription, clients: &[Client]) -> Transaction {
    Transaction {
        id: format!("subscription_{}", sub.id),
        tx_type: TransactionType::Subscription,
        description: subscription_description(sub),
        amount: 0.0,
        currency: sub.currency(),
        status: sub.status.clone(),
        date: epoch_to_datetime(sub.created),
        client: sub.customer.as_deref().and_then(|cus| map_client(cus, clients)),
        metadata: TransactionMetadata::Subscription {
            customer: sub.customer.clone(),
            current_period_start: sub.current_period_start.map(epoch_to_datetime),
            current_period_end: sub.current_period_end.map(epoch_to_datetime),
            trial_end: sub.trial_end.map(epoch_to_datetime),
            latest_invoice: sub.latest_invoice.clone(),
        },
        stripe_id: Some(sub.id.clone()),
    }
}

/// Merge every source into one list, newest first.
///
/// `all_clients` resolves expense owners. `stripe_clients` (the clients of the
/// gateway's environment) resolves Stripe customers.
pub fn merge_transactions(
    all_clients: &[Client],
    stripe_clients: &[Client],
    expenses: &[Expense],
    charges: &[Charge],
    invoices: &[Invoice],
    subscriptions: &[Subscription],
) -> Vec<Transaction> {
    let clients_by_id: HashMap<i64, &Client> = all_clients.iter().map(|c| (c.id, c)).collect();
    let mut txs: Vec<Transaction> = expenses
        .iter()
        .map(|e| expense_entry(e, &clients_by_id))
        .collect();

    // Invoices already represented by a succeeded charge.
    let mut charged_invoices: HashSet<&str> = HashSet::new();
    for charge in charges.iter().filter(|c| c.is_succeeded()) {
        txs.push(charge_entry(charge, stripe_clients));
        if let Some(inv) = charge.invoice.as_deref() {
            charged_invoices.insert(inv);
        }
    }

    for inv in invoices {
        if inv.status.as_deref() == Some("paid") && !charged_invoices.contains(inv.id.as_str()) {
            txs.push(invoice_entry(inv, stripe_clients));
        }
    }

    txs.extend(subscriptions.iter().map(|s| subscription_entry(s, stripe_clients)));

    txs.sort_by(|a, b| b.date.cmp(&a.date));
    txs
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Ledger {
    pub transactions: Vec<Transaction>,
    pub summary: LedgerSummary,
}

fn degrade<T>(kind: &str, joined: thread::Result<ApiResult<Vec<T>>>) -> Vec<T> {
    match joined {
        Ok(Ok(items)) => items,
        Ok(Err(e)) => {
            tracing::warn!(kind, error = %e, "stripe list failed, continuing without it");
            Vec::new()
        }
        Err(_) => {
            tracing::warn!(kind, "stripe list fetch panicked, continuing without it");
            Vec::new()
        }
    }
}

/// Fetch everything and merge it. The four Stripe lists are requested in
/// parallel; a list that fails is treated as empty. Store errors propagate.
pub fn build_ledger<G: PaymentGateway, S: Store>(gateway: &G, store: &S, limit: u32) -> Result<Ledger> {
    let all_clients = store.list_clients(&ClientFilter::default())?;
    let expenses = store.list_expenses(&ExpenseFilter::default())?;
    let environment = gateway.environment();

    let (charges, invoices, subscriptions, payment_intents) = thread::scope(|s| {
        let charges = s.spawn(|| gateway.list_charges(limit));
        let invoices = s.spawn(|| gateway.list_invoices(limit));
        let subscriptions = s.spawn(|| gateway.list_subscriptions(limit));
        let payment_intents = s.spawn(|| gateway.list_payment_intents(limit));
        (
            degrade("charges", charges.join()),
            degrade("invoices", invoices.join()),
            degrade("subscriptions", subscriptions.join()),
            degrade("payment_intents", payment_intents.join()),
        )
    });

    // Payment intents settle as charges, so they are not entries of their own.
    tracing::debug!(
        env = %environment,
        charges = charges.len(),
        invoices = invoices.len(),
        subscriptions = subscriptions.len(),
        payment_intents = payment_intents.len(),
        "fetched stripe lists"
    );

    let stripe_clients: Vec<Client> = all_clients
        .iter()
        .filter(|c| c.stripe_environment == environment)
        .cloned()
        .collect();

    let transactions = merge_transactions(
        &all_clients,
        &stripe_clients,
        &expenses,
        &charges,
        &invoices,
        &subscriptions,
    );
    let summary = summarize(&transactions);
    Ok(Ledger {
        transactions,
        summary,
    })
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Bucket {
    pub count: usize,
    pub income: f64,
    pub expenses: f64,
}

impl Bucket {
    fn add(&mut self, amount: f64) {
        self.count += 1;
        if amount > 0.0 {
            self.income += amount;
        } else {
            self.expenses += -amount;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LedgerSummary {
    pub total_income: f64,
    /// Positive magnitude of all outgoing amounts.
    pub total_expenses: f64,
    pub net: f64,
    pub count: usize,
    pub by_type: BTreeMap<TransactionType, Bucket>,
    pub by_status: BTreeMap<String, Bucket>,
    /// Keyed `YYYY-MM`.
    pub by_month: BTreeMap<String, Bucket>,
    pub recent: Vec<Transaction>,
}

pub fn summarize(txs: &[Transaction]) -> LedgerSummary {
    let mut totals = Bucket::default();
    let mut by_type: BTreeMap<TransactionType, Bucket> = BTreeMap::new();
    let mut by_status: BTreeMap<String, Bucket> = BTreeMap::new();
    let mut by_month: BTreeMap<String, Bucket> = BTreeMap::new();

    for tx in txs {
        totals.add(tx.amount);
        by_type.entry(tx.tx_type).or_default().add(tx.amount);
        by_status.entry(tx.status.clone()).or_default().add(tx.amount);
        by_month
            .entry(tx.date.format("%Y-%m").to_string())
            .or_default()
            .add(tx.amount);
    }

    LedgerSummary {
        total_income: totals.income,
        total_expenses: totals.expenses,
        net: totals.income - totals.expenses,
        count: totals.count,
        by_type,
        by_status,
        by_month,
        recent: txs.iter().take(RECENT_COUNT).cloned().collect(),
    }
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum TypeFilter {
    /// Charges and expenses only.
    #[default]
    Default,
    All,
    Exact(TransactionType),
}

impl TypeFilter {
    fn matches(&self, t: TransactionType) -> bool {
        match self {
            Self::Default => matches!(t, TransactionType::Charge | TransactionType::Expense),
            Self::All => true,
            Self::Exact(want) => *want == t,
        }
    }
}

impl std::str::FromStr for TypeFilter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s {
            "default" => Ok(Self::Default),
            "all" => Ok(Self::All),
            other => other.parse().map(Self::Exact),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LedgerFilter {
    pub tx_type: TypeFilter,
    /// `None` matches every status.
    pub status: Option<String>,
    pub client_id: Option<i64>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub search: Option<String>,
}

impl LedgerFilter {
    pub fn matches(&self, tx: &Transaction) -> bool {
        if !self.tx_type.matches(tx.tx_type) {
            return false;
        }
        if let Some(status) = &self.status {
            if status != "all" && *status != tx.status {
                return false;
            }
        }
        if let Some(id) = self.client_id {
            if !tx.client.as_ref().is_some_and(|c| c.contains(id)) {
                return false;
            }
        }
        let day = tx.date.date_naive();
        if self.from.is_some_and(|from| day < from) || self.to.is_some_and(|to| day > to) {
            return false;
        }
        if let Some(term) = &self.search {
            let term = term.to_lowercase();
            let hit = tx.description.to_lowercase().contains(&term)
                || tx
                    .client
                    .as_ref()
                    .is_some_and(|c| c.business_name().to_lowercase().contains(&term))
                || tx
                    .stripe_id
                    .as_ref()
                    .is_some_and(|id| id.to_lowercase().contains(&term));
            if !hit {
                return false;
            }
        }
        true
    }
}

pub fn filter_ledger(txs: &[Transaction], filter: &LedgerFilter) -> Vec<Transaction> {
    txs.iter().filter(|tx| filter.matches(tx)).cloned().collect()
}

// ---------------------------------------------------------------------------
// Reassignment
// ---------------------------------------------------------------------------

/// Move an expense entry to another client (or to none). Stripe entries are
/// derived from customer ids and cannot be reassigned; they return `false`.
pub fn reassign_transaction<S: Store>(store: &S, tx: &Transaction, client_id: Option<i64>) -> Result<bool> {
    let TransactionMetadata::Expense { expense_id, .. } = &tx.metadata else {
        return Ok(false);
    };
    if let Some(id) = client_id {
        store.get_client(id)?;
    }
    store.set_expense_client(*expense_id, client_id)?;
    Ok(true)
}

/// Find a transaction by its namespaced id.
pub fn find_transaction<'a>(txs: &'a [Transaction], id: &str) -> Result<&'a Transaction> {
    txs.iter()
        .find(|tx| tx.id == id)
        .ok_or_else(|| ClerkError::Other(format!("No transaction with id {id}")))
}

// ---------------------------------------------------------------------------
// CSV export
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct CsvRow<'a> {
    date: String,
    id: &'a str,
    #[serde(rename = "type")]
    tx_type: &'static str,
    description: &'a str,
    client: &'a str,
    amount: String,
    currency: &'a str,
    status: &'a str,
    stripe_id: &'a str,
}

pub fn write_csv<W: Write>(txs: &[Transaction], out: W) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(out);
    if txs.is_empty() {
        wtr.write_record([
            "date",
            "id",
            "type",
            "description",
            "client",
            "amount",
            "currency",
            "status",
            "stripe_id",
        ])?;
    }
    for tx in txs {
        wtr.serialize(CsvRow {
            date: tx.date.format("%Y-%m-%d").to_string(),
            id: &tx.id,
            tx_type: tx.tx_type.as_str(),
            description: &tx.description,
            client: tx.client.as_ref().map(|c| c.business_name()).unwrap_or(""),
            amount: fixed2(tx.amount),
            currency: &tx.currency,
            status: &tx.status,
            stripe_id: tx.stripe_id.as_deref().unwrap_or(""),
        })?;
    }
    wtr.flush()?;
    Ok(())
}
