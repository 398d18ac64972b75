pub mod clients;
pub mod env;
pub mod expenses;
pub mod init;
pub mod ledger;
pub mod status;
pub mod sync;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::models::{
    ClientStatus, ExpenseCategory, PaymentStatus, RecurringFrequency, StripeEnvironment,
};

#[derive(Parser)]
#[command(name = "clerk", version, about = "Client billing sync and transaction ledger for small agencies.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up clerk: choose a data directory and initialize the database.
    Init {
        /// Path for clerk data (default: ~/Documents/clerk)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Manage clients and their Stripe references.
    Clients {
        #[command(subcommand)]
        command: ClientsCommands,
    },
    /// Manage expenses.
    Expenses {
        #[command(subcommand)]
        command: ExpensesCommands,
    },
    /// Refresh client totals and statuses from Stripe.
    Sync {
        /// Client IDs to sync
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        clients: Vec<i64>,
        /// Sync every client of the active environment
        #[arg(long)]
        all: bool,
    },
    /// View the merged transaction ledger.
    Ledger {
        #[command(subcommand)]
        command: LedgerCommands,
    },
    /// Show or switch the active Stripe environment.
    Env {
        #[command(subcommand)]
        command: EnvCommands,
    },
    /// Show current database and summary statistics.
    Status,
}

#[derive(Subcommand)]
pub enum ClientsCommands {
    /// Add a new client.
    Add {
        /// Business name, e.g. 'Acme Plumbing'
        business_name: String,
        #[arg(long)]
        contact: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        website: Option<String>,
        /// Stripe environment: test, live (default: the active one)
        #[arg(long)]
        env: Option<StripeEnvironment>,
        /// Stripe customer id (cus_...)
        #[arg(long)]
        customer: Option<String>,
    },
    /// List clients.
    List {
        /// active, inactive, suspended
        #[arg(long)]
        status: Option<ClientStatus>,
        /// test, live
        #[arg(long)]
        env: Option<StripeEnvironment>,
        /// current, past_due, overdue, cancelled
        #[arg(long = "payment-status")]
        payment_status: Option<PaymentStatus>,
    },
    /// Show one client with its references, notes and last sync errors.
    Show {
        /// Client ID (shown in `clerk clients list`)
        id: i64,
    },
    /// Update contact fields, status or environment.
    Edit {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        contact: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        website: Option<String>,
        #[arg(long)]
        status: Option<ClientStatus>,
        #[arg(long)]
        env: Option<StripeEnvironment>,
    },
    /// Delete a client. Its expenses are kept.
    Delete { id: i64 },
    /// Append a note to a client's log.
    Note { id: i64, text: String },
    /// Link a Stripe id to a client.
    RefAdd {
        id: i64,
        kind: RefKindArg,
        /// Stripe id (pi_..., ch_..., sub_..., cus_...)
        stripe_id: String,
    },
    /// Unlink a Stripe id from a client.
    RefRemove {
        id: i64,
        kind: RefKindArg,
        stripe_id: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum RefKindArg {
    Payment,
    Subscription,
    Customer,
}

#[derive(Subcommand)]
pub enum ExpensesCommands {
    /// Record an expense.
    Add {
        description: String,
        #[arg(long)]
        amount: f64,
        /// software, hosting, domain, marketing, advertising, contractor, office, travel, other
        #[arg(long, default_value = "other")]
        category: ExpenseCategory,
        /// YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Owning client ID
        #[arg(long)]
        client: Option<i64>,
        /// Make it recurring: monthly, quarterly, yearly
        #[arg(long)]
        recurring: Option<RecurringFrequency>,
        /// Cap on the number of recurrences
        #[arg(long, requires = "recurring")]
        occurrences: Option<u32>,
    },
    /// List expenses.
    List {
        #[arg(long)]
        client: Option<i64>,
        #[arg(long)]
        category: Option<ExpenseCategory>,
        /// Only recurring expenses
        #[arg(long)]
        recurring: bool,
    },
    /// Update an existing expense.
    Update {
        /// Expense ID (shown in `clerk expenses list`)
        id: i64,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        amount: Option<f64>,
        #[arg(long)]
        category: Option<ExpenseCategory>,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, conflicts_with = "no_client")]
        client: Option<i64>,
        /// Detach the expense from its client
        #[arg(long = "no-client")]
        no_client: bool,
        #[arg(long, conflicts_with = "one_off")]
        recurring: Option<RecurringFrequency>,
        /// Turn a recurring expense into a one-off
        #[arg(long = "one-off")]
        one_off: bool,
        #[arg(long)]
        occurrences: Option<u32>,
    },
    /// Delete an expense.
    Delete { id: i64 },
    /// Pause a recurring expense.
    Pause { id: i64 },
    /// Resume a paused recurring expense.
    Resume { id: i64 },
}

#[derive(Args)]
pub struct LedgerFilterArgs {
    /// default (charges and expenses), all, expense, charge, invoice, subscription
    #[arg(long = "type", default_value = "default")]
    pub tx_type: String,
    /// Exact status, or all
    #[arg(long)]
    pub status: Option<String>,
    #[arg(long)]
    pub client: Option<i64>,
    /// Start date, YYYY-MM-DD (inclusive)
    #[arg(long)]
    pub from: Option<NaiveDate>,
    /// End date, YYYY-MM-DD (inclusive)
    #[arg(long)]
    pub to: Option<NaiveDate>,
    /// Case-insensitive text in description, client name or Stripe id
    #[arg(long)]
    pub search: Option<String>,
}

#[derive(Subcommand)]
pub enum LedgerCommands {
    /// List transactions, newest first.
    List {
        #[command(flatten)]
        filter: LedgerFilterArgs,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Totals by type, status and month.
    Summary {
        #[arg(long)]
        json: bool,
    },
    /// Move an expense transaction to another client.
    Assign {
        /// Transaction ID, e.g. expense_12
        transaction: String,
        /// Client ID (omit to unassign)
        client: Option<i64>,
    },
    /// Write transactions as CSV.
    Export {
        #[command(flatten)]
        filter: LedgerFilterArgs,
        /// Output file (default: stdout)
        #[arg(long)]
        output: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum EnvCommands {
    /// Show the active environment and whether its key is set.
    Show,
    /// Switch the active environment.
    Set { env: StripeEnvironment },
}
