mod cli;
mod clients;
mod db;
mod error;
mod expenses;
mod fmt;
mod identity;
mod ledger;
mod models;
mod normalize;
mod settings;
mod store;
mod stripe;
mod sync;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use cli::{ClientsCommands, Cli, Commands, EnvCommands, ExpensesCommands, LedgerCommands};

/// Log to stderr so table and CSV output on stdout stays clean.
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("clerk=warn"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Clients { command } => match command {
            ClientsCommands::Add {
                business_name,
                contact,
                email,
                phone,
                website,
                env,
                customer,
            } => cli::clients::add(
                &business_name,
                cli::clients::ContactFields {
                    contact,
                    email,
                    phone,
                    website,
                },
                env,
                customer.as_deref(),
            ),
            ClientsCommands::List {
                status,
                env,
                payment_status,
            } => cli::clients::list(status, env, payment_status),
            ClientsCommands::Show { id } => cli::clients::show(id),
            ClientsCommands::Edit {
                id,
                name,
                contact,
                email,
                phone,
                website,
                status,
                env,
            } => cli::clients::edit(
                id,
                name,
                cli::clients::ContactFields {
                    contact,
                    email,
                    phone,
                    website,
                },
                status,
                env,
            ),
            ClientsCommands::Delete { id } => cli::clients::delete(id),
            ClientsCommands::Note { id, text } => cli::clients::note(id, &text),
            ClientsCommands::RefAdd { id, kind, stripe_id } => cli::clients::ref_add(id, kind, &stripe_id),
            ClientsCommands::RefRemove { id, kind, stripe_id } => {
                cli::clients::ref_remove(id, kind, &stripe_id)
            }
        },
        Commands::Expenses { command } => match command {
            ExpensesCommands::Add {
                description,
                amount,
                category,
                date,
                client,
                recurring,
                occurrences,
            } => cli::expenses::add(cli::expenses::ExpenseArgs {
                description,
                amount,
                category,
                date,
                client,
                recurring,
                occurrences,
            }),
            ExpensesCommands::List {
                client,
                category,
                recurring,
            } => cli::expenses::list(client, category, recurring),
            ExpensesCommands::Update {
                id,
                description,
                amount,
                category,
                date,
                client,
                no_client,
                recurring,
                one_off,
                occurrences,
            } => cli::expenses::update(
                id,
                cli::expenses::ExpenseChanges {
                    description,
                    amount,
                    category,
                    date,
                    client,
                    no_client,
                    recurring,
                    one_off,
                    occurrences,
                },
            ),
            ExpensesCommands::Delete { id } => cli::expenses::delete(id),
            ExpensesCommands::Pause { id } => cli::expenses::pause(id, true),
            ExpensesCommands::Resume { id } => cli::expenses::pause(id, false),
        },
        Commands::Sync { clients, all } => cli::sync::run(&clients, all),
        Commands::Ledger { command } => match command {
            LedgerCommands::List { filter, json } => cli::ledger::list(&filter, json),
            LedgerCommands::Summary { json } => cli::ledger::summary(json),
            LedgerCommands::Assign {
                transaction,
                client,
            } => cli::ledger::assign(&transaction, client),
            LedgerCommands::Export { filter, output } => cli::ledger::export(&filter, output.as_deref()),
        },
        Commands::Env { command } => match command {
            EnvCommands::Show => cli::env::show(),
            EnvCommands::Set { env } => cli::env::set(env),
        },
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
