use crate::db::{get_connection, DB_FILE};
use crate::error::Result;
use crate::models::{ClientFilter, ExpenseFilter, PaymentStatus};
use crate::settings::{load_settings, Settings};
use crate::store::Store;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let data_dir = std::path::PathBuf::from(&settings.data_dir);
    let db_path = data_dir.join(DB_FILE);

    println!("Data dir:     {}", data_dir.display());
    println!("Database:     {}", db_path.display());
    println!("Environment:  {}", settings.stripe_environment);
    println!(
        "Secret key:   {}",
        if Settings::resolve_api_key(settings.stripe_environment).is_ok() {
            "set"
        } else {
            "(not set)"
        }
    );

    if !db_path.exists() {
        println!();
        println!("Database not found. Run `clerk init` to set up.");
        return Ok(());
    }

    let conn = get_connection(&db_path)?;
    let clients = conn.list_clients(&ClientFilter::default())?;
    let expenses = conn.list_expenses(&ExpenseFilter::default())?;
    let in_env = clients
        .iter()
        .filter(|c| c.stripe_environment == settings.stripe_environment)
        .count();
    let with_errors = clients.iter().filter(|c| c.sync_errors.is_some()).count();
    let overdue = clients
        .iter()
        .filter(|c| c.payment_status == PaymentStatus::Overdue)
        .count();
    let never_synced = clients.iter().filter(|c| c.last_synced_at.is_none()).count();
    let recurring = expenses.iter().filter(|e| e.is_recurring && !e.is_paused).count();

    println!();
    println!("Clients:        {} ({in_env} in {})", clients.len(), settings.stripe_environment);
    println!("Overdue:        {overdue}");
    println!("Sync errors:    {with_errors}");
    println!("Never synced:   {never_synced}");
    println!("Expenses:       {} ({recurring} recurring)", expenses.len());
    Ok(())
}
