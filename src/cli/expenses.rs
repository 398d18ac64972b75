use chrono::{Local, NaiveDate};
use comfy_table::{Cell, Table};

use crate::db::open_default;
use crate::error::Result;
use crate::expenses::set_paused;
use crate::fmt::money;
use crate::models::{ExpenseCategory, ExpenseFilter, NewExpense, RecurringFrequency};
use crate::store::Store;

pub struct ExpenseArgs {
    pub description: String,
    pub amount: f64,
    pub category: ExpenseCategory,
    pub date: Option<NaiveDate>,
    pub client: Option<i64>,
    pub recurring: Option<RecurringFrequency>,
    pub occurrences: Option<u32>,
}

pub fn add(args: ExpenseArgs) -> Result<()> {
    let conn = open_default()?;
    if let Some(client_id) = args.client {
        conn.get_client(client_id)?;
    }
    let expense = conn.create_expense(&NewExpense {
        client_id: args.client,
        category: args.category,
        description: args.description,
        amount: args.amount,
        expense_date: args.date.unwrap_or_else(|| Local::now().date_naive()),
        is_recurring: args.recurring.is_some(),
        is_paused: false,
        recurring_frequency: args.recurring,
        total_occurrences: args.occurrences,
    })?;
    println!(
        "Added expense #{}: {} {}",
        expense.id,
        expense.description,
        money(expense.amount)
    );
    if let Some(due) = expense.next_due_date {
        println!("Next due: {due}");
    }
    Ok(())
}

pub fn list(client: Option<i64>, category: Option<ExpenseCategory>, recurring_only: bool) -> Result<()> {
    let conn = open_default()?;
    let expenses = conn.list_expenses(&ExpenseFilter {
        client_id: client,
        category,
        recurring_only,
    })?;

    if expenses.is_empty() {
        println!("No expenses found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        "ID", "Date", "Description", "Category", "Amount", "Client", "Recurring", "Next Due",
    ]);
    for e in &expenses {
        let recurring = match (e.recurring_frequency, e.is_paused) {
            (Some(f), true) => format!("{f} (paused)"),
            (Some(f), false) => f.to_string(),
            (None, _) => String::new(),
        };
        table.add_row(vec![
            Cell::new(e.id),
            Cell::new(e.expense_date),
            Cell::new(&e.description),
            Cell::new(e.category),
            Cell::new(money(e.amount)),
            Cell::new(e.client_id.map(|id| id.to_string()).unwrap_or_default()),
            Cell::new(recurring),
            Cell::new(e.next_due_date.map(|d| d.to_string()).unwrap_or_default()),
        ]);
    }
    let total: f64 = expenses.iter().map(|e| e.amount).sum();
    println!("Expenses\n{table}");
    println!("Total: {}", money(total));
    Ok(())
}

pub struct ExpenseChanges {
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub category: Option<ExpenseCategory>,
    pub date: Option<NaiveDate>,
    pub client: Option<i64>,
    pub no_client: bool,
    pub recurring: Option<RecurringFrequency>,
    pub one_off: bool,
    pub occurrences: Option<u32>,
}

pub fn update(id: i64, changes: ExpenseChanges) -> Result<()> {
    let conn = open_default()?;
    let current = conn.get_expense(id)?;
    let mut new = NewExpense::from(&current);

    if let Some(d) = changes.description {
        new.description = d;
    }
    if let Some(a) = changes.amount {
        new.amount = a;
    }
    if let Some(c) = changes.category {
        new.category = c;
    }
    if let Some(d) = changes.date {
        new.expense_date = d;
    }
    if let Some(client_id) = changes.client {
        conn.get_client(client_id)?;
        new.client_id = Some(client_id);
    } else if changes.no_client {
        new.client_id = None;
    }
    if let Some(f) = changes.recurring {
        new.is_recurring = true;
        new.recurring_frequency = Some(f);
    } else if changes.one_off {
        new.is_recurring = false;
    }
    if changes.occurrences.is_some() {
        new.total_occurrences = changes.occurrences;
    }

    let updated = conn.update_expense(id, &new)?;
    println!("Updated expense #{}: {} {}", updated.id, updated.description, money(updated.amount));
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let conn = open_default()?;
    conn.delete_expense(id)?;
    println!("Deleted expense #{id}");
    Ok(())
}

pub fn pause(id: i64, paused: bool) -> Result<()> {
    let conn = open_default()?;
    let expense = set_paused(&conn, id, paused)?;
    let verb = if paused { "Paused" } else { "Resumed" };
    println!("{verb} expense #{}: {}", expense.id, expense.description);
    Ok(())
}
