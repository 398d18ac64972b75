use chrono::Utc;
use rusqlite::types::{ToSql, Type};
use rusqlite::{Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;

use crate::error::{ClerkError, Result};
use crate::models::{
    Client, ClientFilter, ClientUpdate, Expense, ExpenseFilter, NewClient, NewExpense,
};
use crate::normalize::round2;

/// Read/write contract the sync engine and the ledger need from storage.
pub trait Store {
    fn get_client(&self, id: i64) -> Result<Client>;
    fn list_clients(&self, filter: &ClientFilter) -> Result<Vec<Client>>;
    fn create_client(&self, new: &NewClient) -> Result<Client>;
    fn update_client(&self, id: i64, update: &ClientUpdate) -> Result<Client>;
    fn delete_client(&self, id: i64) -> Result<()>;

    fn get_expense(&self, id: i64) -> Result<Expense>;
    fn list_expenses(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>>;
    fn create_expense(&self, new: &NewExpense) -> Result<Expense>;
    fn update_expense(&self, id: i64, new: &NewExpense) -> Result<Expense>;
    fn delete_expense(&self, id: i64) -> Result<()>;
    fn set_expense_client(&self, id: i64, client_id: Option<i64>) -> Result<()>;
}

const CLIENT_COLUMNS: &str = "id, business_name, contact_name, email, phone, website, status, \
     payment_status, stripe_environment, stripe_customer_id, stripe_payment_intent_ids, \
     stripe_subscription_ids, total_paid, subscription_monthly_value, subscription_status, \
     last_payment_date, notes, sync_errors, last_synced_at, created_at";

const EXPENSE_COLUMNS: &str = "id, client_id, category, description, amount, expense_date, \
     is_recurring, is_paused, recurring_frequency, total_occurrences, next_due_date";

fn json_error(idx: usize, e: serde_json::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn json_col<T: DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| json_error(idx, e))
}

fn opt_json_col<T: DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| serde_json::from_str(&s).map_err(|e| json_error(idx, e)))
        .transpose()
}

fn client_from_row(row: &Row) -> rusqlite::Result<Client> {
    Ok(Client {
        id: row.get(0)?,
        business_name: row.get(1)?,
        contact_name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        website: row.get(5)?,
        status: row.get(6)?,
        payment_status: row.get(7)?,
        stripe_environment: row.get(8)?,
        stripe_customer_id: row.get(9)?,
        stripe_payment_intent_ids: json_col(row, 10)?,
        stripe_subscription_ids: json_col(row, 11)?,
        total_paid: row.get(12)?,
        subscription_monthly_value: row.get(13)?,
        subscription_status: row.get(14)?,
        last_payment_date: row.get(15)?,
        notes: json_col(row, 16)?,
        sync_errors: opt_json_col(row, 17)?,
        last_synced_at: row.get(18)?,
        created_at: row.get(19)?,
    })
}

fn expense_from_row(row: &Row) -> rusqlite::Result<Expense> {
    Ok(Expense {
        id: row.get(0)?,
        client_id: row.get(1)?,
        category: row.get(2)?,
        description: row.get(3)?,
        amount: row.get(4)?,
        expense_date: row.get(5)?,
        is_recurring: row.get(6)?,
        is_paused: row.get(7)?,
        recurring_frequency: row.get(8)?,
        total_occurrences: row.get(9)?,
        next_due_date: row.get(10)?,
    })
}

type SetList = Vec<(&'static str, Box<dyn ToSql>)>;

/// Push `column = value` when the partial update carries the field.
macro_rules! set_if {
    ($sets:ident, $field:expr, $col:literal) => {
        if let Some(v) = &$field {
            $sets.push(($col, Box::new(v.clone())));
        }
    };
}

fn client_update_sets(update: &ClientUpdate) -> Result<SetList> {
    let mut sets: SetList = Vec::new();
    set_if!(sets, update.business_name, "business_name");
    set_if!(sets, update.contact_name, "contact_name");
    set_if!(sets, update.email, "email");
    set_if!(sets, update.phone, "phone");
    set_if!(sets, update.website, "website");
    set_if!(sets, update.status, "status");
    set_if!(sets, update.payment_status, "payment_status");
    set_if!(sets, update.stripe_environment, "stripe_environment");
    set_if!(sets, update.stripe_customer_id, "stripe_customer_id");
    set_if!(sets, update.subscription_status, "subscription_status");
    set_if!(sets, update.last_payment_date, "last_payment_date");
    set_if!(sets, update.last_synced_at, "last_synced_at");

    if let Some(v) = update.total_paid {
        sets.push(("total_paid", Box::new(round2(v))));
    }
    if let Some(v) = update.subscription_monthly_value {
        sets.push(("subscription_monthly_value", Box::new(round2(v))));
    }
    if let Some(ids) = &update.stripe_payment_intent_ids {
        sets.push(("stripe_payment_intent_ids", Box::new(serde_json::to_string(ids)?)));
    }
    if let Some(ids) = &update.stripe_subscription_ids {
        sets.push(("stripe_subscription_ids", Box::new(serde_json::to_string(ids)?)));
    }
    if let Some(notes) = &update.notes {
        sets.push(("notes", Box::new(serde_json::to_string(notes)?)));
    }
    if let Some(errors) = &update.sync_errors {
        let raw = errors.as_ref().map(serde_json::to_string).transpose()?;
        sets.push(("sync_errors", Box::new(raw)));
    }
    Ok(sets)
}

impl Store for Connection {
    fn get_client(&self, id: i64) -> Result<Client> {
        self.query_row(
            &format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ?1"),
            [id],
            client_from_row,
        )
        .optional()?
        .ok_or(ClerkError::UnknownClient(id))
    }

    fn list_clients(&self, filter: &ClientFilter) -> Result<Vec<Client>> {
        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();
        if let Some(status) = filter.status {
            params.push(Box::new(status));
            clauses.push(format!("status = ?{}", params.len()));
        }
        if let Some(env) = filter.environment {
            params.push(Box::new(env));
            clauses.push(format!("stripe_environment = ?{}", params.len()));
        }
        if let Some(ps) = filter.payment_status {
            params.push(Box::new(ps));
            clauses.push(format!("payment_status = ?{}", params.len()));
        }
        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        let sql = format!(
            "SELECT {CLIENT_COLUMNS} FROM clients{where_clause} \
             ORDER BY business_name COLLATE NOCASE, id"
        );
        let mut stmt = self.prepare(&sql)?;
        let param_values: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let rows = stmt
            .query_map(param_values.as_slice(), client_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn create_client(&self, new: &NewClient) -> Result<Client> {
        let name = new.business_name.trim();
        if name.is_empty() {
            return Err(ClerkError::Validation("business name is required".to_string()));
        }
        self.execute(
            "INSERT INTO clients (business_name, contact_name, email, phone, website, \
             stripe_environment, stripe_customer_id, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                name,
                new.contact_name,
                new.email,
                new.phone,
                new.website,
                new.stripe_environment,
                new.stripe_customer_id,
                Utc::now(),
            ],
        )?;
        self.get_client(self.last_insert_rowid())
    }

    fn update_client(&self, id: i64, update: &ClientUpdate) -> Result<Client> {
        let sets = client_update_sets(update)?;
        if sets.is_empty() {
            return self.get_client(id);
        }

        let assignments: Vec<String> = sets
            .iter()
            .enumerate()
            .map(|(i, (col, _))| format!("{col} = ?{}", i + 1))
            .collect();
        let sql = format!(
            "UPDATE clients SET {} WHERE id = ?{}",
            assignments.join(", "),
            sets.len() + 1
        );
        let mut param_values: Vec<&dyn ToSql> = sets.iter().map(|(_, v)| v.as_ref()).collect();
        param_values.push(&id);

        let changed = self.execute(&sql, param_values.as_slice())?;
        if changed == 0 {
            return Err(ClerkError::UnknownClient(id));
        }
        self.get_client(id)
    }

    fn delete_client(&self, id: i64) -> Result<()> {
        let changed = self.execute("DELETE FROM clients WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(ClerkError::UnknownClient(id));
        }
        Ok(())
    }

    fn get_expense(&self, id: i64) -> Result<Expense> {
        self.query_row(
            &format!("SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = ?1"),
            [id],
            expense_from_row,
        )
        .optional()?
        .ok_or(ClerkError::UnknownExpense(id))
    }

    fn list_expenses(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>> {
        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();
        if let Some(client_id) = filter.client_id {
            params.push(Box::new(client_id));
            clauses.push(format!("client_id = ?{}", params.len()));
        }
        if let Some(category) = filter.category {
            params.push(Box::new(category));
            clauses.push(format!("category = ?{}", params.len()));
        }
        if filter.recurring_only {
            clauses.push("is_recurring = 1".to_string());
        }
        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        let sql = format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses{where_clause} ORDER BY expense_date DESC, id DESC"
        );
        let mut stmt = self.prepare(&sql)?;
        let param_values: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let rows = stmt
            .query_map(param_values.as_slice(), expense_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn create_expense(&self, new: &NewExpense) -> Result<Expense> {
        let new = new.clone().validated()?;
        self.execute(
            "INSERT INTO expenses (client_id, category, description, amount, expense_date, \
             is_recurring, is_paused, recurring_frequency, total_occurrences, next_due_date) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            rusqlite::params![
                new.client_id,
                new.category,
                new.description,
                new.amount,
                new.expense_date,
                new.is_recurring,
                new.is_paused,
                new.recurring_frequency,
                new.total_occurrences,
                new.next_due_date(),
            ],
        )?;
        self.get_expense(self.last_insert_rowid())
    }

    fn update_expense(&self, id: i64, new: &NewExpense) -> Result<Expense> {
        let new = new.clone().validated()?;
        let changed = self.execute(
            "UPDATE expenses SET client_id = ?1, category = ?2, description = ?3, amount = ?4, \
             expense_date = ?5, is_recurring = ?6, is_paused = ?7, recurring_frequency = ?8, \
             total_occurrences = ?9, next_due_date = ?10 WHERE id = ?11",
            rusqlite::params![
                new.client_id,
                new.category,
                new.description,
                new.amount,
                new.expense_date,
                new.is_recurring,
                new.is_paused,
                new.recurring_frequency,
                new.total_occurrences,
                new.next_due_date(),
                id,
            ],
        )?;
        if changed == 0 {
            return Err(ClerkError::UnknownExpense(id));
        }
        self.get_expense(id)
    }

    fn delete_expense(&self, id: i64) -> Result<()> {
        let changed = self.execute("DELETE FROM expenses WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(ClerkError::UnknownExpense(id));
        }
        Ok(())
    }

    fn set_expense_client(&self, id: i64, client_id: Option<i64>) -> Result<()> {
        let changed = self.execute(
            "UPDATE expenses SET client_id = ?1 WHERE id = ?2",
            rusqlite::params![client_id, id],
        )?;
        if changed == 0 {
            return Err(ClerkError::UnknownExpense(id));
        }
        Ok(())
    }
}

impl From<&Expense> for NewExpense {
    fn from(e: &Expense) -> Self {
        Self {
            client_id: e.client_id,
            category: e.category,
            description: e.description.clone(),
            amount: e.amount,
            expense_date: e.expense_date,
            is_recurring: e.is_recurring,
            is_paused: e.is_paused,
            recurring_frequency: e.recurring_frequency,
            total_occurrences: e.total_occurrences,
        }
    }
}
