use chrono::{Months, NaiveDate};

use crate::error::{ClerkError, Result};
use crate::models::{Expense, NewExpense, RecurringFrequency};
use crate::store::Store;

impl NewExpense {
    /// Check the admin's input and clear the recurring-only fields of a
    /// one-off expense.
    pub fn validated(mut self) -> Result<Self> {
        self.description = self.description.trim().to_string();
        if self.description.is_empty() {
            return Err(ClerkError::Validation("description is required".to_string()));
        }
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(ClerkError::Validation(format!(
                "amount must be greater than zero (got {})",
                self.amount
            )));
        }
        if self.is_recurring {
            if self.recurring_frequency.is_none() {
                return Err(ClerkError::Validation(
                    "recurring expenses need a frequency (monthly, quarterly, yearly)".to_string(),
                ));
            }
            if self.total_occurrences == Some(0) {
                return Err(ClerkError::Validation(
                    "total occurrences must be at least 1".to_string(),
                ));
            }
        } else {
            self.is_paused = false;
            self.recurring_frequency = None;
            self.total_occurrences = None;
        }
        Ok(self)
    }

    pub fn next_due_date(&self) -> Option<NaiveDate> {
        if !self.is_recurring {
            return None;
        }
        self.recurring_frequency
            .and_then(|freq| next_due_date(self.expense_date, freq))
    }
}

/// One frequency interval after `from`. Month-end dates clamp to the last day
/// of the target month (Jan 31 + 1 month = Feb 28/29).
pub fn next_due_date(from: NaiveDate, frequency: RecurringFrequency) -> Option<NaiveDate> {
    from.checked_add_months(Months::new(frequency.months()))
}

/// Pause or resume a recurring expense. One-off expenses cannot be paused.
pub fn set_paused<S: Store>(store: &S, id: i64, paused: bool) -> Result<Expense> {
    let expense = store.get_expense(id)?;
    if !expense.is_recurring {
        return Err(ClerkError::Validation(format!(
            "expense {id} is not recurring and cannot be paused or resumed"
        )));
    }
    let mut new = NewExpense::from(&expense);
    new.is_paused = paused;
    store.update_expense(id, &new)
}
