use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Enums stored as TEXT columns: string form, parsing, and SQLite conversions.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, String> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!("unknown {}: {other}", stringify!($name))),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl rusqlite::types::ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
                Ok(self.as_str().into())
            }
        }

        impl rusqlite::types::FromSql for $name {
            fn column_result(
                value: rusqlite::types::ValueRef<'_>,
            ) -> rusqlite::types::FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: String| rusqlite::types::FromSqlError::Other(e.into()))
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StripeEnvironment {
    #[default]
    Test,
    Live,
}

text_enum!(StripeEnvironment { Test => "test", Live => "live" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    #[default]
    Active,
    Inactive,
    Suspended,
}

text_enum!(ClientStatus {
    Active => "active",
    Inactive => "inactive",
    Suspended => "suspended",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Current,
    PastDue,
    #[default]
    Overdue,
    Cancelled,
}

text_enum!(PaymentStatus {
    Current => "current",
    PastDue => "past_due",
    Overdue => "overdue",
    Cancelled => "cancelled",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    PastDue,
    Canceled,
    Unpaid,
    Incomplete,
}

text_enum!(SubscriptionStatus {
    Active => "active",
    PastDue => "past_due",
    Canceled => "canceled",
    Unpaid => "unpaid",
    Incomplete => "incomplete",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    Software,
    Hosting,
    Domain,
    Marketing,
    Advertising,
    Contractor,
    Office,
    Travel,
    Other,
}

text_enum!(ExpenseCategory {
    Software => "software",
    Hosting => "hosting",
    Domain => "domain",
    Marketing => "marketing",
    Advertising => "advertising",
    Contractor => "contractor",
    Office => "office",
    Travel => "travel",
    Other => "other",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurringFrequency {
    Monthly,
    Quarterly,
    Yearly,
}

text_enum!(RecurringFrequency {
    Monthly => "monthly",
    Quarterly => "quarterly",
    Yearly => "yearly",
});

impl RecurringFrequency {
    pub fn months(&self) -> u32 {
        match self {
            Self::Monthly => 1,
            Self::Quarterly => 3,
            Self::Yearly => 12,
        }
    }
}

/// One entry of a client's append-only notes log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub at: DateTime<Utc>,
    pub text: String,
}

/// A single external reference that could not be retrieved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchError {
    pub id: String,
    pub message: String,
    pub error_type: String,
    pub code: Option<String>,
}

/// Per-category fetch failures from the last sync.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncErrors {
    pub customer: Option<FetchError>,
    pub payment_intents: Vec<FetchError>,
    pub subscriptions: Vec<FetchError>,
}

impl SyncErrors {
    pub fn has_errors(&self) -> bool {
        self.customer.is_some() || !self.payment_intents.is_empty() || !self.subscriptions.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    pub business_name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub status: ClientStatus,
    pub payment_status: PaymentStatus,
    pub stripe_environment: StripeEnvironment,
    pub stripe_customer_id: Option<String>,
    pub stripe_payment_intent_ids: Vec<String>,
    pub stripe_subscription_ids: Vec<String>,
    pub total_paid: f64,
    pub subscription_monthly_value: f64,
    pub subscription_status: Option<SubscriptionStatus>,
    pub last_payment_date: Option<DateTime<Utc>>,
    pub notes: Vec<Note>,
    pub sync_errors: Option<SyncErrors>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Client {
    pub fn has_stripe_references(&self) -> bool {
        self.stripe_customer_id.is_some()
            || !self.stripe_payment_intent_ids.is_empty()
            || !self.stripe_subscription_ids.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewClient {
    pub business_name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub stripe_environment: StripeEnvironment,
    pub stripe_customer_id: Option<String>,
}

/// Partial update of a client. `None` leaves a field untouched; for nullable
/// columns `Some(None)` clears the stored value.
#[derive(Debug, Clone, Default)]
pub struct ClientUpdate {
    pub business_name: Option<String>,
    pub contact_name: Option<Option<String>>,
    pub email: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub website: Option<Option<String>>,
    pub status: Option<ClientStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub stripe_environment: Option<StripeEnvironment>,
    pub stripe_customer_id: Option<Option<String>>,
    pub stripe_payment_intent_ids: Option<Vec<String>>,
    pub stripe_subscription_ids: Option<Vec<String>>,
    pub total_paid: Option<f64>,
    pub subscription_monthly_value: Option<f64>,
    pub subscription_status: Option<Option<SubscriptionStatus>>,
    pub last_payment_date: Option<Option<DateTime<Utc>>>,
    pub notes: Option<Vec<Note>>,
    pub sync_errors: Option<Option<SyncErrors>>,
    pub last_synced_at: Option<Option<DateTime<Utc>>>,
}

#[derive(Debug, Clone, Default)]
pub struct ClientFilter {
    pub status: Option<ClientStatus>,
    pub environment: Option<StripeEnvironment>,
    pub payment_status: Option<PaymentStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub client_id: Option<i64>,
    pub category: ExpenseCategory,
    pub description: String,
    pub amount: f64,
    pub expense_date: NaiveDate,
    pub is_recurring: bool,
    pub is_paused: bool,
    pub recurring_frequency: Option<RecurringFrequency>,
    pub total_occurrences: Option<u32>,
    pub next_due_date: Option<NaiveDate>,
}

/// Expense fields as entered by the admin, before validation.
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub client_id: Option<i64>,
    pub category: ExpenseCategory,
    pub description: String,
    pub amount: f64,
    pub expense_date: NaiveDate,
    pub is_recurring: bool,
    pub is_paused: bool,
    pub recurring_frequency: Option<RecurringFrequency>,
    pub total_occurrences: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct ExpenseFilter {
    pub client_id: Option<i64>,
    pub category: Option<ExpenseCategory>,
    pub recurring_only: bool,
}
