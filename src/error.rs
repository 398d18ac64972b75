use thiserror::Error;

use crate::models::StripeEnvironment;

#[derive(Error, Debug)]
pub enum ClerkError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unknown client: {0}")]
    UnknownClient(i64),

    #[error("Unknown expense: {0}")]
    UnknownExpense(i64),

    #[error("Client {client_id} belongs to the {client} environment, but the gateway is configured for {gateway}")]
    EnvironmentMismatch {
        client_id: i64,
        client: StripeEnvironment,
        gateway: StripeEnvironment,
    },

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Missing Stripe secret key (set {0})")]
    MissingApiKey(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ClerkError>;
