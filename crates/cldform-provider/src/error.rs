//! Provider error types
//!
//! These cover the local persistence layer only. Everything that happens inside
//! a resource or data source operation is reported as [`crate::Diagnostics`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("State file error: {0}")]
    State(String),

    #[error("Lock acquisition failed: {0}")]
    Lock(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ProviderError>;
