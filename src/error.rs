//! Unified error model for the column engine.
//! Every fault raised by resolvers, the sort compiler, the mutation gateway and the
//! collection store is expressed as an `AppError` so the host adapter has a single
//! type to surface (or swallow) at its boundary.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    UserInput { code: String, message: String },
    NotFound { code: String, message: String },
    Conflict { code: String, message: String },
    Declined { code: String, message: String },
    NotEditable { code: String, message: String },
    Exec { code: String, message: String },
    Io { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::UserInput { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Conflict { code, .. }
            | AppError::Declined { code, .. }
            | AppError::NotEditable { code, .. }
            | AppError::Exec { code, .. }
            | AppError::Io { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::UserInput { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Conflict { message, .. }
            | AppError::Declined { message, .. }
            | AppError::NotEditable { message, .. }
            | AppError::Exec { message, .. }
            | AppError::Io { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn user(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::UserInput { code: code.into(), message: msg.into() } }
    pub fn not_found(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn conflict(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Conflict { code: code.into(), message: msg.into() } }
    pub fn declined(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Declined { code: code.into(), message: msg.into() } }
    pub fn not_editable(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::NotEditable { code: code.into(), message: msg.into() } }
    pub fn exec(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Exec { code: code.into(), message: msg.into() } }
    pub fn io(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Io { code: code.into(), message: msg.into() } }
    pub fn internal(code: impl Into<String>, msg: impl Into<String>) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// True for outcomes a writer produces on purpose: bad input, a missing
    /// referenced entity, a collision, or the user saying no. The host shows these
    /// as a refusal rather than as a fault.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            AppError::UserInput { .. }
                | AppError::NotFound { .. }
                | AppError::Conflict { .. }
                | AppError::Declined { .. }
                | AppError::NotEditable { .. }
        )
    }

    /// Text placed in a table cell when resolving that cell failed.
    pub fn cell_marker(&self) -> String {
        format!("[error: {}]", self.message())
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        // Default mapping: treat as Exec unless downcasted elsewhere
        AppError::Exec { code: "exec_error".into(), message: err.to_string() }
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => AppError::NotFound { code: "no_rows".into(), message: "query returned no rows".into() },
            other => AppError::Exec { code: "sqlite_error".into(), message: other.to_string() },
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
