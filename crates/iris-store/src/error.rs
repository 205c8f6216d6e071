// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

/// Errors surfaced by the Chat Session Store.
///
/// `iris_lifecycle::LifecycleError` and `iris_gateway::ApiError` each carry a
/// `From<StoreError>` impl that maps these onto their own error kinds
/// (`Conflict` → `LifecycleError::NameConflict` → HTTP 409, etc.).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Maps a Postgres unique-violation (SQLSTATE 23505) to `Conflict`;
    /// everything else passes through as `Database`.
    pub fn from_sqlx(err: sqlx::Error, conflict_msg: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some("23505") {
                return StoreError::Conflict(conflict_msg.to_string());
            }
        }
        StoreError::Database(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
