// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

/// Errors surfaced by the Agent Lifecycle Manager (§7: `LifecycleError`).
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("agent not found")]
    NotFound,
    #[error("only the owning user may perform this operation")]
    Forbidden,
    #[error("{0}")]
    NameConflict(String),
    #[error("failed to materialise agent: {0}")]
    Materialization(String),
    #[error(transparent)]
    Store(iris_store::StoreError),
}

impl From<iris_store::StoreError> for LifecycleError {
    fn from(err: iris_store::StoreError) -> Self {
        match err {
            iris_store::StoreError::NotFound => LifecycleError::NotFound,
            iris_store::StoreError::Conflict(msg) => LifecycleError::NameConflict(msg),
            other => LifecycleError::Store(other),
        }
    }
}

impl From<anyhow::Error> for LifecycleError {
    fn from(err: anyhow::Error) -> Self {
        LifecycleError::Materialization(err.to_string())
    }
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;
