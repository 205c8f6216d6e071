// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! The single error type every HTTP handler returns (§7). Converts from
//! each crate's own error type and performs the kind→status mapping; no
//! handler matches on a status code directly.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("authentication failed")]
    AuthFailure,
    #[error("not found")]
    NotFound,
    #[error("forbidden")]
    Forbidden,
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("model error: {0}")]
    ModelError(String),
    #[error("store error: {0}")]
    StoreError(String),
    #[error("cancelled")]
    Cancelled,
}

impl From<iris_lifecycle::LifecycleError> for ApiError {
    fn from(err: iris_lifecycle::LifecycleError) -> Self {
        use iris_lifecycle::LifecycleError::*;
        match err {
            NotFound => ApiError::NotFound,
            Forbidden => ApiError::Forbidden,
            NameConflict(msg) => ApiError::Conflict(msg),
            Materialization(msg) => ApiError::ModelError(msg),
            Store(e) => e.into(),
        }
    }
}

impl From<iris_store::StoreError> for ApiError {
    fn from(err: iris_store::StoreError) -> Self {
        use iris_store::StoreError::*;
        match err {
            NotFound => ApiError::NotFound,
            Conflict(msg) => ApiError::Conflict(msg),
            Database(e) => ApiError::StoreError(e.to_string()),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::ModelError(err.to_string())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::AuthFailure => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ModelError(_) | ApiError::StoreError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            // 499 isn't a registered IANA status; axum still lets us send it.
            ApiError::Cancelled => StatusCode::from_u16(499).unwrap(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
