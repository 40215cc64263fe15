// Copyright 2026 Pulse Scheduler Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Error taxonomy for the scheduler: validation, not-found, not-ready, and
//! internal. Validation and not-found errors cross the HTTP boundary
//! unchanged; internal errors are cycle-local and never escape to a caller.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SchedulerError>;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("scheduler not ready")]
    NotReady,

    #[error("internal error: {0}")]
    Internal(String),
}

impl SchedulerError {
    pub fn unknown_partition(name: &str) -> Self {
        SchedulerError::Validation(format!("unknown partition: {name}"))
    }

    pub fn oversized(dimension: impl std::fmt::Display, requested: impl std::fmt::Display, capacity: impl std::fmt::Display) -> Self {
        SchedulerError::Validation(format!(
            "requested {dimension} ({requested}) exceeds partition capacity ({capacity})"
        ))
    }

    pub fn time_limit_exceeded(requested: u32, max: u32) -> Self {
        SchedulerError::Validation(format!(
            "time limit ({requested}min) exceeds partition max ({max}min)"
        ))
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for SchedulerError {
    fn into_response(self) -> Response {
        let status = match &self {
            SchedulerError::Validation(_) => StatusCode::BAD_REQUEST,
            SchedulerError::NotFound(_) => StatusCode::NOT_FOUND,
            SchedulerError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            SchedulerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            detail: self.to_string(),
        };
        (status, axum::Json(body)).into_response()
    }
}
