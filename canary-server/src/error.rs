// Copyright 2026 Canary Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Maps the core error taxonomy onto HTTP status codes.
//! `InvalidArgument` maps to 422 by default, but a few routes document 400
//! for the same kind (a malformed rating is 422, a response/prompt mismatch
//! is 400) — handlers reach for [`ApiError::validation`] to pick the
//! documented code explicitly in those cases.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use canary_core::CanaryError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{1}")]
    Validation(StatusCode, String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("request deadline exceeded")]
    DeadlineExceeded,
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Validation(status, message.into())
    }
}

impl From<CanaryError> for ApiError {
    fn from(err: CanaryError) -> Self {
        match err {
            CanaryError::InvalidArgument(msg) => ApiError::Validation(StatusCode::UNPROCESSABLE_ENTITY, msg),
            CanaryError::NotFound(msg) => ApiError::NotFound(msg),
            CanaryError::Conflict(msg) => ApiError::Conflict(msg),
            CanaryError::DeadlineExceeded => ApiError::DeadlineExceeded,
            CanaryError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(status, msg) => (status, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::DeadlineExceeded => (StatusCode::GATEWAY_TIMEOUT, "deadline exceeded".to_string()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ErrorBody { detail: message })).into_response()
    }
}
