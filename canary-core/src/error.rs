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

use thiserror::Error;

/// Error taxonomy for the canary engine. The HTTP boundary maps by kind, not
/// by matching individual variants one-to-one with status codes.
#[derive(Debug, Error)]
pub enum CanaryError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, CanaryError>;

impl From<sqlx::Error> for CanaryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => CanaryError::NotFound("row not found".to_string()),
            other => CanaryError::Internal(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for CanaryError {
    fn from(err: reqwest::Error) -> Self {
        CanaryError::Internal(err.to_string())
    }
}
