// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use crate::rpc::{Code, Status};
use std::sync::Arc;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by the bulk read and retry layers.
///
/// The error is `Clone` because a single batch failure is fanned out to every
/// pending read of that batch.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("Illegal argument: {message}")]
    IllegalArgument { message: String },

    #[error("Transport failure: {message}")]
    TransportFailure {
        message: String,
        #[source]
        source: Option<Arc<dyn std::error::Error + Send + Sync + 'static>>,
    },

    #[error("Retries exhausted after {attempts} attempts, last status: {status}")]
    RetriesExhausted { attempts: u32, status: Status },

    #[error("Non-retryable status: {status}")]
    NonRetryableStatus { status: Status },

    #[error("Cancelled: {message}")]
    Cancelled { message: String },

    #[error("Dropped: {message}")]
    Dropped { message: String },
}

impl Error {
    pub fn illegal_argument(message: impl Into<String>) -> Self {
        Error::IllegalArgument {
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Error::TransportFailure {
            message: message.into(),
            source: None,
        }
    }

    pub fn transport_with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::TransportFailure {
            message: message.into(),
            source: Some(Arc::new(source)),
        }
    }

    /// Returns the RPC status carried by this error, if any.
    pub fn status(&self) -> Option<&Status> {
        match self {
            Error::RetriesExhausted { status, .. } | Error::NonRetryableStatus { status } => {
                Some(status)
            }
            _ => None,
        }
    }

    /// Returns the status code carried by this error, mapping local failures
    /// onto the closest code.
    pub fn code(&self) -> Code {
        match self {
            Error::RetriesExhausted { status, .. } | Error::NonRetryableStatus { status } => {
                status.code()
            }
            Error::IllegalArgument { .. } => Code::InvalidArgument,
            Error::Cancelled { .. } => Code::Cancelled,
            Error::TransportFailure { .. } => Code::Unavailable,
            Error::Dropped { .. } => Code::Aborted,
        }
    }

    pub fn is_retries_exhausted(&self) -> bool {
        matches!(self, Error::RetriesExhausted { .. })
    }
}
