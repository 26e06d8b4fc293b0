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

//! Deadline-aware retries with exponential backoff for unary calls.
//!
//! # Example
//!
//! ```ignore
//! let executor = RetryExecutor::new(transport, RetryOptions::from_config(&config)?);
//! let deadline = Instant::now() + Duration::from_secs(1);
//! let response = executor.execute(request, Some(deadline)).await?;
//! ```

mod backoff;
mod executor;
mod options;

pub use backoff::ExponentialBackoff;
pub use executor::{RETRY_ATTEMPT_HEADER, RetryExecutor, RetryState, RetryingCall};
pub use options::{
    DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_INITIAL_BACKOFF, DEFAULT_JITTER, DEFAULT_MAX_BACKOFF,
    DEFAULT_MAX_ELAPSED_BACKOFF, DEFAULT_RETRYABLE_CODES, RetryOptions, RetryOptionsBuilder,
};
