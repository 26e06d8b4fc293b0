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

use crate::config::Config;
use crate::error::{Error, Result};
use crate::rpc::Code;
use std::collections::HashSet;
use std::time::Duration;

pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(5);
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_ELAPSED_BACKOFF: Duration = Duration::from_secs(60);
pub const DEFAULT_JITTER: f64 = 0.5;

/// Status codes retried unless configured otherwise.
pub const DEFAULT_RETRYABLE_CODES: [Code; 4] = [
    Code::DeadlineExceeded,
    Code::Unavailable,
    Code::Aborted,
    Code::Unauthenticated,
];

/// Backoff policy and status classification shared by every retried call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOptions {
    enable_retries: bool,
    initial_backoff: Duration,
    backoff_multiplier: f64,
    max_backoff: Duration,
    max_elapsed_backoff: Duration,
    jitter: f64,
    retryable_codes: HashSet<Code>,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            enable_retries: true,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_backoff: DEFAULT_MAX_BACKOFF,
            max_elapsed_backoff: DEFAULT_MAX_ELAPSED_BACKOFF,
            jitter: DEFAULT_JITTER,
            retryable_codes: DEFAULT_RETRYABLE_CODES.into_iter().collect(),
        }
    }
}

impl RetryOptions {
    pub fn builder() -> RetryOptionsBuilder {
        RetryOptionsBuilder {
            options: RetryOptions::default(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::builder()
            .enable_retries(config.retry_enabled)
            .initial_backoff(Duration::from_millis(config.retry_initial_backoff_ms))
            .backoff_multiplier(config.retry_backoff_multiplier)
            .max_backoff(Duration::from_millis(config.retry_max_backoff_ms))
            .max_elapsed_backoff(Duration::from_millis(config.retry_max_elapsed_backoff_ms))
            .jitter(config.retry_jitter)
            .build()
    }

    pub fn enable_retries(&self) -> bool {
        self.enable_retries
    }

    pub fn initial_backoff(&self) -> Duration {
        self.initial_backoff
    }

    pub fn backoff_multiplier(&self) -> f64 {
        self.backoff_multiplier
    }

    pub fn max_backoff(&self) -> Duration {
        self.max_backoff
    }

    pub fn max_elapsed_backoff(&self) -> Duration {
        self.max_elapsed_backoff
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    /// Whether a failed attempt closing with `code` is worth retrying.
    pub fn is_retryable(&self, code: Code) -> bool {
        self.retryable_codes.contains(&code)
    }
}

pub struct RetryOptionsBuilder {
    options: RetryOptions,
}

impl RetryOptionsBuilder {
    pub fn enable_retries(mut self, enable_retries: bool) -> Self {
        self.options.enable_retries = enable_retries;
        self
    }

    pub fn initial_backoff(mut self, initial_backoff: Duration) -> Self {
        self.options.initial_backoff = initial_backoff;
        self
    }

    pub fn backoff_multiplier(mut self, backoff_multiplier: f64) -> Self {
        self.options.backoff_multiplier = backoff_multiplier;
        self
    }

    pub fn max_backoff(mut self, max_backoff: Duration) -> Self {
        self.options.max_backoff = max_backoff;
        self
    }

    pub fn max_elapsed_backoff(mut self, max_elapsed_backoff: Duration) -> Self {
        self.options.max_elapsed_backoff = max_elapsed_backoff;
        self
    }

    pub fn jitter(mut self, jitter: f64) -> Self {
        self.options.jitter = jitter;
        self
    }

    /// Replaces the set of retryable codes.
    pub fn retryable_codes(mut self, codes: impl IntoIterator<Item = Code>) -> Self {
        self.options.retryable_codes = codes.into_iter().collect();
        self
    }

    pub fn add_retryable_code(mut self, code: Code) -> Self {
        self.options.retryable_codes.insert(code);
        self
    }

    pub fn build(self) -> Result<RetryOptions> {
        let options = self.options;
        if !options.backoff_multiplier.is_finite() || options.backoff_multiplier < 1.0 {
            return Err(Error::illegal_argument(format!(
                "backoff multiplier must be a finite value >= 1.0, got {}",
                options.backoff_multiplier
            )));
        }
        if !(0.0..1.0).contains(&options.jitter) {
            return Err(Error::illegal_argument(format!(
                "jitter must be in [0, 1), got {}",
                options.jitter
            )));
        }
        if options.initial_backoff.is_zero() {
            return Err(Error::illegal_argument(
                "initial backoff must be greater than zero",
            ));
        }
        if options.initial_backoff > options.max_backoff {
            return Err(Error::illegal_argument(format!(
                "initial backoff {:?} exceeds max backoff {:?}",
                options.initial_backoff, options.max_backoff
            )));
        }
        if options.retryable_codes.contains(&Code::Ok) {
            return Err(Error::illegal_argument("OK cannot be a retryable code"));
        }
        Ok(options)
    }
}
