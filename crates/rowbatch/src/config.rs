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

use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Parser, Debug, Clone, PartialEq, Deserialize, Serialize)]
#[command(author, version, about, long_about = None)]
#[serde(default)]
pub struct Config {
    /// Maximum number of row keys merged into one bulk read request
    /// Default: 125
    #[arg(long, default_value_t = 125)]
    pub bulk_read_batch_size: usize,

    /// Per-call timeout of a composite read, in milliseconds. Unset means the
    /// retry budget alone bounds the call.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_rows_timeout_ms: Option<u64>,

    /// Whether failed calls with a retryable status are retried at all
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub retry_enabled: bool,

    /// Delay before the first retry
    /// Default: 5
    #[arg(long, default_value_t = 5)]
    pub retry_initial_backoff_ms: u64,

    /// Growth factor applied to the delay after every retry
    /// Default: 2.0
    #[arg(long, default_value_t = 2.0)]
    pub retry_backoff_multiplier: f64,

    /// Upper bound of a single retry delay
    /// Default: 60000
    #[arg(long, default_value_t = 60_000)]
    pub retry_max_backoff_ms: u64,

    /// Total time a call may spend retrying before it is reported as exhausted
    /// Default: 60000
    #[arg(long, default_value_t = 60_000)]
    pub retry_max_elapsed_backoff_ms: u64,

    /// Random spread applied to every delay, as a fraction in [0, 1)
    /// Default: 0.5
    #[arg(long, default_value_t = 0.5)]
    pub retry_jitter: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bulk_read_batch_size: 125,
            read_rows_timeout_ms: None,
            retry_enabled: true,
            retry_initial_backoff_ms: 5,
            retry_backoff_multiplier: 2.0,
            retry_max_backoff_ms: 60_000,
            retry_max_elapsed_backoff_ms: 60_000,
            retry_jitter: 0.5,
        }
    }
}
