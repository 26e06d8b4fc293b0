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

use crate::rpc::retry::RetryOptions;
use rand::Rng;
use std::time::Duration;

/// Exponential backoff: the n-th delay (0-based) is
/// `min(initial * multiplier^n, max)`, scaled by a random factor in
/// `[1 - jitter, 1 + jitter]`.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_ms: f64,
    max_ms: f64,
    multiplier: f64,
    jitter: f64,
    retry_count: u32,
}

impl ExponentialBackoff {
    pub fn new(options: &RetryOptions) -> Self {
        Self {
            initial_ms: duration_to_ms(options.initial_backoff()),
            max_ms: duration_to_ms(options.max_backoff()),
            multiplier: options.backoff_multiplier(),
            jitter: options.jitter(),
            retry_count: 0,
        }
    }

    /// Number of delays handed out so far.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn next_delay(&mut self) -> Duration {
        let term = self.unjittered_ms(self.retry_count);
        self.retry_count = self.retry_count.saturating_add(1);
        let jitter_factor = if self.jitter > 0.0 {
            1.0 - self.jitter + rand::rng().random::<f64>() * (2.0 * self.jitter)
        } else {
            1.0
        };
        Duration::from_secs_f64((term * jitter_factor).max(0.0) / 1000.0)
    }

    fn unjittered_ms(&self, retry_count: u32) -> f64 {
        let exp = i32::try_from(retry_count).unwrap_or(i32::MAX);
        // powi overflows to infinity, which min() clamps back to max_ms
        (self.initial_ms * self.multiplier.powi(exp)).min(self.max_ms)
    }
}

fn duration_to_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
