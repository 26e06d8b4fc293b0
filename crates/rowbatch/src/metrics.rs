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

//! Metric name constants and helpers for rowbatch instrumentation.
//!
//! Uses the [`metrics`] crate facade pattern: library code emits metrics via
//! `counter!`/`histogram!` macros, and the application installs a recorder
//! (e.g. `metrics-exporter-prometheus`) to collect them. When no recorder is
//! installed, all metric calls are no-ops.

use crate::row::RowFilter;

// ---------------------------------------------------------------------------
// Label keys
// ---------------------------------------------------------------------------

pub const LABEL_OPERATION: &str = "operation";
pub const LABEL_FILTER: &str = "filter";

// ---------------------------------------------------------------------------
// Retry executor metrics
//
// attempts counts every call attempt, retries only the attempts scheduled
// after a retryable failure.
// ---------------------------------------------------------------------------

pub const RPC_ATTEMPTS_TOTAL: &str = "rowbatch.rpc.attempts.total";
pub const RPC_RETRIES_TOTAL: &str = "rowbatch.rpc.retries.total";
pub const RPC_RETRIES_EXHAUSTED_TOTAL: &str = "rowbatch.rpc.retries_exhausted.total";
pub const RPC_FAILURES_TOTAL: &str = "rowbatch.rpc.failures.total";

// ---------------------------------------------------------------------------
// Bulk read metrics
// ---------------------------------------------------------------------------

pub const BULK_READ_BATCHES_TOTAL: &str = "rowbatch.bulk_read.batches.total";
pub const BULK_READ_BATCH_SIZE: &str = "rowbatch.bulk_read.batch_size";
pub const BULK_READ_ROWS_NOT_FOUND_TOTAL: &str = "rowbatch.bulk_read.rows_not_found.total";
pub const BULK_READ_BATCH_FAILURES_TOTAL: &str = "rowbatch.bulk_read.batch_failures.total";

/// Label value distinguishing filtered from unfiltered batches. Filter values
/// themselves are never used as labels to keep cardinality bounded.
pub(crate) fn filter_label(filter: Option<&RowFilter>) -> &'static str {
    match filter {
        Some(_) => "filtered",
        None => "unfiltered",
    }
}
