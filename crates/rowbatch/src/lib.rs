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

//! Client-side bulk point reads for a wide-column key-value store.
//!
//! Point reads of one table are merged by [`KeyBatcher`] into composite
//! reads that go out through a [`RowReader`]. [`RetryingRowReader`] sends each
//! composite read as one unary call driven by a [`RetryExecutor`], which
//! retries retryable failures with jittered exponential backoff until the
//! call's deadline.

pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod row;
pub mod rpc;

#[cfg(test)]
mod test_utils;

pub use client::{
    KeyBatcher, ReadRowsQuery, ReadRowsResponse, RetryingRowReader, RowFuture, RowReader,
    RowStream, TokioWorkerPool, WorkerPool,
};
pub use config::Config;
pub use error::{Error, Result};
pub use row::{Cell, FlatRow, RowFilter, RowKey};
pub use rpc::retry::{RetryExecutor, RetryOptions, RetryingCall};
pub use rpc::{CallListener, CallMetadata, Code, Status, UnaryTransport};
