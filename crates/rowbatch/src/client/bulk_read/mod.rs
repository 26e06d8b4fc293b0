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

//! Bulk point reads.
//!
//! Single-key reads are queued on a [`KeyBatcher`], grouped by filter, and
//! sent as composite reads when the batcher is flushed. Each read gets its
//! own future, which resolves to the row, `None` for a missing row, or the
//! error of the composite read it was part of.
//!
//! # Example
//!
//! ```ignore
//! let reader = Arc::new(RetryingRowReader::from_config(transport, &config)?);
//! let pool = Arc::new(TokioWorkerPool::current()?);
//! let mut batcher = KeyBatcher::from_config(reader, pool, "users", &config)?;
//! let row = batcher.add(ReadRowsQuery::new("users").row_key("alice"))?;
//! batcher.flush();
//! let row = row.await?;
//! ```

mod key_batcher;
mod pending_read;
mod read_batch;

pub use key_batcher::KeyBatcher;
pub use pending_read::RowFuture;
