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

//! Accumulates point reads and dispatches them as composite reads.

use super::pending_read::RowFuture;
use super::read_batch::ReadBatch;
use crate::client::query::ReadRowsQuery;
use crate::client::row_reader::RowReader;
use crate::client::worker_pool::WorkerPool;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::metrics::{BULK_READ_BATCH_SIZE, BULK_READ_BATCHES_TOTAL, LABEL_FILTER, filter_label};
use crate::row::{RowFilter, RowKey};
use futures::FutureExt;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

/// Merges single-key reads of one table into composite reads.
///
/// Reads are grouped by filter and held until [`flush`](Self::flush), which
/// hands every group to the worker pool, split into requests of at most
/// `batch_size` reads. The batcher is not shared; wrap it in a lock to add
/// from several tasks.
///
/// # Example
///
/// ```ignore
/// let mut batcher = KeyBatcher::new(reader, worker_pool, "users", 125)?;
/// let alice = batcher.add(ReadRowsQuery::new("users").row_key("alice"))?;
/// let bob = batcher.add(ReadRowsQuery::new("users").row_key("bob"))?;
/// batcher.flush();
/// let (alice, bob) = futures::join!(alice, bob);
/// ```
pub struct KeyBatcher {
    reader: Arc<dyn RowReader>,
    worker_pool: Arc<dyn WorkerPool>,
    table_id: Arc<str>,
    batch_size: usize,
    batches: HashMap<Option<RowFilter>, ReadBatch>,
}

impl KeyBatcher {
    pub fn new(
        reader: Arc<dyn RowReader>,
        worker_pool: Arc<dyn WorkerPool>,
        table_id: impl Into<Arc<str>>,
        batch_size: usize,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::illegal_argument(
                "bulk read batch size must be greater than zero",
            ));
        }
        Ok(Self {
            reader,
            worker_pool,
            table_id: table_id.into(),
            batch_size,
            batches: HashMap::new(),
        })
    }

    pub fn from_config(
        reader: Arc<dyn RowReader>,
        worker_pool: Arc<dyn WorkerPool>,
        table_id: impl Into<Arc<str>>,
        config: &Config,
    ) -> Result<Self> {
        Self::new(reader, worker_pool, table_id, config.bulk_read_batch_size)
    }

    /// Queues a read of the single row key in `query`.
    ///
    /// The returned future resolves after a later [`flush`](Self::flush) with
    /// the row, `None` if it does not exist, or the error that failed its
    /// composite read. Queries that do not name exactly one non-empty key, or
    /// that target another table, are rejected here.
    pub fn add(&mut self, query: ReadRowsQuery) -> Result<RowFuture> {
        let (table_id, row_keys, filter) = query.into_parts();
        if !table_id.is_empty() && table_id != self.table_id {
            return Err(Error::illegal_argument(format!(
                "query for table {table_id} added to a batcher for table {}",
                self.table_id
            )));
        }
        let [row_key]: [_; 1] = row_keys.try_into().map_err(|keys: Vec<_>| {
            Error::illegal_argument(format!(
                "a batched read must name exactly one row key, got {}",
                keys.len()
            ))
        })?;
        let row_key = RowKey::new(row_key)?;

        let batch = self
            .batches
            .entry(filter)
            .or_insert_with_key(|filter| ReadBatch::new(Arc::clone(&self.table_id), filter.clone()));
        Ok(batch.add_key(row_key))
    }

    /// Dispatches every queued read and clears the batcher.
    ///
    /// Returns without waiting for any read. Does nothing when no read is
    /// queued.
    pub fn flush(&mut self) {
        if self.batches.is_empty() {
            return;
        }
        for (_, batch) in std::mem::take(&mut self.batches) {
            let label = filter_label(batch.filter());
            for part in batch.split(self.batch_size) {
                debug!(
                    "Dispatching bulk read of {} keys ({} reads) for table {}",
                    part.key_count(),
                    part.len(),
                    self.table_id
                );
                metrics::counter!(BULK_READ_BATCHES_TOTAL, LABEL_FILTER => label).increment(1);
                metrics::histogram!(BULK_READ_BATCH_SIZE, LABEL_FILTER => label)
                    .record(part.len() as f64);
                self.worker_pool
                    .submit(part.execute(Arc::clone(&self.reader)).boxed());
            }
        }
    }

    pub fn table_id(&self) -> &str {
        &self.table_id
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of queued reads, duplicates included.
    pub fn pending_keys(&self) -> usize {
        self.batches.values().map(ReadBatch::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}
