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

//! A group of point reads sharing one filter, sent as one composite read.

use super::pending_read::{PendingRead, RowFuture};
use crate::client::query::ReadRowsQuery;
use crate::client::row_reader::RowReader;
use crate::error::Error;
use crate::metrics::{
    BULK_READ_BATCH_FAILURES_TOTAL, BULK_READ_ROWS_NOT_FOUND_TOTAL, LABEL_FILTER, filter_label,
};
use crate::row::{FlatRow, RowFilter, RowKey, compare_row_keys};
use futures::StreamExt;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;

pub(crate) struct ReadBatch {
    table_id: Arc<str>,
    filter: Option<RowFilter>,
    reads: HashMap<RowKey, Vec<PendingRead>>,
    /// Number of pending reads, duplicates included.
    len: usize,
}

impl ReadBatch {
    pub(crate) fn new(table_id: Arc<str>, filter: Option<RowFilter>) -> Self {
        Self {
            table_id,
            filter,
            reads: HashMap::new(),
            len: 0,
        }
    }

    pub(crate) fn add_key(&mut self, key: RowKey) -> RowFuture {
        let (read, future) = PendingRead::new();
        self.push(key, read);
        future
    }

    fn push(&mut self, key: RowKey, read: PendingRead) {
        self.reads.entry(key).or_default().push(read);
        self.len += 1;
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn key_count(&self) -> usize {
        self.reads.len()
    }

    pub(crate) fn filter(&self) -> Option<&RowFilter> {
        self.filter.as_ref()
    }

    /// Splits the batch into chunks of at most `threshold` reads.
    ///
    /// Chunks cover contiguous ranges of the unsigned byte order of keys. Reads
    /// of one key stay adjacent but may straddle a chunk boundary.
    pub(crate) fn split(mut self, threshold: usize) -> Vec<ReadBatch> {
        if self.len <= threshold || threshold == 0 {
            return vec![self];
        }

        let table_id = Arc::clone(&self.table_id);
        let filter = self.filter.take();
        let mut entries: Vec<(RowKey, PendingRead)> = Vec::with_capacity(self.len);
        for (key, reads) in std::mem::take(&mut self.reads) {
            for read in reads {
                entries.push((key.clone(), read));
            }
        }
        entries.sort_by(|(a, _), (b, _)| compare_row_keys(a.as_bytes(), b.as_bytes()));

        let mut batches = Vec::with_capacity(entries.len().div_ceil(threshold));
        let mut current = ReadBatch::new(Arc::clone(&table_id), filter.clone());
        for (key, read) in entries {
            if current.len == threshold {
                let full = std::mem::replace(
                    &mut current,
                    ReadBatch::new(Arc::clone(&table_id), filter.clone()),
                );
                batches.push(full);
            }
            current.push(key, read);
        }
        if !current.is_empty() {
            batches.push(current);
        }
        batches
    }

    /// The composite read for this batch: distinct keys in ascending order.
    pub(crate) fn query(&self) -> ReadRowsQuery {
        let mut keys: Vec<&RowKey> = self.reads.keys().collect();
        keys.sort_by(|a, b| compare_row_keys(a.as_bytes(), b.as_bytes()));
        let query = ReadRowsQuery::new(Arc::clone(&self.table_id))
            .row_keys(keys.into_iter().map(|k| k.bytes().clone()));
        match &self.filter {
            Some(filter) => query.filter(filter.clone()),
            None => query,
        }
    }

    /// Issues the composite read and resolves every pending read.
    ///
    /// A failure of the row stream fails every read not yet resolved with the
    /// same error. Keys the stream never returned resolve to `None`.
    pub(crate) async fn execute(mut self, reader: Arc<dyn RowReader>) {
        let query = self.query();
        let label = filter_label(self.filter.as_ref());
        debug!(
            "Reading {} rows ({} keys) from table {}",
            self.len,
            self.reads.len(),
            self.table_id
        );

        let mut rows = reader.read_rows(query);
        while let Some(next) = rows.next().await {
            match next {
                Ok(row) => self.complete_row(row),
                Err(e) => {
                    warn!(
                        "Bulk read of {} keys from table {} failed: {e}",
                        self.reads.len(),
                        self.table_id
                    );
                    metrics::counter!(BULK_READ_BATCH_FAILURES_TOTAL, LABEL_FILTER => label)
                        .increment(1);
                    self.complete_exceptionally(e);
                    return;
                }
            }
        }

        let missing = self.reads.len();
        if missing > 0 {
            debug!("{missing} keys not found in table {}", self.table_id);
            metrics::counter!(BULK_READ_ROWS_NOT_FOUND_TOTAL, LABEL_FILTER => label)
                .increment(missing as u64);
        }
        for (_, reads) in self.reads.drain() {
            for mut read in reads {
                read.complete(Ok(None));
            }
        }
        self.len = 0;
    }

    fn complete_row(&mut self, row: FlatRow) {
        let Some(reads) = self.reads.remove(&row.row_key()[..]) else {
            warn!(
                "Ignoring row {} from table {}: key was not requested or was already resolved",
                row.row_key().escape_ascii(),
                self.table_id
            );
            return;
        };
        self.len -= reads.len();
        for mut read in reads {
            read.complete(Ok(Some(row.clone())));
        }
    }

    fn complete_exceptionally(&mut self, error: Error) {
        for (_, reads) in self.reads.drain() {
            for mut read in reads {
                read.complete(Err(error.clone()));
            }
        }
        self.len = 0;
    }
}
