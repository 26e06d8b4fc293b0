/*
 * Licensed to the Apache Software Foundation (ASF) under one
 * or more contributor license agreements.  See the NOTICE file
 * distributed with this work for additional information
 * regarding copyright ownership.  The ASF licenses this file
 * to you under the Apache License, Version 2.0 (the
 * "License"); you may not use this file except in compliance
 * with the License.  You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */
use bytes::Bytes;
use parking_lot::Mutex;
use rowbatch::rpc::retry::RETRY_ATTEMPT_HEADER;
use rowbatch::{
    CallListener, CallMetadata, Code, FlatRow, ReadRowsQuery, ReadRowsResponse, RowFilter, Status,
    UnaryTransport,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// A backend table served over an in-process unary transport.
///
/// Every attempt is answered from a spawned task after `latency`. Attempts
/// up to `failing_attempts` of each call fail with `failure`.
pub struct TableServer {
    table_id: String,
    rows: Mutex<BTreeMap<Bytes, FlatRow>>,
    latency: Duration,
    failing_attempts: u32,
    failure: Status,
    attempts: AtomicU32,
    queries: Mutex<Vec<ReadRowsQuery>>,
}

impl TableServer {
    pub fn new(table_id: &str) -> Self {
        Self {
            table_id: table_id.to_string(),
            rows: Mutex::new(BTreeMap::new()),
            latency: Duration::from_millis(2),
            failing_attempts: 0,
            failure: Status::unavailable("tablet is moving"),
            attempts: AtomicU32::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Fails the first `attempts` attempts of every call with `status`.
    pub fn failing(mut self, attempts: u32, status: Status) -> Self {
        self.failing_attempts = attempts;
        self.failure = status;
        self
    }

    pub fn with_rows(self, keys: impl IntoIterator<Item = String>) -> Self {
        {
            let mut rows = self.rows.lock();
            for key in keys {
                let row = FlatRow::builder(key.clone())
                    .add_cell("cf", "name", 1_000, format!("value-{key}"))
                    .build();
                rows.insert(Bytes::from(key), row);
            }
        }
        self
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Acquire)
    }

    /// Queries that reached the read path, failed attempts excluded.
    pub fn served_queries(&self) -> Vec<ReadRowsQuery> {
        self.queries.lock().clone()
    }

    fn serve(&self, query: &ReadRowsQuery) -> Result<ReadRowsResponse, Status> {
        if query.table_id() != self.table_id {
            return Err(Status::new(
                Code::NotFound,
                format!("table {} does not exist", query.table_id()),
            ));
        }
        self.queries.lock().push(query.clone());
        let rows = self.rows.lock();
        let mut keys = query.get_row_keys().to_vec();
        keys.sort();
        let found = keys
            .iter()
            .filter_map(|key| rows.get(key))
            .map(|row| match query.get_filter() {
                Some(RowFilter::StripValue) => strip_values(row),
                _ => row.clone(),
            })
            .collect();
        Ok(ReadRowsResponse::new(found))
    }
}

fn strip_values(row: &FlatRow) -> FlatRow {
    let mut builder = FlatRow::builder(row.row_key().clone());
    for cell in row.cells() {
        builder = builder.add_cell(
            cell.family(),
            cell.qualifier().clone(),
            cell.timestamp_micros(),
            Bytes::new(),
        );
    }
    builder.build()
}

impl UnaryTransport for TableServer {
    type Request = ReadRowsQuery;
    type Response = ReadRowsResponse;

    fn start(
        &self,
        request: &ReadRowsQuery,
        mut listener: CallListener<ReadRowsResponse>,
        metadata: &CallMetadata,
    ) {
        self.attempts.fetch_add(1, Ordering::AcqRel);
        let attempt: u32 = metadata
            .get(RETRY_ATTEMPT_HEADER)
            .and_then(|v| v.parse().ok())
            .unwrap_or(1);
        let outcome = if attempt <= self.failing_attempts {
            Err(self.failure.clone())
        } else {
            self.serve(request)
        };

        let latency = self.latency;
        tokio::spawn(async move {
            tokio::select! {
                _ = listener.cancelled() => {}
                _ = tokio::time::sleep(latency) => match outcome {
                    Ok(response) => {
                        listener.on_message(response);
                        listener.on_close(Status::ok());
                    }
                    Err(status) => listener.on_close(status),
                },
            }
        });
    }

    fn is_retryable(&self, _request: &ReadRowsQuery) -> bool {
        true
    }
}

pub fn keys(range: std::ops::Range<usize>) -> Vec<String> {
    range.map(|i| format!("user#{i:04}")).collect()
}
