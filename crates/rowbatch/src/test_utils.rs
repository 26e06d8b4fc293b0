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

use crate::client::{ReadRowsQuery, RowReader, RowStream, WorkerPool};
use crate::error::Error;
use crate::row::FlatRow;
use crate::rpc::{CallListener, CallMetadata, Status, UnaryTransport};
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

/// What a [`MockTransport`] does with one attempt.
pub(crate) enum MockReply<Resp> {
    Respond(Resp),
    Fail(Status),
    /// Closes with OK but never delivers a message.
    CloseOk,
    /// Keeps the listener open until the test inspects it.
    Hang,
}

type ReplyFn<Resp> = dyn Fn(u32, &CallMetadata) -> MockReply<Resp> + Send + Sync;

/// A transport whose attempts are answered by a script, keyed by the
/// 1-based attempt number.
pub(crate) struct MockTransport<Resp, Req = String> {
    reply: Box<ReplyFn<Resp>>,
    retryable: bool,
    calls: AtomicU32,
    seen_metadata: Mutex<Vec<CallMetadata>>,
    hanging: Mutex<Vec<CallListener<Resp>>>,
    _request: PhantomData<fn(&Req)>,
}

impl<Resp, Req> MockTransport<Resp, Req> {
    pub(crate) fn new<F>(reply: F) -> Self
    where
        F: Fn(u32, &CallMetadata) -> MockReply<Resp> + Send + Sync + 'static,
    {
        Self {
            reply: Box::new(reply),
            retryable: true,
            calls: AtomicU32::new(0),
            seen_metadata: Mutex::new(Vec::new()),
            hanging: Mutex::new(Vec::new()),
            _request: PhantomData,
        }
    }

    pub(crate) fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::Acquire)
    }

    pub(crate) fn seen_metadata(&self) -> Vec<CallMetadata> {
        self.seen_metadata.lock().clone()
    }

    /// Whether the `index`-th attempt that hung has been cancelled.
    pub(crate) fn hanging_listener_cancelled(&self, index: usize) -> bool {
        self.hanging
            .lock()
            .get(index)
            .is_some_and(CallListener::is_cancelled)
    }
}

impl<Resp, Req> UnaryTransport for MockTransport<Resp, Req>
where
    Resp: Send + 'static,
    Req: Send + Sync + 'static,
{
    type Request = Req;
    type Response = Resp;

    fn start(&self, _request: &Req, mut listener: CallListener<Resp>, metadata: &CallMetadata) {
        self.seen_metadata.lock().push(metadata.clone());
        let attempt = self.calls.load(Ordering::Acquire) + 1;
        match (self.reply)(attempt, metadata) {
            MockReply::Respond(response) => {
                listener.on_message(response);
                listener.on_close(Status::ok());
            }
            MockReply::Fail(status) => listener.on_close(status),
            MockReply::CloseOk => listener.on_close(Status::ok()),
            MockReply::Hang => self.hanging.lock().push(listener),
        }
        self.calls.store(attempt, Ordering::Release);
    }

    fn is_retryable(&self, _request: &Req) -> bool {
        self.retryable
    }
}

/// A [`RowReader`] over an in-memory table.
///
/// Returns the stored rows of the requested keys in key order, followed by
/// any extra rows, and records every query it receives.
pub(crate) struct InMemoryRowReader {
    rows: Mutex<BTreeMap<Bytes, FlatRow>>,
    extra_rows: Mutex<Vec<FlatRow>>,
    failure: Mutex<Option<(usize, Error)>>,
    queries: Mutex<Vec<ReadRowsQuery>>,
}

impl InMemoryRowReader {
    pub(crate) fn new() -> Self {
        Self {
            rows: Mutex::new(BTreeMap::new()),
            extra_rows: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn insert(&self, row: FlatRow) {
        self.rows.lock().insert(row.row_key().clone(), row);
    }

    /// Appends `row` to every response, whether or not it was requested.
    pub(crate) fn add_extra_row(&self, row: FlatRow) {
        self.extra_rows.lock().push(row);
    }

    /// Makes every read fail with `error` after yielding `rows` rows.
    pub(crate) fn fail_after(&self, rows: usize, error: Error) {
        *self.failure.lock() = Some((rows, error));
    }

    pub(crate) fn queries(&self) -> Vec<ReadRowsQuery> {
        self.queries.lock().clone()
    }
}

impl RowReader for InMemoryRowReader {
    fn read_rows(&self, query: ReadRowsQuery) -> RowStream {
        let mut results: Vec<crate::error::Result<FlatRow>> = {
            let rows = self.rows.lock();
            let mut keys = query.get_row_keys().to_vec();
            keys.sort();
            keys.iter()
                .filter_map(|key| rows.get(key).cloned())
                .map(Ok)
                .collect()
        };
        results.extend(self.extra_rows.lock().iter().cloned().map(Ok));
        if let Some((rows, error)) = self.failure.lock().as_ref() {
            results.truncate(*rows);
            results.push(Err(error.clone()));
        }
        self.queries.lock().push(query);
        stream::iter(results).boxed()
    }
}

/// A [`WorkerPool`] that holds submitted work until the test runs it.
pub(crate) struct RecordingWorkerPool {
    submitted: AtomicUsize,
    work: Mutex<Vec<BoxFuture<'static, ()>>>,
}

impl RecordingWorkerPool {
    pub(crate) fn new() -> Self {
        Self {
            submitted: AtomicUsize::new(0),
            work: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn submitted(&self) -> usize {
        self.submitted.load(Ordering::Acquire)
    }

    pub(crate) async fn run_all(&self) {
        let work = std::mem::take(&mut *self.work.lock());
        futures::future::join_all(work).await;
    }
}

impl WorkerPool for RecordingWorkerPool {
    fn submit(&self, work: BoxFuture<'static, ()>) {
        self.submitted.fetch_add(1, Ordering::AcqRel);
        self.work.lock().push(work);
    }
}
