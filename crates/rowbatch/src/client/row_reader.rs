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

use crate::client::query::{ReadRowsQuery, ReadRowsResponse};
use crate::config::Config;
use crate::error::Result;
use crate::row::FlatRow;
use crate::rpc::UnaryTransport;
use crate::rpc::retry::{RetryExecutor, RetryOptions};
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub type RowStream = BoxStream<'static, Result<FlatRow>>;

/// Issues composite reads.
///
/// Rows arrive in ascending key order. The end of the stream is not an error;
/// keys without a row are simply absent.
pub trait RowReader: Send + Sync {
    fn read_rows(&self, query: ReadRowsQuery) -> RowStream;
}

/// A [`RowReader`] that sends each composite read as one retried unary call.
pub struct RetryingRowReader<T>
where
    T: UnaryTransport<Request = ReadRowsQuery, Response = ReadRowsResponse>,
{
    executor: RetryExecutor<T>,
    call_timeout: Option<Duration>,
}

impl<T> RetryingRowReader<T>
where
    T: UnaryTransport<Request = ReadRowsQuery, Response = ReadRowsResponse> + 'static,
{
    pub fn new(executor: RetryExecutor<T>) -> Self {
        Self {
            executor,
            call_timeout: None,
        }
    }

    pub fn from_config(transport: Arc<T>, config: &Config) -> Result<Self> {
        let options = RetryOptions::from_config(config)?;
        let executor = RetryExecutor::new(transport, options).with_operation_name("read_rows");
        let reader = Self::new(executor);
        Ok(match config.read_rows_timeout_ms {
            Some(ms) => reader.with_call_timeout(Duration::from_millis(ms)),
            None => reader,
        })
    }

    /// Bounds every read, retries included, to `timeout` from the moment it
    /// is issued.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    pub fn executor(&self) -> &RetryExecutor<T> {
        &self.executor
    }
}

impl<T> RowReader for RetryingRowReader<T>
where
    T: UnaryTransport<Request = ReadRowsQuery, Response = ReadRowsResponse> + 'static,
{
    /// The call starts when the stream is first polled.
    fn read_rows(&self, query: ReadRowsQuery) -> RowStream {
        let executor = self.executor.clone();
        let call_timeout = self.call_timeout;
        stream::once(async move {
            let deadline = call_timeout.map(|timeout| Instant::now() + timeout);
            executor.execute(query, deadline).await
        })
            .flat_map(|result| match result {
                Ok(response) => stream::iter(response.rows.into_iter().map(Ok)).left_stream(),
                Err(e) => stream::iter([Err(e)]).right_stream(),
            })
            .boxed()
    }
}
