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

//! Single-assignment result of one point read.

use crate::error::{Error, Result};
use crate::row::FlatRow;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

type ReadResult = Result<Option<FlatRow>>;

/// The batch-side half of a point read.
///
/// Completing consumes the sender, so a read resolves at most once. A read
/// dropped before completion resolves with [`Error::Dropped`], which keeps
/// callers from waiting on a batch that will never run.
pub(crate) struct PendingRead {
    result_tx: Option<oneshot::Sender<ReadResult>>,
}

impl PendingRead {
    pub(crate) fn new() -> (Self, RowFuture) {
        let (result_tx, result_rx) = oneshot::channel();
        (
            Self {
                result_tx: Some(result_tx),
            },
            RowFuture { result_rx },
        )
    }

    /// Completes the read. Returns false if it had already been completed.
    pub(crate) fn complete(&mut self, result: ReadResult) -> bool {
        match self.result_tx.take() {
            Some(tx) => {
                // the caller may have stopped waiting
                let _ = tx.send(result);
                true
            }
            None => false,
        }
    }

    pub(crate) fn is_done(&self) -> bool {
        self.result_tx.is_none()
    }
}

impl Drop for PendingRead {
    fn drop(&mut self) {
        if !self.is_done() {
            self.complete(Err(Error::Dropped {
                message: "point read was dropped before its batch completed".to_string(),
            }));
        }
    }
}

/// Resolves to the row for the requested key, `None` if the row does not
/// exist, or the error that failed its batch.
#[must_use = "the row is only observable through this future"]
pub struct RowFuture {
    result_rx: oneshot::Receiver<ReadResult>,
}

impl Future for RowFuture {
    type Output = ReadResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.result_rx).poll(cx).map(|result| {
            result.unwrap_or_else(|_| {
                Err(Error::Dropped {
                    message: "point read result channel closed".to_string(),
                })
            })
        })
    }
}
