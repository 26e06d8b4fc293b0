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

//! Unary call transport abstraction.
//!
//! A transport issues one attempt of a remote call and reports back through a
//! [`CallListener`]: at most one response message, followed by exactly one
//! terminal [`Status`]. The listener is backed by a oneshot channel so the
//! retry layer can await the outcome without holding a thread.

use crate::rpc::Status;
use crate::rpc::retry::RetryOptions;
use log::warn;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// Request headers sent along with every attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallMetadata {
    entries: Vec<(String, String)>,
}

impl CallMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What a single attempt produced once its listener was closed.
#[derive(Debug)]
pub struct CallOutcome<Resp> {
    pub message: Option<Resp>,
    pub status: Status,
}

/// Receives the result of a single call attempt.
///
/// `on_message` may be invoked at most once; extra messages are logged and
/// dropped. `on_close` consumes the listener, so the terminal status can only
/// be delivered once. A listener dropped without being closed reports an
/// `INTERNAL` status.
pub struct CallListener<Resp> {
    message: Option<Resp>,
    outcome_tx: Option<oneshot::Sender<CallOutcome<Resp>>>,
    cancel: CancellationToken,
}

impl<Resp> CallListener<Resp> {
    pub(crate) fn new(cancel: CancellationToken) -> (Self, oneshot::Receiver<CallOutcome<Resp>>) {
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let listener = Self {
            message: None,
            outcome_tx: Some(outcome_tx),
            cancel,
        };
        (listener, outcome_rx)
    }

    pub fn on_message(&mut self, message: Resp) {
        if self.message.is_some() {
            warn!("Unary call received more than one response message, dropping the extra one");
            return;
        }
        self.message = Some(message);
    }

    pub fn on_close(mut self, status: Status) {
        self.close(status);
    }

    /// Returns true once the caller gave up on this attempt. Transports should
    /// abandon the in-flight call when they observe it.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves when the caller gives up on this attempt.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    /// A token that is cancelled together with this attempt, for transports
    /// that move the listener into a callback and still want to watch it.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn close(&mut self, status: Status) {
        if let Some(tx) = self.outcome_tx.take() {
            // the caller may already be gone
            let _ = tx.send(CallOutcome {
                message: self.message.take(),
                status,
            });
        }
    }
}

impl<Resp> Drop for CallListener<Resp> {
    fn drop(&mut self) {
        if self.outcome_tx.is_some() {
            self.close(Status::internal(
                "call listener dropped without a terminal status",
            ));
        }
    }
}

/// Issues unary call attempts on behalf of the retry layer.
///
/// Implementations must be thread safe; one transport is shared by every
/// concurrent call.
pub trait UnaryTransport: Send + Sync {
    type Request: Send + Sync + 'static;
    type Response: Send + 'static;

    /// Starts one attempt of `request`. The outcome is reported through
    /// `listener`, either before returning or later from any thread.
    fn start(
        &self,
        request: &Self::Request,
        listener: CallListener<Self::Response>,
        metadata: &CallMetadata,
    );

    /// Whether `request` may be retried at all. Idempotent reads usually are;
    /// some mutations are not.
    fn is_retryable(&self, request: &Self::Request) -> bool;

    /// Whether a failed attempt of `request` that closed with `status` may be
    /// retried. Defaults to the code set configured in `options`.
    fn is_retryable_status(
        &self,
        _request: &Self::Request,
        status: &Status,
        options: &RetryOptions,
    ) -> bool {
        options.is_retryable(status.code())
    }
}
