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

//! Retry state machine for unary calls.
//!
//! Every invocation moves through `Init -> Attempting -> (RetryWait ->
//! Attempting)* -> terminal`, where the terminal outcome is exactly one of
//! success, exhaustion of the retry budget, a fatal status, or cancellation.
//! Waits between attempts are tokio timers, so no thread is held while a call
//! backs off.

use crate::error::{Error, Result};
use crate::metrics::{
    LABEL_OPERATION, RPC_ATTEMPTS_TOTAL, RPC_FAILURES_TOTAL, RPC_RETRIES_EXHAUSTED_TOTAL,
    RPC_RETRIES_TOTAL,
};
use crate::rpc::retry::{ExponentialBackoff, RetryOptions};
use crate::rpc::{CallListener, CallMetadata, CallOutcome, Status, UnaryTransport};
use log::{debug, warn};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Header carrying the 1-based attempt number of each call attempt.
pub const RETRY_ATTEMPT_HEADER: &str = "x-retry-attempt";

const DEFAULT_OPERATION_NAME: &str = "unary_call";

/// Drives unary calls through retries, backoff and deadlines.
///
/// The executor itself is cheap to clone and holds no per-call state; each
/// [`execute`](Self::execute) spawns an independent state machine on the
/// current tokio runtime.
pub struct RetryExecutor<T: UnaryTransport> {
    transport: Arc<T>,
    options: Arc<RetryOptions>,
    metadata: CallMetadata,
    operation_name: Arc<str>,
}

impl<T: UnaryTransport> Clone for RetryExecutor<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            options: Arc::clone(&self.options),
            metadata: self.metadata.clone(),
            operation_name: Arc::clone(&self.operation_name),
        }
    }
}

impl<T> RetryExecutor<T>
where
    T: UnaryTransport + 'static,
{
    pub fn new(transport: Arc<T>, options: RetryOptions) -> Self {
        Self {
            transport,
            options: Arc::new(options),
            metadata: CallMetadata::new(),
            operation_name: Arc::from(DEFAULT_OPERATION_NAME),
        }
    }

    /// Headers sent with every attempt, in addition to [`RETRY_ATTEMPT_HEADER`].
    pub fn with_metadata(mut self, metadata: CallMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Name used in logs and metric labels.
    pub fn with_operation_name(mut self, operation_name: impl Into<Arc<str>>) -> Self {
        self.operation_name = operation_name.into();
        self
    }

    pub fn options(&self) -> &RetryOptions {
        &self.options
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Starts `request` and returns a future for its single terminal result.
    ///
    /// The effective deadline is the earlier of `deadline` and now plus the
    /// configured maximum elapsed backoff. Must be called within a tokio
    /// runtime.
    pub fn execute(
        &self,
        request: T::Request,
        deadline: Option<Instant>,
    ) -> RetryingCall<T::Response> {
        let cancel = CancellationToken::new();
        let attempts = Arc::new(AtomicU32::new(0));
        let (result_tx, result_rx) = oneshot::channel();

        let operation = RetryingOperation {
            transport: Arc::clone(&self.transport),
            backoff: ExponentialBackoff::new(&self.options),
            state: RetryState::new(Instant::now(), &self.options, deadline),
            options: Arc::clone(&self.options),
            metadata: self.metadata.clone(),
            operation_name: Arc::clone(&self.operation_name),
            request,
            retry_eligible: false,
            cancel: cancel.clone(),
            attempts: Arc::clone(&attempts),
            result_tx: Some(result_tx),
        };
        tokio::spawn(operation.run());

        RetryingCall {
            result_rx,
            cancel,
            attempts,
        }
    }
}

/// Caller side of one retried call.
///
/// Resolves exactly once. Dropping it or calling [`cancel`](Self::cancel)
/// stops any scheduled retry and signals the in-flight attempt.
pub struct RetryingCall<Resp> {
    result_rx: oneshot::Receiver<Result<Resp>>,
    cancel: CancellationToken,
    attempts: Arc<AtomicU32>,
}

impl<Resp> RetryingCall<Resp> {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// A token that cancels this call, usable while the call is being awaited.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Number of attempts started so far.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Acquire)
    }
}

impl<Resp> Future for RetryingCall<Resp> {
    type Output = Result<Resp>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.result_rx).poll(cx).map(|result| {
            result.unwrap_or_else(|_| {
                Err(Error::Dropped {
                    message: "retrying operation ended without a result".to_string(),
                })
            })
        })
    }
}

impl<Resp> Drop for RetryingCall<Resp> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Per-invocation bookkeeping: attempts made, timing and the last failure.
#[derive(Debug, Clone)]
pub struct RetryState {
    attempts: u32,
    started: Instant,
    caller_deadline: Option<Instant>,
    deadline: Instant,
    last_status: Option<Status>,
}

impl RetryState {
    pub fn new(started: Instant, options: &RetryOptions, caller_deadline: Option<Instant>) -> Self {
        let budget_end = started
            .checked_add(options.max_elapsed_backoff())
            .unwrap_or_else(|| far_future(started));
        let deadline = match caller_deadline {
            Some(caller_deadline) => budget_end.min(caller_deadline),
            None => budget_end,
        };
        Self {
            attempts: 0,
            started,
            caller_deadline,
            deadline,
            last_status: None,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    /// The earlier of the caller's deadline and the elapsed-time budget.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn last_status(&self) -> Option<&Status> {
        self.last_status.as_ref()
    }

    /// Delay before the next attempt, or `None` once the budget is spent.
    ///
    /// The delay never reaches past the effective deadline: a backoff longer
    /// than the remaining budget is cut short so the last attempt starts
    /// exactly at the deadline.
    pub fn next_delay(&self, backoff: &mut ExponentialBackoff, now: Instant) -> Option<Duration> {
        let remaining = self.deadline.saturating_duration_since(now);
        if remaining.is_zero() {
            return None;
        }
        Some(backoff.next_delay().min(remaining))
    }

    fn caller_deadline_passed(&self, now: Instant) -> bool {
        self.caller_deadline.is_some_and(|deadline| deadline <= now)
    }
}

fn far_future(from: Instant) -> Instant {
    from + Duration::from_secs(86400 * 365 * 30)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Init,
    Attempting,
    RetryWait(Duration),
}

struct RetryingOperation<T: UnaryTransport> {
    transport: Arc<T>,
    options: Arc<RetryOptions>,
    metadata: CallMetadata,
    operation_name: Arc<str>,
    request: T::Request,
    state: RetryState,
    backoff: ExponentialBackoff,
    retry_eligible: bool,
    cancel: CancellationToken,
    attempts: Arc<AtomicU32>,
    result_tx: Option<oneshot::Sender<Result<T::Response>>>,
}

impl<T: UnaryTransport> RetryingOperation<T> {
    async fn run(mut self) {
        let result = self.drive().await;
        self.complete(result);
    }

    fn complete(&mut self, result: Result<T::Response>) {
        if let Some(tx) = self.result_tx.take() {
            // the caller may have dropped its end
            let _ = tx.send(result);
        }
    }

    async fn drive(&mut self) -> Result<T::Response> {
        let mut phase = Phase::Init;
        loop {
            phase = match phase {
                Phase::Init => {
                    self.retry_eligible =
                        self.options.enable_retries() && self.transport.is_retryable(&self.request);
                    if self.state.caller_deadline_passed(Instant::now()) {
                        return Err(Error::NonRetryableStatus {
                            status: Status::deadline_exceeded(
                                "deadline expired before the first attempt",
                            ),
                        });
                    }
                    Phase::Attempting
                }
                Phase::Attempting => match self.attempt().await? {
                    Ok(response) => {
                        debug!(
                            "{} succeeded after {} attempt(s)",
                            self.operation_name, self.state.attempts
                        );
                        return Ok(response);
                    }
                    Err(status) => self.on_failure(status)?,
                },
                Phase::RetryWait(delay) => {
                    if self.cancel.is_cancelled() {
                        return Err(cancelled_error());
                    }
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => return Err(cancelled_error()),
                        _ = tokio::time::sleep(delay) => Phase::Attempting,
                    }
                }
            };
        }
    }

    /// Runs one attempt. The outer error is cancellation; the inner one is the
    /// failed attempt's status.
    async fn attempt(&mut self) -> Result<std::result::Result<T::Response, Status>> {
        if self.cancel.is_cancelled() {
            return Err(cancelled_error());
        }
        self.state.attempts += 1;
        self.attempts.store(self.state.attempts, Ordering::Release);
        metrics::counter!(RPC_ATTEMPTS_TOTAL, LABEL_OPERATION => self.operation_name.to_string())
            .increment(1);

        let mut metadata = self.metadata.clone();
        metadata.insert(RETRY_ATTEMPT_HEADER, self.state.attempts.to_string());
        let (listener, outcome_rx) = CallListener::new(self.cancel.child_token());
        self.transport.start(&self.request, listener, &metadata);

        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(cancelled_error()),
            outcome = outcome_rx => outcome,
        };
        let CallOutcome { message, status } = outcome.unwrap_or_else(|_| CallOutcome {
            message: None,
            status: Status::internal("call listener went away without a status"),
        });

        if status.is_ok() {
            return Ok(message.ok_or_else(|| {
                Status::internal("unary call completed without a response message")
            }));
        }
        Ok(Err(status))
    }

    fn on_failure(&mut self, status: Status) -> Result<Phase> {
        let retryable = self.retry_eligible
            && self
                .transport
                .is_retryable_status(&self.request, &status, &self.options);
        self.state.last_status = Some(status.clone());

        if !retryable {
            metrics::counter!(RPC_FAILURES_TOTAL, LABEL_OPERATION => self.operation_name.to_string())
                .increment(1);
            debug!(
                "{} failed with non-retryable status {} on attempt {}",
                self.operation_name, status, self.state.attempts
            );
            return Err(Error::NonRetryableStatus { status });
        }

        if self.cancel.is_cancelled() {
            return Err(cancelled_error());
        }

        match self.state.next_delay(&mut self.backoff, Instant::now()) {
            Some(delay) => {
                metrics::counter!(RPC_RETRIES_TOTAL, LABEL_OPERATION => self.operation_name.to_string())
                    .increment(1);
                warn!(
                    "{} attempt {} failed with {}, retrying in {:?}",
                    self.operation_name, self.state.attempts, status, delay
                );
                Ok(Phase::RetryWait(delay))
            }
            None => {
                metrics::counter!(
                    RPC_RETRIES_EXHAUSTED_TOTAL,
                    LABEL_OPERATION => self.operation_name.to_string()
                )
                .increment(1);
                warn!(
                    "{} exhausted its retry budget after {} attempt(s) and {:?}, last status: {}",
                    self.operation_name,
                    self.state.attempts,
                    self.state.started.elapsed(),
                    status
                );
                Err(Error::RetriesExhausted {
                    attempts: self.state.attempts,
                    status,
                })
            }
        }
    }
}

fn cancelled_error() -> Error {
    Error::Cancelled {
        message: "retrying call was cancelled by the caller".to_string(),
    }
}
