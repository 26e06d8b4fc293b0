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

use crate::error::{Error, Result};
use futures::future::BoxFuture;
use tokio::runtime::Handle;

/// Runs dispatched units of work asynchronously.
///
/// No ordering is guaranteed between submissions.
pub trait WorkerPool: Send + Sync {
    fn submit(&self, work: BoxFuture<'static, ()>);
}

/// A [`WorkerPool`] backed by a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioWorkerPool {
    handle: Handle,
}

impl TokioWorkerPool {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Uses the runtime the caller is running on.
    pub fn current() -> Result<Self> {
        let handle = Handle::try_current().map_err(|e| Error::IllegalArgument {
            message: format!("no tokio runtime to run bulk reads on: {e}"),
        })?;
        Ok(Self::new(handle))
    }
}

impl WorkerPool for TokioWorkerPool {
    fn submit(&self, work: BoxFuture<'static, ()>) {
        // detached; results flow back through each read's future
        self.handle.spawn(work);
    }
}
