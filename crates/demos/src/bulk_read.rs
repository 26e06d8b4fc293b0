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

use bytes::Bytes;
use clap::Parser;
use log::info;
use rand::Rng;
use rowbatch::error::Result;
use rowbatch::{
    CallListener, CallMetadata, Config, FlatRow, KeyBatcher, ReadRowsQuery, ReadRowsResponse,
    RetryingRowReader, RowFilter, Status, TokioWorkerPool, UnaryTransport,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(about = "Batched point reads against an in-memory table with a flaky transport")]
struct Args {
    /// Rows stored in the table
    #[arg(long, default_value_t = 1_000)]
    rows: usize,

    /// Point reads issued per flush; some of them miss
    #[arg(long, default_value_t = 400)]
    reads: usize,

    /// Probability that a single attempt fails with UNAVAILABLE
    #[arg(long, default_value_t = 0.3)]
    failure_rate: f64,

    #[command(flatten)]
    config: Config,
}

/// Serves one table from memory, failing attempts at random.
struct FlakyTable {
    rows: BTreeMap<Bytes, FlatRow>,
    failure_rate: f64,
    attempts: AtomicU32,
}

impl FlakyTable {
    fn new(rows: usize, failure_rate: f64) -> Self {
        let rows = (0..rows)
            .map(|i| {
                let key = user_key(i);
                let row = FlatRow::builder(key.clone())
                    .add_cell("profile", "name", 0, format!("user {i}"))
                    .add_cell("profile", "visits", 0, (i * 7).to_string())
                    .build();
                (Bytes::from(key), row)
            })
            .collect();
        Self {
            rows,
            failure_rate,
            attempts: AtomicU32::new(0),
        }
    }
}

impl UnaryTransport for FlakyTable {
    type Request = ReadRowsQuery;
    type Response = ReadRowsResponse;

    fn start(
        &self,
        request: &ReadRowsQuery,
        mut listener: CallListener<ReadRowsResponse>,
        _metadata: &CallMetadata,
    ) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        let (fail, latency_ms) = {
            let mut rng = rand::rng();
            (rng.random_bool(self.failure_rate), rng.random_range(1..10))
        };
        let response = ReadRowsResponse::new(
            request
                .get_row_keys()
                .iter()
                .filter_map(|key| self.rows.get(key).cloned())
                .collect(),
        );

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(latency_ms)).await;
            if listener.is_cancelled() {
                return;
            }
            if fail {
                listener.on_close(Status::unavailable("tablet server is restarting"));
            } else {
                listener.on_message(response);
                listener.on_close(Status::ok());
            }
        });
    }

    fn is_retryable(&self, _request: &ReadRowsQuery) -> bool {
        true
    }
}

fn user_key(i: usize) -> String {
    format!("user#{i:06}")
}

#[tokio::main]
pub async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let failure_rate = args.failure_rate.clamp(0.0, 0.95);

    let table = Arc::new(FlakyTable::new(args.rows, failure_rate));
    let reader = Arc::new(RetryingRowReader::from_config(
        Arc::clone(&table),
        &args.config,
    )?);
    let pool = Arc::new(TokioWorkerPool::current()?);
    let mut batcher = KeyBatcher::from_config(reader, pool, "users", &args.config)?;

    let mut reads = Vec::with_capacity(args.reads);
    {
        let mut rng = rand::rng();
        for _ in 0..args.reads {
            // a quarter of the reads miss the table
            let id = rng.random_range(0..args.rows + args.rows / 3 + 1);
            let mut query = ReadRowsQuery::new("users").row_key(user_key(id));
            if rng.random_bool(0.5) {
                query = query.filter(RowFilter::CellsPerColumnLimit(1));
            }
            reads.push((id, batcher.add(query)?));
        }
    }
    info!("Flushing {} reads", batcher.pending_keys());
    batcher.flush();

    let (mut found, mut missing, mut failed) = (0, 0, 0);
    for (id, read) in reads {
        match read.await {
            Ok(Some(row)) => {
                found += 1;
                log::debug!(
                    "user {id}: {:?}",
                    row.latest_value("profile", b"name")
                );
            }
            Ok(None) => missing += 1,
            Err(e) => {
                failed += 1;
                println!("user {id}: {e}");
            }
        }
    }

    println!(
        "found={found} missing={missing} failed={failed} attempts={}",
        table.attempts.load(Ordering::Relaxed)
    );
    Ok(())
}
