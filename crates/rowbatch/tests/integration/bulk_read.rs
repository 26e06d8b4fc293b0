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

#[cfg(test)]
mod bulk_read_test {
    use crate::integration::utils::{TableServer, keys};
    use clap::Parser;
    use futures::future::join_all;
    use rowbatch::{
        Code, Config, Error, KeyBatcher, ReadRowsQuery, RetryingRowReader, RowFilter, Status,
        TokioWorkerPool,
    };
    use std::sync::Arc;

    fn batcher_for(server: &Arc<TableServer>, config: &Config) -> KeyBatcher {
        let reader = RetryingRowReader::from_config(Arc::clone(server), config)
            .expect("valid retry config");
        let pool = TokioWorkerPool::current().expect("inside runtime");
        KeyBatcher::from_config(Arc::new(reader), Arc::new(pool), "users", config)
            .expect("valid batcher config")
    }

    #[tokio::test]
    async fn large_flush_is_split_by_batch_size() {
        let server = Arc::new(TableServer::new("users").with_rows(keys(0..250)));
        let config = Config::default();
        let mut batcher = batcher_for(&server, &config);

        let wanted = keys(0..300);
        let reads: Vec<_> = wanted
            .iter()
            .map(|k| {
                batcher
                    .add(ReadRowsQuery::new("users").row_key(k.clone()))
                    .expect("added")
            })
            .collect();
        batcher.flush();

        let results = join_all(reads).await;
        for (key, result) in wanted.iter().zip(results) {
            let row = result.expect("read succeeded");
            if key.as_str() < "user#0250" {
                let row = row.expect("row exists");
                assert_eq!(row.row_key(), key.as_bytes());
                assert!(row.latest_value("cf", b"name").is_some());
            } else {
                assert!(row.is_none(), "{key} should not exist");
            }
        }

        let mut sizes: Vec<_> = server
            .served_queries()
            .iter()
            .map(|q| q.get_row_keys().len())
            .collect();
        sizes.sort();
        assert_eq!(sizes, vec![50, 125, 125]);
    }

    #[tokio::test]
    async fn filters_travel_with_their_batch() {
        let server = Arc::new(TableServer::new("users").with_rows(keys(0..4)));
        let mut batcher = batcher_for(&server, &Config::default());
        let all = keys(0..4);

        let full = batcher
            .add(ReadRowsQuery::new("users").row_key(all[0].clone()))
            .expect("added");
        let stripped = batcher
            .add(
                ReadRowsQuery::new("users")
                    .row_key(all[0].clone())
                    .filter(RowFilter::StripValue),
            )
            .expect("added");
        batcher.flush();

        let full = full.await.expect("ok").expect("found");
        let stripped = stripped.await.expect("ok").expect("found");
        assert!(!full.cells()[0].value().is_empty());
        assert!(stripped.cells()[0].value().is_empty());
        assert_eq!(server.served_queries().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried_per_batch() {
        let server = Arc::new(
            TableServer::new("users")
                .with_rows(keys(0..10))
                .failing(2, Status::unavailable("tablet is moving")),
        );
        let config = Config::parse_from(["rowbatch", "--bulk-read-batch-size", "5"]);
        let mut batcher = batcher_for(&server, &config);

        let reads: Vec<_> = keys(0..10)
            .into_iter()
            .map(|k| batcher.add(ReadRowsQuery::new("users").row_key(k)).expect("added"))
            .collect();
        batcher.flush();

        for result in join_all(reads).await {
            assert!(result.expect("recovered").is_some());
        }
        assert_eq!(server.attempts(), 6);
        assert_eq!(server.served_queries().len(), 2);
    }

    #[tokio::test]
    async fn fatal_status_fails_every_read_in_the_batch() {
        let server = Arc::new(
            TableServer::new("users")
                .with_rows(keys(0..3))
                .failing(1, Status::new(Code::PermissionDenied, "no read access")),
        );
        let mut batcher = batcher_for(&server, &Config::default());

        let reads: Vec<_> = keys(0..3)
            .into_iter()
            .map(|k| batcher.add(ReadRowsQuery::new("users").row_key(k)).expect("added"))
            .collect();
        batcher.flush();

        for result in join_all(reads).await {
            let err = result.expect_err("batch failed");
            assert!(matches!(err, Error::NonRetryableStatus { .. }));
            assert_eq!(err.code(), Code::PermissionDenied);
        }
        assert_eq!(server.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn call_timeout_exhausts_retries() {
        let server = Arc::new(TableServer::new("users").failing(u32::MAX, Status::unavailable("down")));
        let config = Config::parse_from(["rowbatch", "--read-rows-timeout-ms", "1000"]);
        let mut batcher = batcher_for(&server, &config);

        let read = batcher
            .add(ReadRowsQuery::new("users").row_key("user#0001"))
            .expect("added");
        let start = tokio::time::Instant::now();
        batcher.flush();

        let err = read.await.expect_err("exhausted");
        let elapsed = start.elapsed();
        assert!(err.is_retries_exhausted());
        assert_eq!(err.status().map(Status::code), Some(Code::Unavailable));
        assert!(elapsed >= std::time::Duration::from_millis(1000), "{elapsed:?}");
        assert!(elapsed <= std::time::Duration::from_millis(1050), "{elapsed:?}");
    }
}
