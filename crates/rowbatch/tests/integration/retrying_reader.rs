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
mod retrying_reader_test {
    use crate::integration::utils::{TableServer, keys};
    use futures::StreamExt;
    use rowbatch::{
        Code, Error, ReadRowsQuery, RetryExecutor, RetryOptions, RetryingRowReader, RowReader,
        Status,
    };
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::Instant;

    fn query() -> ReadRowsQuery {
        ReadRowsQuery::new("users").row_keys(keys(0..3))
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_four_unavailable_attempts() {
        let server = Arc::new(
            TableServer::new("users")
                .with_rows(keys(0..3))
                .failing(4, Status::unavailable("tablet is moving")),
        );
        let executor = RetryExecutor::new(Arc::clone(&server), RetryOptions::default());

        let mut call = executor.execute(query(), None);
        let response = (&mut call).await.expect("recovered");

        assert_eq!(response.rows.len(), 3);
        assert_eq!(call.attempts(), 5);
        assert_eq!(server.attempts(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn default_budget_is_exhausted_after_a_minute() {
        let server =
            Arc::new(TableServer::new("users").failing(u32::MAX, Status::unavailable("down")));
        let executor = RetryExecutor::new(Arc::clone(&server), RetryOptions::default());

        let start = Instant::now();
        let err = executor
            .execute(query(), None)
            .await
            .expect_err("exhausted");
        let elapsed = start.elapsed();

        assert!(err.is_retries_exhausted());
        assert_eq!(err.code(), Code::Unavailable);
        assert!(elapsed >= Duration::from_secs(60), "{elapsed:?}");
        assert!(elapsed <= Duration::from_millis(60_050), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn caller_deadline_wins_over_default_budget() {
        let server =
            Arc::new(TableServer::new("users").failing(u32::MAX, Status::unavailable("down")));
        let executor = RetryExecutor::new(Arc::clone(&server), RetryOptions::default());

        let start = Instant::now();
        let err = executor
            .execute(query(), Some(start + Duration::from_secs(1)))
            .await
            .expect_err("exhausted");
        let elapsed = start.elapsed();

        match err {
            Error::RetriesExhausted { attempts, status } => {
                assert_eq!(status.code(), Code::Unavailable);
                assert_eq!(attempts, server.attempts());
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(elapsed >= Duration::from_secs(1), "{elapsed:?}");
        assert!(elapsed <= Duration::from_millis(1_050), "{elapsed:?}");
    }

    #[tokio::test]
    async fn unknown_table_is_not_retried() {
        let server = Arc::new(TableServer::new("users"));
        let reader = RetryingRowReader::new(RetryExecutor::new(
            Arc::clone(&server),
            RetryOptions::default(),
        ));

        let rows: Vec<_> = reader
            .read_rows(ReadRowsQuery::new("orders").row_key("o#1"))
            .collect()
            .await;

        assert_eq!(rows.len(), 1);
        let err = rows[0].as_ref().expect_err("unknown table");
        assert!(matches!(err, Error::NonRetryableStatus { .. }));
        assert_eq!(err.code(), Code::NotFound);
        assert_eq!(server.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_call_stops_retrying() {
        let server =
            Arc::new(TableServer::new("users").failing(u32::MAX, Status::unavailable("down")));
        let executor = RetryExecutor::new(Arc::clone(&server), RetryOptions::default());

        let mut call = executor.execute(query(), None);
        tokio::time::sleep(Duration::from_millis(100)).await;
        call.cancel();
        let err = (&mut call).await.expect_err("cancelled");
        assert!(matches!(err, Error::Cancelled { .. }));

        let attempts = server.attempts();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(server.attempts(), attempts);
    }
}
