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

use crate::row::{FlatRow, RowFilter};
use bytes::Bytes;
use std::sync::Arc;

/// A read of explicit row keys from one table, optionally filtered.
///
/// Serialization is left to the transport.
///
/// # Example
/// ```ignore
/// let query = ReadRowsQuery::new("users")
///     .row_key("user#1")
///     .filter(RowFilter::CellsPerColumnLimit(1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRowsQuery {
    table_id: Arc<str>,
    row_keys: Vec<Bytes>,
    filter: Option<RowFilter>,
}

impl ReadRowsQuery {
    pub fn new(table_id: impl Into<Arc<str>>) -> Self {
        Self {
            table_id: table_id.into(),
            row_keys: Vec::new(),
            filter: None,
        }
    }

    pub fn row_key(mut self, key: impl Into<Bytes>) -> Self {
        self.row_keys.push(key.into());
        self
    }

    pub fn row_keys<K: Into<Bytes>>(mut self, keys: impl IntoIterator<Item = K>) -> Self {
        self.row_keys.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Sets the filter, replacing any previous one. A query has at most one.
    pub fn filter(mut self, filter: RowFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn table_id(&self) -> &str {
        &self.table_id
    }

    pub fn get_row_keys(&self) -> &[Bytes] {
        &self.row_keys
    }

    pub fn get_filter(&self) -> Option<&RowFilter> {
        self.filter.as_ref()
    }

    pub(crate) fn into_parts(self) -> (Arc<str>, Vec<Bytes>, Option<RowFilter>) {
        (self.table_id, self.row_keys, self.filter)
    }
}

/// Rows returned by a composite read, in ascending key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadRowsResponse {
    pub rows: Vec<FlatRow>,
}

impl ReadRowsResponse {
    pub fn new(rows: Vec<FlatRow>) -> Self {
        Self { rows }
    }
}
