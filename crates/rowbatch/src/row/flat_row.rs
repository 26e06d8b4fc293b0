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
use std::sync::Arc;

/// A single versioned value of a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    family: String,
    qualifier: Bytes,
    timestamp_micros: i64,
    value: Bytes,
    labels: Vec<String>,
}

impl Cell {
    pub fn new(
        family: impl Into<String>,
        qualifier: impl Into<Bytes>,
        timestamp_micros: i64,
        value: impl Into<Bytes>,
    ) -> Self {
        Self {
            family: family.into(),
            qualifier: qualifier.into(),
            timestamp_micros,
            value: value.into(),
            labels: Vec::new(),
        }
    }

    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn qualifier(&self) -> &Bytes {
        &self.qualifier
    }

    pub fn timestamp_micros(&self) -> i64 {
        self.timestamp_micros
    }

    pub fn value(&self) -> &Bytes {
        &self.value
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// A fully materialized row: its key and every returned cell, in the order
/// the backend sent them.
///
/// Cloning is cheap, since the same row is handed to every caller that asked
/// for its key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatRow {
    row_key: Bytes,
    cells: Arc<[Cell]>,
}

impl FlatRow {
    pub fn new(row_key: impl Into<Bytes>, cells: Vec<Cell>) -> Self {
        Self {
            row_key: row_key.into(),
            cells: cells.into(),
        }
    }

    pub fn builder(row_key: impl Into<Bytes>) -> FlatRowBuilder {
        FlatRowBuilder {
            row_key: row_key.into(),
            cells: Vec::new(),
        }
    }

    pub fn row_key(&self) -> &Bytes {
        &self.row_key
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Latest value of the given column, if present.
    pub fn latest_value(&self, family: &str, qualifier: &[u8]) -> Option<&Bytes> {
        self.cells
            .iter()
            .filter(|c| c.family == family && c.qualifier.as_ref() == qualifier)
            .max_by_key(|c| c.timestamp_micros)
            .map(|c| &c.value)
    }
}

pub struct FlatRowBuilder {
    row_key: Bytes,
    cells: Vec<Cell>,
}

impl FlatRowBuilder {
    pub fn add_cell(
        mut self,
        family: impl Into<String>,
        qualifier: impl Into<Bytes>,
        timestamp_micros: i64,
        value: impl Into<Bytes>,
    ) -> Self {
        self.cells
            .push(Cell::new(family, qualifier, timestamp_micros, value));
        self
    }

    pub fn build(self) -> FlatRow {
        FlatRow::new(self.row_key, self.cells)
    }
}
