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

/// Descriptor of a server-side row filter.
///
/// The client never evaluates filters; it only carries them to the backend
/// and compares them structurally, so two separately built but identical
/// filters are interchangeable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RowFilter {
    PassAll,
    BlockAll,
    FamilyNameRegex(String),
    ColumnQualifierRegex(Bytes),
    ValueRegex(Bytes),
    CellsPerColumnLimit(u32),
    CellsPerRowLimit(u32),
    StripValue,
    /// Applies each filter to the output of the previous one.
    Chain(Vec<RowFilter>),
    /// Unions the outputs of all filters.
    Interleave(Vec<RowFilter>),
}

impl RowFilter {
    pub fn chain(filters: impl IntoIterator<Item = RowFilter>) -> Self {
        RowFilter::Chain(filters.into_iter().collect())
    }

    pub fn interleave(filters: impl IntoIterator<Item = RowFilter>) -> Self {
        RowFilter::Interleave(filters.into_iter().collect())
    }
}
