// Copyright 2026 Recall Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Runs one operation against a [`KnowledgeStore`] and turns whatever comes
//! back into an [`Envelope`]. Nothing raised by the store escapes this module.

use std::fmt;

use anyhow::Result;
use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::invocation::Invocation;
use crate::invocation::InvocationError;
use crate::invocation::ResultCount;
use crate::invocation::SearchRequest;
use crate::output::Envelope;
use crate::output::SearchHit;

/// Column-oriented similarity search result. Every field is nested one level;
/// index 0 of the outer list is the result set of the single query.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct QueryColumns {
    pub ids: Option<Vec<Vec<Option<String>>>>,
    pub documents: Option<Vec<Vec<String>>>,
    pub metadatas: Option<Vec<Vec<Option<Map<String, Value>>>>>,
    pub distances: Option<Vec<Vec<f64>>>,
}

pub trait KnowledgeStore {
    /// Name of the collection operations run against.
    fn collection(&self) -> &str;

    fn similarity_search(
        &self,
        question: &str,
        n_results: i64,
        language: Option<&str>,
    ) -> Result<QueryColumns>;

    fn collection_statistics(&self) -> Result<Value>;

    fn collection_item_count(&self) -> Result<i64>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Search,
    Stats,
    Health,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Search => "search",
            Operation::Stats => "stats",
            Operation::Health => "health",
        })
    }
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct BackendError {
    pub operation: Operation,
    pub message: String,
}

impl BackendError {
    pub fn new(operation: Operation, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }

    fn from_anyhow(operation: Operation, err: anyhow::Error) -> Self {
        Self::new(operation, format!("{err:#}"))
    }
}

pub struct Bridge {
    store: Box<dyn KnowledgeStore>,
}

impl Bridge {
    pub fn new(store: Box<dyn KnowledgeStore>) -> Self {
        Self { store }
    }

    pub fn execute(&self, invocation: Invocation) -> Envelope {
        tracing::debug!(?invocation, collection = self.store.collection(), "dispatch");
        match invocation {
            Invocation::Search(req) => self.search(&req),
            Invocation::Stats => self.stats(),
            Invocation::Health => self.health(),
        }
    }

    /// Envelope for a document that never became an [`Invocation`].
    pub fn reject(&self, err: &InvocationError) -> Envelope {
        tracing::debug!(%err, "rejected request document");
        Envelope::error(&err.to_string())
    }

    pub fn search(&self, req: &SearchRequest) -> Envelope {
        match self.try_search(req) {
            Ok(hits) => Envelope::search(&req.question, hits),
            Err(err) => {
                log_failure(&err);
                Envelope::search_error(&err.message, &req.question)
            }
        }
    }

    pub fn stats(&self) -> Envelope {
        match self.store.collection_statistics() {
            Ok(stats) => Envelope::stats(stats),
            Err(err) => {
                let err = BackendError::from_anyhow(Operation::Stats, err);
                log_failure(&err);
                Envelope::error(&err.message)
            }
        }
    }

    pub fn health(&self) -> Envelope {
        match self.store.collection_item_count() {
            Ok(count) => Envelope::healthy(self.store.collection(), count),
            Err(err) => {
                let err = BackendError::from_anyhow(Operation::Health, err);
                log_failure(&err);
                Envelope::unhealthy(&err.message)
            }
        }
    }

    fn try_search(&self, req: &SearchRequest) -> Result<Vec<SearchHit>, BackendError> {
        let n_results = match &req.n_results {
            ResultCount::Count(n) => *n,
            ResultCount::Invalid(value) => {
                return Err(BackendError::new(
                    Operation::Search,
                    format!("n_results must be an integer, got {value}"),
                ));
            }
        };
        let columns = self
            .store
            .similarity_search(&req.question, n_results, req.language.as_deref())
            .map_err(|err| BackendError::from_anyhow(Operation::Search, err))?;
        rows_from_columns(columns)
    }
}

// Failures are already reported in the envelope; stderr stays quiet by default.
fn log_failure(err: &BackendError) {
    tracing::debug!(operation = %err.operation, error = %err.message, "backend call failed");
}

/// Pivots the parallel columns into one hit per document, keeping backend
/// rank order.
pub fn rows_from_columns(columns: QueryColumns) -> Result<Vec<SearchHit>, BackendError> {
    let documents = first_set(columns.documents).unwrap_or_default();
    if documents.is_empty() {
        return Ok(Vec::new());
    }
    let total = documents.len();

    let ids = first_set(columns.ids);
    let metadatas = first_set(columns.metadatas);
    let distances = first_set(columns.distances);
    check_len("ids", ids.as_ref().map(Vec::len), total)?;
    check_len("metadatas", metadatas.as_ref().map(Vec::len), total)?;

    let mut ids = ids.map(Vec::into_iter);
    let mut metadatas = metadatas.map(Vec::into_iter);
    let distances = distances.unwrap_or_default();

    let hits = documents
        .into_iter()
        .enumerate()
        .map(|(idx, content)| {
            let id = ids
                .as_mut()
                .and_then(|it| it.next())
                .flatten()
                .unwrap_or_else(|| format!("result_{idx}"));
            let metadata = metadatas
                .as_mut()
                .and_then(|it| it.next())
                .flatten()
                .unwrap_or_default();
            SearchHit {
                id,
                content,
                metadata,
                // A short distances column leaves the tail unscored.
                distance: distances.get(idx).copied(),
            }
        })
        .collect();
    Ok(hits)
}

// An absent column and an empty outer list both mean "not reported".
fn first_set<T>(column: Option<Vec<Vec<T>>>) -> Option<Vec<T>> {
    column.and_then(|outer| outer.into_iter().next())
}

fn check_len(column: &str, len: Option<usize>, expected: usize) -> Result<(), BackendError> {
    match len {
        Some(len) if len != expected => Err(BackendError::new(
            Operation::Search,
            format!("ragged query result: {len} {column} for {expected} documents"),
        )),
        _ => Ok(()),
    }
}
