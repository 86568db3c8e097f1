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

//! [`KnowledgeStore`] adapters: the SQLite chunk collection, and a stand-in
//! used when no collection could be located.

use anyhow::Result;
use serde_json::Value;

use crate::bridge::KnowledgeStore;
use crate::bridge::QueryColumns;
use crate::config::Config;
use crate::config::ConfigCtx;
use crate::embed::build_embedder;
use crate::store::Store;

pub fn from_cwd() -> Box<dyn KnowledgeStore> {
    match ConfigCtx::load_from_cwd() {
        Ok(ctx) => Box::new(SqliteKnowledgeStore::new(ctx)),
        Err(err) => {
            tracing::debug!(error = %format!("{err:#}"), "knowledge store unavailable");
            Box::new(UnavailableStore::new(err))
        }
    }
}

pub struct SqliteKnowledgeStore {
    ctx: ConfigCtx,
}

impl SqliteKnowledgeStore {
    pub fn new(ctx: ConfigCtx) -> Self {
        Self { ctx }
    }

    // Opened per call: a run performs exactly one operation.
    fn open(&self) -> Result<Store> {
        let path = self.ctx.store_path();
        tracing::debug!(path = %path.display(), "opening store");
        Store::open(&path)
    }
}

impl KnowledgeStore for SqliteKnowledgeStore {
    fn collection(&self) -> &str {
        &self.ctx.config.collection
    }

    fn similarity_search(
        &self,
        question: &str,
        n_results: i64,
        language: Option<&str>,
    ) -> Result<QueryColumns> {
        if n_results < 1 {
            anyhow::bail!("n_results must be a positive integer, got {n_results}");
        }
        let k = usize::try_from(n_results)?;
        let embedder = build_embedder(&self.ctx.config)?;
        let store = self.open()?;
        let hits = store.nearest(embedder.as_ref(), question, k, language)?;
        tracing::debug!(hits = hits.len(), k, ?language, "similarity search");

        let mut ids = Vec::with_capacity(hits.len());
        let mut documents = Vec::with_capacity(hits.len());
        let mut metadatas = Vec::with_capacity(hits.len());
        let mut distances = Vec::with_capacity(hits.len());
        for hit in hits {
            ids.push(hit.id);
            documents.push(hit.text);
            metadatas.push(hit.metadata);
            distances.push(f64::from(hit.distance));
        }
        Ok(QueryColumns {
            ids: Some(vec![ids]),
            documents: Some(vec![documents]),
            metadatas: Some(vec![metadatas]),
            distances: Some(vec![distances]),
        })
    }

    fn collection_statistics(&self) -> Result<Value> {
        let stats = self.open()?.stats(&self.ctx.config.collection)?;
        let mut value = serde_json::to_value(stats)?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "embedding".to_string(),
                Value::from(self.ctx.config.embedding.clone()),
            );
            obj.insert(
                "embedding_dim".to_string(),
                Value::from(self.ctx.config.embedding_dim),
            );
        }
        Ok(value)
    }

    fn collection_item_count(&self) -> Result<i64> {
        self.open()?.count()
    }
}

/// Fails every operation with the error that prevented locating the store.
pub struct UnavailableStore {
    collection: String,
    reason: String,
}

impl UnavailableStore {
    pub fn new(err: anyhow::Error) -> Self {
        Self {
            collection: Config::default().collection,
            reason: format!("{err:#}"),
        }
    }

    fn fail<T>(&self) -> Result<T> {
        Err(anyhow::anyhow!("{}", self.reason))
    }
}

impl KnowledgeStore for UnavailableStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    fn similarity_search(
        &self,
        _question: &str,
        _n_results: i64,
        _language: Option<&str>,
    ) -> Result<QueryColumns> {
        self.fail()
    }

    fn collection_statistics(&self) -> Result<Value> {
        self.fail()
    }

    fn collection_item_count(&self) -> Result<i64> {
        self.fail()
    }
}
