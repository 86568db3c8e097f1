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

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use anyhow::Result;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::params;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::embed::Embedder;
use crate::embed::cosine_similarity;
use crate::embed::from_bytes;

/// Read-only handle on a chunk collection written by the ingestion pipeline.
pub struct Store {
    pub conn: Connection,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub id: Option<String>,
    pub text: String,
    pub metadata: Option<Map<String, Value>>,
    pub distance: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub collection: String,
    pub total_chunks: i64,
    pub embedded_chunks: i64,
    pub languages: BTreeMap<String, i64>,
    pub sources: i64,
    pub db_size_bytes: u64,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("store not found at {}", path.display());
        }
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .with_context(|| format!("open {}", path.display()))?;
        conn.busy_timeout(Duration::from_millis(5000))
            .context("set busy timeout")?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM chunk", [], |row| row.get(0))
            .context("count chunks")
    }

    pub fn stats(&self, collection: &str) -> Result<StoreStats> {
        let total_chunks = self.count()?;
        let embedded_chunks: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM chunk WHERE embedding IS NOT NULL",
                [],
                |row| row.get(0),
            )
            .context("count embedded chunks")?;

        let mut stmt = self.conn.prepare(
            "SELECT COALESCE(CAST(json_extract(metadata, '$.language') AS TEXT), 'unknown'), COUNT(*)\n             FROM chunk GROUP BY 1",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        let mut languages = BTreeMap::new();
        for row in rows {
            let (language, count) = row.context("read language counts")?;
            languages.insert(language, count);
        }

        let sources: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(DISTINCT json_extract(metadata, '$.source')) FROM chunk",
                [],
                |row| row.get(0),
            )
            .context("count sources")?;
        let db_size_bytes = std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);

        Ok(StoreStats {
            collection: collection.to_string(),
            total_chunks,
            embedded_chunks,
            languages,
            sources,
            db_size_bytes,
        })
    }

    /// Linear cosine scan, best (lowest distance) first, ties broken by id
    /// (chunks without one first) and then by rowid. A NULL id is passed
    /// through as `None`; a NULL text scores as empty.
    pub fn nearest(
        &self,
        embedder: &dyn Embedder,
        question: &str,
        k: usize,
        language: Option<&str>,
    ) -> Result<Vec<ScoredChunk>> {
        let query_vec = embedder.embed(question);
        let mut stmt = self.conn.prepare(
            "SELECT rowid, id, text, metadata, embedding FROM chunk\n             WHERE (?1 IS NULL OR json_extract(metadata, '$.language') = ?1)",
        )?;
        let rows = stmt.query_map(params![language], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<Vec<u8>>>(4)?,
            ))
        })?;

        let mut scored = Vec::new();
        for row in rows {
            let (rowid, id, text, metadata, embedding) = row.context("read chunk")?;
            let text = text.unwrap_or_default();
            let vec = match embedding {
                Some(bytes) => from_bytes(&bytes),
                None => embedder.embed(&text),
            };
            let metadata = match metadata {
                Some(raw) => serde_json::from_str::<Option<Map<String, Value>>>(&raw)
                    .with_context(|| format!("parse metadata of chunk at row {rowid}"))?,
                None => None,
            };
            scored.push((
                rowid,
                ScoredChunk {
                    distance: 1.0 - cosine_similarity(&query_vec, &vec),
                    id,
                    text,
                    metadata,
                },
            ));
        }

        scored.sort_by(|(a_row, a), (b_row, b)| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
                .then_with(|| a_row.cmp(b_row))
        });
        Ok(scored.into_iter().take(k).map(|(_, chunk)| chunk).collect())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use rusqlite::Connection;
    use rusqlite::params;
    use serde_json::Value;

    use crate::embed::Embedder;
    use crate::embed::to_bytes;

    pub const SCHEMA: &str = "CREATE TABLE chunk (\n  rowid INTEGER PRIMARY KEY,\n  id TEXT UNIQUE,\n  text TEXT,\n  metadata TEXT,\n  embedding BLOB\n);";

    pub fn create(conn: &Connection) {
        conn.execute_batch(SCHEMA).expect("create schema");
    }

    pub fn insert(
        conn: &Connection,
        id: &str,
        text: &str,
        metadata: Value,
        embedder: Option<&dyn Embedder>,
    ) {
        let embedding = embedder.map(|e| to_bytes(&e.embed(text)));
        conn.execute(
            "INSERT INTO chunk (id, text, metadata, embedding) VALUES (?1, ?2, ?3, ?4)",
            params![id, text, metadata.to_string(), embedding],
        )
        .expect("insert chunk");
    }
}
