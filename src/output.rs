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

use std::io::Write;

use anyhow::Result;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub content: String,
    pub metadata: Map<String, Value>,
    pub distance: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchOut {
    pub success: bool,
    pub question: String,
    pub total_results: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatsOut {
    pub success: bool,
    pub stats: Value,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HealthOut {
    pub success: bool,
    pub status: &'static str,
    pub collection: String,
    pub total_chunks: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorOut {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<&'static str>,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
}

/// The single JSON document a run writes to stdout.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Envelope {
    Search(SearchOut),
    Stats(StatsOut),
    Health(HealthOut),
    Error(ErrorOut),
}

impl Envelope {
    pub fn search(question: &str, results: Vec<SearchHit>) -> Self {
        Self::Search(SearchOut {
            success: true,
            question: question.to_string(),
            total_results: results.len(),
            results,
        })
    }

    pub fn stats(stats: Value) -> Self {
        Self::Stats(StatsOut {
            success: true,
            stats,
        })
    }

    pub fn healthy(collection: &str, total_chunks: i64) -> Self {
        Self::Health(HealthOut {
            success: true,
            status: "healthy",
            collection: collection.to_string(),
            total_chunks,
        })
    }

    pub fn error(message: &str) -> Self {
        Self::Error(Self::error_out(message))
    }

    pub fn unhealthy(message: &str) -> Self {
        Self::Error(ErrorOut {
            status: Some("unhealthy"),
            ..Self::error_out(message)
        })
    }

    pub fn search_error(message: &str, question: &str) -> Self {
        Self::Error(ErrorOut {
            question: Some(question.to_string()),
            ..Self::error_out(message)
        })
    }

    fn error_out(message: &str) -> ErrorOut {
        ErrorOut {
            success: false,
            status: None,
            error: message.to_string(),
            question: None,
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Error(_))
    }
}

pub fn print_json(resp: &Envelope) -> Result<()> {
    let stdout = std::io::stdout();
    write_json(stdout.lock(), resp)
}

pub fn write_json(mut out: impl Write, resp: &Envelope) -> Result<()> {
    let text = serde_json::to_string_pretty(resp)?;
    writeln!(out, "{text}")?;
    out.flush()?;
    Ok(())
}
