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

//! Normalizes both input channels (subcommand flags and a JSON document on
//! stdin) into a single [`Invocation`].

use std::io::Read;

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::cli::Commands;

pub const DEFAULT_N_RESULTS: i64 = 3;

#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    Search(SearchRequest),
    Stats,
    Health,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub question: String,
    pub n_results: ResultCount,
    pub language: Option<String>,
}

/// Requested result count as supplied by the caller. Range checks belong to
/// the backend; only values that are not integers at all are kept aside so
/// the search can fail with the question echoed.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultCount {
    Count(i64),
    /// Not an integer, so it cannot be handed to
    /// [`KnowledgeStore::similarity_search`](crate::bridge::KnowledgeStore::similarity_search).
    /// The bridge fails the search itself; this is the only request value it
    /// judges rather than the backend.
    Invalid(Value),
}

#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("failed to read stdin: {0}")]
    Read(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),
    #[error("unknown command: {0}")]
    UnknownCommand(String),
}

impl Invocation {
    /// Flag mode. `None` means no subcommand was given.
    pub fn from_command(command: Option<Commands>) -> Option<Self> {
        match command? {
            Commands::Search(args) => Some(Self::Search(SearchRequest {
                question: args.question,
                n_results: ResultCount::Count(args.n_results),
                language: args.language,
            })),
            Commands::Stats => Some(Self::Stats),
            Commands::Health => Some(Self::Health),
        }
    }

    /// Document mode: reads the whole reader before parsing.
    pub fn from_reader(mut reader: impl Read) -> Result<Self, InvocationError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Self::from_document(&text)
    }

    pub fn from_document(text: &str) -> Result<Self, InvocationError> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(doc) = value else {
            return Err(InvocationError::NotAnObject(type_name(&value)));
        };

        let command = match doc.get("command") {
            None => "search".to_string(),
            Some(value) => scalar_text(value),
        };
        match command.as_str() {
            "search" => Ok(Self::Search(search_request(&doc))),
            "stats" => Ok(Self::Stats),
            "health" => Ok(Self::Health),
            _ => Err(InvocationError::UnknownCommand(command)),
        }
    }
}

fn search_request(doc: &Map<String, Value>) -> SearchRequest {
    let question = match doc.get("question") {
        None | Some(Value::Null) => String::new(),
        Some(value) => scalar_text(value),
    };
    let n_results = match doc.get("n_results") {
        None | Some(Value::Null) => ResultCount::Count(DEFAULT_N_RESULTS),
        Some(value) => match value.as_i64() {
            Some(n) => ResultCount::Count(n),
            None => ResultCount::Invalid(value.clone()),
        },
    };
    let language = match doc.get("language") {
        None | Some(Value::Null) => None,
        Some(value) => Some(scalar_text(value)),
    };
    SearchRequest {
        question,
        n_results,
        language,
    }
}

// Strings are taken verbatim; anything else is rendered as its JSON text.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::cli::SearchArgs;

    fn search(question: &str, n_results: i64, language: Option<&str>) -> Invocation {
        Invocation::Search(SearchRequest {
            question: question.to_string(),
            n_results: ResultCount::Count(n_results),
            language: language.map(str::to_string),
        })
    }

    #[test]
    fn flag_mode_maps_subcommands() {
        assert_eq!(Invocation::from_command(None), None);
        assert_eq!(
            Invocation::from_command(Some(Commands::Stats)),
            Some(Invocation::Stats)
        );
        assert_eq!(
            Invocation::from_command(Some(Commands::Health)),
            Some(Invocation::Health)
        );
        let args = SearchArgs {
            question: "muscle weakness".to_string(),
            n_results: 5,
            language: Some("en".to_string()),
        };
        assert_eq!(
            Invocation::from_command(Some(Commands::Search(args))),
            Some(search("muscle weakness", 5, Some("en")))
        );
    }

    #[test]
    fn document_defaults_to_search() {
        let inv = Invocation::from_document("{}").unwrap();
        assert_eq!(inv, search("", DEFAULT_N_RESULTS, None));
    }

    #[test]
    fn document_reads_search_parameters() {
        let inv = Invocation::from_document(
            r#"{"command": "search", "question": "什么是FSHD", "n_results": 7, "language": "zh"}"#,
        )
        .unwrap();
        assert_eq!(inv, search("什么是FSHD", 7, Some("zh")));
    }

    #[test]
    fn document_selects_stats_and_health() {
        assert_eq!(
            Invocation::from_document(r#"{"command": "stats"}"#).unwrap(),
            Invocation::Stats
        );
        assert_eq!(
            Invocation::from_document(r#"{"command": "health", "question": "ignored"}"#).unwrap(),
            Invocation::Health
        );
    }

    #[test]
    fn malformed_document_is_a_decode_error() {
        let err = Invocation::from_document("{not valid json").unwrap_err();
        assert!(matches!(err, InvocationError::Decode(_)));
        assert!(err.to_string().starts_with("JSON parse error: "));
    }

    #[test]
    fn unknown_command_names_the_value() {
        let err = Invocation::from_document(r#"{"command": "bogus"}"#).unwrap_err();
        assert_eq!(err.to_string(), "unknown command: bogus");

        let err = Invocation::from_document(r#"{"command": 42}"#).unwrap_err();
        assert_eq!(err.to_string(), "unknown command: 42");
    }

    #[test]
    fn non_object_document_is_rejected() {
        let err = Invocation::from_document("[1, 2]").unwrap_err();
        assert_eq!(err.to_string(), "expected a JSON object, got array");
    }

    #[test]
    fn non_integer_count_is_kept_for_the_backend_failure() {
        let inv = Invocation::from_document(r#"{"question": "q", "n_results": "ten"}"#).unwrap();
        let Invocation::Search(req) = inv else {
            panic!("expected search");
        };
        assert_eq!(req.n_results, ResultCount::Invalid(json!("ten")));
    }

    #[test]
    fn reader_is_consumed_to_the_end() {
        let input = br#"{"command": "health"}"#.to_vec();
        let inv = Invocation::from_reader(input.as_slice()).unwrap();
        assert_eq!(inv, Invocation::Health);

        let err = Invocation::from_reader(&[0xff, 0xfe][..]).unwrap_err();
        assert!(matches!(err, InvocationError::Read(_)));
    }
}
