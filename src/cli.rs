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

use clap::Args;
use clap::Parser;
use clap::Subcommand;

#[derive(Parser, Debug)]
#[command(
    name = "kbridge",
    version,
    about = "JSON bridge to a vector knowledge base"
)]
pub struct Cli {
    /// Read a JSON request from stdin instead of using subcommand flags
    #[arg(long, global = true)]
    pub stdin: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search the knowledge base
    Search(SearchArgs),

    /// Show collection statistics
    Stats,

    /// Check that the collection is reachable
    Health,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Question to search for
    #[arg(long, short = 'q')]
    pub question: String,

    /// Number of results to return
    #[arg(
        long = "n_results",
        short = 'n',
        default_value_t = 3,
        allow_negative_numbers = true
    )]
    pub n_results: i64,

    /// Language filter (en, zh, ...)
    #[arg(long, short = 'l')]
    pub language: Option<String>,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn search_flags_use_defaults() {
        let cli = Cli::parse_from(["kbridge", "search", "-q", "what is FSHD?"]);
        let Some(Commands::Search(args)) = cli.command else {
            panic!("expected search command");
        };
        assert_eq!(args.question, "what is FSHD?");
        assert_eq!(args.n_results, 3);
        assert_eq!(args.language, None);
        assert!(!cli.stdin);
    }

    #[test]
    fn stdin_flag_allows_missing_subcommand() {
        let cli = Cli::parse_from(["kbridge", "--stdin"]);
        assert!(cli.stdin);
        assert!(cli.command.is_none());
    }

    #[test]
    fn search_requires_question() {
        let err = Cli::try_parse_from(["kbridge", "search", "-n", "5"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
