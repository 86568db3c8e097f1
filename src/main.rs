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

mod backend;
mod bridge;
mod cli;
mod config;
mod embed;
mod invocation;
mod output;
mod store;

use anyhow::Result;
use clap::CommandFactory;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::bridge::Bridge;
use crate::cli::Cli;
use crate::invocation::Invocation;
use crate::output::print_json;

const LOG_ENV: &str = "KBRIDGE_LOG";

fn main() {
    init_logging();
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let parsed = if cli.stdin {
        Some(Invocation::from_reader(std::io::stdin().lock()))
    } else {
        Invocation::from_command(cli.command).map(Ok)
    };
    let Some(parsed) = parsed else {
        eprintln!("{}", Cli::command().render_help());
        std::process::exit(1);
    };

    let bridge = Bridge::new(backend::from_cwd());
    let resp = match parsed {
        Ok(invocation) => bridge.execute(invocation),
        Err(err) => bridge.reject(&err),
    };
    tracing::debug!(success = resp.is_success(), "operation finished");
    print_json(&resp)
}
