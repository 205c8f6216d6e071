// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};

#[derive(Parser, Debug)]
#[command(
    name = "iris",
    about = "Multi-tenant conversational agent platform",
    version,
    long_about = None,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the process config file (overrides auto-discovery).
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v = debug, -vv = trace).
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP/webhook/duplex-socket gateway. Blocks until shutdown.
    Serve,

    /// Apply any pending Chat Session Store migrations and exit.
    Migrate,

    /// Operator bearer token management.
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },

    /// Print the effective configuration and exit.
    ShowConfig,

    /// Generate a shell completion script.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum TokenCommands {
    /// Generate a new bearer token for `user_id`, replacing any token that
    /// user already held. The raw token is printed once — it is never
    /// stored or shown again.
    Regenerate { user_id: String },

    /// List user ids that currently hold a bearer token. Never prints
    /// tokens or their hashes.
    Show,
}

pub fn print_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "iris", &mut std::io::stdout());
}
