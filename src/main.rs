// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands, TokenCommands};
use iris_gateway::{AppState, AuthState, TokenStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Completions { shell } => {
            cli::print_completions(*shell);
            return Ok(());
        }
        Commands::ShowConfig => {
            let config = iris_config::load(cli.config.as_deref())?;
            println!("{}", serde_yaml::to_string(&config).unwrap_or_default());
            return Ok(());
        }
        Commands::Serve => serve(&cli).await,
        Commands::Migrate => migrate(&cli).await,
        Commands::Token { command } => token_command(&cli, command).await,
    }
}

async fn serve(cli: &Cli) -> anyhow::Result<()> {
    let config = iris_config::load(cli.config.as_deref())?;

    let store = iris_store::Store::connect(&config.store.database_url, config.store.max_connections)
        .await
        .context("connecting to the chat session store")?;
    store.migrate().await.context("applying chat session store migrations")?;

    let lifecycle = Arc::new(iris_lifecycle::LifecycleManager::new(store.clone(), config.model.clone()));
    lifecycle.startup().await.context("materialising persisted agents")?;

    let broadcaster = Arc::new(iris_broadcast::Broadcaster::new());

    let token_path = config.http.token_file.clone().unwrap_or_else(default_token_path);
    let tokens = TokenStore::load_or_empty(&token_path).await.context("loading bearer token file")?;
    let auth = AuthState::new(Arc::new(tokens));

    let state = AppState { store, lifecycle, broadcaster, auth };
    iris_gateway::serve(&config.http.bind, state).await
}

async fn migrate(cli: &Cli) -> anyhow::Result<()> {
    let config = iris_config::load(cli.config.as_deref())?;
    let store = iris_store::Store::connect(&config.store.database_url, config.store.max_connections)
        .await
        .context("connecting to the chat session store")?;
    store.migrate().await.context("applying chat session store migrations")?;
    println!("Migrations applied.");
    Ok(())
}

async fn token_command(cli: &Cli, command: &TokenCommands) -> anyhow::Result<()> {
    let config = iris_config::load(cli.config.as_deref())?;
    let token_path = config.http.token_file.clone().unwrap_or_else(default_token_path);
    let tokens = TokenStore::load_or_empty(&token_path).await.context("loading bearer token file")?;

    match command {
        TokenCommands::Regenerate { user_id } => {
            let raw = tokens.regenerate(user_id).await?;
            println!("New bearer token for {user_id} (save it now — it won't be shown again):");
            println!("  {raw}");
            println!();
            println!("Usage:  Authorization: Bearer {raw}");
        }
        TokenCommands::Show => {
            let mut users = tokens.known_users().await;
            if users.is_empty() {
                println!("No tokens issued yet. Run `iris token regenerate <user_id>` to create one.");
            } else {
                users.sort();
                println!("Users with a bearer token on file:");
                for user in users {
                    println!("  {user}");
                }
            }
        }
    }
    Ok(())
}

fn default_token_path() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config/iris/tokens.yaml")
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}
