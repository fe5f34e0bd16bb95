//! Admit server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store, and serves the JSON API over HTTP. Maintenance commands
//! run against the same store without starting the server.
//!
//! # First admin account
//!
//! ```text
//! admit create-user alice --role admin
//! ```

use std::{path::PathBuf, sync::Arc};

use admit_api::AppState;
use admit_core::{
  role::{NewUser, Role},
  store::AdmissionsStore,
};
use admit_server::ServerConfig;
use admit_store_sqlite::SqliteStore;
use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Admissions review server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (the default).
  Serve,

  /// Import an admissions CSV extract into the store.
  Import {
    /// CSV file to ingest.
    file: PathBuf,
  },

  /// Re-evaluate the English requirement for every applicant.
  RecomputeEnglish,

  /// Create a reviewer account; the password is read from stdin.
  CreateUser {
    username: String,

    /// viewer, faculty or admin.
    #[arg(long, default_value = "viewer")]
    role: Role,
  },

  /// Print the argon2 hash for a password entered on stdin and exit.
  HashPassword,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let command = cli.command.unwrap_or(Command::Serve);

  // Helper mode: hash a password and exit.
  if let Command::HashPassword = command {
    let password = rpassword_or_stdin()?;
    println!("{}", admit_api::auth::hash_password(&password)?);
    return Ok(());
  }

  // Load configuration.
  let server_cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

  // Open SQLite store.
  let store_path = server_cfg.store_path();
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?
    .with_exemption(server_cfg.exemption());

  match command {
    Command::Serve => serve(store, server_cfg).await,
    Command::Import { file } => import(&store, file).await,
    Command::RecomputeEnglish => {
      let evaluated = store
        .recompute_all_english()
        .await
        .context("failed to recompute English status")?;
      println!("re-evaluated {evaluated} applicants");
      Ok(())
    }
    Command::CreateUser { username, role } => {
      let password = rpassword_or_stdin()?;
      anyhow::ensure!(!password.is_empty(), "password must not be empty");
      let password_hash = admit_api::auth::hash_password(&password)?;
      let user = store
        .create_user(NewUser { username, password_hash, role })
        .await
        .context("failed to create user")?
        .ok_or_else(|| anyhow::anyhow!("username is already taken"))?;
      println!("created {} ({}) with id {}", user.username, user.role, user.id);
      Ok(())
    }
    Command::HashPassword => Ok(()),
  }
}

async fn serve(store: SqliteStore, server_cfg: ServerConfig) -> anyhow::Result<()> {
  let state = AppState::new(Arc::new(store), server_cfg.api_config());
  let app = admit_server::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

async fn import(store: &SqliteStore, file: PathBuf) -> anyhow::Result<()> {
  let bytes = tokio::fs::read(&file)
    .await
    .with_context(|| format!("failed to read {file:?}"))?;
  let (session, summary) = admit_server::import_extract(store, &bytes)
    .await
    .with_context(|| format!("failed to import {file:?}"))?;
  println!("{session}: {}", serde_json::to_string_pretty(&summary)?);
  Ok(())
}

/// Read one password line from stdin.
fn rpassword_or_stdin() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}
