//! Server assembly for Admit: configuration loading, the top-level router
//! that mounts the JSON API, and the command-line import.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use admit_api::{ApiConfig, AppState};
use admit_core::{
  activity::{ActivityAction, NewActivity},
  english::{CitizenshipExemption, EnglishExemption},
  store::{AdmissionsStore, ImportSummary},
};
use anyhow::Context as _;
use axum::Router;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` layered
/// with `ADMIT_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                     String,
  pub port:                     u16,
  pub store_path:               PathBuf,
  pub session_ttl_hours:        i64,
  /// Citizens of these countries skip the English requirement.
  pub english_exempt_countries: Vec<String>,
  pub max_upload_bytes:         usize,
  pub cookie_secure:            bool,
}

impl Default for ServerConfig {
  fn default() -> Self {
    let api = ApiConfig::default();
    Self {
      host:                     "127.0.0.1".to_string(),
      port:                     8080,
      store_path:               PathBuf::from("admit.db"),
      session_ttl_hours:        api.session_ttl_hours,
      english_exempt_countries: Vec::new(),
      max_upload_bytes:         api.max_upload_bytes,
      cookie_secure:            api.cookie_secure,
    }
  }
}

impl ServerConfig {
  /// Read `path` (optional) and overlay `ADMIT_*` environment variables.
  /// `ADMIT_ENGLISH_EXEMPT_COUNTRIES` is comma-separated.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("ADMIT")
          .try_parsing(true)
          .list_separator(",")
          .with_list_parse_key("english_exempt_countries"),
      )
      .build()?
      .try_deserialize()
  }

  pub fn api_config(&self) -> ApiConfig {
    ApiConfig {
      session_ttl_hours: self.session_ttl_hours,
      max_upload_bytes:  self.max_upload_bytes,
      cookie_secure:     self.cookie_secure,
    }
  }

  pub fn exemption(&self) -> Arc<dyn EnglishExemption> {
    Arc::new(CitizenshipExemption::new(&self.english_exempt_countries))
  }

  /// `store_path` with a leading `~/` expanded.
  pub fn store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The full application: the API under `/api` with request tracing.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: AdmissionsStore + 'static,
{
  Router::new()
    .nest("/api", admit_api::api_router(state))
    .layer(TraceLayer::new_for_http())
}

// ─── Import ───────────────────────────────────────────────────────────────────

/// Parse an admissions extract and apply it to `store`, recording a
/// `data_import` activity entry with no acting user. Returns the session
/// name alongside the summary.
pub async fn import_extract<S>(store: &S, bytes: &[u8]) -> anyhow::Result<(String, ImportSummary)>
where
  S: AdmissionsStore,
{
  let batch = admit_csv::parse_upload(bytes).context("invalid upload")?;
  let session_name = batch.session.name();

  let summary = store
    .import_batch(batch)
    .await
    .context("failed to import batch")?;

  let details = format!(
    "{} processed, {} dropped, {} changed",
    summary.processed, summary.dropped, summary.changed
  );
  store
    .log_activity(
      NewActivity::new(None, ActivityAction::DataImport)
        .target(&session_name)
        .details(&details),
    )
    .await
    .context("failed to record import activity")?;
  tracing::info!(session = %session_name, by = "cli", "{details}");

  Ok((session_name, summary))
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::io::Write as _;

  use admit_store_sqlite::SqliteStore;
  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use tower::ServiceExt as _;

  use super::*;

  #[test]
  fn defaults_apply_without_a_file() {
    let cfg = ServerConfig::load(Path::new("/nonexistent/admit.toml")).unwrap();
    assert_eq!(cfg.session_ttl_hours, 12);
    assert_eq!(cfg.max_upload_bytes, 16 * 1024 * 1024);
    assert!(!cfg.cookie_secure);
    assert!(cfg.english_exempt_countries.is_empty());
  }

  #[test]
  fn file_values_override_defaults() {
    let path = std::env::temp_dir().join(format!("admit-config-{}.toml", std::process::id()));
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "port = 9000").unwrap();
    writeln!(file, "store_path = \"~/admit/admit.db\"").unwrap();
    writeln!(file, "english_exempt_countries = [\"Canada\", \"Ireland\"]").unwrap();

    let cfg = ServerConfig::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.english_exempt_countries, ["Canada", "Ireland"]);
    if let Ok(home) = std::env::var("HOME") {
      assert_eq!(cfg.store_path(), PathBuf::from(home).join("admit/admit.db"));
    }
  }

  #[test]
  fn tilde_only_expands_as_prefix() {
    assert_eq!(expand_tilde(Path::new("/data/admit.db")), PathBuf::from("/data/admit.db"));
    assert_eq!(expand_tilde(Path::new("a/~/b")), PathBuf::from("a/~/b"));
  }

  #[tokio::test]
  async fn api_is_mounted_under_prefix() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let state = AppState::new(Arc::new(store), ServerConfig::default().api_config());
    let app = router(state);

    let req = Request::builder().uri("/api/auth/me").body(Body::empty()).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = Request::builder().uri("/auth/me").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn cli_import_is_logged_without_a_user() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let extract = "User Code,Program CODE,Program,Session,Family Name,Given Name\n\
                   A1,VG01,Master of Data Science,2025W,Lovelace,Ada\n";

    let (session, summary) = import_extract(&store, extract.as_bytes()).await.unwrap();
    assert_eq!(summary.processed, 1);

    let activity = store.list_activity(10).await.unwrap();
    assert_eq!(activity.len(), 1);
    assert_eq!(activity[0].action, ActivityAction::DataImport);
    assert_eq!(activity[0].user_id, None);
    assert_eq!(activity[0].target.as_deref(), Some(session.as_str()));
    let details = activity[0].details.as_deref().unwrap();
    assert!(details.starts_with("1 processed, 0 dropped"));
  }

  #[tokio::test]
  async fn cli_import_rejects_bad_extract() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    assert!(import_extract(&store, b"Family Name\nLovelace\n").await.is_err());
    assert!(store.list_activity(10).await.unwrap().is_empty());
  }
}
