//! Append-only audit trail of administrative actions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActivityAction {
  Login,
  Logout,
  DataImport,
  StatusChange,
  ReviewUpdate,
  EnglishRecompute,
  UserCreated,
  UserRoleChanged,
  UserDeleted,
}

/// A persisted activity-log row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
  pub id:         i64,
  pub user_id:    Option<i64>,
  pub username:   Option<String>,
  pub action:     ActivityAction,
  pub target:     Option<String>,
  pub details:    Option<String>,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::AdmissionsStore::log_activity`].
#[derive(Debug, Clone)]
pub struct NewActivity {
  pub user_id: Option<i64>,
  pub action:  ActivityAction,
  pub target:  Option<String>,
  pub details: Option<String>,
}

impl NewActivity {
  pub fn new(user_id: Option<i64>, action: ActivityAction) -> Self {
    Self { user_id, action, target: None, details: None }
  }

  pub fn target(mut self, target: impl Into<String>) -> Self {
    self.target = Some(target.into());
    self
  }

  pub fn details(mut self, details: impl Into<String>) -> Self {
    self.details = Some(details.into());
    self
  }
}
