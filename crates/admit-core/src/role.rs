//! Reviewer accounts and the role hierarchy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Roles form a strict hierarchy: Admin ⊇ Faculty ⊇ Viewer.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Role {
  Viewer,
  Faculty,
  Admin,
}

impl Role {
  fn rank(self) -> u8 {
    match self {
      Role::Viewer => 0,
      Role::Faculty => 1,
      Role::Admin => 2,
    }
  }

  /// `true` if this role grants everything `required` grants.
  pub fn at_least(self, required: Role) -> bool { self.rank() >= required.rank() }
}

/// A reviewer account. The password hash never leaves the store layer in
/// serialised form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub id:            i64,
  pub username:      String,
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub role:          Role,
  pub created_at:    DateTime<Utc>,
}

/// Input to [`crate::store::AdmissionsStore::create_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
  pub username:      String,
  /// PHC string produced by argon2.
  pub password_hash: String,
  pub role:          Role,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hierarchy() {
    assert!(Role::Admin.at_least(Role::Faculty));
    assert!(Role::Admin.at_least(Role::Viewer));
    assert!(Role::Faculty.at_least(Role::Viewer));
    assert!(Role::Faculty.at_least(Role::Faculty));
    assert!(!Role::Faculty.at_least(Role::Admin));
    assert!(!Role::Viewer.at_least(Role::Faculty));
  }

  #[test]
  fn parses_case_insensitively() {
    assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
    assert_eq!("Faculty".parse::<Role>().unwrap(), Role::Faculty);
    assert!("owner".parse::<Role>().is_err());
  }
}
