use core::str::FromStr;

use serde::{Deserialize, Serialize};

use learnhub_core::DomainError;

/// Role identifier used for RBAC.
///
/// The set is closed: learnhub has no custom roles. The serialized form is
/// the lowercase name stored in the `user_roles.role` column.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Student,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Admin, Role::Student];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Student => "student",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "student" => Ok(Role::Student),
            other => Err(DomainError::validation(format!("unknown role '{other}'"))),
        }
    }
}
