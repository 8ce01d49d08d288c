//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of an authenticated identity.
///
/// Issued by the external authentication authority; learnhub never mints
/// these outside of tests.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(Uuid);

impl IdentityId {
    /// Create a new identifier.
    ///
    /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
    /// for determinism.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for IdentityId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for IdentityId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for IdentityId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<IdentityId> for Uuid {
    fn from(value: IdentityId) -> Self {
        value.0
    }
}

impl FromStr for IdentityId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = Uuid::from_str(s)
            .map_err(|e| DomainError::invalid_id(format!("IdentityId: {e}")))?;
        Ok(Self(uuid))
    }
}

/// Longest catalog key accepted (matches the `VARCHAR` width in the schema).
pub const MAX_CATALOG_KEY_LEN: usize = 128;

/// Catalog keys (courses, exercises, resources) are slugs owned by the
/// course catalog, which lives outside this crate.
macro_rules! impl_catalog_key {
    ($t:ident, $name:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $t(String);

        impl $t {
            /// Validate and wrap a catalog key. Surrounding whitespace is trimmed.
            pub fn new(key: impl Into<String>) -> Result<Self, DomainError> {
                let key = key.into();
                let trimmed = key.trim();
                if trimmed.is_empty() {
                    return Err(DomainError::invalid_id(concat!($name, ": must not be blank")));
                }
                if trimmed.len() > MAX_CATALOG_KEY_LEN {
                    return Err(DomainError::invalid_id(format!(
                        "{}: longer than {} bytes",
                        $name, MAX_CATALOG_KEY_LEN
                    )));
                }
                Ok(Self(trimmed.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $t {
            type Error = DomainError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }
    };
}

impl_catalog_key!(CourseId, "CourseId");
impl_catalog_key!(ExerciseId, "ExerciseId");
impl_catalog_key!(ResourceId, "ResourceId");
