use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use learnhub_core::{DomainError, DomainResult, Entity, IdentityId};

use crate::Owned;

/// Display name given to identities that registered without one.
pub const DEFAULT_DISPLAY_NAME: &str = "Student";

pub const MAX_DISPLAY_NAME_LEN: usize = 100;
pub const MAX_STUDENT_ID_LEN: usize = 64;
pub const MAX_AVATAR_URL_LEN: usize = 2048;

/// Per-identity profile. One row per identity, created at registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub identity_id: IdentityId,
    pub display_name: String,
    pub student_id: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn create(identity_id: IdentityId, new: NewProfile, now: DateTime<Utc>) -> Self {
        Self {
            identity_id,
            display_name: new.display_name,
            student_id: new.student_id,
            avatar_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply owner edits and stamp `updated_at`.
    ///
    /// The timestamp never moves backwards, even if the clock does.
    pub fn apply(&mut self, changes: &ProfileChanges, now: DateTime<Utc>) {
        if let Some(name) = &changes.display_name {
            self.display_name = name.clone();
        }
        if let Some(avatar) = &changes.avatar_url {
            self.avatar_url = avatar.clone();
        }
        self.updated_at = now.max(self.updated_at);
    }
}

impl Entity for Profile {
    type Id = IdentityId;

    fn id(&self) -> IdentityId {
        self.identity_id
    }
}

impl Owned for Profile {
    fn owner(&self) -> IdentityId {
        self.identity_id
    }
}

/// Normalized profile fields taken from registration metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProfile {
    display_name: String,
    student_id: Option<String>,
}

impl NewProfile {
    /// Build profile fields from registration metadata.
    ///
    /// Registration must never fail on cosmetic metadata: a missing or blank
    /// name falls back to [`DEFAULT_DISPLAY_NAME`], over-long values are
    /// truncated, and a blank student id is dropped.
    pub fn from_registration(display_name: Option<&str>, student_id: Option<&str>) -> Self {
        let display_name = display_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(|n| truncate_chars(n, MAX_DISPLAY_NAME_LEN))
            .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string());

        let student_id = student_id
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| truncate_chars(s, MAX_STUDENT_ID_LEN));

        Self {
            display_name,
            student_id,
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn student_id(&self) -> Option<&str> {
        self.student_id.as_deref()
    }
}

/// Owner edits to a profile.
///
/// `avatar_url: Some(None)` clears the avatar. Timestamps are not editable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileChanges {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<Option<String>>,
}

impl ProfileChanges {
    pub fn display_name(name: impl Into<String>) -> Self {
        Self {
            display_name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Trim and validate the edit.
    pub fn validated(self) -> DomainResult<Self> {
        let display_name = match self.display_name {
            Some(name) => {
                let name = name.trim();
                if name.is_empty() {
                    return Err(DomainError::validation("display name cannot be empty"));
                }
                if name.chars().count() > MAX_DISPLAY_NAME_LEN {
                    return Err(DomainError::validation(format!(
                        "display name longer than {MAX_DISPLAY_NAME_LEN} characters"
                    )));
                }
                Some(name.to_string())
            }
            None => None,
        };

        let avatar_url = match self.avatar_url {
            Some(Some(url)) => {
                let url = url.trim();
                if url.len() > MAX_AVATAR_URL_LEN {
                    return Err(DomainError::validation("avatar reference too long"));
                }
                Some((!url.is_empty()).then(|| url.to_string()))
            }
            other => other,
        };

        Ok(Self {
            display_name,
            avatar_url,
        })
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn registration_without_name_uses_placeholder() {
        let new = NewProfile::from_registration(None, Some("  S-42 "));
        assert_eq!(new.display_name(), DEFAULT_DISPLAY_NAME);
        assert_eq!(new.student_id(), Some("S-42"));

        let blank = NewProfile::from_registration(Some("   "), Some(""));
        assert_eq!(blank.display_name(), DEFAULT_DISPLAY_NAME);
        assert_eq!(blank.student_id(), None);
    }

    #[test]
    fn registration_truncates_long_names() {
        let long = "a".repeat(MAX_DISPLAY_NAME_LEN + 20);
        let new = NewProfile::from_registration(Some(&long), None);
        assert_eq!(new.display_name().chars().count(), MAX_DISPLAY_NAME_LEN);
    }

    #[test]
    fn blank_display_name_edit_rejected() {
        let err = ProfileChanges::display_name("  ").validated().unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn empty_avatar_clears_it() {
        let changes = ProfileChanges {
            avatar_url: Some(Some("  ".into())),
            ..Default::default()
        }
        .validated()
        .unwrap();
        assert_eq!(changes.avatar_url, Some(None));
    }

    #[test]
    fn apply_never_moves_updated_at_backwards() {
        let now = Utc::now();
        let mut profile = Profile::create(
            IdentityId::new(),
            NewProfile::from_registration(Some("Ada"), None),
            now,
        );

        profile.apply(&ProfileChanges::display_name("Ada L."), now - Duration::seconds(30));
        assert_eq!(profile.display_name, "Ada L.");
        assert_eq!(profile.updated_at, now);

        let later = now + Duration::seconds(5);
        profile.apply(&ProfileChanges::default(), later);
        assert_eq!(profile.updated_at, later);
        assert_eq!(profile.created_at, now);
    }
}
