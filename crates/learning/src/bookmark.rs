use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use learnhub_core::{CourseId, DomainError, DomainResult, Entity, IdentityId, ResourceId};

use crate::Owned;

pub const MAX_NOTES_LEN: usize = 4000;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BookmarkKey {
    pub identity_id: IdentityId,
    pub course_id: CourseId,
    pub resource_id: ResourceId,
}

/// A learner's bookmark on a course resource, with free-text notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceBookmark {
    pub identity_id: IdentityId,
    pub course_id: CourseId,
    pub resource_id: ResourceId,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ResourceBookmark {
    pub fn create(identity_id: IdentityId, new: NewBookmark, now: DateTime<Utc>) -> Self {
        Self {
            identity_id,
            course_id: new.course_id,
            resource_id: new.resource_id,
            notes: new.notes,
            created_at: now,
        }
    }

    pub fn key(&self) -> BookmarkKey {
        BookmarkKey {
            identity_id: self.identity_id,
            course_id: self.course_id.clone(),
            resource_id: self.resource_id.clone(),
        }
    }
}

impl Entity for ResourceBookmark {
    type Id = BookmarkKey;

    fn id(&self) -> BookmarkKey {
        self.key()
    }
}

impl Owned for ResourceBookmark {
    fn owner(&self) -> IdentityId {
        self.identity_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBookmark {
    pub course_id: CourseId,
    pub resource_id: ResourceId,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewBookmark {
    pub fn new(course_id: CourseId, resource_id: ResourceId, notes: Option<String>) -> Self {
        Self {
            course_id,
            resource_id,
            notes,
        }
    }

    /// Normalize notes: trailing/leading whitespace trimmed, blank means none.
    pub fn validated(mut self) -> DomainResult<Self> {
        self.notes = match self.notes.take() {
            Some(notes) => {
                let notes = notes.trim();
                if notes.chars().count() > MAX_NOTES_LEN {
                    return Err(DomainError::validation(format!(
                        "bookmark notes longer than {MAX_NOTES_LEN} characters"
                    )));
                }
                (!notes.is_empty()).then(|| notes.to_string())
            }
            None => None,
        };
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_bookmark(notes: Option<&str>) -> NewBookmark {
        NewBookmark::new(
            CourseId::new("rust-101").unwrap(),
            ResourceId::new("borrowck-video").unwrap(),
            notes.map(str::to_string),
        )
    }

    #[test]
    fn blank_notes_become_none() {
        let b = new_bookmark(Some("   ")).validated().unwrap();
        assert!(b.notes.is_none());
    }

    #[test]
    fn notes_are_trimmed() {
        let b = new_bookmark(Some("  rewatch at 3:10 ")).validated().unwrap();
        assert_eq!(b.notes.as_deref(), Some("rewatch at 3:10"));
    }

    #[test]
    fn oversized_notes_rejected() {
        let long = "n".repeat(MAX_NOTES_LEN + 1);
        assert!(new_bookmark(Some(&long)).validated().is_err());
    }
}
