use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use learnhub_core::{CourseId, DomainError, DomainResult, Entity, ExerciseId, IdentityId};

use crate::Owned;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompletionKey {
    pub identity_id: IdentityId,
    pub course_id: CourseId,
    pub exercise_id: ExerciseId,
}

/// One entry of the activity ledger.
///
/// Immutable once written: an exercise is completed at most once per learner
/// per course, and a second completion is a conflict rather than an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseCompletion {
    pub identity_id: IdentityId,
    pub course_id: CourseId,
    pub exercise_id: ExerciseId,
    pub completed_at: DateTime<Utc>,
    pub score: Option<i32>,
    pub time_spent_seconds: Option<i32>,
}

impl ExerciseCompletion {
    pub fn record(identity_id: IdentityId, new: NewCompletion, now: DateTime<Utc>) -> Self {
        Self {
            identity_id,
            course_id: new.course_id,
            exercise_id: new.exercise_id,
            completed_at: now,
            score: new.score,
            time_spent_seconds: new.time_spent_seconds,
        }
    }

    pub fn key(&self) -> CompletionKey {
        CompletionKey {
            identity_id: self.identity_id,
            course_id: self.course_id.clone(),
            exercise_id: self.exercise_id.clone(),
        }
    }
}

impl Entity for ExerciseCompletion {
    type Id = CompletionKey;

    fn id(&self) -> CompletionKey {
        self.key()
    }
}

impl Owned for ExerciseCompletion {
    fn owner(&self) -> IdentityId {
        self.identity_id
    }
}

/// Input for recording a completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCompletion {
    pub course_id: CourseId,
    pub exercise_id: ExerciseId,
    #[serde(default)]
    pub score: Option<i32>,
    #[serde(default)]
    pub time_spent_seconds: Option<i32>,
}

impl NewCompletion {
    pub fn new(course_id: CourseId, exercise_id: ExerciseId) -> Self {
        Self {
            course_id,
            exercise_id,
            score: None,
            time_spent_seconds: None,
        }
    }

    pub fn with_score(mut self, score: i32) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_time_spent(mut self, seconds: i32) -> Self {
        self.time_spent_seconds = Some(seconds);
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        if let Some(score) = self.score {
            if score < 0 {
                return Err(DomainError::validation(format!(
                    "score cannot be negative, got {score}"
                )));
            }
        }
        if let Some(secs) = self.time_spent_seconds {
            if secs < 0 {
                return Err(DomainError::validation(format!(
                    "time spent cannot be negative, got {secs}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_completion() -> NewCompletion {
        NewCompletion::new(
            CourseId::new("rust-101").unwrap(),
            ExerciseId::new("ownership-1").unwrap(),
        )
    }

    #[test]
    fn optional_fields_validate() {
        assert!(new_completion().validate().is_ok());
        assert!(new_completion().with_score(87).with_time_spent(120).validate().is_ok());
    }

    #[test]
    fn negative_score_rejected() {
        let err = new_completion().with_score(-1).validate().unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn negative_time_rejected() {
        assert!(new_completion().with_time_spent(-30).validate().is_err());
    }

    #[test]
    fn key_identifies_the_triple() {
        let owner = IdentityId::new();
        let row = ExerciseCompletion::record(owner, new_completion(), Utc::now());
        let key = row.key();
        assert_eq!(key.identity_id, owner);
        assert_eq!(key.exercise_id.as_str(), "ownership-1");
        assert_eq!(row.id(), key);
    }
}
