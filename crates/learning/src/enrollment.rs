use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use learnhub_core::{CourseId, Entity, IdentityId};

use crate::{Owned, Percent};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnrollmentKey {
    pub identity_id: IdentityId,
    pub course_id: CourseId,
}

/// A learner's enrollment in a course, with a cached progress summary.
///
/// `progress` is derived from the completion ledger and only cached here.
/// `completed_at` is stamped the first time progress reaches 100 and is
/// never cleared afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub identity_id: IdentityId,
    pub course_id: CourseId,
    pub enrolled_at: DateTime<Utc>,
    pub progress: Percent,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Enrollment {
    pub fn new(identity_id: IdentityId, course_id: CourseId, now: DateTime<Utc>) -> Self {
        Self {
            identity_id,
            course_id,
            enrolled_at: now,
            progress: Percent::ZERO,
            last_accessed_at: None,
            completed_at: None,
        }
    }

    pub fn key(&self) -> EnrollmentKey {
        EnrollmentKey {
            identity_id: self.identity_id,
            course_id: self.course_id.clone(),
        }
    }

    /// Cache a new progress value.
    pub fn record_progress(&mut self, progress: Percent, now: DateTime<Utc>) {
        self.progress = progress;
        if progress.is_complete() && self.completed_at.is_none() {
            self.completed_at = Some(now);
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_accessed_at = Some(now);
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

impl Entity for Enrollment {
    type Id = EnrollmentKey;

    fn id(&self) -> EnrollmentKey {
        self.key()
    }
}

impl Owned for Enrollment {
    fn owner(&self) -> IdentityId {
        self.identity_id
    }
}
