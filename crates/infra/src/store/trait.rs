use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use learnhub_auth::{ReadScope, Role};
use learnhub_core::{CourseId, DomainError, IdentityId};
use learnhub_learning::{
    BookmarkKey, Enrollment, EnrollmentKey, ExerciseCompletion, Percent, Profile, ProfileChanges,
    ResourceBookmark, RoleAssignment,
};

/// Storage operation error.
///
/// These are storage-level outcomes; `AccessGate` converts them into
/// `DomainError` at the boundary.
///
/// - **Conflict**: a uniqueness constraint rejected an insert
/// - **Integrity**: a row referenced an identity that does not exist, or a
///   stored value could not be decoded
/// - **Backend**: connection, pool or protocol failure
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate {0}")]
    Conflict(String),

    #[error("integrity violation: {0}")]
    Integrity(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(what) => DomainError::Conflict(what),
            StoreError::Integrity(what) => DomainError::Integrity(what),
            StoreError::Backend(what) => DomainError::Unavailable(what),
        }
    }
}

/// Relational store behind the access gate.
///
/// Implementations perform **no authorization**: the gate decides and passes
/// a [`ReadScope`] into list queries so filtering happens inside the query.
///
/// Implementations must:
/// - reject duplicate natural keys with [`StoreError::Conflict`], atomically
///   (concurrent duplicates yield one success)
/// - reject rows whose identity is not registered with [`StoreError::Integrity`]
/// - write the registration pair in one transaction
/// - maintain `profiles.updated_at` themselves on every profile update
/// - cascade identity removal to every owned row
#[async_trait]
pub trait LearningStore: Send + Sync {
    /// Role-membership predicate. Single keyed lookup, read-only.
    async fn holds_role(&self, identity: IdentityId, role: Role) -> Result<bool, StoreError>;

    /// Insert the profile and its initial role atomically.
    ///
    /// Fails with `Conflict` if either row exists or the identity was removed.
    async fn register_identity(
        &self,
        profile: &Profile,
        role: &RoleAssignment,
    ) -> Result<(), StoreError>;

    /// Remove an identity and every row it owns. Returns whether it existed.
    ///
    /// The identity is remembered as removed even if it never existed.
    async fn remove_identity(&self, identity: IdentityId) -> Result<bool, StoreError>;

    async fn profile(&self, identity: IdentityId) -> Result<Option<Profile>, StoreError>;

    async fn profiles(&self, scope: ReadScope) -> Result<Vec<Profile>, StoreError>;

    /// Apply validated owner edits; `updated_at` is stamped by the store.
    async fn update_profile(
        &self,
        identity: IdentityId,
        changes: &ProfileChanges,
    ) -> Result<Option<Profile>, StoreError>;

    async fn roles_of(&self, identity: IdentityId) -> Result<Vec<RoleAssignment>, StoreError>;

    async fn insert_role(&self, assignment: &RoleAssignment) -> Result<(), StoreError>;

    async fn delete_role(&self, identity: IdentityId, role: Role) -> Result<bool, StoreError>;

    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StoreError>;

    async fn enrollment(&self, key: &EnrollmentKey) -> Result<Option<Enrollment>, StoreError>;

    async fn enrollments(&self, scope: ReadScope) -> Result<Vec<Enrollment>, StoreError>;

    /// Cache a progress value; stamps `completed_at` the first time it is 100.
    async fn set_enrollment_progress(
        &self,
        key: &EnrollmentKey,
        progress: Percent,
        now: DateTime<Utc>,
    ) -> Result<Option<Enrollment>, StoreError>;

    async fn touch_enrollment(
        &self,
        key: &EnrollmentKey,
        now: DateTime<Utc>,
    ) -> Result<Option<Enrollment>, StoreError>;

    async fn insert_completion(&self, completion: &ExerciseCompletion) -> Result<(), StoreError>;

    async fn count_completions(
        &self,
        identity: IdentityId,
        course: &CourseId,
    ) -> Result<u64, StoreError>;

    async fn completions(
        &self,
        scope: ReadScope,
        course: Option<&CourseId>,
    ) -> Result<Vec<ExerciseCompletion>, StoreError>;

    async fn insert_bookmark(&self, bookmark: &ResourceBookmark) -> Result<(), StoreError>;

    /// Insert, or replace the notes of an existing bookmark (keeping `created_at`).
    async fn upsert_bookmark(
        &self,
        bookmark: &ResourceBookmark,
    ) -> Result<ResourceBookmark, StoreError>;

    async fn delete_bookmark(&self, key: &BookmarkKey) -> Result<bool, StoreError>;

    async fn bookmarks(
        &self,
        scope: ReadScope,
        course: Option<&CourseId>,
    ) -> Result<Vec<ResourceBookmark>, StoreError>;
}

/// Shared handle to any store implementation.
pub type SharedStore = Arc<dyn LearningStore>;
