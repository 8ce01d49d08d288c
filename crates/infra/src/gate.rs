//! Access control gate.
//!
//! Every operation on learner-owned rows enters here with the caller's
//! identity. The gate resolves the caller's admin bit through the store's
//! role predicate (fresh, every call), evaluates the policy table, and only
//! then touches storage. Row-scoped reads push a `ReadScope` into the query.
//!
//! A policy denial and a missing row surface as the same
//! `DomainError::Forbidden`; the detailed decision goes to the log.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use learnhub_auth::{
    AccessClaims, Action, Caller, ReadScope, Resource, Role, authorize, explain_authorization,
    read_scope, validate_claims,
};
use learnhub_core::{CourseId, DomainError, DomainResult, IdentityId};
use learnhub_learning::{
    BookmarkKey, Enrollment, EnrollmentKey, ExerciseCompletion, NewBookmark, NewCompletion,
    Percent, Profile, ProfileChanges, ResourceBookmark, RoleAssignment, compute_progress,
    validate_total,
};

use crate::store::LearningStore;

pub struct AccessGate<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for AccessGate<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> AccessGate<S>
where
    S: LearningStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Privileged role-membership predicate.
    ///
    /// Not subject to row policy: the gate itself depends on it.
    pub async fn has_role(&self, identity: IdentityId, role: Role) -> DomainResult<bool> {
        Ok(self.store.holds_role(identity, role).await?)
    }

    /// Accept verified token claims and yield the caller identity.
    ///
    /// A rejected token is reported as `Forbidden`; the reason goes to the log.
    pub fn authenticate(
        &self,
        claims: &AccessClaims,
        now: DateTime<Utc>,
    ) -> DomainResult<IdentityId> {
        validate_claims(claims, now).map_err(|err| {
            warn!(subject = %claims.sub, error = %err, "access token rejected");
            DomainError::Forbidden
        })
    }

    async fn caller(&self, identity: IdentityId) -> DomainResult<Caller> {
        let admin = self.store.holds_role(identity, Role::Admin).await?;
        Ok(Caller::new(identity, admin))
    }

    fn check(
        &self,
        caller: &Caller,
        resource: Resource,
        action: Action,
        owner: IdentityId,
    ) -> DomainResult<()> {
        authorize(caller, resource, action, owner).map_err(|err| {
            let explanation = explain_authorization(caller, resource, action, owner);
            warn!(
                caller_id = %caller.identity_id(),
                owner_id = %owner,
                resource = %resource,
                action = %action,
                reason = %explanation.reason,
                "authorization denied"
            );
            DomainError::from(err)
        })
    }

    fn scope(&self, caller: &Caller, resource: Resource) -> DomainResult<ReadScope> {
        read_scope(caller, resource).map_err(|err| {
            warn!(
                caller_id = %caller.identity_id(),
                resource = %resource,
                "read scope denied"
            );
            DomainError::from(err)
        })
    }

    // ── Profiles ────────────────────────────────────────────────────────────

    pub async fn profile(&self, caller: IdentityId, owner: IdentityId) -> DomainResult<Profile> {
        let caller = self.caller(caller).await?;
        self.check(&caller, Resource::Profile, Action::Read, owner)?;
        self.store.profile(owner).await?.ok_or(DomainError::Forbidden)
    }

    pub async fn list_profiles(&self, caller: IdentityId) -> DomainResult<Vec<Profile>> {
        let caller = self.caller(caller).await?;
        let scope = self.scope(&caller, Resource::Profile)?;
        Ok(self.store.profiles(scope).await?)
    }

    /// Owner edits. `updated_at` is stamped by the store, never by the caller.
    pub async fn update_profile(
        &self,
        caller: IdentityId,
        owner: IdentityId,
        changes: ProfileChanges,
    ) -> DomainResult<Profile> {
        let caller = self.caller(caller).await?;
        self.check(&caller, Resource::Profile, Action::Update, owner)?;
        let changes = changes.validated()?;
        self.store
            .update_profile(owner, &changes)
            .await?
            .ok_or(DomainError::Forbidden)
    }

    // ── Roles ───────────────────────────────────────────────────────────────

    pub async fn roles_of(
        &self,
        caller: IdentityId,
        owner: IdentityId,
    ) -> DomainResult<Vec<RoleAssignment>> {
        let caller = self.caller(caller).await?;
        self.check(&caller, Resource::RoleAssignment, Action::Read, owner)?;
        Ok(self.store.roles_of(owner).await?)
    }

    pub async fn assign_role(
        &self,
        caller: IdentityId,
        target: IdentityId,
        role: Role,
    ) -> DomainResult<RoleAssignment> {
        let caller = self.caller(caller).await?;
        self.check(&caller, Resource::RoleAssignment, Action::Create, target)?;

        let assignment = RoleAssignment::new(target, role, Utc::now());
        self.store.insert_role(&assignment).await?;
        info!(
            granted_by = %caller.identity_id(),
            identity_id = %target,
            role = %role,
            "role granted"
        );
        Ok(assignment)
    }

    /// Revoke a role. Revoking a role the target does not hold reads as not found.
    pub async fn revoke_role(
        &self,
        caller: IdentityId,
        target: IdentityId,
        role: Role,
    ) -> DomainResult<()> {
        let caller = self.caller(caller).await?;
        self.check(&caller, Resource::RoleAssignment, Action::Delete, target)?;

        if !self.store.delete_role(target, role).await? {
            return Err(DomainError::Forbidden);
        }
        info!(
            revoked_by = %caller.identity_id(),
            identity_id = %target,
            role = %role,
            "role revoked"
        );
        Ok(())
    }

    // ── Enrollments ─────────────────────────────────────────────────────────

    pub async fn enroll(&self, caller: IdentityId, course: CourseId) -> DomainResult<Enrollment> {
        let caller = self.caller(caller).await?;
        let owner = caller.identity_id();
        self.check(&caller, Resource::Enrollment, Action::Create, owner)?;

        let enrollment = Enrollment::new(owner, course, Utc::now());
        self.store.insert_enrollment(&enrollment).await?;
        Ok(enrollment)
    }

    pub async fn enrollment(
        &self,
        caller: IdentityId,
        owner: IdentityId,
        course: &CourseId,
    ) -> DomainResult<Enrollment> {
        let caller = self.caller(caller).await?;
        self.check(&caller, Resource::Enrollment, Action::Read, owner)?;
        self.store
            .enrollment(&enrollment_key(owner, course))
            .await?
            .ok_or(DomainError::Forbidden)
    }

    pub async fn list_enrollments(&self, caller: IdentityId) -> DomainResult<Vec<Enrollment>> {
        let caller = self.caller(caller).await?;
        let scope = self.scope(&caller, Resource::Enrollment)?;
        Ok(self.store.enrollments(scope).await?)
    }

    /// Stamp `last_accessed_at` on the caller's own enrollment.
    pub async fn touch_enrollment(
        &self,
        caller: IdentityId,
        owner: IdentityId,
        course: &CourseId,
    ) -> DomainResult<Enrollment> {
        let caller = self.caller(caller).await?;
        self.check(&caller, Resource::Enrollment, Action::Update, owner)?;
        self.store
            .touch_enrollment(&enrollment_key(owner, course), Utc::now())
            .await?
            .ok_or(DomainError::Forbidden)
    }

    /// Store an owner-supplied progress value.
    pub async fn update_progress(
        &self,
        caller: IdentityId,
        owner: IdentityId,
        course: &CourseId,
        percent: i64,
    ) -> DomainResult<Enrollment> {
        let caller = self.caller(caller).await?;
        self.check(&caller, Resource::Enrollment, Action::Update, owner)?;
        let progress = Percent::new(percent)?;
        self.store
            .set_enrollment_progress(&enrollment_key(owner, course), progress, Utc::now())
            .await?
            .ok_or(DomainError::Forbidden)
    }

    /// Recompute progress from the completion ledger and cache it on the enrollment.
    pub async fn refresh_progress(
        &self,
        caller: IdentityId,
        owner: IdentityId,
        course: &CourseId,
        total_exercises: i64,
    ) -> DomainResult<Enrollment> {
        let caller = self.caller(caller).await?;
        self.check(&caller, Resource::Enrollment, Action::Update, owner)?;
        validate_total(total_exercises)?;

        let completed = self.store.count_completions(owner, course).await?;
        let progress = compute_progress(completed, total_exercises)?;
        self.store
            .set_enrollment_progress(&enrollment_key(owner, course), progress, Utc::now())
            .await?
            .ok_or(DomainError::Forbidden)
    }

    // ── Activity ledger ─────────────────────────────────────────────────────

    pub async fn record_completion(
        &self,
        caller: IdentityId,
        completion: NewCompletion,
    ) -> DomainResult<ExerciseCompletion> {
        completion.validate()?;
        let caller = self.caller(caller).await?;
        let owner = caller.identity_id();
        self.check(&caller, Resource::ExerciseCompletion, Action::Create, owner)?;

        let row = ExerciseCompletion::record(owner, completion, Utc::now());
        self.store.insert_completion(&row).await?;
        Ok(row)
    }

    pub async fn list_completions(
        &self,
        caller: IdentityId,
        course: Option<&CourseId>,
    ) -> DomainResult<Vec<ExerciseCompletion>> {
        let caller = self.caller(caller).await?;
        let scope = self.scope(&caller, Resource::ExerciseCompletion)?;
        Ok(self.store.completions(scope, course).await?)
    }

    /// Progress of `owner` in `course`; reads only, never writes the enrollment.
    ///
    /// A non-positive total is rejected once the caller is authorized, before
    /// the completion ledger is read.
    pub async fn compute_progress(
        &self,
        caller: IdentityId,
        owner: IdentityId,
        course: &CourseId,
        total_exercises: i64,
    ) -> DomainResult<Percent> {
        let caller = self.caller(caller).await?;
        self.check(&caller, Resource::ExerciseCompletion, Action::Read, owner)?;
        validate_total(total_exercises)?;

        let completed = self.store.count_completions(owner, course).await?;
        compute_progress(completed, total_exercises)
    }

    // ── Bookmarks ───────────────────────────────────────────────────────────

    /// Strict insert: an existing bookmark on the same resource is a conflict.
    pub async fn add_bookmark(
        &self,
        caller: IdentityId,
        bookmark: NewBookmark,
    ) -> DomainResult<ResourceBookmark> {
        let bookmark = bookmark.validated()?;
        let caller = self.caller(caller).await?;
        let owner = caller.identity_id();
        self.check(&caller, Resource::ResourceBookmark, Action::Create, owner)?;

        let row = ResourceBookmark::create(owner, bookmark, Utc::now());
        self.store.insert_bookmark(&row).await?;
        Ok(row)
    }

    /// Insert, or replace the notes of an existing bookmark.
    pub async fn upsert_bookmark(
        &self,
        caller: IdentityId,
        bookmark: NewBookmark,
    ) -> DomainResult<ResourceBookmark> {
        let bookmark = bookmark.validated()?;
        let caller = self.caller(caller).await?;
        let owner = caller.identity_id();
        self.check(&caller, Resource::ResourceBookmark, Action::Create, owner)?;
        self.check(&caller, Resource::ResourceBookmark, Action::Update, owner)?;

        let row = ResourceBookmark::create(owner, bookmark, Utc::now());
        Ok(self.store.upsert_bookmark(&row).await?)
    }

    pub async fn delete_bookmark(&self, caller: IdentityId, key: &BookmarkKey) -> DomainResult<()> {
        let caller = self.caller(caller).await?;
        self.check(&caller, Resource::ResourceBookmark, Action::Delete, key.identity_id)?;

        if self.store.delete_bookmark(key).await? {
            Ok(())
        } else {
            Err(DomainError::Forbidden)
        }
    }

    pub async fn list_bookmarks(
        &self,
        caller: IdentityId,
        course: Option<&CourseId>,
    ) -> DomainResult<Vec<ResourceBookmark>> {
        let caller = self.caller(caller).await?;
        let scope = self.scope(&caller, Resource::ResourceBookmark)?;
        Ok(self.store.bookmarks(scope, course).await?)
    }
}

fn enrollment_key(owner: IdentityId, course: &CourseId) -> EnrollmentKey {
    EnrollmentKey {
        identity_id: owner,
        course_id: course.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryLearningStore;
    use chrono::Duration;
    use learnhub_core::{ExerciseId, ResourceId};
    use learnhub_learning::NewProfile;

    struct Fixture {
        store: Arc<InMemoryLearningStore>,
        gate: AccessGate<InMemoryLearningStore>,
    }

    impl Fixture {
        fn new() -> Self {
            let store = Arc::new(InMemoryLearningStore::new());
            let gate = AccessGate::new(Arc::clone(&store));
            Self { store, gate }
        }

        async fn student(&self) -> IdentityId {
            let id = IdentityId::new();
            let now = Utc::now();
            let profile = Profile::create(id, NewProfile::from_registration(None, None), now);
            let role = RoleAssignment::new(id, Role::Student, now);
            self.store.register_identity(&profile, &role).await.unwrap();
            id
        }

        /// Admins are bootstrapped directly in storage, outside the gate.
        async fn admin(&self) -> IdentityId {
            let id = self.student().await;
            self.store
                .insert_role(&RoleAssignment::new(id, Role::Admin, Utc::now()))
                .await
                .unwrap();
            id
        }
    }

    fn course(slug: &str) -> CourseId {
        CourseId::new(slug).unwrap()
    }

    fn exercise(course_slug: &str, slug: &str) -> NewCompletion {
        NewCompletion::new(course(course_slug), ExerciseId::new(slug).unwrap())
    }

    fn bookmark(notes: Option<&str>) -> NewBookmark {
        NewBookmark::new(
            course("rust-101"),
            ResourceId::new("ownership-notes").unwrap(),
            notes.map(str::to_string),
        )
    }

    #[tokio::test]
    async fn assign_then_revoke_role() {
        let fx = Fixture::new();
        let root = fx.admin().await;
        let learner = fx.student().await;

        fx.gate.assign_role(root, learner, Role::Admin).await.unwrap();
        assert!(fx.gate.has_role(learner, Role::Admin).await.unwrap());

        fx.gate.revoke_role(root, learner, Role::Admin).await.unwrap();
        assert!(!fx.gate.has_role(learner, Role::Admin).await.unwrap());
    }

    #[tokio::test]
    async fn students_cannot_manage_roles() {
        let fx = Fixture::new();
        let learner = fx.student().await;

        let err = fx.gate.assign_role(learner, learner, Role::Admin).await.unwrap_err();
        assert_eq!(err, DomainError::Forbidden);
        assert!(!fx.gate.has_role(learner, Role::Admin).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_role_assignment_conflicts() {
        let fx = Fixture::new();
        let root = fx.admin().await;
        let learner = fx.student().await;

        let err = fx.gate.assign_role(root, learner, Role::Student).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn revoking_an_unheld_role_reads_as_not_found() {
        let fx = Fixture::new();
        let root = fx.admin().await;
        let learner = fx.student().await;

        let err = fx.gate.revoke_role(root, learner, Role::Admin).await.unwrap_err();
        assert_eq!(err, DomainError::Forbidden);
    }

    #[tokio::test]
    async fn admin_bit_is_resolved_per_call() {
        let fx = Fixture::new();
        let root = fx.admin().await;
        let other_admin = fx.admin().await;
        let learner = fx.student().await;
        fx.gate.enroll(learner, course("c1")).await.unwrap();

        assert_eq!(fx.gate.list_enrollments(other_admin).await.unwrap().len(), 1);
        fx.gate.revoke_role(root, other_admin, Role::Admin).await.unwrap();
        assert!(fx.gate.list_enrollments(other_admin).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn second_enroll_conflicts_and_keeps_first_row() {
        let fx = Fixture::new();
        let learner = fx.student().await;
        let c = course("rust-101");

        fx.gate.enroll(learner, c.clone()).await.unwrap();
        fx.gate.update_progress(learner, learner, &c, 40).await.unwrap();

        let err = fx.gate.enroll(learner, c.clone()).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        let row = fx.gate.enrollment(learner, learner, &c).await.unwrap();
        assert_eq!(row.progress.value(), 40);
    }

    #[tokio::test]
    async fn duplicate_completion_conflicts_with_one_row() {
        let fx = Fixture::new();
        let learner = fx.student().await;

        fx.gate.record_completion(learner, exercise("c1", "e1")).await.unwrap();
        let err = fx
            .gate
            .record_completion(learner, exercise("c1", "e1").with_score(90))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        let rows = fx.gate.list_completions(learner, None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].score, None);
    }

    #[tokio::test]
    async fn negative_score_is_rejected() {
        let fx = Fixture::new();
        let learner = fx.student().await;

        let err = fx
            .gate
            .record_completion(learner, exercise("c1", "e1").with_score(-1))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(fx.gate.list_completions(learner, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn progress_over_ten_exercises() {
        let fx = Fixture::new();
        let learner = fx.student().await;
        let c = course("c1");

        assert_eq!(fx.gate.compute_progress(learner, learner, &c, 10).await.unwrap().value(), 0);

        for i in 0..5 {
            fx.gate.record_completion(learner, exercise("c1", &format!("e{i}"))).await.unwrap();
        }
        assert_eq!(fx.gate.compute_progress(learner, learner, &c, 10).await.unwrap().value(), 50);

        for i in 5..12 {
            fx.gate.record_completion(learner, exercise("c1", &format!("e{i}"))).await.unwrap();
        }
        assert_eq!(fx.gate.compute_progress(learner, learner, &c, 10).await.unwrap().value(), 100);
    }

    #[tokio::test]
    async fn progress_ignores_other_courses() {
        let fx = Fixture::new();
        let learner = fx.student().await;

        fx.gate.record_completion(learner, exercise("c1", "e1")).await.unwrap();
        fx.gate.record_completion(learner, exercise("c2", "e1")).await.unwrap();

        let p = fx.gate.compute_progress(learner, learner, &course("c1"), 4).await.unwrap();
        assert_eq!(p.value(), 25);
    }

    #[tokio::test]
    async fn zero_total_is_a_validation_error() {
        let fx = Fixture::new();
        let learner = fx.student().await;

        let err = fx
            .gate
            .compute_progress(learner, learner, &course("c1"), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn computing_progress_does_not_touch_the_enrollment() {
        let fx = Fixture::new();
        let learner = fx.student().await;
        let c = course("c1");
        fx.gate.enroll(learner, c.clone()).await.unwrap();
        fx.gate.record_completion(learner, exercise("c1", "e1")).await.unwrap();

        fx.gate.compute_progress(learner, learner, &c, 1).await.unwrap();
        let row = fx.gate.enrollment(learner, learner, &c).await.unwrap();
        assert_eq!(row.progress, Percent::ZERO);
        assert!(row.completed_at.is_none());
    }

    #[tokio::test]
    async fn refresh_progress_stamps_completion_once() {
        let fx = Fixture::new();
        let learner = fx.student().await;
        let c = course("c1");
        fx.gate.enroll(learner, c.clone()).await.unwrap();
        fx.gate.record_completion(learner, exercise("c1", "e1")).await.unwrap();
        fx.gate.record_completion(learner, exercise("c1", "e2")).await.unwrap();

        let half = fx.gate.refresh_progress(learner, learner, &c, 4).await.unwrap();
        assert_eq!(half.progress.value(), 50);
        assert!(half.completed_at.is_none());

        let done = fx.gate.refresh_progress(learner, learner, &c, 2).await.unwrap();
        assert!(done.progress.is_complete());
        let stamped = done.completed_at.unwrap();

        // Catalog grew: progress drops, the completion stamp stays.
        let regrown = fx.gate.refresh_progress(learner, learner, &c, 4).await.unwrap();
        assert_eq!(regrown.progress.value(), 50);
        assert_eq!(regrown.completed_at, Some(stamped));
    }

    #[tokio::test]
    async fn strangers_are_denied_before_the_total_is_checked() {
        let fx = Fixture::new();
        let owner = fx.student().await;
        let stranger = fx.student().await;
        let c = course("c1");
        fx.gate.enroll(owner, c.clone()).await.unwrap();

        let err = fx.gate.compute_progress(stranger, owner, &c, 0).await.unwrap_err();
        assert_eq!(err, DomainError::Forbidden);
        let err = fx.gate.refresh_progress(stranger, owner, &c, -3).await.unwrap_err();
        assert_eq!(err, DomainError::Forbidden);

        let err = fx.gate.compute_progress(owner, owner, &c, 0).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn out_of_range_progress_is_rejected() {
        let fx = Fixture::new();
        let learner = fx.student().await;
        let c = course("c1");
        fx.gate.enroll(learner, c.clone()).await.unwrap();

        let err = fx.gate.update_progress(learner, learner, &c, 101).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        let err = fx.gate.update_progress(learner, learner, &c, -1).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn stranger_read_is_indistinguishable_from_missing() {
        let fx = Fixture::new();
        let owner = fx.student().await;
        let stranger = fx.student().await;
        let c = course("c1");
        fx.gate.enroll(owner, c.clone()).await.unwrap();

        let denied = fx.gate.enrollment(stranger, owner, &c).await.unwrap_err();
        let missing = fx.gate.enrollment(stranger, stranger, &c).await.unwrap_err();

        assert_eq!(denied, missing);
        assert_eq!(denied.to_string(), missing.to_string());
        assert!(fx.gate.list_enrollments(stranger).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn admin_reads_everything_but_cannot_update_others_enrollment() {
        let fx = Fixture::new();
        let root = fx.admin().await;
        let learner = fx.student().await;
        let c = course("c1");
        fx.gate.enroll(learner, c.clone()).await.unwrap();
        fx.gate.record_completion(learner, exercise("c1", "e1")).await.unwrap();
        fx.gate.add_bookmark(learner, bookmark(Some("later"))).await.unwrap();

        assert_eq!(fx.gate.list_enrollments(root).await.unwrap().len(), 1);
        assert_eq!(fx.gate.list_completions(root, None).await.unwrap().len(), 1);
        assert_eq!(fx.gate.list_bookmarks(root, None).await.unwrap().len(), 1);
        assert!(fx.gate.enrollment(root, learner, &c).await.is_ok());

        let err = fx.gate.update_progress(root, learner, &c, 100).await.unwrap_err();
        assert_eq!(err, DomainError::Forbidden);
        let row = fx.gate.enrollment(learner, learner, &c).await.unwrap();
        assert_eq!(row.progress, Percent::ZERO);
    }

    #[tokio::test]
    async fn profile_update_advances_updated_at() {
        let fx = Fixture::new();
        let learner = fx.student().await;
        let before = fx.gate.profile(learner, learner).await.unwrap();

        let after = fx
            .gate
            .update_profile(learner, learner, ProfileChanges::display_name("  Ada  "))
            .await
            .unwrap();

        assert_eq!(after.display_name, "Ada");
        assert!(after.updated_at >= before.updated_at);
        assert_eq!(after.created_at, before.created_at);
    }

    #[tokio::test]
    async fn only_the_owner_updates_a_profile() {
        let fx = Fixture::new();
        let root = fx.admin().await;
        let learner = fx.student().await;

        assert!(fx.gate.profile(root, learner).await.is_ok());
        let err = fx
            .gate
            .update_profile(root, learner, ProfileChanges::display_name("Hacked"))
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::Forbidden);
    }

    #[tokio::test]
    async fn blank_display_name_is_rejected() {
        let fx = Fixture::new();
        let learner = fx.student().await;

        let err = fx
            .gate
            .update_profile(learner, learner, ProfileChanges::display_name("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn bookmark_upsert_replaces_notes_and_keeps_created_at() {
        let fx = Fixture::new();
        let learner = fx.student().await;

        let first = fx.gate.upsert_bookmark(learner, bookmark(Some("v1"))).await.unwrap();
        let second = fx.gate.upsert_bookmark(learner, bookmark(Some("v2"))).await.unwrap();

        assert_eq!(second.notes.as_deref(), Some("v2"));
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(fx.gate.list_bookmarks(learner, None).await.unwrap().len(), 1);

        let err = fx.gate.add_bookmark(learner, bookmark(None)).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn only_the_owner_deletes_a_bookmark() {
        let fx = Fixture::new();
        let root = fx.admin().await;
        let learner = fx.student().await;
        let row = fx.gate.add_bookmark(learner, bookmark(None)).await.unwrap();

        let err = fx.gate.delete_bookmark(root, &row.key()).await.unwrap_err();
        assert_eq!(err, DomainError::Forbidden);

        fx.gate.delete_bookmark(learner, &row.key()).await.unwrap();
        let err = fx.gate.delete_bookmark(learner, &row.key()).await.unwrap_err();
        assert_eq!(err, DomainError::Forbidden);
    }

    #[tokio::test]
    async fn listings_filter_by_course() {
        let fx = Fixture::new();
        let learner = fx.student().await;
        fx.gate.record_completion(learner, exercise("c1", "e1")).await.unwrap();
        fx.gate.record_completion(learner, exercise("c2", "e1")).await.unwrap();

        let c1 = course("c1");
        let rows = fx.gate.list_completions(learner, Some(&c1)).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].course_id, c1);
    }

    #[tokio::test]
    async fn works_behind_a_trait_object() {
        let store: crate::store::SharedStore = Arc::new(InMemoryLearningStore::new());
        let gate = AccessGate::new(store);
        let stranger = IdentityId::new();

        let err = gate.enroll(stranger, course("c1")).await.unwrap_err();
        assert!(matches!(err, DomainError::Integrity(_)));
    }

    #[tokio::test]
    async fn valid_token_admits_its_subject() {
        let fx = Fixture::new();
        let learner = fx.student().await;
        let now = Utc::now();
        let claims = AccessClaims {
            sub: learner,
            issued_at: now - Duration::minutes(1),
            expires_at: now + Duration::hours(1),
        };

        let caller = fx.gate.authenticate(&claims, now).unwrap();
        assert_eq!(caller, learner);
        fx.gate.enroll(caller, course("c1")).await.unwrap();
    }

    #[tokio::test]
    async fn rejected_tokens_read_as_forbidden() {
        let fx = Fixture::new();
        let learner = fx.student().await;
        let now = Utc::now();

        let expired = AccessClaims {
            sub: learner,
            issued_at: now - Duration::hours(2),
            expires_at: now - Duration::hours(1),
        };
        assert_eq!(fx.gate.authenticate(&expired, now), Err(DomainError::Forbidden));

        let early = AccessClaims {
            sub: learner,
            issued_at: now + Duration::minutes(5),
            expires_at: now + Duration::hours(1),
        };
        assert_eq!(fx.gate.authenticate(&early, now), Err(DomainError::Forbidden));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_enrollments_admit_exactly_one() {
        let fx = Fixture::new();
        let learner = fx.student().await;

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let gate = fx.gate.clone();
                tokio::spawn(async move { gate.enroll(learner, course("race")).await })
            })
            .collect();

        let (mut created, mut conflicts) = (0, 0);
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => created += 1,
                Err(DomainError::Conflict(_)) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!((created, conflicts), (1, 15));
        assert_eq!(fx.gate.list_enrollments(learner).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_completions_record_exactly_one() {
        let fx = Fixture::new();
        let learner = fx.student().await;

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let gate = fx.gate.clone();
                tokio::spawn(async move {
                    gate.record_completion(learner, exercise("race", "ex-1")).await
                })
            })
            .collect();

        let (mut created, mut conflicts) = (0, 0);
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => created += 1,
                Err(DomainError::Conflict(_)) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!((created, conflicts), (1, 15));
        assert_eq!(fx.gate.list_completions(learner, None).await.unwrap().len(), 1);
    }
}
