use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
#[cfg(test)]
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use learnhub_auth::{ReadScope, Role};
use learnhub_core::{CourseId, Entity, IdentityId};
use learnhub_learning::{
    BookmarkKey, CompletionKey, Enrollment, EnrollmentKey, ExerciseCompletion, Owned, Percent,
    Profile, ProfileChanges, ResourceBookmark, RoleAssignment,
};

use super::r#trait::{LearningStore, StoreError};

#[derive(Debug, Default)]
struct Tables {
    profiles: BTreeMap<IdentityId, Profile>,
    roles: BTreeMap<(IdentityId, Role), RoleAssignment>,
    enrollments: BTreeMap<EnrollmentKey, Enrollment>,
    completions: BTreeMap<CompletionKey, ExerciseCompletion>,
    bookmarks: BTreeMap<BookmarkKey, ResourceBookmark>,
    /// Identities removed by the authority; they never register again.
    removed: BTreeSet<IdentityId>,
}

impl Tables {
    /// An identity is live while its profile row exists.
    fn ensure_live(&self, identity: IdentityId) -> Result<(), StoreError> {
        if self.profiles.contains_key(&identity) {
            Ok(())
        } else {
            Err(StoreError::Integrity(format!("identity {identity} is not registered")))
        }
    }
}

/// In-memory store.
///
/// Intended for tests/dev. One lock guards every table, so each operation is
/// a serializable transaction and unique inserts are trivially atomic.
#[derive(Debug, Default)]
pub struct InMemoryLearningStore {
    tables: RwLock<Tables>,
    #[cfg(test)]
    fail_role_insert: AtomicBool,
    #[cfg(test)]
    partial_write_undone: AtomicBool,
}

impl InMemoryLearningStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    /// Make the next registration fail after its profile row is written.
    #[cfg(test)]
    pub(crate) fn fail_next_role_insert(&self) {
        self.fail_role_insert.store(true, Ordering::SeqCst);
    }

    /// Whether a failed registration had written its profile before undoing it.
    #[cfg(test)]
    pub(crate) fn partial_write_undone(&self) -> bool {
        self.partial_write_undone.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    fn role_insert_should_fail(&self) -> bool {
        self.fail_role_insert.swap(false, Ordering::SeqCst)
    }

    #[cfg(not(test))]
    fn role_insert_should_fail(&self) -> bool {
        false
    }

    #[cfg(test)]
    fn record_undo(&self, profile_was_written: bool) {
        self.partial_write_undone.store(profile_was_written, Ordering::SeqCst);
    }

    #[cfg(not(test))]
    fn record_undo(&self, _profile_was_written: bool) {}
}

fn scoped<'a, K, V>(rows: &'a BTreeMap<K, V>, scope: ReadScope) -> impl Iterator<Item = &'a V>
where
    V: Owned,
{
    rows.values().filter(move |row| scope.permits(row.owner()))
}

/// Insert `row` under its entity key unless the key is taken.
fn insert_unique<V>(rows: &mut BTreeMap<V::Id, V>, row: &V, what: &str) -> Result<(), StoreError>
where
    V: Entity + Clone,
    V::Id: Ord,
{
    let key = row.id();
    if rows.contains_key(&key) {
        return Err(StoreError::Conflict(format!("{what} {key:?}")));
    }
    rows.insert(key, row.clone());
    Ok(())
}

#[async_trait]
impl LearningStore for InMemoryLearningStore {
    async fn holds_role(&self, identity: IdentityId, role: Role) -> Result<bool, StoreError> {
        Ok(self.read()?.roles.contains_key(&(identity, role)))
    }

    async fn register_identity(
        &self,
        profile: &Profile,
        role: &RoleAssignment,
    ) -> Result<(), StoreError> {
        if profile.identity_id != role.identity_id {
            return Err(StoreError::Integrity(
                "registration rows reference different identities".to_string(),
            ));
        }

        let mut tables = self.write()?;
        let identity = profile.identity_id;

        if tables.removed.contains(&identity) {
            return Err(StoreError::Conflict(format!("identity {identity} was removed")));
        }

        // Nothing is visible to other operations until the lock is released,
        // so undoing the profile write is a complete rollback.
        insert_unique(&mut tables.profiles, profile, "profile")?;

        let role_written = if self.role_insert_should_fail() {
            Err(StoreError::Backend("role insert failed".to_string()))
        } else {
            insert_unique(&mut tables.roles, role, "role assignment")
        };

        if let Err(err) = role_written {
            let undone = tables.profiles.remove(&identity).is_some();
            self.record_undo(undone);
            return Err(err);
        }
        Ok(())
    }

    async fn remove_identity(&self, identity: IdentityId) -> Result<bool, StoreError> {
        let mut tables = self.write()?;

        let existed = tables.profiles.remove(&identity).is_some();
        tables.removed.insert(identity);
        tables.roles.retain(|_, r| r.owner() != identity);
        tables.enrollments.retain(|_, e| e.owner() != identity);
        tables.completions.retain(|_, c| c.owner() != identity);
        tables.bookmarks.retain(|_, b| b.owner() != identity);

        Ok(existed)
    }

    async fn profile(&self, identity: IdentityId) -> Result<Option<Profile>, StoreError> {
        Ok(self.read()?.profiles.get(&identity).cloned())
    }

    async fn profiles(&self, scope: ReadScope) -> Result<Vec<Profile>, StoreError> {
        Ok(scoped(&self.read()?.profiles, scope).cloned().collect())
    }

    async fn update_profile(
        &self,
        identity: IdentityId,
        changes: &ProfileChanges,
    ) -> Result<Option<Profile>, StoreError> {
        let mut tables = self.write()?;
        Ok(tables.profiles.get_mut(&identity).map(|profile| {
            profile.apply(changes, Utc::now());
            profile.clone()
        }))
    }

    async fn roles_of(&self, identity: IdentityId) -> Result<Vec<RoleAssignment>, StoreError> {
        Ok(self
            .read()?
            .roles
            .values()
            .filter(|r| r.identity_id == identity)
            .cloned()
            .collect())
    }

    async fn insert_role(&self, assignment: &RoleAssignment) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        tables.ensure_live(assignment.identity_id)?;
        insert_unique(&mut tables.roles, assignment, "role assignment")
    }

    async fn delete_role(&self, identity: IdentityId, role: Role) -> Result<bool, StoreError> {
        Ok(self.write()?.roles.remove(&(identity, role)).is_some())
    }

    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        tables.ensure_live(enrollment.identity_id)?;
        insert_unique(&mut tables.enrollments, enrollment, "enrollment")
    }

    async fn enrollment(&self, key: &EnrollmentKey) -> Result<Option<Enrollment>, StoreError> {
        Ok(self.read()?.enrollments.get(key).cloned())
    }

    async fn enrollments(&self, scope: ReadScope) -> Result<Vec<Enrollment>, StoreError> {
        Ok(scoped(&self.read()?.enrollments, scope).cloned().collect())
    }

    async fn set_enrollment_progress(
        &self,
        key: &EnrollmentKey,
        progress: Percent,
        now: DateTime<Utc>,
    ) -> Result<Option<Enrollment>, StoreError> {
        let mut tables = self.write()?;
        Ok(tables.enrollments.get_mut(key).map(|e| {
            e.record_progress(progress, now);
            e.clone()
        }))
    }

    async fn touch_enrollment(
        &self,
        key: &EnrollmentKey,
        now: DateTime<Utc>,
    ) -> Result<Option<Enrollment>, StoreError> {
        let mut tables = self.write()?;
        Ok(tables.enrollments.get_mut(key).map(|e| {
            e.touch(now);
            e.clone()
        }))
    }

    async fn insert_completion(&self, completion: &ExerciseCompletion) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        tables.ensure_live(completion.identity_id)?;
        insert_unique(&mut tables.completions, completion, "exercise completion")
    }

    async fn count_completions(
        &self,
        identity: IdentityId,
        course: &CourseId,
    ) -> Result<u64, StoreError> {
        Ok(self
            .read()?
            .completions
            .values()
            .filter(|c| c.identity_id == identity && &c.course_id == course)
            .count() as u64)
    }

    async fn completions(
        &self,
        scope: ReadScope,
        course: Option<&CourseId>,
    ) -> Result<Vec<ExerciseCompletion>, StoreError> {
        Ok(scoped(&self.read()?.completions, scope)
            .filter(|c| course.is_none_or(|course| &c.course_id == course))
            .cloned()
            .collect())
    }

    async fn insert_bookmark(&self, bookmark: &ResourceBookmark) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        tables.ensure_live(bookmark.identity_id)?;
        insert_unique(&mut tables.bookmarks, bookmark, "resource bookmark")
    }

    async fn upsert_bookmark(
        &self,
        bookmark: &ResourceBookmark,
    ) -> Result<ResourceBookmark, StoreError> {
        let mut tables = self.write()?;
        tables.ensure_live(bookmark.identity_id)?;

        let stored = tables
            .bookmarks
            .entry(bookmark.key())
            .and_modify(|existing| existing.notes = bookmark.notes.clone())
            .or_insert_with(|| bookmark.clone());
        Ok(stored.clone())
    }

    async fn delete_bookmark(&self, key: &BookmarkKey) -> Result<bool, StoreError> {
        Ok(self.write()?.bookmarks.remove(key).is_some())
    }

    async fn bookmarks(
        &self,
        scope: ReadScope,
        course: Option<&CourseId>,
    ) -> Result<Vec<ResourceBookmark>, StoreError> {
        Ok(scoped(&self.read()?.bookmarks, scope)
            .filter(|b| course.is_none_or(|course| &b.course_id == course))
            .cloned()
            .collect())
    }
}
