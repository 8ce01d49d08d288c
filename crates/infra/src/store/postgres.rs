//! Postgres-backed learning store.
//!
//! Uniqueness, referential integrity, the progress range and the profile
//! timestamp are all enforced by the schema in [`super::schema`]; this module
//! maps rows to domain types and database errors to [`StoreError`].
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `Conflict` | Duplicate natural key (possibly a concurrent insert) |
//! | Database (foreign key violation) | `23503` | `Integrity` | Row for an identity that is not registered |
//! | Database (check constraint violation) | `23514` | `Integrity` | Value escaped validation |
//! | Database (other) | Any other | `Backend` | Trigger exceptions, permissions, etc. |
//! | PoolTimedOut / PoolClosed | N/A | `Backend` | Pool exhausted or shut down |
//! | Other | N/A | `Backend` | Network errors, connection failures, etc. |
//!
//! ## Thread Safety
//!
//! `PostgresLearningStore` is `Send + Sync`; all access goes through the SQLx
//! connection pool.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{FromRow, Row};
use tracing::{Span, field, instrument};
use uuid::Uuid;

use learnhub_auth::{ReadScope, Role};
use learnhub_core::{CourseId, ExerciseId, IdentityId, ResourceId};
use learnhub_learning::{
    BookmarkKey, Enrollment, EnrollmentKey, ExerciseCompletion, Percent, Profile, ProfileChanges,
    ResourceBookmark, RoleAssignment,
};

use super::r#trait::{LearningStore, StoreError};
use super::schema::SCHEMA;
use crate::config::PostgresConfig;

/// Postgres-backed store.
///
/// Every list query binds the caller's [`ReadScope`] owner as a nullable
/// parameter (`$1::uuid IS NULL OR identity_id = $1`), so rows outside the
/// scope are filtered by the database and never decoded.
#[derive(Debug, Clone)]
pub struct PostgresLearningStore {
    pool: Arc<PgPool>,
}

impl PostgresLearningStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a connection pool using the given configuration.
    pub async fn connect(config: &PostgresConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Apply the schema (idempotent).
    #[instrument(skip_all, err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }
}

#[async_trait]
impl LearningStore for PostgresLearningStore {
    #[instrument(skip_all, fields(identity_id = %identity, role = %role), err)]
    async fn holds_role(&self, identity: IdentityId, role: Role) -> Result<bool, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM user_roles WHERE identity_id = $1 AND role = $2
            ) AS held
            "#,
        )
        .bind(identity.as_uuid())
        .bind(role.as_str())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("holds_role", e))?;

        row.try_get("held").map_err(decode_error)
    }

    #[instrument(skip_all, fields(identity_id = %profile.identity_id), err)]
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

        // Dropping the transaction on any early return rolls it back.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let removed: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM identity_tombstones WHERE id = $1)")
                .bind(profile.identity_id.as_uuid())
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("check_tombstone", e))?;
        if removed {
            return Err(StoreError::Conflict(format!(
                "identity {} was removed",
                profile.identity_id
            )));
        }

        sqlx::query("INSERT INTO identities (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
            .bind(profile.identity_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_identity", e))?;

        sqlx::query(
            r#"
            INSERT INTO profiles (
                identity_id,
                display_name,
                student_id,
                avatar_url,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(profile.identity_id.as_uuid())
        .bind(&profile.display_name)
        .bind(profile.student_id.as_deref())
        .bind(profile.avatar_url.as_deref())
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_profile", e))?;

        sqlx::query("INSERT INTO user_roles (identity_id, role, granted_at) VALUES ($1, $2, $3)")
            .bind(role.identity_id.as_uuid())
            .bind(role.role.as_str())
            .bind(role.granted_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_role", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    #[instrument(skip_all, fields(identity_id = %identity), err)]
    async fn remove_identity(&self, identity: IdentityId) -> Result<bool, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let result = sqlx::query("DELETE FROM identities WHERE id = $1")
            .bind(identity.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("remove_identity", e))?;

        sqlx::query("INSERT INTO identity_tombstones (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
            .bind(identity.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_tombstone", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip_all, fields(identity_id = %identity), err)]
    async fn profile(&self, identity: IdentityId) -> Result<Option<Profile>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT identity_id, display_name, student_id, avatar_url, created_at, updated_at
            FROM profiles
            WHERE identity_id = $1
            "#,
        )
        .bind(identity.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("profile", e))?;

        row.map(|r| ProfileRow::from_row(&r).map(Profile::from).map_err(decode_error))
            .transpose()
    }

    #[instrument(skip_all, fields(scope = ?scope, rows = field::Empty), err)]
    async fn profiles(&self, scope: ReadScope) -> Result<Vec<Profile>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT identity_id, display_name, student_id, avatar_url, created_at, updated_at
            FROM profiles
            WHERE ($1::uuid IS NULL OR identity_id = $1)
            ORDER BY created_at ASC
            "#,
        )
        .bind(scope_owner(scope))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("profiles", e))?;

        Span::current().record("rows", rows.len());
        rows.iter()
            .map(|r| ProfileRow::from_row(r).map(Profile::from).map_err(decode_error))
            .collect()
    }

    #[instrument(skip_all, fields(identity_id = %identity), err)]
    async fn update_profile(
        &self,
        identity: IdentityId,
        changes: &ProfileChanges,
    ) -> Result<Option<Profile>, StoreError> {
        // updated_at is maintained by the profiles_touch trigger.
        let row = sqlx::query(
            r#"
            UPDATE profiles SET
                display_name = COALESCE($2, display_name),
                avatar_url = CASE WHEN $3 THEN $4 ELSE avatar_url END
            WHERE identity_id = $1
            RETURNING identity_id, display_name, student_id, avatar_url, created_at, updated_at
            "#,
        )
        .bind(identity.as_uuid())
        .bind(changes.display_name.as_deref())
        .bind(changes.avatar_url.is_some())
        .bind(changes.avatar_url.clone().flatten())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_profile", e))?;

        row.map(|r| ProfileRow::from_row(&r).map(Profile::from).map_err(decode_error))
            .transpose()
    }

    #[instrument(skip_all, fields(identity_id = %identity), err)]
    async fn roles_of(&self, identity: IdentityId) -> Result<Vec<RoleAssignment>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT identity_id, role, granted_at
            FROM user_roles
            WHERE identity_id = $1
            ORDER BY role ASC
            "#,
        )
        .bind(identity.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("roles_of", e))?;

        rows.iter().map(decode_role).collect()
    }

    #[instrument(
        skip_all,
        fields(identity_id = %assignment.identity_id, role = %assignment.role),
        err
    )]
    async fn insert_role(&self, assignment: &RoleAssignment) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO user_roles (identity_id, role, granted_at) VALUES ($1, $2, $3)")
            .bind(assignment.identity_id.as_uuid())
            .bind(assignment.role.as_str())
            .bind(assignment.granted_at)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_role", e))?;
        Ok(())
    }

    #[instrument(skip_all, fields(identity_id = %identity, role = %role), err)]
    async fn delete_role(&self, identity: IdentityId, role: Role) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM user_roles WHERE identity_id = $1 AND role = $2")
            .bind(identity.as_uuid())
            .bind(role.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_role", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(
        skip_all,
        fields(identity_id = %enrollment.identity_id, course_id = %enrollment.course_id),
        err
    )]
    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO enrollments (
                identity_id,
                course_id,
                enrolled_at,
                progress_percentage,
                last_accessed_at,
                completed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(enrollment.identity_id.as_uuid())
        .bind(enrollment.course_id.as_str())
        .bind(enrollment.enrolled_at)
        .bind(enrollment.progress.value() as i16)
        .bind(enrollment.last_accessed_at)
        .bind(enrollment.completed_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_enrollment", e))?;
        Ok(())
    }

    #[instrument(
        skip_all,
        fields(identity_id = %key.identity_id, course_id = %key.course_id),
        err
    )]
    async fn enrollment(&self, key: &EnrollmentKey) -> Result<Option<Enrollment>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT identity_id, course_id, enrolled_at, progress_percentage,
                   last_accessed_at, completed_at
            FROM enrollments
            WHERE identity_id = $1 AND course_id = $2
            "#,
        )
        .bind(key.identity_id.as_uuid())
        .bind(key.course_id.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("enrollment", e))?;

        row.as_ref().map(decode_enrollment).transpose()
    }

    #[instrument(skip_all, fields(scope = ?scope, rows = field::Empty), err)]
    async fn enrollments(&self, scope: ReadScope) -> Result<Vec<Enrollment>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT identity_id, course_id, enrolled_at, progress_percentage,
                   last_accessed_at, completed_at
            FROM enrollments
            WHERE ($1::uuid IS NULL OR identity_id = $1)
            ORDER BY enrolled_at ASC
            "#,
        )
        .bind(scope_owner(scope))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("enrollments", e))?;

        Span::current().record("rows", rows.len());
        rows.iter().map(decode_enrollment).collect()
    }

    #[instrument(
        skip_all,
        fields(identity_id = %key.identity_id, course_id = %key.course_id, progress = %progress),
        err
    )]
    async fn set_enrollment_progress(
        &self,
        key: &EnrollmentKey,
        progress: Percent,
        now: DateTime<Utc>,
    ) -> Result<Option<Enrollment>, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE enrollments SET
                progress_percentage = $3,
                completed_at = CASE
                    WHEN $3 = 100 THEN COALESCE(completed_at, $4)
                    ELSE completed_at
                END
            WHERE identity_id = $1 AND course_id = $2
            RETURNING identity_id, course_id, enrolled_at, progress_percentage,
                      last_accessed_at, completed_at
            "#,
        )
        .bind(key.identity_id.as_uuid())
        .bind(key.course_id.as_str())
        .bind(progress.value() as i16)
        .bind(now)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("set_enrollment_progress", e))?;

        row.as_ref().map(decode_enrollment).transpose()
    }

    #[instrument(
        skip_all,
        fields(identity_id = %key.identity_id, course_id = %key.course_id),
        err
    )]
    async fn touch_enrollment(
        &self,
        key: &EnrollmentKey,
        now: DateTime<Utc>,
    ) -> Result<Option<Enrollment>, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE enrollments SET last_accessed_at = $3
            WHERE identity_id = $1 AND course_id = $2
            RETURNING identity_id, course_id, enrolled_at, progress_percentage,
                      last_accessed_at, completed_at
            "#,
        )
        .bind(key.identity_id.as_uuid())
        .bind(key.course_id.as_str())
        .bind(now)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("touch_enrollment", e))?;

        row.as_ref().map(decode_enrollment).transpose()
    }

    #[instrument(
        skip_all,
        fields(
            identity_id = %completion.identity_id,
            course_id = %completion.course_id,
            exercise_id = %completion.exercise_id
        ),
        err
    )]
    async fn insert_completion(&self, completion: &ExerciseCompletion) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO exercise_completions (
                identity_id,
                course_id,
                exercise_id,
                completed_at,
                score,
                time_spent_seconds
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(completion.identity_id.as_uuid())
        .bind(completion.course_id.as_str())
        .bind(completion.exercise_id.as_str())
        .bind(completion.completed_at)
        .bind(completion.score)
        .bind(completion.time_spent_seconds)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_completion", e))?;
        Ok(())
    }

    #[instrument(skip_all, fields(identity_id = %identity, course_id = %course), err)]
    async fn count_completions(
        &self,
        identity: IdentityId,
        course: &CourseId,
    ) -> Result<u64, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS completed
            FROM exercise_completions
            WHERE identity_id = $1 AND course_id = $2
            "#,
        )
        .bind(identity.as_uuid())
        .bind(course.as_str())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_completions", e))?;

        let completed: i64 = row.try_get("completed").map_err(decode_error)?;
        Ok(completed.max(0) as u64)
    }

    #[instrument(skip_all, fields(scope = ?scope, rows = field::Empty), err)]
    async fn completions(
        &self,
        scope: ReadScope,
        course: Option<&CourseId>,
    ) -> Result<Vec<ExerciseCompletion>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT identity_id, course_id, exercise_id, completed_at, score, time_spent_seconds
            FROM exercise_completions
            WHERE ($1::uuid IS NULL OR identity_id = $1)
                AND ($2::text IS NULL OR course_id = $2)
            ORDER BY completed_at ASC
            "#,
        )
        .bind(scope_owner(scope))
        .bind(course.map(CourseId::as_str))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("completions", e))?;

        Span::current().record("rows", rows.len());
        rows.iter().map(decode_completion).collect()
    }

    #[instrument(
        skip_all,
        fields(
            identity_id = %bookmark.identity_id,
            course_id = %bookmark.course_id,
            resource_id = %bookmark.resource_id
        ),
        err
    )]
    async fn insert_bookmark(&self, bookmark: &ResourceBookmark) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO resource_bookmarks (identity_id, course_id, resource_id, notes, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(bookmark.identity_id.as_uuid())
        .bind(bookmark.course_id.as_str())
        .bind(bookmark.resource_id.as_str())
        .bind(bookmark.notes.as_deref())
        .bind(bookmark.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_bookmark", e))?;
        Ok(())
    }

    #[instrument(
        skip_all,
        fields(
            identity_id = %bookmark.identity_id,
            course_id = %bookmark.course_id,
            resource_id = %bookmark.resource_id
        ),
        err
    )]
    async fn upsert_bookmark(
        &self,
        bookmark: &ResourceBookmark,
    ) -> Result<ResourceBookmark, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO resource_bookmarks (identity_id, course_id, resource_id, notes, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (identity_id, course_id, resource_id)
            DO UPDATE SET notes = EXCLUDED.notes
            RETURNING identity_id, course_id, resource_id, notes, created_at
            "#,
        )
        .bind(bookmark.identity_id.as_uuid())
        .bind(bookmark.course_id.as_str())
        .bind(bookmark.resource_id.as_str())
        .bind(bookmark.notes.as_deref())
        .bind(bookmark.created_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_bookmark", e))?;

        decode_bookmark(&row)
    }

    #[instrument(
        skip_all,
        fields(identity_id = %key.identity_id, course_id = %key.course_id),
        err
    )]
    async fn delete_bookmark(&self, key: &BookmarkKey) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM resource_bookmarks
            WHERE identity_id = $1 AND course_id = $2 AND resource_id = $3
            "#,
        )
        .bind(key.identity_id.as_uuid())
        .bind(key.course_id.as_str())
        .bind(key.resource_id.as_str())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("delete_bookmark", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip_all, fields(scope = ?scope, rows = field::Empty), err)]
    async fn bookmarks(
        &self,
        scope: ReadScope,
        course: Option<&CourseId>,
    ) -> Result<Vec<ResourceBookmark>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT identity_id, course_id, resource_id, notes, created_at
            FROM resource_bookmarks
            WHERE ($1::uuid IS NULL OR identity_id = $1)
                AND ($2::text IS NULL OR course_id = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(scope_owner(scope))
        .bind(course.map(CourseId::as_str))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("bookmarks", e))?;

        Span::current().record("rows", rows.len());
        rows.iter().map(decode_bookmark).collect()
    }
}

fn scope_owner(scope: ReadScope) -> Option<Uuid> {
    scope.owner().map(Uuid::from)
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("{operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                Some("23503") => StoreError::Integrity(msg),
                Some("23514") => StoreError::Integrity(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::Backend(format!("connection pool timed out in {operation}"))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        other => StoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}

fn decode_error(err: sqlx::Error) -> StoreError {
    StoreError::Integrity(format!("failed to decode row: {err}"))
}

fn corrupt(what: &str, err: impl core::fmt::Display) -> StoreError {
    StoreError::Integrity(format!("stored {what} is invalid: {err}"))
}

// SQLx row types

#[derive(Debug)]
struct ProfileRow {
    identity_id: Uuid,
    display_name: String,
    student_id: Option<String>,
    avatar_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for ProfileRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProfileRow {
            identity_id: row.try_get("identity_id")?,
            display_name: row.try_get("display_name")?,
            student_id: row.try_get("student_id")?,
            avatar_url: row.try_get("avatar_url")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Profile {
            identity_id: IdentityId::from_uuid(row.identity_id),
            display_name: row.display_name,
            student_id: row.student_id,
            avatar_url: row.avatar_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn decode_role(row: &PgRow) -> Result<RoleAssignment, StoreError> {
    let identity_id: Uuid = row.try_get("identity_id").map_err(decode_error)?;
    let role: String = row.try_get("role").map_err(decode_error)?;
    let granted_at: DateTime<Utc> = row.try_get("granted_at").map_err(decode_error)?;

    Ok(RoleAssignment {
        identity_id: IdentityId::from_uuid(identity_id),
        role: role.parse().map_err(|e| corrupt("role", e))?,
        granted_at,
    })
}

fn decode_enrollment(row: &PgRow) -> Result<Enrollment, StoreError> {
    let identity_id: Uuid = row.try_get("identity_id").map_err(decode_error)?;
    let course_id: String = row.try_get("course_id").map_err(decode_error)?;
    let progress: i16 = row.try_get("progress_percentage").map_err(decode_error)?;

    Ok(Enrollment {
        identity_id: IdentityId::from_uuid(identity_id),
        course_id: CourseId::new(course_id).map_err(|e| corrupt("course_id", e))?,
        enrolled_at: row.try_get("enrolled_at").map_err(decode_error)?,
        progress: Percent::new(progress as i64).map_err(|e| corrupt("progress", e))?,
        last_accessed_at: row.try_get("last_accessed_at").map_err(decode_error)?,
        completed_at: row.try_get("completed_at").map_err(decode_error)?,
    })
}

fn decode_completion(row: &PgRow) -> Result<ExerciseCompletion, StoreError> {
    let identity_id: Uuid = row.try_get("identity_id").map_err(decode_error)?;
    let course_id: String = row.try_get("course_id").map_err(decode_error)?;
    let exercise_id: String = row.try_get("exercise_id").map_err(decode_error)?;

    Ok(ExerciseCompletion {
        identity_id: IdentityId::from_uuid(identity_id),
        course_id: CourseId::new(course_id).map_err(|e| corrupt("course_id", e))?,
        exercise_id: ExerciseId::new(exercise_id).map_err(|e| corrupt("exercise_id", e))?,
        completed_at: row.try_get("completed_at").map_err(decode_error)?,
        score: row.try_get("score").map_err(decode_error)?,
        time_spent_seconds: row.try_get("time_spent_seconds").map_err(decode_error)?,
    })
}

fn decode_bookmark(row: &PgRow) -> Result<ResourceBookmark, StoreError> {
    let identity_id: Uuid = row.try_get("identity_id").map_err(decode_error)?;
    let course_id: String = row.try_get("course_id").map_err(decode_error)?;
    let resource_id: String = row.try_get("resource_id").map_err(decode_error)?;

    Ok(ResourceBookmark {
        identity_id: IdentityId::from_uuid(identity_id),
        course_id: CourseId::new(course_id).map_err(|e| corrupt("course_id", e))?,
        resource_id: ResourceId::new(resource_id).map_err(|e| corrupt("resource_id", e))?,
        notes: row.try_get("notes").map_err(decode_error)?,
        created_at: row.try_get("created_at").map_err(decode_error)?,
    })
}
