//! Persisted schema.
//!
//! Column names, types and constraints here are the contract other systems
//! read. The statements are idempotent so `migrate` can run on every deploy.

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS identities (
    id UUID PRIMARY KEY,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- Identities deleted by the authority. Registration refuses these ids, so a
-- late redelivery cannot resurrect an account.
CREATE TABLE IF NOT EXISTS identity_tombstones (
    id UUID PRIMARY KEY,
    deleted_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS profiles (
    identity_id UUID PRIMARY KEY REFERENCES identities (id) ON DELETE CASCADE,
    display_name VARCHAR(100) NOT NULL CHECK (btrim(display_name) <> ''),
    student_id VARCHAR(64),
    avatar_url VARCHAR(2048),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS user_roles (
    identity_id UUID NOT NULL REFERENCES identities (id) ON DELETE CASCADE,
    role TEXT NOT NULL CHECK (role IN ('admin', 'student')),
    granted_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (identity_id, role)
);

CREATE TABLE IF NOT EXISTS enrollments (
    identity_id UUID NOT NULL REFERENCES identities (id) ON DELETE CASCADE,
    course_id VARCHAR(128) NOT NULL,
    enrolled_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    progress_percentage SMALLINT NOT NULL DEFAULT 0
        CHECK (progress_percentage BETWEEN 0 AND 100),
    last_accessed_at TIMESTAMPTZ,
    completed_at TIMESTAMPTZ,
    PRIMARY KEY (identity_id, course_id)
);

CREATE TABLE IF NOT EXISTS exercise_completions (
    identity_id UUID NOT NULL REFERENCES identities (id) ON DELETE CASCADE,
    course_id VARCHAR(128) NOT NULL,
    exercise_id VARCHAR(128) NOT NULL,
    completed_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    score INTEGER CHECK (score >= 0),
    time_spent_seconds INTEGER CHECK (time_spent_seconds >= 0),
    PRIMARY KEY (identity_id, course_id, exercise_id)
);

CREATE TABLE IF NOT EXISTS resource_bookmarks (
    identity_id UUID NOT NULL REFERENCES identities (id) ON DELETE CASCADE,
    course_id VARCHAR(128) NOT NULL,
    resource_id VARCHAR(128) NOT NULL,
    notes TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (identity_id, course_id, resource_id)
);

CREATE OR REPLACE FUNCTION learnhub_touch_profile() RETURNS trigger AS $$
BEGIN
    NEW.created_at := OLD.created_at;
    NEW.updated_at := GREATEST(NOW(), OLD.updated_at);
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

DROP TRIGGER IF EXISTS profiles_touch ON profiles;
CREATE TRIGGER profiles_touch
    BEFORE UPDATE ON profiles
    FOR EACH ROW EXECUTE FUNCTION learnhub_touch_profile();

CREATE OR REPLACE FUNCTION learnhub_reject_update() RETURNS trigger AS $$
BEGIN
    RAISE EXCEPTION '% rows are immutable', TG_TABLE_NAME;
END;
$$ LANGUAGE plpgsql;

DROP TRIGGER IF EXISTS exercise_completions_immutable ON exercise_completions;
CREATE TRIGGER exercise_completions_immutable
    BEFORE UPDATE ON exercise_completions
    FOR EACH ROW EXECUTE FUNCTION learnhub_reject_update();
"#;

#[cfg(test)]
mod tests {
    use super::SCHEMA;

    #[test]
    fn every_owned_table_cascades_from_identities() {
        let cascades = SCHEMA.matches("REFERENCES identities (id) ON DELETE CASCADE").count();
        assert_eq!(cascades, 5);
    }

    #[test]
    fn tombstones_outlive_the_identity_row() {
        let start = SCHEMA.find("CREATE TABLE IF NOT EXISTS identity_tombstones").unwrap();
        let table = &SCHEMA[start..start + SCHEMA[start..].find(");").unwrap()];
        assert!(!table.contains("REFERENCES"));
    }

    #[test]
    fn progress_is_range_checked() {
        assert!(SCHEMA.contains("CHECK (progress_percentage BETWEEN 0 AND 100)"));
    }
}
