//! PostgreSQL schema definitions
//!
//! Initial schema with all tables. Fresh databases get this in one step;
//! existing ones are brought forward by the versioned migrations.

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// Complete schema SQL for PostgreSQL
pub const SCHEMA: &str = r#"
-- =============================================================================
-- Infrastructure: Schema version tracking
-- =============================================================================
CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    version INTEGER NOT NULL,
    applied_at BIGINT NOT NULL,
    description TEXT
);

CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at BIGINT NOT NULL,
    checksum TEXT NOT NULL,
    execution_time_ms INTEGER,
    success BOOLEAN NOT NULL DEFAULT TRUE
);

-- =============================================================================
-- 1. Users
-- =============================================================================
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT UNIQUE CHECK(email IS NULL OR length(email) >= 3),
    display_name TEXT CHECK(display_name IS NULL OR length(display_name) <= 100),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- =============================================================================
-- 2. Workspaces and membership
-- =============================================================================
CREATE TABLE IF NOT EXISTS workspaces (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL CHECK(length(name) >= 1 AND length(name) <= 100),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS workspace_members (
    workspace_id TEXT NOT NULL REFERENCES workspaces(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    role TEXT NOT NULL DEFAULT 'member' CHECK(role IN ('owner', 'admin', 'member', 'viewer')),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (workspace_id, user_id)
);

CREATE INDEX IF NOT EXISTS idx_workspace_members_user ON workspace_members(user_id);

-- =============================================================================
-- 3. Task classification
-- =============================================================================
CREATE TABLE IF NOT EXISTS categories (
    id BIGSERIAL PRIMARY KEY,
    workspace_id TEXT NOT NULL REFERENCES workspaces(id) ON DELETE CASCADE,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tags (
    id BIGSERIAL PRIMARY KEY,
    workspace_id TEXT NOT NULL REFERENCES workspaces(id) ON DELETE CASCADE,
    name TEXT NOT NULL
);

-- =============================================================================
-- 4. Tasks
-- =============================================================================
CREATE TABLE IF NOT EXISTS tasks (
    id BIGSERIAL PRIMARY KEY,
    workspace_id TEXT NOT NULL REFERENCES workspaces(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL DEFAULT 'todo',
    priority TEXT,
    view TEXT,
    category_id BIGINT REFERENCES categories(id) ON DELETE SET NULL,
    tag_id BIGINT REFERENCES tags(id) ON DELETE SET NULL,
    start_date DATE,
    due_date DATE,
    completed_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_tasks_workspace ON tasks(workspace_id, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_tasks_due_date ON tasks(workspace_id, due_date);

CREATE TABLE IF NOT EXISTS task_assignees (
    task_id BIGINT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    PRIMARY KEY (task_id, user_id)
);

CREATE INDEX IF NOT EXISTS idx_task_assignees_user ON task_assignees(user_id);

-- =============================================================================
-- 5. Saved filters
-- =============================================================================
CREATE TABLE IF NOT EXISTS filters (
    id BIGSERIAL PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    workspace_id TEXT NOT NULL REFERENCES workspaces(id) ON DELETE CASCADE,
    name TEXT NOT NULL CHECK(length(name) >= 1 AND length(name) <= 100),
    view_mode TEXT,
    operator TEXT NOT NULL DEFAULT 'AND' CHECK(operator IN ('AND', 'OR')),
    is_default BOOLEAN NOT NULL DEFAULT FALSE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_filters_owner ON filters(workspace_id, user_id);

CREATE TABLE IF NOT EXISTS filter_conditions (
    id BIGSERIAL PRIMARY KEY,
    filter_id BIGINT NOT NULL REFERENCES filters(id) ON DELETE CASCADE,
    position INTEGER NOT NULL DEFAULT 0,
    kind TEXT NOT NULL CHECK(kind IN ('list', 'date_diff', 'date_range')),
    field TEXT,
    date_from TEXT,
    date_to TEXT,
    operator TEXT NOT NULL,
    "values" JSONB NOT NULL DEFAULT '[]'::jsonb,
    unit TEXT
);

CREATE INDEX IF NOT EXISTS idx_filter_conditions_filter ON filter_conditions(filter_id, position);
"#;

/// Default data inserted after schema creation
pub const DEFAULT_DATA: &str = r#"
-- 1. Default user (used when authentication is disabled)
INSERT INTO users (id, display_name)
VALUES ('local', 'Local User')
ON CONFLICT (id) DO NOTHING;

-- 2. Default workspace
INSERT INTO workspaces (id, name)
VALUES ('default', 'Default Workspace')
ON CONFLICT (id) DO NOTHING;

-- 3. Default membership (user owns default workspace)
INSERT INTO workspace_members (workspace_id, user_id, role)
VALUES ('default', 'local', 'owner')
ON CONFLICT (workspace_id, user_id) DO NOTHING;
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_version() {
        assert_eq!(SCHEMA_VERSION, 2);
    }

    #[test]
    fn test_schema_contains_all_tables() {
        for table in [
            "schema_version",
            "schema_migrations",
            "users",
            "workspaces",
            "workspace_members",
            "categories",
            "tags",
            "tasks",
            "task_assignees",
            "filters",
            "filter_conditions",
        ] {
            assert!(
                SCHEMA.contains(&format!("CREATE TABLE IF NOT EXISTS {} (", table)),
                "Schema missing {} table",
                table
            );
        }
    }

    #[test]
    fn test_schema_contains_assignee_index() {
        assert!(SCHEMA.contains("idx_task_assignees_user"));
    }

    #[test]
    fn test_default_data() {
        assert!(
            DEFAULT_DATA.contains("INSERT INTO users"),
            "Default data missing user"
        );
        assert!(
            DEFAULT_DATA.contains("INSERT INTO workspaces"),
            "Default data missing workspace"
        );
        assert!(
            DEFAULT_DATA.contains("INSERT INTO workspace_members"),
            "Default data missing membership"
        );
    }
}
