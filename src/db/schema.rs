//! Database schema and migrations for Stowage.
//!
//! Migrations are applied in order when the database is opened; the
//! `schema_version` table records how many have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: items table holding both files and folders
    r#"
CREATE TABLE items (
    id            TEXT PRIMARY KEY NOT NULL,          -- UUID v4
    name          TEXT NOT NULL CHECK (length(name) > 0),
    kind          TEXT NOT NULL CHECK (kind IN ('file', 'folder')),
    parent_id     TEXT REFERENCES items(id),          -- NULL for root items
    url           TEXT,                               -- file only
    size          INTEGER,                            -- file only, bytes
    mime_type     TEXT,                               -- file only
    content_hash  TEXT,                               -- file only, hex digest
    created_at    TEXT NOT NULL,
    CHECK (
        (kind = 'folder' AND url IS NULL AND size IS NULL
            AND mime_type IS NULL AND content_hash IS NULL)
        OR
        (kind = 'file' AND url IS NOT NULL AND size IS NOT NULL
            AND size >= 0 AND content_hash IS NOT NULL)
    ),
    CHECK (parent_id IS NULL OR parent_id <> id)
);

CREATE INDEX idx_items_parent_id ON items(parent_id);
CREATE INDEX idx_items_kind ON items(kind);
"#,
    // v2: dedup lookup key
    r#"
CREATE INDEX idx_items_dedup ON items(name, parent_id, kind, content_hash);
"#,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_not_empty() {
        assert!(!MIGRATIONS.is_empty());
    }

    #[test]
    fn test_first_migration_contains_items_table() {
        let first = MIGRATIONS[0];
        assert!(first.contains("CREATE TABLE items"));
        assert!(first.contains("parent_id"));
        assert!(first.contains("content_hash"));
        assert!(first.contains("created_at"));
    }

    #[test]
    fn test_migrations_are_valid_sql() {
        for migration in MIGRATIONS {
            assert!(!migration.trim().is_empty());
            assert!(
                migration.contains("CREATE TABLE")
                    || migration.contains("ALTER TABLE")
                    || migration.contains("CREATE INDEX")
            );
        }
    }
}
