//! SQLite schema definition.

/// Complete database schema for PulseGuard.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Application State
-- ============================================================================

-- Keyed records of structured text. The patient list lives under a single
-- key and is overwritten wholesale.
CREATE TABLE IF NOT EXISTS app_state (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;
