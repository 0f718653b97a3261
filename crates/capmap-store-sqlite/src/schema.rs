//! SQL schema for the capability map store.
//!
//! Executed once at connection startup. Every statement is idempotent, so
//! reopening an existing file is safe.

pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- ── Facts ──────────────────────────────────────────────────────────────────

-- parent_id is not a foreign key: events may reference a parent that has not
-- been recorded yet.
CREATE TABLE IF NOT EXISTS capabilities (
    capability_id TEXT PRIMARY KEY,
    parent_id     TEXT,
    level         TEXT NOT NULL,   -- 'L1' .. 'L4'
    name          TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS business_domains (
    business_domain_id TEXT PRIMARY KEY,
    name               TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS domain_assignments (
    business_domain_id TEXT NOT NULL,
    capability_id      TEXT NOT NULL,
    PRIMARY KEY (business_domain_id, capability_id)
);

CREATE TABLE IF NOT EXISTS strategy_pillars (
    pillar_id TEXT PRIMARY KEY,
    name      TEXT NOT NULL,
    active    INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS importance_ratings (
    capability_id      TEXT NOT NULL,
    pillar_id          TEXT NOT NULL,
    business_domain_id TEXT NOT NULL,
    importance         INTEGER NOT NULL CHECK (importance BETWEEN 1 AND 5),
    rationale          TEXT,
    pillar_name        TEXT,
    PRIMARY KEY (capability_id, pillar_id, business_domain_id)
);

-- ── Effective views ────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS effective_business_domains (
    capability_id        TEXT PRIMARY KEY,
    l1_capability_id     TEXT NOT NULL,
    business_domain_id   TEXT,
    business_domain_name TEXT
);

CREATE TABLE IF NOT EXISTS effective_importance (
    capability_id          TEXT NOT NULL,
    pillar_id              TEXT NOT NULL,
    business_domain_id     TEXT NOT NULL,
    importance             INTEGER NOT NULL CHECK (importance BETWEEN 1 AND 5),
    importance_label       TEXT NOT NULL,
    source_capability_id   TEXT NOT NULL,
    source_capability_name TEXT NOT NULL,
    is_inherited           INTEGER NOT NULL,
    rationale              TEXT,
    computed_at            TEXT NOT NULL,   -- ISO 8601 UTC
    PRIMARY KEY (capability_id, pillar_id, business_domain_id)
);

CREATE TABLE IF NOT EXISTS capability_realizations (
    realization_id         TEXT PRIMARY KEY,
    capability_id          TEXT NOT NULL,
    component_id           TEXT NOT NULL,
    component_name         TEXT NOT NULL,
    realization_level      TEXT NOT NULL,   -- 'Full' | 'Partial' | 'Planned'
    notes                  TEXT,
    origin                 TEXT NOT NULL,   -- 'Direct' | 'Inherited'
    source_realization_id  TEXT,
    source_capability_id   TEXT,
    source_capability_name TEXT,
    linked_at              TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS capabilities_parent_idx      ON capabilities(parent_id);
CREATE INDEX IF NOT EXISTS effective_domains_l1_idx     ON effective_business_domains(l1_capability_id);
CREATE INDEX IF NOT EXISTS effective_domains_domain_idx ON effective_business_domains(business_domain_id);
CREATE INDEX IF NOT EXISTS effective_importance_src_idx ON effective_importance(source_capability_id);
CREATE INDEX IF NOT EXISTS realizations_capability_idx  ON capability_realizations(capability_id);
CREATE INDEX IF NOT EXISTS realizations_source_idx      ON capability_realizations(source_realization_id);
CREATE INDEX IF NOT EXISTS realizations_component_idx   ON capability_realizations(component_id);

PRAGMA user_version = 1;
";
