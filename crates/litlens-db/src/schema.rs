//! Table names and DDL.
//!
//! Ids are UUIDs stored as 16-byte BLOBs, timestamps as RFC 3339 TEXT and list
//! or nested fields as JSON TEXT. Every project-owned table cascades on
//! project deletion.

pub const TABLE_ARTICLES: &str = "articles";
pub const TABLE_PROJECTS: &str = "projects";
pub const TABLE_COLLABORATORS: &str = "project_collaborators";
pub const TABLE_QUESTIONS: &str = "research_questions";
pub const TABLE_HYPOTHESES: &str = "hypotheses";
pub const TABLE_TRIAGES: &str = "paper_triages";
pub const TABLE_PROTOCOLS: &str = "protocols";
pub const TABLE_COLLECTIONS: &str = "collections";
pub const TABLE_COLLECTION_ARTICLES: &str = "collection_articles";
pub const TABLE_ANNOTATIONS: &str = "annotations";
pub const TABLE_ALERTS: &str = "project_alerts";

pub const STATEMENTS: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS articles (
        pmid             TEXT PRIMARY KEY,
        title            TEXT NOT NULL,
        abstract_text    TEXT,
        authors          TEXT NOT NULL DEFAULT '[]',
        journal          TEXT,
        publication_year INTEGER,
        doi              TEXT,
        pmcid            TEXT,
        mesh_terms       TEXT NOT NULL DEFAULT '[]',
        keywords         TEXT NOT NULL DEFAULT '[]',
        created_at       TEXT NOT NULL,
        updated_at       TEXT NOT NULL
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_articles_doi ON articles(doi)"#,
    r#"CREATE TABLE IF NOT EXISTS projects (
        id          BLOB PRIMARY KEY,
        owner_id    TEXT NOT NULL,
        name        TEXT NOT NULL,
        description TEXT,
        created_at  TEXT NOT NULL,
        updated_at  TEXT NOT NULL
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_projects_owner ON projects(owner_id)"#,
    r#"CREATE TABLE IF NOT EXISTS project_collaborators (
        project_id BLOB NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        user_id    TEXT NOT NULL,
        role       TEXT NOT NULL,
        added_at   TEXT NOT NULL,
        PRIMARY KEY (project_id, user_id)
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_collaborators_user ON project_collaborators(user_id)"#,
    r#"CREATE TABLE IF NOT EXISTS research_questions (
        id         BLOB PRIMARY KEY,
        project_id BLOB NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        text       TEXT NOT NULL,
        priority   INTEGER NOT NULL,
        status     TEXT NOT NULL,
        created_at TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS hypotheses (
        id          BLOB PRIMARY KEY,
        project_id  BLOB NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        question_id BLOB REFERENCES research_questions(id) ON DELETE SET NULL,
        statement   TEXT NOT NULL,
        status      TEXT NOT NULL,
        confidence  REAL,
        created_at  TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS paper_triages (
        id               BLOB PRIMARY KEY,
        project_id       BLOB NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        pmid             TEXT NOT NULL REFERENCES articles(pmid),
        status           TEXT NOT NULL,
        relevance_score  REAL NOT NULL,
        confidence       REAL NOT NULL,
        rationale        TEXT NOT NULL,
        key_findings     TEXT NOT NULL DEFAULT '[]',
        question_scores  TEXT NOT NULL DEFAULT '[]',
        evidence         TEXT NOT NULL DEFAULT '[]',
        hypothesis_links TEXT NOT NULL DEFAULT '[]',
        fallbacks        TEXT NOT NULL DEFAULT '[]',
        created_at       TEXT NOT NULL,
        UNIQUE (project_id, pmid)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS protocols (
        id                 BLOB PRIMARY KEY,
        project_id         BLOB NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        pmid               TEXT NOT NULL REFERENCES articles(pmid),
        name               TEXT NOT NULL,
        protocol_type      TEXT,
        materials          TEXT NOT NULL DEFAULT '[]',
        equipment          TEXT NOT NULL DEFAULT '[]',
        steps              TEXT NOT NULL DEFAULT '[]',
        key_parameters     TEXT NOT NULL DEFAULT '[]',
        difficulty         TEXT,
        estimated_duration TEXT,
        confidence         REAL NOT NULL,
        fallbacks          TEXT NOT NULL DEFAULT '[]',
        created_at         TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS collections (
        id          BLOB PRIMARY KEY,
        project_id  BLOB NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        name        TEXT NOT NULL,
        description TEXT,
        created_at  TEXT NOT NULL,
        UNIQUE (project_id, name)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS collection_articles (
        collection_id BLOB NOT NULL REFERENCES collections(id) ON DELETE CASCADE,
        pmid          TEXT NOT NULL REFERENCES articles(pmid),
        added_at      TEXT NOT NULL,
        PRIMARY KEY (collection_id, pmid)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS annotations (
        id         BLOB PRIMARY KEY,
        project_id BLOB NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        pmid       TEXT,
        author_id  TEXT NOT NULL,
        content    TEXT NOT NULL,
        note_type  TEXT NOT NULL,
        created_at TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS project_alerts (
        id         BLOB PRIMARY KEY,
        project_id BLOB NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        kind       TEXT NOT NULL,
        title      TEXT NOT NULL,
        body       TEXT NOT NULL,
        pmid       TEXT,
        dismissed  INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_alerts_project ON project_alerts(project_id, dismissed)"#,
];
