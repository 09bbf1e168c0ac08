//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Corpus-Sieve database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Target sites and their queue state
CREATE TABLE IF NOT EXISTS sites (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    address TEXT NOT NULL UNIQUE,
    tenant_id TEXT,
    state TEXT NOT NULL,
    retry_count INTEGER NOT NULL DEFAULT 0,
    claimed_at TEXT,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sites_state ON sites(state);

-- Deduplicated page content, one row per distinct content per site
CREATE TABLE IF NOT EXISTS page_documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    document_id TEXT NOT NULL,
    site_key TEXT NOT NULL,
    tenant_id TEXT NOT NULL,
    source_url TEXT NOT NULL,
    scraped_at TEXT NOT NULL,
    content TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    UNIQUE(site_key, content_hash)
);

CREATE INDEX IF NOT EXISTS idx_page_documents_site ON page_documents(site_key);
CREATE INDEX IF NOT EXISTS idx_page_documents_document_id ON page_documents(document_id);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
