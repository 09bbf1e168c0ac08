//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.
//! Several worker processes may open the same database file; WAL mode and a
//! busy timeout let their writes queue up instead of failing.

use crate::state::SiteState;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{PageDocument, SiteRecord};
use crate::CorpusError;
use chrono::Utc;
use rusqlite::limits::Limit;
use rusqlite::types::Type;
use rusqlite::{ffi, params, Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::time::Duration;

const SITE_COLUMNS: &str = "address, tenant_id, state, retry_count, claimed_at, updated_at";

const DOCUMENT_COLUMNS: &str =
    "document_id, site_key, tenant_id, source_url, scraped_at, content, content_hash";

/// How long a writer waits for another connection's lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(CorpusError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, CorpusError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, CorpusError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Caps the size of any single stored value or row
    ///
    /// Writes beyond the cap are refused by SQLite and reported as
    /// `StorageError::TooLarge`. SQLite clamps the cap to its compiled-in
    /// maximum; the limit actually in force is returned.
    pub fn set_max_value_bytes(&mut self, bytes: u32) -> StorageResult<u32> {
        let requested = i32::try_from(bytes).map_err(|_| {
            StorageError::Database(format!("Value size limit {} is out of range", bytes))
        })?;

        self.conn.set_limit(Limit::SQLITE_LIMIT_LENGTH, requested);
        let effective = self.conn.limit(Limit::SQLITE_LIMIT_LENGTH);

        u32::try_from(effective).map_err(|_| {
            StorageError::Database(format!("SQLite reported value size limit {}", effective))
        })
    }
}

fn site_from_row(row: &Row<'_>) -> rusqlite::Result<SiteRecord> {
    let raw_state: String = row.get(2)?;
    let state = SiteState::from_db_string(&raw_state).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            Type::Text,
            format!("unknown site state '{}'", raw_state).into(),
        )
    })?;

    Ok(SiteRecord {
        address: row.get(0)?,
        tenant_id: row.get(1)?,
        state,
        retry_count: row.get(3)?,
        claimed_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn document_from_row(row: &Row<'_>) -> rusqlite::Result<PageDocument> {
    Ok(PageDocument {
        document_id: row.get(0)?,
        site_key: row.get(1)?,
        tenant_id: row.get(2)?,
        source_url: row.get(3)?,
        scraped_at: row.get(4)?,
        content: row.get(5)?,
        content_hash: row.get(6)?,
    })
}

/// State a claimed site moves to after one more failed attempt
fn failed_attempt_target(retry_count: u32, retry_limit: u32) -> SiteState {
    if retry_count.saturating_add(1) >= retry_limit {
        SiteState::Errored
    } else {
        SiteState::Pending
    }
}

/// Maps a failed document write onto the store's distinguishable rejections
fn classify_write_error(err: rusqlite::Error, document_id: &str) -> StorageError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation
                && failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            StorageError::Duplicate(document_id.to_string())
        }
        rusqlite::Error::SqliteFailure(failure, _) if failure.code == ErrorCode::TooBig => {
            StorageError::TooLarge(document_id.to_string())
        }
        _ => StorageError::Sqlite(err),
    }
}

impl SqliteStorage {
    /// Explains why a guarded site update touched no rows
    fn rejected_transition(&self, address: &str, to: SiteState) -> StorageError {
        match self.get_site(address) {
            Ok(Some(site)) => StorageError::InvalidTransition {
                from: site.state,
                to,
            },
            Ok(None) => StorageError::SiteNotFound(address.to_string()),
            Err(e) => e,
        }
    }
}

impl Storage for SqliteStorage {
    // ===== Site Registry =====

    fn insert_site(&mut self, address: &str, tenant_id: Option<&str>) -> StorageResult<bool> {
        let now = Utc::now().to_rfc3339();
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO sites (address, tenant_id, state, retry_count, updated_at)
             VALUES (?1, ?2, ?3, 0, ?4)",
            params![address, tenant_id, SiteState::Pending.to_db_string(), now],
        )?;
        Ok(inserted == 1)
    }

    fn get_site(&self, address: &str) -> StorageResult<Option<SiteRecord>> {
        let site = self
            .conn
            .query_row(
                &format!("SELECT {} FROM sites WHERE address = ?1", SITE_COLUMNS),
                params![address],
                site_from_row,
            )
            .optional()?;
        Ok(site)
    }

    fn claim_next_site(&mut self) -> StorageResult<Option<SiteRecord>> {
        // IMMEDIATE takes the write lock up front, so no other connection can
        // claim between the select and the update.
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let candidate: Option<String> = tx
            .query_row(
                "SELECT address FROM sites WHERE state = ?1 ORDER BY id ASC LIMIT 1",
                params![SiteState::Pending.to_db_string()],
                |row| row.get(0),
            )
            .optional()?;

        let Some(address) = candidate else {
            tx.commit()?;
            return Ok(None);
        };

        let now = Utc::now().to_rfc3339();
        let changed = tx.execute(
            "UPDATE sites SET state = ?1, claimed_at = ?2, updated_at = ?2
             WHERE address = ?3 AND state = ?4",
            params![
                SiteState::Claimed.to_db_string(),
                now,
                address,
                SiteState::Pending.to_db_string()
            ],
        )?;

        if changed != 1 {
            return Err(StorageError::Database(format!(
                "Claim of {} changed {} rows",
                address, changed
            )));
        }

        let site = tx.query_row(
            &format!("SELECT {} FROM sites WHERE address = ?1", SITE_COLUMNS),
            params![address],
            site_from_row,
        )?;

        tx.commit()?;
        Ok(Some(site))
    }

    fn transition_site(
        &mut self,
        address: &str,
        from: SiteState,
        to: SiteState,
    ) -> StorageResult<()> {
        if !from.can_transition_to(to) {
            return Err(StorageError::InvalidTransition { from, to });
        }

        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE sites SET state = ?1, updated_at = ?2,
                claimed_at = CASE WHEN ?1 = 'claimed' THEN ?2 ELSE NULL END
             WHERE address = ?3 AND state = ?4",
            params![to.to_db_string(), now, address, from.to_db_string()],
        )?;

        if changed == 0 {
            return Err(self.rejected_transition(address, to));
        }

        Ok(())
    }

    fn record_failed_attempt(
        &mut self,
        address: &str,
        retry_limit: u32,
    ) -> StorageResult<SiteRecord> {
        let now = Utc::now().to_rfc3339();

        // Right-hand sides see the pre-update retry_count
        let changed = self.conn.execute(
            "UPDATE sites SET
                retry_count = retry_count + 1,
                state = CASE WHEN retry_count + 1 >= ?1 THEN ?2 ELSE ?3 END,
                claimed_at = NULL,
                updated_at = ?4
             WHERE address = ?5 AND state = ?6",
            params![
                retry_limit,
                SiteState::Errored.to_db_string(),
                SiteState::Pending.to_db_string(),
                now,
                address,
                SiteState::Claimed.to_db_string()
            ],
        )?;

        if changed == 0 {
            return Err(match self.get_site(address)? {
                Some(site) => StorageError::InvalidTransition {
                    from: site.state,
                    to: failed_attempt_target(site.retry_count, retry_limit),
                },
                None => StorageError::SiteNotFound(address.to_string()),
            });
        }

        self.get_site(address)?
            .ok_or_else(|| StorageError::SiteNotFound(address.to_string()))
    }

    fn reset_errored_sites(&mut self) -> StorageResult<u64> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE sites SET state = ?1, retry_count = 0, claimed_at = NULL, updated_at = ?2
             WHERE state = ?3",
            params![
                SiteState::Pending.to_db_string(),
                now,
                SiteState::Errored.to_db_string()
            ],
        )?;
        Ok(changed as u64)
    }

    fn count_sites_by_state(&self, state: SiteState) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sites WHERE state = ?1",
            params![state.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Page Documents =====

    fn document_exists(&self, site_key: &str, content_hash: &str) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM page_documents WHERE site_key = ?1 AND content_hash = ?2",
                params![site_key, content_hash],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn site_has_documents(&self, site_key: &str) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM page_documents WHERE site_key = ?1 LIMIT 1",
                params![site_key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn insert_document(&mut self, document: &PageDocument) -> StorageResult<()> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO page_documents ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    DOCUMENT_COLUMNS
                ),
                params![
                    document.document_id,
                    document.site_key,
                    document.tenant_id,
                    document.source_url,
                    document.scraped_at,
                    document.content,
                    document.content_hash
                ],
            )
            .map_err(|e| classify_write_error(e, &document.document_id))?;
        Ok(())
    }

    fn update_document(&mut self, document: &PageDocument) -> StorageResult<bool> {
        let changed = self
            .conn
            .execute(
                "UPDATE page_documents
                 SET tenant_id = ?1, source_url = ?2, scraped_at = ?3, content = ?4
                 WHERE site_key = ?5 AND content_hash = ?6",
                params![
                    document.tenant_id,
                    document.source_url,
                    document.scraped_at,
                    document.content,
                    document.site_key,
                    document.content_hash
                ],
            )
            .map_err(|e| classify_write_error(e, &document.document_id))?;
        Ok(changed > 0)
    }

    fn get_documents_for_site(&self, site_key: &str) -> StorageResult<Vec<PageDocument>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM page_documents WHERE site_key = ?1 ORDER BY id ASC",
            DOCUMENT_COLUMNS
        ))?;

        let documents = stmt
            .query_map(params![site_key], document_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(documents)
    }

    // ===== Statistics =====

    fn count_documents(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM page_documents", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_document_sites(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT site_key) FROM page_documents",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(site_key: &str, content: &str, url: &str) -> PageDocument {
        PageDocument {
            document_id: format!("{}|{}", content, url),
            site_key: site_key.to_string(),
            tenant_id: "100654".to_string(),
            source_url: url.to_string(),
            scraped_at: Utc::now().to_rfc3339(),
            content: content.to_string(),
            content_hash: format!("hash:{}", content),
        }
    }

    #[test]
    fn test_insert_site_is_idempotent() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();

        assert!(storage.insert_site("example.edu", Some("100654")).unwrap());
        assert!(!storage.insert_site("example.edu", Some("other")).unwrap());

        let site = storage.get_site("example.edu").unwrap().unwrap();
        assert_eq!(site.tenant_id.as_deref(), Some("100654"));
        assert_eq!(site.state, SiteState::Pending);
        assert_eq!(site.retry_count, 0);
    }

    #[test]
    fn test_claim_in_insertion_order() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.insert_site("first.edu", Some("1")).unwrap();
        storage.insert_site("second.edu", Some("2")).unwrap();

        let first = storage.claim_next_site().unwrap().unwrap();
        assert_eq!(first.address, "first.edu");
        assert_eq!(first.state, SiteState::Claimed);
        assert!(first.claimed_at.is_some());

        let second = storage.claim_next_site().unwrap().unwrap();
        assert_eq!(second.address, "second.edu");

        assert!(storage.claim_next_site().unwrap().is_none());
    }

    #[test]
    fn test_claim_skips_non_pending() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.insert_site("done.edu", Some("1")).unwrap();
        storage.insert_site("broken.edu", Some("2")).unwrap();
        storage.insert_site("open.edu", Some("3")).unwrap();

        storage.claim_next_site().unwrap();
        storage
            .transition_site("done.edu", SiteState::Claimed, SiteState::Completed)
            .unwrap();
        storage.claim_next_site().unwrap();
        storage.record_failed_attempt("broken.edu", 1).unwrap();

        let claimed = storage.claim_next_site().unwrap().unwrap();
        assert_eq!(claimed.address, "open.edu");
        assert!(storage.claim_next_site().unwrap().is_none());
    }

    #[test]
    fn test_transition_requires_source_state() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.insert_site("example.edu", Some("1")).unwrap();

        // Not claimed yet
        let err = storage
            .transition_site("example.edu", SiteState::Claimed, SiteState::Completed)
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::InvalidTransition {
                from: SiteState::Pending,
                to: SiteState::Completed
            }
        ));

        // Illegal regardless of stored state
        let err = storage
            .transition_site("example.edu", SiteState::Completed, SiteState::Pending)
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidTransition { .. }));

        let err = storage
            .transition_site("missing.edu", SiteState::Claimed, SiteState::Pending)
            .unwrap_err();
        assert!(matches!(err, StorageError::SiteNotFound(_)));
    }

    #[test]
    fn test_release_clears_claim() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.insert_site("example.edu", Some("1")).unwrap();
        storage.claim_next_site().unwrap();

        storage
            .transition_site("example.edu", SiteState::Claimed, SiteState::Pending)
            .unwrap();

        let site = storage.get_site("example.edu").unwrap().unwrap();
        assert_eq!(site.state, SiteState::Pending);
        assert_eq!(site.claimed_at, None);
        assert_eq!(site.retry_count, 0);
    }

    #[test]
    fn test_failed_attempts_until_errored() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.insert_site("flaky.edu", Some("1")).unwrap();

        for attempt in 1..=3 {
            storage.claim_next_site().unwrap().unwrap();
            let site = storage.record_failed_attempt("flaky.edu", 3).unwrap();
            assert_eq!(site.retry_count, attempt);
            if attempt < 3 {
                assert_eq!(site.state, SiteState::Pending);
            } else {
                assert_eq!(site.state, SiteState::Errored);
            }
        }

        assert!(storage.claim_next_site().unwrap().is_none());

        // Errored sites cannot fail again
        let err = storage.record_failed_attempt("flaky.edu", 3).unwrap_err();
        assert!(matches!(
            err,
            StorageError::InvalidTransition {
                from: SiteState::Errored,
                ..
            }
        ));
    }

    #[test]
    fn test_failed_attempt_rejection_names_target() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.insert_site("idle.edu", Some("1")).unwrap();

        // Not claimed; the rejected transition reports where it would have gone
        let err = storage.record_failed_attempt("idle.edu", 1).unwrap_err();
        assert!(matches!(
            err,
            StorageError::InvalidTransition {
                from: SiteState::Pending,
                to: SiteState::Errored
            }
        ));

        let err = storage.record_failed_attempt("idle.edu", 3).unwrap_err();
        assert!(matches!(
            err,
            StorageError::InvalidTransition {
                from: SiteState::Pending,
                to: SiteState::Pending
            }
        ));

        let err = storage.record_failed_attempt("missing.edu", 3).unwrap_err();
        assert!(matches!(err, StorageError::SiteNotFound(_)));
    }

    #[test]
    fn test_unknown_state_is_an_error() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.insert_site("odd.edu", Some("1")).unwrap();
        storage
            .conn
            .execute("UPDATE sites SET state = 'archived'", [])
            .unwrap();

        let err = storage.get_site("odd.edu").unwrap_err();
        assert!(matches!(
            err,
            StorageError::Sqlite(rusqlite::Error::FromSqlConversionFailure(2, Type::Text, _))
        ));
        assert_eq!(storage.count_sites_by_state(SiteState::Errored).unwrap(), 0);
    }

    #[test]
    fn test_reset_errored_sites() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.insert_site("flaky.edu", Some("1")).unwrap();
        storage.claim_next_site().unwrap();
        storage.record_failed_attempt("flaky.edu", 1).unwrap();

        assert_eq!(storage.reset_errored_sites().unwrap(), 1);

        let site = storage.get_site("flaky.edu").unwrap().unwrap();
        assert_eq!(site.state, SiteState::Pending);
        assert_eq!(site.retry_count, 0);
        assert_eq!(storage.reset_errored_sites().unwrap(), 0);
    }

    #[test]
    fn test_document_existence_checks() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let doc = document("https://example.edu", "Hello World", "https://example.edu/a");

        assert!(!storage.site_has_documents("https://example.edu").unwrap());
        storage.insert_document(&doc).unwrap();

        assert!(storage.site_has_documents("https://example.edu").unwrap());
        assert!(storage
            .document_exists("https://example.edu", &doc.content_hash)
            .unwrap());
        assert!(!storage
            .document_exists("https://other.edu", &doc.content_hash)
            .unwrap());
    }

    #[test]
    fn test_duplicate_content_rejected() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let first = document("https://example.edu", "Hello", "https://example.edu/a");
        let mut second = document("https://example.edu", "Hello", "https://example.edu/b");
        second.document_id = "different-id".to_string();

        storage.insert_document(&first).unwrap();
        let err = storage.insert_document(&second).unwrap_err();
        assert!(matches!(err, StorageError::Duplicate(_)));

        assert_eq!(storage.count_documents().unwrap(), 1);
    }

    #[test]
    fn test_same_document_id_on_two_sites() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let plain = document("http://a.test", "Hello", "https://a.test/");
        let secure = document("https://a.test", "Hello", "https://a.test/");
        assert_eq!(plain.document_id, secure.document_id);

        storage.insert_document(&plain).unwrap();
        storage.insert_document(&secure).unwrap();

        assert!(storage.site_has_documents("http://a.test").unwrap());
        assert!(storage.site_has_documents("https://a.test").unwrap());
        assert_eq!(storage.count_documents().unwrap(), 2);
    }

    #[test]
    fn test_oversized_row_rejected() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert_eq!(storage.set_max_value_bytes(4096).unwrap(), 4096);

        let small = document("https://example.edu", "short", "https://example.edu/a");
        storage.insert_document(&small).unwrap();

        let big = document(
            "https://example.edu",
            &"x".repeat(10_000),
            "https://example.edu/b",
        );
        let err = storage.insert_document(&big).unwrap_err();
        assert!(matches!(err, StorageError::TooLarge(_)));
        assert_eq!(storage.count_documents().unwrap(), 1);
    }

    #[test]
    fn test_update_document() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let mut doc = document("https://example.edu", "Hello", "https://example.edu/a");
        assert!(!storage.update_document(&doc).unwrap());

        storage.insert_document(&doc).unwrap();
        doc.source_url = "https://example.edu/moved".to_string();
        assert!(storage.update_document(&doc).unwrap());

        let stored = storage.get_documents_for_site("https://example.edu").unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].source_url, "https://example.edu/moved");
    }

    #[test]
    fn test_statistics() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.insert_site("a.edu", Some("1")).unwrap();
        storage.insert_site("b.edu", Some("2")).unwrap();
        storage.claim_next_site().unwrap();

        assert_eq!(storage.count_sites_by_state(SiteState::Pending).unwrap(), 1);
        assert_eq!(storage.count_sites_by_state(SiteState::Claimed).unwrap(), 1);

        storage
            .insert_document(&document("https://a.edu", "one", "https://a.edu/1"))
            .unwrap();
        storage
            .insert_document(&document("https://a.edu", "two", "https://a.edu/2"))
            .unwrap();
        storage
            .insert_document(&document("https://b.edu", "one", "https://b.edu/1"))
            .unwrap();

        assert_eq!(storage.count_documents().unwrap(), 3);
        assert_eq!(storage.count_document_sites().unwrap(), 2);
    }
}
