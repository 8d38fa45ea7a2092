use crate::error::IngestError;
use crate::models::{RankWeights, Record};
use crate::traits::FullTextCollection;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Transaction};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const DEFAULT_COLLECTION: &str = "documents";

pub const DEFAULT_TOKENIZER: &str = "unicode61";

/// Connection pragmas applied on every open: WAL journal, relaxed but
/// crash-safe sync, temp structures kept in memory.
#[derive(Debug, Clone)]
pub struct PragmaConfig {
    pub journal_mode: String,
    pub synchronous: String,
    pub temp_store: String,
    pub foreign_keys: bool,
}

impl Default for PragmaConfig {
    fn default() -> Self {
        Self {
            journal_mode: "WAL".to_string(),
            synchronous: "NORMAL".to_string(),
            temp_store: "MEMORY".to_string(),
            foreign_keys: true,
        }
    }
}

impl PragmaConfig {
    /// Returns the journal mode SQLite actually switched to.
    fn apply(&self, conn: &Connection) -> rusqlite::Result<String> {
        let mode: String = conn.pragma_update_and_check(
            None,
            "journal_mode",
            self.journal_mode.as_str(),
            |row| row.get(0),
        )?;
        conn.pragma_update(None, "synchronous", self.synchronous.as_str())?;
        conn.pragma_update(None, "temp_store", self.temp_store.as_str())?;
        conn.pragma_update(None, "foreign_keys", self.foreign_keys)?;

        if !mode.eq_ignore_ascii_case(&self.journal_mode) {
            warn!(
                requested = %self.journal_mode,
                effective = %mode,
                "journal mode not applied, durability guarantees are weaker"
            );
        }

        debug!(
            journal_mode = %mode,
            synchronous = %self.synchronous,
            temp_store = %self.temp_store,
            "pragmas applied"
        );
        Ok(mode)
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub collection: String,
    pub tokenizer: String,
    pub pragmas: PragmaConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            tokenizer: DEFAULT_TOKENIZER.to_string(),
            pragmas: PragmaConfig::default(),
        }
    }
}

impl StoreConfig {
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Collection and tokenizer are spliced into SQL text, so both are
    /// checked before any statement is built.
    pub fn validate(&self) -> Result<(), IngestError> {
        if !is_identifier(&self.collection) {
            return Err(IngestError::InvalidArgument(format!(
                "collection name must match [A-Za-z_][A-Za-z0-9_]*: {:?}",
                self.collection
            )));
        }

        if self.tokenizer.trim().is_empty()
            || self.tokenizer.contains(['\'', '"', ';'])
        {
            return Err(IngestError::InvalidArgument(format!(
                "invalid tokenizer specification: {:?}",
                self.tokenizer
            )));
        }

        Ok(())
    }
}

pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

/// SQLite-backed FTS5 collection. Owns the only connection of a run.
pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
    collection: String,
    journal_mode: Option<String>,
}

impl SqliteStore {
    /// Opens or creates the database, applies pragmas and creates the
    /// collection if it is missing. Safe to call against an existing store.
    pub fn open(path: &Path, config: &StoreConfig) -> Result<Self, IngestError> {
        config.validate()?;

        let unavailable = |source| IngestError::StoreUnavailable {
            path: path.to_path_buf(),
            source,
        };

        let conn = Connection::open(path).map_err(unavailable)?;
        let journal_mode = config.pragmas.apply(&conn).map_err(unavailable)?;
        conn.execute_batch(&create_collection_sql(&config.collection, &config.tokenizer))
            .map_err(unavailable)?;

        info!(
            path = %path.display(),
            collection = %config.collection,
            tokenizer = %config.tokenizer,
            "store ready"
        );

        Ok(Self {
            conn,
            path: path.to_path_buf(),
            collection: config.collection.clone(),
            journal_mode: Some(journal_mode),
        })
    }

    /// Opens an existing store for querying. Never creates the file or the
    /// collection and leaves the pragmas stored in the database untouched.
    pub fn open_existing(path: &Path, collection: &str) -> Result<Self, IngestError> {
        if !is_identifier(collection) {
            return Err(IngestError::InvalidArgument(format!(
                "collection name must match [A-Za-z_][A-Za-z0-9_]*: {collection:?}"
            )));
        }

        let unavailable = |source| IngestError::StoreUnavailable {
            path: path.to_path_buf(),
            source,
        };

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags).map_err(unavailable)?;

        let present: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
                [collection],
                |row| row.get(0),
            )
            .map_err(unavailable)?;
        if !present {
            return Err(IngestError::CollectionNotFound {
                path: path.to_path_buf(),
                collection: collection.to_string(),
            });
        }

        Ok(Self {
            conn,
            path: path.to_path_buf(),
            collection: collection.to_string(),
            journal_mode: None,
        })
    }

    /// Journal mode in effect, known only for stores opened with [`SqliteStore::open`].
    pub fn journal_mode(&self) -> Option<&str> {
        self.journal_mode.as_deref()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn count(&self) -> rusqlite::Result<u64> {
        self.conn.query_row(
            &format!("SELECT count(*) FROM {}", self.collection),
            [],
            |row| row.get(0),
        )
    }

    /// Rank expression currently stored in the collection's config table.
    pub fn rank_config(&self) -> rusqlite::Result<Option<String>> {
        self.conn
            .query_row(
                &format!("SELECT v FROM {}_config WHERE k = 'rank'", self.collection),
                [],
                |row| row.get(0),
            )
            .optional()
    }

    pub fn close(self) -> Result<(), IngestError> {
        let path = self.path;
        self.conn
            .close()
            .map_err(|(_, source)| IngestError::StoreUnavailable { path, source })
    }

    fn command(&self, command: &str) -> rusqlite::Result<()> {
        let sql = format!(
            "INSERT INTO {name}({name}) VALUES(?1)",
            name = self.collection
        );
        self.conn.execute(&sql, [command])?;
        Ok(())
    }
}

impl FullTextCollection for SqliteStore {
    fn insert_batch(&mut self, records: &[Record]) -> rusqlite::Result<()> {
        let sql = format!(
            "INSERT INTO {} (title, source_path, content, tag, deleted_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            self.collection
        );

        let tx = self.conn.transaction()?;
        match insert_all(&tx, &sql, records) {
            Ok(()) => tx.commit(),
            Err(error) => {
                if let Err(rollback_error) = tx.rollback() {
                    warn!(error = %rollback_error, "rollback after failed batch also failed");
                }
                Err(error)
            }
        }
    }

    fn set_rank(&mut self, weights: &RankWeights) -> rusqlite::Result<()> {
        let sql = format!(
            "INSERT INTO {name}({name}, rank) VALUES('rank', ?1)",
            name = self.collection
        );
        self.conn.execute(&sql, [weights.to_bm25()])?;
        Ok(())
    }

    fn rebuild(&mut self) -> rusqlite::Result<()> {
        self.command("rebuild")
    }

    fn optimize(&mut self) -> rusqlite::Result<()> {
        self.command("optimize")
    }
}

fn insert_all(tx: &Transaction<'_>, sql: &str, records: &[Record]) -> rusqlite::Result<()> {
    let mut statement = tx.prepare_cached(sql)?;
    for record in records {
        statement.execute(params![
            record.title,
            record.source_path,
            record.content,
            record.tag,
            record.deleted_at,
        ])?;
    }
    Ok(())
}

fn create_collection_sql(collection: &str, tokenizer: &str) -> String {
    format!(
        "CREATE VIRTUAL TABLE IF NOT EXISTS {collection} USING fts5(
            title,
            source_path,
            content,
            tag,
            deleted_at UNINDEXED,
            tokenize = '{tokenizer}'
        );"
    )
}

#[cfg(test)]
mod tests {
    use super::{is_identifier, PragmaConfig, SqliteStore, StoreConfig};
    use crate::error::IngestError;
    use crate::models::{RankWeights, Record};
    use crate::traits::FullTextCollection;
    use rusqlite::Connection;
    use tempfile::tempdir;

    fn record(title: &str, content: String) -> Record {
        Record {
            title: title.to_string(),
            source_path: format!("/data/{title}"),
            content,
            tag: "test".to_string(),
            deleted_at: None,
        }
    }

    #[test]
    fn opening_twice_keeps_a_single_collection() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let db = dir.path().join("store.db");
        let config = StoreConfig::default();

        let mut first = SqliteStore::open(&db, &config)?;
        first.insert_batch(&[record("a.txt", "alpha".to_string())])?;
        first.close()?;

        let second = SqliteStore::open(&db, &config)?;
        let tables: i64 = second.connection().query_row(
            "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [second.collection()],
            |row| row.get(0),
        )?;
        assert_eq!(tables, 1);
        assert_eq!(second.count()?, 1);
        Ok(())
    }

    #[test]
    fn open_applies_write_ahead_journal() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let store = SqliteStore::open(&dir.path().join("store.db"), &StoreConfig::default())?;

        let mode: String = store
            .connection()
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
        let temp_store: i64 = store
            .connection()
            .query_row("PRAGMA temp_store", [], |row| row.get(0))?;

        assert_eq!(mode.to_lowercase(), "wal");
        assert_eq!(temp_store, 2);
        Ok(())
    }

    #[test]
    fn inserted_rows_are_live_and_searchable() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let mut store = SqliteStore::open(&dir.path().join("store.db"), &StoreConfig::default())?;
        store.insert_batch(&[record("a.txt", "alpha".to_string())])?;

        let null_rows: i64 = store.connection().query_row(
            "SELECT count(*) FROM documents WHERE deleted_at IS NULL",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(null_rows, 1);

        let matched: i64 = store.connection().query_row(
            "SELECT count(*) FROM documents WHERE documents MATCH 'alpha'",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(matched, 1);
        Ok(())
    }

    #[test]
    fn open_reports_effective_journal_mode() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let store = SqliteStore::open(&dir.path().join("store.db"), &StoreConfig::default())?;
        assert_eq!(store.journal_mode().map(str::to_lowercase).as_deref(), Some("wal"));

        let memory = Connection::open_in_memory()?;
        let effective = PragmaConfig::default().apply(&memory)?;
        assert_eq!(effective.to_lowercase(), "memory");
        Ok(())
    }

    #[test]
    fn open_existing_never_creates_anything() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let db = dir.path().join("store.db");

        let missing_file = SqliteStore::open_existing(&db, "documents");
        assert!(matches!(
            missing_file,
            Err(IngestError::StoreUnavailable { .. })
        ));
        assert!(!db.exists());

        SqliteStore::open(&db, &StoreConfig::default())?.close()?;

        let typo = SqliteStore::open_existing(&db, "typo");
        assert!(matches!(typo, Err(IngestError::CollectionNotFound { .. })));

        let store = SqliteStore::open_existing(&db, "documents")?;
        let typo_tables: i64 = store.connection().query_row(
            "SELECT count(*) FROM sqlite_master WHERE name = 'typo'",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(typo_tables, 0);
        assert_eq!(store.count()?, 0);
        Ok(())
    }

    #[test]
    fn open_fails_when_location_is_a_directory() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let result = SqliteStore::open(dir.path(), &StoreConfig::default());
        assert!(matches!(result, Err(IngestError::StoreUnavailable { .. })));
        Ok(())
    }

    #[test]
    fn rejects_unsafe_collection_names() {
        assert!(is_identifier("documents"));
        assert!(is_identifier("_docs_2"));
        assert!(!is_identifier("2docs"));
        assert!(!is_identifier("docs; DROP TABLE x"));
        assert!(!is_identifier(""));

        let config = StoreConfig::default().with_collection("bad name");
        assert!(matches!(
            config.validate(),
            Err(IngestError::InvalidArgument(_))
        ));
    }

    #[test]
    fn rank_configuration_is_persisted() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let mut store = SqliteStore::open(&dir.path().join("store.db"), &StoreConfig::default())?;

        assert_eq!(store.rank_config()?, None);
        store.set_rank(&RankWeights::default())?;
        store.rebuild()?;
        store.optimize()?;

        assert_eq!(
            store.rank_config()?.as_deref(),
            Some("bm25(10.0, 5.0, 8.0, 2.0)")
        );
        Ok(())
    }

    #[test]
    fn tiny_and_huge_weights_are_accepted_by_fts5() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let mut store = SqliteStore::open(&dir.path().join("store.db"), &StoreConfig::default())?;

        let weights = RankWeights::new(10.0, 0.00001, 8.0, 1e20)?;
        store.set_rank(&weights)?;

        assert_eq!(store.rank_config()?, Some(weights.to_bm25()));
        Ok(())
    }

    #[test]
    fn failed_batch_leaves_no_partial_rows() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let mut store = SqliteStore::open(&dir.path().join("store.db"), &StoreConfig::default())?;

        let first_batch: Vec<Record> = (0..3)
            .map(|index| record(&format!("small-{index}.txt"), format!("small body {index}")))
            .collect();
        store.insert_batch(&first_batch)?;

        let pages: i64 = store
            .connection()
            .query_row("PRAGMA page_count", [], |row| row.get(0))?;
        let _: i64 = store.connection().pragma_update_and_check(
            None,
            "max_page_count",
            pages + 2,
            |row| row.get(0),
        )?;

        let oversized_batch: Vec<Record> = (0..20)
            .map(|index| {
                let body = (0..4_000)
                    .map(|word| format!("term{index}x{word}"))
                    .collect::<Vec<_>>()
                    .join(" ");
                record(&format!("large-{index}.txt"), body)
            })
            .collect();

        assert!(store.insert_batch(&oversized_batch).is_err());
        assert_eq!(store.count()?, 3);
        Ok(())
    }
}
