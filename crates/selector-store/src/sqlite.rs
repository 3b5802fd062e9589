//! SQLite-backed selector store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use healwright_core_types::ElementKey;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    errors::StoreError,
    model::{Discovery, PersistedElement},
    SelectorStore,
};

const SELECT_COLUMNS: &str = "id, suite_id, url, name, locator, selectors, ai_selectors, \
     fallback_selectors, ai_confidence, metadata, created_at, updated_at";

/// Selector store over a single SQLite connection.
///
/// All statements run on the blocking pool; read-modify-write cycles run in an
/// IMMEDIATE transaction so concurrent upserts on the same key serialize.
#[derive(Clone)]
pub struct SqliteSelectorStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSelectorStore {
    /// Open or create the database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;

        info!("Opened selector database at {:?}", path);
        Ok(store)
    }

    /// Open an in-memory database
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS healing_elements (
                id TEXT PRIMARY KEY,
                suite_id TEXT,
                url TEXT NOT NULL,
                name TEXT NOT NULL,
                locator TEXT NOT NULL DEFAULT '',
                selectors TEXT NOT NULL DEFAULT '[]',
                ai_selectors TEXT NOT NULL DEFAULT '[]',
                fallback_selectors TEXT NOT NULL DEFAULT '[]',
                ai_confidence REAL,
                metadata TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_healing_elements_scope
                ON healing_elements(COALESCE(suite_id, 'global'));
            "#,
        )?;
        Ok(())
    }

    /// Run `op` against the connection on the blocking pool
    async fn with_conn<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock();
            op(&mut *guard)
        })
        .await
        .map_err(|err| StoreError::Unavailable(format!("sqlite worker failed: {err}")))?
    }

    /// Load, mutate and write back one record inside a single transaction
    async fn modify<F>(&self, key: &ElementKey, apply: F) -> Result<PersistedElement, StoreError>
    where
        F: FnOnce(Option<PersistedElement>) -> Result<PersistedElement, StoreError>
            + Send
            + 'static,
    {
        let id = key.id();
        self.with_conn(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let existing = select_one(&tx, &id)?;
            let record = apply(existing)?;
            write_record(&tx, &record)?;
            tx.commit()?;
            debug!(id = %record.id, locator = %record.locator, "Stored selector record");
            Ok(record)
        })
        .await
    }
}

#[async_trait]
impl SelectorStore for SqliteSelectorStore {
    async fn get(&self, key: &ElementKey) -> Result<Option<PersistedElement>, StoreError> {
        let id = key.id();
        self.with_conn(move |conn| select_one(conn, &id)).await
    }

    async fn upsert(
        &self,
        key: &ElementKey,
        working_locator: &str,
        metadata: Option<Value>,
    ) -> Result<PersistedElement, StoreError> {
        let owned_key = key.clone();
        let working = working_locator.to_string();
        self.modify(key, move |existing| match existing {
            Some(mut record) => {
                record.promote(&working, metadata)?;
                Ok(record)
            }
            None => PersistedElement::first_proven(&owned_key, &working, metadata),
        })
        .await
    }

    async fn record_discovery(
        &self,
        key: &ElementKey,
        discovery: Discovery,
    ) -> Result<PersistedElement, StoreError> {
        let owned_key = key.clone();
        self.modify(key, move |existing| {
            let mut record = existing.unwrap_or_else(|| PersistedElement::unproven(&owned_key));
            record.apply_discovery(discovery);
            Ok(record)
        })
        .await
    }

    async fn list(&self, scope: Option<&str>) -> Result<Vec<PersistedElement>, StoreError> {
        let scope = scope.map(str::to_string);
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM healing_elements \
                 WHERE ?1 IS NULL OR COALESCE(suite_id, 'global') = ?1 ORDER BY id"
            ))?;
            let rows = stmt.query_map(params![scope], RawRow::from_row)?;
            let mut records = Vec::new();
            for row in rows {
                records.push(row?.into_record()?);
            }
            Ok(records)
        })
        .await
    }

    async fn remove(&self, key: &ElementKey) -> Result<bool, StoreError> {
        let id = key.id();
        self.with_conn(move |conn| {
            let affected = conn.execute("DELETE FROM healing_elements WHERE id = ?1", params![id])?;
            Ok(affected > 0)
        })
        .await
    }
}

/// Column values as stored, before JSON and timestamp decoding
struct RawRow {
    id: String,
    suite_id: Option<String>,
    url: String,
    name: String,
    locator: String,
    selectors: String,
    ai_selectors: String,
    fallback_selectors: String,
    ai_confidence: Option<f64>,
    metadata: Option<String>,
    created_at: String,
    updated_at: String,
}

impl RawRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            suite_id: row.get(1)?,
            url: row.get(2)?,
            name: row.get(3)?,
            locator: row.get(4)?,
            selectors: row.get(5)?,
            ai_selectors: row.get(6)?,
            fallback_selectors: row.get(7)?,
            ai_confidence: row.get(8)?,
            metadata: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }

    fn into_record(self) -> Result<PersistedElement, StoreError> {
        let id = self.id;
        let metadata = self
            .metadata
            .map(|raw| serde_json::from_str(&raw))
            .transpose()?;
        Ok(PersistedElement {
            suite_id: self.suite_id,
            url: self.url,
            name: self.name,
            locator: self.locator,
            selectors: serde_json::from_str(&self.selectors)?,
            ai_selectors: serde_json::from_str(&self.ai_selectors)?,
            fallback_selectors: serde_json::from_str(&self.fallback_selectors)?,
            ai_confidence: self.ai_confidence,
            metadata,
            created_at: parse_timestamp(&id, &self.created_at)?,
            updated_at: parse_timestamp(&id, &self.updated_at)?,
            id,
        })
    }
}

fn select_one(conn: &Connection, id: &str) -> Result<Option<PersistedElement>, StoreError> {
    let raw = conn
        .query_row(
            &format!("SELECT {SELECT_COLUMNS} FROM healing_elements WHERE id = ?1"),
            params![id],
            RawRow::from_row,
        )
        .optional()?;
    raw.map(RawRow::into_record).transpose()
}

fn write_record(conn: &Connection, record: &PersistedElement) -> Result<(), StoreError> {
    let metadata = record
        .metadata
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    conn.execute(
        r#"
        INSERT INTO healing_elements
            (id, suite_id, url, name, locator, selectors, ai_selectors,
             fallback_selectors, ai_confidence, metadata, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        ON CONFLICT(id) DO UPDATE SET
            locator = excluded.locator,
            selectors = excluded.selectors,
            ai_selectors = excluded.ai_selectors,
            fallback_selectors = excluded.fallback_selectors,
            ai_confidence = excluded.ai_confidence,
            metadata = excluded.metadata,
            updated_at = excluded.updated_at
        "#,
        params![
            record.id,
            record.suite_id,
            record.url,
            record.name,
            record.locator,
            serde_json::to_string(&record.selectors)?,
            serde_json::to_string(&record.ai_selectors)?,
            serde_json::to_string(&record.fallback_selectors)?,
            record.ai_confidence,
            metadata,
            record.created_at.to_rfc3339(),
            record.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn parse_timestamp(id: &str, raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| StoreError::Corrupt {
            key: id.to_string(),
            reason: format!("bad timestamp '{raw}': {err}"),
        })
}
