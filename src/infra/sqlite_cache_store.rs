use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::app::ports::CacheStore;
use crate::error::{CatalogError, Result};
use crate::pipeline::processing::translate::{CacheNamespace, TranslationCache};

/// All namespaces in one SQLite file. A save replaces the namespace inside a
/// single transaction.
pub struct SqliteCacheStore {
    conn: Mutex<Connection>,
}

impl SqliteCacheStore {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            CREATE TABLE IF NOT EXISTS translation_cache (
                namespace    TEXT NOT NULL,
                source_text  TEXT NOT NULL,
                translation  TEXT,
                PRIMARY KEY (namespace, source_text)
            );
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| CatalogError::CacheStore("sqlite connection lock poisoned".into()))
    }

    /// Entry counts per stored namespace key: (key, succeeded, failed).
    pub fn namespace_counts(&self) -> Result<Vec<(String, usize, usize)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT namespace,
                    SUM(CASE WHEN translation IS NOT NULL THEN 1 ELSE 0 END),
                    SUM(CASE WHEN translation IS NULL THEN 1 ELSE 0 END)
             FROM translation_cache GROUP BY namespace ORDER BY namespace",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)? as usize,
                row.get::<_, i64>(2)? as usize,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

impl CacheStore for SqliteCacheStore {
    fn load(&self, namespace: &CacheNamespace) -> Result<TranslationCache> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT source_text, translation FROM translation_cache WHERE namespace = ?1")?;
        let rows = stmt.query_map(params![namespace.key()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
        })?;
        let mut cache = TranslationCache::new();
        for row in rows {
            let (text, translation) = row?;
            cache.insert(text, translation);
        }
        Ok(cache)
    }

    fn save(&self, namespace: &CacheNamespace, cache: &TranslationCache) -> Result<()> {
        let mut conn = self.conn()?;
        let key = namespace.key();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM translation_cache WHERE namespace = ?1",
            params![key],
        )?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO translation_cache (namespace, source_text, translation) VALUES (?1, ?2, ?3)",
            )?;
            for (text, translation) in cache.iter() {
                insert.execute(params![key, text, translation])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}
