use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// String key-value capability, the only thing persistence needs from a
/// storage backend.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
    fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// Session storage: lives as long as the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.keys().cloned().collect())
    }
}

pub const STORAGE_TABLE: &str = "CREATE TABLE IF NOT EXISTS storage (
    namespace TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (namespace, key)
)";

/// Durable storage: rows of the `storage` table under one namespace.
pub struct SqliteStore<'a> {
    conn: &'a Connection,
    namespace: String,
}

impl<'a> SqliteStore<'a> {
    /// The `storage` table must already exist (see [`STORAGE_TABLE`]).
    pub fn new(conn: &'a Connection, namespace: &str) -> Self {
        SqliteStore {
            conn,
            namespace: namespace.to_string(),
        }
    }
}

impl KeyValueStore for SqliteStore<'_> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM storage WHERE namespace = ?1 AND key = ?2",
                params![self.namespace, key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO storage (namespace, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT (namespace, key)
             DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
            params![self.namespace, key, value],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "DELETE FROM storage WHERE namespace = ?1 AND key = ?2",
            params![self.namespace, key],
        )?;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM storage WHERE namespace = ?1 ORDER BY key")?;
        let rows = stmt.query_map([&self.namespace], |row| row.get::<_, String>(0))?;

        let mut keys = Vec::new();
        for row in rows {
            keys.push(row?);
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn exercise(store: &mut dyn KeyValueStore) {
        assert_eq!(store.get("a").unwrap(), None);
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.set("a", "3").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("3"));
        assert_eq!(store.keys().unwrap(), vec!["a", "b"]);
        store.remove("a").unwrap();
        store.remove("missing").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.keys().unwrap(), vec!["b"]);
    }

    #[test]
    fn memory_store_behaves_as_key_value() {
        exercise(&mut MemoryStore::new());
    }

    #[test]
    fn sqlite_store_behaves_as_key_value() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(STORAGE_TABLE, []).unwrap();
        exercise(&mut SqliteStore::new(&conn, "local"));
    }

    #[test]
    fn sqlite_namespaces_do_not_overlap() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(STORAGE_TABLE, []).unwrap();
        let mut local = SqliteStore::new(&conn, "local");
        let mut other = SqliteStore::new(&conn, "other");
        local.set("k", "local").unwrap();
        other.set("k", "other").unwrap();
        assert_eq!(local.get("k").unwrap().as_deref(), Some("local"));
        other.remove("k").unwrap();
        assert_eq!(local.get("k").unwrap().as_deref(), Some("local"));
    }
}
