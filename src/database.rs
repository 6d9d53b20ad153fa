use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::config::{ConfigItem, ConfigKey, Settings};
use crate::storage::{SqliteStore, STORAGE_TABLE};

/// Namespace of the durable ("local storage") rows.
pub const LOCAL_NAMESPACE: &str = "local";

const CONFIG_TABLE: &str = "CREATE TABLE IF NOT EXISTS config (
    id INTEGER PRIMARY KEY,
    key_name TEXT UNIQUE NOT NULL,
    value TEXT NOT NULL,
    description TEXT,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
)";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database {}", path.display()))?;
        log::debug!("opened database {}", path.display());
        Self::init(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(STORAGE_TABLE, [])
            .context("failed to create storage table")?;
        conn.execute(CONFIG_TABLE, [])
            .context("failed to create config table")?;
        Ok(Database { conn })
    }

    pub fn local_storage(&self) -> SqliteStore<'_> {
        SqliteStore::new(&self.conn, LOCAL_NAMESPACE)
    }

    /// Validates and stores `value`, returning the canonical form written.
    pub fn set_config(&self, key: ConfigKey, value: &str) -> Result<String> {
        let value = key.validate(value)?;
        self.conn.execute(
            "INSERT INTO config (key_name, value, description) VALUES (?1, ?2, ?3)
             ON CONFLICT (key_name)
             DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
            params![key.name(), value, key.description()],
        )?;
        log::info!("config {} = {}", key.name(), value);
        Ok(value)
    }

    pub fn get_config(&self, key: ConfigKey) -> Result<Option<ConfigItem>> {
        let item = self
            .conn
            .query_row(
                "SELECT key_name, value, description, created_at, updated_at
                 FROM config WHERE key_name = ?1",
                [key.name()],
                |row| {
                    Ok(ConfigItem {
                        key_name: row.get(0)?,
                        value: row.get(1)?,
                        description: row.get(2)?,
                        created_at: row.get(3)?,
                        updated_at: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(item)
    }

    pub fn get_all_configs(&self) -> Result<Vec<ConfigItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT key_name, value, description, created_at, updated_at
             FROM config ORDER BY key_name",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(ConfigItem {
                key_name: row.get(0)?,
                value: row.get(1)?,
                description: row.get(2)?,
                created_at: row.get(3)?,
                updated_at: row.get(4)?,
            })
        })?;

        let mut configs = Vec::new();
        for row in rows {
            configs.push(row?);
        }

        Ok(configs)
    }

    /// Returns whether a stored value was removed.
    pub fn delete_config(&self, key: ConfigKey) -> Result<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM config WHERE key_name = ?1", [key.name()])?;
        Ok(rows_affected > 0)
    }

    pub fn settings(&self) -> Result<Settings> {
        Ok(Settings::from_items(&self.get_all_configs()?))
    }

    #[cfg(test)]
    pub fn drop_storage_for_test(&self) {
        self.conn.execute("DROP TABLE storage", []).unwrap();
    }

    /// Drop every durable task and group. Config is kept.
    pub fn clear_all_data(&self) -> Result<()> {
        self.conn.execute(
            "DELETE FROM storage WHERE namespace = ?1",
            [LOCAL_NAMESPACE],
        )?;
        log::info!("cleared local storage");
        Ok(())
    }
}
