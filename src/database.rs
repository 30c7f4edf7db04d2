use anyhow::{bail, Context, Result};
use rusqlite::Connection;
use serde_json::Value;
#[cfg(test)]
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Key under which the visited card ids live, as a JSON array.
pub const VISITED_KEY: &str = "repairVisited";

/// String key/value persistence, the shape the visited-id set needs.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct SettingItem {
    pub key_name: String,
    pub value: String,
    pub updated_at: String,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        Self::init(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS settings (
                key_name TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;
        Ok(Database { conn })
    }

    pub fn set_config(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO settings (key_name, value) VALUES (?1, ?2)
             ON CONFLICT(key_name) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
            [key, value],
        )?;
        Ok(())
    }

    pub fn get_config(&self, key: &str) -> Result<Option<String>> {
        match self.conn.query_row(
            "SELECT value FROM settings WHERE key_name = ?1",
            [key],
            |row| row.get(0),
        ) {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns whether a row was removed. The visited-id list is not a
    /// setting and cannot be deleted here.
    pub fn delete_config(&mut self, key: &str) -> Result<bool> {
        if key == VISITED_KEY {
            bail!("'{}' holds visited repair cards; use `visited --clear`", key);
        }
        let rows_affected = self
            .conn
            .execute("DELETE FROM settings WHERE key_name = ?1", [key])?;
        Ok(rows_affected > 0)
    }

    pub fn get_all_configs(&self) -> Result<Vec<SettingItem>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT key_name, value, updated_at FROM settings
                 WHERE key_name != ?1 ORDER BY key_name",
            )?;

        let rows = stmt.query_map([VISITED_KEY], |row| {
            Ok(SettingItem {
                key_name: row.get(0)?,
                value: row.get(1)?,
                updated_at: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            })
        })?;

        let mut settings = Vec::new();
        for row in rows {
            settings.push(row?);
        }

        Ok(settings)
    }
}

impl KeyValueStore for Database {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.get_config(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.set_config(key, value)
    }
}

/// In-process store for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Ids of cards the user has opened at least once. Read once, rewritten
/// whole on every new visit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisitedSet {
    ids: Vec<String>,
}

impl VisitedSet {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let stored = match store.get(VISITED_KEY) {
            Ok(Some(stored)) => stored,
            Ok(None) => return Self::default(),
            Err(e) => {
                log::warn!("Could not read visited ids: {:#}", e);
                return Self::default();
            }
        };

        match serde_json::from_str::<Vec<Value>>(&stored) {
            Ok(values) => {
                let mut set = Self::default();
                for value in values {
                    let id = match value {
                        Value::String(s) => s,
                        Value::Number(n) => n.to_string(),
                        _ => continue,
                    };
                    if !set.contains(&id) {
                        set.ids.push(id);
                    }
                }
                set
            }
            Err(e) => {
                log::warn!("Ignoring corrupt visited id list: {}", e);
                Self::default()
            }
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|v| v == id)
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Persists only when `id` is new; returns whether it was. The id is
    /// kept in memory only once the store accepted the write.
    pub fn mark(&mut self, store: &mut dyn KeyValueStore, id: &str) -> Result<bool> {
        if self.contains(id) {
            return Ok(false);
        }
        let mut ids = self.ids.clone();
        ids.push(id.to_string());
        Self::save(&ids, store)?;
        self.ids = ids;
        log::debug!("Marked {} as visited", id);
        Ok(true)
    }

    pub fn clear(&mut self, store: &mut dyn KeyValueStore) -> Result<()> {
        Self::save(&[], store)?;
        self.ids.clear();
        Ok(())
    }

    fn save(ids: &[String], store: &mut dyn KeyValueStore) -> Result<()> {
        let encoded = serde_json::to_string(ids)?;
        store.set(VISITED_KEY, &encoded)
    }
}
