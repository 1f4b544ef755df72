// SQLite persistence for per-owner lists.

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::item::{Item, ListKind, OwnerId};
use crate::store::PersistentStore;

/// SQLite-backed [`PersistentStore`]. Each `(owner, list)` pair is one row
/// holding the items as a JSON array, so a save is a single-row overwrite.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a SQLite database at `path` and ensure the schema
    /// exists. Pass `":memory:"` for an ephemeral database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS lists (
                owner_id     TEXT NOT NULL,
                list_name    TEXT NOT NULL,
                items        TEXT NOT NULL,
                last_updated TEXT NOT NULL,
                PRIMARY KEY (owner_id, list_name)
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().expect("database mutex poisoned");
            f(&mut guard)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn read_items(conn: &Connection, owner: &str, list: &str) -> Result<Option<Vec<Item>>, StoreError> {
    let json: Option<String> = conn
        .query_row(
            "SELECT items FROM lists WHERE owner_id = ?1 AND list_name = ?2",
            params![owner, list],
            |row| row.get(0),
        )
        .optional()?;
    match json {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

fn write_items(conn: &Connection, owner: &str, list: &str, items: &[Item]) -> Result<(), StoreError> {
    let json = serde_json::to_string(items)?;
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO lists (owner_id, list_name, items, last_updated)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(owner_id, list_name) DO UPDATE SET
            items        = excluded.items,
            last_updated = excluded.last_updated",
        params![owner, list, json, now],
    )?;
    Ok(())
}

#[async_trait]
impl PersistentStore for SqliteStore {
    async fn load_list(&self, owner: &OwnerId, list: ListKind) -> Result<Vec<Item>, StoreError> {
        let owner = owner.as_str().to_string();
        self.with_conn(move |conn| {
            let items = read_items(conn, &owner, list.list_name())?;
            match &items {
                Some(items) => debug!(%owner, %list, count = items.len(), "list loaded"),
                None => debug!(%owner, %list, "no saved list"),
            }
            Ok(items.unwrap_or_default())
        })
        .await
    }

    async fn save_list(
        &self,
        owner: &OwnerId,
        list: ListKind,
        items: &[Item],
    ) -> Result<(), StoreError> {
        let owner = owner.as_str().to_string();
        let items = items.to_vec();
        self.with_conn(move |conn| {
            write_items(conn, &owner, list.list_name(), &items)?;
            debug!(%owner, %list, count = items.len(), "list saved");
            Ok(())
        })
        .await
    }

    async fn remove_item(
        &self,
        owner: &OwnerId,
        list: ListKind,
        item_id: &str,
    ) -> Result<(), StoreError> {
        let owner = owner.as_str().to_string();
        let item_id = item_id.to_string();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let Some(mut items) = read_items(&tx, &owner, list.list_name())? else {
                return Ok(());
            };
            let before = items.len();
            items.retain(|item| item.id != item_id);
            if items.len() == before {
                warn!(%owner, %list, %item_id, "item not present in stored list");
                return Ok(());
            }
            write_items(&tx, &owner, list.list_name(), &items)?;
            tx.commit()?;
            debug!(%owner, %list, %item_id, "item removed");
            Ok(())
        })
        .await
    }

    async fn clear_list(&self, owner: &OwnerId, list: ListKind) -> Result<(), StoreError> {
        let owner = owner.as_str().to_string();
        self.with_conn(move |conn| {
            write_items(conn, &owner, list.list_name(), &[])?;
            debug!(%owner, %list, "list cleared");
            Ok(())
        })
        .await
    }
}
