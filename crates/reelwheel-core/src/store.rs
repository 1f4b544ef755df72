// Persistent store seam and an in-process implementation.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::item::{Item, ListKind, OwnerId};

/// Remote (or local) storage for per-owner named lists.
///
/// Every call names the owner explicitly; implementations must not keep an
/// ambient "current user". Timeouts are the implementation's concern.
#[async_trait]
pub trait PersistentStore: Send + Sync {
    /// Fetch the stored list. A missing entry is an empty list, not an error.
    async fn load_list(&self, owner: &OwnerId, list: ListKind) -> Result<Vec<Item>, StoreError>;

    /// Overwrite the stored list with `items`.
    async fn save_list(
        &self,
        owner: &OwnerId,
        list: ListKind,
        items: &[Item],
    ) -> Result<(), StoreError>;

    /// Delete one item by id. Deleting an absent id is a no-op.
    async fn remove_item(
        &self,
        owner: &OwnerId,
        list: ListKind,
        item_id: &str,
    ) -> Result<(), StoreError>;

    /// Set the stored list to empty.
    async fn clear_list(&self, owner: &OwnerId, list: ListKind) -> Result<(), StoreError>;
}

/// Map-backed store kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    lists: Mutex<HashMap<(OwnerId, ListKind), Vec<Item>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current contents of a list, for inspection.
    pub fn snapshot(&self, owner: &OwnerId, list: ListKind) -> Vec<Item> {
        self.lists
            .lock()
            .expect("memory store mutex poisoned")
            .get(&(owner.clone(), list))
            .cloned()
            .unwrap_or_default()
    }

    /// Seed a list directly, bypassing the trait.
    pub fn insert(&self, owner: &OwnerId, list: ListKind, items: Vec<Item>) {
        self.lists
            .lock()
            .expect("memory store mutex poisoned")
            .insert((owner.clone(), list), items);
    }
}

#[async_trait]
impl PersistentStore for MemoryStore {
    async fn load_list(&self, owner: &OwnerId, list: ListKind) -> Result<Vec<Item>, StoreError> {
        Ok(self.snapshot(owner, list))
    }

    async fn save_list(
        &self,
        owner: &OwnerId,
        list: ListKind,
        items: &[Item],
    ) -> Result<(), StoreError> {
        self.insert(owner, list, items.to_vec());
        Ok(())
    }

    async fn remove_item(
        &self,
        owner: &OwnerId,
        list: ListKind,
        item_id: &str,
    ) -> Result<(), StoreError> {
        let mut lists = self.lists.lock().expect("memory store mutex poisoned");
        if let Some(items) = lists.get_mut(&(owner.clone(), list)) {
            items.retain(|item| item.id != item_id);
        }
        Ok(())
    }

    async fn clear_list(&self, owner: &OwnerId, list: ListKind) -> Result<(), StoreError> {
        self.insert(owner, list, Vec::new());
        Ok(())
    }
}
