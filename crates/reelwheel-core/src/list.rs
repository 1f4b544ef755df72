// List synchronization manager.
//
// Holds one owner's list in memory and keeps the persistent store in step
// with it. Mutations apply to the in-memory list immediately; store calls
// are issued by a single background worker, so a bulk overwrite ("flush")
// and a targeted delete can never be in flight at the same time, and a
// reload always reads the store after every write queued before it. Flushes
// always write whatever the list looks like when they run, and a flush that
// comes due while a removal is pending is held back until the removal has
// settled.

use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use crate::error::{ListError, StoreError};
use crate::item::{sort_by_title, Item, ListKind, OwnerId};
use crate::resolver::TitleResolver;
use crate::store::PersistentStore;

// ---------------------------------------------------------------------------
// Public state types
// ---------------------------------------------------------------------------

/// Which write path currently owns the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePhase {
    #[default]
    Idle,
    /// A full-list overwrite (flush or clear) is in flight.
    Flushing,
    /// A targeted delete is in flight.
    Removing,
}

/// Busy indicators for the renderer and for the caller that keeps spins and
/// list mutations apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OperationFlags {
    pub loading_list: bool,
    pub saving_list: bool,
    pub resolving_title: bool,
    pub removing_item: bool,
}

impl OperationFlags {
    /// True while any save, remove or title lookup is outstanding. A wheel
    /// must not be spun in this state.
    pub fn blocks_spin(&self) -> bool {
        self.saving_list || self.removing_item || self.resolving_title
    }

    pub fn any(&self) -> bool {
        self.loading_list || self.blocks_spin()
    }
}

/// Snapshot published to subscribers after every state change.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListView {
    pub items: Vec<Item>,
    pub flags: OperationFlags,
    pub last_error: Option<ListError>,
    /// Background flushes that failed so far. No caller hears about these
    /// directly, so subscribers watch this count to report them.
    pub flush_failures: u64,
}

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct ListState {
    owner: Option<OwnerId>,
    /// Bumped on every owner (re)selection; writes queued under an older
    /// epoch are dropped before they reach the store.
    epoch: u64,
    items: Vec<Item>,
    loading: bool,
    resolving: usize,
    phase: WritePhase,
    removes_pending: usize,
    flush_queued: bool,
    flush_deferred: bool,
    last_error: Option<ListError>,
    flush_failures: u64,
}

impl ListState {
    fn flags(&self) -> OperationFlags {
        OperationFlags {
            loading_list: self.loading,
            saving_list: self.phase == WritePhase::Flushing,
            resolving_title: self.resolving > 0,
            removing_item: self.phase == WritePhase::Removing || self.removes_pending > 0,
        }
    }

    fn view(&self) -> ListView {
        ListView {
            items: self.items.clone(),
            flags: self.flags(),
            last_error: self.last_error.clone(),
            flush_failures: self.flush_failures,
        }
    }

    fn require_owner(&mut self) -> Result<OwnerId, ListError> {
        self.owner.clone().ok_or(ListError::OwnerMissing)
    }

    /// Record `err` as the most recent failure and hand it back.
    fn fail<T>(&mut self, err: ListError) -> Result<T, ListError> {
        self.last_error = Some(err.clone());
        Err(err)
    }

    /// Mark a flush as due. Returns the epoch to queue it under, or `None`
    /// when one is already queued.
    fn request_flush(&mut self) -> Option<u64> {
        if self.flush_queued {
            return None;
        }
        self.flush_queued = true;
        Some(self.epoch)
    }
}

/// Work for the store worker, run strictly in the order queued.
enum StoreOp {
    Load {
        owner: OwnerId,
        reply: oneshot::Sender<Result<Vec<Item>, StoreError>>,
    },
    Flush {
        epoch: u64,
    },
    Remove {
        owner: OwnerId,
        item_id: String,
        reply: oneshot::Sender<Result<(), ListError>>,
    },
    Clear {
        owner: OwnerId,
        reply: oneshot::Sender<Result<(), ListError>>,
    },
    Barrier {
        reply: oneshot::Sender<()>,
    },
}

struct Shared {
    kind: ListKind,
    capacity: Option<usize>,
    state: Mutex<ListState>,
    view: watch::Sender<ListView>,
    store: Arc<dyn PersistentStore>,
    resolver: Arc<dyn TitleResolver>,
}

impl Shared {
    /// Apply `f` to the state and publish the result.
    fn update<R>(&self, f: impl FnOnce(&mut ListState) -> R) -> R {
        let mut state = self.state.lock().expect("list state mutex poisoned");
        let out = f(&mut state);
        self.view.send_replace(state.view());
        out
    }

    fn read<R>(&self, f: impl FnOnce(&ListState) -> R) -> R {
        let state = self.state.lock().expect("list state mutex poisoned");
        f(&state)
    }

    fn order(&self, items: &mut [Item]) {
        if self.kind.sorted_by_title() {
            sort_by_title(items);
        }
    }

    /// Duplicate and capacity checks, then the optimistic append. Returns the
    /// outcome and the epoch of a newly requested flush.
    fn append(&self, s: &mut ListState, item: Item) -> (Result<Item, ListError>, Option<u64>) {
        if s.items.iter().any(|existing| existing.id == item.id) {
            let err = ListError::Duplicate {
                id: item.id.clone(),
                title: item.title.clone(),
            };
            return (s.fail(err), None);
        }
        if let Some(max) = self.capacity {
            if s.items.len() >= max {
                return (s.fail(ListError::CapacityExceeded { max }), None);
            }
        }
        s.items.push(item.clone());
        self.order(&mut s.items);
        if let Some(owner) = &s.owner {
            info!(%owner, list = %self.kind, item = %item.title, id = %item.id, "item added");
        }
        (Ok(item), s.request_flush())
    }

    async fn flush(&self, epoch: u64) {
        let snapshot = self.update(|s| {
            s.flush_queued = false;
            if s.epoch != epoch || s.loading {
                debug!(list = %self.kind, "dropping flush for a superseded list");
                return None;
            }
            if s.removes_pending > 0 {
                debug!(list = %self.kind, "flush held back until removal settles");
                s.flush_deferred = true;
                return None;
            }
            let owner = s.owner.clone()?;
            s.phase = WritePhase::Flushing;
            Some((owner, s.items.clone()))
        });
        let Some((owner, items)) = snapshot else {
            return;
        };

        let result = self.store.save_list(&owner, self.kind, &items).await;
        self.update(|s| {
            s.phase = WritePhase::Idle;
            match result {
                Ok(()) => debug!(%owner, list = %self.kind, count = items.len(), "list flushed"),
                Err(e) => {
                    error!(%owner, list = %self.kind, "failed to flush list: {e}");
                    s.last_error = Some(ListError::save(&e));
                    s.flush_failures += 1;
                }
            }
        });
    }

    /// Run a targeted delete. Returns its result and, if a flush was held
    /// back behind it, the epoch to run that flush under.
    async fn remove_remote(&self, owner: &OwnerId, item_id: &str) -> (Result<(), ListError>, Option<u64>) {
        self.update(|s| s.phase = WritePhase::Removing);
        let result = self
            .store
            .remove_item(owner, self.kind, item_id)
            .await
            .map_err(|e| {
                error!(%owner, list = %self.kind, %item_id, "failed to remove item: {e}");
                ListError::remove(item_id, &e)
            });
        let deferred = self.update(|s| {
            s.phase = WritePhase::Idle;
            s.removes_pending = s.removes_pending.saturating_sub(1);
            if let Err(e) = &result {
                s.last_error = Some(e.clone());
            }
            if s.removes_pending == 0 && s.flush_deferred {
                s.flush_deferred = false;
                Some(s.epoch)
            } else {
                None
            }
        });
        (result, deferred)
    }

    async fn clear_remote(&self, owner: &OwnerId) -> Result<(), ListError> {
        self.update(|s| s.phase = WritePhase::Flushing);
        let result = self.store.clear_list(owner, self.kind).await.map_err(|e| {
            error!(%owner, list = %self.kind, "failed to clear list: {e}");
            ListError::save(&e)
        });
        self.update(|s| {
            s.phase = WritePhase::Idle;
            if let Err(e) = &result {
                s.last_error = Some(e.clone());
            }
        });
        result
    }
}

/// Serializes every store call for one manager.
async fn run_store_ops(shared: Arc<Shared>, mut rx: mpsc::UnboundedReceiver<StoreOp>) {
    while let Some(op) = rx.recv().await {
        match op {
            StoreOp::Load { owner, reply } => {
                let _ = reply.send(shared.store.load_list(&owner, shared.kind).await);
            }
            StoreOp::Flush { epoch } => shared.flush(epoch).await,
            StoreOp::Remove {
                owner,
                item_id,
                reply,
            } => {
                let (result, deferred) = shared.remove_remote(&owner, &item_id).await;
                let _ = reply.send(result);
                if let Some(epoch) = deferred {
                    shared.flush(epoch).await;
                }
            }
            StoreOp::Clear { owner, reply } => {
                let _ = reply.send(shared.clear_remote(&owner).await);
            }
            StoreOp::Barrier { reply } => {
                let _ = reply.send(());
            }
        }
    }
    debug!(list = %shared.kind, "store worker stopped");
}

// ---------------------------------------------------------------------------
// ListManager
// ---------------------------------------------------------------------------

/// Single source of truth for one owner's list of a given [`ListKind`].
///
/// Cloning yields another handle on the same list. Construction spawns the
/// store worker, so it must happen inside a tokio runtime.
#[derive(Clone)]
pub struct ListManager {
    shared: Arc<Shared>,
    ops: mpsc::UnboundedSender<StoreOp>,
}

impl ListManager {
    /// Manager with the kind's default capacity.
    pub fn new(
        kind: ListKind,
        store: Arc<dyn PersistentStore>,
        resolver: Arc<dyn TitleResolver>,
    ) -> Self {
        Self::with_capacity(kind, kind.capacity(), store, resolver)
    }

    pub fn with_capacity(
        kind: ListKind,
        capacity: Option<usize>,
        store: Arc<dyn PersistentStore>,
        resolver: Arc<dyn TitleResolver>,
    ) -> Self {
        let (view, _) = watch::channel(ListView::default());
        let shared = Arc::new(Shared {
            kind,
            capacity,
            state: Mutex::new(ListState::default()),
            view,
            store,
            resolver,
        });
        let (ops, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_store_ops(Arc::clone(&shared), rx));
        Self { shared, ops }
    }

    pub fn kind(&self) -> ListKind {
        self.shared.kind
    }

    pub fn capacity(&self) -> Option<usize> {
        self.shared.capacity
    }

    pub fn subscribe(&self) -> watch::Receiver<ListView> {
        self.shared.view.subscribe()
    }

    pub fn view(&self) -> ListView {
        self.shared.read(ListState::view)
    }

    pub fn items(&self) -> Vec<Item> {
        self.shared.read(|s| s.items.clone())
    }

    pub fn owner(&self) -> Option<OwnerId> {
        self.shared.read(|s| s.owner.clone())
    }

    pub fn flags(&self) -> OperationFlags {
        self.shared.read(ListState::flags)
    }

    pub fn write_phase(&self) -> WritePhase {
        self.shared.read(|s| s.phase)
    }

    pub fn last_error(&self) -> Option<ListError> {
        self.shared.read(|s| s.last_error.clone())
    }

    pub fn clear_error(&self) {
        self.shared.update(|s| s.last_error = None);
    }

    fn queue(&self, op: StoreOp) -> bool {
        self.ops.send(op).is_ok()
    }

    fn queue_flush(&self, epoch: Option<u64>) {
        if let Some(epoch) = epoch {
            if !self.queue(StoreOp::Flush { epoch }) {
                warn!(list = %self.shared.kind, "store worker gone; flush not queued");
            }
        }
    }

    /// Select `owner` and replace the in-memory list with its stored copy.
    ///
    /// A missing stored list loads as empty. On failure the list stays empty
    /// and `LoadFailed` is returned. Items added while the load was running
    /// are kept and appended after the stored ones.
    ///
    /// The read is queued behind any remove, clear or flush already waiting
    /// for the store, so it sees their effect.
    pub async fn load(&self, owner: OwnerId) -> Result<(), ListError> {
        let kind = self.shared.kind;
        let epoch = self.shared.update(|s| {
            s.epoch += 1;
            s.owner = Some(owner.clone());
            s.items.clear();
            s.loading = true;
            s.flush_queued = false;
            s.flush_deferred = false;
            s.last_error = None;
            s.epoch
        });
        info!(%owner, list = %kind, "loading list");

        let (reply, rx) = oneshot::channel();
        let queued = self.queue(StoreOp::Load {
            owner: owner.clone(),
            reply,
        });
        let result = if queued {
            rx.await.unwrap_or_else(|_| Err(worker_stopped()))
        } else {
            Err(worker_stopped())
        };

        let (outcome, flush) = self.shared.update(|s| {
            if s.epoch != epoch {
                debug!(%owner, list = %kind, "discarding load for a superseded owner");
                return (Ok(()), None);
            }
            s.loading = false;
            match result {
                Ok(mut items) => {
                    let added_meanwhile = std::mem::take(&mut s.items);
                    let mut merged = false;
                    for item in added_meanwhile {
                        if items.iter().any(|i| i.id == item.id) {
                            continue;
                        }
                        if self.shared.capacity.is_some_and(|max| items.len() >= max) {
                            warn!(%owner, list = %kind, item = %item.title, "list full after load; dropping item");
                            continue;
                        }
                        items.push(item);
                        merged = true;
                    }
                    self.shared.order(&mut items);
                    info!(%owner, list = %kind, count = items.len(), "list loaded");
                    s.items = items;
                    let flush = if merged { s.request_flush() } else { None };
                    (Ok(()), flush)
                }
                Err(e) => {
                    error!(%owner, list = %kind, "failed to load list: {e}");
                    s.items.clear();
                    (s.fail(ListError::load(&e)), None)
                }
            }
        });
        self.queue_flush(flush);
        outcome
    }

    /// Resolve `title` and append the result.
    ///
    /// Capacity is checked before the lookup so a full list costs no network
    /// call. The append is optimistic; persisting it is left to the flush it
    /// schedules.
    pub async fn add(&self, title: &str) -> Result<Item, ListError> {
        let kind = self.shared.kind;
        let capacity = self.shared.capacity;
        let query = title.trim();

        let (owner, epoch) = self.shared.update(|s| {
            s.last_error = None;
            let owner = match s.require_owner() {
                Ok(owner) => owner,
                Err(e) => return s.fail(e),
            };
            if let Some(max) = capacity {
                if s.items.len() >= max {
                    return s.fail(ListError::CapacityExceeded { max });
                }
            }
            if query.is_empty() {
                return s.fail(ListError::NotFound {
                    title: title.to_string(),
                });
            }
            s.resolving += 1;
            Ok((owner, s.epoch))
        })?;

        debug!(%owner, list = %kind, %query, "resolving title");
        let resolved = self.shared.resolver.resolve(query).await;

        let (outcome, flush) = self.shared.update(|s| {
            s.resolving = s.resolving.saturating_sub(1);
            let item = match resolved {
                Ok(Some(item)) => item,
                Ok(None) => {
                    info!(%query, "no match for title");
                    return (
                        s.fail(ListError::NotFound {
                            title: query.to_string(),
                        }),
                        None,
                    );
                }
                Err(e) => {
                    warn!(%query, "title lookup failed: {e}");
                    return (s.fail(ListError::resolution(query, &e)), None);
                }
            };
            if s.epoch != epoch {
                warn!(%owner, list = %kind, "owner changed during lookup; dropping {}", item.title);
                return (s.fail(ListError::OwnerMissing), None);
            }
            self.shared.append(s, item)
        });
        self.queue_flush(flush);
        outcome
    }

    /// Append an item that is already resolved, skipping the title lookup.
    /// Duplicate and capacity rules are the same as for [`add`](Self::add).
    pub fn insert(&self, item: Item) -> Result<Item, ListError> {
        let (outcome, flush) = self.shared.update(|s| {
            s.last_error = None;
            if let Err(e) = s.require_owner() {
                return (s.fail(e), None);
            }
            self.shared.append(s, item)
        });
        self.queue_flush(flush);
        outcome
    }

    /// Remove the item with `item_id`.
    ///
    /// The in-memory list drops it immediately and a targeted delete is sent
    /// to the store; the local removal is not undone if that delete fails.
    /// Removing an id that is not on the list is a no-op returning `None`.
    pub async fn remove(&self, item_id: &str) -> Result<Option<Item>, ListError> {
        let kind = self.shared.kind;
        let (owner, removed) = self.shared.update(|s| {
            s.last_error = None;
            let owner = match s.require_owner() {
                Ok(owner) => owner,
                Err(e) => return s.fail(e),
            };
            let removed = s
                .items
                .iter()
                .position(|item| item.id == item_id)
                .map(|pos| s.items.remove(pos));
            if removed.is_some() {
                s.removes_pending += 1;
            }
            Ok((owner, removed))
        })?;

        let Some(removed) = removed else {
            debug!(%owner, list = %kind, %item_id, "remove of absent item ignored");
            return Ok(None);
        };
        info!(%owner, list = %kind, item = %removed.title, %item_id, "item removed locally");

        let (reply, rx) = oneshot::channel();
        let queued = self.queue(StoreOp::Remove {
            owner,
            item_id: item_id.to_string(),
            reply,
        });
        let result = if queued {
            match rx.await {
                Ok(result) => result,
                Err(_) => self.shared.update(|s| s.fail(worker_gone_remove(item_id))),
            }
        } else {
            self.shared.update(|s| {
                s.removes_pending = s.removes_pending.saturating_sub(1);
                s.fail(worker_gone_remove(item_id))
            })
        };
        result.map(|()| Some(removed))
    }

    /// Empty the list locally and set the stored list to empty.
    pub async fn clear(&self) -> Result<(), ListError> {
        let kind = self.shared.kind;
        let owner = self.shared.update(|s| {
            s.last_error = None;
            let owner = match s.require_owner() {
                Ok(owner) => owner,
                Err(e) => return s.fail(e),
            };
            s.items.clear();
            Ok(owner)
        })?;
        info!(%owner, list = %kind, "list cleared locally");

        let (reply, rx) = oneshot::channel();
        if !self.queue(StoreOp::Clear { owner, reply }) {
            return self.shared.update(|s| s.fail(worker_gone_save()));
        }
        match rx.await {
            Ok(result) => result,
            Err(_) => self.shared.update(|s| s.fail(worker_gone_save())),
        }
    }

    /// Wait until every write queued before this call has settled.
    pub async fn sync(&self) {
        let (reply, rx) = oneshot::channel();
        if self.queue(StoreOp::Barrier { reply }) {
            let _ = rx.await;
        }
    }
}

fn worker_gone_remove(item_id: &str) -> ListError {
    ListError::RemoveFailed {
        id: item_id.to_string(),
        message: "write worker stopped".into(),
    }
}

fn worker_gone_save() -> ListError {
    ListError::SaveFailed {
        message: "write worker stopped".into(),
    }
}

fn worker_stopped() -> StoreError {
    StoreError::Task("store worker stopped".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, ResolveError};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::Notify;

    // -----------------------------------------------------------------------
    // Test collaborators
    // -----------------------------------------------------------------------

    fn movie(id: &str, title: &str) -> Item {
        Item::new(id, title, format!("https://img/{id}.jpg"))
    }

    fn alice() -> OwnerId {
        OwnerId::new("alice")
    }

    /// Resolves titles from a fixed catalog, keyed by lowercase title.
    #[derive(Default)]
    struct CatalogResolver {
        catalog: HashMap<String, Item>,
        calls: AtomicUsize,
        fail: AtomicBool,
    }

    impl CatalogResolver {
        fn with(items: &[Item]) -> Self {
            Self {
                catalog: items
                    .iter()
                    .map(|item| (item.title.to_lowercase(), item.clone()))
                    .collect(),
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TitleResolver for CatalogResolver {
        async fn resolve(&self, title: &str) -> Result<Option<Item>, ResolveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(ResolveError::Transport("connection reset".into()));
            }
            Ok(self.catalog.get(&title.to_lowercase()).cloned())
        }
    }

    /// Memory store whose writes can be held open or made to fail.
    #[derive(Default)]
    struct GatedStore {
        inner: MemoryStore,
        hold_saves: AtomicBool,
        save_started: Notify,
        release_save: Notify,
        hold_removes: AtomicBool,
        remove_started: Notify,
        release_remove: Notify,
        fail_load: AtomicBool,
        fail_save: AtomicBool,
        fail_remove: AtomicBool,
        save_calls: AtomicUsize,
        remove_calls: AtomicUsize,
    }

    impl GatedStore {
        fn persisted(&self) -> Vec<Item> {
            self.inner.snapshot(&alice(), ListKind::Wheel)
        }
    }

    fn offline() -> StoreError {
        StoreError::Unavailable("offline".into())
    }

    #[async_trait]
    impl PersistentStore for GatedStore {
        async fn load_list(&self, owner: &OwnerId, list: ListKind) -> Result<Vec<Item>, StoreError> {
            if self.fail_load.load(Ordering::SeqCst) {
                return Err(offline());
            }
            self.inner.load_list(owner, list).await
        }

        async fn save_list(
            &self,
            owner: &OwnerId,
            list: ListKind,
            items: &[Item],
        ) -> Result<(), StoreError> {
            self.save_calls.fetch_add(1, Ordering::SeqCst);
            if self.hold_saves.load(Ordering::SeqCst) {
                self.save_started.notify_one();
                self.release_save.notified().await;
            }
            if self.fail_save.load(Ordering::SeqCst) {
                return Err(offline());
            }
            self.inner.save_list(owner, list, items).await
        }

        async fn remove_item(
            &self,
            owner: &OwnerId,
            list: ListKind,
            item_id: &str,
        ) -> Result<(), StoreError> {
            self.remove_calls.fetch_add(1, Ordering::SeqCst);
            if self.hold_removes.load(Ordering::SeqCst) {
                self.remove_started.notify_one();
                self.release_remove.notified().await;
            }
            if self.fail_remove.load(Ordering::SeqCst) {
                return Err(offline());
            }
            self.inner.remove_item(owner, list, item_id).await
        }

        async fn clear_list(&self, owner: &OwnerId, list: ListKind) -> Result<(), StoreError> {
            if self.fail_save.load(Ordering::SeqCst) {
                return Err(offline());
            }
            self.inner.clear_list(owner, list).await
        }
    }

    fn catalog() -> Vec<Item> {
        (1..=12)
            .map(|i| movie(&i.to_string(), &format!("Movie {i:02}")))
            .chain([
                movie("a", "Alien"),
                movie("b", "Brazil"),
                movie("c", "Casablanca"),
                movie("d", "Dune"),
            ])
            .collect()
    }

    fn setup(kind: ListKind) -> (ListManager, Arc<GatedStore>, Arc<CatalogResolver>) {
        let store = Arc::new(GatedStore::default());
        let resolver = Arc::new(CatalogResolver::with(&catalog()));
        let manager = ListManager::new(kind, store.clone(), resolver.clone());
        (manager, store, resolver)
    }

    async fn loaded_wheel(items: Vec<Item>) -> (ListManager, Arc<GatedStore>, Arc<CatalogResolver>) {
        let (manager, store, resolver) = setup(ListKind::Wheel);
        store.inner.insert(&alice(), ListKind::Wheel, items);
        manager.load(alice()).await.unwrap();
        (manager, store, resolver)
    }

    // -----------------------------------------------------------------------
    // load
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn load_missing_list_is_empty() {
        let (manager, _, _) = setup(ListKind::Wheel);
        manager.load(alice()).await.unwrap();
        assert!(manager.items().is_empty());
        assert_eq!(manager.owner(), Some(alice()));
        assert!(!manager.flags().loading_list);
    }

    #[tokio::test]
    async fn load_replaces_list_with_stored_copy() {
        let (manager, _, _) = loaded_wheel(vec![movie("a", "Alien"), movie("b", "Brazil")]).await;
        assert_eq!(manager.items(), vec![movie("a", "Alien"), movie("b", "Brazil")]);
    }

    #[tokio::test]
    async fn load_failure_leaves_list_empty() {
        let (manager, store, _) = setup(ListKind::Wheel);
        store.fail_load.store(true, Ordering::SeqCst);

        let err = manager.load(alice()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LoadFailed);
        assert!(manager.items().is_empty());
        assert_eq!(manager.last_error().map(|e| e.kind()), Some(ErrorKind::LoadFailed));
        assert!(!manager.flags().loading_list);
    }

    #[tokio::test]
    async fn switching_owner_loads_their_own_list() {
        let (manager, store, _) = loaded_wheel(vec![movie("a", "Alien")]).await;
        let bob = OwnerId::new("bob");
        store.inner.insert(&bob, ListKind::Wheel, vec![movie("d", "Dune")]);

        manager.load(bob.clone()).await.unwrap();
        assert_eq!(manager.items(), vec![movie("d", "Dune")]);
        manager.sync().await;
        assert_eq!(store.persisted(), vec![movie("a", "Alien")]);
    }

    // -----------------------------------------------------------------------
    // add
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn add_appends_and_flushes() {
        let (manager, store, _) = loaded_wheel(vec![movie("a", "Alien")]).await;

        let added = manager.add("brazil").await.unwrap();
        assert_eq!(added, movie("b", "Brazil"));
        assert_eq!(manager.items(), vec![movie("a", "Alien"), movie("b", "Brazil")]);

        manager.sync().await;
        assert_eq!(store.persisted(), vec![movie("a", "Alien"), movie("b", "Brazil")]);
    }

    #[tokio::test]
    async fn add_at_capacity_never_resolves() {
        let full: Vec<Item> = (1..=10)
            .map(|i| movie(&i.to_string(), &format!("Movie {i:02}")))
            .collect();
        let (manager, _, resolver) = loaded_wheel(full).await;

        let err = manager.add("Alien").await.unwrap_err();
        assert_eq!(err, ListError::CapacityExceeded { max: 10 });
        assert_eq!(resolver.calls(), 0);
        assert_eq!(manager.items().len(), 10);
    }

    #[tokio::test]
    async fn add_duplicate_id_is_rejected() {
        let (manager, _, _) = loaded_wheel(vec![movie("a", "Alien")]).await;

        let err = manager.add("ALIEN").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Duplicate);
        assert_eq!(manager.items().len(), 1);
        assert_eq!(manager.view().last_error, Some(err));
    }

    #[tokio::test]
    async fn add_unknown_title_is_not_found() {
        let (manager, _, _) = loaded_wheel(vec![]).await;
        let err = manager.add("Nonexistent Film").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(manager.items().is_empty());
    }

    #[tokio::test]
    async fn add_lookup_failure_is_resolution_failed() {
        let (manager, _, resolver) = loaded_wheel(vec![]).await;
        resolver.fail.store(true, Ordering::SeqCst);

        let err = manager.add("Alien").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResolutionFailed);
        assert!(!manager.flags().resolving_title);
    }

    #[tokio::test]
    async fn add_blank_title_skips_lookup() {
        let (manager, _, resolver) = loaded_wheel(vec![]).await;
        let err = manager.add("   ").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(resolver.calls(), 0);
    }

    #[tokio::test]
    async fn add_without_owner_is_rejected() {
        let (manager, _, resolver) = setup(ListKind::Wheel);
        let err = manager.add("Alien").await.unwrap_err();
        assert_eq!(err, ListError::OwnerMissing);
        assert_eq!(resolver.calls(), 0);
    }

    #[tokio::test]
    async fn rapid_adds_are_all_persisted() {
        let (manager, store, _) = loaded_wheel(vec![]).await;
        let (first, second) = tokio::join!(manager.add("Alien"), manager.add("Dune"));
        first.unwrap();
        second.unwrap();

        manager.sync().await;
        let persisted = store.persisted();
        assert_eq!(persisted.len(), 2);
        assert!(persisted.contains(&movie("a", "Alien")));
        assert!(persisted.contains(&movie("d", "Dune")));
    }

    #[tokio::test]
    async fn flush_failure_keeps_local_list() {
        let (manager, store, _) = loaded_wheel(vec![]).await;
        store.fail_save.store(true, Ordering::SeqCst);

        manager.add("Alien").await.unwrap();
        manager.sync().await;

        assert_eq!(manager.items(), vec![movie("a", "Alien")]);
        assert_eq!(manager.last_error().map(|e| e.kind()), Some(ErrorKind::SaveFailed));
        assert!(store.persisted().is_empty());
    }

    #[tokio::test]
    async fn saving_flag_is_set_while_flush_in_flight() {
        let (manager, store, _) = loaded_wheel(vec![]).await;
        store.hold_saves.store(true, Ordering::SeqCst);

        manager.add("Alien").await.unwrap();
        store.save_started.notified().await;
        assert!(manager.flags().saving_list);
        assert!(manager.flags().blocks_spin());
        assert_eq!(manager.write_phase(), WritePhase::Flushing);

        store.release_save.notify_one();
        manager.sync().await;
        assert!(!manager.flags().saving_list);
        assert_eq!(manager.write_phase(), WritePhase::Idle);
    }

    // -----------------------------------------------------------------------
    // remove
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn remove_uses_targeted_delete() {
        let (manager, store, _) =
            loaded_wheel(vec![movie("a", "Alien"), movie("b", "Brazil")]).await;

        let removed = manager.remove("a").await.unwrap();
        assert_eq!(removed, Some(movie("a", "Alien")));
        assert_eq!(manager.items(), vec![movie("b", "Brazil")]);
        assert_eq!(store.remove_calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.save_calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.persisted(), vec![movie("b", "Brazil")]);
    }

    #[tokio::test]
    async fn remove_absent_item_is_silent_noop() {
        let (manager, store, _) = loaded_wheel(vec![movie("a", "Alien")]).await;

        assert_eq!(manager.remove("zzz").await.unwrap(), None);
        assert_eq!(manager.items().len(), 1);
        assert_eq!(store.remove_calls.load(Ordering::SeqCst), 0);
        assert!(manager.last_error().is_none());
    }

    #[tokio::test]
    async fn remove_failure_is_not_rolled_back() {
        let (manager, store, _) = loaded_wheel(vec![movie("a", "Alien")]).await;
        store.fail_remove.store(true, Ordering::SeqCst);

        let err = manager.remove("a").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RemoveFailed);
        assert!(manager.items().is_empty());
        assert!(!manager.flags().removing_item);
    }

    #[tokio::test]
    async fn remove_during_inflight_flush_never_resurrects_item() {
        let (manager, store, _) = loaded_wheel(vec![
            movie("a", "Alien"),
            movie("b", "Brazil"),
            movie("c", "Casablanca"),
        ])
        .await;

        store.hold_saves.store(true, Ordering::SeqCst);
        manager.add("Dune").await.unwrap();
        // Flush of [A, B, C, D] is now in flight.
        store.save_started.notified().await;

        let (removed, _) = tokio::join!(manager.remove("b"), async {
            tokio::task::yield_now().await;
            assert!(!manager.items().iter().any(|item| item.id == "b"));
            assert!(manager.flags().removing_item);
            store.hold_saves.store(false, Ordering::SeqCst);
            store.release_save.notify_one();
        });
        assert_eq!(removed.unwrap(), Some(movie("b", "Brazil")));

        manager.sync().await;
        assert_eq!(
            store.persisted(),
            vec![movie("a", "Alien"), movie("c", "Casablanca"), movie("d", "Dune")]
        );
        assert!(!manager.flags().any());
    }

    #[tokio::test]
    async fn reload_during_pending_remove_keeps_item_removed() {
        let (manager, store, _) = loaded_wheel(vec![
            movie("a", "Alien"),
            movie("b", "Brazil"),
            movie("c", "Casablanca"),
        ])
        .await;

        store.hold_removes.store(true, Ordering::SeqCst);
        let (removed, reloaded, ()) = tokio::join!(
            manager.remove("b"),
            async {
                store.remove_started.notified().await;
                manager.load(alice()).await
            },
            async {
                while !manager.flags().loading_list {
                    tokio::task::yield_now().await;
                }
                for _ in 0..10 {
                    tokio::task::yield_now().await;
                }
                // The read is queued behind the delete.
                assert!(manager.flags().loading_list);
                store.hold_removes.store(false, Ordering::SeqCst);
                store.release_remove.notify_one();
            }
        );
        removed.unwrap();
        reloaded.unwrap();
        assert_eq!(manager.items(), vec![movie("a", "Alien"), movie("c", "Casablanca")]);

        manager.add("Dune").await.unwrap();
        manager.sync().await;
        assert_eq!(
            store.persisted(),
            vec![movie("a", "Alien"), movie("c", "Casablanca"), movie("d", "Dune")]
        );
    }

    #[tokio::test]
    async fn reload_during_inflight_flush_keeps_new_item() {
        let (manager, store, _) = loaded_wheel(vec![movie("a", "Alien")]).await;

        store.hold_saves.store(true, Ordering::SeqCst);
        manager.add("Dune").await.unwrap();
        store.save_started.notified().await;

        let (reloaded, ()) = tokio::join!(manager.load(alice()), async {
            for _ in 0..10 {
                tokio::task::yield_now().await;
            }
            assert!(manager.flags().loading_list);
            store.hold_saves.store(false, Ordering::SeqCst);
            store.release_save.notify_one();
        });
        reloaded.unwrap();
        assert_eq!(manager.items(), vec![movie("a", "Alien"), movie("d", "Dune")]);
    }

    #[tokio::test]
    async fn flush_waits_for_pending_removal() {
        let (manager, store, _) =
            loaded_wheel(vec![movie("a", "Alien"), movie("b", "Brazil")]).await;

        store.hold_removes.store(true, Ordering::SeqCst);
        let (removed, _) = tokio::join!(manager.remove("a"), async {
            store.remove_started.notified().await;
            manager.add("Dune").await.unwrap();
            for _ in 0..10 {
                tokio::task::yield_now().await;
            }
            assert_eq!(store.save_calls.load(Ordering::SeqCst), 0);
            assert!(manager.flags().removing_item);
            assert_eq!(manager.write_phase(), WritePhase::Removing);
            store.release_remove.notify_one();
        });
        removed.unwrap();

        manager.sync().await;
        assert_eq!(store.save_calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.persisted(), vec![movie("b", "Brazil"), movie("d", "Dune")]);
    }

    // -----------------------------------------------------------------------
    // clear
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn clear_empties_list_and_store() {
        let (manager, store, _) =
            loaded_wheel(vec![movie("a", "Alien"), movie("b", "Brazil")]).await;

        manager.clear().await.unwrap();
        assert!(manager.items().is_empty());
        assert!(store.persisted().is_empty());

        manager.load(alice()).await.unwrap();
        assert!(manager.items().is_empty());
    }

    #[tokio::test]
    async fn clear_failure_is_save_failed() {
        let (manager, store, _) = loaded_wheel(vec![movie("a", "Alien")]).await;
        store.fail_save.store(true, Ordering::SeqCst);

        let err = manager.clear().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SaveFailed);
        assert!(manager.items().is_empty());
    }

    #[tokio::test]
    async fn clear_error_resets_last_error() {
        let (manager, _, _) = loaded_wheel(vec![]).await;
        let _ = manager.add("Nope").await;
        assert!(manager.last_error().is_some());
        manager.clear_error();
        assert!(manager.last_error().is_none());
    }

    #[tokio::test]
    async fn only_failed_flushes_are_counted() {
        let (manager, store, _) = loaded_wheel(vec![]).await;
        store.fail_save.store(true, Ordering::SeqCst);

        manager.add("Alien").await.unwrap();
        manager.sync().await;
        let first = manager.view();
        manager.add("Dune").await.unwrap();
        manager.sync().await;
        let second = manager.view();
        assert_eq!(first.flush_failures, 1);
        assert_eq!(second.flush_failures, 2);
        assert_eq!(first.last_error, second.last_error);

        // Failures returned to the caller are not background failures.
        let _ = manager.add("Nonexistent Film").await;
        let _ = manager.clear().await;
        assert_eq!(manager.view().flush_failures, 2);
    }

    #[tokio::test]
    async fn insert_skips_lookup_but_keeps_rules() {
        let (manager, store, resolver) = loaded_wheel(vec![movie("a", "Alien")]).await;

        manager.insert(movie("b", "Brazil")).unwrap();
        let err = manager.insert(movie("a", "Alien")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Duplicate);
        assert_eq!(resolver.calls(), 0);

        manager.sync().await;
        assert_eq!(store.persisted(), vec![movie("a", "Alien"), movie("b", "Brazil")]);
    }

    // -----------------------------------------------------------------------
    // consumed list
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn consumed_list_is_sorted_and_unbounded() {
        let (manager, store, _) = setup(ListKind::Consumed);
        store.inner.insert(
            &alice(),
            ListKind::Consumed,
            vec![movie("d", "Dune"), movie("a", "Alien")],
        );
        manager.load(alice()).await.unwrap();
        assert_eq!(manager.items(), vec![movie("a", "Alien"), movie("d", "Dune")]);

        manager.add("Casablanca").await.unwrap();
        for i in 1..=12 {
            manager.add(&format!("Movie {i:02}")).await.unwrap();
        }
        let items = manager.items();
        assert_eq!(items.len(), 15);
        assert_eq!(items[0].title, "Alien");
        assert_eq!(items[1].title, "Casablanca");
        assert_eq!(items[2].title, "Dune");

        manager.sync().await;
        assert_eq!(store.inner.snapshot(&alice(), ListKind::Consumed).len(), 15);
    }

    #[tokio::test]
    async fn view_updates_are_published() {
        let (manager, _, _) = loaded_wheel(vec![]).await;
        let mut rx = manager.subscribe();
        let _ = rx.borrow_and_update();

        manager.add("Alien").await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().items, vec![movie("a", "Alien")]);
    }
}
