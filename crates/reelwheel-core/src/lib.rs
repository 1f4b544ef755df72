// Core of the movie wheel: the item model, the spin engine, the list
// synchronization manager, and the collaborator seams they depend on.

pub mod config;
pub mod db;
pub mod error;
pub mod item;
pub mod list;
pub mod resolver;
pub mod spin;
pub mod store;

pub use error::{ErrorKind, ListError, ResolveError, StoreError};
pub use item::{Item, ListKind, OwnerId};
pub use list::{ListManager, ListView, OperationFlags, WritePhase};
pub use resolver::TitleResolver;
pub use spin::{SpinEngine, SpinHandle, SpinOutcome, SpinStart, WheelView};
pub use store::{MemoryStore, PersistentStore};
