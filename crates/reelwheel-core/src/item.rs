// Item model and list identity.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Upper bound on the number of items a wheel may hold.
pub const MAX_WHEEL_ITEMS: usize = 10;

/// A selectable entry, identified by `id`. Two items with the same `id` are
/// the same item even if their titles differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub title: String,
    pub poster_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Item {
    pub fn new(id: impl Into<String>, title: impl Into<String>, poster_ref: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            poster_ref: poster_ref.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Identity under which lists are persisted and loaded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which of the two per-owner lists a manager or store call addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    /// Bounded list of candidates drawn by the wheel, kept in insertion order.
    Wheel,
    /// Unbounded list of items already watched, kept sorted by title.
    Consumed,
}

impl ListKind {
    /// Name of the list in the persistent store.
    pub fn list_name(self) -> &'static str {
        match self {
            ListKind::Wheel => "wheel",
            ListKind::Consumed => "consumed",
        }
    }

    /// Maximum number of entries, or `None` when the list is unbounded.
    pub fn capacity(self) -> Option<usize> {
        match self {
            ListKind::Wheel => Some(MAX_WHEEL_ITEMS),
            ListKind::Consumed => None,
        }
    }

    /// Whether the list is kept sorted by title for display.
    pub fn sorted_by_title(self) -> bool {
        matches!(self, ListKind::Consumed)
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.list_name())
    }
}

/// Order two items by title, ignoring case first and falling back to the
/// exact title so the ordering is total.
pub fn compare_titles(a: &Item, b: &Item) -> Ordering {
    a.title
        .to_lowercase()
        .cmp(&b.title.to_lowercase())
        .then_with(|| a.title.cmp(&b.title))
}

/// Sort a slice of items by title in place (stable).
pub fn sort_by_title(items: &mut [Item]) {
    items.sort_by(compare_titles);
}
