// Error taxonomy for list operations and their collaborators.

use std::fmt;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Collaborator errors
// ---------------------------------------------------------------------------

/// Failure reported by a [`PersistentStore`](crate::store::PersistentStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("stored list is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("store task failed: {0}")]
    Task(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Failure reported by a [`TitleResolver`](crate::resolver::TitleResolver).
/// "No match" is not an error; resolvers return `Ok(None)` for that.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("title lookup is not configured")]
    NotConfigured,

    #[error("title lookup request failed: {0}")]
    Transport(String),

    #[error("title lookup returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("title lookup response could not be parsed: {0}")]
    Parse(String),
}

// ---------------------------------------------------------------------------
// ListError
// ---------------------------------------------------------------------------

/// Kind of a [`ListError`], for callers that branch on the condition rather
/// than on its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    CapacityExceeded,
    Duplicate,
    NotFound,
    ResolutionFailed,
    LoadFailed,
    SaveFailed,
    RemoveFailed,
    OwnerMissing,
}

impl ErrorKind {
    /// Stable kebab-case name of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::CapacityExceeded => "capacity-exceeded",
            ErrorKind::Duplicate => "duplicate",
            ErrorKind::NotFound => "not-found",
            ErrorKind::ResolutionFailed => "resolution-failed",
            ErrorKind::LoadFailed => "load-failed",
            ErrorKind::SaveFailed => "save-failed",
            ErrorKind::RemoveFailed => "remove-failed",
            ErrorKind::OwnerMissing => "owner-missing",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every condition a list operation reports. None of them is fatal; each is
/// recoverable by retrying or by correcting the input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ListError {
    #[error("the list is already full ({max} items)")]
    CapacityExceeded { max: usize },

    #[error("\"{title}\" is already on the list")]
    Duplicate { id: String, title: String },

    #[error("no match found for \"{title}\"")]
    NotFound { title: String },

    #[error("could not look up \"{title}\": {message}")]
    ResolutionFailed { title: String, message: String },

    #[error("failed to load the saved list: {message}")]
    LoadFailed { message: String },

    #[error("failed to save the list: {message}")]
    SaveFailed { message: String },

    #[error("failed to remove item {id}: {message}")]
    RemoveFailed { id: String, message: String },

    #[error("no owner is selected")]
    OwnerMissing,
}

impl ListError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ListError::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            ListError::Duplicate { .. } => ErrorKind::Duplicate,
            ListError::NotFound { .. } => ErrorKind::NotFound,
            ListError::ResolutionFailed { .. } => ErrorKind::ResolutionFailed,
            ListError::LoadFailed { .. } => ErrorKind::LoadFailed,
            ListError::SaveFailed { .. } => ErrorKind::SaveFailed,
            ListError::RemoveFailed { .. } => ErrorKind::RemoveFailed,
            ListError::OwnerMissing => ErrorKind::OwnerMissing,
        }
    }

    pub(crate) fn load(err: &StoreError) -> Self {
        ListError::LoadFailed {
            message: err.to_string(),
        }
    }

    pub(crate) fn save(err: &StoreError) -> Self {
        ListError::SaveFailed {
            message: err.to_string(),
        }
    }

    pub(crate) fn remove(id: &str, err: &StoreError) -> Self {
        ListError::RemoveFailed {
            id: id.to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn resolution(title: &str, err: &ResolveError) -> Self {
        ListError::ResolutionFailed {
            title: title.to_string(),
            message: err.to_string(),
        }
    }
}
