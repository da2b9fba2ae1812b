use crate::session::TabId;
use pdfedit_core::EditError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No tab with id {0}")]
    UnknownTab(TabId),

    #[error("Tab index {index} is out of range (session has {len} tabs)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("A tab is already open: choose between opening new tabs and merging into the current document")]
    ChoiceRequired,

    #[error("No active tab")]
    NoActiveTab,

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error("Background task failed: {0}")]
    Task(String),
}

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Write of {size} bytes exceeds store capacity ({used} of {capacity} bytes in use)")]
    QuotaExceeded { size: u64, used: u64, capacity: u64 },

    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize record: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PersistError {
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, PersistError::QuotaExceeded { .. })
    }
}
