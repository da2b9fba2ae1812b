//! Multi-document editing sessions
//!
//! Tracks the open tabs of an editor, persists them through a durable
//! key-value store with debounced writes, and hands tab contents to the
//! [`pdfedit_core::MutationEngine`] for export.
//!
//! - [`Session`]: tabs, their order and the active tab
//! - [`SessionStore`]: crash-safe snapshots plus the pending handoff slot
//! - [`Autosaver`] and [`ZoomController`]: debounced background work
//! - [`Workspace`]: all of the above wired together

pub mod config;
pub mod error;
pub mod persistence;
pub mod schedule;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod telemetry;
pub mod tools;
pub mod workspace;

#[cfg(test)]
mod test_support;

pub use config::{AutosaveConfig, EditorConfig, StorageConfig, ZoomConfig};
pub use error::{PersistError, SessionError};
pub use persistence::{PendingHandoff, RestorePrompt, SessionStore};
pub use schedule::{Autosaver, CancellationToken, Debouncer, SaveStatus, ZoomController};
pub use session::{OpenChoice, OpenPlan, Session, Tab, TabId};
pub use snapshot::EditorSnapshot;
pub use store::{FileStore, KvStore, MemoryStore, Partition};
pub use tools::{ToolKind, ToolSpec, ToolTable};
pub use workspace::Workspace;

pub(crate) mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
