//! Session snapshots and the pending-document handoff slot
//!
//! The store only mirrors the live session. Corrupt records are wiped on
//! load instead of being reported, and a restored session is handed out
//! through [`RestorePrompt`] so it never becomes live without a choice.

use crate::error::PersistError;
use crate::session::{Session, Tab, TabId, SESSION_VERSION};
use crate::store::{KvStore, Partition};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

const HANDOFF_KEY: &str = "pending";

/// Small record written next to each session so existence checks stay cheap
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionMarker {
    last_modified: DateTime<Utc>,
    tab_count: usize,
}

/// A single document carried across an entry-point transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingHandoff {
    pub session_id: String,
    pub name: String,
    #[serde(with = "crate::base64_bytes")]
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KvStore>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}

impl SessionStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Serialize and write `session`, then its existence marker.
    ///
    /// # Errors
    ///
    /// `QuotaExceeded` leaves the previously saved session readable. When
    /// the record fits but the marker does not, the previous record is put
    /// back (or the new one removed if there was none).
    pub async fn save_session(&self, id: &str, session: &Session) -> Result<(), PersistError> {
        let record = serde_json::to_vec(session)?;
        let marker = serde_json::to_vec(&SessionMarker {
            last_modified: session.last_modified(),
            tab_count: session.len(),
        })?;
        let size = record.len();

        let previous = self.store.get(Partition::Sessions, id).await?;
        self.store.put(Partition::Sessions, id, record).await?;
        if let Err(e) = self.store.put(Partition::Markers, id, marker).await {
            warn!(session = id, error = %e, "Session marker not written, rolling back record");
            let rollback = match previous {
                Some(bytes) => self.store.put(Partition::Sessions, id, bytes).await,
                None => self.store.delete(Partition::Sessions, id).await,
            };
            if let Err(rollback_error) = rollback {
                warn!(session = id, error = %rollback_error, "Rollback of session record failed");
            }
            return Err(e);
        }
        debug!(session = id, bytes = size, tabs = session.len(), "Saved session");
        Ok(())
    }

    /// Load and repair a stored session.
    ///
    /// Returns `Ok(None)` when nothing is stored, when the record is
    /// structurally invalid, or when no tab survives validation; the last
    /// two also wipe the record.
    pub async fn load_session(&self, id: &str) -> Result<Option<Session>, PersistError> {
        let Some(bytes) = self.store.get(Partition::Sessions, id).await? else {
            return Ok(None);
        };

        let Some(record) = parse_record(&bytes) else {
            warn!(session = id, "Stored session is malformed, discarding it");
            self.clear_session(id).await;
            return Ok(None);
        };

        let session = repair(record);
        if session.is_empty() {
            warn!(session = id, "Stored session has no usable tabs, discarding it");
            self.clear_session(id).await;
            return Ok(None);
        }
        info!(session = id, tabs = session.len(), "Loaded session");
        Ok(Some(session))
    }

    /// Load a session wrapped so the caller has to restore or discard it
    pub async fn restore_prompt(&self, id: &str) -> Result<Option<RestorePrompt>, PersistError> {
        Ok(self.load_session(id).await?.map(|session| RestorePrompt {
            store: self.clone(),
            id: id.to_string(),
            session,
        }))
    }

    /// Delete the record and its marker, ignoring failures
    pub async fn clear_session(&self, id: &str) {
        for partition in [Partition::Sessions, Partition::Markers] {
            if let Err(e) = self.store.delete(partition, id).await {
                debug!(session = id, ?partition, error = %e, "Ignoring failed delete");
            }
        }
    }

    /// Whether a session marker exists; never opens the full record
    pub async fn has_session(&self, id: &str) -> bool {
        matches!(self.store.get(Partition::Markers, id).await, Ok(Some(_)))
    }

    /// Overwrite the single handoff slot
    pub async fn save_pending_handoff(&self, handoff: &PendingHandoff) -> Result<(), PersistError> {
        let record = serde_json::to_vec(handoff)?;
        self.store.put(Partition::Handoff, HANDOFF_KEY, record).await
    }

    /// Take the handoff record; a successful read always empties the slot
    pub async fn load_pending_handoff(&self) -> Result<Option<PendingHandoff>, PersistError> {
        let Some(bytes) = self.store.get(Partition::Handoff, HANDOFF_KEY).await? else {
            return Ok(None);
        };
        self.store.delete(Partition::Handoff, HANDOFF_KEY).await?;
        match serde_json::from_slice(&bytes) {
            Ok(handoff) => Ok(Some(handoff)),
            Err(e) => {
                warn!(error = %e, "Dropping unreadable handoff record");
                Ok(None)
            }
        }
    }
}

/// A stored session awaiting an explicit restore-or-discard decision
#[must_use = "a restored session has to be either restored or discarded"]
#[derive(Debug)]
pub struct RestorePrompt {
    store: SessionStore,
    id: String,
    session: Session,
}

impl RestorePrompt {
    /// The session that would be restored
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn restore(self) -> Session {
        info!(session = %self.id, tabs = self.session.len(), "Restoring session");
        self.session
    }

    /// Drop the stored session and start empty
    pub async fn discard(self) {
        info!(session = %self.id, "Discarding stored session");
        self.store.clear_session(&self.id).await;
    }
}

struct RawRecord {
    last_modified: DateTime<Utc>,
    tabs: Vec<Value>,
    active_tab_id: Option<TabId>,
    tab_order: Vec<Value>,
}

fn parse_record(bytes: &[u8]) -> Option<RawRecord> {
    let mut value: Value = serde_json::from_slice(bytes).ok()?;
    let object = value.as_object_mut()?;
    let version = object.get("version")?.as_u64()?;
    if version != u64::from(SESSION_VERSION) {
        return None;
    }
    let tabs = match object.remove("tabs")? {
        Value::Array(tabs) => tabs,
        _ => return None,
    };
    let tab_order = match object.remove("tabOrder")? {
        Value::Array(order) => order,
        _ => return None,
    };
    let last_modified = object
        .remove("lastModified")
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_else(Utc::now);
    let active_tab_id = object
        .remove("activeTabId")
        .and_then(|v| serde_json::from_value(v).ok());

    Some(RawRecord {
        last_modified,
        tabs,
        active_tab_id,
        tab_order,
    })
}

fn repair(record: RawRecord) -> Session {
    let tabs: Vec<Tab> = record
        .tabs
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<Tab>(value) {
            Ok(tab) if usable(&tab) => Some(tab),
            Ok(tab) => {
                warn!(tab = %tab.id(), name = tab.file_name(), "Dropping tab with unusable payload");
                None
            }
            Err(e) => {
                warn!(error = %e, "Dropping malformed tab record");
                None
            }
        })
        .collect();
    let order = record
        .tab_order
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect();
    Session::repaired(record.last_modified, tabs, record.active_tab_id, order)
}

fn usable(tab: &Tab) -> bool {
    !tab.payload().is_empty() && pdfedit_core::get_page_count(tab.payload()).is_ok()
}
