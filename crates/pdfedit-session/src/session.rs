//! Multi-document session state machine
//!
//! A [`Session`] owns the open tabs, their display order and the active tab.
//! After every transition `tab_order` is a permutation of the tab ids and
//! `active_tab_id` is either `None` (no tabs) or one of them.

use crate::error::SessionError;
use crate::snapshot::EditorSnapshot;
use chrono::{DateTime, Utc};
use pdfedit_core::{merge_documents, NamedDocument};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info};
use uuid::Uuid;

/// Persisted record format version
pub const SESSION_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(Uuid);

impl TabId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TabId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One open document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    id: TabId,
    #[serde(with = "crate::base64_bytes")]
    payload: Vec<u8>,
    file_name: String,
    dirty: bool,
    snapshot: EditorSnapshot,
}

impl Tab {
    fn new(payload: Vec<u8>, file_name: String) -> Self {
        Self {
            id: TabId::new(),
            payload,
            file_name,
            dirty: false,
            snapshot: EditorSnapshot::default(),
        }
    }

    pub fn id(&self) -> TabId {
        self.id
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn snapshot(&self) -> &EditorSnapshot {
        &self.snapshot
    }
}

/// Whether incoming files can be opened without asking the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenPlan {
    /// One file into an empty session
    Direct,
    /// The caller must pick an [`OpenChoice`]
    AskUser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenChoice {
    NewTabs,
    MergeIntoCurrent,
}

/// Deserialized only through the persistence layer, which repairs it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    version: u32,
    last_modified: DateTime<Utc>,
    tabs: Vec<Tab>,
    active_tab_id: Option<TabId>,
    tab_order: Vec<TabId>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            version: SESSION_VERSION,
            last_modified: Utc::now(),
            tabs: Vec::new(),
            active_tab_id: None,
            tab_order: Vec::new(),
        }
    }

    /// Rebuild a session from possibly inconsistent parts.
    ///
    /// Unknown or duplicate ids are dropped from `tab_order`, tabs missing
    /// from it are appended, and an invalid active id falls back to the
    /// first tab in order.
    pub(crate) fn repaired(
        last_modified: DateTime<Utc>,
        tabs: Vec<Tab>,
        active_tab_id: Option<TabId>,
        tab_order: Vec<TabId>,
    ) -> Self {
        let mut seen = HashSet::new();
        let tabs: Vec<Tab> = tabs.into_iter().filter(|t| seen.insert(t.id)).collect();

        let mut placed = HashSet::new();
        let mut order: Vec<TabId> = tab_order
            .into_iter()
            .filter(|id| seen.contains(id) && placed.insert(*id))
            .collect();
        order.extend(tabs.iter().map(|t| t.id).filter(|id| placed.insert(*id)));

        let active = active_tab_id
            .filter(|id| seen.contains(id))
            .or_else(|| order.first().copied());

        let session = Self {
            version: SESSION_VERSION,
            last_modified,
            tabs,
            active_tab_id: active,
            tab_order: order,
        };
        session.debug_check();
        session
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn tab(&self, id: TabId) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.id == id)
    }

    pub fn tab_order(&self) -> &[TabId] {
        &self.tab_order
    }

    /// Tabs in display order
    pub fn ordered_tabs(&self) -> impl Iterator<Item = &Tab> {
        self.tab_order.iter().filter_map(|id| self.tab(*id))
    }

    pub fn active_tab_id(&self) -> Option<TabId> {
        self.active_tab_id
    }

    pub fn active_tab(&self) -> Option<&Tab> {
        self.active_tab_id.and_then(|id| self.tab(id))
    }

    fn tab_mut(&mut self, id: TabId) -> Result<&mut Tab, SessionError> {
        self.tabs
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(SessionError::UnknownTab(id))
    }

    fn touch(&mut self) {
        self.last_modified = Utc::now();
        self.debug_check();
    }

    fn debug_check(&self) {
        debug_assert!(
            self.check_invariants().is_ok(),
            "session invariant violated: {:?}",
            self.check_invariants()
        );
    }

    /// Verify the structural invariants, describing the first violation
    pub fn check_invariants(&self) -> Result<(), String> {
        let ids: HashSet<TabId> = self.tabs.iter().map(|t| t.id).collect();
        if ids.len() != self.tabs.len() {
            return Err("duplicate tab id".into());
        }
        let ordered: HashSet<TabId> = self.tab_order.iter().copied().collect();
        if ordered.len() != self.tab_order.len() || ordered != ids {
            return Err(format!(
                "tab order {:?} is not a permutation of tabs {:?}",
                self.tab_order, ids
            ));
        }
        match self.active_tab_id {
            None if !self.tabs.is_empty() => Err("tabs open but none active".into()),
            Some(id) if !ids.contains(&id) => Err(format!("active tab {} is not open", id)),
            _ => Ok(()),
        }
    }

    /// Open `payload` as a new tab, append it to the order and activate it
    pub fn add_tab(&mut self, payload: Vec<u8>, file_name: impl Into<String>) -> TabId {
        let tab = Tab::new(payload, file_name.into());
        let id = tab.id;
        info!(tab = %id, name = %tab.file_name, "Opened tab");
        self.tabs.push(tab);
        self.tab_order.push(id);
        self.active_tab_id = Some(id);
        self.touch();
        id
    }

    /// Close a tab, returning it.
    ///
    /// When the active tab closes, the tab that moves into its position in
    /// the order becomes active (the new last tab if it was last).
    pub fn close_tab(&mut self, id: TabId) -> Result<Tab, SessionError> {
        let index = self
            .tabs
            .iter()
            .position(|t| t.id == id)
            .ok_or(SessionError::UnknownTab(id))?;
        let tab = self.tabs.remove(index);

        let position = self.tab_order.iter().position(|t| *t == id);
        self.tab_order.retain(|t| *t != id);
        if self.active_tab_id == Some(id) {
            self.active_tab_id = match position {
                Some(p) if !self.tab_order.is_empty() => {
                    Some(self.tab_order[p.min(self.tab_order.len() - 1)])
                }
                _ => self.tab_order.first().copied(),
            };
        }
        info!(tab = %id, remaining = self.tabs.len(), "Closed tab");
        self.touch();
        Ok(tab)
    }

    pub fn switch_tab(&mut self, id: TabId) -> Result<(), SessionError> {
        if self.tab(id).is_none() {
            return Err(SessionError::UnknownTab(id));
        }
        self.active_tab_id = Some(id);
        self.touch();
        Ok(())
    }

    /// Move the tab at `from` so it ends up at `to`
    pub fn reorder_tabs(&mut self, from: usize, to: usize) -> Result<(), SessionError> {
        let len = self.tab_order.len();
        for index in [from, to] {
            if index >= len {
                return Err(SessionError::IndexOutOfRange { index, len });
            }
        }
        let id = self.tab_order.remove(from);
        self.tab_order.insert(to, id);
        self.touch();
        Ok(())
    }

    /// Replace a tab's snapshot and dirty flag
    pub fn update_snapshot(
        &mut self,
        id: TabId,
        snapshot: EditorSnapshot,
        dirty: bool,
    ) -> Result<(), SessionError> {
        let tab = self.tab_mut(id)?;
        tab.snapshot = snapshot;
        tab.dirty = dirty;
        self.touch();
        Ok(())
    }

    pub fn plan_open(&self, incoming: usize) -> OpenPlan {
        if self.is_empty() && incoming == 1 {
            OpenPlan::Direct
        } else {
            OpenPlan::AskUser
        }
    }

    /// Open `files`, asking for a `choice` whenever the plan is not direct.
    ///
    /// Returns the ids of the tabs that were created or changed.
    pub fn open_files(
        &mut self,
        files: Vec<NamedDocument>,
        choice: Option<OpenChoice>,
    ) -> Result<Vec<TabId>, SessionError> {
        if files.is_empty() {
            return Ok(Vec::new());
        }
        let choice = match (self.plan_open(files.len()), choice) {
            (OpenPlan::Direct, _) => OpenChoice::NewTabs,
            (OpenPlan::AskUser, Some(choice)) => choice,
            (OpenPlan::AskUser, None) => return Err(SessionError::ChoiceRequired),
        };

        match choice {
            OpenChoice::NewTabs => Ok(files
                .into_iter()
                .map(|f| self.add_tab(f.bytes, f.name))
                .collect()),
            OpenChoice::MergeIntoCurrent => {
                let active = self.active_tab_id.ok_or(SessionError::NoActiveTab)?;
                let current = self.tab(active).ok_or(SessionError::UnknownTab(active))?;
                let mut sources = Vec::with_capacity(files.len() + 1);
                sources.push(NamedDocument::new(current.file_name.clone(), current.payload.clone()));
                sources.extend(files);

                let merged = merge_documents(&sources)?;
                debug!(tab = %active, sources = sources.len(), bytes = merged.len(), "Merged into current tab");
                let tab = self.tab_mut(active)?;
                tab.payload = merged;
                tab.dirty = true;
                self.touch();
                Ok(vec![active])
            }
        }
    }
}
