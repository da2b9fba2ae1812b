//! The editor's live state wired to its collaborators
//!
//! [`Workspace`] owns the session and forwards every transition to the
//! autosaver. Persistence failures are logged and surfaced through
//! [`Autosaver::status`]; they never fail an editing call. Editing calls
//! spawn timers and must run inside a tokio runtime.

use anyhow::Context;
use crate::config::EditorConfig;
use crate::error::{PersistError, SessionError};
use crate::persistence::{RestorePrompt, SessionStore};
use crate::schedule::{Autosaver, SaveStatus};
use crate::session::{OpenChoice, Session, Tab, TabId};
use crate::snapshot::EditorSnapshot;
use crate::store::{FileStore, KvStore};
use crate::tools::ToolTable;
use pdfedit_core::{Export, MutationEngine, NamedDocument};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug)]
pub struct Workspace {
    config: EditorConfig,
    tools: Arc<ToolTable>,
    session: Session,
    store: SessionStore,
    autosaver: Autosaver,
    engine: MutationEngine,
}

impl Workspace {
    /// Build an empty workspace over `store`.
    ///
    /// # Errors
    ///
    /// Fails only when the configured tool table is invalid.
    pub fn new(config: EditorConfig, store: Arc<dyn KvStore>) -> anyhow::Result<Self> {
        let tools = Arc::new(config.tool_table()?);
        let store = SessionStore::new(store);
        let autosaver = Autosaver::new(
            store.clone(),
            config.storage.session_id.clone(),
            config.autosave.debounce(),
        );
        let engine = MutationEngine::new().with_options(config.raster);
        Ok(Self {
            config,
            tools,
            session: Session::new(),
            store,
            autosaver,
            engine,
        })
    }

    /// Build an empty workspace over a [`FileStore`] at `root`, applying the
    /// configured storage quota
    pub async fn open_at(config: EditorConfig, root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        let store = FileStore::open(&root, config.storage.quota_bytes)
            .await
            .with_context(|| format!("Failed to open session store at {}", root.display()))?;
        Self::new(config, Arc::new(store))
    }

    /// Replace the mutation engine, keeping the configured raster options
    pub fn with_engine(mut self, engine: MutationEngine) -> Self {
        self.engine = engine.with_options(self.config.raster);
        self
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn tools(&self) -> Arc<ToolTable> {
        Arc::clone(&self.tools)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn save_status(&self) -> SaveStatus {
        self.autosaver.status()
    }

    fn session_id(&self) -> &str {
        &self.config.storage.session_id
    }

    fn changed(&self) {
        self.autosaver.notify(&self.session);
    }

    pub fn add_tab(&mut self, payload: Vec<u8>, file_name: impl Into<String>) -> TabId {
        let id = self.session.add_tab(payload, file_name);
        self.changed();
        id
    }

    /// Close a tab; closing the last one also clears the stored session
    pub async fn close_tab(&mut self, id: TabId) -> Result<Tab, SessionError> {
        let tab = self.session.close_tab(id)?;
        if self.session.is_empty() {
            self.autosaver.cancel_and_clear().await;
        } else {
            self.changed();
        }
        Ok(tab)
    }

    pub fn switch_tab(&mut self, id: TabId) -> Result<(), SessionError> {
        self.session.switch_tab(id)?;
        self.changed();
        Ok(())
    }

    pub fn reorder_tabs(&mut self, from: usize, to: usize) -> Result<(), SessionError> {
        self.session.reorder_tabs(from, to)?;
        self.changed();
        Ok(())
    }

    pub fn update_snapshot(
        &mut self,
        id: TabId,
        snapshot: EditorSnapshot,
        dirty: bool,
    ) -> Result<(), SessionError> {
        self.session.update_snapshot(id, snapshot, dirty)?;
        self.changed();
        Ok(())
    }

    pub fn open_files(
        &mut self,
        files: Vec<NamedDocument>,
        choice: Option<OpenChoice>,
    ) -> Result<Vec<TabId>, SessionError> {
        let opened = self.session.open_files(files, choice)?;
        if !opened.is_empty() {
            self.changed();
        }
        Ok(opened)
    }

    /// Bake a tab's snapshot into a fresh copy of its document.
    ///
    /// Runs on the blocking pool; the session is not modified.
    pub async fn export_tab(&self, id: TabId, rasterize: bool) -> Result<Export, SessionError> {
        let tab = self.session.tab(id).ok_or(SessionError::UnknownTab(id))?;
        let payload = tab.payload().to_vec();
        let form_values = tab.snapshot().form_values.clone();
        let annotations = tab.snapshot().annotations();
        let engine = self.engine.clone();

        let export = tokio::task::spawn_blocking(move || {
            engine.apply(&payload, &form_values, &annotations, rasterize)
        })
        .await
        .map_err(|e| SessionError::Task(e.to_string()))??;

        info!(tab = %id, bytes = export.bytes.len(), warnings = export.warnings.len(), "Exported tab");
        Ok(export)
    }

    /// Look for a stored session to offer for restore
    pub async fn restore_prompt(&self) -> Result<Option<RestorePrompt>, PersistError> {
        self.store.restore_prompt(self.session_id()).await
    }

    /// Make a restored session the live one
    pub fn adopt(&mut self, session: Session) {
        info!(tabs = session.len(), "Adopted restored session");
        self.session = session;
        self.changed();
    }

    /// Open the pending handoff document, if any, as a new tab
    pub async fn receive_handoff(&mut self) -> Option<TabId> {
        let handoff = match self.store.load_pending_handoff().await {
            Ok(handoff) => handoff?,
            Err(e) => {
                warn!(error = %e, "Could not read pending handoff");
                return None;
            }
        };
        if handoff.session_id != self.session_id() {
            info!(
                from = %handoff.session_id,
                to = %self.session_id(),
                "Handoff addressed to another session, opening it here"
            );
        }
        Some(self.add_tab(handoff.bytes, handoff.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::PendingHandoff;
    use crate::store::MemoryStore;
    use crate::test_support::blank_pdf;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tokio::time::sleep;

    fn workspace() -> Workspace {
        Workspace::new(EditorConfig::default(), Arc::new(MemoryStore::new())).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_transitions_are_autosaved() {
        let mut ws = workspace();
        let a = ws.add_tab(blank_pdf(1), "a.pdf");
        ws.add_tab(blank_pdf(2), "b.pdf");
        ws.switch_tab(a).unwrap();
        sleep(Duration::from_millis(600)).await;

        let stored = ws.store().load_session("default").await.unwrap().unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored.active_tab_id(), Some(a));
        assert!(matches!(ws.save_status(), SaveStatus::Saved(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_closing_last_tab_clears_store() {
        let mut ws = workspace();
        let a = ws.add_tab(blank_pdf(1), "a.pdf");
        sleep(Duration::from_millis(600)).await;
        assert!(ws.store().has_session("default").await);

        ws.close_tab(a).await.unwrap();
        sleep(Duration::from_millis(600)).await;
        assert!(!ws.store().has_session("default").await);
    }

    #[tokio::test]
    async fn test_export_unknown_tab() {
        let ws = workspace();
        let stranger = TabId::new();
        assert!(matches!(
            ws.export_tab(stranger, false).await,
            Err(SessionError::UnknownTab(id)) if id == stranger
        ));
    }

    #[tokio::test]
    async fn test_export_without_edits() {
        let mut ws = workspace();
        let id = ws.add_tab(blank_pdf(2), "a.pdf");
        let export = ws.export_tab(id, false).await.unwrap();
        assert_eq!(pdfedit_core::get_page_count(&export.bytes).unwrap(), 2);
        assert!(export.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_export_rasterized_needs_renderer() {
        let mut ws = workspace();
        let id = ws.add_tab(blank_pdf(1), "a.pdf");
        assert!(matches!(
            ws.export_tab(id, true).await,
            Err(SessionError::Edit(pdfedit_core::EditError::RendererUnavailable))
        ));
    }

    #[tokio::test]
    async fn test_receive_handoff_once() {
        let mut ws = workspace();
        ws.store()
            .save_pending_handoff(&PendingHandoff {
                session_id: "default".into(),
                name: "handed.pdf".into(),
                bytes: blank_pdf(1),
            })
            .await
            .unwrap();

        let id = ws.receive_handoff().await.unwrap();
        assert_eq!(ws.session().tab(id).unwrap().file_name(), "handed.pdf");
        assert_eq!(ws.receive_handoff().await, None);
    }

    #[test]
    fn test_invalid_tool_table_rejected() {
        let config = EditorConfig::from_toml_str("").map(|mut c| {
            c.tools = Some(Vec::new());
            c
        });
        let result = Workspace::new(config.unwrap(), Arc::new(MemoryStore::new()));
        assert!(result.is_err());
    }
}
