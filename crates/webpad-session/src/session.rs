use crate::error::SessionError;
use crate::events::{SessionCommand, SessionEvent};
use crate::tabs::TabSet;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use webpad_core::{
    ApiResponse, CreateFileRequest, CreateFolderRequest, FileType, OpenTab, TreeIndex, TreeNode,
};
use webpad_gateway::{RemoteOperation, RemoteStore};
use webpad_storage::{SessionSnapshot, SnapshotBackend};

const EVENT_CAPACITY: usize = 256;

pub(crate) type SharedTabs = Arc<Mutex<TabSet>>;

pub(crate) fn lock_tabs(tabs: &SharedTabs) -> MutexGuard<'_, TabSet> {
    tabs.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Editing session over a remote project: the tree mirror, the open tabs
/// and the durable snapshot of those tabs.
///
/// Mutating operations take `&mut self`, so at most one runs at a time and
/// each finishes, remote call included, before the next starts.
pub struct EditorSession {
    pub(crate) remote: Arc<dyn RemoteStore>,
    pub(crate) tree: TreeIndex,
    pub(crate) tabs: SharedTabs,
    // Mutex keeps the session Sync while operations are suspended.
    snapshots: Option<Mutex<Box<dyn SnapshotBackend>>>,
    last_error: Option<String>,
    online: bool,
    pub(crate) events: broadcast::Sender<SessionEvent>,
}

impl EditorSession {
    pub fn new(remote: Arc<dyn RemoteStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            remote,
            tree: TreeIndex::default(),
            tabs: Arc::new(Mutex::new(TabSet::new())),
            snapshots: None,
            last_error: None,
            online: false,
            events,
        }
    }

    pub fn with_snapshot_backend(mut self, backend: Box<dyn SnapshotBackend>) -> Self {
        self.snapshots = Some(Mutex::new(backend));
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn tree(&self) -> &TreeIndex {
        &self.tree
    }

    pub fn open_tabs(&self) -> Vec<OpenTab> {
        self.lock_tabs().tabs().to_vec()
    }

    pub fn active_id(&self) -> Option<String> {
        self.lock_tabs().active_id().map(str::to_string)
    }

    pub fn active_tab(&self) -> Option<OpenTab> {
        self.lock_tabs().active().cloned()
    }

    pub fn tab(&self, id: &str) -> Option<OpenTab> {
        self.lock_tabs().get(id).cloned()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.lock_tabs().has_unsaved_changes()
    }

    pub fn dirty_ids(&self) -> Vec<String> {
        self.lock_tabs().dirty_ids()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    /// Probes the remote health endpoint. An unreachable server is logged,
    /// not recorded as the last error.
    pub async fn check_connection(&mut self) -> bool {
        let response = self.remote.health_check().await;
        let online = response.success;
        if !online {
            warn!(
                event = "connection_check_failed",
                reason = %response.error_message()
            );
        }
        if online != self.online {
            info!(event = "connection_changed", online);
            self.online = online;
            self.emit(SessionEvent::ConnectionChanged { online });
        }
        online
    }

    /// Opens a file tab, or selects it when already open. Unknown ids and
    /// folders are ignored.
    pub async fn open(&mut self, id: &str) -> Result<(), SessionError> {
        let already_open = self.lock_tabs().contains(id);
        if already_open {
            let changed = self.lock_tabs().activate(id);
            if changed {
                self.emit_active();
                self.persist_snapshot();
            }
            return Ok(());
        }

        let node = match self.tree.find(id) {
            Some(node) if node.resolved_file_type().is_some() => node.clone(),
            _ => {
                debug!(event = "open_ignored", id);
                return Ok(());
            }
        };

        let response = self.remote.get_file_content(id).await;
        let file = self.expect_data(RemoteOperation::GetFileContent, response)?;
        let Some(tab) = OpenTab::from_node(&node, file.content) else {
            return Ok(());
        };

        let added = self.lock_tabs().push(tab);
        if added {
            debug!(event = "tab_opened", id);
            self.emit(SessionEvent::TabOpened { id: id.to_string() });
        }
        self.emit_active();
        self.persist_snapshot();
        Ok(())
    }

    /// Closes a tab, discarding unsaved edits. Returns whether a tab closed.
    pub fn close(&mut self, id: &str) -> bool {
        let (removed, active_before, active_after) = {
            let mut tabs = self.lock_tabs();
            let before = tabs.active_id().map(str::to_string);
            let removed = tabs.remove(id);
            (removed, before, tabs.active_id().map(str::to_string))
        };
        let Some(tab) = removed else {
            return false;
        };
        if tab.is_dirty {
            debug!(event = "unsaved_changes_discarded", id);
        }
        self.emit(SessionEvent::TabClosed { id: id.to_string() });
        if active_before != active_after {
            self.emit(SessionEvent::ActiveChanged { id: active_after });
        }
        self.persist_snapshot();
        true
    }

    /// Replaces a tab's buffer and marks it dirty. No I/O.
    pub fn update_content(&mut self, id: &str, content: impl Into<String>) -> bool {
        let updated = self.lock_tabs().update_content(id, content.into());
        if updated {
            self.emit(SessionEvent::TabUpdated { id: id.to_string() });
        }
        updated
    }

    /// Pushes a dirty tab's buffer to the remote. Clean or unknown tabs are
    /// left alone.
    pub async fn save(&mut self, id: &str) -> Result<(), SessionError> {
        let content = self
            .lock_tabs()
            .get(id)
            .filter(|tab| tab.is_dirty)
            .map(|tab| tab.content.clone());
        let Some(content) = content else {
            return Ok(());
        };

        let response = self.remote.update_file_content(id, &content).await;
        self.expect_success(RemoteOperation::UpdateFileContent, response)?;

        self.lock_tabs().mark_saved(id, &content);
        self.tree.set_content(id, &content);
        debug!(event = "tab_saved", id, bytes = content.len());
        self.emit(SessionEvent::TabSaved { id: id.to_string() });
        Ok(())
    }

    /// Saves every dirty tab in open order. A failure does not stop the
    /// remaining saves; the last one is returned.
    pub async fn save_all(&mut self) -> Result<(), SessionError> {
        let mut outcome = Ok(());
        for id in self.dirty_ids() {
            if let Err(err) = self.save(&id).await {
                outcome = Err(err);
            }
        }
        outcome
    }

    pub async fn create_file(
        &mut self,
        name: &str,
        file_type: FileType,
        parent_id: Option<&str>,
    ) -> Result<TreeNode, SessionError> {
        let request = CreateFileRequest {
            name: name.to_string(),
            file_type,
            parent_id: parent_id.map(str::to_string),
        };
        let response = self.remote.create_file(&request).await;
        let created = self.expect_data(RemoteOperation::CreateFile, response)?;
        info!(event = "file_created", id = %created.id, name);
        self.refresh_after_mutation().await;
        Ok(created)
    }

    pub async fn create_folder(
        &mut self,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<TreeNode, SessionError> {
        let request = CreateFolderRequest {
            name: name.to_string(),
            parent_id: parent_id.map(str::to_string),
        };
        let response = self.remote.create_folder(&request).await;
        let created = self.expect_data(RemoteOperation::CreateFolder, response)?;
        info!(event = "folder_created", id = %created.id, name);
        self.refresh_after_mutation().await;
        Ok(created)
    }

    /// Deletes an item remotely, then closes every tab it backed. For a
    /// folder that is every file anywhere beneath it.
    pub async fn delete_item(&mut self, id: &str) -> Result<(), SessionError> {
        let doomed = match self.tree.find(id) {
            Some(node) if node.is_folder() => self.tree.file_ids_under(id),
            _ => vec![id.to_string()],
        };

        let response = self.remote.delete_item(id).await;
        self.expect_success(RemoteOperation::DeleteItem, response)?;
        info!(event = "item_deleted", id, files = doomed.len());

        self.close_where(|tab| doomed.contains(&tab.id));
        self.refresh_after_mutation().await;
        Ok(())
    }

    /// Flips a folder's expand flag once the remote accepts the toggle.
    pub async fn toggle_folder(&mut self, id: &str) -> Result<(), SessionError> {
        let response = self.remote.toggle_folder(id).await;
        self.expect_success(RemoteOperation::ToggleFolder, response)?;
        if self.tree.toggle(id) {
            self.emit(SessionEvent::FolderToggled { id: id.to_string() });
        }
        Ok(())
    }

    /// Resets the remote project and discards the whole session with it.
    pub async fn reset_project(&mut self) -> Result<(), SessionError> {
        let response = self.remote.reset_project().await;
        self.expect_success(RemoteOperation::ResetProject, response)?;

        self.lock_tabs().clear();
        self.clear_snapshot();
        info!(event = "project_reset");
        self.emit(SessionEvent::SessionReset);
        self.emit(SessionEvent::ActiveChanged { id: None });
        self.refresh_after_mutation().await;
        Ok(())
    }

    /// Runs one command to completion.
    pub async fn dispatch(&mut self, command: SessionCommand) -> Result<(), SessionError> {
        match command {
            SessionCommand::Open { id } => self.open(&id).await,
            SessionCommand::Close { id } => {
                self.close(&id);
                Ok(())
            }
            SessionCommand::UpdateContent { id, content } => {
                self.update_content(&id, content);
                Ok(())
            }
            SessionCommand::Save { id } => self.save(&id).await,
            SessionCommand::SaveAll => self.save_all().await,
            SessionCommand::CreateFile {
                name,
                file_type,
                parent_id,
            } => self
                .create_file(&name, file_type, parent_id.as_deref())
                .await
                .map(|_| ()),
            SessionCommand::CreateFolder { name, parent_id } => self
                .create_folder(&name, parent_id.as_deref())
                .await
                .map(|_| ()),
            SessionCommand::Delete { id } => self.delete_item(&id).await,
            SessionCommand::ToggleFolder { id } => self.toggle_folder(&id).await,
            SessionCommand::Reset => self.reset_project().await,
            SessionCommand::Refresh => self.refresh_tree().await,
            SessionCommand::ClearError => {
                self.clear_error();
                Ok(())
            }
        }
    }

    /// Executes queued commands strictly in arrival order until every sender
    /// is dropped. Failures are already recorded as the last error.
    pub async fn run(&mut self, mut commands: mpsc::Receiver<SessionCommand>) -> usize {
        let mut handled = 0;
        while let Some(command) = commands.recv().await {
            let name = command.name();
            if let Err(err) = self.dispatch(command).await {
                debug!(event = "command_failed", command = name, error = %err);
            }
            handled += 1;
        }
        debug!(event = "command_queue_closed", handled);
        handled
    }

    pub(crate) fn lock_tabs(&self) -> MutexGuard<'_, TabSet> {
        lock_tabs(&self.tabs)
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }

    pub(crate) fn emit_active(&self) {
        let id = self.active_id();
        self.emit(SessionEvent::ActiveChanged { id });
    }

    /// Closes every tab matching `doomed`, reselecting and persisting once.
    pub(crate) fn close_where(&mut self, mut doomed: impl FnMut(&OpenTab) -> bool) -> Vec<String> {
        let (removed, active_before, active_after) = {
            let mut tabs = self.lock_tabs();
            let before = tabs.active_id().map(str::to_string);
            let removed = tabs.retain(|tab| !doomed(tab));
            (removed, before, tabs.active_id().map(str::to_string))
        };
        if removed.is_empty() {
            return removed;
        }
        for id in &removed {
            self.emit(SessionEvent::TabClosed { id: id.clone() });
        }
        if active_before != active_after {
            self.emit(SessionEvent::ActiveChanged { id: active_after });
        }
        self.persist_snapshot();
        removed
    }

    /// Records a failure as the last error and hands it back to the caller.
    pub(crate) fn raise(
        &mut self,
        operation: RemoteOperation,
        message: impl Into<String>,
    ) -> SessionError {
        let err = SessionError::remote(operation, message);
        warn!(
            event = "session_operation_failed",
            operation = operation.as_str(),
            reason = %err
        );
        self.last_error = Some(err.message().to_string());
        self.emit(SessionEvent::ErrorRaised {
            message: err.message().to_string(),
        });
        err
    }

    pub(crate) fn expect_data<T>(
        &mut self,
        operation: RemoteOperation,
        response: ApiResponse<T>,
    ) -> Result<T, SessionError> {
        match response.into_result() {
            Ok(Some(data)) => Ok(data),
            Ok(None) => Err(self.raise(operation, format!("{operation} returned no data"))),
            Err(message) => Err(self.raise(operation, message)),
        }
    }

    fn expect_success(
        &mut self,
        operation: RemoteOperation,
        response: ApiResponse<Value>,
    ) -> Result<(), SessionError> {
        match response.into_result() {
            Ok(_) => Ok(()),
            Err(message) => Err(self.raise(operation, message)),
        }
    }

    /// The mutation itself succeeded; a failed refresh is already recorded
    /// as the last error and the previous tree stays in place.
    async fn refresh_after_mutation(&mut self) {
        if let Err(err) = self.refresh_tree().await {
            debug!(event = "refresh_after_mutation_failed", error = %err);
        }
    }

    pub(crate) fn load_snapshot(&self) -> Option<SessionSnapshot> {
        let backend = self.snapshots.as_ref()?;
        let mut backend = backend.lock().unwrap_or_else(PoisonError::into_inner);
        match backend.load() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(event = "snapshot_load_failed", error = %err);
                None
            }
        }
    }

    pub(crate) fn persist_snapshot(&self) {
        let Some(backend) = self.snapshots.as_ref() else {
            return;
        };
        let snapshot = self.lock_tabs().snapshot();
        let mut backend = backend.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = backend.save(&snapshot) {
            warn!(event = "snapshot_save_failed", error = %err);
        }
    }

    fn clear_snapshot(&self) {
        let Some(backend) = self.snapshots.as_ref() else {
            return;
        };
        let mut backend = backend.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = backend.clear() {
            warn!(event = "snapshot_clear_failed", error = %err);
        }
    }
}
