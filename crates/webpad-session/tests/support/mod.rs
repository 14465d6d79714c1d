#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, Notify};
use webpad_core::{
    ApiResponse, CreateFileRequest, CreateFolderRequest, FileContent, FileType, OpenTab, TreeNode,
};
use webpad_gateway::{InMemoryRemoteStore, RemoteStore};
use webpad_session::{EditorSession, SessionEvent};
use webpad_storage::{SessionSnapshot, SnapshotBackend, StorageError};

#[derive(Debug, Default)]
pub struct Recorded {
    pub current: Option<SessionSnapshot>,
    pub saves: usize,
    pub clears: usize,
    pub fail_saves: bool,
}

/// Snapshot backend that keeps everything in memory and lets the test
/// inspect what the session wrote.
#[derive(Clone, Default)]
pub struct RecordingBackend {
    state: Arc<Mutex<Recorded>>,
}

impl RecordingBackend {
    pub fn with_snapshot(snapshot: SessionSnapshot) -> Self {
        let backend = Self::default();
        backend.state.lock().expect("backend lock").current = Some(snapshot);
        backend
    }

    pub fn saves(&self) -> usize {
        self.state.lock().expect("backend lock").saves
    }

    pub fn clears(&self) -> usize {
        self.state.lock().expect("backend lock").clears
    }

    pub fn current(&self) -> Option<SessionSnapshot> {
        self.state.lock().expect("backend lock").current.clone()
    }

    pub fn fail_saves(&self) {
        self.state.lock().expect("backend lock").fail_saves = true;
    }
}

impl SnapshotBackend for RecordingBackend {
    fn load(&mut self) -> Result<Option<SessionSnapshot>, StorageError> {
        Ok(self.state.lock().expect("backend lock").current.clone())
    }

    fn save(&mut self, snapshot: &SessionSnapshot) -> Result<(), StorageError> {
        let mut state = self.state.lock().expect("backend lock");
        state.saves += 1;
        if state.fail_saves {
            return Err(StorageError::Serialization("disk unavailable".to_string()));
        }
        state.current = Some(snapshot.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        let mut state = self.state.lock().expect("backend lock");
        state.clears += 1;
        state.current = None;
        Ok(())
    }
}

/// Remote store whose content fetch for one id blocks until released.
/// With `reading_first` the content is read before blocking, so the fetch
/// carries whatever the remote held at that moment.
pub struct GatedRemote {
    inner: Arc<InMemoryRemoteStore>,
    gated_id: String,
    gate: Arc<Notify>,
    reached: Arc<Notify>,
    read_first: bool,
}

impl GatedRemote {
    pub fn new(inner: Arc<InMemoryRemoteStore>, gated_id: &str) -> (Self, Arc<Notify>) {
        let (remote, gate, _reached) = Self::build(inner, gated_id, false);
        (remote, gate)
    }

    /// Returns the remote, the release gate and a signal raised once the
    /// gated fetch has read its content.
    pub fn reading_first(
        inner: Arc<InMemoryRemoteStore>,
        gated_id: &str,
    ) -> (Self, Arc<Notify>, Arc<Notify>) {
        Self::build(inner, gated_id, true)
    }

    fn build(
        inner: Arc<InMemoryRemoteStore>,
        gated_id: &str,
        read_first: bool,
    ) -> (Self, Arc<Notify>, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let reached = Arc::new(Notify::new());
        (
            Self {
                inner,
                gated_id: gated_id.to_string(),
                gate: Arc::clone(&gate),
                reached: Arc::clone(&reached),
                read_first,
            },
            gate,
            reached,
        )
    }
}

#[async_trait]
impl RemoteStore for GatedRemote {
    async fn get_file_tree(&self) -> ApiResponse<Vec<TreeNode>> {
        self.inner.get_file_tree().await
    }

    async fn get_file_content(&self, file_id: &str) -> ApiResponse<FileContent> {
        if file_id != self.gated_id {
            return self.inner.get_file_content(file_id).await;
        }
        if self.read_first {
            let response = self.inner.get_file_content(file_id).await;
            self.reached.notify_one();
            self.gate.notified().await;
            return response;
        }
        self.reached.notify_one();
        self.gate.notified().await;
        self.inner.get_file_content(file_id).await
    }

    async fn update_file_content(&self, file_id: &str, content: &str) -> ApiResponse<Value> {
        self.inner.update_file_content(file_id, content).await
    }

    async fn create_file(&self, request: &CreateFileRequest) -> ApiResponse<TreeNode> {
        self.inner.create_file(request).await
    }

    async fn create_folder(&self, request: &CreateFolderRequest) -> ApiResponse<TreeNode> {
        self.inner.create_folder(request).await
    }

    async fn delete_item(&self, item_id: &str) -> ApiResponse<Value> {
        self.inner.delete_item(item_id).await
    }

    async fn toggle_folder(&self, folder_id: &str) -> ApiResponse<Value> {
        self.inner.toggle_folder(folder_id).await
    }

    async fn reset_project(&self) -> ApiResponse<Value> {
        self.inner.reset_project().await
    }

    async fn health_check(&self) -> ApiResponse<Value> {
        self.inner.health_check().await
    }
}

pub fn sample_store() -> Arc<InMemoryRemoteStore> {
    Arc::new(InMemoryRemoteStore::with_sample_project())
}

/// Flat project used by scenarios that name files at the root.
pub fn flat_store(files: &[(&str, &str)]) -> Arc<InMemoryRemoteStore> {
    let roots = files
        .iter()
        .map(|(name, content)| {
            let file_type = FileType::from_file_name(name).expect("supported extension");
            TreeNode::file(*name, *name, file_type, *content)
        })
        .collect();
    Arc::new(InMemoryRemoteStore::new(roots))
}

pub fn session_over(store: Arc<InMemoryRemoteStore>) -> (EditorSession, RecordingBackend) {
    let backend = RecordingBackend::default();
    let session = EditorSession::new(store).with_snapshot_backend(Box::new(backend.clone()));
    (session, backend)
}

pub fn tab(id: &str, content: &str, dirty: bool) -> OpenTab {
    OpenTab {
        id: id.to_string(),
        name: id.to_string(),
        content: content.to_string(),
        file_type: FileType::from_file_name(id).expect("supported extension"),
        is_dirty: dirty,
    }
}

pub fn tab_ids(session: &EditorSession) -> Vec<String> {
    session.open_tabs().into_iter().map(|tab| tab.id).collect()
}

pub fn drain(events: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}
