//! Request contract to the remote file store.
//!
//! Every call resolves to an [`ApiResponse`]; transport failures come back as
//! `success: false` envelopes instead of errors.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use webpad_core::{ApiResponse, CreateFileRequest, CreateFolderRequest, FileContent, TreeNode};

mod http;
mod memory;

pub use http::{GatewayError, HttpRemoteStore, DEFAULT_BASE_URL};
pub use memory::{sample_project, InMemoryRemoteStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOperation {
    GetTree,
    GetFileContent,
    UpdateFileContent,
    CreateFile,
    CreateFolder,
    DeleteItem,
    ToggleFolder,
    ResetProject,
    HealthCheck,
}

impl RemoteOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteOperation::GetTree => "get_tree",
            RemoteOperation::GetFileContent => "get_file_content",
            RemoteOperation::UpdateFileContent => "update_file_content",
            RemoteOperation::CreateFile => "create_file",
            RemoteOperation::CreateFolder => "create_folder",
            RemoteOperation::DeleteItem => "delete_item",
            RemoteOperation::ToggleFolder => "toggle_folder",
            RemoteOperation::ResetProject => "reset_project",
            RemoteOperation::HealthCheck => "health_check",
        }
    }
}

impl fmt::Display for RemoteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn get_file_tree(&self) -> ApiResponse<Vec<TreeNode>>;

    async fn get_file_content(&self, file_id: &str) -> ApiResponse<FileContent>;

    async fn update_file_content(&self, file_id: &str, content: &str) -> ApiResponse<Value>;

    async fn create_file(&self, request: &CreateFileRequest) -> ApiResponse<TreeNode>;

    async fn create_folder(&self, request: &CreateFolderRequest) -> ApiResponse<TreeNode>;

    async fn delete_item(&self, item_id: &str) -> ApiResponse<Value>;

    async fn toggle_folder(&self, folder_id: &str) -> ApiResponse<Value>;

    async fn reset_project(&self) -> ApiResponse<Value>;

    async fn health_check(&self) -> ApiResponse<Value>;
}
