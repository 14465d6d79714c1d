use crate::{RemoteOperation, RemoteStore};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use webpad_core::{
    ApiResponse, CreateFileRequest, CreateFolderRequest, FileContent, FileType, TreeIndex,
    TreeNode,
};

const OFFLINE_MESSAGE: &str = "Network Error";

/// In-process model of the file service. Holds its own tree, assigns ids,
/// and can be told to fail so callers can exercise their recovery paths.
pub struct InMemoryRemoteStore {
    state: Mutex<MemoryState>,
}

struct MemoryState {
    tree: TreeIndex,
    seed: Vec<TreeNode>,
    next_seq: u64,
    offline: bool,
    failing_content: HashSet<String>,
    fail_next: HashMap<RemoteOperation, String>,
    calls: HashMap<RemoteOperation, usize>,
}

impl InMemoryRemoteStore {
    pub fn new(roots: Vec<TreeNode>) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                tree: TreeIndex::new(roots.clone()),
                seed: roots,
                next_seq: 1,
                offline: false,
                failing_content: HashSet::new(),
                fail_next: HashMap::new(),
                calls: HashMap::new(),
            }),
        }
    }

    pub fn with_sample_project() -> Self {
        Self::new(sample_project())
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current server-side tree.
    pub fn tree(&self) -> Vec<TreeNode> {
        self.lock().tree.roots().to_vec()
    }

    pub fn node(&self, id: &str) -> Option<TreeNode> {
        self.lock().tree.find(id).cloned()
    }

    /// Every call fails with a transport-style message while offline.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    pub fn fail_content_for(&self, file_id: &str) {
        self.lock().failing_content.insert(file_id.to_string());
    }

    pub fn restore_content_for(&self, file_id: &str) {
        self.lock().failing_content.remove(file_id);
    }

    /// Makes the next call of `operation` fail with `message`.
    pub fn fail_next(&self, operation: RemoteOperation, message: impl Into<String>) {
        self.lock().fail_next.insert(operation, message.into());
    }

    pub fn calls(&self, operation: RemoteOperation) -> usize {
        self.lock().calls.get(&operation).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.lock().calls.values().sum()
    }

    /// Changes content behind the client's back, as another writer would.
    pub fn set_remote_content(&self, file_id: &str, content: &str) -> bool {
        self.lock().tree.set_content(file_id, content)
    }

    /// Deletes a node behind the client's back.
    pub fn remove_remote(&self, item_id: &str) -> Option<TreeNode> {
        self.lock().tree.remove(item_id)
    }

    fn handle<T>(
        &self,
        operation: RemoteOperation,
        apply: impl FnOnce(&mut MemoryState) -> ApiResponse<T>,
    ) -> ApiResponse<T> {
        let mut state = self.lock();
        *state.calls.entry(operation).or_insert(0) += 1;
        if state.offline {
            return ApiResponse::failure(OFFLINE_MESSAGE);
        }
        if let Some(message) = state.fail_next.remove(&operation) {
            return ApiResponse::failure(message);
        }
        apply(&mut state)
    }
}

impl MemoryState {
    fn assign_id(&mut self, name: &str) -> String {
        let id = format!("{}-{}", self.next_seq, name);
        self.next_seq += 1;
        id
    }

    fn insert(&mut self, node: TreeNode, parent_id: Option<&str>) -> ApiResponse<TreeNode> {
        if self.tree.insert(node.clone(), parent_id) {
            ApiResponse::ok(node)
        } else {
            ApiResponse::failure("Parent folder not found")
        }
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn get_file_tree(&self) -> ApiResponse<Vec<TreeNode>> {
        self.handle(RemoteOperation::GetTree, |state| {
            ApiResponse::ok(state.tree.roots().to_vec())
        })
    }

    async fn get_file_content(&self, file_id: &str) -> ApiResponse<FileContent> {
        self.handle(RemoteOperation::GetFileContent, |state| {
            if state.failing_content.contains(file_id) {
                return ApiResponse::failure(format!("Failed to read {file_id}"));
            }
            match state.tree.find(file_id) {
                Some(node) if node.is_file() => ApiResponse::ok(FileContent {
                    content: node.content.clone().unwrap_or_default(),
                }),
                _ => ApiResponse::failure("File not found"),
            }
        })
    }

    async fn update_file_content(&self, file_id: &str, content: &str) -> ApiResponse<Value> {
        self.handle(RemoteOperation::UpdateFileContent, |state| {
            if state.tree.set_content(file_id, content) {
                ApiResponse::empty()
            } else {
                ApiResponse::failure("File not found")
            }
        })
    }

    async fn create_file(&self, request: &CreateFileRequest) -> ApiResponse<TreeNode> {
        self.handle(RemoteOperation::CreateFile, |state| {
            let node = TreeNode::file(
                state.assign_id(&request.name),
                request.name.clone(),
                request.file_type,
                request.file_type.default_content(),
            );
            state.insert(node, request.parent_id.as_deref())
        })
    }

    async fn create_folder(&self, request: &CreateFolderRequest) -> ApiResponse<TreeNode> {
        self.handle(RemoteOperation::CreateFolder, |state| {
            let id = state.assign_id(&request.name);
            let node = TreeNode::folder(id, request.name.clone(), Vec::new());
            state.insert(node, request.parent_id.as_deref())
        })
    }

    async fn delete_item(&self, item_id: &str) -> ApiResponse<Value> {
        self.handle(RemoteOperation::DeleteItem, |state| {
            match state.tree.remove(item_id) {
                Some(_) => ApiResponse::empty(),
                None => ApiResponse::failure("Item not found"),
            }
        })
    }

    async fn toggle_folder(&self, folder_id: &str) -> ApiResponse<Value> {
        self.handle(RemoteOperation::ToggleFolder, |state| {
            if state.tree.toggle(folder_id) {
                ApiResponse::empty()
            } else {
                ApiResponse::failure("Folder not found")
            }
        })
    }

    async fn reset_project(&self) -> ApiResponse<Value> {
        self.handle(RemoteOperation::ResetProject, |state| {
            let seed = state.seed.clone();
            state.tree.replace(seed);
            state.next_seq = 1;
            ApiResponse::empty()
        })
    }

    async fn health_check(&self) -> ApiResponse<Value> {
        self.handle(RemoteOperation::HealthCheck, |_| {
            ApiResponse::ok(serde_json::json!({"status": "ok"}))
        })
    }
}

/// The starter project a fresh workspace is seeded with.
pub fn sample_project() -> Vec<TreeNode> {
    vec![
        TreeNode::folder(
            "src",
            "src",
            vec![
                TreeNode::file(
                    "index.html",
                    "index.html",
                    FileType::Html,
                    r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>My Project</title>
    <link rel="stylesheet" href="styles.css">
</head>
<body>
    <h1>Hello World!</h1>
    <p>Welcome to my code editor</p>
    <script src="script.js"></script>
</body>
</html>"#,
                ),
                TreeNode::file(
                    "styles.css",
                    "styles.css",
                    FileType::Css,
                    r#"body {
    font-family: Arial, sans-serif;
    margin: 0;
    padding: 20px;
    background-color: #f5f5f5;
}

h1 {
    color: #333;
    text-align: center;
}

p {
    color: #666;
    text-align: center;
    font-size: 16px;
}"#,
                ),
                TreeNode::file(
                    "script.js",
                    "script.js",
                    FileType::Js,
                    r#"console.log('Hello from script.js');

function greetUser() {
    const name = prompt('What is your name?');
    if (name) {
        alert('Hello, ' + name + '!');
    }
}

// Call the function when page loads
document.addEventListener('DOMContentLoaded', function() {
    console.log('DOM is ready');
    
    // Add click event to h1
    const h1 = document.querySelector('h1');
    if (h1) {
        h1.addEventListener('click', greetUser);
    }
});"#,
                ),
            ],
        )
        .with_open(true),
        TreeNode::folder(
            "components",
            "components",
            vec![
                TreeNode::file(
                    "header.html",
                    "header.html",
                    FileType::Html,
                    r##"<header class="main-header">
    <nav>
        <ul>
            <li><a href="#home">Home</a></li>
            <li><a href="#about">About</a></li>
            <li><a href="#contact">Contact</a></li>
        </ul>
    </nav>
</header>"##,
                ),
                TreeNode::file(
                    "footer.js",
                    "footer.js",
                    FileType::Js,
                    r#"function createFooter() {
    const footer = document.createElement('footer');
    footer.innerHTML = '<p>&copy; 2024 My Website. All rights reserved.</p>';
    footer.className = 'main-footer';
    return footer;
}

// Export for use in other files
window.createFooter = createFooter;"#,
                ),
            ],
        ),
    ]
}
