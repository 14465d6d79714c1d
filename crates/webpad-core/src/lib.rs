use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod contracts;
pub mod tree;
pub mod validation;

pub use contracts::{
    ApiResponse, CreateFileRequest, CreateFolderRequest, FileContent, UpdateFileRequest,
};
pub use tree::TreeIndex;
pub use validation::{validate_file_name, validate_folder_name, ValidationError};

const HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Document</title>
</head>
<body>
    
</body>
</html>"#;

const CSS_TEMPLATE: &str = "/* Your CSS styles here */\n\n";

const JS_TEMPLATE: &str = "// Your JavaScript code here\n\n";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Html,
    Css,
    Js,
}

impl FileType {
    pub const ALL: [FileType; 3] = [FileType::Html, FileType::Css, FileType::Js];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Html => "html",
            FileType::Css => "css",
            FileType::Js => "js",
        }
    }

    /// Content a freshly created file of this type starts with.
    pub fn default_content(&self) -> &'static str {
        match self {
            FileType::Html => HTML_TEMPLATE,
            FileType::Css => CSS_TEMPLATE,
            FileType::Js => JS_TEMPLATE,
        }
    }

    /// Derives the type from the last extension of a file name.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, extension) = name.trim().rsplit_once('.')?;
        extension.parse().ok()
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_lowercase();
        match normalized.as_str() {
            "html" => Ok(FileType::Html),
            "css" => Ok(FileType::Css),
            "js" => Ok(FileType::Js),
            other => Err(format!("Unknown file type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Folder,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::File => "file",
            NodeKind::Folder => "folder",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file or folder in the project tree, as served by the remote store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<FileType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
    #[serde(default)]
    pub is_open: bool,
}

impl TreeNode {
    pub fn file(
        id: impl Into<String>,
        name: impl Into<String>,
        file_type: FileType,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: NodeKind::File,
            file_type: Some(file_type),
            content: Some(content.into()),
            children: None,
            is_open: false,
        }
    }

    pub fn folder(id: impl Into<String>, name: impl Into<String>, children: Vec<TreeNode>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: NodeKind::Folder,
            file_type: None,
            content: None,
            children: Some(children),
            is_open: false,
        }
    }

    pub fn with_open(mut self, is_open: bool) -> Self {
        self.is_open = is_open;
        self
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    pub fn children(&self) -> &[TreeNode] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Content type of a file node, falling back to the name's extension when
    /// the server omitted the tag.
    pub fn resolved_file_type(&self) -> Option<FileType> {
        if !self.is_file() {
            return None;
        }
        self.file_type.or_else(|| FileType::from_file_name(&self.name))
    }
}

/// An open, editable file held by the session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OpenTab {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub content: String,
    pub file_type: FileType,
    #[serde(default)]
    pub is_dirty: bool,
}

impl OpenTab {
    /// Builds a clean tab for a file node. Folders and files without a
    /// resolvable type yield `None`.
    pub fn from_node(node: &TreeNode, content: String) -> Option<Self> {
        let file_type = node.resolved_file_type()?;
        Some(Self {
            id: node.id.clone(),
            name: node.name.clone(),
            content,
            file_type,
            is_dirty: false,
        })
    }
}

/// Deserialize an ID that can be either a string or a number into a String
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let val: serde_json::Value = serde_json::Value::deserialize(deserializer)?;
    match val {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        _ => Err(serde::de::Error::custom("expected string or number for id")),
    }
}
