//! Change notifications published by the session.

use webpad_core::FileType;

/// Broadcast after state changes so observers can re-render without
/// polling the accessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    TreeReplaced { nodes: usize },
    FolderToggled { id: String },
    TabOpened { id: String },
    TabClosed { id: String },
    TabUpdated { id: String },
    TabSaved { id: String },
    /// A restored tab received fresh content from the remote.
    TabRefreshed { id: String },
    ActiveChanged { id: Option<String> },
    ConnectionChanged { online: bool },
    ErrorRaised { message: String },
    SessionReset,
}

impl SessionEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            SessionEvent::TreeReplaced { .. } => "tree_replaced",
            SessionEvent::FolderToggled { .. } => "folder_toggled",
            SessionEvent::TabOpened { .. } => "tab_opened",
            SessionEvent::TabClosed { .. } => "tab_closed",
            SessionEvent::TabUpdated { .. } => "tab_updated",
            SessionEvent::TabSaved { .. } => "tab_saved",
            SessionEvent::TabRefreshed { .. } => "tab_refreshed",
            SessionEvent::ActiveChanged { .. } => "active_changed",
            SessionEvent::ConnectionChanged { .. } => "connection_changed",
            SessionEvent::ErrorRaised { .. } => "error_raised",
            SessionEvent::SessionReset => "session_reset",
        }
    }
}

/// A UI action, queued and executed by [`crate::EditorSession::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Open {
        id: String,
    },
    Close {
        id: String,
    },
    UpdateContent {
        id: String,
        content: String,
    },
    Save {
        id: String,
    },
    SaveAll,
    CreateFile {
        name: String,
        file_type: FileType,
        parent_id: Option<String>,
    },
    CreateFolder {
        name: String,
        parent_id: Option<String>,
    },
    Delete {
        id: String,
    },
    ToggleFolder {
        id: String,
    },
    Reset,
    Refresh,
    ClearError,
}

impl SessionCommand {
    pub fn name(&self) -> &'static str {
        match self {
            SessionCommand::Open { .. } => "open",
            SessionCommand::Close { .. } => "close",
            SessionCommand::UpdateContent { .. } => "update_content",
            SessionCommand::Save { .. } => "save",
            SessionCommand::SaveAll => "save_all",
            SessionCommand::CreateFile { .. } => "create_file",
            SessionCommand::CreateFolder { .. } => "create_folder",
            SessionCommand::Delete { .. } => "delete",
            SessionCommand::ToggleFolder { .. } => "toggle_folder",
            SessionCommand::Reset => "reset",
            SessionCommand::Refresh => "refresh",
            SessionCommand::ClearError => "clear_error",
        }
    }
}
