//! Editor session state: open tabs with dirty tracking, kept consistent with
//! the remote project tree and persisted across restarts.

mod error;
mod events;
mod reconcile;
mod session;
pub mod tabs;

pub use error::SessionError;
pub use events::{SessionCommand, SessionEvent};
pub use reconcile::{RestoreHandle, RestoreReport};
pub use session::EditorSession;
pub use tabs::TabSet;
