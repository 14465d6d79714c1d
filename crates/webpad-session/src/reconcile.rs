//! Aligning the open tabs with the remote tree and the saved snapshot.

use crate::error::SessionError;
use crate::events::SessionEvent;
use crate::session::{lock_tabs, EditorSession, SharedTabs};
use crate::tabs::TabSet;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use webpad_gateway::{RemoteOperation, RemoteStore};
use webpad_storage::SessionSnapshot;

/// Tally of the background refreshes started by a restore.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub refreshed: usize,
    pub failed: usize,
    /// Tabs closed or edited before their fetch came back.
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshOutcome {
    Refreshed,
    Failed,
    Skipped,
}

impl RestoreReport {
    fn record(&mut self, outcome: RefreshOutcome) {
        match outcome {
            RefreshOutcome::Refreshed => self.refreshed += 1,
            RefreshOutcome::Failed => self.failed += 1,
            RefreshOutcome::Skipped => self.skipped += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.refreshed + self.failed + self.skipped
    }
}

/// Background refreshes of restored, non-active tabs. Dropping the handle
/// leaves the tasks running.
#[derive(Debug, Default)]
pub struct RestoreHandle {
    tasks: Vec<(String, JoinHandle<RefreshOutcome>)>,
}

impl RestoreHandle {
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub async fn wait(self) -> RestoreReport {
        let mut report = RestoreReport::default();
        for (id, task) in self.tasks {
            match task.await {
                Ok(outcome) => report.record(outcome),
                Err(err) => {
                    warn!(event = "restore_task_aborted", id = %id, error = %err);
                    report.record(RefreshOutcome::Failed);
                }
            }
        }
        debug!(
            event = "restore_background_done",
            refreshed = report.refreshed,
            failed = report.failed,
            skipped = report.skipped
        );
        report
    }
}

impl EditorSession {
    /// Replaces the tree with the remote one and closes tabs whose file is
    /// gone. On failure the previous tree and tabs stay as they were.
    pub async fn refresh_tree(&mut self) -> Result<(), SessionError> {
        let response = self.remote.get_file_tree().await;
        let roots = self.expect_data(RemoteOperation::GetTree, response)?;
        self.tree.replace(roots);
        let nodes = self.tree.len();
        debug!(event = "tree_replaced", nodes);
        self.emit(SessionEvent::TreeReplaced { nodes });

        let stale: Vec<String> = self
            .lock_tabs()
            .tabs()
            .iter()
            .filter(|tab| !self.tree.contains(&tab.id))
            .map(|tab| tab.id.clone())
            .collect();
        if !stale.is_empty() {
            info!(event = "stale_tabs_evicted", count = stale.len(), ids = ?stale);
            self.close_where(|tab| stale.contains(&tab.id));
        }
        Ok(())
    }

    /// Loads the saved snapshot, refreshes the active tab before returning
    /// and the others in the background. Without a snapshot the session is
    /// left empty.
    pub async fn restore_session(&mut self) -> RestoreHandle {
        let Some(snapshot) = self.load_snapshot() else {
            debug!(event = "no_snapshot");
            return RestoreHandle::default();
        };
        self.install_snapshot(snapshot);
        self.rehydrate().await
    }

    /// Startup sequence: probe the server, load the snapshot, fetch the tree
    /// (dropping tabs whose files vanished), then refresh surviving tabs.
    pub async fn initialize(&mut self) -> RestoreHandle {
        let online = self.check_connection().await;
        info!(event = "session_initializing", online);

        let snapshot = self.load_snapshot();
        let restored = snapshot.is_some();
        if let Some(snapshot) = snapshot {
            self.install_snapshot(snapshot);
        }
        if let Err(err) = self.refresh_tree().await {
            debug!(event = "initial_tree_load_failed", error = %err);
        }
        if !restored {
            return RestoreHandle::default();
        }
        self.rehydrate().await
    }

    fn install_snapshot(&mut self, snapshot: SessionSnapshot) {
        let restored = TabSet::from_snapshot(snapshot);
        let ids = restored.ids();
        info!(
            event = "session_restored",
            tabs = ids.len(),
            active = ?restored.active_id()
        );
        *self.lock_tabs() = restored;
        for id in ids {
            self.emit(SessionEvent::TabOpened { id });
        }
        self.emit_active();
        self.persist_snapshot();
    }

    async fn rehydrate(&mut self) -> RestoreHandle {
        if let Some(id) = self.active_id() {
            let response = self.remote.get_file_content(&id).await;
            let fetched = match response.into_result() {
                Ok(Some(file)) => Ok(file.content),
                Ok(None) => Err("no content returned".to_string()),
                Err(message) => Err(message),
            };
            match fetched {
                Ok(content) => {
                    let applied = self.lock_tabs().apply_refreshed(&id, content);
                    if applied {
                        self.emit(SessionEvent::TabRefreshed { id });
                    }
                }
                Err(reason) => {
                    warn!(event = "active_tab_refresh_failed", id = %id, reason = %reason);
                    self.lock_tabs().abandon_refresh(&id);
                }
            }
        }

        let pending: Vec<String> = {
            let tabs = self.lock_tabs();
            tabs.ids()
                .into_iter()
                .filter(|id| tabs.is_pending_refresh(id))
                .collect()
        };
        let tasks = pending
            .into_iter()
            .map(|id| {
                let task = tokio::spawn(refresh_restored_tab(
                    Arc::clone(&self.remote),
                    Arc::clone(&self.tabs),
                    self.events.clone(),
                    id.clone(),
                ));
                (id, task)
            })
            .collect();
        RestoreHandle { tasks }
    }
}

async fn refresh_restored_tab(
    remote: Arc<dyn RemoteStore>,
    tabs: SharedTabs,
    events: broadcast::Sender<SessionEvent>,
    id: String,
) -> RefreshOutcome {
    if !lock_tabs(&tabs).is_pending_refresh(&id) {
        return RefreshOutcome::Skipped;
    }

    let response = remote.get_file_content(&id).await;
    match response.into_result() {
        Ok(Some(file)) => {
            let applied = lock_tabs(&tabs).apply_refreshed(&id, file.content);
            if !applied {
                return RefreshOutcome::Skipped;
            }
            let _ = events.send(SessionEvent::TabRefreshed { id });
            RefreshOutcome::Refreshed
        }
        Ok(None) => {
            warn!(event = "restored_tab_refresh_failed", id = %id, reason = "no content returned");
            lock_tabs(&tabs).abandon_refresh(&id);
            RefreshOutcome::Failed
        }
        Err(message) => {
            warn!(event = "restored_tab_refresh_failed", id = %id, reason = %message);
            lock_tabs(&tabs).abandon_refresh(&id);
            RefreshOutcome::Failed
        }
    }
}
