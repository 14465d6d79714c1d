//! Ordered open-tab set with the active selection.

use std::collections::HashSet;
use webpad_core::OpenTab;
use webpad_storage::SessionSnapshot;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabSet {
    tabs: Vec<OpenTab>,
    active_id: Option<String>,
    /// Restored tabs still waiting for fresh content from the remote.
    pending_refresh: HashSet<String>,
}

impl TabSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the set from a persisted snapshot. Duplicate ids keep their
    /// first occurrence; an active id that names no tab falls back to the
    /// last tab.
    pub fn from_snapshot(snapshot: SessionSnapshot) -> Self {
        let mut seen = HashSet::new();
        let tabs: Vec<OpenTab> = snapshot
            .open_tabs
            .into_iter()
            .filter(|tab| seen.insert(tab.id.clone()))
            .collect();
        let active_id = match snapshot.active_id {
            Some(id) if tabs.iter().any(|tab| tab.id == id) => Some(id),
            Some(_) => tabs.last().map(|tab| tab.id.clone()),
            None => None,
        };
        let pending_refresh = tabs.iter().map(|tab| tab.id.clone()).collect();
        Self {
            tabs,
            active_id,
            pending_refresh,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::new(self.tabs.clone(), self.active_id.clone())
    }

    pub fn tabs(&self) -> &[OpenTab] {
        &self.tabs
    }

    pub fn ids(&self) -> Vec<String> {
        self.tabs.iter().map(|tab| tab.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&OpenTab> {
        self.tabs.iter().find(|tab| tab.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    pub fn active(&self) -> Option<&OpenTab> {
        self.active_id.as_deref().and_then(|id| self.get(id))
    }

    /// Selects an open tab. Returns true when the selection changed.
    pub fn activate(&mut self, id: &str) -> bool {
        if !self.contains(id) || self.active_id.as_deref() == Some(id) {
            return false;
        }
        self.active_id = Some(id.to_string());
        true
    }

    /// Appends a tab and selects it. A tab already open under the same id is
    /// only selected.
    pub fn push(&mut self, tab: OpenTab) -> bool {
        let id = tab.id.clone();
        if self.contains(&id) {
            self.activate(&id);
            return false;
        }
        self.tabs.push(tab);
        self.active_id = Some(id);
        true
    }

    pub fn remove(&mut self, id: &str) -> Option<OpenTab> {
        let index = self.tabs.iter().position(|tab| tab.id == id)?;
        let tab = self.tabs.remove(index);
        self.pending_refresh.remove(id);
        self.repair_active();
        Some(tab)
    }

    /// Drops every tab `keep` rejects and returns their ids in open order.
    pub fn retain(&mut self, mut keep: impl FnMut(&OpenTab) -> bool) -> Vec<String> {
        let mut removed = Vec::new();
        self.tabs.retain(|tab| {
            let kept = keep(tab);
            if !kept {
                removed.push(tab.id.clone());
            }
            kept
        });
        for id in &removed {
            self.pending_refresh.remove(id);
        }
        self.repair_active();
        removed
    }

    pub fn clear(&mut self) {
        self.tabs.clear();
        self.active_id = None;
        self.pending_refresh.clear();
    }

    /// Replaces the buffer and marks the tab dirty. A user edit also wins
    /// over any restore fetch still in flight for this tab.
    pub fn update_content(&mut self, id: &str, content: String) -> bool {
        let Some(tab) = self.tabs.iter_mut().find(|tab| tab.id == id) else {
            return false;
        };
        tab.content = content;
        tab.is_dirty = true;
        self.pending_refresh.remove(id);
        true
    }

    /// Clears the dirty flag if the buffer still holds what was saved. A
    /// saved buffer is newer than any restore fetch still in flight.
    pub fn mark_saved(&mut self, id: &str, saved: &str) -> bool {
        self.pending_refresh.remove(id);
        match self.tabs.iter_mut().find(|tab| tab.id == id) {
            Some(tab) if tab.content == saved => {
                tab.is_dirty = false;
                true
            }
            _ => false,
        }
    }

    pub fn is_pending_refresh(&self, id: &str) -> bool {
        self.pending_refresh.contains(id)
    }

    /// Overwrites a restored tab with content fetched from the remote.
    /// Returns false when the tab was closed or edited since it was restored.
    pub fn apply_refreshed(&mut self, id: &str, content: String) -> bool {
        if !self.pending_refresh.remove(id) {
            return false;
        }
        match self.tabs.iter_mut().find(|tab| tab.id == id) {
            Some(tab) => {
                tab.content = content;
                tab.is_dirty = false;
                true
            }
            None => false,
        }
    }

    /// Gives up on a pending restore fetch, keeping the snapshotted buffer.
    pub fn abandon_refresh(&mut self, id: &str) {
        self.pending_refresh.remove(id);
    }

    pub fn dirty_ids(&self) -> Vec<String> {
        self.tabs
            .iter()
            .filter(|tab| tab.is_dirty)
            .map(|tab| tab.id.clone())
            .collect()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.tabs.iter().any(|tab| tab.is_dirty)
    }

    fn repair_active(&mut self) {
        let Some(active) = self.active_id.as_deref() else {
            return;
        };
        if !self.tabs.iter().any(|tab| tab.id == active) {
            self.active_id = self.tabs.last().map(|tab| tab.id.clone());
        }
    }
}
