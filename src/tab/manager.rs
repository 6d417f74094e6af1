//! Tab registry: the ordered tab list and active-tab pointer for one session

use super::{TabId, TabState, TerminalTab};
use std::path::PathBuf;

/// Authoritative ordered collection of tabs for a single session.
///
/// Every mutation is total: an id that no longer exists is a no-op, never an
/// error. Methods that change something report it with a `bool` so callers
/// can decide whether to notify observers.
pub struct TabRegistry {
    /// All tabs in this session, in strip order
    tabs: Vec<TerminalTab>,
    /// Currently active tab ID
    active_tab_id: Option<TabId>,
    /// Counter for generating unique tab IDs
    next_tab_id: TabId,
}

impl TabRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            tabs: Vec::new(),
            active_tab_id: None,
            next_tab_id: 1,
        }
    }

    /// Append a new idle tab and make it active
    pub fn add_tab(&mut self, shell: String, cwd: PathBuf) -> TabId {
        let id = self.next_tab_id;
        self.next_tab_id += 1;

        self.tabs.push(TerminalTab::new(id, shell, cwd));

        // Always switch to the new tab
        self.active_tab_id = Some(id);

        log::info!("Created new tab {} (total: {})", id, self.tabs.len());
        id
    }

    /// Remove a tab by ID, returning its record
    ///
    /// When the removed tab was active, the tab now at the same index (its
    /// right-hand neighbor) becomes active; failing that the new rightmost
    /// tab; failing that nothing.
    pub fn remove_tab(&mut self, id: TabId) -> Option<TerminalTab> {
        let idx = self.index_of(id)?;

        log::info!("Removing tab {} (index {})", id, idx);
        let tab = self.tabs.remove(idx);

        if self.active_tab_id == Some(id) {
            self.active_tab_id = if self.tabs.is_empty() {
                None
            } else {
                let new_idx = idx.min(self.tabs.len() - 1);
                Some(self.tabs[new_idx].id)
            };
        }

        Some(tab)
    }

    /// Make a tab active. Returns true if the active tab changed.
    pub fn set_active(&mut self, id: TabId) -> bool {
        if self.active_tab_id == Some(id) || self.index_of(id).is_none() {
            return false;
        }
        self.active_tab_id = Some(id);
        log::debug!("Switched to tab {}", id);
        true
    }

    /// Replace a tab's state. Returns true if the state changed.
    pub fn update_tab_state(&mut self, id: TabId, state: TabState) -> bool {
        match self.get_mut(id) {
            Some(tab) if tab.state() != state => {
                log::debug!("Tab {} state {} -> {}", id, tab.state(), state);
                tab.set_state(state);
                true
            }
            _ => false,
        }
    }

    /// Attach or detach a process id.
    ///
    /// A non-zero pid makes the tab busy; zero detaches a live process and
    /// leaves the tab idle. Exited tabs keep their exit code when given zero.
    pub fn update_pid(&mut self, id: TabId, pid: u32) -> bool {
        let Some(current) = self.get(id).map(TerminalTab::state) else {
            return false;
        };
        let next = match (pid, current) {
            (0, TabState::Busy { .. }) => TabState::Idle,
            (0, other) => other,
            (pid, _) => TabState::Busy { pid },
        };
        self.update_tab_state(id, next)
    }

    /// Set or clear a tab's user label. Empty names reset to `None`.
    pub fn rename(&mut self, id: TabId, name: Option<String>) -> bool {
        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        match self.get_mut(id) {
            Some(tab) if tab.name != name => {
                tab.name = name;
                true
            }
            _ => false,
        }
    }

    /// Move the tab at `from` to `to`. Out-of-bounds indices are a no-op.
    pub fn reorder(&mut self, from: usize, to: usize) -> bool {
        if from >= self.tabs.len() || to >= self.tabs.len() || from == to {
            return false;
        }
        let tab = self.tabs.remove(from);
        log::debug!("Moved tab {} from index {} to {}", tab.id, from, to);
        self.tabs.insert(to, tab);
        true
    }

    /// Move a tab to a specific index, clamped to the last position
    ///
    /// The target is clamped to the last position. Returns true if the tab
    /// was actually moved, false if not found or already at target.
    pub fn move_tab_to_index(&mut self, id: TabId, target_index: usize) -> bool {
        let Some(current_idx) = self.index_of(id) else {
            return false;
        };
        let clamped_target = target_index.min(self.tabs.len().saturating_sub(1));
        self.reorder(current_idx, clamped_target)
    }

    /// Switch to the next tab (wraps around)
    pub fn select_next(&mut self) -> bool {
        self.select_relative(1)
    }

    /// Switch to the previous tab (wraps around)
    pub fn select_previous(&mut self) -> bool {
        self.select_relative(-1)
    }

    fn select_relative(&mut self, step: isize) -> bool {
        if self.tabs.len() <= 1 {
            return false;
        }
        let Some(current_idx) = self.active_index() else {
            return false;
        };
        let len = self.tabs.len() as isize;
        let target = (current_idx as isize + step).rem_euclid(len) as usize;
        let id = self.tabs[target].id;
        self.set_active(id)
    }

    /// Ids of every tab except `keep`, in strip order
    pub fn ids_except(&self, keep: TabId) -> Vec<TabId> {
        self.tabs
            .iter()
            .map(|t| t.id)
            .filter(|&id| id != keep)
            .collect()
    }

    /// Ids of tabs strictly left of `anchor`; empty when anchor is first or missing
    pub fn ids_left_of(&self, anchor: TabId) -> Vec<TabId> {
        match self.index_of(anchor) {
            Some(idx) => self.tabs[..idx].iter().map(|t| t.id).collect(),
            None => Vec::new(),
        }
    }

    /// Ids of tabs strictly right of `anchor`; empty when anchor is last or missing
    pub fn ids_right_of(&self, anchor: TabId) -> Vec<TabId> {
        match self.index_of(anchor) {
            Some(idx) => self.tabs[idx + 1..].iter().map(|t| t.id).collect(),
            None => Vec::new(),
        }
    }

    /// Remove every tab, returning them in strip order
    pub fn drain_tabs(&mut self) -> Vec<TerminalTab> {
        self.active_tab_id = None;
        std::mem::take(&mut self.tabs)
    }

    /// Get a reference to the active tab
    pub fn active_tab(&self) -> Option<&TerminalTab> {
        self.active_tab_id.and_then(|id| self.get(id))
    }

    /// Get the active tab ID
    pub fn active_tab_id(&self) -> Option<TabId> {
        self.active_tab_id
    }

    /// Get index of active tab (0-based)
    pub fn active_index(&self) -> Option<usize> {
        self.active_tab_id.and_then(|id| self.index_of(id))
    }

    /// Position of a tab in strip order
    pub fn index_of(&self, id: TabId) -> Option<usize> {
        self.tabs.iter().position(|t| t.id == id)
    }

    /// Get a tab by ID
    pub fn get(&self, id: TabId) -> Option<&TerminalTab> {
        self.tabs.iter().find(|t| t.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: TabId) -> Option<&mut TerminalTab> {
        self.tabs.iter_mut().find(|t| t.id == id)
    }

    /// Id of the tab at a strip position
    pub fn id_at(&self, index: usize) -> Option<TabId> {
        self.tabs.get(index).map(|t| t.id)
    }

    /// Get all tabs as a slice
    pub fn tabs(&self) -> &[TerminalTab] {
        &self.tabs
    }

    /// Tab ids in strip order
    pub fn ids(&self) -> Vec<TabId> {
        self.tabs.iter().map(|t| t.id).collect()
    }

    /// Get the number of tabs
    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }
}

impl Default for TabRegistry {
    fn default() -> Self {
        Self::new()
    }
}
