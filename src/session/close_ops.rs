//! Closing, reordering, and tearing down tabs
//!
//! Every close kills a live shell before its record is removed. The kill is
//! not awaited; a failed kill is logged by the kill task and removal proceeds.

use super::{TabNotification, TerminalSession};
use crate::tab::{TabId, correlation_key};

impl TerminalSession {
    /// Close a tab, killing its shell first if one is live.
    ///
    /// Returns false if the tab does not exist.
    pub fn close_tab(&mut self, tab_id: TabId) -> bool {
        let Some(tab) = self.registry.get(tab_id) else {
            return false;
        };
        if tab.state().is_busy() {
            self.issue_kill(correlation_key(&self.session_id, tab_id));
        }

        let active_before = self.registry.active_tab_id();
        self.spawner.forget(tab_id);
        self.displays.remove(&tab_id);
        self.registry.remove_tab(tab_id);
        log::info!(
            "Closed tab {} ({} remaining)",
            tab_id,
            self.registry.tab_count()
        );

        self.notify(TabNotification::TabClosed { tab_id });
        if self.registry.active_tab_id() != active_before {
            self.notify_active_changed();
        }
        true
    }

    /// Close every tab except `keep_tab_id`, which becomes active.
    ///
    /// Kills are dispatched without waiting on one another. Returns the
    /// number of tabs closed.
    pub fn close_other_tabs(&mut self, keep_tab_id: TabId) -> usize {
        if self.registry.get(keep_tab_id).is_none() {
            return 0;
        }
        self.select_tab(keep_tab_id);
        self.close_all(self.registry.ids_except(keep_tab_id))
    }

    /// Close every tab left of `anchor`. A no-op when the anchor is first.
    pub fn close_tabs_to_left(&mut self, anchor: TabId) -> usize {
        self.close_all(self.registry.ids_left_of(anchor))
    }

    /// Close every tab right of `anchor`. A no-op when the anchor is last.
    pub fn close_tabs_to_right(&mut self, anchor: TabId) -> usize {
        self.close_all(self.registry.ids_right_of(anchor))
    }

    fn close_all(&mut self, ids: Vec<TabId>) -> usize {
        ids.into_iter().filter(|&id| self.close_tab(id)).count()
    }

    /// Move the tab at `from` to `to`. Out-of-bounds indices are a no-op.
    pub fn reorder_tabs(&mut self, from: usize, to: usize) -> bool {
        let moved = self.registry.reorder(from, to);
        if moved {
            self.notify(TabNotification::TabsReordered {
                order: self.registry.ids(),
            });
        }
        moved
    }

    /// Move a tab by id, clamping the target to the last position
    pub fn move_tab(&mut self, tab_id: TabId, target_index: usize) -> bool {
        let moved = self.registry.move_tab_to_index(tab_id, target_index);
        if moved {
            self.notify(TabNotification::TabsReordered {
                order: self.registry.ids(),
            });
        }
        moved
    }

    /// Tear the session down: kill every live shell, forget every display,
    /// and drop the exit subscription.
    ///
    /// Spawns still in flight resolve later against an empty registry and
    /// have their processes reclaimed. Calling this twice is harmless.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        log::info!(
            "Disposing terminal session '{}' with {} tab(s)",
            self.session_id,
            self.registry.tab_count()
        );

        self.displays.clear();
        for tab in self.registry.tabs().iter().filter(|t| t.state().is_busy()) {
            self.issue_kill(correlation_key(&self.session_id, tab.id));
        }
        for tab in self.registry.drain_tabs() {
            self.notify(TabNotification::TabClosed { tab_id: tab.id });
        }
        self.spawner.clear();
        self.exit_rx = None;
        self.disposed = true;
        self.notify(TabNotification::ActiveTabChanged { tab_id: None });
    }
}
