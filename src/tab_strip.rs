//! Tab strip gestures and the context menu model.
//!
//! The strip itself is drawn elsewhere; it reports user gestures as
//! [`TabStripAction`]s and asks [`TabContextMenu::for_tab`] which entries to
//! enable for a right-clicked tab.

use crate::session::TerminalSession;
use crate::tab::{TabId, TabRegistry};

/// Actions that can be triggered from the tab strip
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabStripAction {
    /// No action
    None,
    /// Create a new tab
    NewTab,
    /// Switch to a specific tab
    SwitchTo(TabId),
    /// Close a specific tab
    Close(TabId),
    /// Close every tab except this one
    CloseOthers(TabId),
    /// Close every tab left of this one
    CloseLeft(TabId),
    /// Close every tab right of this one
    CloseRight(TabId),
    /// Move the tab at one index to another
    Reorder { from: usize, to: usize },
    /// Rename a specific tab (empty = reset)
    Rename(TabId, String),
    /// Re-launch a tab whose shell failed to start
    Retry(TabId),
}

/// Which context menu entries are enabled for one tab
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TabContextMenu {
    pub tab_id: TabId,
    pub close: bool,
    pub close_others: bool,
    pub close_left: bool,
    pub close_right: bool,
    pub retry: bool,
}

impl TabContextMenu {
    /// Build the menu for `tab_id`, or `None` if the tab does not exist
    pub fn for_tab(registry: &TabRegistry, tab_id: TabId) -> Option<Self> {
        let index = registry.index_of(tab_id)?;
        let count = registry.tab_count();
        let tab = registry.get(tab_id)?;
        Some(Self {
            tab_id,
            close: true,
            close_others: count > 1,
            close_left: index > 0,
            close_right: index + 1 < count,
            retry: tab.state().is_exited(),
        })
    }
}

impl TerminalSession {
    /// Apply a tab strip gesture. Returns true if anything changed.
    pub fn apply_action(&mut self, action: TabStripAction) -> bool {
        match action {
            TabStripAction::None => false,
            TabStripAction::NewTab => self.add_tab().is_some(),
            TabStripAction::SwitchTo(id) => self.select_tab(id),
            TabStripAction::Close(id) => self.close_tab(id),
            TabStripAction::CloseOthers(id) => self.close_other_tabs(id) > 0,
            TabStripAction::CloseLeft(id) => self.close_tabs_to_left(id) > 0,
            TabStripAction::CloseRight(id) => self.close_tabs_to_right(id) > 0,
            TabStripAction::Reorder { from, to } => self.reorder_tabs(from, to),
            TabStripAction::Rename(id, name) => self.rename_tab(id, Some(name)),
            TabStripAction::Retry(id) => self.retry_tab(id),
        }
    }

    /// Context menu for a tab in this session
    pub fn context_menu(&self, tab_id: TabId) -> Option<TabContextMenu> {
        TabContextMenu::for_tab(self.registry(), tab_id)
    }
}
