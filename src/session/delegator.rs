//! Display routing: output delivery, and operations forwarded to whichever
//! tab is active at call time

use super::TerminalSession;
use crate::tab::parse_correlation_key;
use crate::traits::DisplayHandle;

impl TerminalSession {
    fn active_display(&mut self) -> Option<&mut Box<dyn DisplayHandle>> {
        let tab_id = self.registry.active_tab_id()?;
        self.displays.get_mut(&tab_id)
    }

    /// Focus the active tab's surface. No-op without one.
    pub fn focus_active(&mut self) {
        if let Some(display) = self.active_display() {
            display.focus();
        }
    }

    /// Clear the active tab's surface. No-op without one.
    pub fn clear_active(&mut self) {
        if let Some(display) = self.active_display() {
            display.clear();
        }
    }

    /// Search the active tab. `false` without a surface.
    pub fn search_active(&mut self, query: &str) -> bool {
        self.active_display()
            .is_some_and(|display| display.search(query))
    }

    pub fn search_next(&mut self) -> bool {
        self.active_display()
            .is_some_and(|display| display.search_next())
    }

    pub fn search_previous(&mut self) -> bool {
        self.active_display()
            .is_some_and(|display| display.search_previous())
    }

    /// Route shell output for a correlation key to its tab's display.
    ///
    /// Returns false when the key is foreign or no display is attached.
    pub fn deliver_output(&mut self, key: &str, data: &[u8]) -> bool {
        let Some(tab_id) = parse_correlation_key(&self.session_id, key) else {
            return false;
        };
        match self.displays.get_mut(&tab_id) {
            Some(display) => {
                display.write(data);
                true
            }
            None => false,
        }
    }

    /// The host window gained or lost focus
    pub fn on_window_focus_changed(&mut self, focused: bool) {
        if focused {
            self.focus_active();
        }
    }
}
