//! Exit routing and input handling for tabs whose shell has gone away

use super::TerminalSession;
use crate::tab::{TabId, TabState, parse_correlation_key};
use shelltabs_supervisor::ExitEvent;

/// Banner written to a tab's display when its shell exits
pub fn exit_notice(exit_code: i32, close_on_key: bool) -> String {
    let mut notice = format!("\r\n\x1b[2m[Process exited with code {exit_code}]\x1b[0m\r\n");
    if close_on_key {
        notice.push_str("\x1b[2mPress any key to close this tab.\x1b[0m\r\n");
    }
    notice
}

impl TerminalSession {
    /// Apply one exit notification from the supervisor.
    ///
    /// Keys that belong to another session, tabs that are gone, and tabs that
    /// already exited are ignored.
    pub(super) fn on_exit(&mut self, event: ExitEvent) {
        let Some(tab_id) = parse_correlation_key(&self.session_id, &event.key) else {
            log::debug!("Ignoring exit for foreign key '{}'", event.key);
            return;
        };
        let Some(tab) = self.registry.get(tab_id) else {
            log::debug!("Ignoring exit for closed tab {}", tab_id);
            return;
        };
        if tab.state().is_exited() {
            log::debug!("Tab {} already exited, ignoring second exit", tab_id);
            return;
        }

        log::info!("Tab {} shell exited with code {}", tab_id, event.exit_code);
        // An outstanding spawn for this tab can no longer be applied
        self.spawner.forget_pending(tab_id);
        self.set_tab_state(
            tab_id,
            TabState::Exited {
                exit_code: event.exit_code,
            },
        );

        let close_on_key = self.config.close_on_key_after_exit;
        if self.config.show_exit_notice
            && let Some(display) = self.displays.get_mut(&tab_id)
        {
            display.write(exit_notice(event.exit_code, close_on_key).as_bytes());
        }
        if close_on_key && let Some(tab) = self.registry.get_mut(tab_id) {
            tab.close_on_input = true;
        }
    }

    /// Route input from a tab's surface.
    ///
    /// Busy tabs forward the bytes to their shell. An exited tab armed for
    /// "any key closes" is closed instead. Anything else is dropped.
    /// Returns true if the input caused the tab to close.
    pub fn handle_input(&mut self, tab_id: TabId, data: &[u8]) -> bool {
        let Some(tab) = self.registry.get(tab_id) else {
            return false;
        };
        match tab.state() {
            TabState::Busy { .. } => {
                let key = crate::tab::correlation_key(&self.session_id, tab_id);
                let reply = self.supervisor.write(&key, data);
                self.runtime.spawn(async move {
                    if let Err(e) = reply.await {
                        log::warn!("Input for '{}' was not delivered: {}", key, e);
                    }
                });
                false
            }
            TabState::Exited { .. } if tab.closes_on_input() => {
                log::info!("Closing exited tab {} on input", tab_id);
                self.close_tab(tab_id)
            }
            TabState::Idle | TabState::Exited { .. } => false,
        }
    }
}
