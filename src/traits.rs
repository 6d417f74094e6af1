//! Contracts between the session core and its rendering collaborator.
//!
//! The session never renders anything itself. Each tab's live terminal
//! surface is reached through a [`DisplayHandle`] the renderer attaches with
//! [`crate::session::TerminalSession::attach_display`]. Tests substitute a
//! recording implementation.

/// Per-tab handle onto a live terminal surface.
///
/// Implementations are owned by the session once attached and are dropped on
/// detach or when their tab closes, so no call is ever made on a handle whose
/// surface has been torn down.
pub trait DisplayHandle: Send {
    /// Write raw bytes to the surface (exit banners, local echo)
    fn write(&mut self, data: &[u8]);

    /// Give the surface keyboard focus
    fn focus(&mut self);

    /// Clear the visible screen and scrollback
    fn clear(&mut self);

    /// Start a search for `query`. Returns `true` if a match was found.
    fn search(&mut self, query: &str) -> bool;

    /// Jump to the next match of the current search
    fn search_next(&mut self) -> bool;

    /// Jump to the previous match of the current search
    fn search_previous(&mut self) -> bool;
}
