//! Line-oriented display used by the interactive driver.
//!
//! There is no screen here: bytes are echoed to stdout prefixed with the tab
//! id and kept in a bounded history so search has something to look through.

use crate::tab::TabId;
use crate::traits::DisplayHandle;
use std::io::Write;

/// History kept per tab for search
const MAX_HISTORY_BYTES: usize = 256 * 1024;

/// Echoes a tab's output to stdout and remembers it for search
pub struct ConsoleDisplay {
    tab_id: TabId,
    history: String,
    matches: Vec<usize>,
    current: Option<usize>,
    echo: bool,
    /// Trailing bytes of a character split across writes
    partial: Vec<u8>,
}

impl ConsoleDisplay {
    pub fn new(tab_id: TabId) -> Self {
        Self {
            tab_id,
            history: String::new(),
            matches: Vec::new(),
            current: None,
            echo: true,
            partial: Vec::new(),
        }
    }

    /// A display that records without printing
    pub fn silent(tab_id: TabId) -> Self {
        Self {
            echo: false,
            ..Self::new(tab_id)
        }
    }

    pub fn history(&self) -> &str {
        &self.history
    }

    /// Byte offset of the selected match in the history
    pub fn current_match(&self) -> Option<usize> {
        self.current.map(|i| self.matches[i])
    }

    /// Decode a chunk, holding back an incomplete trailing character
    fn decode(&mut self, data: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.partial);
        bytes.extend_from_slice(data);
        let mut text = String::with_capacity(bytes.len());
        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    text.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match e.error_len() {
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            self.partial = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        text
    }

    fn trim_history(&mut self) {
        if self.history.len() <= MAX_HISTORY_BYTES {
            return;
        }
        let mut cut = self.history.len() - MAX_HISTORY_BYTES;
        while !self.history.is_char_boundary(cut) {
            cut += 1;
        }
        self.history.drain(..cut);
        self.matches.clear();
        self.current = None;
    }

    fn step(&mut self, forward: bool) -> bool {
        let Some(current) = self.current else {
            return false;
        };
        let len = self.matches.len();
        let next = if forward {
            (current + 1) % len
        } else {
            (current + len - 1) % len
        };
        self.current = Some(next);
        true
    }
}

impl DisplayHandle for ConsoleDisplay {
    fn write(&mut self, data: &[u8]) {
        let text = self.decode(data);
        if self.echo {
            let mut stdout = std::io::stdout().lock();
            for line in text.split_inclusive('\n') {
                let _ = write!(stdout, "[{}] {}", self.tab_id, line.trim_end_matches(['\r', '\n']));
                if line.ends_with('\n') {
                    let _ = writeln!(stdout);
                }
            }
            let _ = stdout.flush();
        }
        self.history.push_str(&text);
        self.trim_history();
    }

    fn focus(&mut self) {
        log::debug!("Console display for tab {} focused", self.tab_id);
    }

    fn clear(&mut self) {
        self.history.clear();
        self.matches.clear();
        self.current = None;
    }

    fn search(&mut self, query: &str) -> bool {
        self.matches = if query.is_empty() {
            Vec::new()
        } else {
            self.history.match_indices(query).map(|(i, _)| i).collect()
        };
        self.current = if self.matches.is_empty() { None } else { Some(0) };
        self.current.is_some()
    }

    fn search_next(&mut self) -> bool {
        self.step(true)
    }

    fn search_previous(&mut self) -> bool {
        self.step(false)
    }
}
