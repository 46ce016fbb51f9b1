//! # Keystroke Buffer
//!
//! Handheld scanners present themselves as keyboards: they type the code
//! and finish with Enter. This buffer turns that key stream into codes.

/// One key press from the input box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Backspace,
    Escape,
}

/// Accumulates typed characters until Enter.
#[derive(Debug, Clone, Default)]
pub struct KeystrokeBuffer {
    buffer: String,
}

impl KeystrokeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one key. Returns the buffered text on Enter.
    ///
    /// The returned text is not validated or trimmed; it goes through
    /// `BatchManager::add` like manual entry.
    pub fn push(&mut self, key: Key) -> Option<String> {
        match key {
            Key::Char(c) if !c.is_control() => self.buffer.push(c),
            Key::Char(_) => {}
            Key::Backspace => {
                self.buffer.pop();
            }
            Key::Escape => self.buffer.clear(),
            Key::Enter => return Some(std::mem::take(&mut self.buffer)),
        }
        None
    }

    /// Text typed so far.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
