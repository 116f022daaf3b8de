//! Overlapping fixed-size window splitting.
//!
//! The splitter walks the input one window at a time, stepping forward by
//! `window_len - overlap_len` characters, so each consecutive pair of
//! windows shares exactly `overlap_len` characters (except possibly the
//! final pair, which shares more when the tail is short). Offsets and
//! slicing are byte-based internally but always land on `char`
//! boundaries, so multi-byte text never produces a broken window.
//!
//! # Example
//!
//! ```
//! use docdex_context::{WindowConfig, WindowSplitter};
//!
//! let config = WindowConfig::new(10, 3).unwrap();
//! let splitter = WindowSplitter::new(config);
//!
//! let windows = splitter.split("abcdefghijklmnopqrst");
//! assert_eq!(windows[0].text, "abcdefghij");
//! assert_eq!(windows[1].text, "hijklmnopq");
//! assert_eq!(windows[0].sequence, 0);
//! assert_eq!(windows[1].sequence, 1);
//! ```

use serde::Serialize;

/// Errors from window configuration validation.
///
/// The splitter degenerates when the overlap is not strictly smaller than
/// the window: the step size becomes zero (or negative) and the walk never
/// advances. That condition is rejected here, at the boundary, rather than
/// guarded inside the loop.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WindowError {
    /// Window length of zero can never hold text
    #[error("window length must be greater than zero")]
    ZeroWindow,

    /// Overlap must leave room for the walk to advance
    #[error("overlap ({overlap_len}) must be strictly less than window length ({window_len})")]
    OverlapExceedsWindow {
        window_len: usize,
        overlap_len: usize,
    },
}

/// Validated window parameters, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    window_len: usize,
    overlap_len: usize,
}

impl WindowConfig {
    /// Validate and construct a window configuration.
    ///
    /// # Errors
    /// Returns [`WindowError::ZeroWindow`] when `window_len == 0` and
    /// [`WindowError::OverlapExceedsWindow`] when `overlap_len >= window_len`.
    pub fn new(window_len: usize, overlap_len: usize) -> Result<Self, WindowError> {
        if window_len == 0 {
            return Err(WindowError::ZeroWindow);
        }
        if overlap_len >= window_len {
            return Err(WindowError::OverlapExceedsWindow {
                window_len,
                overlap_len,
            });
        }
        Ok(Self {
            window_len,
            overlap_len,
        })
    }

    /// Maximum window length in characters.
    pub fn window_len(&self) -> usize {
        self.window_len
    }

    /// Overlap between consecutive windows in characters.
    pub fn overlap_len(&self) -> usize {
        self.overlap_len
    }

    /// Characters the walk advances between windows.
    pub fn step(&self) -> usize {
        self.window_len - self.overlap_len
    }
}

/// One window of text cut from a larger input.
///
/// `sequence` is the 0-indexed position of this window within its input;
/// `start` is the byte offset of the window's first character in the
/// original text.
#[derive(Debug, Clone, Serialize)]
pub struct TextWindow {
    pub sequence: usize,
    pub start: usize,
    pub text: String,
}

/// Splits text into overlapping windows according to a [`WindowConfig`].
#[derive(Debug, Clone, Copy)]
pub struct WindowSplitter {
    config: WindowConfig,
}

impl WindowSplitter {
    pub fn new(config: WindowConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> WindowConfig {
        self.config
    }

    /// Split `text` into overlapping windows.
    ///
    /// Empty input yields no windows. Input no longer than the window
    /// length yields exactly one window containing the whole text. The
    /// final window always ends at the end of the input and may be
    /// shorter than `window_len`; every window after the first begins
    /// `step()` characters after its predecessor.
    pub fn split(&self, text: &str) -> Vec<TextWindow> {
        if text.is_empty() {
            return Vec::new();
        }

        // Byte offset of every char boundary, including the end of input.
        let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        boundaries.push(text.len());
        let char_count = boundaries.len() - 1;

        let mut windows = Vec::new();
        let mut start_char = 0usize;

        loop {
            let end_char = (start_char + self.config.window_len).min(char_count);
            let start_byte = boundaries[start_char];
            let end_byte = boundaries[end_char];

            windows.push(TextWindow {
                sequence: windows.len(),
                start: start_byte,
                text: text[start_byte..end_byte].to_string(),
            });

            if end_char == char_count {
                break;
            }
            start_char += self.config.step();
        }

        windows
    }
}
