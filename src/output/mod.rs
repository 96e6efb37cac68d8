//! Output formatters for run reports.
//!
//! This module provides two ways to present a run:
//! - Text for people at a terminal
//! - JSON for automation and scripting
//!
//! Presentation settings live in a [`Palette`] value that is built once at
//! startup and passed to every formatter. Nothing in the pipeline reads it.
//!
//! # Example
//!
//! ```
//! use rustlink::output::Palette;
//!
//! let palette = Palette::new(false, true);
//! assert_eq!(palette.success("done"), "done");
//! ```

pub mod json;
pub mod text;

use yansi::{Color, Paint, Style};

// Re-export main types
pub use json::JsonOutput;
pub use text::{LinkLines, TextObserver};

const SUCCESS: Style = Style::new().fg(Color::Green);
const WARNING: Style = Style::new().fg(Color::Yellow);
const ERROR: Style = Style::new().fg(Color::Red);
const INFO: Style = Style::new().fg(Color::Cyan);
const MUTED: Style = Style::new().fg(Color::BrightBlack);
const ACCENT: Style = Style::new().fg(Color::Blue).bold();
const BOLD: Style = Style::new().bold();

/// Immutable presentation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    color: bool,
    decorations: bool,
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(true, true)
    }
}

impl Palette {
    /// Create a palette.
    ///
    /// * `color` - emit ANSI colors
    /// * `decorations` - use icons and box-drawing characters
    #[must_use]
    pub const fn new(color: bool, decorations: bool) -> Self {
        Self { color, decorations }
    }

    /// No colors, ASCII only.
    #[must_use]
    pub const fn plain() -> Self {
        Self::new(false, false)
    }

    /// Whether icons and box-drawing characters are used.
    #[must_use]
    pub fn decorations(&self) -> bool {
        self.decorations
    }

    /// Pick the decorated or the ASCII variant of a symbol.
    #[must_use]
    pub fn icon(&self, fancy: &'static str, plain: &'static str) -> &'static str {
        if self.decorations {
            fancy
        } else {
            plain
        }
    }

    fn paint(&self, text: &str, style: Style) -> String {
        if self.color {
            text.paint(style).to_string()
        } else {
            text.to_string()
        }
    }

    /// Style for completed actions.
    #[must_use]
    pub fn success(&self, text: &str) -> String {
        self.paint(text, SUCCESS)
    }

    /// Style for skipped work and notices.
    #[must_use]
    pub fn warning(&self, text: &str) -> String {
        self.paint(text, WARNING)
    }

    /// Style for failures.
    #[must_use]
    pub fn error(&self, text: &str) -> String {
        self.paint(text, ERROR)
    }

    /// Style for neutral information.
    #[must_use]
    pub fn info(&self, text: &str) -> String {
        self.paint(text, INFO)
    }

    /// Style for secondary details.
    #[must_use]
    pub fn muted(&self, text: &str) -> String {
        self.paint(text, MUTED)
    }

    /// Style for headings and boxes.
    #[must_use]
    pub fn accent(&self, text: &str) -> String {
        self.paint(text, ACCENT)
    }

    /// Bold text.
    #[must_use]
    pub fn bold(&self, text: &str) -> String {
        self.paint(text, BOLD)
    }
}
