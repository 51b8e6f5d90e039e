//! Colors and styles for the TUI
//!
//! All colors live here rather than being hardcoded in the renderer.
//!
//! ```rust
//! use xscript::theme::{Colors, Styles, Theme};
//! use ratatui::style::Style;
//!
//! let style = Style::default().fg(Colors::PRIMARY);
//! let title = Styles::title();
//! let line = Theme::output_style("ERROR: boom");
//! ```

use crate::executor::STDERR_PREFIX;
use ratatui::style::{Color, Modifier, Style};

// =============================================================================
// COLOR PALETTE
// =============================================================================

/// Core color palette
pub struct Colors;

impl Colors {
    // -------------------------------------------------------------------------
    // Base Colors
    // -------------------------------------------------------------------------

    /// Panel background
    pub const BG_PRIMARY: Color = Color::Rgb(20, 20, 30);

    pub const FG_PRIMARY: Color = Color::White;

    pub const FG_SECONDARY: Color = Color::Gray;

    /// Disabled/inactive text color
    pub const FG_MUTED: Color = Color::DarkGray;

    // -------------------------------------------------------------------------
    // Accent Colors
    // -------------------------------------------------------------------------

    /// Borders, titles, highlights
    pub const PRIMARY: Color = Color::Cyan;

    /// Emphasis
    pub const SECONDARY: Color = Color::Yellow;

    // -------------------------------------------------------------------------
    // Semantic Colors
    // -------------------------------------------------------------------------

    pub const SUCCESS: Color = Color::Green;

    pub const WARNING: Color = Color::Yellow;

    pub const ERROR: Color = Color::Red;

    pub const ERROR_LIGHT: Color = Color::LightRed;

    // -------------------------------------------------------------------------
    // UI Element Colors
    // -------------------------------------------------------------------------

    pub const BORDER_ACTIVE: Color = Color::Cyan;

    pub const BORDER_INACTIVE: Color = Color::DarkGray;

    /// Selected item highlight
    pub const SELECTED_BG: Color = Color::Yellow;

    /// Selected item text (for contrast on yellow bg)
    pub const SELECTED_FG: Color = Color::Black;

    /// Script name in lists
    pub const SCRIPT_NAME: Color = Color::Cyan;

    /// Script description in lists
    pub const SCRIPT_DESC: Color = Color::Gray;

    /// Navigation hint color
    pub const NAV_HINT: Color = Color::DarkGray;
}

// =============================================================================
// PRE-BUILT STYLES
// =============================================================================

/// Pre-built styles for common UI patterns
pub struct Styles;

impl Styles {
    pub fn text() -> Style {
        Style::default().fg(Colors::FG_PRIMARY)
    }

    pub fn text_muted() -> Style {
        Style::default().fg(Colors::FG_MUTED)
    }

    /// Main title style (cyan, bold)
    pub fn title() -> Style {
        Style::default()
            .fg(Colors::PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    pub fn border_active() -> Style {
        Style::default().fg(Colors::BORDER_ACTIVE)
    }

    pub fn border_inactive() -> Style {
        Style::default().fg(Colors::BORDER_INACTIVE)
    }

    pub fn panel_bg() -> Style {
        Style::default().bg(Colors::BG_PRIMARY)
    }

    /// Selected/highlighted item
    pub fn selected() -> Style {
        Style::default()
            .fg(Colors::SELECTED_FG)
            .bg(Colors::SELECTED_BG)
            .add_modifier(Modifier::BOLD)
    }

    pub fn script_name() -> Style {
        Style::default().fg(Colors::SCRIPT_NAME)
    }

    pub fn script_desc() -> Style {
        Style::default().fg(Colors::SCRIPT_DESC)
    }

    pub fn success() -> Style {
        Style::default().fg(Colors::SUCCESS)
    }

    pub fn warning() -> Style {
        Style::default().fg(Colors::WARNING)
    }

    pub fn error() -> Style {
        Style::default().fg(Colors::ERROR)
    }

    /// Navigation hint (keybindings)
    pub fn nav_hint() -> Style {
        Style::default().fg(Colors::NAV_HINT)
    }
}

// =============================================================================
// THEME CONTEXT
// =============================================================================

/// Kind of a line in the output pane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Plain stdout
    Output,
    /// stderr, tagged with the error prefix
    Stderr,
    /// Terminal line of a successful run
    Success,
    /// Terminal line of a failed run, or a launcher error
    Failure,
    /// Terminal line of a cancelled run
    Cancelled,
}

impl LineKind {
    /// Classify an output line by the markers the executor writes
    pub fn of(line: &str) -> Self {
        if line.starts_with(STDERR_PREFIX) {
            LineKind::Stderr
        } else if line.starts_with("Script execution failed:") || line.starts_with("Failed to ") {
            LineKind::Failure
        } else if line.starts_with("Script '") && line.ends_with("' completed successfully") {
            LineKind::Success
        } else if line.starts_with("Script '") && line.ends_with("' was cancelled") {
            LineKind::Cancelled
        } else {
            LineKind::Output
        }
    }
}

/// Semantic style lookups
pub struct Theme;

impl Theme {
    pub fn line_style(kind: LineKind) -> Style {
        match kind {
            LineKind::Output => Styles::text(),
            LineKind::Stderr => Style::default().fg(Colors::ERROR_LIGHT),
            LineKind::Success => Styles::success().add_modifier(Modifier::BOLD),
            LineKind::Failure => Styles::error().add_modifier(Modifier::BOLD),
            LineKind::Cancelled => Styles::warning().add_modifier(Modifier::BOLD),
        }
    }

    /// Style for one line of script output
    pub fn output_style(line: &str) -> Style {
        Self::line_style(LineKind::of(line))
    }

    /// Border style for a pane, depending on focus
    pub fn border(focused: bool) -> Style {
        if focused {
            Styles::border_active()
        } else {
            Styles::border_inactive()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_classification() {
        assert_eq!(LineKind::of("hello"), LineKind::Output);
        assert_eq!(LineKind::of("ERROR: oops"), LineKind::Stderr);
        assert_eq!(
            LineKind::of("Script 'Alpha' completed successfully"),
            LineKind::Success
        );
        assert_eq!(
            LineKind::of("Script execution failed: exit status: 3"),
            LineKind::Failure
        );
        assert_eq!(LineKind::of("Script 'Alpha' was cancelled"), LineKind::Cancelled);
    }

    #[test]
    fn test_border_follows_focus() {
        assert_eq!(Theme::border(true), Styles::border_active());
        assert_eq!(Theme::border(false), Styles::border_inactive());
    }
}
