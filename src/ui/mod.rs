//! User interface rendering module
//!
//! - `panes` - search box, script lists, output pane and navigation bar
//! - Main module - layout and the [`UiRenderer`] entry point

mod panes;

pub use panes::format_last_run;

use crate::app::{AppMode, AppState, KeybindingContext};
use chrono::Utc;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
};

/// Renders the whole launcher from [`AppState`]
#[derive(Debug, Default)]
pub struct UiRenderer;

impl UiRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render the complete UI
    pub fn render(&self, f: &mut Frame, state: &AppState, keybinding_ctx: &KeybindingContext) {
        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Search box
                Constraint::Min(6),    // Lists and output
                Constraint::Length(1), // Status line
                Constraint::Length(1), // Navigation bar
            ])
            .split(f.area());

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(main_chunks[1]);

        let now = Utc::now();
        panes::render_search_box(f, state, main_chunks[0]);
        match state.mode {
            AppMode::Search => panes::render_results(f, state, body[0], now),
            AppMode::Catalog => panes::render_catalog(f, state, body[0], now),
        }
        panes::render_output(f, state, body[1]);
        panes::render_status(f, state, main_chunks[2]);
        panes::render_nav_bar(f, state, keybinding_ctx, main_chunks[3]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ScriptEntry;
    use ratatui::{Terminal, backend::TestBackend};

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_render_search_view() {
        let mut state = AppState::new();
        state.query = "ocr".to_string();
        state.set_results(vec![
            ScriptEntry::new("OCR Tool", "ocr.py").with_description("Reads text from images"),
        ]);
        state.push_output("hello");
        state.push_output("ERROR: oops");

        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal
            .draw(|f| UiRenderer::new().render(f, &state, &KeybindingContext::new()))
            .unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("OCR Tool"));
        assert!(text.contains("ERROR: oops"));
        assert!(text.contains("never run"));
    }

    #[test]
    fn test_render_catalog_view_on_tiny_terminal() {
        let mut state = AppState::new();
        state.mode = AppMode::Catalog;
        state.set_catalog(vec![ScriptEntry::new("Alpha", "a.py")]);

        let mut terminal = Terminal::new(TestBackend::new(10, 4)).unwrap();
        terminal
            .draw(|f| UiRenderer::new().render(f, &state, &KeybindingContext::new()))
            .unwrap();
    }
}
