//! Application state definitions
//!
//! Plain data mutated by the event loop and read by the renderer. Nothing in
//! here touches the terminal, so it can be driven directly from tests.

use crate::catalog::ScriptEntry;
use crate::executor::CancelToken;
use std::collections::VecDeque;

/// Lines kept in the output pane; older lines are dropped first
pub const MAX_OUTPUT_LINES: usize = 5000;

/// Which list has focus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AppMode {
    /// Live search over names and keywords
    #[default]
    Search,
    /// Whole catalog in file order
    Catalog,
}

/// The script currently running from the shell
#[derive(Debug, Clone)]
pub struct RunningScript {
    pub name: String,
    pub cancel: CancelToken,
}

/// Main application state
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub mode: AppMode,
    /// Search box contents
    pub query: String,
    /// Ranked search results for `query`
    pub results: Vec<ScriptEntry>,
    /// Selection in `results`
    pub selected: usize,
    /// Catalog snapshot in load order
    pub catalog: Vec<ScriptEntry>,
    /// Selection in `catalog`
    pub catalog_selected: usize,
    /// Output pane lines, oldest first
    pub output: VecDeque<String>,
    /// Lines scrolled up from the tail; 0 follows new output
    pub output_scroll: usize,
    pub running: Option<RunningScript>,
    /// Status message for user feedback
    pub status_message: String,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            status_message: "Type to search, Enter to run".to_string(),
            ..Self::default()
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Entry under the cursor in the focused list
    pub fn selected_entry(&self) -> Option<&ScriptEntry> {
        match self.mode {
            AppMode::Search => self.results.get(self.selected),
            AppMode::Catalog => self.catalog.get(self.catalog_selected),
        }
    }

    /// Replace the search results and select the top suggestion
    pub fn set_results(&mut self, results: Vec<ScriptEntry>) {
        self.results = results;
        self.selected = 0;
    }

    pub fn set_catalog(&mut self, catalog: Vec<ScriptEntry>) {
        self.catalog = catalog;
        self.catalog_selected = self
            .catalog_selected
            .min(self.catalog.len().saturating_sub(1));
    }

    pub fn select_previous(&mut self) {
        let cursor = self.cursor_mut();
        *cursor = cursor.saturating_sub(1);
    }

    pub fn select_next(&mut self) {
        let len = match self.mode {
            AppMode::Search => self.results.len(),
            AppMode::Catalog => self.catalog.len(),
        };
        let cursor = self.cursor_mut();
        if *cursor + 1 < len {
            *cursor += 1;
        }
    }

    fn cursor_mut(&mut self) -> &mut usize {
        match self.mode {
            AppMode::Search => &mut self.selected,
            AppMode::Catalog => &mut self.catalog_selected,
        }
    }

    /// Append a line, dropping the oldest beyond [`MAX_OUTPUT_LINES`]
    pub fn push_output(&mut self, line: impl Into<String>) {
        self.output.push_back(line.into());
        while self.output.len() > MAX_OUTPUT_LINES {
            self.output.pop_front();
        }
        // Keep a scrolled-up view anchored on the same lines
        if self.output_scroll > 0 {
            self.output_scroll = (self.output_scroll + 1).min(self.max_scroll());
        }
    }

    pub fn clear_output(&mut self) {
        self.output.clear();
        self.output_scroll = 0;
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.output_scroll = (self.output_scroll + lines).min(self.max_scroll());
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.output_scroll = self.output_scroll.saturating_sub(lines);
    }

    fn max_scroll(&self) -> usize {
        self.output.len().saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(names: &[&str]) -> Vec<ScriptEntry> {
        names
            .iter()
            .map(|name| ScriptEntry::new(*name, format!("{name}.py")))
            .collect()
    }

    #[test]
    fn test_output_is_capped() {
        let mut state = AppState::new();
        for i in 0..MAX_OUTPUT_LINES + 10 {
            state.push_output(format!("line {i}"));
        }

        assert_eq!(state.output.len(), MAX_OUTPUT_LINES);
        assert_eq!(state.output.front().map(String::as_str), Some("line 10"));
    }

    #[test]
    fn test_selection_stays_in_bounds() {
        let mut state = AppState::new();
        state.set_results(entries(&["a", "b"]));

        state.select_previous();
        assert_eq!(state.selected, 0);
        state.select_next();
        state.select_next();
        assert_eq!(state.selected, 1);
        assert_eq!(state.selected_entry().map(|e| e.name.as_str()), Some("b"));
    }

    #[test]
    fn test_selection_follows_mode() {
        let mut state = AppState::new();
        state.set_results(entries(&["found"]));
        state.set_catalog(entries(&["first", "second"]));
        state.mode = AppMode::Catalog;

        state.select_next();

        assert_eq!(state.selected, 0);
        assert_eq!(state.selected_entry().map(|e| e.name.as_str()), Some("second"));
    }

    #[test]
    fn test_scrolling_is_clamped() {
        let mut state = AppState::new();
        for i in 0..5 {
            state.push_output(format!("{i}"));
        }

        state.scroll_up(100);
        assert_eq!(state.output_scroll, 4);
        state.scroll_down(100);
        assert_eq!(state.output_scroll, 0);

        state.scroll_up(2);
        state.clear_output();
        assert_eq!(state.output_scroll, 0);
        assert!(state.output.is_empty());
    }
}
