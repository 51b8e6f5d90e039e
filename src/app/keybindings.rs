//! Keybinding table for the launcher
//!
//! Maps key events to [`Command`]s depending on the current [`AppMode`] and
//! provides the items shown in the navigation bar.

use super::state::AppMode;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::collections::HashMap;

/// Everything the user can ask the shell to do
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    /// Append a character to the query
    Input(char),
    /// Delete the last character of the query
    Backspace,
    ClearQuery,
    NavigateUp,
    NavigateDown,
    /// Run the selected search result
    Run,
    /// Copy the selected catalog entry's name into the query
    PickName,
    ToggleCatalog,
    /// Cancel the running script
    Cancel,
    ScrollUp,
    ScrollDown,
    ClearOutput,
    /// Re-read the catalog from disk
    Reload,
    Quit,
}

/// A keybinding definition
#[derive(Debug, Clone)]
pub struct Keybinding {
    pub key: KeyCode,
    pub modifiers: KeyModifiers,
    pub command: Command,
    pub display: String,
    pub description: String,
}

impl Keybinding {
    /// Create a new keybinding with no modifiers
    pub fn new(key: KeyCode, command: Command, display: &str, description: &str) -> Self {
        Self::with_modifiers(key, KeyModifiers::NONE, command, display, description)
    }

    /// Create a keybinding with modifiers
    pub fn with_modifiers(
        key: KeyCode,
        modifiers: KeyModifiers,
        command: Command,
        display: &str,
        description: &str,
    ) -> Self {
        Self {
            key,
            modifiers,
            command,
            display: display.to_string(),
            description: description.to_string(),
        }
    }

    fn matches(&self, key: &KeyEvent) -> bool {
        self.key == key.code && key.modifiers.contains(self.modifiers)
    }
}

/// Navigation bar item for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavBarItem {
    pub key_display: String,
    pub action_label: String,
}

/// Context-aware keybinding registry
pub struct KeybindingContext {
    /// Mode-specific keybindings, checked first
    mode_bindings: HashMap<AppMode, Vec<Keybinding>>,
    /// Keybindings available in all modes
    global_bindings: Vec<Keybinding>,
}

impl Default for KeybindingContext {
    fn default() -> Self {
        Self::new()
    }
}

impl KeybindingContext {
    pub fn new() -> Self {
        let mut ctx = Self {
            mode_bindings: HashMap::new(),
            global_bindings: Vec::new(),
        };
        ctx.register_defaults();
        ctx
    }

    fn register_defaults(&mut self) {
        let ctrl = KeyModifiers::CONTROL;

        self.global_bindings = vec![
            Keybinding::new(KeyCode::Up, Command::NavigateUp, "Up", "Previous script"),
            Keybinding::new(KeyCode::Down, Command::NavigateDown, "Down", "Next script"),
            Keybinding::new(KeyCode::Tab, Command::ToggleCatalog, "Tab", "Catalog"),
            Keybinding::new(KeyCode::PageUp, Command::ScrollUp, "PgUp", "Scroll output up"),
            Keybinding::new(KeyCode::PageDown, Command::ScrollDown, "PgDn", "Scroll output down"),
            Keybinding::with_modifiers(KeyCode::Char('c'), ctrl, Command::Cancel, "^C", "Cancel"),
            Keybinding::with_modifiers(KeyCode::Char('k'), ctrl, Command::Cancel, "^K", "Cancel"),
            Keybinding::with_modifiers(
                KeyCode::Char('l'),
                ctrl,
                Command::ClearOutput,
                "^L",
                "Clear output",
            ),
            Keybinding::new(KeyCode::F(5), Command::Reload, "F5", "Reload catalog"),
            Keybinding::new(KeyCode::Esc, Command::Quit, "Esc", "Quit"),
        ];

        self.mode_bindings.insert(
            AppMode::Search,
            vec![
                Keybinding::new(KeyCode::Enter, Command::Run, "Enter", "Run"),
                Keybinding::new(KeyCode::Backspace, Command::Backspace, "Bksp", "Delete"),
                Keybinding::with_modifiers(
                    KeyCode::Char('u'),
                    ctrl,
                    Command::ClearQuery,
                    "^U",
                    "Clear query",
                ),
            ],
        );

        self.mode_bindings.insert(
            AppMode::Catalog,
            vec![Keybinding::new(KeyCode::Enter, Command::PickName, "Enter", "Use name")],
        );
    }

    /// Get keybindings for a specific mode, mode bindings first
    pub fn get_bindings(&self, mode: AppMode) -> Vec<&Keybinding> {
        let mut bindings: Vec<&Keybinding> = Vec::new();
        if let Some(mode_bindings) = self.mode_bindings.get(&mode) {
            bindings.extend(mode_bindings.iter());
        }
        bindings.extend(self.global_bindings.iter());
        bindings
    }

    /// Translate a key event into a command.
    ///
    /// Only key presses count. In search mode, unbound printable characters
    /// become [`Command::Input`].
    pub fn resolve(&self, mode: AppMode, key: &KeyEvent) -> Option<Command> {
        if key.kind != KeyEventKind::Press {
            return None;
        }

        if let Some(binding) = self.get_bindings(mode).into_iter().find(|b| b.matches(key)) {
            return Some(binding.command.clone());
        }

        match (mode, key.code) {
            (AppMode::Search, KeyCode::Char(c))
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                Some(Command::Input(c))
            }
            _ => None,
        }
    }

    /// Get navigation bar items for display
    pub fn get_nav_items(&self, mode: AppMode, running: bool) -> Vec<NavBarItem> {
        let bindings = self.get_bindings(mode);

        let mut priority = vec![Command::NavigateUp];
        match mode {
            AppMode::Search => priority.push(Command::Run),
            AppMode::Catalog => priority.push(Command::PickName),
        }
        priority.push(Command::ToggleCatalog);
        priority.push(Command::ScrollUp);
        if running {
            priority.push(Command::Cancel);
        }
        priority.push(Command::ClearOutput);
        priority.push(Command::Quit);

        let mut items = Vec::new();
        for command in priority {
            // Up/Down and PgUp/PgDn are shown as one item each
            let item = match command {
                Command::NavigateUp => NavBarItem {
                    key_display: "Up/Dn".to_string(),
                    action_label: "Select".to_string(),
                },
                Command::ScrollUp => NavBarItem {
                    key_display: "PgUp/PgDn".to_string(),
                    action_label: "Scroll".to_string(),
                },
                _ => match bindings.iter().find(|b| b.command == command) {
                    Some(binding) => NavBarItem {
                        key_display: binding.display.clone(),
                        action_label: binding.description.clone(),
                    },
                    None => continue,
                },
            };
            items.push(item);
        }

        items
    }
}
