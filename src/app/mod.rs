//! Application module
//!
//! The interactive launcher: state, command dispatch and the event loop.
//!
//! # Module Structure
//! - `state` - Application state types (AppState, AppMode, RunningScript)
//! - `keybindings` - Key to [`Command`] mapping and navigation bar items
//! - Main module - App struct and event loop

mod keybindings;
mod state;

pub use keybindings::{Command, KeybindingContext, Keybinding, NavBarItem};
pub use state::{AppMode, AppState, MAX_OUTPUT_LINES, RunningScript};

use crate::error::{Result, XScriptError};
use crate::executor::{CancelToken, ExecEvent, Executor};
use crate::process_guard::ProcessGuard;
use crate::registry::Registry;
use crate::ui::UiRenderer;
use crossterm::event::{Event, KeyEvent};
use ratatui::{Terminal, backend::Backend};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Output lines moved per PgUp/PgDn
const SCROLL_STEP: usize = 10;

/// Main application struct
pub struct App {
    state: AppState,
    registry: Arc<Registry>,
    executor: Arc<Executor>,
    ui_renderer: UiRenderer,
    keybinding_context: KeybindingContext,
    /// Channel sender for execution events (cloned into run threads)
    exec_tx: Sender<ExecEvent>,
    exec_rx: Receiver<ExecEvent>,
    /// Kills running scripts when the app goes away
    process_guard: ProcessGuard,
}

impl App {
    pub fn new(registry: Arc<Registry>, executor: Arc<Executor>) -> Self {
        let (exec_tx, exec_rx) = mpsc::channel();
        let mut app = Self {
            state: AppState::new(),
            registry,
            executor,
            ui_renderer: UiRenderer::new(),
            keybinding_context: KeybindingContext::new(),
            exec_tx,
            exec_rx,
            process_guard: ProcessGuard::new(),
        };
        app.refresh_lists();
        app
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the event loop until the user quits
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        info!("Starting main application loop");

        loop {
            self.poll_exec_events();

            terminal
                .draw(|frame| {
                    self.ui_renderer
                        .render(frame, &self.state, &self.keybinding_context)
                })
                .map_err(|e| XScriptError::terminal(format!("failed to draw: {e}")))?;

            if crossterm::event::poll(Duration::from_millis(50))? {
                if let Event::Key(key_event) = crossterm::event::read()? {
                    if self.handle_key_event(key_event)? {
                        break;
                    }
                }
            }
        }

        if let Some(running) = &self.state.running {
            info!(
                script = %running.name,
                tracked = self.process_guard.child_count(),
                "Quitting with a script still running"
            );
            running.cancel.cancel();
        }
        info!("Main application loop finished");
        Ok(())
    }

    /// Handle one key event; returns `true` when the app should exit
    pub fn handle_key_event(&mut self, key_event: KeyEvent) -> Result<bool> {
        match self.keybinding_context.resolve(self.state.mode, &key_event) {
            Some(command) => self.dispatch(command),
            None => Ok(false),
        }
    }

    /// Apply a command; returns `true` when the app should exit
    pub fn dispatch(&mut self, command: Command) -> Result<bool> {
        debug!(?command, mode = ?self.state.mode, "Dispatching command");

        match command {
            Command::Input(c) => {
                self.state.query.push(c);
                self.refresh_results();
            }
            Command::Backspace => {
                if self.state.query.pop().is_some() {
                    self.refresh_results();
                }
            }
            Command::ClearQuery => {
                self.state.query.clear();
                self.refresh_results();
            }
            Command::NavigateUp => self.state.select_previous(),
            Command::NavigateDown => self.state.select_next(),
            Command::Run => self.run_selected()?,
            Command::PickName => {
                if let Some(entry) = self.state.selected_entry() {
                    self.state.query = entry.name.clone();
                    self.state.mode = AppMode::Search;
                    self.refresh_results();
                }
            }
            Command::ToggleCatalog => {
                self.state.mode = match self.state.mode {
                    AppMode::Search => AppMode::Catalog,
                    AppMode::Catalog => AppMode::Search,
                };
                self.refresh_lists();
            }
            Command::Cancel => match &self.state.running {
                Some(running) => {
                    info!(script = %running.name, "Cancelling script");
                    running.cancel.cancel();
                    self.state.status_message = format!("Cancelling '{}'...", running.name);
                }
                None => self.state.status_message = "Nothing is running".to_string(),
            },
            Command::ScrollUp => self.state.scroll_up(SCROLL_STEP),
            Command::ScrollDown => self.state.scroll_down(SCROLL_STEP),
            Command::ClearOutput => self.state.clear_output(),
            Command::Reload => self.reload_catalog(),
            Command::Quit => return Ok(true),
        }

        Ok(false)
    }

    /// Drain pending execution events without blocking
    pub fn poll_exec_events(&mut self) {
        while let Ok(event) = self.exec_rx.try_recv() {
            match event {
                ExecEvent::Line(line) => self.state.push_output(line),
                ExecEvent::Finished { name, result } => {
                    self.state.running = None;
                    self.state.status_message = match result {
                        Ok(report) if report.cancelled => format!("'{name}' cancelled"),
                        Ok(report) if report.success => format!("'{name}' finished"),
                        Ok(report) => match report.exit_code {
                            Some(code) => format!("'{name}' failed with exit code {code}"),
                            None => format!("'{name}' failed"),
                        },
                        Err(e) => {
                            self.state.push_output(format!("Failed to start '{name}': {e}"));
                            format!("'{name}' could not be started")
                        }
                    };
                    // The run was recorded, so the ranking may have changed
                    self.refresh_lists();
                }
            }
        }
    }

    fn run_selected(&mut self) -> Result<()> {
        if let Some(running) = &self.state.running {
            self.state.status_message = format!("'{}' is still running", running.name);
            return Ok(());
        }

        let Some(entry) = self.state.selected_entry().cloned() else {
            self.state.status_message = "No matching script".to_string();
            return Ok(());
        };

        let cancel = CancelToken::new();
        self.executor
            .spawn(entry.clone(), cancel.clone(), self.exec_tx.clone())
            .map_err(|e| XScriptError::state(format!("failed to start run thread: {e}")))?;

        self.state.status_message = format!("Running '{}'...", entry.name);
        self.state.output_scroll = 0;
        self.state.running = Some(RunningScript {
            name: entry.name,
            cancel,
        });
        Ok(())
    }

    fn reload_catalog(&mut self) {
        match self.registry.load() {
            Ok(()) => {
                self.state.status_message =
                    format!("Reloaded {} scripts", self.registry.len());
            }
            Err(e) => {
                warn!(error = %e, "Catalog reload failed");
                self.state.status_message = format!("Reload failed: {e}");
            }
        }
        self.refresh_lists();
    }

    fn refresh_results(&mut self) {
        let results = self.registry.search(&self.state.query);
        self.state.set_results(results);
    }

    fn refresh_lists(&mut self) {
        self.refresh_results();
        self.state.set_catalog(self.registry.get_scripts());
    }
}
