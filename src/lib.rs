//! xscript library
//!
//! A keyword-searchable catalog of scripts and an executor that runs them
//! with stdout and stderr merged into one live line feed.

pub mod app;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod paths;
pub mod process_guard;
pub mod registry;
pub mod theme;
pub mod ui;

// Re-export main types for convenience
pub use catalog::{CatalogStore, ScriptEntry};
pub use config::{AppConfig, LogLevel};
pub use error::{ExecError, LoadError, PersistError, XScriptError};
pub use executor::{CancelToken, ExecEvent, Executor, OutputStream, RunReport};
pub use process_guard::{ChildRegistry, CommandProcessGroup, ProcessGuard};
pub use registry::Registry;
