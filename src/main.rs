//! xscript - main entry point
//!
//! Loads the configuration, sets up logging and the script registry, then
//! either runs one CLI command or starts the interactive launcher.

use anyhow::{Context, Result};
use chrono::Utc;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::stdout;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn};
use xscript::app::App;
use xscript::cli::{Cli, Commands};
use xscript::config::{AppConfig, CONFIG_FILE_NAME};
use xscript::ui::format_last_run;
use xscript::{CatalogStore, Executor, Registry, ScriptEntry, logging, paths, process_guard};

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            eprintln!("✗ {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse_args();
    let command = cli.command.unwrap_or(Commands::Ui);

    let base_dir = cli.config_dir.unwrap_or_else(paths::app_data_dir);
    let mut config = AppConfig::load(&base_dir)
        .with_context(|| format!("Failed to load configuration from {:?}", base_dir))?;
    if cli.debug {
        config.debug_mode = true;
    }
    config.validate()?;

    // The TUI owns the terminal, so only CLI commands may log to stderr
    let console = config.debug_mode && command != Commands::Ui;
    let _logging = logging::init(&config, &base_dir, console)?;
    info!(version = env!("CARGO_PKG_VERSION"), ?command, "xscript starting up");

    if command == Commands::Config {
        print_config(&config, &base_dir)?;
        return Ok(ExitCode::SUCCESS);
    }

    let registry = Arc::new(Registry::new(
        CatalogStore::new(config.catalog_path()),
        info_span!("registry"),
    ));
    registry
        .load()
        .with_context(|| format!("Failed to load script catalog {:?}", registry.catalog_path()))?;

    let executor = Arc::new(Executor::from_config(
        &config,
        Arc::clone(&registry),
        info_span!("executor"),
    ));

    match command {
        Commands::Ui => run_tui(registry, executor),
        Commands::List => {
            print_entries(&registry.get_scripts());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Search { keyword } => {
            print_entries(&registry.search(&keyword));
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run { query } => run_script(&registry, &executor, &query),
        Commands::Config => Ok(ExitCode::SUCCESS),
    }
}

fn run_tui(registry: Arc<Registry>, executor: Arc<Executor>) -> Result<ExitCode> {
    debug!("Initializing terminal for TUI mode");

    enable_raw_mode().context("Failed to enable raw mode")?;
    if let Err(e) = crossterm::execute!(stdout(), EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(e).context("Failed to enter alternate screen");
    }

    let result = Terminal::new(CrosstermBackend::new(stdout()))
        .context("Failed to create terminal")
        .and_then(|mut terminal| {
            let mut app = App::new(registry, executor);
            app.run(&mut terminal).context("Launcher failed")
        });

    // Always attempt cleanup, even if the app failed
    let _ = disable_raw_mode();
    let _ = crossterm::execute!(stdout(), LeaveAlternateScreen);

    result.map(|()| ExitCode::SUCCESS)
}

fn run_script(registry: &Registry, executor: &Executor, query: &str) -> Result<ExitCode> {
    if let Err(e) = process_guard::init_signal_handlers() {
        warn!(error = %e, "Failed to initialize signal handlers");
    }
    let _guard = process_guard::ProcessGuard::new();

    let Some(entry) = registry.search(query).into_iter().next() else {
        eprintln!("✗ No script matches '{query}'");
        return Ok(ExitCode::FAILURE);
    };

    match executor.execute(&entry, |line| println!("{line}")) {
        Ok(report) if report.success => Ok(ExitCode::SUCCESS),
        Ok(_) => Ok(ExitCode::FAILURE),
        Err(e) => {
            eprintln!("✗ {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_entries(entries: &[ScriptEntry]) {
    let now = Utc::now();
    let width = entries.iter().map(|e| e.name.len()).max().unwrap_or(0);
    for entry in entries {
        println!(
            "{:<width$}  {:<10}  {}",
            entry.name,
            format_last_run(entry.last_run_time, now),
            entry.description,
        );
    }
}

fn print_config(config: &AppConfig, base_dir: &std::path::Path) -> Result<()> {
    let config_path: PathBuf = base_dir.join(CONFIG_FILE_NAME);
    println!("Config file: {}", config_path.display());
    println!("Catalog:     {}", config.catalog_path().display());
    println!("Log file:    {}", config.log_path(base_dir).display());
    println!(
        "{}",
        serde_json::to_string_pretty(config).context("Failed to serialize configuration")?
    );
    Ok(())
}
