use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// xscript - find a script by keyword and run it with live output
#[derive(Parser, Debug)]
#[command(name = "xscript")]
#[command(about = "Keyword script launcher with live output streaming")]
#[command(version)]
pub struct Cli {
    /// Directory holding config.json and logs (defaults to the user config dir)
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    /// Debug logging; in CLI mode logs are mirrored to stderr
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Open the interactive launcher (default)
    Ui,
    /// List the catalog in file order
    List,
    /// Show scripts matching a keyword, best suggestion first
    Search {
        /// Keyword matched against names and keywords (empty lists everything)
        #[arg(default_value = "")]
        keyword: String,
    },
    /// Run the best match for a query and stream its output
    Run {
        /// Keyword selecting the script; the top search result runs
        query: String,
    },
    /// Print the configuration file location and effective settings
    Config,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_means_ui() {
        let cli = Cli::try_parse_from(["xscript"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.debug);
    }

    #[test]
    fn test_run_with_global_flags() {
        let cli =
            Cli::try_parse_from(["xscript", "run", "ocr", "--debug", "--config-dir", "/tmp/x"])
                .unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Run {
                query: "ocr".to_string()
            })
        );
        assert!(cli.debug);
        assert_eq!(cli.config_dir, Some(PathBuf::from("/tmp/x")));
    }

    #[test]
    fn test_search_keyword_defaults_to_empty() {
        let cli = Cli::try_parse_from(["xscript", "search"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Search {
                keyword: String::new()
            })
        );
    }
}
