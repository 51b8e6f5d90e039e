//! Application directory resolution

use std::path::PathBuf;

/// Directory name under the user's config directory
pub const APP_DIR_NAME: &str = "x-script";

/// Per-user data directory holding `config.json` and the logs.
///
/// `$XDG_CONFIG_HOME/x-script` (or the platform equivalent); falls back to
/// `<install root>/data` when no config directory is known.
pub fn app_data_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .unwrap_or_else(|| root_dir().join("data"))
}

/// Install root: the parent of the directory holding the executable
pub fn root_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().and_then(|bin| bin.parent()).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_data_dir_ends_with_app_name() {
        let dir = app_data_dir();
        assert!(dir.ends_with(APP_DIR_NAME) || dir.ends_with("data"));
    }
}
