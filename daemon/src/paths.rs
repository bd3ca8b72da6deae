/// Canonical locations of the daemon's two data files, both under the
/// platform config directory (e.g. ~/.config/lookout on Linux,
/// %APPDATA%\lookout on Windows):
///   - config.toml  Read at startup, reloaded on change, saved at exit.
///   - status.toml  Written by the daemon, read by any front-end.
use std::path::PathBuf;

const APP_DIR_NAME: &str = "lookout";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const STATUS_FILE_NAME: &str = "status.toml";

/// Returns the daemon's data directory. Falls back to the working
/// directory on platforms without a known config dir.
pub fn app_data_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

pub fn config_file_path() -> PathBuf {
    app_data_dir().join(CONFIG_FILE_NAME)
}

pub fn status_file_path() -> PathBuf {
    app_data_dir().join(STATUS_FILE_NAME)
}
