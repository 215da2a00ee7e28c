use directories::ProjectDirs;
use std::ffi::OsString;
use std::path::PathBuf;

const APP_NAME: &str = "tango";

/// Overrides both the config and the log directory when set.
pub const HOME_ENV: &str = "TANGO_HOME";

/// Where tango keeps its files
pub struct AppDirs;

impl AppDirs {
    fn project() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", APP_NAME)
    }

    pub fn config_path() -> Option<PathBuf> {
        Self::config_path_in(std::env::var_os(HOME_ENV))
    }

    /// `~/.local/state/tango/tango.log`, or the platform data dir without `HOME`.
    pub fn log_path() -> Option<PathBuf> {
        Self::log_path_in(std::env::var_os(HOME_ENV), std::env::var_os("HOME"))
    }

    fn config_path_in(override_dir: Option<OsString>) -> Option<PathBuf> {
        let dir = match override_dir {
            Some(dir) => PathBuf::from(dir),
            None => Self::project()?.config_dir().to_path_buf(),
        };
        Some(dir.join("config.json"))
    }

    fn log_path_in(override_dir: Option<OsString>, home: Option<OsString>) -> Option<PathBuf> {
        let dir = match (override_dir, home) {
            (Some(dir), _) => PathBuf::from(dir),
            (None, Some(home)) => PathBuf::from(home).join(".local/state").join(APP_NAME),
            (None, None) => Self::project()?.data_local_dir().to_path_buf(),
        };
        Some(dir.join(format!("{APP_NAME}.log")))
    }
}
