use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app_dirs::AppDirs;

/// Quiz defaults and limits; missing keys in a stored file fall back to these.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub default_question_count: usize,
    pub use_all_questions: bool,
    pub use_timer: bool,
    pub answer_secs: u32,
    pub min_answer_secs: u32,
    pub max_answer_secs: u32,
    pub limit_attempts: bool,
    pub attempts_per_question: u32,
    pub min_attempts: u32,
    pub max_attempts: u32,
    pub duplicate_questions: bool,
    pub time_warning_secs: u32,
    /// Highlight length when an entry has no narration duration
    pub default_narration_secs: f64,
    pub final_delay_ms: u64,
    /// Fireworks play at or above this correct ratio
    pub celebration_ratio: f64,
    pub narration_dir: String,
    pub categories: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_question_count: 25,
            use_all_questions: false,
            use_timer: true,
            answer_secs: 20,
            min_answer_secs: 5,
            max_answer_secs: 60,
            limit_attempts: true,
            attempts_per_question: 3,
            min_attempts: 1,
            max_attempts: 10,
            duplicate_questions: false,
            time_warning_secs: 3,
            default_narration_secs: 0.5,
            final_delay_ms: 1000,
            celebration_ratio: 0.25,
            narration_dir: "media/audio/english".to_string(),
            categories: Vec::new(),
        }
    }
}

impl Config {
    pub fn time_warning(&self) -> Duration {
        Duration::from_secs(self.time_warning_secs as u64)
    }

    pub fn final_delay(&self) -> Duration {
        Duration::from_millis(self.final_delay_ms)
    }

    pub fn default_narration(&self) -> Duration {
        Duration::try_from_secs_f64(self.default_narration_secs).unwrap_or(Duration::from_millis(500))
    }

    pub fn narration_path(&self, file: &str) -> String {
        if self.narration_dir.is_empty() {
            file.to_string()
        } else {
            format!("{}/{}", self.narration_dir.trim_end_matches('/'), file)
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("tango_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        let Ok(bytes) = fs::read(&self.path) else {
            return Config::default();
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!("ignoring unreadable config {}: {}", self.path.display(), e);
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}
