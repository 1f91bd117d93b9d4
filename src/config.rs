use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Top-level client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the CareerPilot backend.
    pub api_base_url: String,
    /// Language tag handed to the speech recognizer.
    pub recognizer_lang: String,
    /// Timeout applied to every remote call, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000".into(),
            recognizer_lang: "en-US".into(),
            request_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Directory: ~/.config/careerpilot/
    pub(crate) fn dir() -> PathBuf {
        let mut p = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("careerpilot");
        p
    }

    fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load from disk, returning defaults if the file is missing or invalid.
    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Persist to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path())
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }
}
