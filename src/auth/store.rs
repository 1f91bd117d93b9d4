use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::config::Config;
use crate::error::Result;

/// Durable single-slot storage for the raw session token.
pub trait CredentialStore: Send + Sync {
    fn load_token(&self) -> Result<Option<String>>;
    fn store_token(&self, token: &str) -> Result<()>;
    fn clear_token(&self) -> Result<()>;
}

/// Keeps the token in a plain file next to the client configuration.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new() -> Self {
        Self::at(Config::dir().join("session.token"))
    }

    /// Use an explicit file location.
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Default for FileCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for FileCredentialStore {
    fn load_token(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(token) if token.is_empty() => Ok(None),
            Ok(token) => Ok(Some(token)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn store_token(&self, token: &str) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&self.path, token)?;
        Ok(())
    }

    fn clear_token(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
