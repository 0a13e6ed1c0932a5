use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::AuthTokens;

/// The persisted login session: access and refresh tokens, created at login
/// and removed at logout. No expiry handling; a stale token just produces a
/// 401 from the backend.
pub struct Session {
    pub tokens: AuthTokens,
}

impl Session {
    pub fn new(tokens: AuthTokens) -> Self {
        Self { tokens }
    }

    fn default_path() -> Result<PathBuf> {
        // Use XDG data directory or fallback
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "apptrack") {
            Ok(proj_dirs.data_dir().join("session.json"))
        } else {
            Ok(PathBuf::from("session.json"))
        }
    }

    pub fn load() -> Result<Option<Self>> {
        Self::load_from(&Self::default_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read session file: {:?}", path))?;
        let tokens: AuthTokens = serde_json::from_str(&raw)
            .with_context(|| format!("Corrupt session file: {:?}", path))?;
        Ok(Some(Self { tokens }))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(&self.tokens)?;
        fs::write(path, raw)
            .with_context(|| format!("Failed to write session file: {:?}", path))?;
        Ok(())
    }

    pub fn clear() -> Result<()> {
        Self::clear_at(&Self::default_path()?)
    }

    pub fn clear_at(path: &Path) -> Result<()> {
        if path.exists() {
            fs::remove_file(path)
                .with_context(|| format!("Failed to remove session file: {:?}", path))?;
        }
        Ok(())
    }

    pub fn access_token(&self) -> &str {
        &self.tokens.access
    }
}
