// Profile module - remembers the server and acting user between invocations

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Server used when neither a flag, the environment nor the profile names one.
pub const DEFAULT_SERVER: &str = "http://localhost:8000";

/// Saved login state, stored as JSON in ~/.adflow/profile.json
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Profile {
    /// Flag or environment value first, then the saved server, then the default.
    pub fn resolve_server(&self, explicit: Option<&str>) -> String {
        explicit
            .map(str::to_string)
            .or_else(|| self.server.clone())
            .unwrap_or_else(|| DEFAULT_SERVER.to_string())
            .trim_end_matches('/')
            .to_string()
    }

    pub fn resolve_user(&self, explicit: Option<Uuid>) -> Option<Uuid> {
        explicit.or(self.user_id)
    }
}

/// Get the default profile path (~/.adflow/profile.json)
pub fn profile_path() -> Result<PathBuf> {
    #[cfg(unix)]
    let home = std::env::var("HOME")
        .map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;

    #[cfg(windows)]
    let home = std::env::var("USERPROFILE")
        .map_err(|_| anyhow::anyhow!("USERPROFILE environment variable not set"))?;

    Ok(PathBuf::from(home).join(".adflow").join("profile.json"))
}

/// Loads a profile. A missing file is an empty profile.
pub fn load_from(path: &Path) -> Result<Profile> {
    if !path.exists() {
        return Ok(Profile::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read profile '{}'", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse profile '{}'", path.display()))
}

pub fn save_to(path: &Path, profile: &Profile) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create '{}'", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(profile)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::write(path, &json)?;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }

    #[cfg(not(unix))]
    {
        std::fs::write(path, &json)?;
    }

    Ok(())
}

pub fn load() -> Result<Profile> {
    load_from(&profile_path()?)
}

pub fn save(profile: &Profile) -> Result<()> {
    save_to(&profile_path()?, profile)
}
