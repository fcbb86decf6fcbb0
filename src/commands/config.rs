use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ManagerError, Result};
use crate::resources::Edition;

/// Preferences are keyed by organization and application name.
pub const ORGANIZATION: &str = "V Rising";
pub const APPLICATION: &str = "Server Manager";

pub const DEFAULT_PORT: u16 = 21;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSettings {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub user: String,
    pub password: String,
    #[serde(default)]
    pub edition: Edition,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            user: String::new(),
            password: String::new(),
            edition: Edition::default(),
        }
    }
}

pub fn settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(ORGANIZATION).join(format!("{APPLICATION}.json")))
}

/// Stored settings, or defaults when the file is missing or unreadable.
pub fn load_settings(path: Option<&Path>) -> ConnectionSettings {
    path.and_then(|p| std::fs::read_to_string(p).ok())
        .and_then(|content| serde_json::from_str(&content).ok())
        .unwrap_or_default()
}

pub fn save_settings(path: Option<&Path>, settings: &ConnectionSettings) -> Result<()> {
    let path =
        path.ok_or_else(|| ManagerError::Custom("Cannot find config directory".into()))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, json)?;

    Ok(())
}
