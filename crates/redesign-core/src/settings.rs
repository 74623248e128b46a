use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{User, Workspace};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("settings file is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

// --- AI Settings ---

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AiSettings {
    pub provider: String,
    pub api_key: String,
    pub model: String,
}

pub fn ai_configured(settings: &AiSettings) -> bool {
    !settings.provider.is_empty()
        && !settings.model.is_empty()
        && (settings.provider == "ollama" || !settings.api_key.is_empty())
}

// --- Identity ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            id: "local-user".to_string(),
            workspace_id: Some("local-workspace".to_string()),
        }
    }
}

impl UserSettings {
    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            workspace: self
                .workspace_id
                .as_ref()
                .map(|id| Workspace { id: id.clone() }),
        }
    }
}

// --- Billing ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BillingSettings {
    #[serde(default = "default_plan")]
    pub default_plan: String,
    /// Plan overrides keyed by workspace id
    #[serde(default)]
    pub workspaces: HashMap<String, String>,
}

fn default_plan() -> String {
    "Free".to_string()
}

impl Default for BillingSettings {
    fn default() -> Self {
        Self {
            default_plan: default_plan(),
            workspaces: HashMap::new(),
        }
    }
}

// --- Analytics ---

/// What happens when an analytics event cannot be recorded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum AnalyticsPolicy {
    /// Failures abort the operation that emitted the event.
    #[default]
    Strict,
    /// Failures are logged and the operation continues.
    BestEffort,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSettings {
    /// HTTP endpoint receiving `track` calls. Events go to the log when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub write_key: String,
    #[serde(default)]
    pub policy: AnalyticsPolicy,
}

// --- Settings file ---

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub ai: AiSettings,
    pub user: UserSettings,
    pub billing: BillingSettings,
    pub analytics: AnalyticsSettings,
}

fn settings_path() -> PathBuf {
    crate::data_dir().join("settings.json")
}

/// Read ~/.redesign/settings.json. A missing file yields defaults.
pub fn read_settings() -> Result<Settings, SettingsError> {
    read_settings_from(&settings_path())
}

pub fn read_settings_from(path: &Path) -> Result<Settings, SettingsError> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
