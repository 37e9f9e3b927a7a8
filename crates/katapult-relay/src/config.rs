use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_JOB_ID: &str = "-OT77Az4JJlgEgQOASe0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelaySettings {
    pub bind_addr: String,
    pub upstream_base_url: String,
    /// The single origin allowed by the CORS headers.
    pub allowed_origin: String,
    /// Job used by the filter endpoints when the caller names none.
    pub default_job_id: String,
    pub request_timeout_secs: Option<u64>,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8787".to_string(),
            upstream_base_url: katapult_client::DEFAULT_BASE_URL.to_string(),
            allowed_origin: "https://dcs.katapultpro.com".to_string(),
            default_job_id: DEFAULT_JOB_ID.to_string(),
            request_timeout_secs: None,
        }
    }
}

impl RelaySettings {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Resolve the settings directory (~/.katapult-relay/).
pub fn settings_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".katapult-relay")
}

pub fn default_settings_path() -> PathBuf {
    settings_dir().join("settings.json")
}

/// Read settings from `path`. A missing file gives the defaults; so does an
/// unreadable one, with a warning.
pub fn read_settings(path: &Path) -> RelaySettings {
    if !path.exists() {
        return RelaySettings::default();
    }
    match fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|raw| serde_json::from_str(&raw).map_err(|e| e.to_string()))
    {
        Ok(settings) => settings,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable settings file");
            RelaySettings::default()
        }
    }
}

/// Relay Katapult Pro job endpoints with attribute filtering
#[derive(Debug, Default, Parser)]
#[command(name = "katapult-relay", version)]
pub struct Cli {
    /// Settings file (default: ~/.katapult-relay/settings.json)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Address to listen on, e.g. 127.0.0.1:8787
    #[arg(long)]
    pub bind: Option<String>,
    /// Upstream API base, e.g. https://dcs.katapultpro.com/api/v3
    #[arg(long)]
    pub upstream: Option<String>,
    /// Origin allowed by CORS
    #[arg(long)]
    pub allowed_origin: Option<String>,
    /// Job used when a filter request names none
    #[arg(long, allow_hyphen_values = true)]
    pub default_job_id: Option<String>,
    /// Upstream request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

impl Cli {
    /// Settings file values, overridden by whatever was given on the command line.
    pub fn into_settings(self) -> RelaySettings {
        let path = self.config.clone().unwrap_or_else(default_settings_path);
        self.apply(read_settings(&path))
    }

    fn apply(self, mut settings: RelaySettings) -> RelaySettings {
        if let Some(bind) = self.bind {
            settings.bind_addr = bind;
        }
        if let Some(upstream) = self.upstream {
            settings.upstream_base_url = upstream;
        }
        if let Some(origin) = self.allowed_origin {
            settings.allowed_origin = origin;
        }
        if let Some(job_id) = self.default_job_id {
            settings.default_job_id = job_id;
        }
        if let Some(secs) = self.timeout_secs {
            settings.request_timeout_secs = Some(secs);
        }
        settings
    }
}
