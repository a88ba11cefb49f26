use serde::Deserialize;
use std::{fs, io, path::Path, time::Duration};

use pvlive_client::{api::DEFAULT_BASE_URL, EntityType, PvLiveConfig};

use crate::transform::DisplayZone;

pub const MIN_REFRESH_SECS: u64 = 10;
pub const MAX_REFRESH_SECS: u64 = 600;
pub const REFRESH_STEP_SECS: u64 = 10;

const CONFIG_ENV: &str = "PV_DASHBOARD_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "pv-dashboard.toml";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read { path: String, source: io::Error },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub entity_type: EntityType,
    pub entity_id: u32,
    pub period_minutes: u32,
    pub ssl_verify: bool,
    pub request_timeout_secs: Option<u64>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            entity_type: EntityType::Pes,
            entity_id: 0,
            period_minutes: 5,
            ssl_verify: true,
            request_timeout_secs: None,
        }
    }
}

impl ProviderConfig {
    pub fn client_config(&self) -> PvLiveConfig {
        PvLiveConfig {
            base_url: self.base_url.clone(),
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            ssl_verify: self.ssl_verify,
            timeout: self.request_timeout_secs.map(Duration::from_secs),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub interval_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub time_zone: String,
    pub bind_addr: String,
    pub title: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            time_zone: "Europe/Paris".to_string(),
            bind_addr: "0.0.0.0:8501".to_string(),
            title: "Live PV Generation Data".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub refresh: RefreshConfig,
    pub display: DisplayConfig,
    pub metrics: Option<MetricsConfig>,
}

/// Refresh intervals follow the dashboard slider: 10 to 600 seconds in steps of 10.
pub fn validate_refresh_secs(secs: u64) -> Result<(), ConfigError> {
    if !(MIN_REFRESH_SECS..=MAX_REFRESH_SECS).contains(&secs) || secs % REFRESH_STEP_SECS != 0 {
        return Err(ConfigError::Invalid(format!(
            "refresh interval must be {MIN_REFRESH_SECS}..={MAX_REFRESH_SECS} seconds in steps of {REFRESH_STEP_SECS}, got {secs}"
        )));
    }
    Ok(())
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let cfg = Self::from_path(&path)?;
        Ok(cfg)
    }

    /// Reads the file at `path`; a missing file yields the defaults.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "config file not found, using defaults");
                let cfg = Self::default();
                cfg.validate()?;
                Ok(cfg)
            }
            Err(source) => Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let cfg: AppConfig = toml::from_str(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_refresh_secs(self.refresh.interval_secs)?;

        if self.provider.period_minutes == 0 {
            return Err(ConfigError::Invalid("provider.period_minutes must be positive".to_string()));
        }

        self.display_zone()?;
        Ok(())
    }

    pub fn display_zone(&self) -> Result<DisplayZone, ConfigError> {
        DisplayZone::by_name(&self.display.time_zone)
            .ok_or_else(|| ConfigError::Invalid(format!("unknown time zone '{}'", self.display.time_zone)))
    }
}
