use mediaserver_api::MediaServerType;
use serde::{Deserialize, Serialize};
use serde_default::DefaultFromSerde;
use std::fmt;
use std::fs;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::info;
use uuid::Uuid;

// Lazily-resolved data directory shared across the application.
// Priority: env var MEDIAGATE_DATA_DIR, else "./data" relative to current working dir.
// The directory is created on first access.
pub static DATA_DIR: LazyLock<PathBuf> = LazyLock::new(|| {
    let base = std::env::var("MEDIAGATE_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join("data")
        });
    if let Err(e) = std::fs::create_dir_all(&base) {
        eprintln!("Failed to create data directory {base:?}: {e}");
    }
    base
});

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_backend_url() -> String {
    "http://127.0.0.1:3000/api/v1/".to_string()
}

fn default_timeout() -> u64 {
    20
}

fn default_api_token() -> String {
    Uuid::new_v4().simple().to_string()
}

fn default_username() -> String {
    "admin".to_string()
}

fn default_api_prefix() -> UrlSegment {
    UrlSegment("api/v1/mediaserver".to_string())
}

/// A media server known to the backend, by name.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct MediaServerConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub server_type: MediaServerType,
}

#[derive(Debug, Clone, Deserialize, Serialize, DefaultFromSerde)]
pub struct AppConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    /// Comma-separated media server names; the first non-empty one serves
    /// play links.
    #[serde(default)]
    pub mediaserver: String,
    #[serde(default)]
    pub media_servers: Vec<MediaServerConfig>,

    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    #[serde(default)]
    pub backend_api_key: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout: u64, // in seconds

    #[serde(default = "default_api_token")]
    pub api_token: String,
    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default = "default_api_prefix")]
    pub api_prefix: UrlSegment,
}

impl AppConfig {
    pub fn primary_media_server(&self) -> Option<&str> {
        self.mediaserver
            .split(',')
            .map(str::trim)
            .find(|server| !server.is_empty())
    }
}

pub const DEFAULT_CONFIG_FILENAME: &str = "mediagate.toml";

fn config_path() -> PathBuf {
    DATA_DIR.join(DEFAULT_CONFIG_FILENAME)
}

fn dev_config_path() -> PathBuf {
    const DEV_CONFIG_FILENAME: &str = "mediagate.dev.toml";
    DATA_DIR.join(DEV_CONFIG_FILENAME)
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("MEDIAGATE")
        .prefix_separator("_")
        .separator("__")
}

/// Load configuration from known files and environment. Falls back to defaults.
pub fn load_config() -> AppConfig {
    let path = config_path();
    if cfg!(debug_assertions) {
        // In debug mode, also load a dev-specific config file if it exists.
        info!(
            "Loading config from {path:?} and dev config from {dev_config_path:?}",
            dev_config_path = dev_config_path()
        );
        load_config_from(&path, Some(&dev_config_path()))
    } else {
        load_config_from(&path, None)
    }
}

pub fn load_config_from(path: &Path, overlay: Option<&Path>) -> AppConfig {
    let mut builder = config::Config::builder()
        .add_source(config::File::with_name(path.to_string_lossy().as_ref()).required(false));
    if let Some(overlay) = overlay {
        builder = builder.add_source(
            config::File::with_name(overlay.to_string_lossy().as_ref()).required(false),
        );
    }
    let builder = builder.add_source(environment());

    let config = match builder.build() {
        Ok(c) => c.try_deserialize().unwrap_or_else(|e| {
            eprintln!("Invalid config, using defaults: {e}");
            AppConfig::default()
        }),
        Err(e) => {
            eprintln!("Failed to load config using defaults: {e}");
            AppConfig::default()
        }
    };

    if !path.exists() {
        if let Err(e) = save_config_to(&config, path) {
            eprintln!("Failed to save default config to {path:?}: {e}");
        }
    }

    config
}

/// Persist configuration so generated defaults (the api token) stay stable.
pub fn save_config_to(cfg: &AppConfig, path: &Path) -> std::io::Result<()> {
    let toml_str = toml::to_string_pretty(cfg)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    fs::write(path, toml_str)
}

// A normalized URL path segment (no leading/trailing slashes, non-empty).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UrlSegment(String);

impl UrlSegment {
    pub fn new<S: Into<String>>(s: S) -> Result<Self, &'static str> {
        let t = s
            .into()
            .trim_start_matches('/')
            .trim_end_matches('/')
            .to_string();
        if t.is_empty() {
            Err("empty UrlSegment")
        } else {
            Ok(UrlSegment(t))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for UrlSegment {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for UrlSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl serde::Serialize for UrlSegment {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for UrlSegment {
    fn deserialize<D>(deserializer: D) -> Result<UrlSegment, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        UrlSegment::new(s).map_err(serde::de::Error::custom)
    }
}
