//! The loaded configuration.yaml and its hub-wide sections

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{ConfigError, ConfigResult};
use crate::loader::{load_yaml, load_yaml_string};

/// Main configuration file inside the config directory
pub const CONFIG_FILE: &str = "configuration.yaml";

/// A loaded configuration document
#[derive(Debug, Clone)]
pub struct HubConfig {
    config_dir: PathBuf,
    root: Mapping,
}

impl HubConfig {
    /// Load `configuration.yaml` from `config_dir`; a missing file is an empty config
    pub fn load(config_dir: impl AsRef<Path>) -> ConfigResult<Self> {
        let config_dir = config_dir.as_ref();
        if !config_dir.join(CONFIG_FILE).exists() {
            info!(config_dir = %config_dir.display(), "No configuration.yaml, using defaults");
            return Ok(Self::empty(config_dir));
        }
        let root = load_yaml(config_dir, CONFIG_FILE)?;
        Self::from_value(config_dir, root)
    }

    /// Parse configuration text, resolving tags against `config_dir`
    pub fn parse(config_dir: impl AsRef<Path>, content: &str) -> ConfigResult<Self> {
        let config_dir = config_dir.as_ref();
        let root = load_yaml_string(config_dir, content)?;
        Self::from_value(config_dir, root)
    }

    pub fn empty(config_dir: impl AsRef<Path>) -> Self {
        Self {
            config_dir: config_dir.as_ref().to_path_buf(),
            root: Mapping::new(),
        }
    }

    fn from_value(config_dir: &Path, root: Value) -> ConfigResult<Self> {
        let root = match root {
            Value::Mapping(map) => map,
            Value::Null => Mapping::new(),
            _ => {
                return Err(ConfigError::InvalidValue {
                    key: "root".to_string(),
                    reason: "configuration must be a mapping".to_string(),
                })
            }
        };
        Ok(Self {
            config_dir: config_dir.to_path_buf(),
            root,
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Whether a top-level section is present
    pub fn has_section(&self, key: &str) -> bool {
        self.root.contains_key(key)
    }

    /// Deserialize a top-level section; an absent or empty section gives the default
    pub fn section<T>(&self, key: &str) -> ConfigResult<T>
    where
        T: DeserializeOwned + Default,
    {
        match self.root.get(key) {
            None | Some(Value::Null) => Ok(T::default()),
            Some(value) => {
                serde_yaml::from_value(value.clone()).map_err(|source| ConfigError::Section {
                    section: key.to_string(),
                    source,
                })
            }
        }
    }

    /// The `homeassistant:` section
    pub fn core(&self) -> ConfigResult<CoreConfig> {
        let mut core: CoreConfig = self.section("homeassistant")?;
        if core.media_dir.is_relative() {
            core.media_dir = self.config_dir.join(&core.media_dir);
        }
        Ok(core)
    }

    /// The `http:` section
    pub fn http(&self) -> ConfigResult<HttpConfig> {
        self.section("http")
    }
}

/// Hub-wide settings from the `homeassistant:` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Name of the installation, printed on receipts
    pub name: String,

    /// IANA time zone used for billing periods (e.g., "Asia/Riyadh")
    pub time_zone: String,

    /// Currency code printed on receipts (e.g., "SAR")
    pub currency: String,

    /// UI language code
    pub language: String,

    /// Root of the web-served media directory; relative paths are under the config dir
    pub media_dir: PathBuf,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            name: "Home".to_string(),
            time_zone: "UTC".to_string(),
            currency: "USD".to_string(),
            language: "en".to_string(),
            media_dir: PathBuf::from("www"),
        }
    }
}

/// REST API listener from the `http:` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub server_host: IpAddr,
    pub server_port: u16,
    /// Origins allowed by CORS; empty allows any origin
    pub cors_allowed_origins: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            server_host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            server_port: 8123,
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl HttpConfig {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server_host, self.server_port)
    }
}
