//! YAML configuration loading for the Novu hub
//!
//! `configuration.yaml` is read from the config directory with three custom
//! tags resolved while loading:
//!
//! - `!include path` - include another YAML file, relative to the including file
//! - `!secret key` - substitute a value from `secrets.yaml`
//! - `!env_var VAR` - substitute an environment variable
//!
//! The loaded document is wrapped in a [`HubConfig`], from which every crate
//! deserializes its own top-level section.
//!
//! ```ignore
//! use novu_config::HubConfig;
//!
//! let config = HubConfig::load("/config")?;
//! let core = config.core()?;
//! let recorder: RecorderConfig = config.section("recorder")?;
//! ```

mod error;
mod hub_config;
mod loader;
mod secrets;

pub use error::{ConfigError, ConfigResult};
pub use hub_config::{CoreConfig, HttpConfig, HubConfig, CONFIG_FILE};
pub use loader::{load_yaml, load_yaml_string, YamlLoader};
pub use secrets::Secrets;

pub use serde_yaml::Value;
