//! Values substituted for `!secret` tags, read from secrets.yaml

use crate::error::{ConfigError, ConfigResult};
use serde_yaml::Value;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the secrets store inside the config directory
pub const SECRETS_FILE: &str = "secrets.yaml";

/// Secrets loaded from secrets.yaml
///
/// Values are kept as strings. `Debug` prints only the keys.
#[derive(Clone, Default)]
pub struct Secrets {
    values: HashMap<String, String>,
    path: Option<PathBuf>,
}

impl Secrets {
    /// Load `secrets.yaml` from `config_dir`; a missing file yields no secrets
    pub fn load(config_dir: &Path) -> ConfigResult<Self> {
        let path = config_dir.join(SECRETS_FILE);
        if !path.exists() {
            debug!(path = %path.display(), "No secrets file, continuing without secrets");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|e| ConfigError::ReadFile {
            path: path.clone(),
            source: e,
        })?;

        let mut secrets = Self::parse(&content, &path)?;
        debug!(count = secrets.values.len(), path = %path.display(), "Loaded secrets");
        secrets.path = Some(path);
        Ok(secrets)
    }

    /// Parse secrets from YAML text
    pub fn parse(content: &str, source: &Path) -> ConfigResult<Self> {
        let raw: Option<HashMap<String, Value>> =
            serde_yaml::from_str(content).map_err(|e| ConfigError::ParseYaml {
                path: source.to_path_buf(),
                source: e,
            })?;

        let values = raw
            .unwrap_or_default()
            .into_iter()
            .map(|(key, value)| (key, scalar_to_string(value)))
            .collect();

        Ok(Self { values, path: None })
    }

    /// Value of a secret
    pub fn get(&self, key: &str) -> ConfigResult<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| ConfigError::SecretNotFound {
                key: key.to_string(),
            })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Path the secrets were loaded from, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.values.keys().collect();
        keys.sort();
        f.debug_struct("Secrets")
            .field("keys", &keys)
            .field("path", &self.path)
            .finish()
    }
}

fn scalar_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_secrets() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(SECRETS_FILE),
            "tariff_rate: 0.18\nfixed_charge: 25\ndb_password: hunter2\nenabled: true\n",
        )
        .unwrap();

        let secrets = Secrets::load(dir.path()).unwrap();
        assert_eq!(secrets.get("tariff_rate").unwrap(), "0.18");
        assert_eq!(secrets.get("fixed_charge").unwrap(), "25");
        assert_eq!(secrets.get("db_password").unwrap(), "hunter2");
        assert_eq!(secrets.get("enabled").unwrap(), "true");
        assert_eq!(secrets.len(), 4);
        assert_eq!(secrets.path(), Some(dir.path().join(SECRETS_FILE).as_path()));
    }

    #[test]
    fn test_missing_secret() {
        let secrets = Secrets::parse("key: value\n", Path::new(SECRETS_FILE)).unwrap();
        assert!(secrets.contains("key"));
        assert!(matches!(
            secrets.get("nonexistent"),
            Err(ConfigError::SecretNotFound { .. })
        ));
    }

    #[test]
    fn test_no_secrets_file() {
        let dir = TempDir::new().unwrap();
        let secrets = Secrets::load(dir.path()).unwrap();
        assert!(secrets.is_empty());
        assert!(secrets.path().is_none());
    }

    #[test]
    fn test_empty_secrets_file() {
        let secrets = Secrets::parse("", Path::new(SECRETS_FILE)).unwrap();
        assert!(secrets.is_empty());
    }

    #[test]
    fn test_debug_hides_values() {
        let secrets = Secrets::parse("db_password: hunter2\n", Path::new(SECRETS_FILE)).unwrap();
        let printed = format!("{:?}", secrets);
        assert!(printed.contains("db_password"));
        assert!(!printed.contains("hunter2"));
    }
}
