//! Service configuration.
//!
//! Loaded from an optional YAML file; every section and key may be omitted and
//! falls back to its default. `SCHEMAGATE_ADDR` and `SCHEMAGATE_MAX_BODY_BYTES`
//! override the file.
//!
//! ```yaml
//! service:
//!   title: Bank Ledger
//!   version: 1.0.0
//! http:
//!   addr: 0.0.0.0:8080
//!   max_body_bytes: 1048576
//! schema:
//!   allow_extra_fields: false
//! docs:
//!   enabled: true
//!   openapi_json_path: /openapi.json
//!   openapi_yaml_path: /openapi.yaml
//!   docs_path: /docs
//!   health_path: /health
//! ```

use crate::dispatcher::{BuiltinEndpoints, DispatcherConfig};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

pub const ADDR_ENV: &str = "SCHEMAGATE_ADDR";
pub const MAX_BODY_BYTES_ENV: &str = "SCHEMAGATE_MAX_BODY_BYTES";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    pub service: ServiceSection,
    pub http: HttpSection,
    pub schema: SchemaSection,
    pub docs: DocsSection,
}

/// Metadata published in the generated documentation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceSection {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            title: "Bank Ledger".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpSection {
    pub addr: String,
    pub max_body_bytes: usize,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8080".to_string(),
            max_body_bytes: DispatcherConfig::default().max_body_bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct SchemaSection {
    /// Drop unknown object members instead of rejecting them
    pub allow_extra_fields: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DocsSection {
    /// Serve the documentation and health endpoints at all
    pub enabled: bool,
    pub openapi_json_path: String,
    pub openapi_yaml_path: String,
    pub docs_path: String,
    pub health_path: String,
}

impl Default for DocsSection {
    fn default() -> Self {
        let builtins = BuiltinEndpoints::default();
        Self {
            enabled: true,
            openapi_json_path: builtins.openapi_json.unwrap_or_default(),
            openapi_yaml_path: builtins.openapi_yaml.unwrap_or_default(),
            docs_path: builtins.docs.unwrap_or_default(),
            health_path: builtins.health.unwrap_or_default(),
        }
    }
}

impl ServiceConfig {
    /// Parse YAML; an empty document yields the defaults.
    ///
    /// # Errors
    ///
    /// Malformed YAML or unknown keys.
    pub fn from_yaml_str(contents: &str) -> anyhow::Result<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents).context("Failed to parse service config")
    }

    /// Load from `path`.
    ///
    /// # Errors
    ///
    /// Unreadable file or invalid contents.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read service config: {}", path.display()))?;
        Self::from_yaml_str(&contents)
            .with_context(|| format!("Invalid service config: {}", path.display()))
    }

    /// Load `path` when given, otherwise start from defaults; then apply the environment.
    ///
    /// # Errors
    ///
    /// See [`ServiceConfig::load`] and [`ServiceConfig::apply_overrides`].
    pub fn resolve(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(p) => Self::load(p)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `SCHEMAGATE_ADDR` / `SCHEMAGATE_MAX_BODY_BYTES` from `lookup`.
    ///
    /// # Errors
    ///
    /// A max body size that is not a positive integer.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<()> {
        if let Some(addr) = lookup(ADDR_ENV).filter(|a| !a.trim().is_empty()) {
            self.http.addr = addr.trim().to_string();
        }
        if let Some(raw) = lookup(MAX_BODY_BYTES_ENV) {
            let bytes: usize = raw
                .trim()
                .parse()
                .with_context(|| format!("{MAX_BODY_BYTES_ENV} must be an integer, got '{raw}'"))?;
            anyhow::ensure!(bytes > 0, "{MAX_BODY_BYTES_ENV} must be positive");
            self.http.max_body_bytes = bytes;
        }
        Ok(())
    }

    /// Dispatcher settings derived from the `http` and `docs` sections
    #[must_use]
    pub fn dispatcher_config(&self) -> DispatcherConfig {
        let path = |p: &str| Some(p.to_string()).filter(|p| self.docs.enabled && !p.is_empty());
        DispatcherConfig {
            max_body_bytes: self.http.max_body_bytes,
            builtins: BuiltinEndpoints {
                health: path(&self.docs.health_path),
                openapi_json: path(&self.docs.openapi_json_path),
                openapi_yaml: path(&self.docs.openapi_yaml_path),
                docs: path(&self.docs.docs_path),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = ServiceConfig::from_yaml_str("http:\n  addr: 0.0.0.0:9000\n").unwrap();
        assert_eq!(config.http.addr, "0.0.0.0:9000");
        assert_eq!(config.http.max_body_bytes, 1024 * 1024);
        assert_eq!(config.docs, DocsSection::default());
        assert!(!config.schema.allow_extra_fields);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = ServiceConfig::from_yaml_str("http:\n  port: 80\n").unwrap_err();
        assert!(format!("{err:#}").contains("port"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "service:\n  title: Test Ledger\n  version: 9.9.9\nschema:\n  allow_extra_fields: true"
        )
        .unwrap();
        let config = ServiceConfig::load(file.path()).unwrap();
        assert_eq!(config.service.title, "Test Ledger");
        assert_eq!(config.service.version, "9.9.9");
        assert!(config.schema.allow_extra_fields);
    }

    #[test]
    fn test_load_missing_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");
        let err = ServiceConfig::load(&missing).unwrap_err();
        assert!(format!("{err:#}").contains("nope.yaml"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ServiceConfig::default();
        config
            .apply_overrides(|k| match k {
                ADDR_ENV => Some("0.0.0.0:1234".to_string()),
                MAX_BODY_BYTES_ENV => Some("2048".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.http.addr, "0.0.0.0:1234");
        assert_eq!(config.http.max_body_bytes, 2048);

        assert!(config
            .apply_overrides(|k| (k == MAX_BODY_BYTES_ENV).then(|| "0".to_string()))
            .is_err());
    }

    #[test]
    fn test_disabled_docs_remove_builtins() {
        let config = ServiceConfig::from_yaml_str("docs:\n  enabled: false\n").unwrap();
        let dispatcher = config.dispatcher_config();
        assert_eq!(dispatcher.builtins, BuiltinEndpoints::none());

        let enabled = ServiceConfig::default().dispatcher_config();
        assert_eq!(enabled.builtins.docs.as_deref(), Some("/docs"));
    }
}
