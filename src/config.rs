//! Runtime configuration: CLI flags override environment variables, which
//! override built-in defaults. Identity backend settings are never defaulted.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::access::{AccessPolicy, NavigationTable};
use crate::error::AppError;

pub const ENV_HTTP_PORT: &str = "PORTAL_HTTP_PORT";
pub const ENV_DATA_DIR: &str = "PORTAL_DATA_DIR";
pub const ENV_ACCESS_FILE: &str = "PORTAL_ACCESS_FILE";
pub const ENV_IDENTITY_ENDPOINT: &str = "PORTAL_IDENTITY_ENDPOINT";
pub const ENV_IDENTITY_PROJECT: &str = "PORTAL_IDENTITY_PROJECT";
pub const ENV_IDENTITY_API_KEY: &str = "PORTAL_IDENTITY_API_KEY";

pub const DEFAULT_HTTP_PORT: u16 = 8080;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(&'static str),
    #[error("invalid configuration {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
    #[error("cannot load access file {path}: {reason}")]
    AccessFile { path: String, reason: String },
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        let code = match err {
            ConfigError::Missing(_) => "missing_config",
            ConfigError::Invalid { .. } => "invalid_config",
            ConfigError::AccessFile { .. } => "access_file",
        };
        AppError::Config { code: code.to_string(), message: err.to_string() }
    }
}

/// Connection settings for the identity backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentitySettings {
    pub endpoint: String,
    pub project: String,
    pub api_key: Option<String>,
}

impl IdentitySettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Endpoint and project are required. The admin key is checked only by
    /// callers that need it (see `require_api_key`).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |k: &'static str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let endpoint = get(ENV_IDENTITY_ENDPOINT).ok_or(ConfigError::Missing(ENV_IDENTITY_ENDPOINT))?;
        let project = get(ENV_IDENTITY_PROJECT).ok_or(ConfigError::Missing(ENV_IDENTITY_PROJECT))?;
        Ok(Self { endpoint, project, api_key: get(ENV_IDENTITY_API_KEY) })
    }

    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key.as_deref().ok_or(ConfigError::Missing(ENV_IDENTITY_API_KEY))
    }
}

/// Contents of the optional access file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    pub policy: AccessPolicy,
    pub navigation: NavigationTable,
}

impl AccessConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let err = |reason: String| ConfigError::AccessFile { path: path.display().to_string(), reason };
        let bytes = std::fs::read(path).map_err(|e| err(e.to_string()))?;
        let cfg: AccessConfig = serde_json::from_slice(&bytes).map_err(|e| err(e.to_string()))?;
        // A prefix without a leading slash would never match and leave its paths public
        if let Some(rule) = cfg.policy.routes.rules().iter().find(|r| !r.prefix.starts_with('/')) {
            return Err(err(format!("route prefix {:?} must start with '/'", rule.prefix)));
        }
        Ok(cfg)
    }
}

/// Server process settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalConfig {
    pub http_port: u16,
    pub data_dir: Option<PathBuf>,
    pub access_file: Option<PathBuf>,
}

impl Default for PortalConfig {
    fn default() -> Self { Self { http_port: DEFAULT_HTTP_PORT, data_dir: None, access_file: None } }
}

impl PortalConfig {
    pub fn from_args_and_env(args: &[String]) -> Result<Self, ConfigError> {
        Self::resolve(args, |k| std::env::var(k).ok())
    }

    pub fn resolve(args: &[String], lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let http_port = match parse_arg(args, "--http-port").or_else(|| lookup(ENV_HTTP_PORT)) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::Invalid { name: ENV_HTTP_PORT, reason: e.to_string() })?,
            None => DEFAULT_HTTP_PORT,
        };
        let data_dir = parse_arg(args, "--data-dir").or_else(|| lookup(ENV_DATA_DIR)).map(PathBuf::from);
        let access_file = parse_arg(args, "--access-file").or_else(|| lookup(ENV_ACCESS_FILE)).map(PathBuf::from);
        Ok(Self { http_port, data_dir, access_file })
    }

    pub fn load_access(&self) -> Result<AccessConfig, ConfigError> {
        match &self.access_file {
            Some(p) => AccessConfig::load(p),
            None => Ok(AccessConfig::default()),
        }
    }
}

fn parse_arg(args: &[String], flag: &str) -> Option<String> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        i += 1;
    }
    None
}

pub fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let m: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k: &str| m.get(k).cloned()
    }

    #[test]
    fn identity_settings_require_endpoint_and_project() {
        let e = IdentitySettings::from_lookup(env(&[(ENV_IDENTITY_PROJECT, "p1")])).unwrap_err();
        assert_eq!(e, ConfigError::Missing(ENV_IDENTITY_ENDPOINT));
        let e = IdentitySettings::from_lookup(env(&[(ENV_IDENTITY_ENDPOINT, "http://id"), (ENV_IDENTITY_PROJECT, "  ")])).unwrap_err();
        assert_eq!(e, ConfigError::Missing(ENV_IDENTITY_PROJECT));
    }

    #[test]
    fn api_key_is_optional_until_required() {
        let s = IdentitySettings::from_lookup(env(&[(ENV_IDENTITY_ENDPOINT, "http://id"), (ENV_IDENTITY_PROJECT, "p1")])).unwrap();
        assert_eq!(s.require_api_key().unwrap_err(), ConfigError::Missing(ENV_IDENTITY_API_KEY));
        let s = IdentitySettings { api_key: Some("k".into()), ..s };
        assert_eq!(s.require_api_key().unwrap(), "k");
    }

    #[test]
    fn cli_overrides_env() {
        let args: Vec<String> = ["portal_server", "--http-port", "9090"].iter().map(|s| s.to_string()).collect();
        let cfg = PortalConfig::resolve(&args, env(&[(ENV_HTTP_PORT, "7000"), (ENV_DATA_DIR, "/tmp/x")])).unwrap();
        assert_eq!(cfg.http_port, 9090);
        assert_eq!(cfg.data_dir, Some(PathBuf::from("/tmp/x")));
        assert_eq!(cfg.access_file, None);
    }

    #[test]
    fn bad_port_is_rejected() {
        let err = PortalConfig::resolve(&[], env(&[(ENV_HTTP_PORT, "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: ENV_HTTP_PORT, .. }));
        assert_eq!(PortalConfig::resolve(&[], env(&[])).unwrap(), PortalConfig::default());
    }

    #[test]
    fn access_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("access.json");
        std::fs::write(&path, r#"{"policy": {"loginPath": "/signin"}}"#).unwrap();
        let cfg = AccessConfig::load(&path).unwrap();
        assert_eq!(cfg.policy.login_path, "/signin");
        assert_eq!(cfg.navigation, NavigationTable::default());
        assert!(matches!(AccessConfig::load(&dir.path().join("nope.json")), Err(ConfigError::AccessFile { .. })));
    }

    #[test]
    fn relative_route_prefix_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("access.json");
        std::fs::write(&path, r#"{"policy": {"routes": [{"prefix": "/cashier", "allow": ["cashier"]}, {"prefix": "admin", "allow": ["admin"]}]}}"#).unwrap();
        match AccessConfig::load(&path) {
            Err(ConfigError::AccessFile { reason, .. }) => assert!(reason.contains("\"admin\""), "{reason}"),
            other => panic!("expected access file error, got {other:?}"),
        }
        let cfg = PortalConfig { access_file: Some(path), ..PortalConfig::default() };
        assert!(cfg.load_access().is_err());
    }
}
