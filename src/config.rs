// src/config.rs
// Resource configuration and the config file loader

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::cookies::{default_bindings, CookieBinding};

pub const DEFAULT_PORT: u16 = 8888;
pub const API: &str = "rdk:service:generic";
pub const MODEL: &str = "devrel:claw-game:webapp";

/// Stable identity of a configured resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceName {
    pub api: String,
    pub name: String,
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.api, self.name)
    }
}

/// Configuration record published on `/config.json`.
pub trait ResourceConfig: Serialize + Send + Sync + 'static {
    fn resource_name(&self) -> ResourceName;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,

    #[serde(default = "default_api")]
    pub api: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub attributes: Map<String, Value>,
}

fn default_api() -> String {
    API.to_string()
}

fn default_model() -> String {
    MODEL.to_string()
}

impl ServiceConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            api: default_api(),
            model: default_model(),
            attributes: Map::new(),
        }
    }

    pub fn with_attribute(mut self, key: &str, value: Value) -> Self {
        self.attributes.insert(key.to_string(), value);
        self
    }

    /// The `port` attribute, or [`DEFAULT_PORT`] when absent or not a valid port.
    pub fn port(&self) -> u16 {
        self.attributes
            .get("port")
            .and_then(Value::as_u64)
            .and_then(|port| u16::try_from(port).ok())
            .unwrap_or(DEFAULT_PORT)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::new("webapp")
    }
}

impl ResourceConfig for ServiceConfig {
    fn resource_name(&self) -> ResourceName {
        ResourceName {
            api: self.api.clone(),
            name: self.name.clone(),
        }
    }
}

/// Everything the module reads from its config file.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleConfig {
    pub service: ServiceConfig,
    pub identity_cookies: Vec<CookieBinding>,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            identity_cookies: default_bindings(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub const CONFIG_FILES: [&str; 2] = ["webapp.json", "config.json"];

pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    pub fn new(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    pub fn load_configuration(
        &self,
        custom_config_path: Option<&str>,
    ) -> Result<ModuleConfig, ConfigError> {
        let config_files: Vec<PathBuf> = match custom_config_path {
            Some(custom_path) => vec![PathBuf::from(custom_path)],
            None => CONFIG_FILES
                .iter()
                .map(|name| self.config_dir.join(name))
                .collect(),
        };

        let mut config = ModuleConfig::default();

        for config_path in config_files {
            if !config_path.exists() {
                if custom_config_path.is_some() {
                    return Err(ConfigError::FileNotFound(
                        config_path.to_string_lossy().to_string(),
                    ));
                }
                continue;
            }

            log::info!("Loading configuration from: {}", config_path.display());
            config = parse_module_config(&config_path)?;
            break;
        }

        self.validate_config(&config)?;

        Ok(config)
    }

    fn validate_config(&self, config: &ModuleConfig) -> Result<(), ConfigError> {
        if config.service.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Resource name cannot be empty".to_string(),
            ));
        }

        if let Some(port) = config.service.attributes.get("port") {
            let valid = port
                .as_u64()
                .map(|p| u16::try_from(p).is_ok())
                .unwrap_or(false);
            if !valid {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid port attribute: {}",
                    port
                )));
            }
        }

        let mut seen = HashSet::new();
        for binding in &config.identity_cookies {
            if binding.env.is_empty() || binding.cookie.is_empty() {
                return Err(ConfigError::ValidationError(
                    "Identity cookie env and cookie names cannot be empty".to_string(),
                ));
            }
            if !is_cookie_name(&binding.cookie) {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid cookie name: {}",
                    binding.cookie
                )));
            }
            if !seen.insert(binding.cookie.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "Duplicate cookie name: {}",
                    binding.cookie
                )));
            }
        }

        Ok(())
    }
}

fn parse_module_config(path: &Path) -> Result<ModuleConfig, ConfigError> {
    #[derive(Deserialize)]
    struct CookieSection {
        #[serde(default = "default_bindings")]
        identity_cookies: Vec<CookieBinding>,
    }

    let contents = fs::read_to_string(path)?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("config");

    let service: ServiceConfig = serde_json::from_str(&contents)
        .map_err(|e| ConfigError::ParseError(format!("{}: {}", file_name, e)))?;
    let cookies: CookieSection = serde_json::from_str(&contents)
        .map_err(|e| ConfigError::ParseError(format!("{}: {}", file_name, e)))?;

    Ok(ModuleConfig {
        service,
        identity_cookies: cookies.identity_cookies,
    })
}

// RFC 6265 token characters
fn is_cookie_name(name: &str) -> bool {
    name.bytes().all(|b| {
        b.is_ascii_graphic()
            && !matches!(
                b,
                b'(' | b')' | b'<' | b'>' | b'@' | b',' | b';' | b':' | b'\\' | b'"' | b'/'
                    | b'[' | b']' | b'?' | b'=' | b'{' | b'}'
            )
    })
}
