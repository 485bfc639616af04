use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tax_simulator::RuleBook;

const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// JSON file replacing the embedded jurisdiction table
    pub tax_rules_path: Option<PathBuf>,
    /// Empty = any origin
    pub allowed_origins: Vec<String>,
    pub max_body_bytes: usize,
    pub enable_hsts: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            tax_rules_path: None,
            allowed_origins: Vec::new(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            enable_hsts: false,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key/value source; missing keys use defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = match lookup("PORT") {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a valid port number, got {:?}", v))?,
            None => defaults.port,
        };
        let max_body_bytes = match lookup("MAX_BODY_BYTES") {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("MAX_BODY_BYTES must be a byte count, got {:?}", v))?,
            None => defaults.max_body_bytes,
        };

        let config = Self {
            host: lookup("HOST")
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
                .unwrap_or(defaults.host),
            port,
            tax_rules_path: lookup("TAX_RULES_PATH")
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
            allowed_origins: lookup("ALLOWED_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            max_body_bytes,
            enable_hsts: lookup("ENABLE_HSTS")
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(false),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.max_body_bytes == 0 {
            anyhow::bail!("MAX_BODY_BYTES must be greater than zero");
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }

    /// Rule book from `TAX_RULES_PATH` if set, otherwise the embedded table.
    pub fn load_rules(&self) -> Result<RuleBook> {
        match &self.tax_rules_path {
            Some(path) => RuleBook::from_path(path)
                .with_context(|| format!("Failed to load tax rules from {}", path.display())),
            None => RuleBook::embedded().context("Embedded tax rules are invalid"),
        }
    }
}
