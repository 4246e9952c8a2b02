use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub wordlist: WordlistConfig,
    pub pipeline: PipelineConfig,
    pub oracle: OracleConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordlistConfig {
    /// Vocabulary file, one word per line
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Fixed worker pool size
    pub workers: usize,

    /// Record a match only when the funded-output sum exceeds this (satoshis)
    pub min_balance_sats: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Base URL of the esplora-style balance API
    pub endpoint: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Optional HTTP proxy for all oracle traffic
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,

    /// Credentials can be set via ORACLE_PROXY_USERNAME / ORACLE_PROXY_PASSWORD
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Flat text file receiving one record per match
    pub results: String,
}

impl Config {
    /// Load configuration from TOML file and environment variables
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path))?;

        let mut config: Config = toml::from_str(&content)
            .context("Failed to parse TOML config")?;

        // Override sensitive values from environment variables (more secure)
        config.load_from_env();

        config.validate()?;

        Ok(config)
    }

    /// Load proxy credentials from environment variables (overrides file config)
    fn load_from_env(&mut self) {
        let Some(proxy) = self.oracle.proxy.as_mut() else {
            return;
        };

        // Credentials from the environment keep secrets out of the config file
        if let Ok(username) = std::env::var("ORACLE_PROXY_USERNAME") {
            if !username.is_empty() {
                proxy.username = username;
            }
        }

        if let Ok(password) = std::env::var("ORACLE_PROXY_PASSWORD") {
            if !password.is_empty() {
                proxy.password = password;
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.wordlist.path.is_empty() {
            anyhow::bail!("wordlist.path must not be empty");
        }

        if self.pipeline.workers == 0 {
            anyhow::bail!("pipeline.workers must be >= 1");
        }
        if self.pipeline.workers > 4096 {
            anyhow::bail!("pipeline.workers is too high (>{})", 4096);
        }

        if !self.oracle.endpoint.starts_with("http://") && !self.oracle.endpoint.starts_with("https://") {
            anyhow::bail!("oracle.endpoint must be an http(s) URL");
        }
        if self.oracle.timeout_secs == 0 {
            anyhow::bail!("oracle.timeout_secs must be >= 1");
        }
        if self.oracle.timeout_secs > 300 {
            anyhow::bail!("oracle.timeout_secs is too high (>{}s)", 300);
        }

        if let Some(proxy) = &self.oracle.proxy {
            if proxy.host.is_empty() {
                anyhow::bail!("oracle.proxy.host must not be empty");
            }
            if proxy.port == 0 {
                anyhow::bail!("oracle.proxy.port must be >= 1");
            }
        }

        if self.output.results.is_empty() {
            anyhow::bail!("output.results must not be empty");
        }

        Ok(())
    }

    /// Create default configuration
    pub fn default_toml() -> String {
        r#"
[wordlist]
path = "wordlist.txt"

[pipeline]
workers = 100
min_balance_sats = 10

[oracle]
endpoint = "https://blockstream.info/api"
timeout_secs = 5

# Route oracle traffic through an authenticating HTTP proxy:
# [oracle.proxy]
# host = "proxy.example.com"
# port = 8082
# username = ""   # or ORACLE_PROXY_USERNAME
# password = ""   # or ORACLE_PROXY_PASSWORD

[output]
results = "output/matches.txt"
"#
        .to_string()
    }

    /// Save default config to file
    pub fn save_default(path: &str) -> Result<()> {
        fs::write(path, Self::default_toml())
            .context("Failed to write default config")?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            wordlist: WordlistConfig {
                path: "wordlist.txt".to_string(),
            },
            pipeline: PipelineConfig {
                workers: 100,
                min_balance_sats: 10,
            },
            oracle: OracleConfig {
                endpoint: "https://blockstream.info/api".to_string(),
                timeout_secs: 5,
                proxy: None,
            },
            output: OutputConfig {
                results: "output/matches.txt".to_string(),
            },
        }
    }
}
