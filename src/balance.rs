use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::config::OracleConfig;

/// What the oracle had to say about an address.
///
/// Timeouts, transport errors, non-2xx statuses and malformed bodies are
/// all folded into `Unavailable` and never retried; the pipeline treats it
/// the same as a zero balance. The variant stays distinct so tests can
/// tell "the oracle said 0" from "the oracle said nothing".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceStatus {
    /// Cumulative funded-output sum in satoshis
    Known(u64),
    /// No balance information for this request
    Unavailable,
}

/// The seam between the pipeline and the ledger service.
pub trait BalanceOracle: Send + Sync {
    /// Look up the cumulative funded-output sum for `address`.
    fn funded_sum(&self, address: &str) -> impl Future<Output = BalanceStatus> + Send;
}

/// Esplora-style address stats, of which only the funded sum matters here.
#[derive(Debug, Deserialize)]
struct AddressStats {
    chain_stats: ChainStats,
}

#[derive(Debug, Deserialize)]
struct ChainStats {
    funded_txo_sum: u64,
}

/// Balance lookups against an esplora-style HTTP API, optionally routed
/// through an authenticating HTTP proxy.
pub struct HttpOracle {
    client: Client,
    endpoint: String,
}

impl HttpOracle {
    pub fn new(config: &OracleConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("seedsweep/", env!("CARGO_PKG_VERSION")));

        if let Some(cfg) = &config.proxy {
            let proxy_url = format!("http://{}:{}", cfg.host, cfg.port);
            let mut proxy = reqwest::Proxy::all(&proxy_url)
                .context(format!("Invalid proxy URL: {}", proxy_url))?;
            if !cfg.username.is_empty() {
                proxy = proxy.basic_auth(&cfg.username, &cfg.password);
            }
            builder = builder.proxy(proxy);
        }

        Ok(Self {
            client: builder.build().context("Failed to build HTTP client")?,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }
}

impl BalanceOracle for HttpOracle {
    async fn funded_sum(&self, address: &str) -> BalanceStatus {
        let url = format!("{}/address/{}", self.endpoint, address);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!("Balance lookup failed for {}: {}", address, e);
                return BalanceStatus::Unavailable;
            }
        };

        if !response.status().is_success() {
            debug!("Balance lookup for {} returned {}", address, response.status());
            return BalanceStatus::Unavailable;
        }

        match response.json::<AddressStats>().await {
            Ok(stats) => BalanceStatus::Known(stats.chain_stats.funded_txo_sum),
            Err(e) => {
                debug!("Malformed balance payload for {}: {}", address, e);
                BalanceStatus::Unavailable
            }
        }
    }
}
