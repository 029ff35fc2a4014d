// =============================================================================
// Coinglass client: liquidation heatmap provider
// =============================================================================
//
// Authenticated with the `coinglassSecret` header. Without a key the client
// reports itself unconfigured and never touches the network.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::feeds::HeatmapProvider;
use crate::heatmap::levels::derive_levels;
use crate::types::HeatmapLevel;

const COINGLASS_BASE_URL: &str = "https://open-api.coinglass.com";

pub struct CoinglassClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl CoinglassClient {
    /// `api_key` of `None` or an empty string disables the provider.
    pub fn with_client(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self {
            base_url: COINGLASS_BASE_URL.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            client,
        }
    }

    fn headers(&self, key: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "coinglassSecret",
            HeaderValue::from_str(key).context("Coinglass key is not a valid header value")?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    async fn get_levels(&self, path: &str, query: &[(&str, &str)], label: &str) -> Result<Vec<HeatmapLevel>> {
        let key = self
            .api_key
            .as_deref()
            .context("Coinglass API key not configured")?;

        let resp = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .headers(self.headers(key)?)
            .send()
            .await
            .with_context(|| format!("GET Coinglass {label} request failed"))?;

        let status = resp.status();
        let body: Value = resp
            .json()
            .await
            .with_context(|| format!("failed to parse Coinglass {label} response"))?;

        if !status.is_success() {
            anyhow::bail!("Coinglass GET {label} returned {status}: {body}");
        }

        let levels = derive_levels(&body);
        debug!(label, count = levels.len(), "Coinglass levels fetched");
        Ok(levels)
    }
}

#[async_trait]
impl HeatmapProvider for CoinglassClient {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    #[instrument(skip(self), name = "coinglass::liquidation_map")]
    async fn liquidation_map(&self, base: &str) -> Result<Vec<HeatmapLevel>> {
        if !self.is_configured() {
            return Ok(Vec::new());
        }
        self.get_levels("/public/v2/liquidationMap", &[("symbol", base)], "liquidationMap")
            .await
    }

    #[instrument(skip(self), name = "coinglass::timeframe_map")]
    async fn timeframe_map(&self, symbol: &str, interval: &str) -> Result<Vec<HeatmapLevel>> {
        self.get_levels(
            "/public/v2/liqMap",
            &[("symbol", symbol), ("interval", interval)],
            "liqMap",
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_disables_provider() {
        let c = CoinglassClient::with_client(reqwest::Client::new(), Some("  ".into()));
        assert!(!c.is_configured());
        let c = CoinglassClient::with_client(reqwest::Client::new(), None);
        assert!(!c.is_configured());
        let c = CoinglassClient::with_client(reqwest::Client::new(), Some("k".into()));
        assert!(c.is_configured());
    }

    #[tokio::test]
    async fn unconfigured_provider_returns_no_levels() {
        let c = CoinglassClient::with_client(reqwest::Client::new(), None);
        assert!(c.liquidation_map("BTC").await.unwrap().is_empty());
        assert!(c.timeframe_map("Binance_BTCUSDT", "1h").await.is_err());
    }
}
