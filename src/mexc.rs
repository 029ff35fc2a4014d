// =============================================================================
// MEXC spot REST client: secondary venue for cross-checks
// =============================================================================
//
// MEXC's v3 spot API mirrors Binance's formats for ticker, trades and depth,
// so the Binance parsers are reused.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::binance::client::{parse_depth, parse_ticker_price, parse_trades};
use crate::feeds::SecondaryVenue;
use crate::types::{DepthSnapshot, Trade};

const MEXC_BASE_URL: &str = "https://api.mexc.com";

#[derive(Clone)]
pub struct MexcClient {
    base_url: String,
    client: reqwest::Client,
}

impl MexcClient {
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            base_url: MEXC_BASE_URL.to_string(),
            client,
        }
    }

    async fn get_json(&self, path_and_query: &str, label: &str) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path_and_query);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET MEXC {label} request failed"))?;

        let status = resp.status();
        let body: Value = resp
            .json()
            .await
            .with_context(|| format!("failed to parse MEXC {label} response"))?;

        if !status.is_success() {
            anyhow::bail!("MEXC GET {label} returned {status}: {body}");
        }
        Ok(body)
    }
}

#[async_trait]
impl SecondaryVenue for MexcClient {
    fn name(&self) -> &str {
        "MEXC"
    }

    #[instrument(skip(self), name = "mexc::price")]
    async fn price(&self, symbol: &str) -> Result<f64> {
        let body = self
            .get_json(&format!("/api/v3/ticker/price?symbol={symbol}"), "/api/v3/ticker/price")
            .await?;
        parse_ticker_price(&body)
    }

    #[instrument(skip(self), name = "mexc::trades")]
    async fn trades(&self, symbol: &str, limit: u32) -> Result<Vec<Trade>> {
        let body = self
            .get_json(&format!("/api/v3/trades?symbol={symbol}&limit={limit}"), "/api/v3/trades")
            .await?;
        let trades = parse_trades(&body)?;
        debug!(symbol, count = trades.len(), "MEXC trades fetched");
        Ok(trades)
    }

    #[instrument(skip(self), name = "mexc::depth")]
    async fn depth(&self, symbol: &str, limit: u32) -> Result<DepthSnapshot> {
        let body = self
            .get_json(&format!("/api/v3/depth?symbol={symbol}&limit={limit}"), "/api/v3/depth")
            .await?;
        parse_depth(&body)
    }
}
