// =============================================================================
// Binance REST API Client: public spot and USDⓈ-M futures market data
// =============================================================================
//
// Only unsigned market-data endpoints are used. Every response passes its
// `X-MBX-USED-WEIGHT-1M` header to the matching rate-limit tracker, and a
// request is refused locally when it would push the tracker over its cap.
// =============================================================================

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::rate_limit::{RateLimitTracker, DEFAULT_WEIGHT_HARD_LIMIT};
use crate::feeds::ExchangeFeed;
use crate::types::{
    json_f64, BookLevel, DepthSnapshot, ForceOrder, FundingRecord, Kline, LiqSide, TakerVolume,
    Trade,
};

const SPOT_BASE_URL: &str = "https://api.binance.com";
const FUTURES_BASE_URL: &str = "https://fapi.binance.com";

/// Binance REST API client for public market data.
pub struct BinanceClient {
    spot_base: String,
    futures_base: String,
    client: reqwest::Client,
    spot_limits: RateLimitTracker,
    futures_limits: RateLimitTracker,
}

impl BinanceClient {
    /// Create a client that re-uses an existing HTTP client.
    pub fn with_client(client: reqwest::Client) -> Self {
        debug!("BinanceClient initialised (spot={SPOT_BASE_URL}, futures={FUTURES_BASE_URL})");
        Self {
            spot_base: SPOT_BASE_URL.to_string(),
            futures_base: FUTURES_BASE_URL.to_string(),
            client,
            spot_limits: RateLimitTracker::new("binance-spot", DEFAULT_WEIGHT_HARD_LIMIT),
            futures_limits: RateLimitTracker::new("binance-futures", DEFAULT_WEIGHT_HARD_LIMIT),
        }
    }

    async fn get_json(
        &self,
        limits: &RateLimitTracker,
        url: &str,
        label: &str,
        weight: u32,
    ) -> Result<Value> {
        if !limits.can_send_request(weight) {
            anyhow::bail!("{label} skipped: local rate-limit cap reached");
        }

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {label} request failed"))?;

        limits.update_from_headers(resp.headers());

        let status = resp.status();
        let body: Value = resp
            .json()
            .await
            .with_context(|| format!("failed to parse {label} response"))?;

        if !status.is_success() {
            anyhow::bail!("Binance GET {label} returned {status}: {body}");
        }
        Ok(body)
    }

    async fn spot(&self, path_and_query: &str, label: &str, weight: u32) -> Result<Value> {
        let url = format!("{}{}", self.spot_base, path_and_query);
        self.get_json(&self.spot_limits, &url, label, weight).await
    }

    async fn futures(&self, path_and_query: &str, label: &str, weight: u32) -> Result<Value> {
        let url = format!("{}{}", self.futures_base, path_and_query);
        self.get_json(&self.futures_limits, &url, label, weight).await
    }
}

#[async_trait]
impl ExchangeFeed for BinanceClient {
    #[instrument(skip(self), name = "binance::spot_klines")]
    async fn spot_klines(&self, symbol: &str, interval: &str, limit: u32) -> Result<Vec<Kline>> {
        let body = self
            .spot(
                &format!("/api/v3/klines?symbol={symbol}&interval={interval}&limit={limit}"),
                "/api/v3/klines",
                2,
            )
            .await?;
        let klines = parse_klines(&body)?;
        debug!(symbol, interval, count = klines.len(), "klines fetched");
        Ok(klines)
    }

    #[instrument(skip(self), name = "binance::spot_price")]
    async fn spot_price(&self, symbol: &str) -> Result<f64> {
        let body = self
            .spot(&format!("/api/v3/ticker/price?symbol={symbol}"), "/api/v3/ticker/price", 2)
            .await?;
        parse_ticker_price(&body)
    }

    #[instrument(skip(self), name = "binance::futures_price")]
    async fn futures_price(&self, symbol: &str) -> Result<f64> {
        let body = self
            .futures(&format!("/fapi/v1/ticker/price?symbol={symbol}"), "/fapi/v1/ticker/price", 1)
            .await?;
        parse_ticker_price(&body)
    }

    #[instrument(skip(self), name = "binance::spot_depth")]
    async fn spot_depth(&self, symbol: &str, limit: u32) -> Result<DepthSnapshot> {
        let body = self
            .spot(&format!("/api/v3/depth?symbol={symbol}&limit={limit}"), "/api/v3/depth", 5)
            .await?;
        parse_depth(&body)
    }

    #[instrument(skip(self), name = "binance::futures_depth")]
    async fn futures_depth(&self, symbol: &str, limit: u32) -> Result<DepthSnapshot> {
        let weight = if limit <= 100 { 5 } else { 10 };
        let body = self
            .futures(&format!("/fapi/v1/depth?symbol={symbol}&limit={limit}"), "/fapi/v1/depth", weight)
            .await?;
        parse_depth(&body)
    }

    #[instrument(skip(self), name = "binance::spot_trades")]
    async fn spot_trades(&self, symbol: &str, limit: u32) -> Result<Vec<Trade>> {
        let body = self
            .spot(&format!("/api/v3/trades?symbol={symbol}&limit={limit}"), "/api/v3/trades", 25)
            .await?;
        parse_trades(&body)
    }

    #[instrument(skip(self), name = "binance::funding_rates")]
    async fn funding_rates(&self, symbol: &str, limit: u32) -> Result<Vec<FundingRecord>> {
        let body = self
            .futures(
                &format!("/fapi/v1/fundingRate?symbol={symbol}&limit={limit}"),
                "/fapi/v1/fundingRate",
                1,
            )
            .await?;
        parse_funding(&body)
    }

    #[instrument(skip(self), name = "binance::open_interest")]
    async fn open_interest(&self, symbol: &str) -> Result<f64> {
        let body = self
            .futures(&format!("/fapi/v1/openInterest?symbol={symbol}"), "/fapi/v1/openInterest", 1)
            .await?;
        json_f64(&body["openInterest"]).context("openInterest missing or non-numeric")
    }

    #[instrument(skip(self), name = "binance::open_interest_history")]
    async fn open_interest_history(
        &self,
        symbol: &str,
        period: &str,
        limit: u32,
    ) -> Result<Vec<f64>> {
        let body = self
            .futures(
                &format!("/futures/data/openInterestHist?symbol={symbol}&period={period}&limit={limit}"),
                "/futures/data/openInterestHist",
                1,
            )
            .await?;
        let rows = body.as_array().context("openInterestHist response is not an array")?;
        Ok(rows
            .iter()
            .filter_map(|row| json_f64(&row["sumOpenInterest"]))
            .collect())
    }

    #[instrument(skip(self), name = "binance::taker_volume")]
    async fn taker_volume(&self, symbol: &str, period: &str, limit: u32) -> Result<Vec<TakerVolume>> {
        let body = self
            .futures(
                &format!("/futures/data/takerlongshortRatio?symbol={symbol}&period={period}&limit={limit}"),
                "/futures/data/takerlongshortRatio",
                1,
            )
            .await?;
        let rows = body.as_array().context("takerlongshortRatio response is not an array")?;
        Ok(rows
            .iter()
            .filter_map(|row| {
                Some(TakerVolume {
                    buy_vol: json_f64(&row["buyVol"])?,
                    sell_vol: json_f64(&row["sellVol"])?,
                })
            })
            .collect())
    }

    #[instrument(skip(self), name = "binance::force_orders")]
    async fn force_orders(&self, symbol: &str, start_ms: i64, end_ms: i64) -> Result<Vec<ForceOrder>> {
        let body = self
            .futures(
                &format!("/fapi/v1/allForceOrders?symbol={symbol}&startTime={start_ms}&endTime={end_ms}"),
                "/fapi/v1/allForceOrders",
                20,
            )
            .await?;
        Ok(parse_force_orders(&body))
    }
}

impl std::fmt::Debug for BinanceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceClient")
            .field("spot_base", &self.spot_base)
            .field("futures_base", &self.futures_base)
            .field("spot_limits", &self.spot_limits.snapshot())
            .field("futures_limits", &self.futures_limits.snapshot())
            .finish()
    }
}

// =============================================================================
// Response parsing
// =============================================================================
//
// MEXC mirrors the Binance v3 spot formats, so these are shared.

/// Parse `{"price": "..."}`.
pub(crate) fn parse_ticker_price(body: &Value) -> Result<f64> {
    json_f64(&body["price"]).context("ticker price missing or non-numeric")
}

/// Parse the array-of-arrays kline format.
///
/// Array indices:
///   [0] openTime, [1] open, [2] high, [3] low, [4] close, [5] volume,
///   [6] closeTime
pub(crate) fn parse_klines(body: &Value) -> Result<Vec<Kline>> {
    let raw = body.as_array().context("klines response is not an array")?;
    let mut klines = Vec::with_capacity(raw.len());

    for entry in raw {
        let Some(arr) = entry.as_array() else {
            warn!("skipping kline entry that is not an array");
            continue;
        };
        if arr.len() < 7 {
            warn!("skipping malformed kline entry with {} elements", arr.len());
            continue;
        }

        let field = |i: usize| json_f64(&arr[i]).with_context(|| format!("kline field {i} is not numeric"));
        klines.push(Kline {
            open_time: arr[0].as_i64().unwrap_or(0),
            open: field(1)?,
            high: field(2)?,
            low: field(3)?,
            close: field(4)?,
            volume: field(5)?,
            close_time: arr[6].as_i64().unwrap_or(0),
        });
    }
    Ok(klines)
}

/// Parse `{"bids": [["price","qty"], ...], "asks": [...]}`. Unparseable
/// levels are dropped.
pub(crate) fn parse_depth(body: &Value) -> Result<DepthSnapshot> {
    let side = |key: &str| -> Result<Vec<BookLevel>> {
        let levels = body[key]
            .as_array()
            .with_context(|| format!("depth response missing {key}"))?;
        Ok(levels
            .iter()
            .filter_map(|lvl| {
                Some(BookLevel {
                    price: json_f64(lvl.get(0)?)?,
                    qty: json_f64(lvl.get(1)?)?,
                })
            })
            .collect())
    };

    Ok(DepthSnapshot {
        bids: side("bids")?,
        asks: side("asks")?,
    })
}

/// Parse a public trade list.
pub(crate) fn parse_trades(body: &Value) -> Result<Vec<Trade>> {
    let rows = body.as_array().context("trades response is not an array")?;
    Ok(rows
        .iter()
        .filter_map(|t| {
            Some(Trade {
                price: json_f64(&t["price"])?,
                qty: json_f64(&t["qty"])?,
                is_buyer_maker: t["isBuyerMaker"].as_bool().unwrap_or(false),
            })
        })
        .collect())
}

fn parse_funding(body: &Value) -> Result<Vec<FundingRecord>> {
    let rows = body.as_array().context("fundingRate response is not an array")?;
    Ok(rows
        .iter()
        .filter_map(|row| {
            Some(FundingRecord {
                rate: json_f64(&row["fundingRate"])?,
                funding_time: row["fundingTime"].as_i64().unwrap_or(0),
            })
        })
        .collect())
}

/// Parse forced liquidation orders. Accepts both the REST field names and the
/// abbreviated stream names (`ap`, `p`, `q`, `S`). A SELL order liquidates a
/// long position.
pub(crate) fn parse_force_orders(body: &Value) -> Vec<ForceOrder> {
    let Some(rows) = body.as_array() else {
        return Vec::new();
    };

    rows.iter()
        .filter_map(|x| {
            let avg = json_f64(&x["ap"])
                .or_else(|| json_f64(&x["averagePrice"]))
                .filter(|p| *p > 0.0);
            let price = avg.or_else(|| json_f64(&x["p"]).or_else(|| json_f64(&x["price"])))?;
            let qty = json_f64(&x["q"])
                .or_else(|| json_f64(&x["executedQty"]))
                .or_else(|| json_f64(&x["origQty"]))?;
            let side_tag = x["S"].as_str().or_else(|| x["side"].as_str()).unwrap_or("");
            let side = if side_tag == "SELL" {
                LiqSide::Long
            } else {
                LiqSide::Short
            };
            Some(ForceOrder { price, qty, side })
        })
        .collect()
}
