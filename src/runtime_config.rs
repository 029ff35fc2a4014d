// =============================================================================
// Runtime Configuration: bot settings with atomic save
// =============================================================================
//
// Every tunable parameter of the bot lives here: the default pair list, the
// polling tick, alert gating and the heatmap / plan parameters.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash.  All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file.
//
// =============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::heatmap::FallbackPct;

/// Upper bound on the tick period: one day.
pub const MAX_TICK_INTERVAL_SECS: u64 = 86_400;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_true() -> bool {
    true
}

fn default_pairs() -> Vec<String> {
    vec!["BTCUSDT".to_string(), "AVAXUSDT".to_string()]
}

fn default_tick_interval_secs() -> u64 {
    10
}

fn default_alert_cooldown_secs() -> u64 {
    900
}

fn default_min_alert_confidence() -> u32 {
    60
}

fn default_heatmap_timeframes() -> Vec<String> {
    vec!["1h".to_string(), "12h".to_string(), "24h".to_string()]
}

fn default_heat_window_pct() -> f64 {
    3.0
}

fn default_liquidation_bucket_width() -> f64 {
    50.0
}

fn default_liquidation_lookback_secs() -> u64 {
    300
}

fn default_fallback_targets() -> BTreeMap<String, FallbackPct> {
    let mut m = BTreeMap::new();
    m.insert(
        "BTCUSDT".to_string(),
        FallbackPct {
            tp1: 0.35,
            tp2: 0.70,
            sl: 0.40,
        },
    );
    m.insert(
        "AVAXUSDT".to_string(),
        FallbackPct {
            tp1: 0.60,
            tp2: 1.20,
            sl: 0.70,
        },
    );
    m
}

fn default_tradingview_exchange() -> String {
    "BINANCE".to_string()
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level runtime configuration for the bot.
///
/// Every field has a serde default so that older JSON files missing new fields
/// will still deserialise correctly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Pairs & access -----------------------------------------------------

    /// Pairs watched at startup. Chat edits are not written back here.
    #[serde(default = "default_pairs")]
    pub pairs: Vec<String>,

    /// Reject `/addpair` and `/rmpair`.
    #[serde(default)]
    pub pairs_locked: bool,

    /// Telegram user ids allowed to edit pairs. Empty means everyone.
    #[serde(default)]
    pub admin_ids: Vec<i64>,

    // --- Tick ---------------------------------------------------------------

    #[serde(default = "default_true")]
    pub tick_enabled: bool,

    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,

    /// Same-side alerts for a symbol within this window are suppressed.
    #[serde(default = "default_alert_cooldown_secs")]
    pub alert_cooldown_secs: u64,

    /// Confidence below which the heat signal is discarded.
    #[serde(default = "default_min_alert_confidence")]
    pub min_alert_confidence: u32,

    // --- Heatmap ------------------------------------------------------------

    #[serde(default = "default_heatmap_timeframes")]
    pub heatmap_timeframes: Vec<String>,

    /// Levels within this distance of price (percent) feed the heat score.
    #[serde(default = "default_heat_window_pct")]
    pub heat_window_pct: f64,

    /// Price bucket width for forced-order aggregation.
    #[serde(default = "default_liquidation_bucket_width")]
    pub liquidation_bucket_width: f64,

    #[serde(default = "default_liquidation_lookback_secs")]
    pub liquidation_lookback_secs: u64,

    // --- Plans & links ------------------------------------------------------

    /// Per-symbol TP/SL percentages used when the heatmap has no level.
    #[serde(default = "default_fallback_targets")]
    pub fallback_targets: BTreeMap<String, FallbackPct>,

    #[serde(default)]
    pub default_fallback: FallbackPct,

    #[serde(default = "default_tradingview_exchange")]
    pub tradingview_exchange: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            pairs: default_pairs(),
            pairs_locked: false,
            admin_ids: Vec::new(),
            tick_enabled: true,
            tick_interval_secs: default_tick_interval_secs(),
            alert_cooldown_secs: default_alert_cooldown_secs(),
            min_alert_confidence: default_min_alert_confidence(),
            heatmap_timeframes: default_heatmap_timeframes(),
            heat_window_pct: default_heat_window_pct(),
            liquidation_bucket_width: default_liquidation_bucket_width(),
            liquidation_lookback_secs: default_liquidation_lookback_secs(),
            fallback_targets: default_fallback_targets(),
            default_fallback: FallbackPct::default(),
            tradingview_exchange: default_tradingview_exchange(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            pairs = ?config.pairs,
            tick_enabled = config.tick_enabled,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }

    /// Tick period, clamped to `1..=MAX_TICK_INTERVAL_SECS` seconds.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs.clamp(1, MAX_TICK_INTERVAL_SECS))
    }

    pub fn fallback_for(&self, symbol: &str) -> FallbackPct {
        self.fallback_targets
            .get(symbol)
            .copied()
            .unwrap_or(self.default_fallback)
    }

    pub fn is_admin(&self, user_id: Option<i64>) -> bool {
        if self.admin_ids.is_empty() {
            return true;
        }
        user_id.is_some_and(|id| self.admin_ids.contains(&id))
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.pairs, vec!["BTCUSDT", "AVAXUSDT"]);
        assert!(cfg.tick_enabled);
        assert_eq!(cfg.tick_interval_secs, 10);
        assert_eq!(cfg.alert_cooldown_secs, 900);
        assert_eq!(cfg.min_alert_confidence, 60);
        assert_eq!(cfg.heatmap_timeframes, vec!["1h", "12h", "24h"]);
        assert_eq!(cfg.tradingview_exchange, "BINANCE");
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: RuntimeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.pairs.len(), 2);
        assert!(!cfg.pairs_locked);
        assert!((cfg.heat_window_pct - 3.0).abs() < f64::EPSILON);
        assert_eq!(cfg.liquidation_lookback_secs, 300);
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "pairs": ["ETHUSDT"], "pairs_locked": true, "admin_ids": [42] }"#;
        let cfg: RuntimeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.pairs, vec!["ETHUSDT"]);
        assert!(cfg.pairs_locked);
        assert_eq!(cfg.alert_cooldown_secs, 900);
        assert!(cfg.is_admin(Some(42)));
        assert!(!cfg.is_admin(Some(7)));
        assert!(!cfg.is_admin(None));
    }

    #[test]
    fn empty_admin_list_allows_everyone() {
        assert!(RuntimeConfig::default().is_admin(None));
    }

    #[test]
    fn fallback_lookup() {
        let cfg = RuntimeConfig::default();
        assert!((cfg.fallback_for("BTCUSDT").tp1 - 0.35).abs() < f64::EPSILON);
        assert!((cfg.fallback_for("AVAXUSDT").sl - 0.70).abs() < f64::EPSILON);
        assert_eq!(cfg.fallback_for("DOGEUSDT"), FallbackPct::default());
    }

    #[test]
    fn tick_interval_is_clamped() {
        let mut cfg = RuntimeConfig::default();
        assert_eq!(cfg.tick_interval(), Duration::from_secs(10));

        cfg.tick_interval_secs = 0;
        assert_eq!(cfg.tick_interval(), Duration::from_secs(1));

        cfg.tick_interval_secs = u64::MAX;
        assert_eq!(cfg.tick_interval(), Duration::from_secs(MAX_TICK_INTERVAL_SECS));
    }

    #[test]
    fn save_then_load() {
        let path = std::env::temp_dir().join(format!("liqbot-{}.json", uuid::Uuid::new_v4()));
        let mut cfg = RuntimeConfig::default();
        cfg.min_alert_confidence = 75;
        cfg.save(&path).unwrap();

        let loaded = RuntimeConfig::load(&path).unwrap();
        assert_eq!(loaded.min_alert_confidence, 75);
        assert_eq!(loaded.fallback_targets, cfg.fallback_targets);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(RuntimeConfig::load("/nonexistent/liqbot.json").is_err());
    }
}
