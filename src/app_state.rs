// =============================================================================
// Central Application State: liqbot
// =============================================================================
//
// The single source of truth shared by the tick loop and the HTTP handlers.
//
// Thread safety:
//   - Atomic counter for lock-free version tracking.
//   - parking_lot::RwLock for all mutable shared collections.
//   - Collaborators (exchange, venue, heatmap, notifier) are trait objects
//     behind Arc so tests can swap them for stubs.
// =============================================================================

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::alerts::{alert_key, AlertMemory, AlertRecord};
use crate::analysis::{Analyzer, SymbolAnalysis};
use crate::pairs::PairStore;
use crate::runtime_config::RuntimeConfig;
use crate::telegram::Notifier;
use crate::types::Direction;

// =============================================================================
// Error Record
// =============================================================================

/// A recorded error event for the admin error log.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub message: String,
    /// Symbol the error relates to, if any.
    pub symbol: Option<String>,
    /// ISO 8601 timestamp.
    pub at: String,
}

/// Secrets checked by the HTTP layer.
#[derive(Debug, Clone, Default)]
pub struct ApiSecrets {
    /// Bearer token for admin endpoints. `None` rejects every admin call.
    pub admin_token: Option<String>,
    /// Expected `X-Telegram-Bot-Api-Secret-Token`. `None` disables the check.
    pub webhook_secret: Option<String>,
}

// =============================================================================
// AppState
// =============================================================================

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;
/// Maximum number of recent alerts to retain.
const MAX_RECENT_ALERTS: usize = 100;

/// Central application state shared across all async tasks via `Arc<AppState>`.
pub struct AppState {
    // ── Version tracking ────────────────────────────────────────────────
    /// Monotonically increasing version counter. Incremented on every
    /// meaningful state mutation.
    pub state_version: AtomicU64,

    // ── Configuration ───────────────────────────────────────────────────
    pub runtime_config: Arc<RwLock<RuntimeConfig>>,
    pub config_path: PathBuf,
    pub secrets: ApiSecrets,

    // ── Pairs ───────────────────────────────────────────────────────────
    pub pairs: PairStore,

    // ── Collaborators ───────────────────────────────────────────────────
    pub analyzer: Analyzer,
    pub notifier: Arc<dyn Notifier>,

    // ── Analysis cache ──────────────────────────────────────────────────
    pub last_analysis: RwLock<HashMap<String, SymbolAnalysis>>,

    // ── Alerts ──────────────────────────────────────────────────────────
    /// Keyed by `state:{SYMBOL}`.
    pub alert_memory: RwLock<HashMap<String, AlertMemory>>,
    pub recent_alerts: RwLock<Vec<AlertRecord>>,

    // ── Error Log ───────────────────────────────────────────────────────
    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    // ── Timing ──────────────────────────────────────────────────────────
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Construct a new `AppState`. The pair store is seeded from
    /// `config.pairs`. The returned value is typically wrapped in `Arc`
    /// immediately.
    pub fn new(
        config: RuntimeConfig,
        config_path: impl Into<PathBuf>,
        secrets: ApiSecrets,
        analyzer: Analyzer,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let pairs = PairStore::new(&config.pairs, config.pairs_locked);

        Self {
            state_version: AtomicU64::new(1),
            runtime_config: Arc::new(RwLock::new(config)),
            config_path: config_path.into(),
            secrets,
            pairs,
            analyzer,
            notifier,
            last_analysis: RwLock::new(HashMap::new()),
            alert_memory: RwLock::new(HashMap::new()),
            recent_alerts: RwLock::new(Vec::new()),
            recent_errors: RwLock::new(Vec::new()),
            start_time: std::time::Instant::now(),
        }
    }

    /// Seed the pair store from `pairs` instead of `config.pairs`. The
    /// configuration is left untouched, so the override is never saved.
    /// An empty list keeps the configured pairs.
    pub fn with_startup_pairs(mut self, pairs: &[String]) -> Self {
        if !pairs.is_empty() {
            self.pairs = PairStore::new(pairs, self.pairs.is_locked());
        }
        self
    }

    // ── Version Management ──────────────────────────────────────────────

    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    /// Clone of the current configuration, so no lock is held across awaits.
    pub fn config(&self) -> RuntimeConfig {
        self.runtime_config.read().clone()
    }

    // ── Error Logging ───────────────────────────────────────────────────

    /// Record an error message. The ring buffer is capped at
    /// [`MAX_RECENT_ERRORS`]; oldest entries are evicted first.
    pub fn push_error(&self, msg: String, symbol: Option<&str>) {
        let record = ErrorRecord {
            message: msg,
            symbol: symbol.map(str::to_string),
            at: Utc::now().to_rfc3339(),
        };

        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }

        self.increment_version();
    }

    // ── Analysis cache ──────────────────────────────────────────────────

    pub fn record_analysis(&self, analysis: SymbolAnalysis) {
        self.last_analysis
            .write()
            .insert(analysis.symbol.clone(), analysis);
        self.increment_version();
    }

    pub fn cached_analysis(&self, symbol: &str) -> Option<SymbolAnalysis> {
        self.last_analysis.read().get(symbol).cloned()
    }

    /// Last analysis of every symbol seen so far, ordered by symbol.
    pub fn cached_analyses(&self) -> Vec<SymbolAnalysis> {
        let mut all: Vec<SymbolAnalysis> = self.last_analysis.read().values().cloned().collect();
        all.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        all
    }

    // ── Alerts ──────────────────────────────────────────────────────────

    /// Whether an alert on `side` for `symbol` would repeat the last one
    /// inside the cooldown window.
    pub fn alert_suppressed(&self, symbol: &str, side: Direction, now: DateTime<Utc>) -> bool {
        let cooldown = self.runtime_config.read().alert_cooldown_secs;
        self.alert_memory
            .read()
            .get(&alert_key(symbol))
            .is_some_and(|m| m.suppresses(side, now, cooldown))
    }

    /// Remember the alert for cooldown purposes and append it to the recent
    /// list, capped at [`MAX_RECENT_ALERTS`].
    pub fn push_alert(&self, record: AlertRecord, now: DateTime<Utc>) {
        self.alert_memory.write().insert(
            alert_key(&record.symbol),
            AlertMemory {
                side: record.side,
                at: now,
            },
        );

        let mut alerts = self.recent_alerts.write();
        alerts.push(record);
        while alerts.len() > MAX_RECENT_ALERTS {
            alerts.remove(0);
        }

        self.increment_version();
    }

    // ── Snapshot Builder ────────────────────────────────────────────────

    pub fn build_health(&self) -> HealthSnapshot {
        let config = self.runtime_config.read();
        HealthSnapshot {
            status: "ok",
            state_version: self.current_state_version(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            server_time: Utc::now().timestamp_millis(),
            active_pairs: self.pairs.active().len(),
            tick_enabled: config.tick_enabled,
            recent_errors: self.recent_errors.read().len(),
        }
    }
}

/// Public health payload.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub status: &'static str,
    pub state_version: u64,
    pub uptime_secs: u64,
    pub server_time: i64,
    pub active_pairs: usize,
    pub tick_enabled: bool,
    pub recent_errors: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::ConfidenceSignal;
    use crate::pairs::parse_pair_list;
    use crate::test_support::{
        sample_analysis, test_state, RecordingNotifier, StubExchange, StubHeatmap, StubVenue,
    };

    fn record(symbol: &str, side: Direction) -> AlertRecord {
        AlertRecord::from_signal(
            &ConfidenceSignal {
                symbol: symbol.into(),
                side,
                entry: 1.0,
                tp: 1.01,
                sl: 0.99,
                confidence: 70,
            },
            None,
            None,
        )
    }

    #[test]
    fn pairs_seeded_from_config() {
        let (state, _) = test_state(Default::default());
        assert_eq!(state.pairs.active(), vec!["BTCUSDT", "AVAXUSDT"]);
    }

    #[test]
    fn startup_pairs_stay_out_of_config() {
        let analyzer = Analyzer::new(
            Arc::new(StubExchange::default()),
            Arc::new(StubVenue::default()),
            Arc::new(StubHeatmap::default()),
        );
        let state = AppState::new(
            RuntimeConfig::default(),
            std::env::temp_dir().join("liqbot_unused.json"),
            ApiSecrets::default(),
            analyzer,
            Arc::new(RecordingNotifier::default()),
        )
        .with_startup_pairs(&parse_pair_list("sol, eth"));

        assert_eq!(state.pairs.active(), vec!["SOLUSDT", "ETHUSDT"]);
        assert_eq!(state.config().pairs, vec!["BTCUSDT", "AVAXUSDT"]);

        let state = state.with_startup_pairs(&[]);
        assert_eq!(state.pairs.active(), vec!["SOLUSDT", "ETHUSDT"]);
    }

    #[test]
    fn analysis_cache_keeps_latest_per_symbol() {
        let (state, _) = test_state(Default::default());
        state.record_analysis(sample_analysis("SOLUSDT", 150.0));
        state.record_analysis(sample_analysis("BTCUSDT", 60_000.0));
        state.record_analysis(sample_analysis("BTCUSDT", 61_000.0));

        let all = state.cached_analyses();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].symbol, "BTCUSDT");
        assert!((all[0].price - 61_000.0).abs() < f64::EPSILON);
        assert!(state.cached_analysis("ETHUSDT").is_none());
    }

    #[test]
    fn alert_cooldown_roundtrip() {
        let (state, _) = test_state(Default::default());
        let now = Utc::now();
        assert!(!state.alert_suppressed("BTCUSDT", Direction::Long, now));

        let v0 = state.current_state_version();
        state.push_alert(record("BTCUSDT", Direction::Long), now);
        assert!(state.current_state_version() > v0);
        assert!(state.alert_suppressed("BTCUSDT", Direction::Long, now));
        assert!(!state.alert_suppressed("BTCUSDT", Direction::Short, now));
        assert!(!state.alert_suppressed("AVAXUSDT", Direction::Long, now));
    }

    #[test]
    fn recent_lists_are_capped() {
        let (state, _) = test_state(Default::default());
        for i in 0..(MAX_RECENT_ALERTS + 5) {
            state.push_alert(record(&format!("S{i}USDT"), Direction::Long), Utc::now());
        }
        for _ in 0..(MAX_RECENT_ERRORS + 5) {
            state.push_error("boom".into(), None);
        }
        assert_eq!(state.recent_alerts.read().len(), MAX_RECENT_ALERTS);
        assert_eq!(state.recent_errors.read().len(), MAX_RECENT_ERRORS);
        assert_eq!(state.recent_alerts.read()[0].symbol, "S5USDT");
    }
}
