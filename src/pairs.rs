// =============================================================================
// Symbol helpers and the in-memory pair store
// =============================================================================

use parking_lot::RwLock;
use serde::Serialize;
use tracing::info;

const QUOTE: &str = "USDT";

/// Trim, upper-case and append `USDT` unless already present.
pub fn normalize_symbol(raw: &str) -> Option<String> {
    let s = raw.trim().to_uppercase();
    if s.is_empty() {
        return None;
    }
    if s.ends_with(QUOTE) {
        Some(s)
    } else {
        Some(format!("{s}{QUOTE}"))
    }
}

/// Comma-separated symbol list such as `LIQBOT_PAIRS`. Blank entries are
/// skipped.
pub fn parse_pair_list(raw: &str) -> Vec<String> {
    raw.split(',').filter_map(normalize_symbol).collect()
}

/// `BTCUSDT` → `BTC`.
pub fn base_asset(symbol: &str) -> String {
    symbol.replacen(QUOTE, "", 1)
}

/// Symbol as the heatmap provider names it: quote stripped and the `1000`
/// multiplier prefix removed (`1000PEPEUSDT` → `PEPE`).
pub fn coinglass_symbol(symbol: &str) -> String {
    match symbol.strip_suffix(QUOTE) {
        Some(base) => base.replacen("1000", "", 1),
        None => symbol.to_string(),
    }
}

/// Outcome of an add/remove request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PairEdit {
    Added,
    AlreadyActive,
    Removed,
    NotActive,
    Locked,
    Invalid,
}

/// Active pair list. Lives in memory only; a restart restores the configured
/// defaults.
#[derive(Debug)]
pub struct PairStore {
    pairs: RwLock<Vec<String>>,
    locked: bool,
}

impl PairStore {
    pub fn new(defaults: &[String], locked: bool) -> Self {
        let mut pairs: Vec<String> = Vec::with_capacity(defaults.len());
        for p in defaults.iter().filter_map(|p| normalize_symbol(p)) {
            if !pairs.contains(&p) {
                pairs.push(p);
            }
        }
        Self {
            pairs: RwLock::new(pairs),
            locked,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn active(&self) -> Vec<String> {
        self.pairs.read().clone()
    }

    pub fn add(&self, raw: &str) -> (PairEdit, Vec<String>) {
        if self.locked {
            return (PairEdit::Locked, self.active());
        }
        let Some(symbol) = normalize_symbol(raw) else {
            return (PairEdit::Invalid, self.active());
        };

        let mut pairs = self.pairs.write();
        if pairs.contains(&symbol) {
            return (PairEdit::AlreadyActive, pairs.clone());
        }
        pairs.push(symbol.clone());
        info!(symbol = %symbol, "pair added");
        (PairEdit::Added, pairs.clone())
    }

    pub fn remove(&self, raw: &str) -> (PairEdit, Vec<String>) {
        if self.locked {
            return (PairEdit::Locked, self.active());
        }
        let Some(symbol) = normalize_symbol(raw) else {
            return (PairEdit::Invalid, self.active());
        };

        let mut pairs = self.pairs.write();
        let before = pairs.len();
        pairs.retain(|p| *p != symbol);
        if pairs.len() == before {
            return (PairEdit::NotActive, pairs.clone());
        }
        info!(symbol = %symbol, "pair removed");
        (PairEdit::Removed, pairs.clone())
    }
}
