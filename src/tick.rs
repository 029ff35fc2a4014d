// =============================================================================
// Polling tick
// =============================================================================
//
// For each active pair, in order:
//
//   futures price → combined liquidation heatmap → heat score
//     → confidence signal → full analysis → cooldown check → alert
//
// A failure on one pair is logged and counted; the tick moves on.
// =============================================================================

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::alerts::AlertRecord;
use crate::app_state::AppState;
use crate::report::tick_alert;
use crate::signals::build_signal;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickSummary {
    pub evaluated: usize,
    pub alerted: usize,
    pub suppressed: usize,
    pub failed: usize,
}

/// Outcome for one pair.
enum PairOutcome {
    NoSignal,
    Alerted,
    Suppressed,
    Failed,
}

async fn tick_pair(state: &AppState, symbol: &str) -> PairOutcome {
    let config = state.config();
    let analyzer = &state.analyzer;

    let price = match analyzer.feed().futures_price(symbol).await {
        Ok(p) if p.is_finite() && p > 0.0 => p,
        Ok(p) => {
            warn!(symbol, price = p, "unusable futures price");
            state.push_error(format!("unusable futures price {p}"), Some(symbol));
            return PairOutcome::Failed;
        }
        Err(e) => {
            warn!(symbol, error = %e, "futures price unavailable");
            state.push_error(format!("futures price: {e}"), Some(symbol));
            return PairOutcome::Failed;
        }
    };

    let heatmap = analyzer
        .combined_heatmap(
            symbol,
            config.liquidation_lookback_secs,
            config.liquidation_bucket_width,
        )
        .await;
    let heat = heatmap.heat_score(price, config.heat_window_pct);

    let Some(signal) = build_signal(symbol, price, heat, config.min_alert_confidence) else {
        debug!(symbol, heat = ?heat, "no signal");
        return PairOutcome::NoSignal;
    };

    let analysis = analyzer.analyze_symbol(symbol).await;
    if let Some(a) = &analysis {
        state.record_analysis(a.clone());
    }

    let now = Utc::now();
    if state.alert_suppressed(symbol, signal.side, now) {
        debug!(symbol, side = %signal.side, "alert inside cooldown, suppressed");
        return PairOutcome::Suppressed;
    }

    let text = tick_alert(
        &signal,
        heat,
        analysis.as_ref(),
        &heatmap,
        &config.tradingview_exchange,
    );
    if let Err(e) = state.notifier.send(&text, None).await {
        warn!(symbol, error = %e, "alert delivery failed");
        state.push_error(format!("alert delivery: {e}"), Some(symbol));
        return PairOutcome::Failed;
    }

    info!(
        symbol,
        side = %signal.side,
        confidence = signal.confidence,
        heat = ?heat,
        "alert sent"
    );
    state.push_alert(
        AlertRecord::from_signal(&signal, heat, analysis.map(|a| a.mm.direction)),
        now,
    );
    PairOutcome::Alerted
}

/// One pass over every active pair.
#[instrument(skip(state), name = "tick")]
pub async fn run_tick(state: &AppState) -> TickSummary {
    let mut summary = TickSummary::default();

    for symbol in state.pairs.active() {
        summary.evaluated += 1;
        match tick_pair(state, &symbol).await {
            PairOutcome::NoSignal => {}
            PairOutcome::Alerted => summary.alerted += 1,
            PairOutcome::Suppressed => summary.suppressed += 1,
            PairOutcome::Failed => summary.failed += 1,
        }
    }

    debug!(?summary, "tick complete");
    summary
}

/// Run ticks forever on a fixed cadence. Ticks are skipped while
/// `tick_enabled` is false.
pub async fn run_tick_loop(state: Arc<AppState>) {
    let period = state.runtime_config.read().tick_interval();
    info!(interval_secs = period.as_secs(), "tick loop starting");

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        if !state.runtime_config.read().tick_enabled {
            continue;
        }

        let summary = run_tick(&state).await;
        if summary.alerted > 0 || summary.failed > 0 {
            info!(
                evaluated = summary.evaluated,
                alerted = summary.alerted,
                suppressed = summary.suppressed,
                failed = summary.failed,
                "tick finished"
            );
        }
    }
}
