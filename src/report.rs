// =============================================================================
// Telegram message formatting (HTML parse mode)
// =============================================================================

use std::fmt::Write as _;

use crate::analysis::{HeatmapView, SymbolAnalysis};
use crate::heatmap::{CombinedHeatmap, Consensus, HeatSource};
use crate::market_data::DepthConfirmation;
use crate::signals::ConfidenceSignal;

/// Two decimals, or `N/A` for missing and non-finite values.
pub fn fmt_num(x: Option<f64>) -> String {
    fmt_prec(x, 2)
}

pub fn fmt_prec(x: Option<f64>, decimals: usize) -> String {
    match x {
        Some(v) if v.is_finite() => format!("{v:.decimals$}"),
        _ => "N/A".to_string(),
    }
}

/// Escape text for Telegram's HTML parse mode.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

pub fn tradingview_link(exchange: &str, symbol: &str) -> String {
    format!("https://www.tradingview.com/chart/?symbol={exchange}:{symbol}")
}

fn depth_line(c: &DepthConfirmation) -> String {
    match c {
        DepthConfirmation::Available { pressure, ratio, .. } => format!("{pressure} ({ratio:.2})"),
        DepthConfirmation::Unavailable { reason } => format!("N/A ({reason})"),
    }
}

fn funding_line(a: &SymbolAnalysis) -> String {
    match a.funding {
        Some(f) => format!("{} ({})", fmt_prec(Some(f.rate), 5), f.crowding),
        None => "N/A".to_string(),
    }
}

fn lsr_line(a: &SymbolAnalysis) -> String {
    format!("{} ({})", fmt_num(Some(a.lsr.ratio)), a.lsr.source)
}

/// Reply to `/mm SYMBOL`.
pub fn mm_report(a: &SymbolAnalysis, view: &HeatmapView, exchange: &str) -> String {
    let mut out = String::new();
    let plan = &view.plan;

    let _ = writeln!(out, "<b>{} MM Heatmap</b>\n", a.symbol);
    let _ = writeln!(out, "MM Target: <b>{}</b>", view.resolution.target);
    let _ = writeln!(out, "Confidence: <b>{}%</b>", view.resolution.conf);
    let _ = writeln!(out, "Basis: {}", view.resolution.reason);
    let _ = writeln!(out, "MM Direction: <b>{}</b>\n", a.mm.direction);

    let _ = writeln!(out, "Side: <b>{}</b>", plan.side);
    let _ = writeln!(out, "Entry: <b>{}</b>", fmt_num(Some(plan.entry)));
    let _ = writeln!(out, "TP1: <b>{}</b>", fmt_num(plan.tp1));
    let _ = writeln!(out, "TP2: <b>{}</b>", fmt_num(plan.tp2));
    let _ = writeln!(out, "SL: <b>{}</b>\n", fmt_num(plan.sl));

    let _ = writeln!(out, "Funding: {}", funding_line(a));
    let _ = writeln!(out, "OI: {}", fmt_prec(a.oi.current, 0));
    let _ = writeln!(out, "Long/Short: {}", lsr_line(a));
    let _ = writeln!(out, "Manip Score: {}", fmt_num(Some(a.manipulation.score)));
    let _ = writeln!(out, "MEXC Depth: {}\n", depth_line(&a.depth_confirmation));

    for r in &view.results {
        let _ = writeln!(out, "{} → {}", r.tf, r.mm_target);
    }

    let _ = write!(out, "\nTradingView:\n{}", tradingview_link(exchange, &a.symbol));
    out.trim().to_string()
}

/// One row of the `/report` summary.
pub struct PairReportEntry {
    pub symbol: String,
    pub analysis: Option<SymbolAnalysis>,
    pub consensus: Option<Consensus>,
}

/// Reply to `/report`: a short block per active pair.
pub fn pair_report(entries: &[PairReportEntry]) -> String {
    let mut out = String::from("📊 <b>MM Report</b>\n\n");

    for e in entries {
        let _ = writeln!(out, "<b>{}</b>", e.symbol);
        let Some(a) = &e.analysis else {
            out.push_str("• no data\n\n");
            continue;
        };

        let nearest = a
            .liquidity
            .nearest_long
            .map(|l| format!("long {} ({:.2}%)", fmt_num(Some(l.price)), l.dist_pct))
            .into_iter()
            .chain(
                a.liquidity
                    .nearest_short
                    .map(|l| format!("short {} ({:.2}%)", fmt_num(Some(l.price)), l.dist_pct)),
            )
            .collect::<Vec<_>>();

        let _ = writeln!(out, "• Price: {}", fmt_num(Some(a.price)));
        let _ = writeln!(out, "• MM Direction: {}", a.mm.direction);
        let _ = writeln!(out, "• Funding: {}", fmt_prec(a.funding_rate(), 5));
        let _ = writeln!(out, "• OI: {}", fmt_prec(a.oi.current, 0));
        let _ = writeln!(out, "• L/S: {}", lsr_line(a));
        let _ = writeln!(
            out,
            "• Nearest Liq: {}",
            if nearest.is_empty() { "N/A".to_string() } else { nearest.join(", ") }
        );
        let _ = writeln!(out, "• Cluster: {}", fmt_num(Some(a.liquidity.score)));
        if let Some(book) = &a.book {
            let _ = writeln!(
                out,
                "• Book: imbalance {:+.2}, spread {:.1} bps",
                book.imbalance, book.spread_bps
            );
        }
        match e.consensus {
            Some(c) => {
                let _ = writeln!(out, "• Heatmap: {} ({}%)\n", c.target, c.conf);
            }
            None => out.push_str("• Heatmap: N/A\n\n"),
        }
    }

    out.trim_end().to_string()
}

/// Alert pushed by the polling tick.
pub fn tick_alert(
    signal: &ConfidenceSignal,
    heat: Option<f64>,
    analysis: Option<&SymbolAnalysis>,
    heatmap: &CombinedHeatmap,
    exchange: &str,
) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "🚨 <b>{} {}</b>", signal.symbol, signal.side);
    let _ = writeln!(out, "Confidence: <b>{}%</b>", signal.confidence);
    let _ = writeln!(out, "Entry: {}", fmt_num(Some(signal.entry)));
    let _ = writeln!(out, "TP: {}", fmt_num(Some(signal.tp)));
    let _ = writeln!(out, "SL: {}", fmt_num(Some(signal.sl)));
    let _ = writeln!(out, "Heat: {}", fmt_num(heat));
    let _ = writeln!(
        out,
        "Levels: {} Binance / {} Coinglass",
        heatmap.count(HeatSource::Binance),
        heatmap.count(HeatSource::Coinglass)
    );

    if let Some(a) = analysis {
        let _ = writeln!(
            out,
            "\nMM Direction: <b>{}</b> (L {:.2} / S {:.2})",
            a.mm.direction, a.mm.score_long, a.mm.score_short
        );
        let _ = writeln!(out, "Funding: {}", funding_line(a));
        let _ = writeln!(out, "Long/Short: {}", lsr_line(a));

        let notes: Vec<&String> = a
            .oi_funding
            .notes
            .iter()
            .chain(&a.pump_dump.notes)
            .chain(&a.manipulation.notes)
            .chain(&a.mm.notes)
            .collect();
        if !notes.is_empty() {
            out.push('\n');
            for n in notes {
                let _ = writeln!(out, "• {}", escape_html(n));
            }
        }
    }

    let _ = write!(out, "\nTradingView:\n{}", tradingview_link(exchange, &signal.symbol));
    out
}
