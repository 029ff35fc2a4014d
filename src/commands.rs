// =============================================================================
// Chat command handling
// =============================================================================
//
// Parsing is a pure function of the message text. `handle_command` runs the
// parsed command against the shared state and returns the reply, if any.
// Text that does not start with `/` gets no reply at all.
// =============================================================================

use tracing::{info, instrument};

use crate::app_state::AppState;
use crate::heatmap::majority;
use crate::pairs::{normalize_symbol, PairEdit};
use crate::report::{escape_html, mm_report, pair_report, PairReportEntry};

const DEFAULT_MM_COIN: &str = "BTC";

pub const HELP_TEXT: &str = "<b>Commands</b>\n\
/mm [COIN] - market-maker heatmap report (default BTC)\n\
/pairs - list active pairs\n\
/addpair SYMBOL - start watching a pair\n\
/rmpair SYMBOL - stop watching a pair\n\
/report - summary for every active pair\n\
/help - this message";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Mm(Option<String>),
    Pairs,
    AddPair(Option<String>),
    RmPair(Option<String>),
    Report,
    Help,
    Unknown,
}

/// Parse a chat message. `None` when the text is not a command.
pub fn parse_command(text: &str) -> Option<Command> {
    let text = text.trim();
    if !text.starts_with('/') {
        return None;
    }

    let mut parts = text.split_whitespace();
    let head = parts.next()?.to_lowercase();
    let word = head.split('@').next().unwrap_or_default();
    let arg = parts.next().map(str::to_string);

    Some(match word {
        "/mm" => Command::Mm(arg),
        "/pairs" => Command::Pairs,
        "/addpair" => Command::AddPair(arg),
        "/rmpair" => Command::RmPair(arg),
        "/report" => Command::Report,
        "/help" | "/start" => Command::Help,
        _ => Command::Unknown,
    })
}

fn pair_list(pairs: &[String]) -> String {
    if pairs.is_empty() {
        return "(none)".to_string();
    }
    pairs
        .iter()
        .map(|p| format!("• {p}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn edit_reply(edit: PairEdit, raw: &str, pairs: &[String]) -> String {
    let symbol = normalize_symbol(raw).unwrap_or_else(|| raw.trim().to_uppercase());
    let symbol = escape_html(&symbol);
    match edit {
        PairEdit::Added => format!("✅ Pair added: {symbol}\nActive pairs:\n{}", pair_list(pairs)),
        PairEdit::AlreadyActive => format!("ℹ️ {symbol} is already active."),
        PairEdit::Removed => format!("🗑 Pair removed: {symbol}\nActive pairs:\n{}", pair_list(pairs)),
        PairEdit::NotActive => format!("ℹ️ {symbol} is not an active pair."),
        PairEdit::Locked => "🔒 The pair list is locked.".to_string(),
        PairEdit::Invalid => "⚠️ Invalid symbol.".to_string(),
    }
}

async fn mm_command(state: &AppState, coin: Option<&str>) -> String {
    let raw = coin.unwrap_or(DEFAULT_MM_COIN);
    let Some(symbol) = normalize_symbol(raw) else {
        return "Usage: /mm BTC".to_string();
    };

    let Some(analysis) = state.analyzer.analyze_symbol(&symbol).await else {
        state.push_error("analysis returned no price".to_string(), Some(&symbol));
        return format!("⚠️ no data for {}", escape_html(&symbol));
    };
    state.record_analysis(analysis.clone());

    let config = state.config();
    let view = state
        .analyzer
        .heatmap_view(&analysis, &config.heatmap_timeframes, &config.fallback_for(&symbol))
        .await;

    mm_report(&analysis, &view, &config.tradingview_exchange)
}

async fn report_command(state: &AppState) -> String {
    let config = state.config();
    let mut entries = Vec::new();

    for symbol in state.pairs.active() {
        let Some(analysis) = state.analyzer.analyze_symbol(&symbol).await else {
            entries.push(PairReportEntry {
                symbol,
                analysis: None,
                consensus: None,
            });
            continue;
        };
        state.record_analysis(analysis.clone());

        let view = state
            .analyzer
            .heatmap_view(&analysis, &config.heatmap_timeframes, &config.fallback_for(&symbol))
            .await;
        let consensus = (!view.results.is_empty()).then(|| majority(&view.results));

        entries.push(PairReportEntry {
            symbol,
            analysis: Some(analysis),
            consensus,
        });
    }

    pair_report(&entries)
}

/// Run one chat command. `user_id` is the Telegram sender, used for the
/// admin check on pair edits.
#[instrument(skip(state, text))]
pub async fn handle_command(state: &AppState, text: &str, user_id: Option<i64>) -> Option<String> {
    let command = parse_command(text)?;
    info!(command = ?command, "chat command");
    let is_admin = state.runtime_config.read().is_admin(user_id);

    let reply = match command {
        Command::Mm(coin) => mm_command(state, coin.as_deref()).await,
        Command::Pairs => format!("📊 Active pairs:\n{}", pair_list(&state.pairs.active())),
        Command::AddPair(None) => "Usage: /addpair BTCUSDT".to_string(),
        Command::RmPair(None) => "Usage: /rmpair BTCUSDT".to_string(),
        Command::AddPair(Some(_)) | Command::RmPair(Some(_)) if !is_admin => {
            "⛔ Only admins can edit the pair list.".to_string()
        }
        Command::AddPair(Some(raw)) => {
            let (edit, pairs) = state.pairs.add(&raw);
            state.increment_version();
            edit_reply(edit, &raw, &pairs)
        }
        Command::RmPair(Some(raw)) => {
            let (edit, pairs) = state.pairs.remove(&raw);
            state.increment_version();
            edit_reply(edit, &raw, &pairs)
        }
        Command::Report => report_command(state).await,
        Command::Help => HELP_TEXT.to_string(),
        Command::Unknown => format!("Unknown command.\n\n{HELP_TEXT}"),
    };

    Some(reply)
}
