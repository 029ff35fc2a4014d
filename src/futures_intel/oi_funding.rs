// =============================================================================
// OI / funding interpretation
// =============================================================================
//
//   OI ↑ + price ↑  =>  +0.3  trend continuation
//   OI ↓ + price ↑  =>  +0.4  short squeeze
//   OI ↑ + price ↓  =>  -0.4  long squeeze
//   OI ↓ + price ↓  =>   0    trend weakening (note only)
//
// OI moves count when larger than 2 %. Extreme funding then leans against
// the crowded side by 0.2.

use serde::{Deserialize, Serialize};

const OI_MOVE: f64 = 0.02;
const FUNDING_EXTREME: f64 = 0.0005;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OiFundingView {
    pub bias: f64,
    pub notes: Vec<String>,
}

pub fn interpret_oi_funding(
    oi_now: Option<f64>,
    oi_prev: Option<f64>,
    price_change: f64,
    funding: Option<f64>,
) -> OiFundingView {
    let mut view = OiFundingView::default();

    if let (Some(now), Some(prev)) = (oi_now, oi_prev) {
        let rel_oi = if prev != 0.0 { (now - prev) / prev } else { 0.0 };

        if rel_oi > OI_MOVE && price_change > 0.0 {
            view.notes.push("OI↑ + price↑ (trend continuation)".into());
            view.bias += 0.3;
        } else if rel_oi < -OI_MOVE && price_change > 0.0 {
            view.notes.push("OI↓ + price↑ (possible short squeeze)".into());
            view.bias += 0.4;
        } else if rel_oi > OI_MOVE && price_change < 0.0 {
            view.notes.push("OI↑ + price↓ (possible long squeeze)".into());
            view.bias -= 0.4;
        } else if rel_oi < -OI_MOVE && price_change < 0.0 {
            view.notes.push("OI↓ + price↓ (trend weakening)".into());
        }
    }

    if let Some(rate) = funding.filter(|r| r.is_finite()) {
        if rate > FUNDING_EXTREME {
            view.notes.push("Funding strongly positive (longs crowded)".into());
            view.bias -= 0.2;
        } else if rate < -FUNDING_EXTREME {
            view.notes.push("Funding strongly negative (shorts crowded)".into());
            view.bias += 0.2;
        }
    }

    view
}
