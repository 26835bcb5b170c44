use crate::config::config::TradingCfg;
use crate::core::types::Recommendation;

/// Decision thresholds on the internal 0-1 fraction scale. Configuration
/// speaks oracle-facing points (edge 5, confidence 65); the /100 conversion
/// happens exactly once, here.
#[derive(Clone, Copy, Debug)]
pub struct Thresholds {
    pub edge: f64,
    pub confidence: f64,
}

impl Thresholds {
    pub fn from_cfg(cfg: &TradingCfg) -> Self {
        Self {
            edge: cfg.edge_threshold / 100.0,
            confidence: cfg.confidence_threshold / 100.0,
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            edge: 0.05,
            confidence: 0.65,
        }
    }
}

/// Pure decision function: buy only when the edge clears the threshold in
/// either direction and confidence clears its own bar.
pub fn recommend(edge: f64, confidence: f64, t: &Thresholds) -> Recommendation {
    if edge > t.edge && confidence > t.confidence {
        Recommendation::BuyYes
    } else if edge < -t.edge && confidence > t.confidence {
        Recommendation::BuyNo
    } else {
        Recommendation::Skip
    }
}
