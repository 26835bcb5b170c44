use anyhow::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[async_trait::async_trait]
pub trait Actor: Send + Sync + 'static {
    async fn run(self) -> Result<()>;
}

// ----------- Domain types -----------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Kalshi,
    Polymarket,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Kalshi => write!(f, "kalshi"),
            Platform::Polymarket => write!(f, "polymarket"),
        }
    }
}

impl std::str::FromStr for Platform {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "kalshi" => Ok(Platform::Kalshi),
            "polymarket" => Ok(Platform::Polymarket),
            _ => Err(anyhow::anyhow!("Unknown platform: {s}")),
        }
    }
}

/// Canonical tradable proposition, normalized from a venue-specific record.
///
/// `yes_price` and `no_price` are independent order-book quotes on the 0-1
/// fraction scale; they need not sum to 1. Optional fields stay `None` when
/// the venue omits them -- zero is a valid observed value.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Market {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub platform: Platform,
    pub yes_price: f64,
    pub no_price: f64,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub close_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub liquidity: Option<f64>,
}

/// An internally tracked forecastable proposition awaiting comparison
/// against external markets. Immutable for the duration of one matching pass.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Condition {
    pub id: String,
    pub question: String,
    #[serde(default, rename = "shortName")]
    pub short_name: Option<String>,
    #[serde(rename = "endTime")]
    pub end_time: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchTag {
    StrongOpportunity,
    InvestigateFurther,
    RelatedMarket,
    UniqueMarket,
}

impl fmt::Display for MatchTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchTag::StrongOpportunity => write!(f, "Strong Opportunity"),
            MatchTag::InvestigateFurther => write!(f, "Investigate Further"),
            MatchTag::RelatedMarket => write!(f, "Related Market"),
            MatchTag::UniqueMarket => write!(f, "Unique Market"),
        }
    }
}

/// Exactly one per input Condition. `market` is `None` when no candidate
/// reached the similarity threshold; `similarity` is 0 in that case.
#[derive(Clone, Debug)]
pub struct MatchResult {
    pub condition: Condition,
    pub market: Option<Market>,
    pub similarity: f64,
    pub analysis: String,
    pub tag: MatchTag,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    BuyYes,
    BuyNo,
    Skip,
}

impl Recommendation {
    pub fn is_buy(&self) -> bool {
        matches!(self, Recommendation::BuyYes | Recommendation::BuyNo)
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::BuyYes => write!(f, "BUY_YES"),
            Recommendation::BuyNo => write!(f, "BUY_NO"),
            Recommendation::Skip => write!(f, "SKIP"),
        }
    }
}

/// Oracle estimate for one subject, normalized to the 0-1 scale.
///
/// `edge = fair_value - yes_price` (fraction scale). `expected_value` is
/// `fair_value / yes_price`, `None` when the quote is zero.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Forecast {
    pub subject_id: String,
    pub probability: f64,
    pub confidence: f64,
    pub reasoning: String,
    pub fair_value: f64,
    pub edge: f64,
    pub expected_value: Option<f64>,
    pub recommendation: Recommendation,
}

/// A single scored subject, ready for aggregation. `stake` is assigned by
/// the summary reduction (zero until funded, and zero forever for skips).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Decision {
    pub subject_id: String,
    pub recommendation: Recommendation,
    pub yes_price: f64,
    pub fair_value: f64,
    pub edge: f64,
    pub confidence: f64,
    pub stake: Decimal,
}

impl Decision {
    pub fn from_forecast(forecast: &Forecast, yes_price: f64) -> Self {
        Self {
            subject_id: forecast.subject_id.clone(),
            recommendation: forecast.recommendation,
            yes_price,
            fair_value: forecast.fair_value,
            edge: forecast.edge,
            confidence: forecast.confidence,
            stake: Decimal::ZERO,
        }
    }
}

// ----------- Bus messages -----------------

#[derive(Clone, Debug)]
pub struct MarketSnapshot {
    pub markets: Vec<Market>,
    pub errors: Vec<crate::core::error::PipelineError>,
    pub ts_ms: i64,
}

#[derive(Clone, Debug)]
pub struct ConditionSnapshot {
    pub conditions: Vec<Condition>,
    pub errors: Vec<crate::core::error::PipelineError>,
    pub ts_ms: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BalanceUpdate {
    pub equity: Decimal,
    pub ts_ms: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalCause {
    Success,
    CatastrophicLoss,
    Timeout,
}

impl fmt::Display for TerminalCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminalCause::Success => write!(f, "success"),
            TerminalCause::CatastrophicLoss => write!(f, "catastrophic-loss"),
            TerminalCause::Timeout => write!(f, "timeout"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Idle,
    Running,
    Terminated(TerminalCause),
}
