//! Venue-record normalization.
//!
//! Each venue returns loosely-typed JSON with its own field names and units.
//! An adapter per platform resolves every canonical field through an ordered
//! list of acceptable source keys with a final default, so the mapping stays
//! pure and testable venue by venue.

use crate::core::types::{Market, Platform};
use chrono::{DateTime, Utc};
use serde_json::Value;

pub type Adapter = fn(&Value) -> Market;

/// Adapter table keyed by platform tag.
pub fn adapter(platform: Platform) -> Adapter {
    match platform {
        Platform::Kalshi => normalize_kalshi,
        Platform::Polymarket => normalize_polymarket,
    }
}

pub fn normalize_all(platform: Platform, raws: &[Value]) -> Vec<Market> {
    let map = adapter(platform);
    raws.iter().map(map).collect()
}

/// Kalshi quotes prices in cents (0-100).
fn normalize_kalshi(raw: &Value) -> Market {
    Market {
        id: first_str(raw, &["ticker", "id"]).unwrap_or_default(),
        title: first_str(raw, &["title", "question"]).unwrap_or_default(),
        description: first_str(raw, &["subtitle", "rules_primary"]).unwrap_or_default(),
        platform: Platform::Kalshi,
        yes_price: first_f64(raw, &["yes_ask", "yes_bid", "last_price"])
            .map(cents_to_fraction)
            .unwrap_or(0.5),
        no_price: first_f64(raw, &["no_ask", "no_bid"])
            .map(cents_to_fraction)
            .unwrap_or(0.5),
        volume: first_f64(raw, &["volume", "volume_24h"]),
        close_date: first_date(raw, &["close_time", "expiration_time"]),
        liquidity: first_f64(raw, &["liquidity", "open_interest"]),
    }
}

/// Polymarket Gamma quotes fractions, but ships outcome prices as a
/// stringified JSON array ("[\"0.42\", \"0.58\"]").
fn normalize_polymarket(raw: &Value) -> Market {
    let outcome_prices = outcome_prices(raw);
    Market {
        id: first_str(raw, &["id", "conditionId"]).unwrap_or_default(),
        title: first_str(raw, &["question", "title"]).unwrap_or_default(),
        description: first_str(raw, &["description"]).unwrap_or_default(),
        platform: Platform::Polymarket,
        yes_price: outcome_prices
            .map(|(yes, _)| yes)
            .or_else(|| first_f64(raw, &["bestBid", "lastTradePrice"]))
            .map(clamp_fraction)
            .unwrap_or(0.5),
        no_price: outcome_prices
            .map(|(_, no)| no)
            .map(clamp_fraction)
            .unwrap_or(0.5),
        volume: first_f64(raw, &["volumeNum", "volume"]),
        close_date: first_date(raw, &["endDate", "end_date_iso"]),
        liquidity: first_f64(raw, &["liquidityNum", "liquidity"]),
    }
}

// ---------- lenient field helpers ----------

fn first_str(raw: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(s) = raw.get(key).and_then(Value::as_str) {
            if !s.is_empty() {
                return Some(s.to_string());
            }
        }
    }
    None
}

/// Accepts a JSON number or a numeric string; anything else is skipped.
fn first_f64(raw: &Value, keys: &[&str]) -> Option<f64> {
    for key in keys {
        match raw.get(key) {
            Some(Value::Number(n)) => {
                if let Some(f) = n.as_f64() {
                    return Some(f);
                }
            }
            Some(Value::String(s)) => {
                if let Ok(f) = s.trim().parse::<f64>() {
                    return Some(f);
                }
            }
            _ => {}
        }
    }
    None
}

fn first_date(raw: &Value, keys: &[&str]) -> Option<DateTime<Utc>> {
    for key in keys {
        if let Some(s) = raw.get(key).and_then(Value::as_str) {
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
        }
    }
    None
}

/// Parses `outcomePrices` whether it arrives as a stringified JSON array or
/// as a real one. Returns (yes, no).
fn outcome_prices(raw: &Value) -> Option<(f64, f64)> {
    let prices: Vec<String> = match raw.get("outcomePrices") {
        Some(Value::String(s)) => serde_json::from_str(s).ok()?,
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        _ => return None,
    };
    let yes = prices.first()?.trim().parse::<f64>().ok()?;
    let no = prices.get(1)?.trim().parse::<f64>().ok()?;
    Some((yes, no))
}

fn cents_to_fraction(cents: f64) -> f64 {
    clamp_fraction(cents / 100.0)
}

fn clamp_fraction(p: f64) -> f64 {
    p.clamp(0.0, 1.0)
}
