//! Streaming reduction of decisions into a run summary.
//!
//! Counts and sums are associative and commutative, so partial summaries
//! built by independent workers merge to the same totals in either order.
//! Capital deployment is the one order-sensitive field: the first N
//! eligible BUY decisions (in arrival order) are funded, then the trade
//! cap closes the book.

use crate::config::config::TradingCfg;
use crate::core::types::Decision;
use crate::strategy::sizing::StakeSizer;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Serialize;

pub struct FundingPolicy {
    pub bankroll: Decimal,
    pub max_trades: usize,
    pub sizer: StakeSizer,
}

impl FundingPolicy {
    pub fn from_cfg(cfg: &TradingCfg) -> Self {
        Self {
            bankroll: Decimal::from_f64(cfg.bankroll).unwrap_or(Decimal::ZERO),
            max_trades: cfg.max_trades,
            sizer: StakeSizer::new(cfg.kelly_multiplier, cfg.max_stake_fraction),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct Summary {
    pub total_analyzed: usize,
    pub recommended_count: usize,
    pub skipped_count: usize,
    pub confidence_sum: f64,
    pub edge_sum: f64,
    pub capital_deployed: Decimal,
    pub funded_trades: usize,
    pub decisions: Vec<Decision>,
}

impl Summary {
    /// Folds one decision in, assigning its stake if it is an eligible BUY
    /// and the trade cap has room. Returns the decision as recorded.
    pub fn record(&mut self, mut decision: Decision, policy: &FundingPolicy) -> Decision {
        decision.stake = Decimal::ZERO;
        if decision.recommendation.is_buy() {
            self.recommended_count += 1;
            if self.funded_trades < policy.max_trades {
                let stake = policy.sizer.stake(
                    policy.bankroll,
                    decision.recommendation,
                    decision.fair_value,
                    decision.yes_price,
                );
                if stake > Decimal::ZERO {
                    self.funded_trades += 1;
                    self.capital_deployed += stake;
                    decision.stake = stake;
                }
            }
        } else {
            self.skipped_count += 1;
        }

        self.total_analyzed += 1;
        self.confidence_sum += decision.confidence;
        self.edge_sum += decision.edge;
        self.decisions.push(decision.clone());
        decision
    }

    pub fn avg_confidence(&self) -> f64 {
        if self.total_analyzed == 0 {
            0.0
        } else {
            self.confidence_sum / self.total_analyzed as f64
        }
    }

    pub fn avg_edge(&self) -> f64 {
        if self.total_analyzed == 0 {
            0.0
        } else {
            self.edge_sum / self.total_analyzed as f64
        }
    }

    /// Merges another partial summary into this one by replaying the
    /// combined decision log through the funding policy. Counts and means
    /// come out identical in either merge order; the funded subset follows
    /// the concatenation order.
    pub fn merge(self, other: Summary, policy: &FundingPolicy) -> Summary {
        let mut merged = Summary::default();
        for decision in self.decisions.into_iter().chain(other.decisions) {
            merged.record(decision, policy);
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Recommendation;
    use rust_decimal::prelude::ToPrimitive;

    fn policy(max_trades: usize) -> FundingPolicy {
        FundingPolicy {
            bankroll: Decimal::from(1000),
            max_trades,
            sizer: StakeSizer::default(),
        }
    }

    fn buy(id: &str, fair_value: f64, yes_price: f64, confidence: f64) -> Decision {
        Decision {
            subject_id: id.to_string(),
            recommendation: Recommendation::BuyYes,
            yes_price,
            fair_value,
            edge: fair_value - yes_price,
            confidence,
            stake: Decimal::ZERO,
        }
    }

    fn skip(id: &str, confidence: f64) -> Decision {
        Decision {
            subject_id: id.to_string(),
            recommendation: Recommendation::Skip,
            yes_price: 0.5,
            fair_value: 0.5,
            edge: 0.0,
            confidence,
            stake: Decimal::ZERO,
        }
    }

    #[test]
    fn test_counts_and_means() {
        let policy = policy(10);
        let mut s = Summary::default();
        s.record(buy("a", 0.6, 0.5, 0.8), &policy);
        s.record(skip("b", 0.4), &policy);
        s.record(skip("c", 0.6), &policy);

        assert_eq!(s.total_analyzed, 3);
        assert_eq!(s.recommended_count, 1);
        assert_eq!(s.skipped_count, 2);
        assert!((s.avg_confidence() - 0.6).abs() < 1e-9);
        // mean invariant: avg * n == sum
        assert!((s.avg_confidence() * s.total_analyzed as f64 - s.confidence_sum).abs() < 1e-9);
    }

    #[test]
    fn test_trade_cap_bounds_capital() {
        let policy = policy(2);
        let mut s = Summary::default();
        for i in 0..5 {
            s.record(buy(&format!("m{i}"), 0.6, 0.5, 0.8), &policy);
        }
        assert_eq!(s.funded_trades, 2);
        assert_eq!(s.recommended_count, 5);
        // First two funded, rest recorded with zero stake
        assert!(s.decisions[0].stake > Decimal::ZERO);
        assert!(s.decisions[1].stake > Decimal::ZERO);
        assert_eq!(s.decisions[2].stake, Decimal::ZERO);
        // Each funded stake is 5% of the 1000 bankroll (capped half-Kelly)
        let capital = s.capital_deployed.to_f64().unwrap();
        assert!((capital - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_merge_is_commutative_in_counts_and_means() {
        let policy = policy(10);
        let mut a = Summary::default();
        a.record(buy("a1", 0.6, 0.5, 0.9), &policy);
        a.record(skip("a2", 0.3), &policy);

        let mut b = Summary::default();
        b.record(buy("b1", 0.7, 0.5, 0.7), &policy);
        b.record(skip("b2", 0.5), &policy);
        b.record(skip("b3", 0.1), &policy);

        let ab = a.clone().merge(b.clone(), &policy);
        let ba = b.merge(a, &policy);

        assert_eq!(ab.total_analyzed, ba.total_analyzed);
        assert_eq!(ab.recommended_count, ba.recommended_count);
        assert_eq!(ab.skipped_count, ba.skipped_count);
        assert!((ab.avg_confidence() - ba.avg_confidence()).abs() < 1e-9);
        assert!((ab.avg_edge() - ba.avg_edge()).abs() < 1e-9);
    }

    #[test]
    fn test_merge_capital_follows_concatenation_order() {
        // With room for a single trade, whichever partial comes first gets
        // funded: the documented order sensitivity.
        let policy = policy(1);
        let mut a = Summary::default();
        a.record(buy("a1", 0.6, 0.5, 0.9), &policy);
        let mut b = Summary::default();
        b.record(buy("b1", 0.7, 0.5, 0.9), &policy);

        let ab = a.clone().merge(b.clone(), &policy);
        let ba = b.merge(a, &policy);

        assert_eq!(ab.funded_trades, 1);
        assert_eq!(ba.funded_trades, 1);
        assert!(ab.decisions.iter().any(|d| d.subject_id == "a1" && d.stake > Decimal::ZERO));
        assert!(ba.decisions.iter().any(|d| d.subject_id == "b1" && d.stake > Decimal::ZERO));
    }

    #[test]
    fn test_empty_summary_means_are_zero() {
        let s = Summary::default();
        assert_eq!(s.avg_confidence(), 0.0);
        assert_eq!(s.avg_edge(), 0.0);
    }
}
