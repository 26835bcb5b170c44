use crate::core::types::Recommendation;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

/// Per-trade sizing policy: fractional Kelly with a hard cap on the
/// fraction of bankroll any single trade can take.
pub struct StakeSizer {
    kelly_multiplier: f64,
    max_stake_fraction: f64,
}

impl Default for StakeSizer {
    fn default() -> Self {
        Self {
            kelly_multiplier: 0.5,
            max_stake_fraction: 0.05,
        }
    }
}

impl StakeSizer {
    pub fn new(kelly_multiplier: f64, max_stake_fraction: f64) -> Self {
        Self {
            kelly_multiplier,
            max_stake_fraction,
        }
    }

    /// Stake for one decision, in bankroll currency. Skips and degenerate
    /// quotes (price at 0 or 1) size to zero.
    ///
    /// Kelly fractions: f = (p - price) / (1 - price) for BUY_YES,
    ///                  f = (price - p) / price       for BUY_NO.
    pub fn stake(
        &self,
        bankroll: Decimal,
        recommendation: Recommendation,
        fair_value: f64,
        yes_price: f64,
    ) -> Decimal {
        let raw_kelly = match recommendation {
            Recommendation::BuyYes if yes_price < 1.0 => {
                (fair_value - yes_price) / (1.0 - yes_price)
            }
            Recommendation::BuyNo if yes_price > 0.0 => (yes_price - fair_value) / yes_price,
            _ => return Decimal::ZERO,
        };

        if raw_kelly <= 0.0 {
            return Decimal::ZERO;
        }

        let fraction = (raw_kelly * self.kelly_multiplier).min(self.max_stake_fraction);
        bankroll * Decimal::from_f64(fraction).unwrap_or(Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::ToPrimitive;

    #[test]
    fn test_buy_yes_kelly_capped() {
        let sizer = StakeSizer::default();
        let bankroll = Decimal::from(1000);
        // Kelly = (0.6 - 0.5) / 0.5 = 0.2; half Kelly = 0.1; cap 0.05 -> 50
        let stake = sizer.stake(bankroll, Recommendation::BuyYes, 0.6, 0.5);
        assert!((stake.to_f64().unwrap() - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_buy_no_kelly_below_cap() {
        let sizer = StakeSizer::new(0.5, 0.25);
        let bankroll = Decimal::from(1000);
        // Kelly = (0.5 - 0.4) / 0.5 = 0.2; half Kelly = 0.1 < cap -> 100
        let stake = sizer.stake(bankroll, Recommendation::BuyNo, 0.4, 0.5);
        assert!((stake.to_f64().unwrap() - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_skip_sizes_zero() {
        let sizer = StakeSizer::default();
        let stake = sizer.stake(Decimal::from(1000), Recommendation::Skip, 0.6, 0.5);
        assert_eq!(stake, Decimal::ZERO);
    }

    #[test]
    fn test_degenerate_quotes_size_zero() {
        let sizer = StakeSizer::default();
        assert_eq!(
            sizer.stake(Decimal::from(1000), Recommendation::BuyYes, 0.9, 1.0),
            Decimal::ZERO
        );
        assert_eq!(
            sizer.stake(Decimal::from(1000), Recommendation::BuyNo, 0.1, 0.0),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_negative_kelly_sizes_zero() {
        let sizer = StakeSizer::default();
        // BUY_YES with fair value below price: no edge, no stake
        let stake = sizer.stake(Decimal::from(1000), Recommendation::BuyYes, 0.4, 0.5);
        assert_eq!(stake, Decimal::ZERO);
    }
}
