use crate::core::error::PipelineError;
use crate::core::types::{Decision, Market};
use crate::oracle::Forecaster;
use crate::session::aggregator::{FundingPolicy, Summary};
use tracing::{info, warn};

#[derive(Debug)]
pub struct DryRunReport {
    pub summary: Summary,
    pub errors: Vec<PipelineError>,
}

/// Scores a batch of markets through the oracle and reduces the decisions
/// into one summary without executing anything. Calls are sequential; the
/// oracle client's limiter provides the inter-call spacing. One failed
/// subject lands in the error list and never aborts its siblings.
pub async fn run(
    markets: &[Market],
    oracle: &dyn Forecaster,
    policy: &FundingPolicy,
) -> DryRunReport {
    let mut summary = Summary::default();
    let mut errors = Vec::new();

    for market in markets {
        match oracle.forecast(market, None).await {
            Ok(forecast) => {
                let decision = summary.record(
                    Decision::from_forecast(&forecast, market.yes_price),
                    policy,
                );
                info!(
                    "Dry run {}: {} (edge {:+.1}pp, confidence {:.0}%, stake {})",
                    decision.subject_id,
                    decision.recommendation,
                    decision.edge * 100.0,
                    decision.confidence * 100.0,
                    decision.stake,
                );
            }
            Err(e) => {
                warn!("Dry run subject failed: {}", e);
                errors.push(e);
            }
        }
    }

    info!(
        "Dry run complete: {} analyzed, {} recommended, {} skipped, {} errors, avg confidence {:.0}%, avg edge {:+.1}pp, capital {}",
        summary.total_analyzed,
        summary.recommended_count,
        summary.skipped_count,
        errors.len(),
        summary.avg_confidence() * 100.0,
        summary.avg_edge() * 100.0,
        summary.capital_deployed,
    );

    DryRunReport { summary, errors }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Condition, Forecast, Platform, Recommendation};
    use crate::strategy::sizing::StakeSizer;
    use async_trait::async_trait;
    use rust_decimal::Decimal;

    /// Stub oracle: fixed fair value per market id, failure for ids that
    /// start with "bad".
    struct StubOracle;

    #[async_trait]
    impl Forecaster for StubOracle {
        async fn forecast(
            &self,
            market: &Market,
            _condition: Option<&Condition>,
        ) -> Result<Forecast, PipelineError> {
            if market.id.starts_with("bad") {
                return Err(PipelineError::OracleParse {
                    subject_id: market.id.clone(),
                    reason: "no JSON object found in reply".to_string(),
                });
            }
            let fair_value = 0.60;
            let edge = fair_value - market.yes_price;
            Ok(Forecast {
                subject_id: market.id.clone(),
                probability: fair_value,
                confidence: 0.8,
                reasoning: "stub".to_string(),
                fair_value,
                edge,
                expected_value: Some(fair_value / market.yes_price),
                recommendation: if edge > 0.05 {
                    Recommendation::BuyYes
                } else {
                    Recommendation::Skip
                },
            })
        }
    }

    fn market(id: &str, yes_price: f64) -> Market {
        Market {
            id: id.to_string(),
            title: format!("market {id}"),
            description: "".to_string(),
            platform: Platform::Polymarket,
            yes_price,
            no_price: 1.0 - yes_price,
            volume: None,
            close_date: None,
            liquidity: None,
        }
    }

    fn policy() -> FundingPolicy {
        FundingPolicy {
            bankroll: Decimal::from(1000),
            max_trades: 10,
            sizer: StakeSizer::default(),
        }
    }

    #[tokio::test]
    async fn test_failures_are_isolated_per_subject() {
        let markets = vec![
            market("good-1", 0.5),
            market("bad-1", 0.5),
            market("good-2", 0.58),
        ];
        let report = run(&markets, &StubOracle, &policy()).await;

        assert_eq!(report.summary.total_analyzed, 2);
        assert_eq!(report.errors.len(), 1);
        // good-1: edge 0.10 -> buy; good-2: edge 0.02 -> skip
        assert_eq!(report.summary.recommended_count, 1);
        assert_eq!(report.summary.skipped_count, 1);
    }

    #[tokio::test]
    async fn test_empty_batch_yields_empty_summary() {
        let report = run(&[], &StubOracle, &policy()).await;
        assert_eq!(report.summary.total_analyzed, 0);
        assert!(report.errors.is_empty());
        assert_eq!(report.summary.avg_confidence(), 0.0);
    }
}
