use crate::bus::types::Bus;
use crate::config::config::AppCfg;
use crate::core::types::{Actor, Condition, Decision, MarketSnapshot};
use crate::oracle::Forecaster;
use crate::session::aggregator::FundingPolicy;
use crate::session::dry_run;
use crate::strategy::matcher::Matcher;
use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Drives the scoring pipeline over each catalog snapshot:
/// match conditions against markets, forecast the matched subjects, and
/// publish the resulting decisions. Optionally runs one bounded dry-run
/// pass over the raw market batch.
pub struct StrategyActor {
    pub bus: Bus,
    pub shutdown: CancellationToken,
    matcher: Matcher,
    oracle: Arc<dyn Forecaster>,
    policy: FundingPolicy,
    dry_run: bool,
    dry_run_limit: usize,
    dry_run_done: bool,
    conditions: Vec<Condition>,
}

impl StrategyActor {
    pub fn new(
        bus: Bus,
        shutdown: CancellationToken,
        cfg: &AppCfg,
        oracle: Arc<dyn Forecaster>,
    ) -> StrategyActor {
        Self {
            bus,
            shutdown,
            matcher: Matcher::new(&cfg.matching),
            oracle,
            policy: FundingPolicy::from_cfg(&cfg.trading),
            dry_run: cfg.session.dry_run,
            dry_run_limit: cfg.session.dry_run_limit,
            dry_run_done: false,
            conditions: Vec::new(),
        }
    }

    async fn handle_snapshot(&mut self, snapshot: &MarketSnapshot) {
        if snapshot.markets.is_empty() {
            warn!("StrategyActor: empty market snapshot, nothing to score.");
            return;
        }

        if !self.conditions.is_empty() {
            self.run_matching_pass(snapshot).await;
        }

        if self.dry_run && !self.dry_run_done {
            let batch = &snapshot.markets[..self.dry_run_limit.min(snapshot.markets.len())];
            let report = dry_run::run(batch, self.oracle.as_ref(), &self.policy).await;
            for decision in &report.summary.decisions {
                if let Err(e) = self.bus.decisions.publish(decision.clone()).await {
                    error!("StrategyActor: failed to publish decision: {:?}", e);
                }
            }
            self.dry_run_done = true;
        }
    }

    async fn run_matching_pass(&self, snapshot: &MarketSnapshot) {
        let results = self.matcher.match_all(&self.conditions, &snapshot.markets);
        let matched = results.iter().filter(|r| r.market.is_some()).count();
        info!(
            "StrategyActor: matched {}/{} conditions against {} markets.",
            matched,
            results.len(),
            snapshot.markets.len()
        );

        for result in &results {
            info!(
                "[{}] {} (similarity {:.2}): {}",
                result.tag, result.condition.id, result.similarity, result.analysis
            );

            let Some(market) = &result.market else {
                continue;
            };

            match self.oracle.forecast(market, Some(&result.condition)).await {
                Ok(forecast) => {
                    let decision = Decision::from_forecast(&forecast, market.yes_price);
                    info!(
                        "Forecast {}: {} (fair {:.0}%, edge {:+.1}pp, confidence {:.0}%)",
                        decision.subject_id,
                        decision.recommendation,
                        decision.fair_value * 100.0,
                        decision.edge * 100.0,
                        decision.confidence * 100.0,
                    );
                    if let Err(e) = self.bus.decisions.publish(decision).await {
                        error!("StrategyActor: failed to publish decision: {:?}", e);
                    }
                }
                // One subject's failure never aborts its siblings.
                Err(e) => warn!("StrategyActor: forecast failed: {}", e),
            }
        }
    }
}

#[async_trait::async_trait]
impl Actor for StrategyActor {
    async fn run(mut self) -> Result<()> {
        info!("StrategyActor started");

        let mut markets_rx = self.bus.markets.subscribe();
        let mut conditions_rx = self.bus.conditions.subscribe();

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("StrategyActor: shutdown requested");
                    break;
                }

                res = conditions_rx.recv() => {
                    match res {
                        Ok(snapshot) => {
                            self.conditions = snapshot.conditions.clone();
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            warn!("StrategyActor lagged by {n} condition snapshots");
                            continue;
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                            error!("StrategyActor condition channel closed");
                            break;
                        }
                    }
                }

                res = markets_rx.recv() => {
                    match res {
                        Ok(snapshot) => {
                            self.handle_snapshot(&snapshot).await;
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            warn!("StrategyActor lagged by {n} market snapshots");
                            continue;
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                            error!("StrategyActor market channel closed");
                            break;
                        }
                    }
                }
            }
        }

        info!("StrategyActor stopped cleanly");
        Ok(())
    }
}
