use crate::bus::types::Bus;
use crate::catalog::conditions::ConditionsClient;
use crate::catalog::kalshi::KalshiClient;
use crate::catalog::normalize::normalize_all;
use crate::catalog::polymarket::GammaClient;
use crate::config::config::CatalogCfg;
use crate::core::error::PipelineError;
use crate::core::types::{Actor, ConditionSnapshot, MarketSnapshot, Platform};
use anyhow::Result;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Refreshes the external market catalogs and the internal conditions
/// catalog on a fixed cadence and publishes canonical snapshots. A venue
/// outage degrades that venue to an empty catalog plus a recorded error;
/// it never fails the snapshot.
pub struct CatalogActor {
    pub bus: Bus,
    pub kalshi: KalshiClient,
    pub polymarket: GammaClient,
    pub conditions: ConditionsClient,
    pub cfg: CatalogCfg,
    pub shutdown: CancellationToken,
}

impl CatalogActor {
    pub fn new(
        bus: Bus,
        kalshi: KalshiClient,
        polymarket: GammaClient,
        conditions: ConditionsClient,
        cfg: CatalogCfg,
        shutdown: CancellationToken,
    ) -> CatalogActor {
        Self {
            bus,
            kalshi,
            polymarket,
            conditions,
            cfg,
            shutdown,
        }
    }

    async fn build_market_snapshot(&self) -> MarketSnapshot {
        let (kalshi_res, poly_res) = futures::join!(
            self.kalshi.fetch_raw_markets(),
            self.polymarket.fetch_raw_markets(),
        );

        let mut markets = Vec::new();
        let mut errors = Vec::new();

        match kalshi_res {
            Ok(raws) => markets.extend(normalize_all(Platform::Kalshi, &raws)),
            Err(e) => {
                metrics::counter!("catalog_fetch_failures_total", "venue" => "kalshi")
                    .increment(1);
                errors.push(PipelineError::upstream("kalshi", format!("{e:#}")));
            }
        }
        match poly_res {
            Ok(raws) => markets.extend(normalize_all(Platform::Polymarket, &raws)),
            Err(e) => {
                metrics::counter!("catalog_fetch_failures_total", "venue" => "polymarket")
                    .increment(1);
                errors.push(PipelineError::upstream("polymarket", format!("{e:#}")));
            }
        }

        MarketSnapshot {
            markets,
            errors,
            ts_ms: Utc::now().timestamp_millis(),
        }
    }

    async fn build_condition_snapshot(&self) -> ConditionSnapshot {
        let (conditions, errors) = match self.conditions.fetch_conditions().await {
            Ok(conditions) => (conditions, Vec::new()),
            Err(e) => {
                metrics::counter!("catalog_fetch_failures_total", "venue" => "conditions")
                    .increment(1);
                (
                    Vec::new(),
                    vec![PipelineError::upstream("conditions", format!("{e:#}"))],
                )
            }
        };
        ConditionSnapshot {
            conditions,
            errors,
            ts_ms: Utc::now().timestamp_millis(),
        }
    }
}

#[async_trait::async_trait]
impl Actor for CatalogActor {
    async fn run(mut self) -> Result<()> {
        info!("CatalogActor started");

        // throttle the loop
        let mut tick = tokio::time::interval(self.cfg.refresh);

        loop {
            tokio::select! {
                // Graceful shutdown signal
                _ = self.shutdown.cancelled() => {
                    info!("CatalogActor: shutdown requested");
                    break;
                }

                _ = tick.tick() => {
                    let markets = self.build_market_snapshot().await;
                    if markets.markets.is_empty() {
                        warn!("CatalogActor: fetched 0 markets across all venues.");
                    } else {
                        info!(
                            "CatalogActor: fetched {} markets ({} venue errors).",
                            markets.markets.len(),
                            markets.errors.len()
                        );
                    }
                    for e in &markets.errors {
                        warn!("CatalogActor: {}", e);
                    }
                    if let Err(e) = self.bus.markets.publish(markets).await {
                        error!("CatalogActor: failed to publish market snapshot: {:?}", e);
                    }

                    let conditions = self.build_condition_snapshot().await;
                    info!(
                        "CatalogActor: fetched {} conditions.",
                        conditions.conditions.len()
                    );
                    if let Err(e) = self.bus.conditions.publish(conditions).await {
                        error!("CatalogActor: failed to publish condition snapshot: {:?}", e);
                    }
                }
            }
        }
        info!("CatalogActor stopped cleanly");
        Ok(())
    }
}
