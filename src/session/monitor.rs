//! Bounded monitoring session.
//!
//! Tracks ROI against a target, a loss floor, and a wall-clock deadline,
//! sampling on a fixed period. The terminal transition is guarded so that
//! exactly one cause fires even when several conditions hold in the same
//! tick; the final report is emitted once and the sampler stops with it.

use crate::bus::types::Bus;
use crate::config::config::SessionCfg;
use crate::core::types::{Actor, SessionStatus, TerminalCause};
use crate::session::aggregator::{FundingPolicy, Summary};
use anyhow::Result;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Clone, Copy, Debug)]
pub struct SessionLimits {
    pub target_roi: f64,
    pub loss_floor: f64,
    pub duration: Duration,
}

impl SessionLimits {
    pub fn from_cfg(cfg: &SessionCfg) -> Self {
        Self {
            target_roi: cfg.target_roi,
            loss_floor: cfg.loss_floor,
            duration: cfg.duration,
        }
    }
}

/// Terminal check for one sampler tick. Pure, so termination logic is
/// testable without wall-clock delays. Priority when several conditions
/// hold at once: Success, then CatastrophicLoss, then Timeout.
pub fn evaluate(roi: f64, elapsed: Duration, limits: &SessionLimits) -> Option<TerminalCause> {
    if roi >= limits.target_roi {
        Some(TerminalCause::Success)
    } else if roi <= limits.loss_floor {
        Some(TerminalCause::CatastrophicLoss)
    } else if elapsed >= limits.duration {
        Some(TerminalCause::Timeout)
    } else {
        None
    }
}

pub struct SessionActor {
    pub bus: Bus,
    pub shutdown: CancellationToken,
    limits: SessionLimits,
    sample_period: Duration,
    policy: FundingPolicy,

    // State. Owned by the single actor task, so the terminal transition is
    // atomic with respect to the sampler.
    status: SessionStatus,
    initial_equity: Option<Decimal>,
    current_equity: Decimal,
    started_at: Option<tokio::time::Instant>,
    summary: Summary,
}

impl SessionActor {
    pub fn new(
        bus: Bus,
        shutdown: CancellationToken,
        cfg: &SessionCfg,
        policy: FundingPolicy,
    ) -> SessionActor {
        Self {
            bus,
            shutdown,
            limits: SessionLimits::from_cfg(cfg),
            sample_period: cfg.sample_period,
            policy,
            status: SessionStatus::Idle,
            initial_equity: None,
            current_equity: Decimal::ZERO,
            started_at: None,
            summary: Summary::default(),
        }
    }

    fn roi(&self) -> Option<f64> {
        let initial = self.initial_equity?;
        if initial <= Decimal::ZERO {
            return None;
        }
        ((self.current_equity - initial) / initial).to_f64()
    }

    async fn finalize(&mut self, cause: TerminalCause, roi: f64) {
        self.status = SessionStatus::Terminated(cause);
        metrics::counter!("session_terminations_total", "cause" => cause.to_string())
            .increment(1);

        info!(
            "Session terminated ({}): ROI {:+.1}%, equity {} -> {}, {} decisions observed ({} funded, capital {})",
            cause,
            roi * 100.0,
            self.initial_equity.unwrap_or(Decimal::ZERO),
            self.current_equity,
            self.summary.total_analyzed,
            self.summary.funded_trades,
            self.summary.capital_deployed,
        );

        if let Err(e) = self.bus.session_status.publish(self.status).await {
            error!("SessionActor: failed to publish terminal status: {:?}", e);
        }
    }
}

#[async_trait::async_trait]
impl Actor for SessionActor {
    async fn run(mut self) -> Result<()> {
        info!("SessionActor started");

        let mut tick = tokio::time::interval(self.sample_period);
        let mut balance_rx = self.bus.balance.subscribe();
        let mut decisions_rx = self.bus.decisions.subscribe();

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("SessionActor: shutdown requested");
                    break;
                }

                res = balance_rx.recv() => {
                    match res {
                        Ok(update) => {
                            self.current_equity = update.equity;
                            if self.initial_equity.is_none() {
                                self.initial_equity = Some(update.equity);
                                self.started_at = Some(tokio::time::Instant::now());
                                self.status = SessionStatus::Running;
                                info!("SessionActor: baseline equity {}", update.equity);
                                if let Err(e) = self.bus.session_status.publish(self.status).await {
                                    error!("SessionActor: failed to publish status: {:?}", e);
                                }
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            warn!("SessionActor lagged by {n} balance updates");
                            continue;
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                            error!("SessionActor balance channel closed");
                            break;
                        }
                    }
                }

                res = decisions_rx.recv() => {
                    match res {
                        Ok(decision) => {
                            self.summary.record((*decision).clone(), &self.policy);
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            warn!("SessionActor lagged by {n} decisions");
                            continue;
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                            error!("SessionActor decision channel closed");
                            break;
                        }
                    }
                }

                _ = tick.tick() => {
                    if self.status != SessionStatus::Running {
                        continue;
                    }
                    let (Some(roi), Some(started_at)) = (self.roi(), self.started_at) else {
                        continue;
                    };
                    metrics::gauge!("session_roi").set(roi);

                    if let Some(cause) = evaluate(roi, started_at.elapsed(), &self.limits) {
                        self.finalize(cause, roi).await;
                        // Terminal: stop the sampler with the loop.
                        break;
                    }
                }
            }
        }

        info!("SessionActor stopped cleanly");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::BalanceUpdate;
    use crate::strategy::sizing::StakeSizer;
    use std::sync::Arc;

    fn limits(target_roi: f64, loss_floor: f64, secs: u64) -> SessionLimits {
        SessionLimits {
            target_roi,
            loss_floor,
            duration: Duration::from_secs(secs),
        }
    }

    #[test]
    fn test_evaluate_none_while_in_bounds() {
        let l = limits(1.0, -0.8, 3600);
        assert_eq!(evaluate(0.2, Duration::from_secs(60), &l), None);
        assert_eq!(evaluate(-0.5, Duration::from_secs(60), &l), None);
    }

    #[test]
    fn test_evaluate_each_cause() {
        let l = limits(1.0, -0.8, 3600);
        assert_eq!(
            evaluate(1.0, Duration::from_secs(60), &l),
            Some(TerminalCause::Success)
        );
        assert_eq!(
            evaluate(-0.8, Duration::from_secs(60), &l),
            Some(TerminalCause::CatastrophicLoss)
        );
        assert_eq!(
            evaluate(0.1, Duration::from_secs(3600), &l),
            Some(TerminalCause::Timeout)
        );
    }

    #[test]
    fn test_success_outranks_catastrophic_loss() {
        // Both conditions cannot hold with sane limits; force them to
        // overlap to pin the priority ordering.
        let l = limits(1.0, 1.1, 3600);
        assert_eq!(
            evaluate(1.05, Duration::from_secs(60), &l),
            Some(TerminalCause::Success)
        );
    }

    #[test]
    fn test_catastrophic_loss_outranks_timeout() {
        let l = limits(1.0, -0.8, 60);
        assert_eq!(
            evaluate(-0.9, Duration::from_secs(120), &l),
            Some(TerminalCause::CatastrophicLoss)
        );
    }

    fn actor_cfg(duration_secs: u64) -> SessionCfg {
        SessionCfg {
            duration: Duration::from_secs(duration_secs),
            sample_period: Duration::from_secs(1),
            target_roi: 1.0,
            loss_floor: -0.8,
            dry_run: false,
            dry_run_limit: 20,
        }
    }

    fn policy() -> FundingPolicy {
        FundingPolicy {
            bankroll: Decimal::from(1000),
            max_trades: 10,
            sizer: StakeSizer::default(),
        }
    }

    async fn wait_terminal(
        rx: &mut tokio::sync::broadcast::Receiver<Arc<SessionStatus>>,
    ) -> SessionStatus {
        loop {
            let status = *rx.recv().await.unwrap();
            if matches!(status, SessionStatus::Terminated(_)) {
                return status;
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_after_duration_elapses() {
        let bus = Bus::new();
        let shutdown = CancellationToken::new();
        let actor = SessionActor::new(bus.clone(), shutdown.clone(), &actor_cfg(5), policy());
        let mut status_rx = bus.session_status.subscribe();

        let handle = tokio::spawn(actor.run());
        // Let the actor subscribe before publishing
        tokio::time::sleep(Duration::from_millis(10)).await;

        bus.balance
            .publish(BalanceUpdate {
                equity: Decimal::from(1000),
                ts_ms: 0,
            })
            .await
            .unwrap();
        assert_eq!(*status_rx.recv().await.unwrap(), SessionStatus::Running);

        let status = wait_terminal(&mut status_rx).await;
        assert_eq!(status, SessionStatus::Terminated(TerminalCause::Timeout));
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_target_roi_terminates_with_success() {
        let bus = Bus::new();
        let shutdown = CancellationToken::new();
        let actor = SessionActor::new(bus.clone(), shutdown.clone(), &actor_cfg(3600), policy());
        let mut status_rx = bus.session_status.subscribe();

        let handle = tokio::spawn(actor.run());
        // Let the actor subscribe before publishing
        tokio::time::sleep(Duration::from_millis(10)).await;

        bus.balance
            .publish(BalanceUpdate {
                equity: Decimal::from(1000),
                ts_ms: 0,
            })
            .await
            .unwrap();
        assert_eq!(*status_rx.recv().await.unwrap(), SessionStatus::Running);

        // +110% ROI beats the 100% target
        bus.balance
            .publish(BalanceUpdate {
                equity: Decimal::from(2100),
                ts_ms: 1,
            })
            .await
            .unwrap();

        let status = wait_terminal(&mut status_rx).await;
        assert_eq!(status, SessionStatus::Terminated(TerminalCause::Success));
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_loss_floor_terminates_catastrophically() {
        let bus = Bus::new();
        let shutdown = CancellationToken::new();
        let actor = SessionActor::new(bus.clone(), shutdown.clone(), &actor_cfg(3600), policy());
        let mut status_rx = bus.session_status.subscribe();

        let handle = tokio::spawn(actor.run());
        // Let the actor subscribe before publishing
        tokio::time::sleep(Duration::from_millis(10)).await;

        bus.balance
            .publish(BalanceUpdate {
                equity: Decimal::from(1000),
                ts_ms: 0,
            })
            .await
            .unwrap();
        assert_eq!(*status_rx.recv().await.unwrap(), SessionStatus::Running);

        // -85% ROI breaches the -80% floor
        bus.balance
            .publish(BalanceUpdate {
                equity: Decimal::from(150),
                ts_ms: 1,
            })
            .await
            .unwrap();

        let status = wait_terminal(&mut status_rx).await;
        assert_eq!(
            status,
            SessionStatus::Terminated(TerminalCause::CatastrophicLoss)
        );
        handle.await.unwrap().unwrap();
    }
}
