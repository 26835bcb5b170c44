use crate::core::types::{
    BalanceUpdate, ConditionSnapshot, Decision, MarketSnapshot, SessionStatus,
};
use anyhow::Result;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::broadcast;

// ---------- Topic trait (broadcast semantics) ----------
#[async_trait::async_trait]
pub trait Topic<T>: Sync + Send + 'static {
    /// Publish a message to all subscribers.
    async fn publish(&self, msg: T) -> Result<()>;

    /// Subscribe to the stream (each subscriber has an independent cursor).
    fn subscribe(&self) -> broadcast::Receiver<Arc<T>>;
}

// ---------- Concrete broadcast topic ----------
// --- Broadcast topic: 1->N fanout (lossy under lag). Wrap payloads in Arc<T> to avoid Clone on T.
pub struct BroadcastTopic<T: Clone + Send + Sync + 'static> {
    tx: broadcast::Sender<Arc<T>>,
}

impl<T: Clone + Send + Sync + 'static> BroadcastTopic<T> {
    pub fn with_capacity(cap: usize) -> Self {
        let (tx, _rx) = broadcast::channel(cap);
        Self { tx }
    }
}

#[async_trait]
impl<T: Debug + Clone + Send + Sync + 'static> Topic<T> for BroadcastTopic<T> {
    async fn publish(&self, msg: T) -> Result<()> {
        // Non-blocking; errors only when no receivers (we can ignore or log)
        let _ = self.tx.send(Arc::new(msg));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<Arc<T>> {
        self.tx.subscribe()
    }
}

#[derive(Clone)]
pub struct Bus {
    pub markets: Arc<dyn Topic<MarketSnapshot>>,
    pub conditions: Arc<dyn Topic<ConditionSnapshot>>,
    pub decisions: Arc<dyn Topic<Decision>>,
    pub balance: Arc<dyn Topic<BalanceUpdate>>,
    pub session_status: Arc<dyn Topic<SessionStatus>>,
}

impl Bus {
    pub fn new() -> Self {
        let cap = 1024;

        Self {
            markets: Arc::new(BroadcastTopic::<MarketSnapshot>::with_capacity(cap)),
            conditions: Arc::new(BroadcastTopic::<ConditionSnapshot>::with_capacity(cap)),
            decisions: Arc::new(BroadcastTopic::<Decision>::with_capacity(cap)),
            balance: Arc::new(BroadcastTopic::<BalanceUpdate>::with_capacity(cap)),
            session_status: Arc::new(BroadcastTopic::<SessionStatus>::with_capacity(cap)),
        }
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Recommendation, SessionStatus};
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber() {
        let bus = Bus::new();
        let mut rx_a = bus.decisions.subscribe();
        let mut rx_b = bus.decisions.subscribe();

        let d = crate::core::types::Decision {
            subject_id: "mkt-1".to_string(),
            recommendation: Recommendation::Skip,
            yes_price: 0.5,
            fair_value: 0.5,
            edge: 0.0,
            confidence: 0.4,
            stake: Decimal::ZERO,
        };
        bus.decisions.publish(d).await.unwrap();

        assert_eq!(rx_a.recv().await.unwrap().subject_id, "mkt-1");
        assert_eq!(rx_b.recv().await.unwrap().subject_id, "mkt-1");
    }

    #[tokio::test]
    async fn test_session_status_roundtrip() {
        let bus = Bus::new();
        let mut rx = bus.session_status.subscribe();
        bus.session_status
            .publish(SessionStatus::Running)
            .await
            .unwrap();
        assert_eq!(*rx.recv().await.unwrap(), SessionStatus::Running);
    }
}
