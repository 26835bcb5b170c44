use crate::config::config::OracleCfg;
use crate::core::error::PipelineError;
use crate::core::types::{Condition, Forecast, Market};
use crate::oracle::parse::{RawEstimate, parse_estimate};
use crate::oracle::prompt::build_prompt;
use crate::strategy::recommend::{Thresholds, recommend};
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde_json::json;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::info;

/// Anything that can turn a subject into a forecast. The production
/// implementation calls the external oracle; tests substitute stubs.
#[async_trait]
pub trait Forecaster: Send + Sync {
    async fn forecast(
        &self,
        market: &Market,
        condition: Option<&Condition>,
    ) -> Result<Forecast, PipelineError>;
}

/// Client for the external forecast oracle (any OpenAI-compatible chat
/// completions endpoint). Exactly one outbound call per subject, spaced by
/// a shared rate limiter; no automatic retries -- a transient failure
/// surfaces as that subject's error.
#[derive(Clone)]
pub struct OracleClient {
    client: Client,
    cfg: OracleCfg,
    thresholds: Thresholds,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl OracleClient {
    pub fn new(cfg: OracleCfg, client: Client, thresholds: Thresholds) -> Self {
        let rpm = NonZeroU32::new(cfg.rate_limit_rpm).unwrap_or(NonZeroU32::new(1).unwrap());
        let quota = Quota::per_minute(rpm);
        let limiter = Arc::new(RateLimiter::direct(quota));

        Self {
            client,
            cfg,
            thresholds,
            limiter,
        }
    }

    pub fn model(&self) -> &str {
        &self.cfg.model
    }

    /// Converts the oracle's 0-100 estimate to the internal 0-1 scale.
    /// Edge, expected value, and the recommendation are derived locally
    /// from the fair value and the current quote.
    fn to_forecast(&self, market: &Market, estimate: RawEstimate) -> Forecast {
        let fair_value = estimate.fair_value / 100.0;
        let confidence = estimate.confidence / 100.0;
        let edge = fair_value - market.yes_price;
        let expected_value = if market.yes_price == 0.0 {
            None
        } else {
            Some(fair_value / market.yes_price)
        };

        Forecast {
            subject_id: market.id.clone(),
            probability: estimate.probability / 100.0,
            confidence,
            reasoning: estimate.reasoning,
            fair_value,
            edge,
            expected_value,
            recommendation: recommend(edge, confidence, &self.thresholds),
        }
    }
}

#[async_trait]
impl Forecaster for OracleClient {
    async fn forecast(
        &self,
        market: &Market,
        condition: Option<&Condition>,
    ) -> Result<Forecast, PipelineError> {
        // Enforce inter-call spacing
        self.limiter.until_ready().await;

        let request_err = |reason: String| PipelineError::OracleRequest {
            subject_id: market.id.clone(),
            reason,
        };

        let prompt = build_prompt(market, condition);
        let req_body = json!({
            "model": self.cfg.model,
            "messages": [
                {"role": "system", "content": "You are a helpful assistant that outputs JSON."},
                {"role": "user", "content": prompt}
            ],
            "temperature": 0.0
        });

        let url = format!("{}/chat/completions", self.cfg.base_url);
        info!("Calling oracle at {} with model {}", url, self.cfg.model);

        let res = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.cfg.api_key))
            .json(&req_body)
            .send()
            .await
            .map_err(|e| {
                metrics::counter!("oracle_calls_total", "status" => "request_error").increment(1);
                request_err(e.to_string())
            })?;

        if !res.status().is_success() {
            metrics::counter!("oracle_calls_total", "status" => "request_error").increment(1);
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(request_err(format!("oracle API error {status}: {body}")));
        }

        let resp_json: serde_json::Value = res
            .json()
            .await
            .map_err(|e| request_err(format!("reading oracle response: {e}")))?;

        let content = resp_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| PipelineError::OracleParse {
                subject_id: market.id.clone(),
                reason: "no content in oracle response".to_string(),
            })?;

        let estimate = parse_estimate(&market.id, content).inspect_err(|_| {
            metrics::counter!("oracle_calls_total", "status" => "parse_error").increment(1);
        })?;

        metrics::counter!("oracle_calls_total", "status" => "ok").increment(1);
        Ok(self.to_forecast(market, estimate))
    }
}
