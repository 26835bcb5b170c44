use crate::config::config::KalshiCfg;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::error;

#[derive(Debug, Deserialize)]
struct MarketsPage {
    #[serde(default)]
    markets: Vec<Value>,
    #[serde(default)]
    cursor: Option<String>,
}

pub struct KalshiClient {
    client: Client,
    cfg: KalshiCfg,
}

impl KalshiClient {
    pub fn new(cfg: KalshiCfg, client: Client) -> Self {
        Self { client, cfg }
    }

    async fn fetch_page(&self, cursor: Option<&str>) -> Result<MarketsPage> {
        let url = format!("{}/markets", self.cfg.base_url);
        let mut query = vec![
            ("limit", self.cfg.page_limit.to_string()),
            ("status", "open".to_string()),
        ];
        if let Some(c) = cursor {
            query.push(("cursor", c.to_string()));
        }

        let res = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .context("requesting kalshi markets")?;

        if !res.status().is_success() {
            anyhow::bail!("Kalshi API error: {}", res.status());
        }

        res.json::<MarketsPage>()
            .await
            .context("parsing kalshi markets response")
    }

    /// Fetches all open markets as raw records, following cursor pagination.
    /// Stops early with partial results after repeated consecutive failures.
    pub async fn fetch_raw_markets(&self) -> Result<Vec<Value>> {
        let mut rows = Vec::new();
        let mut cursor: Option<String> = None;
        let mut consecutive_errors = 0;

        loop {
            // Be polite to the API
            if !rows.is_empty() {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }

            match self.fetch_page(cursor.as_deref()).await {
                Ok(page) => {
                    consecutive_errors = 0;
                    if page.markets.is_empty() {
                        break;
                    }
                    rows.extend(page.markets);
                    match page.cursor {
                        Some(c) if !c.is_empty() => cursor = Some(c),
                        _ => break,
                    }
                }
                Err(e) => {
                    error!(
                        "KalshiClient: failed to fetch markets page: {:#}. Retrying...",
                        e
                    );
                    consecutive_errors += 1;
                    if consecutive_errors >= 3 {
                        error!("KalshiClient: too many consecutive errors, returning partial results.");
                        break;
                    }
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
        Ok(rows)
    }
}
