use crate::config::config::PolyCfg;
use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::error;

pub struct GammaClient {
    client: Client,
    cfg: PolyCfg,
}

impl GammaClient {
    pub fn new(cfg: PolyCfg, client: Client) -> Self {
        Self { client, cfg }
    }

    async fn fetch_page(&self, offset: u32) -> Result<Vec<Value>> {
        let res = self
            .client
            .get(&self.cfg.gamma_markets_url)
            .query(&[
                ("order", "volumeNum"),
                ("ascending", "false"),
                ("active", "true"),
                ("closed", "false"),
                ("limit", &self.cfg.page_limit.to_string()),
                ("offset", &offset.to_string()),
            ])
            .send()
            .await
            .context("requesting polymarket markets")?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            anyhow::bail!(
                "Gamma API error: status={}, offset={}, body={}",
                status,
                offset,
                body
            );
        }

        res.json::<Vec<Value>>()
            .await
            .context("parsing polymarket markets response")
    }

    /// Fetches all active markets as raw records via offset pagination.
    /// Stops early with partial results after repeated consecutive failures.
    pub async fn fetch_raw_markets(&self) -> Result<Vec<Value>> {
        let mut rows = Vec::new();
        let mut offset = 0;
        let mut consecutive_errors = 0;

        loop {
            // Be polite to the API
            if offset > 0 {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }

            match self.fetch_page(offset).await {
                Ok(page) => {
                    consecutive_errors = 0;
                    if page.is_empty() {
                        break;
                    }
                    let len = page.len();
                    rows.extend(page);

                    if len < self.cfg.page_limit as usize {
                        break;
                    }
                    offset += self.cfg.page_limit;
                }
                Err(e) => {
                    error!(
                        "GammaClient: failed to fetch markets page at offset {}: {:#}. Retrying...",
                        offset, e
                    );
                    consecutive_errors += 1;
                    if consecutive_errors >= 3 {
                        error!("GammaClient: too many consecutive errors, returning partial results.");
                        break;
                    }
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
        Ok(rows)
    }
}
