use crate::config::config::ConditionsCfg;
use crate::core::types::Condition;
use anyhow::{Context, Result};
use reqwest::Client;

/// Client for the internal conditions catalog. The endpoint is ours, so the
/// records deserialize straight into the canonical shape.
pub struct ConditionsClient {
    client: Client,
    cfg: ConditionsCfg,
}

impl ConditionsClient {
    pub fn new(cfg: ConditionsCfg, client: Client) -> Self {
        Self { client, cfg }
    }

    pub async fn fetch_conditions(&self) -> Result<Vec<Condition>> {
        let res = self
            .client
            .get(&self.cfg.base_url)
            .send()
            .await
            .context("requesting conditions catalog")?;

        if !res.status().is_success() {
            anyhow::bail!("Conditions API error: {}", res.status());
        }

        res.json::<Vec<Condition>>()
            .await
            .context("parsing conditions response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_wire_format() {
        let body = r#"[{
            "id": "cond-1",
            "question": "Will the Fed cut rates in March 2026?",
            "shortName": "fed-march-cut",
            "endTime": "2026-03-31T18:00:00Z"
        }]"#;
        let conditions: Vec<Condition> = serde_json::from_str(body).unwrap();
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].short_name.as_deref(), Some("fed-march-cut"));
    }

    #[test]
    fn test_condition_short_name_optional() {
        let body = r#"[{"id": "c", "question": "q", "endTime": "2026-01-01T00:00:00Z"}]"#;
        let conditions: Vec<Condition> = serde_json::from_str(body).unwrap();
        assert!(conditions[0].short_name.is_none());
    }
}
