use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppCfg {
    pub http: HttpCfg,
    pub kalshi: KalshiCfg,
    pub polymarket: PolyCfg,
    pub conditions: ConditionsCfg,
    pub oracle: OracleCfg,
    #[serde(default)]
    pub catalog: CatalogCfg,
    #[serde(default)]
    pub matching: MatchingCfg,
    #[serde(default)]
    pub trading: TradingCfg,
    #[serde(default)]
    pub session: SessionCfg,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpCfg {
    #[serde(rename = "userAgent", default = "default_ua")]
    pub user_agent: String,
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,
    #[serde(rename = "poolIdleTimeout", with = "humantime_serde")]
    pub pool_idle_timeout: Duration,
    #[serde(rename = "tcpKeepAlive", with = "humantime_serde")]
    pub tcp_keep_alive: Duration,
    #[serde(rename = "poolMaxIdlePerHost", default = "default_pool")]
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpCfg {
    fn default() -> Self {
        Self {
            user_agent: default_ua(),
            timeout: default_timeout(),
            pool_idle_timeout: Duration::from_secs(90),
            tcp_keep_alive: Duration::from_secs(60),
            pool_max_idle_per_host: default_pool(),
        }
    }
}
fn default_ua() -> String {
    "edgescout/0.1".into()
}
fn default_timeout() -> Duration {
    Duration::from_secs(10)
}
fn default_pool() -> usize {
    16
}

#[derive(Debug, Deserialize, Clone)]
pub struct KalshiCfg {
    #[serde(rename = "baseUrl")]
    pub base_url: String,
    #[serde(rename = "pageLimit", default = "default_page_limit")]
    pub page_limit: u32,
}

impl Default for KalshiCfg {
    fn default() -> Self {
        Self {
            base_url: "https://api.elections.kalshi.com/trade-api/v2".to_string(),
            page_limit: default_page_limit(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PolyCfg {
    #[serde(rename = "gammaMarketsUrl")]
    pub gamma_markets_url: String,
    #[serde(rename = "pageLimit", default = "default_page_limit")]
    pub page_limit: u32,
}

impl Default for PolyCfg {
    fn default() -> Self {
        Self {
            gamma_markets_url: "https://gamma-api.polymarket.com/markets".to_string(),
            page_limit: default_page_limit(),
        }
    }
}
fn default_page_limit() -> u32 {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConditionsCfg {
    #[serde(rename = "baseUrl")]
    pub base_url: String,
}

impl Default for ConditionsCfg {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/conditions".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OracleCfg {
    #[serde(rename = "baseUrl")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(rename = "rateLimitRpm", default = "default_rpm")]
    pub rate_limit_rpm: u32,
}

impl Default for OracleCfg {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: "".to_string(),
            model: default_model(),
            rate_limit_rpm: default_rpm(),
        }
    }
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_rpm() -> u32 {
    20
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogCfg {
    #[serde(with = "humantime_serde")]
    pub refresh: Duration,
}

impl Default for CatalogCfg {
    fn default() -> Self {
        Self {
            refresh: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MatchingCfg {
    #[serde(rename = "similarityThreshold", default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    #[serde(rename = "minTokenLen", default = "default_min_token_len")]
    pub min_token_len: usize,
}

impl Default for MatchingCfg {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            min_token_len: default_min_token_len(),
        }
    }
}
fn default_similarity_threshold() -> f64 {
    0.3
}
fn default_min_token_len() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct TradingCfg {
    /// Edge threshold in percentage points (oracle-facing scale).
    #[serde(rename = "edgeThreshold", default = "default_edge_threshold")]
    pub edge_threshold: f64,
    /// Confidence threshold in points (oracle-facing scale).
    #[serde(rename = "confidenceThreshold", default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    #[serde(default = "default_bankroll")]
    pub bankroll: f64,
    #[serde(rename = "maxTrades", default = "default_max_trades")]
    pub max_trades: usize,
    #[serde(rename = "kellyMultiplier", default = "default_kelly_multiplier")]
    pub kelly_multiplier: f64,
    #[serde(rename = "maxStakeFraction", default = "default_max_stake_fraction")]
    pub max_stake_fraction: f64,
}

impl Default for TradingCfg {
    fn default() -> Self {
        Self {
            edge_threshold: default_edge_threshold(),
            confidence_threshold: default_confidence_threshold(),
            bankroll: default_bankroll(),
            max_trades: default_max_trades(),
            kelly_multiplier: default_kelly_multiplier(),
            max_stake_fraction: default_max_stake_fraction(),
        }
    }
}
fn default_edge_threshold() -> f64 {
    5.0
}
fn default_confidence_threshold() -> f64 {
    65.0
}
fn default_bankroll() -> f64 {
    1000.0
}
fn default_max_trades() -> usize {
    10
}
fn default_kelly_multiplier() -> f64 {
    0.5
}
fn default_max_stake_fraction() -> f64 {
    0.05
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionCfg {
    #[serde(with = "humantime_serde", default = "default_session_duration")]
    pub duration: Duration,
    #[serde(rename = "samplePeriod", with = "humantime_serde", default = "default_sample_period")]
    pub sample_period: Duration,
    /// Cumulative ROI at or above which the session terminates successfully
    /// (1.0 = +100%).
    #[serde(rename = "targetRoi", default = "default_target_roi")]
    pub target_roi: f64,
    /// Cumulative ROI at or below which the session aborts (-0.8 = -80%).
    #[serde(rename = "lossFloor", default = "default_loss_floor")]
    pub loss_floor: f64,
    #[serde(rename = "dryRun", default = "default_dry_run")]
    pub dry_run: bool,
    /// Upper bound on markets scored in one dry-run pass.
    #[serde(rename = "dryRunLimit", default = "default_dry_run_limit")]
    pub dry_run_limit: usize,
}

impl Default for SessionCfg {
    fn default() -> Self {
        Self {
            duration: default_session_duration(),
            sample_period: default_sample_period(),
            target_roi: default_target_roi(),
            loss_floor: default_loss_floor(),
            dry_run: default_dry_run(),
            dry_run_limit: default_dry_run_limit(),
        }
    }
}
fn default_session_duration() -> Duration {
    Duration::from_secs(3600)
}
fn default_sample_period() -> Duration {
    Duration::from_secs(10)
}
fn default_target_roi() -> f64 {
    1.0
}
fn default_loss_floor() -> f64 {
    -0.8
}
fn default_dry_run() -> bool {
    true
}
fn default_dry_run_limit() -> usize {
    20
}

impl AppCfg {
    pub fn load(path: &str) -> Result<Self> {
        let cfg = Config::builder()
            .add_source(File::with_name(path))
            .add_source(config::Environment::default().separator("__"))
            .build()
            .context("building config")?;

        let app: AppCfg = cfg.try_deserialize().context("deserializing config")?;
        app.validate()?;
        Ok(app)
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.kalshi.base_url.is_empty(), "kalshi.baseUrl missing");
        anyhow::ensure!(
            !self.polymarket.gamma_markets_url.is_empty(),
            "polymarket.gammaMarketsUrl missing"
        );
        anyhow::ensure!(
            !self.conditions.base_url.is_empty(),
            "conditions.baseUrl missing"
        );
        anyhow::ensure!(!self.oracle.base_url.is_empty(), "oracle.baseUrl missing");
        anyhow::ensure!(
            !self.oracle.api_key.is_empty(),
            "oracle.api_key missing (set ORACLE__API_KEY)"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.matching.similarity_threshold),
            "matching.similarityThreshold must be within [0, 1]"
        );
        anyhow::ensure!(
            self.matching.min_token_len >= 1,
            "matching.minTokenLen must be >= 1"
        );
        anyhow::ensure!(self.trading.max_trades > 0, "trading.maxTrades must be > 0");
        anyhow::ensure!(self.trading.bankroll > 0.0, "trading.bankroll must be > 0");
        anyhow::ensure!(
            self.session.loss_floor < 0.0,
            "session.lossFloor must be negative"
        );
        anyhow::ensure!(
            self.session.target_roi > 0.0,
            "session.targetRoi must be > 0"
        );
        anyhow::ensure!(
            !self.session.sample_period.is_zero(),
            "session.samplePeriod must be > 0"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_defaults_are_valid_except_api_key() {
        let mut cfg = AppCfg::default();
        assert!(cfg.validate().is_err()); // api_key missing is fatal
        cfg.oracle.api_key = "sk-test".to_string();
        cfg.validate().unwrap();
        assert!((cfg.matching.similarity_threshold - 0.3).abs() < 1e-12);
        assert_eq!(cfg.matching.min_token_len, 3);
        assert!((cfg.trading.edge_threshold - 5.0).abs() < 1e-12);
        assert!((cfg.trading.confidence_threshold - 65.0).abs() < 1e-12);
        assert!((cfg.session.loss_floor + 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let mut cfg = AppCfg::default();
        cfg.oracle.api_key = "sk-test".to_string();
        cfg.matching.similarity_threshold = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_env_var_override() {
        // Set environment variable
        unsafe {
            env::set_var("ORACLE__API_KEY", "env-key-123");
        }

        // Test that config::Environment picks it up
        let cfg = Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .build()
            .unwrap();

        let val = cfg.get_string("oracle.api_key").unwrap();
        assert_eq!(val, "env-key-123");

        unsafe {
            env::remove_var("ORACLE__API_KEY");
        }
    }
}
