mod bus;
mod catalog;
mod config;
mod core;
mod oracle;
mod session;
mod strategy;

use crate::core::types::Actor;
use anyhow::Result;
use bus::types::Bus;
use catalog::actor::CatalogActor;
use catalog::conditions::ConditionsClient;
use catalog::kalshi::KalshiClient;
use catalog::polymarket::GammaClient;
use config::config::AppCfg;
use oracle::OracleClient;
use reqwest::Client;
use session::aggregator::FundingPolicy;
use session::monitor::SessionActor;
use std::sync::Arc;
use strategy::actor::StrategyActor;
use strategy::recommend::Thresholds;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    dotenv::dotenv().ok();

    let cfg = AppCfg::load("config.yml")?;

    // Root span for the supervisor/main thread
    let span = info_span!(
        "Supervisor",
        pid = %std::process::id(),
        version = env!("CARGO_PKG_VERSION"),
    );

    // logs below are inside "Supervisor"
    let _enter = span.enter();

    info!("Starting up");

    info!("Initializing shared pub/sub Bus");
    let bus = Bus::new();
    let shutdown = CancellationToken::new();

    info!("Initializing Client");
    let client = Client::builder()
        .user_agent(cfg.http.user_agent.clone())
        .pool_idle_timeout(cfg.http.pool_idle_timeout)
        .pool_max_idle_per_host(cfg.http.pool_max_idle_per_host)
        .tcp_keepalive(cfg.http.tcp_keep_alive)
        .timeout(cfg.http.timeout)
        .build()
        .expect("client");

    info!("Building actors");
    let catalog = CatalogActor::new(
        bus.clone(),
        KalshiClient::new(cfg.kalshi.clone(), client.clone()),
        GammaClient::new(cfg.polymarket.clone(), client.clone()),
        ConditionsClient::new(cfg.conditions.clone(), client.clone()),
        cfg.catalog.clone(),
        shutdown.clone(),
    );
    let oracle = OracleClient::new(
        cfg.oracle.clone(),
        client.clone(),
        Thresholds::from_cfg(&cfg.trading),
    );
    let strat = StrategyActor::new(bus.clone(), shutdown.clone(), &cfg, Arc::new(oracle));
    let session = SessionActor::new(
        bus.clone(),
        shutdown.clone(),
        &cfg.session,
        FundingPolicy::from_cfg(&cfg.trading),
    );

    info!("Spawning actors");
    let mut actors = tokio::task::JoinSet::new();

    actors.spawn(catalog.run().instrument(info_span!("Catalog")));
    actors.spawn(strat.run().instrument(info_span!("Strat")));
    actors.spawn(session.run().instrument(info_span!("Session")));

    info!("Waiting for actors");

    tokio::select! {
        _ = async {
             while let Some(res) = actors.join_next().await {
                 match res {
                    Ok(Ok(()))  => info!("Actor exited cleanly"),
                    Ok(Err(e))  => error!(?e, "Actor returned error"),
                    Err(panic)  => error!(?panic, "Actor panicked/cancelled"),
                }
            }
        } => {  }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down supervisor loop");
            shutdown.cancel();
        }
    }

    info!("Waiting for graceful shutdown of actors");
    while let Some(res) = actors.join_next().await {
        match res {
            Ok(Ok(())) => info!("Actor exited cleanly"),
            Ok(Err(e)) => error!(?e, "Actor returned error"),
            Err(panic) => error!(?panic, "Actor panicked/cancelled"),
        }
    }

    info!("Supervisor exit");
    Ok(())
}
