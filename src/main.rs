use std::time::Duration;

use tracing::{info, warn};

mod ai;
mod app;
mod auth;
mod config;
mod error;
mod extract;
mod state;
mod visualizations;

#[cfg(test)]
mod testing;

use crate::auth::tokens::TokenService;
use crate::config::AppConfig;
use crate::state::AppState;

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "vlearn=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

/// Periodically drop blacklist rows for tokens that have expired anyway.
fn spawn_revocation_pruner(tokens: TokenService, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match tokens.prune_expired().await {
                Ok(0) => {}
                Ok(n) => info!(pruned = n, "pruned expired revocations"),
                Err(e) => warn!(error = %e, "revocation pruning failed"),
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let prune_every = Duration::from_secs(config.revocation_prune_interval_secs.max(1));
    let app_state = AppState::init(config).await?;

    spawn_revocation_pruner(app_state.tokens.clone(), prune_every);

    app::serve(app::build_app(app_state)).await
}
