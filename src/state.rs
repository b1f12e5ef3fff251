use std::sync::Arc;

use anyhow::Context;
use axum::extract::FromRef;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::ai::AiProviders;
use crate::auth::{
    credentials::CredentialStore,
    jwt::JwtKeys,
    repo::{PgRevocationRepository, PgUserRepository, RevocationRepositoryPtr, UserRepositoryPtr},
    tokens::TokenService,
};
use crate::config::{AppConfig, JwtConfig};
use crate::visualizations::repo::{PgVisualizationRepository, VisualizationRepositoryPtr};

#[derive(Clone)]
pub struct AppState {
    pub credentials: CredentialStore,
    pub tokens: TokenService,
    pub ai: Arc<AiProviders>,
    pub visualizations: VisualizationRepositoryPtr,
}

impl FromRef<AppState> for TokenService {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}

impl AppState {
    /// Connect to Postgres, apply migrations and wire the stores.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .connect(&config.database.url)
            .await
            .context("connecting to database")?;

        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .context("running migrations")?;
        info!("database ready");

        let users: UserRepositoryPtr = Arc::new(PgUserRepository::new(db.clone()));
        let revocations: RevocationRepositoryPtr = Arc::new(PgRevocationRepository::new(db.clone()));
        let visualizations: VisualizationRepositoryPtr =
            Arc::new(PgVisualizationRepository::new(db));
        let ai = AiProviders::from_config(&config.ai).context("building AI providers")?;

        Ok(Self::from_parts(
            &config.jwt,
            users,
            revocations,
            visualizations,
            ai,
        ))
    }

    pub fn from_parts(
        jwt: &JwtConfig,
        users: UserRepositoryPtr,
        revocations: RevocationRepositoryPtr,
        visualizations: VisualizationRepositoryPtr,
        ai: AiProviders,
    ) -> Self {
        let keys = JwtKeys::from(jwt);
        Self {
            credentials: CredentialStore::new(users),
            tokens: TokenService::new(keys, revocations),
            ai: Arc::new(ai),
            visualizations,
        }
    }
}
