use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{GenerateRequest, GenerateResponse, VisualizationDetails, VisualizationList};
use super::repo_types::NewVisualization;
use crate::{
    ai::ProviderKind,
    auth::extractors::AuthUser,
    error::{AppError, AppResult},
    extract::{required, JsonBody},
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/api/visualizations", get(list_visualizations))
        .route("/api/visualizations/:id", get(get_visualization))
}

pub fn write_routes() -> Router<AppState> {
    Router::new().route("/api/generate", post(generate))
}

#[instrument(skip(state, auth), fields(user_id = %auth.id()))]
pub async fn list_visualizations(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<VisualizationList>> {
    let visualizations = state.visualizations.list_by_user(auth.id()).await?;
    Ok(Json(VisualizationList { visualizations }))
}

/// Unknown ids, malformed ids and other users' records all look the same: 404.
#[instrument(skip(state, auth), fields(user_id = %auth.id()))]
pub async fn get_visualization(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<VisualizationDetails>> {
    let not_found = || AppError::NotFound("visualization not found".into());

    let id = Uuid::parse_str(id.trim()).map_err(|_| not_found())?;
    let visualization = state
        .visualizations
        .get_by_id(id)
        .await?
        .filter(|v| v.user_id == auth.id())
        .ok_or_else(not_found)?;

    Ok(Json(VisualizationDetails { visualization }))
}

#[instrument(skip(state, auth, payload), fields(user_id = %auth.id()))]
pub async fn generate(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(payload): JsonBody<GenerateRequest>,
) -> AppResult<Json<GenerateResponse>> {
    let prompt = required(payload.prompt, "prompt")?;
    let style_guidance = payload.style_guidance.unwrap_or_default();
    let provider = match payload.provider.as_deref().map(str::trim) {
        None | Some("") => ProviderKind::default(),
        Some(name) => name.parse::<ProviderKind>()?,
    };
    // fail fast, before spawning anything
    state.ai.select(provider)?;

    let user_id = auth.id();
    let ai = state.ai.clone();
    let store = state.visualizations.clone();

    // Detached from the request future: a client hanging up does not cancel
    // the provider call or the write.
    let task = tokio::spawn(async move {
        let generated = ai.generate(provider, &prompt, &style_guidance).await?;
        let saved = store
            .save(NewVisualization {
                user_id,
                prompt,
                result: generated.clone(),
                provider,
            })
            .await?;
        Ok::<_, AppError>((generated, saved.id))
    });

    let (generated, saved_id) = task
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("generation task failed: {e}")))??;

    info!(%saved_id, %provider, "visualization saved");
    Ok(Json(GenerateResponse {
        generated,
        saved_id,
        provider,
    }))
}
