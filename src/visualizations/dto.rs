use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo_types::Visualization;
use crate::ai::{ProviderKind, VisualizationResult};

#[derive(Debug, Default, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub style_guidance: Option<String>,
    /// "openai" (default) or "google".
    #[serde(default)]
    pub provider: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub generated: VisualizationResult,
    pub saved_id: Uuid,
    pub provider: ProviderKind,
}

#[derive(Debug, Serialize)]
pub struct VisualizationList {
    pub visualizations: Vec<Visualization>,
}

#[derive(Debug, Serialize)]
pub struct VisualizationDetails {
    pub visualization: Visualization,
}
