use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::ai::{ProviderKind, VisualizationResult};

/// Stored generation result. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Visualization {
    pub id: Uuid,
    pub user_id: Uuid,
    pub prompt: String,
    pub component_code: String,
    pub html_snippet: String,
    pub explanation: String,
    pub provider: String, // "openai" | "google"
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Everything `save` needs; id and timestamp come from the store.
#[derive(Debug, Clone)]
pub struct NewVisualization {
    pub user_id: Uuid,
    pub prompt: String,
    pub result: VisualizationResult,
    pub provider: ProviderKind,
}
