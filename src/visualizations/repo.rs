use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::visualizations::repo_types::{NewVisualization, Visualization};

#[async_trait]
pub trait VisualizationRepository: Send + Sync {
    async fn save(&self, new: NewVisualization) -> anyhow::Result<Visualization>;

    /// All of `user_id`'s visualizations, newest first.
    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Visualization>>;

    /// Lookup by id alone. Callers check ownership.
    async fn get_by_id(&self, id: Uuid) -> anyhow::Result<Option<Visualization>>;
}

pub type VisualizationRepositoryPtr = Arc<dyn VisualizationRepository>;

#[derive(Clone)]
pub struct PgVisualizationRepository {
    db: PgPool,
}

impl PgVisualizationRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl VisualizationRepository for PgVisualizationRepository {
    async fn save(&self, new: NewVisualization) -> anyhow::Result<Visualization> {
        let row = sqlx::query_as::<_, Visualization>(
            r#"
            INSERT INTO visualizations
                (user_id, prompt, component_code, html_snippet, explanation, provider)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, prompt, component_code, html_snippet, explanation,
                      provider, created_at
            "#,
        )
        .bind(new.user_id)
        .bind(&new.prompt)
        .bind(&new.result.component_code)
        .bind(&new.result.html_snippet)
        .bind(&new.result.explanation)
        .bind(new.provider.as_str())
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Visualization>> {
        let rows = sqlx::query_as::<_, Visualization>(
            r#"
            SELECT id, user_id, prompt, component_code, html_snippet, explanation,
                   provider, created_at
            FROM visualizations
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn get_by_id(&self, id: Uuid) -> anyhow::Result<Option<Visualization>> {
        let row = sqlx::query_as::<_, Visualization>(
            r#"
            SELECT id, user_id, prompt, component_code, html_snippet, explanation,
                   provider, created_at
            FROM visualizations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use time::OffsetDateTime;

    use super::*;
    use crate::ai::{ProviderKind, VisualizationResult};
    use crate::auth::repo::{PgUserRepository, UserRepository};
    use crate::testing::{test_pool, unique_email};

    async fn new_user(db: &PgPool) -> Uuid {
        PgUserRepository::new(db.clone())
            .create("viz-owner", &unique_email(), "$argon2id$fake")
            .await
            .unwrap()
            .unwrap()
            .id
    }

    fn new_viz(user_id: Uuid, prompt: &str, provider: ProviderKind) -> NewVisualization {
        NewVisualization {
            user_id,
            prompt: prompt.into(),
            result: VisualizationResult {
                component_code: format!("export default () => <p>{prompt}</p>"),
                html_snippet: format!("<p>{prompt}</p>"),
                explanation: format!("about {prompt}"),
            },
            provider,
        }
    }

    #[tokio::test]
    async fn save_then_get_returns_input_plus_id_and_timestamp() {
        let Some(db) = test_pool().await else { return };
        let owner = new_user(&db).await;
        let repo = PgVisualizationRepository::new(db);
        let input = new_viz(owner, "binary search", ProviderKind::Google);
        let before = OffsetDateTime::now_utc() - time::Duration::seconds(5);

        let saved = repo.save(input.clone()).await.unwrap();
        let got = repo.get_by_id(saved.id).await.unwrap().unwrap();

        assert_eq!(got.id, saved.id);
        assert_eq!(got.user_id, input.user_id);
        assert_eq!(got.prompt, input.prompt);
        assert_eq!(got.component_code, input.result.component_code);
        assert_eq!(got.html_snippet, input.result.html_snippet);
        assert_eq!(got.explanation, input.result.explanation);
        assert_eq!(got.provider, "google");
        assert_eq!(got.created_at, saved.created_at);
        assert!(got.created_at > before);

        assert!(repo.get_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_is_owner_only_and_newest_first() {
        let Some(db) = test_pool().await else { return };
        let alice = new_user(&db).await;
        let bob = new_user(&db).await;
        let repo = PgVisualizationRepository::new(db);

        let mut ids = Vec::new();
        for prompt in ["stacks", "queues", "heaps"] {
            ids.push(repo.save(new_viz(alice, prompt, ProviderKind::OpenAi)).await.unwrap().id);
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let bobs = repo.save(new_viz(bob, "tries", ProviderKind::OpenAi)).await.unwrap();

        let listed: Vec<Uuid> = repo
            .list_by_user(alice)
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.id)
            .collect();
        ids.reverse();
        assert_eq!(listed, ids);

        let for_bob = repo.list_by_user(bob).await.unwrap();
        assert_eq!(for_bob.len(), 1);
        assert_eq!(for_bob[0].id, bobs.id);
        assert!(repo.list_by_user(Uuid::new_v4()).await.unwrap().is_empty());
    }
}
