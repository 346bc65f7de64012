use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{Space, SpaceType, SpaceWrite};

const SPACE_COLUMNS: &str = "id, name, capacity, space_type, image_key, created_at";

impl Space {
    pub async fn list(db: &PgPool, space_type: Option<SpaceType>) -> anyhow::Result<Vec<Space>> {
        let rows = sqlx::query_as::<_, Space>(&format!(
            r#"
            SELECT {SPACE_COLUMNS}
              FROM spaces
             WHERE $1::space_type IS NULL OR space_type = $1
             ORDER BY name ASC
            "#
        ))
        .bind(space_type)
        .fetch_all(db)
        .await
        .context("list spaces")?;
        Ok(rows)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Space>> {
        let row = sqlx::query_as::<_, Space>(&format!(
            "SELECT {SPACE_COLUMNS} FROM spaces WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find space")?;
        Ok(row)
    }

    /// The id is chosen by the caller so the image can be stored under it first.
    pub async fn create(
        db: &PgPool,
        id: Uuid,
        data: &SpaceWrite,
        image_key: Option<&str>,
    ) -> anyhow::Result<Space> {
        let row = sqlx::query_as::<_, Space>(&format!(
            r#"
            INSERT INTO spaces (id, name, capacity, space_type, image_key)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {SPACE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&data.name)
        .bind(data.capacity)
        .bind(data.space_type)
        .bind(image_key)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    pub async fn update(
        db: &PgPool,
        id: Uuid,
        data: &SpaceWrite,
        image_key: Option<&str>,
    ) -> anyhow::Result<Option<Space>> {
        let row = sqlx::query_as::<_, Space>(&format!(
            r#"
            UPDATE spaces
               SET name = $2, capacity = $3, space_type = $4, image_key = $5
             WHERE id = $1
            RETURNING {SPACE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&data.name)
        .bind(data.capacity)
        .bind(data.space_type)
        .bind(image_key)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    /// Returns the deleted row so its image can be cleaned up.
    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Space>> {
        let row = sqlx::query_as::<_, Space>(&format!(
            "DELETE FROM spaces WHERE id = $1 RETURNING {SPACE_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("delete space")?;
        Ok(row)
    }
}
