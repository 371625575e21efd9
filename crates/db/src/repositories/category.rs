use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::Row;

use shopfront_core::domain::category::{Category, CategoryId};

use super::{CategoryRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCategoryRepository {
    pool: DbPool,
}

impl SqlCategoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_category(row: &sqlx::sqlite::SqliteRow) -> Result<Category, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let description: Option<String> =
        row.try_get("description").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let parent_id: Option<String> =
        row.try_get("parent_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Category {
        id: CategoryId(id),
        name,
        description,
        parent: parent_id.map(CategoryId),
        created_at: parse_timestamp("created_at", &created_at)?,
        updated_at: parse_timestamp("updated_at", &updated_at)?,
    })
}

fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("{field}: {error}")))
}

#[async_trait::async_trait]
impl CategoryRepository for SqlCategoryRepository {
    async fn find_by_id(&self, id: &CategoryId) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, description, parent_id, created_at, updated_at
             FROM category WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref row) => Ok(Some(row_to_category(row)?)),
            None => Ok(None),
        }
    }

    async fn list_all(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, description, parent_id, created_at, updated_at
             FROM category ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_category).collect()
    }

    async fn save(&self, category: Category) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO category (id, name, description, parent_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 description = excluded.description,
                 parent_id = excluded.parent_id,
                 updated_at = excluded.updated_at",
        )
        .bind(&category.id.0)
        .bind(&category.name)
        .bind(category.description.as_deref())
        .bind(category.parent.as_ref().map(|p| p.0.as_str()))
        .bind(category.created_at.to_rfc3339())
        .bind(category.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_by_id(&self, id: &CategoryId) -> Result<Option<Category>, RepositoryError> {
        // No cascade: products and child categories keep their references,
        // which read-side resolution treats as not-found.
        let existing = self.find_by_id(id).await?;
        if existing.is_some() {
            sqlx::query("DELETE FROM category WHERE id = ?")
                .bind(&id.0)
                .execute(&self.pool)
                .await?;
        }
        Ok(existing)
    }

    async fn existing(
        &self,
        ids: &[CategoryId],
    ) -> Result<HashSet<CategoryId>, RepositoryError> {
        let mut found = HashSet::new();
        for id in ids {
            let row = sqlx::query("SELECT 1 AS hit FROM category WHERE id = ?")
                .bind(&id.0)
                .fetch_optional(&self.pool)
                .await?;
            if row.is_some() {
                found.insert(id.clone());
            }
        }
        Ok(found)
    }

    async fn name_taken(
        &self,
        name: &str,
        exclude: Option<&CategoryId>,
    ) -> Result<bool, RepositoryError> {
        let row = match exclude {
            Some(id) => {
                sqlx::query("SELECT 1 AS hit FROM category WHERE name = ? AND id != ?")
                    .bind(name)
                    .bind(&id.0)
                    .fetch_optional(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("SELECT 1 AS hit FROM category WHERE name = ?")
                    .bind(name)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };
        Ok(row.is_some())
    }

    async fn ancestors(&self, id: &CategoryId) -> Result<Vec<CategoryId>, RepositoryError> {
        let mut chain = Vec::new();
        let mut cursor = self.find_by_id(id).await?.and_then(|category| category.parent);
        while let Some(parent_id) = cursor {
            // A dangling or already-seen parent ends the chain; the walk
            // must terminate even on malformed data.
            if chain.contains(&parent_id) {
                break;
            }
            let parent = self.find_by_id(&parent_id).await?;
            chain.push(parent_id);
            cursor = parent.and_then(|category| category.parent);
        }
        Ok(chain)
    }
}
