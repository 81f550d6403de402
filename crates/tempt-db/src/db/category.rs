use sqlx::{PgPool, Postgres};
use tempt_core::{
    models::{Category, CreateCategoryRequest},
    AppError,
};
use uuid::Uuid;

use super::transaction::conflict_on_unique;

/// Repository for gallery categories
#[derive(Clone)]
pub struct CategoryRepository {
    pool: PgPool,
}

impl CategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "categories", db.operation = "select"))]
    pub async fn list(&self) -> Result<Vec<Category>, AppError> {
        let categories = sqlx::query_as::<Postgres, Category>(
            "SELECT * FROM categories ORDER BY sort_order ASC, name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    #[tracing::instrument(skip(self), fields(db.table = "categories", db.operation = "select"))]
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>, AppError> {
        let category =
            sqlx::query_as::<Postgres, Category>("SELECT * FROM categories WHERE slug = $1")
                .bind(slug)
                .fetch_optional(&self.pool)
                .await?;

        Ok(category)
    }

    #[tracing::instrument(skip(self), fields(db.table = "categories", db.operation = "select", db.record_id = %id))]
    pub async fn exists(&self, id: Uuid) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<Postgres, bool>(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    #[tracing::instrument(skip(self, req), fields(db.table = "categories", db.operation = "insert", slug = %req.slug))]
    pub async fn create(&self, req: &CreateCategoryRequest) -> Result<Category, AppError> {
        sqlx::query_as::<Postgres, Category>(
            r#"
            INSERT INTO categories (slug, name, description, sort_order)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&req.slug)
        .bind(&req.name)
        .bind(&req.description)
        .bind(req.sort_order)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "A category with this slug already exists"))
    }
}
