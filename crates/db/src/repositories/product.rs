use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;

use shopfront_core::domain::category::CategoryId;
use shopfront_core::domain::product::{
    Discount, DiscountKind, Product, ProductId, Sku, Variant, VariantAttributes,
};
use shopfront_core::query::SearchQuery;

use super::{ProductRepository, RepositoryError};
use crate::DbPool;

pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_decimal(field: &str, value: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(value)
        .map_err(|error| RepositoryError::Decode(format!("{field}: {error}")))
}

fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("{field}: {error}")))
}

fn discount_kind_as_str(kind: DiscountKind) -> &'static str {
    match kind {
        DiscountKind::Percentage => "percentage",
        DiscountKind::Fixed => "fixed",
    }
}

fn parse_discount(
    kind: Option<String>,
    value: Option<String>,
) -> Result<Option<Discount>, RepositoryError> {
    match (kind, value) {
        (Some(kind), Some(value)) => {
            let kind = match kind.as_str() {
                "percentage" => DiscountKind::Percentage,
                "fixed" => DiscountKind::Fixed,
                other => {
                    return Err(RepositoryError::Decode(format!(
                        "discount_kind: unknown kind `{other}`"
                    )))
                }
            };
            Ok(Some(Discount { kind, value: parse_decimal("discount_value", &value)? }))
        }
        (None, None) => Ok(None),
        _ => Err(RepositoryError::Decode(
            "discount columns are half-populated".to_string(),
        )),
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}

impl SqlProductRepository {
    /// Hydrates full products for the given product rows by pulling their
    /// variant and category-link rows in bulk.
    async fn hydrate(
        &self,
        rows: Vec<sqlx::sqlite::SqliteRow>,
    ) -> Result<Vec<Product>, RepositoryError> {
        let mut products = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let name: String =
                row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let description: Option<String> =
                row.try_get("description").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let price: String =
                row.try_get("price").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let discount_kind: Option<String> =
                row.try_get("discount_kind").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let discount_value: Option<String> = row
                .try_get("discount_value")
                .map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let created_at: String =
                row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let updated_at: String =
                row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

            let variants = self.variants_of(&id).await?;
            let categories = self.categories_of(&id).await?;

            products.push(Product {
                id: ProductId(id),
                name,
                description,
                categories,
                price: parse_decimal("price", &price)?,
                variants,
                discount: parse_discount(discount_kind, discount_value)?,
                created_at: parse_timestamp("created_at", &created_at)?,
                updated_at: parse_timestamp("updated_at", &updated_at)?,
            });
        }
        Ok(products)
    }

    async fn variants_of(&self, product_id: &str) -> Result<Vec<Variant>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT sku, name, price, inventory, color, size
             FROM variant WHERE product_id = ? ORDER BY position",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        let mut variants = Vec::with_capacity(rows.len());
        for row in rows {
            let sku: String =
                row.try_get("sku").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let name: String =
                row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let price: String =
                row.try_get("price").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let inventory: i64 =
                row.try_get("inventory").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let color: String =
                row.try_get("color").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let size: Option<String> =
                row.try_get("size").map_err(|e| RepositoryError::Decode(e.to_string()))?;

            variants.push(Variant {
                name,
                sku: Sku(sku),
                price: parse_decimal("variant.price", &price)?,
                inventory: u32::try_from(inventory)
                    .map_err(|_| RepositoryError::Decode("variant.inventory is negative".into()))?,
                attributes: VariantAttributes { color, size },
            });
        }
        Ok(variants)
    }

    async fn categories_of(&self, product_id: &str) -> Result<Vec<CategoryId>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT category_id FROM product_category WHERE product_id = ? ORDER BY position",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("category_id")
                    .map(CategoryId)
                    .map_err(|e| RepositoryError::Decode(e.to_string()))
            })
            .collect()
    }

    async fn load_all(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, description, price, discount_kind, discount_value,
                    created_at, updated_at
             FROM product",
        )
        .fetch_all(&self.pool)
        .await?;
        self.hydrate(rows).await
    }

    async fn insert_children(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        product: &Product,
    ) -> Result<(), RepositoryError> {
        for (position, variant) in product.variants.iter().enumerate() {
            let result = sqlx::query(
                "INSERT INTO variant (sku, product_id, position, name, price, inventory, color, size)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&variant.sku.0)
            .bind(&product.id.0)
            .bind(position as i64)
            .bind(&variant.name)
            .bind(variant.price.to_string())
            .bind(i64::from(variant.inventory))
            .bind(&variant.attributes.color)
            .bind(variant.attributes.size.as_deref())
            .execute(&mut **tx)
            .await;

            if let Err(error) = result {
                if is_unique_violation(&error) {
                    return Err(RepositoryError::DuplicateSku { sku: variant.sku.0.clone() });
                }
                return Err(error.into());
            }
        }

        for (position, category_id) in product.categories.iter().enumerate() {
            sqlx::query(
                "INSERT INTO product_category (product_id, category_id, position) VALUES (?, ?, ?)",
            )
            .bind(&product.id.0)
            .bind(&category_id.0)
            .bind(position as i64)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl ProductRepository for SqlProductRepository {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, description, price, discount_kind, discount_value,
                    created_at, updated_at
             FROM product WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_many(
        &self,
        query: &SearchQuery,
        skip: u64,
        limit: u64,
    ) -> Result<(Vec<Product>, u64), RepositoryError> {
        // Money lives in lossless decimal-text columns, so predicate
        // evaluation and ranking go through the shared core filter instead
        // of SQL comparisons. Keeps SQL and in-memory results identical.
        let matched: Vec<Product> = self
            .load_all()
            .await?
            .into_iter()
            .filter(|product| query.filter.matches(product))
            .collect();
        let total = matched.len() as u64;
        let ranked = query.rank(matched);
        let window =
            ranked.into_iter().skip(skip as usize).take(limit as usize).collect();
        Ok((window, total))
    }

    async fn create(&self, product: Product) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO product (id, name, description, price, discount_kind, discount_value,
                                  created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&product.id.0)
        .bind(&product.name)
        .bind(product.description.as_deref())
        .bind(product.price.to_string())
        .bind(product.discount.as_ref().map(|d| discount_kind_as_str(d.kind)))
        .bind(product.discount.as_ref().map(|d| d.value.to_string()))
        .bind(product.created_at.to_rfc3339())
        .bind(product.updated_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        Self::insert_children(&mut tx, &product).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update_by_id(&self, product: Product) -> Result<Option<Product>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE product SET name = ?, description = ?, price = ?, discount_kind = ?,
                                discount_value = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&product.name)
        .bind(product.description.as_deref())
        .bind(product.price.to_string())
        .bind(product.discount.as_ref().map(|d| discount_kind_as_str(d.kind)))
        .bind(product.discount.as_ref().map(|d| d.value.to_string()))
        .bind(product.updated_at.to_rfc3339())
        .bind(&product.id.0)
        .execute(&mut *tx)
        .await?;

        // The document may have been deleted since the caller's pre-check;
        // that is a clean not-found, not an error.
        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        sqlx::query("DELETE FROM variant WHERE product_id = ?")
            .bind(&product.id.0)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM product_category WHERE product_id = ?")
            .bind(&product.id.0)
            .execute(&mut *tx)
            .await?;
        Self::insert_children(&mut tx, &product).await?;

        tx.commit().await?;
        Ok(Some(product))
    }

    async fn delete_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let existing = self.find_by_id(id).await?;
        if existing.is_some() {
            sqlx::query("DELETE FROM product WHERE id = ?")
                .bind(&id.0)
                .execute(&self.pool)
                .await?;
        }
        Ok(existing)
    }

    async fn exists_by_sku(
        &self,
        sku: &str,
        exclude: Option<&ProductId>,
    ) -> Result<bool, RepositoryError> {
        let row = match exclude {
            Some(product_id) => {
                sqlx::query("SELECT 1 AS hit FROM variant WHERE sku = ? AND product_id != ?")
                    .bind(sku)
                    .bind(&product_id.0)
                    .fetch_optional(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("SELECT 1 AS hit FROM variant WHERE sku = ?")
                    .bind(sku)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };
        Ok(row.is_some())
    }

    async fn find_by_category(
        &self,
        category_id: &CategoryId,
    ) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT p.id, p.name, p.description, p.price, p.discount_kind, p.discount_value,
                    p.created_at, p.updated_at
             FROM product p
             JOIN product_category pc ON pc.product_id = p.id
             WHERE pc.category_id = ?
             ORDER BY p.created_at DESC, p.id",
        )
        .bind(&category_id.0)
        .fetch_all(&self.pool)
        .await?;
        self.hydrate(rows).await
    }

    async fn find_low_stock(&self, threshold: u32) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT DISTINCT p.id, p.name, p.description, p.price, p.discount_kind,
                    p.discount_value, p.created_at, p.updated_at
             FROM product p
             JOIN variant v ON v.product_id = p.id
             WHERE v.inventory < ?
             ORDER BY p.created_at DESC, p.id",
        )
        .bind(i64::from(threshold))
        .fetch_all(&self.pool)
        .await?;
        self.hydrate(rows).await
    }
}
