use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;

use shopfront_core::domain::category::{Category, CategoryId};
use shopfront_core::domain::product::{Product, ProductId};
use shopfront_core::query::SearchQuery;

pub mod category;
pub mod memory;
pub mod product;

pub use category::SqlCategoryRepository;
pub use memory::{InMemoryCategoryRepository, InMemoryProductRepository};
pub use product::SqlProductRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    /// The unique index on `variant.sku` rejected a write. Validation
    /// pre-checks reduce how often this fires under concurrency but the
    /// index is the authority.
    #[error("sku `{sku}` is already in use")]
    DuplicateSku { sku: String },
}

/// Storage collaborator for products. `find_many` applies the compiled
/// query's predicate and ordering, returning one window plus the total match
/// count. Read-your-writes consistency is expected for a single caller.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError>;

    async fn find_many(
        &self,
        query: &SearchQuery,
        skip: u64,
        limit: u64,
    ) -> Result<(Vec<Product>, u64), RepositoryError>;

    async fn create(&self, product: Product) -> Result<(), RepositoryError>;

    /// Full-document replacement; `None` when the product vanished between
    /// the caller's pre-check and this write.
    async fn update_by_id(&self, product: Product) -> Result<Option<Product>, RepositoryError>;

    async fn delete_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError>;

    async fn exists_by_sku(
        &self,
        sku: &str,
        exclude: Option<&ProductId>,
    ) -> Result<bool, RepositoryError>;

    /// Derived view of products referencing a category; there is no live
    /// back-reference from categories to products.
    async fn find_by_category(
        &self,
        category_id: &CategoryId,
    ) -> Result<Vec<Product>, RepositoryError>;

    /// Inventory report: products with at least one variant stocked below
    /// the threshold, newest first.
    async fn find_low_stock(&self, threshold: u32) -> Result<Vec<Product>, RepositoryError>;
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn find_by_id(&self, id: &CategoryId) -> Result<Option<Category>, RepositoryError>;

    async fn list_all(&self) -> Result<Vec<Category>, RepositoryError>;

    async fn save(&self, category: Category) -> Result<(), RepositoryError>;

    async fn delete_by_id(&self, id: &CategoryId) -> Result<Option<Category>, RepositoryError>;

    /// Which of the given ids exist. Callers diff against their input to
    /// produce per-element errors.
    async fn existing(
        &self,
        ids: &[CategoryId],
    ) -> Result<HashSet<CategoryId>, RepositoryError>;

    async fn name_taken(
        &self,
        name: &str,
        exclude: Option<&CategoryId>,
    ) -> Result<bool, RepositoryError>;

    /// Parent chain of a category, nearest first. Used for cycle checks when
    /// re-parenting.
    async fn ancestors(&self, id: &CategoryId) -> Result<Vec<CategoryId>, RepositoryError>;
}
