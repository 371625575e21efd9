use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use shopfront_core::domain::category::{Category, CategoryId};
use shopfront_core::domain::product::{Product, ProductId};
use shopfront_core::errors::{CatalogError, ErrorBody};
use shopfront_core::pagination::{PageRequest, Pagination};
use shopfront_core::query::{compile, SearchParams, SearchQuery, SortOrder};
use shopfront_core::validation::{
    validate_category, validate_product, AttributesDraft, CategoryContext, CategoryDraft,
    DiscountDraft, ProductDraft, ValidationContext, VariantDraft,
};
use shopfront_db::repositories::{CategoryRepository, ProductRepository, RepositoryError};

use crate::view::{BulkCreateReport, BulkFailure, ProductPage, ProductView};

/// Variants stocked below this count appear in the low-stock report when the
/// caller does not supply a threshold.
pub const DEFAULT_LOW_STOCK_THRESHOLD: u32 = 10;

/// Orchestrates the engines with the storage collaborators. Stateless
/// between calls: every operation is a function of its inputs and the
/// store's state at call time.
pub struct CatalogService {
    products: Arc<dyn ProductRepository>,
    categories: Arc<dyn CategoryRepository>,
}

fn storage_error(error: RepositoryError) -> CatalogError {
    match error {
        RepositoryError::DuplicateSku { sku } => CatalogError::DuplicateSku { sku },
        other => CatalogError::Dependency(other.to_string()),
    }
}

fn mint_id() -> String {
    Uuid::new_v4().to_string()
}

impl CatalogService {
    pub fn new(
        products: Arc<dyn ProductRepository>,
        categories: Arc<dyn CategoryRepository>,
    ) -> Self {
        Self { products, categories }
    }

    // ---- products ----

    pub async fn create_product(&self, draft: &ProductDraft) -> Result<ProductView, CatalogError> {
        let context = self.product_context(draft, None).await?;
        let accepted = validate_product(draft, &context)?;

        let now = Utc::now();
        let product = Product {
            id: ProductId(mint_id()),
            name: accepted.name,
            description: accepted.description,
            categories: accepted.categories,
            price: accepted.price,
            variants: accepted.variants,
            discount: accepted.discount,
            created_at: now,
            updated_at: now,
        };

        if let Err(error) = self.products.create(product.clone()).await {
            if let RepositoryError::DuplicateSku { ref sku } = error {
                // Pre-check raced a concurrent writer; the unique index is
                // the authority.
                warn!(sku = %sku, "sku conflict surfaced at write time");
            }
            return Err(storage_error(error));
        }

        info!(product_id = %product.id.0, name = %product.name, "product created");
        self.assemble_view(product).await
    }

    pub async fn get_product(&self, id: &ProductId) -> Result<ProductView, CatalogError> {
        let product = self
            .products
            .find_by_id(id)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| CatalogError::not_found("product", id.0.clone()))?;
        self.assemble_view(product).await
    }

    pub async fn list_products(&self, page: PageRequest) -> Result<ProductPage, CatalogError> {
        let query = SearchQuery {
            filter: Default::default(),
            sort: SortOrder::NewestFirst,
        };
        self.fetch_page(&query, page).await
    }

    pub async fn search_products(
        &self,
        params: &SearchParams,
        page: PageRequest,
    ) -> Result<ProductPage, CatalogError> {
        // Contradictory bounds fail here; the storage collaborator is never
        // consulted for an invalid range.
        let query = compile(params)?;
        self.fetch_page(&query, page).await
    }

    pub async fn update_product(
        &self,
        id: &ProductId,
        patch: &ProductDraft,
    ) -> Result<ProductView, CatalogError> {
        let existing = self
            .products
            .find_by_id(id)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| CatalogError::not_found("product", id.0.clone()))?;

        // Partial payloads merge over stored state; the merged whole is
        // re-validated so an update can never leave an invalid document.
        let merged = merged_draft(&existing, patch);
        let context = self.product_context(&merged, Some(id)).await?;
        let accepted = validate_product(&merged, &context)?;

        let product = Product {
            id: existing.id.clone(),
            name: accepted.name,
            description: accepted.description,
            categories: accepted.categories,
            price: accepted.price,
            variants: accepted.variants,
            discount: accepted.discount,
            created_at: existing.created_at,
            updated_at: Utc::now(),
        };

        let stored = self
            .products
            .update_by_id(product)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| CatalogError::not_found("product", id.0.clone()))?;

        info!(product_id = %stored.id.0, "product updated");
        self.assemble_view(stored).await
    }

    pub async fn delete_product(&self, id: &ProductId) -> Result<(), CatalogError> {
        let removed = self.products.delete_by_id(id).await.map_err(storage_error)?;
        match removed {
            Some(product) => {
                info!(product_id = %product.id.0, "product deleted");
                Ok(())
            }
            None => Err(CatalogError::not_found("product", id.0.clone())),
        }
    }

    /// Validates and creates each element independently: a failure at index
    /// `i` never blocks a valid sibling, and SKUs created earlier in the
    /// batch count as taken for later elements.
    pub async fn bulk_create(&self, drafts: &[ProductDraft]) -> BulkCreateReport {
        let mut created = Vec::new();
        let mut failures = Vec::new();
        for (index, draft) in drafts.iter().enumerate() {
            match self.create_product(draft).await {
                Ok(view) => created.push(view),
                Err(error) => {
                    failures.push(BulkFailure { index, error: ErrorBody::from(&error) })
                }
            }
        }
        BulkCreateReport { created, failures }
    }

    // ---- categories ----

    pub async fn create_category(&self, draft: &CategoryDraft) -> Result<Category, CatalogError> {
        let context = self.category_context(draft, None).await?;
        let accepted = validate_category(draft, &context)?;

        let now = Utc::now();
        let category = Category {
            id: CategoryId(mint_id()),
            name: accepted.name,
            description: accepted.description,
            parent: accepted.parent,
            created_at: now,
            updated_at: now,
        };
        self.categories.save(category.clone()).await.map_err(storage_error)?;
        info!(category_id = %category.id.0, name = %category.name, "category created");
        Ok(category)
    }

    pub async fn get_category(&self, id: &CategoryId) -> Result<Category, CatalogError> {
        self.categories
            .find_by_id(id)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| CatalogError::not_found("category", id.0.clone()))
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        self.categories.list_all().await.map_err(storage_error)
    }

    pub async fn update_category(
        &self,
        id: &CategoryId,
        patch: &CategoryDraft,
    ) -> Result<Category, CatalogError> {
        let existing = self.get_category(id).await?;

        let merged = CategoryDraft {
            name: patch.name.clone().or_else(|| Some(existing.name.clone())),
            description: patch.description.clone().or_else(|| existing.description.clone()),
            parent: patch.parent.clone().or_else(|| existing.parent.as_ref().map(|p| p.0.clone())),
        };
        let context = self.category_context(&merged, Some(id)).await?;
        let accepted = validate_category(&merged, &context)?;

        let category = Category {
            id: existing.id.clone(),
            name: accepted.name,
            description: accepted.description,
            parent: accepted.parent,
            created_at: existing.created_at,
            updated_at: Utc::now(),
        };
        self.categories.save(category.clone()).await.map_err(storage_error)?;
        info!(category_id = %category.id.0, "category updated");
        Ok(category)
    }

    /// Deleting a category never cascades to products; their references go
    /// dangling and read-side resolution drops them.
    pub async fn delete_category(&self, id: &CategoryId) -> Result<(), CatalogError> {
        let removed = self.categories.delete_by_id(id).await.map_err(storage_error)?;
        match removed {
            Some(category) => {
                info!(category_id = %category.id.0, "category deleted");
                Ok(())
            }
            None => Err(CatalogError::not_found("category", id.0.clone())),
        }
    }

    /// Derived view: products referencing the category, newest first. Not a
    /// live back-reference.
    pub async fn find_products_by_category(
        &self,
        id: &CategoryId,
    ) -> Result<Vec<ProductView>, CatalogError> {
        self.get_category(id).await?;
        let products =
            self.products.find_by_category(id).await.map_err(storage_error)?;
        let mut views = Vec::with_capacity(products.len());
        for product in products {
            views.push(self.assemble_view(product).await?);
        }
        Ok(views)
    }

    /// Inventory report: products with at least one variant stocked below
    /// the threshold, newest first.
    pub async fn find_low_stock(
        &self,
        threshold: Option<u32>,
    ) -> Result<Vec<ProductView>, CatalogError> {
        let threshold = threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
        let products =
            self.products.find_low_stock(threshold).await.map_err(storage_error)?;
        let mut views = Vec::with_capacity(products.len());
        for product in products {
            views.push(self.assemble_view(product).await?);
        }
        Ok(views)
    }

    // ---- internals ----

    async fn fetch_page(
        &self,
        query: &SearchQuery,
        page: PageRequest,
    ) -> Result<ProductPage, CatalogError> {
        let (items, total) = self
            .products
            .find_many(query, page.offset(), page.limit)
            .await
            .map_err(storage_error)?;

        let mut data = Vec::with_capacity(items.len());
        for product in items {
            data.push(self.assemble_view(product).await?);
        }
        Ok(ProductPage { data, pagination: Pagination::for_total(page, total) })
    }

    /// Builds the existence snapshot the validation engine consumes:
    /// which referenced categories resolve, and which submitted SKUs are
    /// already taken (excluding the document under update).
    async fn product_context(
        &self,
        draft: &ProductDraft,
        exclude: Option<&ProductId>,
    ) -> Result<ValidationContext, CatalogError> {
        let referenced: Vec<CategoryId> = draft
            .categories
            .iter()
            .flatten()
            .map(|raw| raw.trim())
            .filter(|raw| !raw.is_empty())
            .map(|raw| CategoryId(raw.to_owned()))
            .collect();
        let known_categories =
            self.categories.existing(&referenced).await.map_err(storage_error)?;

        let mut taken_skus = HashSet::new();
        for sku in draft
            .variants
            .iter()
            .flatten()
            .filter_map(|variant| variant.sku.as_deref())
            .map(str::trim)
            .filter(|sku| !sku.is_empty())
        {
            if self.products.exists_by_sku(sku, exclude).await.map_err(storage_error)? {
                taken_skus.insert(sku.to_owned());
            }
        }

        Ok(ValidationContext { known_categories, taken_skus })
    }

    async fn category_context(
        &self,
        draft: &CategoryDraft,
        self_id: Option<&CategoryId>,
    ) -> Result<CategoryContext, CatalogError> {
        let mut context = CategoryContext {
            self_id: self_id.cloned(),
            ..CategoryContext::default()
        };

        if let Some(name) = draft.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            if self.categories.name_taken(name, self_id).await.map_err(storage_error)? {
                context.taken_names.insert(name.to_owned());
            }
        }

        if let Some(parent) = draft.parent.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            let parent_id = CategoryId(parent.to_owned());
            context.known_ids = self
                .categories
                .existing(std::slice::from_ref(&parent_id))
                .await
                .map_err(storage_error)?;
            context.parent_ancestors =
                self.categories.ancestors(&parent_id).await.map_err(storage_error)?;
        }

        Ok(context)
    }

    /// Resolves category references for presentation. Dangling references
    /// (category deleted after the product was written) are dropped, per
    /// the orphaning policy.
    async fn assemble_view(&self, product: Product) -> Result<ProductView, CatalogError> {
        let mut resolved = Vec::with_capacity(product.categories.len());
        for id in &product.categories {
            if let Some(category) =
                self.categories.find_by_id(id).await.map_err(storage_error)?
            {
                resolved.push(category);
            }
        }
        Ok(ProductView::assemble(product, resolved))
    }
}

/// Field-wise merge of a partial update over stored state. Present fields
/// replace wholesale (arrays included); absent fields keep the stored value.
/// An explicitly empty discount object clears the discount.
fn merged_draft(existing: &Product, patch: &ProductDraft) -> ProductDraft {
    ProductDraft {
        name: patch.name.clone().or_else(|| Some(existing.name.clone())),
        description: patch.description.clone().or_else(|| existing.description.clone()),
        categories: patch
            .categories
            .clone()
            .or_else(|| Some(existing.categories.iter().map(|c| c.0.clone()).collect())),
        price: patch.price.or(Some(existing.price)),
        variants: patch.variants.clone().or_else(|| {
            Some(
                existing
                    .variants
                    .iter()
                    .map(|variant| VariantDraft {
                        name: Some(variant.name.clone()),
                        sku: Some(variant.sku.0.clone()),
                        price: Some(variant.price),
                        inventory: Some(i64::from(variant.inventory)),
                        attributes: Some(AttributesDraft {
                            color: Some(variant.attributes.color.clone()),
                            size: variant.attributes.size.clone(),
                        }),
                    })
                    .collect(),
            )
        }),
        discount: patch.discount.clone().or_else(|| {
            existing.discount.as_ref().map(|discount| DiscountDraft {
                kind: Some(discount.kind),
                value: Some(discount.value),
            })
        }),
    }
}
