use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;

use shopfront_core::domain::category::{Category, CategoryId};
use shopfront_core::domain::product::{Product, ProductId};
use shopfront_core::query::SearchQuery;

use super::{CategoryRepository, ProductRepository, RepositoryError};

/// In-memory twin of the SQL product store. Enforces the same SKU
/// uniqueness the `variant.sku` index does, so tests exercise the
/// write-time conflict path too.
#[derive(Default)]
pub struct InMemoryProductRepository {
    products: RwLock<HashMap<String, Product>>,
}

impl InMemoryProductRepository {
    fn sku_conflict(
        products: &HashMap<String, Product>,
        candidate: &Product,
    ) -> Option<String> {
        for product in products.values() {
            if product.id == candidate.id {
                continue;
            }
            for sku in product.skus() {
                if candidate.skus().any(|s| s == sku) {
                    return Some(sku.0.clone());
                }
            }
        }
        None
    }
}

#[async_trait::async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.get(&id.0).cloned())
    }

    async fn find_many(
        &self,
        query: &SearchQuery,
        skip: u64,
        limit: u64,
    ) -> Result<(Vec<Product>, u64), RepositoryError> {
        let products = self.products.read().await;
        let matched: Vec<Product> =
            products.values().filter(|p| query.filter.matches(p)).cloned().collect();
        let total = matched.len() as u64;
        let ranked = query.rank(matched);
        let window = ranked.into_iter().skip(skip as usize).take(limit as usize).collect();
        Ok((window, total))
    }

    async fn create(&self, product: Product) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        if let Some(sku) = Self::sku_conflict(&products, &product) {
            return Err(RepositoryError::DuplicateSku { sku });
        }
        products.insert(product.id.0.clone(), product);
        Ok(())
    }

    async fn update_by_id(&self, product: Product) -> Result<Option<Product>, RepositoryError> {
        let mut products = self.products.write().await;
        if !products.contains_key(&product.id.0) {
            return Ok(None);
        }
        if let Some(sku) = Self::sku_conflict(&products, &product) {
            return Err(RepositoryError::DuplicateSku { sku });
        }
        products.insert(product.id.0.clone(), product.clone());
        Ok(Some(product))
    }

    async fn delete_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let mut products = self.products.write().await;
        Ok(products.remove(&id.0))
    }

    async fn exists_by_sku(
        &self,
        sku: &str,
        exclude: Option<&ProductId>,
    ) -> Result<bool, RepositoryError> {
        let products = self.products.read().await;
        Ok(products
            .values()
            .filter(|product| Some(&product.id) != exclude)
            .any(|product| product.skus().any(|s| s.0 == sku)))
    }

    async fn find_by_category(
        &self,
        category_id: &CategoryId,
    ) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.read().await;
        let mut found: Vec<Product> = products
            .values()
            .filter(|product| product.references_category(category_id))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.0.cmp(&b.id.0)));
        Ok(found)
    }

    async fn find_low_stock(&self, threshold: u32) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.read().await;
        let mut found: Vec<Product> = products
            .values()
            .filter(|product| product.variants.iter().any(|v| v.inventory < threshold))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.0.cmp(&b.id.0)));
        Ok(found)
    }
}

#[derive(Default)]
pub struct InMemoryCategoryRepository {
    categories: RwLock<HashMap<String, Category>>,
}

#[async_trait::async_trait]
impl CategoryRepository for InMemoryCategoryRepository {
    async fn find_by_id(&self, id: &CategoryId) -> Result<Option<Category>, RepositoryError> {
        let categories = self.categories.read().await;
        Ok(categories.get(&id.0).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Category>, RepositoryError> {
        let categories = self.categories.read().await;
        let mut all: Vec<Category> = categories.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn save(&self, category: Category) -> Result<(), RepositoryError> {
        let mut categories = self.categories.write().await;
        categories.insert(category.id.0.clone(), category);
        Ok(())
    }

    async fn delete_by_id(&self, id: &CategoryId) -> Result<Option<Category>, RepositoryError> {
        let mut categories = self.categories.write().await;
        Ok(categories.remove(&id.0))
    }

    async fn existing(
        &self,
        ids: &[CategoryId],
    ) -> Result<HashSet<CategoryId>, RepositoryError> {
        let categories = self.categories.read().await;
        Ok(ids.iter().filter(|id| categories.contains_key(&id.0)).cloned().collect())
    }

    async fn name_taken(
        &self,
        name: &str,
        exclude: Option<&CategoryId>,
    ) -> Result<bool, RepositoryError> {
        let categories = self.categories.read().await;
        Ok(categories
            .values()
            .filter(|category| Some(&category.id) != exclude)
            .any(|category| category.name == name))
    }

    async fn ancestors(&self, id: &CategoryId) -> Result<Vec<CategoryId>, RepositoryError> {
        let categories = self.categories.read().await;
        let mut chain = Vec::new();
        let mut cursor =
            categories.get(&id.0).and_then(|category| category.parent.clone());
        while let Some(parent_id) = cursor {
            if chain.contains(&parent_id) {
                break;
            }
            cursor = categories.get(&parent_id.0).and_then(|category| category.parent.clone());
            chain.push(parent_id);
        }
        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use shopfront_core::domain::category::{Category, CategoryId};
    use shopfront_core::domain::product::{
        Product, ProductId, Sku, Variant, VariantAttributes,
    };
    use shopfront_core::query::{compile, SearchParams};

    use super::{InMemoryCategoryRepository, InMemoryProductRepository};
    use crate::repositories::{CategoryRepository, ProductRepository, RepositoryError};

    fn product(id: &str, sku: &str) -> Product {
        Product {
            id: ProductId(id.to_owned()),
            name: format!("Product {id}"),
            description: None,
            categories: vec![CategoryId("cat-1".to_owned())],
            price: Decimal::new(4999, 2),
            variants: vec![Variant {
                name: "Default".to_owned(),
                sku: Sku(sku.to_owned()),
                price: Decimal::new(4999, 2),
                inventory: 3,
                attributes: VariantAttributes { color: "Black".to_owned(), size: None },
            }],
            discount: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn category(id: &str, name: &str, parent: Option<&str>) -> Category {
        Category {
            id: CategoryId(id.to_owned()),
            name: name.to_owned(),
            description: None,
            parent: parent.map(|p| CategoryId(p.to_owned())),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn product_round_trip() {
        let repo = InMemoryProductRepository::default();
        let item = product("p-1", "SKU-1");

        repo.create(item.clone()).await.expect("create");
        let found = repo.find_by_id(&item.id).await.expect("find");
        assert_eq!(found, Some(item));
    }

    #[tokio::test]
    async fn create_rejects_colliding_sku_like_the_unique_index() {
        let repo = InMemoryProductRepository::default();
        repo.create(product("p-1", "SKU-1")).await.expect("first create");

        let error = repo.create(product("p-2", "SKU-1")).await.expect_err("sku collision");
        assert!(matches!(error, RepositoryError::DuplicateSku { ref sku } if sku == "SKU-1"));
    }

    #[tokio::test]
    async fn update_of_missing_product_returns_none() {
        let repo = InMemoryProductRepository::default();
        let outcome = repo.update_by_id(product("ghost", "SKU-9")).await.expect("no error");
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn find_many_applies_compiled_query() {
        let repo = InMemoryProductRepository::default();
        repo.create(product("p-1", "SKU-1")).await.expect("create");
        repo.create(product("p-2", "SKU-2")).await.expect("create");

        let query = compile(&SearchParams {
            color: Some("Black".to_owned()),
            ..SearchParams::default()
        })
        .expect("compiles");
        let (window, total) = repo.find_many(&query, 0, 1).await.expect("search");
        assert_eq!(total, 2);
        assert_eq!(window.len(), 1);
    }

    #[tokio::test]
    async fn low_stock_filter_is_existential_over_variants() {
        let repo = InMemoryProductRepository::default();
        // Helper stock level is 3.
        repo.create(product("p-low", "SKU-1")).await.expect("create");
        let mut healthy = product("p-high", "SKU-2");
        healthy.variants[0].inventory = 40;
        repo.create(healthy).await.expect("create");

        let report = repo.find_low_stock(10).await.expect("report");
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].id.0, "p-low");

        let report = repo.find_low_stock(3).await.expect("report");
        assert!(report.is_empty(), "threshold bound is exclusive");
    }

    #[tokio::test]
    async fn ancestors_walk_stops_at_root_and_on_dangling_parent() {
        let repo = InMemoryCategoryRepository::default();
        repo.save(category("root", "Root", None)).await.expect("save");
        repo.save(category("mid", "Mid", Some("root"))).await.expect("save");
        repo.save(category("leaf", "Leaf", Some("mid"))).await.expect("save");
        repo.save(category("orphan", "Orphan", Some("gone"))).await.expect("save");

        let chain = repo.ancestors(&CategoryId("leaf".to_owned())).await.expect("chain");
        assert_eq!(chain, vec![CategoryId("mid".to_owned()), CategoryId("root".to_owned())]);

        let chain = repo.ancestors(&CategoryId("orphan".to_owned())).await.expect("chain");
        assert_eq!(chain, vec![CategoryId("gone".to_owned())]);
    }

    #[tokio::test]
    async fn name_taken_excludes_the_category_under_update() {
        let repo = InMemoryCategoryRepository::default();
        repo.save(category("cat-1", "Audio", None)).await.expect("save");

        assert!(repo.name_taken("Audio", None).await.expect("check"));
        assert!(!repo
            .name_taken("Audio", Some(&CategoryId("cat-1".to_owned())))
            .await
            .expect("check"));
    }
}
