use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rust_decimal::Decimal;

use shopfront_catalog::CatalogService;
use shopfront_core::domain::category::{Category, CategoryId};
use shopfront_core::domain::product::{DiscountKind, Product, ProductId};
use shopfront_core::errors::CatalogError;
use shopfront_core::pagination::PageRequest;
use shopfront_core::query::{SearchParams, SearchQuery};
use shopfront_core::validation::{
    AttributesDraft, CategoryDraft, DiscountDraft, ProductDraft, VariantDraft,
};
use shopfront_db::repositories::{
    InMemoryCategoryRepository, InMemoryProductRepository, ProductRepository, RepositoryError,
};

fn service() -> CatalogService {
    CatalogService::new(
        Arc::new(InMemoryProductRepository::default()),
        Arc::new(InMemoryCategoryRepository::default()),
    )
}

async fn seeded_category(service: &CatalogService, name: &str) -> Category {
    service
        .create_category(&CategoryDraft { name: Some(name.to_owned()), ..CategoryDraft::default() })
        .await
        .expect("category created")
}

fn variant(sku: &str, color: &str, size: Option<&str>, price: Decimal) -> VariantDraft {
    VariantDraft {
        name: Some(format!("{color} edition")),
        sku: Some(sku.to_owned()),
        price: Some(price),
        inventory: Some(10),
        attributes: Some(AttributesDraft {
            color: Some(color.to_owned()),
            size: size.map(str::to_owned),
        }),
    }
}

fn headphones_draft(category_id: &str) -> ProductDraft {
    ProductDraft {
        name: Some("Headphones".to_owned()),
        description: Some("Noise-cancelling Bluetooth headphones".to_owned()),
        categories: Some(vec![category_id.to_owned()]),
        price: Some(Decimal::new(29999, 2)),
        variants: Some(vec![variant("HP-1", "Black", None, Decimal::new(29999, 2))]),
        discount: Some(DiscountDraft {
            kind: Some(DiscountKind::Percentage),
            value: Some(Decimal::new(10, 0)),
        }),
    }
}

#[tokio::test]
async fn create_returns_calculator_effective_price() {
    let service = service();
    let category = seeded_category(&service, "Audio").await;

    let view = service.create_product(&headphones_draft(&category.id.0)).await.expect("created");

    // 299.99 at 10% off, full precision at the facade boundary.
    assert_eq!(view.effective_price, Decimal::new(269991, 3));
    assert_eq!(view.categories.len(), 1);
    assert_eq!(view.categories[0].name, "Audio");
}

#[tokio::test]
async fn missing_name_and_bad_price_fail_with_field_errors() {
    let service = service();
    let category = seeded_category(&service, "Audio").await;

    let mut draft = headphones_draft(&category.id.0);
    draft.name = None;
    draft.price = Some(Decimal::ZERO);

    let error = service.create_product(&draft).await.expect_err("invalid");
    let CatalogError::Validation(errors) = error else {
        panic!("expected validation failure, got {error:?}");
    };
    assert!(errors.contains_field("name"));
    assert!(errors.contains_field("price"));
}

#[tokio::test]
async fn colliding_skus_fail_the_second_create_either_order() {
    let service = service();
    let category = seeded_category(&service, "Audio").await;

    let first = headphones_draft(&category.id.0);
    let mut second = headphones_draft(&category.id.0);
    second.name = Some("Other headphones".to_owned());

    service.create_product(&first).await.expect("first create");
    let error = service.create_product(&second).await.expect_err("sku collision");

    // The pre-check catches it as a validation failure; a racing writer
    // would surface it as a duplicate-sku conflict instead. Either kind
    // satisfies the uniqueness guarantee.
    match error {
        CatalogError::Validation(errors) => {
            assert!(errors.contains_field("variants[0].sku"));
        }
        CatalogError::DuplicateSku { sku } => assert_eq!(sku, "HP-1"),
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn unknown_category_reference_is_a_per_element_error() {
    let service = service();
    let category = seeded_category(&service, "Audio").await;

    let mut draft = headphones_draft(&category.id.0);
    draft.categories = Some(vec![category.id.0.clone(), "cat-missing".to_owned()]);

    let error = service.create_product(&draft).await.expect_err("bad reference");
    let CatalogError::Validation(errors) = error else {
        panic!("expected validation failure, got {error:?}");
    };
    assert!(errors.contains_field("categories[1]"));
}

/// Counts every call that reaches storage, to prove compile-stage failures
/// never touch the collaborator.
struct CountingProducts {
    inner: InMemoryProductRepository,
    calls: AtomicU64,
}

#[async_trait::async_trait]
impl ProductRepository for CountingProducts {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_id(id).await
    }

    async fn find_many(
        &self,
        query: &SearchQuery,
        skip: u64,
        limit: u64,
    ) -> Result<(Vec<Product>, u64), RepositoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.find_many(query, skip, limit).await
    }

    async fn create(&self, product: Product) -> Result<(), RepositoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.create(product).await
    }

    async fn update_by_id(&self, product: Product) -> Result<Option<Product>, RepositoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.update_by_id(product).await
    }

    async fn delete_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_by_id(id).await
    }

    async fn exists_by_sku(
        &self,
        sku: &str,
        exclude: Option<&ProductId>,
    ) -> Result<bool, RepositoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.exists_by_sku(sku, exclude).await
    }

    async fn find_by_category(
        &self,
        category_id: &CategoryId,
    ) -> Result<Vec<Product>, RepositoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_category(category_id).await
    }

    async fn find_low_stock(&self, threshold: u32) -> Result<Vec<Product>, RepositoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.find_low_stock(threshold).await
    }
}

#[tokio::test]
async fn invalid_range_fails_before_any_storage_call() {
    let products = Arc::new(CountingProducts {
        inner: InMemoryProductRepository::default(),
        calls: AtomicU64::new(0),
    });
    let service = CatalogService::new(
        products.clone(),
        Arc::new(InMemoryCategoryRepository::default()),
    );

    let params = SearchParams {
        min_price: Some(Decimal::new(5000, 2)),
        max_price: Some(Decimal::new(1000, 2)),
        ..SearchParams::default()
    };
    let error = service
        .search_products(&params, PageRequest::default())
        .await
        .expect_err("range must be rejected");

    assert!(matches!(error, CatalogError::InvalidRange { .. }));
    assert_eq!(products.calls.load(Ordering::SeqCst), 0, "storage was consulted");
}

#[tokio::test]
async fn pages_are_disjoint_contiguous_and_union_to_the_whole() {
    let service = service();
    let category = seeded_category(&service, "Audio").await;

    for i in 0..5 {
        let mut draft = headphones_draft(&category.id.0);
        draft.name = Some(format!("Product {i}"));
        draft.variants = Some(vec![variant(
            &format!("SKU-{i}"),
            "Black",
            None,
            Decimal::new(29999, 2),
        )]);
        service.create_product(&draft).await.expect("created");
    }

    let first = service
        .list_products(PageRequest::from_raw(Some(1), Some(2)))
        .await
        .expect("page 1");
    let second = service
        .list_products(PageRequest::from_raw(Some(2), Some(2)))
        .await
        .expect("page 2");
    let third = service
        .list_products(PageRequest::from_raw(Some(3), Some(2)))
        .await
        .expect("page 3");
    let whole = service
        .list_products(PageRequest::from_raw(Some(1), Some(5)))
        .await
        .expect("single page");

    assert_eq!(first.pagination.total, 5);
    assert_eq!(first.pagination.pages, 3);
    assert!(first.pagination.has_next);
    assert!(!third.pagination.has_next);

    let paged: Vec<String> = first
        .data
        .iter()
        .chain(second.data.iter())
        .chain(third.data.iter())
        .map(|view| view.id.clone())
        .collect();
    let unique: HashSet<&String> = paged.iter().collect();
    assert_eq!(unique.len(), paged.len(), "windows overlap");

    let single: Vec<String> = whole.data.iter().map(|view| view.id.clone()).collect();
    assert_eq!(paged, single, "windows do not union to the single-page order");
}

#[tokio::test]
async fn search_filters_combine_conjunctively() {
    let service = service();
    let audio = seeded_category(&service, "Audio").await;
    let apparel = seeded_category(&service, "Apparel").await;

    let mut hoodie = headphones_draft(&apparel.id.0);
    hoodie.name = Some("Classic Hoodie".to_owned());
    hoodie.price = Some(Decimal::new(5900, 2));
    hoodie.discount = None;
    hoodie.variants =
        Some(vec![variant("HD-NV-M", "Navy", Some("M"), Decimal::new(5900, 2))]);
    service.create_product(&hoodie).await.expect("hoodie");
    service.create_product(&headphones_draft(&audio.id.0)).await.expect("headphones");

    let params = SearchParams {
        q: Some("hoodie".to_owned()),
        category: Some(apparel.id.0.clone()),
        color: Some("Navy".to_owned()),
        size: Some("M".to_owned()),
        min_price: Some(Decimal::new(1000, 2)),
        max_price: Some(Decimal::new(10000, 2)),
    };
    let page = service
        .search_products(&params, PageRequest::default())
        .await
        .expect("search succeeds");

    assert_eq!(page.pagination.total, 1);
    assert_eq!(page.data[0].name, "Classic Hoodie");
}

#[tokio::test]
async fn update_merges_partial_payload_and_revalidates() {
    let service = service();
    let category = seeded_category(&service, "Audio").await;
    let created = service.create_product(&headphones_draft(&category.id.0)).await.expect("create");
    let id = ProductId(created.id.clone());

    let patch = ProductDraft {
        price: Some(Decimal::new(19999, 2)),
        ..ProductDraft::default()
    };
    let updated = service.update_product(&id, &patch).await.expect("update");

    assert_eq!(updated.price, Decimal::new(19999, 2));
    assert_eq!(updated.name, "Headphones", "untouched fields persist");
    assert_eq!(updated.variants.len(), 1, "variants kept from stored state");
    // 199.99 at the same 10% discount.
    assert_eq!(updated.effective_price, Decimal::new(179991, 3));

    let bad_patch = ProductDraft { price: Some(Decimal::ZERO), ..ProductDraft::default() };
    let error = service.update_product(&id, &bad_patch).await.expect_err("merged state invalid");
    assert!(matches!(error, CatalogError::Validation(_)));
}

#[tokio::test]
async fn update_keeps_own_skus_without_conflict() {
    let service = service();
    let category = seeded_category(&service, "Audio").await;
    let created = service.create_product(&headphones_draft(&category.id.0)).await.expect("create");
    let id = ProductId(created.id.clone());

    // Resubmitting the same variants must not trip the uniqueness check
    // against the document's own SKUs.
    let patch = ProductDraft {
        variants: Some(vec![variant("HP-1", "Black", None, Decimal::new(27999, 2))]),
        ..ProductDraft::default()
    };
    let updated = service.update_product(&id, &patch).await.expect("self-skus are fine");
    assert_eq!(updated.variants[0].price, Decimal::new(27999, 2));
}

#[tokio::test]
async fn missing_product_operations_report_not_found() {
    let service = service();
    let ghost = ProductId("ghost".to_owned());

    assert!(matches!(
        service.get_product(&ghost).await.expect_err("missing"),
        CatalogError::NotFound { entity: "product", .. }
    ));
    assert!(matches!(
        service.delete_product(&ghost).await.expect_err("missing"),
        CatalogError::NotFound { entity: "product", .. }
    ));
    assert!(matches!(
        service
            .update_product(&ghost, &ProductDraft::default())
            .await
            .expect_err("missing"),
        CatalogError::NotFound { entity: "product", .. }
    ));
}

#[tokio::test]
async fn bulk_create_reports_partial_success_per_index() {
    let service = service();
    let category = seeded_category(&service, "Audio").await;

    let valid = headphones_draft(&category.id.0);
    let mut invalid = headphones_draft(&category.id.0);
    invalid.name = None;
    invalid.variants = Some(vec![variant("BULK-2", "Black", None, Decimal::new(100, 2))]);
    let mut also_valid = headphones_draft(&category.id.0);
    also_valid.name = Some("Speaker".to_owned());
    also_valid.variants = Some(vec![variant("BULK-3", "Black", None, Decimal::new(100, 2))]);

    let report = service.bulk_create(&[valid, invalid, also_valid]).await;

    assert_eq!(report.created.len(), 2, "valid siblings are not blocked");
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].index, 1);
    assert_eq!(report.failures[0].error.kind, "validation_failed");
}

#[tokio::test]
async fn bulk_create_treats_earlier_batch_skus_as_taken() {
    let service = service();
    let category = seeded_category(&service, "Audio").await;

    let first = headphones_draft(&category.id.0);
    let mut second = headphones_draft(&category.id.0);
    second.name = Some("Copycat".to_owned());

    let report = service.bulk_create(&[first, second]).await;
    assert_eq!(report.created.len(), 1);
    assert_eq!(report.failures[0].index, 1);
}

#[tokio::test]
async fn deleted_category_references_are_dropped_on_read() {
    let service = service();
    let audio = seeded_category(&service, "Audio").await;
    let apparel = seeded_category(&service, "Apparel").await;

    let mut draft = headphones_draft(&audio.id.0);
    draft.categories = Some(vec![audio.id.0.clone(), apparel.id.0.clone()]);
    let created = service.create_product(&draft).await.expect("create");
    assert_eq!(created.categories.len(), 2);

    service.delete_category(&apparel.id).await.expect("delete category");

    let view = service.get_product(&ProductId(created.id.clone())).await.expect("read back");
    assert_eq!(view.categories.len(), 1, "dangling reference resolves as not found");
    assert_eq!(view.categories[0].id, audio.id);
}

#[tokio::test]
async fn category_tree_rules_are_enforced() {
    let service = service();
    let root = seeded_category(&service, "Electronics").await;
    let child = service
        .create_category(&CategoryDraft {
            name: Some("Audio".to_owned()),
            parent: Some(root.id.0.clone()),
            ..CategoryDraft::default()
        })
        .await
        .expect("child created");

    // Re-parenting the root under its own descendant is a cycle.
    let error = service
        .update_category(
            &root.id,
            &CategoryDraft { parent: Some(child.id.0.clone()), ..CategoryDraft::default() },
        )
        .await
        .expect_err("cycle rejected");
    let CatalogError::Validation(errors) = error else {
        panic!("expected validation failure, got {error:?}");
    };
    assert!(errors.contains_field("parent"));

    // Duplicate names are rejected catalog-wide.
    let error = service
        .create_category(&CategoryDraft {
            name: Some("Audio".to_owned()),
            ..CategoryDraft::default()
        })
        .await
        .expect_err("duplicate name");
    assert!(matches!(error, CatalogError::Validation(_)));
}

#[tokio::test]
async fn low_stock_report_defaults_to_threshold_ten() {
    let service = service();
    let category = seeded_category(&service, "Audio").await;

    // Helper variants carry inventory 10, which is not below the default.
    service.create_product(&headphones_draft(&category.id.0)).await.expect("create");

    let mut running_out = headphones_draft(&category.id.0);
    running_out.name = Some("Clearance Speaker".to_owned());
    let mut last_units = variant("SP-LAST", "Charcoal", None, Decimal::new(8950, 2));
    last_units.inventory = Some(2);
    running_out.variants = Some(vec![last_units]);
    service.create_product(&running_out).await.expect("create");

    let report = service.find_low_stock(None).await.expect("report");
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].name, "Clearance Speaker");

    let report = service.find_low_stock(Some(2)).await.expect("report");
    assert!(report.is_empty(), "bound is exclusive");

    let report = service.find_low_stock(Some(11)).await.expect("report");
    assert_eq!(report.len(), 2, "raised threshold pulls in the rest");
}

#[tokio::test]
async fn products_by_category_is_a_derived_query() {
    let service = service();
    let audio = seeded_category(&service, "Audio").await;
    let apparel = seeded_category(&service, "Apparel").await;

    service.create_product(&headphones_draft(&audio.id.0)).await.expect("create");

    let in_audio = service.find_products_by_category(&audio.id).await.expect("derived query");
    assert_eq!(in_audio.len(), 1);

    let in_apparel =
        service.find_products_by_category(&apparel.id).await.expect("derived query");
    assert!(in_apparel.is_empty());

    let missing = CategoryId("cat-missing".to_owned());
    assert!(matches!(
        service.find_products_by_category(&missing).await.expect_err("unknown category"),
        CatalogError::NotFound { entity: "category", .. }
    ));
}
