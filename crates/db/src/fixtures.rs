use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

use shopfront_core::domain::category::{Category, CategoryId};
use shopfront_core::domain::product::{
    Discount, DiscountKind, Product, ProductId, Sku, Variant, VariantAttributes,
};

use crate::repositories::{CategoryRepository, ProductRepository, RepositoryError};

/// Deterministic demo dataset: fixed ids, fixed timestamps, stable ordering.
/// Used by `shopfront seed` and by tests that want a populated catalog.
pub struct SeedDataset {
    pub categories: Vec<Category>,
    pub products: Vec<Product>,
}

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).single().expect("valid fixture timestamp")
}

fn category(id: &str, name: &str, description: &str, parent: Option<&str>) -> Category {
    Category {
        id: CategoryId(id.to_owned()),
        name: name.to_owned(),
        description: Some(description.to_owned()),
        parent: parent.map(|p| CategoryId(p.to_owned())),
        created_at: at(1, 9),
        updated_at: at(1, 9),
    }
}

impl SeedDataset {
    pub fn demo() -> Self {
        let categories = vec![
            category("cat-electronics", "Electronics", "Devices and accessories", None),
            category("cat-audio", "Audio", "Headphones and speakers", Some("cat-electronics")),
            category("cat-apparel", "Apparel", "Clothing and accessories", None),
        ];

        let products = vec![
            Product {
                id: ProductId("prod-headphones".to_owned()),
                name: "Premium Wireless Headphones".to_owned(),
                description: Some("Noise-cancelling Bluetooth headphones".to_owned()),
                categories: vec![
                    CategoryId("cat-electronics".to_owned()),
                    CategoryId("cat-audio".to_owned()),
                ],
                price: Decimal::new(29999, 2),
                variants: vec![
                    Variant {
                        name: "Midnight Black".to_owned(),
                        sku: Sku("HP-MB-2024".to_owned()),
                        price: Decimal::new(29999, 2),
                        inventory: 50,
                        attributes: VariantAttributes {
                            color: "Black".to_owned(),
                            size: Some("Standard".to_owned()),
                        },
                    },
                    Variant {
                        name: "Arctic White".to_owned(),
                        sku: Sku("HP-AW-2024".to_owned()),
                        price: Decimal::new(31999, 2),
                        inventory: 20,
                        attributes: VariantAttributes {
                            color: "White".to_owned(),
                            size: Some("Standard".to_owned()),
                        },
                    },
                ],
                discount: Some(Discount {
                    kind: DiscountKind::Percentage,
                    value: Decimal::new(10, 0),
                }),
                created_at: at(2, 10),
                updated_at: at(2, 10),
            },
            Product {
                id: ProductId("prod-hoodie".to_owned()),
                name: "Classic Hoodie".to_owned(),
                description: Some("Heavyweight cotton hoodie".to_owned()),
                categories: vec![CategoryId("cat-apparel".to_owned())],
                price: Decimal::new(5900, 2),
                variants: vec![
                    Variant {
                        name: "Navy M".to_owned(),
                        sku: Sku("HD-NV-M".to_owned()),
                        price: Decimal::new(5900, 2),
                        inventory: 12,
                        attributes: VariantAttributes {
                            color: "Navy".to_owned(),
                            size: Some("M".to_owned()),
                        },
                    },
                    Variant {
                        name: "Navy L".to_owned(),
                        sku: Sku("HD-NV-L".to_owned()),
                        price: Decimal::new(5900, 2),
                        inventory: 0,
                        attributes: VariantAttributes {
                            color: "Navy".to_owned(),
                            size: Some("L".to_owned()),
                        },
                    },
                ],
                discount: Some(Discount { kind: DiscountKind::Fixed, value: Decimal::new(900, 2) }),
                created_at: at(3, 11),
                updated_at: at(3, 11),
            },
            Product {
                id: ProductId("prod-speaker".to_owned()),
                name: "Portable Speaker".to_owned(),
                description: Some("Water-resistant travel speaker".to_owned()),
                categories: vec![CategoryId("cat-audio".to_owned())],
                price: Decimal::new(8950, 2),
                variants: vec![Variant {
                    name: "Charcoal".to_owned(),
                    sku: Sku("SP-CH-01".to_owned()),
                    price: Decimal::new(8950, 2),
                    inventory: 35,
                    attributes: VariantAttributes { color: "Charcoal".to_owned(), size: None },
                }],
                discount: None,
                created_at: at(4, 12),
                updated_at: at(4, 12),
            },
        ];

        Self { categories, products }
    }

    /// Idempotent load: existing rows with the same ids are overwritten
    /// (categories) or skipped (products, whose SKUs would collide).
    pub async fn apply(
        &self,
        products: &dyn ProductRepository,
        categories: &dyn CategoryRepository,
    ) -> Result<usize, RepositoryError> {
        for category in &self.categories {
            categories.save(category.clone()).await?;
        }

        let mut created = 0;
        for product in &self.products {
            if products.find_by_id(&product.id).await?.is_some() {
                continue;
            }
            products.create(product.clone()).await?;
            created += 1;
        }
        Ok(created)
    }
}
