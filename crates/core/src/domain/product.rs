use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::category::CategoryId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(pub String);

/// Stock keeping unit. Unique across every variant in the catalog; the
/// `variant.sku` unique index in storage is the final authority.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sku(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    Percentage,
    Fixed,
}

/// A discount is all-or-nothing: when present it always carries both a kind
/// and a value. Payloads where only one half is set are rejected by the
/// validation engine before this type is ever constructed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    pub kind: DiscountKind,
    pub value: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantAttributes {
    pub color: String,
    pub size: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub name: String,
    pub sku: Sku,
    pub price: Decimal,
    pub inventory: u32,
    pub attributes: VariantAttributes,
}

/// A catalog product. Owns its variants and discount outright; holds
/// non-owning references to categories, whose lifetime is independent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub categories: Vec<CategoryId>,
    pub price: Decimal,
    pub variants: Vec<Variant>,
    pub discount: Option<Discount>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn skus(&self) -> impl Iterator<Item = &Sku> {
        self.variants.iter().map(|variant| &variant.sku)
    }

    pub fn references_category(&self, category_id: &CategoryId) -> bool {
        self.categories.iter().any(|id| id == category_id)
    }
}
