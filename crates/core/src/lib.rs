pub mod config;
pub mod domain;
pub mod errors;
pub mod pagination;
pub mod pricing;
pub mod query;
pub mod validation;

pub use domain::category::{Category, CategoryId};
pub use domain::product::{
    Discount, DiscountKind, Product, ProductId, Sku, Variant, VariantAttributes,
};
pub use errors::{CatalogError, ErrorBody, FieldError, ValidationErrors};
pub use pagination::{PageRequest, Pagination};
pub use pricing::{display_price, effective_price};
pub use query::{compile, SearchFilter, SearchParams, SearchQuery, SortOrder};
pub use validation::{
    validate_category, validate_product, CategoryContext, CategoryDraft, NewCategory, NewProduct,
    ProductDraft, ValidationContext,
};
