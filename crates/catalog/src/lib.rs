//! Catalog facade: composes the validation engine, query compiler,
//! pagination engine, and discount calculator with the storage
//! collaborators. The HTTP layer above and the database driver below are
//! external; this crate owns the use-case orchestration between them.

pub mod service;
pub mod view;

pub use service::{CatalogService, DEFAULT_LOW_STOCK_THRESHOLD};
pub use view::{BulkCreateReport, BulkFailure, ProductPage, ProductView};
