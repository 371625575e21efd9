use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single violated rule, addressed by field path so callers can drive
/// per-field messages (`variants[1].sku`, `categories[0]`, ...).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

/// Every violated rule for one payload. Validation accumulates; it never
/// stops at the first failure.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains_field(&self, field: &str) -> bool {
        self.0.iter().any(|error| error.field == field)
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<&str> = self.0.iter().map(|error| error.field.as_str()).collect();
        write!(f, "{} field error(s): {}", self.0.len(), fields.join(", "))
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("{entity} `{id}` not found")]
    NotFound { entity: &'static str, id: String },
    #[error("invalid price range: min {min} exceeds max {max}")]
    InvalidRange { min: Decimal, max: Decimal },
    #[error("sku `{sku}` is already in use")]
    DuplicateSku { sku: String },
    #[error("storage dependency unavailable: {0}")]
    Dependency(String),
}

impl CatalogError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { entity, id: id.into() }
    }

    /// Stable machine-readable kind, part of the caller contract.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_failed",
            Self::NotFound { .. } => "not_found",
            Self::InvalidRange { .. } => "invalid_range",
            Self::DuplicateSku { .. } => "conflict_duplicate_sku",
            Self::Dependency(_) => "dependency_unavailable",
        }
    }
}

impl From<ValidationErrors> for CatalogError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

/// The shape handed across the caller boundary. The routing layer maps this
/// to a transport; the engine only guarantees kind, message, and the field
/// list when validation failed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<Vec<FieldError>>,
}

impl From<&CatalogError> for ErrorBody {
    fn from(error: &CatalogError) -> Self {
        let field_errors = match error {
            CatalogError::Validation(errors) => Some(errors.0.clone()),
            _ => None,
        };
        Self { kind: error.kind().to_string(), message: error.to_string(), field_errors }
    }
}
