use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::category::CategoryId;
use crate::domain::product::{Discount, DiscountKind, Sku, Variant, VariantAttributes};
use crate::errors::ValidationErrors;

pub const NAME_MAX: usize = 100;
pub const DESCRIPTION_MAX: usize = 500;
pub const CATEGORY_NAME_MIN: usize = 2;
pub const CATEGORY_NAME_MAX: usize = 50;
pub const CATEGORY_DESCRIPTION_MAX: usize = 200;

/// Minimum accepted base price on create: one cent.
pub fn minimum_price() -> Decimal {
    Decimal::new(1, 2)
}

/// Candidate product payload. Every field is optional so the engine can
/// report all missing fields at once; unknown fields are rejected at the
/// deserialization boundary rather than silently dropped.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductDraft {
    pub name: Option<String>,
    pub description: Option<String>,
    pub categories: Option<Vec<String>>,
    pub price: Option<Decimal>,
    pub variants: Option<Vec<VariantDraft>>,
    pub discount: Option<DiscountDraft>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariantDraft {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub price: Option<Decimal>,
    pub inventory: Option<i64>,
    pub attributes: Option<AttributesDraft>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttributesDraft {
    pub color: Option<String>,
    pub size: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiscountDraft {
    pub kind: Option<DiscountKind>,
    pub value: Option<Decimal>,
}

/// Existence snapshot supplied by the facade. The engine itself never talks
/// to storage: category resolution and SKU occupancy arrive pre-fetched, so
/// validation stays a pure function of its inputs. For updates the taken-SKU
/// set excludes the document being updated.
#[derive(Clone, Debug, Default)]
pub struct ValidationContext {
    pub known_categories: HashSet<CategoryId>,
    pub taken_skus: HashSet<String>,
}

/// Normalized output of a successful product validation: trimmed strings,
/// deduplicated categories, fully-materialized variants and discount.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub categories: Vec<CategoryId>,
    pub price: Decimal,
    pub variants: Vec<Variant>,
    pub discount: Option<Discount>,
}

/// Checks every rule and accumulates every violation; callers get the full
/// field list, never just the first failure.
pub fn validate_product(
    draft: &ProductDraft,
    context: &ValidationContext,
) -> Result<NewProduct, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let name = match draft.name.as_deref().map(str::trim) {
        None | Some("") => {
            errors.push("name", "name is required");
            None
        }
        Some(name) if name.chars().count() > NAME_MAX => {
            errors.push("name", format!("name cannot exceed {NAME_MAX} characters"));
            None
        }
        Some(name) => Some(name.to_owned()),
    };

    let description = match draft.description.as_deref() {
        Some(description) if description.chars().count() > DESCRIPTION_MAX => {
            errors.push(
                "description",
                format!("description cannot exceed {DESCRIPTION_MAX} characters"),
            );
            None
        }
        other => other.map(str::to_owned),
    };

    let price = match draft.price {
        None => {
            errors.push("price", "price is required");
            None
        }
        Some(price) if price < minimum_price() => {
            errors.push("price", "price must be at least 0.01");
            None
        }
        Some(price) => Some(price),
    };

    let categories = validate_categories(draft.categories.as_deref(), context, &mut errors);
    let variants = validate_variants(draft.variants.as_deref(), context, &mut errors);
    let discount = validate_discount(draft.discount.as_ref(), &mut errors);

    if !errors.is_empty() {
        return Err(errors);
    }

    // All accumulators are Some once the error list is empty.
    Ok(NewProduct {
        name: name.unwrap_or_default(),
        description,
        categories: categories.unwrap_or_default(),
        price: price.unwrap_or_default(),
        variants: variants.unwrap_or_default(),
        discount,
    })
}

fn validate_categories(
    categories: Option<&[String]>,
    context: &ValidationContext,
    errors: &mut ValidationErrors,
) -> Option<Vec<CategoryId>> {
    let categories = match categories {
        None | Some([]) => {
            errors.push("categories", "at least one category is required");
            return None;
        }
        Some(categories) => categories,
    };

    let mut resolved = Vec::new();
    let mut seen = HashSet::new();
    let mut valid = true;
    for (index, raw) in categories.iter().enumerate() {
        let id = raw.trim();
        if id.is_empty() {
            errors.push(format!("categories[{index}]"), "category reference is malformed");
            valid = false;
            continue;
        }
        let id = CategoryId(id.to_owned());
        if !context.known_categories.contains(&id) {
            errors.push(
                format!("categories[{index}]"),
                format!("category `{}` does not exist", id.0),
            );
            valid = false;
            continue;
        }
        if seen.insert(id.clone()) {
            resolved.push(id);
        }
    }

    valid.then_some(resolved)
}

fn validate_variants(
    variants: Option<&[VariantDraft]>,
    context: &ValidationContext,
    errors: &mut ValidationErrors,
) -> Option<Vec<Variant>> {
    let variants = match variants {
        None | Some([]) => {
            errors.push("variants", "at least one variant is required");
            return None;
        }
        Some(variants) => variants,
    };

    let mut resolved = Vec::new();
    let mut payload_skus: HashSet<String> = HashSet::new();
    let mut valid = true;
    for (index, draft) in variants.iter().enumerate() {
        let before = errors.0.len();

        let name = match draft.name.as_deref().map(str::trim) {
            None | Some("") => {
                errors.push(format!("variants[{index}].name"), "variant name is required");
                None
            }
            Some(name) => Some(name.to_owned()),
        };

        let sku = match draft.sku.as_deref().map(str::trim) {
            None | Some("") => {
                errors.push(format!("variants[{index}].sku"), "sku is required");
                None
            }
            Some(sku) if !payload_skus.insert(sku.to_owned()) => {
                errors.push(
                    format!("variants[{index}].sku"),
                    format!("sku `{sku}` appears more than once in this payload"),
                );
                None
            }
            Some(sku) if context.taken_skus.contains(sku) => {
                errors.push(
                    format!("variants[{index}].sku"),
                    format!("sku `{sku}` is already in use"),
                );
                None
            }
            Some(sku) => Some(Sku(sku.to_owned())),
        };

        let price = match draft.price {
            None => {
                errors.push(format!("variants[{index}].price"), "variant price is required");
                None
            }
            Some(price) if price < Decimal::ZERO => {
                errors.push(format!("variants[{index}].price"), "variant price cannot be negative");
                None
            }
            Some(price) => Some(price),
        };

        let inventory = match draft.inventory {
            None => {
                errors.push(format!("variants[{index}].inventory"), "inventory is required");
                None
            }
            Some(count) if count < 0 => {
                errors.push(
                    format!("variants[{index}].inventory"),
                    "inventory cannot be negative",
                );
                None
            }
            // Counts beyond u32 are rejected outright; a lossy cast would
            // accept the payload and store a different number.
            Some(count) => match u32::try_from(count) {
                Ok(count) => Some(count),
                Err(_) => {
                    errors.push(
                        format!("variants[{index}].inventory"),
                        "inventory is too large",
                    );
                    None
                }
            },
        };

        let color = match draft.attributes.as_ref().and_then(|a| a.color.as_deref()).map(str::trim)
        {
            None | Some("") => {
                errors.push(
                    format!("variants[{index}].attributes.color"),
                    "variant color is required",
                );
                None
            }
            Some(color) => Some(color.to_owned()),
        };

        if errors.0.len() > before {
            valid = false;
            continue;
        }

        resolved.push(Variant {
            name: name.unwrap_or_default(),
            sku: sku.unwrap_or_else(|| Sku(String::new())),
            price: price.unwrap_or_default(),
            inventory: inventory.unwrap_or_default(),
            attributes: VariantAttributes {
                color: color.unwrap_or_default(),
                size: draft
                    .attributes
                    .as_ref()
                    .and_then(|a| a.size.as_deref())
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned),
            },
        });
    }

    valid.then_some(resolved)
}

fn validate_discount(
    discount: Option<&DiscountDraft>,
    errors: &mut ValidationErrors,
) -> Option<Discount> {
    let draft = discount?;

    // All-or-nothing: a half-specified discount is an error, not a default.
    let (kind, value) = match (draft.kind, draft.value) {
        (None, None) => return None,
        (Some(kind), Some(value)) => (kind, value),
        (Some(_), None) => {
            errors.push("discount.value", "discount value is required when a kind is set");
            return None;
        }
        (None, Some(_)) => {
            errors.push("discount.kind", "discount kind is required when a value is set");
            return None;
        }
    };

    if value < Decimal::ZERO {
        errors.push("discount.value", "discount value cannot be negative");
        return None;
    }
    if kind == DiscountKind::Percentage && value > Decimal::ONE_HUNDRED {
        errors.push("discount.value", "percentage discount cannot exceed 100");
        return None;
    }

    Some(Discount { kind, value })
}

/// Candidate category payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryDraft {
    pub name: Option<String>,
    pub description: Option<String>,
    pub parent: Option<String>,
}

/// Snapshot for category validation. `parent_ancestors` is the ancestor
/// chain of the proposed parent (root last) and `self_id` the category under
/// update, so re-parenting onto a descendant is caught as a cycle.
#[derive(Clone, Debug, Default)]
pub struct CategoryContext {
    pub known_ids: HashSet<CategoryId>,
    pub taken_names: HashSet<String>,
    pub parent_ancestors: Vec<CategoryId>,
    pub self_id: Option<CategoryId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
    pub parent: Option<CategoryId>,
}

pub fn validate_category(
    draft: &CategoryDraft,
    context: &CategoryContext,
) -> Result<NewCategory, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let name = match draft.name.as_deref().map(str::trim) {
        None | Some("") => {
            errors.push("name", "category name is required");
            None
        }
        Some(name) if name.chars().count() < CATEGORY_NAME_MIN => {
            errors.push(
                "name",
                format!("category name must be at least {CATEGORY_NAME_MIN} characters"),
            );
            None
        }
        Some(name) if name.chars().count() > CATEGORY_NAME_MAX => {
            errors.push(
                "name",
                format!("category name cannot exceed {CATEGORY_NAME_MAX} characters"),
            );
            None
        }
        Some(name) if context.taken_names.contains(name) => {
            errors.push("name", format!("category name `{name}` is already in use"));
            None
        }
        Some(name) => Some(name.to_owned()),
    };

    let description = match draft.description.as_deref() {
        Some(description) if description.chars().count() > CATEGORY_DESCRIPTION_MAX => {
            errors.push(
                "description",
                format!("description cannot exceed {CATEGORY_DESCRIPTION_MAX} characters"),
            );
            None
        }
        other => other.map(str::to_owned),
    };

    let parent = match draft.parent.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(parent) => {
            let parent = CategoryId(parent.to_owned());
            if !context.known_ids.contains(&parent) {
                errors.push("parent", format!("parent category `{}` does not exist", parent.0));
                None
            } else if context.self_id.as_ref() == Some(&parent)
                || context
                    .self_id
                    .as_ref()
                    .is_some_and(|id| context.parent_ancestors.contains(id))
            {
                errors.push("parent", "parent assignment would create a cycle");
                None
            } else {
                Some(parent)
            }
        }
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(NewCategory { name: name.unwrap_or_default(), description, parent })
}
