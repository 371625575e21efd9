use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::category::CategoryId;
use crate::domain::product::Product;
use crate::errors::CatalogError;

/// Raw search parameters as they arrive from the caller.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchParams {
    pub q: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub category: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Text relevance, ties broken by recency then id.
    Relevance,
    /// Reverse-chronological; the deterministic fallback when no text query
    /// is present.
    NewestFirst,
}

/// Normalized, storage-agnostic filter. All constraints are conjunctive;
/// absent fields impose nothing. Both the in-memory store and the SQL
/// store's post-filtering evaluate this same structure, so there is exactly
/// one definition of what a search matches.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilter {
    /// Lowercased free-text term matched against name, description, and
    /// variant color.
    pub text: Option<String>,
    pub price_min: Option<Decimal>,
    pub price_max: Option<Decimal>,
    pub category: Option<CategoryId>,
    pub color: Option<String>,
    pub size: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub filter: SearchFilter,
    pub sort: SortOrder,
}

/// Translates raw parameters into a normalized query. Contradictory price
/// bounds fail here, before any storage collaborator is consulted.
pub fn compile(params: &SearchParams) -> Result<SearchQuery, CatalogError> {
    if let (Some(min), Some(max)) = (params.min_price, params.max_price) {
        if min > max {
            return Err(CatalogError::InvalidRange { min, max });
        }
    }

    let text = params
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase);

    let sort = if text.is_some() { SortOrder::Relevance } else { SortOrder::NewestFirst };

    Ok(SearchQuery {
        filter: SearchFilter {
            text,
            price_min: params.min_price,
            price_max: params.max_price,
            category: params.category.clone().map(CategoryId),
            color: params.color.clone(),
            size: params.size.clone(),
        },
        sort,
    })
}

impl SearchFilter {
    /// Whether the product satisfies every provided constraint.
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(min) = self.price_min {
            if product.price < min {
                return false;
            }
        }
        if let Some(max) = self.price_max {
            if product.price > max {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if !product.references_category(category) {
                return false;
            }
        }
        // Variant attribute filters are existential: at least one variant
        // must carry the value, not every variant.
        if let Some(color) = &self.color {
            if !product.variants.iter().any(|v| v.attributes.color == *color) {
                return false;
            }
        }
        if let Some(size) = &self.size {
            if !product
                .variants
                .iter()
                .any(|v| v.attributes.size.as_deref() == Some(size.as_str()))
            {
                return false;
            }
        }
        if self.text.is_some() && self.relevance(product).is_none() {
            return false;
        }
        true
    }

    /// Relevance score for the text term: name hits outrank description
    /// hits, which outrank variant-color hits. `None` when the term matches
    /// nothing (or no term is set).
    pub fn relevance(&self, product: &Product) -> Option<u32> {
        let term = self.text.as_deref()?;
        let mut score = 0;
        if product.name.to_lowercase().contains(term) {
            score += 4;
        }
        if let Some(description) = &product.description {
            if description.to_lowercase().contains(term) {
                score += 2;
            }
        }
        if product.variants.iter().any(|v| v.attributes.color.to_lowercase().contains(term)) {
            score += 1;
        }
        (score > 0).then_some(score)
    }
}

impl SearchQuery {
    /// Orders already-matched products deterministically. Relevance sorts by
    /// score descending; both orders break ties by recency then id so equal
    /// inputs always paginate identically.
    pub fn rank(&self, mut products: Vec<Product>) -> Vec<Product> {
        match self.sort {
            SortOrder::Relevance => {
                products.sort_by(|a, b| {
                    let score_a = self.filter.relevance(a).unwrap_or(0);
                    let score_b = self.filter.relevance(b).unwrap_or(0);
                    score_b
                        .cmp(&score_a)
                        .then(b.created_at.cmp(&a.created_at))
                        .then(a.id.0.cmp(&b.id.0))
                });
            }
            SortOrder::NewestFirst => {
                products.sort_by(|a, b| {
                    b.created_at.cmp(&a.created_at).then(a.id.0.cmp(&b.id.0))
                });
            }
        }
        products
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use super::{compile, SearchParams, SortOrder};
    use crate::domain::category::CategoryId;
    use crate::domain::product::{Product, ProductId, Sku, Variant, VariantAttributes};
    use crate::errors::CatalogError;

    fn product(id: &str, name: &str, price: Decimal, color: &str, size: Option<&str>) -> Product {
        Product {
            id: ProductId(id.to_owned()),
            name: name.to_owned(),
            description: None,
            categories: vec![CategoryId("cat-audio".to_owned())],
            price,
            variants: vec![Variant {
                name: "Default".to_owned(),
                sku: Sku(format!("{id}-1")),
                price,
                inventory: 5,
                attributes: VariantAttributes {
                    color: color.to_owned(),
                    size: size.map(str::to_owned),
                },
            }],
            discount: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn contradictory_bounds_fail_before_any_lookup() {
        let params = SearchParams {
            min_price: Some(Decimal::new(5000, 2)),
            max_price: Some(Decimal::new(1000, 2)),
            ..SearchParams::default()
        };
        let error = compile(&params).expect_err("min > max must fail");
        assert!(matches!(error, CatalogError::InvalidRange { .. }));
    }

    #[test]
    fn equal_bounds_are_a_valid_inclusive_range() {
        let params = SearchParams {
            min_price: Some(Decimal::ONE_HUNDRED),
            max_price: Some(Decimal::ONE_HUNDRED),
            ..SearchParams::default()
        };
        let query = compile(&params).expect("equal bounds are inclusive");
        assert!(query.filter.matches(&product("p1", "Amp", Decimal::ONE_HUNDRED, "Black", None)));
    }

    #[test]
    fn blank_text_falls_back_to_newest_first() {
        let params = SearchParams { q: Some("   ".to_owned()), ..SearchParams::default() };
        let query = compile(&params).expect("blank q compiles");
        assert_eq!(query.sort, SortOrder::NewestFirst);
        assert!(query.filter.text.is_none());
    }

    #[test]
    fn price_bounds_are_inclusive_either_side_optional() {
        let params =
            SearchParams { min_price: Some(Decimal::new(2000, 2)), ..SearchParams::default() };
        let query = compile(&params).expect("open-ended range compiles");
        assert!(query.filter.matches(&product("p1", "Amp", Decimal::new(2000, 2), "Black", None)));
        assert!(!query.filter.matches(&product("p2", "Amp", Decimal::new(1999, 2), "Black", None)));
    }

    #[test]
    fn variant_filters_match_existentially() {
        let mut many_colors = product("p1", "Hoodie", Decimal::ONE_HUNDRED, "Black", Some("M"));
        many_colors.variants.push(Variant {
            name: "Red L".to_owned(),
            sku: Sku("p1-2".to_owned()),
            price: Decimal::ONE_HUNDRED,
            inventory: 1,
            attributes: VariantAttributes { color: "Red".to_owned(), size: Some("L".to_owned()) },
        });

        let params = SearchParams { color: Some("Red".to_owned()), ..SearchParams::default() };
        let query = compile(&params).expect("color filter compiles");
        assert!(query.filter.matches(&many_colors), "one matching variant suffices");

        let params = SearchParams { size: Some("XL".to_owned()), ..SearchParams::default() };
        let query = compile(&params).expect("size filter compiles");
        assert!(!query.filter.matches(&many_colors));
    }

    #[test]
    fn filters_are_conjunctive() {
        let item = product("p1", "Hoodie", Decimal::ONE_HUNDRED, "Black", Some("M"));
        let params = SearchParams {
            q: Some("hoodie".to_owned()),
            color: Some("Red".to_owned()),
            ..SearchParams::default()
        };
        let query = compile(&params).expect("compiles");
        assert!(!query.filter.matches(&item), "text matches but color does not");
    }

    #[test]
    fn name_hits_outrank_description_and_color_hits() {
        let named = product("p1", "Navy Jacket", Decimal::ONE_HUNDRED, "Black", None);
        let mut described = product("p2", "Jacket", Decimal::ONE_HUNDRED, "Black", None);
        described.description = Some("A navy classic".to_owned());
        let colored = product("p3", "Jacket", Decimal::ONE_HUNDRED, "Navy", None);

        let params = SearchParams { q: Some("navy".to_owned()), ..SearchParams::default() };
        let query = compile(&params).expect("compiles");

        let ranked = query.rank(vec![colored.clone(), described.clone(), named.clone()]);
        let ids: Vec<&str> = ranked.iter().map(|p| p.id.0.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2", "p3"]);
    }

    #[test]
    fn newest_first_is_deterministic_under_equal_timestamps() {
        let now = Utc::now();
        let mut a = product("a", "One", Decimal::ONE, "Black", None);
        let mut b = product("b", "Two", Decimal::ONE, "Black", None);
        let mut c = product("c", "Three", Decimal::ONE, "Black", None);
        a.created_at = now;
        b.created_at = now;
        c.created_at = now - Duration::hours(1);

        let query = compile(&SearchParams::default()).expect("compiles");
        let ranked = query.rank(vec![c.clone(), b.clone(), a.clone()]);
        let ids: Vec<&str> = ranked.iter().map(|p| p.id.0.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
