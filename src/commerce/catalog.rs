//! Dr Abhishek Shop product catalog and the heuristics used to search it.

use serde::Serialize;

pub const CURRENCY: &str = "INR";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Product {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub price: u64,
    pub currency: &'static str,
    pub category: &'static str,
    pub color: &'static str,
    pub sizes: &'static [&'static str],
}

const fn product(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    price: u64,
    category: &'static str,
    color: &'static str,
    sizes: &'static [&'static str],
) -> Product {
    Product {
        id,
        name,
        description,
        price,
        currency: CURRENCY,
        category,
        color,
        sizes,
    }
}

const NO_SIZES: &[&str] = &[];

pub static CATALOG: &[Product] = &[
    product("mug-001", "Stoneware Chai Mug", "Hand-glazed ceramic mug perfect for masala chai.", 299, "mug", "blue", NO_SIZES),
    product("tee-001", "Dr Abhishek Tee (Cotton)", "Comfort-fit cotton t-shirt with subtle logo.", 799, "tshirt", "black", &["S", "M", "L", "XL"]),
    product("hoodie-001", "Cozy Hoodie", "Warm pullover hoodie, fleece-lined.", 1499, "hoodie", "grey", &["M", "L", "XL"]),
    product("mug-002", "Insulated Travel Mug", "Keeps chai warm on your way to work.", 599, "mug", "white", NO_SIZES),
    product("hoodie-002", "Black Zip Hoodie", "Lightweight zip-up hoodie, black.", 1299, "hoodie", "black", &["S", "M", "L"]),
    product("tee-002", "Casual Cotton Tee", "Everyday cotton t-shirt, breathable and soft.", 299, "tshirt", "white", &["S", "M", "L", "XL"]),
    product("tee-003", "Graphic Tee", "Printed graphic t-shirt with vibrant design.", 499, "tshirt", "navy", &["S", "M", "L", "XL"]),
    product("tee-004", "Premium Polo Tee", "Polo-style t-shirt with premium stitching.", 999, "tshirt", "maroon", &["M", "L", "XL"]),
    product("tee-005", "Summer V-neck Tee", "Lightweight V-neck tee for hot days.", 350, "tshirt", "sky", &["S", "M", "L"]),
    product("tee-006", "Henley Tee", "Smart casual henley style t-shirt.", 699, "tshirt", "olive", &["M", "L", "XL"]),
    product("rain-001", "Light Raincoat", "Waterproof light raincoat, packable.", 1299, "raincoat", "yellow", &["M", "L", "XL"]),
    product("rain-002", "Heavy Duty Raincoat", "Heavy-duty rainproof coat for monsoon.", 2499, "raincoat", "navy", &["L", "XL"]),
    product("laptop-001", "Generic Laptop (50k)", "A reliable laptop suitable for everyday use.", 50000, "laptop", "silver", NO_SIZES),
    product("laptop-002", "Dell Inspiron (Budget)", "Compact Dell laptop for students and professionals.", 27800, "laptop", "black", NO_SIZES),
    product("laptop-003", "Lenovo ThinkPad", "Durable Lenovo laptop with strong performance.", 60000, "laptop", "black", NO_SIZES),
    product("laptop-004", "HP Pavilion", "High-performance HP laptop for creators.", 100000, "laptop", "silver", NO_SIZES),
    product("storage-001", "External Hard Disk 1TB", "Portable external hard disk for backups.", 50000, "storage", "black", NO_SIZES),
    product("phone-001", "Redmi Note (Entry)", "Affordable Redmi smartphone with solid features.", 12000, "mobile", "blue", NO_SIZES),
    product("phone-002", "Oppo A-Series", "Stylish Oppo phone with good camera.", 18000, "mobile", "green", NO_SIZES),
    product("phone-003", "Samsung M-Series", "Mid-range Samsung phone for everyday use.", 25000, "mobile", "black", NO_SIZES),
    product("phone-004", "iPhone (Standard)", "Apple iPhone model example (price varies by config).", 50000, "mobile", "white", NO_SIZES),
    product("phone-005", "Oppo Reno", "Higher-end Oppo phone with premium features.", 35000, "mobile", "black", NO_SIZES),
    product("phone-006", "Redmi Pro", "Redmi higher-tier phone with improved camera and battery.", 22000, "mobile", "grey", NO_SIZES),
];

const MOBILE_WORDS: &[&str] = &["phone", "phones", "mobile", "mobiles"];
const TSHIRT_WORDS: &[&str] = &["tee", "tshirt", "t-shirts", "tees"];
const ORDINALS: &[(&str, usize)] = &[("first", 0), ("second", 1), ("third", 2), ("fourth", 3)];

/// Search filters accepted by [`list_products`]. Unset fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct ProductFilters {
    pub q: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<u64>,
    pub max_price: Option<u64>,
    pub color: Option<String>,
    pub size: Option<String>,
}

pub fn product_by_id(id: &str) -> Option<&'static Product> {
    CATALOG.iter().find(|p| p.id.eq_ignore_ascii_case(id.trim()))
}

/// Fold spoken category synonyms onto catalog categories
pub fn normalize_category(raw: &str) -> String {
    let cat = raw.trim().to_lowercase();
    match cat.as_str() {
        "phone" | "phones" | "mobile" | "mobile phone" | "mobiles" => "mobile".to_string(),
        "tshirt" | "t-shirts" | "tees" | "tee" => "tshirt".to_string(),
        _ => cat,
    }
}

/// Guess a category from a free-text query ("cheap phones" -> mobile)
pub fn category_from_query(q: &str) -> Option<&'static str> {
    let q = q.to_lowercase();
    if MOBILE_WORDS.iter().any(|w| q.contains(w)) {
        Some("mobile")
    } else if TSHIRT_WORDS.iter().any(|w| q.contains(w)) {
        Some("tshirt")
    } else {
        None
    }
}

fn mentions_mobile(text: &str) -> bool {
    MOBILE_WORDS.iter().any(|w| text.contains(w))
}

pub fn list_products(filters: &ProductFilters) -> Vec<&'static Product> {
    let category = filters
        .category
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .map(normalize_category);
    let query = filters
        .q
        .as_deref()
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());
    let color = filters
        .color
        .as_deref()
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty());
    // a zero budget means no budget
    let max_price = filters.max_price.filter(|max| *max > 0);
    let size = filters
        .size
        .as_deref()
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty());

    CATALOG
        .iter()
        .filter(|p| {
            if let Some(category) = &category {
                let pcat = p.category;
                if pcat != category && !pcat.contains(category.as_str()) && !category.contains(pcat)
                {
                    return false;
                }
            }
            if matches!(max_price, Some(max) if p.price > max) {
                return false;
            }
            if matches!(filters.min_price, Some(min) if p.price < min) {
                return false;
            }
            if let Some(color) = &color {
                if !p.color.is_empty() && p.color != color {
                    return false;
                }
            }
            if let Some(size) = &size {
                if !p.sizes.contains(&size.as_str()) {
                    return false;
                }
            }
            if let Some(q) = &query {
                if q.contains("phone") || q.contains("mobile") {
                    if p.category != "mobile" {
                        return false;
                    }
                } else if !p.name.to_lowercase().contains(q.as_str())
                    && !p.description.to_lowercase().contains(q.as_str())
                {
                    return false;
                }
            }
            true
        })
        .collect()
}

/// Resolve a spoken reference ("second hoodie", "black hoodie", "mug-001", "2")
/// against `candidates`, trying progressively looser matches.
pub fn find_product_by_ref(
    reference: &str,
    candidates: &[&'static Product],
) -> Option<&'static Product> {
    let reference = reference.trim().to_lowercase();
    if reference.is_empty() || candidates.is_empty() {
        return None;
    }

    let narrowed: Vec<&'static Product> = if mentions_mobile(&reference) {
        let mobiles: Vec<_> = candidates
            .iter()
            .copied()
            .filter(|p| p.category == "mobile")
            .collect();
        if mobiles.is_empty() {
            candidates.to_vec()
        } else {
            mobiles
        }
    } else {
        candidates.to_vec()
    };

    for (word, idx) in ORDINALS {
        if reference.contains(word) {
            if let Some(p) = narrowed.get(*idx) {
                return Some(p);
            }
        }
    }

    if let Some(p) = candidates
        .iter()
        .find(|p| p.id.eq_ignore_ascii_case(&reference))
    {
        return Some(p);
    }

    if let Some(p) = candidates.iter().find(|p| {
        !p.color.is_empty() && reference.contains(p.color) && reference.contains(p.category)
    }) {
        return Some(p);
    }

    let tokens: Vec<&str> = reference
        .split_whitespace()
        .filter(|tok| tok.chars().count() > 2)
        .collect();
    if !tokens.is_empty() {
        if let Some(p) = narrowed.iter().find(|p| {
            let name = p.name.to_lowercase();
            tokens.iter().all(|tok| name.contains(tok))
        }) {
            return Some(p);
        }
        if let Some(p) = candidates.iter().find(|p| {
            let name = p.name.to_lowercase();
            tokens.iter().any(|tok| name.contains(tok))
        }) {
            return Some(p);
        }
    }

    for token in reference.split_whitespace() {
        if let Ok(n) = token.parse::<usize>() {
            if n >= 1 {
                if let Some(p) = narrowed.get(n - 1) {
                    return Some(p);
                }
            }
        }
    }

    for (word, idx) in ORDINALS {
        if reference.contains(word) {
            if let Some(p) = candidates.get(*idx) {
                return Some(p);
            }
        }
    }

    None
}

/// Whether a reference picks by position ("the second one", "2") rather than by name
pub fn is_positional_ref(reference: &str) -> bool {
    let reference = reference.to_lowercase();
    ORDINALS.iter().any(|(word, _)| reference.contains(word))
        || reference
            .split_whitespace()
            .any(|tok| tok.parse::<usize>().is_ok())
}

/// The whole catalog as a candidate list for [`find_product_by_ref`]
pub fn all_products() -> Vec<&'static Product> {
    CATALOG.iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(products: &[&Product]) -> Vec<&'static str> {
        products.iter().map(|p| p.id).collect()
    }

    #[test]
    fn test_catalog_ids_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for p in CATALOG {
            assert!(seen.insert(p.id), "duplicate id {}", p.id);
        }
        assert_eq!(CATALOG.len(), 23);
    }

    #[test]
    fn test_normalize_category_synonyms() {
        assert_eq!(normalize_category("Phones"), "mobile");
        assert_eq!(normalize_category("mobile phone"), "mobile");
        assert_eq!(normalize_category("tees"), "tshirt");
        assert_eq!(normalize_category(" Hoodie "), "hoodie");
    }

    #[test]
    fn test_list_by_category_and_price() {
        let filters = ProductFilters {
            category: Some("phones".into()),
            max_price: Some(20000),
            ..Default::default()
        };
        assert_eq!(ids(&list_products(&filters)), vec!["phone-001", "phone-002"]);
    }

    #[test]
    fn test_list_price_bounds_inclusive() {
        let filters = ProductFilters {
            min_price: Some(50000),
            max_price: Some(50000),
            ..Default::default()
        };
        assert_eq!(
            ids(&list_products(&filters)),
            vec!["laptop-001", "storage-001", "phone-004"]
        );
    }

    #[test]
    fn test_list_by_size_and_color() {
        let filters = ProductFilters {
            category: Some("hoodie".into()),
            size: Some("s".into()),
            ..Default::default()
        };
        assert_eq!(ids(&list_products(&filters)), vec!["hoodie-002"]);

        let filters = ProductFilters {
            color: Some("Black".into()),
            category: Some("laptop".into()),
            ..Default::default()
        };
        assert_eq!(ids(&list_products(&filters)), vec!["laptop-002", "laptop-003"]);
    }

    #[test]
    fn test_query_matches_name_or_description() {
        let filters = ProductFilters {
            q: Some("chai".into()),
            ..Default::default()
        };
        assert_eq!(ids(&list_products(&filters)), vec!["mug-001", "mug-002"]);
    }

    #[test]
    fn test_query_mentioning_phone_keeps_only_mobiles() {
        let filters = ProductFilters {
            q: Some("a good phone".into()),
            ..Default::default()
        };
        let found = list_products(&filters);
        assert_eq!(found.len(), 6);
        assert!(found.iter().all(|p| p.category == "mobile"));
    }

    #[test]
    fn test_ref_by_ordinal_within_mobiles() {
        let all = all_products();
        let p = find_product_by_ref("the second phone", &all).unwrap();
        assert_eq!(p.id, "phone-002");
    }

    #[test]
    fn test_ref_by_id_and_color_category() {
        let all = all_products();
        assert_eq!(find_product_by_ref("MUG-002", &all).unwrap().id, "mug-002");
        assert_eq!(
            find_product_by_ref("the black hoodie", &all).unwrap().id,
            "hoodie-002"
        );
    }

    #[test]
    fn test_ref_by_name_tokens() {
        let all = all_products();
        assert_eq!(find_product_by_ref("lenovo thinkpad", &all).unwrap().id, "laptop-003");
        assert_eq!(find_product_by_ref("oppo reno", &all).unwrap().id, "phone-005");
    }

    #[test]
    fn test_ref_by_number_within_listing() {
        let listing = list_products(&ProductFilters {
            category: Some("raincoat".into()),
            ..Default::default()
        });
        assert_eq!(find_product_by_ref("2", &listing).unwrap().id, "rain-002");
        assert!(find_product_by_ref("7", &listing).is_none());
    }

    #[test]
    fn test_zero_max_price_is_no_filter() {
        let filters = ProductFilters {
            category: Some("laptop".into()),
            max_price: Some(0),
            ..Default::default()
        };
        assert_eq!(list_products(&filters).len(), 4);
    }

    #[test]
    fn test_positional_refs() {
        assert!(is_positional_ref("the second one"));
        assert!(is_positional_ref("number 2"));
        assert!(!is_positional_ref("the black laptop"));
        assert!(!is_positional_ref("mug-001"));
    }

    #[test]
    fn test_unresolvable_refs() {
        let all = all_products();
        assert!(find_product_by_ref("", &all).is_none());
        assert!(find_product_by_ref("xyzzy", &all).is_none());
        assert!(find_product_by_ref("mug-001", &[]).is_none());
    }
}
