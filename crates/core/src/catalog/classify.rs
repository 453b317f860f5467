//! Keyword-based category suggestions.
//!
//! Used by `bz-cli categories assign` to file products that were created
//! without a category.

/// Category that receives every product no keyword matched.
pub const FALLBACK_CATEGORY: &str = "Other goods";

/// Category names with the lower-case keywords that select them, in priority order.
///
/// Product names arrive in English or Russian, so each list carries both.
pub const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "Electronics",
        &[
            "iphone",
            "samsung",
            "laptop",
            "macbook",
            "headphones",
            "smartphone",
            "tablet",
            "galaxy",
            "ноутбук",
            "наушники",
            "смартфон",
            "планшет",
        ],
    ),
    (
        "Clothing and shoes",
        &[
            "shirt",
            "trousers",
            "dress",
            "jacket",
            "shoes",
            "t-shirt",
            "рубашка",
            "брюки",
            "платье",
            "куртка",
            "обувь",
            "футболка",
        ],
    ),
    (
        "Groceries",
        &[
            "milk", "cheese", "yogurt", "meat", "chicken", "drink", "молоко", "сыр", "йогурт",
            "мясо", "курица", "напиток",
        ],
    ),
    (
        "Home goods",
        &[
            "sofa", "bed", "table", "chair", "curtains", "dishes", "диван", "кровать", "стол",
            "стул", "шторы", "посуда",
        ],
    ),
    (
        "Car accessories",
        &[
            "battery",
            "tires",
            "motor oil",
            "seat cover",
            "air freshener",
            "аккумулятор",
            "шины",
            "масло",
            "чехол",
            "ароматизатор",
        ],
    ),
];

/// Category names whose keywords appear in the product name, in priority order.
pub fn keyword_matches(product_name: &str) -> impl Iterator<Item = &'static str> {
    let name = product_name.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .filter(move |(_, keywords)| keywords.iter().any(|k| name.contains(k)))
        .map(|(category, _)| *category)
}

/// First keyword-matched category that actually exists.
///
/// A matching category missing from the catalog is skipped and the next
/// match is tried.
pub fn classify(product_name: &str, exists: impl Fn(&str) -> bool) -> Option<&'static str> {
    keyword_matches(product_name).find(|category| exists(category))
}
