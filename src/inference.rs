//! Keyword Inference
//!
//! Local stand-in for the server's ingredient analysis: case-insensitive
//! substring matches against the ingredient name. Every match is kept, so a
//! name can carry contradictory tags (e.g. "vegan" and the "dairy" allergen).

use std::collections::BTreeSet;

use crate::models::IngredientAnalysis;

pub const GLUTEN: &str = "gluten";
pub const GLUTEN_FREE: &str = "gluten-free";

/// (allergen, keywords)
const ALLERGEN_KEYWORDS: &[(&str, &[&str])] = &[
    (GLUTEN, &["wheat", "flour"]),
    ("dairy", &["milk", "dairy", "cheese"]),
    ("eggs", &["egg"]),
    ("nuts", &["peanut", "almond", "walnut"]),
    ("soy", &["soy"]),
    ("fish", &["fish", "salmon", "tuna"]),
    ("shellfish", &["shrimp", "crab", "lobster"]),
];

/// Dietary tags matched by their own name
const TAG_KEYWORDS: &[&str] = &[
    "organic",
    "sugar-free",
    "fat-free",
    "low-sodium",
    "vegan",
    "vegetarian",
];

pub fn infer_allergens(name: &str) -> BTreeSet<String> {
    let name = name.to_lowercase();
    ALLERGEN_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| name.contains(k)))
        .map(|(allergen, _)| allergen.to_string())
        .collect()
}

/// Tags for `name` given its already inferred allergens.
pub fn infer_tags(name: &str, allergens: &BTreeSet<String>) -> BTreeSet<String> {
    let name = name.to_lowercase();
    let mut tags: BTreeSet<String> = TAG_KEYWORDS
        .iter()
        .filter(|k| name.contains(*k))
        .map(|k| k.to_string())
        .collect();

    if !allergens.contains(GLUTEN) {
        tags.insert(GLUTEN_FREE.to_string());
    }
    tags
}

pub fn analyze(name: &str) -> IngredientAnalysis {
    let allergens = infer_allergens(name);
    let tags = infer_tags(name, &allergens);
    IngredientAnalysis { tags, allergens }
}
