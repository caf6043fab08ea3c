//! Data-driven recipe catalogs from JSON.
//!
//! Feature-gated behind `data-loader`. Parses a catalog of named items and
//! recipes into interned [`ItemTag`]s and [`Recipe`]s so game content can
//! live in data files instead of code.

use std::collections::BTreeMap;

use crate::id::ItemTag;
use crate::recipe::{Ingredient, Product, Recipe};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur while loading a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
    #[error("duplicate item name: {0}")]
    DuplicateItem(String),
    #[error("duplicate recipe name: {0}")]
    DuplicateRecipe(String),
    #[error("unknown item reference: {0}")]
    UnknownItemRef(String),
    #[error("recipe '{0}' has a zero-amount entry")]
    ZeroAmount(String),
    #[error("recipe '{0}' has zero duration")]
    ZeroDuration(String),
    #[error("recipe '{0}' produces nothing")]
    EmptyResults(String),
}

// ---------------------------------------------------------------------------
// JSON data structures
// ---------------------------------------------------------------------------

/// Top-level catalog structure for JSON deserialization.
#[derive(Debug, serde::Deserialize)]
pub struct CatalogData {
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub recipes: Vec<RecipeData>,
}

/// JSON representation of a recipe.
#[derive(Debug, serde::Deserialize)]
pub struct RecipeData {
    pub name: String,
    #[serde(default)]
    pub ingredients: Vec<EntryData>,
    pub results: Vec<EntryData>,
    pub duration: u32,
}

/// JSON representation of an ingredient or result entry.
#[derive(Debug, serde::Deserialize)]
pub struct EntryData {
    pub item: String, // references an item by name
    pub amount: u32,
}

// ---------------------------------------------------------------------------
// Interned catalog
// ---------------------------------------------------------------------------

/// An interned catalog: item names to tags, recipe names to recipes.
#[derive(Debug, Clone, Default)]
pub struct RecipeCatalog {
    item_tags: BTreeMap<String, ItemTag>,
    item_names: Vec<String>,
    recipes: BTreeMap<String, Recipe<ItemTag>>,
}

impl RecipeCatalog {
    pub fn item(&self, name: &str) -> Option<ItemTag> {
        self.item_tags.get(name).copied()
    }

    pub fn item_name(&self, tag: ItemTag) -> Option<&str> {
        self.item_names.get(tag.0 as usize).map(String::as_str)
    }

    pub fn items(&self) -> impl Iterator<Item = ItemTag> + '_ {
        (0..self.item_names.len() as u32).map(ItemTag)
    }

    pub fn recipe(&self, name: &str) -> Option<&Recipe<ItemTag>> {
        self.recipes.get(name)
    }

    pub fn recipes(&self) -> impl Iterator<Item = (&str, &Recipe<ItemTag>)> {
        self.recipes.iter().map(|(name, recipe)| (name.as_str(), recipe))
    }
}

// ---------------------------------------------------------------------------
// Loading functions
// ---------------------------------------------------------------------------

/// Load a catalog from a JSON string.
pub fn load_catalog_json(json: &str) -> Result<RecipeCatalog, CatalogError> {
    let data: CatalogData = serde_json::from_str(json)?;
    build_catalog(data)
}

/// Load a catalog from JSON bytes.
pub fn load_catalog_json_bytes(bytes: &[u8]) -> Result<RecipeCatalog, CatalogError> {
    let data: CatalogData = serde_json::from_slice(bytes)?;
    build_catalog(data)
}

fn build_catalog(data: CatalogData) -> Result<RecipeCatalog, CatalogError> {
    let mut catalog = RecipeCatalog::default();

    // Items are tagged in declaration order.
    for name in data.items {
        let tag = ItemTag(catalog.item_names.len() as u32);
        if catalog.item_tags.insert(name.clone(), tag).is_some() {
            return Err(CatalogError::DuplicateItem(name));
        }
        catalog.item_names.push(name);
    }

    for recipe_data in data.recipes {
        let name = recipe_data.name;
        if recipe_data.duration == 0 {
            return Err(CatalogError::ZeroDuration(name));
        }
        if recipe_data.results.is_empty() {
            return Err(CatalogError::EmptyResults(name));
        }

        let mut ingredients = Vec::with_capacity(recipe_data.ingredients.len());
        for entry in &recipe_data.ingredients {
            ingredients.push(Ingredient {
                item: resolve(&catalog, &name, entry)?,
                amount: entry.amount,
            });
        }
        let mut results = Vec::with_capacity(recipe_data.results.len());
        for entry in &recipe_data.results {
            results.push(Product {
                item: resolve(&catalog, &name, entry)?,
                amount: entry.amount,
            });
        }

        let recipe = Recipe::new(ingredients, results, recipe_data.duration);
        if catalog.recipes.insert(name.clone(), recipe).is_some() {
            return Err(CatalogError::DuplicateRecipe(name));
        }
    }

    Ok(catalog)
}

fn resolve(
    catalog: &RecipeCatalog,
    recipe_name: &str,
    entry: &EntryData,
) -> Result<ItemTag, CatalogError> {
    if entry.amount == 0 {
        return Err(CatalogError::ZeroAmount(recipe_name.to_string()));
    }
    catalog
        .item(&entry.item)
        .ok_or_else(|| CatalogError::UnknownItemRef(entry.item.clone()))
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const WOOD_CHAIN: &str = r#"{
        "items": ["tree_trunk", "wood_plank", "tree_bark"],
        "recipes": [
            {
                "name": "tree_harvest",
                "results": [{"item": "tree_trunk", "amount": 1}],
                "duration": 16
            },
            {
                "name": "process_tree_trunk",
                "ingredients": [{"item": "tree_trunk", "amount": 1}],
                "results": [
                    {"item": "wood_plank", "amount": 8},
                    {"item": "tree_bark", "amount": 16}
                ],
                "duration": 4
            }
        ]
    }"#;

    #[test]
    fn loads_a_catalog_and_interns_names() {
        let catalog = load_catalog_json(WOOD_CHAIN).expect("load");
        assert_eq!(catalog.item("tree_trunk"), Some(ItemTag(0)));
        assert_eq!(catalog.item("tree_bark"), Some(ItemTag(2)));
        assert_eq!(catalog.item_name(ItemTag(1)), Some("wood_plank"));
        assert_eq!(catalog.items().count(), 3);

        let mill = catalog.recipe("process_tree_trunk").expect("recipe");
        assert_eq!(mill.duration, 4);
        assert_eq!(mill.ingredients.len(), 1);
        assert_eq!(mill.results[1].amount, 16);

        let harvest = catalog.recipe("tree_harvest").expect("recipe");
        assert!(harvest.is_raw());
    }

    #[test]
    fn recipes_iterate_in_name_order() {
        let catalog = load_catalog_json(WOOD_CHAIN).expect("load");
        let names: Vec<&str> = catalog.recipes().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["process_tree_trunk", "tree_harvest"]);
        assert!(catalog.recipes().all(|(_, recipe)| !recipe.results.is_empty()));
    }

    #[test]
    fn unknown_item_references_are_rejected() {
        let json = r#"{
            "items": ["tree_trunk"],
            "recipes": [{
                "name": "bad",
                "ingredients": [{"item": "mystery", "amount": 1}],
                "results": [{"item": "tree_trunk", "amount": 1}],
                "duration": 1
            }]
        }"#;
        let err = load_catalog_json(json).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownItemRef(name) if name == "mystery"));
    }

    #[test]
    fn duplicate_items_are_rejected() {
        let json = r#"{"items": ["tree_trunk", "tree_trunk"]}"#;
        let err = load_catalog_json(json).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateItem(name) if name == "tree_trunk"));
    }

    #[test]
    fn degenerate_recipes_are_rejected() {
        let zero_duration = r#"{
            "items": ["tree_trunk"],
            "recipes": [{
                "name": "instant",
                "results": [{"item": "tree_trunk", "amount": 1}],
                "duration": 0
            }]
        }"#;
        assert!(matches!(
            load_catalog_json(zero_duration).unwrap_err(),
            CatalogError::ZeroDuration(_)
        ));

        let no_results = r#"{
            "items": ["tree_trunk"],
            "recipes": [{"name": "void", "results": [], "duration": 1}]
        }"#;
        assert!(matches!(
            load_catalog_json(no_results).unwrap_err(),
            CatalogError::EmptyResults(_)
        ));

        let zero_amount = r#"{
            "items": ["tree_trunk"],
            "recipes": [{
                "name": "nothing",
                "results": [{"item": "tree_trunk", "amount": 0}],
                "duration": 1
            }]
        }"#;
        assert!(matches!(
            load_catalog_json(zero_amount).unwrap_err(),
            CatalogError::ZeroAmount(_)
        ));
    }

    #[test]
    fn loading_from_bytes_matches_loading_from_str() {
        let a = load_catalog_json(WOOD_CHAIN).expect("str");
        let b = load_catalog_json_bytes(WOOD_CHAIN.as_bytes()).expect("bytes");
        assert_eq!(a.items().count(), b.items().count());
        assert_eq!(a.recipe("tree_harvest"), b.recipe("tree_harvest"));
    }
}
