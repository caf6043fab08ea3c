//! Shared test helpers for unit tests, integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so the helpers
//! are available in unit tests and, via the `test-utils` feature, in
//! integration tests and benches.
//!
//! The fixture domain is a small wood chain: harvesters produce trunks,
//! mills split trunks into planks and bark, nail benches turn planks into
//! nails, and table shops consume planks, nails and bark.

use crate::id::ItemTag;
use crate::recipe::{Ingredient, Product, ProductionLine, Recipe};
use crate::store::{ItemStorage, ItemStore};

// ===========================================================================
// Item constructors
// ===========================================================================

pub fn tree_trunk() -> ItemTag {
    ItemTag(0)
}
pub fn wood_plank() -> ItemTag {
    ItemTag(1)
}
pub fn tree_bark() -> ItemTag {
    ItemTag(2)
}
pub fn wooden_nail() -> ItemTag {
    ItemTag(3)
}
pub fn table() -> ItemTag {
    ItemTag(4)
}

pub fn all_items() -> [ItemTag; 5] {
    [tree_trunk(), wood_plank(), tree_bark(), wooden_nail(), table()]
}

// ===========================================================================
// Recipe constructors
// ===========================================================================

pub fn make_recipe(
    ingredients: Vec<(ItemTag, u32)>,
    results: Vec<(ItemTag, u32)>,
    duration: u32,
) -> Recipe<ItemTag> {
    Recipe::new(
        ingredients
            .into_iter()
            .map(|(item, amount)| Ingredient { item, amount })
            .collect(),
        results
            .into_iter()
            .map(|(item, amount)| Product { item, amount })
            .collect(),
        duration,
    )
}

/// Raw harvesting: nothing in, one trunk out, 16 ticks.
pub fn tree_harvest() -> Recipe<ItemTag> {
    make_recipe(vec![], vec![(tree_trunk(), 1)], 16)
}

/// Milling: one trunk in, 8 planks and 16 bark out, 4 ticks.
pub fn process_tree_trunk() -> Recipe<ItemTag> {
    make_recipe(
        vec![(tree_trunk(), 1)],
        vec![(wood_plank(), 8), (tree_bark(), 16)],
        4,
    )
}

/// Nail bench: one plank in, 24 nails out, 1 tick.
pub fn craft_wooden_nails() -> Recipe<ItemTag> {
    make_recipe(vec![(wood_plank(), 1)], vec![(wooden_nail(), 24)], 1)
}

/// Table shop: 6 planks, 12 nails and 4 bark in, one table out, 16 ticks.
pub fn assemble_table() -> Recipe<ItemTag> {
    make_recipe(
        vec![(wood_plank(), 6), (wooden_nail(), 12), (tree_bark(), 4)],
        vec![(table(), 1)],
        16,
    )
}

// ===========================================================================
// Store and line builders
// ===========================================================================

/// Every wood-chain item at the same capacity, initially empty.
pub fn store_with_capacity(capacity: u32) -> ItemStore<ItemTag> {
    ItemStore::with_uniform_capacity(all_items(), capacity)
}

/// Deposit the given amounts, failing the test on any shortfall.
pub fn seed<S: ItemStorage<ItemTag>>(store: &mut S, amounts: &[(ItemTag, u32)]) {
    for &(item, amount) in amounts {
        let deposited = store.deposit(item, amount).expect("seed deposit");
        assert_eq!(deposited, amount, "seed overflowed capacity for {item:?}");
    }
}

pub fn line(recipe: Recipe<ItemTag>, total_producers: u32) -> ProductionLine<ItemTag> {
    ProductionLine::new(recipe, total_producers)
}
