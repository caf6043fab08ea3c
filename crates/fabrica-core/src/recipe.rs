//! Recipes and production lines: the caller-owned production model.
//!
//! A [`Recipe`] is an immutable template (ingredients in, products out,
//! after a fixed number of ticks). A [`ProductionLine`] binds a recipe to a
//! pool of up to `total_producers` identical producers that share one cycle:
//! `active_producers` of them hold ingredients, and a single
//! `production_progress` counter advances for all of them at once.

use crate::id::ItemId;
use crate::store::ItemStorage;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Recipe types
// ---------------------------------------------------------------------------

/// One input requirement of a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient<I> {
    pub item: I,
    pub amount: u32,
}

/// One output product of a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product<I> {
    pub item: I,
    pub amount: u32,
}

/// An immutable production template.
///
/// `ingredients` may be empty (raw producers that need no input);
/// `results` must not be. Amounts and `duration` are positive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe<I> {
    pub ingredients: Vec<Ingredient<I>>,
    pub results: Vec<Product<I>>,
    /// Ticks for one production cycle.
    pub duration: u32,
}

impl<I: ItemId> Recipe<I> {
    pub fn new(ingredients: Vec<Ingredient<I>>, results: Vec<Product<I>>, duration: u32) -> Self {
        Self {
            ingredients,
            results,
            duration,
        }
    }

    /// Raw recipes consume nothing and are activated purely on output room.
    pub fn is_raw(&self) -> bool {
        self.ingredients.is_empty()
    }

    /// How many producers current storage could supply with ingredients.
    /// `u32::MAX` for raw recipes.
    pub fn max_sustainable<S: ItemStorage<I>>(&self, store: &S) -> u32 {
        self.ingredients
            .iter()
            .map(|ingredient| store.stored_amount(ingredient.item) / ingredient.amount)
            .min()
            .unwrap_or(u32::MAX)
    }

    /// How many producers' complete output current free capacity could
    /// absorb.
    pub fn max_result_handleable<S: ItemStorage<I>>(&self, store: &S) -> u32 {
        self.results
            .iter()
            .map(|product| store.free_capacity(product.item) / product.amount)
            .min()
            .unwrap_or(u32::MAX)
    }
}

// ---------------------------------------------------------------------------
// Production line
// ---------------------------------------------------------------------------

/// A pool of identical producers bound to one recipe.
///
/// The line is owned by the caller; the scheduler mutates
/// `active_producers` and `production_progress` in place. Whenever the line
/// is at rest: `active_producers <= total_producers`,
/// `production_progress <= recipe.duration`, and an idle line
/// (`active_producers == 0`) sits at zero progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionLine<I> {
    pub recipe: Recipe<I>,
    /// Configured upper bound of concurrent producers.
    pub total_producers: u32,
    /// Producers currently holding ingredients and producing.
    pub active_producers: u32,
    /// Cycle progress shared by every active producer of the line.
    pub production_progress: u32,
}

impl<I: ItemId> ProductionLine<I> {
    /// A new line starts idle.
    pub fn new(recipe: Recipe<I>, total_producers: u32) -> Self {
        Self {
            recipe,
            total_producers,
            active_producers: 0,
            production_progress: 0,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.active_producers == 0
    }

    /// The largest producer count that could start right now: bounded by
    /// the pool size, by ingredient availability and by output room.
    pub fn max_startable<S: ItemStorage<I>>(&self, store: &S) -> u32 {
        self.total_producers
            .min(self.recipe.max_sustainable(store))
            .min(self.recipe.max_result_handleable(store))
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ItemStore;
    use crate::test_utils::*;

    #[test]
    fn raw_recipes_are_always_sustainable() {
        let store = ItemStore::with_uniform_capacity([tree_trunk()], 8);
        let recipe = tree_harvest();
        assert!(recipe.is_raw());
        assert_eq!(recipe.max_sustainable(&store), u32::MAX);
        assert_eq!(recipe.max_result_handleable(&store), 8);
    }

    #[test]
    fn sustainability_is_limited_by_the_scarcest_ingredient() {
        // 6 plank + 12 nails + 4 bark per table.
        let mut store = store_with_capacity(1024);
        seed(&mut store, &[(wood_plank(), 30), (wooden_nail(), 24), (tree_bark(), 400)]);
        let recipe = assemble_table();
        // plank supports 5, nails support 2, bark supports 100.
        assert_eq!(recipe.max_sustainable(&store), 2);
    }

    #[test]
    fn result_handling_is_limited_by_the_tightest_output() {
        // 1 trunk -> 8 plank + 16 bark.
        let mut store = store_with_capacity(1024);
        seed(&mut store, &[(tree_bark(), 1000)]);
        let recipe = process_tree_trunk();
        // plank room 1024/8 = 128, bark room 24/16 = 1.
        assert_eq!(recipe.max_result_handleable(&store), 1);
    }

    #[test]
    fn max_startable_combines_pool_supply_and_room() {
        let mut store = store_with_capacity(1024);
        seed(&mut store, &[(tree_trunk(), 32)]);
        let line = ProductionLine::new(process_tree_trunk(), 128);
        // Pool 128, trunks support 32, bark room limits to 64.
        assert_eq!(line.max_startable(&store), 32);
    }

    #[test]
    fn new_lines_start_idle() {
        let line = ProductionLine::new(tree_harvest(), 4);
        assert!(line.is_idle());
        assert_eq!(line.production_progress, 0);
        assert_eq!(line.total_producers, 4);
    }

    #[test]
    fn line_serialization_round_trip() {
        let mut line = ProductionLine::new(process_tree_trunk(), 16);
        line.active_producers = 3;
        line.production_progress = 2;
        let bytes = bitcode::serialize(&line).expect("serialize");
        let restored: ProductionLine<crate::id::ItemTag> =
            bitcode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, line);
    }
}
