//! Demand collection and partitioning.
//!
//! Before withdrawing anything, the scheduler tabulates how much of each
//! item the idle lines want this tick, then splits the table into three
//! classes that are resolved with different policies:
//!
//! - **Simple** -- the item is wanted by exactly one line, and every
//!   ingredient of that line is wanted by that line alone. Grantable in
//!   full without looking at anything else.
//! - **Satisfiable mixed** -- contested, but current storage can still
//!   cover the full demand of every line involved (checked transitively
//!   through shared ingredients).
//! - **Unsatisfiable groups** -- the rest, partitioned into connected
//!   components of items linked by a common consumer line. Each group is
//!   rationed proportionally by the scheduler.
//!
//! All four classifiers are pure functions of the lines and the store, so a
//! caller can inspect the scheduling decision for the current state without
//! applying it. Entries refer to lines by index into the caller's slice,
//! and all scratch maps are `BTreeMap`s: identical inputs classify
//! identically, in the same order, on every run.

use crate::id::ItemId;
use crate::recipe::ProductionLine;
use crate::store::ItemStorage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Request records
// ---------------------------------------------------------------------------

/// One line's share of the demand for a single item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    /// Index of the line in the caller's slice.
    pub line: usize,
    /// Producers the line wants to start this tick.
    pub requested_producers: u32,
    /// Ingredient amount times `requested_producers` for this item.
    pub requested_amount: u32,
}

/// All demand for one item in the current tick, in line order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRequest {
    pub lines: Vec<LineRequest>,
    /// Sum of `requested_amount` across `lines`.
    pub total_requested: u32,
}

/// Per-item demand table.
pub type RequestMap<I> = BTreeMap<I, ItemRequest>;

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

/// Tabulate ingredient demand over every line currently able to start.
///
/// A line participates when it sits at zero progress and storage could both
/// feed and absorb at least one producer. Raw lines contribute nothing;
/// they are activated directly from output room. Each participating line
/// adds one entry per ingredient, sized for its largest startable producer
/// count.
pub fn collect_item_requests<I: ItemId, S: ItemStorage<I>>(
    lines: &[ProductionLine<I>],
    store: &S,
) -> RequestMap<I> {
    let mut requests = RequestMap::new();
    for (index, line) in lines.iter().enumerate() {
        if line.production_progress != 0 || line.recipe.is_raw() {
            continue;
        }
        let producers = line.max_startable(store);
        if producers == 0 {
            continue;
        }
        for ingredient in &line.recipe.ingredients {
            let amount = ingredient.amount * producers;
            let request = requests.entry(ingredient.item).or_default();
            request.lines.push(LineRequest {
                line: index,
                requested_producers: producers,
                requested_amount: amount,
            });
            request.total_requested += amount;
        }
    }
    requests
}

// ---------------------------------------------------------------------------
// Simple requests
// ---------------------------------------------------------------------------

/// Requests forming a one-line island: a single requesting line whose every
/// ingredient is requested by nobody else.
pub fn simple_item_requests<I: ItemId>(
    lines: &[ProductionLine<I>],
    all: &RequestMap<I>,
) -> RequestMap<I> {
    let mut simple = RequestMap::new();
    for (&item, request) in all {
        let [entry] = request.lines.as_slice() else {
            continue;
        };
        let unshared = lines[entry.line].recipe.ingredients.iter().all(|ingredient| {
            all.get(&ingredient.item)
                .is_some_and(|r| matches!(r.lines.as_slice(), [only] if only.line == entry.line))
        });
        if unshared {
            simple.insert(item, request.clone());
        }
    }
    simple
}

// ---------------------------------------------------------------------------
// Satisfiable mixed requests
// ---------------------------------------------------------------------------

/// Mixed requests that current storage can still grant in full: every line
/// touching the item could receive all of its ingredients, as could every
/// line sharing any of those ingredients, judged by the per-item totals.
pub fn satisfiable_mixed_item_requests<I: ItemId, S: ItemStorage<I>>(
    lines: &[ProductionLine<I>],
    all: &RequestMap<I>,
    simple: &RequestMap<I>,
    store: &S,
) -> RequestMap<I> {
    let mut satisfiable = RequestMap::new();
    for (&item, request) in all {
        if simple.contains_key(&item) {
            continue;
        }
        let coverable = request.lines.iter().all(|entry| {
            lines[entry.line].recipe.ingredients.iter().all(|ingredient| {
                all.get(&ingredient.item)
                    .is_some_and(|r| store.stored_amount(ingredient.item) >= r.total_requested)
            })
        });
        if coverable {
            satisfiable.insert(item, request.clone());
        }
    }
    satisfiable
}

// ---------------------------------------------------------------------------
// Unsatisfiable groups
// ---------------------------------------------------------------------------

/// Partition the remaining over-demanded requests into self-contained
/// groups: two items belong together when some requesting line needs both,
/// closed transitively. Each group can be rationed independently.
///
/// Worklist expansion: pop the smallest remaining item as a seed, keep
/// pulling in the ingredients of every line mentioned by the group so far,
/// stop at a fixpoint, repeat until the pool is empty.
pub fn grouped_unsatisfiable_item_requests<I: ItemId>(
    lines: &[ProductionLine<I>],
    all: &RequestMap<I>,
    simple: &RequestMap<I>,
    satisfiable: &RequestMap<I>,
) -> Vec<RequestMap<I>> {
    let mut pool: RequestMap<I> = all
        .iter()
        .filter(|(item, _)| !simple.contains_key(item) && !satisfiable.contains_key(item))
        .map(|(&item, request)| (item, request.clone()))
        .collect();

    let mut groups = Vec::new();
    while let Some(seed) = pool.pop_first() {
        let mut group = RequestMap::new();
        let mut frontier = vec![seed];
        while let Some((item, request)) = frontier.pop() {
            for entry in &request.lines {
                for ingredient in &lines[entry.line].recipe.ingredients {
                    if let Some(linked) = pool.remove(&ingredient.item) {
                        frontier.push((ingredient.item, linked));
                    }
                }
            }
            group.insert(item, request);
        }
        groups.push(group);
    }
    groups
}

// ===========================================================================
// Tests
// ===========================================================================
