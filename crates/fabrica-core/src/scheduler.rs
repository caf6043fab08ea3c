//! The step-wise production advancer.
//!
//! [`update`] advances the caller's production lines against shared item
//! storage by whole ticks. Each tick runs seven phases in a fixed order:
//!
//! 1. **Activate raw lines** -- idle lines with no ingredients start as
//!    many producers as their future output can fit.
//! 2. **Collect & partition** -- tabulate per-item demand and split it into
//!    simple, satisfiable-mixed and unsatisfiable groups ([`crate::request`]).
//! 3. **Simple requests** -- withdrawn in full, one line per item.
//! 4. **Satisfiable mixed requests** -- withdrawn in full, grouped per line.
//! 5. **Unsatisfiable groups** -- scarce ingredients rationed
//!    proportionally; the floor's leftover slack idles for this tick.
//! 6. **Advance** -- every active line gains one tick of progress; a
//!    completed cycle deposits its results and resets, or stalls at full
//!    progress while storage has no room.
//! 7. **Deposit retry** -- output-stalled lines get one more deposit
//!    attempt, without gaining progress.
//!
//! Phases 3-5 must run in exactly this order: each withdraws from the
//! store, and the partition of phase 2 was computed against the
//! pre-withdrawal state.
//!
//! The scheduler owns no state; everything lives on the lines and the
//! store. With `debug` unset it never fails on its own -- the only error
//! surface is the storage layer (strict stores). With `debug` set it runs a
//! development-time assertion suite and fails hard on any internal
//! inconsistency.

use std::collections::BTreeMap;

use crate::fixed::{Fixed64, Ticks};
use crate::id::ItemId;
use crate::recipe::ProductionLine;
use crate::request::{
    RequestMap, collect_item_requests, grouped_unsatisfiable_item_requests, simple_item_requests,
    satisfiable_mixed_item_requests,
};
use crate::store::{ItemStorage, StoreError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors surfaced by [`update`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpdateError<I: ItemId> {
    /// Debug mode: the time delta must be a positive tick count.
    #[error("time delta must be a positive number of ticks")]
    InvalidTimeDelta,
    /// The storage layer refused an operation.
    #[error(transparent)]
    Store(#[from] StoreError<I>),
    /// Debug mode: an internal consistency check failed.
    #[error("scheduler invariant violated: {0}")]
    InvariantViolated(String),
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Advance `lines` against `store` by `time_delta` ticks.
///
/// Returns the unconsumed remainder of the delta. The step size is one
/// tick, so the remainder is currently always 0; the return value exists
/// for future sub-tick stepping.
///
/// Lines are processed in slice order and every internal map iterates in a
/// deterministic order, so identical inputs produce identical schedules.
pub fn update<I: ItemId, S: ItemStorage<I>>(
    lines: &mut [ProductionLine<I>],
    store: &mut S,
    time_delta: Ticks,
    debug: bool,
) -> Result<Ticks, UpdateError<I>> {
    if debug && time_delta == 0 {
        return Err(UpdateError::InvalidTimeDelta);
    }
    for _ in 0..time_delta {
        step(lines, store, debug)?;
    }
    Ok(0)
}

// ---------------------------------------------------------------------------
// Single tick
// ---------------------------------------------------------------------------

fn step<I: ItemId, S: ItemStorage<I>>(
    lines: &mut [ProductionLine<I>],
    store: &mut S,
    debug: bool,
) -> Result<(), UpdateError<I>> {
    // Phase 1: raw lines start on output room alone.
    activate_raw_lines(lines, store);

    // Phase 2: partition demand against the pre-withdrawal store state.
    let all = collect_item_requests(lines, store);
    let simple = simple_item_requests(lines, &all);
    let satisfiable = satisfiable_mixed_item_requests(lines, &all, &simple, store);
    let groups = grouped_unsatisfiable_item_requests(lines, &all, &simple, &satisfiable);

    // Phases 3-5: withdraw and activate, class by class.
    apply_simple_requests(lines, store, &simple, debug)?;
    apply_satisfiable_requests(lines, store, &satisfiable, debug)?;
    for group in &groups {
        ration_group(lines, store, group, debug)?;
    }

    // Phase 6: progress and deposits.
    advance(lines, store, debug)?;

    // Phase 7: one more chance for output-stalled lines.
    retry_stalled_deposits(lines, store, debug)?;

    if debug {
        check_line_invariants(lines)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Phase 1: raw activation
// ---------------------------------------------------------------------------

/// Idle no-ingredient lines start as many producers as the tightest
/// per-result output room allows, capped by the pool size. Producers whose
/// future output could not fit are not started at all.
fn activate_raw_lines<I: ItemId, S: ItemStorage<I>>(lines: &mut [ProductionLine<I>], store: &S) {
    for line in lines.iter_mut() {
        if line.is_idle() && line.recipe.is_raw() {
            line.active_producers = line.max_startable(store);
        }
    }
}

// ---------------------------------------------------------------------------
// Phase 3: simple requests
// ---------------------------------------------------------------------------

/// Simple requests are granted verbatim: the single entry's amount is
/// withdrawn and its line starts the requested producers. The collector
/// guarantees these withdrawals fully succeed.
fn apply_simple_requests<I: ItemId, S: ItemStorage<I>>(
    lines: &mut [ProductionLine<I>],
    store: &mut S,
    simple: &RequestMap<I>,
    debug: bool,
) -> Result<(), UpdateError<I>> {
    for (&item, request) in simple {
        let [entry] = request.lines.as_slice() else {
            if debug {
                return Err(UpdateError::InvariantViolated(format!(
                    "simple request for {item:?} has {} entries",
                    request.lines.len()
                )));
            }
            continue;
        };
        withdraw_all(store, item, entry.requested_amount, debug)?;
        lines[entry.line].active_producers = entry.requested_producers;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Phase 4: satisfiable mixed requests
// ---------------------------------------------------------------------------

/// Satisfiable entries are regrouped per line; each line withdraws every
/// item it has in the set and starts its requested producers. All entries
/// of one line carry the same producer count.
fn apply_satisfiable_requests<I: ItemId, S: ItemStorage<I>>(
    lines: &mut [ProductionLine<I>],
    store: &mut S,
    satisfiable: &RequestMap<I>,
    debug: bool,
) -> Result<(), UpdateError<I>> {
    let mut per_line: BTreeMap<usize, (u32, Vec<(I, u32)>)> = BTreeMap::new();
    for (&item, request) in satisfiable {
        for entry in &request.lines {
            let (producers, withdrawals) = per_line.entry(entry.line).or_default();
            *producers = entry.requested_producers;
            withdrawals.push((item, entry.requested_amount));
        }
    }

    for (&line_index, (producers, withdrawals)) in &per_line {
        for &(item, amount) in withdrawals {
            withdraw_all(store, item, amount, debug)?;
        }
        lines[line_index].active_producers = *producers;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Phase 5: proportional rationing
// ---------------------------------------------------------------------------

/// Ration one unsatisfiable group.
///
/// The group's tightest item fixes a ratio strictly below one; every line
/// in the group starts `floor(requested_producers * ratio)` producers and
/// pays full ingredients for them. Scarcity is shared evenly across all
/// competing consumers; no line is preferred.
fn ration_group<I: ItemId, S: ItemStorage<I>>(
    lines: &mut [ProductionLine<I>],
    store: &mut S,
    group: &RequestMap<I>,
    debug: bool,
) -> Result<(), UpdateError<I>> {
    let mut ratio = Fixed64::from_num(1);
    for (&item, request) in group {
        let available =
            Fixed64::from_num(store.stored_amount(item)) / Fixed64::from_num(request.total_requested);
        ratio = ratio.min(available);
    }

    // One activation count per line, even when the line appears under
    // several of the group's items.
    let mut per_line: BTreeMap<usize, u32> = BTreeMap::new();
    for request in group.values() {
        for entry in &request.lines {
            per_line.entry(entry.line).or_insert(entry.requested_producers);
        }
    }

    for (&line_index, &requested) in &per_line {
        let to_activate: u32 = (Fixed64::from_num(requested) * ratio).to_num();
        if to_activate == 0 {
            continue;
        }
        for ingredient in &lines[line_index].recipe.ingredients {
            withdraw_all(store, ingredient.item, ingredient.amount * to_activate, debug)?;
        }
        lines[line_index].active_producers = to_activate;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Phase 6: advance
// ---------------------------------------------------------------------------

/// Every active line gains one tick of progress, capped at the recipe
/// duration. A line at full progress tries to deposit.
fn advance<I: ItemId, S: ItemStorage<I>>(
    lines: &mut [ProductionLine<I>],
    store: &mut S,
    debug: bool,
) -> Result<(), UpdateError<I>> {
    for line in lines.iter_mut() {
        if line.is_idle() {
            continue;
        }
        if line.production_progress < line.recipe.duration {
            line.production_progress += 1;
        }
        if line.production_progress == line.recipe.duration {
            deposit_results(line, store, debug)?;
        }
    }
    Ok(())
}

/// Deposit as many completed producers' outputs as storage can absorb.
///
/// Producers are integral: each deposits its complete result bundle or
/// nothing. The line resets once its last active producer has offloaded;
/// until then it stays output-stalled at full progress.
fn deposit_results<I: ItemId, S: ItemStorage<I>>(
    line: &mut ProductionLine<I>,
    store: &mut S,
    debug: bool,
) -> Result<(), UpdateError<I>> {
    let deliverable = line
        .active_producers
        .min(line.recipe.max_result_handleable(store));
    if deliverable == 0 {
        return Ok(());
    }
    for product in &line.recipe.results {
        deposit_all(store, product.item, product.amount * deliverable, debug)?;
    }
    line.active_producers -= deliverable;
    if line.active_producers == 0 {
        line.production_progress = 0;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Phase 7: deposit retry
// ---------------------------------------------------------------------------

/// A second deposit pass over every line still holding finished output,
/// identical to the phase 6 deposit but without advancing progress.
fn retry_stalled_deposits<I: ItemId, S: ItemStorage<I>>(
    lines: &mut [ProductionLine<I>],
    store: &mut S,
    debug: bool,
) -> Result<(), UpdateError<I>> {
    for line in lines.iter_mut() {
        if line.active_producers > 0 && line.production_progress == line.recipe.duration {
            deposit_results(line, store, debug)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Store helpers and debug checks
// ---------------------------------------------------------------------------

/// Withdraw an amount the partition has proven available. In debug mode a
/// short withdrawal is an internal inconsistency and fails hard.
fn withdraw_all<I: ItemId, S: ItemStorage<I>>(
    store: &mut S,
    item: I,
    amount: u32,
    debug: bool,
) -> Result<(), UpdateError<I>> {
    let withdrawn = store.withdraw(item, amount)?;
    if debug && withdrawn < amount {
        return Err(UpdateError::InvariantViolated(format!(
            "withdrew {withdrawn} of {amount} requested {item:?}"
        )));
    }
    Ok(())
}

/// Deposit an amount the deliverable count has proven to fit.
fn deposit_all<I: ItemId, S: ItemStorage<I>>(
    store: &mut S,
    item: I,
    amount: u32,
    debug: bool,
) -> Result<(), UpdateError<I>> {
    let deposited = store.deposit(item, amount)?;
    if debug && deposited < amount {
        return Err(UpdateError::InvariantViolated(format!(
            "deposited {deposited} of {amount} offered {item:?}"
        )));
    }
    Ok(())
}

fn check_line_invariants<I: ItemId>(lines: &[ProductionLine<I>]) -> Result<(), UpdateError<I>> {
    for (index, line) in lines.iter().enumerate() {
        if line.active_producers > line.total_producers {
            return Err(UpdateError::InvariantViolated(format!(
                "line {index}: {} active of {} total producers",
                line.active_producers, line.total_producers
            )));
        }
        if line.production_progress > line.recipe.duration {
            return Err(UpdateError::InvariantViolated(format!(
                "line {index}: progress {} past duration {}",
                line.production_progress, line.recipe.duration
            )));
        }
        if line.is_idle() && line.production_progress != 0 {
            return Err(UpdateError::InvariantViolated(format!(
                "line {index}: idle at progress {}",
                line.production_progress
            )));
        }
    }
    Ok(())
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::ProductionLine;
    use crate::store::{ItemStore, ItemStorage};
    use crate::test_utils::*;

    #[test]
    fn zero_delta_fails_in_debug_mode_only() {
        let mut store = store_with_capacity(1024);
        let mut lines = vec![ProductionLine::new(tree_harvest(), 4)];
        assert_eq!(
            update(&mut lines, &mut store, 0, true),
            Err(UpdateError::InvalidTimeDelta)
        );
        assert_eq!(update(&mut lines, &mut store, 0, false), Ok(0));
        assert!(lines[0].is_idle());
    }

    #[test]
    fn raw_activation_is_capped_by_output_room() {
        let mut store = ItemStore::with_uniform_capacity([tree_trunk()], 3);
        let mut lines = vec![ProductionLine::new(tree_harvest(), 4)];

        update(&mut lines, &mut store, 1, true).unwrap();
        assert_eq!(lines[0].active_producers, 3);
        assert_eq!(lines[0].production_progress, 1);
    }

    #[test]
    fn raw_line_with_no_room_stays_idle() {
        let mut store = ItemStore::with_uniform_capacity([tree_trunk()], 0);
        let mut lines = vec![ProductionLine::new(tree_harvest(), 4)];

        update(&mut lines, &mut store, 16, true).unwrap();
        assert!(lines[0].is_idle());
        assert_eq!(lines[0].production_progress, 0);
        assert_eq!(store.stored_amount(tree_trunk()), 0);
    }

    #[test]
    fn simple_request_withdraws_and_activates() {
        let mut store = store_with_capacity(1024);
        seed(&mut store, &[(tree_trunk(), 32)]);
        let mut lines = vec![ProductionLine::new(process_tree_trunk(), 128)];

        update(&mut lines, &mut store, 1, true).unwrap();
        assert_eq!(lines[0].active_producers, 32);
        assert_eq!(lines[0].production_progress, 1);
        assert_eq!(store.stored_amount(tree_trunk()), 0);
    }

    #[test]
    fn rationing_splits_scarcity_proportionally() {
        // 6 planks stored; nail line wants 6, table line wants 6 more.
        let mut store = store_with_capacity(1024);
        seed(
            &mut store,
            &[(wood_plank(), 6), (wooden_nail(), 12), (tree_bark(), 64)],
        );
        let mut lines = vec![
            ProductionLine::new(craft_wooden_nails(), 128),
            ProductionLine::new(assemble_table(), 128),
        ];

        update(&mut lines, &mut store, 1, true).unwrap();

        // Ratio 6/12: the nail line starts 3 producers, the table line
        // rounds down to none. The nail cycle is one tick, so its 3
        // producers already deposited and reset.
        assert!(lines[0].is_idle());
        assert!(lines[1].is_idle());
        assert_eq!(store.stored_amount(wood_plank()), 3);
        assert_eq!(store.stored_amount(wooden_nail()), 12 + 3 * 24);
        assert_eq!(store.stored_amount(tree_bark()), 64);
    }

    #[test]
    fn output_stall_holds_state_until_room_appears() {
        // Bark room admits one producer at activation, then fills up
        // externally before the cycle completes.
        let mut store = store_with_capacity(1024);
        seed(&mut store, &[(tree_trunk(), 1), (tree_bark(), 1000)]);
        let mut lines = vec![ProductionLine::new(process_tree_trunk(), 4)];

        update(&mut lines, &mut store, 1, true).unwrap();
        assert_eq!(lines[0].active_producers, 1);

        // Fill the remaining bark room while the producer works.
        store.deposit(tree_bark(), 24).unwrap();
        update(&mut lines, &mut store, 5, true).unwrap();
        assert_eq!(lines[0].active_producers, 1);
        assert_eq!(lines[0].production_progress, lines[0].recipe.duration);
        assert_eq!(store.stored_amount(wood_plank()), 0);

        // Freeing bark room lets the stalled producer offload and reset.
        store.withdraw(tree_bark(), 512).unwrap();
        update(&mut lines, &mut store, 1, true).unwrap();
        assert!(lines[0].is_idle());
        assert_eq!(lines[0].production_progress, 0);
        assert_eq!(store.stored_amount(wood_plank()), 8);
        assert_eq!(store.stored_amount(tree_bark()), 1024 - 512 + 16);
    }

    #[test]
    fn partial_deposit_keeps_the_remainder_stalled() {
        // Four harvesters start into room for four trunks, but two of the
        // slots are taken externally before the cycle completes.
        let mut store = ItemStore::with_uniform_capacity([tree_trunk()], 1024);
        seed(&mut store, &[(tree_trunk(), 1020)]);
        let mut lines = vec![ProductionLine::new(tree_harvest(), 4)];

        update(&mut lines, &mut store, 1, true).unwrap();
        assert_eq!(lines[0].active_producers, 4);

        store.deposit(tree_trunk(), 2).unwrap();
        update(&mut lines, &mut store, 15, true).unwrap();

        // Two producers offloaded; two hold finished output.
        assert_eq!(store.stored_amount(tree_trunk()), 1024);
        assert_eq!(lines[0].active_producers, 2);
        assert_eq!(lines[0].production_progress, lines[0].recipe.duration);

        store.withdraw(tree_trunk(), 100).unwrap();
        update(&mut lines, &mut store, 1, true).unwrap();
        assert!(lines[0].is_idle());
        assert_eq!(store.stored_amount(tree_trunk()), 926);
    }

    #[test]
    fn update_runs_against_a_strict_store() {
        let mut store = crate::store::StrictItemStore::new(store_with_capacity(1024));
        seed(&mut store, &[(tree_trunk(), 32)]);
        let mut lines = vec![ProductionLine::new(process_tree_trunk(), 128)];

        update(&mut lines, &mut store, 4, true).unwrap();
        assert_eq!(store.stored_amount(wood_plank()), 256);
        assert_eq!(store.stored_amount(tree_bark()), 512);
        assert!(lines[0].is_idle());
    }

    #[test]
    fn debug_flags_externally_corrupted_lines() {
        let mut store = store_with_capacity(1024);
        let mut line = ProductionLine::new(process_tree_trunk(), 4);
        line.production_progress = 2; // idle but mid-cycle
        let mut lines = vec![line];

        let result = update(&mut lines, &mut store, 1, true);
        assert!(matches!(result, Err(UpdateError::InvariantViolated(_))));
    }
}
