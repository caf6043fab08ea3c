//! Item storage: per-item capacity and stored-amount bookkeeping.
//!
//! Two stores share one capability, [`ItemStorage`]:
//!
//! - [`ItemStore`] clamps: withdrawals and deposits move as much as
//!   availability allows and report the amount actually moved.
//! - [`StrictItemStore`] forwards to a wrapped store but fails hard on any
//!   request that would have been clamped.
//!
//! # Clamping rule
//!
//! The observable amount of an item is `min(raw_stored, capacity)`, with the
//! capacity read from the current settings on every query. When a capacity
//! shrinks below the raw amount the surplus becomes invisible but is not
//! deleted; growing the capacity back re-reveals it. Capacity manipulation
//! is the caller's lever, and deleting overflow is the caller's job.

use crate::id::ItemId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced by the storage layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError<I: ItemId> {
    /// Withdraw and deposit amounts must be positive.
    #[error("amount must be positive")]
    ZeroAmount,
    /// Strict mode: a withdrawal asked for more than is stored.
    #[error("withdrawal of {requested} exceeds stored amount {stored} for {item:?}")]
    InsufficientStored { item: I, requested: u32, stored: u32 },
    /// Strict mode: a deposit asked for more room than is free.
    #[error("deposit of {requested} exceeds free capacity {free} for {item:?}")]
    InsufficientCapacity { item: I, requested: u32, free: u32 },
}

// ---------------------------------------------------------------------------
// Storage capability
// ---------------------------------------------------------------------------

/// The capability shared by the plain and strict stores. The scheduler and
/// the request classifiers are generic over this, so scheduling code can run
/// against either variant.
pub trait ItemStorage<I: ItemId> {
    /// The current per-item capacity bounds.
    fn capacity_settings(&self) -> &BTreeMap<I, u32>;

    /// The amount observable right now: the raw stored amount clamped by
    /// the current capacity. Unknown items read as 0.
    fn stored_amount(&self, item: I) -> u32;

    /// Room left for `item` under the current capacity.
    fn free_capacity(&self, item: I) -> u32;

    /// Take `amount` of `item`. Returns the amount actually withdrawn.
    fn withdraw(&mut self, item: I, amount: u32) -> Result<u32, StoreError<I>>;

    /// Add `amount` of `item`. Returns the amount actually deposited.
    fn deposit(&mut self, item: I, amount: u32) -> Result<u32, StoreError<I>>;
}

// ---------------------------------------------------------------------------
// Plain store
// ---------------------------------------------------------------------------

/// Per-item capacity and stored-amount keeper.
///
/// Capacities are readable and mutable between calls via
/// [`ItemStore::capacity_settings_mut`]; every query reads the current
/// value, nothing is snapshotted at construction. Items without a capacity
/// entry are unknown and read as 0 until an entry appears.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStore<I: ItemId> {
    capacities: BTreeMap<I, u32>,
    /// Raw amounts; may exceed the current capacity after a shrink. The
    /// surplus stays hidden until the capacity grows back.
    stored: BTreeMap<I, u32>,
}

impl<I: ItemId> ItemStore<I> {
    /// Create a store over the given capacity settings. Items present in
    /// the map start empty; items added to the map later gain a zero stored
    /// amount on first use.
    pub fn new(capacities: BTreeMap<I, u32>) -> Self {
        let stored = capacities.keys().map(|&item| (item, 0)).collect();
        Self { capacities, stored }
    }

    /// Convenience: every listed item at the same capacity.
    pub fn with_uniform_capacity(items: impl IntoIterator<Item = I>, capacity: u32) -> Self {
        Self::new(items.into_iter().map(|item| (item, capacity)).collect())
    }

    /// Mutable access to the capacity settings, the caller's lever for
    /// growing and shrinking item bounds between scheduler calls.
    pub fn capacity_settings_mut(&mut self) -> &mut BTreeMap<I, u32> {
        &mut self.capacities
    }

    /// Set one item's capacity bound.
    pub fn set_capacity(&mut self, item: I, capacity: u32) {
        self.capacities.insert(item, capacity);
    }

    fn capacity(&self, item: I) -> u32 {
        self.capacities.get(&item).copied().unwrap_or(0)
    }

    fn raw(&self, item: I) -> u32 {
        self.stored.get(&item).copied().unwrap_or(0)
    }
}

impl<I: ItemId> ItemStorage<I> for ItemStore<I> {
    fn capacity_settings(&self) -> &BTreeMap<I, u32> {
        &self.capacities
    }

    fn stored_amount(&self, item: I) -> u32 {
        self.raw(item).min(self.capacity(item))
    }

    fn free_capacity(&self, item: I) -> u32 {
        self.capacity(item).saturating_sub(self.stored_amount(item))
    }

    fn withdraw(&mut self, item: I, amount: u32) -> Result<u32, StoreError<I>> {
        if amount == 0 {
            return Err(StoreError::ZeroAmount);
        }
        let withdrawn = amount.min(self.stored_amount(item));
        if withdrawn > 0 {
            *self.stored.entry(item).or_insert(0) -= withdrawn;
        }
        Ok(withdrawn)
    }

    fn deposit(&mut self, item: I, amount: u32) -> Result<u32, StoreError<I>> {
        if amount == 0 {
            return Err(StoreError::ZeroAmount);
        }
        let deposited = amount.min(self.free_capacity(item));
        if deposited > 0 {
            *self.stored.entry(item).or_insert(0) += deposited;
        }
        Ok(deposited)
    }
}

// ---------------------------------------------------------------------------
// Strict store
// ---------------------------------------------------------------------------

/// Thin forwarding wrapper that replaces the plain store's clamping with
/// hard failures. Running scheduling code against a strict store surfaces
/// an over-withdrawal at the call site instead of as a wrong balance later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrictItemStore<I: ItemId> {
    inner: ItemStore<I>,
}

impl<I: ItemId> StrictItemStore<I> {
    pub fn new(inner: ItemStore<I>) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &ItemStore<I> {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut ItemStore<I> {
        &mut self.inner
    }

    pub fn into_inner(self) -> ItemStore<I> {
        self.inner
    }
}

impl<I: ItemId> ItemStorage<I> for StrictItemStore<I> {
    fn capacity_settings(&self) -> &BTreeMap<I, u32> {
        self.inner.capacity_settings()
    }

    fn stored_amount(&self, item: I) -> u32 {
        self.inner.stored_amount(item)
    }

    fn free_capacity(&self, item: I) -> u32 {
        self.inner.free_capacity(item)
    }

    fn withdraw(&mut self, item: I, amount: u32) -> Result<u32, StoreError<I>> {
        let stored = self.inner.stored_amount(item);
        if amount > stored {
            return Err(StoreError::InsufficientStored {
                item,
                requested: amount,
                stored,
            });
        }
        self.inner.withdraw(item, amount)
    }

    fn deposit(&mut self, item: I, amount: u32) -> Result<u32, StoreError<I>> {
        let free = self.inner.free_capacity(item);
        if amount > free {
            return Err(StoreError::InsufficientCapacity {
                item,
                requested: amount,
                free,
            });
        }
        self.inner.deposit(item, amount)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
