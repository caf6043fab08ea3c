use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

/// Bound for caller-supplied item identifiers.
///
/// The item type is the caller's domain; the core only needs it to be a
/// cheap value type. `Ord` (not just `Hash`) because every scratch map in
/// the scheduler is a `BTreeMap`, which makes iteration deterministic.
pub trait ItemId: Copy + Eq + Ord + Hash + Debug {}

impl<T: Copy + Eq + Ord + Hash + Debug> ItemId for T {}

/// Ready-made item identifier for closed item domains. Cheap to copy and
/// compare; used by the data loader, test fixtures and benches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemTag(pub u32);
