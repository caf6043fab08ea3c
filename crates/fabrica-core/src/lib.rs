//! Fabrica Core -- the production-scheduling core for factory simulations.
//!
//! This crate advances a set of production lines against a shared item store
//! by whole ticks. A line pairs a recipe with a pool of identical producers;
//! the store keeps per-item amounts under per-item capacity bounds. The
//! scheduler decides which idle lines may start, rations scarce shared
//! ingredients across competing lines, advances active producers, and
//! deposits finished output back into storage.
//!
//! # Seven-Phase Step
//!
//! Each tick of [`scheduler::update`] runs the following phases:
//!
//! 1. **Activate raw lines** -- idle lines with no ingredients start as many
//!    producers as their future output can fit.
//! 2. **Collect & partition** -- tabulate per-item ingredient demand and
//!    split it into simple, satisfiable-mixed and unsatisfiable groups.
//! 3. **Simple requests** -- uncontested demand, withdrawn in full.
//! 4. **Satisfiable mixed requests** -- contested but fully coverable
//!    demand, withdrawn in full per line.
//! 5. **Unsatisfiable groups** -- over-demanded ingredients rationed
//!    proportionally across every competing line.
//! 6. **Advance** -- active lines gain one tick of progress; completed
//!    cycles deposit results and reset, or stall on full storage.
//! 7. **Deposit retry** -- output-stalled lines get one more chance to
//!    offload, without gaining progress.
//!
//! # Key Types
//!
//! - [`recipe::Recipe`] / [`recipe::ProductionLine`] -- the caller-owned
//!   production model the scheduler mutates in place.
//! - [`store::ItemStore`] -- per-item capacity and stored-amount keeper with
//!   well-defined clamping when capacities shrink.
//! - [`store::StrictItemStore`] -- validating decorator that turns the plain
//!   store's clamping into hard failures.
//! - [`request`] -- the pure demand classifiers, separately callable so a
//!   caller can inspect scheduling decisions without applying them.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for the deterministic
//!   rationing arithmetic.
//!
//! The core holds no state of its own between calls: all state lives on the
//! lines and the store, both owned by the caller. Execution is
//! single-threaded and synchronous; iteration over lines and over every
//! internal scratch map is deterministic for identical inputs.

#[cfg(feature = "data-loader")]
pub mod data_loader;
pub mod fixed;
pub mod id;
pub mod recipe;
pub mod request;
pub mod scheduler;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
