use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
///
/// The one place the core needs non-integer arithmetic is the proportional
/// rationing ratio; it runs on `Fixed64` so identical inputs produce
/// identical schedules on every platform.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;
