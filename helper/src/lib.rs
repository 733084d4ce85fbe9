//! Small, dependency-light helpers shared across the chain-state crates:
//! integer casts, numeric midpoint/median helpers, wall-clock time, and
//! default data-directory resolution.
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "cast")]
pub mod cast;

#[cfg(feature = "fs")]
pub mod fs;

#[cfg(feature = "num")]
pub mod num;

#[cfg(feature = "time")]
pub mod time;
