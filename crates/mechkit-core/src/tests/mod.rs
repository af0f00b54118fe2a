//! Crate-level tests for the module runtime.
//!
//! - `helpers.rs`: chassis factories and small accessors
//! - `integration.rs`: end-to-end scenarios through `Chassis`
//! - `determinism.rs`: identical inputs give identical snapshots
//! - `properties.rs`: proptest properties of the stack, arbitration and inventory

mod helpers;

pub use helpers::*;
