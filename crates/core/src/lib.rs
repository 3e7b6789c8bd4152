//! Domain core for accelerator-gated synthesis dispatch.
//!
//! Pure logic and the seams the other crates plug into: job records, the
//! admission gate, store traits (with in-memory implementations),
//! capability traits, and the progress telemetry contract.

pub mod admission;
pub mod capability;
pub mod codec;
pub mod error;
pub mod job;
pub mod memory;
pub mod output;
pub mod payload;
pub mod progress;
pub mod store;
pub mod types;
