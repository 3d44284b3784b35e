//! Temporal membership snapshots for control entries.
//!
//! Rebuilds, for any calendar month, the set of control entries alive during
//! that month, counts them, and stores the result as a replaceable snapshot.

pub mod aggregate;
pub mod clock;
pub mod config;
pub mod control_entry;
pub mod engine;
pub mod error;
pub mod rng;
pub mod sample_data;
pub mod snapshot;
pub mod store;
pub mod types;
pub mod window;
