//! Triage core: ward occupancy, acuity ranking, and the live snapshot.

pub mod capacity;
pub mod ranking;
pub mod snapshot;
pub mod types;

pub use capacity::*;
pub use ranking::*;
pub use snapshot::*;
pub use types::*;
