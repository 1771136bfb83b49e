//! Sample-point arbitration.
//!
//! When several source cells project onto the same discretized sample
//! location during resampling, an arbitrator decides which value survives.
//! Both policies are pure decision functions with no shared mutable state,
//! so independent samples can be arbitrated concurrently.

pub mod arbitrator;
pub mod opacity;

pub use arbitrator::{ArbitrationMode, Direction, SamplePointArbitrator};
pub use opacity::OpacityMap;
