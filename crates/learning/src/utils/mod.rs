//! Internal utilities for the engine.

pub mod clock;
pub mod validation;

pub use clock::{Clock, ManualClock, SystemClock};
pub use validation::*;
