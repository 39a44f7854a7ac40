//! Threaded runtime
//!
//! - `worker`: fixed-cadence background threads with cooperative shutdown
//! - `clock`: the render/input loop that owns the workers
//! - `frontend`: the render/input seam and a headless autopilot

pub mod clock;
pub mod frontend;
pub mod worker;

pub use clock::{RunSummary, SimulationClock, StopReason};
pub use frontend::{AutoPilot, Frontend, InputState};
pub use worker::Worker;
