//! Simulation core
//!
//! Shared world state plus the four worker bodies that operate on it:
//! - `stream`: extends the level ahead of the player and reaps what's behind
//! - `enemies`: bounded enemy population, patrol and contact detection
//! - `coins`: pickup scanning
//! - `events`: FIFO bus and the single applier of score/lives changes
//!
//! Player physics (`player`) and the render view (`snapshot`) are driven by
//! the simulation clock in `runtime`.

pub mod coins;
pub mod enemies;
pub mod events;
pub mod geometry;
pub mod player;
pub mod snapshot;
pub mod state;
pub mod stream;

pub use coins::CoinField;
pub use enemies::{
    Contact, Enemy, EnemyPopulation, EnemyState, Permit, PopulationPermits, classify_contact,
    retire_enemy,
};
pub use events::{EventApplier, EventSender, GameEvent, event_bus};
pub use geometry::Rect;
pub use player::{Facing, Movement, Player};
pub use snapshot::{EnemyView, FrameSnapshot, Hud};
pub use state::{Coin, Impulse, Platform, PlayerBody, SharedWorld, SurfaceKind, WorldState};
pub use stream::{Segment, WorldStream, generate_segment};
