//! Scrollworld - concurrent simulation core for an endless side-scroller
//!
//! Core modules:
//! - `sim`: World state, world streaming, enemies, coins and the event bus
//! - `runtime`: Background workers, the simulation clock and the frontend seam
//! - `settings`: Tunable gameplay and cadence parameters
//! - `error`: Fatal setup errors vs recoverable per-tick faults

pub mod error;
pub mod runtime;
pub mod settings;
pub mod sim;

pub use error::{ConfigError, SetupError, TickError};
pub use settings::SimConfig;

use glam::Vec2;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// World geometry constants (pixels)
pub mod consts {
    /// Player hitbox
    pub const PLAYER_W: f32 = 40.0;
    pub const PLAYER_H: f32 = 60.0;

    /// Enemy hitbox
    pub const ENEMY_W: f32 = 40.0;
    pub const ENEMY_H: f32 = 40.0;

    /// All platforms share one thickness
    pub const PLATFORM_H: f32 = 20.0;
    /// Coins are square
    pub const COIN_SIZE: f32 = 30.0;

    /// Top edge of the ground strip in every segment
    pub const GROUND_Y: f32 = 550.0;

    /// Where a fresh run places the player
    pub const PLAYER_START: (f32, f32) = (50.0, 500.0);
}

/// Axis-aligned overlap test between two rectangles given as (top-left, size).
///
/// Touching edges do not count as overlap.
#[inline]
pub fn rects_overlap(a_pos: Vec2, a_size: Vec2, b_pos: Vec2, b_size: Vec2) -> bool {
    a_pos.x < b_pos.x + b_size.x
        && b_pos.x < a_pos.x + a_size.x
        && a_pos.y < b_pos.y + b_size.y
        && b_pos.y < a_pos.y + a_size.y
}

/// Lock a mutex, recovering the data if another worker panicked while holding it.
///
/// Workers never leave shared collections half-written across a panic point, so
/// the inner value is still consistent.
#[inline]
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
