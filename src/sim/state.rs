//! Shared world state and the simulation context
//!
//! [`SharedWorld`] is built once per run and handed to every worker by `Arc`.
//! Each live collection sits behind its own lock; the aggregate record
//! ([`WorldState`]) has a separate one. No lock is ever held across a sleep,
//! and no code path holds two of them at once.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Instant;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::enemies::Enemy;
use super::geometry::Rect;
use crate::consts::*;
use crate::lock;
use crate::settings::SimConfig;

/// Surface style, only matters to spawning and the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceKind {
    Ground,
    Floating,
}

/// A static platform. Never changes after generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub rect: Rect,
    pub kind: SurfaceKind,
}

impl Platform {
    pub fn ground(x: f32, width: f32) -> Self {
        Self {
            rect: Rect::new(x, GROUND_Y, width, PLATFORM_H),
            kind: SurfaceKind::Ground,
        }
    }

    pub fn floating(x: f32, y: f32, width: f32) -> Self {
        Self {
            rect: Rect::new(x, y, width, PLATFORM_H),
            kind: SurfaceKind::Floating,
        }
    }

    pub fn is_floating(&self) -> bool {
        self.kind == SurfaceKind::Floating
    }
}

/// A collectible coin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    pub id: u32,
    pub rect: Rect,
    /// Cleared exactly once, on collection
    pub active: bool,
    /// Renderer bobbing phase (cosmetic)
    pub float_phase: f32,
}

impl Coin {
    pub fn new(id: u32, x: f32, y: f32, float_phase: f32) -> Self {
        Self {
            id,
            rect: Rect::new(x, y, COIN_SIZE, COIN_SIZE),
            active: true,
            float_phase,
        }
    }

    /// Mark the coin collected. Returns `false` if it already was.
    pub fn collect(&mut self) -> bool {
        std::mem::replace(&mut self.active, false)
    }
}

/// Player position and velocity. Only the simulation clock writes these.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerBody {
    pub pos: Vec2,
    pub vel: Vec2,
}

impl PlayerBody {
    pub fn bounds(&self) -> Rect {
        Rect::new(self.pos.x, self.pos.y, PLAYER_W, PLAYER_H)
    }
}

impl Default for PlayerBody {
    fn default() -> Self {
        Self {
            pos: Vec2::new(PLAYER_START.0, PLAYER_START.1),
            vel: Vec2::ZERO,
        }
    }
}

/// Velocity change requested by the event applier, consumed by the clock on
/// its next physics step.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Impulse {
    /// Horizontal displacement
    pub dx: f32,
    /// Vertical velocity override (latest wins)
    pub vy: Option<f32>,
}

impl Impulse {
    pub fn merge(self, later: Impulse) -> Impulse {
        Impulse {
            dx: self.dx + later.dx,
            vy: later.vy.or(self.vy),
        }
    }
}

/// Aggregate run state guarded by the state lock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldState {
    pub player: PlayerBody,
    pub camera_x: f32,
    /// Right edge of generated geometry; never decreases
    pub furthest_generated_x: f32,
    pub score: u64,
    pub coins: u64,
    /// Run ends once this reaches 0
    pub lives: i32,
    pub invulnerable_until: Option<Instant>,
    pub pending_impulse: Option<Impulse>,
}

impl WorldState {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            player: PlayerBody::default(),
            camera_x: 0.0,
            furthest_generated_x: 0.0,
            score: 0,
            coins: 0,
            lives: config.starting_lives,
            invulnerable_until: None,
            pending_impulse: None,
        }
    }

    pub fn is_invulnerable(&self, now: Instant) -> bool {
        self.invulnerable_until.is_some_and(|until| now < until)
    }

    pub fn push_impulse(&mut self, impulse: Impulse) {
        self.pending_impulse = Some(match self.pending_impulse {
            Some(pending) => pending.merge(impulse),
            None => impulse,
        });
    }
}

/// Everything the workers share for one run
pub struct SharedWorld {
    pub config: SimConfig,
    /// Run seed; workers derive their own RNG streams from it
    pub seed: u64,
    state: Mutex<WorldState>,
    platforms: Mutex<Vec<Platform>>,
    coins: Mutex<Vec<Coin>>,
    enemies: Mutex<Vec<Enemy>>,
    running: AtomicBool,
    next_id: AtomicU32,
}

impl SharedWorld {
    pub fn new(config: SimConfig) -> Self {
        let seed = config.resolve_seed();
        Self::with_seed(config, seed)
    }

    pub fn with_seed(config: SimConfig, seed: u64) -> Self {
        let state = WorldState::new(&config);
        Self {
            config,
            seed,
            state: Mutex::new(state),
            platforms: Mutex::new(Vec::new()),
            coins: Mutex::new(Vec::new()),
            enemies: Mutex::new(Vec::new()),
            running: AtomicBool::new(true),
            next_id: AtomicU32::new(1),
        }
    }

    /// Consistent copy of the aggregate state
    pub fn read(&self) -> WorldState {
        *lock(&self.state)
    }

    /// Apply a state transition atomically
    pub fn mutate<R>(&self, f: impl FnOnce(&mut WorldState) -> R) -> R {
        f(&mut lock(&self.state))
    }

    pub fn with_platforms<R>(&self, f: impl FnOnce(&mut Vec<Platform>) -> R) -> R {
        f(&mut lock(&self.platforms))
    }

    pub fn with_coins<R>(&self, f: impl FnOnce(&mut Vec<Coin>) -> R) -> R {
        f(&mut lock(&self.coins))
    }

    pub fn with_enemies<R>(&self, f: impl FnOnce(&mut Vec<Enemy>) -> R) -> R {
        f(&mut lock(&self.enemies))
    }

    /// Point-in-time copy of the platform set
    pub fn platforms_snapshot(&self) -> Vec<Platform> {
        lock(&self.platforms).clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Ask every worker to wind down. Idempotent.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Allocate a new entity id
    pub fn next_entity_id(&self) -> u32 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_coin_collects_once() {
        let mut coin = Coin::new(1, 0.0, 0.0, 0.0);
        assert!(coin.collect());
        assert!(!coin.collect());
        assert!(!coin.active);
    }

    #[test]
    fn test_impulse_merge() {
        let knock = Impulse { dx: -30.0, vy: Some(-8.0) };
        let bounce = Impulse { dx: 0.0, vy: Some(-10.0) };
        let merged = knock.merge(bounce);
        assert_eq!(merged.dx, -30.0);
        assert_eq!(merged.vy, Some(-10.0));

        let mut state = WorldState::new(&SimConfig::default());
        state.push_impulse(knock);
        state.push_impulse(Impulse { dx: -5.0, vy: None });
        assert_eq!(state.pending_impulse, Some(Impulse { dx: -35.0, vy: Some(-8.0) }));
    }

    #[test]
    fn test_invulnerability_window() {
        let mut state = WorldState::new(&SimConfig::default());
        let now = Instant::now();
        assert!(!state.is_invulnerable(now));
        state.invulnerable_until = Some(now + Duration::from_secs(2));
        assert!(state.is_invulnerable(now));
        assert!(!state.is_invulnerable(now + Duration::from_secs(3)));
    }

    #[test]
    fn test_shared_world_mutate_and_stop() {
        let world = SharedWorld::with_seed(SimConfig::default(), 7);
        assert_eq!(world.read().lives, 3);
        world.mutate(|s| s.camera_x = 120.0);
        assert_eq!(world.read().camera_x, 120.0);

        assert!(world.is_running());
        world.stop();
        world.stop();
        assert!(!world.is_running());

        let a = world.next_entity_id();
        let b = world.next_entity_id();
        assert_ne!(a, b);
    }
}
