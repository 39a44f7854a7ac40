//! Enemy population
//!
//! Spawns walkers onto floating platforms ahead of the camera, moves them,
//! classifies player contact and retires them. The population cap is enforced
//! by [`Permit`]s: each live enemy owns one, and dropping the enemy (or an
//! unused permit) hands the slot back.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::events::{EventSender, GameEvent};
use super::geometry::Rect;
use super::state::{Platform, PlayerBody, SharedWorld};
use crate::consts::*;
use crate::error::TickError;

/// RNG stream id for spawning
const ENEMY_RNG: u64 = 0xE7E7;

/// Patrol speed (units per tick)
pub const ENEMY_SPEED: f32 = 2.0;
pub const ENEMY_GRAVITY: f32 = 0.5;
/// How far below a platform top an enemy's feet may sink and still land
pub const LANDING_BAND: f32 = 10.0;
/// Patrol turns around this far inside the platform ends
pub const PATROL_MARGIN: f32 = 15.0;
/// Spawn this far above the platform and drop onto it
pub const SPAWN_LIFT: f32 = 10.0;

/// Stomp band around the enemy's top edge: `[top - ABOVE, top + BELOW]`
pub const STOMP_TOLERANCE_ABOVE: f32 = 5.0;
pub const STOMP_TOLERANCE_BELOW: f32 = 25.0;

/// Counting slots for the population cap
#[derive(Debug)]
pub struct PopulationPermits {
    capacity: usize,
    available: AtomicUsize,
}

impl PopulationPermits {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            capacity,
            available: AtomicUsize::new(capacity),
        })
    }

    /// Take a slot without waiting
    pub fn try_acquire(self: &Arc<Self>) -> Option<Permit> {
        self.available
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .ok()
            .map(|_| Permit {
                pool: Arc::clone(self),
            })
    }

    pub fn available(&self) -> usize {
        self.available.load(Ordering::Acquire)
    }

    pub fn in_use(&self) -> usize {
        self.capacity - self.available()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// One held population slot; released on drop
#[derive(Debug)]
pub struct Permit {
    pool: Arc<PopulationPermits>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.pool.available.fetch_add(1, Ordering::AcqRel);
    }
}

/// Enemy lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnemyState {
    Active,
    /// Stomp detected, waiting for the applier to retire it
    BeingStomped,
    /// Retired; removed from the live set on the next population tick
    Inactive,
}

/// Horizontal extent of the platform an enemy walks on
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatrolBounds {
    pub left: f32,
    pub right: f32,
    pub y: f32,
}

impl PatrolBounds {
    pub fn of(platform: &Platform) -> Self {
        Self {
            left: platform.rect.left(),
            right: platform.rect.right(),
            y: platform.rect.top(),
        }
    }

    fn matches(&self, platform: &Platform) -> bool {
        *self == Self::of(platform)
    }
}

/// Player/enemy contact classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contact {
    Stomp,
    Damage,
}

/// Classify an overlap between the player and an enemy box.
///
/// A stomp needs the player falling with their feet inside the tolerance band
/// at the enemy's top edge; any other overlap is damage.
pub fn classify_contact(player: &PlayerBody, enemy: &Rect) -> Option<Contact> {
    let bounds = player.bounds();
    if !bounds.overlaps(enemy) {
        return None;
    }
    let feet = bounds.bottom();
    let top = enemy.top();
    if player.vel.y > 0.0
        && feet >= top - STOMP_TOLERANCE_ABOVE
        && feet <= top + STOMP_TOLERANCE_BELOW
    {
        Some(Contact::Stomp)
    } else {
        Some(Contact::Damage)
    }
}

/// A patrolling walker
#[derive(Debug)]
pub struct Enemy {
    pub id: u32,
    pub rect: Rect,
    pub vel_y: f32,
    /// -1.0 (left) or 1.0 (right)
    pub direction: f32,
    pub bounds: PatrolBounds,
    pub state: EnemyState,
    pub on_ground: bool,
    /// Set once a contact has been published for this enemy
    pub contact_reported: bool,
    _permit: Permit,
}

impl Enemy {
    /// Drop a new enemy onto the centre of `platform`
    pub fn spawn_on(id: u32, platform: &Platform, direction: f32, permit: Permit) -> Self {
        let x = platform.rect.center_x() - ENEMY_W / 2.0;
        let y = platform.rect.top() - ENEMY_H - SPAWN_LIFT;
        Self {
            id,
            rect: Rect::new(x, y, ENEMY_W, ENEMY_H),
            vel_y: 0.0,
            direction,
            bounds: PatrolBounds::of(platform),
            state: EnemyState::Active,
            on_ground: false,
            contact_reported: false,
            _permit: permit,
        }
    }

    /// Counts against the population cap
    pub fn is_live(&self) -> bool {
        matches!(self.state, EnemyState::Active | EnemyState::BeingStomped)
    }

    fn lands_on(&self, platform: &Platform) -> bool {
        let feet = self.rect.bottom();
        feet >= platform.rect.top()
            && feet <= platform.rect.top() + LANDING_BAND
            && self.rect.right() > platform.rect.left()
            && self.rect.left() < platform.rect.right()
    }

    /// One physics step: gravity, landing, floor clamp, patrol
    pub fn update(&mut self, platforms: &[Platform], screen_height: f32) {
        if self.state != EnemyState::Active {
            return;
        }

        self.vel_y += ENEMY_GRAVITY;
        self.rect.pos.y += self.vel_y;

        // Prefer the platform we're already walking on
        let landing = platforms
            .iter()
            .find(|p| self.bounds.matches(p) && self.lands_on(p))
            .or_else(|| platforms.iter().find(|p| self.lands_on(p)));

        self.on_ground = false;
        if let Some(platform) = landing {
            self.rect.pos.y = platform.rect.top() - ENEMY_H;
            self.vel_y = 0.0;
            self.on_ground = true;
            self.bounds = PatrolBounds::of(platform);
        }

        if self.rect.pos.y > screen_height - ENEMY_H {
            self.rect.pos.y = screen_height - ENEMY_H;
            self.vel_y = 0.0;
            self.on_ground = true;
        }

        self.rect.pos.x += ENEMY_SPEED * self.direction;

        if self.on_ground {
            let center = self.rect.center_x();
            if center <= self.bounds.left + PATROL_MARGIN {
                self.direction = 1.0;
                self.rect.pos.x = self.bounds.left + PATROL_MARGIN - ENEMY_W / 2.0;
            } else if center >= self.bounds.right - PATROL_MARGIN {
                self.direction = -1.0;
                self.rect.pos.x = self.bounds.right - PATROL_MARGIN - ENEMY_W / 2.0;
            }
        }
    }
}

/// Mark an enemy retired. Returns `false` if it was already retired or is gone.
pub fn retire_enemy(world: &SharedWorld, enemy_id: u32) -> bool {
    world.with_enemies(|enemies| {
        match enemies
            .iter_mut()
            .find(|e| e.id == enemy_id && e.state != EnemyState::Inactive)
        {
            Some(enemy) => {
                enemy.state = EnemyState::Inactive;
                true
            }
            None => false,
        }
    })
}

/// The spawner/simulator/detector worker body
pub struct EnemyPopulation {
    world: Arc<SharedWorld>,
    permits: Arc<PopulationPermits>,
    events: EventSender,
    rng: Pcg32,
}

impl EnemyPopulation {
    pub fn new(world: Arc<SharedWorld>, events: EventSender) -> Self {
        let permits = PopulationPermits::new(world.config.max_enemies);
        let rng = Pcg32::new(world.seed, ENEMY_RNG);
        Self {
            world,
            permits,
            events,
            rng,
        }
    }

    pub fn permits(&self) -> &Arc<PopulationPermits> {
        &self.permits
    }

    /// Enemies currently Active or BeingStomped
    pub fn live_count(&self) -> usize {
        self.world
            .with_enemies(|enemies| enemies.iter().filter(|e| e.is_live()).count())
    }

    /// Worker tick: maybe spawn, then simulate everyone
    pub fn tick(&mut self) -> Result<(), TickError> {
        self.try_spawn();
        self.simulate(Instant::now())?;
        Ok(())
    }

    /// Floating platforms wide enough and inside the forward spawn window
    pub fn eligible_platforms(&self, camera_x: f32) -> Vec<Platform> {
        let config = &self.world.config;
        let near = camera_x + config.spawn_window_near;
        let far = camera_x + config.screen_width + config.spawn_window_far;
        self.world.with_platforms(|platforms| {
            platforms
                .iter()
                .filter(|p| {
                    p.is_floating()
                        && p.rect.size.x >= config.min_spawn_platform_width
                        && p.rect.left() > near
                        && p.rect.left() < far
                })
                .copied()
                .collect()
        })
    }

    /// Spawn one enemy if a slot and a platform are both available.
    /// Returns the new enemy's id.
    pub fn try_spawn(&mut self) -> Option<u32> {
        let permit = self.permits.try_acquire()?;
        let camera_x = self.world.read().camera_x;
        let eligible = self.eligible_platforms(camera_x);
        if eligible.is_empty() {
            // permit drops here and the slot is free again
            return None;
        }

        let platform = eligible[self.rng.random_range(0..eligible.len())];
        let direction = if self.rng.random_bool(0.5) { 1.0 } else { -1.0 };
        let id = self.world.next_entity_id();
        let enemy = Enemy::spawn_on(id, &platform, direction, permit);
        log::debug!("Enemy {id} spawned at x={}", enemy.rect.left() as i32);
        self.world.with_enemies(|enemies| enemies.push(enemy));
        Some(id)
    }

    /// Move every enemy, publish contacts, then compact the live set.
    /// Returns the number of events published.
    pub fn simulate(&mut self, now: Instant) -> Result<usize, TickError> {
        let platforms = self.world.platforms_snapshot();
        let state = self.world.read();
        let config = &self.world.config;
        let invulnerable = state.is_invulnerable(now);
        let retire_x = state.camera_x - config.enemy_retire_behind;
        let retire_y = config.screen_height + config.enemy_retire_below;

        let (found, removed) = self.world.with_enemies(|enemies| {
            let mut found = Vec::new();
            for enemy in enemies.iter_mut() {
                enemy.update(&platforms, config.screen_height);

                if invulnerable || enemy.contact_reported || enemy.state != EnemyState::Active {
                    continue;
                }
                match classify_contact(&state.player, &enemy.rect) {
                    Some(Contact::Stomp) => {
                        enemy.state = EnemyState::BeingStomped;
                        enemy.contact_reported = true;
                        found.push(GameEvent::EnemyStomped { enemy_id: enemy.id });
                    }
                    Some(Contact::Damage) => {
                        enemy.contact_reported = true;
                        found.push(GameEvent::EnemyCollision { enemy_id: enemy.id });
                    }
                    None => {}
                }
            }

            let before = enemies.len();
            enemies.retain(|e| {
                e.state != EnemyState::Inactive
                    && e.rect.left() >= retire_x
                    && e.rect.top() <= retire_y
            });
            (found, before - enemies.len())
        });

        if removed > 0 {
            log::debug!("Retired {removed} enemies");
        }
        for event in &found {
            self.events.publish(*event)?;
        }
        Ok(found.len())
    }
}
