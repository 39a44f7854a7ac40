//! Read-only frame view handed to the renderer

use std::time::Instant;

use serde::Serialize;

use super::enemies::EnemyState;
use super::geometry::Rect;
use super::player::Player;
use super::state::{Coin, Platform, PlayerBody, SharedWorld};

/// Blink period while invulnerable (seconds per visible/hidden slice)
const BLINK_SLICE_SECS: f32 = 0.1;

#[derive(Debug, Clone, Serialize)]
pub struct EnemyView {
    pub id: u32,
    pub rect: Rect,
    pub direction: f32,
    pub state: EnemyState,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Hud {
    pub score: u64,
    pub coins: u64,
    pub lives: i32,
    pub invulnerable: bool,
}

/// Everything one frame needs, copied out of the shared world
#[derive(Debug, Clone, Serialize)]
pub struct FrameSnapshot {
    pub frame: u64,
    pub player: PlayerBody,
    pub player_flags: Player,
    /// Hidden on alternate slices while invulnerable
    pub player_visible: bool,
    pub camera_x: f32,
    pub platforms: Vec<Platform>,
    /// Active coins only
    pub coins: Vec<Coin>,
    /// Live enemies only
    pub enemies: Vec<EnemyView>,
    pub hud: Hud,
}

impl FrameSnapshot {
    /// Copy the world out, one lock at a time
    pub fn capture(
        world: &SharedWorld,
        player_flags: Player,
        frame: u64,
        run_start: Instant,
        now: Instant,
    ) -> Self {
        let state = world.read();
        let platforms = world.platforms_snapshot();
        let coins = world.with_coins(|coins| {
            coins.iter().filter(|c| c.active).cloned().collect()
        });
        let enemies = world.with_enemies(|enemies| {
            enemies
                .iter()
                .filter(|e| e.is_live())
                .map(|e| EnemyView {
                    id: e.id,
                    rect: e.rect,
                    direction: e.direction,
                    state: e.state,
                })
                .collect()
        });

        let invulnerable = state.is_invulnerable(now);
        let slice = (now.duration_since(run_start).as_secs_f32() / BLINK_SLICE_SECS) as u64;
        let player_visible = !invulnerable || slice % 2 == 1;

        Self {
            frame,
            player: state.player,
            player_flags,
            player_visible,
            camera_x: state.camera_x,
            platforms,
            coins,
            enemies,
            hud: Hud {
                score: state.score,
                coins: state.coins,
                lives: state.lives,
                invulnerable,
            },
        }
    }

    /// Screen-space x of a world x
    pub fn to_screen_x(&self, world_x: f32) -> f32 {
        world_x - self.camera_x
    }
}
