//! Player physics and camera follow
//!
//! Runs only on the simulation clock, which is the single writer of the
//! player's body.

use serde::{Deserialize, Serialize};

use super::state::{Impulse, Platform, PlayerBody};
use crate::consts::*;

pub const GRAVITY: f32 = 0.5;
pub const MAX_FALL_SPEED: f32 = 15.0;
pub const JUMP_VELOCITY: f32 = -12.0;
/// Horizontal speed per frame while a direction is held
pub const MOVE_SPEED: f32 = 5.0;
/// Largest vertical distance covered in one collision sub-step
pub const SUBSTEP: f32 = 5.0;
/// The player's box must overlap a platform by more than this to stand on it
pub const LANDING_INSET: f32 = 5.0;

/// Horizontal movement intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Movement {
    #[default]
    None,
    Left,
    Right,
}

/// Which sprite the renderer should pick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Facing {
    #[default]
    Idle,
    Left,
    Right,
}

/// Clock-local player flags that sit alongside the shared body
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Player {
    pub facing: Facing,
    pub on_ground: bool,
    pub jumping: bool,
}

impl Player {
    /// Apply one frame of input
    pub fn apply_input(&mut self, body: &mut PlayerBody, movement: Movement, jump: bool) {
        if jump && self.on_ground {
            body.vel.y = JUMP_VELOCITY;
            self.jumping = true;
            self.on_ground = false;
        }

        match movement {
            Movement::Left => {
                body.pos.x -= MOVE_SPEED;
                body.vel.x = -MOVE_SPEED;
                self.facing = Facing::Left;
            }
            Movement::Right => {
                body.pos.x += MOVE_SPEED;
                body.vel.x = MOVE_SPEED;
                self.facing = Facing::Right;
            }
            Movement::None => {
                body.vel.x = 0.0;
                self.facing = Facing::Idle;
            }
        }
    }

    /// Gravity plus sub-stepped landing against `platforms`, then the floor.
    ///
    /// Sub-steps keep each vertical move at most [`SUBSTEP`] so a fast fall
    /// can't skip over a platform thinner than its own fall distance.
    pub fn step(&mut self, body: &mut PlayerBody, platforms: &[Platform], screen_height: f32) {
        body.vel.y = (body.vel.y + GRAVITY).min(MAX_FALL_SPEED);

        let steps = ((body.vel.y.abs() / SUBSTEP) as u32).max(1);
        let step_dy = body.vel.y / steps as f32;

        let mut landed = false;
        for _ in 0..steps {
            body.pos.y += step_dy;
            if body.vel.y <= 0.0 {
                continue;
            }
            let feet = body.pos.y + PLAYER_H;
            let support = platforms.iter().find(|p| {
                feet >= p.rect.top()
                    && feet <= p.rect.bottom()
                    && body.pos.x + PLAYER_W > p.rect.left() + LANDING_INSET
                    && body.pos.x < p.rect.right() - LANDING_INSET
            });
            if let Some(platform) = support {
                body.pos.y = platform.rect.top() - PLAYER_H;
                body.vel.y = 0.0;
                landed = true;
                break;
            }
        }

        self.on_ground = landed;
        if landed {
            self.jumping = false;
        }

        if body.pos.y >= screen_height - PLAYER_H {
            body.pos.y = screen_height - PLAYER_H;
            body.vel.y = 0.0;
            self.on_ground = true;
            self.jumping = false;
        }
    }
}

/// Apply a pending knockback/bounce from the event applier
pub fn apply_impulse(body: &mut PlayerBody, impulse: Impulse) {
    body.pos.x += impulse.dx;
    if let Some(vy) = impulse.vy {
        body.vel.y = vy;
    }
}

/// Advance the camera so the player stays within `threshold` of its left
/// edge, and keep the player from walking off the left of the view.
pub fn follow_camera(camera_x: &mut f32, body: &mut PlayerBody, threshold: f32) {
    if body.pos.x > *camera_x + threshold {
        *camera_x = body.pos.x - threshold;
    }
    if body.pos.x < *camera_x {
        body.pos.x = *camera_x;
    }
}
