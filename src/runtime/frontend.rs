//! Render/input collaborator
//!
//! The simulation never draws or reads devices itself; a [`Frontend`] is
//! polled for input and handed a read-only [`FrameSnapshot`] once per frame.

use crate::consts::*;
use crate::sim::{FrameSnapshot, Movement};

/// Input intents for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputState {
    pub movement: Movement,
    pub jump: bool,
    pub quit: bool,
}

pub trait Frontend {
    fn poll_input(&mut self) -> InputState;
    fn render(&mut self, frame: &FrameSnapshot);
}

/// How far ahead the autopilot looks for enemies and gaps
const LOOKAHEAD: f32 = 150.0;
/// Distance past the player's leading edge checked for solid footing
const GAP_LOOKAHEAD: f32 = 30.0;
/// A support whose top is at most this far above the player's feet still
/// counts as footing (a fresh run starts with the feet sunk into the ground)
const FOOTING_TOLERANCE: f32 = 15.0;

/// Headless demo player: runs right, hops enemies and gaps, quits after
/// `max_frames`.
#[derive(Debug, Clone)]
pub struct AutoPilot {
    max_frames: u64,
    log_every: u64,
    last: Option<FrameSnapshot>,
}

impl AutoPilot {
    pub fn new(max_frames: u64) -> Self {
        Self {
            max_frames,
            log_every: 120,
            last: None,
        }
    }

    /// Log the HUD every `frames` frames (0 disables)
    pub fn log_every(mut self, frames: u64) -> Self {
        self.log_every = frames;
        self
    }

    fn enemy_ahead(frame: &FrameSnapshot) -> bool {
        let front = frame.player.pos.x + PLAYER_W;
        frame.enemies.iter().any(|e| {
            let dx = e.rect.left() - front;
            dx >= 0.0 && dx <= LOOKAHEAD
        })
    }

    fn gap_ahead(frame: &FrameSnapshot) -> bool {
        let ahead = frame.player.pos.x + PLAYER_W + GAP_LOOKAHEAD;
        let feet = frame.player.pos.y + PLAYER_H;
        !frame.platforms.iter().any(|p| {
            p.rect.left() <= ahead
                && p.rect.right() >= ahead
                && p.rect.top() >= feet - FOOTING_TOLERANCE
        })
    }
}

impl Frontend for AutoPilot {
    fn poll_input(&mut self) -> InputState {
        let Some(frame) = &self.last else {
            return InputState {
                movement: Movement::Right,
                ..Default::default()
            };
        };

        InputState {
            movement: Movement::Right,
            jump: frame.player_flags.on_ground
                && (Self::enemy_ahead(frame) || Self::gap_ahead(frame)),
            quit: frame.frame >= self.max_frames,
        }
    }

    fn render(&mut self, frame: &FrameSnapshot) {
        if self.log_every > 0 && frame.frame % self.log_every == 0 {
            log::info!(
                "frame {} | x={:.0} camera={:.0} | score: {} coins: {} lives: {}{}",
                frame.frame,
                frame.player.pos.x,
                frame.camera_x,
                frame.hud.score,
                frame.hud.coins,
                frame.hud.lives,
                if frame.hud.invulnerable { " (invulnerable)" } else { "" }
            );
        }
        self.last = Some(frame.clone());
    }
}
