//! Event bus
//!
//! Detectors (enemy population, coin field) publish what they find; a single
//! applier drains the queue in arrival order and is the only code that writes
//! score, coins, lives and the invulnerability deadline.

use std::sync::Arc;
use std::time::Instant;

use crossbeam::channel::{Receiver, Sender, unbounded};
use serde::{Deserialize, Serialize};

use super::enemies::retire_enemy;
use super::state::{Impulse, SharedWorld};
use crate::error::TickError;

/// Something a detector observed that changes the score/lives record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Player touched an enemy from the side or below
    EnemyCollision { enemy_id: u32 },
    /// Player landed on an enemy
    EnemyStomped { enemy_id: u32 },
    CoinCollected { coin_id: u32 },
}

/// Producer half. Cheap to clone, never blocks.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: Sender<GameEvent>,
}

impl EventSender {
    pub fn publish(&self, event: GameEvent) -> Result<(), TickError> {
        // Unbounded, so the only failure is a dropped applier
        self.sender
            .try_send(event)
            .map_err(|_| TickError::Disconnected)
    }
}

/// Open a bus: any number of senders, exactly one applier.
pub fn event_bus(world: Arc<SharedWorld>) -> (EventSender, EventApplier) {
    let (sender, receiver) = unbounded();
    (EventSender { sender }, EventApplier { world, receiver })
}

/// The single consumer
pub struct EventApplier {
    world: Arc<SharedWorld>,
    receiver: Receiver<GameEvent>,
}

impl EventApplier {
    /// Worker tick: apply everything currently queued
    pub fn tick(&mut self) -> Result<(), TickError> {
        self.drain(Instant::now());
        Ok(())
    }

    /// Apply queued events in FIFO order. Returns how many were taken off the queue.
    pub fn drain(&mut self, now: Instant) -> usize {
        let mut taken = 0;
        while let Ok(event) = self.receiver.try_recv() {
            self.apply(event, now);
            taken += 1;
        }
        taken
    }

    /// Number of events waiting
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Apply one event. Returns whether it changed the world record.
    pub fn apply(&self, event: GameEvent, now: Instant) -> bool {
        let config = &self.world.config;
        match event {
            GameEvent::EnemyCollision { enemy_id } => {
                let window = config.invulnerability();
                let invulnerable_until = now.checked_add(window).unwrap_or(now);
                let hit = self.world.mutate(|s| {
                    // Two enemies can both report before the first hit lands
                    if s.is_invulnerable(now) {
                        return None;
                    }
                    s.lives = (s.lives - 1).max(0);
                    s.invulnerable_until = Some(invulnerable_until);
                    s.push_impulse(Impulse {
                        dx: config.knockback_dx,
                        vy: Some(config.knockback_vy),
                    });
                    Some(s.lives)
                });
                retire_enemy(&self.world, enemy_id);
                match hit {
                    Some(lives) => {
                        log::info!("Hit by enemy {enemy_id}! Lives remaining: {lives}");
                        true
                    }
                    None => {
                        log::debug!("Enemy {enemy_id} hit absorbed by invulnerability");
                        false
                    }
                }
            }
            GameEvent::EnemyStomped { enemy_id } => {
                let score = self.world.mutate(|s| {
                    s.score += config.stomp_bounty;
                    s.push_impulse(Impulse {
                        dx: 0.0,
                        vy: Some(config.stomp_bounce_vy),
                    });
                    s.score
                });
                retire_enemy(&self.world, enemy_id);
                log::info!(
                    "Enemy {enemy_id} stomped! +{} points | Total: {score}",
                    config.stomp_bounty
                );
                true
            }
            GameEvent::CoinCollected { coin_id } => {
                let (coins, score) = self.world.mutate(|s| {
                    s.coins += 1;
                    s.score += config.coin_bounty;
                    (s.coins, s.score)
                });
                log::debug!("Coin {coin_id} collected! Total: {coins} | Score: {score}");
                true
            }
        }
    }
}
