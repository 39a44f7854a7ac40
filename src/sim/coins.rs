//! Coin pickup scanner

use std::sync::Arc;

use super::events::{EventSender, GameEvent};
use super::state::SharedWorld;
use crate::error::TickError;

/// Scans active coins against the player each tick
pub struct CoinField {
    world: Arc<SharedWorld>,
    events: EventSender,
}

impl CoinField {
    pub fn new(world: Arc<SharedWorld>, events: EventSender) -> Self {
        Self { world, events }
    }

    pub fn tick(&mut self) -> Result<(), TickError> {
        self.scan()?;
        Ok(())
    }

    /// Collect every active coin the player overlaps. Returns how many were collected.
    pub fn scan(&self) -> Result<usize, TickError> {
        let player = self.world.read().player.bounds();
        let collected: Vec<u32> = self.world.with_coins(|coins| {
            coins
                .iter_mut()
                .filter(|c| c.active && c.rect.overlaps(&player))
                .filter_map(|c| c.collect().then_some(c.id))
                .collect()
        });

        for &coin_id in &collected {
            self.events.publish(GameEvent::CoinCollected { coin_id })?;
        }
        Ok(collected.len())
    }
}
