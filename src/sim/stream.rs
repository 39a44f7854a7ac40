//! World streaming
//!
//! Extends the level ahead of the player one segment at a time and reaps
//! geometry that has scrolled far behind the camera.

use std::sync::Arc;

use rand::Rng;
use rand_pcg::Pcg32;

use super::state::{Coin, Platform, SharedWorld};
use crate::consts::*;
use crate::error::TickError;
use crate::settings::SimConfig;

/// RNG stream id for world generation
const STREAM_RNG: u64 = 0x5747;

/// First floating platform slot starts this far into a segment
const FLOATING_START_OFFSET: f32 = 200.0;

/// Geometry produced by one generation step
#[derive(Debug, Clone, Default)]
pub struct Segment {
    pub platforms: Vec<Platform>,
    pub coins: Vec<Coin>,
}

/// Build one segment starting at `start_x`.
///
/// Floating platforms are placed by rejection sampling against both the new
/// segment and `existing` (the live floating platforms), so segments never
/// crowd their neighbours. A slot that exhausts its attempt budget is skipped.
pub fn generate_segment(
    start_x: f32,
    config: &SimConfig,
    existing: &[Platform],
    rng: &mut impl Rng,
    mut next_id: impl FnMut() -> u32,
) -> Result<Segment, TickError> {
    if !start_x.is_finite() {
        return Err(TickError::InvalidGeometry(format!(
            "segment start {start_x} is not finite"
        )));
    }

    let mut segment = Segment::default();
    segment
        .platforms
        .push(Platform::ground(start_x, config.segment_width));

    let slots = rng.random_range(3..=5);
    let mut current_x = start_x + FLOATING_START_OFFSET;

    for _ in 0..slots {
        for _attempt in 0..config.placement_attempts {
            let x = current_x + rng.random_range(150_i32..=300) as f32;
            let y = rng.random_range(320_i32..=480) as f32;
            let width = rng.random_range(150_i32..=280) as f32;
            let candidate = Platform::floating(x, y, width);

            let crowded = segment
                .platforms
                .iter()
                .chain(existing.iter().filter(|p| p.is_floating()))
                .any(|p| {
                    candidate
                        .rect
                        .overlaps_with_margin(&p.rect, config.platform_overlap_margin)
                });
            if crowded {
                continue;
            }

            segment.platforms.push(candidate);
            if rng.random_bool(config.coin_platform_chance) {
                let count = rng.random_range(2_i32..=5);
                let spacing = width / (count + 1) as f32;
                for j in 0..count {
                    let coin_x = x + spacing * (j + 1) as f32 - COIN_SIZE / 2.0;
                    let coin_y = y - rng.random_range(50_i32..=100) as f32;
                    let phase = rng.random_range(0.0..100.0);
                    segment.coins.push(Coin::new(next_id(), coin_x, coin_y, phase));
                }
            }
            current_x = x;
            break;
        }
    }

    let scattered = rng.random_range(2..=4);
    for _ in 0..scattered {
        let coin_x = start_x + rng.random_range(200_i32..=700) as f32;
        let coin_y = rng.random_range(150_i32..=400) as f32;
        let phase = rng.random_range(0.0..100.0);
        segment.coins.push(Coin::new(next_id(), coin_x, coin_y, phase));
    }

    Ok(segment)
}

/// The generator/reaper worker body
pub struct WorldStream {
    world: Arc<SharedWorld>,
    rng: Pcg32,
}

impl WorldStream {
    pub fn new(world: Arc<SharedWorld>) -> Self {
        let rng = Pcg32::new(world.seed, STREAM_RNG);
        Self { world, rng }
    }

    /// One worker tick: extend if needed, then reap
    pub fn tick(&mut self) -> Result<(), TickError> {
        self.extend()?;
        self.reap();
        Ok(())
    }

    /// Lay down the first segment at x = 0
    pub fn seed_initial(&mut self) -> Result<(), TickError> {
        let start = self.world.read().furthest_generated_x;
        let segment = self.append_segment(start)?;
        log::info!(
            "Initial world: {} platforms, {} coins",
            segment.0,
            segment.1
        );
        Ok(())
    }

    /// Generate one segment if the player is within lookahead of the world edge.
    /// Returns whether a segment was added.
    pub fn extend(&mut self) -> Result<bool, TickError> {
        let state = self.world.read();
        let lookahead = self.world.config.generation_lookahead;
        if state.player.pos.x + lookahead <= state.furthest_generated_x {
            return Ok(false);
        }
        let (platforms, coins) = self.append_segment(state.furthest_generated_x)?;
        log::debug!(
            "Generated up to x={} | platforms: +{} | coins: +{}",
            state.furthest_generated_x + self.world.config.segment_width,
            platforms.saturating_sub(1),
            coins
        );
        Ok(true)
    }

    fn append_segment(&mut self, start_x: f32) -> Result<(usize, usize), TickError> {
        let existing = self.world.platforms_snapshot();
        let world = &self.world;
        let next_id = || world.next_entity_id();
        let segment = generate_segment(
            start_x,
            &world.config,
            &existing,
            &mut self.rng,
            next_id,
        )?;
        let counts = (segment.platforms.len(), segment.coins.len());

        world.with_platforms(|platforms| platforms.extend(segment.platforms));
        world.with_coins(|coins| coins.extend(segment.coins));
        // Only this worker moves the edge, so start_x is still current
        let width = world.config.segment_width;
        world.mutate(|s| {
            s.furthest_generated_x = s.furthest_generated_x.max(start_x + width);
        });
        Ok(counts)
    }

    /// Drop platforms and coins whose right edge is behind the cleanup line,
    /// plus coins already collected. Returns `(platforms, coins)` removed.
    pub fn reap(&self) -> (usize, usize) {
        let limit = self.world.read().camera_x - self.world.config.cleanup_distance;

        let removed_platforms = self.world.with_platforms(|platforms| {
            let before = platforms.len();
            platforms.retain(|p| p.rect.reaches_past(limit));
            before - platforms.len()
        });
        let removed_coins = self.world.with_coins(|coins| {
            let before = coins.len();
            coins.retain(|c| c.active && c.rect.reaches_past(limit));
            before - coins.len()
        });

        if removed_platforms > 0 {
            log::debug!("Cleaned up {removed_platforms} platforms, {removed_coins} coins");
        }
        (removed_platforms, removed_coins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::geometry::Rect;
    use crate::sim::state::SurfaceKind;
    use proptest::prelude::*;
    use rand::SeedableRng;

    fn floating_pairs_clear(platforms: &[Platform], margin: f32) -> bool {
        let floating: Vec<_> = platforms.iter().filter(|p| p.is_floating()).collect();
        for (i, a) in floating.iter().enumerate() {
            for b in &floating[i + 1..] {
                if a.rect.overlaps_with_margin(&b.rect, margin) {
                    return false;
                }
            }
        }
        true
    }

    fn world() -> Arc<SharedWorld> {
        Arc::new(SharedWorld::with_seed(SimConfig::default(), 1234))
    }

    #[test]
    fn test_segment_shape() {
        let config = SimConfig::default();
        let mut rng = Pcg32::seed_from_u64(9);
        let mut id = 0;
        let segment = generate_segment(800.0, &config, &[], &mut rng, || {
            id += 1;
            id
        })
        .unwrap();

        let ground: Vec<_> = segment
            .platforms
            .iter()
            .filter(|p| !p.is_floating())
            .collect();
        assert_eq!(ground.len(), 1);
        assert_eq!(ground[0].rect.left(), 800.0);
        assert_eq!(ground[0].rect.size.x, 800.0);

        let floating = segment.platforms.len() - 1;
        assert!(floating <= 5);
        assert!(segment.coins.len() >= 2);
        assert!(segment.coins.iter().all(|c| c.active));
    }

    #[test]
    fn test_unsatisfiable_placement_skips_slots() {
        let config = SimConfig::default();
        // A wall of existing floating platforms covering every candidate spot
        let blocker = Platform {
            rect: Rect::new(0.0, 200.0, 10_000.0, 400.0),
            kind: SurfaceKind::Floating,
        };
        let mut rng = Pcg32::seed_from_u64(3);
        let segment = generate_segment(0.0, &config, &[blocker], &mut rng, || 1).unwrap();
        assert_eq!(segment.platforms.len(), 1, "only the ground survives");
    }

    #[test]
    fn test_non_finite_start_is_rejected() {
        let mut rng = Pcg32::seed_from_u64(3);
        let config = SimConfig::default();
        let result = generate_segment(f32::NAN, &config, &[], &mut rng, || 1);
        assert!(matches!(result, Err(TickError::InvalidGeometry(_))));
    }

    #[test]
    fn test_initial_segment_sets_edge() {
        let world = world();
        let mut stream = WorldStream::new(Arc::clone(&world));
        stream.seed_initial().unwrap();
        assert_eq!(world.read().furthest_generated_x, 800.0);
        assert!(world.platforms_snapshot().len() >= 1);
    }

    #[test]
    fn test_extend_when_player_nears_edge() {
        let world = world();
        let mut stream = WorldStream::new(Arc::clone(&world));
        world.mutate(|s| {
            s.furthest_generated_x = 800.0;
            s.player.pos.x = 750.0;
        });
        assert!(stream.extend().unwrap());
        assert_eq!(world.read().furthest_generated_x, 1600.0);
    }

    #[test]
    fn test_no_extend_when_far_from_edge() {
        let world = world();
        let mut stream = WorldStream::new(Arc::clone(&world));
        world.mutate(|s| {
            s.furthest_generated_x = 5000.0;
            s.player.pos.x = 100.0;
        });
        assert!(!stream.extend().unwrap());
        assert_eq!(world.read().furthest_generated_x, 5000.0);
        assert!(world.platforms_snapshot().is_empty());
    }

    #[test]
    fn test_edge_catches_up_with_lookahead() {
        let world = world();
        let mut stream = WorldStream::new(Arc::clone(&world));
        stream.seed_initial().unwrap();
        world.mutate(|s| {
            s.player.pos.x = 4000.0;
            s.camera_x = 3700.0;
        });
        let mut last = world.read().furthest_generated_x;
        for _ in 0..20 {
            stream.tick().unwrap();
            let now = world.read().furthest_generated_x;
            assert!(now >= last);
            last = now;
        }
        let state = world.read();
        assert!(state.furthest_generated_x >= state.camera_x + 1000.0);
        assert!(floating_pairs_clear(&world.platforms_snapshot(), 40.0));
    }

    #[test]
    fn test_reap_boundary() {
        let world = world();
        let stream = WorldStream::new(Arc::clone(&world));
        world.mutate(|s| s.camera_x = 2000.0);
        // cleanup line at 1500
        world.with_platforms(|p| {
            p.push(Platform::floating(1300.0, 400.0, 199.0)); // right edge 1499
            p.push(Platform::floating(1301.0, 400.0, 200.0)); // right edge 1501
        });
        world.with_coins(|c| {
            c.push(Coin::new(1, 1400.0, 100.0, 0.0)); // right edge 1430
            c.push(Coin::new(2, 1600.0, 100.0, 0.0));
            let mut collected = Coin::new(3, 2200.0, 100.0, 0.0);
            collected.collect();
            c.push(collected);
        });

        assert_eq!(stream.reap(), (1, 2));
        let platforms = world.platforms_snapshot();
        assert_eq!(platforms.len(), 1);
        assert_eq!(platforms[0].rect.right(), 1501.0);
        world.with_coins(|c| {
            assert_eq!(c.len(), 1);
            assert_eq!(c[0].id, 2);
        });
    }

    proptest! {
        #[test]
        fn generated_platforms_never_crowd(seed in any::<u64>(), start in 0.0f32..50_000.0) {
            let config = SimConfig::default();
            let mut rng = Pcg32::seed_from_u64(seed);
            let first = generate_segment(start, &config, &[], &mut rng, || 0).unwrap();
            let second = generate_segment(
                start + config.segment_width,
                &config,
                &first.platforms,
                &mut rng,
                || 0,
            ).unwrap();
            let mut all = first.platforms.clone();
            all.extend(second.platforms.iter().copied());
            prop_assert!(floating_pairs_clear(&all, config.platform_overlap_margin));
            prop_assert!(first.platforms.len() <= 6);
            let scattered = first
                .coins
                .iter()
                .filter(|c| (150.0..=400.0).contains(&c.rect.top()))
                .count();
            prop_assert!(scattered >= 2);
        }
    }
}
