//! Simulation clock
//!
//! Owns the background workers and drives the render/input loop: input,
//! player physics, camera follow, termination check, render, frame pacing.
//! It is the only writer of the player's body.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;

use super::frontend::Frontend;
use super::worker::Worker;
use crate::error::SetupError;
use crate::settings::SimConfig;
use crate::sim::player::{self, Player};
use crate::sim::{
    CoinField, EnemyPopulation, FrameSnapshot, SharedWorld, WorldStream, event_bus,
};

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    OutOfLives,
    Quit,
    /// The running flag was cleared from outside the loop
    Stopped,
}

/// Final tally printed when a run ends
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub score: u64,
    pub coins: u64,
    pub lives: i32,
    pub frames: u64,
    pub elapsed: Duration,
    pub reason: StopReason,
}

/// Sleeps out whatever is left of each frame
#[derive(Debug, Clone, Copy)]
struct FramePacer {
    frame_duration: Duration,
    frame_start: Instant,
}

impl FramePacer {
    fn new(frame_duration: Duration) -> Self {
        Self {
            frame_duration,
            frame_start: Instant::now(),
        }
    }

    fn wait(&mut self) {
        let spent = self.frame_start.elapsed();
        if let Some(remaining) = self.frame_duration.checked_sub(spent) {
            thread::sleep(remaining);
        }
        self.frame_start = Instant::now();
    }
}

pub struct SimulationClock<F: Frontend> {
    world: Arc<SharedWorld>,
    frontend: F,
    player: Player,
    frame: u64,
    workers: Vec<Worker>,
    run_start: Instant,
}

impl<F: Frontend> SimulationClock<F> {
    /// Build the world, lay down the first segment and start the four workers.
    pub fn start(config: SimConfig, frontend: F) -> Result<Self, SetupError> {
        config.validate()?;
        let world = Arc::new(SharedWorld::new(config));
        log::info!("Starting run with seed {}", world.seed);

        let mut clock = Self::without_workers(world, frontend);
        let mut stream = WorldStream::new(Arc::clone(&clock.world));
        if let Err(e) = stream.seed_initial() {
            log::warn!("Initial segment failed, the stream worker will retry: {e}");
        }

        if let Err(e) = clock.spawn_workers(stream) {
            clock.shutdown();
            return Err(e);
        }
        Ok(clock)
    }

    /// A clock over an existing world with no background workers. Tests drive
    /// the worker bodies by hand alongside [`step`](Self::step).
    pub fn without_workers(world: Arc<SharedWorld>, frontend: F) -> Self {
        Self {
            world,
            frontend,
            player: Player::default(),
            frame: 0,
            workers: Vec::new(),
            run_start: Instant::now(),
        }
    }

    fn spawn_workers(&mut self, mut stream: WorldStream) -> Result<(), SetupError> {
        let config = &self.world.config;
        let every = Duration::from_millis;
        let (stream_every, enemy_every, coin_every, event_every) = (
            every(config.stream_interval_ms),
            every(config.enemy_interval_ms),
            every(config.coin_interval_ms),
            every(config.event_interval_ms),
        );

        let (sender, mut applier) = event_bus(Arc::clone(&self.world));
        let mut population = EnemyPopulation::new(Arc::clone(&self.world), sender.clone());
        let mut coins = CoinField::new(Arc::clone(&self.world), sender);

        let world = &self.world;
        self.workers.push(Worker::spawn(
            "world-stream",
            stream_every,
            Arc::clone(world),
            move || stream.tick(),
        )?);
        self.workers.push(Worker::spawn(
            "enemy-population",
            enemy_every,
            Arc::clone(world),
            move || population.tick(),
        )?);
        self.workers.push(Worker::spawn(
            "coin-field",
            coin_every,
            Arc::clone(world),
            move || coins.tick(),
        )?);
        self.workers.push(Worker::spawn(
            "event-applier",
            event_every,
            Arc::clone(world),
            move || applier.tick(),
        )?);
        Ok(())
    }

    pub fn world(&self) -> &Arc<SharedWorld> {
        &self.world
    }

    pub fn player(&self) -> Player {
        self.player
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Run one frame. Returns why the run should end, if it should.
    pub fn step(&mut self, now: Instant) -> Option<StopReason> {
        if !self.world.is_running() {
            return Some(StopReason::Stopped);
        }

        let input = self.frontend.poll_input();
        if input.quit {
            return Some(StopReason::Quit);
        }

        let platforms = self.world.platforms_snapshot();
        let config = &self.world.config;
        let flags = &mut self.player;
        let lives = self.world.mutate(|state| {
            if let Some(impulse) = state.pending_impulse.take() {
                player::apply_impulse(&mut state.player, impulse);
            }
            flags.apply_input(&mut state.player, input.movement, input.jump);
            flags.step(&mut state.player, &platforms, config.screen_height);
            player::follow_camera(
                &mut state.camera_x,
                &mut state.player,
                config.camera_threshold,
            );
            state.lives
        });

        self.frame += 1;
        let snapshot =
            FrameSnapshot::capture(&self.world, self.player, self.frame, self.run_start, now);
        self.frontend.render(&snapshot);

        (lives <= 0).then_some(StopReason::OutOfLives)
    }

    /// Drive frames at the target rate until the run ends, then shut down.
    pub fn run(mut self) -> RunSummary {
        let mut pacer = FramePacer::new(self.world.config.frame_duration());
        let reason = loop {
            if let Some(reason) = self.step(Instant::now()) {
                break reason;
            }
            pacer.wait();
        };
        log::info!("Run ended: {reason:?}");
        self.shutdown();
        self.summary(reason)
    }

    /// Clear the running flag and give the workers one shared grace period
    /// to exit.
    fn shutdown(&mut self) {
        self.world.stop();
        let grace = self.world.config.shutdown_grace();
        let deadline = Instant::now() + grace;
        let total = self.workers.len();
        let stopped = self
            .workers
            .drain(..)
            .map(|worker| {
                let name = worker.name();
                let remaining = deadline.saturating_duration_since(Instant::now());
                let joined = worker.join_timeout(remaining);
                log::debug!("[{name}] joined: {joined}");
                joined
            })
            .filter(|joined| *joined)
            .count();
        if total > 0 {
            log::info!("{stopped}/{total} workers stopped within {grace:?}");
        }
    }

    pub fn summary(&self, reason: StopReason) -> RunSummary {
        let state = self.world.read();
        let summary = RunSummary {
            score: state.score,
            coins: state.coins,
            lives: state.lives,
            frames: self.frame,
            elapsed: self.run_start.elapsed(),
            reason,
        };
        log::info!(
            "Final score: {} | coins: {} | lives: {} | frames: {}",
            summary.score,
            summary.coins,
            summary.lives,
            summary.frames
        );
        summary
    }
}

impl<F: Frontend> Drop for SimulationClock<F> {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.shutdown();
        }
    }
}
