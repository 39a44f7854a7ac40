//! Full threaded runs with a scripted frontend

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use scrollworld::runtime::{Frontend, InputState, SimulationClock, StopReason};
use scrollworld::settings::SimConfig;
use scrollworld::sim::{FrameSnapshot, Movement};

/// Holds right and quits after `quit_after` frames; keeps every HUD it saw
struct RunRight {
    quit_after: u64,
    frames: u64,
    seen: Arc<Mutex<Vec<(usize, i32, u64)>>>,
}

impl Frontend for RunRight {
    fn poll_input(&mut self) -> InputState {
        InputState {
            movement: Movement::Right,
            jump: false,
            quit: self.frames >= self.quit_after,
        }
    }

    fn render(&mut self, frame: &FrameSnapshot) {
        self.frames = frame.frame;
        self.seen
            .lock()
            .unwrap()
            .push((frame.enemies.len(), frame.hud.lives, frame.hud.score));
    }
}

fn config() -> SimConfig {
    SimConfig {
        seed: Some(7),
        target_fps: 120,
        shutdown_grace_ms: 2000,
        ..Default::default()
    }
}

#[test]
fn full_run_quits_with_summary() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let frontend = RunRight {
        quit_after: 120,
        frames: 0,
        seen: Arc::clone(&seen),
    };
    let clock = SimulationClock::start(config(), frontend).unwrap();
    let summary = clock.run();

    assert_eq!(summary.reason, StopReason::Quit);
    assert_eq!(summary.frames, 120);
    assert!(summary.lives >= 0);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 120);
    for &(enemies, lives, _) in seen.iter() {
        assert!(enemies <= 5, "population cap exceeded: {enemies}");
        assert!(lives >= 0);
    }
    // Score only ever grows
    assert!(seen.windows(2).all(|w| w[0].2 <= w[1].2));
}

#[test]
fn world_edge_keeps_ahead_of_player() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let frontend = RunRight {
        quit_after: u64::MAX,
        frames: 0,
        seen,
    };
    let config = config();
    let lookahead = config.generation_lookahead;
    let max_enemies = config.max_enemies;
    let mut clock = SimulationClock::start(config, frontend).unwrap();
    let world = Arc::clone(clock.world());

    let mut last_edge = world.read().furthest_generated_x;
    assert!(last_edge >= 800.0, "initial segment laid before workers start");

    for _ in 0..180 {
        if clock.step(Instant::now()).is_some() {
            break;
        }
        let state = world.read();
        assert!(state.furthest_generated_x >= last_edge);
        last_edge = state.furthest_generated_x;

        let live = world.with_enemies(|enemies| {
            enemies.iter().filter(|e| e.is_live()).count()
        });
        assert!(live <= max_enemies);
        thread::sleep(Duration::from_millis(8));
    }

    // Stop moving and let the stream worker catch up
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let state = world.read();
        if state.furthest_generated_x >= state.camera_x + lookahead {
            break;
        }
        assert!(Instant::now() < deadline, "world edge never caught up");
        thread::sleep(Duration::from_millis(20));
    }

    let summary = clock.summary(StopReason::Stopped);
    assert!(summary.frames > 0);
    // Dropping the clock stops and joins the workers
    drop(clock);
    assert!(!world.is_running());
}
