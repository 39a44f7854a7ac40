//! Background workers
//!
//! Each worker calls its tick function at a fixed interval until the shared
//! running flag drops. A failing tick is logged and skipped; a panicking tick
//! is caught and treated the same way, so one bad tick never ends the worker.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{Receiver, RecvTimeoutError, Sender, bounded};

use crate::error::{SetupError, TickError};
use crate::sim::SharedWorld;

/// A named worker thread with a bounded join
pub struct Worker {
    name: &'static str,
    handle: Option<JoinHandle<()>>,
    /// Disconnects when the thread exits, however it exits
    exited: Receiver<()>,
}

impl Worker {
    /// Spawn a worker that runs `tick` every `interval` while `world` is running.
    pub fn spawn<W>(
        name: &'static str,
        interval: Duration,
        world: Arc<SharedWorld>,
        mut tick: W,
    ) -> Result<Self, SetupError>
    where
        W: FnMut() -> Result<(), TickError> + Send + 'static,
    {
        let (exit_signal, exited) = bounded::<()>(1);
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let _exit_signal: Sender<()> = exit_signal;
                log::info!("[{name}] worker started");
                while world.is_running() {
                    if let Err(e) = run_tick(&mut tick) {
                        log::warn!("[{name}] tick skipped: {e}");
                    }
                    thread::sleep(interval);
                }
                log::info!("[{name}] worker stopped");
            })
            .map_err(|source| SetupError::Spawn { name, source })?;

        Ok(Self {
            name,
            handle: Some(handle),
            exited,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Wait up to `timeout` for the worker to exit. Returns whether it did;
    /// a worker that misses the deadline is detached, never killed.
    pub fn join_timeout(mut self, timeout: Duration) -> bool {
        match self.exited.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if let Some(handle) = self.handle.take() {
                    // The tick loop already returned; join only reaps the thread
                    let _ = handle.join();
                }
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                log::warn!("[{}] worker did not stop within {:?}", self.name, timeout);
                false
            }
        }
    }
}

/// Run one tick, turning a panic into a [`TickError`]
fn run_tick<W>(tick: &mut W) -> Result<(), TickError>
where
    W: FnMut() -> Result<(), TickError>,
{
    match panic::catch_unwind(AssertUnwindSafe(|| tick())) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(TickError::WorkerPanic(message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SimConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    fn world() -> Arc<SharedWorld> {
        Arc::new(SharedWorld::with_seed(SimConfig::default(), 1))
    }

    #[test]
    fn test_worker_ticks_until_stopped() {
        let world = world();
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let tick = move || -> Result<(), TickError> {
            counter.fetch_add(1, Ordering::Relaxed);
            Ok(())
        };
        let every = Duration::from_millis(1);
        let worker = Worker::spawn("counter", every, Arc::clone(&world), tick).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while ticks.load(Ordering::Relaxed) < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        world.stop();
        assert_eq!(worker.name(), "counter");
        assert!(worker.join_timeout(Duration::from_secs(5)));
        assert!(ticks.load(Ordering::Relaxed) >= 3);
    }

    #[test]
    fn test_failing_and_panicking_ticks_do_not_end_worker() {
        let world = world();
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let tick = move || match counter.fetch_add(1, Ordering::Relaxed) {
            0 => Err(TickError::InvalidGeometry("segment start is NaN".to_string())),
            1 => panic!("boom"),
            _ => Ok(()),
        };
        let every = Duration::from_millis(1);
        let worker = Worker::spawn("flaky", every, Arc::clone(&world), tick).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while ticks.load(Ordering::Relaxed) < 5 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(ticks.load(Ordering::Relaxed) >= 5);
        world.stop();
        assert!(worker.join_timeout(Duration::from_secs(5)));
    }

    #[test]
    fn test_run_tick_reports_panic_message() {
        let mut tick = || -> Result<(), TickError> { panic!("bad geometry") };
        assert_eq!(
            run_tick(&mut tick),
            Err(TickError::WorkerPanic("bad geometry".to_string()))
        );
    }

    #[test]
    fn test_join_times_out_on_stuck_worker() {
        let world = world();
        let ticked = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticked);
        let tick = move || -> Result<(), TickError> {
            counter.fetch_add(1, Ordering::Relaxed);
            Ok(())
        };
        let every = Duration::from_millis(500);
        let worker = Worker::spawn("slow", every, Arc::clone(&world), tick).unwrap();
        while ticked.load(Ordering::Relaxed) == 0 {
            thread::sleep(Duration::from_millis(1));
        }
        world.stop();
        // The worker is mid-sleep; a tiny grace period expires first
        assert!(!worker.join_timeout(Duration::from_millis(1)));
    }
}
