//! Host thread standing in for the hardware tick timer

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::debug;

use super::{TickPeriod, TickSource};

/// Longest uninterrupted sleep, so stop requests and phase resets are seen promptly
const MAX_SLEEP: Duration = Duration::from_millis(1);

#[derive(Debug, Default)]
struct TickControl {
    period_ns: AtomicU64,
    generation: AtomicU64,
    running: AtomicBool,
}

/// Programming side of a [`TickThread`]
///
/// Cheap to clone; every clone talks to the same thread. Programming is a
/// pair of atomic stores, so it is safe to call while the tick callback is
/// blocked on the player lock.
#[derive(Debug, Clone, Default)]
pub struct ThreadTicks {
    control: Arc<TickControl>,
}

impl ThreadTicks {
    /// Create an unprogrammed source; the thread idles until a period is set
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently programmed period, zero if none
    pub fn period(&self) -> Duration {
        Duration::from_nanos(self.control.period_ns.load(Ordering::Acquire))
    }
}

impl TickSource for ThreadTicks {
    fn program(&mut self, period: TickPeriod) {
        let nanos = period.period.as_nanos().min(u64::MAX as u128) as u64;
        self.control.period_ns.store(nanos, Ordering::Release);
        self.control.generation.fetch_add(1, Ordering::AcqRel);
    }
}

/// Thread calling a tick handler at the period programmed through [`ThreadTicks`]
///
/// Deadlines advance by whole periods so the average rate does not drift
/// with scheduling jitter. A reprogram restarts the phase: the next tick
/// fires one full new period after it.
pub struct TickThread {
    control: Arc<TickControl>,
    handle: Option<JoinHandle<()>>,
}

impl TickThread {
    /// Start the thread; `on_tick` runs on it once per period
    pub fn spawn<F>(ticks: &ThreadTicks, mut on_tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let control = Arc::clone(&ticks.control);
        control.running.store(true, Ordering::Release);

        let worker = Arc::clone(&control);
        let handle = thread::spawn(move || {
            let mut generation = 0;
            let mut next = Instant::now();
            while worker.running.load(Ordering::Acquire) {
                // Generation before period: a new generation always comes with its period
                let current = worker.generation.load(Ordering::Acquire);
                let period = Duration::from_nanos(worker.period_ns.load(Ordering::Acquire));
                if period.is_zero() {
                    thread::sleep(MAX_SLEEP);
                    continue;
                }

                if current != generation {
                    generation = current;
                    next = Instant::now() + period;
                }

                let now = Instant::now();
                if now >= next {
                    on_tick();
                    next += period;
                } else {
                    thread::sleep((next - now).min(MAX_SLEEP));
                }
            }
            debug!("tick thread exiting");
        });

        TickThread {
            control,
            handle: Some(handle),
        }
    }

    /// Whether the thread has been asked to keep running
    pub fn is_running(&self) -> bool {
        self.control.running.load(Ordering::Acquire)
    }

    /// Stop the thread and wait for it; the handler is not called afterwards
    pub fn stop(&mut self) {
        self.control.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for TickThread {
    fn drop(&mut self) {
        self.stop();
    }
}
