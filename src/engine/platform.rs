use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// The engine thread: sleeps until the next refresh deadline and fires
/// `tick`. The interval is re-read on every round so the game can change
/// it while running. Stops when `tick` returns false or on `stop`.
#[derive(Debug)]
pub struct Pacer {
    boot_timestamp: Instant,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Pacer {
    pub fn spawn(
        interval_ms: Arc<AtomicU64>,
        mut tick: impl FnMut() -> bool + Send + 'static,
    ) -> io::Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let handle = thread::Builder::new()
            .name("frice-pacer".to_string())
            .spawn(move || {
                let mut deadline = Instant::now();
                while flag.load(Ordering::Acquire) {
                    let interval =
                        Duration::from_millis(interval_ms.load(Ordering::Relaxed)).max(MIN_INTERVAL);
                    deadline += interval;
                    let now = Instant::now();
                    if deadline > now {
                        thread::sleep(deadline - now);
                    } else {
                        deadline = now;
                    }
                    if !flag.load(Ordering::Acquire) || !tick() {
                        break;
                    }
                }
                tracing::debug!(target: "engine", "pacer thread finished");
            })?;
        tracing::info!(target: "engine", "Engine thread successfully created.");
        Ok(Self {
            boot_timestamp: Instant::now(),
            running,
            handle: Some(handle),
        })
    }

    pub fn uptime(&self) -> Duration {
        self.boot_timestamp.elapsed()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!(target: "engine", "pacer thread panicked");
            }
        }
    }
}

impl Drop for Pacer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// At most one tick in flight: the pacer arms the gate before posting and
/// the loop clears it when the tick is handled, so a blocked loop sees a
/// single tick instead of a backlog.
#[derive(Debug, Clone, Default)]
pub struct TickGate {
    pending: Arc<AtomicBool>,
}

impl TickGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no tick was pending and the caller should post one.
    pub fn arm(&self) -> bool {
        !self.pending.swap(true, Ordering::AcqRel)
    }

    pub fn clear(&self) {
        self.pending.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn ticks_until_stopped() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let mut pacer = Pacer::spawn(Arc::new(AtomicU64::new(1)), move || {
            counter.fetch_add(1, Ordering::Relaxed);
            true
        })
        .unwrap();
        thread::sleep(Duration::from_millis(50));
        pacer.stop();
        let seen = ticks.load(Ordering::Relaxed);
        assert!(seen > 0);
        assert!(!pacer.is_running());
        thread::sleep(Duration::from_millis(10));
        assert_eq!(ticks.load(Ordering::Relaxed), seen);
    }

    #[test]
    fn gate_holds_one_tick_until_cleared() {
        let gate = TickGate::new();
        let pacer_side = gate.clone();
        assert!(pacer_side.arm());
        assert!(!pacer_side.arm());
        assert!(!pacer_side.arm());
        gate.clear();
        assert!(pacer_side.arm());
    }

    #[test]
    fn ends_when_receiver_is_gone() {
        let pacer = Pacer::spawn(Arc::new(AtomicU64::new(0)), || false).unwrap();
        let give_up = Instant::now() + Duration::from_secs(5);
        while pacer.is_running() && Instant::now() < give_up {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(!pacer.is_running());
    }
}
