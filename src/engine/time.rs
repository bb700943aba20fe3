use std::fmt;
use std::time::{Duration, Instant};

use crate::game::Context;

const FPS_WINDOW: Duration = Duration::from_secs(1);

/// Game clock that stands still while paused.
#[derive(Debug, Clone)]
pub struct Clock {
    origin: Instant,
    paused_at: Option<Instant>,
    paused_total: Duration,
}

impl Clock {
    pub fn new(now: Instant) -> Self {
        Self {
            origin: now,
            paused_at: None,
            paused_total: Duration::ZERO,
        }
    }

    pub fn pause(&mut self, now: Instant) {
        if self.paused_at.is_none() {
            self.paused_at = Some(now);
        }
    }

    pub fn resume(&mut self, now: Instant) {
        if let Some(paused_at) = self.paused_at.take() {
            self.paused_total += now.saturating_duration_since(paused_at);
        }
    }

    pub fn millis_at(&self, now: Instant) -> u64 {
        let end = self.paused_at.unwrap_or(now);
        end.saturating_duration_since(self.origin)
            .saturating_sub(self.paused_total)
            .as_millis() as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timer {
    interval: u64,
    start: u64,
}

impl Timer {
    pub fn new(interval_ms: u64, now_ms: u64) -> Self {
        Self {
            interval: interval_ms,
            start: now_ms,
        }
    }

    pub fn set_interval(&mut self, interval_ms: u64) {
        self.interval = interval_ms;
    }

    pub fn restart(&mut self, now_ms: u64) {
        self.start = now_ms;
    }

    /// True at most once per elapsed interval. A caller more than one
    /// interval late is resynchronized instead of replaying missed ends.
    pub fn ended(&mut self, now_ms: u64) -> bool {
        let elapsed = now_ms.saturating_sub(self.start);
        if elapsed < self.interval {
            return false;
        }
        if elapsed >= self.interval.saturating_mul(2) {
            self.start = now_ms;
        } else {
            self.start += self.interval;
        }
        true
    }

    pub fn remaining(&self, now_ms: u64) -> u64 {
        self.start.saturating_add(self.interval).saturating_sub(now_ms)
    }
}

pub struct TimeListener {
    timer: Timer,
    remaining: Option<u32>,
    action: Box<dyn FnMut(&mut Context)>,
}

impl TimeListener {
    pub fn new(interval_ms: u64, action: impl FnMut(&mut Context) + 'static) -> Self {
        Self {
            timer: Timer::new(interval_ms, 0),
            remaining: None,
            action: Box::new(action),
        }
    }

    /// Limits the listener to `times` firings.
    pub fn times(mut self, times: u32) -> Self {
        self.remaining = Some(times);
        self
    }

    pub(crate) fn arm(&mut self, now_ms: u64) {
        self.timer.restart(now_ms);
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }

    pub fn check(&mut self, now_ms: u64, ctx: &mut Context) -> bool {
        if self.is_exhausted() || !self.timer.ended(now_ms) {
            return false;
        }
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= 1;
        }
        (self.action)(ctx);
        true
    }
}

impl fmt::Debug for TimeListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeListener")
            .field("timer", &self.timer)
            .field("remaining", &self.remaining)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default, Clone)]
pub struct FpsCounter {
    frames: u32,
    display: u32,
    window_start: Option<Instant>,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a frame; returns true when the displayed figure was refreshed.
    pub fn record_frame(&mut self, now: Instant) -> bool {
        self.frames += 1;
        let start = *self.window_start.get_or_insert(now);
        if now.saturating_duration_since(start) < FPS_WINDOW {
            return false;
        }
        self.display = self.frames;
        self.frames = 0;
        self.window_start = Some(now);
        true
    }

    pub fn display(&self) -> u32 {
        self.display
    }

    pub fn pending(&self) -> u32 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn clock_excludes_paused_time() {
        let t0 = Instant::now();
        let mut clock = Clock::new(t0);
        assert_eq!(clock.millis_at(t0 + ms(100)), 100);
        clock.pause(t0 + ms(100));
        assert_eq!(clock.millis_at(t0 + ms(900)), 100);
        clock.pause(t0 + ms(500));
        clock.resume(t0 + ms(1100));
        assert_eq!(clock.millis_at(t0 + ms(1200)), 200);
        clock.resume(t0 + ms(1300));
        assert_eq!(clock.millis_at(t0 + ms(1300)), 300);
    }

    #[test]
    fn timer_ends_once_per_interval() {
        let mut timer = Timer::new(10, 0);
        assert!(!timer.ended(5));
        assert!(timer.ended(10));
        assert!(!timer.ended(12));
        assert!(timer.ended(21));
        assert_eq!(timer.remaining(25), 5);
    }

    #[test]
    fn late_timer_resyncs() {
        let mut timer = Timer::new(10, 0);
        assert!(timer.ended(55));
        assert!(!timer.ended(60));
        assert!(timer.ended(65));
    }

    #[test]
    fn huge_interval_after_firing_never_ends() {
        let mut timer = Timer::new(4, 0);
        assert!(timer.ended(4));
        timer.set_interval(u64::MAX);
        assert!(!timer.ended(5));
        assert_eq!(timer.remaining(5), u64::MAX - 5);
    }

    #[test]
    fn zero_interval_always_ends() {
        let mut timer = Timer::new(0, 0);
        assert!(timer.ended(0));
        assert!(timer.ended(0));
    }

    #[test]
    fn fps_counter_rolls_over_each_second() {
        let t0 = Instant::now();
        let mut fps = FpsCounter::new();
        for i in 0..4 {
            assert!(!fps.record_frame(t0 + ms(i * 250)));
        }
        assert_eq!(fps.display(), 0);
        assert!(fps.record_frame(t0 + ms(1000)));
        assert_eq!(fps.display(), 5);
        assert_eq!(fps.pending(), 0);
        assert!(!fps.record_frame(t0 + ms(1500)));
        assert_eq!(fps.display(), 5);
    }
}
