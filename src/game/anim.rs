//! Per-object animations driven by the game clock.
//!
//! Every animation applies the change between its previous and current
//! step, so several animations can act on one transform at once.

use crate::game::object::Transform;

pub trait Anim {
    fn step(&mut self, transform: &mut Transform, now_ms: u64);

    fn finished(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Elapsed {
    start: Option<u64>,
    last: u64,
}

impl Elapsed {
    /// Seconds since the first step as `(previous, current)`; `None` on the
    /// first step, which only records the start.
    fn advance(&mut self, now_ms: u64) -> Option<(f64, f64)> {
        let Some(start) = self.start else {
            self.start = Some(now_ms);
            self.last = now_ms;
            return None;
        };
        let now_ms = now_ms.max(self.last);
        let prev = (self.last - start) as f64 / 1000.0;
        let cur = (now_ms - start) as f64 / 1000.0;
        self.last = now_ms;
        Some((prev, cur))
    }
}

/// Constant velocity in pixels per second.
#[derive(Debug, Clone, Copy)]
pub struct SimpleMove {
    pub vx: f64,
    pub vy: f64,
    elapsed: Elapsed,
}

impl SimpleMove {
    pub fn new(vx: f64, vy: f64) -> Self {
        Self {
            vx,
            vy,
            elapsed: Elapsed::default(),
        }
    }
}

impl Anim for SimpleMove {
    fn step(&mut self, transform: &mut Transform, now_ms: u64) {
        if let Some((prev, cur)) = self.elapsed.advance(now_ms) {
            transform.x += self.vx * (cur - prev);
            transform.y += self.vy * (cur - prev);
        }
    }
}

/// Uniform acceleration from rest in pixels per second squared.
#[derive(Debug, Clone, Copy)]
pub struct AccelerateMove {
    pub ax: f64,
    pub ay: f64,
    elapsed: Elapsed,
}

impl AccelerateMove {
    pub fn new(ax: f64, ay: f64) -> Self {
        Self {
            ax,
            ay,
            elapsed: Elapsed::default(),
        }
    }
}

impl Anim for AccelerateMove {
    fn step(&mut self, transform: &mut Transform, now_ms: u64) {
        if let Some((prev, cur)) = self.elapsed.advance(now_ms) {
            let dt2 = cur * cur - prev * prev;
            transform.x += 0.5 * self.ax * dt2;
            transform.y += 0.5 * self.ay * dt2;
        }
    }
}

/// Constant angular velocity in radians per second.
#[derive(Debug, Clone, Copy)]
pub struct SimpleRotate {
    pub omega: f64,
    elapsed: Elapsed,
}

impl SimpleRotate {
    pub fn new(omega: f64) -> Self {
        Self {
            omega,
            elapsed: Elapsed::default(),
        }
    }
}

impl Anim for SimpleRotate {
    fn step(&mut self, transform: &mut Transform, now_ms: u64) {
        if let Some((prev, cur)) = self.elapsed.advance(now_ms) {
            transform.rotate += self.omega * (cur - prev);
        }
    }
}

/// Angular acceleration from rest in radians per second squared.
#[derive(Debug, Clone, Copy)]
pub struct AccelerateRotate {
    pub alpha: f64,
    elapsed: Elapsed,
}

impl AccelerateRotate {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            elapsed: Elapsed::default(),
        }
    }
}

impl Anim for AccelerateRotate {
    fn step(&mut self, transform: &mut Transform, now_ms: u64) {
        if let Some((prev, cur)) = self.elapsed.advance(now_ms) {
            transform.rotate += 0.5 * self.alpha * (cur * cur - prev * prev);
        }
    }
}

/// Scale factor change per second on each axis.
#[derive(Debug, Clone, Copy)]
pub struct SimpleScale {
    pub rx: f64,
    pub ry: f64,
    elapsed: Elapsed,
}

impl SimpleScale {
    pub fn new(rx: f64, ry: f64) -> Self {
        Self {
            rx,
            ry,
            elapsed: Elapsed::default(),
        }
    }
}

impl Anim for SimpleScale {
    fn step(&mut self, transform: &mut Transform, now_ms: u64) {
        if let Some((prev, cur)) = self.elapsed.advance(now_ms) {
            transform.scale_x = (transform.scale_x + self.rx * (cur - prev)).max(0.0);
            transform.scale_y = (transform.scale_y + self.ry * (cur - prev)).max(0.0);
        }
    }
}

/// Runs the wrapped animation for a fixed stretch of game time.
#[derive(Debug, Clone, Copy)]
pub struct Limited<A> {
    inner: A,
    duration_ms: u64,
    start: Option<u64>,
    done: bool,
}

impl<A: Anim> Anim for Limited<A> {
    fn step(&mut self, transform: &mut Transform, now_ms: u64) {
        if self.done {
            return;
        }
        let start = *self.start.get_or_insert(now_ms);
        let end = start.saturating_add(self.duration_ms);
        self.inner.step(transform, now_ms.min(end));
        self.done = now_ms >= end;
    }

    fn finished(&self) -> bool {
        self.done || self.inner.finished()
    }
}

pub trait AnimExt: Anim + Sized {
    fn limit(self, duration_ms: u64) -> Limited<Self> {
        Limited {
            inner: self,
            duration_ms,
            start: None,
            done: false,
        }
    }
}

impl<A: Anim> AnimExt for A {}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn first_step_only_records_start() {
        let mut transform = Transform::at(5.0, 5.0);
        let mut anim = SimpleMove::new(100.0, 0.0);
        anim.step(&mut transform, 1_000);
        assert!(approx(transform.x, 5.0));
        anim.step(&mut transform, 1_500);
        assert!(approx(transform.x, 55.0));
    }

    #[test]
    fn accelerate_move_follows_half_a_t_squared() {
        let mut transform = Transform::at(0.0, 0.0);
        let mut anim = AccelerateMove::new(0.0, 10.0);
        anim.step(&mut transform, 0);
        anim.step(&mut transform, 1_000);
        anim.step(&mut transform, 2_000);
        assert!(approx(transform.y, 20.0));
    }

    #[test]
    fn accelerate_rotate_spins_up() {
        let mut transform = Transform::at(0.0, 0.0);
        let mut anim = AccelerateRotate::new(3.0);
        anim.step(&mut transform, 0);
        anim.step(&mut transform, 1_000);
        assert!(approx(transform.rotate, 1.5));
        anim.step(&mut transform, 2_000);
        assert!(approx(transform.rotate, 6.0));
    }

    #[test]
    fn scale_never_goes_negative() {
        let mut transform = Transform::at(0.0, 0.0);
        let mut anim = SimpleScale::new(-2.0, 0.5);
        anim.step(&mut transform, 0);
        anim.step(&mut transform, 1_000);
        assert!(approx(transform.scale_x, 0.0));
        assert!(approx(transform.scale_y, 1.5));
    }

    #[test]
    fn limited_anim_stops_at_its_duration() {
        let mut transform = Transform::at(0.0, 0.0);
        let mut anim = SimpleRotate::new(1.0).limit(500);
        anim.step(&mut transform, 100);
        anim.step(&mut transform, 400);
        assert!(!anim.finished());
        anim.step(&mut transform, 2_000);
        assert!(anim.finished());
        assert!(approx(transform.rotate, 0.5));
    }
}
