use std::thread;
use std::time::{Duration, Instant};

use crate::engine::error::EngineError;
use crate::engine::frame::Frame;
use crate::engine::Engine;
use crate::game::Game;

const IDLE_SLEEP: Duration = Duration::from_millis(1);

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HeadlessReport {
    pub ticks: u64,
    pub frames: u64,
    pub last_item_count: usize,
    pub last_fps: u32,
}

/// Stands in for the GPU renderer: keeps the last frame and counts.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    frames: u64,
    last: Option<Frame>,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, frame: Frame) {
        self.frames += 1;
        tracing::trace!(frame = self.frames, items = frame.items.len(), "headless frame");
        self.last = Some(frame);
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.last.as_ref()
    }
}

/// Drives `engine` on the calling thread without a window, until the game
/// exits or `max_frames` frames were rendered.
pub fn run<G: Game>(mut engine: Engine<G>) -> Result<HeadlessReport, EngineError> {
    let max_frames = engine.config().max_frames;
    let mut renderer = HeadlessRenderer::new();
    let mut report = HeadlessReport::default();

    engine.start();
    engine.set_focus(true, Instant::now());
    loop {
        let now = Instant::now();
        report.ticks += 1;
        if engine.tick(now) {
            renderer.render(engine.render(now));
        }
        for request in engine.take_window_requests() {
            tracing::trace!(?request, "window request ignored without a window");
        }
        if engine.exit_requested() {
            tracing::info!(target: "engine", "exit requested by game");
            break;
        }
        if max_frames.is_some_and(|max| renderer.frames() >= max) {
            break;
        }
        thread::sleep(engine.until_next_refresh(Instant::now()).max(IDLE_SLEEP));
    }

    report.frames = renderer.frames();
    report.last_item_count = renderer.last_frame().map_or(0, |frame| frame.items.len());
    report.last_fps = engine.context().fps().display();
    tracing::info!(target: "engine", frames = report.frames, "Engine shutdown complete");
    Ok(report)
}
