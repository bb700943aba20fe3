pub mod core;
pub mod error;
pub mod frame;
pub mod headless;
pub mod platform;
pub mod renderer;
pub mod resources;
pub mod scene;
pub mod time;
pub mod window;

use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::{Duration, Instant};

use self::core::{Backend, EngineConfig};
use error::EngineError;
use frame::Frame;
use time::Timer;

use crate::game::event::{KeyEvent, MouseButton, MouseEvent};
use crate::game::{Context, Game, WindowRequest};
use crate::geom::Point;

/// Runs `game` on the backend named in `config` until the game exits.
pub fn launch<G: Game + 'static>(game: G, config: EngineConfig) -> Result<(), EngineError> {
    let backend = config.backend;
    let engine = Engine::new(game, config);
    match backend {
        Backend::Window => window::run(engine),
        Backend::Headless => {
            let report = headless::run(engine)?;
            tracing::info!(
                target: "engine",
                frames = report.frames,
                ticks = report.ticks,
                "headless run finished"
            );
            Ok(())
        }
    }
}

/// Backend-independent game loop state. Backends feed it wall-clock
/// instants and input, and draw the frames it returns.
pub struct Engine<G> {
    game: G,
    ctx: Context,
    config: EngineConfig,
    epoch: Instant,
    refresh: Timer,
    started: bool,
}

impl<G: Game> Engine<G> {
    pub fn new(game: G, config: EngineConfig) -> Self {
        Self::new_at(game, config, Instant::now())
    }

    pub fn new_at(mut game: G, config: EngineConfig, now: Instant) -> Self {
        let mut ctx = Context::new(&config, now);
        game.on_init(&mut ctx);
        let refresh = Timer::new(ctx.millis_to_refresh(), 0);
        tracing::debug!(target: "engine", game = game.name(), layers = ctx.layer_count(), "game initialized");
        Self {
            game,
            ctx,
            config,
            epoch: now,
            refresh,
            started: false,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut G {
        &mut self.game
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.ctx
    }

    pub fn exit_requested(&self) -> bool {
        self.ctx.exit_requested()
    }

    /// Runs `on_last_init` once; later calls do nothing.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        self.game.on_last_init(&mut self.ctx);
        tracing::info!(target: "engine", game = self.game.name(), "Engine start!");
    }

    /// One loop iteration. Returns whether a redraw is due.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.ctx.advance(now);
        self.ctx.apply_commands();
        self.ctx.run_deferred();
        self.game.on_refresh(&mut self.ctx);
        self.ctx.check_time_listeners();

        self.refresh.set_interval(self.ctx.millis_to_refresh());
        let wall_ms = self.wall_millis(now);
        !self.ctx.is_paused() && !self.ctx.is_stopped() && self.refresh.ended(wall_ms)
    }

    /// How long a backend may sleep before the next redraw could be due.
    pub fn until_next_refresh(&self, now: Instant) -> Duration {
        Duration::from_millis(self.refresh.remaining(self.wall_millis(now)))
    }

    /// Applies queued object changes, steps animations and builds the
    /// draw list.
    pub fn render(&mut self, now: Instant) -> Frame {
        self.ctx.advance(now);
        let now_ms = self.ctx.game_millis();
        let active_area = self.ctx.active_area;
        let mut dropped = 0;
        for layer in self.ctx.layers_mut() {
            layer.flush();
            dropped += layer.update(now_ms, active_area);
        }

        let mut frame = Frame::compose(self.ctx.layers(), self.ctx.background);
        if self.ctx.has_lost_focus() && self.ctx.lose_focus_change_color {
            frame.darken();
        }

        let fps_updated = self.ctx.fps_mut().record_frame(now);
        if self.ctx.debug {
            tracing::trace!(target: "engine", items = frame.items.len(), dropped, "frame composed");
            if fps_updated {
                tracing::debug!(target: "engine", fps = self.ctx.fps().display(), "fps sample");
            }
        }
        if self.ctx.show_fps {
            frame.fps = Some(self.ctx.fps().display());
        }
        frame
    }

    /// Focus change observed at `now`; the game clock stops or resumes
    /// from that instant.
    pub fn set_focus(&mut self, focused: bool, now: Instant) {
        self.ctx.advance(now);
        if focused == !self.ctx.has_lost_focus() {
            return;
        }
        self.ctx.set_focused(focused);
        if focused {
            self.game.on_focus(&mut self.ctx);
        } else {
            self.game.on_lose_focus(&mut self.ctx);
        }
    }

    /// Asks the game whether to close. Returns true when the loop should end.
    pub fn close_requested(&mut self) -> bool {
        let exit = self.game.on_exit(&mut self.ctx);
        if exit {
            self.ctx.exit();
        } else {
            tracing::debug!(target: "engine", "exit declined by game");
        }
        exit
    }

    pub fn mouse_moved(&mut self, position: Point, now: Instant) {
        self.ctx.advance(now);
        let event = self.ctx.mouse_mut().moved(position);
        self.dispatch_mouse(event);
    }

    pub fn mouse_left(&mut self) {
        self.ctx.mouse_mut().left();
    }

    pub fn mouse_button(&mut self, button: MouseButton, pressed: bool, now: Instant) {
        self.ctx.advance(now);
        if pressed {
            let event = self.ctx.mouse_mut().pressed(button);
            self.dispatch_mouse(event);
        } else {
            let events = self.ctx.mouse_mut().released(button);
            for event in events {
                self.dispatch_mouse(event);
            }
        }
    }

    fn dispatch_mouse(&mut self, event: MouseEvent) {
        self.ctx.dispatch_mouse(&event);
        self.game.on_mouse(&mut self.ctx, &event);
    }

    pub fn key(&mut self, event: KeyEvent, now: Instant) {
        self.ctx.advance(now);
        self.ctx.dispatch_key(&event);
        self.game.on_key(&mut self.ctx, &event);
    }

    pub fn take_window_requests(&mut self) -> Vec<WindowRequest> {
        self.ctx.take_window_requests()
    }

    pub fn refresh_handle(&self) -> Arc<AtomicU64> {
        self.ctx.refresh_handle()
    }

    fn wall_millis(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.epoch).as_millis() as u64
    }
}
