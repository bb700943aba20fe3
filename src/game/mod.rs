pub mod anim;
pub mod dialog;
pub mod event;
pub mod object;

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::color::Color;
use crate::engine::core::EngineConfig;
use crate::engine::error::EngineError;
use crate::engine::resources::{ImageResource, ResourceCache};
use crate::engine::scene::Layer;
use crate::engine::time::{Clock, FpsCounter, TimeListener};
use crate::geom::{Point, Rect};
use dialog::Dialogs;
use event::{
    CommandQueue, CommandSender, EngineCommand, EventManager, KeyEvent, KeyListener, MouseAction,
    MouseEvent, MouseState,
};
use object::{GameObject, ObjectId};

/// Lifecycle hooks a game overrides. Every hook runs on the event-loop
/// thread with exclusive access to the game state.
pub trait Game {
    fn name(&self) -> &str {
        "Frice Game"
    }

    /// Called once while the engine is being built, before any window.
    fn on_init(&mut self, _ctx: &mut Context) {}

    /// Called once right before the loop starts.
    fn on_last_init(&mut self, _ctx: &mut Context) {}

    /// Called on every loop tick, paused or not.
    fn on_refresh(&mut self, _ctx: &mut Context) {}

    fn on_focus(&mut self, _ctx: &mut Context) {}

    fn on_lose_focus(&mut self, _ctx: &mut Context) {}

    /// Window close was requested. Returning true ends the loop.
    fn on_exit(&mut self, ctx: &mut Context) -> bool {
        ctx.dialogs().confirm_yes_no("Are you sure to exit?", "")
    }

    fn on_mouse(&mut self, _ctx: &mut Context, _event: &MouseEvent) {}

    fn on_key(&mut self, _ctx: &mut Context, _event: &KeyEvent) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum WindowRequest {
    SetTitle(String),
    SetFullscreen(bool),
    SetAlwaysOnTop(bool),
}

pub struct Context {
    title: String,
    bounds: Rect,
    layers: Vec<Layer>,
    next_object: u64,
    pub active_area: Option<Rect>,
    pub background: Color,
    pub debug: bool,
    pub show_fps: bool,
    pub lose_focus_change_color: bool,
    paused: bool,
    stopped: bool,
    lose_focus: bool,
    fullscreen: bool,
    always_on_top: bool,
    millis_to_refresh: Arc<AtomicU64>,
    clock: Clock,
    now: Instant,
    fps: FpsCounter,
    mouse: MouseState,
    time_listeners: Vec<TimeListener>,
    key_listeners: Vec<KeyListener>,
    mouse_listeners: Vec<MouseAction>,
    events: EventManager,
    commands: CommandQueue,
    command_sender: CommandSender,
    dialogs: Box<dyn Dialogs>,
    resources: ResourceCache,
    window_requests: Vec<WindowRequest>,
    exit_requested: bool,
}

impl Context {
    pub(crate) fn new(config: &EngineConfig, now: Instant) -> Self {
        let (commands, command_sender) = CommandQueue::new();
        Self {
            title: config.title.clone(),
            bounds: config.bounds,
            layers: (0..config.layer_count.max(1)).map(|_| Layer::new()).collect(),
            next_object: 1,
            active_area: None,
            background: Color::WHITE,
            debug: config.debug,
            show_fps: config.show_fps,
            lose_focus_change_color: config.lose_focus_change_color,
            paused: false,
            stopped: false,
            lose_focus: false,
            fullscreen: config.fullscreen,
            always_on_top: config.always_on_top,
            millis_to_refresh: Arc::new(AtomicU64::new(config.millis_to_refresh)),
            clock: Clock::new(now),
            now,
            fps: FpsCounter::new(),
            mouse: MouseState::default(),
            time_listeners: Vec::new(),
            key_listeners: Vec::new(),
            mouse_listeners: Vec::new(),
            events: EventManager::default(),
            commands,
            command_sender,
            dialogs: dialog::from_mode(config.dialogs),
            resources: ResourceCache::default(),
            window_requests: Vec::new(),
            exit_requested: false,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.window_requests
            .push(WindowRequest::SetTitle(self.title.clone()));
    }

    /// Window bounds the game was configured with.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn layer_mut(&mut self, index: usize) -> Option<&mut Layer> {
        self.layers.get_mut(index)
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub(crate) fn layers_mut(&mut self) -> &mut [Layer] {
        &mut self.layers
    }

    /// Queues `object` on the bottom layer; it shows up from the next frame.
    pub fn add_object(&mut self, object: GameObject) -> ObjectId {
        let id = self.allocate_id();
        self.layers[0].add(id, object);
        id
    }

    pub fn add_object_to(&mut self, layer: usize, object: GameObject) -> Result<ObjectId, EngineError> {
        let count = self.layers.len();
        if layer >= count {
            return Err(EngineError::NoSuchLayer {
                index: layer,
                count,
            });
        }
        let id = self.allocate_id();
        self.layers[layer].add(id, object);
        Ok(id)
    }

    pub fn add_objects(&mut self, objects: impl IntoIterator<Item = GameObject>) -> Vec<ObjectId> {
        objects
            .into_iter()
            .map(|object| self.add_object(object))
            .collect()
    }

    pub fn remove_object(&mut self, id: ObjectId) {
        for layer in &mut self.layers {
            layer.remove(id);
        }
    }

    pub fn clear_objects(&mut self) {
        for layer in &mut self.layers {
            layer.clear();
        }
    }

    pub fn object(&self, id: ObjectId) -> Option<&GameObject> {
        self.layers.iter().find_map(|layer| layer.get(id))
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut GameObject> {
        self.layers.iter_mut().find_map(|layer| layer.get_mut(id))
    }

    /// Top-most object under `point` across all layers.
    pub fn object_at(&self, point: Point) -> Option<ObjectId> {
        self.layers
            .iter()
            .rev()
            .find_map(|layer| layer.object_at(point))
    }

    fn allocate_id(&mut self) -> ObjectId {
        let id = ObjectId(self.next_object);
        self.next_object += 1;
        id
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
        self.sync_clock();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn set_stopped(&mut self, stopped: bool) {
        self.stopped = stopped;
        self.sync_clock();
    }

    pub fn has_lost_focus(&self) -> bool {
        self.lose_focus
    }

    pub(crate) fn set_focused(&mut self, focused: bool) {
        self.lose_focus = !focused;
        self.sync_clock();
    }

    fn sync_clock(&mut self) {
        if self.paused || self.stopped || self.lose_focus {
            self.clock.pause(self.now);
        } else {
            self.clock.resume(self.now);
        }
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        self.fullscreen = fullscreen;
        self.window_requests
            .push(WindowRequest::SetFullscreen(fullscreen));
    }

    pub fn is_always_on_top(&self) -> bool {
        self.always_on_top
    }

    pub fn set_always_on_top(&mut self, always_on_top: bool) {
        self.always_on_top = always_on_top;
        self.window_requests
            .push(WindowRequest::SetAlwaysOnTop(always_on_top));
    }

    pub fn millis_to_refresh(&self) -> u64 {
        self.millis_to_refresh.load(Ordering::Relaxed)
    }

    pub fn set_millis_to_refresh(&mut self, millis: u64) {
        self.millis_to_refresh.store(millis, Ordering::Relaxed);
    }

    /// Shared refresh interval, read by the pacer thread.
    pub(crate) fn refresh_handle(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.millis_to_refresh)
    }

    /// Game time in milliseconds; stands still while paused, stopped or
    /// unfocused.
    pub fn game_millis(&self) -> u64 {
        self.clock.millis_at(self.now)
    }

    pub fn now(&self) -> Instant {
        self.now
    }

    pub(crate) fn advance(&mut self, now: Instant) {
        self.now = now.max(self.now);
    }

    pub fn fps(&self) -> &FpsCounter {
        &self.fps
    }

    pub(crate) fn fps_mut(&mut self) -> &mut FpsCounter {
        &mut self.fps
    }

    pub fn mouse(&self) -> &MouseState {
        &self.mouse
    }

    pub(crate) fn mouse_mut(&mut self) -> &mut MouseState {
        &mut self.mouse
    }

    pub fn add_time_listener(&mut self, mut listener: TimeListener) {
        listener.arm(self.game_millis());
        self.time_listeners.push(listener);
    }

    pub fn time_listener_count(&self) -> usize {
        self.time_listeners.len()
    }

    pub fn add_key_listener(&mut self, listener: KeyListener) {
        self.key_listeners.push(listener);
    }

    pub fn add_mouse_listener(&mut self, listener: impl FnMut(&mut Context, &MouseEvent) + 'static) {
        self.mouse_listeners.push(Box::new(listener));
    }

    /// Runs `event` at the start of the next tick.
    pub fn defer(&mut self, event: impl FnOnce(&mut Context) + 'static) {
        self.events.insert(event);
    }

    pub fn events(&self) -> &EventManager {
        &self.events
    }

    pub fn command_sender(&self) -> CommandSender {
        self.command_sender.clone()
    }

    pub fn dialogs(&mut self) -> &mut dyn Dialogs {
        self.dialogs.as_mut()
    }

    pub fn set_dialogs(&mut self, dialogs: impl Dialogs + 'static) {
        self.dialogs = Box::new(dialogs);
    }

    pub fn resources(&mut self) -> &mut ResourceCache {
        &mut self.resources
    }

    pub fn load_image(&mut self, path: impl AsRef<Path>) -> Result<ImageResource, EngineError> {
        self.resources.image(path)
    }

    pub fn exit(&mut self) {
        self.exit_requested = true;
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    pub(crate) fn take_window_requests(&mut self) -> Vec<WindowRequest> {
        std::mem::take(&mut self.window_requests)
    }

    pub(crate) fn apply_commands(&mut self) {
        while let Some(command) = self.commands.try_recv() {
            tracing::debug!(target: "engine", ?command, "applying command");
            match command {
                EngineCommand::Pause => self.set_paused(true),
                EngineCommand::Resume => self.set_paused(false),
                EngineCommand::Stop => self.set_stopped(true),
                EngineCommand::Start => self.set_stopped(false),
                EngineCommand::SetRefreshMillis(millis) => self.set_millis_to_refresh(millis),
                EngineCommand::Exit => self.exit(),
            }
        }
    }

    pub(crate) fn run_deferred(&mut self) {
        for event in self.events.take() {
            event(self);
        }
    }

    pub(crate) fn check_time_listeners(&mut self) {
        let now_ms = self.game_millis();
        let mut listeners = std::mem::take(&mut self.time_listeners);
        for listener in &mut listeners {
            listener.check(now_ms, self);
        }
        listeners.retain(|listener| !listener.is_exhausted());
        listeners.append(&mut self.time_listeners);
        self.time_listeners = listeners;
    }

    pub(crate) fn dispatch_key(&mut self, event: &KeyEvent) {
        let mut listeners = std::mem::take(&mut self.key_listeners);
        for listener in &mut listeners {
            listener.dispatch(self, event);
        }
        listeners.append(&mut self.key_listeners);
        self.key_listeners = listeners;
    }

    pub(crate) fn dispatch_mouse(&mut self, event: &MouseEvent) {
        let mut listeners = std::mem::take(&mut self.mouse_listeners);
        for listener in &mut listeners {
            listener(self, event);
        }
        listeners.append(&mut self.mouse_listeners);
        self.mouse_listeners = listeners;
    }
}
