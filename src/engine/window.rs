use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use wgpu::SurfaceError;
use winit::{
    dpi::{LogicalPosition, LogicalSize},
    event::{ElementState, Event, WindowEvent},
    event_loop::{ControlFlow, EventLoopBuilder},
    keyboard::PhysicalKey,
    window::{Icon, Window, WindowBuilder, WindowLevel},
};

use crate::engine::error::EngineError;
use crate::engine::platform::{Pacer, TickGate};
use crate::engine::renderer::Renderer;
use crate::engine::resources::ImageResource;
use crate::engine::Engine;
use crate::game::event::{KeyEvent, KeyEventKind};
use crate::game::{Game, WindowRequest};
use crate::geom::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopEvent {
    Tick,
}

/// Opens the game window and runs the loop on the calling thread, which
/// must be the main thread on most platforms.
pub fn run<G: Game + 'static>(mut engine: Engine<G>) -> Result<(), EngineError> {
    let event_loop = EventLoopBuilder::<LoopEvent>::with_user_event()
        .build()
        .map_err(EngineError::CreateEventLoop)?;

    let config = engine.config().clone();
    let bounds = config.bounds;
    let mut builder = WindowBuilder::new()
        .with_title(config.title.clone())
        .with_inner_size(LogicalSize::new(bounds.width, bounds.height))
        .with_position(LogicalPosition::new(bounds.x, bounds.y))
        .with_resizable(config.resizable)
        .with_maximized(config.fullscreen);
    if config.always_on_top {
        builder = builder.with_window_level(WindowLevel::AlwaysOnTop);
    }
    if let Some(path) = config.icon.as_deref() {
        builder = builder.with_window_icon(Some(load_icon(path)?));
    }
    let window = Arc::new(builder.build(&event_loop).map_err(EngineError::CreateWindow)?);

    let proxy = event_loop.create_proxy();
    let gate = TickGate::new();
    let pacer_gate = gate.clone();
    let mut pacer = Some(
        Pacer::spawn(engine.refresh_handle(), move || {
            !pacer_gate.arm() || proxy.send_event(LoopEvent::Tick).is_ok()
        })
        .map_err(EngineError::SpawnPacer)?,
    );

    engine.start();
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut renderer: Option<Renderer> = None;
    let mut shown_fps: Option<u32> = None;

    event_loop
        .run(move |event, target| match event {
            Event::Resumed => {
                if renderer.is_none() {
                    match pollster::block_on(Renderer::new(window.clone())) {
                        Ok(new_renderer) => {
                            tracing::info!(target: "engine", "renderer initialized");
                            renderer = Some(new_renderer);
                        }
                        Err(err) => {
                            tracing::error!(target: "engine", %err, "failed to initialize renderer");
                            target.exit();
                        }
                    }
                }
            }
            Event::UserEvent(LoopEvent::Tick) => {
                gate.clear();
                if engine.tick(Instant::now()) && renderer.is_some() {
                    window.request_redraw();
                }
                if apply_window_requests(&window, engine.take_window_requests()) {
                    window.set_title(&window_title(engine.context().title(), shown_fps));
                }
                if engine.exit_requested() {
                    target.exit();
                }
            }
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    tracing::info!(target: "engine", "window close requested");
                    if engine.close_requested() {
                        target.exit();
                    }
                }
                WindowEvent::Focused(focused) => engine.set_focus(focused, Instant::now()),
                WindowEvent::Resized(size) => {
                    if let Some(renderer) = renderer.as_mut() {
                        renderer.resize(size);
                    }
                }
                WindowEvent::ScaleFactorChanged {
                    scale_factor,
                    mut inner_size_writer,
                } => {
                    let new_size = window.inner_size();
                    let _ = inner_size_writer.request_inner_size(new_size);
                    if let Some(renderer) = renderer.as_mut() {
                        renderer.set_scale_factor(scale_factor);
                        renderer.resize(new_size);
                    }
                }
                WindowEvent::CursorMoved { position, .. } => {
                    let logical = position.to_logical::<f64>(window.scale_factor());
                    engine.mouse_moved(Point::new(logical.x, logical.y), Instant::now());
                }
                WindowEvent::CursorLeft { .. } => engine.mouse_left(),
                WindowEvent::MouseInput { state, button, .. } => {
                    engine.mouse_button(button, state == ElementState::Pressed, Instant::now());
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    let now = Instant::now();
                    for key in translate_key(&event) {
                        engine.key(key, now);
                    }
                }
                WindowEvent::RedrawRequested => {
                    if let Some(renderer) = renderer.as_mut() {
                        let frame = engine.render(Instant::now());
                        if frame.fps != shown_fps {
                            shown_fps = frame.fps;
                            window.set_title(&window_title(engine.context().title(), frame.fps));
                        }
                        match renderer.render(&frame) {
                            Ok(()) => {}
                            Err(SurfaceError::Lost | SurfaceError::Outdated) => {
                                renderer.resize(renderer.size());
                            }
                            Err(SurfaceError::OutOfMemory) => {
                                tracing::error!(target: "engine", "GPU out of memory, shutting down engine");
                                target.exit();
                            }
                            Err(SurfaceError::Timeout) => {
                                tracing::warn!(target: "engine", "surface timeout, retrying next frame");
                            }
                        }
                    }
                }
                _ => {}
            },
            Event::LoopExiting => {
                if let Some(mut pacer) = pacer.take() {
                    pacer.stop();
                    tracing::debug!(target: "engine", uptime_ms = pacer.uptime().as_millis() as u64, "pacer stopped");
                }
            }
            _ => {}
        })
        .map_err(EngineError::EventLoopRun)?;

    tracing::info!(target: "engine", "Engine shutdown complete");
    Ok(())
}

fn window_title(title: &str, fps: Option<u32>) -> String {
    match fps {
        Some(fps) => format!("{title}  fps: {fps}"),
        None => title.to_string(),
    }
}

/// Returns whether the title changed.
fn apply_window_requests(window: &Window, requests: Vec<WindowRequest>) -> bool {
    let mut retitled = false;
    for request in requests {
        tracing::debug!(target: "engine", ?request, "window request");
        match request {
            WindowRequest::SetTitle(_) => retitled = true,
            WindowRequest::SetFullscreen(fullscreen) => window.set_maximized(fullscreen),
            WindowRequest::SetAlwaysOnTop(on_top) => window.set_window_level(if on_top {
                WindowLevel::AlwaysOnTop
            } else {
                WindowLevel::Normal
            }),
        }
    }
    retitled
}

fn load_icon(path: &Path) -> Result<Icon, EngineError> {
    let image = ImageResource::from_file(path)?;
    Ok(Icon::from_rgba(
        image.pixels().to_vec(),
        image.width(),
        image.height(),
    )?)
}

/// A press that produces text is followed by a typed event.
fn translate_key(event: &winit::event::KeyEvent) -> Vec<KeyEvent> {
    let code = match event.physical_key {
        PhysicalKey::Code(code) => Some(code),
        PhysicalKey::Unidentified(_) => None,
    };
    let pressed = event.state == ElementState::Pressed;
    let mut events = vec![KeyEvent {
        kind: if pressed {
            KeyEventKind::Pressed
        } else {
            KeyEventKind::Released
        },
        code,
        text: None,
        repeat: event.repeat,
    }];
    if pressed {
        if let Some(text) = event.text.as_ref().filter(|text| !text.is_empty()) {
            events.push(KeyEvent {
                repeat: event.repeat,
                ..KeyEvent::typed(code, text.as_str())
            });
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_shows_fps_only_when_enabled() {
        assert_eq!(window_title("Game", Some(60)), "Game  fps: 60");
        assert_eq!(window_title("Game", None), "Game");
    }
}
