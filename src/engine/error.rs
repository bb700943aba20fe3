use std::io;
use std::path::PathBuf;

use thiserror::Error;
use winit::error::{EventLoopError, OsError};
use winit::window::BadIcon;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to read config {}: {source}", .path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("failed to load image {}: {source}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("image data is {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    ImageSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("invalid window icon: {0}")]
    Icon(#[from] BadIcon),
    #[error("layer {index} out of range, game has {count} layer(s)")]
    NoSuchLayer { index: usize, count: usize },
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create game window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to spawn engine thread: {0}")]
    SpawnPacer(#[source] io::Error),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}
