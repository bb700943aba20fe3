use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::engine::error::EngineError;

static NEXT_IMAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Decoded RGBA8 image. Clones share the pixel buffer and the id the
/// renderer caches its texture under.
#[derive(Clone)]
pub struct ImageResource {
    id: u64,
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
}

impl ImageResource {
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, EngineError> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(EngineError::ImageSize {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            id: NEXT_IMAGE_ID.fetch_add(1, Ordering::Relaxed),
            width,
            height,
            pixels: pixels.into(),
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let decoded = image::open(path).map_err(|source| EngineError::Image {
            path: path.to_path_buf(),
            source,
        })?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        tracing::debug!(path = %path.display(), width, height, "image loaded");
        Self::from_rgba(width, height, rgba.into_raw())
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

impl fmt::Debug for ImageResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageResource")
            .field("id", &self.id)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

#[derive(Default, Debug)]
pub struct ResourceCache {
    images: HashMap<PathBuf, ImageResource>,
}

impl ResourceCache {
    pub fn image(&mut self, path: impl AsRef<Path>) -> Result<ImageResource, EngineError> {
        let path = path.as_ref();
        if let Some(image) = self.images.get(path) {
            return Ok(image.clone());
        }
        let image = ImageResource::from_file(path)?;
        self.images.insert(path.to_path_buf(), image.clone());
        Ok(image)
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn clear(&mut self) {
        self.images.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba_length_is_validated() {
        let err = ImageResource::from_rgba(2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(
            err,
            EngineError::ImageSize {
                expected: 16,
                actual: 15,
                ..
            }
        ));
    }

    #[test]
    fn clones_share_id_and_new_images_do_not() {
        let a = ImageResource::from_rgba(1, 1, vec![255; 4]).unwrap();
        let b = ImageResource::from_rgba(1, 1, vec![255; 4]).unwrap();
        assert_eq!(a.clone().id(), a.id());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn cache_reports_missing_files() {
        let mut cache = ResourceCache::default();
        let err = cache.image("/no/such/sprite.png").unwrap_err();
        assert!(matches!(err, EngineError::Image { .. }));
        assert_eq!(cache.image_count(), 0);
    }

    fn write_png(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("frice-resources-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn png_decodes_to_rgba() {
        let path = write_png("decode.png");
        let image = ImageResource::from_file(&path).unwrap();
        assert_eq!((image.width(), image.height()), (3, 2));
        assert_eq!(image.pixels().len(), 24);
        assert_eq!(&image.pixels()[..4], &[10u8, 20, 30, 255]);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn cache_loads_each_path_once() {
        let path = write_png("cached.png");
        let mut cache = ResourceCache::default();
        let first = cache.image(&path).unwrap();
        let second = cache.image(&path).unwrap();
        assert_eq!(first.id(), second.id());
        assert_eq!(cache.image_count(), 1);

        cache.clear();
        let reloaded = cache.image(&path).unwrap();
        assert_ne!(reloaded.id(), first.id());
        std::fs::remove_file(path).unwrap();
    }
}
