use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engine::error::EngineError;
use crate::geom::{Rect, BIG_SQUARE};

pub const CONFIG_ENV_VAR: &str = "FRICE_CONFIG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Backend {
    #[default]
    Window,
    Headless,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DialogMode {
    /// Never blocks: messages are logged and confirmations answered "yes".
    #[default]
    Auto,
    Console,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub title: String,
    pub bounds: Rect,
    pub layer_count: usize,
    pub millis_to_refresh: u64,
    pub show_fps: bool,
    pub debug: bool,
    pub lose_focus_change_color: bool,
    pub resizable: bool,
    pub always_on_top: bool,
    pub fullscreen: bool,
    pub icon: Option<PathBuf>,
    pub backend: Backend,
    pub dialogs: DialogMode,
    /// Headless backend only: stop after this many rendered frames.
    pub max_frames: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: "Frice Engine".to_string(),
            bounds: BIG_SQUARE,
            layer_count: 1,
            millis_to_refresh: 4,
            show_fps: true,
            debug: true,
            lose_focus_change_color: true,
            resizable: false,
            always_on_top: false,
            fullscreen: false,
            icon: None,
            backend: Backend::Window,
            dialogs: DialogMode::Auto,
            max_frames: None,
        }
    }
}

impl EngineConfig {
    pub fn from_ron_str(source: &str, path: &Path) -> Result<Self, EngineError> {
        ron::from_str(source).map_err(|source| EngineError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| EngineError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron_str(&source, path)
    }

    /// Reads the file named by `FRICE_CONFIG`, or the defaults when unset.
    pub fn from_env() -> Result<Self, EngineError> {
        match env::var_os(CONFIG_ENV_VAR) {
            Some(path) => {
                tracing::info!(target: "engine", path = ?path, "loading engine config");
                Self::load(PathBuf::from(path))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_bounds(mut self, bounds: Rect) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_layers(mut self, layer_count: usize) -> Self {
        self.layer_count = layer_count;
        self
    }

    pub fn headless(mut self, max_frames: Option<u64>) -> Self {
        self.backend = Backend::Headless;
        self.max_frames = max_frames;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::SMALL_SQUARE;

    #[test]
    fn partial_ron_falls_back_to_defaults() {
        let config = EngineConfig::from_ron_str(
            "(title: \"demo\", millis_to_refresh: 16, backend: Headless)",
            Path::new("inline.ron"),
        )
        .unwrap();
        assert_eq!(config.title, "demo");
        assert_eq!(config.millis_to_refresh, 16);
        assert_eq!(config.backend, Backend::Headless);
        assert_eq!(config.bounds, BIG_SQUARE);
        assert_eq!(config.layer_count, 1);
    }

    #[test]
    fn bounds_parse_from_ron() {
        let config = EngineConfig::from_ron_str(
            "(bounds: (x: 100.0, y: 100.0, width: 400.0, height: 400.0))",
            Path::new("inline.ron"),
        )
        .unwrap();
        assert_eq!(config.bounds, SMALL_SQUARE);
    }

    #[test]
    fn malformed_ron_reports_path() {
        let err = EngineConfig::from_ron_str("(title: )", Path::new("bad.ron")).unwrap_err();
        assert!(err.to_string().contains("bad.ron"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = EngineConfig::load("/definitely/not/here.ron").unwrap_err();
        assert!(matches!(err, EngineError::ConfigIo { .. }));
    }

    // Keep this the only test that sets FRICE_CONFIG.
    #[test]
    fn env_var_names_the_config_file() {
        let path = env::temp_dir().join(format!("frice-config-{}.ron", std::process::id()));
        fs::write(&path, "(title: \"from env\", layer_count: 3)").unwrap();

        env::set_var(CONFIG_ENV_VAR, &path);
        let loaded = EngineConfig::from_env();
        env::remove_var(CONFIG_ENV_VAR);
        let defaults = EngineConfig::from_env().unwrap();
        fs::remove_file(&path).unwrap();

        let loaded = loaded.unwrap();
        assert_eq!(loaded.title, "from env");
        assert_eq!(loaded.layer_count, 3);
        assert_eq!(defaults, EngineConfig::default());
    }
}
