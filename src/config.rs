use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::edit::{self, EditLimits};
use crate::error::{CaptureError, Result};
use crate::geometry::CropRect;
use crate::intake;
use crate::raster;
use crate::slot::{SlotKind, SlotProfile};

/// User settings, read from `settings.toml` in the config directory.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub max_file_mb: f64,
    pub jpeg_quality: u8,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub wheel_step: f32,
    /// Screen-pixel radius around a corner that grabs its handle.
    pub handle_tolerance: f32,
    /// Keyed by slot (`id_card_front`, `passport_photo`, ...).
    pub default_crops: BTreeMap<String, CropRect>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_file_mb: (intake::MAX_FILE_BYTES / (1024 * 1024)) as f64,
            jpeg_quality: raster::DEFAULT_JPEG_QUALITY,
            min_zoom: edit::MIN_SCALE,
            max_zoom: edit::MAX_SCALE,
            wheel_step: edit::WHEEL_STEP,
            handle_tolerance: 10.0,
            default_crops: BTreeMap::new(),
        }
    }
}

impl Settings {
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("doc_capture");
        path.push("settings.toml");
        path
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| CaptureError::io(path, e))?;
        let settings: Settings = toml::from_str(&contents).map_err(|e| CaptureError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        settings.validated(path)
    }

    /// Missing file means defaults; a broken one is logged and ignored.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            return Self::default();
        }
        match Self::from_file(path) {
            Ok(settings) => {
                tracing::info!(path = %path.display(), "loaded settings");
                settings
            }
            Err(e) => {
                tracing::warn!(error = %e, "ignoring settings file");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| CaptureError::io(parent, e))?;
        }
        let text = toml::to_string_pretty(self).map_err(|e| CaptureError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        fs::write(path, text).map_err(|e| CaptureError::io(path, e))
    }

    fn validated(self, path: &Path) -> Result<Self> {
        let invalid = |message: &str| CaptureError::Config {
            path: path.to_path_buf(),
            message: message.to_owned(),
        };
        let max_mb = (intake::MAX_FILE_BYTES / (1024 * 1024)) as f64;
        if !(self.max_file_mb > 0.0 && self.max_file_mb <= max_mb) {
            return Err(invalid("max_file_mb must be in (0, 10]"));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(invalid("jpeg_quality must be between 1 and 100"));
        }
        if !(edit::MIN_SCALE <= self.min_zoom
            && self.min_zoom <= self.max_zoom
            && self.max_zoom <= edit::MAX_SCALE)
        {
            return Err(invalid("zoom range must satisfy 0.5 <= min_zoom <= max_zoom <= 3.0"));
        }
        if !(self.wheel_step > 0.0) || !(self.handle_tolerance > 0.0) {
            return Err(invalid("wheel_step and handle_tolerance must be positive"));
        }
        for key in self.default_crops.keys() {
            if !SlotKind::ALL.iter().any(|kind| kind.key() == key) {
                tracing::warn!(key = %key, "unknown slot in default_crops");
            }
        }
        Ok(self)
    }

    pub fn limits(&self) -> EditLimits {
        EditLimits {
            min_scale: self.min_zoom,
            max_scale: self.max_zoom,
            wheel_step: self.wheel_step,
            max_file_bytes: (self.max_file_mb * 1024.0 * 1024.0) as u64,
            jpeg_quality: self.jpeg_quality,
        }
    }

    pub fn profile(&self, kind: SlotKind) -> SlotProfile {
        let profile = kind.profile();
        match self.default_crops.get(kind.key()) {
            Some(rect) => profile.with_default_crop(*rect),
            None => profile,
        }
    }
}
