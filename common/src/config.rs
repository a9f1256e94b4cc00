use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::frame::FrameGeometry;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub background: BackgroundConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_channels")]
    pub channels: u32,
    /// Directory replayed by the frame source, in file-name order.
    #[serde(default = "default_frames_dir")]
    pub frames_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackgroundConfig {
    /// Number of frames N averaged by the background model.
    #[serde(default = "default_window_frames")]
    pub window_frames: u32,
    /// Absolute intensity difference above which a pixel counts as changed.
    #[serde(default = "default_diff_threshold")]
    pub diff_threshold: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "default_crowded_min_probability")]
    pub crowded_min_probability: f32,
    #[serde(default = "default_crowded_min_ratio")]
    pub crowded_min_ratio: f32,
    #[serde(default = "default_some_min_probability")]
    pub some_min_probability: f32,
    #[serde(default = "default_some_min_ratio")]
    pub some_min_ratio: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// Quantization zero point of the model's output tensor.
    #[serde(default = "default_zero_point")]
    pub zero_point: i32,
    /// Quantization scale of the model's output tensor.
    #[serde(default = "default_scale")]
    pub scale: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_cycle_interval_ms")]
    pub cycle_interval_ms: u64,
    /// Pacing used while the background window is still filling.
    #[serde(default = "default_warmup_interval_ms")]
    pub warmup_interval_ms: u64,
    #[serde(default)]
    pub status_path: Option<PathBuf>,
    #[serde(default)]
    pub background_snapshot: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            channels: default_channels(),
            frames_dir: default_frames_dir(),
        }
    }
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            window_frames: default_window_frames(),
            diff_threshold: default_diff_threshold(),
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            crowded_min_probability: default_crowded_min_probability(),
            crowded_min_ratio: default_crowded_min_ratio(),
            some_min_probability: default_some_min_probability(),
            some_min_ratio: default_some_min_ratio(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            zero_point: default_zero_point(),
            scale: default_scale(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            cycle_interval_ms: default_cycle_interval_ms(),
            warmup_interval_ms: default_warmup_interval_ms(),
            status_path: None,
            background_snapshot: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl CameraConfig {
    pub fn geometry(&self) -> FrameGeometry {
        FrameGeometry::new(self.width, self.height, self.channels)
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        Self::parse(&content)
    }

    /// Parse and validate a TOML document.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.camera
            .geometry()
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("camera: {e}")))?;
        if self.background.window_frames == 0 {
            return Err(ConfigError::Invalid(
                "background.window_frames must be at least 1".into(),
            ));
        }
        if !(self.background.diff_threshold >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "background.diff_threshold must be non-negative, got {}",
                self.background.diff_threshold
            )));
        }
        let policy = [
            ("policy.crowded_min_probability", self.policy.crowded_min_probability),
            ("policy.crowded_min_ratio", self.policy.crowded_min_ratio),
            ("policy.some_min_probability", self.policy.some_min_probability),
            ("policy.some_min_ratio", self.policy.some_min_ratio),
        ];
        for (name, value) in policy {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must lie in [0, 1], got {value}"
                )));
            }
        }
        if !(i32::from(i8::MIN)..=i32::from(i8::MAX)).contains(&self.classifier.zero_point) {
            return Err(ConfigError::Invalid(format!(
                "classifier.zero_point must fit an int8 tensor, got {}",
                self.classifier.zero_point
            )));
        }
        if !(self.classifier.scale > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "classifier.scale must be positive, got {}",
                self.classifier.scale
            )));
        }
        if self.monitor.cycle_interval_ms == 0 || self.monitor.warmup_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "monitor intervals must be at least 1 ms".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// Default value functions
fn default_width() -> u32 {
    96
}
fn default_height() -> u32 {
    96
}
fn default_channels() -> u32 {
    1
}
fn default_frames_dir() -> PathBuf {
    PathBuf::from("frames")
}
fn default_window_frames() -> u32 {
    20
}
fn default_diff_threshold() -> f64 {
    50.0
}
fn default_crowded_min_probability() -> f32 {
    0.65
}
fn default_crowded_min_ratio() -> f32 {
    0.40
}
fn default_some_min_probability() -> f32 {
    0.75
}
fn default_some_min_ratio() -> f32 {
    0.30
}
fn default_zero_point() -> i32 {
    -128
}
fn default_scale() -> f32 {
    1.0 / 256.0
}
fn default_cycle_interval_ms() -> u64 {
    100
}
fn default_warmup_interval_ms() -> u64 {
    10
}
fn default_log_level() -> String {
    "info".into()
}
