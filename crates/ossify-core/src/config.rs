use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{OssifyError, OssifyResult};
use crate::number::Num;

/// File name of the optional per-project configuration.
pub const CONFIG_FILE_NAME: &str = "ossify.toml";

/// The export frame rate as chosen by the user.
///
/// Written as a plain number: a positive rate, `0` for the scene's native
/// rate, or `-1` for exact keyframes only.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub enum FrameRate {
    Forced(f64),
    #[default]
    Native,
    ExactOnly,
}

impl FrameRate {
    /// Resolve the per-scene rate used for sampling and rasterization.
    pub fn resolve(&self, scene_fps: f64, multiplier: f64) -> f64 {
        match self {
            FrameRate::Forced(rate) => *rate,
            FrameRate::Native | FrameRate::ExactOnly => {
                (scene_fps * 100.0).round() / 100.0 * multiplier
            }
        }
    }

    pub fn is_exact_only(&self) -> bool {
        matches!(self, FrameRate::ExactOnly)
    }
}

impl TryFrom<f64> for FrameRate {
    type Error = OssifyError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(OssifyError::Configuration(format!(
                "frame rate must be finite, got {value}"
            )));
        }
        if value == 0.0 {
            Ok(FrameRate::Native)
        } else if value == -1.0 {
            Ok(FrameRate::ExactOnly)
        } else if value > 0.0 {
            Ok(FrameRate::Forced(value))
        } else {
            Err(OssifyError::Configuration(format!(
                "frame rate must be positive, 0 or -1, got {value}"
            )))
        }
    }
}

impl From<FrameRate> for f64 {
    fn from(rate: FrameRate) -> f64 {
        match rate {
            FrameRate::Forced(r) => r,
            FrameRate::Native => 0.0,
            FrameRate::ExactOnly => -1.0,
        }
    }
}

impl FromStr for FrameRate {
    type Err = OssifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: f64 = s.trim().parse().map_err(|_| {
            OssifyError::Configuration(format!("unparsable frame rate '{}'", s.trim()))
        })?;
        FrameRate::try_from(value)
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameRate::Forced(r) => write!(f, "{}fps", Num(*r)),
            FrameRate::Native => write!(f, "native"),
            FrameRate::ExactOnly => write!(f, "exact keys"),
        }
    }
}

fn default_multiplier() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_animation_name() -> String {
    "01".to_string()
}

fn default_folder_suffix() -> String {
    " [Spine{fps}]".to_string()
}

/// Export settings, loaded from `ossify.toml` and overridden from the command line.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub fps: FrameRate,
    #[serde(default = "default_multiplier")]
    pub fps_multiplier: f64,
    /// Sample every property at the frame rate instead of using its keys.
    #[serde(default)]
    pub sample_keys: bool,
    #[serde(default = "default_true")]
    pub compress: bool,
    #[serde(default = "default_true")]
    pub mesh_pins: bool,
    #[serde(default = "default_animation_name")]
    pub animation_name: String,
    #[serde(default = "default_folder_suffix")]
    pub folder_suffix: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            fps: FrameRate::Native,
            fps_multiplier: default_multiplier(),
            sample_keys: false,
            compress: true,
            mesh_pins: true,
            animation_name: default_animation_name(),
            folder_suffix: default_folder_suffix(),
        }
    }
}

impl ExportConfig {
    pub fn load_from_file(path: &Path) -> OssifyResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| {
            OssifyError::Configuration(format!("{}: {}", path.display(), e.message()))
        })
    }

    pub fn save_to_file(&self, path: &Path) -> OssifyResult<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| OssifyError::Configuration(e.to_string()))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Load `ossify.toml` from `dir` if present, defaults otherwise.
    pub fn discover(dir: &Path) -> OssifyResult<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.is_file() {
            Self::load_from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Whether properties are sampled at a fixed rate rather than read from keys.
    pub fn fixed_rate(&self) -> bool {
        self.sample_keys && !self.fps.is_exact_only()
    }

    pub fn resolve_fps(&self, scene_fps: f64) -> f64 {
        self.fps.resolve(scene_fps, self.fps_multiplier)
    }

    /// The output folder suffix with `{fps}` filled in.
    pub fn rendered_folder_suffix(&self) -> String {
        let fps = match self.fps {
            FrameRate::Forced(rate) if self.fixed_rate() => format!(" {}fps", Num(rate)),
            _ => String::new(),
        };
        self.folder_suffix.replace("{fps}", &fps)
    }
}
