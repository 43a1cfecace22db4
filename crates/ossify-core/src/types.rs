use serde::{Deserialize, Serialize};

/// Interpolation of the segment leaving a keyframe toward the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    /// Hold the value until the next key.
    #[serde(alias = "hold")]
    Stepped,
    #[default]
    Linear,
    /// Curved segment; exported by fixed-rate sampling.
    Bezier,
    /// Any host interpolation kind this exporter does not know.
    #[serde(other)]
    Unsupported,
}

impl Interpolation {
    /// Stepped and linear segments are reproduced exactly by the target format.
    pub fn is_exact(&self) -> bool {
        matches!(self, Interpolation::Stepped | Interpolation::Linear)
    }

    /// The curve tag written to a timeline key, `None` when linear is implied.
    pub fn curve_tag(&self) -> Option<&'static str> {
        match self {
            Interpolation::Stepped => Some("stepped"),
            Interpolation::Linear | Interpolation::Bezier | Interpolation::Unsupported => None,
        }
    }
}

impl std::fmt::Display for Interpolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Interpolation::Stepped => write!(f, "stepped"),
            Interpolation::Linear => write!(f, "linear"),
            Interpolation::Bezier => write!(f, "bezier"),
            Interpolation::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// Temporal ease of a bezier segment as cubic-bezier control points
/// `(x1, y1, x2, y2)` in the unit square.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BezierEase {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BezierEase {
    /// The host's default "easy ease": zero speed, one-third influence.
    pub const EASY: BezierEase = BezierEase {
        x1: 1.0 / 3.0,
        y1: 0.0,
        x2: 2.0 / 3.0,
        y2: 1.0,
    };

    /// Map normalized segment time `t` to eased progress.
    pub fn apply(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        if self.x1 == self.y1 && self.x2 == self.y2 {
            return t;
        }
        // x(s) is monotonic for x1, x2 in [0, 1]; invert by bisection
        let (mut lo, mut hi, mut s) = (0.0, 1.0, t);
        for _ in 0..48 {
            let x = cubic(self.x1, self.x2, s);
            if (x - t).abs() < 1e-12 {
                break;
            }
            if x < t {
                lo = s;
            } else {
                hi = s;
            }
            s = 0.5 * (lo + hi);
        }
        cubic(self.y1, self.y2, s)
    }
}

impl Default for BezierEase {
    fn default() -> Self {
        BezierEase::EASY
    }
}

fn cubic(p1: f64, p2: f64, t: f64) -> f64 {
    let u = 1.0 - t;
    3.0 * u * u * t * p1 + 3.0 * u * t * t * p2 + t * t * t
}
