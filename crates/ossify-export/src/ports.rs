use std::path::Path;

use ossify_core::OssifyResult;
use ossify_ir::{Footage, Layer};

// ──────────────────────────────────────────────────────────────────────────────
// Rasterizer
// ──────────────────────────────────────────────────────────────────────────────

/// Everything a rasterizer needs to render one distorted layer.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    /// The flattened layer, times in root-scene time.
    pub layer: &'a Layer,
    /// The layer's image source.
    pub footage: &'a Footage,
    /// Prefix of the numbered output files (`<attachment>_00000.png`, ...).
    pub attachment: &'a str,
    /// Frames per second of the exported scene.
    pub fps: f64,
}

impl RenderRequest<'_> {
    /// Frames covering the layer's activation window.
    pub fn frame_count(&self) -> u32 {
        let span = (self.layer.out_point - self.layer.in_point).max(0.0);
        (span * self.fps - 1e-6).ceil().max(0.0) as u32
    }

    pub fn frame_name(&self, index: u32) -> String {
        frame_name(self.attachment, index)
    }
}

/// Name of frame `index` of a rendered sequence.
pub fn frame_name(attachment: &str, index: u32) -> String {
    format!("{attachment}_{index:05}")
}

/// Renders a layer whose image changes over time into numbered PNG files.
///
/// The call blocks until every file is on disk. Returns the number of frames
/// written; zero means the render failed.
pub trait Rasterizer: Send + Sync {
    fn render(&self, out_dir: &Path, request: &RenderRequest<'_>) -> OssifyResult<u32>;
}

// ──────────────────────────────────────────────────────────────────────────────
// Footage Exporter
// ──────────────────────────────────────────────────────────────────────────────

/// Writes one static image source as `<out_dir>/<name>.png`.
pub trait FootageExporter: Send + Sync {
    fn export(&self, out_dir: &Path, footage: &Footage, name: &str) -> OssifyResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_count_rounds_up() {
        let footage = Footage::file("f", "a.png", 1, 1);
        let layer = Layer::new("1", "blur", 0.5, 1.0);
        let request = RenderRequest {
            layer: &layer,
            footage: &footage,
            attachment: "blur",
            fps: 10.0,
        };
        assert_eq!(request.frame_count(), 5);

        let layer = Layer::new("1", "blur", 0.0, 0.33);
        let request = RenderRequest { layer: &layer, ..request };
        assert_eq!(request.frame_count(), 4);
    }

    #[test]
    fn test_frame_names() {
        assert_eq!(frame_name("blur", 7), "blur_00007");
    }
}
