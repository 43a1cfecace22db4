use std::path::{Path, PathBuf};

use ossify_core::OssifyResult;
use ossify_export::{Rasterizer, RenderRequest};

use crate::source;

/// A rasterizer that cannot evaluate effects: every frame is the layer's
/// undistorted image. Keeps the document and its image set complete when no
/// host renderer is available.
pub struct StillFrameRasterizer {
    base_dir: PathBuf,
}

impl StillFrameRasterizer {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

impl Rasterizer for StillFrameRasterizer {
    fn render(&self, out_dir: &Path, request: &RenderRequest<'_>) -> OssifyResult<u32> {
        let count = request.frame_count();
        let effects: Vec<&str> = request
            .layer
            .effects
            .iter()
            .filter(|e| e.enabled && !e.is_mesh_deform())
            .map(|e| e.name.as_str())
            .collect();
        tracing::warn!(
            layer = %request.attachment,
            effects = ?effects,
            frames = count,
            "effects are not rendered; writing still frames"
        );

        let image = source::load(&self.base_dir, request.footage)?;
        for i in 0..count {
            let path = out_dir.join(format!("{}.png", request.frame_name(i)));
            source::save_png(&image, &path)?;
        }
        Ok(count)
    }
}
