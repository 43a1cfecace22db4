//! Which image a slot shows over time, and the geometry of each image.

use std::path::Path;

use indexmap::IndexMap;
use ossify_core::{OssifyError, OssifyResult, TimeWindow, EPSILON};
use ossify_ir::Footage;

use crate::compress::sparsify;
use crate::flatten::FlatLayer;
use crate::ports::{Rasterizer, RenderRequest};
use crate::sampler::Sample;

/// Placement of one attachment image relative to its bone.
#[derive(Debug, Clone, PartialEq)]
pub struct SkinGeometry {
    /// Image file name when it differs from the attachment name.
    pub image: Option<String>,
    pub width: u32,
    pub height: u32,
    pub x: f64,
    pub y: f64,
}

/// Attachment state of one slot.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotAttachments {
    /// Attachment shown at the window start; `None` when hidden.
    pub setup: Option<String>,
    /// Stepped attachment changes, `None` hiding the slot.
    pub keys: Vec<Sample<Option<String>>>,
    /// One entry for the setup attachment, then each keyed one.
    pub skin: IndexMap<String, SkinGeometry>,
}

/// Resolves attachments for the slots of one scene.
pub struct AttachmentResolver<'a> {
    window: TimeWindow,
    fps: f64,
    out_dir: &'a Path,
    rasterizer: &'a dyn Rasterizer,
    compress: bool,
}

impl<'a> AttachmentResolver<'a> {
    pub fn new(
        window: TimeWindow,
        fps: f64,
        out_dir: &'a Path,
        rasterizer: &'a dyn Rasterizer,
        compress: bool,
    ) -> Self {
        Self {
            window,
            fps,
            out_dir,
            rasterizer,
            compress,
        }
    }

    /// `image` is the unique name the footage is exported under.
    pub fn resolve(
        &self,
        flat: &FlatLayer,
        footage: &Footage,
        image: &str,
    ) -> OssifyResult<SlotAttachments> {
        let (setup, keys, image) = if flat.layer.is_distorted() {
            let (setup, keys) = self.rendered_keys(flat, footage)?;
            (setup, keys, None)
        } else {
            let (setup, keys) = self.static_keys(flat);
            let image = (image != flat.name).then(|| image.to_string());
            (setup, keys, image)
        };

        let keys = if self.compress {
            sparsify(&keys, Some(&setup), self.window.start)
        } else {
            keys
        };

        let anchor = flat.layer.transform.anchor.value_at(self.window.start);
        let geometry = SkinGeometry {
            image,
            width: footage.width,
            height: footage.height,
            x: f64::from(footage.width) / 2.0 - anchor.x,
            y: -(f64::from(footage.height) / 2.0 - anchor.y),
        };
        let mut skin = IndexMap::new();
        for name in setup.iter().chain(keys.iter().filter_map(|k| k.value.as_ref())) {
            if !skin.contains_key(name) {
                skin.insert(name.clone(), geometry.clone());
            }
        }

        Ok(SlotAttachments { setup, keys, skin })
    }

    fn static_keys(&self, flat: &FlatLayer) -> (Option<String>, Vec<Sample<Option<String>>>) {
        let layer = &flat.layer;
        let mut keys = Vec::new();
        let setup = if layer.in_point <= self.window.start + EPSILON {
            Some(flat.name.clone())
        } else {
            keys.push(Sample::stepped(layer.in_point, Some(flat.name.clone())));
            None
        };
        if self.window.is_before_end(layer.out_point) {
            keys.push(Sample::stepped(layer.out_point, None));
        }
        (setup, keys)
    }

    fn rendered_keys(
        &self,
        flat: &FlatLayer,
        footage: &Footage,
    ) -> OssifyResult<(Option<String>, Vec<Sample<Option<String>>>)> {
        let request = RenderRequest {
            layer: &flat.layer,
            footage,
            attachment: &flat.name,
            fps: self.fps,
        };
        tracing::info!(
            layer = %flat.name,
            frames = request.frame_count(),
            "rasterizing distorted layer"
        );
        let count = self.rasterizer.render(self.out_dir, &request)?;
        if count == 0 {
            return Err(OssifyError::Rasterization {
                layer: flat.name.clone(),
            });
        }

        let mut setup = None;
        let mut keys = Vec::with_capacity(count as usize + 1);
        for i in 0..count {
            let time = flat.layer.in_point + f64::from(i) / self.fps;
            let name = request.frame_name(i);
            if time <= self.window.start + EPSILON {
                setup = Some(name);
            } else {
                keys.push(Sample::stepped(time, Some(name)));
            }
        }
        if self.window.is_before_end(flat.layer.out_point) {
            keys.push(Sample::stepped(flat.layer.out_point, None));
        }
        Ok((setup, keys))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ossify_core::Point2D;
    use ossify_ir::{Effect, Layer, Property};

    struct FixedFrames(u32);

    impl Rasterizer for FixedFrames {
        fn render(&self, _out_dir: &Path, _request: &RenderRequest<'_>) -> OssifyResult<u32> {
            Ok(self.0)
        }
    }

    fn flat(name: &str, in_point: f64, out_point: f64) -> FlatLayer {
        let mut layer = Layer::new("1", name, in_point, out_point);
        layer.transform.anchor = Property::constant(Point2D::new(5.0, 5.0));
        FlatLayer {
            layer,
            name: name.to_string(),
            anchor: false,
            nesting: 0,
        }
    }

    fn resolve(layer: &FlatLayer, frames: u32) -> OssifyResult<SlotAttachments> {
        let footage = Footage::file("img", "arm.png", 20, 10);
        let raster = FixedFrames(frames);
        let resolver = AttachmentResolver::new(
            TimeWindow::new(0.0, 2.0),
            10.0,
            Path::new("."),
            &raster,
            true,
        );
        resolver.resolve(layer, &footage, "arm")
    }

    #[test]
    fn test_visible_whole_window() {
        let out = resolve(&flat("arm", 0.0, 2.0), 0).unwrap();
        assert_eq!(out.setup.as_deref(), Some("arm"));
        assert!(out.keys.is_empty());
        let geometry = &out.skin["arm"];
        assert_eq!(geometry.image, None);
        assert_eq!((geometry.width, geometry.height), (20, 10));
        assert_eq!((geometry.x, geometry.y), (5.0, 0.0));
    }

    #[test]
    fn test_late_in_and_early_out() {
        let out = resolve(&flat("hand", 0.5, 1.5), 0).unwrap();
        assert_eq!(out.setup, None);
        assert_eq!(
            out.keys,
            vec![
                Sample::stepped(0.5, Some("hand".to_string())),
                Sample::stepped(1.5, None),
            ]
        );
        assert_eq!(out.skin.len(), 1);
        assert_eq!(out.skin["hand"].image.as_deref(), Some("arm"));
    }

    #[test]
    fn test_distorted_frames() {
        let mut layer = flat("blur", 0.0, 0.3);
        layer.layer.effects.push(Effect::distortion("Wave"));
        let out = resolve(&layer, 3).unwrap();
        assert_eq!(out.setup.as_deref(), Some("blur_00000"));
        let names: Vec<Option<&str>> = out.keys.iter().map(|k| k.value.as_deref()).collect();
        assert_eq!(names, vec![Some("blur_00001"), Some("blur_00002"), None]);
        assert_eq!(out.skin.len(), 3);
        assert!(out.skin.values().all(|g| g.image.is_none()));
    }

    #[test]
    fn test_zero_frames_fails() {
        let mut layer = flat("blur", 0.0, 0.3);
        layer.layer.effects.push(Effect::distortion("Wave"));
        let err = resolve(&layer, 0).unwrap_err();
        assert!(matches!(err, OssifyError::Rasterization { .. }));
    }
}
