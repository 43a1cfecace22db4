//! Bone tree and setup pose.

use std::collections::HashSet;

use ossify_core::Point2D;
use ossify_ir::LayerId;

use crate::flatten::{FlatLayer, FlatScene};
use crate::naming::ROOT_BONE;

/// Setup values in the host's convention, read at the window start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetupPose {
    pub position: Point2D,
    /// Degrees, clockwise.
    pub rotation: f64,
    /// Percent.
    pub scale: Point2D,
}

/// An output bone in the target's convention: y up, counter-clockwise
/// rotation, scale as a factor.
#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    pub parent: Option<String>,
    /// The layer the bone was made from; `None` for the root.
    pub layer: Option<LayerId>,
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub setup: SetupPose,
}

impl Bone {
    fn root() -> Self {
        Self {
            name: ROOT_BONE.to_string(),
            parent: None,
            layer: None,
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            setup: SetupPose {
                position: Point2D::zero(),
                rotation: 0.0,
                scale: Point2D::new(100.0, 100.0),
            },
        }
    }

    pub fn is_root(&self) -> bool {
        self.layer.is_none()
    }
}

/// One bone per layer that is enabled or anchors others, plus every
/// ancestor of those, plus the root. Parents always precede children.
pub fn map_bones(scene: &FlatScene) -> Vec<Bone> {
    let t0 = scene.window.start;

    let mut included: HashSet<&LayerId> = HashSet::new();
    for layer in scene.layers.iter().filter(|l| l.layer.enabled || l.anchor) {
        let mut current = Some(layer);
        while let Some(l) = current {
            if !included.insert(l.id()) {
                break;
            }
            current = scene.parent_of(l);
        }
    }

    let mut ordered: Vec<(usize, &FlatLayer)> = scene
        .layers
        .iter()
        .filter(|l| included.contains(l.id()))
        .map(|l| (scene.depth_of(l), l))
        .collect();
    ordered.sort_by_key(|(depth, _)| *depth);

    let mut bones = Vec::with_capacity(ordered.len() + 1);
    bones.push(Bone::root());
    for (_, flat) in ordered {
        let transform = &flat.layer.transform;
        let position = transform.position.value_at(t0);
        let rotation = transform.rotation.value_at(t0);
        let scale = transform.scale.value_at(t0);

        let parent = scene.parent_of(flat);
        let offset = match parent {
            Some(p) => position - p.layer.transform.anchor.value_at(t0),
            None => position,
        };
        bones.push(Bone {
            name: flat.name.clone(),
            parent: Some(parent.map_or(ROOT_BONE, |p| p.name.as_str()).to_string()),
            layer: Some(flat.id().clone()),
            x: offset.x,
            y: -offset.y,
            rotation: -rotation,
            scale_x: scale.x / 100.0,
            scale_y: scale.y / 100.0,
            setup: SetupPose {
                position,
                rotation,
                scale,
            },
        });
    }
    tracing::debug!(scene = %scene.id, bones = bones.len(), "mapped bones");
    bones
}
