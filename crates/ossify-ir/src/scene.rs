use serde::{Deserialize, Serialize};

use crate::layer::{Layer, LayerId};
use ossify_core::TimeWindow;

/// Unique identifier for a scene.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SceneId(pub String);

impl SceneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for SceneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A timed container of layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub id: SceneId,
    pub name: String,
    /// The exported work area.
    pub window: TimeWindow,
    pub fps: f64,
    /// Marks a scene that only exists to be referenced by other scenes.
    #[serde(default)]
    pub nested: bool,
    /// Ordered list of layers, front to back.
    #[serde(default)]
    pub layers: Vec<Layer>,
}

impl Scene {
    /// Create a new empty scene.
    pub fn new(id: impl Into<String>, name: impl Into<String>, window: TimeWindow, fps: f64) -> Self {
        Self {
            id: SceneId::new(id),
            name: name.into(),
            window,
            fps,
            nested: false,
            layers: Vec::new(),
        }
    }

    pub fn add_layer(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    pub fn get_layer(&self, id: &LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| &l.id == id)
    }

    /// Parent of a layer, if it has one and it exists.
    pub fn parent_of(&self, layer: &Layer) -> Option<&Layer> {
        layer.parent.as_ref().and_then(|p| self.get_layer(p))
    }

    /// Number of parent links between a layer and the top of its hierarchy.
    ///
    /// Stops at a dangling parent and at `layers.len()` links, so a cyclic
    /// relation cannot loop forever.
    pub fn depth_of(&self, layer: &Layer) -> usize {
        let mut depth = 0;
        let mut current = layer;
        while let Some(parent) = self.parent_of(current) {
            depth += 1;
            if depth > self.layers.len() {
                break;
            }
            current = parent;
        }
        depth
    }

    /// Frame duration at the scene's own rate.
    pub fn frame_duration(&self) -> f64 {
        if self.fps > 0.0 {
            1.0 / self.fps
        } else {
            0.0
        }
    }
}
