use serde::{Deserialize, Serialize};

use crate::effect::{Effect, EffectKind, Mesh};
use crate::footage::FootageId;
use crate::property::Property;
use crate::scene::SceneId;
use ossify_core::{Point2D, TimeWindow};

/// Unique identifier for a layer within its scene.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerId(pub String);

impl LayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a layer shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerSource {
    /// A still image, image sequence or solid from the footage registry.
    Footage { footage: FootageId },
    /// Another scene of the project, played back inside this layer.
    Scene { scene: SceneId },
}

/// The animatable transform of a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    #[serde(default)]
    pub anchor: Property<Point2D>,
    #[serde(default)]
    pub position: Property<Point2D>,
    /// Degrees, clockwise in the source convention.
    #[serde(default)]
    pub rotation: Property<f64>,
    /// Percent per axis.
    #[serde(default = "default_scale")]
    pub scale: Property<Point2D>,
    /// Percent, 0 to 100.
    #[serde(default = "default_opacity")]
    pub opacity: Property<f64>,
}

fn default_scale() -> Property<Point2D> {
    Property::constant(Point2D::new(100.0, 100.0))
}

fn default_opacity() -> Property<f64> {
    Property::constant(100.0)
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            anchor: Property::default(),
            position: Property::default(),
            rotation: Property::default(),
            scale: default_scale(),
            opacity: default_opacity(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_stretch() -> f64 {
    100.0
}

/// A layer in a scene. All times are in the owning scene's time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<LayerId>,
    /// Scene time at which the layer's own time zero lies.
    #[serde(default)]
    pub start_time: f64,
    /// Time stretch in percent; 100 plays back at normal speed.
    #[serde(default = "default_stretch")]
    pub stretch: f64,
    pub in_point: f64,
    pub out_point: f64,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<LayerSource>,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<Effect>,
    /// Master switch for all effects of the layer.
    #[serde(default = "default_true")]
    pub effects_active: bool,
}

impl Layer {
    pub fn new(id: impl Into<String>, name: impl Into<String>, in_point: f64, out_point: f64) -> Self {
        Self {
            id: LayerId::new(id),
            name: name.into(),
            parent: None,
            start_time: 0.0,
            stretch: default_stretch(),
            in_point,
            out_point,
            enabled: true,
            source: None,
            transform: Transform::default(),
            effects: Vec::new(),
            effects_active: true,
        }
    }

    /// A layer without content, used only as a transform parent.
    pub fn is_null(&self) -> bool {
        self.source.is_none()
    }

    pub fn footage(&self) -> Option<&FootageId> {
        match &self.source {
            Some(LayerSource::Footage { footage }) => Some(footage),
            _ => None,
        }
    }

    pub fn nested_scene(&self) -> Option<&SceneId> {
        match &self.source {
            Some(LayerSource::Scene { scene }) => Some(scene),
            _ => None,
        }
    }

    /// The layer's activation window.
    pub fn active_window(&self) -> TimeWindow {
        TimeWindow::new(self.in_point, self.out_point - self.in_point)
    }

    /// Effects that apply, honoring the master switch.
    pub fn active_effects(&self) -> impl Iterator<Item = &Effect> {
        self.effects
            .iter()
            .filter(move |e| self.effects_active && e.enabled)
    }

    /// The first active mesh-deformation effect, with its mesh if resolvable.
    pub fn mesh_deform(&self) -> Option<(&Effect, Option<&Mesh>)> {
        self.active_effects().find_map(|e| match &e.kind {
            EffectKind::MeshDeform { mesh } => Some((e, mesh.as_ref())),
            EffectKind::Distortion => None,
        })
    }

    /// Whether an active effect other than mesh deformation alters the image.
    pub fn is_distorted(&self) -> bool {
        self.active_effects().any(|e| !e.is_mesh_deform())
    }
}
