use serde::{Deserialize, Serialize};

use crate::property::Property;
use ossify_core::Point2D;

/// An effect applied to a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(flatten)]
    pub kind: EffectKind,
}

fn default_true() -> bool {
    true
}

/// What an effect does, as far as export is concerned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EffectKind {
    /// Pin-based mesh deformation. The mesh may be unresolvable in the host.
    MeshDeform {
        #[serde(default)]
        mesh: Option<Mesh>,
    },
    /// Any other time-varying visual distortion; requires rasterization.
    Distortion,
}

impl Effect {
    pub fn mesh_deform(name: impl Into<String>, mesh: Option<Mesh>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            kind: EffectKind::MeshDeform { mesh },
        }
    }

    pub fn distortion(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            kind: EffectKind::Distortion,
        }
    }

    pub fn is_mesh_deform(&self) -> bool {
        matches!(self.kind, EffectKind::MeshDeform { .. })
    }
}

/// The pins of a mesh-deformation effect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    #[serde(default)]
    pub pins: Vec<Pin>,
}

impl Mesh {
    /// Pins of one group, in declaration order.
    pub fn group(&self, group: PinGroup) -> impl Iterator<Item = &Pin> {
        self.pins.iter().filter(move |p| p.kind.group() == group)
    }
}

/// A mesh control point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    pub name: String,
    #[serde(default)]
    pub position: Property<Point2D>,
    #[serde(flatten)]
    pub kind: PinKind,
}

/// Group-specific pin channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "group", rename_all = "snake_case")]
pub enum PinKind {
    Deform,
    Stiffness {
        amount: Property<f64>,
        extent: Property<f64>,
    },
    Overlap {
        in_front: Property<f64>,
        extent: Property<f64>,
    },
}

impl PinKind {
    pub fn group(&self) -> PinGroup {
        match self {
            PinKind::Deform => PinGroup::Deform,
            PinKind::Stiffness { .. } => PinGroup::Stiffness,
            PinKind::Overlap { .. } => PinGroup::Overlap,
        }
    }
}

/// The three pin groups of a deformation mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinGroup {
    Deform,
    Stiffness,
    Overlap,
}

impl PinGroup {
    pub const ALL: [PinGroup; 3] = [PinGroup::Deform, PinGroup::Stiffness, PinGroup::Overlap];
}

impl std::fmt::Display for PinGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PinGroup::Deform => write!(f, "deform"),
            PinGroup::Stiffness => write!(f, "stiffness"),
            PinGroup::Overlap => write!(f, "overlap"),
        }
    }
}
