//! # ossify-ir
//!
//! The input scene graph: projects, scenes, layers, animatable properties,
//! effects and the footage registry.
//!
//! Projects are read from JSON or built programmatically, validated, and then
//! handed to the exporter, which never mutates them.

pub mod builder;
pub mod effect;
pub mod footage;
pub mod layer;
pub mod project;
pub mod property;
pub mod scene;
pub mod validate;

pub use effect::{Effect, EffectKind, Mesh, Pin, PinGroup, PinKind};
pub use footage::{Footage, FootageId, FootageKind, FootageRegistry, SequencePattern};
pub use layer::{Layer, LayerId, LayerSource, Transform};
pub use project::Project;
pub use property::{Keyframe, Property};
pub use scene::{Scene, SceneId};
