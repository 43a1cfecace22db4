use crate::effect::Effect;
use crate::footage::{Footage, FootageId};
use crate::layer::{Layer, LayerId, LayerSource};
use crate::project::Project;
use crate::property::{Keyframe, Property};
use crate::scene::{Scene, SceneId};

use ossify_core::{Point2D, TimeWindow};

/// A builder for constructing a Project programmatically.
/// Useful for tests and for generating projects from other tools.
pub struct ProjectBuilder {
    project: Project,
}

impl ProjectBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            project: Project::new(name),
        }
    }

    /// Add a footage item to the project registry.
    pub fn footage(mut self, footage: Footage) -> Self {
        self.project.footage.register(footage);
        self
    }

    /// Add a scene to the project.
    pub fn scene(mut self, scene: Scene) -> Self {
        self.project.scenes.push(scene);
        self
    }

    pub fn build(self) -> Project {
        self.project
    }
}

/// A builder for constructing a Scene.
pub struct SceneBuilder {
    scene: Scene,
}

impl SceneBuilder {
    pub fn new(id: impl Into<String>, start: f64, duration: f64, fps: f64) -> Self {
        let id = id.into();
        Self {
            scene: Scene::new(id.clone(), id, TimeWindow::new(start, duration), fps),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.scene.name = name.into();
        self
    }

    /// Mark the scene as a nested-reference target.
    pub fn nested(mut self) -> Self {
        self.scene.nested = true;
        self
    }

    /// Add a layer. Layers without an explicit span cover the whole window.
    pub fn layer(mut self, layer: LayerBuilder) -> Self {
        let window = self.scene.window;
        self.scene.layers.push(layer.build_within(window));
        self
    }

    pub fn build(self) -> Scene {
        self.scene
    }
}

/// A builder for constructing a Layer.
pub struct LayerBuilder {
    layer: Layer,
    span: Option<(f64, f64)>,
}

impl LayerBuilder {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            layer: Layer::new(id, name, 0.0, 0.0),
            span: None,
        }
    }

    /// A layer showing a footage item.
    pub fn image(id: impl Into<String>, name: impl Into<String>, footage: impl Into<String>) -> Self {
        let mut builder = Self::new(id, name);
        builder.layer.source = Some(LayerSource::Footage {
            footage: FootageId::new(footage),
        });
        builder
    }

    /// A layer playing back another scene.
    pub fn nested(id: impl Into<String>, name: impl Into<String>, scene: impl Into<String>) -> Self {
        let mut builder = Self::new(id, name);
        builder.layer.source = Some(LayerSource::Scene {
            scene: SceneId::new(scene),
        });
        builder
    }

    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.layer.parent = Some(LayerId::new(parent));
        self
    }

    pub fn span(mut self, in_point: f64, out_point: f64) -> Self {
        self.span = Some((in_point, out_point));
        self
    }

    pub fn start_time(mut self, start_time: f64) -> Self {
        self.layer.start_time = start_time;
        self
    }

    pub fn stretch(mut self, percent: f64) -> Self {
        self.layer.stretch = percent;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.layer.enabled = false;
        self
    }

    pub fn anchor(mut self, x: f64, y: f64) -> Self {
        self.layer.transform.anchor = Property::constant(Point2D::new(x, y));
        self
    }

    pub fn position(mut self, x: f64, y: f64) -> Self {
        self.layer.transform.position = Property::constant(Point2D::new(x, y));
        self
    }

    pub fn position_keys(mut self, keys: Vec<Keyframe<Point2D>>) -> Self {
        self.layer.transform.position = Property::keyed(keys);
        self
    }

    pub fn rotation(mut self, degrees: f64) -> Self {
        self.layer.transform.rotation = Property::constant(degrees);
        self
    }

    pub fn rotation_keys(mut self, keys: Vec<Keyframe<f64>>) -> Self {
        self.layer.transform.rotation = Property::keyed(keys);
        self
    }

    pub fn scale(mut self, x: f64, y: f64) -> Self {
        self.layer.transform.scale = Property::constant(Point2D::new(x, y));
        self
    }

    pub fn scale_keys(mut self, keys: Vec<Keyframe<Point2D>>) -> Self {
        self.layer.transform.scale = Property::keyed(keys);
        self
    }

    pub fn opacity(mut self, percent: f64) -> Self {
        self.layer.transform.opacity = Property::constant(percent);
        self
    }

    pub fn opacity_keys(mut self, keys: Vec<Keyframe<f64>>) -> Self {
        self.layer.transform.opacity = Property::keyed(keys);
        self
    }

    pub fn effect(mut self, effect: Effect) -> Self {
        self.layer.effects.push(effect);
        self
    }

    /// Build with the given span, or with `window` if none was set.
    pub fn build_within(mut self, window: TimeWindow) -> Layer {
        let (in_point, out_point) = self.span.unwrap_or((window.start, window.end()));
        self.layer.in_point = in_point;
        self.layer.out_point = out_point;
        self.layer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::footage::Footage;

    #[test]
    fn test_build_project() {
        let project = ProjectBuilder::new("Robot")
            .footage(Footage::file("arm", "arm.png", 40, 120))
            .scene(
                SceneBuilder::new("main", 0.0, 2.0, 30.0)
                    .layer(LayerBuilder::image("1", "Arm", "arm").position(10.0, 20.0))
                    .layer(LayerBuilder::new("2", "Hand").parent("1").span(0.5, 1.5))
                    .build(),
            )
            .build();
        let scene = &project.scenes[0];
        assert_eq!(scene.layers.len(), 2);
        assert_eq!(scene.layers[0].out_point, 2.0);
        assert_eq!(scene.layers[1].in_point, 0.5);
        assert_eq!(scene.layers[1].parent, Some(LayerId::new("1")));
        assert_eq!(project.footage.count(), 1);
    }

    #[test]
    fn test_nested_builder() {
        let scene = SceneBuilder::new("inner", 0.0, 1.0, 24.0).nested().build();
        assert!(scene.nested);
        let layer = LayerBuilder::nested("9", "Inner", "inner").build_within(scene.window);
        assert_eq!(layer.nested_scene(), Some(&SceneId::new("inner")));
    }
}
