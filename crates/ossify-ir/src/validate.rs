use std::collections::{HashMap, HashSet};

use crate::effect::{EffectKind, PinKind};
use crate::layer::Layer;
use crate::project::Project;
use crate::property::Property;
use crate::scene::{Scene, SceneId};
use ossify_core::OssifyError;

/// Validate a Project for structural correctness before export.
pub fn validate_project(project: &Project) -> Result<(), Vec<OssifyError>> {
    let mut errors = Vec::new();

    let mut scene_ids = HashSet::new();
    for scene in &project.scenes {
        if !scene_ids.insert(&scene.id) {
            errors.push(invalid(format!("duplicate scene id: {}", scene.id)));
        }
        validate_scene(project, scene, &mut errors);
    }

    if let Some(cycle) = find_nesting_cycle(project) {
        errors.push(invalid(format!(
            "nested scene references form a cycle through '{}'",
            cycle
        )));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn invalid(message: String) -> OssifyError {
    OssifyError::InvalidProject(message)
}

fn validate_scene(project: &Project, scene: &Scene, errors: &mut Vec<OssifyError>) {
    if scene.fps <= 0.0 {
        errors.push(invalid(format!("scene '{}' fps must be positive", scene.id)));
    }
    if scene.window.duration <= 0.0 {
        errors.push(invalid(format!(
            "scene '{}' has non-positive duration",
            scene.id
        )));
    }

    let mut layer_ids = HashSet::new();
    for layer in &scene.layers {
        if !layer_ids.insert(&layer.id) {
            errors.push(invalid(format!(
                "duplicate layer id '{}' in scene '{}'",
                layer.id, scene.id
            )));
        }
    }

    for layer in &scene.layers {
        let at = format!("layer '{}' in scene '{}'", layer.name, scene.id);
        if layer.stretch <= 0.0 {
            errors.push(invalid(format!("{at}: time stretch must be positive")));
        }
        if layer.out_point < layer.in_point {
            errors.push(invalid(format!("{at}: out point precedes in point")));
        }
        if let Some(parent) = &layer.parent {
            if scene.get_layer(parent).is_none() {
                errors.push(invalid(format!("{at}: unknown parent '{parent}'")));
            } else if scene.depth_of(layer) > scene.layers.len() {
                errors.push(invalid(format!("{at}: parent chain forms a cycle")));
            }
        }
        if let Some(footage) = layer.footage() {
            if project.footage.get(footage).is_none() {
                errors.push(invalid(format!("{at}: unknown footage '{footage}'")));
            }
        }
        if let Some(nested) = layer.nested_scene() {
            if project.get_scene(nested).is_none() {
                errors.push(invalid(format!("{at}: unknown scene '{nested}'")));
            }
        }
        validate_properties(layer, &at, errors);
    }
}

fn validate_properties(layer: &Layer, at: &str, errors: &mut Vec<OssifyError>) {
    let t = &layer.transform;
    check_keys(&t.anchor, at, "anchor", errors);
    check_keys(&t.position, at, "position", errors);
    check_keys(&t.rotation, at, "rotation", errors);
    check_keys(&t.scale, at, "scale", errors);
    check_keys(&t.opacity, at, "opacity", errors);

    for effect in &layer.effects {
        let EffectKind::MeshDeform { mesh: Some(mesh) } = &effect.kind else {
            continue;
        };
        for pin in &mesh.pins {
            let name = format!("pin '{}' position", pin.name);
            check_keys(&pin.position, at, &name, errors);
            match &pin.kind {
                PinKind::Deform => {}
                PinKind::Stiffness { amount, extent } => {
                    check_keys(amount, at, &format!("pin '{}' amount", pin.name), errors);
                    check_keys(extent, at, &format!("pin '{}' extent", pin.name), errors);
                }
                PinKind::Overlap { in_front, extent } => {
                    check_keys(in_front, at, &format!("pin '{}' in front", pin.name), errors);
                    check_keys(extent, at, &format!("pin '{}' extent", pin.name), errors);
                }
            }
        }
    }
}

fn check_keys<T>(property: &Property<T>, at: &str, name: &str, errors: &mut Vec<OssifyError>) {
    if let Property::Keyed(keys) = property {
        if keys.is_empty() {
            errors.push(invalid(format!("{at}: {name} has an empty key list")));
        }
        if keys.windows(2).any(|w| w[1].time <= w[0].time) {
            errors.push(invalid(format!(
                "{at}: {name} key times are not strictly increasing"
            )));
        }
    }
}

/// A scene that reaches itself through nested references, if any.
fn find_nesting_cycle(project: &Project) -> Option<SceneId> {
    let edges: HashMap<&SceneId, Vec<&SceneId>> = project
        .scenes
        .iter()
        .map(|s| (&s.id, s.layers.iter().filter_map(Layer::nested_scene).collect()))
        .collect();

    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }

    fn visit<'a>(
        id: &'a SceneId,
        edges: &HashMap<&'a SceneId, Vec<&'a SceneId>>,
        marks: &mut HashMap<&'a SceneId, Mark>,
    ) -> Option<SceneId> {
        match marks.get(id) {
            Some(Mark::Done) => return None,
            Some(Mark::Visiting) => return Some(id.clone()),
            None => {}
        }
        marks.insert(id, Mark::Visiting);
        for &next in edges.get(id).into_iter().flatten() {
            if let Some(cycle) = visit(next, edges, marks) {
                return Some(cycle);
            }
        }
        marks.insert(id, Mark::Done);
        None
    }

    let mut marks = HashMap::new();
    project
        .scenes
        .iter()
        .find_map(|s| visit(&s.id, &edges, &mut marks))
}
