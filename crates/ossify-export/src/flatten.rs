//! Resolution of nested scene references into one flat layer list.
//!
//! Every layer whose source is another scene is replaced by that scene's
//! layers, with their timing mapped into the outer scene, their activation
//! window clipped to the container's, and their opacity multiplied by every
//! enclosing container's opacity. The container stays in the list, disabled,
//! as the hierarchy anchor of the layers it contained.

use ossify_core::{Interpolation, OssifyError, OssifyResult, TimeWindow, EPSILON};
use ossify_ir::{
    Effect, EffectKind, Keyframe, Layer, LayerId, LayerSource, Mesh, Pin, PinKind, Project,
    Property, Scene, SceneId, Transform,
};

use crate::compress::sparsify;
use crate::naming::{NameRegistry, FLATTEN_MARKER, ROOT_BONE};
use crate::sampler::{CurveSampler, Sample};

/// A layer of a flattened scene, with all times in the root scene's time.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatLayer {
    /// The remapped layer. Its id is a path through the containers, its
    /// source is footage or nothing, and its opacity is composed.
    pub layer: Layer,
    /// Unique output name.
    pub name: String,
    /// A container retained only as the parent of the layers it contained.
    pub anchor: bool,
    /// Number of containers around the layer.
    pub nesting: usize,
}

impl FlatLayer {
    pub fn id(&self) -> &LayerId {
        &self.layer.id
    }

    pub fn is_visible_content(&self) -> bool {
        self.layer.enabled && !self.anchor && self.layer.footage().is_some()
    }
}

/// A scene without nested scene references.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatScene {
    pub id: SceneId,
    /// Host name of the scene.
    pub name: String,
    pub window: TimeWindow,
    pub fps: f64,
    pub layers: Vec<FlatLayer>,
}

impl FlatScene {
    pub fn get(&self, id: &LayerId) -> Option<&FlatLayer> {
        self.layers.iter().find(|l| l.id() == id)
    }

    pub fn parent_of(&self, layer: &FlatLayer) -> Option<&FlatLayer> {
        layer.layer.parent.as_ref().and_then(|p| self.get(p))
    }

    /// Parent links above a layer, bounded by the layer count.
    pub fn depth_of(&self, layer: &FlatLayer) -> usize {
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
}

/// Where a scene's layers end up: the time map into root time, the
/// enclosing activation window, and the enclosing opacities.
#[derive(Debug, Clone)]
struct NestingContext<'p> {
    offset: f64,
    factor: f64,
    clip: Option<(f64, f64)>,
    opacity: Vec<Property<f64>>,
    anchor: Option<LayerId>,
    id_prefix: String,
    path: Vec<&'p SceneId>,
}

impl NestingContext<'_> {
    fn root() -> Self {
        Self {
            offset: 0.0,
            factor: 1.0,
            clip: None,
            opacity: Vec::new(),
            anchor: None,
            id_prefix: String::new(),
            path: Vec::new(),
        }
    }

    fn map(&self, t: f64) -> f64 {
        self.offset + self.factor * t
    }

    fn nesting(&self) -> usize {
        self.opacity.len()
    }
}

/// Flattens scenes of one project.
pub struct SceneFlattener<'p> {
    project: &'p Project,
    sampler: CurveSampler,
}

impl<'p> SceneFlattener<'p> {
    /// `sampler` decides how composed opacity is sampled.
    pub fn new(project: &'p Project, sampler: CurveSampler) -> Self {
        Self { project, sampler }
    }

    pub fn flatten(&self, scene: &'p Scene) -> OssifyResult<FlatScene> {
        let mut ctx = NestingContext::root();
        ctx.path.push(&scene.id);
        let mut layers = Vec::with_capacity(scene.layers.len());
        self.expand(scene, &ctx, &mut layers)?;

        let mut names = NameRegistry::with_reserved([ROOT_BONE]);
        for flat in &mut layers {
            flat.name = names.unique(&flat.layer.name);
        }

        tracing::debug!(
            scene = %scene.id,
            layers = layers.len(),
            anchors = layers.iter().filter(|l| l.anchor).count(),
            "flattened scene"
        );
        Ok(FlatScene {
            id: scene.id.clone(),
            name: scene.name.clone(),
            window: scene.window,
            fps: scene.fps,
            layers,
        })
    }

    fn expand(
        &self,
        scene: &'p Scene,
        ctx: &NestingContext<'p>,
        out: &mut Vec<FlatLayer>,
    ) -> OssifyResult<()> {
        for layer in &scene.layers {
            let mut flat = remap_layer(scene, layer, ctx);

            let Some(LayerSource::Scene { scene: nested_id }) = &layer.source else {
                if !ctx.opacity.is_empty() {
                    let mut contributors = vec![&flat.transform.opacity];
                    contributors.extend(ctx.opacity.iter());
                    flat.transform.opacity = self.compose_opacity(&contributors);
                }
                out.push(FlatLayer {
                    layer: flat,
                    name: String::new(),
                    anchor: false,
                    nesting: ctx.nesting(),
                });
                continue;
            };

            flat.source = None;
            if !flat.enabled {
                out.push(FlatLayer {
                    layer: flat,
                    name: String::new(),
                    anchor: false,
                    nesting: ctx.nesting(),
                });
                continue;
            }

            let nested = self.project.get_scene(nested_id).ok_or_else(|| {
                OssifyError::InvalidProject(format!(
                    "layer '{}' references unknown scene '{}'",
                    layer.name, nested_id
                ))
            })?;
            if ctx.path.contains(&&nested.id) {
                return Err(OssifyError::InvalidProject(format!(
                    "scene '{}' contains itself",
                    nested.id
                )));
            }
            tracing::debug!(container = %flat.id, scene = %nested.id, "expanding nested scene");

            let mut inner = ctx.clone();
            inner.offset = ctx.map(layer.start_time);
            inner.factor = ctx.factor * layer.stretch / 100.0;
            inner.clip = Some((flat.in_point, flat.out_point));
            inner.opacity.push(flat.transform.opacity.clone());
            inner.anchor = Some(flat.id.clone());
            inner.id_prefix = format!("{}{}", flat.id, FLATTEN_MARKER);
            inner.path.push(&nested.id);

            flat.enabled = false;
            out.push(FlatLayer {
                layer: flat,
                name: String::new(),
                anchor: true,
                nesting: ctx.nesting(),
            });
            self.expand(nested, &inner, out)?;
        }
        Ok(())
    }

    /// Multiply opacities given in percent into one curve, compressed
    /// against full opacity.
    fn compose_opacity(&self, contributors: &[&Property<f64>]) -> Property<f64> {
        let product = |t: f64| {
            contributors
                .iter()
                .fold(100.0, |acc, p| acc * p.value_at(t) / 100.0)
        };
        let window = self.sampler.window();
        if contributors.iter().all(|p| !p.is_animated()) {
            return Property::constant(product(window.start));
        }

        let fixed_rate =
            self.sampler.forces_fixed_rate() || contributors.iter().any(|p| !p.is_exact());
        let samples: Vec<Sample<f64>> = if fixed_rate {
            window
                .frame_times(self.sampler.fps())
                .map(|t| Sample::linear(t, product(t)))
                .collect()
        } else {
            let mut times: Vec<f64> = contributors.iter().flat_map(|p| p.key_times()).collect();
            times.sort_by(f64::total_cmp);
            times.dedup_by(|a, b| (*a - *b).abs() <= EPSILON);
            times
                .into_iter()
                .map(|t| {
                    let stepped = contributors
                        .iter()
                        .all(|p| p.interpolation_at(t) == Interpolation::Stepped);
                    let interpolation = if stepped {
                        Interpolation::Stepped
                    } else {
                        Interpolation::Linear
                    };
                    Sample::new(t, product(t), interpolation)
                })
                .collect()
        };

        let sparse = sparsify(&samples, Some(&100.0), window.start);
        if sparse.is_empty() {
            return Property::constant(100.0);
        }
        Property::keyed(
            sparse
                .into_iter()
                .map(|s| Keyframe::new(s.time, s.value).with_interpolation(s.interpolation))
                .collect(),
        )
    }
}

/// Copy a layer into the flattening target's time and id space.
fn remap_layer(scene: &Scene, layer: &Layer, ctx: &NestingContext<'_>) -> Layer {
    let prefixed = |id: &LayerId| LayerId(format!("{}{}", ctx.id_prefix, id));
    let parent = match layer.parent.as_ref().filter(|p| scene.get_layer(p).is_some()) {
        Some(p) => Some(prefixed(p)),
        None => ctx.anchor.clone(),
    };

    let (mut in_point, mut out_point) = (ctx.map(layer.in_point), ctx.map(layer.out_point));
    let mut enabled = layer.enabled;
    if let Some((lo, hi)) = ctx.clip {
        if out_point < lo || in_point > hi {
            enabled = false;
        } else {
            in_point = in_point.max(lo);
            out_point = out_point.min(hi);
        }
    }

    let t = &layer.transform;
    Layer {
        id: prefixed(&layer.id),
        name: layer.name.clone(),
        parent,
        start_time: ctx.map(layer.start_time),
        stretch: layer.stretch * ctx.factor,
        in_point,
        out_point,
        enabled,
        source: layer.source.clone(),
        transform: Transform {
            anchor: t.anchor.remap_time(ctx.offset, ctx.factor),
            position: t.position.remap_time(ctx.offset, ctx.factor),
            rotation: t.rotation.remap_time(ctx.offset, ctx.factor),
            scale: t.scale.remap_time(ctx.offset, ctx.factor),
            opacity: t.opacity.remap_time(ctx.offset, ctx.factor),
        },
        effects: layer
            .effects
            .iter()
            .map(|e| remap_effect(e, ctx.offset, ctx.factor))
            .collect(),
        effects_active: layer.effects_active,
    }
}

fn remap_effect(effect: &Effect, offset: f64, factor: f64) -> Effect {
    let kind = match &effect.kind {
        EffectKind::MeshDeform { mesh } => EffectKind::MeshDeform {
            mesh: mesh.as_ref().map(|m| Mesh {
                pins: m.pins.iter().map(|p| remap_pin(p, offset, factor)).collect(),
            }),
        },
        EffectKind::Distortion => EffectKind::Distortion,
    };
    Effect {
        name: effect.name.clone(),
        enabled: effect.enabled,
        kind,
    }
}

fn remap_pin(pin: &Pin, offset: f64, factor: f64) -> Pin {
    let kind = match &pin.kind {
        PinKind::Deform => PinKind::Deform,
        PinKind::Stiffness { amount, extent } => PinKind::Stiffness {
            amount: amount.remap_time(offset, factor),
            extent: extent.remap_time(offset, factor),
        },
        PinKind::Overlap { in_front, extent } => PinKind::Overlap {
            in_front: in_front.remap_time(offset, factor),
            extent: extent.remap_time(offset, factor),
        },
    };
    Pin {
        name: pin.name.clone(),
        position: pin.position.remap_time(offset, factor),
        kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ossify_core::Point2D;
    use ossify_ir::builder::{LayerBuilder, ProjectBuilder, SceneBuilder};
    use ossify_ir::Footage;

    fn project_with_nesting(container_opacity: f64, inner_opacity: f64) -> Project {
        ProjectBuilder::new("Robot")
            .footage(Footage::file("arm", "arm.png", 10, 10))
            .scene(
                SceneBuilder::new("main", 0.0, 4.0, 10.0)
                    .layer(LayerBuilder::new("1", "Body"))
                    .layer(
                        LayerBuilder::nested("2", "Limb", "limb")
                            .parent("1")
                            .start_time(1.0)
                            .span(1.0, 3.0)
                            .opacity(container_opacity),
                    )
                    .build(),
            )
            .scene(
                SceneBuilder::new("limb", 0.0, 4.0, 10.0)
                    .nested()
                    .layer(
                        LayerBuilder::image("1", "Arm", "arm")
                            .opacity(inner_opacity)
                            .position_keys(vec![
                                Keyframe::new(0.0, Point2D::new(0.0, 0.0)),
                                Keyframe::new(1.0, Point2D::new(10.0, 0.0)),
                            ]),
                    )
                    .layer(LayerBuilder::image("2", "Hand", "arm").parent("1").span(3.5, 4.0))
                    .build(),
            )
            .build()
    }

    fn flatten(project: &Project) -> FlatScene {
        let scene = &project.scenes[0];
        let sampler = CurveSampler::new(scene.window, scene.fps, false);
        SceneFlattener::new(project, sampler).flatten(scene).unwrap()
    }

    #[test]
    fn test_children_follow_container() {
        let project = project_with_nesting(100.0, 100.0);
        let flat = flatten(&project);
        let names: Vec<&str> = flat.layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["body", "limb", "arm", "hand"]);

        let limb = &flat.layers[1];
        assert!(limb.anchor);
        assert!(!limb.layer.enabled);
        assert!(limb.layer.source.is_none());

        let arm = &flat.layers[2];
        assert_eq!(arm.layer.id, LayerId::new("2/1"));
        assert_eq!(arm.layer.parent, Some(LayerId::new("2")));
        assert_eq!(arm.nesting, 1);
        let hand = &flat.layers[3];
        assert_eq!(hand.layer.parent, Some(LayerId::new("2/1")));
    }

    #[test]
    fn test_timing_is_remapped_and_clipped() {
        let project = project_with_nesting(100.0, 100.0);
        let flat = flatten(&project);
        let arm = &flat.layers[2].layer;
        assert_eq!(arm.in_point, 1.0);
        assert_eq!(arm.out_point, 3.0);
        let times: Vec<f64> = arm.transform.position.key_times().collect();
        assert_eq!(times, vec![1.0, 2.0]);
        assert!(arm.enabled);

        // hand lives at 4.5..5.0 in outer time, after the container ends
        let hand = &flat.layers[3].layer;
        assert!(!hand.enabled);
    }

    #[test]
    fn test_stretch_scales_time() {
        let mut project = project_with_nesting(100.0, 100.0);
        project.scenes[0].layers[1].stretch = 200.0;
        project.scenes[0].layers[1].out_point = 4.0;
        let flat = flatten(&project);
        let arm = &flat.layers[2].layer;
        let times: Vec<f64> = arm.transform.position.key_times().collect();
        assert_eq!(times, vec![1.0, 3.0]);
        assert_eq!(arm.stretch, 200.0);
    }

    #[test]
    fn test_opacity_is_composed() {
        let project = project_with_nesting(80.0, 50.0);
        let flat = flatten(&project);
        let arm = &flat.layers[2].layer;
        assert!((arm.transform.opacity.value_at(0.0) - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_full_opacity_composes_to_constant() {
        let mut project = project_with_nesting(100.0, 100.0);
        project.scenes[0].layers[1].transform.opacity = Property::keyed(vec![
            Keyframe::new(0.0, 100.0),
            Keyframe::new(2.0, 100.0),
        ]);
        let flat = flatten(&project);
        assert_eq!(flat.layers[2].layer.transform.opacity, Property::constant(100.0));
    }

    #[test]
    fn test_animated_container_opacity() {
        let mut project = project_with_nesting(100.0, 50.0);
        project.scenes[0].layers[1].transform.opacity = Property::keyed(vec![
            Keyframe::new(1.0, 100.0).with_interpolation(Interpolation::Stepped),
            Keyframe::new(2.0, 0.0),
        ]);
        let flat = flatten(&project);
        let opacity = &flat.layers[2].layer.transform.opacity;
        let keys = opacity.keys();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].value, 50.0);
        assert_eq!(keys[0].interpolation, Interpolation::Stepped);
        assert_eq!(keys[1].value, 0.0);
    }

    #[test]
    fn test_disabled_container_keeps_no_children() {
        let mut project = project_with_nesting(100.0, 100.0);
        project.scenes[0].layers[1].enabled = false;
        let flat = flatten(&project);
        assert_eq!(flat.layers.len(), 2);
        assert!(!flat.layers[1].anchor);
        assert!(flat.layers[1].layer.source.is_none());
    }

    #[test]
    fn test_duplicate_names_are_suffixed() {
        let mut project = project_with_nesting(100.0, 100.0);
        project.scenes[1].layers[1].name = "arm".into();
        let flat = flatten(&project);
        assert_eq!(flat.layers[2].name, "arm");
        assert_eq!(flat.layers[3].name, "arm_2");
    }

    #[test]
    fn test_self_reference_is_rejected() {
        let mut project = project_with_nesting(100.0, 100.0);
        project.scenes[1].layers.push(
            LayerBuilder::nested("3", "Loop", "limb").build_within(TimeWindow::new(0.0, 4.0)),
        );
        let scene = &project.scenes[0];
        let sampler = CurveSampler::new(scene.window, scene.fps, false);
        let err = SceneFlattener::new(&project, sampler).flatten(scene).unwrap_err();
        assert!(matches!(err, OssifyError::InvalidProject(_)));
    }

    #[test]
    fn test_source_scene_is_untouched() {
        let project = project_with_nesting(80.0, 50.0);
        let before = project.clone();
        let _ = flatten(&project);
        assert_eq!(project, before);
    }
}
