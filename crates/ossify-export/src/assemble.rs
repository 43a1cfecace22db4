//! Setup data and timelines of one flattened scene.

use indexmap::IndexMap;
use ossify_core::color::opacity_to_color;
use ossify_core::{Animatable, ExportConfig, OssifyError, OssifyResult, Point2D, SampleValue};
use ossify_ir::{FootageId, FootageRegistry, Mesh, PinGroup, PinKind, Property};

use crate::attachment::{AttachmentResolver, SkinGeometry};
use crate::compress::{insert_rotation_midpoints, sparsify};
use crate::flatten::{FlatLayer, FlatScene};
use crate::hierarchy::{map_bones, Bone};
use crate::sampler::{CurveSampler, Sample};

/// A mesh pin at the window start, y up.
#[derive(Debug, Clone, PartialEq)]
pub struct PinPose {
    pub name: String,
    pub x: f64,
    pub y: f64,
    /// Stiffness or in-front amount as a fraction; `None` for deform pins.
    pub weight: Option<f64>,
    pub extent: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct SlotSetup {
    pub name: String,
    pub bone: String,
    pub attachment: Option<String>,
    pub color: String,
    /// Pins per group, each group in reverse pin order. Empty groups are absent.
    pub pins: IndexMap<PinGroup, Vec<PinPose>>,
}

#[derive(Debug, Clone, Default)]
pub struct BoneTimeline {
    pub translate: Vec<Sample<Point2D>>,
    pub rotate: Vec<Sample<f64>>,
    pub scale: Vec<Sample<Point2D>>,
}

impl BoneTimeline {
    pub fn is_empty(&self) -> bool {
        self.translate.is_empty() && self.rotate.is_empty() && self.scale.is_empty()
    }
}

/// Absolute animation of one mesh pin.
#[derive(Debug, Clone, Default)]
pub struct PinTimeline {
    pub translate: Vec<Sample<Point2D>>,
    pub weight: Vec<Sample<f64>>,
    pub extent: Vec<Sample<f64>>,
}

impl PinTimeline {
    pub fn is_empty(&self) -> bool {
        self.translate.is_empty() && self.weight.is_empty() && self.extent.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SlotTimeline {
    pub color: Vec<Sample<String>>,
    pub attachment: Vec<Sample<Option<String>>>,
    pub pins: IndexMap<PinGroup, IndexMap<String, PinTimeline>>,
}

impl SlotTimeline {
    pub fn is_empty(&self) -> bool {
        self.color.is_empty() && self.attachment.is_empty() && self.pins.is_empty()
    }
}

/// Everything the document writer needs for one scene.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub bones: Vec<Bone>,
    /// Front to back.
    pub slots: Vec<SlotSetup>,
    /// Per slot, in declaration order.
    pub skins: IndexMap<String, IndexMap<String, SkinGeometry>>,
    pub bone_timelines: IndexMap<String, BoneTimeline>,
    pub slot_timelines: IndexMap<String, SlotTimeline>,
}

/// Builds the [`Assembly`] of a flattened scene.
pub struct AnimationAssembler<'a> {
    sampler: CurveSampler,
    compress: bool,
    mesh_pins: bool,
    footage: &'a FootageRegistry,
    images: &'a IndexMap<FootageId, String>,
    attachments: AttachmentResolver<'a>,
}

impl<'a> AnimationAssembler<'a> {
    pub fn new(
        sampler: CurveSampler,
        config: &ExportConfig,
        footage: &'a FootageRegistry,
        images: &'a IndexMap<FootageId, String>,
        attachments: AttachmentResolver<'a>,
    ) -> Self {
        Self {
            sampler,
            compress: config.compress,
            mesh_pins: config.mesh_pins,
            footage,
            images,
            attachments,
        }
    }

    pub fn assemble(&self, scene: &FlatScene) -> OssifyResult<Assembly> {
        let bones = map_bones(scene);

        let mut bone_timelines = IndexMap::new();
        for bone in &bones {
            let Some(layer) = bone.layer.as_ref().and_then(|id| scene.get(id)) else {
                continue;
            };
            let timeline = self.bone_timeline(layer, bone);
            if !timeline.is_empty() {
                bone_timelines.insert(bone.name.clone(), timeline);
            }
        }

        let mut slots = Vec::new();
        let mut skins = IndexMap::new();
        let mut slot_timelines = IndexMap::new();
        for flat in scene.layers.iter().filter(|l| l.is_visible_content()) {
            let (slot, skin, timeline) = self.slot(flat)?;
            skins.insert(slot.name.clone(), skin);
            if !timeline.is_empty() {
                slot_timelines.insert(slot.name.clone(), timeline);
            }
            slots.push(slot);
        }
        slots.reverse();

        tracing::debug!(
            scene = %scene.id,
            slots = slots.len(),
            bone_timelines = bone_timelines.len(),
            slot_timelines = slot_timelines.len(),
            "assembled animation"
        );
        Ok(Assembly {
            bones,
            slots,
            skins,
            bone_timelines,
            slot_timelines,
        })
    }

    /// Samples of `property`, compressed against `setup` when enabled.
    fn channel<T: Animatable + Default>(&self, property: &Property<T>, setup: &T) -> Vec<Sample<T>> {
        self.compressed(self.sampler.sample(property).collect(), setup)
    }

    fn compressed<T: SampleValue>(&self, samples: Vec<Sample<T>>, setup: &T) -> Vec<Sample<T>> {
        if self.compress {
            sparsify(&samples, Some(setup), self.sampler.window().start)
        } else {
            samples
        }
    }

    fn bone_timeline(&self, flat: &FlatLayer, bone: &Bone) -> BoneTimeline {
        let transform = &flat.layer.transform;
        let setup = bone.setup;

        let translate = self
            .channel(&transform.position, &setup.position)
            .into_iter()
            .map(|s| {
                s.map(|p| Point2D::new(p.x - setup.position.x, -(p.y - setup.position.y)))
            })
            .collect();

        let rotate = insert_rotation_midpoints(self.channel(&transform.rotation, &setup.rotation))
            .into_iter()
            .map(|s| s.map(|r| -(r - setup.rotation)))
            .collect();

        let scale = self
            .channel(&transform.scale, &setup.scale)
            .into_iter()
            .map(|s| {
                s.map(|v| {
                    Point2D::new(
                        1.0 + (v.x - setup.scale.x) / 100.0,
                        1.0 + (v.y - setup.scale.y) / 100.0,
                    )
                })
            })
            .collect();

        BoneTimeline {
            translate,
            rotate,
            scale,
        }
    }

    fn slot(
        &self,
        flat: &FlatLayer,
    ) -> OssifyResult<(SlotSetup, IndexMap<String, SkinGeometry>, SlotTimeline)> {
        let t0 = self.sampler.window().start;
        let footage_id = flat.layer.footage().ok_or_else(|| {
            OssifyError::InvalidProject(format!("layer '{}' has no footage", flat.layer.name))
        })?;
        let footage = self.footage.get(footage_id).ok_or_else(|| {
            OssifyError::InvalidProject(format!("unknown footage '{footage_id}'"))
        })?;
        let image = self
            .images
            .get(footage_id)
            .map_or(flat.name.as_str(), String::as_str);

        let attachments = self.attachments.resolve(flat, footage, image)?;

        // compared as written, so opacities rounding to one color collapse
        let opacity = &flat.layer.transform.opacity;
        let setup_color = opacity_to_color(opacity.value_at(t0));
        let colors: Vec<Sample<String>> = self
            .sampler
            .sample(opacity)
            .map(|s| s.map(opacity_to_color))
            .collect();
        let color = self.compressed(colors, &setup_color);

        let mut pins = IndexMap::new();
        let mut pin_timelines = IndexMap::new();
        if let Some(mesh) = self.mesh(flat)? {
            for group in PinGroup::ALL {
                let group_pins: Vec<_> = mesh.group(group).collect();
                if group_pins.is_empty() {
                    continue;
                }
                let mut poses = Vec::with_capacity(group_pins.len());
                let mut timelines = IndexMap::new();
                for pin in group_pins.into_iter().rev() {
                    let position = pin.position.value_at(t0);
                    let (weight, extent) = match &pin.kind {
                        PinKind::Deform => (None, None),
                        PinKind::Stiffness { amount, extent } => (Some(amount), Some(extent)),
                        PinKind::Overlap { in_front, extent } => (Some(in_front), Some(extent)),
                    };
                    poses.push(PinPose {
                        name: pin.name.clone(),
                        x: position.x,
                        y: -position.y,
                        weight: weight.map(|w| w.value_at(t0) / 100.0),
                        extent: extent.map(|e| e.value_at(t0)),
                    });

                    let timeline = PinTimeline {
                        translate: self
                            .channel(&pin.position, &position)
                            .into_iter()
                            .map(|s| s.map(|p| Point2D::new(p.x, -p.y)))
                            .collect(),
                        weight: weight
                            .map(|w| {
                                self.channel(w, &w.value_at(t0))
                                    .into_iter()
                                    .map(|s| s.map(|v| v / 100.0))
                                    .collect()
                            })
                            .unwrap_or_default(),
                        extent: extent
                            .map(|e| self.channel(e, &e.value_at(t0)))
                            .unwrap_or_default(),
                    };
                    if !timeline.is_empty() {
                        timelines.insert(pin.name.clone(), timeline);
                    }
                }
                pins.insert(group, poses);
                if !timelines.is_empty() {
                    pin_timelines.insert(group, timelines);
                }
            }
        }

        let slot = SlotSetup {
            name: flat.name.clone(),
            bone: flat.name.clone(),
            attachment: attachments.setup,
            color: setup_color,
            pins,
        };
        let timeline = SlotTimeline {
            color,
            attachment: attachments.keys,
            pins: pin_timelines,
        };
        Ok((slot, attachments.skin, timeline))
    }

    /// The mesh whose pins are exported, when pins are wanted.
    fn mesh<'l>(&self, flat: &'l FlatLayer) -> OssifyResult<Option<&'l Mesh>> {
        if !self.mesh_pins {
            return Ok(None);
        }
        match flat.layer.mesh_deform() {
            None => Ok(None),
            Some((_, Some(mesh))) => Ok(Some(mesh)),
            Some((effect, None)) => Err(OssifyError::missing(
                format!(
                    "mesh of effect '{}' on layer '{}' cannot be resolved",
                    effect.name, flat.layer.name
                ),
                &flat.name,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::SceneFlattener;
    use crate::naming::footage_names;
    use crate::ports::{Rasterizer, RenderRequest};
    use ossify_core::Interpolation;
    use ossify_ir::builder::{LayerBuilder, ProjectBuilder, SceneBuilder};
    use ossify_ir::{Effect, Footage, Keyframe, Pin, Project};
    use std::path::Path;

    struct NoFrames;

    impl Rasterizer for NoFrames {
        fn render(&self, _out_dir: &Path, _request: &RenderRequest<'_>) -> OssifyResult<u32> {
            Ok(0)
        }
    }

    fn assemble_with(project: &Project, config: &ExportConfig) -> OssifyResult<Assembly> {
        let scene = &project.scenes[0];
        let sampler = CurveSampler::new(scene.window, scene.fps, config.fixed_rate());
        let flat = SceneFlattener::new(project, sampler).flatten(scene)?;
        let images = footage_names(&project.footage);
        let attachments =
            AttachmentResolver::new(scene.window, scene.fps, Path::new("."), &NoFrames, true);
        AnimationAssembler::new(sampler, config, &project.footage, &images, attachments)
            .assemble(&flat)
    }

    fn assemble(project: &Project) -> Assembly {
        assemble_with(project, &ExportConfig::default()).unwrap()
    }

    fn single(layer: LayerBuilder) -> Project {
        ProjectBuilder::new("Test")
            .footage(Footage::file("img", "img.png", 10, 10))
            .scene(SceneBuilder::new("main", 0.0, 2.0, 10.0).layer(layer).build())
            .build()
    }

    #[test]
    fn test_static_layer_has_no_timelines() {
        let assembly = assemble(&single(LayerBuilder::image("1", "Arm", "img").position(5.0, 5.0)));
        assert!(assembly.bone_timelines.is_empty());
        assert!(assembly.slot_timelines.is_empty());
        assert_eq!(assembly.slots.len(), 1);
        assert_eq!(assembly.slots[0].attachment.as_deref(), Some("arm"));
        assert_eq!(assembly.slots[0].color, "FFFFFFFF");
    }

    #[test]
    fn test_translate_relative_to_setup() {
        let layer = LayerBuilder::image("1", "Arm", "img").position_keys(vec![
            Keyframe::new(0.0, Point2D::new(10.0, 10.0)),
            Keyframe::new(1.0, Point2D::new(20.0, 30.0)),
        ]);
        let assembly = assemble(&single(layer));
        let timeline = &assembly.bone_timelines["arm"];
        assert_eq!(timeline.translate.len(), 2);
        assert_eq!(timeline.translate[0].value, Point2D::new(0.0, 0.0));
        assert_eq!(timeline.translate[1].value, Point2D::new(10.0, -20.0));
        assert!(timeline.rotate.is_empty());
        assert!(timeline.scale.is_empty());
    }

    #[test]
    fn test_rotation_gets_midpoint() {
        let layer = LayerBuilder::image("1", "Arm", "img").rotation_keys(vec![
            Keyframe::new(0.0, 0.0),
            Keyframe::new(1.0, 270.0),
        ]);
        let assembly = assemble(&single(layer));
        let rotate = &assembly.bone_timelines["arm"].rotate;
        let values: Vec<f64> = rotate.iter().map(|s| s.value).collect();
        assert_eq!(values, vec![0.0, -135.0, -270.0]);
    }

    #[test]
    fn test_scale_is_relative_factor() {
        let layer = LayerBuilder::image("1", "Arm", "img").scale_keys(vec![
            Keyframe::new(0.0, Point2D::new(100.0, 100.0)),
            Keyframe::new(1.0, Point2D::new(150.0, 50.0)),
        ]);
        let assembly = assemble(&single(layer));
        let scale = &assembly.bone_timelines["arm"].scale;
        assert_eq!(scale[1].value, Point2D::new(1.5, 0.5));
    }

    #[test]
    fn test_opacity_becomes_color() {
        let layer = LayerBuilder::image("1", "Arm", "img").opacity_keys(vec![
            Keyframe::new(0.0, 100.0).with_interpolation(Interpolation::Stepped),
            Keyframe::new(1.0, 0.0),
        ]);
        let assembly = assemble(&single(layer));
        let color = &assembly.slot_timelines["arm"].color;
        let values: Vec<&str> = color.iter().map(|s| s.value.as_str()).collect();
        assert_eq!(values, vec!["FFFFFFFF", "FFFFFF00"]);
        assert_eq!(color[0].interpolation, Interpolation::Stepped);
    }

    #[test]
    fn test_opacity_keys_with_one_color_are_dropped() {
        let layer = LayerBuilder::image("1", "Arm", "img").opacity_keys(vec![
            Keyframe::new(0.0, 50.0),
            Keyframe::new(1.0, 50.1),
            Keyframe::new(2.0, 50.0),
        ]);
        let assembly = assemble(&single(layer));
        assert_eq!(assembly.slots[0].color, "FFFFFF80");
        assert!(!assembly.slot_timelines.contains_key("arm"));
    }

    #[test]
    fn test_slots_are_reversed_skins_are_not() {
        let project = ProjectBuilder::new("Test")
            .footage(Footage::file("img", "img.png", 10, 10))
            .scene(
                SceneBuilder::new("main", 0.0, 2.0, 10.0)
                    .layer(LayerBuilder::image("1", "Front", "img"))
                    .layer(LayerBuilder::new("2", "Ctrl"))
                    .layer(LayerBuilder::image("3", "Back", "img"))
                    .build(),
            )
            .build();
        let assembly = assemble(&project);
        let slots: Vec<&str> = assembly.slots.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(slots, vec!["back", "front"]);
        let skins: Vec<&str> = assembly.skins.keys().map(String::as_str).collect();
        assert_eq!(skins, vec!["front", "back"]);
        assert_eq!(assembly.bones.len(), 4);
    }

    fn pinned(mesh: Option<Mesh>) -> Project {
        single(
            LayerBuilder::image("1", "Cape", "img").effect(Effect::mesh_deform("Puppet", mesh)),
        )
    }

    #[test]
    fn test_mesh_pins() {
        let mesh = Mesh {
            pins: vec![
                Pin {
                    name: "Pin 1".into(),
                    position: Property::constant(Point2D::new(1.0, 2.0)),
                    kind: PinKind::Deform,
                },
                Pin {
                    name: "Pin 2".into(),
                    position: Property::keyed(vec![
                        Keyframe::new(0.0, Point2D::new(3.0, 4.0)),
                        Keyframe::new(1.0, Point2D::new(5.0, 6.0)),
                    ]),
                    kind: PinKind::Deform,
                },
                Pin {
                    name: "Stiff".into(),
                    position: Property::constant(Point2D::new(0.0, 0.0)),
                    kind: PinKind::Stiffness {
                        amount: Property::constant(50.0),
                        extent: Property::constant(7.0),
                    },
                },
            ],
        };
        let assembly = assemble(&pinned(Some(mesh)));
        let slot = &assembly.slots[0];
        let deform = &slot.pins[&PinGroup::Deform];
        let names: Vec<&str> = deform.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Pin 2", "Pin 1"]);
        assert_eq!((deform[1].x, deform[1].y), (1.0, -2.0));
        let starch = &slot.pins[&PinGroup::Stiffness];
        assert_eq!(starch[0].weight, Some(0.5));
        assert_eq!(starch[0].extent, Some(7.0));
        assert!(!slot.pins.contains_key(&PinGroup::Overlap));

        let timeline = &assembly.slot_timelines["cape"];
        let deform = &timeline.pins[&PinGroup::Deform];
        assert_eq!(deform.len(), 1);
        assert_eq!(deform["Pin 2"].translate[1].value, Point2D::new(5.0, -6.0));
        assert!(!timeline.pins.contains_key(&PinGroup::Stiffness));
    }

    #[test]
    fn test_pins_can_be_disabled() {
        let config = ExportConfig {
            mesh_pins: false,
            ..ExportConfig::default()
        };
        let assembly = assemble_with(&pinned(None), &config).unwrap();
        assert!(assembly.slots[0].pins.is_empty());
    }

    #[test]
    fn test_unresolved_mesh_fails() {
        let err = assemble_with(&pinned(None), &ExportConfig::default()).unwrap_err();
        assert!(matches!(err, OssifyError::MissingResource { .. }));
    }
}
