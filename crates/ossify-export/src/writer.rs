//! Serialization of an [`Assembly`] into the skeleton JSON document.
//!
//! Key order follows struct field order and [`IndexMap`] insertion order, so
//! the same assembly always produces byte-identical output.

use std::path::Path;

use indexmap::IndexMap;
use ossify_core::hash::hash_bytes;
use ossify_core::{Num, OssifyError, OssifyResult, Point2D};
use ossify_ir::PinGroup;
use serde::Serialize;

use crate::assemble::{Assembly, PinPose, PinTimeline, SlotTimeline};
use crate::naming::is_clean;
use crate::sampler::Sample;

/// Opacity color that the target treats as the default.
const OPAQUE_WHITE: &str = "FFFFFFFF";

#[derive(Debug, Clone, Serialize)]
pub struct SkeletonHeader {
    pub hash: String,
    pub images: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BoneEntry {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<Num>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<Num>,
    #[serde(rename = "scaleX", skip_serializing_if = "Option::is_none")]
    pub scale_x: Option<Num>,
    #[serde(rename = "scaleY", skip_serializing_if = "Option::is_none")]
    pub scale_y: Option<Num>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Num>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PinEntry {
    pub name: String,
    pub x: Num,
    pub y: Num,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stiffness: Option<Num>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub infront: Option<Num>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extent: Option<Num>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotEntry {
    pub name: String,
    pub bone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(rename = "deform pins", skip_serializing_if = "Vec::is_empty")]
    pub deform_pins: Vec<PinEntry>,
    #[serde(rename = "starch pins", skip_serializing_if = "Vec::is_empty")]
    pub starch_pins: Vec<PinEntry>,
    #[serde(rename = "overlap pins", skip_serializing_if = "Vec::is_empty")]
    pub overlap_pins: Vec<PinEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttachmentEntry {
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<Num>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<Num>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Skins {
    pub default: IndexMap<String, IndexMap<String, AttachmentEntry>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct XyKey {
    pub time: Num,
    pub x: Num,
    pub y: Num,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curve: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AngleKey {
    pub time: Num,
    pub angle: Num,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curve: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColorKey {
    pub time: Num,
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curve: Option<&'static str>,
}

/// `name: null` hides the slot.
#[derive(Debug, Clone, Serialize)]
pub struct AttachmentKey {
    pub time: Num,
    pub name: Option<String>,
}

/// A scalar pin key. The value's field is named after its channel.
#[derive(Debug, Clone)]
pub struct ScalarKey {
    pub time: Num,
    pub field: &'static str,
    pub value: Num,
    pub curve: Option<&'static str>,
}

impl Serialize for ScalarKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("time", &self.time)?;
        map.serialize_entry(self.field, &self.value)?;
        if let Some(curve) = self.curve {
            map.serialize_entry("curve", curve)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BoneTimelineEntry {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub translate: Vec<XyKey>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rotate: Vec<AngleKey>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scale: Vec<XyKey>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PinTimelineEntry {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub translate: Vec<XyKey>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stiffness: Vec<ScalarKey>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub infront: Vec<ScalarKey>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extent: Vec<ScalarKey>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SlotTimelineEntry {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub color: Vec<ColorKey>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachment: Vec<AttachmentKey>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub shape: IndexMap<&'static str, IndexMap<String, PinTimelineEntry>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AnimationEntry {
    pub bones: IndexMap<String, BoneTimelineEntry>,
    pub slots: IndexMap<String, SlotTimelineEntry>,
}

/// The complete output document of one scene.
#[derive(Debug, Clone, Serialize)]
pub struct SkeletonDocument {
    pub skeleton: SkeletonHeader,
    pub bones: Vec<BoneEntry>,
    pub slots: Vec<SlotEntry>,
    pub skins: Skins,
    pub animations: IndexMap<String, AnimationEntry>,
}

impl SkeletonDocument {
    /// Convert an assembly, failing if any output name is unusable.
    pub fn from_assembly(assembly: &Assembly, animation_name: &str) -> OssifyResult<Self> {
        check_names(assembly)?;

        let bones: Vec<BoneEntry> = assembly
            .bones
            .iter()
            .map(|b| BoneEntry {
                name: b.name.clone(),
                parent: b.parent.clone(),
                x: Num::unless(b.x, 0.0),
                y: Num::unless(b.y, 0.0),
                scale_x: Num::unless(b.scale_x, 1.0),
                scale_y: Num::unless(b.scale_y, 1.0),
                rotation: Num::unless(b.rotation, 0.0),
            })
            .collect();

        let slots: Vec<SlotEntry> = assembly
            .slots
            .iter()
            .map(|s| SlotEntry {
                name: s.name.clone(),
                bone: s.bone.clone(),
                attachment: s.attachment.clone(),
                color: (s.color != OPAQUE_WHITE).then(|| s.color.clone()),
                deform_pins: pin_entries(s.pins.get(&PinGroup::Deform), PinGroup::Deform),
                starch_pins: pin_entries(s.pins.get(&PinGroup::Stiffness), PinGroup::Stiffness),
                overlap_pins: pin_entries(s.pins.get(&PinGroup::Overlap), PinGroup::Overlap),
            })
            .collect();

        let skins = Skins {
            default: assembly
                .skins
                .iter()
                .map(|(slot, attachments)| {
                    let entries = attachments
                        .iter()
                        .map(|(name, g)| {
                            let entry = AttachmentEntry {
                                width: g.width,
                                height: g.height,
                                x: Num::unless(g.x, 0.0),
                                y: Num::unless(g.y, 0.0),
                                name: g.image.clone(),
                            };
                            (name.clone(), entry)
                        })
                        .collect();
                    (slot.clone(), entries)
                })
                .collect(),
        };

        let animation = AnimationEntry {
            bones: assembly
                .bone_timelines
                .iter()
                .map(|(name, t)| {
                    let entry = BoneTimelineEntry {
                        translate: xy_keys(&t.translate),
                        rotate: t
                            .rotate
                            .iter()
                            .enumerate()
                            .map(|(i, s)| AngleKey {
                                time: Num(s.time),
                                angle: Num(s.value),
                                curve: curve(&t.rotate, i),
                            })
                            .collect(),
                        scale: xy_keys(&t.scale),
                    };
                    (name.clone(), entry)
                })
                .collect(),
            slots: assembly
                .slot_timelines
                .iter()
                .map(|(name, t)| (name.clone(), slot_timeline_entry(t)))
                .collect(),
        };
        let mut animations = IndexMap::new();
        animations.insert(animation_name.to_string(), animation);

        let sections = serde_json::to_vec(&(&bones, &slots, &skins, &animations))?;
        let skeleton = SkeletonHeader {
            hash: hash_bytes(&sections).short(),
            images: "./".to_string(),
        };
        Ok(Self {
            skeleton,
            bones,
            slots,
            skins,
            animations,
        })
    }

    pub fn to_json(&self) -> OssifyResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_to(&self, path: &Path) -> OssifyResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

fn check_names(assembly: &Assembly) -> OssifyResult<()> {
    let bones = assembly.bones.iter().map(|b| &b.name);
    let slots = assembly.slots.iter().map(|s| &s.name);
    let attachments = assembly.skins.values().flat_map(|a| a.keys());
    let keyed = assembly
        .slot_timelines
        .values()
        .flat_map(|t| t.attachment.iter().filter_map(|k| k.value.as_ref()));
    match bones.chain(slots).chain(attachments).chain(keyed).find(|n| !is_clean(n)) {
        Some(name) => Err(OssifyError::NamingIntegrity {
            name: name.clone(),
            reason: "empty or contains the flattening marker".to_string(),
        }),
        None => Ok(()),
    }
}

/// `"stepped"` on every stepped key but the last.
fn curve<T>(samples: &[Sample<T>], i: usize) -> Option<&'static str> {
    if i + 1 < samples.len() {
        samples[i].interpolation.curve_tag()
    } else {
        None
    }
}

fn xy_keys(samples: &[Sample<Point2D>]) -> Vec<XyKey> {
    samples
        .iter()
        .enumerate()
        .map(|(i, s)| XyKey {
            time: Num(s.time),
            x: Num(s.value.x),
            y: Num(s.value.y),
            curve: curve(samples, i),
        })
        .collect()
}

fn scalar_keys(samples: &[Sample<f64>], field: &'static str) -> Vec<ScalarKey> {
    samples
        .iter()
        .enumerate()
        .map(|(i, s)| ScalarKey {
            time: Num(s.time),
            field,
            value: Num(s.value),
            curve: curve(samples, i),
        })
        .collect()
}

fn pin_entries(poses: Option<&Vec<PinPose>>, group: PinGroup) -> Vec<PinEntry> {
    poses
        .into_iter()
        .flatten()
        .map(|p| {
            let (stiffness, infront) = match group {
                PinGroup::Deform => (None, None),
                PinGroup::Stiffness => (p.weight.map(Num), None),
                PinGroup::Overlap => (None, p.weight.map(Num)),
            };
            PinEntry {
                name: p.name.clone(),
                x: Num(p.x),
                y: Num(p.y),
                stiffness,
                infront,
                extent: p.extent.map(Num),
            }
        })
        .collect()
}

fn pin_timeline_entry(t: &PinTimeline, group: PinGroup) -> PinTimelineEntry {
    let mut entry = PinTimelineEntry {
        translate: xy_keys(&t.translate),
        extent: scalar_keys(&t.extent, "extent"),
        ..PinTimelineEntry::default()
    };
    match group {
        PinGroup::Deform => {}
        PinGroup::Stiffness => entry.stiffness = scalar_keys(&t.weight, "stiffness"),
        PinGroup::Overlap => entry.infront = scalar_keys(&t.weight, "infront"),
    }
    entry
}

fn slot_timeline_entry(t: &SlotTimeline) -> SlotTimelineEntry {
    let color = t
        .color
        .iter()
        .enumerate()
        .map(|(i, s)| ColorKey {
            time: Num(s.time),
            color: s.value.clone(),
            curve: curve(&t.color, i),
        })
        .collect();
    let attachment = t
        .attachment
        .iter()
        .map(|s| AttachmentKey {
            time: Num(s.time),
            name: s.value.clone(),
        })
        .collect();
    let shape = t
        .pins
        .iter()
        .map(|(group, pins)| {
            let pins = pins
                .iter()
                .map(|(name, pin)| (name.clone(), pin_timeline_entry(pin, *group)))
                .collect();
            (shape_key(*group), pins)
        })
        .collect();
    SlotTimelineEntry {
        color,
        attachment,
        shape,
    }
}

fn shape_key(group: PinGroup) -> &'static str {
    match group {
        PinGroup::Deform => "deform",
        PinGroup::Stiffness => "starch",
        PinGroup::Overlap => "overlap",
    }
}
