//! Export of whole projects: scene selection, one document per scene, and
//! the footage those scenes use.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use ossify_core::{ExportConfig, OssifyError, OssifyResult};
use ossify_ir::validate::validate_project;
use ossify_ir::{FootageId, FootageKind, Project, Scene, SceneId};

use crate::assemble::{AnimationAssembler, Assembly};
use crate::attachment::AttachmentResolver;
use crate::flatten::{FlatScene, SceneFlattener};
use crate::naming::{footage_names, NameRegistry};
use crate::ports::{FootageExporter, Rasterizer};
use crate::sampler::CurveSampler;
use crate::writer::SkeletonDocument;

/// What was written for one scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneSummary {
    pub path: PathBuf,
    pub hash: String,
    pub bones: usize,
    pub slots: usize,
    pub fps: f64,
}

#[derive(Debug)]
pub struct SceneReport {
    pub scene: SceneId,
    pub name: String,
    pub result: OssifyResult<SceneSummary>,
}

#[derive(Debug)]
pub struct FootageReport {
    pub footage: FootageId,
    pub name: String,
    pub result: OssifyResult<()>,
}

/// Per-scene and per-footage outcome of one run.
#[derive(Debug)]
pub struct ExportReport {
    pub output_dir: PathBuf,
    pub scenes: Vec<SceneReport>,
    pub footage: Vec<FootageReport>,
}

impl ExportReport {
    pub fn failures(&self) -> usize {
        self.scenes.iter().filter(|s| s.result.is_err()).count()
            + self.footage.iter().filter(|f| f.result.is_err()).count()
    }

    pub fn is_success(&self) -> bool {
        self.failures() == 0
    }
}

/// `<projectDir>/<projectName><suffix>`.
pub fn default_output_dir(project_path: &Path, project: &Project, config: &ExportConfig) -> PathBuf {
    let dir = project_path.parent().unwrap_or_else(|| Path::new("."));
    dir.join(format!("{}{}", project.name, config.rendered_folder_suffix()))
}

pub struct Exporter<'a> {
    project: &'a Project,
    config: ExportConfig,
    rasterizer: &'a dyn Rasterizer,
    footage_exporter: &'a dyn FootageExporter,
}

impl<'a> Exporter<'a> {
    pub fn new(
        project: &'a Project,
        config: ExportConfig,
        rasterizer: &'a dyn Rasterizer,
        footage_exporter: &'a dyn FootageExporter,
    ) -> Self {
        Self {
            project,
            config,
            rasterizer,
            footage_exporter,
        }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Scenes to export: the named ones, or every scene that is not only
    /// used as a nested reference. Empty scenes are dropped.
    pub fn select_scenes(&self, names: &[String]) -> OssifyResult<Vec<&'a Scene>> {
        let candidates: Vec<&'a Scene> = if names.is_empty() {
            self.project.scenes.iter().filter(|s| !s.nested).collect()
        } else {
            names
                .iter()
                .map(|name| {
                    self.project.find_scene(name).ok_or_else(|| {
                        OssifyError::Configuration(format!("no scene named '{name}'"))
                    })
                })
                .collect::<OssifyResult<_>>()?
        };

        let selected: Vec<&'a Scene> = candidates
            .into_iter()
            .filter(|s| {
                if s.layers.is_empty() {
                    tracing::warn!(scene = %s.id, "skipping empty scene");
                }
                !s.layers.is_empty()
            })
            .collect();
        if selected.is_empty() {
            return Err(OssifyError::Configuration(
                "no non-empty scene selected for export".to_string(),
            ));
        }
        Ok(selected)
    }

    /// Export the selected scenes and their footage into `out_dir`.
    ///
    /// Errors that only concern one scene or footage item are recorded in
    /// the report; configuration and I/O errors abort the run.
    pub fn run(&self, scene_names: &[String], out_dir: &Path) -> OssifyResult<ExportReport> {
        if let Err(errors) = validate_project(self.project) {
            let joined = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(OssifyError::InvalidProject(joined));
        }
        let scenes = self.select_scenes(scene_names)?;
        std::fs::create_dir_all(out_dir)?;

        let images = footage_names(&self.project.footage);
        let used = self.footage_used(&scenes);
        let sequences: HashSet<&str> = used
            .iter()
            .filter_map(|id| self.project.footage.get(id))
            .filter(|f| matches!(f.kind, FootageKind::Sequence { .. }))
            .filter_map(|f| images.get(&f.id))
            .map(String::as_str)
            .collect();
        let mut file_names = NameRegistry::new();
        let mut report = ExportReport {
            output_dir: out_dir.to_path_buf(),
            scenes: Vec::with_capacity(scenes.len()),
            footage: Vec::new(),
        };

        for &scene in &scenes {
            let file_name = file_names.unique(&scene.name);
            let path = out_dir.join(format!("{file_name}.json"));
            let result = match self.export_scene(scene, &path, &images, &sequences) {
                Err(e) if e.aborts_run() => {
                    tracing::error!(scene = %scene.id, error = %e, "export aborted");
                    return Err(e);
                }
                result => result,
            };
            match &result {
                Ok(summary) => tracing::info!(
                    scene = %scene.id,
                    path = %summary.path.display(),
                    bones = summary.bones,
                    slots = summary.slots,
                    "exported scene"
                ),
                Err(e) => tracing::error!(scene = %scene.id, error = %e, "scene export failed"),
            }
            report.scenes.push(SceneReport {
                scene: scene.id.clone(),
                name: file_name,
                result,
            });
        }

        for id in used {
            let Some(footage) = self.project.footage.get(&id) else {
                continue;
            };
            let name = images.get(&id).cloned().unwrap_or_else(|| id.0.clone());
            let result = match self.footage_exporter.export(out_dir, footage, &name) {
                Err(e) if e.aborts_run() => {
                    tracing::error!(footage = %id, error = %e, "export aborted");
                    return Err(e);
                }
                result => result,
            };
            match &result {
                Ok(()) => tracing::info!(footage = %id, kind = %footage.kind, name = %name, "exported footage"),
                Err(e) => tracing::error!(footage = %id, error = %e, "footage export failed"),
            }
            report.footage.push(FootageReport {
                footage: id,
                name,
                result,
            });
        }
        Ok(report)
    }

    /// Flatten a scene with the sampling settings it will be exported with.
    pub fn flatten(&self, scene: &'a Scene) -> OssifyResult<FlatScene> {
        let sampler = self.sampler(scene)?;
        SceneFlattener::new(self.project, sampler).flatten(scene)
    }

    /// Flatten and assemble a scene. Distorted layers are rasterized into `out_dir`.
    pub fn assemble(
        &self,
        scene: &'a Scene,
        out_dir: &Path,
        images: &IndexMap<FootageId, String>,
    ) -> OssifyResult<(FlatScene, Assembly)> {
        let flat = self.flatten(scene)?;
        let assembly = self.assemble_flat(scene, &flat, out_dir, images)?;
        Ok((flat, assembly))
    }

    fn assemble_flat(
        &self,
        scene: &'a Scene,
        flat: &FlatScene,
        out_dir: &Path,
        images: &IndexMap<FootageId, String>,
    ) -> OssifyResult<Assembly> {
        let sampler = self.sampler(scene)?;
        let attachments = AttachmentResolver::new(
            scene.window,
            sampler.fps(),
            out_dir,
            self.rasterizer,
            self.config.compress,
        );
        AnimationAssembler::new(sampler, &self.config, &self.project.footage, images, attachments)
            .assemble(flat)
    }

    fn export_scene(
        &self,
        scene: &'a Scene,
        path: &Path,
        images: &IndexMap<FootageId, String>,
        sequences: &HashSet<&str>,
    ) -> OssifyResult<SceneSummary> {
        let out_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let flat = self.flatten(scene)?;
        check_frame_names(&flat, sequences)?;
        let assembly = self.assemble_flat(scene, &flat, out_dir, images)?;
        let document = SkeletonDocument::from_assembly(&assembly, &self.config.animation_name)?;
        document.write_to(path)?;
        Ok(SceneSummary {
            path: path.to_path_buf(),
            hash: document.skeleton.hash.clone(),
            bones: document.bones.len(),
            slots: document.slots.len(),
            fps: self.config.resolve_fps(scene.fps),
        })
    }

    fn sampler(&self, scene: &Scene) -> OssifyResult<CurveSampler> {
        let fps = self.config.resolve_fps(scene.fps);
        if fps.is_nan() || fps <= 0.0 {
            return Err(OssifyError::Configuration(format!(
                "scene '{}' resolves to a non-positive frame rate ({fps})",
                scene.id
            )));
        }
        tracing::debug!(scene = %scene.id, fps, fixed_rate = self.config.fixed_rate(), "sampling");
        Ok(CurveSampler::new(scene.window, fps, self.config.fixed_rate()))
    }

    /// Footage reachable from `scenes` through enabled layers, in registry order.
    fn footage_used(&self, scenes: &[&'a Scene]) -> Vec<FootageId> {
        let mut used: HashSet<&FootageId> = HashSet::new();
        let mut visited: HashSet<&SceneId> = HashSet::new();
        let mut pending: Vec<&Scene> = scenes.to_vec();
        while let Some(scene) = pending.pop() {
            if !visited.insert(&scene.id) {
                continue;
            }
            for layer in scene.layers.iter().filter(|l| l.enabled) {
                if let Some(footage) = layer.footage() {
                    used.insert(footage);
                }
                if let Some(nested) = layer.nested_scene().and_then(|id| self.project.get_scene(id)) {
                    pending.push(nested);
                }
            }
        }
        self.project
            .footage
            .all()
            .filter(|f| used.contains(&f.id))
            .map(|f| f.id.clone())
            .collect()
    }
}

/// Rendered frames of a distorted layer and the frames of an exported
/// sequence share the `<name>_NNNNN.png` pattern, so their names must differ.
fn check_frame_names(flat: &FlatScene, sequences: &HashSet<&str>) -> OssifyResult<()> {
    let clash = flat
        .layers
        .iter()
        .filter(|l| l.is_visible_content() && l.layer.is_distorted())
        .find(|l| sequences.contains(l.name.as_str()));
    match clash {
        Some(layer) => Err(OssifyError::NamingIntegrity {
            name: layer.name.clone(),
            reason: "rendered frames would overwrite the frames of an image sequence".to_string(),
        }),
        None => Ok(()),
    }
}
