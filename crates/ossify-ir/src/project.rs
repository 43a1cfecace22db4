use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::footage::FootageRegistry;
use crate::scene::{Scene, SceneId};
use ossify_core::OssifyResult;

/// Top-level project: the root of the input scene graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    /// Registered image sources.
    #[serde(default)]
    pub footage: FootageRegistry,
    /// Ordered list of scenes in the project.
    #[serde(default)]
    pub scenes: Vec<Scene>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            footage: FootageRegistry::new(),
            scenes: Vec::new(),
        }
    }

    pub fn from_json(json: &str) -> OssifyResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load_from_file(path: &Path) -> OssifyResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn to_json(&self) -> OssifyResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn add_scene(&mut self, scene: Scene) {
        self.scenes.push(scene);
    }

    pub fn get_scene(&self, id: &SceneId) -> Option<&Scene> {
        self.scenes.iter().find(|s| &s.id == id)
    }

    /// Find a scene by id, falling back to its display name.
    pub fn find_scene(&self, key: &str) -> Option<&Scene> {
        self.scenes
            .iter()
            .find(|s| s.id.0 == key)
            .or_else(|| self.scenes.iter().find(|s| s.name == key))
    }
}
