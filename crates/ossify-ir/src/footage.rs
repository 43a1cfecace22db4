use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use ossify_core::Color;

/// Unique identifier for a footage item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FootageId(pub String);

impl FootageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for FootageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a footage item's pixels come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FootageKind {
    /// A single image file (path relative to the project file).
    File { path: PathBuf },
    /// A solid color plane.
    Solid { color: Color },
    /// Numbered image files, e.g. `frames/walk[0001-0010].png`.
    Sequence { path: PathBuf },
}

impl std::fmt::Display for FootageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FootageKind::File { .. } => write!(f, "file"),
            FootageKind::Solid { .. } => write!(f, "solid"),
            FootageKind::Sequence { .. } => write!(f, "sequence"),
        }
    }
}

/// A registered image source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Footage {
    pub id: FootageId,
    /// Explicit name; otherwise derived from the file name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub width: u32,
    pub height: u32,
    #[serde(flatten)]
    pub kind: FootageKind,
}

impl Footage {
    pub fn file(id: impl Into<String>, path: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        Self {
            id: FootageId::new(id),
            name: None,
            width,
            height,
            kind: FootageKind::File { path: path.into() },
        }
    }

    pub fn solid(id: impl Into<String>, color: Color, width: u32, height: u32) -> Self {
        Self {
            id: FootageId::new(id),
            name: None,
            width,
            height,
            kind: FootageKind::Solid { color },
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The host-visible name before normalization.
    ///
    /// Files without an explicit name are known by their file name without
    /// extension; sequences by the part before the frame range.
    pub fn raw_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        match &self.kind {
            FootageKind::File { path } => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.id.0.clone()),
            FootageKind::Sequence { path } => file_name(path)
                .and_then(|n| SequencePattern::parse(&n))
                .map(|p| p.prefix)
                .unwrap_or_else(|| self.id.0.clone()),
            FootageKind::Solid { .. } => self.id.0.clone(),
        }
    }
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

/// The frame range of a numbered image sequence, `prefix[start-end]suffix`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencePattern {
    pub prefix: String,
    pub start: u32,
    pub end: u32,
    /// Zero-padding width; `0` when start and end differ in digit count.
    pub width: usize,
    pub suffix: String,
}

impl SequencePattern {
    pub fn parse(file_name: &str) -> Option<Self> {
        let open = file_name.find('[')?;
        let close = open + file_name[open..].find(']')?;
        let (start, end) = file_name[open + 1..close].split_once('-')?;
        if start.is_empty() || end.is_empty() {
            return None;
        }
        let width = if start.len() == end.len() { start.len() } else { 0 };
        let pattern = Self {
            prefix: file_name[..open].to_string(),
            start: start.parse().ok()?,
            end: end.parse().ok()?,
            width,
            suffix: file_name[close + 1..].to_string(),
        };
        (pattern.start <= pattern.end).then_some(pattern)
    }

    /// File name of frame `n` with the given zero padding.
    pub fn frame_file_name(&self, n: u32, width: usize) -> String {
        format!("{}{:0width$}{}", self.prefix, n, self.suffix, width = width)
    }

    pub fn frames(&self) -> std::ops::RangeInclusive<u32> {
        self.start..=self.end
    }
}

/// Registry of all footage in a project, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Footage>", into = "Vec<Footage>")]
pub struct FootageRegistry {
    items: IndexMap<FootageId, Footage>,
}

impl FootageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a footage item. Returns its id.
    pub fn register(&mut self, footage: Footage) -> FootageId {
        let id = footage.id.clone();
        self.items.insert(id.clone(), footage);
        id
    }

    pub fn get(&self, id: &FootageId) -> Option<&Footage> {
        self.items.get(id)
    }

    pub fn all(&self) -> impl Iterator<Item = &Footage> {
        self.items.values()
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }
}

impl From<Vec<Footage>> for FootageRegistry {
    fn from(items: Vec<Footage>) -> Self {
        let mut registry = FootageRegistry::new();
        for footage in items {
            registry.register(footage);
        }
        registry
    }
}

impl From<FootageRegistry> for Vec<Footage> {
    fn from(registry: FootageRegistry) -> Self {
        registry.items.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_name_from_file() {
        let f = Footage::file("1", "assets/Arm Left.PNG", 64, 32);
        assert_eq!(f.raw_name(), "Arm Left");
        assert_eq!(f.clone().with_name("Sleeve").raw_name(), "Sleeve");
    }

    #[test]
    fn test_sequence_pattern() {
        let p = SequencePattern::parse("walk[0001-0010].png").unwrap();
        assert_eq!(p.prefix, "walk");
        assert_eq!((p.start, p.end, p.width), (1, 10, 4));
        assert_eq!(p.suffix, ".png");
        assert_eq!(p.frame_file_name(7, p.width), "walk0007.png");
        assert_eq!(p.frames().count(), 10);
    }

    #[test]
    fn test_sequence_pattern_rejects_plain_names() {
        assert!(SequencePattern::parse("walk.png").is_none());
        assert!(SequencePattern::parse("walk[-3].png").is_none());
        assert!(SequencePattern::parse("walk[9-1].png").is_none());
        let p = SequencePattern::parse("run[1-12].tif").unwrap();
        assert_eq!(p.width, 0);
    }

    #[test]
    fn test_registry_keeps_order() {
        let mut registry = FootageRegistry::new();
        registry.register(Footage::file("b", "b.png", 1, 1));
        registry.register(Footage::solid("a", Color::BLACK, 1, 1));
        let ids: Vec<_> = registry.all().map(|f| f.id.0.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_registry_json() {
        let json = r#"[
            {"id": "arm", "width": 10, "height": 20, "type": "file", "path": "arm.png"},
            {"id": "bg", "name": "Background", "width": 4, "height": 4, "type": "solid",
             "color": {"r": 1, "g": 0, "b": 0, "a": 1}}
        ]"#;
        let registry: FootageRegistry = serde_json::from_str(json).unwrap();
        assert_eq!(registry.count(), 2);
        let bg = registry.get(&FootageId::new("bg")).unwrap();
        assert_eq!(bg.raw_name(), "Background");
        assert!(matches!(bg.kind, FootageKind::Solid { .. }));
    }
}
