//! Output names for bones, slots, attachments, footage and documents.

use std::collections::HashSet;

use indexmap::IndexMap;
use ossify_ir::{FootageId, FootageRegistry};

/// Separator of synthetic flattened layer ids. Normalized names never
/// contain it, so finding it in an output name means an id leaked.
pub const FLATTEN_MARKER: char = '/';

/// Name of the implicit root bone.
pub const ROOT_BONE: &str = "root";

/// Stands in for names that normalize to nothing.
pub const UNNAMED: &str = "unnamed";

/// Normalize a host name: cut at the first `/`, lower-case, and replace
/// whitespace with `_`.
pub fn normalize_name(raw: &str) -> String {
    let head = raw.split(FLATTEN_MARKER).next().unwrap_or_default();
    if head.is_empty() {
        return UNNAMED.to_string();
    }
    head.to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

/// Hands out names unique within one scope.
///
/// The first occurrence of a name stays bare; later ones get `_2`, `_3`,
/// and so on, skipping suffixes that are already taken.
#[derive(Debug, Default)]
pub struct NameRegistry {
    taken: HashSet<String>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry in which `reserved` names are already taken.
    pub fn with_reserved<'a>(reserved: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            taken: reserved.into_iter().map(str::to_string).collect(),
        }
    }

    /// Normalize `raw` and make it unique.
    pub fn unique(&mut self, raw: &str) -> String {
        let base = normalize_name(raw);
        let mut candidate = base.clone();
        let mut n = 1;
        while self.taken.contains(&candidate) {
            n += 1;
            candidate = format!("{base}_{n}");
        }
        self.taken.insert(candidate.clone());
        candidate
    }

    pub fn contains(&self, name: &str) -> bool {
        self.taken.contains(name)
    }
}

/// Unique export names for every footage item, in registry order.
pub fn footage_names(registry: &FootageRegistry) -> IndexMap<FootageId, String> {
    let mut names = NameRegistry::new();
    registry
        .all()
        .map(|f| (f.id.clone(), names.unique(&f.raw_name())))
        .collect()
}

/// Whether a name can appear in the output document.
pub fn is_clean(name: &str) -> bool {
    !name.is_empty() && !name.contains(FLATTEN_MARKER)
}
