//! Habitat modules and the append-only graph they form.

use crate::habitat::layout::{self, Layout};
use habitat_macros::OutputSchema;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;

/// The kind of structure a module is.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, OutputSchema,
)]
#[serde(rename_all = "lowercase")]
#[schema(rename_all = "lowercase")]
pub enum HabitatKind {
    Shuttle,
    Biodome,
    Tunnel,
}

impl HabitatKind {
    pub const ALL: [HabitatKind; 3] = [HabitatKind::Shuttle, HabitatKind::Biodome, HabitatKind::Tunnel];

    pub fn name(self) -> &'static str {
        match self {
            HabitatKind::Shuttle => "shuttle",
            HabitatKind::Biodome => "biodome",
            HabitatKind::Tunnel => "tunnel",
        }
    }
}

impl fmt::Display for HabitatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One structure in the player's base
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, OutputSchema)]
#[serde(rename_all = "camelCase")]
#[schema(rename_all = "camelCase")]
pub struct HabitatModule {
    /// Stable identifier such as "shuttle-1" or "biodome-2"; never reused or changed
    pub id: String,
    /// What kind of structure this is
    pub kind: HabitatKind,
    /// Id of the module this one attaches to; null only for the crashed shuttle
    #[serde(default)]
    pub parent_id: Option<String>,
}

impl HabitatModule {
    /// A module with no parent.
    pub fn root(id: impl Into<String>, kind: HabitatKind) -> Self {
        Self {
            id: id.into(),
            kind,
            parent_id: None,
        }
    }

    /// A module attached to `parent`.
    pub fn attached(id: impl Into<String>, kind: HabitatKind, parent: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            parent_id: Some(parent.into()),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Reasons a turn's module list cannot extend the current habitat.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HabitatIntegrityError {
    #[error("module `{id}` from an earlier turn is missing")]
    MissingModule { id: String },

    #[error("module `{id}` changed its kind or parent")]
    ModifiedModule { id: String },

    #[error("module `{id}` is listed twice with different data")]
    DuplicateModule { id: String },

    #[error("module `{id}` attaches to unknown module `{parent}`")]
    UnknownParent { id: String, parent: String },

    #[error("module `{id}` attaches to itself")]
    SelfParent { id: String },

    #[error("module `{id}` is a second root; `{root}` is already the root")]
    MultipleRoots { id: String, root: String },

    #[error("module at position {index} has an empty id")]
    BlankId { index: usize },

    #[error("habitat has no root module")]
    MissingRoot,
}

impl HabitatIntegrityError {
    /// The offending module id, when there is one.
    pub fn module_id(&self) -> Option<&str> {
        match self {
            HabitatIntegrityError::MissingModule { id }
            | HabitatIntegrityError::ModifiedModule { id }
            | HabitatIntegrityError::DuplicateModule { id }
            | HabitatIntegrityError::UnknownParent { id, .. }
            | HabitatIntegrityError::SelfParent { id }
            | HabitatIntegrityError::MultipleRoots { id, .. } => Some(id),
            HabitatIntegrityError::BlankId { .. } | HabitatIntegrityError::MissingRoot => None,
        }
    }
}

/// The habitat as of the latest applied turn.
///
/// Modules keep the order the latest turn listed them in. Graphs only grow:
/// a new graph is obtained through [`HabitatGraph::merge`], which rejects
/// anything that would drop, rewrite or re-parent an existing module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitatGraph {
    modules: Vec<HabitatModule>,
}

impl HabitatGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from scratch, applying the same checks as a merge.
    pub fn from_modules(modules: &[HabitatModule]) -> Result<Self, HabitatIntegrityError> {
        Self::new().merge(modules)
    }

    pub fn modules(&self) -> &[HabitatModule] {
        &self.modules
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&HabitatModule> {
        self.modules.iter().find(|m| m.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// The module with no parent.
    pub fn root(&self) -> Option<&HabitatModule> {
        self.modules.iter().find(|m| m.is_root())
    }

    /// Direct children of `id`, in graph order.
    pub fn children_of<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a HabitatModule> + 'a {
        self.modules
            .iter()
            .filter(move |m| m.parent_id.as_deref() == Some(id))
    }

    pub fn count_of(&self, kind: HabitatKind) -> usize {
        self.modules.iter().filter(|m| m.kind == kind).count()
    }

    /// Place every module reachable from the root.
    pub fn layout(&self) -> Layout {
        layout::layout(self)
    }

    /// Validate `incoming` as the next version of this graph.
    ///
    /// `incoming` must repeat every existing module unchanged. New modules are
    /// checked in arrival order: a parent must already exist, either in this
    /// graph or earlier in `incoming`. Exactly one root may exist overall.
    /// Exact repeats of a module within `incoming` collapse to one entry.
    pub fn merge(&self, incoming: &[HabitatModule]) -> Result<HabitatGraph, HabitatIntegrityError> {
        let previous: HashMap<&str, &HabitatModule> =
            self.modules.iter().map(|m| (m.id.as_str(), m)).collect();
        let mut accepted: Vec<HabitatModule> = Vec::with_capacity(incoming.len());
        let mut accepted_ids: HashSet<&str> = HashSet::with_capacity(incoming.len());
        let mut root: Option<&str> = self.root().map(|m| m.id.as_str());

        for (index, module) in incoming.iter().enumerate() {
            let id = module.id.as_str();
            if id.trim().is_empty() {
                return Err(HabitatIntegrityError::BlankId { index });
            }

            if accepted_ids.contains(id) {
                if accepted.iter().any(|m| m == module) {
                    continue;
                }
                return Err(HabitatIntegrityError::DuplicateModule { id: id.to_string() });
            }

            if let Some(existing) = previous.get(id) {
                if existing.kind != module.kind || existing.parent_id != module.parent_id {
                    return Err(HabitatIntegrityError::ModifiedModule { id: id.to_string() });
                }
            } else {
                match module.parent_id.as_deref() {
                    Some(parent) if parent == id => {
                        return Err(HabitatIntegrityError::SelfParent { id: id.to_string() });
                    }
                    Some(parent) => {
                        if !previous.contains_key(parent) && !accepted_ids.contains(parent) {
                            return Err(HabitatIntegrityError::UnknownParent {
                                id: id.to_string(),
                                parent: parent.to_string(),
                            });
                        }
                    }
                    None => {
                        if let Some(root) = root {
                            return Err(HabitatIntegrityError::MultipleRoots {
                                id: id.to_string(),
                                root: root.to_string(),
                            });
                        }
                        root = Some(id);
                    }
                }
            }

            accepted_ids.insert(id);
            accepted.push(module.clone());
        }

        if let Some(missing) = self.modules.iter().find(|m| !accepted_ids.contains(m.id.as_str())) {
            return Err(HabitatIntegrityError::MissingModule {
                id: missing.id.clone(),
            });
        }

        if root.is_none() {
            return Err(HabitatIntegrityError::MissingRoot);
        }

        Ok(HabitatGraph { modules: accepted })
    }
}
