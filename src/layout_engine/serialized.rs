//! Persisted tree shapes.
//!
//! A shape records structure, split axes, ratios and leaf window lists. It
//! never records containers; those are rebuilt from the root rectangle when
//! the shape is loaded.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use super::LayoutError;
use super::graph::SplitAxis;
use super::workspaces::SpaceId;
use crate::common::collections::BTreeMap;
use crate::model::WindowId;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SerializedNode {
    Split {
        /// Resolved optimally from the node's container when absent.
        #[serde(default)]
        axis: Option<SplitAxis>,
        /// `0.0` means the configured default.
        #[serde(default)]
        ratio: f64,
        first: Box<SerializedNode>,
        second: Box<SerializedNode>,
    },
    Leaf {
        #[serde(default)]
        windows: Vec<WindowId>,
    },
}

impl SerializedNode {
    pub fn leaf(windows: impl IntoIterator<Item = u32>) -> Self {
        SerializedNode::Leaf {
            windows: windows.into_iter().map(WindowId).collect(),
        }
    }

    pub fn split(
        axis: impl Into<Option<SplitAxis>>,
        ratio: f64,
        first: SerializedNode,
        second: SerializedNode,
    ) -> Self {
        SerializedNode::Split {
            axis: axis.into(),
            ratio,
            first: Box::new(first),
            second: Box::new(second),
        }
    }

    /// Windows in the order their leaves appear, first child before second.
    pub fn windows(&self) -> Vec<WindowId> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                SerializedNode::Leaf { windows } => out.extend(windows.iter().copied()),
                SerializedNode::Split { first, second, .. } => {
                    stack.push(second);
                    stack.push(first);
                }
            }
        }
        out
    }

    pub fn from_ron(buf: &str) -> Result<Self, LayoutError> { Ok(ron::from_str(buf)?) }

    pub fn to_ron(&self) -> Result<String, LayoutError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    pub fn load(path: &Path) -> Result<Self, LayoutError> {
        Self::from_ron(&fs::read_to_string(path)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), LayoutError> {
        write_creating_parent(path, &self.to_ron()?)
    }
}

/// The shapes of every tiled space, used to restore the engine after a restart.
#[serde_as]
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct EngineSnapshot {
    #[serde_as(as = "Vec<(_, _)>")]
    pub spaces: BTreeMap<SpaceId, SerializedNode>,
}

impl EngineSnapshot {
    pub fn load(path: &Path) -> Result<Self, LayoutError> {
        Ok(ron::from_str(&fs::read_to_string(path)?)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), LayoutError> {
        let buf = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        write_creating_parent(path, &buf)
    }
}

fn write_creating_parent(path: &Path, contents: &str) -> Result<(), LayoutError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, contents)?;
    Ok(())
}
