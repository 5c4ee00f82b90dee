use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SizingConfig;
use crate::text;

/// Index of a node inside a [`MindTree`] arena.
pub type NodeIndex = usize;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TreeError {
    #[error("duplicate node id: {0}")]
    DuplicateId(String),

    #[error("node index {0} is not part of this tree")]
    UnknownNode(NodeIndex),

    #[error("no node with id `{0}`")]
    UnknownId(String),

    #[error("node without id or label")]
    MissingLabel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub id: String,
    pub label: String,
    /// Visual half-extent used for collision tests.
    pub radius: f64,
    /// Ordered children; the order is the angular placement order.
    pub children: Vec<NodeIndex>,
}

/// Arena-backed mind-map tree.
///
/// Children are stored as indices, so a child list may point back at an
/// ancestor or share a node with another parent. The arena accepts that on
/// purpose; the layout engine guards against it while walking.
#[derive(Debug, Clone, Default)]
pub struct MindTree {
    nodes: Vec<TreeNode>,
    ids: HashMap<String, NodeIndex>,
    root: Option<NodeIndex>,
}

impl MindTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a detached node. The first node added becomes the root.
    pub fn add_node(
        &mut self,
        id: impl Into<String>,
        label: impl Into<String>,
        radius: f64,
    ) -> Result<NodeIndex, TreeError> {
        let id = id.into();
        if self.ids.contains_key(&id) {
            return Err(TreeError::DuplicateId(id));
        }
        let idx = self.nodes.len();
        self.ids.insert(id.clone(), idx);
        self.nodes.push(TreeNode {
            id,
            label: label.into(),
            radius,
            children: Vec::new(),
        });
        if self.root.is_none() {
            self.root = Some(idx);
        }
        Ok(idx)
    }

    /// Appends `child` to the end of `parent`'s child list.
    pub fn add_child(&mut self, parent: NodeIndex, child: NodeIndex) -> Result<(), TreeError> {
        if child >= self.nodes.len() {
            return Err(TreeError::UnknownNode(child));
        }
        let node = self
            .nodes
            .get_mut(parent)
            .ok_or(TreeError::UnknownNode(parent))?;
        node.children.push(child);
        Ok(())
    }

    /// Convenience for building trees top-down: adds a node and links it
    /// under `parent` in one step.
    pub fn push_child(
        &mut self,
        parent: NodeIndex,
        id: impl Into<String>,
        label: impl Into<String>,
        radius: f64,
    ) -> Result<NodeIndex, TreeError> {
        if parent >= self.nodes.len() {
            return Err(TreeError::UnknownNode(parent));
        }
        let idx = self.add_node(id, label, radius)?;
        self.add_child(parent, idx)?;
        Ok(idx)
    }

    pub fn set_root(&mut self, idx: NodeIndex) -> Result<(), TreeError> {
        if idx >= self.nodes.len() {
            return Err(TreeError::UnknownNode(idx));
        }
        self.root = Some(idx);
        Ok(())
    }

    pub fn set_root_by_id(&mut self, id: &str) -> Result<(), TreeError> {
        let idx = self.index_of(id).ok_or_else(|| TreeError::UnknownId(id.to_string()))?;
        self.set_root(idx)
    }

    pub fn root(&self) -> Option<NodeIndex> {
        self.root
    }

    pub fn node(&self, idx: NodeIndex) -> Option<&TreeNode> {
        self.nodes.get(idx)
    }

    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.ids.get(id).copied()
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Builds an arena from the nested document form. Nodes without an
    /// explicit radius are sized from their label.
    pub fn from_document(doc: &TreeDocument, sizing: &SizingConfig) -> Result<Self, TreeError> {
        let mut tree = MindTree::new();
        let mut taken: HashSet<String> = collect_explicit_ids(doc);
        let mut stack: Vec<(&TreeDocument, Option<NodeIndex>)> = vec![(doc, None)];
        while let Some((current, parent)) = stack.pop() {
            let id = match current.id.as_deref() {
                Some(id) if !id.trim().is_empty() => id.trim().to_string(),
                _ => generated_id(&current.label, tree.len(), &mut taken)?,
            };
            let radius = current
                .radius
                .unwrap_or_else(|| text::node_radius(&current.label, sizing));
            let idx = tree.add_node(id, current.label.clone(), radius)?;
            if let Some(parent) = parent {
                tree.add_child(parent, idx)?;
            }
            for child in current.children.iter().rev() {
                stack.push((child, Some(idx)));
            }
        }
        Ok(tree)
    }
}

/// Nested, serde-friendly form of a tree, as read from JSON input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeDocument>,
}

impl TreeDocument {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = Some(radius);
        self
    }

    pub fn with_child(mut self, child: TreeDocument) -> Self {
        self.children.push(child);
        self
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(TreeDocument::node_count).sum::<usize>()
    }
}

fn collect_explicit_ids(doc: &TreeDocument) -> HashSet<String> {
    let mut ids = HashSet::new();
    let mut stack = vec![doc];
    while let Some(current) = stack.pop() {
        if let Some(id) = current.id.as_deref() {
            if !id.trim().is_empty() {
                ids.insert(id.trim().to_string());
            }
        }
        stack.extend(current.children.iter());
    }
    ids
}

fn generated_id(
    label: &str,
    ordinal: usize,
    taken: &mut HashSet<String>,
) -> Result<String, TreeError> {
    let base = sanitize_id(label);
    if base.is_empty() && label.trim().is_empty() {
        return Err(TreeError::MissingLabel);
    }
    let base = if base.is_empty() {
        format!("node_{ordinal}")
    } else {
        base
    };
    let mut candidate = base.clone();
    let mut suffix = 1usize;
    while taken.contains(&candidate) {
        candidate = format!("{base}_{suffix}");
        suffix += 1;
    }
    taken.insert(candidate.clone());
    Ok(candidate)
}

/// Turns a free-form label into an identifier: alphanumerics kept, runs of
/// separators collapsed to a single underscore.
pub fn sanitize_id(input: &str) -> String {
    let mut out = String::new();
    for ch in input.chars() {
        if ch.is_alphanumeric() {
            out.push(ch);
        } else if (ch.is_whitespace() || ch == '-' || ch == '_') && !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}
