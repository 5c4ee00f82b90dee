use crate::config::LayoutAlgorithm;
use crate::ir::MindTree;
use crate::layout::{LayoutResult, LayoutWarning, Rect};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump {
    pub algorithm: LayoutAlgorithm,
    pub degraded: bool,
    pub extent: Rect,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
    pub warnings: Vec<LayoutWarning>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDump {
    pub id: String,
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub subtree_radius: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDump {
    pub from: String,
    pub to: String,
    pub points: Vec<[f64; 2]>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub revisit: bool,
}

impl LayoutDump {
    /// Nodes are listed in tree order, which is also the order a renderer
    /// should paint them in.
    pub fn from_layout(layout: &LayoutResult, tree: &MindTree) -> Self {
        let mut nodes = Vec::with_capacity(layout.len());
        let mut seen = std::collections::HashSet::new();
        let mut ordered = Vec::with_capacity(layout.len());
        if let Some(root) = tree.root().and_then(|idx| tree.node(idx)) {
            ordered.push(root.id.as_str());
        }
        for edge in &layout.edges {
            ordered.push(edge.to.as_str());
        }
        for id in ordered {
            if !seen.insert(id) {
                continue;
            }
            let (Some(position), Some(node)) =
                (layout.position(id), tree.index_of(id).and_then(|idx| tree.node(idx)))
            else {
                continue;
            };
            nodes.push(NodeDump {
                id: node.id.clone(),
                label: node.label.clone(),
                x: position.x,
                y: position.y,
                radius: node.radius,
                subtree_radius: layout.subtree_radius(id).unwrap_or(node.radius),
            });
        }

        let edges = layout
            .edges
            .iter()
            .map(|edge| EdgeDump {
                from: edge.from.clone(),
                to: edge.to.clone(),
                points: edge.points.iter().map(|p| [p.x, p.y]).collect(),
                revisit: edge.revisit,
            })
            .collect();

        LayoutDump {
            algorithm: layout.algorithm,
            degraded: layout.degraded,
            extent: layout.extent,
            nodes,
            edges,
            warnings: layout.warnings.clone(),
        }
    }
}

/// Writes the dump as pretty JSON to `path`, or to stdout when `path` is
/// `None`.
pub fn write_layout_dump(
    path: Option<&Path>,
    layout: &LayoutResult,
    tree: &MindTree,
) -> anyhow::Result<()> {
    let dump = LayoutDump::from_layout(layout, tree);
    match path {
        Some(path) => {
            let writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(writer, &dump)?;
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            serde_json::to_writer_pretty(&mut handle, &dump)?;
            writeln!(handle)?;
        }
    }
    Ok(())
}
