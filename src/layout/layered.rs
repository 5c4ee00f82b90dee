//! Layered (Sugiyama-style) layout through dagre.
//!
//! Each node becomes a `2r x 2r` box and each descended parent/child slot an
//! edge. Edges get an elbow at the midpoint between ranks. Bounds are only
//! checked afterwards; dagre has no notion of a box to stay inside.

use std::collections::BTreeMap;

use dagre_rust::{
    GraphConfig as DagreConfig, GraphEdge as DagreEdge, GraphNode as DagreNode,
    layout as dagre_layout,
};
use graphlib_rust::{Graph as DagreGraph, GraphOption};
use tracing::{debug, warn};

use crate::config::{Direction, LayoutAlgorithm, LayoutConfig};
use crate::ir::MindTree;

use super::traversal;
use super::{LayoutError, LayoutResult, Placement, Position, Rect};

#[tracing::instrument(skip_all, fields(nodes = tree.len()))]
pub fn layout(
    tree: &MindTree,
    center: Position,
    bounds: Option<Rect>,
    config: &LayoutConfig,
) -> Result<LayoutResult, LayoutError> {
    super::validate_request(center, bounds, config)?;
    let walk = traversal::walk(tree)?;
    let mut placement = Placement::new(tree, walk);
    let nodes = tree.nodes();
    let layered = &config.layered;

    let mut dagre_graph: DagreGraph<DagreConfig, DagreNode, DagreEdge> =
        DagreGraph::new(Some(GraphOption {
            directed: Some(true),
            multigraph: Some(false),
            compound: Some(false),
        }));

    let mut graph_config = DagreConfig::default();
    graph_config.rankdir = Some(dagre_rankdir(layered.direction).to_string());
    graph_config.nodesep = Some(layered.node_spacing.max(config.margin) as f32);
    graph_config.ranksep = Some(layered.rank_spacing.max(config.margin) as f32);
    graph_config.marginx = Some(0.0);
    graph_config.marginy = Some(0.0);
    dagre_graph.set_graph(graph_config);

    for &node in &placement.walk.order {
        let diameter = (nodes[node].radius * 2.0) as f32;
        let mut dagre_node = DagreNode::default();
        dagre_node.width = diameter;
        dagre_node.height = diameter;
        dagre_graph.set_node(nodes[node].id.clone(), Some(dagre_node));
    }
    for &parent in &placement.walk.order {
        for slot in placement.walk.slots[parent].iter().filter(|slot| slot.descends) {
            let _ = dagre_graph.set_edge(
                &nodes[parent].id,
                &nodes[slot.child].id,
                Some(DagreEdge::default()),
                None,
            );
        }
    }

    dagre_layout::run_layout(&mut dagre_graph);

    let root = placement.walk.root;
    let anchor = dagre_graph
        .node(&nodes[root].id)
        .map(|n| Position::new(n.x as f64, n.y as f64))
        .unwrap_or_default();
    let shift = Position::new(center.x - anchor.x, center.y - anchor.y);
    for &node in &placement.walk.order {
        if let Some(dagre_node) = dagre_graph.node(&nodes[node].id) {
            placement.positions[node] = Some(Position::new(
                dagre_node.x as f64 + shift.x,
                dagre_node.y as f64 + shift.y,
            ));
        }
    }

    let mut bends = BTreeMap::new();
    for &parent in &placement.walk.order {
        let Some(from) = placement.positions[parent] else {
            continue;
        };
        for (slot_idx, slot) in placement.walk.slots[parent].iter().enumerate() {
            if !slot.descends {
                continue;
            }
            if let Some(to) = placement.positions[slot.child] {
                let elbow = elbow_points(from, to, layered.direction);
                if !elbow.is_empty() {
                    bends.insert((parent, slot_idx), elbow);
                }
            }
        }
    }

    placement.measure_subtrees();
    if let Some(rect) = bounds {
        placement.check_footprints(rect);
    }

    let result = placement.finish(LayoutAlgorithm::Layered, &bends)?;
    debug!(nodes = result.len(), edges = result.edges.len(), "layered layout complete");
    if result.degraded {
        warn!(warnings = result.warnings.len(), "layered layout leaves the bounds");
    }
    Ok(result)
}

fn dagre_rankdir(direction: Direction) -> &'static str {
    match direction {
        Direction::TopDown => "tb",
        Direction::BottomTop => "bt",
        Direction::LeftRight => "lr",
        Direction::RightLeft => "rl",
    }
}

/// Two bend points halfway between the ranks of `from` and `to`, or none
/// when the edge is already straight along the rank axis.
fn elbow_points(from: Position, to: Position, direction: Direction) -> Vec<Position> {
    match direction {
        Direction::TopDown | Direction::BottomTop => {
            if from.x == to.x {
                return Vec::new();
            }
            let mid = (from.y + to.y) / 2.0;
            vec![Position::new(from.x, mid), Position::new(to.x, mid)]
        }
        Direction::LeftRight | Direction::RightLeft => {
            if from.y == to.y {
                return Vec::new();
            }
            let mid = (from.x + to.x) / 2.0;
            vec![Position::new(mid, from.y), Position::new(mid, to.y)]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayeredConfig;

    fn school() -> MindTree {
        let mut tree = MindTree::new();
        let root = tree.add_node("school", "School", 40.0).unwrap();
        let teachers = tree.push_child(root, "teachers", "Teachers", 25.0).unwrap();
        let subjects = tree.push_child(root, "subjects", "Subjects", 25.0).unwrap();
        tree.push_child(teachers, "smith", "Mrs Smith", 18.0).unwrap();
        tree.push_child(teachers, "jones", "Mr Jones", 18.0).unwrap();
        tree.push_child(subjects, "math", "Math", 15.0).unwrap();
        tree
    }

    fn layered_config(direction: Direction) -> LayoutConfig {
        LayoutConfig {
            algorithm: LayoutAlgorithm::Layered,
            layered: LayeredConfig {
                direction,
                ..LayeredConfig::default()
            },
            ..LayoutConfig::default()
        }
    }

    #[test]
    fn root_lands_on_center() {
        let tree = school();
        let center = Position::new(250.0, 125.0);
        let result = layout(&tree, center, None, &layered_config(Direction::LeftRight)).unwrap();
        assert_eq!(result.len(), tree.len());
        let root = result.position("school").unwrap();
        assert!((root.x - center.x).abs() < 1e-3);
        assert!((root.y - center.y).abs() < 1e-3);
    }

    #[test]
    fn ranks_follow_direction() {
        let tree = school();
        let result =
            layout(&tree, Position::default(), None, &layered_config(Direction::TopDown)).unwrap();
        let root = result.position("school").unwrap();
        let child = result.position("teachers").unwrap();
        let grandchild = result.position("smith").unwrap();
        assert!(child.y > root.y);
        assert!(grandchild.y > child.y);
    }

    #[test]
    fn subtree_radii_cover_placed_descendants() {
        let tree = school();
        let result =
            layout(&tree, Position::default(), None, &layered_config(Direction::LeftRight)).unwrap();
        let root = result.position("school").unwrap();
        let extent = result.subtree_radius("school").unwrap();
        for node in tree.nodes() {
            let pos = result.position(&node.id).unwrap();
            assert!(root.distance(pos) + node.radius <= extent + 1e-6);
        }
    }

    #[test]
    fn tiny_bounds_mark_layout_degraded() {
        let tree = school();
        let bounds = Rect::new(-10.0, -10.0, 10.0, 10.0);
        let result = layout(
            &tree,
            Position::default(),
            Some(bounds),
            &layered_config(Direction::LeftRight),
        )
        .unwrap();
        assert!(result.degraded);
    }

    #[test]
    fn elbows_split_at_rank_midpoint() {
        let from = Position::new(0.0, 0.0);
        let to = Position::new(40.0, 100.0);
        assert_eq!(
            elbow_points(from, to, Direction::TopDown),
            vec![Position::new(0.0, 50.0), Position::new(40.0, 50.0)]
        );
        assert!(elbow_points(from, Position::new(0.0, 80.0), Direction::TopDown).is_empty());
        assert_eq!(
            elbow_points(from, to, Direction::LeftRight),
            vec![Position::new(20.0, 0.0), Position::new(20.0, 100.0)]
        );
    }
}
