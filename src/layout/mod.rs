//! Mind-map layout backends.
//!
//! [`radial`] is the native circle-packing engine; [`layered`] hands the same
//! tree to the dagre layered layout. Both return a [`LayoutResult`] with the
//! same shape so callers can render either one identically.

mod error;
pub mod layered;
pub mod radial;
mod traversal;
mod types;

use std::collections::BTreeMap;

use crate::config::{LayoutAlgorithm, LayoutConfig};
use crate::ir::MindTree;

pub use error::LayoutError;
pub use types::{EdgeLayout, LayoutResult, LayoutWarning, Position, Rect};

use traversal::Traversal;

/// Lays out `tree` with the backend selected by `config.algorithm`.
pub fn compute_layout(
    tree: &MindTree,
    center: Position,
    bounds: Option<Rect>,
    config: &LayoutConfig,
) -> Result<LayoutResult, LayoutError> {
    match config.algorithm {
        LayoutAlgorithm::Radial => radial::layout(tree, center, bounds, config),
        LayoutAlgorithm::Layered => layered::layout(tree, center, bounds, config),
    }
}

fn validate_request(
    center: Position,
    bounds: Option<Rect>,
    config: &LayoutConfig,
) -> Result<(), LayoutError> {
    config.validate()?;
    if !center.is_finite() {
        return Err(LayoutError::NonFiniteCenter {
            x: center.x,
            y: center.y,
        });
    }
    if let Some(rect) = bounds {
        if !rect.is_valid() {
            return Err(LayoutError::InvalidBounds {
                min_x: rect.min_x,
                min_y: rect.min_y,
                max_x: rect.max_x,
                max_y: rect.max_y,
            });
        }
    }
    Ok(())
}

/// Placement state shared by the backends while assembling a result.
struct Placement<'a> {
    tree: &'a MindTree,
    walk: Traversal,
    positions: Vec<Option<Position>>,
    subtree: Vec<f64>,
    warnings: Vec<LayoutWarning>,
}

impl<'a> Placement<'a> {
    fn new(tree: &'a MindTree, walk: Traversal) -> Self {
        let count = tree.len();
        let mut warnings = Vec::new();
        for (parent, child) in walk.revisits() {
            warnings.push(LayoutWarning::RevisitedNode {
                id: tree.nodes()[child].id.clone(),
                parent: tree.nodes()[parent].id.clone(),
            });
        }
        Self {
            tree,
            walk,
            positions: vec![None; count],
            subtree: vec![0.0; count],
            warnings,
        }
    }

    /// Containment radii measured from placed geometry, for backends that
    /// do not compute them up front.
    fn measure_subtrees(&mut self) {
        let nodes = self.tree.nodes();
        for &node in self.walk.order.iter().rev() {
            let Some(origin) = self.positions[node] else {
                continue;
            };
            let mut radius = nodes[node].radius;
            for slot in self.walk.slots[node].iter().filter(|slot| slot.descends) {
                if let Some(child) = self.positions[slot.child] {
                    radius = radius.max(origin.distance(child) + self.subtree[slot.child]);
                }
            }
            self.subtree[node] = radius;
        }
    }

    /// Flags every reached node whose footprint leaves `bounds`.
    fn check_footprints(&mut self, bounds: Rect) {
        let nodes = self.tree.nodes();
        for &node in &self.walk.order {
            let Some(center) = self.positions[node] else {
                continue;
            };
            if !bounds.contains_circle(center, nodes[node].radius) {
                self.warnings.push(LayoutWarning::OutOfBounds {
                    id: nodes[node].id.clone(),
                });
            }
        }
    }

    /// Fails when any placed coordinate overflowed.
    fn finish(
        self,
        algorithm: LayoutAlgorithm,
        bends: &BTreeMap<(usize, usize), Vec<Position>>,
    ) -> Result<LayoutResult, LayoutError> {
        let nodes = self.tree.nodes();
        if let Some(&node) = self
            .walk
            .order
            .iter()
            .find(|&&node| self.positions[node].is_some_and(|p| !p.is_finite()))
        {
            return Err(LayoutError::NonFinitePosition {
                id: nodes[node].id.clone(),
            });
        }
        let mut positions = BTreeMap::new();
        let mut subtree_radii = BTreeMap::new();
        let mut extent: Option<Rect> = None;
        for &node in &self.walk.order {
            let Some(center) = self.positions[node] else {
                continue;
            };
            let id = nodes[node].id.clone();
            let footprint = Rect::around(center, nodes[node].radius);
            extent = Some(match extent {
                Some(rect) => rect.union(&footprint),
                None => footprint,
            });
            positions.insert(id.clone(), center);
            subtree_radii.insert(id, self.subtree[node]);
        }

        let mut edges = Vec::new();
        for &parent in &self.walk.order {
            let Some(from) = self.positions[parent] else {
                continue;
            };
            for (slot_idx, slot) in self.walk.slots[parent].iter().enumerate() {
                let Some(to) = self.positions[slot.child] else {
                    continue;
                };
                let mut points = vec![from];
                if let Some(extra) = bends.get(&(parent, slot_idx)) {
                    points.extend(extra.iter().copied());
                }
                points.push(to);
                edges.push(EdgeLayout {
                    from: nodes[parent].id.clone(),
                    to: nodes[slot.child].id.clone(),
                    points,
                    revisit: !slot.descends,
                });
            }
        }

        let degraded = self.warnings.iter().any(LayoutWarning::is_degrading);
        let root_center = self.positions[self.walk.root].unwrap_or_default();
        Ok(LayoutResult {
            algorithm,
            positions,
            subtree_radii,
            edges,
            extent: extent.unwrap_or_else(|| Rect::around(root_center, 0.0)),
            degraded,
            warnings: self.warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> MindTree {
        let mut tree = MindTree::new();
        let root = tree.add_node("root", "Root", 30.0).unwrap();
        tree.push_child(root, "leaf", "Leaf", 10.0).unwrap();
        tree
    }

    #[test]
    fn dispatches_on_algorithm() {
        let tree = pair();
        let mut config = LayoutConfig::default();
        let radial = compute_layout(&tree, Position::default(), None, &config).unwrap();
        assert_eq!(radial.algorithm, LayoutAlgorithm::Radial);
        config.algorithm = LayoutAlgorithm::Layered;
        let layered = compute_layout(&tree, Position::default(), None, &config).unwrap();
        assert_eq!(layered.algorithm, LayoutAlgorithm::Layered);
        assert_eq!(layered.len(), 2);
    }

    #[test]
    fn rejects_malformed_requests() {
        let tree = pair();
        let config = LayoutConfig::default();
        let inverted = Rect::new(10.0, 0.0, -10.0, 5.0);
        assert!(matches!(
            compute_layout(&tree, Position::default(), Some(inverted), &config),
            Err(LayoutError::InvalidBounds { .. })
        ));
        assert!(matches!(
            compute_layout(&tree, Position::new(f64::NAN, 0.0), None, &config),
            Err(LayoutError::NonFiniteCenter { .. })
        ));
        let mut bad = LayoutConfig::default();
        bad.breathing_factor = 0.9;
        assert!(matches!(
            compute_layout(&tree, Position::default(), None, &bad),
            Err(LayoutError::InvalidConfig(_))
        ));
    }

    #[test]
    fn extent_covers_every_footprint() {
        let tree = pair();
        let result =
            compute_layout(&tree, Position::new(100.0, 100.0), None, &LayoutConfig::default())
                .unwrap();
        for node in tree.nodes() {
            let center = result.position(&node.id).unwrap();
            assert!(result.extent.contains_circle(center, node.radius));
        }
    }
}
