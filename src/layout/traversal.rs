use crate::ir::{MindTree, NodeIndex};

use super::LayoutError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Slot {
    pub child: NodeIndex,
    /// False when `child` was first reached through another slot; the
    /// child is then laid out as a leaf here and never descended into.
    pub descends: bool,
}

/// Result of a cycle-safe depth-first walk from the root.
#[derive(Debug, Clone)]
pub(crate) struct Traversal {
    pub root: NodeIndex,
    /// First visits in pre-order. Parents always precede their descended
    /// children, so iterating in reverse is a valid post-order.
    pub order: Vec<NodeIndex>,
    /// Child slots per node index; empty for nodes never reached.
    pub slots: Vec<Vec<Slot>>,
}

impl Traversal {
    /// `(parent, child)` pairs for every slot that did not descend.
    pub fn revisits(&self) -> impl Iterator<Item = (NodeIndex, NodeIndex)> + '_ {
        self.order.iter().flat_map(move |&parent| {
            self.slots[parent]
                .iter()
                .filter(|slot| !slot.descends)
                .map(move |slot| (parent, slot.child))
        })
    }
}

/// Walks every node reachable from the root, validating radii on the way.
///
/// A node reached a second time (a back-edge in a cycle, or a child shared
/// by two parents) is not walked again; the slot that reached it is marked
/// as non-descending.
pub(crate) fn walk(tree: &MindTree) -> Result<Traversal, LayoutError> {
    let root = tree.root().ok_or(LayoutError::EmptyTree)?;
    let nodes = tree.nodes();
    let count = nodes.len();

    let mut first_slot: Vec<Option<(NodeIndex, usize)>> = vec![None; count];
    let mut reached = vec![false; count];
    let mut order = Vec::with_capacity(count);
    let mut stack: Vec<(NodeIndex, Option<(NodeIndex, usize)>)> = vec![(root, None)];

    while let Some((node, via)) = stack.pop() {
        if reached[node] {
            continue;
        }
        let current = &nodes[node];
        if !(current.radius > 0.0 && current.radius.is_finite()) {
            return Err(LayoutError::NonPositiveRadius {
                id: current.id.clone(),
                radius: current.radius,
            });
        }
        reached[node] = true;
        first_slot[node] = via;
        order.push(node);
        for (slot, &child) in current.children.iter().enumerate().rev() {
            if !reached[child] {
                stack.push((child, Some((node, slot))));
            }
        }
    }

    let mut slots = vec![Vec::new(); count];
    for &node in &order {
        slots[node] = nodes[node]
            .children
            .iter()
            .enumerate()
            .map(|(slot, &child)| Slot {
                child,
                descends: first_slot[child] == Some((node, slot)),
            })
            .collect();
    }

    Ok(Traversal { root, order, slots })
}
