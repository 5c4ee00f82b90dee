//! Radial circle-packing layout.
//!
//! Phase one walks the tree bottom-up and sizes, for every node, a ring on
//! which its children sit. Phase two walks top-down and drops each child onto
//! its parent's ring, rotating the ring when a bounding rectangle is given and
//! a child would leave it.
//!
//! A node's children fan out around it starting from the direction of its
//! parent, so the shape of a subtree is rigid along the line from its node
//! away from the parent. Each subtree is summarized by two [`Envelope`]s on
//! that line: one around the whole subtree and one around everything strictly
//! below its node. A ring fits when sibling envelopes are `margin` apart and
//! every grandchild-and-deeper envelope clears the node itself. Together these
//! keep every pair of nodes other than parent and child `margin` apart.

use std::collections::BTreeMap;
use std::f64::consts::{PI, TAU};

use tracing::{debug, trace, warn};

use crate::config::{LayoutAlgorithm, LayoutConfig};
use crate::ir::{MindTree, NodeIndex};

use super::traversal::{self, Slot};
use super::{LayoutError, LayoutResult, LayoutWarning, Placement, Position, Rect};

/// Absorbs rounding in the separation checks.
const SLACK: f64 = 1e-9;

/// Lays out `tree` around `center`.
///
/// `bounds` is a soft constraint: when it cannot be met the closest
/// arrangement found is returned with `degraded` set.
#[tracing::instrument(skip_all, fields(nodes = tree.len()))]
pub fn layout(
    tree: &MindTree,
    center: Position,
    bounds: Option<Rect>,
    config: &LayoutConfig,
) -> Result<LayoutResult, LayoutError> {
    super::validate_request(center, bounds, config)?;
    let walk = traversal::walk(tree)?;
    let mut pass = RadialPass::new(tree, config, Placement::new(tree, walk));
    pass.size_rings();
    pass.place(center, bounds);
    pass.finish()
}

/// Circle centered on a subtree's outward axis, `offset` away from the
/// subtree's own node.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Envelope {
    offset: f64,
    radius: f64,
}

impl Envelope {
    fn leaf(radius: f64) -> Self {
        Self {
            offset: 0.0,
            radius,
        }
    }

    /// Smallest envelope on the x axis, centered midway across the parts'
    /// x extent, that holds every `(center, radius)` part.
    fn enclosing(parts: &[(Position, f64)]) -> Self {
        let (min_x, max_x) = parts.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(lo, hi), (center, radius)| (lo.min(center.x - radius), hi.max(center.x + radius)),
        );
        let offset = (min_x + max_x) / 2.0;
        let axis = Position::new(offset, 0.0);
        let radius = parts
            .iter()
            .map(|(center, radius)| axis.distance(*center) + radius)
            .fold(0.0, f64::max);
        Self { offset, radius }
    }
}

#[derive(Debug, Clone, Default)]
struct Ring {
    radius: f64,
    /// Angle of each slot, measured from the node's heading.
    offsets: Vec<f64>,
    /// Whole-subtree envelope of each slot. A revisit reserves only the
    /// revisited node's own footprint.
    outer: Vec<Envelope>,
}

struct RadialPass<'a> {
    config: &'a LayoutConfig,
    placement: Placement<'a>,
    rings: Vec<Ring>,
    /// Envelope of each node's whole subtree.
    outer: Vec<Envelope>,
    /// Envelope of everything strictly below each node; `None` for leaves.
    inner: Vec<Option<Envelope>>,
    headings: Vec<f64>,
    spacing_attempts: usize,
}

impl<'a> RadialPass<'a> {
    fn new(tree: &'a MindTree, config: &'a LayoutConfig, placement: Placement<'a>) -> Self {
        let count = tree.len();
        Self {
            config,
            placement,
            rings: vec![Ring::default(); count],
            outer: vec![Envelope::default(); count],
            inner: vec![None; count],
            headings: vec![0.0; count],
            spacing_attempts: 0,
        }
    }

    fn size_rings(&mut self) {
        let tree = self.placement.tree;
        let nodes = tree.nodes();
        let margin = self.config.margin;
        let order = self.placement.walk.order.clone();

        for &node in order.iter().rev() {
            let radius = nodes[node].radius;
            let slots = &self.placement.walk.slots[node];
            if slots.is_empty() {
                self.outer[node] = Envelope::leaf(radius);
                self.placement.subtree[node] = radius;
                continue;
            }

            let (outer, inner): (Vec<Envelope>, Vec<Option<Envelope>>) = slots
                .iter()
                .map(|slot| {
                    if slot.descends {
                        (self.outer[slot.child], self.inner[slot.child])
                    } else {
                        (Envelope::leaf(nodes[slot.child].radius), None)
                    }
                })
                .unzip();
            let total_arc: f64 = outer.iter().map(|env| 2.0 * env.radius + margin).sum();

            let mut offsets = Vec::with_capacity(outer.len());
            let mut swept = 0.0;
            for env in &outer {
                let share = (2.0 * env.radius + margin) / total_arc * TAU;
                offsets.push(swept + share / 2.0);
                swept += share;
            }

            let mut ring = self.initial_ring(radius, slots, &offsets, &outer, &inner);
            let mut attempts = 0;
            let mut fits = self.ring_fits(radius, slots, ring, &offsets, &outer, &inner);
            while !fits && attempts < self.config.max_attempts {
                ring += self.config.radius_step;
                attempts += 1;
                fits = self.ring_fits(radius, slots, ring, &offsets, &outer, &inner);
            }
            self.spacing_attempts = self.spacing_attempts.max(attempts);
            if !fits {
                self.placement.warnings.push(LayoutWarning::SpacingBudgetExhausted {
                    id: nodes[node].id.clone(),
                });
            }
            trace!(id = %nodes[node].id, ring, attempts, "sized ring");

            let parts: Vec<(Position, f64)> = slot_centers(ring, &offsets, &outer)
                .into_iter()
                .zip(outer.iter().map(|env| env.radius))
                .collect();
            self.inner[node] = Some(Envelope::enclosing(&parts));
            let mut with_node = parts.clone();
            with_node.push((Position::default(), radius));
            self.outer[node] = Envelope::enclosing(&with_node);
            self.placement.subtree[node] = parts
                .iter()
                .map(|(center, extent)| center.distance(Position::default()) + extent)
                .fold(radius, f64::max);
            self.rings[node] = Ring {
                radius: ring,
                offsets,
                outer,
            };
        }
    }

    /// Smallest ring meeting the clearance rules and separating every pair
    /// of neighbouring slots. Non-neighbouring pairs are left to the
    /// `radius_step` retries.
    fn initial_ring(
        &self,
        radius: f64,
        slots: &[Slot],
        offsets: &[f64],
        outer: &[Envelope],
        inner: &[Option<Envelope>],
    ) -> f64 {
        let nodes = self.placement.tree.nodes();
        let margin = self.config.margin;
        let mut ring = radius * self.config.breathing_factor;
        if self.config.parent_clearance {
            for slot in slots {
                ring = ring.max(radius + nodes[slot.child].radius + margin);
            }
        }
        for below in inner.iter().flatten() {
            ring = ring.max(radius + below.radius + margin - below.offset);
        }
        let count = outer.len();
        if count > 1 {
            for i in 0..count {
                let j = (i + 1) % count;
                let gap = outer[i].radius + outer[j].radius + margin;
                ring = ring.max(separating_ring(offsets[j] - offsets[i], outer[i], outer[j], gap));
            }
        }
        ring
    }

    /// Checks a candidate ring in the node's own frame, so the result does
    /// not depend on where the node ends up or how its ring is rotated.
    fn ring_fits(
        &self,
        radius: f64,
        slots: &[Slot],
        ring: f64,
        offsets: &[f64],
        outer: &[Envelope],
        inner: &[Option<Envelope>],
    ) -> bool {
        let nodes = self.placement.tree.nodes();
        let margin = self.config.margin;

        if self.config.parent_clearance
            && slots
                .iter()
                .any(|slot| ring + SLACK < radius + nodes[slot.child].radius + margin)
        {
            return false;
        }
        if inner
            .iter()
            .flatten()
            .any(|below| (ring + below.offset).abs() + SLACK < radius + below.radius + margin)
        {
            return false;
        }

        let centers = slot_centers(ring, offsets, outer);
        for i in 0..centers.len() {
            for j in (i + 1)..centers.len() {
                let gap = outer[i].radius + outer[j].radius + margin;
                if centers[i].distance(centers[j]) + SLACK < gap {
                    return false;
                }
            }
        }
        true
    }

    fn place(&mut self, center: Position, bounds: Option<Rect>) {
        let tree = self.placement.tree;
        let nodes = tree.nodes();
        let root = self.placement.walk.root;
        self.placement.positions[root] = Some(center);
        self.headings[root] = self.config.reference_angle.to_radians();

        if let Some(rect) = bounds {
            if !rect.contains_circle(center, nodes[root].radius) {
                self.placement.warnings.push(LayoutWarning::OutOfBounds {
                    id: nodes[root].id.clone(),
                });
            }
        }

        let order = self.placement.walk.order.clone();
        for node in order {
            let Some(origin) = self.placement.positions[node] else {
                continue;
            };
            if self.rings[node].offsets.is_empty() {
                continue;
            }
            let heading = self.headings[node];
            let rotation = match bounds {
                Some(rect) => self.fit_rotation(node, origin, heading, rect),
                None => 0.0,
            };

            let ring = &self.rings[node];
            for (slot, offset) in self.placement.walk.slots[node].iter().zip(&ring.offsets) {
                if !slot.descends {
                    continue;
                }
                let angle = heading + rotation + offset;
                self.placement.positions[slot.child] = Some(origin.polar_offset(angle, ring.radius));
                self.headings[slot.child] = angle + PI;
            }
        }
    }

    /// Picks a rotation of `node`'s ring that keeps every child subtree
    /// inside `bounds`: `0, +step, -step, +2 step, ...` up to half a turn.
    /// The ring radius stays as phase one sized it; a bounds miss is never
    /// answered by widening the ring, only by turning it. Below the root a
    /// rotation must keep the children inside the node's own envelopes.
    /// Falls back to the rotation with the least overflow.
    fn fit_rotation(&mut self, node: NodeIndex, origin: Position, heading: f64, bounds: Rect) -> f64 {
        let step = self.config.angle_step.to_radians();
        let is_root = node == self.placement.walk.root;
        let mut best = (0.0, f64::INFINITY);
        for attempt in 0..=self.config.max_attempts {
            let rotation = rotation_candidate(attempt, step);
            if rotation.abs() > PI + 1e-9 {
                break;
            }
            if !is_root && !self.rotation_stays_enveloped(node, rotation) {
                continue;
            }
            let overflow = self.overflow(node, origin, heading + rotation, bounds);
            if overflow <= 0.0 {
                return rotation;
            }
            if overflow < best.1 {
                best = (rotation, overflow);
            }
        }
        self.placement.warnings.push(LayoutWarning::OutOfBounds {
            id: self.placement.tree.nodes()[node].id.clone(),
        });
        best.0
    }

    /// Whether the children of `node`, turned by `rotation`, still sit inside
    /// the envelopes its siblings and parent were spaced against.
    fn rotation_stays_enveloped(&self, node: NodeIndex, rotation: f64) -> bool {
        let ring = &self.rings[node];
        let rotated: Vec<f64> = ring.offsets.iter().map(|offset| offset + rotation).collect();
        let centers = slot_centers(ring.radius, &rotated, &ring.outer);
        let envelopes = [Some(self.outer[node]), self.inner[node]];
        envelopes.into_iter().flatten().all(|env| {
            let axis = Position::new(env.offset, 0.0);
            centers
                .iter()
                .zip(&ring.outer)
                .all(|(center, child)| axis.distance(*center) + child.radius <= env.radius + SLACK)
        })
    }

    fn overflow(&self, node: NodeIndex, origin: Position, heading: f64, bounds: Rect) -> f64 {
        let ring = &self.rings[node];
        self.placement.walk.slots[node]
            .iter()
            .zip(ring.offsets.iter().zip(&ring.outer))
            .filter(|(slot, _)| slot.descends)
            .map(|(_, (offset, env))| {
                let center = origin.polar_offset(heading + offset, ring.radius + env.offset);
                bounds.circle_overflow(center, env.radius)
            })
            .sum()
    }

    fn finish(self) -> Result<LayoutResult, LayoutError> {
        let root = self.placement.walk.root;
        let root_id = self.placement.tree.nodes()[root].id.clone();
        let root_extent = self.placement.subtree[root];
        let attempts = self.spacing_attempts;
        let result = self
            .placement
            .finish(LayoutAlgorithm::Radial, &BTreeMap::new())?;
        debug!(
            root = %root_id,
            nodes = result.len(),
            subtree_radius = root_extent,
            attempts,
            "radial layout complete"
        );
        if result.degraded {
            warn!(warnings = result.warnings.len(), "radial layout degraded");
        }
        Ok(result)
    }
}

/// Envelope centers of each slot in the node's frame, where the parent lies
/// along angle `PI`.
fn slot_centers(ring: f64, offsets: &[f64], outer: &[Envelope]) -> Vec<Position> {
    offsets
        .iter()
        .zip(outer)
        .map(|(offset, env)| Position::default().polar_offset(PI + offset, ring + env.offset))
        .collect()
}

/// Smallest ring radius at which two envelopes `delta` apart in angle are
/// `gap` apart, centre to centre.
fn separating_ring(delta: f64, a: Envelope, b: Envelope, gap: f64) -> f64 {
    let cos = delta.cos();
    let c = 1.0 - cos;
    if c <= f64::EPSILON {
        return 0.0;
    }
    let (p, q) = (a.offset, b.offset);
    let constant = p * p + q * q - 2.0 * p * q * cos - gap * gap;
    let discriminant = c * c * (p + q) * (p + q) - 2.0 * c * constant;
    if discriminant < 0.0 {
        return 0.0;
    }
    ((discriminant.sqrt() - c * (p + q)) / (2.0 * c)).max(0.0)
}

fn rotation_candidate(attempt: usize, step: f64) -> f64 {
    if attempt == 0 {
        return 0.0;
    }
    let magnitude = attempt.div_ceil(2) as f64 * step;
    if attempt % 2 == 1 { magnitude } else { -magnitude }
}
