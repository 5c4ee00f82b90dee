use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::LayoutAlgorithm;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Point at `distance` from `self` in direction `angle` (radians).
    pub fn polar_offset(self, angle: f64, distance: f64) -> Position {
        Position {
            x: self.x + distance * angle.cos(),
            y: self.y + distance * angle.sin(),
        }
    }

    /// Direction from `self` towards `other`, in radians.
    pub fn angle_to(self, other: Position) -> f64 {
        (other.y - self.y).atan2(other.x - self.x)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Axis-aligned rectangle, `min` inclusive, `max` inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Rect {
    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn centered(center: Position, width: f64, height: f64) -> Self {
        Self::new(
            center.x - width / 2.0,
            center.y - height / 2.0,
            center.x + width / 2.0,
            center.y + height / 2.0,
        )
    }

    /// Bounding square of a circle.
    pub fn around(center: Position, radius: f64) -> Self {
        Self::new(
            center.x - radius,
            center.y - radius,
            center.x + radius,
            center.y + radius,
        )
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Position {
        Position::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    pub fn is_valid(&self) -> bool {
        [self.min_x, self.min_y, self.max_x, self.max_y]
            .iter()
            .all(|v| v.is_finite())
            && self.min_x < self.max_x
            && self.min_y < self.max_y
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    /// Sum of how far a circle sticks out past each edge; zero when the
    /// circle lies fully inside.
    pub fn circle_overflow(&self, center: Position, radius: f64) -> f64 {
        let left = (self.min_x - (center.x - radius)).max(0.0);
        let right = ((center.x + radius) - self.max_x).max(0.0);
        let top = (self.min_y - (center.y - radius)).max(0.0);
        let bottom = ((center.y + radius) - self.max_y).max(0.0);
        left + right + top + bottom
    }

    pub fn contains_circle(&self, center: Position, radius: f64) -> bool {
        self.circle_overflow(center, radius) <= 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeLayout {
    pub from: String,
    pub to: String,
    /// Polyline from the parent's center to the child's center, including
    /// any bend points the backend produced.
    pub points: Vec<Position>,
    /// Edge to a node that had already been placed elsewhere.
    pub revisit: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LayoutWarning {
    /// No ring radius within the attempt budget separated this node's
    /// children.
    SpacingBudgetExhausted { id: String },
    /// This node's children (or the root's own footprint) could not be
    /// kept inside the bounds.
    OutOfBounds { id: String },
    /// `id` was reached again under `parent` and kept its first position.
    RevisitedNode { id: String, parent: String },
}

impl LayoutWarning {
    /// Whether the warning means a layout guarantee was given up.
    pub fn is_degrading(&self) -> bool {
        !matches!(self, LayoutWarning::RevisitedNode { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutResult {
    pub algorithm: LayoutAlgorithm,
    pub positions: BTreeMap<String, Position>,
    /// Radius of a circle around each node that contains the footprints of
    /// the node and all of its placed descendants.
    pub subtree_radii: BTreeMap<String, f64>,
    pub edges: Vec<EdgeLayout>,
    /// Union of all node footprints.
    pub extent: Rect,
    /// Set when spacing or bounds constraints were not fully met and the
    /// best candidate was returned instead.
    pub degraded: bool,
    pub warnings: Vec<LayoutWarning>,
}

impl LayoutResult {
    pub fn position(&self, id: &str) -> Option<Position> {
        self.positions.get(id).copied()
    }

    pub fn subtree_radius(&self, id: &str) -> Option<f64> {
        self.subtree_radii.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
