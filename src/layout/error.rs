use thiserror::Error;

/// Rejected layout input. Every variant is an invalid-input condition; a
/// layout that merely could not meet all of its constraints is reported
/// through [`super::LayoutResult::degraded`] instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("tree has no root node")]
    EmptyTree,

    #[error("node `{id}` has non-positive radius {radius}")]
    NonPositiveRadius { id: String, radius: f64 },

    #[error("invalid bounds ({min_x}, {min_y})..({max_x}, {max_y}): min must be below max")]
    InvalidBounds {
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
    },

    #[error("center ({x}, {y}) is not finite")]
    NonFiniteCenter { x: f64, y: f64 },

    #[error("invalid layout configuration: {0}")]
    InvalidConfig(String),

    #[error("node `{id}` was placed at a non-finite position; node radii are too large")]
    NonFinitePosition { id: String },
}

impl LayoutError {
    pub fn is_invalid_input(&self) -> bool {
        true
    }
}
