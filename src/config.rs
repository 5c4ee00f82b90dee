use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::layout::LayoutError;

/// Which backend positions the nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutAlgorithm {
    #[default]
    Radial,
    Layered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    #[serde(rename = "TB", alias = "TD")]
    TopDown,
    #[serde(rename = "BT")]
    BottomTop,
    #[serde(rename = "LR")]
    LeftRight,
    #[serde(rename = "RL")]
    RightLeft,
}

impl Direction {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "TD" | "TB" => Some(Self::TopDown),
            "BT" => Some(Self::BottomTop),
            "LR" => Some(Self::LeftRight),
            "RL" => Some(Self::RightLeft),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayeredConfig {
    pub direction: Direction,
    pub node_spacing: f64,
    pub rank_spacing: f64,
}

impl Default for LayeredConfig {
    fn default() -> Self {
        Self {
            direction: Direction::LeftRight,
            node_spacing: 50.0,
            rank_spacing: 50.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub algorithm: LayoutAlgorithm,
    /// Minimum gap between the footprints of unrelated nodes.
    pub margin: f64,
    /// Multiplier on the parent radius added to the initial ring estimate.
    pub breathing_factor: f64,
    /// Ring growth per failed spacing attempt.
    pub radius_step: f64,
    /// Budget shared by the spacing retries and the bounds rotations.
    pub max_attempts: usize,
    /// Rotation increment, in degrees, used when a child leaves the bounds.
    pub angle_step: f64,
    /// Direction, in degrees, children of the root start from. -90 is "up".
    pub reference_angle: f64,
    /// Keep every child's own footprint clear of its parent's footprint.
    pub parent_clearance: bool,
    pub layered: LayeredConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            algorithm: LayoutAlgorithm::Radial,
            margin: 20.0,
            breathing_factor: 1.2,
            radius_step: 5.0,
            max_attempts: 300,
            angle_step: 5.0,
            reference_angle: -90.0,
            parent_clearance: true,
            layered: LayeredConfig::default(),
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<(), LayoutError> {
        let finite = [
            ("margin", self.margin),
            ("breathingFactor", self.breathing_factor),
            ("radiusStep", self.radius_step),
            ("angleStep", self.angle_step),
            ("referenceAngle", self.reference_angle),
            ("layered.nodeSpacing", self.layered.node_spacing),
            ("layered.rankSpacing", self.layered.rank_spacing),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(LayoutError::InvalidConfig(format!("{name} must be finite")));
            }
        }
        if self.margin < 0.0 {
            return Err(LayoutError::InvalidConfig("margin must not be negative".into()));
        }
        if self.breathing_factor < 1.0 {
            return Err(LayoutError::InvalidConfig(
                "breathingFactor must be at least 1".into(),
            ));
        }
        if self.radius_step <= 0.0 {
            return Err(LayoutError::InvalidConfig("radiusStep must be positive".into()));
        }
        if self.angle_step <= 0.0 {
            return Err(LayoutError::InvalidConfig("angleStep must be positive".into()));
        }
        Ok(())
    }
}

/// Label sizing used when a node arrives without an explicit radius.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingConfig {
    pub font_size: f64,
    pub line_height: f64,
    pub max_label_width_chars: usize,
    pub padding: f64,
    pub min_radius: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            font_size: 16.0,
            line_height: 1.5,
            max_label_width_chars: 22,
            padding: 10.0,
            min_radius: 12.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub layout: LayoutConfig,
    pub sizing: SizingConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    algorithm: Option<LayoutAlgorithm>,
    layout: Option<LayoutConfigFile>,
    layered: Option<LayeredConfigFile>,
    sizing: Option<SizingConfigFile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    margin: Option<f64>,
    breathing_factor: Option<f64>,
    radius_step: Option<f64>,
    max_attempts: Option<usize>,
    angle_step: Option<f64>,
    reference_angle: Option<f64>,
    parent_clearance: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayeredConfigFile {
    direction: Option<String>,
    node_spacing: Option<f64>,
    rank_spacing: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SizingConfigFile {
    font_size: Option<f64>,
    line_height: Option<f64>,
    max_label_width_chars: Option<usize>,
    padding: Option<f64>,
    min_radius: Option<f64>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let parsed: ConfigFile = serde_json::from_str(contents)?;
    let mut config = Config::default();
    apply_config_file(&mut config, parsed)?;
    Ok(config)
}

/// Overlays an inline `%%{init: ...}%%` object onto an existing config.
/// Unknown keys are ignored; malformed known keys are an error.
pub fn merge_init_config(mut config: Config, init: serde_json::Value) -> anyhow::Result<Config> {
    let parsed: ConfigFile = serde_json::from_value(init)?;
    apply_config_file(&mut config, parsed)?;
    Ok(config)
}

fn apply_config_file(config: &mut Config, parsed: ConfigFile) -> anyhow::Result<()> {
    if let Some(algorithm) = parsed.algorithm {
        config.layout.algorithm = algorithm;
    }

    if let Some(layout) = parsed.layout {
        let target = &mut config.layout;
        if let Some(v) = layout.margin {
            target.margin = v;
        }
        if let Some(v) = layout.breathing_factor {
            target.breathing_factor = v;
        }
        if let Some(v) = layout.radius_step {
            target.radius_step = v;
        }
        if let Some(v) = layout.max_attempts {
            target.max_attempts = v;
        }
        if let Some(v) = layout.angle_step {
            target.angle_step = v;
        }
        if let Some(v) = layout.reference_angle {
            target.reference_angle = v;
        }
        if let Some(v) = layout.parent_clearance {
            target.parent_clearance = v;
        }
    }

    if let Some(layered) = parsed.layered {
        let target = &mut config.layout.layered;
        if let Some(token) = layered.direction.as_deref() {
            target.direction = Direction::from_token(token)
                .ok_or_else(|| anyhow::anyhow!("unknown layered direction `{token}`"))?;
        }
        if let Some(v) = layered.node_spacing {
            target.node_spacing = v;
        }
        if let Some(v) = layered.rank_spacing {
            target.rank_spacing = v;
        }
    }

    if let Some(sizing) = parsed.sizing {
        let target = &mut config.sizing;
        if let Some(v) = sizing.font_size {
            target.font_size = v;
        }
        if let Some(v) = sizing.line_height {
            target.line_height = v;
        }
        if let Some(v) = sizing.max_label_width_chars {
            target.max_label_width_chars = v;
        }
        if let Some(v) = sizing.padding {
            target.padding = v;
        }
        if let Some(v) = sizing.min_radius {
            target.min_radius = v;
        }
    }

    config.layout.validate()?;
    Ok(())
}
