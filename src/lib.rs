#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod parser;
pub mod text;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutAlgorithm, LayoutConfig, SizingConfig, load_config};
pub use ir::{MindTree, NodeIndex, TreeDocument, TreeError, TreeNode};
pub use layout::radial::layout;
pub use layout::{
    EdgeLayout, LayoutError, LayoutResult, LayoutWarning, Position, Rect, compute_layout,
};
pub use layout_dump::LayoutDump;
pub use parser::parse_outline;

/// Parses an outline, sizes its nodes and lays it out in one call.
pub fn layout_outline(
    input: &str,
    center: Position,
    bounds: Option<Rect>,
    config: &Config,
) -> anyhow::Result<(MindTree, LayoutResult)> {
    let parsed = parse_outline(input)?;
    let config = match parsed.init_config {
        Some(init) => config::merge_init_config(config.clone(), init)?,
        None => config.clone(),
    };
    let tree = MindTree::from_document(&parsed.document, &config.sizing)?;
    let result = compute_layout(&tree, center, bounds, &config.layout)?;
    Ok((tree, result))
}
