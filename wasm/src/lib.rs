use mindmap_rs_layout::config::{Config, merge_init_config};
use mindmap_rs_layout::{LayoutDump, MindTree, Position, Rect, TreeDocument, compute_layout};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MindmapLayoutOptions {
    center_x: Option<f64>,
    center_y: Option<f64>,
    width: Option<f64>,
    height: Option<f64>,
    /// Same shape as a config file: `layout`, `layered`, `sizing`, `algorithm`.
    config: Option<serde_json::Value>,
}

fn build_request(options: MindmapLayoutOptions) -> Result<(Config, Position, Option<Rect>), String> {
    let config = match options.config {
        Some(value) => merge_init_config(Config::default(), value).map_err(|e| e.to_string())?,
        None => Config::default(),
    };
    let center = Position::new(options.center_x.unwrap_or(0.0), options.center_y.unwrap_or(0.0));
    let bounds = match (options.width, options.height) {
        (Some(width), Some(height)) => Some(Rect::centered(center, width, height)),
        _ => None,
    };
    Ok((config, center, bounds))
}

fn layout_json(tree_json: &str, options: MindmapLayoutOptions) -> Result<String, String> {
    let document: TreeDocument = serde_json::from_str(tree_json).map_err(|e| e.to_string())?;
    let (config, center, bounds) = build_request(options)?;
    let tree = MindTree::from_document(&document, &config.sizing).map_err(|e| e.to_string())?;
    let result = compute_layout(&tree, center, bounds, &config.layout).map_err(|e| e.to_string())?;
    serde_json::to_string(&LayoutDump::from_layout(&result, &tree)).map_err(|e| e.to_string())
}

#[wasm_bindgen]
pub fn layout_mindmap(tree_json: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let options = if let Some(raw_options) = options_json {
        serde_json::from_str::<MindmapLayoutOptions>(&raw_options)
            .map_err(|error| JsValue::from_str(&error.to_string()))?
    } else {
        MindmapLayoutOptions::default()
    };
    layout_json(tree_json, options).map_err(|error| JsValue::from_str(&error))
}
