//! Label measurement for callers that only know node labels.
//!
//! Widths come from per-character factors of a 16px sans-serif face, so a
//! label's footprint can be estimated without loading fonts.

use crate::config::SizingConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub width: f64,
    pub height: f64,
}

pub fn measure_label(text: &str, sizing: &SizingConfig) -> TextBlock {
    let font_size = sizing.font_size;
    let max_width = sizing.max_label_width_chars.max(1) as f64 * average_char_width(font_size);
    let mut lines = Vec::new();
    for line in split_lines(text) {
        lines.extend(wrap_line(&line, max_width, font_size));
    }
    if lines.is_empty() {
        lines.push(String::new());
    }

    let width = lines
        .iter()
        .map(|line| text_width(line, font_size))
        .fold(0.0, f64::max);
    let height = lines.len() as f64 * font_size * sizing.line_height;
    TextBlock {
        lines,
        width,
        height,
    }
}

/// Radius of the circle circumscribing the padded label box.
pub fn node_radius(label: &str, sizing: &SizingConfig) -> f64 {
    let block = measure_label(label, sizing);
    let half_w = block.width / 2.0 + sizing.padding;
    let half_h = block.height / 2.0 + sizing.padding;
    half_w.hypot(half_h).max(sizing.min_radius)
}

fn char_width_factor(ch: char) -> f64 {
    match ch {
        ' ' => 0.306,
        'i' | 'j' | 'l' | 'I' | '\'' | '|' => 0.25,
        '.' | ',' | ':' | ';' | '!' | '(' | ')' | '[' | ']' | '{' | '}' | '\\' => 0.321,
        'f' | 'r' | 't' => 0.34,
        '1' => 0.396,
        'm' | 'w' => 0.84,
        'M' | 'W' => 0.93,
        '@' | '#' | '%' | '&' => 0.946,
        'A'..='Z' => 0.66,
        'a'..='z' | '0'..='9' => 0.57,
        _ if is_wide(ch) => 1.0,
        _ => 0.568,
    }
}

fn is_wide(ch: char) -> bool {
    matches!(ch as u32,
        0x1100..=0x115F
        | 0x2E80..=0xA4CF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6
        | 0x1F300..=0x1FAFF)
}

fn split_lines(text: &str) -> Vec<String> {
    text.replace("<br/>", "\n")
        .replace("<br>", "\n")
        .replace("\\n", "\n")
        .split('\n')
        .map(|line| line.trim().to_string())
        .collect()
}

fn wrap_line(line: &str, max_width: f64, font_size: f64) -> Vec<String> {
    if text_width(line, font_size) <= max_width {
        return vec![line.to_string()];
    }
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in line.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if text_width(&candidate, font_size) > max_width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn text_width(text: &str, font_size: f64) -> f64 {
    text.chars().map(char_width_factor).sum::<f64>() * font_size
}

fn average_char_width(font_size: f64) -> f64 {
    font_size * 0.56
}
