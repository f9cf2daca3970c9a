use bevy_egui::egui::Color32;
use schemascope_core::LineageNodeType;

pub const CANVAS_BG: Color32 = Color32::from_rgb(24, 26, 31);
pub const NODE_TEXT: Color32 = Color32::from_rgb(235, 237, 240);
pub const NODE_BORDER: Color32 = Color32::from_rgb(70, 74, 84);
pub const SELECTED_BORDER: Color32 = Color32::WHITE;
pub const MATCH_TEXT: Color32 = Color32::from_rgb(250, 204, 21);

/// `#rgb` or `#rrggbb`, with or without the leading `#`.
pub fn parse_hex(s: &str) -> Option<Color32> {
    let hex = s.trim().trim_start_matches('#');
    if !hex.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    match hex.len() {
        6 => Some(Color32::from_rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
        3 => {
            let r = channel(0..1)?;
            let g = channel(1..2)?;
            let b = channel(2..3)?;
            Some(Color32::from_rgb(r * 17, g * 17, b * 17))
        }
        _ => None,
    }
}

pub fn node_fill(node_type: LineageNodeType, hint: Option<&str>) -> Color32 {
    if let Some(c) = hint.and_then(parse_hex) {
        return c;
    }
    match node_type {
        LineageNodeType::Class => Color32::from_rgb(37, 99, 235),
        LineageNodeType::Attribute => Color32::from_rgb(13, 148, 136),
        LineageNodeType::Instance => Color32::from_rgb(124, 58, 237),
        LineageNodeType::AttributeValue => Color32::from_rgb(100, 116, 139),
    }
}

pub fn stroke_color(s: &str) -> Color32 {
    parse_hex(s).unwrap_or(Color32::GRAY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_long_and_short_hex() {
        assert_eq!(parse_hex("#3b82f6"), Some(Color32::from_rgb(0x3b, 0x82, 0xf6)));
        assert_eq!(parse_hex("fff"), Some(Color32::from_rgb(255, 255, 255)));
        assert_eq!(parse_hex("#12"), None);
        assert_eq!(parse_hex("#zzzzzz"), None);
        assert_eq!(parse_hex("#ééé"), None);
    }

    #[test]
    fn fill_prefers_hint() {
        assert_eq!(
            node_fill(LineageNodeType::Instance, Some("#000000")),
            Color32::from_rgb(0, 0, 0)
        );
        assert_eq!(
            node_fill(LineageNodeType::Class, Some("blue")),
            node_fill(LineageNodeType::Class, None)
        );
    }
}
