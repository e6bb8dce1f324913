use std::str::FromStr;

pub const DEFAULT_ACCENT: &str = "#22d3ee";
pub const WHITE: &str = "#FFFFFF";
pub const BLACK: &str = "#000000";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl From<svgtypes::Color> for Rgb {
    fn from(color: svgtypes::Color) -> Self {
        Self::new(color.red, color.green, color.blue)
    }
}

/// Parses a CSS color: hex (`#` optional for 3/6 digits), named colors in
/// any case, and the `rgb()`/`rgba()`/`hsl()` functional forms. Alpha is
/// dropped. Anything with trailing data after the color is rejected, so
/// attribute-breaking input never reaches the SVG.
pub fn parse_color(raw: &str) -> Option<Rgb> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let normalized = if is_bare_hex(trimmed) {
        format!("#{trimmed}")
    } else {
        trimmed.to_ascii_lowercase()
    };
    svgtypes::Color::from_str(&normalized).ok().map(Rgb::from)
}

fn is_bare_hex(value: &str) -> bool {
    matches!(value.len(), 3 | 6) && value.chars().all(|ch| ch.is_ascii_hexdigit())
}

/// Normalized `#RRGGBB`, or `fallback` when the input is not a color.
pub fn sanitize_color(raw: &str, fallback: &str) -> String {
    parse_color(raw)
        .map(Rgb::to_hex)
        .unwrap_or_else(|| fallback.to_string())
}

pub fn is_black(raw: &str) -> bool {
    parse_color(raw) == Some(Rgb::new(0, 0, 0))
}
