//! Display list produced by the editor and consumed by the renderers.

pub const CANVAS_WIDTH: f64 = 800.0;
pub const CANVAS_HEIGHT: f64 = 450.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// One run of headline text sharing a color.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub text: String,
    pub color: String,
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlineBlock {
    /// Left edge of the text column.
    pub x: f64,
    /// Top of the first line.
    pub top: f64,
    pub max_width: f64,
    pub font_size: f64,
    pub line_height: f64,
    pub font_weight: u16,
    pub italic: bool,
    pub shadow_offset: Point,
    pub shadow_opacity: f64,
    pub lines: Vec<Vec<TextSpan>>,
}

impl HeadlineBlock {
    pub fn line_advance(&self) -> f64 {
        self.font_size * self.line_height
    }

    pub fn height(&self) -> f64 {
        self.line_advance() * self.lines.len() as f64
    }

    pub fn plain_text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.iter().map(|span| span.text.as_str()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubjectLayer {
    pub href: String,
    /// Untransformed slot, bottom-anchored on the canvas.
    pub frame: Rect,
    pub translate: Point,
    pub scale: f64,
    pub background_removed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    BackgroundImage {
        href: String,
        opacity: f64,
    },
    BackgroundPlaceholder {
        from: String,
        to: String,
        label: Option<String>,
        label_color: String,
    },
    /// Full-canvas fill composited with overlay blending.
    Tint {
        color: String,
        opacity: f64,
    },
    Subject(SubjectLayer),
    Divider {
        x: f64,
        width: f64,
        color: String,
        opacity: f64,
    },
    Arrow {
        /// Bottom-left corner of the icon box.
        anchor: Point,
        size: f64,
        rotate_deg: f64,
        color: String,
    },
    Headline(HeadlineBlock),
    Badge {
        text: String,
        /// Top-right corner of the badge.
        anchor: Point,
        font_size: f64,
        rotate_deg: f64,
        fill: String,
        text_color: String,
    },
}

impl Layer {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BackgroundImage { .. } => "background",
            Self::BackgroundPlaceholder { .. } => "background",
            Self::Tint { .. } => "tint",
            Self::Subject(_) => "subject",
            Self::Divider { .. } => "divider",
            Self::Arrow { .. } => "arrow",
            Self::Headline(_) => "headline",
            Self::Badge { .. } => "badge",
        }
    }
}

/// Layers in paint order over the 800×450 canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub width: f64,
    pub height: f64,
    pub display_scale: f64,
    pub layers: Vec<Layer>,
}

impl Scene {
    pub fn kinds(&self) -> Vec<&'static str> {
        self.layers.iter().map(Layer::kind).collect()
    }

    pub fn subject(&self) -> Option<&SubjectLayer> {
        self.layers.iter().find_map(|layer| match layer {
            Layer::Subject(subject) => Some(subject),
            _ => None,
        })
    }

    pub fn headline(&self) -> Option<&HeadlineBlock> {
        self.layers.iter().find_map(|layer| match layer {
            Layer::Headline(block) => Some(block),
            _ => None,
        })
    }
}
