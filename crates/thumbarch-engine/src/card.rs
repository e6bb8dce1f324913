//! Template card: a read-only view of one blueprint for the selection step.

use thumbarch_contracts::palette::{parse_color, Rgb};
use thumbarch_contracts::ThumbnailTemplate;

use crate::editor::headline::split_headline;

const ANSI_RESET: &str = "\x1b[0m";
const ANSI_BOLD: &str = "\x1b[1m";
const ANSI_DIM: &str = "\x1b[2m";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardSegment {
    pub text: String,
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardView {
    pub name: String,
    pub layout_tag: String,
    pub headline: Vec<CardSegment>,
    pub accent: String,
    pub swatches: Vec<String>,
    pub psychology: String,
    pub tags: Vec<String>,
    pub selected: bool,
}

pub struct TemplateCard<'a> {
    template: &'a ThumbnailTemplate,
    selected: bool,
}

impl<'a> TemplateCard<'a> {
    pub fn new(template: &'a ThumbnailTemplate, selected: bool) -> Self {
        Self { template, selected }
    }

    pub fn view(&self) -> CardView {
        let template = self.template;
        let parts = split_headline(&template.headline, &template.highlight_word);
        let mut headline = Vec::new();
        for (text, highlighted) in [
            (parts.prefix, false),
            (parts.highlight.unwrap_or(""), true),
            (parts.suffix, false),
        ] {
            if !text.is_empty() {
                headline.push(CardSegment {
                    text: text.to_uppercase(),
                    highlighted,
                });
            }
        }
        CardView {
            name: template.name.clone(),
            layout_tag: template.layout_type.as_str().to_uppercase(),
            headline,
            accent: template.accent_color().to_string(),
            swatches: template.color_palette.clone(),
            psychology: template.psychology.clone(),
            tags: template.graphic_elements.clone(),
            selected: self.selected,
        }
    }

    /// The card's only side effect: hand the template to the selection
    /// handler.
    pub fn activate<F>(&self, on_select: F)
    where
        F: FnOnce(&ThumbnailTemplate),
    {
        on_select(self.template);
    }
}

impl CardView {
    pub fn headline_text(&self) -> String {
        self.headline
            .iter()
            .map(|segment| segment.text.as_str())
            .collect()
    }

    /// Terminal rendering. `color` enables ANSI true-color escapes.
    pub fn render_text(&self, color: bool) -> String {
        let mut lines = Vec::new();
        let marker = if self.selected { "[x]" } else { "[ ]" };
        if color {
            lines.push(format!(
                "{marker} {ANSI_BOLD}{}{ANSI_RESET}  {ANSI_DIM}{}{ANSI_RESET}",
                self.name, self.layout_tag
            ));
        } else {
            lines.push(format!("{marker} {}  {}", self.name, self.layout_tag));
        }

        let mut headline = String::new();
        for segment in &self.headline {
            match (segment.highlighted, color) {
                (true, true) => headline.push_str(&format!(
                    "{}{ANSI_BOLD}{}{ANSI_RESET}",
                    fg(&self.accent),
                    segment.text
                )),
                (true, false) => headline.push_str(&format!("*{}*", segment.text)),
                (false, _) => headline.push_str(&segment.text),
            }
        }
        lines.push(format!("    {headline}"));

        let swatches: Vec<String> = self
            .swatches
            .iter()
            .map(|swatch| {
                if color {
                    format!("{}●{ANSI_RESET} {swatch}", fg(swatch))
                } else {
                    swatch.clone()
                }
            })
            .collect();
        lines.push(format!("    palette: {}", swatches.join("  ")));
        lines.push(format!("    why: {}", self.psychology));
        if !self.tags.is_empty() {
            lines.push(format!("    tags: {}", self.tags.join(", ")));
        }
        lines.join("\n")
    }
}

fn fg(color: &str) -> String {
    match parse_color(color) {
        Some(Rgb { r, g, b }) => format!("\x1b[38;2;{r};{g};{b}m"),
        None => String::new(),
    }
}
