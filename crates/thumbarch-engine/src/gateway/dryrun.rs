use std::io::Cursor;

use anyhow::{Context, Result};
use image::{ImageFormat, Rgb, RgbImage};
use sha2::{Digest, Sha256};
use thumbarch_contracts::{AnalysisResult, LayoutType, ThumbnailTemplate};

use super::{GatewayProvider, GeneratedImage, InlineImage};

const BACKGROUND_WIDTH: u32 = 800;
const BACKGROUND_HEIGHT: u32 = 450;

/// Offline provider: deterministic blueprints and gradient backgrounds, no
/// network. Used for demos and tests.
pub struct DryrunProvider;

impl GatewayProvider for DryrunProvider {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn analyze(&self, model: &str, image: &InlineImage, topic: &str) -> Result<AnalysisResult> {
        tracing::debug!(model, mime = %image.mime_type, "dryrun analysis");
        let topic = topic.trim();
        let subject = title_words(topic, 3);
        let templates = LayoutType::ALL
            .iter()
            .enumerate()
            .map(|(idx, layout)| dryrun_template(topic, &subject, idx as u64, *layout))
            .collect();
        let result = AnalysisResult {
            templates,
            background_suggestions: vec![
                "Deep navy gradient with soft cyan rim light".to_string(),
                "Blurred tech office with bokeh".to_string(),
                "Abstract black grid with glowing lines".to_string(),
            ],
            critique: format!(
                "Offline critique for \"{topic}\": keep the face large, add rim light, \
                 and leave clean space for a short headline."
            ),
        };
        result.validate()?;
        Ok(result)
    }

    fn generate_background(&self, model: &str, prompt: &str) -> Result<GeneratedImage> {
        tracing::debug!(model, "dryrun background");
        let bytes = gradient_png(prompt, BACKGROUND_WIDTH, BACKGROUND_HEIGHT)?;
        Ok(GeneratedImage {
            mime_type: "image/png".to_string(),
            bytes,
        })
    }
}

fn dryrun_template(topic: &str, subject: &str, idx: u64, layout: LayoutType) -> ThumbnailTemplate {
    let id = format!("dry-{}", short_id(topic, idx));
    let (name, headline, highlight, palette, psychology, graphics, background) = match layout {
        LayoutType::FullFace => (
            "Bold Headline + Face",
            format!("I Tried {subject}"),
            "Tried",
            ["#000000", "#22d3ee", "#FFFFFF"],
            "Faces with strong emotion earn the first glance; the headline closes the loop.",
            vec!["Arrow".to_string()],
            "dark studio gradient with cyan rim light",
        ),
        LayoutType::Split => (
            "Before / After",
            format!("{subject} Changed Everything"),
            "Changed",
            ["#0f172a", "#3b82f6", "#FFFFFF"],
            "Contrast between two states creates an instant curiosity gap.",
            vec!["Divider".to_string()],
            "split gradient, cold blue to warm amber",
        ),
        LayoutType::Minimal => (
            "Minimal Podcast",
            format!("The Truth About {subject}"),
            "Truth",
            ["#FFFFFF", "#22d3ee", "#0f172a"],
            "Restraint signals authority; one bold word carries the promise.",
            Vec::new(),
            "soft off-white paper texture",
        ),
        LayoutType::Grid => (
            "High Tech Grid",
            format!("{subject} In 5 Steps"),
            "Steps",
            ["#020617", "#22d3ee", "#e2e8f0"],
            "Structured grids suggest a system the viewer can follow.",
            vec!["Grid".to_string(), "Badge".to_string()],
            "black tech grid with glowing cyan lines",
        ),
    };
    ThumbnailTemplate {
        id,
        name: name.to_string(),
        headline,
        highlight_word: highlight.to_string(),
        layout_description: format!("{} layout", layout.as_str()),
        color_palette: palette.iter().map(|value| value.to_string()).collect(),
        psychology: psychology.to_string(),
        graphic_elements: graphics,
        best_use_case: format!("Videos about {topic}"),
        layout_type: layout,
        suggested_background: background.to_string(),
    }
}

fn title_words(topic: &str, max_words: usize) -> String {
    let words: Vec<String> = topic
        .split_whitespace()
        .take(max_words)
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();
    if words.is_empty() {
        return "This".to_string();
    }
    words.join(" ")
}

fn short_id(prompt: &str, idx: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    hasher.update(idx.to_be_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..4])
}

fn colors_from_prompt(prompt: &str) -> ([u8; 3], [u8; 3]) {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    let digest = hasher.finalize();
    (
        [digest[0] / 2, digest[1] / 2, digest[2] / 2],
        [digest[3], digest[4], digest[5]],
    )
}

fn gradient_png(prompt: &str, width: u32, height: u32) -> Result<Vec<u8>> {
    let (from, to) = colors_from_prompt(prompt);
    let span = (width + height).saturating_sub(2).max(1) as f32;
    let image = RgbImage::from_fn(width, height, |x, y| {
        let t = (x + y) as f32 / span;
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Rgb([mix(from[0], to[0]), mix(from[1], to[1]), mix(from[2], to[2])])
    });
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, ImageFormat::Png)
        .context("failed to encode dryrun background")?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use image::GenericImageView;
    use thumbarch_contracts::LayoutType;

    use super::{title_words, DryrunProvider};
    use crate::gateway::{GatewayProvider, InlineImage};

    fn inline() -> InlineImage {
        InlineImage {
            mime_type: "image/png".to_string(),
            data_base64: String::new(),
        }
    }

    #[test]
    fn analysis_covers_every_layout_with_stable_ids() -> anyhow::Result<()> {
        let first = DryrunProvider.analyze("dryrun-analyze-1", &inline(), "rust in a weekend")?;
        let second = DryrunProvider.analyze("dryrun-analyze-1", &inline(), "rust in a weekend")?;
        assert_eq!(first, second);
        assert_eq!(first.background_suggestions.len(), 3);

        let layouts: HashSet<LayoutType> =
            first.templates.iter().map(|template| template.layout_type).collect();
        assert_eq!(layouts.len(), 4);

        for template in &first.templates {
            assert!(template.id.starts_with("dry-"));
            assert!(template.headline.contains(&template.highlight_word));
            let words = template.headline.split_whitespace().count();
            assert!((3..=6).contains(&words), "headline '{}'", template.headline);
        }
        Ok(())
    }

    #[test]
    fn background_is_a_wide_png_that_depends_on_prompt() -> anyhow::Result<()> {
        let a = DryrunProvider.generate_background("dryrun-image-1", "neon")?;
        let b = DryrunProvider.generate_background("dryrun-image-1", "forest")?;
        assert_eq!(a.mime_type, "image/png");
        assert_ne!(a.bytes, b.bytes);

        let decoded = image::load_from_memory(&a.bytes)?;
        assert_eq!(decoded.dimensions(), (800, 450));
        Ok(())
    }

    #[test]
    fn title_words_caps_and_defaults() {
        assert_eq!(title_words("learning rust the hard way", 3), "Learning Rust The");
        assert_eq!(title_words("   ", 3), "This");
    }
}
