use std::fmt;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::palette::DEFAULT_ACCENT;

/// Compositional arrangement governing subject and text placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutType {
    Split,
    FullFace,
    Minimal,
    Grid,
}

impl LayoutType {
    pub const ALL: [LayoutType; 4] = [Self::Split, Self::FullFace, Self::Minimal, Self::Grid];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Split => "split",
            Self::FullFace => "full-face",
            Self::Minimal => "minimal",
            Self::Grid => "grid",
        }
    }
}

impl fmt::Display for LayoutType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One AI-proposed thumbnail blueprint. Immutable once received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailTemplate {
    pub id: String,
    pub name: String,
    pub headline: String,
    pub highlight_word: String,
    #[serde(default)]
    pub layout_description: String,
    pub color_palette: Vec<String>,
    pub psychology: String,
    #[serde(default)]
    pub graphic_elements: Vec<String>,
    #[serde(default)]
    pub best_use_case: String,
    pub layout_type: LayoutType,
    pub suggested_background: String,
}

impl ThumbnailTemplate {
    pub fn primary_color(&self) -> Option<&str> {
        self.color_palette.first().map(String::as_str)
    }

    /// Palette index 1, falling back to the studio accent.
    pub fn accent_color(&self) -> &str {
        self.color_palette
            .get(1)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(DEFAULT_ACCENT)
    }

    pub fn tertiary_color(&self) -> Option<&str> {
        self.color_palette
            .get(2)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    /// Whole-tag, case-insensitive membership test on `graphic_elements`.
    pub fn has_graphic(&self, tag: &str) -> bool {
        self.graphic_elements
            .iter()
            .any(|element| element.trim().eq_ignore_ascii_case(tag))
    }
}

/// Result of one analyze call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub templates: Vec<ThumbnailTemplate>,
    #[serde(default)]
    pub background_suggestions: Vec<String>,
    pub critique: String,
}

impl AnalysisResult {
    /// Parses a gateway JSON body and checks the shape the studio relies on.
    pub fn from_json(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            bail!("analysis response was empty");
        }
        let parsed: AnalysisResult = serde_json::from_str(strip_code_fence(trimmed))?;
        parsed.validate()?;
        Ok(parsed)
    }

    pub fn validate(&self) -> Result<()> {
        if self.critique.trim().is_empty() {
            bail!("analysis response is missing a critique");
        }
        if self.templates.is_empty() {
            bail!("analysis response contained no templates");
        }
        for (idx, template) in self.templates.iter().enumerate() {
            if template.headline.trim().is_empty() {
                bail!("template {} ('{}') has an empty headline", idx, template.id);
            }
            if template.color_palette.is_empty() {
                bail!("template {} ('{}') has an empty color palette", idx, template.id);
            }
        }
        Ok(())
    }

    pub fn template(&self, index: usize) -> Option<&ThumbnailTemplate> {
        self.templates.get(index)
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{AnalysisResult, LayoutType};

    fn sample_json() -> serde_json::Value {
        json!({
            "critique": "Strong eye contact, flat lighting.",
            "backgroundSuggestions": ["Dark gradient", "Studio grid", "Neon city"],
            "templates": [
                {
                    "id": "t1",
                    "name": "Bold Face",
                    "headline": "How I Learned X",
                    "highlightWord": "Learned",
                    "colorPalette": ["#000000", "#22d3ee", "#FFFFFF"],
                    "psychology": "Curiosity gap.",
                    "graphicElements": ["Arrow"],
                    "layoutType": "full-face",
                    "suggestedBackground": "dark studio"
                },
                {
                    "id": "t2",
                    "name": "Before/After",
                    "headline": "30 Days Later",
                    "highlightWord": "Later",
                    "layoutDescription": "Split screen",
                    "colorPalette": ["#0f172a"],
                    "psychology": "Transformation.",
                    "bestUseCase": "Progress videos",
                    "layoutType": "split",
                    "suggestedBackground": "split gradient"
                }
            ]
        })
    }

    #[test]
    fn parses_camel_case_payload_with_optional_fields() -> anyhow::Result<()> {
        let result = AnalysisResult::from_json(&sample_json().to_string())?;
        assert_eq!(result.templates.len(), 2);
        assert_eq!(result.templates[0].layout_type, LayoutType::FullFace);
        assert_eq!(result.templates[0].highlight_word, "Learned");
        assert!(result.templates[0].layout_description.is_empty());
        assert_eq!(result.templates[1].best_use_case, "Progress videos");
        assert!(result.templates[1].graphic_elements.is_empty());
        assert_eq!(result.background_suggestions.len(), 3);
        Ok(())
    }

    #[test]
    fn accent_falls_back_to_default() -> anyhow::Result<()> {
        let result = AnalysisResult::from_json(&sample_json().to_string())?;
        assert_eq!(result.templates[0].accent_color(), "#22d3ee");
        assert_eq!(result.templates[1].accent_color(), "#22d3ee");
        assert_eq!(result.templates[1].tertiary_color(), None);
        Ok(())
    }

    #[test]
    fn graphic_tag_match_is_whole_tag_and_case_insensitive() -> anyhow::Result<()> {
        let result = AnalysisResult::from_json(&sample_json().to_string())?;
        let mut template = result.templates[0].clone();
        assert!(template.has_graphic("arrow"));
        template.graphic_elements = vec!["Arrows pointing".to_string()];
        assert!(!template.has_graphic("arrow"));
        Ok(())
    }

    #[test]
    fn rejects_unknown_layout_type() {
        let mut payload = sample_json();
        payload["templates"][0]["layoutType"] = json!("carousel");
        assert!(AnalysisResult::from_json(&payload.to_string()).is_err());
    }

    #[test]
    fn rejects_empty_and_malformed_bodies() {
        assert!(AnalysisResult::from_json("").is_err());
        assert!(AnalysisResult::from_json("   ").is_err());
        assert!(AnalysisResult::from_json("{\"critique\": 1}").is_err());
        let mut payload = sample_json();
        payload["templates"] = json!([]);
        assert!(AnalysisResult::from_json(&payload.to_string()).is_err());
    }

    #[test]
    fn rejects_missing_required_template_field() {
        let mut payload = sample_json();
        if let Some(template) = payload["templates"][0].as_object_mut() {
            template.remove("suggestedBackground");
        }
        assert!(AnalysisResult::from_json(&payload.to_string()).is_err());
    }

    #[test]
    fn accepts_fenced_json() -> anyhow::Result<()> {
        let fenced = format!("```json\n{}\n```", sample_json());
        let result = AnalysisResult::from_json(&fenced)?;
        assert_eq!(result.templates.len(), 2);
        Ok(())
    }

    #[test]
    fn layout_type_round_trips_kebab_case() -> anyhow::Result<()> {
        for layout in LayoutType::ALL {
            let encoded = serde_json::to_string(&layout)?;
            assert_eq!(encoded, format!("\"{}\"", layout.as_str()));
        }
        Ok(())
    }
}
