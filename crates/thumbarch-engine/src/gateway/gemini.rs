use std::thread;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::{json, Value};
use thumbarch_contracts::AnalysisResult;

use super::{
    is_retryable_transport_error, response_json_or_error, GatewayProvider, GeneratedImage,
    InlineImage,
};
use crate::config::GatewayConfig;

const PROVIDER: &str = "Gemini";

/// Google Generative Language `generateContent` backend.
pub struct GeminiProvider {
    api_base: String,
    api_key: Option<String>,
    temperature: f64,
    timeout_s: f64,
    transport_retries: usize,
    retry_backoff_s: f64,
    http: HttpClient,
}

impl GeminiProvider {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .build()
            .context("failed to build Gemini HTTP client")?;
        Ok(Self {
            api_base: config.api_base.clone(),
            api_key: config.api_key.clone(),
            temperature: config.temperature,
            timeout_s: config.request_timeout_s,
            transport_retries: config.transport_retries,
            retry_backoff_s: config.retry_backoff_s,
            http,
        })
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| anyhow!("GEMINI_API_KEY or GOOGLE_API_KEY or API_KEY not set"))
    }

    fn post_with_transport_retries(
        &self,
        endpoint: &str,
        api_key: &str,
        payload: &Value,
    ) -> Result<HttpResponse> {
        let mut attempt = 0;
        loop {
            let response = self
                .http
                .post(endpoint)
                .query(&[("key", api_key)])
                .timeout(Duration::from_secs_f64(self.timeout_s))
                .json(payload)
                .send();

            match response {
                Ok(ok) => return Ok(ok),
                Err(raw) => {
                    let err = anyhow::Error::new(raw)
                        .context(format!("Gemini request failed ({endpoint})"));
                    if !is_retryable_transport_error(&err) || attempt >= self.transport_retries {
                        return Err(err);
                    }
                    attempt += 1;
                    tracing::warn!(
                        attempt,
                        max = self.transport_retries,
                        "Gemini transport retry after transient request failure"
                    );
                    let delay_s = self.retry_backoff_s * attempt as f64;
                    thread::sleep(Duration::from_secs_f64(delay_s));
                }
            }
        }
    }
}

impl GatewayProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    #[tracing::instrument(skip(self, image), fields(mime = %image.mime_type))]
    fn analyze(&self, model: &str, image: &InlineImage, topic: &str) -> Result<AnalysisResult> {
        let api_key = self.api_key()?;
        let endpoint = self.endpoint_for_model(model);
        let payload = analysis_payload(image, topic, self.temperature);
        let response = self.post_with_transport_retries(&endpoint, api_key, &payload)?;
        let body = response_json_or_error(PROVIDER, response)?;
        let text = extract_text(&body);
        if text.trim().is_empty() {
            bail!(
                "Gemini returned no analysis text{}",
                block_reason(&body)
                    .map(|reason| format!(" (blocked: {reason})"))
                    .unwrap_or_default()
            );
        }
        AnalysisResult::from_json(&text).context("Gemini analysis payload did not match schema")
    }

    #[tracing::instrument(skip(self))]
    fn generate_background(&self, model: &str, prompt: &str) -> Result<GeneratedImage> {
        let api_key = self.api_key()?;
        let endpoint = self.endpoint_for_model(model);
        let payload = background_payload(prompt);
        let response = self.post_with_transport_retries(&endpoint, api_key, &payload)?;
        let body = response_json_or_error(PROVIDER, response)?;
        first_inline_image(&body)?.ok_or_else(|| anyhow!("No image generated"))
    }
}

pub(crate) fn analysis_prompt(topic: &str) -> String {
    format!(
        "You are a Professional Thumbnail Design Engine and Creative Director.\n\
         User Topic: \"{topic}\"\n\n\
         Analyze the provided image (user's face/subject) and the topic.\n\
         Generate 4 high-CTR YouTube thumbnail templates based on marketing psychology.\n\n\
         Rules:\n\
         1. Headlines must be short (3-6 words), engaging, and click-worthy.\n\
         2. Highlight ONE emotional keyword per template.\n\
         3. Colors should be business-style: Black, White, Blue, Cyan, with high contrast accents.\n\
         4. Templates should vary in style:\n   \
            A: Bold Headline + Face\n   \
            B: Split Screen (Before/After vibe)\n   \
            C: Minimalist/Podcast\n   \
            D: High Tech/Grid\n\n\
         Provide a critique of the image and how to best use it."
    )
}

pub(crate) fn background_prompt(style: &str) -> String {
    format!(
        "Generate a high-quality background texture for a YouTube thumbnail. Style: {style}. \
         No text. Abstract, high contrast, professional. Aspect ratio 16:9."
    )
}

fn analysis_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "critique": {
                "type": "STRING",
                "description": "Critique of the uploaded image and how to best use it."
            },
            "backgroundSuggestions": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "3 alternative background prompts."
            },
            "templates": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "id": { "type": "STRING" },
                        "name": { "type": "STRING" },
                        "headline": { "type": "STRING", "description": "3-6 words." },
                        "highlightWord": { "type": "STRING" },
                        "layoutDescription": { "type": "STRING" },
                        "colorPalette": { "type": "ARRAY", "items": { "type": "STRING" } },
                        "psychology": { "type": "STRING" },
                        "graphicElements": { "type": "ARRAY", "items": { "type": "STRING" } },
                        "bestUseCase": { "type": "STRING" },
                        "layoutType": {
                            "type": "STRING",
                            "enum": ["split", "full-face", "minimal", "grid"]
                        },
                        "suggestedBackground": { "type": "STRING" }
                    },
                    "required": [
                        "id",
                        "name",
                        "headline",
                        "highlightWord",
                        "colorPalette",
                        "psychology",
                        "layoutType",
                        "suggestedBackground"
                    ]
                }
            }
        },
        "required": ["critique", "backgroundSuggestions", "templates"]
    })
}

pub(crate) fn analysis_payload(image: &InlineImage, topic: &str, temperature: f64) -> Value {
    json!({
        "contents": [{
            "parts": [
                {
                    "inlineData": {
                        "mimeType": image.mime_type,
                        "data": image.data_base64,
                    }
                },
                { "text": analysis_prompt(topic) }
            ]
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": analysis_schema(),
            "temperature": temperature,
        }
    })
}

pub(crate) fn background_payload(style: &str) -> Value {
    json!({
        "contents": [{
            "parts": [{ "text": background_prompt(style) }]
        }],
        "generationConfig": {
            "responseModalities": ["IMAGE"],
            "imageConfig": { "aspectRatio": "16:9" }
        }
    })
}

fn candidate_parts(body: &Value) -> Vec<Value> {
    body.get("candidates")
        .and_then(Value::as_array)
        .map(|candidates| {
            candidates
                .iter()
                .filter_map(|candidate| {
                    candidate
                        .get("content")
                        .and_then(|content| content.get("parts"))
                        .and_then(Value::as_array)
                })
                .flatten()
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn extract_text(body: &Value) -> String {
    candidate_parts(body)
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("")
}

fn block_reason(body: &Value) -> Option<String> {
    body.get("promptFeedback")
        .and_then(|feedback| feedback.get("blockReason"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

pub(crate) fn first_inline_image(body: &Value) -> Result<Option<GeneratedImage>> {
    for part in candidate_parts(body) {
        let Some(inline) = part
            .get("inlineData")
            .or_else(|| part.get("inline_data"))
            .and_then(Value::as_object)
        else {
            continue;
        };
        let data = inline
            .get("data")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if data.is_empty() {
            continue;
        }
        let bytes = BASE64
            .decode(data.as_bytes())
            .context("Gemini image base64 decode failed")?;
        let mime_type = inline
            .get("mimeType")
            .or_else(|| inline.get("mime_type"))
            .and_then(Value::as_str)
            .unwrap_or("image/png")
            .to_string();
        return Ok(Some(GeneratedImage { mime_type, bytes }));
    }
    Ok(None)
}
