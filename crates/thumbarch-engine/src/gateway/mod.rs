//! AI gateway: the two remote capabilities the studio depends on
//! (blueprint analysis and background synthesis) behind one trait, with
//! provider routing driven by the shared model registry.

mod dryrun;
mod gemini;

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::blocking::Response as HttpResponse;
use serde_json::Value;
use thumbarch_contracts::models::{Capability, Fallback, ModelSelector};
use thumbarch_contracts::AnalysisResult;

use crate::config::GatewayConfig;
pub use crate::upload::InlineImage;

pub use dryrun::DryrunProvider;
pub use gemini::GeminiProvider;

/// Raw bytes of a synthesized background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl GeneratedImage {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, BASE64.encode(&self.bytes))
    }
}

/// What the studio shell calls. Implementations must be callable from worker
/// threads.
pub trait AiGateway: Send + Sync {
    fn analyze(&self, image: &InlineImage, topic: &str) -> Result<AnalysisResult>;
    fn generate_background(&self, prompt: &str) -> Result<GeneratedImage>;
}

/// One backend able to serve some of the gateway models.
pub trait GatewayProvider: Send + Sync {
    fn name(&self) -> &str;
    fn analyze(&self, model: &str, image: &InlineImage, topic: &str) -> Result<AnalysisResult>;
    fn generate_background(&self, model: &str, prompt: &str) -> Result<GeneratedImage>;
}

#[derive(Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn GatewayProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<P: GatewayProvider + 'static>(&mut self, provider: P) {
        self.providers
            .insert(provider.name().to_string(), Arc::new(provider));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn GatewayProvider>> {
        self.providers.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }
}

/// Resolves the configured model per capability, then dispatches to the
/// provider that owns it.
pub struct RoutedGateway {
    registry: ProviderRegistry,
    selector: ModelSelector,
    analysis_model: Option<String>,
    image_model: Option<String>,
}

impl RoutedGateway {
    pub fn new(
        registry: ProviderRegistry,
        selector: ModelSelector,
        analysis_model: Option<String>,
        image_model: Option<String>,
    ) -> Self {
        Self {
            registry,
            selector,
            analysis_model,
            image_model,
        }
    }

    /// Gemini plus the offline dryrun provider, models taken from `config`.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let mut registry = ProviderRegistry::new();
        registry.register(GeminiProvider::new(config)?);
        registry.register(DryrunProvider);
        Ok(Self::new(
            registry,
            ModelSelector::default(),
            Some(config.analysis_model.clone()),
            Some(config.image_model.clone()),
        ))
    }

    /// Model name and provider for `capability`.
    pub fn route(&self, capability: Capability) -> Result<(String, Arc<dyn GatewayProvider>)> {
        let requested = match capability {
            Capability::Analyze => self.analysis_model.as_deref(),
            Capability::Image => self.image_model.as_deref(),
        };
        let selection = self
            .selector
            .select(requested, capability)
            .map_err(|message| anyhow!(message))?;
        if let Some(fallback @ Fallback::Unavailable { .. }) = &selection.fallback {
            tracing::warn!(
                model = %selection.model.name,
                reason = %fallback.explain(capability),
                "gateway model fallback"
            );
        }
        let Some(provider) = self.registry.get(&selection.model.provider) else {
            bail!(
                "no provider '{}' registered for model '{}' (have: {})",
                selection.model.provider,
                selection.model.name,
                self.registry.names().join(", ")
            );
        };
        Ok((selection.model.name, provider))
    }
}

impl AiGateway for RoutedGateway {
    fn analyze(&self, image: &InlineImage, topic: &str) -> Result<AnalysisResult> {
        let (model, provider) = self.route(Capability::Analyze)?;
        tracing::debug!(provider = provider.name(), model = %model, "routing analysis");
        provider.analyze(&model, image, topic)
    }

    fn generate_background(&self, prompt: &str) -> Result<GeneratedImage> {
        let (model, provider) = self.route(Capability::Image)?;
        tracing::debug!(provider = provider.name(), model = %model, "routing background");
        provider.generate_background(&model, prompt)
    }
}

fn response_json_or_error(provider: &str, response: HttpResponse) -> Result<Value> {
    let status = response.status();
    let code = status.as_u16();
    let body = response
        .text()
        .with_context(|| format!("{provider} response body read failed"))?;
    if !status.is_success() {
        bail!(
            "{provider} request failed ({code}): {}",
            truncate_text(&body, 512)
        );
    }
    let parsed: Value = serde_json::from_str(&body)
        .with_context(|| format!("{provider} returned invalid JSON payload"))?;
    Ok(parsed)
}

fn is_retryable_transport_error(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<reqwest::Error>()
            .map(|reqwest_err| {
                reqwest_err.is_timeout() || reqwest_err.is_connect() || reqwest_err.is_request()
            })
            .unwrap_or(false)
    })
}

/// Flattens an error chain into one line, skipping repeated links.
pub fn error_chain_text(err: &anyhow::Error, max_chars: usize) -> String {
    let mut parts: Vec<String> = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if parts
            .last()
            .map(|existing| existing == trimmed)
            .unwrap_or(false)
        {
            continue;
        }
        parts.push(trimmed.to_string());
    }
    if parts.is_empty() {
        return truncate_text(&err.to_string(), max_chars);
    }
    truncate_text(&parts.join(" | caused by: "), max_chars)
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
