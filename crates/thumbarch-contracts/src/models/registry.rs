use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// What a gateway model can be asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Photo critique plus structured template blueprints.
    Analyze,
    /// Background image synthesis.
    Image,
}

impl Capability {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Analyze => "analyze",
            Self::Image => "image",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    pub provider: String,
    pub capabilities: Vec<Capability>,
    pub description: Option<String>,
}

impl ModelSpec {
    pub fn new(name: &str, provider: &str, capabilities: &[Capability]) -> Self {
        Self {
            name: name.to_string(),
            provider: provider.to_string(),
            capabilities: capabilities.to_vec(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

/// Known gateway models in preference order. The first model supporting a
/// capability is that capability's default.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: IndexMap<String, ModelSpec>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::from_specs(builtin_models())
    }
}

impl ModelRegistry {
    /// Later specs replace earlier ones with the same name but keep their
    /// position.
    pub fn from_specs(specs: impl IntoIterator<Item = ModelSpec>) -> Self {
        let mut models = IndexMap::new();
        for spec in specs {
            models.insert(spec.name.clone(), spec);
        }
        Self { models }
    }

    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        self.models.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelSpec> {
        self.models.values()
    }

    pub fn default_for(&self, capability: Capability) -> Option<&ModelSpec> {
        self.iter().find(|model| model.supports(capability))
    }

    /// `name`, provided it exists and can serve `capability`.
    pub fn capable(&self, name: &str, capability: Capability) -> Option<&ModelSpec> {
        self.get(name).filter(|model| model.supports(capability))
    }
}

fn builtin_models() -> Vec<ModelSpec> {
    use Capability::{Analyze, Image};

    vec![
        ModelSpec::new("gemini-2.5-flash", "gemini", &[Analyze])
            .with_description("Structured photo critique and template blueprints."),
        ModelSpec::new("gemini-2.5-flash-image", "gemini", &[Image])
            .with_description("Background texture synthesis."),
        ModelSpec::new("gemini-2.5-pro", "gemini", &[Analyze])
            .with_description("Slower, more careful blueprints."),
        ModelSpec::new("dryrun-analyze-1", "dryrun", &[Analyze])
            .with_description("Offline deterministic blueprints."),
        ModelSpec::new("dryrun-image-1", "dryrun", &[Image])
            .with_description("Offline gradient backgrounds."),
    ]
}

#[cfg(test)]
mod tests {
    use super::{Capability, ModelRegistry, ModelSpec};

    #[test]
    fn defaults_prefer_gemini_for_each_capability() {
        let registry = ModelRegistry::default();
        let analyze = registry.default_for(Capability::Analyze).map(|m| m.name.as_str());
        let image = registry.default_for(Capability::Image).map(|m| m.name.as_str());
        assert_eq!(analyze, Some("gemini-2.5-flash"));
        assert_eq!(image, Some("gemini-2.5-flash-image"));
    }

    #[test]
    fn capable_checks_the_capability() {
        let registry = ModelRegistry::default();
        assert!(registry.capable("dryrun-image-1", Capability::Image).is_some());
        assert!(registry.capable("dryrun-image-1", Capability::Analyze).is_none());
        assert!(registry.capable("missing", Capability::Image).is_none());
    }

    #[test]
    fn replacing_a_spec_keeps_its_rank() {
        let registry = ModelRegistry::from_specs([
            ModelSpec::new("first", "dryrun", &[Capability::Image]),
            ModelSpec::new("second", "dryrun", &[Capability::Image]),
            ModelSpec::new("first", "gemini", &[Capability::Image]),
        ]);
        let names: Vec<&str> = registry.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(
            registry.default_for(Capability::Image).map(|m| m.provider.as_str()),
            Some("gemini")
        );
    }

    #[test]
    fn capability_names_are_stable() {
        assert_eq!(Capability::Analyze.to_string(), "analyze");
        assert_eq!(
            serde_json::to_string(&Capability::Image).unwrap_or_default(),
            "\"image\""
        );
    }
}
