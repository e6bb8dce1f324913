use super::registry::{Capability, ModelRegistry, ModelSpec};

/// Why the selector did not hand back exactly what was asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fallback {
    NotRequested,
    Unavailable { requested: String },
}

impl Fallback {
    pub fn explain(&self, capability: Capability) -> String {
        match self {
            Self::NotRequested => "No model specified; using default.".to_string(),
            Self::Unavailable { requested } => {
                format!("Requested model '{requested}' unavailable for capability '{capability}'.")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub model: ModelSpec,
    pub capability: Capability,
    pub fallback: Option<Fallback>,
}

impl ModelSelection {
    pub fn fallback_reason(&self) -> Option<String> {
        self.fallback
            .as_ref()
            .map(|fallback| fallback.explain(self.capability))
    }
}

/// Picks the model a capability runs on: the requested one when it can
/// serve the capability, otherwise the registry default.
#[derive(Debug, Clone, Default)]
pub struct ModelSelector {
    registry: ModelRegistry,
}

impl ModelSelector {
    pub fn new(registry: ModelRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn select(
        &self,
        requested: Option<&str>,
        capability: Capability,
    ) -> Result<ModelSelection, String> {
        let requested = requested.map(str::trim).filter(|name| !name.is_empty());
        if let Some(model) = requested.and_then(|name| self.registry.capable(name, capability)) {
            return Ok(ModelSelection {
                model: model.clone(),
                capability,
                fallback: None,
            });
        }

        let fallback = match requested {
            Some(name) => Fallback::Unavailable {
                requested: name.to_string(),
            },
            None => Fallback::NotRequested,
        };
        match self.registry.default_for(capability) {
            Some(model) => Ok(ModelSelection {
                model: model.clone(),
                capability,
                fallback: Some(fallback),
            }),
            None => Err(format!(
                "No models available for capability '{capability}'."
            )),
        }
    }
}
