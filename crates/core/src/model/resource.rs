use serde::{Deserialize, Serialize};

use crate::model::attr::Attributes;

/// Identifies the emitting process. Built once at startup and shared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub service_name: String,
    pub service_version: String,
    pub environment: String,
    #[serde(default)]
    pub extra: Attributes,
}

impl Resource {
    pub fn new(
        service_name: impl Into<String>,
        service_version: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            service_version: service_version.into(),
            environment: environment.into(),
            extra: Attributes::new(),
        }
    }

    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.extra.insert(key, value);
        self
    }

    /// Attributes in semantic-convention naming, extras last.
    pub fn attributes(&self) -> Attributes {
        let mut attrs = Attributes::new()
            .with("service.name", self.service_name.as_str())
            .with("service.version", self.service_version.as_str())
            .with("deployment.environment", self.environment.as_str());
        for (k, v) in self.extra.iter() {
            attrs.insert(k, v.clone());
        }
        attrs
    }
}
