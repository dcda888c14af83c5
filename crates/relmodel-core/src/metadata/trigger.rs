//! Database triggers declared on an entity type.

use serde::{Deserialize, Serialize};

use crate::annotations::{Annotations, ConfigurationSource};

/// A trigger on the entity type's table.
///
/// The database name, table and schema are annotations; when unset they are
/// resolved from the owning entity type's mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    model_name: String,
    annotations: Annotations,
    source: ConfigurationSource,
}

impl Trigger {
    pub fn new(model_name: impl Into<String>, source: ConfigurationSource) -> Self {
        Self {
            model_name: model_name.into(),
            annotations: Annotations::new(),
            source,
        }
    }

    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    #[must_use]
    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn annotations_mut(&mut self) -> &mut Annotations {
        &mut self.annotations
    }

    #[must_use]
    pub const fn configuration_source(&self) -> ConfigurationSource {
        self.source
    }

    pub fn update_configuration_source(&mut self, source: ConfigurationSource) {
        self.source = source.max(Some(self.source));
    }
}
