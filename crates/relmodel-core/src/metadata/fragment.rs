//! Entity splitting: additional store objects an entity type maps into.

use serde::{Deserialize, Serialize};

use crate::annotations::{Annotations, ConfigurationSource};
use crate::store_object::StoreObjectIdentifier;

/// One extra table or view that part of an entity type's properties are
/// split into. Which properties go there is recorded through property
/// overrides keyed by the same store object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingFragment {
    store_object: StoreObjectIdentifier,
    annotations: Annotations,
    source: ConfigurationSource,
}

impl MappingFragment {
    #[must_use]
    pub fn new(store_object: StoreObjectIdentifier, source: ConfigurationSource) -> Self {
        Self {
            store_object,
            annotations: Annotations::new(),
            source,
        }
    }

    #[must_use]
    pub fn store_object(&self) -> &StoreObjectIdentifier {
        &self.store_object
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
