//! Check constraints declared on an entity type.

use serde::{Deserialize, Serialize};

use crate::annotations::{Annotations, ConfigurationSource};

/// A named SQL predicate enforced on the entity type's table.
///
/// The model name is unique within the entity type hierarchy. The database
/// name may differ and lives in the `Relational:Name` annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckConstraint {
    model_name: String,
    sql: String,
    annotations: Annotations,
    source: ConfigurationSource,
}

impl CheckConstraint {
    /// Create a check constraint.
    pub fn new(
        model_name: impl Into<String>,
        sql: impl Into<String>,
        source: ConfigurationSource,
    ) -> Self {
        Self {
            model_name: model_name.into(),
            sql: sql.into(),
            annotations: Annotations::new(),
            source,
        }
    }

    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Replace the predicate, raising the configuration source if needed.
    pub fn set_sql(&mut self, sql: impl Into<String>, source: ConfigurationSource) {
        self.sql = sql.into();
        self.update_configuration_source(source);
    }

    #[must_use]
    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn annotations_mut(&mut self) -> &mut Annotations {
        &mut self.annotations
    }

    /// Source of the constraint itself (not of its annotations).
    #[must_use]
    pub const fn configuration_source(&self) -> ConfigurationSource {
        self.source
    }

    /// Raise the constraint's source to `source` if it is higher.
    pub fn update_configuration_source(&mut self, source: ConfigurationSource) {
        self.source = source.max(Some(self.source));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_sql_raises_source() {
        let mut ck = CheckConstraint::new("CK_Price", "Price > 0", ConfigurationSource::Convention);
        assert_eq!(ck.model_name(), "CK_Price");
        ck.set_sql("Price >= 0", ConfigurationSource::Explicit);
        assert_eq!(ck.sql(), "Price >= 0");
        assert_eq!(ck.configuration_source(), ConfigurationSource::Explicit);

        ck.update_configuration_source(ConfigurationSource::Convention);
        assert_eq!(ck.configuration_source(), ConfigurationSource::Explicit);
    }
}
