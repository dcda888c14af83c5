//! Provider options applied to a model and facade.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::identifiers::DEFAULT_MAX_IDENTIFIER_LENGTH;

/// Relational provider options.
///
/// Typically loaded from a JSON document:
///
/// ```ignore
/// let options = RelationalOptions::from_json_str(r#"{"default_schema": "sales"}"#)?;
/// let model = Model::with_options(&options);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelationalOptions {
    /// Longest identifier the database accepts; generated names are truncated to it.
    pub max_identifier_length: usize,
    /// Schema used for tables and views that don't name one.
    pub default_schema: Option<String>,
    /// Initial command timeout for the database facade, in seconds.
    pub command_timeout_secs: Option<u64>,
}

impl Default for RelationalOptions {
    fn default() -> Self {
        Self {
            max_identifier_length: DEFAULT_MAX_IDENTIFIER_LENGTH,
            default_schema: None,
            command_timeout_secs: None,
        }
    }
}

impl RelationalOptions {
    /// Create options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from JSON and validate them.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)
            .map_err(|e| Error::invalid_argument("options", e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Set the maximum identifier length.
    #[must_use]
    pub fn max_identifier_length(mut self, length: usize) -> Self {
        self.max_identifier_length = length;
        self
    }

    /// Set the default schema.
    #[must_use]
    pub fn default_schema(mut self, schema: impl Into<String>) -> Self {
        self.default_schema = Some(schema.into());
        self
    }

    /// Set the command timeout in seconds.
    #[must_use]
    pub fn command_timeout_secs(mut self, seconds: u64) -> Self {
        self.command_timeout_secs = Some(seconds);
        self
    }

    /// Check option values for consistency.
    pub fn validate(&self) -> Result<()> {
        if self.max_identifier_length == 0 {
            return Err(Error::invalid_argument(
                "max_identifier_length",
                "must be greater than zero",
            ));
        }
        if self.default_schema.as_deref() == Some("") {
            return Err(Error::invalid_argument(
                "default_schema",
                "the string argument cannot be empty",
            ));
        }
        if let Some(seconds) = self.command_timeout_secs {
            if seconds > i32::MAX as u64 {
                return Err(Error::TimeoutTooBig { seconds });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = RelationalOptions::default();
        assert_eq!(options.max_identifier_length, 128);
        assert_eq!(options.default_schema, None);
        assert_eq!(options.command_timeout_secs, None);
    }

    #[test]
    fn test_from_json() {
        let options = RelationalOptions::from_json_str(
            r#"{"max_identifier_length": 63, "default_schema": "sales"}"#,
        )
        .unwrap();
        assert_eq!(options.max_identifier_length, 63);
        assert_eq!(options.default_schema.as_deref(), Some("sales"));
    }

    #[test]
    fn test_from_json_rejects_unknown_fields() {
        assert!(RelationalOptions::from_json_str(r#"{"max_len": 10}"#).is_err());
    }

    #[test]
    fn test_validation() {
        assert!(
            RelationalOptions::new()
                .max_identifier_length(0)
                .validate()
                .is_err()
        );
        assert!(
            RelationalOptions::new()
                .default_schema("")
                .validate()
                .is_err()
        );
        assert_eq!(
            RelationalOptions::new()
                .command_timeout_secs(u64::MAX)
                .validate(),
            Err(Error::TimeoutTooBig { seconds: u64::MAX })
        );
        assert!(
            RelationalOptions::new()
                .command_timeout_secs(30)
                .validate()
                .is_ok()
        );
    }
}
