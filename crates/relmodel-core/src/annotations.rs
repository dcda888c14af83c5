//! Annotation store attached to every metadata object.
//!
//! Each entity type, property, trigger, check constraint and stored procedure
//! carries an [`Annotations`] bag. Values are keyed by the closed
//! [`AnnotationName`] vocabulary and tagged with the [`ConfigurationSource`]
//! that wrote them, so lower-precedence writers (conventions) can never
//! silently clobber a higher-precedence value (explicit configuration).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Precedence tier of a configuration write.
///
/// Ordered ascending: `Convention < DataAnnotation < Explicit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConfigurationSource {
    /// Written by a model-building convention.
    Convention,
    /// Written from an attribute/data annotation on the mapped type.
    DataAnnotation,
    /// Written by user code through the fluent API or a mutable setter.
    Explicit,
}

impl ConfigurationSource {
    /// Source used by convention-stage setters.
    #[must_use]
    pub const fn from_data_annotation(from_data_annotation: bool) -> Self {
        if from_data_annotation {
            ConfigurationSource::DataAnnotation
        } else {
            ConfigurationSource::Convention
        }
    }

    /// Whether a write from `self` may replace a value written by `existing`.
    #[must_use]
    pub fn overrides(self, existing: Option<Self>) -> bool {
        existing.is_none_or(|existing| self >= existing)
    }

    /// The higher of the two sources.
    #[must_use]
    pub fn max(self, other: Option<Self>) -> Self {
        match other {
            Some(other) if other > self => other,
            _ => self,
        }
    }
}

impl fmt::Display for ConfigurationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConfigurationSource::Convention => "Convention",
            ConfigurationSource::DataAnnotation => "DataAnnotation",
            ConfigurationSource::Explicit => "Explicit",
        };
        f.write_str(s)
    }
}

/// The closed vocabulary of annotation keys.
///
/// The serde names are the wire strings used when metadata is exported, so
/// they must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AnnotationName {
    #[serde(rename = "Relational:TableName")]
    TableName,
    #[serde(rename = "Relational:Schema")]
    Schema,
    #[serde(rename = "Relational:ViewName")]
    ViewName,
    #[serde(rename = "Relational:ViewSchema")]
    ViewSchema,
    #[serde(rename = "Relational:FunctionName")]
    FunctionName,
    #[serde(rename = "Relational:SqlQuery")]
    SqlQuery,
    #[serde(rename = "Relational:MappingStrategy")]
    MappingStrategy,
    #[serde(rename = "Relational:IsTableExcludedFromMigrations")]
    IsTableExcludedFromMigrations,
    #[serde(rename = "Relational:Comment")]
    Comment,
    #[serde(rename = "Relational:ContainerColumnName")]
    ContainerColumnName,
    #[serde(rename = "Relational:JsonPropertyName")]
    JsonPropertyName,
    #[serde(rename = "Relational:ColumnName")]
    ColumnName,
    #[serde(rename = "Relational:ColumnOrder")]
    ColumnOrder,
    #[serde(rename = "Relational:ColumnType")]
    ColumnType,
    #[serde(rename = "Relational:IsFixedLength")]
    IsFixedLength,
    #[serde(rename = "Relational:DefaultValue")]
    DefaultValue,
    #[serde(rename = "Relational:DefaultValueSql")]
    DefaultValueSql,
    #[serde(rename = "Relational:ComputedColumnSql")]
    ComputedColumnSql,
    #[serde(rename = "Relational:IsStored")]
    IsStored,
    #[serde(rename = "Relational:Collation")]
    Collation,
    #[serde(rename = "Relational:Name")]
    Name,
    #[serde(rename = "Relational:DefaultSchema")]
    DefaultSchema,
    #[serde(rename = "Relational:MaxIdentifierLength")]
    MaxIdentifierLength,
    #[serde(rename = "MaxLength")]
    MaxLength,
    #[serde(rename = "Precision")]
    Precision,
    #[serde(rename = "Scale")]
    Scale,
    #[serde(rename = "Unicode")]
    IsUnicode,
}

impl AnnotationName {
    /// Every annotation name, in declaration order.
    pub const ALL: [AnnotationName; 27] = [
        AnnotationName::TableName,
        AnnotationName::Schema,
        AnnotationName::ViewName,
        AnnotationName::ViewSchema,
        AnnotationName::FunctionName,
        AnnotationName::SqlQuery,
        AnnotationName::MappingStrategy,
        AnnotationName::IsTableExcludedFromMigrations,
        AnnotationName::Comment,
        AnnotationName::ContainerColumnName,
        AnnotationName::JsonPropertyName,
        AnnotationName::ColumnName,
        AnnotationName::ColumnOrder,
        AnnotationName::ColumnType,
        AnnotationName::IsFixedLength,
        AnnotationName::DefaultValue,
        AnnotationName::DefaultValueSql,
        AnnotationName::ComputedColumnSql,
        AnnotationName::IsStored,
        AnnotationName::Collation,
        AnnotationName::Name,
        AnnotationName::DefaultSchema,
        AnnotationName::MaxIdentifierLength,
        AnnotationName::MaxLength,
        AnnotationName::Precision,
        AnnotationName::Scale,
        AnnotationName::IsUnicode,
    ];

    /// The wire string for this key.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            AnnotationName::TableName => "Relational:TableName",
            AnnotationName::Schema => "Relational:Schema",
            AnnotationName::ViewName => "Relational:ViewName",
            AnnotationName::ViewSchema => "Relational:ViewSchema",
            AnnotationName::FunctionName => "Relational:FunctionName",
            AnnotationName::SqlQuery => "Relational:SqlQuery",
            AnnotationName::MappingStrategy => "Relational:MappingStrategy",
            AnnotationName::IsTableExcludedFromMigrations => {
                "Relational:IsTableExcludedFromMigrations"
            }
            AnnotationName::Comment => "Relational:Comment",
            AnnotationName::ContainerColumnName => "Relational:ContainerColumnName",
            AnnotationName::JsonPropertyName => "Relational:JsonPropertyName",
            AnnotationName::ColumnName => "Relational:ColumnName",
            AnnotationName::ColumnOrder => "Relational:ColumnOrder",
            AnnotationName::ColumnType => "Relational:ColumnType",
            AnnotationName::IsFixedLength => "Relational:IsFixedLength",
            AnnotationName::DefaultValue => "Relational:DefaultValue",
            AnnotationName::DefaultValueSql => "Relational:DefaultValueSql",
            AnnotationName::ComputedColumnSql => "Relational:ComputedColumnSql",
            AnnotationName::IsStored => "Relational:IsStored",
            AnnotationName::Collation => "Relational:Collation",
            AnnotationName::Name => "Relational:Name",
            AnnotationName::DefaultSchema => "Relational:DefaultSchema",
            AnnotationName::MaxIdentifierLength => "Relational:MaxIdentifierLength",
            AnnotationName::MaxLength => "MaxLength",
            AnnotationName::Precision => "Precision",
            AnnotationName::Scale => "Scale",
            AnnotationName::IsUnicode => "Unicode",
        }
    }
}

impl fmt::Display for AnnotationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnnotationName {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnnotationName::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| {
                crate::Error::invalid_argument("name", format!("unknown annotation name '{s}'"))
            })
    }
}

/// A JSON array, object or null stored as an annotation value.
///
/// Scalars are rejected so every [`AnnotationValue`] has exactly one
/// serialized shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "serde_json::Value")]
pub struct JsonDocument(serde_json::Value);

impl JsonDocument {
    /// Wrap an array, object or null. Scalars come back as the error value.
    pub fn new(value: serde_json::Value) -> Result<Self, serde_json::Value> {
        if value.is_array() || value.is_object() || value.is_null() {
            Ok(Self(value))
        } else {
            Err(value)
        }
    }

    #[must_use]
    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    #[must_use]
    pub fn into_value(self) -> serde_json::Value {
        self.0
    }
}

impl TryFrom<serde_json::Value> for JsonDocument {
    type Error = String;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        Self::new(value).map_err(|scalar| format!("expected a JSON array or object, found {scalar}"))
    }
}

impl From<JsonDocument> for serde_json::Value {
    fn from(document: JsonDocument) -> Self {
        document.0
    }
}

/// A typed annotation value.
///
/// Serialized untagged so exported metadata reads as plain JSON. Each
/// variant has a distinct JSON shape: integers never carry a fraction and
/// [`JsonDocument`] never holds a scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnnotationValue {
    Bool(bool),
    Int(i64),
    /// Non-finite floats have no JSON form and serialize as null.
    Float(f64),
    Text(String),
    Json(JsonDocument),
}

impl AnnotationValue {
    /// The text payload, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AnnotationValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The boolean payload, if this is a boolean value.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            AnnotationValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The integer payload, if this is an integer value.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            AnnotationValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<bool> for AnnotationValue {
    fn from(value: bool) -> Self {
        AnnotationValue::Bool(value)
    }
}

impl From<i64> for AnnotationValue {
    fn from(value: i64) -> Self {
        AnnotationValue::Int(value)
    }
}

impl From<i32> for AnnotationValue {
    fn from(value: i32) -> Self {
        AnnotationValue::Int(i64::from(value))
    }
}

impl From<f64> for AnnotationValue {
    fn from(value: f64) -> Self {
        AnnotationValue::Float(value)
    }
}

impl From<&str> for AnnotationValue {
    fn from(value: &str) -> Self {
        AnnotationValue::Text(value.to_string())
    }
}

impl From<String> for AnnotationValue {
    fn from(value: String) -> Self {
        AnnotationValue::Text(value)
    }
}

impl From<serde_json::Value> for AnnotationValue {
    /// Scalars become the matching scalar variant. Integers beyond `i64`
    /// are stored as floats.
    fn from(value: serde_json::Value) -> Self {
        match JsonDocument::new(value) {
            Ok(document) => AnnotationValue::Json(document),
            Err(serde_json::Value::Bool(b)) => AnnotationValue::Bool(b),
            Err(serde_json::Value::String(s)) => AnnotationValue::Text(s),
            Err(serde_json::Value::Number(n)) => match n.as_i64() {
                Some(i) => AnnotationValue::Int(i),
                None => AnnotationValue::Float(n.as_f64().unwrap_or_default()),
            },
            Err(other) => AnnotationValue::Json(JsonDocument(other)),
        }
    }
}

impl From<JsonDocument> for AnnotationValue {
    fn from(document: JsonDocument) -> Self {
        AnnotationValue::Json(document)
    }
}

/// A stored annotation: its value plus the source that wrote it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub value: AnnotationValue,
    pub source: ConfigurationSource,
}

/// Whether a precedence-gated write took effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum SetOutcome {
    /// The value was stored (or removed).
    Applied,
    /// An existing value from a higher source was kept.
    Rejected,
}

impl SetOutcome {
    /// True if the write took effect.
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, SetOutcome::Applied)
    }
}

/// An ordered annotation bag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Annotations {
    entries: BTreeMap<AnnotationName, Annotation>,
}

impl Annotations {
    /// Create an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an annotation.
    #[must_use]
    pub fn find(&self, name: AnnotationName) -> Option<&Annotation> {
        self.entries.get(&name)
    }

    /// Look up an annotation's value.
    #[must_use]
    pub fn value(&self, name: AnnotationName) -> Option<&AnnotationValue> {
        self.entries.get(&name).map(|a| &a.value)
    }

    /// True if the annotation is present.
    #[must_use]
    pub fn contains(&self, name: AnnotationName) -> bool {
        self.entries.contains_key(&name)
    }

    /// Text value of an annotation.
    #[must_use]
    pub fn get_text(&self, name: AnnotationName) -> Option<&str> {
        self.value(name).and_then(AnnotationValue::as_text)
    }

    /// Boolean value of an annotation.
    #[must_use]
    pub fn get_bool(&self, name: AnnotationName) -> Option<bool> {
        self.value(name).and_then(AnnotationValue::as_bool)
    }

    /// Integer value of an annotation.
    #[must_use]
    pub fn get_int(&self, name: AnnotationName) -> Option<i64> {
        self.value(name).and_then(AnnotationValue::as_int)
    }

    /// Source of the stored annotation, or `None` if unset.
    #[must_use]
    pub fn configuration_source(&self, name: AnnotationName) -> Option<ConfigurationSource> {
        self.entries.get(&name).map(|a| a.source)
    }

    /// Whether a write of `value` from `source` would be accepted.
    ///
    /// Writing the value already stored is always allowed; it only raises
    /// the stored source.
    #[must_use]
    pub fn can_set(
        &self,
        name: AnnotationName,
        value: Option<&AnnotationValue>,
        source: ConfigurationSource,
    ) -> bool {
        match self.entries.get(&name) {
            None => true,
            Some(existing) if Some(&existing.value) == value => true,
            Some(existing) => source.overrides(Some(existing.source)),
        }
    }

    /// Write unconditionally. `None` removes the annotation.
    pub fn set(
        &mut self,
        name: AnnotationName,
        value: Option<AnnotationValue>,
        source: ConfigurationSource,
    ) {
        let Some(value) = value else {
            self.entries.remove(&name);
            tracing::trace!(annotation = %name, source = %source, "Removed annotation");
            return;
        };

        match self.entries.get_mut(&name) {
            Some(existing) if existing.value == value => {
                existing.source = source.max(Some(existing.source));
            }
            _ => {
                tracing::trace!(annotation = %name, source = %source, value = ?value, "Set annotation");
                self.entries.insert(name, Annotation { value, source });
            }
        }
    }

    /// Write only if `source` has enough precedence.
    pub fn try_set(
        &mut self,
        name: AnnotationName,
        value: Option<AnnotationValue>,
        source: ConfigurationSource,
    ) -> SetOutcome {
        if !self.can_set(name, value.as_ref(), source) {
            tracing::debug!(
                annotation = %name,
                existing = ?self.configuration_source(name),
                attempted = %source,
                "Annotation write rejected by configuration source precedence"
            );
            return SetOutcome::Rejected;
        }
        self.set(name, value, source);
        SetOutcome::Applied
    }

    /// Remove an annotation, returning it if present.
    pub fn remove(&mut self, name: AnnotationName) -> Option<Annotation> {
        self.entries.remove(&name)
    }

    /// Iterate in key order.
    pub fn iter(&self) -> impl Iterator<Item = (AnnotationName, &Annotation)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    /// Number of annotations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the bag is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
