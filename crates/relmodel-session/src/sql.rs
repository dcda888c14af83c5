//! Raw SQL commands and parameter substitution.
//!
//! Raw SQL names its arguments with `{0}`, `{1}`, ... placeholders. Building a
//! [`RawSqlCommand`] swaps every placeholder for a parameter marker and
//! collects the parameter values, so argument values never reach the SQL text.
//! `{{` and `}}` stand for literal braces.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use relmodel_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// A value bound to a command parameter.
pub type ParameterValue = serde_json::Value;

/// Marker placed before generated parameter names.
pub const DEFAULT_PARAMETER_MARKER: &str = "@";

fn placeholder_pattern() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{|\}\}|\{(\d+)\}").expect("placeholder pattern is valid")
    })
}

/// A named command parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlParameter {
    pub name: String,
    pub value: ParameterValue,
}

impl SqlParameter {
    pub fn new(name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One argument of a raw SQL command.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlArgument {
    /// Bound to a generated parameter named after its position.
    Value(ParameterValue),
    /// Bound under its own name.
    Parameter(SqlParameter),
}

impl SqlArgument {
    pub fn value(value: impl Into<ParameterValue>) -> Self {
        SqlArgument::Value(value.into())
    }
}

impl From<ParameterValue> for SqlArgument {
    fn from(value: ParameterValue) -> Self {
        SqlArgument::Value(value)
    }
}

impl From<SqlParameter> for SqlArgument {
    fn from(parameter: SqlParameter) -> Self {
        SqlArgument::Parameter(parameter)
    }
}

/// SQL text with its parameters, ready for a connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawSqlCommand {
    sql: String,
    parameters: Vec<SqlParameter>,
}

impl RawSqlCommand {
    /// Build a command using [`DEFAULT_PARAMETER_MARKER`].
    pub fn build(sql: &str, arguments: Vec<SqlArgument>) -> Result<Self> {
        Self::build_with_marker(sql, arguments, DEFAULT_PARAMETER_MARKER)
    }

    /// Replace the placeholders of `sql` with `marker` followed by the
    /// parameter name. Positional values are named `p0`, `p1`, ...
    pub fn build_with_marker(
        sql: &str,
        arguments: Vec<SqlArgument>,
        marker: &str,
    ) -> Result<Self> {
        if sql.trim().is_empty() {
            return Err(Error::invalid_argument(
                "sql",
                "the string argument cannot be empty",
            ));
        }

        let parameters: Vec<SqlParameter> = arguments
            .into_iter()
            .enumerate()
            .map(|(index, argument)| match argument {
                SqlArgument::Value(value) => SqlParameter::new(format!("p{index}"), value),
                SqlArgument::Parameter(parameter) => parameter,
            })
            .collect();

        let mut missing = None;
        let text = placeholder_pattern().replace_all(sql, |caps: &Captures<'_>| {
            let Some(index) = caps.get(1) else {
                return caps[0][..1].to_string();
            };
            let parameter = index
                .as_str()
                .parse::<usize>()
                .ok()
                .and_then(|index| parameters.get(index));
            match parameter {
                Some(parameter) => format!("{marker}{}", parameter.name),
                None => {
                    if missing.is_none() {
                        missing = Some(index.as_str().to_string());
                    }
                    String::new()
                }
            }
        });

        if let Some(index) = missing {
            return Err(Error::invalid_argument(
                "sql",
                format!(
                    "placeholder {{{index}}} has no argument; {} were supplied",
                    parameters.len()
                ),
            ));
        }

        Ok(Self {
            sql: text.into_owned(),
            parameters,
        })
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub fn parameters(&self) -> &[SqlParameter] {
        &self.parameters
    }
}

/// SQL assembled from literal fragments and values.
///
/// ```ignore
/// let sql = InterpolatedSql::new()
///     .sql("UPDATE Orders SET Total = ")
///     .value(json!(10))
///     .sql(" WHERE Id = ")
///     .value(json!(7));
/// facade.execute_sql_interpolated(&cx, sql).await;
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterpolatedSql {
    format: String,
    arguments: Vec<SqlArgument>,
}

impl InterpolatedSql {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append literal SQL.
    #[must_use]
    pub fn sql(mut self, fragment: &str) -> Self {
        self.format
            .push_str(&fragment.replace('{', "{{").replace('}', "}}"));
        self
    }

    /// Append a value that is sent as a parameter.
    #[must_use]
    pub fn value(mut self, argument: impl Into<SqlArgument>) -> Self {
        self.format
            .push_str(&format!("{{{}}}", self.arguments.len()));
        self.arguments.push(argument.into());
        self
    }

    /// The placeholder form of the SQL.
    #[must_use]
    pub fn format(&self) -> &str {
        &self.format
    }

    #[must_use]
    pub fn arguments(&self) -> &[SqlArgument] {
        &self.arguments
    }

    pub fn into_parts(self) -> (String, Vec<SqlArgument>) {
        (self.format, self.arguments)
    }
}
