//! Typed get/set plumbing shared by every relational accessor trait.
//!
//! A facet is one annotation on one metadata object. Each accessor trait
//! declares its facets with [`annotation_facets!`], which expands to four
//! default methods per facet: an explicit setter, a precedence-gated
//! `try_` setter, a `can_` predicate and a configuration-source getter.

use relmodel_core::identifiers;
use relmodel_core::{
    AnnotationName, AnnotationValue, Annotations, CheckConstraint, ConfigurationSource,
    EntityTypeMut, MappingFragment, Model, PropertyMut, PropertyOverrides, Result, SetOutcome,
    StoredProcedure, StoredProcedureParameter, StoredProcedureResultColumn, Trigger,
};

/// Anything that carries an annotation bag.
pub trait Annotatable {
    fn annotation_store(&self) -> &Annotations;

    /// Mutable bag; fails if the owning model is read-only.
    fn annotation_store_mut(&mut self) -> Result<&mut Annotations>;
}

impl Annotatable for Model {
    fn annotation_store(&self) -> &Annotations {
        self.annotations()
    }

    fn annotation_store_mut(&mut self) -> Result<&mut Annotations> {
        self.annotations_mut()
    }
}

impl Annotatable for EntityTypeMut<'_> {
    fn annotation_store(&self) -> &Annotations {
        self.as_ref().annotations()
    }

    fn annotation_store_mut(&mut self) -> Result<&mut Annotations> {
        Ok(self.annotations_mut())
    }
}

impl Annotatable for PropertyMut<'_> {
    fn annotation_store(&self) -> &Annotations {
        self.as_ref().annotations()
    }

    fn annotation_store_mut(&mut self) -> Result<&mut Annotations> {
        Ok(self.annotations_mut())
    }
}

macro_rules! impl_annotatable {
    ($($type:ty),* $(,)?) => {
        $(
            impl Annotatable for $type {
                fn annotation_store(&self) -> &Annotations {
                    self.annotations()
                }

                fn annotation_store_mut(&mut self) -> Result<&mut Annotations> {
                    Ok(self.annotations_mut())
                }
            }
        )*
    };
}

impl_annotatable!(
    CheckConstraint,
    Trigger,
    StoredProcedure,
    StoredProcedureParameter,
    StoredProcedureResultColumn,
    MappingFragment,
    PropertyOverrides,
);

/// A Rust value that can be stored as a facet.
pub trait FacetValue {
    /// Validate and convert. `argument` names the value in errors.
    fn into_annotation(self, argument: &'static str) -> Result<AnnotationValue>;
}

impl FacetValue for &str {
    fn into_annotation(self, argument: &'static str) -> Result<AnnotationValue> {
        identifiers::check_null_but_not_empty(Some(self), argument)?;
        Ok(AnnotationValue::Text(self.to_string()))
    }
}

impl FacetValue for AnnotationValue {
    fn into_annotation(self, _argument: &'static str) -> Result<AnnotationValue> {
        Ok(self)
    }
}

macro_rules! impl_facet_value {
    ($($type:ty),* $(,)?) => {
        $(
            impl FacetValue for $type {
                fn into_annotation(self, _argument: &'static str) -> Result<AnnotationValue> {
                    Ok(self.into())
                }
            }
        )*
    };
}

impl_facet_value!(bool, i32, i64);

impl FacetValue for usize {
    fn into_annotation(self, argument: &'static str) -> Result<AnnotationValue> {
        i64::try_from(self)
            .map(AnnotationValue::Int)
            .map_err(|_| relmodel_core::Error::invalid_argument(argument, "value is out of range"))
    }
}

/// Write unconditionally at explicit precedence. `None` removes.
pub fn set_facet<V: FacetValue>(
    annotations: &mut Annotations,
    name: AnnotationName,
    value: Option<V>,
    argument: &'static str,
) -> Result<()> {
    let value = value.map(|v| v.into_annotation(argument)).transpose()?;
    annotations.set(name, value, ConfigurationSource::Explicit);
    Ok(())
}

/// Write at convention or data-annotation precedence.
pub fn try_set_facet<V: FacetValue>(
    annotations: &mut Annotations,
    name: AnnotationName,
    value: Option<V>,
    from_data_annotation: bool,
    argument: &'static str,
) -> Result<SetOutcome> {
    let value = value.map(|v| v.into_annotation(argument)).transpose()?;
    Ok(annotations.try_set(
        name,
        value,
        ConfigurationSource::from_data_annotation(from_data_annotation),
    ))
}

/// Whether [`try_set_facet`] would apply. Invalid values can never be set.
pub fn can_set_facet<V: FacetValue>(
    annotations: &Annotations,
    name: AnnotationName,
    value: Option<V>,
    from_data_annotation: bool,
) -> bool {
    match value.map(|v| v.into_annotation("value")).transpose() {
        Ok(value) => annotations.can_set(
            name,
            value.as_ref(),
            ConfigurationSource::from_data_annotation(from_data_annotation),
        ),
        Err(_) => false,
    }
}

/// Declare facet accessors as default trait methods over [`Annotatable`].
///
/// ```ignore
/// annotation_facets! {
///     /// Comment on the table.
///     comment: &str => AnnotationName::Comment,
///         set_comment, try_set_comment, can_set_comment, comment_configuration_source;
/// }
/// ```
macro_rules! annotation_facets {
    ($(
        $(#[$doc:meta])*
        $argument:ident : $ty:ty => $name:expr,
            $set:ident, $try_set:ident, $can_set:ident, $source:ident;
    )*) => {
        $(
            $(#[$doc])*
            fn $set(&mut self, value: Option<$ty>) -> relmodel_core::Result<()> {
                $crate::facet::set_facet(
                    self.annotation_store_mut()?,
                    $name,
                    value,
                    stringify!($argument),
                )
            }

            /// Convention-stage write gated by configuration-source precedence.
            fn $try_set(
                &mut self,
                value: Option<$ty>,
                from_data_annotation: bool,
            ) -> relmodel_core::Result<relmodel_core::SetOutcome> {
                $crate::facet::try_set_facet(
                    self.annotation_store_mut()?,
                    $name,
                    value,
                    from_data_annotation,
                    stringify!($argument),
                )
            }

            #[must_use]
            fn $can_set(&self, value: Option<$ty>, from_data_annotation: bool) -> bool {
                $crate::facet::can_set_facet(self.annotation_store(), $name, value, from_data_annotation)
            }

            #[must_use]
            fn $source(&self) -> Option<relmodel_core::ConfigurationSource> {
                self.annotation_store().configuration_source($name)
            }
        )*
    };
}

pub(crate) use annotation_facets;
