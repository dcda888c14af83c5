//! Property and per-store-object column builders.

use relmodel_core::{
    AnnotationValue, Model, PropertyId, PropertyMut, Result, StoreObjectIdentifier,
};
use relmodel_schema::RelationalPropertyMut;

/// Configures one property.
///
/// ```ignore
/// order
///     .property("Price")?
///     .has_column_type(Some("decimal(18,2)"))?
///     .has_precision(18, Some(2))?;
/// ```
#[derive(Debug)]
pub struct PropertyBuilder<'a> {
    model: &'a mut Model,
    id: PropertyId,
}

impl<'a> PropertyBuilder<'a> {
    pub(crate) fn new(model: &'a mut Model, id: PropertyId) -> Self {
        Self { model, id }
    }

    #[must_use]
    pub const fn id(&self) -> PropertyId {
        self.id
    }

    fn property(&mut self) -> Result<PropertyMut<'_>> {
        self.model.property_mut(self.id)
    }

    /// A required property maps to a non-nullable column.
    pub fn is_required(&mut self, required: bool) -> Result<&mut Self> {
        self.property()?.set_nullable(!required);
        Ok(self)
    }

    pub fn has_column_name(&mut self, name: Option<&str>) -> Result<&mut Self> {
        self.property()?.set_column_name(name)?;
        Ok(self)
    }

    pub fn has_column_order(&mut self, order: Option<i32>) -> Result<&mut Self> {
        self.property()?.set_column_order(order)?;
        Ok(self)
    }

    pub fn has_column_type(&mut self, column_type: Option<&str>) -> Result<&mut Self> {
        self.property()?.set_column_type(column_type)?;
        Ok(self)
    }

    pub fn is_fixed_length(&mut self, fixed_length: bool) -> Result<&mut Self> {
        self.property()?.set_is_fixed_length(Some(fixed_length))?;
        Ok(self)
    }

    pub fn has_default_value(&mut self, value: Option<AnnotationValue>) -> Result<&mut Self> {
        self.property()?.set_default_value(value)?;
        Ok(self)
    }

    pub fn has_default_value_sql(&mut self, sql: Option<&str>) -> Result<&mut Self> {
        self.property()?.set_default_value_sql(sql)?;
        Ok(self)
    }

    /// Compute the column in the database. `stored` persists the value.
    pub fn has_computed_column_sql(
        &mut self,
        sql: Option<&str>,
        stored: Option<bool>,
    ) -> Result<&mut Self> {
        let mut property = self.property()?;
        property.set_computed_column_sql(sql)?;
        property.set_is_stored(stored)?;
        Ok(self)
    }

    pub fn has_comment(&mut self, comment: Option<&str>) -> Result<&mut Self> {
        self.property()?.set_comment(comment)?;
        Ok(self)
    }

    pub fn use_collation(&mut self, collation: Option<&str>) -> Result<&mut Self> {
        self.property()?.set_collation(collation)?;
        Ok(self)
    }

    /// Key used for the property inside a JSON document.
    pub fn has_json_property_name(&mut self, name: Option<&str>) -> Result<&mut Self> {
        self.property()?.set_json_property_name(name)?;
        Ok(self)
    }

    pub fn has_max_length(&mut self, max_length: Option<usize>) -> Result<&mut Self> {
        self.property()?.set_max_length(max_length)?;
        Ok(self)
    }

    pub fn has_precision(&mut self, precision: usize, scale: Option<usize>) -> Result<&mut Self> {
        let mut property = self.property()?;
        property.set_precision(Some(precision))?;
        property.set_scale(scale)?;
        Ok(self)
    }

    pub fn is_unicode(&mut self, unicode: bool) -> Result<&mut Self> {
        self.property()?.set_is_unicode(Some(unicode))?;
        Ok(self)
    }
}

/// Configures a property's column in one table, view or split table.
#[derive(Debug)]
pub struct ColumnBuilder<'a> {
    model: &'a mut Model,
    id: PropertyId,
    store_object: StoreObjectIdentifier,
}

impl<'a> ColumnBuilder<'a> {
    /// Open the column of `id` in `store_object`, recording that the
    /// property is mapped there.
    pub(crate) fn open(
        model: &'a mut Model,
        id: PropertyId,
        store_object: StoreObjectIdentifier,
    ) -> Result<Self> {
        model.property_mut(id)?.overrides_mut(&store_object);
        Ok(Self {
            model,
            id,
            store_object,
        })
    }

    #[must_use]
    pub fn store_object(&self) -> &StoreObjectIdentifier {
        &self.store_object
    }

    fn property(&mut self) -> Result<PropertyMut<'_>> {
        self.model.property_mut(self.id)
    }

    pub fn has_column_name(&mut self, name: Option<&str>) -> Result<&mut Self> {
        let store_object = self.store_object.clone();
        self.property()?.set_column_name_in(&store_object, name)?;
        Ok(self)
    }

    pub fn has_column_type(&mut self, column_type: Option<&str>) -> Result<&mut Self> {
        let store_object = self.store_object.clone();
        self.property()?.set_column_type_in(&store_object, column_type)?;
        Ok(self)
    }

    pub fn is_fixed_length(&mut self, fixed_length: bool) -> Result<&mut Self> {
        let store_object = self.store_object.clone();
        self.property()?
            .set_is_fixed_length_in(&store_object, Some(fixed_length))?;
        Ok(self)
    }

    pub fn has_default_value(&mut self, value: Option<AnnotationValue>) -> Result<&mut Self> {
        let store_object = self.store_object.clone();
        self.property()?.set_default_value_in(&store_object, value)?;
        Ok(self)
    }

    pub fn has_default_value_sql(&mut self, sql: Option<&str>) -> Result<&mut Self> {
        let store_object = self.store_object.clone();
        self.property()?.set_default_value_sql_in(&store_object, sql)?;
        Ok(self)
    }

    pub fn has_computed_column_sql(
        &mut self,
        sql: Option<&str>,
        stored: Option<bool>,
    ) -> Result<&mut Self> {
        let store_object = self.store_object.clone();
        let mut property = self.property()?;
        property.set_computed_column_sql_in(&store_object, sql)?;
        property.set_is_stored_in(&store_object, stored)?;
        Ok(self)
    }

    pub fn has_comment(&mut self, comment: Option<&str>) -> Result<&mut Self> {
        let store_object = self.store_object.clone();
        self.property()?.set_comment_in(&store_object, comment)?;
        Ok(self)
    }

    pub fn use_collation(&mut self, collation: Option<&str>) -> Result<&mut Self> {
        let store_object = self.store_object.clone();
        self.property()?.set_collation_in(&store_object, collation)?;
        Ok(self)
    }
}
