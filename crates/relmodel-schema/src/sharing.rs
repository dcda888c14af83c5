//! Table sharing: resolving which property owns a shared column.
//!
//! When several entity types are stored in one table (table splitting,
//! owned types) they are linked by row-internal foreign keys. A column
//! shared along such a chain is configured on its topmost property, the
//! "root". Every walk here is bounded by [`MAX_ENTITY_TYPES_SHARING_TABLE`]
//! hops so a cyclic model still terminates.

use relmodel_core::{EntityTypeRef, Error, PropertyRef, Result, StoreObjectIdentifier};

use crate::entity_type::RelationalEntityType;
use crate::property::RelationalProperty;

/// Upper bound on the number of entity types linked through one table.
pub const MAX_ENTITY_TYPES_SHARING_TABLE: usize = 128;

fn hop_bound_reached(property: PropertyRef<'_>, store_object: &StoreObjectIdentifier) {
    tracing::warn!(
        target: "relmodel::sharing",
        property = property.name(),
        entity_type = %property.declaring_entity_type().display_name(),
        store_object = %store_object,
        hops = MAX_ENTITY_TYPES_SHARING_TABLE,
        "Row-internal foreign key chain exceeded the sharing bound; the model probably contains a cycle"
    );
}

/// The principal key property a primary-key property maps onto when its
/// entity type shares `store_object`, or `None` if it is its own root.
pub fn find_shared_object_root_primary_key_property<'a>(
    property: PropertyRef<'a>,
    store_object: &StoreObjectIdentifier,
) -> Option<PropertyRef<'a>> {
    if !property.is_primary_key() {
        return None;
    }

    let mut principal = property;
    let mut hops = 0;
    loop {
        let linking = principal
            .declaring_entity_type()
            .find_row_internal_foreign_keys(store_object)
            .into_iter()
            .next();
        let Some(linking) = linking else {
            break;
        };
        if hops == MAX_ENTITY_TYPES_SHARING_TABLE {
            hop_bound_reached(property, store_object);
            break;
        }
        let Some(index) = linking.properties().iter().position(|p| *p == principal) else {
            break;
        };
        let Some(next) = linking.principal_key().get(index).copied() else {
            break;
        };
        principal = next;
        hops += 1;
    }

    (principal != property).then_some(principal)
}

/// The topmost property mapped to the same column of `store_object`,
/// following row-internal foreign keys, or `None` if `property` is the root.
///
/// Fails with [`Error::PropertyNotMappedToTable`] if `property` has no column
/// in `store_object`.
pub fn find_shared_store_object_root_property<'a>(
    property: PropertyRef<'a>,
    store_object: &StoreObjectIdentifier,
) -> Result<Option<PropertyRef<'a>>> {
    let Some(column) = property.column_name_in(store_object) else {
        return Err(Error::PropertyNotMappedToTable {
            property: property.name().to_string(),
            entity_type: property.declaring_entity_type().display_name(),
            store_object: store_object.display_name(),
        });
    };

    let mut root = property;
    let mut entity_type = property.declaring_entity_type();
    let mut hops = 0;
    loop {
        let linked = entity_type
            .find_row_internal_foreign_keys(store_object)
            .into_iter()
            .flat_map(|fk| fk.principal_entity_type().properties())
            .find(|p| p.column_name_in(store_object).as_deref() == Some(column.as_str()));
        let Some(linked) = linked else {
            break;
        };
        if hops == MAX_ENTITY_TYPES_SHARING_TABLE {
            hop_bound_reached(property, store_object);
            break;
        }
        root = linked;
        entity_type = linked.declaring_entity_type();
        hops += 1;
    }

    Ok((root != property).then_some(root))
}

/// True if rows of `entity_type` may be absent while its principal's row
/// exists in the shared `store_object`, so its columns must be nullable.
pub fn is_optional_sharing_dependent(
    entity_type: EntityTypeRef<'_>,
    store_object: &StoreObjectIdentifier,
) -> bool {
    optional_sharing_dependent(entity_type, store_object, 0)
}

fn optional_sharing_dependent(
    entity_type: EntityTypeRef<'_>,
    store_object: &StoreObjectIdentifier,
    depth: usize,
) -> bool {
    if depth == MAX_ENTITY_TYPES_SHARING_TABLE {
        return true;
    }

    let mut optional: Option<bool> = None;
    for fk in entity_type.find_row_internal_foreign_keys(store_object) {
        optional = Some(
            optional.unwrap_or(true)
                && (!fk.is_required_dependent()
                    || optional_sharing_dependent(
                        fk.principal_entity_type(),
                        store_object,
                        depth + 1,
                    )),
        );
    }
    optional.unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity_type::RelationalEntityTypeMut;
    use crate::property::RelationalPropertyMut;
    use relmodel_core::{EntityTypeId, ForeignKeySpec, Model, PropertyId};
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Formatted log output collected from a scoped subscriber.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn with_captured_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .finish();
        let result = tracing::subscriber::with_default(subscriber, f);
        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        (result, output)
    }

    fn split_type(model: &mut Model, name: &str) -> (EntityTypeId, PropertyId, PropertyId) {
        let et = model.add_entity_type(name).unwrap();
        let id = model.add_property(et, "Id", false).unwrap();
        let value = model.add_property(et, "Value", false).unwrap();
        model.set_primary_key(et, &[id]).unwrap();
        model
            .entity_type_mut(et)
            .unwrap()
            .set_table_name(Some("Shared"))
            .unwrap();
        (et, id, value)
    }

    fn link(model: &mut Model, dependent: (EntityTypeId, PropertyId), principal: EntityTypeId, required: bool) {
        model
            .add_foreign_key(
                ForeignKeySpec::new(dependent.0, vec![dependent.1], principal)
                    .unique(true)
                    .required(true)
                    .required_dependent(required),
            )
            .unwrap();
    }

    fn shared() -> StoreObjectIdentifier {
        StoreObjectIdentifier::table("Shared", None)
    }

    #[test]
    fn test_roots_in_a_split_table() {
        let mut model = Model::new();
        let (order, order_id, order_value) = split_type(&mut model, "Order");
        let (details, details_id, details_value) = split_type(&mut model, "OrderDetails");
        link(&mut model, (details, details_id), order, true);

        let table = shared();
        let root = find_shared_object_root_primary_key_property(model.property(details_id), &table);
        assert_eq!(root.map(|p| p.id()), Some(order_id));
        assert_eq!(
            find_shared_store_object_root_property(model.property(details_value), &table)
                .unwrap()
                .map(|p| p.id()),
            Some(order_value)
        );
        assert_eq!(
            find_shared_store_object_root_property(model.property(order_value), &table).unwrap(),
            None
        );
    }

    #[test]
    fn test_unmapped_property_is_an_error() {
        let mut model = Model::new();
        let (_, _, value) = split_type(&mut model, "Order");
        let err = find_shared_store_object_root_property(
            model.property(value),
            &StoreObjectIdentifier::table("Other", None),
        )
        .unwrap_err();
        assert!(matches!(err, Error::PropertyNotMappedToTable { .. }));
    }

    #[test]
    fn test_cycle_terminates() {
        let mut model = Model::new();
        let (a, a_id, a_value) = split_type(&mut model, "A");
        let (b, b_id, _) = split_type(&mut model, "B");
        link(&mut model, (a, a_id), b, true);
        link(&mut model, (b, b_id), a, true);

        let table = shared();
        let root = find_shared_object_root_primary_key_property(model.property(a_id), &table);
        assert!(root.is_none_or(|p| p.is_primary_key()));
        assert!(find_shared_store_object_root_property(model.property(a_value), &table).is_ok());
        assert!(is_optional_sharing_dependent(model.entity_type(a), &table));
    }

    #[test]
    fn test_optional_dependent() {
        let mut model = Model::new();
        let (order, _, _) = split_type(&mut model, "Order");
        let (required, required_id, _) = split_type(&mut model, "Required");
        let (optional, optional_id, _) = split_type(&mut model, "Optional");
        let (nested, nested_id, _) = split_type(&mut model, "Nested");
        link(&mut model, (required, required_id), order, true);
        link(&mut model, (optional, optional_id), order, false);
        link(&mut model, (nested, nested_id), optional, true);

        let table = shared();
        assert!(!is_optional_sharing_dependent(model.entity_type(order), &table));
        assert!(!is_optional_sharing_dependent(model.entity_type(required), &table));
        assert!(is_optional_sharing_dependent(model.entity_type(optional), &table));
        assert!(is_optional_sharing_dependent(model.entity_type(nested), &table));
    }

    #[test]
    fn test_long_ownership_chain_stops_at_the_bound() {
        let mut model = Model::new();
        let mut chain: Vec<(EntityTypeId, PropertyId, PropertyId)> = Vec::new();
        for i in 0..MAX_ENTITY_TYPES_SHARING_TABLE + 2 {
            let link_type = split_type(&mut model, &format!("Link{i:03}"));
            model.property_mut(link_type.1).unwrap().set_column_name(Some("Id")).unwrap();
            model.property_mut(link_type.2).unwrap().set_column_name(Some("Value")).unwrap();
            if let Some(&(owner, _, _)) = chain.last() {
                model
                    .add_foreign_key(
                        ForeignKeySpec::new(link_type.0, vec![link_type.1], owner)
                            .unique(true)
                            .required_dependent(true)
                            .ownership("Next"),
                    )
                    .unwrap();
            }
            chain.push(link_type);
        }

        let table = shared();
        let (_, last_id, last_value) = chain[MAX_ENTITY_TYPES_SHARING_TABLE + 1];
        let (_, second_id, second_value) = chain[1];

        let (root, logs) = with_captured_logs(|| {
            find_shared_store_object_root_property(model.property(last_value), &table)
                .unwrap()
                .map(|p| p.id())
        });
        assert_eq!(root, Some(second_value));
        assert!(logs.contains("exceeded the sharing bound"), "{logs}");
        assert!(logs.contains("Link129"), "{logs}");

        let (root, logs) = with_captured_logs(|| {
            find_shared_object_root_primary_key_property(model.property(last_id), &table)
                .map(|p| p.id())
        });
        assert_eq!(root, Some(second_id));
        assert!(logs.contains("exceeded the sharing bound"), "{logs}");

        let (_, first_id, first_value) = chain[0];
        let (_, mid_id, mid_value) = chain[MAX_ENTITY_TYPES_SHARING_TABLE];
        let (root, logs) = with_captured_logs(|| {
            find_shared_store_object_root_property(model.property(mid_value), &table)
                .unwrap()
                .map(|p| p.id())
        });
        assert_eq!(root, Some(first_value));
        assert!(logs.is_empty(), "{logs}");
        assert_eq!(
            find_shared_object_root_primary_key_property(model.property(mid_id), &table)
                .map(|p| p.id()),
            Some(first_id)
        );
    }
}
