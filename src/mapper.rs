//! Mapping change events to write operations.
//!
//! A mapper is a pure function from one change event to zero or more
//! operations. Any `Fn(&ChangeEvent) -> Vec<Operation>` closure is a mapper;
//! [`TableMapper`] is the default used when the integrator does not supply one.

use std::collections::HashMap;

use log::debug;

use crate::config::CollectionTableMapping;
use crate::event::{ChangeEvent, EventKind};
use crate::model::{Delete, Model, Operation, SqlValue, Upsert};

/// Turns a change event into the operations that apply it to the store.
pub trait Mapper: Send + Sync {
    fn map(&self, event: &ChangeEvent) -> Vec<Operation>;
}

impl<F> Mapper for F
where
    F: Fn(&ChangeEvent) -> Vec<Operation> + Send + Sync,
{
    fn map(&self, event: &ChangeEvent) -> Vec<Operation> {
        self(event)
    }
}

/// Default mapper driven by a collection-to-table lookup.
///
/// - mutation: upsert of the document key and body into the mapped table,
///   keyed on the key column (which needs a unique index or primary key)
/// - expiration, deletion: delete by key from the mapped table
/// - collection without a mapping: no operations
///
/// The lookup is built once and never changes afterwards.
#[derive(Debug, Clone, Default)]
pub struct TableMapper {
    tables: HashMap<String, CollectionTableMapping>,
}

impl TableMapper {
    pub fn new(mappings: &[CollectionTableMapping]) -> Self {
        let tables = mappings
            .iter()
            .map(|m| (m.collection.clone(), m.clone()))
            .collect();
        TableMapper { tables }
    }

    pub fn table_for(&self, collection: &str) -> Option<&CollectionTableMapping> {
        self.tables.get(collection)
    }
}

impl Mapper for TableMapper {
    fn map(&self, event: &ChangeEvent) -> Vec<Operation> {
        let Some(mapping) = self.table_for(&event.collection_name) else {
            debug!(
                "No table mapping for collection '{}', skipping key {}",
                event.collection_name,
                event.key_str()
            );
            return Vec::new();
        };

        let key = SqlValue::Text(event.key_str().into_owned());
        let operation = match event.kind {
            EventKind::Mutation => {
                let body = event
                    .value
                    .as_deref()
                    .map(|v| String::from_utf8_lossy(v).into_owned());
                Upsert {
                    table: mapping.table_name.clone(),
                    columns: vec![
                        mapping.key_column_name.clone(),
                        mapping.value_column_name.clone(),
                    ],
                    values: vec![key, body.into()],
                    conflict_columns: vec![mapping.key_column_name.clone()],
                }
                .to_operation()
            }
            EventKind::Expiration | EventKind::Deletion => Delete {
                table: mapping.table_name.clone(),
                key_column: mapping.key_column_name.clone(),
                key,
            }
            .to_operation(),
        };

        vec![operation]
    }
}
