//! An in-memory [`Adapter`] implementation, the reference store used by this
//! crate's own test suite: the simplest concrete adapter, kept in the open
//! so application code has a working example to read.

use std::collections::HashSet;

use thiserror::Error;

use crate::adapter::{Adapter, ModelDefinition, SchemaMaster};
use crate::hash::{Describe, HashValue};

/// Failure modes of [`MemoryStore`]. Kept small since there is no real I/O
/// to fail on; the only way this store can fail is a caller violating the
/// adapter contract (creating something that already exists).
#[derive(Debug, Error)]
pub enum MockError {
    #[error("table `{0}` already exists")]
    TableAlreadyExists(String),
    #[error("schema-master table already exists")]
    SchemaMasterAlreadyExists,
}

/// One entity known to [`MemoryStore`]: a table name and the structural
/// description the identity hasher digests.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Entity {
    pub table_name: String,
}

impl Entity {
    pub fn new(table_name: impl Into<String>) -> Entity {
        Entity {
            table_name: table_name.into(),
        }
    }
}

/// A `HashMap`-backed store with no persistence and no I/O, standing in for
/// a real relational adapter in tests and documentation examples.
#[derive(Default)]
pub struct MemoryStore {
    tables: HashSet<String>,
    schema_master: Option<Vec<SchemaMaster>>,
    models: std::collections::HashMap<String, Box<dyn Describe>>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("tables", &self.tables)
            .field("schema_master", &self.schema_master)
            .field("models", &self.models.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore {
            tables: HashSet::new(),
            schema_master: None,
            models: std::collections::HashMap::new(),
        }
    }

    /// Registers the model description returned for an entity by
    /// [`Adapter::model_definition`], via its [`Describe`] implementation.
    /// Entities with no registered model describe themselves as
    /// [`HashValue::Unit`].
    pub fn describe(&mut self, table_name: impl Into<String>, model: impl Describe + 'static) {
        self.models.insert(table_name.into(), Box::new(model));
    }
}

impl Adapter<Entity> for MemoryStore {
    type Underlying = MemoryStore;
    type Error = MockError;

    fn has_table(&mut self, entity: &Entity) -> Result<bool, MockError> {
        Ok(self.tables.contains(&entity.table_name))
    }

    fn create_tables(&mut self, entities: &[&Entity]) -> Result<(), MockError> {
        for entity in entities {
            if self.tables.contains(&entity.table_name) {
                return Err(MockError::TableAlreadyExists(entity.table_name.clone()));
            }
        }
        for entity in entities {
            self.tables.insert(entity.table_name.clone());
        }
        Ok(())
    }

    fn drop_tables(&mut self, entities: &[&Entity]) -> Result<(), MockError> {
        for entity in entities {
            self.tables.remove(&entity.table_name);
        }
        Ok(())
    }

    fn model_definition(&mut self, entity: &Entity) -> Result<ModelDefinition, MockError> {
        let entity_model = self
            .models
            .get(&entity.table_name)
            .map(|model| model.describe())
            .unwrap_or(HashValue::Unit);
        Ok(ModelDefinition {
            table_name: entity.table_name.clone(),
            entity_model,
        })
    }

    fn has_schema_master_table(&mut self) -> Result<bool, MockError> {
        Ok(self.schema_master.is_some())
    }

    fn create_schema_master_table(&mut self) -> Result<(), MockError> {
        if self.schema_master.is_some() {
            return Err(MockError::SchemaMasterAlreadyExists);
        }
        self.schema_master = Some(Vec::new());
        Ok(())
    }

    fn drop_schema_master_table(&mut self) -> Result<(), MockError> {
        self.schema_master = None;
        Ok(())
    }

    fn truncate_schema_master_table(&mut self) -> Result<(), MockError> {
        if let Some(rows) = &mut self.schema_master {
            rows.clear();
        }
        Ok(())
    }

    fn insert_schema_master_row(&mut self, row: &SchemaMaster) -> Result<(), MockError> {
        self.schema_master
            .get_or_insert_with(Vec::new)
            .push(row.clone());
        Ok(())
    }

    fn latest_schema_master(&mut self) -> Result<Option<SchemaMaster>, MockError> {
        Ok(self
            .schema_master
            .as_ref()
            .and_then(|rows| rows.iter().max_by_key(|r| r.version).cloned()))
    }

    fn in_transaction<T, Err, F>(&mut self, f: F) -> Result<T, Err>
    where
        Err: From<MockError>,
        F: FnOnce(&mut Self) -> Result<T, Err>,
    {
        let snapshot = (self.tables.clone(), self.schema_master.clone());
        match f(self) {
            Ok(value) => Ok(value),
            Err(e) => {
                (self.tables, self.schema_master) = snapshot;
                Err(e)
            }
        }
    }

    fn underlying(&mut self) -> &mut MemoryStore {
        self
    }
}
