//! The storage-adapter contract the core consumes to interact with the
//! backing store. Concrete implementations (a real relational store) live
//! outside this crate; see [`crate::mock`] for the reference implementation
//! used by the test suite.

use crate::hash::HashValue;
use crate::version::Version;

/// The single-row metadata record persisted by the core.
#[derive(Clone, Debug, PartialEq)]
pub struct SchemaMaster {
    pub version: Version,
    pub identity_hash: String,
}

/// What the adapter knows about one entity: its table name, and a
/// structural description the identity hasher can digest.
#[derive(Clone, Debug)]
pub struct ModelDefinition {
    pub table_name: String,
    pub entity_model: HashValue,
}

/// Capability set the core requires from the backing store, generic over
/// the application's opaque entity handle type `E`. Implementations must
/// never panic; every operation returns a `Result`.
///
/// The schema-master table is modeled with its own methods rather than
/// folded into the generic entity ones: it is not a value of `E`, it is a
/// table the core itself owns exclusively and applications must not write
/// to directly.
pub trait Adapter<E> {
    /// Opaque handle passed uninterpreted to user migration callbacks.
    type Underlying;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Does the store already contain a table for this entity?
    fn has_table(&mut self, entity: &E) -> Result<bool, Self::Error>;

    /// Create tables for the given entities. Errors if any already exists.
    fn create_tables(&mut self, entities: &[&E]) -> Result<(), Self::Error>;

    /// Drop tables for the given entities.
    fn drop_tables(&mut self, entities: &[&E]) -> Result<(), Self::Error>;

    /// Return `{table_name, entity_model}` for one entity.
    fn model_definition(&mut self, entity: &E) -> Result<ModelDefinition, Self::Error>;

    /// Does the schema-master table already exist?
    fn has_schema_master_table(&mut self) -> Result<bool, Self::Error>;

    /// Create the schema-master table. Errors if it already exists.
    fn create_schema_master_table(&mut self) -> Result<(), Self::Error>;

    /// Drop the schema-master table.
    fn drop_schema_master_table(&mut self) -> Result<(), Self::Error>;

    /// Remove all rows from the schema-master table.
    fn truncate_schema_master_table(&mut self) -> Result<(), Self::Error>;

    /// Insert a schema-master row.
    fn insert_schema_master_row(&mut self, row: &SchemaMaster) -> Result<(), Self::Error>;

    /// The highest-version schema-master row, or `Ok(None)` if the table is
    /// empty. Only called once [`Adapter::has_schema_master_table`] has
    /// confirmed the table exists.
    fn latest_schema_master(&mut self) -> Result<Option<SchemaMaster>, Self::Error>;

    /// Execute `f` atomically: any error returned by `f` rolls the attempt
    /// back, a successful return commits it. Generic over `f`'s error type
    /// so a caller can fold in errors that aren't `Self::Error` (e.g. a
    /// user migration callback's own error type) as long as they can be
    /// built `From<Self::Error>` for the adapter's own failures.
    fn in_transaction<T, Err, F>(&mut self, f: F) -> Result<T, Err>
    where
        Err: From<Self::Error>,
        F: FnOnce(&mut Self) -> Result<T, Err>;

    /// Opaque handle handed to user migration callbacks; the core never
    /// dereferences it.
    fn underlying(&mut self) -> &mut Self::Underlying;
}
