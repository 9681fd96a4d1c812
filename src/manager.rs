//! The public facade: [`Manager`] and its [`Manager::initialize`] entry
//! point, implementing the create / verify / migrate / destructive-rebuild
//! decision procedure.

use std::fmt;

use crate::adapter::{Adapter, SchemaMaster};
use crate::error::{Error, Kind, WrapStoreError};
use crate::hash::{self, Hasher, Sha256Hasher};
use crate::planner::{self, Step};
use crate::version::Version;

type StepError = Box<dyn std::error::Error + Send + Sync>;

/// A user-supplied migration: bridges `base` to `target` by running `apply`
/// against the adapter's underlying handle.
pub struct MigrationStep<U> {
    base: Version,
    target: Version,
    apply: Box<dyn Fn(&mut U) -> Result<(), StepError> + Send + Sync>,
}

impl<U> fmt::Debug for MigrationStep<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MigrationStep({} -> {})", self.base, self.target)
    }
}

impl<U> MigrationStep<U> {
    /// Build a migration step. `base == target` is rejected.
    pub fn new(
        base: Version,
        target: Version,
        apply: impl Fn(&mut U) -> Result<(), StepError> + Send + Sync + 'static,
    ) -> Result<MigrationStep<U>, Error> {
        if base == target {
            return Err(Error::new(Kind::InvalidConfiguration(format!(
                "migration step base and target must differ, got {base}"
            ))));
        }
        Ok(MigrationStep {
            base,
            target,
            apply: Box::new(apply),
        })
    }

    pub fn base(&self) -> Version {
        self.base
    }

    pub fn target(&self) -> Version {
        self.target
    }
}

impl<U> Step for MigrationStep<U> {
    fn base(&self) -> Version {
        self.base
    }

    fn target(&self) -> Version {
        self.target
    }
}

/// The core object: owns the entity and migration lists by value, shares
/// the adapter and hasher with the caller.
pub struct Manager<E, A, H = Sha256Hasher>
where
    A: Adapter<E>,
{
    entities: Vec<E>,
    version: Version,
    migrations: Vec<MigrationStep<A::Underlying>>,
    adapter: A,
    hasher: H,
}

impl<E, A> Manager<E, A, Sha256Hasher>
where
    A: Adapter<E>,
{
    /// Construct a `Manager` using the default SHA-256 identity hasher.
    pub fn new(
        entities: Vec<E>,
        adapter: A,
        version: u32,
        migrations: Vec<MigrationStep<A::Underlying>>,
    ) -> Result<Manager<E, A, Sha256Hasher>, Vec<Error>> {
        Manager::with_hasher(entities, adapter, version, migrations, Sha256Hasher)
    }
}

impl<E, A, H> Manager<E, A, H>
where
    A: Adapter<E>,
    H: Hasher,
{
    /// Construct a `Manager` with an explicit identity hasher. Validation
    /// errors accumulate rather than short-circuit.
    pub fn with_hasher(
        entities: Vec<E>,
        adapter: A,
        version: u32,
        migrations: Vec<MigrationStep<A::Underlying>>,
        hasher: H,
    ) -> Result<Manager<E, A, H>, Vec<Error>> {
        let mut errors = Vec::new();

        if entities.is_empty() {
            errors.push(Error::new(Kind::InvalidConfiguration(
                "at least one entity is required".into(),
            )));
        }

        let version = Version::new(version).or_else(|| {
            errors.push(Error::new(Kind::InvalidConfiguration(
                "only non-zero versions are allowed".into(),
            )));
            None
        });

        match version {
            Some(version) if errors.is_empty() => Ok(Manager {
                entities,
                version,
                migrations,
                adapter,
                hasher,
            }),
            _ => Err(errors),
        }
    }

    /// Computes the current identity hash of the entity set without
    /// touching the store.
    pub fn current_identity_hash(&mut self) -> Result<String, Error> {
        let mut models = Vec::with_capacity(self.entities.len());
        for (idx, entity) in self.entities.iter().enumerate() {
            let model = self
                .adapter
                .model_definition(entity)
                .map_err(|e| hash_failure(idx, e))?;
            models.push(model);
        }

        let hasher = &self.hasher;
        let pairs = models
            .iter()
            .map(|m| (m.table_name.as_str(), m.entity_model.clone()));
        Ok(hash::identity_of_entities(pairs, &|v| hasher.hash(v)))
    }

    /// Reads the highest-version schema-master row currently stored,
    /// without running the decision procedure (ops/diagnostic use).
    pub fn stored_schema(&mut self) -> Result<Option<SchemaMaster>, Error> {
        if !self.adapter.has_schema_master_table().store_err()? {
            return Ok(None);
        }
        self.adapter.latest_schema_master().store_err()
    }

    /// Runs the destructive clean-up transaction on its own, without the
    /// automatic retry wiring of `initialize`.
    pub fn reset(&mut self) -> Result<(), Error> {
        self.cleanup()
            .map_err(|e| Error::new(Kind::CleanupFailure(Box::new(e))))
    }

    fn cleanup(&mut self) -> Result<(), A::Error> {
        let entities = &self.entities;
        self.adapter.in_transaction(|adapter| {
            for entity in entities {
                if adapter.has_table(entity)? {
                    adapter.drop_tables(&[entity])?;
                }
            }
            if adapter.has_schema_master_table()? {
                adapter.drop_schema_master_table()?;
            }
            Ok(())
        })
    }

    /// The entry point: decide between create / verify / migrate, and
    /// optionally retry once with a destructive rebuild.
    pub fn initialize(&mut self, fallback_destructive: bool) -> Result<(), Error> {
        let current_hash = self.current_identity_hash()?;

        let (should_retry, result) = self.try_init(&current_hash);
        if result.is_ok() || !should_retry || !fallback_destructive {
            if result.is_ok() {
                log::info!("schema-guard: initialized at version {}", self.version);
            } else {
                log::warn!("schema-guard: initialize failed and no fallback applies");
            }
            return result;
        }

        log::warn!(
            "schema-guard: first attempt failed, retrying with destructive fallback"
        );
        self.cleanup()
            .map_err(|e| Error::new(Kind::CleanupFailure(Box::new(e))))?;

        let (_, result) = self.try_init(&current_hash);
        result
    }

    /// The branch decision at the heart of `initialize`: returns whether a
    /// destructive retry is warranted alongside the attempt's result.
    fn try_init(&mut self, current_hash: &str) -> (bool, Result<(), Error>) {
        let has_master = match self.adapter.has_schema_master_table().store_err() {
            Ok(v) => v,
            Err(e) => return (true, Err(e)),
        };

        if !has_master {
            log::info!("schema-guard: no schema-master table, creating fresh database");
            return match self.create_fresh(current_hash) {
                Ok(()) => (false, Ok(())),
                Err(e) => (true, Err(e)),
            };
        }

        let stored = match self.adapter.latest_schema_master() {
            Ok(Some(row)) => row,
            Ok(None) => {
                return (
                    true,
                    Err(Error::new(Kind::MetadataReadFailure(Box::new(
                        MissingMetadata,
                    )))),
                )
            }
            Err(e) => {
                return (
                    true,
                    Err(Error::new(Kind::MetadataReadFailure(Box::new(e)))),
                )
            }
        };

        if stored.version == self.version {
            log::info!("schema-guard: version {} already recorded, verifying identity", self.version);
            return if current_hash == stored.identity_hash {
                (false, Ok(()))
            } else {
                (true, Err(Error::new(Kind::IdentityMismatch(self.version))))
            };
        }

        let path = match planner::plan(&self.migrations, stored.version, self.version) {
            Ok(path) => path,
            Err(e) => return (true, Err(e)),
        };

        log::info!(
            "schema-guard: migrating from version {} to {} over {} step(s)",
            stored.version,
            self.version,
            path.len()
        );

        match self.migrate(current_hash, path) {
            Ok(()) => (false, Ok(())),
            Err(e) => (true, Err(e)),
        }
    }

    fn create_fresh(&mut self, current_hash: &str) -> Result<(), Error> {
        let version = self.version;
        let hash = current_hash.to_string();

        let mut present = Vec::with_capacity(self.entities.len());
        for entity in &self.entities {
            present.push(self.adapter.has_table(entity).store_err()?);
        }

        let entities = std::mem::take(&mut self.entities);
        let result: Result<(), A::Error> = self.adapter.in_transaction(|adapter| {
            adapter.create_schema_master_table()?;
            for (entity, already_present) in entities.iter().zip(present.iter()) {
                if !already_present {
                    adapter.create_tables(&[entity])?;
                }
            }
            adapter.insert_schema_master_row(&SchemaMaster {
                version,
                identity_hash: hash.clone(),
            })
        });
        self.entities = entities;

        result.store_err()
    }

    fn migrate(&mut self, current_hash: &str, path: Vec<usize>) -> Result<(), Error> {
        let version = self.version;
        let hash = current_hash.to_string();
        let migrations = &self.migrations;

        let result: Result<(), TransactionError<A::Error>> =
            self.adapter.in_transaction(|adapter| {
                let mut applied = Vec::with_capacity(path.len());
                for idx in &path {
                    let step = &migrations[*idx];
                    (step.apply)(adapter.underlying()).map_err(|source| {
                        TransactionError::Step(AdapterStepError {
                            base: step.base,
                            target: step.target,
                            applied: applied.clone(),
                            source,
                        })
                    })?;
                    applied.push((step.base, step.target));
                }
                adapter.truncate_schema_master_table()?;
                adapter.insert_schema_master_row(&SchemaMaster {
                    version,
                    identity_hash: hash.clone(),
                })?;
                Ok(())
            });

        result.map_err(|e| match e {
            TransactionError::Store(e) => Error::new(Kind::StoreError(Box::new(e))),
            TransactionError::Step(e) => Error::new(Kind::MigrationFailure {
                base: e.base,
                target: e.target,
                applied: e.applied,
                source: e.source,
            }),
        })
    }
}

/// Distinguishes a plain adapter failure from a migration-callback failure
/// while running inside `Adapter::in_transaction`, both of which would
/// otherwise share the adapter's single `Error` associated type.
enum TransactionError<E> {
    Store(E),
    Step(AdapterStepError),
}

struct AdapterStepError {
    base: Version,
    target: Version,
    applied: Vec<(Version, Version)>,
    source: StepError,
}

impl<E> From<E> for TransactionError<E> {
    fn from(e: E) -> Self {
        TransactionError::Store(e)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("schema-master table reported present but contains no rows")]
struct MissingMetadata;

fn hash_failure<E: std::error::Error + Send + Sync + 'static>(entity_index: usize, source: E) -> Error {
    Error::new(Kind::HashFailure {
        table: format!("entity #{entity_index}"),
        source: Box::new(source),
    })
}
