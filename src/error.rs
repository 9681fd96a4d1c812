use std::fmt;

use thiserror::Error as TError;

use crate::version::Version;

/// An error surfaced by [`crate::Manager::initialize`] or by construction of
/// a [`crate::Manager`].
#[derive(Debug)]
pub struct Error {
    kind: Box<Kind>,
}

impl Error {
    pub(crate) fn new(kind: Kind) -> Error {
        Error {
            kind: Box::new(kind),
        }
    }

    /// The kind of error that occurred.
    pub fn kind(&self) -> &Kind {
        &self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.kind.source()
    }
}

/// Enum listing the possible error kinds, matching the outcomes a caller
/// needs to branch on (`IdentityMismatch` vs `PathNotFound` vs a plain
/// store failure are all handled differently by an operator).
#[derive(Debug, TError)]
pub enum Kind {
    /// Constructor validation failed; never returned by `initialize`.
    #[error("invalid manager configuration: {0}")]
    InvalidConfiguration(String),

    /// The hasher could not digest some entity's model description.
    #[error("could not compute identity hash for table `{table}`")]
    HashFailure {
        table: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The adapter reported a failure during a read/write/transaction.
    #[error("storage adapter error: {0}")]
    StoreError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// `latest_schema_master` failed after the schema-master table was
    /// confirmed present.
    #[error("could not read schema-master metadata, database may be corrupted")]
    MetadataReadFailure(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Stored version equals the code version but identity hashes differ.
    #[error("schema identity mismatch at version {0}: entities changed without a version bump")]
    IdentityMismatch(Version),

    /// The planner could not route between the stored and code versions.
    #[error("no migration path from version {from} to version {to}")]
    PathNotFound { from: Version, to: Version },

    /// A migration step's `apply` callback returned an error. `applied`
    /// lists the `(base, target)` pairs that ran successfully earlier in
    /// this same attempt, before the whole transaction was rolled back.
    #[error("migration step {base} -> {target} failed")]
    MigrationFailure {
        base: Version,
        target: Version,
        applied: Vec<(Version, Version)>,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The destructive fallback could not drop the known tables.
    #[error("destructive clean-up failed")]
    CleanupFailure(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Helper for wrapping a fallible adapter call into a [`Kind::StoreError`].
pub(crate) trait WrapStoreError<T> {
    fn store_err(self) -> Result<T, Error>;
}

impl<T, E> WrapStoreError<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn store_err(self) -> Result<T, Error> {
        self.map_err(|err| Error::new(Kind::StoreError(Box::new(err))))
    }
}
