//! Schema-version manager for embedded, application-owned databases.
//!
//! An application owns its database file and its entity definitions; this
//! crate decides, on each startup, whether the store needs to be created
//! from scratch, is already at the right version, or needs migrating to get
//! there — using a structural identity hash of the entity set to detect
//! drift that a bare version number would miss.

#[cfg(feature = "config")]
pub mod config;
pub mod adapter;
pub mod error;
pub mod hash;
pub mod manager;
pub mod mock;
pub mod planner;
pub mod version;

pub use crate::adapter::{Adapter, ModelDefinition, SchemaMaster};
pub use crate::error::{Error, Kind};
pub use crate::hash::{Describe, HashValue, Hasher, Sha256Hasher};
pub use crate::manager::{Manager, MigrationStep};
pub use crate::version::{InvalidVersion, Version};
