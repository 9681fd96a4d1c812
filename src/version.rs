use std::fmt;
use std::num::NonZeroU32;

/// A schema version. Versions are strictly positive; `0` is never a valid
/// version and is rejected wherever a raw integer is accepted.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(NonZeroU32);

impl Version {
    /// Build a `Version` from a raw integer, rejecting `0`.
    pub fn new(raw: u32) -> Option<Version> {
        NonZeroU32::new(raw).map(Version)
    }

    /// Get the raw integer value.
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u32> for Version {
    type Error = InvalidVersion;

    fn try_from(raw: u32) -> Result<Version, InvalidVersion> {
        Version::new(raw).ok_or(InvalidVersion)
    }
}

/// Error returned when a version of `0` is supplied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("only non-zero versions are allowed")]
pub struct InvalidVersion;
