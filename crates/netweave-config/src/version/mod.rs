//! Version numbers and the version tuple that selects a weaver module.
//!
//! A [`VersionTuple`] is the resolution key for everything the loader does:
//! two tuples are interchangeable exactly when they compute the same module
//! paths, so the tuple derives full value equality and hashing.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A `major.minor.patch` version triple.
///
/// # Example
///
/// ```
/// use netweave_config::Version;
///
/// let version: Version = "1.5.2".parse().expect("valid version");
/// assert_eq!(version.to_string(), "1.5.2");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Version {
    major: u16,
    minor: u16,
    patch: u16,
}

impl Version {
    /// Creates a version from its three components.
    #[must_use]
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Returns the major component.
    #[must_use]
    pub const fn major(self) -> u16 {
        self.major
    }

    /// Returns the minor component.
    #[must_use]
    pub const fn minor(self) -> u16 {
        self.minor
    }

    /// Returns the patch component.
    #[must_use]
    pub const fn patch(self) -> u16 {
        self.patch
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Error raised when a version string does not parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid version '{text}': expected major.minor.patch")]
pub struct VersionParseError {
    /// The text that failed to parse.
    pub text: String,
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VersionParseError {
            text: s.to_owned(),
        };
        let mut parts = s.split('.');
        let mut component = |part: Option<&str>| {
            part.ok_or_else(invalid)?
                .parse::<u16>()
                .map_err(|_| invalid())
        };
        let major = component(parts.next())?;
        let minor = component(parts.next())?;
        let patch = component(parts.next())?;
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self {
            major,
            minor,
            patch,
        })
    }
}

/// The version combination selecting which weaver module loads.
///
/// Immutable once constructed. Equality and hashing cover all four fields,
/// which matches path equality: the module registry keys its handles on this
/// type and relies on `tuple_a == tuple_b` implying identical resolved paths.
///
/// # Example
///
/// ```
/// use netweave_config::{Version, VersionTuple};
///
/// let tuple = VersionTuple::new(
///     Version::new(2022, 3, 9),
///     Version::new(1, 5, 2),
///     Version::new(2, 0, 0),
///     false,
/// );
/// assert!(tuple.to_string().contains("netsync v1.5.2"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VersionTuple {
    host: Version,
    netsync: Version,
    transport: Version,
    native_collections: bool,
}

impl VersionTuple {
    /// Creates a tuple from the host engine, netsync library, and transport
    /// versions plus the native-collections feature flag.
    #[must_use]
    pub const fn new(
        host: Version,
        netsync: Version,
        transport: Version,
        native_collections: bool,
    ) -> Self {
        Self {
            host,
            netsync,
            transport,
            native_collections,
        }
    }

    /// Returns the host engine version.
    #[must_use]
    pub const fn host(self) -> Version {
        self.host
    }

    /// Returns the netsync library version.
    #[must_use]
    pub const fn netsync(self) -> Version {
        self.netsync
    }

    /// Returns the transport version.
    #[must_use]
    pub const fn transport(self) -> Version {
        self.transport
    }

    /// Returns whether the native-collections variant is selected.
    #[must_use]
    pub const fn native_collections(self) -> bool {
        self.native_collections
    }
}

impl fmt::Display for VersionTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "engine v{}, netsync v{}, transport v{}, native collections: {}",
            self.host, self.netsync, self.transport, self.native_collections
        )
    }
}
