//! Version-tuple configuration and module path resolution for netweave.
//!
//! The `netweave-config` crate is the pure, I/O-free leaf of the workspace.
//! It maps a [`VersionTuple`] (engine, netsync, transport versions plus the
//! native-collections feature flag) to the deterministic on-disk locations of
//! the pre-built weaver module and its dependency directories. Identical
//! tuples always resolve to identical paths; whether anything actually exists
//! at those paths is the loader's concern, not this crate's.

pub mod paths;
pub mod version;

pub use self::paths::ModulePaths;
pub use self::version::{Version, VersionParseError, VersionTuple};
