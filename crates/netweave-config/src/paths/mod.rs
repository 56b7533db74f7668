//! Pure resolution of a version tuple to module and dependency locations.
//!
//! The layout under the modules root mirrors how the pre-built weaver
//! modules are shipped: dependencies shared by every netsync release for a
//! given engine/transport pair live in a common directory, while the weaver
//! module itself and its release-specific dependencies live one level deeper.
//!
//! ```text
//! <root>/engine-v2022.3.9/transport-v2.0.0/                 common dir
//!   netsync-v1.5.2/without-native-collections/              version dir
//!     libnetweave_module.so                                 module library
//!     module.json                                           module manifest
//! ```
//!
//! Resolution performs no I/O and no existence checks; those belong to the
//! loader.

use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};

use camino::{Utf8Path, Utf8PathBuf};

use crate::version::VersionTuple;

/// File stem of the weaver module dynamic library.
pub const MODULE_LIBRARY_NAME: &str = "netweave_module";

/// File name of the manifest sidecar shipped next to the module library.
pub const MODULE_MANIFEST_NAME: &str = "module.json";

/// Resolved locations for one version tuple's weaver module.
///
/// # Example
///
/// ```
/// use camino::Utf8Path;
/// use netweave_config::{ModulePaths, Version, VersionTuple};
///
/// let tuple = VersionTuple::new(
///     Version::new(2022, 3, 9),
///     Version::new(1, 5, 2),
///     Version::new(2, 0, 0),
///     false,
/// );
/// let paths = ModulePaths::resolve(Utf8Path::new("/opt/netweave"), &tuple);
/// assert!(paths.version_dir().starts_with(paths.common_dir()));
/// assert!(paths.module_file().as_str().contains("netweave_module"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModulePaths {
    common_dir: Utf8PathBuf,
    version_dir: Utf8PathBuf,
    module_file: Utf8PathBuf,
    manifest_file: Utf8PathBuf,
}

impl ModulePaths {
    /// Computes the deterministic paths for `tuple` under `root`.
    #[must_use]
    pub fn resolve(root: &Utf8Path, tuple: &VersionTuple) -> Self {
        let common_dir = root
            .join(format!("engine-v{}", tuple.host()))
            .join(format!("transport-v{}", tuple.transport()));
        let collections = if tuple.native_collections() {
            "with-native-collections"
        } else {
            "without-native-collections"
        };
        let version_dir = common_dir
            .join(format!("netsync-v{}", tuple.netsync()))
            .join(collections);
        let module_file = version_dir.join(shared_library_file_name(MODULE_LIBRARY_NAME));
        let manifest_file = version_dir.join(MODULE_MANIFEST_NAME);
        Self {
            common_dir,
            version_dir,
            module_file,
            manifest_file,
        }
    }

    /// Directory holding dependencies common to every netsync release for
    /// the tuple's engine/transport pair.
    #[must_use]
    pub fn common_dir(&self) -> &Utf8Path {
        &self.common_dir
    }

    /// Directory holding the module library and its release-specific
    /// dependencies.
    #[must_use]
    pub fn version_dir(&self) -> &Utf8Path {
        &self.version_dir
    }

    /// Fully qualified path of the weaver module dynamic library.
    #[must_use]
    pub fn module_file(&self) -> &Utf8Path {
        &self.module_file
    }

    /// Fully qualified path of the module manifest sidecar.
    #[must_use]
    pub fn manifest_file(&self) -> &Utf8Path {
        &self.manifest_file
    }
}

/// Renders a bare library name as a platform shared-library file name,
/// e.g. `netsync_cecil` becomes `libnetsync_cecil.so` on Linux.
#[must_use]
pub fn shared_library_file_name(name: &str) -> String {
    format!("{DLL_PREFIX}{name}{DLL_SUFFIX}")
}
