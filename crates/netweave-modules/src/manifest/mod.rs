//! The manifest sidecar shipped with every pre-built weaver module.
//!
//! Each versioned module directory carries a `module.json` next to the
//! dynamic library, declaring the module's identity and the dependency
//! libraries the loader must resolve before the module itself is opened.
//! Dependencies are bare library names; the scope chain turns them into
//! platform file names and locations.

use serde::{Deserialize, Serialize};

/// Entry symbol a module exports unless its manifest overrides it.
pub const DEFAULT_ENTRY_SYMBOL: &str = "netweave_module_entry";

/// Parsed `module.json` contents.
///
/// # Example
///
/// ```
/// use netweave_modules::ModuleManifest;
///
/// let manifest: ModuleManifest = serde_json::from_str(
///     r#"{"name":"netweave-module","netsync_version":"1.5.2","dependencies":["netsync_cecil"]}"#,
/// ).expect("valid manifest");
/// assert_eq!(manifest.entry_symbol(), "netweave_module_entry");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleManifest {
    name: String,
    netsync_version: String,
    #[serde(default)]
    entry_symbol: Option<String>,
    #[serde(default)]
    dependencies: Vec<String>,
}

impl ModuleManifest {
    /// Creates a manifest, mainly for tests and tooling; production
    /// manifests are deserialised from the sidecar file.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        netsync_version: impl Into<String>,
        dependencies: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            netsync_version: netsync_version.into(),
            entry_symbol: None,
            dependencies,
        }
    }

    /// Module name, used for logging only.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// The netsync release this module was built against.
    #[must_use]
    pub fn netsync_version(&self) -> &str {
        self.netsync_version.as_str()
    }

    /// The entry symbol to resolve in the module library.
    #[must_use]
    pub fn entry_symbol(&self) -> &str {
        self.entry_symbol.as_deref().unwrap_or(DEFAULT_ENTRY_SYMBOL)
    }

    /// Dependency library names, in declaration order.
    #[must_use]
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Validates the manifest.
    ///
    /// # Errors
    ///
    /// Returns a description of the first problem found: an empty name, an
    /// empty dependency name, or a duplicate dependency.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err(String::from("module name must not be empty"));
        }
        let mut seen = std::collections::HashSet::new();
        for dependency in &self.dependencies {
            if dependency.trim().is_empty() {
                return Err(String::from("dependency names must not be empty"));
            }
            if !seen.insert(dependency.as_str()) {
                return Err(format!("duplicate dependency '{dependency}'"));
            }
        }
        Ok(())
    }
}
