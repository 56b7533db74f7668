//! Dynamic-library bridge to pre-built weaver modules.
//!
//! A weaver module is a `cdylib` exporting one entry symbol that returns a
//! [`RawModuleVTable`]: a fixed table of C-ABI functions describing the
//! module's stage chain and its idempotency check. The vtable is copied by
//! value at load time, so no pointer into the module outlives the lookup;
//! the [`libloading::Library`] handles themselves are retained for the
//! process lifetime (modules are never unloaded).
//!
//! Buffers cross the boundary raw; diagnostics cross as a UTF-8 JSON array
//! of [`Diagnostic`]. Every buffer a module hands out is returned to the
//! module's own `release` function after copying, so allocator ownership
//! never crosses the boundary.

use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::Path;
use std::ptr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use camino::Utf8PathBuf;
use libloading::Library;
use tracing::{debug, info};

use netweave_config::{ModulePaths, VersionTuple};

use crate::artifact::{Artifact, SymbolStore};
use crate::error::ModuleError;
use crate::manifest::ModuleManifest;
use crate::registry::{ModuleLoader, WeaverModule};
use crate::scope::{Resolution, ScopeChain, SharedScope};
use crate::stage::{Diagnostic, MarkerProbe, StageFailure, StageOutput, TransformStage};

/// Tracing target for dynamic loading operations.
const DYNAMIC_TARGET: &str = "netweave_modules::dynamic";

/// Bridge ABI revision this host understands.
pub const ABI_VERSION: u32 = 1;

/// Stage status: the artifact was transformed and the result buffers are
/// populated.
pub const STAGE_TRANSFORMED: i32 = 0;

/// Stage status: the stage declined the artifact; it passes through
/// unchanged.
pub const STAGE_DECLINED: i32 = 1;

/// A byte buffer owned by the module until released.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawBuffer {
    /// Buffer start, or null for an empty buffer.
    pub data: *mut u8,
    /// Buffer length in bytes.
    pub len: usize,
}

impl RawBuffer {
    /// An empty buffer.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            data: ptr::null_mut(),
            len: 0,
        }
    }
}

/// Out-parameter filled by a module's `stage_transform`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawStageResult {
    /// Transformed bytecode.
    pub bytecode: RawBuffer,
    /// Transformed external symbol store; empty when symbols are embedded.
    pub symbols: RawBuffer,
    /// UTF-8 JSON array of diagnostics.
    pub diagnostics: RawBuffer,
    /// UTF-8 fault description, populated when the status is negative.
    pub fault: RawBuffer,
}

impl RawStageResult {
    /// A result with all buffers empty.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            bytecode: RawBuffer::empty(),
            symbols: RawBuffer::empty(),
            diagnostics: RawBuffer::empty(),
            fault: RawBuffer::empty(),
        }
    }
}

/// The fixed capability table a weaver module exports.
///
/// Returned by the module's entry symbol
/// (`netweave_module_entry` unless the manifest overrides it). The table is
/// built once by the module at load time; stages are never discovered by
/// scanning loaded code.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct RawModuleVTable {
    /// Bridge ABI revision the module was built against.
    pub abi_version: u32,
    /// Number of stages in the chain.
    pub stage_count: unsafe extern "C" fn() -> usize,
    /// Nul-terminated name of stage `index`.
    pub stage_name: unsafe extern "C" fn(index: usize) -> *const c_char,
    /// Whether stage `index` has work to do for this bytecode.
    pub stage_applies: unsafe extern "C" fn(index: usize, bytecode: *const u8, len: usize) -> bool,
    /// Applies stage `index`. Returns [`STAGE_TRANSFORMED`],
    /// [`STAGE_DECLINED`], or a negative fault code.
    pub stage_transform: unsafe extern "C" fn(
        index: usize,
        bytecode: *const u8,
        bytecode_len: usize,
        symbols: *const u8,
        symbols_len: usize,
        symbols_embedded: bool,
        references_json: *const c_char,
        result: *mut RawStageResult,
    ) -> i32,
    /// Marker check: 1 when a complete prior run wove this bytecode, 0 when
    /// not, negative on fault.
    pub is_patched: unsafe extern "C" fn(bytecode: *const u8, len: usize) -> i32,
    /// Returns a module-allocated buffer to the module.
    pub release: unsafe extern "C" fn(buffer: RawBuffer),
}

/// A module library kept loaded with its private dependency scope.
struct LoadedModule {
    vtable: RawModuleVTable,
    _module: Library,
    _dependencies: Vec<Arc<Library>>,
}

impl LoadedModule {
    /// Copies a module buffer into owned memory and hands the buffer back
    /// to the module.
    fn take_buffer(&self, buffer: RawBuffer) -> Vec<u8> {
        if buffer.data.is_null() || buffer.len == 0 {
            return Vec::new();
        }
        // The module guarantees `data..data+len` stays valid until released.
        let copied = unsafe { std::slice::from_raw_parts(buffer.data, buffer.len) }.to_vec();
        unsafe { (self.vtable.release)(buffer) };
        copied
    }
}

/// One stage of a dynamically loaded module's chain.
struct DynamicStage {
    name: String,
    index: usize,
    module: Arc<LoadedModule>,
}

impl TransformStage for DynamicStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn applies(&self, artifact: &Artifact) -> bool {
        let bytecode = artifact.bytecode();
        unsafe {
            (self.module.vtable.stage_applies)(self.index, bytecode.as_ptr(), bytecode.len())
        }
    }

    fn transform(&self, artifact: &Artifact) -> Result<StageOutput, StageFailure> {
        let references = encode_references(self.name(), artifact)?;
        let bytecode = artifact.bytecode();
        let (symbols, symbols_embedded): (&[u8], bool) = match artifact.symbols() {
            SymbolStore::Embedded => (&[], true),
            SymbolStore::External(buffer) => (buffer.as_slice(), false),
        };

        let mut result = RawStageResult::empty();
        let status = unsafe {
            (self.module.vtable.stage_transform)(
                self.index,
                bytecode.as_ptr(),
                bytecode.len(),
                symbols.as_ptr(),
                symbols.len(),
                symbols_embedded,
                references.as_ptr(),
                &mut result,
            )
        };

        let new_bytecode = self.module.take_buffer(result.bytecode);
        let new_symbols = self.module.take_buffer(result.symbols);
        let diagnostic_bytes = self.module.take_buffer(result.diagnostics);
        let fault_bytes = self.module.take_buffer(result.fault);

        if status < 0 {
            return Err(StageFailure::ModuleFault {
                stage: self.name.clone(),
                message: String::from_utf8_lossy(&fault_bytes).into_owned(),
            });
        }
        if status == STAGE_DECLINED {
            return Ok(StageOutput::clean(artifact.clone()));
        }

        let diagnostics: Vec<Diagnostic> = if diagnostic_bytes.is_empty() {
            Vec::new()
        } else {
            serde_json::from_slice(&diagnostic_bytes).map_err(|err| {
                StageFailure::InvalidResult {
                    stage: self.name.clone(),
                    message: format!("diagnostics payload is not valid JSON: {err}"),
                }
            })?
        };

        Ok(StageOutput {
            artifact: artifact.with_buffers(new_bytecode, new_symbols),
            diagnostics,
        })
    }
}

/// Marker probe backed by the module's `is_patched` export.
struct DynamicMarkerProbe {
    module: Arc<LoadedModule>,
}

impl MarkerProbe for DynamicMarkerProbe {
    fn is_patched(&self, artifact: &Artifact) -> Result<bool, StageFailure> {
        let bytecode = artifact.bytecode();
        let status =
            unsafe { (self.module.vtable.is_patched)(bytecode.as_ptr(), bytecode.len()) };
        if status < 0 {
            return Err(StageFailure::ModuleFault {
                stage: String::from("marker-check"),
                message: format!("is_patched returned fault code {status}"),
            });
        }
        Ok(status == 1)
    }
}

/// Serialises the artifact's reference search paths as the JSON array the
/// stage ABI expects.
fn encode_references(stage: &str, artifact: &Artifact) -> Result<CString, StageFailure> {
    let paths: Vec<String> = artifact
        .references()
        .iter()
        .map(|path| path.to_string_lossy().into_owned())
        .collect();
    let json = serde_json::to_string(&paths).map_err(|err| StageFailure::InvalidResult {
        stage: stage.to_owned(),
        message: format!("failed to serialise reference paths: {err}"),
    })?;
    CString::new(json).map_err(|_| StageFailure::InvalidResult {
        stage: stage.to_owned(),
        message: String::from("reference path contains an interior NUL byte"),
    })
}

/// Production module loader: resolves paths, loads dependencies through the
/// scope chain, opens the module library, and builds the stage chain from
/// its vtable.
pub struct DynamicModuleLoader {
    modules_root: Utf8PathBuf,
    shared: SharedScope,
    shared_libraries: Mutex<HashMap<String, Arc<Library>>>,
}

impl DynamicModuleLoader {
    /// Creates a loader rooted at the directory holding the shipped module
    /// tree.
    #[must_use]
    pub fn new(modules_root: Utf8PathBuf) -> Self {
        Self {
            modules_root,
            shared: SharedScope::new(),
            shared_libraries: Mutex::new(HashMap::new()),
        }
    }

    /// The shared promotion scope, observable for diagnostics.
    #[must_use]
    pub const fn shared_scope(&self) -> &SharedScope {
        &self.shared
    }

    fn shared_guard(&self) -> MutexGuard<'_, HashMap<String, Arc<Library>>> {
        self.shared_libraries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn read_manifest(
        &self,
        paths: &ModulePaths,
        tuple: &VersionTuple,
    ) -> Result<ModuleManifest, ModuleError> {
        let manifest_error = |message: String| ModuleError::Manifest {
            tuple: tuple.to_string(),
            message,
        };
        let raw = std::fs::read_to_string(paths.manifest_file())
            .map_err(|err| manifest_error(format!("cannot read module.json: {err}")))?;
        let manifest: ModuleManifest = serde_json::from_str(&raw)
            .map_err(|err| manifest_error(format!("cannot parse module.json: {err}")))?;
        manifest.validate().map_err(manifest_error)?;
        Ok(manifest)
    }

    fn open_library(path: &Path, tuple: &VersionTuple) -> Result<Library, ModuleError> {
        // Default flags give the library its own local symbol scope, which
        // is exactly the isolation boundary we need between tuples.
        unsafe { Library::new(path) }.map_err(|err| ModuleError::Load {
            library: path.to_path_buf(),
            tuple: tuple.to_string(),
            message: err.to_string(),
        })
    }

    /// Resolves and loads the manifest's dependencies, returning the handles
    /// the module must keep alive.
    fn load_dependencies(
        &self,
        manifest: &ModuleManifest,
        chain: &ScopeChain<'_>,
        tuple: &VersionTuple,
    ) -> Result<Vec<Arc<Library>>, ModuleError> {
        let mut retained = Vec::with_capacity(manifest.dependencies().len());
        for name in manifest.dependencies() {
            let resolution =
                chain
                    .resolve(name)
                    .ok_or_else(|| ModuleError::DependencyNotFound {
                        name: name.clone(),
                        tuple: tuple.to_string(),
                    })?;
            let library = match resolution {
                Resolution::SharedExisting => self.shared_dependency(name, chain, tuple)?,
                Resolution::SharedPromote(path) => {
                    debug!(
                        target: DYNAMIC_TARGET,
                        dependency = name.as_str(),
                        "promoting dependency into the shared scope"
                    );
                    let loaded = Arc::new(Self::open_library(&path, tuple)?);
                    self.shared_guard()
                        .insert(name.clone(), Arc::clone(&loaded));
                    self.shared.promote(name);
                    loaded
                }
                Resolution::Isolated(path) => {
                    debug!(
                        target: DYNAMIC_TARGET,
                        dependency = name.as_str(),
                        path = %path.display(),
                        "loading dependency into the private scope"
                    );
                    Arc::new(Self::open_library(&path, tuple)?)
                }
            };
            retained.push(library);
        }
        Ok(retained)
    }

    /// Fetches a promoted dependency, reloading it if another loader
    /// promoted the name without populating this loader's table. The
    /// duplicate load is harmless; promotion is only ever additive.
    fn shared_dependency(
        &self,
        name: &str,
        chain: &ScopeChain<'_>,
        tuple: &VersionTuple,
    ) -> Result<Arc<Library>, ModuleError> {
        if let Some(existing) = self.shared_guard().get(name) {
            return Ok(Arc::clone(existing));
        }
        let path = chain
            .locate(name)
            .ok_or_else(|| ModuleError::DependencyNotFound {
                name: name.to_owned(),
                tuple: tuple.to_string(),
            })?;
        let loaded = Arc::new(Self::open_library(&path, tuple)?);
        self.shared_guard()
            .insert(name.to_owned(), Arc::clone(&loaded));
        Ok(loaded)
    }

    fn resolve_vtable(
        library: &Library,
        manifest: &ModuleManifest,
        tuple: &VersionTuple,
    ) -> Result<RawModuleVTable, ModuleError> {
        let symbol = manifest.entry_symbol();
        let entry = unsafe {
            library.get::<unsafe extern "C" fn() -> *const RawModuleVTable>(symbol.as_bytes())
        }
        .map_err(|err| ModuleError::MissingEntrySymbol {
            symbol: symbol.to_owned(),
            tuple: tuple.to_string(),
            message: err.to_string(),
        })?;

        let table_ptr = unsafe { entry() };
        if table_ptr.is_null() {
            return Err(ModuleError::MissingEntrySymbol {
                symbol: symbol.to_owned(),
                tuple: tuple.to_string(),
                message: String::from("entry symbol returned a null vtable"),
            });
        }
        // Copy the table by value so nothing borrows the symbol lookup.
        let vtable = unsafe { *table_ptr };
        if vtable.abi_version != ABI_VERSION {
            return Err(ModuleError::AbiMismatch {
                found: vtable.abi_version,
                expected: ABI_VERSION,
                tuple: tuple.to_string(),
            });
        }
        Ok(vtable)
    }

    fn stage_name(module: &LoadedModule, index: usize) -> String {
        let raw = unsafe { (module.vtable.stage_name)(index) };
        if raw.is_null() {
            return format!("stage-{index}");
        }
        unsafe { CStr::from_ptr(raw) }
            .to_string_lossy()
            .into_owned()
    }
}

impl ModuleLoader for DynamicModuleLoader {
    fn load(&self, tuple: &VersionTuple) -> Result<WeaverModule, ModuleError> {
        let paths = ModulePaths::resolve(&self.modules_root, tuple);
        if !paths.module_file().is_file() {
            return Err(ModuleError::UnsupportedConfiguration {
                tuple: tuple.to_string(),
                module_file: paths.module_file().as_std_path().to_path_buf(),
            });
        }

        let manifest = self.read_manifest(&paths, tuple)?;
        let chain = ScopeChain::new(&paths, &self.shared);
        let dependencies = self.load_dependencies(&manifest, &chain, tuple)?;

        info!(
            target: DYNAMIC_TARGET,
            module = manifest.name(),
            %tuple,
            path = %paths.module_file(),
            "loading weaver module library"
        );
        let library = Self::open_library(paths.module_file().as_std_path(), tuple)?;
        let vtable = Self::resolve_vtable(&library, &manifest, tuple)?;

        let module = Arc::new(LoadedModule {
            vtable,
            _module: library,
            _dependencies: dependencies,
        });

        let count = unsafe { (module.vtable.stage_count)() };
        let stages: Vec<Box<dyn TransformStage>> = (0..count)
            .map(|index| {
                Box::new(DynamicStage {
                    name: Self::stage_name(&module, index),
                    index,
                    module: Arc::clone(&module),
                }) as Box<dyn TransformStage>
            })
            .collect();

        let marker = Box::new(DynamicMarkerProbe {
            module: Arc::clone(&module),
        });

        Ok(WeaverModule::new(manifest.name(), stages, marker))
    }
}
