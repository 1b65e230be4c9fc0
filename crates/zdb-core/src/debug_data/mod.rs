//! # Debug-Info Store
//!
//! [`DebugData`] is the decoded form of the binary debug information a script
//! compiler emits: source files, the encoded line program, the composite type
//! table, the scope tree, and the symbol list.
//!
//! The store is immutable once built. Every derived index (symbols per scope,
//! children per scope, code scopes sorted by pc, the materialized line table,
//! line-program checkpoints) is computed on first use and cached for the life
//! of the value. The caches are `OnceCell`s, so a `&DebugData` can be shared
//! freely between readers.
//!
//! ## Submodules
//!
//! - [`model`]: the stored records and their index newtypes
//! - [`codec`]: `encode` / `decode` and load-time validation
//! - [`builder`]: programmatic construction (compiler side and tests)
//! - [`lines`]: pc to source line mapping
//! - [`index`]: scope tree caches and identifier resolution
//! - [`typesys`]: type predicates, names, and the coercion relation
//! - [`describe`]: human-readable names, signatures, and the store dump

use std::fmt;
use std::sync::Mutex;

use once_cell::sync::OnceCell;
use tracing::trace;

use crate::config::IndexConfig;
use crate::types::Pc;

pub mod builder;
pub mod codec;
pub mod describe;
pub mod index;
pub mod lines;
pub mod model;
pub mod typesys;
mod validate;

pub use builder::{DebugDataBuilder, LineProgramWriter};
pub use index::Resolved;
pub use lines::DebugLine;
pub use model::{
    DebugScope, DebugSymbol, DebugType, ScopeFlags, ScopeId, ScopeTag, SourceFile, SymbolFlags, SymbolId, SymbolStorage,
    TypeId,
};

use lines::{Checkpoint, LocationCache};

/// Format version written by [`DebugData::encode`] and required by [`DebugData::decode`].
pub const VERSION: u32 = 1;

/// Decoded debug information for one compiled program.
///
/// Build one with [`DebugData::decode`] or [`DebugDataBuilder`]. Both paths
/// validate the structural invariants (a single root, acyclic parent and
/// inheritance chains, in-range references) so queries never need to guard
/// against malformed data.
///
/// ## Example
///
/// ```rust
/// use zdb_core::{DebugData, DebugDataBuilder};
///
/// let mut builder = DebugDataBuilder::new();
/// builder.add_source_file("main.zs", "void run() {}");
/// let data = builder.build()?;
///
/// let decoded = DebugData::decode(&data.encode())?;
/// assert_eq!(decoded, data);
/// # Ok::<(), zdb_core::ZdbError>(())
/// ```
pub struct DebugData
{
    pub(crate) source_files: Vec<SourceFile>,
    pub(crate) line_program: Vec<u8>,
    pub(crate) types: Vec<DebugType>,
    pub(crate) scopes: Vec<DebugScope>,
    pub(crate) symbols: Vec<DebugSymbol>,
    config: IndexConfig,

    symbols_by_scope: OnceCell<Vec<Vec<SymbolId>>>,
    children_by_scope: OnceCell<Vec<Vec<ScopeId>>>,
    sorted_code_scopes: OnceCell<Vec<ScopeId>>,
    line_table: OnceCell<Vec<DebugLine>>,
    checkpoints: OnceCell<Vec<Checkpoint>>,
    location_cache: Mutex<LocationCache>,
}

impl DebugData
{
    /// Assemble a store from already-validated parts.
    pub(crate) fn from_parts(
        source_files: Vec<SourceFile>,
        line_program: Vec<u8>,
        types: Vec<DebugType>,
        scopes: Vec<DebugScope>,
        symbols: Vec<DebugSymbol>,
        config: IndexConfig,
    ) -> Self
    {
        Self {
            source_files,
            line_program,
            types,
            scopes,
            symbols,
            config,
            symbols_by_scope: OnceCell::new(),
            children_by_scope: OnceCell::new(),
            sorted_code_scopes: OnceCell::new(),
            line_table: OnceCell::new(),
            checkpoints: OnceCell::new(),
            location_cache: Mutex::new(LocationCache::new()),
        }
    }

    /// Whether the program was compiled with debug information at all.
    #[must_use]
    pub fn exists(&self) -> bool
    {
        !self.source_files.is_empty()
    }

    #[must_use]
    pub fn source_files(&self) -> &[SourceFile]
    {
        &self.source_files
    }

    /// Raw encoded line program.
    #[must_use]
    pub fn line_program(&self) -> &[u8]
    {
        &self.line_program
    }

    /// Composite type table (ids start at [`TypeId::TABLE_START`]).
    #[must_use]
    pub fn types(&self) -> &[DebugType]
    {
        &self.types
    }

    #[must_use]
    pub fn scopes(&self) -> &[DebugScope]
    {
        &self.scopes
    }

    #[must_use]
    pub fn symbols(&self) -> &[DebugSymbol]
    {
        &self.symbols
    }

    #[must_use]
    pub fn config(&self) -> IndexConfig
    {
        self.config
    }

    /// Scope by an id this store handed out.
    pub(crate) fn scope(&self, id: ScopeId) -> &DebugScope
    {
        &self.scopes[id.index()]
    }

    /// Scope by id, or `None` if out of range.
    #[must_use]
    pub fn get_scope(&self, id: ScopeId) -> Option<&DebugScope>
    {
        self.scopes.get(id.index())
    }

    /// Symbol by an id this store handed out.
    pub(crate) fn symbol(&self, id: SymbolId) -> &DebugSymbol
    {
        &self.symbols[id.index()]
    }

    /// Symbol by id, or `None` if out of range.
    #[must_use]
    pub fn get_symbol(&self, id: SymbolId) -> Option<&DebugSymbol>
    {
        self.symbols.get(id.index())
    }

    /// Find a source file by its exact path.
    #[must_use]
    pub fn source_file(&self, path: &str) -> Option<&SourceFile>
    {
        self.source_files.iter().find(|file| file.path == path)
    }

    /// Index of the source file with the exact `path`.
    #[must_use]
    pub fn source_file_index(&self, path: &str) -> Option<u32>
    {
        self.source_files
            .iter()
            .position(|file| file.path == path)
            .and_then(|index| u32::try_from(index).ok())
    }

    /// Build every lazy index now instead of on first query.
    ///
    /// Useful before handing the store to a latency-sensitive loop such as
    /// single-stepping.
    pub fn prepare_indices(&self)
    {
        let _ = self.symbols_by_scope();
        let _ = self.children_by_scope();
        let _ = self.sorted_code_scopes();
        let _ = self.line_table();
        let _ = self.checkpoints();
        trace!(scopes = self.scopes.len(), symbols = self.symbols.len(), "debug data indices prepared");
    }

    pub(crate) fn scope_id(index: usize) -> ScopeId
    {
        // Scope counts come from a u32 on the wire.
        ScopeId(index as u32)
    }

    /// Whether `pc` lies inside the code range of `scope`.
    #[must_use]
    pub fn scope_contains(&self, scope: ScopeId, pc: Pc) -> bool
    {
        self.get_scope(scope).is_some_and(|s| s.contains_pc(pc))
    }
}

impl Clone for DebugData
{
    fn clone(&self) -> Self
    {
        Self::from_parts(
            self.source_files.clone(),
            self.line_program.clone(),
            self.types.clone(),
            self.scopes.clone(),
            self.symbols.clone(),
            self.config,
        )
    }
}

impl PartialEq for DebugData
{
    /// Compares stored data only; caches and index configuration are ignored.
    fn eq(&self, other: &Self) -> bool
    {
        self.source_files == other.source_files
            && self.line_program == other.line_program
            && self.types == other.types
            && self.scopes == other.scopes
            && self.symbols == other.symbols
    }
}

impl Eq for DebugData {}

impl fmt::Debug for DebugData
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("DebugData")
            .field("source_files", &self.source_files.len())
            .field("line_program_bytes", &self.line_program.len())
            .field("types", &self.types.len())
            .field("scopes", &self.scopes.len())
            .field("symbols", &self.symbols.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
