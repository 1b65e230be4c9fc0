//! # Debug Data Builder
//!
//! Programmatic construction of a [`DebugData`] store. This is what a compiler
//! backend uses to emit debug info, and what tests use to set up fixtures
//! without hand-assembling bytes.
//!
//! The builder starts with the root scope already in place at
//! [`ScopeId::ROOT`]. Every `add_*` method returns the id the new entry will
//! have in the built store.
//!
//! ## Example
//!
//! ```rust
//! use zdb_core::{DebugDataBuilder, DebugScope, DebugSymbol, ScopeId, ScopeTag, SymbolStorage, TypeId};
//!
//! let mut builder = DebugDataBuilder::new();
//! builder.add_source_file("main.zs", "int add(int a, int b) { return a + b; }");
//! let file = builder.add_scope(DebugScope::new(ScopeTag::File, ScopeId::ROOT).named("main.zs"));
//! let add = builder.add_scope(
//!     DebugScope::new(ScopeTag::Function, file)
//!         .named("add")
//!         .with_type(TypeId::INT)
//!         .with_range(0, 12),
//! );
//! builder.add_symbol(DebugSymbol::new(add, "a", TypeId::INT, SymbolStorage::Stack, 0));
//! builder.add_symbol(DebugSymbol::new(add, "b", TypeId::INT, SymbolStorage::Stack, 1));
//! builder.set_file(0).prologue_end().simple_step(12);
//!
//! let data = builder.build()?;
//! assert_eq!(data.function_signature(add), "int add(int a, int b)");
//! # Ok::<(), zdb_core::ZdbError>(())
//! ```

use std::fmt;

use tracing::debug;

pub use super::lines::LineProgramWriter;
use super::model::{DebugScope, DebugSymbol, DebugType, ScopeId, SourceFile, SymbolId, TypeId, BUILTIN_TYPES};
use super::{validate, DebugData};
use crate::config::IndexConfig;
use crate::error::ZdbResult;

/// Incrementally assembles a [`DebugData`].
///
/// References between entries are not checked until [`DebugDataBuilder::build`],
/// so entries can be added in any order.
#[derive(Clone)]
pub struct DebugDataBuilder
{
    source_files: Vec<SourceFile>,
    line_program: LineProgramWriter,
    types: Vec<DebugType>,
    scopes: Vec<DebugScope>,
    symbols: Vec<DebugSymbol>,
    config: IndexConfig,
}

impl DebugDataBuilder
{
    /// Create a builder holding only the root scope.
    #[must_use]
    pub fn new() -> Self
    {
        Self::with_config(IndexConfig::default())
    }

    /// Create a builder whose store will use `config` for its lazy indices.
    #[must_use]
    pub fn with_config(config: IndexConfig) -> Self
    {
        Self {
            source_files: Vec::new(),
            line_program: LineProgramWriter::new(),
            types: Vec::new(),
            scopes: vec![DebugScope::root()],
            symbols: Vec::new(),
            config,
        }
    }

    /// Add a source file, returning its file index for `set_file`.
    pub fn add_source_file(&mut self, path: impl Into<String>, contents: impl Into<String>) -> u32
    {
        self.source_files.push(SourceFile::new(path, contents));
        next_index(self.source_files.len())
    }

    /// Add a composite type, returning its id.
    ///
    /// Built-in types are never stored; passing one returns its fixed id.
    pub fn add_type(&mut self, ty: DebugType) -> TypeId
    {
        if let Some(index) = BUILTIN_TYPES.iter().position(|builtin| *builtin == ty) {
            return TypeId(next_index(index + 1));
        }
        self.types.push(ty);
        TypeId::from_table_index(self.types.len() - 1)
    }

    /// Add a scope, returning its id.
    pub fn add_scope(&mut self, scope: DebugScope) -> ScopeId
    {
        self.scopes.push(scope);
        ScopeId(next_index(self.scopes.len()))
    }

    /// Add a symbol, returning its id.
    pub fn add_symbol(&mut self, symbol: DebugSymbol) -> SymbolId
    {
        self.symbols.push(symbol);
        SymbolId(next_index(self.symbols.len()))
    }

    /// Mutable access to the scope with `id`, e.g. to add imports after the fact.
    pub fn scope_mut(&mut self, id: ScopeId) -> Option<&mut DebugScope>
    {
        self.scopes.get_mut(id.index())
    }

    /// Line program writer backing the `set_file` / `step` helpers.
    pub fn line_program_mut(&mut self) -> &mut LineProgramWriter
    {
        &mut self.line_program
    }

    /// See [`LineProgramWriter::append_set_file`].
    pub fn set_file(&mut self, file_index: u32) -> &mut Self
    {
        self.line_program.append_set_file(file_index);
        self
    }

    /// See [`LineProgramWriter::append_simple_step`].
    pub fn simple_step(&mut self, d_pc: u8) -> &mut Self
    {
        self.line_program.append_simple_step(d_pc);
        self
    }

    /// See [`LineProgramWriter::append_extended_step`].
    pub fn extended_step(&mut self, d_pc: u32, d_line: i32) -> &mut Self
    {
        self.line_program.append_extended_step(d_pc, d_line);
        self
    }

    /// See [`LineProgramWriter::append_prologue_end`].
    pub fn prologue_end(&mut self) -> &mut Self
    {
        self.line_program.append_prologue_end();
        self
    }

    /// See [`LineProgramWriter::append_step`].
    pub fn step(&mut self, d_pc: u32, d_line: i32) -> &mut Self
    {
        self.line_program.append_step(d_pc, d_line);
        self
    }

    /// Validate and freeze the store.
    ///
    /// ## Errors
    ///
    /// - `InvalidConfig` if the index configuration is rejected
    /// - `Malformed` if any reference is out of range or a parent or
    ///   inheritance chain is cyclic (the same checks `decode` runs)
    pub fn build(self) -> ZdbResult<DebugData>
    {
        self.config.validate()?;
        validate::validate(&self.types, &self.scopes, &self.symbols)?;

        debug!(
            files = self.source_files.len(),
            types = self.types.len(),
            scopes = self.scopes.len(),
            symbols = self.symbols.len(),
            "built debug data"
        );

        Ok(DebugData::from_parts(
            self.source_files,
            self.line_program.into_bytes(),
            self.types,
            self.scopes,
            self.symbols,
            self.config,
        ))
    }
}

/// Id of the entry just pushed onto a table of `len` entries.
fn next_index(len: usize) -> u32
{
    u32::try_from(len.saturating_sub(1)).unwrap_or(u32::MAX)
}

impl Default for DebugDataBuilder
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl fmt::Debug for DebugDataBuilder
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("DebugDataBuilder")
            .field("source_files", &self.source_files.len())
            .field("line_program_bytes", &self.line_program.as_bytes().len())
            .field("types", &self.types.len())
            .field("scopes", &self.scopes.len())
            .field("symbols", &self.symbols.len())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::debug_data::model::{ScopeTag, SymbolStorage};

    #[test]
    fn test_builder_starts_with_root()
    {
        let data = DebugDataBuilder::new().build().unwrap();
        assert_eq!(data.scopes().len(), 1);
        assert_eq!(data.scope(ScopeId::ROOT).tag, ScopeTag::Root);
        assert!(!data.exists());
    }

    #[test]
    fn test_add_type_returns_builtin_ids()
    {
        let mut builder = DebugDataBuilder::new();
        assert_eq!(builder.add_type(DebugType::Int), TypeId::INT);
        assert_eq!(builder.add_type(DebugType::Void), TypeId::VOID);
        assert_eq!(builder.add_type(DebugType::Const(TypeId::INT)), TypeId(32));
        assert_eq!(builder.add_type(DebugType::Array(TypeId::CHAR32)), TypeId(33));
    }

    #[test]
    fn test_ids_match_table_positions()
    {
        let mut builder = DebugDataBuilder::new();
        assert_eq!(builder.add_source_file("a.zs", ""), 0);
        assert_eq!(builder.add_source_file("b.zs", ""), 1);
        let ns = builder.add_scope(DebugScope::new(ScopeTag::Namespace, ScopeId::ROOT).named("ns"));
        assert_eq!(ns, ScopeId(1));
        let sym = builder.add_symbol(DebugSymbol::new(ns, "x", TypeId::INT, SymbolStorage::Global, 0));
        assert_eq!(sym, SymbolId(0));

        let data = builder.build().unwrap();
        assert_eq!(data.scope(ns).name, "ns");
        assert_eq!(data.symbol(sym).name, "x");
    }

    #[test]
    fn test_build_rejects_dangling_symbol_scope()
    {
        let mut builder = DebugDataBuilder::new();
        builder.add_symbol(DebugSymbol::new(ScopeId(9), "x", TypeId::INT, SymbolStorage::Global, 0));
        assert!(builder.build().is_err());
    }

    #[test]
    fn test_line_ops_chain()
    {
        let mut builder = DebugDataBuilder::new();
        builder.set_file(0).simple_step(3).prologue_end().step(500, 2);
        assert_eq!(&builder.line_program_mut().as_bytes()[..3], &[0xF0, 0, 3]);
    }
}
