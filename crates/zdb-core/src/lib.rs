//! # zdb-core
//!
//! Debug-info format and introspection primitives for the zdb script debugger.
//!
//! This crate provides everything a debugger front end needs to answer
//! questions about a paused script program, including:
//! - Decoding and encoding the binary debug-info format
//! - Mapping program counters to source lines and back
//! - Resolving identifiers through nested scopes, imports, and base classes
//! - Choosing among overloaded functions
//! - Parsing and evaluating watch expressions against a live VM
//!
//! ## Layout
//!
//! - [`debug_data`]: the [`DebugData`] store and every query over it
//! - [`eval`]: expression parsing, evaluation, and value formatting
//! - [`varint`]: the variable-length integer codec the format is built on
//! - [`types`]: small shared value types ([`Pc`], [`SourceLocation`])
//!
//! ## VM access
//!
//! This crate never touches a running program directly. Reads, writes, and
//! sandboxed calls go through the [`VmInterface`] trait, which the embedding
//! runtime implements.

pub mod config;
pub mod debug_data;
pub mod error;
pub mod eval;
pub mod prelude;
pub mod types;
pub mod varint;

pub use config::IndexConfig;
// Re-export commonly used types
pub use debug_data::{
    DebugData, DebugDataBuilder, DebugLine, DebugScope, DebugSymbol, DebugType, LineProgramWriter, Resolved, ScopeFlags,
    ScopeId, ScopeTag, SourceFile, SymbolFlags, SymbolId, SymbolStorage, TypeId,
};
pub use error::{ZdbError, ZdbResult};
pub use eval::{evaluate_expression, DebugValue, VmInterface};
pub use types::{Pc, SourceLocation};
