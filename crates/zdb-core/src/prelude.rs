//! Common module for library exports

pub use crate::config::IndexConfig;
pub use crate::debug_data::{
    DebugData, DebugDataBuilder, DebugLine, DebugScope, DebugSymbol, DebugType, Resolved, ScopeFlags, ScopeId, ScopeTag,
    SourceFile, SymbolFlags, SymbolId, SymbolStorage, TypeId,
};
pub use crate::error::{ZdbError, ZdbResult};
pub use crate::eval::{
    evaluate_expression, parse_expression, DebugValue, Evaluator, Expr, SandboxError, ValueFormatter, VmInterface,
};
pub use crate::types::{Pc, SourceLocation};
