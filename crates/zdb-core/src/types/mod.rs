//! # Types
//!
//! Small value types shared by the debug-info store, the resolvers, and the
//! evaluator.
//!
//! These wrap raw integers so a program counter can't be confused with a line
//! number or a table index at a call site.

pub mod location;
pub mod pc;

pub use location::SourceLocation;
pub use pc::Pc;
