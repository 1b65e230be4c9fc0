//! # Error Types
//!
//! General error handling for debug-info decoding, name resolution, and
//! expression evaluation.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.

use thiserror::Error;

use crate::eval::vm::SandboxError;

/// Main error type for zdb operations
///
/// This enum represents all the ways a query against debug info can fail.
/// Every failure is recoverable: a bad expression or a missing name never
/// invalidates the decoded [`DebugData`](crate::DebugData).
///
/// ## Error Categories
///
/// 1. **Format errors**: Truncated, UnsupportedVersion, Malformed
/// 2. **Parse errors**: Parse, NotCallable
/// 3. **Resolution errors**: UnknownVariable, UnknownMember, NoMatchingFunction, AmbiguousCall
/// 4. **Assignment errors**: NotAnLvalue, AssignToConstant, AssignToConst
/// 5. **Evaluation errors**: TypeMismatch, DivideByZero, NullThis, MemberReadFailed,
///    InvalidArrayIndex, WriteFailed, Sandbox
/// 6. **Configuration errors**: InvalidConfig
/// 7. **I/O errors**: Io (for reading debug-info files)
#[derive(Error, Debug)]
pub enum ZdbError
{
    /// The buffer ended before a field could be read
    ///
    /// Decoding never produces a partially populated store; any short read
    /// fails the whole decode.
    #[error("Truncated debug info: needed {needed} byte(s) at offset {offset}")]
    Truncated
    {
        /// Byte offset where the read started
        offset: usize,
        /// Number of bytes the read required
        needed: usize,
    },

    /// The format version in the header is not the one this build understands
    #[error("Unsupported debug info version {found} (expected {expected})")]
    UnsupportedVersion
    {
        /// Version found in the buffer
        found: u32,
        /// The single supported version
        expected: u32,
    },

    /// The buffer decoded but violates a structural invariant
    ///
    /// Examples:
    /// - A scope whose parent index is out of range
    /// - A cyclic class inheritance chain
    /// - A type referring to a missing scope
    #[error("Malformed debug info: {0}")]
    Malformed(String),

    /// The expression text could not be parsed
    #[error("Parse error at column {position}: {message}")]
    Parse
    {
        /// What the parser expected or found
        message: String,
        /// Byte offset into the expression text
        position: usize,
    },

    /// A call was applied to something other than a name or member
    #[error("Expression is not callable")]
    NotCallable,

    /// An identifier did not resolve to a symbol
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    /// A member access named a field the class does not have
    #[error("Member not found: {0}")]
    UnknownMember(String),

    /// No overload accepted the argument list
    #[error("No matching function: {0}")]
    NoMatchingFunction(String),

    /// Two or more overloads scored equally
    #[error("Ambiguous function call '{0}'. Multiple overloads match.")]
    AmbiguousCall(String),

    /// The left side of `=` is not a variable, member, or index
    #[error("Expression is not an l-value (cannot be assigned to)")]
    NotAnLvalue,

    /// Assignment to a compile-time constant
    #[error("Cannot assign to constant: {0}")]
    AssignToConstant(String),

    /// Assignment to a const-qualified variable or member
    #[error("Cannot assign to const variable: {0}")]
    AssignToConst(String),

    /// An operation was applied to a value of the wrong type
    #[error("{0}")]
    TypeMismatch(String),

    /// Division with a zero divisor
    #[error("Divide by zero")]
    DivideByZero,

    /// A class field was read or written while no object is bound to `this`
    #[error("'this' is null")]
    NullThis,

    /// The VM could not read a member of an object (null or invalid object)
    #[error("Failed to read member: {0}")]
    MemberReadFailed(String),

    /// The VM rejected an array access
    #[error("Invalid index for array: {0}")]
    InvalidArrayIndex(i32),

    /// The VM rejected a write
    #[error("Failed to write to {0}")]
    WriteFailed(String),

    /// A function call made by the evaluator failed inside the sandbox
    #[error("{0}")]
    Sandbox(#[from] SandboxError),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error (for reading debug-info files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for `Result<T, ZdbError>`
///
/// ```rust
/// use zdb_core::error::ZdbResult;
/// fn foo() -> ZdbResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type ZdbResult<T> = std::result::Result<T, ZdbError>;

/// Build a [`ZdbError::Malformed`] from a format string.
macro_rules! malformed {
    ($($arg:tt)*) => {
        $crate::error::ZdbError::Malformed(format!($($arg)*))
    };
}

pub(crate) use malformed;
