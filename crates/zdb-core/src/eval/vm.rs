//! # VM Capability Interface
//!
//! The evaluator never touches the host VM directly. Everything it needs from
//! the paused program goes through [`VmInterface`], which keeps the evaluator
//! testable against a mock and keeps host memory layout out of this crate.
//!
//! ## Sandboxed calls
//!
//! Function calls in watch expressions run through
//! [`VmInterface::execute_sandboxed`]. The host is expected to run the call on
//! an isolated frame and to refuse anything that would suspend the script or
//! run forever. Those refusals come back as [`SandboxError`].

use thiserror::Error;

use super::value::DebugValue;
use crate::debug_data::{DebugSymbol, TypeId};
use crate::types::Pc;

/// Why a sandboxed function call did not return a value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SandboxError
{
    /// The callee tried to yield to the engine (e.g. `Waitframe`)
    #[error("Cannot call Waitframe for expressions evaluated in the debugger")]
    BlockingCall,

    /// The host's step limit tripped
    #[error("Detected possible infinite loop, aborting function call")]
    Runaway,

    /// The sandbox frame ran out of stack
    #[error("Function call overflowed")]
    StackOverflow,

    /// Any other failure reported by the host
    #[error("{0}")]
    Failed(String),
}

/// Access to the state of a paused script VM.
///
/// All methods take `&mut self`: even reads may need to pin or page in host
/// objects, and the writes are real side effects on the running program.
///
/// ## Conventions
///
/// - Stack offsets are relative to the current frame.
/// - Registers are identified by the host's numeric register id.
/// - Array and object handles are raw VM words; `0` is null.
pub trait VmInterface
{
    fn read_stack(&mut self, offset: i32) -> i32;

    fn read_global(&mut self, index: i32) -> i32;

    fn read_register(&mut self, register: i32) -> i32;

    /// Read field `member` of `object`.
    ///
    /// Returns `None` for a null or dangling object.
    fn read_object_member(&mut self, object: DebugValue, member: &DebugSymbol) -> Option<DebugValue>;

    /// Snapshot every element of `array`, or `None` for an invalid handle.
    fn read_array(&mut self, array: DebugValue) -> Option<Vec<DebugValue>>;

    /// Read one element, or `None` for an invalid handle or an out-of-range index.
    fn read_array_element(&mut self, array: DebugValue, index: i32) -> Option<DebugValue>;

    /// Read a string by its handle.
    fn read_string(&mut self, handle: i32) -> Option<String>;

    fn write_stack(&mut self, offset: i32, value: i32);

    fn write_global(&mut self, index: i32, value: i32);

    fn write_register(&mut self, register: i32, value: i32);

    /// Write field `member` of `object`. Returns `false` if the object is invalid.
    fn write_object_member(&mut self, object: DebugValue, member: &DebugSymbol, value: DebugValue) -> bool;

    /// Write one element. Returns `false` for an invalid handle or index.
    fn write_array_element(&mut self, array: DebugValue, index: i32, value: DebugValue) -> bool;

    /// Release the reference held by the slot of `symbol` on `value`.
    fn decrease_object_reference(&mut self, value: DebugValue, symbol: &DebugSymbol);

    /// Take a reference for the slot of `symbol` on `value`.
    fn increase_object_reference(&mut self, value: DebugValue, symbol: &DebugSymbol);

    /// Run the function starting at `start_pc` on an isolated frame.
    ///
    /// `this_register` is the register to bind `this` to (0 for none) and
    /// `this_value` the object handle. Returns the raw return value.
    ///
    /// ## Errors
    ///
    /// Returns a [`SandboxError`] when the host refuses or aborts the call.
    fn execute_sandboxed(&mut self, start_pc: Pc, this_register: i32, this_value: i32, args: &[i32]) -> Result<i32, SandboxError>;

    /// Allocate a new array holding `values`, typed `array_type`.
    fn create_array(&mut self, values: Vec<i32>, array_type: TypeId) -> DebugValue;

    /// Allocate a new string.
    fn create_string(&mut self, text: &str) -> DebugValue;

    /// Object bound to `this` in the paused frame, or 0.
    fn get_this_pointer(&mut self) -> i32;
}
