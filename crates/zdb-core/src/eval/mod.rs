//! # Watch-Expression Evaluation
//!
//! Parses and evaluates debugger expressions such as `enemy->hp * 2`,
//! `items[i] = 0`, or `game::spawn(3, "bat")` against a paused script VM.
//!
//! ## Pipeline
//!
//! 1. [`parse_expression`] turns text into an [`Expr`] tree
//! 2. [`Evaluator`] resolves names through [`DebugData`](crate::DebugData) and
//!    reads or writes program state through a [`VmInterface`]
//! 3. [`ValueFormatter`] renders the resulting [`DebugValue`]
//!
//! [`evaluate_expression`] runs steps 1 and 2 in one call.

pub mod ast;
pub mod display;
pub mod evaluator;
pub mod overload;
pub mod parser;
pub mod value;
pub mod vm;

use tracing::debug;

pub use ast::{BinaryOp, Expr, UnaryOp};
pub use display::ValueFormatter;
pub use evaluator::Evaluator;
pub use overload::resolve_overload;
pub use parser::parse_expression;
pub use value::{format_fixed, DebugValue, FIXED_ONE};
pub use vm::{SandboxError, VmInterface};

use crate::debug_data::{DebugData, ScopeId};
use crate::error::ZdbResult;

/// Parse `text` and evaluate it in `scope`.
///
/// Parse and evaluation failures both come back as a single [`ZdbError`](crate::ZdbError);
/// no value is produced alongside an error.
///
/// ## Errors
///
/// See [`parse_expression`] and [`Evaluator::evaluate`].
pub fn evaluate_expression<V>(data: &DebugData, scope: Option<ScopeId>, vm: &mut V, text: &str) -> ZdbResult<DebugValue>
where
    V: VmInterface + ?Sized,
{
    let expr = parse_expression(text)?;
    let result = Evaluator::new(data, scope, vm).evaluate(&expr);
    match &result {
        Ok(value) => debug!(expression = text, raw = value.raw, type_id = %value.type_id, "evaluated expression"),
        Err(err) => debug!(expression = text, error = %err, "expression failed"),
    }
    result
}
