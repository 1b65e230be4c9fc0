//! # Overload Resolution
//!
//! Picks the function a call expression targets among the candidates
//! [`DebugData::resolve_functions`] collects.
//!
//! Each argument scores against its parameter:
//!
//! | Match                              | Points |
//! |------------------------------------|--------|
//! | identical type                     | 10     |
//! | parameter is `untyped`             | 5      |
//! | argument coerces to the parameter  | 1      |
//! | anything else                      | reject |
//!
//! Arguments past the fixed parameters of a variadic function score against
//! the element type of its trailing array parameter. Hidden parameters (the
//! implicit `this`) never take part.
//!
//! The highest total wins. On a tie a fixed-arity candidate beats a variadic
//! one; any other tie is an ambiguous call.

use tracing::trace;

use crate::debug_data::{DebugData, ScopeId, TypeId};
use crate::error::{ZdbError, ZdbResult};

/// Visible parameters of a function and whether the last one is variadic.
struct Signature
{
    params: Vec<TypeId>,
    is_vararg: bool,
}

impl Signature
{
    fn of(data: &DebugData, function: ScopeId) -> Self
    {
        let mut params = Vec::new();
        let mut is_vararg = false;
        for symbol in data.child_symbols(function).iter().map(|id| data.symbol(*id)) {
            if symbol.is_hidden() {
                continue;
            }
            params.push(symbol.type_id);
            if symbol.is_varargs() {
                is_vararg = true;
            }
        }
        Self { params, is_vararg }
    }

    fn fixed_count(&self) -> usize
    {
        if self.is_vararg {
            self.params.len().saturating_sub(1)
        } else {
            self.params.len()
        }
    }

    /// Score `args` against this signature, or `None` if they do not fit.
    fn score(&self, data: &DebugData, args: &[TypeId]) -> Option<u32>
    {
        let fixed = self.fixed_count();
        if args.len() < fixed || (!self.is_vararg && args.len() != fixed) {
            return None;
        }

        let mut score = 0;
        for (i, arg) in args.iter().enumerate() {
            let target = if i < fixed {
                self.params[i]
            } else {
                data.array_element_type(*self.params.last()?)?
            };

            score += if *arg == target {
                10
            } else if data.is_untyped(target) {
                5
            } else if data.can_coerce_types(*arg, target) {
                1
            } else {
                return None;
            };
        }
        Some(score)
    }
}

/// Choose the overload of `name` that best fits `arg_types`, searching from `scope`.
///
/// Returns `Ok(None)` when no candidate accepts the arguments.
///
/// ## Errors
///
/// Returns `AmbiguousCall` when two candidates of equal variadic-ness tie for
/// the best score.
pub fn resolve_overload(
    data: &DebugData,
    name: &str,
    arg_types: &[TypeId],
    scope: Option<ScopeId>,
) -> ZdbResult<Option<ScopeId>>
{
    let candidates = data.resolve_functions(name, scope);

    let mut best: Option<(ScopeId, u32, bool)> = None;
    let mut ambiguous = false;

    for candidate in candidates {
        let signature = Signature::of(data, candidate);
        let Some(score) = signature.score(data, arg_types) else {
            continue;
        };
        trace!(function = %candidate, score, vararg = signature.is_vararg, "scored overload");

        match best {
            Some((_, best_score, _)) if score < best_score => {}
            Some((_, best_score, best_vararg)) if score == best_score => {
                if best_vararg && !signature.is_vararg {
                    best = Some((candidate, score, false));
                    ambiguous = false;
                } else if best_vararg == signature.is_vararg {
                    ambiguous = true;
                }
            }
            _ => {
                best = Some((candidate, score, signature.is_vararg));
                ambiguous = false;
            }
        }
    }

    if ambiguous {
        return Err(ZdbError::AmbiguousCall(name.to_string()));
    }
    Ok(best.map(|(function, _, _)| function))
}
