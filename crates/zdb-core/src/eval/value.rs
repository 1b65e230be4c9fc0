//! Runtime values as seen by the evaluator.

use std::fmt;

use crate::debug_data::TypeId;

/// Scale of the fixed-point `int` representation: raw `10000` is `1.0`.
pub const FIXED_ONE: i32 = 10_000;

/// A raw VM word tagged with its static type.
///
/// `int` values are fixed-point (see [`FIXED_ONE`]); `long` values are plain
/// integers; `bool` values use `FIXED_ONE` for true. Arrays, strings, and
/// objects are VM handles, with `0` meaning null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DebugValue
{
    pub raw: i32,
    pub type_id: TypeId,
    /// Whether the value names a storage location that can be assigned.
    pub is_lvalue: bool,
}

impl DebugValue
{
    /// An r-value of type `type_id`.
    #[must_use]
    pub const fn new(raw: i32, type_id: TypeId) -> Self
    {
        Self {
            raw,
            type_id,
            is_lvalue: false,
        }
    }

    /// The value every `void` expression evaluates to.
    #[must_use]
    pub const fn void() -> Self
    {
        Self::new(0, TypeId::VOID)
    }

    #[must_use]
    pub const fn bool(value: bool) -> Self
    {
        Self::new(if value { FIXED_ONE } else { 0 }, TypeId::BOOL)
    }

    /// A whole-number `int`, scaled to fixed point.
    #[must_use]
    pub const fn int(whole: i32) -> Self
    {
        Self::new(whole.wrapping_mul(FIXED_ONE), TypeId::INT)
    }

    #[must_use]
    pub const fn long(value: i32) -> Self
    {
        Self::new(value, TypeId::LONG)
    }

    #[must_use]
    pub const fn as_lvalue(mut self) -> Self
    {
        self.is_lvalue = true;
        self
    }

    #[must_use]
    pub const fn is_truthy(self) -> bool
    {
        self.raw != 0
    }
}

impl fmt::Display for DebugValue
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{} (type {})", self.raw, self.type_id)
    }
}

/// Split a fixed-point raw value into `W.FFFF` form.
#[must_use]
pub fn format_fixed(raw: i32) -> String
{
    let sign = if raw < 0 { "-" } else { "" };
    let whole = (raw / FIXED_ONE).unsigned_abs();
    let frac = (raw % FIXED_ONE).unsigned_abs();
    format!("{sign}{whole}.{frac:04}")
}
