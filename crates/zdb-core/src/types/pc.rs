//! Program counter type.

use std::fmt;
use std::ops::Add;

/// Strongly typed program counter
///
/// A `Pc` is an instruction index into the compiled script, not a byte
/// address. Scope ranges, line-table rows, and sandboxed calls are all keyed by
/// it.
///
/// ## Example
///
/// ```rust
/// use zdb_core::types::Pc;
///
/// let pc = Pc::from(10);
/// assert_eq!((pc + 5).value(), 15);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pc(u32);

impl Pc
{
    /// The first instruction of the program.
    pub const ZERO: Self = Pc(0);

    /// Create a program counter from a raw instruction index
    ///
    /// Usable in const contexts, unlike `Pc::from`.
    #[must_use]
    pub const fn new(value: u32) -> Self
    {
        Pc(value)
    }

    /// Raw instruction index.
    #[must_use]
    pub const fn value(self) -> u32
    {
        self.0
    }

    /// Add an instruction delta, checking for overflow.
    #[must_use]
    pub fn checked_add(self, delta: u32) -> Option<Self>
    {
        self.0.checked_add(delta).map(Pc)
    }
}

impl From<u32> for Pc
{
    fn from(value: u32) -> Self
    {
        Pc(value)
    }
}

impl From<Pc> for u32
{
    fn from(pc: Pc) -> Self
    {
        pc.0
    }
}

impl fmt::Display for Pc
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.0)
    }
}

impl Add<u32> for Pc
{
    type Output = Pc;

    fn add(self, rhs: u32) -> Self::Output
    {
        Pc(self.0.wrapping_add(rhs))
    }
}
