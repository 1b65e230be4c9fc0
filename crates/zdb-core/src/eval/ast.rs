//! Expression tree produced by the parser.

use std::fmt;

use super::value::DebugValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp
{
    /// `-x`
    Negate,
    /// `~x`
    BitNot,
    /// `!x`
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp
{
    LogicalOr,
    LogicalAnd,
    BitOr,
    BitXor,
    BitAnd,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp
{
    #[must_use]
    pub const fn symbol(self) -> &'static str
    {
        match self {
            BinaryOp::LogicalOr => "||",
            BinaryOp::LogicalAnd => "&&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::BitAnd => "&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }

    #[must_use]
    pub const fn is_comparison(self) -> bool
    {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    #[must_use]
    pub const fn is_bitwise(self) -> bool
    {
        matches!(self, BinaryOp::BitOr | BinaryOp::BitXor | BinaryOp::BitAnd)
    }
}

impl fmt::Display for BinaryOp
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.symbol())
    }
}

/// One node of a parsed expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr
{
    /// Number or `true`/`false`.
    Literal(DebugValue),
    /// String literal, already unescaped.
    Str(String),
    /// Possibly qualified identifier, e.g. `game::lives`.
    Var(String),
    Unary
    {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary
    {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `object->member`
    Member
    {
        object: Box<Expr>,
        member: String,
    },
    /// `name(args)` or `receiver->name(args)`.
    Call
    {
        name: String,
        args: Vec<Expr>,
        receiver: Option<Box<Expr>>,
    },
    /// `base[index]`
    Index
    {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    /// `target = value`
    Assign
    {
        target: Box<Expr>,
        value: Box<Expr>,
    },
}
