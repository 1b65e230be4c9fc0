//! # Expression Parser
//!
//! Recursive-descent parser for watch expressions. Precedence, lowest first:
//!
//! | Level          | Operators                     | Associativity |
//! |----------------|-------------------------------|---------------|
//! | assignment     | `=`                           | right         |
//! | logical or     | `\|\|`                        | left          |
//! | logical and    | `&&`                          | left          |
//! | bitwise or     | `\|`                          | left          |
//! | bitwise xor    | `^`                           | left          |
//! | bitwise and    | `&`                           | left          |
//! | equality       | `==` `!=`                     | left          |
//! | relational     | `<` `<=` `>` `>=`             | left          |
//! | additive       | `+` `-`                       | left          |
//! | multiplicative | `*` `/`                       | left          |
//! | unary          | `-` `~` `!`                   | right         |
//! | postfix        | `f(..)` `->m` `[i]`           | left          |
//!
//! Integer literals are fixed-point `int`s unless suffixed with `L`.
//! `new Foo::Bar(args)` is sugar for calling the constructor `Foo::Bar::Bar`.

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::value::{DebugValue, FIXED_ONE};
use crate::debug_data::TypeId;
use crate::error::{ZdbError, ZdbResult};

/// Deepest nesting accepted before giving up, counting chain links.
const MAX_DEPTH: usize = 128;

/// Parse a complete expression.
///
/// ## Errors
///
/// - `Parse` for syntax errors and trailing input, with the byte offset
/// - `NotCallable` when a call is applied to anything but a name or member
///
/// ## Example
///
/// ```rust
/// use zdb_core::eval::{parse_expression, BinaryOp, Expr};
///
/// let expr = parse_expression("a + b * 2")?;
/// assert!(matches!(expr, Expr::Binary { op: BinaryOp::Add, .. }));
/// # Ok::<(), zdb_core::ZdbError>(())
/// ```
pub fn parse_expression(text: &str) -> ZdbResult<Expr>
{
    let mut parser = Parser::new(text);
    let expr = parser.parse_assignment()?;
    parser.skip_whitespace();
    if !parser.at_end() {
        return Err(parser.error("Unexpected trailing input"));
    }
    Ok(expr)
}

struct Parser<'a>
{
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
}

fn is_ident_start(c: u8) -> bool
{
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_ident_char(c: u8) -> bool
{
    c.is_ascii_alphanumeric() || c == b'_' || c == b':'
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr
{
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

impl<'a> Parser<'a>
{
    fn new(input: &'a str) -> Self
    {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
            depth: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> ZdbError
    {
        ZdbError::Parse {
            message: message.into(),
            position: self.pos,
        }
    }

    fn at_end(&self) -> bool
    {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8>
    {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<u8>
    {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn bump(&mut self) -> Option<u8>
    {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_whitespace(&mut self)
    {
        while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    /// Skip whitespace, then consume `c` if it is next.
    fn eat(&mut self, c: u8) -> bool
    {
        self.skip_whitespace();
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Skip whitespace, then consume the two-byte operator `op` if it is next.
    fn eat_pair(&mut self, op: &[u8; 2]) -> bool
    {
        self.skip_whitespace();
        if self.peek() == Some(op[0]) && self.peek_at(1) == Some(op[1]) {
            self.pos += 2;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: u8, message: &str) -> ZdbResult<()>
    {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(message))
        }
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a str
    {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        // Only ASCII bytes are consumed, so both ends are char boundaries.
        &self.input[start..self.pos]
    }

    /// Count one more level of nesting, failing past [`MAX_DEPTH`].
    ///
    /// Each link of a binary or postfix chain counts as a level, so long flat
    /// chains are limited as well as parenthesised ones.
    fn descend(&mut self) -> ZdbResult<()>
    {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error("Expression is nested too deeply"));
        }
        Ok(())
    }

    fn parse_assignment(&mut self) -> ZdbResult<Expr>
    {
        self.descend()?;

        let left = self.parse_logical_or()?;
        self.skip_whitespace();
        let result = if self.peek() == Some(b'=') && self.peek_at(1) != Some(b'=') {
            self.pos += 1;
            let value = self.parse_assignment()?;
            Expr::Assign {
                target: Box::new(left),
                value: Box::new(value),
            }
        } else {
            left
        };

        self.depth -= 1;
        Ok(result)
    }

    fn parse_logical_or(&mut self) -> ZdbResult<Expr>
    {
        let chain = self.depth;
        let mut left = self.parse_logical_and()?;
        while self.eat_pair(b"||") {
            self.descend()?;
            let right = self.parse_logical_and()?;
            left = binary(BinaryOp::LogicalOr, left, right);
        }
        self.depth = chain;
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> ZdbResult<Expr>
    {
        let chain = self.depth;
        let mut left = self.parse_bit_or()?;
        while self.eat_pair(b"&&") {
            self.descend()?;
            let right = self.parse_bit_or()?;
            left = binary(BinaryOp::LogicalAnd, left, right);
        }
        self.depth = chain;
        Ok(left)
    }

    fn parse_bit_or(&mut self) -> ZdbResult<Expr>
    {
        let chain = self.depth;
        let mut left = self.parse_bit_xor()?;
        loop {
            self.skip_whitespace();
            if self.peek() != Some(b'|') || self.peek_at(1) == Some(b'|') {
                break;
            }
            self.pos += 1;
            self.descend()?;
            let right = self.parse_bit_xor()?;
            left = binary(BinaryOp::BitOr, left, right);
        }
        self.depth = chain;
        Ok(left)
    }

    fn parse_bit_xor(&mut self) -> ZdbResult<Expr>
    {
        let chain = self.depth;
        let mut left = self.parse_bit_and()?;
        while self.eat(b'^') {
            self.descend()?;
            let right = self.parse_bit_and()?;
            left = binary(BinaryOp::BitXor, left, right);
        }
        self.depth = chain;
        Ok(left)
    }

    fn parse_bit_and(&mut self) -> ZdbResult<Expr>
    {
        let chain = self.depth;
        let mut left = self.parse_equality()?;
        loop {
            self.skip_whitespace();
            if self.peek() != Some(b'&') || self.peek_at(1) == Some(b'&') {
                break;
            }
            self.pos += 1;
            self.descend()?;
            let right = self.parse_equality()?;
            left = binary(BinaryOp::BitAnd, left, right);
        }
        self.depth = chain;
        Ok(left)
    }

    fn parse_equality(&mut self) -> ZdbResult<Expr>
    {
        let chain = self.depth;
        let mut left = self.parse_relational()?;
        loop {
            let op = if self.eat_pair(b"==") {
                BinaryOp::Eq
            } else if self.eat_pair(b"!=") {
                BinaryOp::Ne
            } else {
                break;
            };
            self.descend()?;
            let right = self.parse_relational()?;
            left = binary(op, left, right);
        }
        self.depth = chain;
        Ok(left)
    }

    fn parse_relational(&mut self) -> ZdbResult<Expr>
    {
        let chain = self.depth;
        let mut left = self.parse_additive()?;
        loop {
            self.skip_whitespace();
            let op = match (self.peek(), self.peek_at(1)) {
                (Some(b'<'), Some(b'=')) => BinaryOp::Le,
                (Some(b'>'), Some(b'=')) => BinaryOp::Ge,
                (Some(b'<'), _) => BinaryOp::Lt,
                (Some(b'>'), _) => BinaryOp::Gt,
                _ => break,
            };
            self.pos += op.symbol().len();
            self.descend()?;
            let right = self.parse_additive()?;
            left = binary(op, left, right);
        }
        self.depth = chain;
        Ok(left)
    }

    fn parse_additive(&mut self) -> ZdbResult<Expr>
    {
        let chain = self.depth;
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = if self.eat(b'+') {
                BinaryOp::Add
            } else if self.eat(b'-') {
                BinaryOp::Sub
            } else {
                break;
            };
            self.descend()?;
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
        self.depth = chain;
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> ZdbResult<Expr>
    {
        let chain = self.depth;
        let mut left = self.parse_unary()?;
        loop {
            let op = if self.eat(b'*') {
                BinaryOp::Mul
            } else if self.eat(b'/') {
                BinaryOp::Div
            } else {
                break;
            };
            self.descend()?;
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
        self.depth = chain;
        Ok(left)
    }

    fn parse_unary(&mut self) -> ZdbResult<Expr>
    {
        self.skip_whitespace();
        let op = match self.peek() {
            Some(b'-') => UnaryOp::Negate,
            Some(b'~') => UnaryOp::BitNot,
            Some(b'!') => UnaryOp::Not,
            _ => return self.parse_postfix(),
        };
        self.pos += 1;

        self.descend()?;
        let operand = self.parse_unary()?;
        self.depth -= 1;

        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_postfix(&mut self) -> ZdbResult<Expr>
    {
        let chain = self.depth;
        self.skip_whitespace();
        // A parenthesised callee is an expression, not a name.
        let mut callable = self.peek() != Some(b'(');
        let mut expr = self.parse_primary()?;
        loop {
            self.skip_whitespace();
            if self.eat(b'(') {
                self.descend()?;
                let args = self.parse_arguments()?;
                expr = match expr {
                    Expr::Var(name) if callable => Expr::Call {
                        name,
                        args,
                        receiver: None,
                    },
                    Expr::Member { object, member } if callable => Expr::Call {
                        name: member,
                        args,
                        receiver: Some(object),
                    },
                    _ => return Err(ZdbError::NotCallable),
                };
            } else if self.eat_pair(b"->") {
                self.descend()?;
                self.skip_whitespace();
                let member = self.take_while(|c| c.is_ascii_alphanumeric() || c == b'_');
                if member.is_empty() {
                    return Err(self.error("Expected member name"));
                }
                expr = Expr::Member {
                    object: Box::new(expr),
                    member: member.to_string(),
                };
                callable = true;
            } else if self.eat(b'[') {
                self.descend()?;
                let index = self.parse_assignment()?;
                self.expect(b']', "Expected ']' after array index")?;
                expr = Expr::Index {
                    base: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                self.depth = chain;
                return Ok(expr);
            }
        }
    }

    /// Arguments after an already consumed `(`, through the closing `)`.
    fn parse_arguments(&mut self) -> ZdbResult<Vec<Expr>>
    {
        let mut args = Vec::new();
        if self.eat(b')') {
            return Ok(args);
        }
        loop {
            args.push(self.parse_assignment()?);
            if !self.eat(b',') {
                break;
            }
        }
        self.expect(b')', "Expected ')' after arguments")?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> ZdbResult<Expr>
    {
        self.skip_whitespace();
        match self.peek() {
            None => Err(self.error("Unexpected end of expression")),
            Some(b'"') => {
                self.pos += 1;
                self.parse_string()
            }
            Some(c) if c.is_ascii_digit() => self.parse_number(),
            Some(b'(') => {
                self.pos += 1;
                let inner = self.parse_assignment()?;
                self.expect(b')', "Expected ')'")?;
                Ok(inner)
            }
            Some(c) if is_ident_start(c) => self.parse_identifier(),
            Some(_) => Err(self.error("Unexpected character")),
        }
    }

    /// String body after the opening quote.
    fn parse_string(&mut self) -> ZdbResult<Expr>
    {
        let mut bytes = Vec::new();
        loop {
            match self.bump() {
                None => return Err(self.error("Unterminated string literal")),
                Some(b'"') => break,
                Some(b'\\') => {
                    let escaped = self.bump().ok_or_else(|| self.error("Unexpected end of string"))?;
                    bytes.push(match escaped {
                        b'n' => b'\n',
                        b'r' => b'\r',
                        b't' => b'\t',
                        b'0' => b'\0',
                        other => other,
                    });
                }
                Some(c) => bytes.push(c),
            }
        }
        Ok(Expr::Str(String::from_utf8_lossy(&bytes).into_owned()))
    }

    fn parse_number(&mut self) -> ZdbResult<Expr>
    {
        let start = self.pos;
        let digits = self.take_while(|c| c.is_ascii_digit());
        let is_long = self.peek() == Some(b'L');
        if is_long {
            self.pos += 1;
        }

        let out_of_range = || ZdbError::Parse {
            message: format!("Integer literal out of range: {digits}"),
            position: start,
        };
        let value: i32 = digits.parse().map_err(|_| out_of_range())?;
        let literal = if is_long {
            DebugValue::long(value)
        } else {
            DebugValue::new(value.checked_mul(FIXED_ONE).ok_or_else(out_of_range)?, TypeId::INT)
        };
        Ok(Expr::Literal(literal))
    }

    fn parse_identifier(&mut self) -> ZdbResult<Expr>
    {
        let id = self.take_while(is_ident_char);
        match id {
            "true" => Ok(Expr::Literal(DebugValue::bool(true))),
            "false" => Ok(Expr::Literal(DebugValue::bool(false))),
            "new" => self.parse_new(),
            _ => Ok(Expr::Var(id.to_string())),
        }
    }

    /// `new Type(args)` after the keyword.
    fn parse_new(&mut self) -> ZdbResult<Expr>
    {
        self.skip_whitespace();
        let class_name = self.take_while(is_ident_char);
        if class_name.is_empty() {
            return Err(self.error("Expected class name after 'new'"));
        }
        if !self.eat(b'(') {
            return Err(self.error("Expected '(' after class name in new expression"));
        }
        let args = self.parse_arguments()?;

        let constructor = class_name.rsplit(':').next().unwrap_or(class_name);
        Ok(Expr::Call {
            name: format!("{class_name}::{constructor}"),
            args,
            receiver: None,
        })
    }
}
