//! # Expression Evaluator
//!
//! Walks an [`Expr`] against a paused VM. Names resolve through the
//! [`DebugData`] scope tree as seen from the scope the evaluator was created
//! for; storage is read and written only through [`VmInterface`].
//!
//! ## Arithmetic
//!
//! `int` is fixed-point with four decimal digits, so:
//!
//! - `+` and `-` work on raw values directly
//! - `*` widens to 64 bits and divides the product by [`FIXED_ONE`]
//! - `/` widens the dividend by [`FIXED_ONE`] before dividing
//! - bitwise operators work on the whole part and rescale
//!
//! The result is an `int` when either operand is an `int`, otherwise a `long`.
//! Comparisons and logical operators yield `bool`. Unary operators keep the
//! operand's type: `~` inverts the raw word and `!` yields one or zero.
//!
//! ## Reference counting
//!
//! Assigning into an array- or class-typed slot releases the old value before
//! the write and retains the new value after it, mirroring what compiled code
//! does. Both happen even when old and new are the same object. If the VM
//! rejects the write the old value is retained again.

use tracing::debug;

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::overload::resolve_overload;
use super::value::{DebugValue, FIXED_ONE};
use super::vm::VmInterface;
use crate::debug_data::{DebugData, DebugSymbol, DebugType, ScopeId, SymbolId, SymbolStorage, TypeId};
use crate::error::{ZdbError, ZdbResult};

/// Evaluates expressions in one lexical scope against one VM.
pub struct Evaluator<'a, V: VmInterface + ?Sized>
{
    data: &'a DebugData,
    scope: Option<ScopeId>,
    vm: &'a mut V,
}

impl<'a, V: VmInterface + ?Sized> Evaluator<'a, V>
{
    /// Create an evaluator resolving names from `scope`.
    ///
    /// `None` means no scope is known (e.g. the pc is outside every function),
    /// in which case only literals and arithmetic evaluate.
    pub fn new(data: &'a DebugData, scope: Option<ScopeId>, vm: &'a mut V) -> Self
    {
        Self { data, scope, vm }
    }

    /// Evaluate `expr`.
    ///
    /// ## Errors
    ///
    /// Any resolution or evaluation failure; see [`ZdbError`].
    pub fn evaluate(&mut self, expr: &Expr) -> ZdbResult<DebugValue>
    {
        let data = self.data;
        match expr {
            Expr::Literal(value) => Ok(*value),
            Expr::Str(text) => Ok(self.vm.create_string(text)),
            Expr::Var(name) => {
                let symbol = data
                    .resolve_symbol(name, self.scope)
                    .ok_or_else(|| ZdbError::UnknownVariable(name.clone()))?;
                self.read_symbol(symbol)
            }
            Expr::Unary { op, operand } => {
                let value = self.evaluate(operand)?;
                Ok(Self::eval_unary_op(*op, value))
            }
            Expr::Binary { op, left, right } => self.eval_binary(*op, left, right),
            Expr::Member { object, member } => {
                let object = self.evaluate(object)?;
                let symbol = self.member_symbol(object, member)?;
                self.vm
                    .read_object_member(object, data.symbol(symbol))
                    .map(DebugValue::as_lvalue)
                    .ok_or_else(|| ZdbError::MemberReadFailed(member.clone()))
            }
            Expr::Call { name, args, receiver } => self.eval_call(name, args, receiver.as_deref()),
            Expr::Index { base, index } => {
                let (array, index) = self.eval_array_target(base, index)?;
                self.vm
                    .read_array_element(array, index)
                    .map(DebugValue::as_lvalue)
                    .ok_or(ZdbError::InvalidArrayIndex(index))
            }
            Expr::Assign { target, value } => {
                let value = self.evaluate(value)?;
                self.assign_to(target, value)?;
                Ok(DebugValue { is_lvalue: false, ..value })
            }
        }
    }

    /// Current value of `symbol` in the paused frame.
    ///
    /// ## Errors
    ///
    /// Class fields need a bound `this`; returns `NullThis` without one and
    /// `MemberReadFailed` if the VM cannot read the field.
    fn read_symbol(&mut self, symbol: SymbolId) -> ZdbResult<DebugValue>
    {
        let data = self.data;
        let symbol = data.symbol(symbol);
        let raw = match symbol.storage {
            SymbolStorage::Constant => return Ok(DebugValue::new(symbol.offset, symbol.type_id)),
            SymbolStorage::Stack => self.vm.read_stack(symbol.offset),
            SymbolStorage::Global => self.vm.read_global(symbol.offset),
            SymbolStorage::Register => self.vm.read_register(symbol.offset),
            SymbolStorage::Class => {
                let this = self.this_object(symbol.scope)?;
                return self
                    .vm
                    .read_object_member(this, symbol)
                    .map(DebugValue::as_lvalue)
                    .ok_or_else(|| ZdbError::MemberReadFailed(symbol.name.clone()));
            }
        };
        Ok(DebugValue::new(raw, symbol.type_id).as_lvalue())
    }

    /// Store `value` into the location named by `target`.
    ///
    /// ## Errors
    ///
    /// - `NotAnLvalue` unless `target` is a variable, member, or index
    /// - `AssignToConstant` / `AssignToConst` for constants and const-typed slots
    /// - `WriteFailed` if the VM rejects the write
    pub fn assign_to(&mut self, target: &Expr, value: DebugValue) -> ZdbResult<()>
    {
        let data = self.data;
        match target {
            Expr::Var(name) => {
                let id = data
                    .resolve_symbol(name, self.scope)
                    .ok_or_else(|| ZdbError::UnknownVariable(name.clone()))?;
                let symbol = data.symbol(id);
                if symbol.storage == SymbolStorage::Constant {
                    return Err(ZdbError::AssignToConstant(name.clone()));
                }
                if data.is_const(symbol.type_id) {
                    return Err(ZdbError::AssignToConst(name.clone()));
                }

                // Resolve `this` up front so a missing object fails before any release.
                let this = match symbol.storage {
                    SymbolStorage::Class => Some(self.this_object(symbol.scope)?),
                    _ => None,
                };
                let previous = if data.is_reference_type(symbol.type_id) {
                    let previous = self.read_symbol(id)?;
                    self.vm.decrease_object_reference(previous, symbol);
                    Some(previous)
                } else {
                    None
                };

                let written = match (symbol.storage, this) {
                    (SymbolStorage::Stack, _) => {
                        self.vm.write_stack(symbol.offset, value.raw);
                        true
                    }
                    (SymbolStorage::Global, _) => {
                        self.vm.write_global(symbol.offset, value.raw);
                        true
                    }
                    (SymbolStorage::Register, _) => {
                        self.vm.write_register(symbol.offset, value.raw);
                        true
                    }
                    (SymbolStorage::Class, Some(this)) => self.vm.write_object_member(this, symbol, value),
                    _ => false,
                };
                self.settle_references(previous, value, symbol, written);
                if written {
                    Ok(())
                } else {
                    Err(ZdbError::WriteFailed(format!("member variable {name}")))
                }
            }
            Expr::Member { object, member } => {
                let object = self.evaluate(object)?;
                let symbol = data.symbol(self.member_symbol(object, member)?);
                if data.is_const(symbol.type_id) {
                    return Err(ZdbError::AssignToConst(member.clone()));
                }

                let previous = if data.is_reference_type(symbol.type_id) {
                    let previous = self
                        .vm
                        .read_object_member(object, symbol)
                        .ok_or_else(|| ZdbError::MemberReadFailed(member.clone()))?;
                    self.vm.decrease_object_reference(previous, symbol);
                    Some(previous)
                } else {
                    None
                };
                let written = self.vm.write_object_member(object, symbol, value);
                self.settle_references(previous, value, symbol, written);
                if written {
                    Ok(())
                } else {
                    Err(ZdbError::WriteFailed(format!("member {member}")))
                }
            }
            Expr::Index { base, index } => {
                let (array, index) = self.eval_array_target(base, index)?;
                if self.vm.write_array_element(array, index, value) {
                    Ok(())
                } else {
                    Err(ZdbError::WriteFailed(format!("array element {index}")))
                }
            }
            _ => Err(ZdbError::NotAnLvalue),
        }
    }

    /// Retain the stored value after a write, or restore the released one if
    /// the write was rejected.
    fn settle_references(
        &mut self,
        previous: Option<DebugValue>,
        value: DebugValue,
        symbol: &DebugSymbol,
        written: bool,
    )
    {
        match (previous, written) {
            (Some(_), true) => self.vm.increase_object_reference(value, symbol),
            (Some(previous), false) => self.vm.increase_object_reference(previous, symbol),
            (None, _) => {}
        }
    }

    /// The object bound to `this` for a field declared in `class`.
    fn this_object(&mut self, class: ScopeId) -> ZdbResult<DebugValue>
    {
        let this = self.vm.get_this_pointer();
        if this == 0 {
            return Err(ZdbError::NullThis);
        }
        let type_id = self.data.type_for_scope(class).unwrap_or(TypeId::UNTYPED);
        Ok(DebugValue::new(this, type_id))
    }

    /// Field `member` of the class `object` is an instance of.
    fn member_symbol(&self, object: DebugValue, member: &str) -> ZdbResult<SymbolId>
    {
        let class = self
            .data
            .class_scope(object.type_id)
            .ok_or_else(|| ZdbError::TypeMismatch("Accessing member of non-class type".to_string()))?;
        self.data
            .resolve_member(class, member)
            .and_then(|resolved| resolved.symbol())
            .ok_or_else(|| ZdbError::UnknownMember(member.to_string()))
    }

    /// Evaluate `base[index]` down to the array handle and an integer index.
    fn eval_array_target(&mut self, base: &Expr, index: &Expr) -> ZdbResult<(DebugValue, i32)>
    {
        let mut array = self.evaluate(base)?;
        array.type_id = self.data.unwrap_const(array.type_id);
        if !self.data.is_array(array.type_id) {
            return Err(ZdbError::TypeMismatch("Indexing applied to non-array type".to_string()));
        }
        // The index is truncated to a whole number whatever its type.
        let index = self.evaluate(index)?.raw / FIXED_ONE;
        Ok((array, index))
    }

    fn eval_unary_op(op: UnaryOp, value: DebugValue) -> DebugValue
    {
        let raw = match op {
            UnaryOp::Negate => value.raw.wrapping_neg(),
            UnaryOp::BitNot => !value.raw,
            UnaryOp::Not if value.raw == 0 => FIXED_ONE,
            UnaryOp::Not => 0,
        };
        DebugValue::new(raw, value.type_id)
    }

    fn eval_binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> ZdbResult<DebugValue>
    {
        match op {
            BinaryOp::LogicalAnd => {
                if !self.evaluate(left)?.is_truthy() {
                    return Ok(DebugValue::bool(false));
                }
                Ok(DebugValue::bool(self.evaluate(right)?.is_truthy()))
            }
            BinaryOp::LogicalOr => {
                if self.evaluate(left)?.is_truthy() {
                    return Ok(DebugValue::bool(true));
                }
                Ok(DebugValue::bool(self.evaluate(right)?.is_truthy()))
            }
            _ => {
                let l = self.evaluate(left)?;
                let r = self.evaluate(right)?;
                if op.is_comparison() {
                    Ok(DebugValue::bool(compare(op, l.raw, r.raw)))
                } else {
                    self.eval_binary_op(op, l, r)
                }
            }
        }
    }

    /// Arithmetic and bitwise operators on two evaluated operands.
    fn eval_binary_op(&self, op: BinaryOp, l: DebugValue, r: DebugValue) -> ZdbResult<DebugValue>
    {
        let data = self.data;
        if data.is_string(l.type_id) || data.is_string(r.type_id) {
            return Err(ZdbError::TypeMismatch("Binary operations on strings not supported.".to_string()));
        }

        if data.is_bitflags(l.type_id) || data.is_bitflags(r.type_id) {
            return self.eval_bitflags_op(op, l, r);
        }

        let fixed = data.is_fixed(l.type_id) || data.is_fixed(r.type_id);
        let type_id = if fixed { TypeId::INT } else { TypeId::LONG };
        let raw = match op {
            BinaryOp::Add => l.raw.wrapping_add(r.raw),
            BinaryOp::Sub => l.raw.wrapping_sub(r.raw),
            BinaryOp::Mul if fixed => truncate(i64::from(l.raw) * i64::from(r.raw) / i64::from(FIXED_ONE)),
            BinaryOp::Mul => l.raw.wrapping_mul(r.raw),
            BinaryOp::Div if r.raw == 0 => return Err(ZdbError::DivideByZero),
            BinaryOp::Div if fixed => truncate(i64::from(l.raw) * i64::from(FIXED_ONE) / i64::from(r.raw)),
            BinaryOp::Div => l.raw.wrapping_div(r.raw),
            BinaryOp::BitOr | BinaryOp::BitXor | BinaryOp::BitAnd => bitwise(op, l.raw, r.raw, fixed),
            _ => return Err(ZdbError::TypeMismatch(format!("Invalid operator '{op}'"))),
        };
        Ok(DebugValue::new(raw, type_id))
    }

    fn eval_bitflags_op(&self, op: BinaryOp, l: DebugValue, r: DebugValue) -> ZdbResult<DebugValue>
    {
        let flags_scope = |value: DebugValue| match self.data.get_type_unwrap_const(value.type_id) {
            Some(DebugType::Bitflags(scope)) => Some(*scope),
            _ => None,
        };
        let scope = match (flags_scope(l), flags_scope(r)) {
            (Some(a), Some(b)) if a == b => a,
            _ => return Err(ZdbError::TypeMismatch("Bitflags operation requires matching types.".to_string())),
        };
        if !op.is_bitwise() {
            return Err(ZdbError::TypeMismatch(format!("Invalid operation '{op}' for Bitflags.")));
        }

        let fixed = self.data.scope(scope).type_id == TypeId::INT;
        Ok(DebugValue::new(bitwise(op, l.raw, r.raw, fixed), l.type_id))
    }

    fn eval_call(&mut self, name: &str, args: &[Expr], receiver: Option<&Expr>) -> ZdbResult<DebugValue>
    {
        let data = self.data;

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.evaluate(arg)?);
        }
        let arg_types: Vec<TypeId> = values.iter().map(|value| value.type_id).collect();

        let (search_scope, this_value) = match receiver {
            Some(receiver) => {
                let object = self.evaluate(receiver)?;
                let class = data
                    .class_scope(object.type_id)
                    .ok_or_else(|| ZdbError::TypeMismatch("Calling a method on a non-class type".to_string()))?;
                (Some(class), object.raw)
            }
            None => (self.scope, 0),
        };

        let function = resolve_overload(data, name, &arg_types, search_scope)?
            .ok_or_else(|| ZdbError::NoMatchingFunction(name.to_string()))?;

        let symbols: Vec<_> = data.child_symbols(function).iter().map(|id| data.symbol(*id)).collect();
        let fixed_count = symbols
            .iter()
            .filter(|symbol| !symbol.is_hidden() && !symbol.is_varargs())
            .count();
        let varargs = symbols.iter().find(|symbol| !symbol.is_hidden() && symbol.is_varargs());

        let mut this_register = 0;
        let mut this_on_stack = false;
        if receiver.is_some() {
            if let Some(first) = symbols.first().filter(|symbol| symbol.is_hidden()) {
                if first.storage == SymbolStorage::Register {
                    this_register = first.offset;
                } else {
                    this_on_stack = true;
                }
            }
        }

        let mut raw_args = Vec::with_capacity(fixed_count + 2);
        if this_on_stack {
            raw_args.push(this_value);
        }
        raw_args.extend(values.iter().take(fixed_count).map(|value| value.raw));
        if let Some(varargs) = varargs {
            let rest = values.iter().skip(fixed_count).map(|value| value.raw).collect();
            raw_args.push(self.vm.create_array(rest, varargs.type_id).raw);
        }

        let scope = data.scope(function);
        debug!(
            function = %data.full_scope_name(function),
            start_pc = %scope.start_pc,
            args = raw_args.len(),
            "calling function in sandbox"
        );
        let result = self
            .vm
            .execute_sandboxed(scope.start_pc, this_register, this_value, &raw_args)?;

        let raw = if data.is_void(scope.type_id) { 0 } else { result };
        Ok(DebugValue::new(raw, scope.type_id))
    }
}

fn compare(op: BinaryOp, l: i32, r: i32) -> bool
{
    match op {
        BinaryOp::Eq => l == r,
        BinaryOp::Ne => l != r,
        BinaryOp::Lt => l < r,
        BinaryOp::Le => l <= r,
        BinaryOp::Gt => l > r,
        _ => l >= r,
    }
}

/// Apply a bitwise operator, working on whole numbers when `fixed`.
fn bitwise(op: BinaryOp, l: i32, r: i32, fixed: bool) -> i32
{
    let (l, r) = if fixed { (l / FIXED_ONE, r / FIXED_ONE) } else { (l, r) };
    let raw = match op {
        BinaryOp::BitOr => l | r,
        BinaryOp::BitAnd => l & r,
        _ => l ^ r,
    };
    if fixed {
        raw.wrapping_mul(FIXED_ONE)
    } else {
        raw
    }
}

/// Keep the low 32 bits, the way the VM stores an overflowing product.
#[allow(clippy::cast_possible_truncation)]
fn truncate(value: i64) -> i32
{
    value as i32
}
