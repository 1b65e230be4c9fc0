//! # Value Formatting
//!
//! Renders [`DebugValue`]s for the variables pane and hover text.
//!
//! - [`ValueFormatter::summary`] is one short token per value: `3.5000`,
//!   `12L`, `true`, `"text"`, `Array[4]`, `Enemy`, `(Color) RED`.
//! - [`ValueFormatter::full`] expands arrays and objects recursively, e.g.
//!   `Enemy {hp = 3.0000, tags = {1.0000, 2.0000}}`. Objects already being
//!   printed further up render as `...`, so cyclic graphs terminate.

use std::collections::HashSet;

use super::value::{format_fixed, DebugValue, FIXED_ONE};
use super::vm::VmInterface;
use crate::debug_data::{DebugData, DebugSymbol, DebugType, ScopeId, TypeId};

/// Soft line width used when packing simple array elements.
const MAX_LINE_LEN: usize = 80;

/// Formats values, reading arrays, strings, and objects through the VM.
pub struct ValueFormatter<'a, V: VmInterface + ?Sized>
{
    data: &'a DebugData,
    vm: &'a mut V,
}

impl<'a, V: VmInterface + ?Sized> ValueFormatter<'a, V>
{
    pub fn new(data: &'a DebugData, vm: &'a mut V) -> Self
    {
        Self { data, vm }
    }

    /// One-line summary of `value`.
    pub fn summary(&mut self, value: DebugValue) -> String
    {
        let data = self.data;
        let type_id = data.unwrap_const(value.type_id);
        let raw = value.raw;

        match data.get_type(type_id) {
            Some(DebugType::Void) => String::new(),
            Some(DebugType::Bool) => (if raw != 0 { "true" } else { "false" }).to_string(),
            Some(DebugType::Long) => format!("{raw}L"),
            Some(DebugType::Int) => format_fixed(raw),
            Some(DebugType::Enum(scope)) => self.enum_summary(*scope, raw, false),
            Some(DebugType::Bitflags(scope)) => self.enum_summary(*scope, raw, true),
            Some(DebugType::Array(TypeId::CHAR32)) => match self.vm.read_string(raw) {
                Some(text) => format!("\"{}\"", text.replace('\n', "\\n")),
                None => "invalid".to_string(),
            },
            Some(DebugType::Array(_)) => {
                if raw == 0 {
                    return "null (Array)".to_string();
                }
                match self.vm.read_array(DebugValue::new(raw, type_id)) {
                    Some(elements) => format!("Array[{}]", elements.len()),
                    None => "null (Array)".to_string(),
                }
            }
            Some(DebugType::Class(scope)) => {
                let name = &data.scope(*scope).name;
                if raw == 0 {
                    format!("null ({name})")
                } else {
                    name.clone()
                }
            }
            _ => raw.to_string(),
        }
    }

    fn enum_summary(&mut self, scope: ScopeId, raw: i32, is_bitflags: bool) -> String
    {
        let data = self.data;
        let enum_scope = data.scope(scope);
        let fixed = enum_scope.type_id == TypeId::INT;
        let members: Vec<&DebugSymbol> = data.child_symbols(scope).iter().map(|id| data.symbol(*id)).collect();

        if is_bitflags && (!fixed || raw % FIXED_ONE == 0) {
            let unscale = |v: i32| if fixed { v / FIXED_ONE } else { v };
            #[allow(clippy::cast_sign_loss)]
            let mut remaining = unscale(raw) as u32;
            let mut parts = Vec::new();
            for member in &members {
                #[allow(clippy::cast_sign_loss)]
                let flag = unscale(member.offset) as u32;
                if !flag.is_power_of_two() {
                    continue;
                }
                if remaining & flag == flag {
                    parts.push(member.name.clone());
                    remaining &= !flag;
                }
            }
            if remaining != 0 {
                parts.push(format!("0x{remaining:X}"));
            }
            return format!("({}) {}", enum_scope.name, parts.join(" | "));
        }

        if let Some(member) = members.iter().find(|member| member.offset == raw) {
            return format!("({}) {}", enum_scope.name, member.name);
        }

        let number = DebugValue::new(raw, if fixed { TypeId::INT } else { TypeId::LONG });
        format!("({}) {}", enum_scope.name, self.summary(number))
    }

    /// Recursive rendering of `value`.
    ///
    /// With `newlines`, nested arrays and objects are laid out one element per
    /// line, indented two spaces per level; arrays of numbers and bools are
    /// packed onto lines of up to 80 columns.
    pub fn full(&mut self, value: DebugValue, newlines: bool) -> String
    {
        let mut seen = HashSet::new();
        self.full_at(value, newlines, 0, &mut seen)
    }

    fn full_at(&mut self, value: DebugValue, newlines: bool, depth: usize, seen: &mut HashSet<i32>) -> String
    {
        let data = self.data;
        let value = DebugValue {
            type_id: data.unwrap_const(value.type_id),
            ..value
        };

        if data.is_string(value.type_id) {
            return self.summary(value);
        }
        if data.is_array(value.type_id) {
            return self.full_array(value, newlines, depth, seen);
        }
        if let Some(class) = data.class_scope(value.type_id) {
            return self.full_object(value, class, newlines, depth, seen);
        }
        self.summary(value)
    }

    fn full_array(&mut self, value: DebugValue, newlines: bool, depth: usize, seen: &mut HashSet<i32>) -> String
    {
        if value.raw == 0 {
            return "null (Array)".to_string();
        }
        if !seen.insert(value.raw) {
            return "...".to_string();
        }

        let result = match self.vm.read_array(value) {
            None => "null (Array)".to_string(),
            Some(elements) if elements.is_empty() => "{}".to_string(),
            Some(elements) if newlines => self.array_lines(&elements, depth, seen),
            Some(elements) => {
                let parts: Vec<String> = elements
                    .iter()
                    .map(|element| self.full_at(*element, false, depth + 1, seen))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
        };

        seen.remove(&value.raw);
        result
    }

    fn array_lines(&mut self, elements: &[DebugValue], depth: usize, seen: &mut HashSet<i32>) -> String
    {
        let data = self.data;
        let first = data.unwrap_const(elements[0].type_id);
        let packed = data.is_bool(first) || data.is_fixed(first) || data.is_long(first) || data.is_untyped(first);

        let indent = "  ".repeat(depth + 1);
        let mut out = format!("{{\n{indent}");
        let mut line_len = indent.len();
        let last = elements.len() - 1;

        for (i, element) in elements.iter().enumerate() {
            let mut item = self.full_at(*element, true, depth + 1, seen);
            if i < last {
                item.push_str(", ");
            }
            if packed {
                if line_len + item.len() > MAX_LINE_LEN {
                    out.push('\n');
                    out.push_str(&indent);
                    line_len = indent.len();
                }
                line_len += item.len();
                out.push_str(&item);
            } else {
                out.push_str(&item);
                if i < last {
                    out.push('\n');
                    out.push_str(&indent);
                }
            }
        }

        out.push('\n');
        out.push_str(&"  ".repeat(depth));
        out.push('}');
        out
    }

    fn full_object(
        &mut self,
        value: DebugValue,
        class: ScopeId,
        newlines: bool,
        depth: usize,
        seen: &mut HashSet<i32>,
    ) -> String
    {
        let data = self.data;
        if value.raw == 0 {
            return "null".to_string();
        }
        if !seen.insert(value.raw) {
            return "...".to_string();
        }

        // Base class fields first.
        let mut chain = vec![class];
        let mut current = data.scope(class).inheritance;
        while let Some(base) = current {
            chain.push(base);
            current = data.scope(base).inheritance;
        }
        let fields: Vec<&DebugSymbol> = chain
            .iter()
            .rev()
            .flat_map(|scope| data.child_symbols(*scope))
            .map(|id| data.symbol(*id))
            .filter(|symbol| newlines || !symbol.is_hidden())
            .collect();

        let mut parts = Vec::with_capacity(fields.len());
        for field in fields {
            if let Some(member) = self.vm.read_object_member(value, field) {
                let rendered = self.full_at(member, newlines, depth + 1, seen);
                parts.push(format!("{} = {rendered}", field.name));
            }
        }

        let name = &data.scope(class).name;
        let result = if newlines {
            let indent = "  ".repeat(depth + 1);
            let body: Vec<String> = parts.iter().map(|part| format!("\n{indent}{part}")).collect();
            format!("{name} {{{}\n{}}}", body.join(","), "  ".repeat(depth))
        } else {
            format!("{name} {{{}}}", parts.join(", "))
        };

        seen.remove(&value.raw);
        result
    }
}
