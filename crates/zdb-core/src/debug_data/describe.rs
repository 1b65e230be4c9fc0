//! # Human-Readable Descriptions
//!
//! Qualified names, function signatures, symbol declarations, and a full dump
//! of the scope tree. These back the debugger's hover text, call stack, and
//! variable panes.

use std::fmt::Write as _;

use super::model::{ScopeFlags, ScopeId, ScopeTag, SourceFile, SymbolId, SymbolStorage, TypeId};
use super::DebugData;
use crate::eval::value::FIXED_ONE;

/// Scope kinds that contribute a component to qualified names.
fn is_named_container(tag: ScopeTag) -> bool
{
    matches!(tag, ScopeTag::Function | ScopeTag::Class | ScopeTag::Script | ScopeTag::Namespace)
}

impl DebugData
{
    fn qualified_parts(&self, start: ScopeId) -> Vec<&str>
    {
        let mut parts = Vec::new();
        let mut current = self.get_scope(start);
        while let Some(scope) = current {
            if is_named_container(scope.tag) {
                parts.push(if scope.name.is_empty() { "?" } else { scope.name.as_str() });
            }
            current = scope.parent.and_then(|parent| self.get_scope(parent));
        }
        parts.reverse();
        parts
    }

    /// Qualified name of a scope, e.g. `game::Enemy::update`.
    ///
    /// Root and file scopes return their own name. Blocks, enums, and files
    /// along the way are skipped.
    #[must_use]
    pub fn full_scope_name(&self, scope: ScopeId) -> String
    {
        let Some(s) = self.get_scope(scope) else {
            return String::new();
        };
        if matches!(s.tag, ScopeTag::Root | ScopeTag::File) {
            return s.name.clone();
        }
        self.qualified_parts(scope).join("::")
    }

    /// Qualified name of a symbol, e.g. `game::Enemy::health`.
    #[must_use]
    pub fn full_symbol_name(&self, symbol: SymbolId) -> String
    {
        let Some(symbol) = self.get_symbol(symbol) else {
            return String::new();
        };
        let mut parts = self.qualified_parts(symbol.scope);
        parts.push(&symbol.name);
        parts.join("::")
    }

    /// Declaration-style signature, e.g. `int game::add(int a, ...int[] rest)`.
    ///
    /// Hidden parameters are omitted. Returns an empty string for non-function scopes.
    #[must_use]
    pub fn function_signature(&self, function: ScopeId) -> String
    {
        let Some(scope) = self.get_scope(function).filter(|s| s.tag == ScopeTag::Function) else {
            return String::new();
        };

        let params: Vec<String> = self
            .child_symbols(function)
            .iter()
            .map(|id| self.symbol(*id))
            .filter(|symbol| !symbol.is_hidden())
            .map(|symbol| {
                let prefix = if symbol.is_varargs() { "..." } else { "" };
                format!("{prefix}{} {}", self.type_name(symbol.type_id), symbol.name)
            })
            .collect();

        format!(
            "{} {}({})",
            self.type_name(scope.type_id),
            self.full_scope_name(function),
            params.join(", ")
        )
    }

    /// One-line declaration of a symbol, e.g. `int x @ Stack[3] <HIDDEN>`.
    ///
    /// Register symbols print their numeric id; use
    /// [`DebugData::describe_symbol_with`] to print register names.
    #[must_use]
    pub fn describe_symbol(&self, symbol: SymbolId) -> String
    {
        self.describe_symbol_with(symbol, |_| None)
    }

    /// Like [`DebugData::describe_symbol`], naming registers through `register_name`.
    pub fn describe_symbol_with<F>(&self, symbol: SymbolId, register_name: F) -> String
    where
        F: Fn(i32) -> Option<String>,
    {
        let Some(symbol) = self.get_symbol(symbol) else {
            return String::new();
        };
        let offset = symbol.offset;
        let location = match symbol.storage {
            SymbolStorage::Constant if symbol.type_id == TypeId::INT => format!("Constant[{}]", offset / FIXED_ONE),
            SymbolStorage::Constant if symbol.type_id == TypeId::LONG => format!("Constant[{offset}L]"),
            SymbolStorage::Constant => format!("Constant[{offset}]"),
            SymbolStorage::Stack => format!("Stack[{offset}]"),
            SymbolStorage::Global => format!("Global[{offset}]"),
            SymbolStorage::Register => {
                format!("Reg[{}]", register_name(offset).unwrap_or_else(|| offset.to_string()))
            }
            SymbolStorage::Class => format!("ClassField[{offset}]"),
        };

        let mut text = format!("{} {} @ {location}", self.type_name(symbol.type_id), symbol.name);
        if symbol.is_hidden() {
            text.push_str(" <HIDDEN>");
        }
        if symbol.is_varargs() {
            text.push_str(" <VARARG>");
        }
        text
    }

    /// Source file and line where `symbol` was declared.
    ///
    /// The file is the one named by the symbol's enclosing file scope. Returns
    /// `None` when the line is unknown (0) or no source file matches.
    #[must_use]
    pub fn symbol_location(&self, symbol: SymbolId) -> Option<(&SourceFile, u32)>
    {
        let symbol = self.get_symbol(symbol)?;
        if symbol.declaration_line == 0 {
            return None;
        }

        let mut scope = self.get_scope(symbol.scope)?;
        while scope.tag != ScopeTag::File {
            scope = self.get_scope(scope.parent?)?;
        }

        self.source_file(&scope.name).map(|file| (file, symbol.declaration_line))
    }

    /// Stack slots a function allocates in its prologue beyond its parameters.
    ///
    /// This is the largest stack offset + 1 among the symbols of the function's
    /// outermost block. Script `run` functions push their own parameters, so
    /// their own symbols are measured instead.
    #[must_use]
    pub fn function_additional_stack_size(&self, function: ScopeId) -> u32
    {
        let Some(scope) = self.get_scope(function) else {
            return 0;
        };
        let is_run = scope.name == "run"
            && scope
                .parent
                .and_then(|parent| self.get_scope(parent))
                .is_some_and(|parent| parent.tag == ScopeTag::Script);

        let measured = if is_run {
            function
        } else {
            match self.child_scopes(function).first() {
                Some(block) => *block,
                None => return 0,
            }
        };

        self.child_symbols(measured)
            .iter()
            .map(|id| self.symbol(*id))
            .filter(|symbol| symbol.storage == SymbolStorage::Stack)
            .filter_map(|symbol| u32::try_from(symbol.offset.saturating_add(1)).ok())
            .max()
            .unwrap_or(0)
    }

    /// Indented dump of the scope tree followed by the type table.
    ///
    /// ```text
    /// Scopes:
    ///
    /// [ROOT] <IDX:0>
    ///   [FUNCTION] int add <PC:10-20 IDX:1>
    ///     - int a @ Stack[0]
    ///
    /// Types:
    ///
    /// 0: void
    /// ```
    #[must_use]
    pub fn dump(&self) -> String
    {
        let mut out = String::from("Scopes:\n\n");
        let roots: Vec<ScopeId> = (0..self.scopes.len())
            .filter(|index| self.scopes[*index].parent.is_none())
            .map(Self::scope_id)
            .collect();
        if roots.is_empty() && !self.scopes.is_empty() {
            out.push_str("<Error: No Root Scopes Found>\n");
        }

        let mut stack: Vec<(ScopeId, usize)> = roots.into_iter().rev().map(|id| (id, 0)).collect();
        while let Some((id, depth)) = stack.pop() {
            self.dump_scope(&mut out, id, depth);
            stack.extend(self.child_scopes(id).iter().rev().map(|child| (*child, depth + 1)));
        }

        out.push_str("\nTypes:\n\n");
        let builtin = (0..=TypeId::RGB.0).map(TypeId);
        let table = (0..self.types.len()).map(TypeId::from_table_index);
        for id in builtin.chain(table) {
            let _ = writeln!(out, "{id}: {}", self.type_name(id));
        }
        out
    }

    fn dump_scope(&self, out: &mut String, id: ScopeId, depth: usize)
    {
        let scope = self.scope(id);
        let pad = "  ".repeat(depth);

        let mut parts = vec![format!("[{}]", scope.tag.label())];
        if scope.type_id != TypeId::VOID {
            parts.push(self.type_name(scope.type_id));
        }
        if !matches!(scope.tag, ScopeTag::Block | ScopeTag::Root) {
            parts.push(if scope.name.is_empty() { "<anon>".to_string() } else { scope.name.clone() });
        }
        if let Some(base) = scope.inheritance {
            parts.push(format!("extends {}", self.scope(base).name));
        }
        if scope.tag.has_code_range() {
            parts.push(format!("<PC:{}-{} IDX:{}>", scope.start_pc, scope.end_pc, id.0));
        } else {
            parts.push(format!("<IDX:{}>", id.0));
        }
        for (flag, label) in [
            (ScopeFlags::HIDDEN, "<HIDDEN>"),
            (ScopeFlags::INTERNAL, "<INTERNAL>"),
            (ScopeFlags::DEPRECATED, "<DEPRECATED>"),
        ] {
            if scope.flags.contains(flag) {
                parts.push(label.to_string());
            }
        }
        let _ = writeln!(out, "{pad}{}", parts.join(" "));

        for symbol in self.child_symbols(id) {
            let _ = writeln!(out, "{pad}  - {}", self.describe_symbol(*symbol));
        }
    }
}
