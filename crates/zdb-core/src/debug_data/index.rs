//! # Scope Index & Name Resolution
//!
//! Lazily built adjacency caches over the scope tree, pc to scope lookup, and
//! the identifier resolver used by watch expressions and hover queries.
//!
//! ## Resolution rules
//!
//! Identifiers are split on `::`. The first component is looked up by walking
//! outwards from the current scope; at each level the scope itself and then
//! each of its imports are searched. The walk stops at the first level that
//! produces a match, so inner declarations shadow outer ones. Remaining
//! components drill down from the scope found so far.
//!
//! A search inside one scope checks its symbols, then its non-file child
//! scopes. Class scopes continue into their base class only when nothing
//! matched locally, so derived members hide base members.

use smallvec::SmallVec;
use tracing::trace;

use super::model::{ScopeId, ScopeTag, SymbolId};
use super::DebugData;
use crate::types::Pc;

/// Separator between the components of a qualified name.
pub const SCOPE_SEPARATOR: &str = "::";

/// What an identifier names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved
{
    Symbol(SymbolId),
    Scope(ScopeId),
}

impl Resolved
{
    #[must_use]
    pub fn symbol(self) -> Option<SymbolId>
    {
        match self {
            Resolved::Symbol(id) => Some(id),
            Resolved::Scope(_) => None,
        }
    }

    #[must_use]
    pub fn scope(self) -> Option<ScopeId>
    {
        match self {
            Resolved::Scope(id) => Some(id),
            Resolved::Symbol(_) => None,
        }
    }
}

type Components<'a> = SmallVec<[&'a str; 4]>;

fn split_identifier(identifier: &str) -> Components<'_>
{
    identifier.split(SCOPE_SEPARATOR).collect()
}

impl DebugData
{
    pub(crate) fn symbols_by_scope(&self) -> &[Vec<SymbolId>]
    {
        self.symbols_by_scope.get_or_init(|| {
            let mut by_scope = vec![Vec::new(); self.scopes.len()];
            for (index, symbol) in self.symbols.iter().enumerate() {
                by_scope[symbol.scope.index()].push(SymbolId(index as u32));
            }
            trace!(scopes = by_scope.len(), "built symbol-by-scope cache");
            by_scope
        })
    }

    pub(crate) fn children_by_scope(&self) -> &[Vec<ScopeId>]
    {
        self.children_by_scope.get_or_init(|| {
            let mut children = vec![Vec::new(); self.scopes.len()];
            for (index, scope) in self.scopes.iter().enumerate() {
                if let Some(parent) = scope.parent {
                    children[parent.index()].push(Self::scope_id(index));
                }
            }
            trace!(scopes = children.len(), "built children-by-scope cache");
            children
        })
    }

    /// Scopes with a non-empty code range, by start ascending then end descending.
    ///
    /// Outer scopes sort before inner scopes that share a start pc.
    pub(crate) fn sorted_code_scopes(&self) -> &[ScopeId]
    {
        self.sorted_code_scopes.get_or_init(|| {
            let mut sorted: Vec<ScopeId> = self
                .scopes
                .iter()
                .enumerate()
                .filter(|(_, scope)| scope.end_pc > scope.start_pc)
                .map(|(index, _)| Self::scope_id(index))
                .collect();
            sorted.sort_by(|a, b| {
                let (sa, sb) = (self.scope(*a), self.scope(*b));
                sa.start_pc.cmp(&sb.start_pc).then(sb.end_pc.cmp(&sa.end_pc))
            });
            trace!(scopes = sorted.len(), "built sorted code-scope index");
            sorted
        })
    }

    /// Symbols declared directly in `scope`, in declaration order.
    #[must_use]
    pub fn child_symbols(&self, scope: ScopeId) -> &[SymbolId]
    {
        self.symbols_by_scope().get(scope.index()).map_or(&[], Vec::as_slice)
    }

    /// Scopes whose parent is `scope`, in table order.
    #[must_use]
    pub fn child_scopes(&self, scope: ScopeId) -> &[ScopeId]
    {
        self.children_by_scope().get(scope.index()).map_or(&[], Vec::as_slice)
    }

    /// Innermost scope whose code range covers `pc`.
    ///
    /// The end pc is treated as inclusive here, matching how the compiler
    /// reports the final instruction of a function.
    #[must_use]
    pub fn resolve_scope_at(&self, pc: Pc) -> Option<ScopeId>
    {
        let sorted = self.sorted_code_scopes();
        let after = sorted.partition_point(|id| self.scope(*id).start_pc <= pc);
        sorted[..after]
            .iter()
            .rev()
            .copied()
            .find(|id| pc <= self.scope(*id).end_pc)
    }

    /// Function scope enclosing `pc`.
    #[must_use]
    pub fn resolve_function_scope(&self, pc: Pc) -> Option<ScopeId>
    {
        self.enclosing_scope_with_tag(self.resolve_scope_at(pc)?, ScopeTag::Function)
    }

    /// Class scope enclosing `pc` (the class of the method being executed).
    #[must_use]
    pub fn resolve_class_scope(&self, pc: Pc) -> Option<ScopeId>
    {
        self.enclosing_scope_with_tag(self.resolve_scope_at(pc)?, ScopeTag::Class)
    }

    /// File scope named `name`.
    #[must_use]
    pub fn resolve_file_scope(&self, name: &str) -> Option<ScopeId>
    {
        self.scopes
            .iter()
            .position(|scope| scope.tag == ScopeTag::File && scope.name == name)
            .map(Self::scope_id)
    }

    /// `scope` or its nearest ancestor tagged `tag`.
    #[must_use]
    pub fn enclosing_scope_with_tag(&self, scope: ScopeId, tag: ScopeTag) -> Option<ScopeId>
    {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = self.get_scope(id)?;
            if s.tag == tag {
                return Some(id);
            }
            current = s.parent;
        }
        None
    }

    /// Look `name` up inside `scope` and, for classes, its base chain.
    ///
    /// Symbols take precedence over child scopes of the same name. The search
    /// stops at the first class in the chain that declares `name`.
    #[must_use]
    pub fn resolve_member(&self, scope: ScopeId, name: &str) -> Option<Resolved>
    {
        self.get_scope(scope)?;
        let symbols = self.symbols_by_scope();
        let children = self.children_by_scope();

        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(symbol) = symbols[id.index()]
                .iter()
                .copied()
                .find(|symbol| self.symbol(*symbol).name == name)
            {
                return Some(Resolved::Symbol(symbol));
            }

            if let Some(child) = children[id.index()].iter().copied().find(|child| {
                let child = self.scope(*child);
                child.tag != ScopeTag::File && child.name == name
            }) {
                return Some(Resolved::Scope(child));
            }

            let s = self.scope(id);
            current = if s.tag == ScopeTag::Class { s.inheritance } else { None };
        }
        None
    }

    /// Resolve a possibly qualified identifier as seen from `current`.
    ///
    /// Returns `None` if any component fails to resolve, if an intermediate
    /// component names a symbol, or if the identifier starts with `::`.
    ///
    /// ## Example
    ///
    /// ```rust
    /// use zdb_core::{DebugDataBuilder, DebugScope, DebugSymbol, Resolved, ScopeId, ScopeTag, SymbolStorage, TypeId};
    ///
    /// let mut builder = DebugDataBuilder::new();
    /// let ns = builder.add_scope(DebugScope::new(ScopeTag::Namespace, ScopeId::ROOT).named("game"));
    /// let lives = builder.add_symbol(DebugSymbol::new(ns, "lives", TypeId::INT, SymbolStorage::Global, 3));
    /// let data = builder.build()?;
    ///
    /// assert_eq!(data.resolve_entity("game::lives", Some(ScopeId::ROOT)), Some(Resolved::Symbol(lives)));
    /// assert_eq!(data.resolve_entity("lives", Some(ScopeId::ROOT)), None);
    /// # Ok::<(), zdb_core::ZdbError>(())
    /// ```
    #[must_use]
    pub fn resolve_entity(&self, identifier: &str, current: Option<ScopeId>) -> Option<Resolved>
    {
        let components = split_identifier(identifier);
        let (first, rest) = components.split_first()?;
        if first.is_empty() {
            return None;
        }

        let mut resolved = self.resolve_in_context(first, current?)?;
        for component in rest {
            let container = resolved.scope()?;
            resolved = self.resolve_member(container, component)?;
        }
        Some(resolved)
    }

    /// Walk outwards from `scope`, checking each level and its imports.
    fn resolve_in_context(&self, name: &str, scope: ScopeId) -> Option<Resolved>
    {
        let mut walker = Some(scope);
        while let Some(id) = walker {
            let s = self.get_scope(id)?;
            let found = std::iter::once(id)
                .chain(s.imports.iter().copied())
                .find_map(|lookup| self.resolve_member(lookup, name));
            if found.is_some() {
                return found;
            }
            walker = s.parent;
        }
        None
    }

    /// Resolve an identifier that must name a symbol.
    #[must_use]
    pub fn resolve_symbol(&self, identifier: &str, current: Option<ScopeId>) -> Option<SymbolId>
    {
        self.resolve_entity(identifier, current)?.symbol()
    }

    /// Resolve an identifier that must name a scope (namespace, class, enum, ...).
    #[must_use]
    pub fn resolve_scope(&self, identifier: &str, current: Option<ScopeId>) -> Option<ScopeId>
    {
        self.resolve_entity(identifier, current)?.scope()
    }

    /// Every function scope an unqualified or qualified call to `identifier` may target.
    ///
    /// For an unqualified name, the search walks outwards from `current` and
    /// stops at the first level (the scope, its imports, and their base
    /// classes) that declares at least one function of that name. Outer
    /// overload sets are never merged with inner ones. For a qualified name,
    /// the container path is resolved first and only that container (and its
    /// base classes) is searched.
    #[must_use]
    pub fn resolve_functions(&self, identifier: &str, current: Option<ScopeId>) -> Vec<ScopeId>
    {
        let components = split_identifier(identifier);
        let mut candidates = Vec::new();
        let Some((name, path)) = components.split_last() else {
            return candidates;
        };

        if path.is_empty() {
            let mut walker = current;
            while let Some(id) = walker {
                let Some(scope) = self.get_scope(id) else {
                    break;
                };
                self.collect_functions(id, name, &mut candidates);
                for import in &scope.imports {
                    self.collect_functions(*import, name, &mut candidates);
                }
                if !candidates.is_empty() {
                    break;
                }
                walker = scope.parent;
            }
        } else if let Some(container) = self.resolve_scope(&path.join(SCOPE_SEPARATOR), current) {
            self.collect_functions(container, name, &mut candidates);
        }

        candidates
    }

    /// Collect function children named `name` of `scope` and its base classes.
    fn collect_functions(&self, scope: ScopeId, name: &str, out: &mut Vec<ScopeId>)
    {
        if self.get_scope(scope).is_none() {
            return;
        }
        let mut current = Some(scope);
        while let Some(id) = current {
            out.extend(self.child_scopes(id).iter().copied().filter(|child| {
                let child = self.scope(*child);
                child.tag == ScopeTag::Function && child.name == name
            }));
            let s = self.scope(id);
            current = if s.tag == ScopeTag::Class { s.inheritance } else { None };
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_split_identifier()
    {
        assert_eq!(split_identifier("a::b::c").as_slice(), &["a", "b", "c"]);
        assert_eq!(split_identifier("::x").as_slice(), &["", "x"]);
        assert_eq!(split_identifier("plain").as_slice(), &["plain"]);
    }

    #[test]
    fn test_resolved_accessors()
    {
        assert_eq!(Resolved::Symbol(SymbolId(3)).symbol(), Some(SymbolId(3)));
        assert_eq!(Resolved::Symbol(SymbolId(3)).scope(), None);
        assert_eq!(Resolved::Scope(ScopeId(1)).scope(), Some(ScopeId(1)));
    }
}
