//! Structural checks run once when a store is decoded or built.
//!
//! After these pass, every index stored in the scope tree, type table, and
//! symbol list is in range, parent and inheritance chains terminate, and
//! `Const`/`Array` types never refer back to themselves. Query code relies on
//! this and walks those chains without iteration bounds.

use super::model::{DebugScope, DebugSymbol, DebugType, ScopeId, ScopeTag, TypeId};
use crate::error::{malformed, ZdbResult};

pub(crate) fn validate(types: &[DebugType], scopes: &[DebugScope], symbols: &[DebugSymbol]) -> ZdbResult<()>
{
    validate_scope_shapes(types, scopes)?;
    validate_parent_chains(scopes)?;
    validate_inheritance(scopes)?;
    validate_types(types, scopes)?;
    validate_symbols(types, scopes, symbols)?;
    Ok(())
}

fn scope_in_range(scopes: &[DebugScope], id: ScopeId) -> bool
{
    id.index() < scopes.len()
}

fn type_in_range(types: &[DebugType], id: TypeId) -> bool
{
    id.is_builtin() || id.table_index().is_some_and(|index| index < types.len())
}

fn validate_scope_shapes(types: &[DebugType], scopes: &[DebugScope]) -> ZdbResult<()>
{
    let Some(root) = scopes.first() else {
        return Err(malformed!("scope table is empty; the root scope is required"));
    };
    if root.tag != ScopeTag::Root || root.parent.is_some() {
        return Err(malformed!("scope 0 must be the root scope with no parent"));
    }

    for (index, scope) in scopes.iter().enumerate() {
        if index > 0 {
            if scope.tag == ScopeTag::Root {
                return Err(malformed!("scope {index} is a second root scope"));
            }
            match scope.parent {
                Some(parent) if scope_in_range(scopes, parent) => {}
                Some(parent) => return Err(malformed!("scope {index} has out-of-range parent {parent}")),
                None => return Err(malformed!("scope {index} has no parent")),
            }
        }

        if let Some(base) = scope.inheritance {
            if scope.tag != ScopeTag::Class {
                return Err(malformed!("scope {index} is not a class but declares a base class"));
            }
            if !scope_in_range(scopes, base) || scopes[base.index()].tag != ScopeTag::Class {
                return Err(malformed!("class scope {index} inherits from {base}, which is not a class"));
            }
        }

        if let Some(import) = scope.imports.iter().find(|import| !scope_in_range(scopes, **import)) {
            return Err(malformed!("scope {index} imports out-of-range scope {import}"));
        }

        if !scope.tag.has_code_range() && (scope.start_pc.value() != 0 || scope.end_pc.value() != 0) {
            return Err(malformed!("{} scope {index} cannot carry a pc range", scope.tag.label()));
        }

        if scope.tag == ScopeTag::Block {
            if !scope.name.is_empty() || scope.type_id != TypeId::VOID {
                return Err(malformed!("block scope {index} must be anonymous and untyped"));
            }
        } else if !type_in_range(types, scope.type_id) {
            return Err(malformed!("scope {index} has invalid type id {}", scope.type_id));
        }
    }
    Ok(())
}

/// Every parent chain must reach the root.
fn validate_parent_chains(scopes: &[DebugScope]) -> ZdbResult<()>
{
    // 0 = unvisited, 1 = on the current walk, 2 = known to reach the root.
    let mut state = vec![0u8; scopes.len()];
    state[0] = 2;
    let mut path = Vec::new();

    for start in 1..scopes.len() {
        let mut current = start;
        while state[current] == 0 {
            state[current] = 1;
            path.push(current);
            // Shape validation guarantees every non-root scope has a parent.
            current = scopes[current].parent.map_or(0, ScopeId::index);
        }
        if state[current] == 1 {
            return Err(malformed!("scope {current} is part of a parent cycle"));
        }
        for visited in path.drain(..) {
            state[visited] = 2;
        }
    }
    Ok(())
}

fn validate_inheritance(scopes: &[DebugScope]) -> ZdbResult<()>
{
    for (index, scope) in scopes.iter().enumerate() {
        let mut current = scope.inheritance;
        let mut steps = 0usize;
        while let Some(base) = current {
            if base.index() == index || steps > scopes.len() {
                return Err(malformed!("class scope {index} has a cyclic inheritance chain"));
            }
            steps += 1;
            current = scopes[base.index()].inheritance;
        }
    }
    Ok(())
}

fn validate_types(types: &[DebugType], scopes: &[DebugScope]) -> ZdbResult<()>
{
    for (index, ty) in types.iter().enumerate() {
        let id = TypeId::from_table_index(index);
        match *ty {
            DebugType::Const(inner) | DebugType::Array(inner) => {
                if !type_in_range(types, inner) {
                    return Err(malformed!("type {id} refers to invalid type id {inner}"));
                }
            }
            DebugType::Class(scope) => {
                if !scope_in_range(scopes, scope) || scopes[scope.index()].tag != ScopeTag::Class {
                    return Err(malformed!("class type {id} does not point at a class scope"));
                }
            }
            DebugType::Enum(scope) | DebugType::Bitflags(scope) => {
                if !scope_in_range(scopes, scope) || scopes[scope.index()].tag != ScopeTag::Enum {
                    return Err(malformed!("enum type {id} does not point at an enum scope"));
                }
            }
            _ => return Err(malformed!("built-in type stored in the type table at {id}")),
        }
    }

    // Const and Array form chains through the table; they must bottom out.
    for index in 0..types.len() {
        let mut current = TypeId::from_table_index(index);
        let mut steps = 0usize;
        while let Some(table_index) = current.table_index() {
            match types[table_index] {
                DebugType::Const(inner) | DebugType::Array(inner) => {
                    if steps > types.len() {
                        return Err(malformed!("type {} is part of a reference cycle", TypeId::from_table_index(index)));
                    }
                    steps += 1;
                    current = inner;
                }
                _ => break,
            }
        }
    }
    Ok(())
}

fn validate_symbols(types: &[DebugType], scopes: &[DebugScope], symbols: &[DebugSymbol]) -> ZdbResult<()>
{
    for (index, symbol) in symbols.iter().enumerate() {
        if !scope_in_range(scopes, symbol.scope) {
            return Err(malformed!("symbol {index} ({}) belongs to out-of-range scope {}", symbol.name, symbol.scope));
        }
        if !type_in_range(types, symbol.type_id) {
            return Err(malformed!("symbol {index} ({}) has invalid type id {}", symbol.name, symbol.type_id));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn root_and(scopes: Vec<DebugScope>) -> Vec<DebugScope>
    {
        let mut all = vec![DebugScope::root()];
        all.extend(scopes);
        all
    }

    #[test]
    fn test_minimal_store_is_valid()
    {
        assert!(validate(&[], &[DebugScope::root()], &[]).is_ok());
    }

    #[test]
    fn test_empty_scope_table_rejected()
    {
        assert!(validate(&[], &[], &[]).is_err());
    }

    #[test]
    fn test_parent_cycle_rejected()
    {
        let mut a = DebugScope::new(ScopeTag::Namespace, ScopeId(2)).named("a");
        let b = DebugScope::new(ScopeTag::Namespace, ScopeId(1)).named("b");
        a.parent = Some(ScopeId(2));
        assert!(validate(&[], &root_and(vec![a, b]), &[]).is_err());
    }

    #[test]
    fn test_inheritance_cycle_rejected()
    {
        let a = DebugScope::new(ScopeTag::Class, ScopeId::ROOT).named("A").inherits(ScopeId(2));
        let b = DebugScope::new(ScopeTag::Class, ScopeId::ROOT).named("B").inherits(ScopeId(1));
        assert!(validate(&[], &root_and(vec![a, b]), &[]).is_err());
    }

    #[test]
    fn test_inheritance_on_non_class_rejected()
    {
        let base = DebugScope::new(ScopeTag::Class, ScopeId::ROOT).named("Base");
        let ns = DebugScope::new(ScopeTag::Namespace, ScopeId::ROOT).named("ns").inherits(ScopeId(1));
        assert!(validate(&[], &root_and(vec![base, ns]), &[]).is_err());
    }

    #[test]
    fn test_type_cycle_rejected()
    {
        let types = [DebugType::Const(TypeId(33)), DebugType::Array(TypeId(32))];
        assert!(validate(&types, &[DebugScope::root()], &[]).is_err());
    }

    #[test]
    fn test_type_gap_ids_rejected()
    {
        let types = [DebugType::Array(TypeId(12))];
        assert!(validate(&types, &[DebugScope::root()], &[]).is_err());
    }
}
