//! # Debug-Info Model
//!
//! Plain data records stored in a [`DebugData`](crate::DebugData): source
//! files, the type table, the scope tree, and the symbol list.
//!
//! Every cross reference is an index newtype ([`ScopeId`], [`SymbolId`],
//! [`TypeId`]) into the owning store's arenas. The decoder validates all of
//! them once, so lookups through a decoded store can index directly.

use std::fmt;

use bitflags::bitflags;

use crate::error::{malformed, ZdbError, ZdbResult};
use crate::types::Pc;

/// A compiled source file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceFile
{
    /// Path as the compiler saw it.
    pub path: String,
    /// Full text, or empty if no code originated in this file.
    pub contents: String,
}

impl SourceFile
{
    #[must_use]
    pub fn new(path: impl Into<String>, contents: impl Into<String>) -> Self
    {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

/// Index of a scope in [`DebugData::scopes`](crate::DebugData::scopes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeId(pub u32);

impl ScopeId
{
    /// The single root scope is always stored first.
    pub const ROOT: Self = ScopeId(0);

    #[must_use]
    pub const fn index(self) -> usize
    {
        self.0 as usize
    }
}

impl fmt::Display for ScopeId
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "#{}", self.0)
    }
}

/// Index of a symbol in [`DebugData::symbols`](crate::DebugData::symbols).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolId(pub u32);

impl SymbolId
{
    #[must_use]
    pub const fn index(self) -> usize
    {
        self.0 as usize
    }
}

/// Identifier of a type.
///
/// Ids below [`TypeId::TABLE_START`] name built-in types directly. Larger ids
/// index the composite type table at `id - TABLE_START`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(pub u32);

impl TypeId
{
    pub const VOID: Self = TypeId(0);
    pub const TEMPLATE_UNBOUNDED: Self = TypeId(1);
    pub const UNTYPED: Self = TypeId(2);
    pub const BOOL: Self = TypeId(3);
    pub const INT: Self = TypeId(4);
    pub const LONG: Self = TypeId(5);
    pub const CHAR32: Self = TypeId(6);
    pub const RGB: Self = TypeId(7);

    /// First id that refers into the composite type table.
    pub const TABLE_START: u32 = 32;

    /// Id of the composite type at `table_index`.
    #[must_use]
    pub const fn from_table_index(table_index: usize) -> Self
    {
        TypeId(table_index as u32 + Self::TABLE_START)
    }

    /// Whether this id names a built-in type.
    #[must_use]
    pub const fn is_builtin(self) -> bool
    {
        self.0 <= Self::RGB.0
    }

    /// Position in the composite table, if this id points there.
    #[must_use]
    pub fn table_index(self) -> Option<usize>
    {
        self.0.checked_sub(Self::TABLE_START).map(|index| index as usize)
    }
}

impl fmt::Display for TypeId
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.0)
    }
}

/// Wire tags for [`DebugType`].
pub mod type_tag
{
    pub const VOID: u32 = 0;
    pub const TEMPLATE_UNBOUNDED: u32 = 1;
    pub const UNTYPED: u32 = 2;
    pub const BOOL: u32 = 3;
    pub const INT: u32 = 4;
    pub const LONG: u32 = 5;
    pub const CHAR32: u32 = 6;
    pub const RGB: u32 = 7;
    pub const CONST: u32 = 32;
    pub const ARRAY: u32 = 33;
    pub const CLASS: u32 = 34;
    pub const ENUM: u32 = 35;
    pub const BITFLAGS: u32 = 36;
}

/// A type in the script language.
///
/// Built-in variants carry no payload. `Const` and `Array` wrap another type;
/// `Class`, `Enum`, and `Bitflags` point at the scope that defines them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebugType
{
    Void,
    /// Placeholder used by internal generic functions.
    TemplateUnbounded,
    Untyped,
    Bool,
    /// Fixed-point number scaled by 10000.
    Int,
    Long,
    Char32,
    Rgb,
    Const(TypeId),
    Array(TypeId),
    Class(ScopeId),
    Enum(ScopeId),
    Bitflags(ScopeId),
}

/// Built-in types, indexed by their [`TypeId`].
pub(crate) static BUILTIN_TYPES: [DebugType; 8] = [
    DebugType::Void,
    DebugType::TemplateUnbounded,
    DebugType::Untyped,
    DebugType::Bool,
    DebugType::Int,
    DebugType::Long,
    DebugType::Char32,
    DebugType::Rgb,
];

impl DebugType
{
    /// Wire tag of this type.
    #[must_use]
    pub const fn tag(&self) -> u32
    {
        match self {
            DebugType::Void => type_tag::VOID,
            DebugType::TemplateUnbounded => type_tag::TEMPLATE_UNBOUNDED,
            DebugType::Untyped => type_tag::UNTYPED,
            DebugType::Bool => type_tag::BOOL,
            DebugType::Int => type_tag::INT,
            DebugType::Long => type_tag::LONG,
            DebugType::Char32 => type_tag::CHAR32,
            DebugType::Rgb => type_tag::RGB,
            DebugType::Const(_) => type_tag::CONST,
            DebugType::Array(_) => type_tag::ARRAY,
            DebugType::Class(_) => type_tag::CLASS,
            DebugType::Enum(_) => type_tag::ENUM,
            DebugType::Bitflags(_) => type_tag::BITFLAGS,
        }
    }

    /// Wire payload: a type id, a scope index, or the tag itself for built-ins.
    #[must_use]
    pub const fn extra(&self) -> i32
    {
        match self {
            DebugType::Const(inner) | DebugType::Array(inner) => inner.0 as i32,
            DebugType::Class(scope) | DebugType::Enum(scope) | DebugType::Bitflags(scope) => scope.0 as i32,
            other => other.tag() as i32,
        }
    }

    /// Rebuild a composite type table entry from its wire form.
    ///
    /// ## Errors
    ///
    /// Returns `Malformed` for unknown tags, for built-in tags (those are
    /// implicit and never stored in the table), and for negative payloads.
    pub fn from_wire(tag: u32, extra: i32) -> ZdbResult<Self>
    {
        let payload = u32::try_from(extra).map_err(|_| malformed!("type tag {tag} has negative payload {extra}"))?;
        match tag {
            type_tag::CONST => Ok(DebugType::Const(TypeId(payload))),
            type_tag::ARRAY => Ok(DebugType::Array(TypeId(payload))),
            type_tag::CLASS => Ok(DebugType::Class(ScopeId(payload))),
            type_tag::ENUM => Ok(DebugType::Enum(ScopeId(payload))),
            type_tag::BITFLAGS => Ok(DebugType::Bitflags(ScopeId(payload))),
            t if t <= type_tag::RGB => Err(malformed!("built-in type tag {t} stored in the type table")),
            t => Err(malformed!("unknown type tag {t}")),
        }
    }

    /// Whether the variant is one of the implicit built-ins.
    #[must_use]
    pub const fn is_builtin(&self) -> bool
    {
        self.tag() <= type_tag::RGB
    }

    /// Scope defining a class, enum, or bitflags type.
    #[must_use]
    pub const fn defining_scope(&self) -> Option<ScopeId>
    {
        match self {
            DebugType::Class(scope) | DebugType::Enum(scope) | DebugType::Bitflags(scope) => Some(*scope),
            _ => None,
        }
    }
}

/// Kind of a scope in the scope tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeTag
{
    Root,
    File,
    Namespace,
    Script,
    Function,
    Class,
    Enum,
    Block,
}

impl ScopeTag
{
    #[must_use]
    pub const fn wire(self) -> u32
    {
        match self {
            ScopeTag::Root => 1,
            ScopeTag::File => 2,
            ScopeTag::Namespace => 3,
            ScopeTag::Script => 4,
            ScopeTag::Function => 5,
            ScopeTag::Class => 6,
            ScopeTag::Enum => 7,
            ScopeTag::Block => 8,
        }
    }

    /// Upper-case label used by the store dump.
    #[must_use]
    pub const fn label(self) -> &'static str
    {
        match self {
            ScopeTag::Root => "ROOT",
            ScopeTag::File => "FILE",
            ScopeTag::Namespace => "NAMESPACE",
            ScopeTag::Script => "SCRIPT",
            ScopeTag::Function => "FUNCTION",
            ScopeTag::Class => "CLASS",
            ScopeTag::Enum => "ENUM",
            ScopeTag::Block => "BLOCK",
        }
    }

    /// Whether scopes of this kind carry a `[start_pc, end_pc)` range on the wire.
    #[must_use]
    pub const fn has_code_range(self) -> bool
    {
        matches!(self, ScopeTag::Function | ScopeTag::Block)
    }
}

impl TryFrom<u32> for ScopeTag
{
    type Error = ZdbError;

    fn try_from(value: u32) -> ZdbResult<Self>
    {
        match value {
            1 => Ok(ScopeTag::Root),
            2 => Ok(ScopeTag::File),
            3 => Ok(ScopeTag::Namespace),
            4 => Ok(ScopeTag::Script),
            5 => Ok(ScopeTag::Function),
            6 => Ok(ScopeTag::Class),
            7 => Ok(ScopeTag::Enum),
            8 => Ok(ScopeTag::Block),
            other => Err(malformed!("unknown scope tag {other}")),
        }
    }
}

bitflags! {
    /// Presentation flags on a scope.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ScopeFlags: u32 {
        const HIDDEN = 1;
        const INTERNAL = 2;
        const DEPRECATED = 4;
    }
}

bitflags! {
    /// Flags on a symbol.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SymbolFlags: u32 {
        /// Synthesized by the compiler (a `this` parameter, a legacy alias).
        const HIDDEN = 1;
        /// Trailing parameter bound to an array of the remaining arguments.
        const VARARGS = 2;
    }
}

/// Where a symbol's value lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolStorage
{
    /// `offset` is the literal value.
    Constant,
    /// `offset` is a frame-relative stack slot.
    Stack,
    /// `offset` is a global index.
    Global,
    /// `offset` is an engine register id.
    Register,
    /// `offset` is an instance field index.
    Class,
}

impl SymbolStorage
{
    #[must_use]
    pub const fn wire(self) -> u32
    {
        match self {
            SymbolStorage::Constant => 0,
            SymbolStorage::Stack => 1,
            SymbolStorage::Global => 2,
            SymbolStorage::Register => 3,
            SymbolStorage::Class => 4,
        }
    }
}

impl TryFrom<u32> for SymbolStorage
{
    type Error = ZdbError;

    fn try_from(value: u32) -> ZdbResult<Self>
    {
        match value {
            0 => Ok(SymbolStorage::Constant),
            1 => Ok(SymbolStorage::Stack),
            2 => Ok(SymbolStorage::Global),
            3 => Ok(SymbolStorage::Register),
            4 => Ok(SymbolStorage::Class),
            other => Err(malformed!("unknown symbol storage {other}")),
        }
    }
}

/// A node of the scope tree.
///
/// Block scopes are anonymous: their `name` is empty and `type_id` is void.
/// Only Function and Block scopes carry a code range; other kinds keep
/// `start_pc == end_pc == 0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugScope
{
    pub tag: ScopeTag,
    pub flags: ScopeFlags,
    /// `None` only for the root.
    pub parent: Option<ScopeId>,
    /// Base class of a Class scope.
    pub inheritance: Option<ScopeId>,
    /// Scopes brought into view (`using namespace`).
    pub imports: Vec<ScopeId>,
    pub start_pc: Pc,
    pub end_pc: Pc,
    pub name: String,
    /// Return type for functions, underlying type for enums, the type for classes.
    pub type_id: TypeId,
}

impl DebugScope
{
    /// The root scope every other scope descends from.
    #[must_use]
    pub fn root() -> Self
    {
        Self {
            tag: ScopeTag::Root,
            flags: ScopeFlags::empty(),
            parent: None,
            inheritance: None,
            imports: Vec::new(),
            start_pc: Pc::ZERO,
            end_pc: Pc::ZERO,
            name: String::new(),
            type_id: TypeId::VOID,
        }
    }

    /// A scope of kind `tag` nested under `parent`.
    #[must_use]
    pub fn new(tag: ScopeTag, parent: ScopeId) -> Self
    {
        Self {
            tag,
            parent: Some(parent),
            ..Self::root()
        }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self
    {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_type(mut self, type_id: TypeId) -> Self
    {
        self.type_id = type_id;
        self
    }

    #[must_use]
    pub fn with_range(mut self, start_pc: u32, end_pc: u32) -> Self
    {
        self.start_pc = Pc::new(start_pc);
        self.end_pc = Pc::new(end_pc);
        self
    }

    #[must_use]
    pub fn inherits(mut self, base: ScopeId) -> Self
    {
        self.inheritance = Some(base);
        self
    }

    #[must_use]
    pub fn importing(mut self, scope: ScopeId) -> Self
    {
        self.imports.push(scope);
        self
    }

    #[must_use]
    pub fn with_flags(mut self, flags: ScopeFlags) -> Self
    {
        self.flags = flags;
        self
    }

    /// Whether `pc` falls in this scope's code range.
    #[must_use]
    pub fn contains_pc(&self, pc: Pc) -> bool
    {
        self.start_pc <= pc && pc < self.end_pc
    }
}

/// A named, typed declaration attached to a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugSymbol
{
    pub scope: ScopeId,
    /// Meaning depends on [`SymbolStorage`]. Signed because constants may be negative.
    pub offset: i32,
    pub type_id: TypeId,
    pub flags: SymbolFlags,
    pub storage: SymbolStorage,
    /// Line of the declaration in the enclosing file, 0 when unknown.
    pub declaration_line: u32,
    pub name: String,
}

impl DebugSymbol
{
    #[must_use]
    pub fn new(scope: ScopeId, name: impl Into<String>, type_id: TypeId, storage: SymbolStorage, offset: i32) -> Self
    {
        Self {
            scope,
            offset,
            type_id,
            flags: SymbolFlags::empty(),
            storage,
            declaration_line: 0,
            name: name.into(),
        }
    }

    #[must_use]
    pub fn with_flags(mut self, flags: SymbolFlags) -> Self
    {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn declared_at(mut self, line: u32) -> Self
    {
        self.declaration_line = line;
        self
    }

    #[must_use]
    pub fn is_hidden(&self) -> bool
    {
        self.flags.contains(SymbolFlags::HIDDEN)
    }

    #[must_use]
    pub fn is_varargs(&self) -> bool
    {
        self.flags.contains(SymbolFlags::VARARGS)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_type_wire_form()
    {
        let ty = DebugType::Array(TypeId::INT);
        assert_eq!(ty.tag(), type_tag::ARRAY);
        assert_eq!(ty.extra(), 4);
        assert_eq!(DebugType::from_wire(ty.tag(), ty.extra()).unwrap(), ty);
    }

    #[test]
    fn test_builtin_tag_rejected_in_table()
    {
        assert!(DebugType::from_wire(type_tag::INT, 4).is_err());
        assert!(DebugType::from_wire(99, 0).is_err());
        assert!(DebugType::from_wire(type_tag::CLASS, -1).is_err());
    }

    #[test]
    fn test_builtin_table_matches_ids()
    {
        for (index, ty) in BUILTIN_TYPES.iter().enumerate() {
            assert_eq!(ty.tag() as usize, index);
        }
    }

    #[test]
    fn test_scope_tag_zero_rejected()
    {
        assert!(ScopeTag::try_from(0).is_err());
        assert_eq!(ScopeTag::try_from(ScopeTag::Block.wire()).unwrap(), ScopeTag::Block);
    }

    #[test]
    fn test_type_id_table_index()
    {
        assert_eq!(TypeId::INT.table_index(), None);
        assert_eq!(TypeId::from_table_index(3), TypeId(35));
        assert_eq!(TypeId(35).table_index(), Some(3));
    }
}
