//! Type lookups, predicates, display names, and the coercion relation.

use super::model::{DebugType, ScopeId, TypeId, BUILTIN_TYPES};
use super::DebugData;

impl DebugData
{
    /// Type for `id`: a built-in or an entry of the composite table.
    #[must_use]
    pub fn get_type(&self, id: TypeId) -> Option<&DebugType>
    {
        if id.is_builtin() {
            return BUILTIN_TYPES.get(id.0 as usize);
        }
        self.types.get(id.table_index()?)
    }

    /// Strip any number of `const` wrappers from `id`.
    #[must_use]
    pub fn unwrap_const(&self, mut id: TypeId) -> TypeId
    {
        while let Some(DebugType::Const(inner)) = self.get_type(id) {
            id = *inner;
        }
        id
    }

    /// Type for `id` after stripping `const`.
    #[must_use]
    pub fn get_type_unwrap_const(&self, id: TypeId) -> Option<&DebugType>
    {
        self.get_type(self.unwrap_const(id))
    }

    fn unwrapped_is(&self, id: TypeId, pred: impl Fn(&DebugType) -> bool) -> bool
    {
        self.get_type_unwrap_const(id).is_some_and(pred)
    }

    #[must_use]
    pub fn is_const(&self, id: TypeId) -> bool
    {
        matches!(self.get_type(id), Some(DebugType::Const(_)))
    }

    #[must_use]
    pub fn is_void(&self, id: TypeId) -> bool
    {
        self.unwrapped_is(id, |ty| matches!(ty, DebugType::Void))
    }

    #[must_use]
    pub fn is_untyped(&self, id: TypeId) -> bool
    {
        self.unwrapped_is(id, |ty| matches!(ty, DebugType::Untyped))
    }

    /// Whether `id` is the fixed-point `int` type.
    #[must_use]
    pub fn is_fixed(&self, id: TypeId) -> bool
    {
        self.unwrapped_is(id, |ty| matches!(ty, DebugType::Int))
    }

    #[must_use]
    pub fn is_long(&self, id: TypeId) -> bool
    {
        self.unwrapped_is(id, |ty| matches!(ty, DebugType::Long))
    }

    #[must_use]
    pub fn is_bool(&self, id: TypeId) -> bool
    {
        self.unwrapped_is(id, |ty| matches!(ty, DebugType::Bool))
    }

    /// Enum or bitflags.
    #[must_use]
    pub fn is_enum(&self, id: TypeId) -> bool
    {
        self.unwrapped_is(id, |ty| matches!(ty, DebugType::Enum(_) | DebugType::Bitflags(_)))
    }

    #[must_use]
    pub fn is_bitflags(&self, id: TypeId) -> bool
    {
        self.unwrapped_is(id, |ty| matches!(ty, DebugType::Bitflags(_)))
    }

    /// Strings are `char32[]`.
    #[must_use]
    pub fn is_string(&self, id: TypeId) -> bool
    {
        self.unwrapped_is(id, |ty| matches!(ty, DebugType::Array(TypeId::CHAR32)))
    }

    #[must_use]
    pub fn is_array(&self, id: TypeId) -> bool
    {
        self.unwrapped_is(id, |ty| matches!(ty, DebugType::Array(_)))
    }

    #[must_use]
    pub fn is_class(&self, id: TypeId) -> bool
    {
        self.unwrapped_is(id, |ty| matches!(ty, DebugType::Class(_)))
    }

    /// Values of arrays and classes are reference counted by the VM.
    #[must_use]
    pub fn is_reference_type(&self, id: TypeId) -> bool
    {
        self.is_array(id) || self.is_class(id)
    }

    /// Element type of an array type (after stripping `const`).
    #[must_use]
    pub fn array_element_type(&self, id: TypeId) -> Option<TypeId>
    {
        match self.get_type_unwrap_const(id)? {
            DebugType::Array(element) => Some(*element),
            _ => None,
        }
    }

    /// Defining scope of a class type (after stripping `const`).
    #[must_use]
    pub fn class_scope(&self, id: TypeId) -> Option<ScopeId>
    {
        match self.get_type_unwrap_const(id)? {
            DebugType::Class(scope) => Some(*scope),
            _ => None,
        }
    }

    /// Type id of the class, enum, or bitflags type defined by `scope`.
    #[must_use]
    pub fn type_for_scope(&self, scope: ScopeId) -> Option<TypeId>
    {
        self.types
            .iter()
            .position(|ty| ty.defining_scope() == Some(scope))
            .map(TypeId::from_table_index)
    }

    /// Display name of a type, e.g. `const int`, `char32[]`, `Enemy`.
    #[must_use]
    pub fn type_name(&self, id: TypeId) -> String
    {
        let Some(ty) = self.get_type(id) else {
            return "unknown".to_string();
        };
        match *ty {
            DebugType::Void => "void".to_string(),
            DebugType::TemplateUnbounded => "T".to_string(),
            DebugType::Untyped => "untyped".to_string(),
            DebugType::Bool => "bool".to_string(),
            DebugType::Int => "int".to_string(),
            DebugType::Long => "long".to_string(),
            DebugType::Char32 => "char32".to_string(),
            DebugType::Rgb => "rgb".to_string(),
            DebugType::Const(inner) => format!("const {}", self.type_name(inner)),
            DebugType::Array(element) => format!("{}[]", self.type_name(element)),
            DebugType::Class(scope) | DebugType::Enum(scope) | DebugType::Bitflags(scope) => self
                .get_scope(scope)
                .map_or_else(|| "unknown".to_string(), |s| s.name.clone()),
        }
    }

    /// Whether a value of type `from` may be passed where `to` is expected.
    ///
    /// After stripping `const` from both sides:
    ///
    /// - identical types coerce
    /// - `untyped` on either side coerces
    /// - arrays coerce when their element types do
    /// - `int`, `long`, and `bool` coerce among each other
    /// - enums and bitflags coerce to those numeric types
    /// - a class coerces to itself and to every class in its base chain
    ///
    /// ## Example
    ///
    /// ```rust
    /// use zdb_core::{DebugDataBuilder, DebugType, TypeId};
    ///
    /// let mut builder = DebugDataBuilder::new();
    /// let ints = builder.add_type(DebugType::Array(TypeId::INT));
    /// let untyped = builder.add_type(DebugType::Array(TypeId::UNTYPED));
    /// let data = builder.build()?;
    ///
    /// assert!(data.can_coerce_types(ints, untyped));
    /// assert!(!data.can_coerce_types(TypeId::INT, ints));
    /// # Ok::<(), zdb_core::ZdbError>(())
    /// ```
    #[must_use]
    pub fn can_coerce_types(&self, from: TypeId, to: TypeId) -> bool
    {
        if from == to {
            return true;
        }

        let (from, to) = (self.unwrap_const(from), self.unwrap_const(to));
        if from == to {
            return true;
        }
        let (Some(a), Some(b)) = (self.get_type(from), self.get_type(to)) else {
            return false;
        };

        let is_numeric = |ty: &DebugType| matches!(ty, DebugType::Int | DebugType::Long | DebugType::Bool);

        match (*a, *b) {
            (DebugType::Untyped, _) | (_, DebugType::Untyped) => true,
            (DebugType::Array(a_elem), DebugType::Array(b_elem)) => self.can_coerce_types(a_elem, b_elem),
            (DebugType::Enum(_) | DebugType::Bitflags(_), _) if is_numeric(b) => true,
            (DebugType::Class(derived), DebugType::Class(base)) => self.class_derives_from(derived, base),
            _ => is_numeric(a) && is_numeric(b),
        }
    }

    /// Whether `base` is `derived` or appears in its inheritance chain.
    #[must_use]
    pub fn class_derives_from(&self, derived: ScopeId, base: ScopeId) -> bool
    {
        let mut current = Some(derived);
        while let Some(id) = current {
            if id == base {
                return true;
            }
            current = self.get_scope(id).and_then(|scope| scope.inheritance);
        }
        false
    }
}
