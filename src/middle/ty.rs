//! Type representation and predicates. Types live in an arena owned by the
//! [`TypeTable`] and are referenced by [`TypeId`]; cyclic shapes (named type
//! to method to signature back to the named type) travel as indices, never as
//! owning pointers.

use hashbrown::HashMap;

use crate::{
    frontend::{intern::Symbol, pos::Pos},
    index::IndexVec,
    middle::{layout::StructLayout, scope::ObjId},
    simple_index,
};

simple_index! {
    /// Identifies a type in the [`TypeTable`] arena.
    pub struct TypeId;
}

/// The kind of a basic type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasicKind {
    Bool,
    Int,
    Float,
    String,

    /* Untyped kinds, for constant expressions */
    UntypedBool,
    UntypedInt,
    UntypedFloat,
    UntypedString,
    UntypedNil,
}

impl BasicKind {
    pub fn name(self) -> &'static str {
        match self {
            BasicKind::Bool => "bool",
            BasicKind::Int => "int",
            BasicKind::Float => "float",
            BasicKind::String => "string",
            BasicKind::UntypedBool => "untyped bool",
            BasicKind::UntypedInt => "untyped int",
            BasicKind::UntypedFloat => "untyped float",
            BasicKind::UntypedString => "untyped string",
            BasicKind::UntypedNil => "untyped nil",
        }
    }

    pub fn is_untyped(self) -> bool {
        matches!(
            self,
            BasicKind::UntypedBool
                | BasicKind::UntypedInt
                | BasicKind::UntypedFloat
                | BasicKind::UntypedString
                | BasicKind::UntypedNil
        )
    }

    pub fn is_boolean(self) -> bool {
        matches!(self, BasicKind::Bool | BasicKind::UntypedBool)
    }

    pub fn is_integer(self) -> bool {
        matches!(self, BasicKind::Int | BasicKind::UntypedInt)
    }

    pub fn is_float(self) -> bool {
        matches!(self, BasicKind::Float | BasicKind::UntypedFloat)
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }

    pub fn is_string(self) -> bool {
        matches!(self, BasicKind::String | BasicKind::UntypedString)
    }
}

/// A struct field. Fields are plain records owned by their struct type; they
/// are never inserted into scopes.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: Symbol,
    pub ty: TypeId,
    pub pos: Pos,
}

/// A function type. Parameter and result entries are types only; the
/// parameter objects live on the function object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncType {
    pub recv: Option<TypeId>,
    pub params: Vec<TypeId>,
    pub result: Option<TypeId>,
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    Basic(BasicKind),
    /// `[N]Elem`
    Array { len: i64, elem: TypeId },
    /// `struct { ... }`
    Struct { fields: Vec<Field> },
    /// `*T` — stack-only, may not escape its frame.
    Pointer { elem: TypeId },
    /// `ref T` — GC-managed heap reference.
    Ref { elem: TypeId },
    Func(FuncType),
    /// `type T ...`. `underlying` is None while the declaration is an
    /// unresolved shell during the fixed-point resolve loop.
    Named {
        name: Symbol,
        obj: ObjId,
        underlying: Option<TypeId>,
        methods: Vec<ObjId>,
    },
}

/// Arena of all types created during one compilation, plus the lazily
/// computed struct layout cache.
pub struct TypeTable {
    types: IndexVec<TypeId, TypeKind>,
    pub(crate) layouts: HashMap<TypeId, StructLayout>,
    basics: [TypeId; 9],
}

impl TypeTable {
    pub fn new() -> TypeTable {
        let mut types = IndexVec::new();
        let basics = [
            BasicKind::Bool,
            BasicKind::Int,
            BasicKind::Float,
            BasicKind::String,
            BasicKind::UntypedBool,
            BasicKind::UntypedInt,
            BasicKind::UntypedFloat,
            BasicKind::UntypedString,
            BasicKind::UntypedNil,
        ]
        .map(|k| types.push(TypeKind::Basic(k)));

        TypeTable {
            types,
            layouts: HashMap::new(),
            basics,
        }
    }

    /// The pre-interned type for a basic kind.
    pub fn basic(&self, kind: BasicKind) -> TypeId {
        let idx = match kind {
            BasicKind::Bool => 0,
            BasicKind::Int => 1,
            BasicKind::Float => 2,
            BasicKind::String => 3,
            BasicKind::UntypedBool => 4,
            BasicKind::UntypedInt => 5,
            BasicKind::UntypedFloat => 6,
            BasicKind::UntypedString => 7,
            BasicKind::UntypedNil => 8,
        };
        self.basics[idx]
    }

    pub fn kind(&self, t: TypeId) -> &TypeKind {
        &self.types[t]
    }

    pub fn make_array(&mut self, len: i64, elem: TypeId) -> TypeId {
        self.types.push(TypeKind::Array { len, elem })
    }

    pub fn make_struct(&mut self, fields: Vec<Field>) -> TypeId {
        self.types.push(TypeKind::Struct { fields })
    }

    pub fn make_pointer(&mut self, elem: TypeId) -> TypeId {
        self.types.push(TypeKind::Pointer { elem })
    }

    pub fn make_ref(&mut self, elem: TypeId) -> TypeId {
        self.types.push(TypeKind::Ref { elem })
    }

    pub fn make_func(&mut self, sig: FuncType) -> TypeId {
        self.types.push(TypeKind::Func(sig))
    }

    /// Creates a named-type shell with no underlying type yet.
    pub fn make_named(&mut self, name: Symbol, obj: ObjId) -> TypeId {
        self.types.push(TypeKind::Named {
            name,
            obj,
            underlying: None,
            methods: Vec::new(),
        })
    }

    /// Sets a named type's underlying type, chasing named underlyings so the
    /// stored underlying is never itself a named type. A resolution that
    /// chases back to the named type itself is ignored (cyclic declaration).
    pub fn set_underlying(&mut self, named: TypeId, underlying: TypeId) {
        let u = self.underlying(underlying);
        if u == named {
            return;
        }
        match &mut self.types[named] {
            TypeKind::Named { underlying, .. } => *underlying = Some(u),
            _ => panic!("set_underlying on non-named type"),
        }
    }

    pub fn add_method(&mut self, named: TypeId, method: ObjId) {
        match &mut self.types[named] {
            TypeKind::Named { methods, .. } => methods.push(method),
            _ => panic!("add_method on non-named type"),
        }
    }

    /// Chases named types to their underlying type. A named shell whose
    /// underlying has not been resolved yet is returned as-is.
    pub fn underlying(&self, mut t: TypeId) -> TypeId {
        loop {
            match self.kind(t) {
                TypeKind::Named {
                    underlying: Some(u),
                    ..
                } => t = *u,
                _ => return t,
            }
        }
    }

    /* Predicates */

    /// Reports whether two types are identical: nominal for named types,
    /// structural for everything else.
    pub fn identical(&self, x: TypeId, y: TypeId) -> bool {
        if x == y {
            return true;
        }
        match (self.kind(x), self.kind(y)) {
            (TypeKind::Named { obj: a, .. }, TypeKind::Named { obj: b, .. }) => a == b,
            (TypeKind::Named { .. }, _) | (_, TypeKind::Named { .. }) => false,
            (TypeKind::Basic(a), TypeKind::Basic(b)) => a == b,
            (
                TypeKind::Array { len: l1, elem: e1 },
                TypeKind::Array { len: l2, elem: e2 },
            ) => l1 == l2 && self.identical(*e1, *e2),
            (TypeKind::Struct { fields: f1 }, TypeKind::Struct { fields: f2 }) => {
                f1.len() == f2.len()
                    && f1
                        .iter()
                        .zip(f2.iter())
                        .all(|(a, b)| a.name == b.name && self.identical(a.ty, b.ty))
            }
            (TypeKind::Pointer { elem: a }, TypeKind::Pointer { elem: b }) => {
                self.identical(*a, *b)
            }
            (TypeKind::Ref { elem: a }, TypeKind::Ref { elem: b }) => self.identical(*a, *b),
            (TypeKind::Func(a), TypeKind::Func(b)) => self.identical_funcs(a, b),
            _ => false,
        }
    }

    fn identical_funcs(&self, a: &FuncType, b: &FuncType) -> bool {
        match (a.recv, b.recv) {
            (None, None) => {}
            (Some(x), Some(y)) if self.identical(x, y) => {}
            _ => return false,
        }
        if a.params.len() != b.params.len() {
            return false;
        }
        if !a
            .params
            .iter()
            .zip(b.params.iter())
            .all(|(&x, &y)| self.identical(x, y))
        {
            return false;
        }
        match (a.result, b.result) {
            (None, None) => true,
            (Some(x), Some(y)) => self.identical(x, y),
            _ => false,
        }
    }

    /// Reports whether a value of type `v` is assignable to type `t`.
    pub fn assignable(&self, v: TypeId, t: TypeId) -> bool {
        if self.identical(v, t) {
            return true;
        }

        if let TypeKind::Basic(vk) = self.kind(v) {
            if !vk.is_untyped() {
                return false;
            }
            // Untyped nil is assignable to any pointer or ref type.
            if *vk == BasicKind::UntypedNil {
                return matches!(
                    self.kind(self.underlying(t)),
                    TypeKind::Pointer { .. } | TypeKind::Ref { .. }
                );
            }
            // Untyped constants are assignable to compatible concrete types.
            if let TypeKind::Basic(tk) = self.kind(self.underlying(t)) {
                return match vk {
                    BasicKind::UntypedBool => *tk == BasicKind::Bool,
                    BasicKind::UntypedInt => *tk == BasicKind::Int || *tk == BasicKind::Float,
                    BasicKind::UntypedFloat => *tk == BasicKind::Float,
                    BasicKind::UntypedString => *tk == BasicKind::String,
                    _ => false,
                };
            }
        }

        false
    }

    /// Reports whether values of type `t` can be compared with == or !=.
    pub fn comparable(&self, t: TypeId) -> bool {
        match self.kind(self.underlying(t)) {
            TypeKind::Basic(_) => true,
            TypeKind::Pointer { .. } | TypeKind::Ref { .. } => true,
            TypeKind::Array { elem, .. } => self.comparable(*elem),
            TypeKind::Struct { fields } => fields.iter().all(|f| self.comparable(f.ty)),
            // Functions are never comparable; an unresolved named shell
            // compares as nothing.
            _ => false,
        }
    }

    /// Reports whether values of type `t` can be ordered with < <= > >=.
    pub fn ordered(&self, t: TypeId) -> bool {
        match self.kind(self.underlying(t)) {
            TypeKind::Basic(k) => k.is_numeric() || k.is_string(),
            _ => false,
        }
    }

    /// The default type for an untyped type; typed types map to themselves.
    pub fn default_type(&self, t: TypeId) -> TypeId {
        match self.kind(t) {
            TypeKind::Basic(BasicKind::UntypedBool) => self.basic(BasicKind::Bool),
            TypeKind::Basic(BasicKind::UntypedInt) => self.basic(BasicKind::Int),
            TypeKind::Basic(BasicKind::UntypedFloat) => self.basic(BasicKind::Float),
            TypeKind::Basic(BasicKind::UntypedString) => self.basic(BasicKind::String),
            _ => t,
        }
    }

    pub fn is_untyped(&self, t: TypeId) -> bool {
        matches!(self.kind(t), TypeKind::Basic(k) if k.is_untyped())
    }

    pub fn is_boolean(&self, t: TypeId) -> bool {
        matches!(self.kind(self.underlying(t)), TypeKind::Basic(k) if k.is_boolean())
    }

    pub fn is_integer(&self, t: TypeId) -> bool {
        matches!(self.kind(self.underlying(t)), TypeKind::Basic(k) if k.is_integer())
    }

    pub fn is_float(&self, t: TypeId) -> bool {
        matches!(self.kind(self.underlying(t)), TypeKind::Basic(k) if k.is_float())
    }

    pub fn is_numeric(&self, t: TypeId) -> bool {
        matches!(self.kind(self.underlying(t)), TypeKind::Basic(k) if k.is_numeric())
    }

    pub fn is_string(&self, t: TypeId) -> bool {
        matches!(self.kind(self.underlying(t)), TypeKind::Basic(k) if k.is_string())
    }

    /// Reports whether `t` is the untyped nil type.
    pub fn is_nil(&self, t: TypeId) -> bool {
        matches!(self.kind(t), TypeKind::Basic(BasicKind::UntypedNil))
    }

    pub fn is_pointer(&self, t: TypeId) -> bool {
        matches!(self.kind(self.underlying(t)), TypeKind::Pointer { .. })
    }

    pub fn is_ref(&self, t: TypeId) -> bool {
        matches!(self.kind(self.underlying(t)), TypeKind::Ref { .. })
    }

    pub fn is_pointer_or_ref(&self, t: TypeId) -> bool {
        self.is_pointer(t) || self.is_ref(t)
    }

    /// The element type of a pointer or ref type, or None.
    pub fn elem(&self, t: TypeId) -> Option<TypeId> {
        match self.kind(self.underlying(t)) {
            TypeKind::Pointer { elem } | TypeKind::Ref { elem } => Some(*elem),
            _ => None,
        }
    }

    /// A displayable wrapper for a type.
    pub fn display(&self, t: TypeId) -> TypeDisplay<'_> {
        TypeDisplay { table: self, id: t }
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        TypeTable::new()
    }
}

pub struct TypeDisplay<'a> {
    table: &'a TypeTable,
    id: TypeId,
}

impl core::fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let t = self.table;
        match t.kind(self.id) {
            TypeKind::Basic(k) => f.write_str(k.name()),
            TypeKind::Array { len, elem } => write!(f, "[{}]{}", len, t.display(*elem)),
            TypeKind::Struct { fields } => {
                f.write_str("struct{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{} {}", field.name, t.display(field.ty))?;
                }
                f.write_str("}")
            }
            TypeKind::Pointer { elem } => write!(f, "*{}", t.display(*elem)),
            TypeKind::Ref { elem } => write!(f, "ref {}", t.display(*elem)),
            TypeKind::Func(sig) => {
                f.write_str("func(")?;
                for (i, &p) in sig.params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", t.display(p))?;
                }
                f.write_str(")")?;
                if let Some(r) = sig.result {
                    write!(f, " {}", t.display(r))?;
                }
                Ok(())
            }
            TypeKind::Named { name, .. } => write!(f, "{name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::intern::Symbol;
    use crate::index::Index;

    fn field(name: &str, ty: TypeId) -> Field {
        Field {
            name: Symbol::new(name),
            ty,
            pos: Pos::none(),
        }
    }

    #[test]
    fn identity_is_reflexive_symmetric_transitive() {
        let mut t = TypeTable::new();
        let int = t.basic(BasicKind::Int);
        let a1 = t.make_array(3, int);
        let a2 = t.make_array(3, int);
        let a3 = t.make_array(3, int);

        for x in [int, a1, a2, a3] {
            assert!(t.identical(x, x));
        }
        assert!(t.identical(a1, a2));
        assert!(t.identical(a2, a1));
        assert!(t.identical(a2, a3));
        assert!(t.identical(a1, a3));

        let a4 = t.make_array(4, int);
        assert!(!t.identical(a1, a4));
    }

    #[test]
    fn structs_are_structural_named_are_nominal() {
        let mut t = TypeTable::new();
        let int = t.basic(BasicKind::Int);
        let s1 = t.make_struct(vec![field("x", int), field("y", int)]);
        let s2 = t.make_struct(vec![field("x", int), field("y", int)]);
        let s3 = t.make_struct(vec![field("x", int), field("z", int)]);
        assert!(t.identical(s1, s2));
        assert!(!t.identical(s1, s3));

        let obj_a = ObjId::new(0);
        let obj_b = ObjId::new(1);
        let na = t.make_named(Symbol::new("A"), obj_a);
        let nb = t.make_named(Symbol::new("B"), obj_b);
        t.set_underlying(na, s1);
        t.set_underlying(nb, s2);
        assert!(!t.identical(na, nb));
        assert!(t.identical(na, na));
        // Identical underlying does not make the named types assignable.
        assert!(!t.assignable(na, nb));
    }

    #[test]
    fn assignability_is_a_superset_of_identity() {
        let mut t = TypeTable::new();
        let int = t.basic(BasicKind::Int);
        let float = t.basic(BasicKind::Float);
        let ptr = t.make_pointer(int);
        let rf = t.make_ref(int);
        for x in [int, float, ptr, rf] {
            assert!(t.assignable(x, x));
        }

        let uint = t.basic(BasicKind::UntypedInt);
        let ufloat = t.basic(BasicKind::UntypedFloat);
        let nil = t.basic(BasicKind::UntypedNil);
        assert!(t.assignable(uint, int));
        assert!(t.assignable(uint, float));
        assert!(t.assignable(ufloat, float));
        assert!(!t.assignable(ufloat, int));
        assert!(t.assignable(nil, ptr));
        assert!(t.assignable(nil, rf));
        assert!(!t.assignable(nil, int));
        assert!(!t.assignable(int, float));
    }

    #[test]
    fn comparability_and_ordering() {
        let mut t = TypeTable::new();
        let int = t.basic(BasicKind::Int);
        let string = t.basic(BasicKind::String);
        let ptr = t.make_pointer(int);
        let arr = t.make_array(2, int);
        let s = t.make_struct(vec![field("x", int)]);
        let sig = t.make_func(FuncType {
            recv: None,
            params: vec![],
            result: None,
        });

        assert!(t.comparable(int));
        assert!(t.comparable(ptr));
        assert!(t.comparable(arr));
        assert!(t.comparable(s));
        assert!(!t.comparable(sig));

        assert!(t.ordered(int));
        assert!(t.ordered(string));
        assert!(!t.ordered(ptr));
        assert!(!t.ordered(arr));
    }

    #[test]
    fn named_underlying_is_never_named() {
        let mut t = TypeTable::new();
        let int = t.basic(BasicKind::Int);
        let a = t.make_named(Symbol::new("A"), ObjId::new(0));
        let b = t.make_named(Symbol::new("B"), ObjId::new(1));
        t.set_underlying(b, int);
        // A's declared underlying is the named B; the stored underlying
        // chases to B's underlying.
        t.set_underlying(a, b);
        let TypeKind::Named {
            underlying: Some(u),
            ..
        } = t.kind(a)
        else {
            panic!("shell not filled");
        };
        assert!(matches!(t.kind(*u), TypeKind::Basic(BasicKind::Int)));
        assert_eq!(t.underlying(a), int);
    }

    #[test]
    fn display_forms() {
        let mut t = TypeTable::new();
        let int = t.basic(BasicKind::Int);
        let ptr = t.make_pointer(int);
        let rf = t.make_ref(int);
        let arr = t.make_array(4, int);
        let s = t.make_struct(vec![field("x", int), field("p", ptr)]);
        assert_eq!(t.display(ptr).to_string(), "*int");
        assert_eq!(t.display(rf).to_string(), "ref int");
        assert_eq!(t.display(arr).to_string(), "[4]int");
        assert_eq!(t.display(s).to_string(), "struct{x int; p *int}");
    }
}
