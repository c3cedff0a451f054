//! The middle end: type representation, scopes, the type checker, SSA
//! construction, and the mem2reg optimization pass.

pub mod check;
pub mod constant;
pub mod layout;
pub mod optimization;
pub mod scope;
pub mod ssa;
pub mod ty;

use crate::{
    frontend::{intern::Symbol, pos::Pos},
    index::{Index, IndexVec},
    middle::{
        scope::{BuiltinKind, ObjId, ObjKind, Object, Scope, ScopeId},
        ty::{BasicKind, TypeTable},
    },
};

/// Context for one compilation: the type, object, and scope arenas, plus the
/// universe scope. Created once, threaded through the checker, the SSA
/// builder, and the passes; logically immutable after checking except for
/// pointer types created during SSA construction.
pub struct TypeCx {
    pub types: TypeTable,
    pub(crate) objs: IndexVec<ObjId, Object>,
    pub(crate) scopes: IndexVec<ScopeId, Scope>,
    /// The root scope holding the predeclared types, constants, and builtins.
    pub universe: ScopeId,
}

impl TypeCx {
    pub fn new() -> TypeCx {
        let mut cx = TypeCx {
            types: TypeTable::new(),
            objs: IndexVec::new(),
            scopes: IndexVec::new(),
            universe: ScopeId::new(0),
        };
        cx.universe = cx.new_scope(None, Pos::none(), Pos::none(), "universe");
        cx.def_predeclared_types();
        cx.def_predeclared_consts();
        cx.def_predeclared_builtins();
        cx
    }

    /// Defines bool, int, float, string.
    fn def_predeclared_types(&mut self) {
        for kind in [
            BasicKind::Bool,
            BasicKind::Int,
            BasicKind::Float,
            BasicKind::String,
        ] {
            let ty = self.types.basic(kind);
            let obj = self.new_object(
                Symbol::new(kind.name()),
                Pos::none(),
                Some(ty),
                ObjKind::TypeName,
            );
            self.insert(self.universe, obj);
        }
    }

    /// Defines true, false (variables of untyped bool), and nil.
    fn def_predeclared_consts(&mut self) {
        let ubool = self.types.basic(BasicKind::UntypedBool);
        for name in ["true", "false"] {
            let obj = self.new_object(Symbol::new(name), Pos::none(), Some(ubool), ObjKind::Var);
            self.insert(self.universe, obj);
        }

        let unil = self.types.basic(BasicKind::UntypedNil);
        let nil = self.new_object(Symbol::new("nil"), Pos::none(), Some(unil), ObjKind::Nil);
        self.insert(self.universe, nil);
    }

    /// Defines println, new, panic.
    fn def_predeclared_builtins(&mut self) {
        for kind in [BuiltinKind::Println, BuiltinKind::New, BuiltinKind::Panic] {
            let obj = self.new_object(
                Symbol::new(kind.name()),
                Pos::none(),
                None,
                ObjKind::Builtin(kind),
            );
            self.insert(self.universe, obj);
        }
    }
}

impl Default for TypeCx {
    fn default() -> Self {
        TypeCx::new()
    }
}

/// The result of checking one file.
pub struct Package {
    pub name: Symbol,
    pub scope: ScopeId,
}
