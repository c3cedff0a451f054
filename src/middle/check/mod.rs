//! The type checker. Runs five ordered passes over a parsed file: collect
//! top-level declarations, resolve type declarations to a fixed point,
//! resolve function signatures, check global variables, then check function
//! bodies. Results are recorded in [`Info`] side tables keyed by AST node id.

mod call;
mod escape;
mod expr;
mod stmt;
mod typexpr;

use hashbrown::HashMap;

use crate::{
    diag::Handler,
    frontend::{
        ast::{Decl, DeclKind, File, FuncDecl, NodeId},
        intern::Symbol,
        pos::Pos,
    },
    middle::{
        constant::ConstValue,
        scope::{ObjId, ObjKind, ScopeId},
        ty::{FuncType, TypeId, TypeKind},
        Package, TypeCx,
    },
};

/// The mode of an operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandMode {
    /// The operand is invalid (an error was already reported).
    Invalid,
    /// No value (void function call).
    NoValue,
    /// A built-in function.
    Builtin,
    /// A type expression.
    TypeExpr,
    /// A constant value.
    Constant,
    /// An addressable variable.
    Variable,
    /// A computed, non-addressable value.
    Value,
}

/// The result of evaluating an expression.
#[derive(Debug, Clone)]
pub(crate) struct Operand {
    pub mode: OperandMode,
    pub pos: Pos,
    pub ty: Option<TypeId>,
    pub val: Option<ConstValue>,
    /// The source node, for updating its recorded annotation when an untyped
    /// operand adopts a concrete type.
    pub node: Option<NodeId>,
}

impl Operand {
    pub(crate) fn invalid() -> Operand {
        Operand {
            mode: OperandMode::Invalid,
            pos: Pos::none(),
            ty: None,
            val: None,
            node: None,
        }
    }
}

/// Type and value information recorded for an expression.
#[derive(Debug, Clone)]
pub struct TypeAndValue {
    pub ty: Option<TypeId>,
    pub value: Option<ConstValue>,
    mode: OperandMode,
}

impl TypeAndValue {
    pub fn is_void(&self) -> bool {
        self.mode == OperandMode::NoValue
    }

    pub fn is_builtin(&self) -> bool {
        self.mode == OperandMode::Builtin
    }

    pub fn is_type(&self) -> bool {
        self.mode == OperandMode::TypeExpr
    }

    pub fn is_constant(&self) -> bool {
        self.mode == OperandMode::Constant
    }

    pub fn is_addressable(&self) -> bool {
        self.mode == OperandMode::Variable
    }

    pub fn is_value(&self) -> bool {
        matches!(
            self.mode,
            OperandMode::Constant | OperandMode::Variable | OperandMode::Value
        )
    }
}

/// The results of type checking, keyed by AST node id.
#[derive(Debug, Default)]
pub struct Info {
    /// Expression node → type and value.
    pub types: HashMap<NodeId, TypeAndValue>,
    /// Defining name node → declared object.
    pub defs: HashMap<NodeId, ObjId>,
    /// Referencing name node → referenced object.
    pub uses: HashMap<NodeId, ObjId>,
    /// File / function body / block node → its scope.
    pub scopes: HashMap<NodeId, ScopeId>,
}

/// Type-checks a parsed file. Returns the package; the number of errors is
/// reported through the handler (and [`Checker::errors`] while running).
pub fn check(file: &File, cx: &mut TypeCx, handler: Handler, info: &mut Info) -> (Package, usize) {
    let mut c = Checker {
        cx,
        handler,
        info,
        pkg_scope: ScopeId::default_invalid(),
        scope: ScopeId::default_invalid(),
        func_result: None,
        loop_depth: 0,
        func_decls: HashMap::new(),
        errors: 0,
    };
    let pkg = c.check_file(file);
    let errors = c.errors;
    (pkg, errors)
}

impl ScopeId {
    fn default_invalid() -> ScopeId {
        use crate::index::Index;
        ScopeId::new(0)
    }
}

pub(crate) struct Checker<'a> {
    pub(crate) cx: &'a mut TypeCx,
    pub(crate) handler: Handler,
    pub(crate) info: &'a mut Info,

    /// The package scope for the file being checked.
    pub(crate) pkg_scope: ScopeId,
    /// The current scope.
    pub(crate) scope: ScopeId,

    /// The current function's result type: None when outside any function,
    /// Some(None) inside a void function.
    pub(crate) func_result: Option<Option<TypeId>>,

    /// Nested loop depth, for break/continue validation.
    pub(crate) loop_depth: u32,

    /// Function objects keyed by their declaration node. Methods are not in
    /// the package scope, so this map is the only way back to their objects.
    pub(crate) func_decls: HashMap<NodeId, ObjId>,

    pub(crate) errors: usize,
}

impl<'a> Checker<'a> {
    fn check_file(&mut self, file: &File) -> Package {
        let pkg_name = file.pkg_name.value;
        self.pkg_scope = self.cx.new_scope(
            Some(self.cx.universe),
            Pos::none(),
            Pos::none(),
            format!("package {pkg_name}"),
        );
        self.scope = self.pkg_scope;
        self.info.scopes.insert(file.id, self.pkg_scope);

        // Phase 1: collect all top-level declarations.
        self.collect_decls(file);

        // Phase 2: resolve type declarations. Multiple passes let forward
        // aliases settle to their final types; struct resolutions allocate
        // fresh types each pass, so the pass count is capped rather than
        // waiting for id equality.
        let type_decls: Vec<&Decl> = file
            .decls
            .iter()
            .filter(|d| matches!(d.kind, DeclKind::Type(_)))
            .collect();
        for _pass in 0..type_decls.len() {
            let mut changed = false;
            for d in &type_decls {
                if let DeclKind::Type(td) = &d.kind {
                    if self.check_type_decl(td) {
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }
        self.check_shells_resolved(&type_decls);

        // Phase 3: resolve function signatures and attach methods.
        for d in &file.decls {
            if let DeclKind::Func(fd) = &d.kind {
                self.check_func_signature(d.id, fd);
            }
        }

        // Phase 4: check global variable declarations.
        for d in &file.decls {
            if let DeclKind::Var(vd) = &d.kind {
                self.check_global_var_decl(d.pos, vd);
            }
        }

        // Phase 5: check function bodies.
        for d in &file.decls {
            if let DeclKind::Func(fd) = &d.kind {
                self.check_func_body(d.id, fd);
            }
        }

        Package {
            name: pkg_name,
            scope: self.pkg_scope,
        }
    }

    /* Phase 1: collection */

    fn collect_decls(&mut self, file: &File) {
        for imp in &file.imports {
            self.error(imp.pos, "import statements are not supported");
        }

        for d in &file.decls {
            match &d.kind {
                DeclKind::Type(td) => {
                    // A TypeName bound to a named-type shell; the underlying
                    // is filled during phase 2 so mutually recursive types
                    // can reference one another.
                    let obj = self.cx.new_object(
                        td.name.value,
                        td.name.pos,
                        None,
                        ObjKind::TypeName,
                    );
                    let named = self.cx.types.make_named(td.name.value, obj);
                    self.cx.obj_mut(obj).ty = Some(named);
                    self.declare(td.name.id, td.name.pos, td.name.value, obj);
                }
                DeclKind::Var(vd) => {
                    let obj =
                        self.cx
                            .new_object(vd.name.value, vd.name.pos, None, ObjKind::Var);
                    self.declare(vd.name.id, vd.name.pos, vd.name.value, obj);
                }
                DeclKind::Func(fd) => {
                    let obj = self.cx.new_object(
                        fd.name.value,
                        fd.name.pos,
                        None,
                        ObjKind::Func {
                            recv: None,
                            params: Vec::new(),
                        },
                    );
                    self.func_decls.insert(d.id, obj);

                    if fd.recv.is_some() {
                        // Methods attach to their receiver type, not to the
                        // package scope.
                        self.info.defs.insert(fd.name.id, obj);
                    } else {
                        self.declare(fd.name.id, fd.name.pos, fd.name.value, obj);
                    }
                }
            }
        }
    }

    /* Phase 2: type declarations */

    /// Checks one type declaration; reports whether its resolution changed.
    fn check_type_decl(&mut self, td: &crate::frontend::ast::TypeDecl) -> bool {
        let Some(obj) = self.lookup(td.name.value) else {
            return false;
        };
        if !matches!(self.cx.obj(obj).kind, ObjKind::TypeName) {
            return false;
        }

        let Some(resolved) = self.resolve_type(&td.ty) else {
            return false;
        };

        if td.alias {
            // type T = U: retarget the type name itself.
            if self.cx.obj(obj).ty == Some(resolved) {
                return false;
            }
            self.cx.obj_mut(obj).ty = Some(resolved);
            return true;
        }

        // type T ...: fill the named shell created during collection.
        let named = self.cx.obj(obj).ty.expect("type name without type");
        if let TypeKind::Named { underlying, .. } = self.cx.types.kind(named) {
            if *underlying == Some(resolved) {
                return false;
            }
        }
        self.cx.types.set_underlying(named, resolved);
        true
    }

    /// All shells must be filled before later phases run; a shell that is
    /// still empty here is part of a cyclic declaration.
    fn check_shells_resolved(&mut self, type_decls: &[&Decl]) {
        for d in type_decls {
            let DeclKind::Type(td) = &d.kind else {
                continue;
            };
            if td.alias {
                continue;
            }
            let Some(obj) = self.lookup(td.name.value) else {
                continue;
            };
            let Some(named) = self.cx.obj(obj).ty else {
                continue;
            };
            if let TypeKind::Named {
                underlying: None, ..
            } = self.cx.types.kind(named)
            {
                self.error(
                    td.name.pos,
                    format!("invalid recursive type {}", td.name.value),
                );
            }
        }
    }

    /* Phase 3: function signatures */

    fn check_func_signature(&mut self, decl_id: NodeId, fd: &FuncDecl) {
        let Some(&fn_obj) = self.func_decls.get(&decl_id) else {
            return;
        };

        // Resolve parameters.
        let mut param_objs = Vec::with_capacity(fd.params.len());
        let mut param_tys = Vec::with_capacity(fd.params.len());
        for p in &fd.params {
            let Some(pty) = self.resolve_type(&p.ty) else {
                return;
            };
            let obj = self
                .cx
                .new_object(p.name.value, p.name.pos, Some(pty), ObjKind::Var);
            self.info.defs.insert(p.name.id, obj);
            param_objs.push(obj);
            param_tys.push(pty);
        }

        // Resolve the result type.
        let result = match &fd.result {
            Some(r) => match self.resolve_type(r) {
                Some(t) => Some(t),
                None => return,
            },
            None => None,
        };

        // Resolve the receiver and attach the method to its base type.
        let mut recv_obj = None;
        let mut recv_ty = None;
        if let Some(recv) = &fd.recv {
            let Some(rty) = self.resolve_type(&recv.ty) else {
                return;
            };
            let obj = self
                .cx
                .new_object(recv.name.value, recv.name.pos, Some(rty), ObjKind::Var);
            self.info.defs.insert(recv.name.id, obj);
            recv_obj = Some(obj);
            recv_ty = Some(rty);

            self.add_method(fd.name.pos, rty, fn_obj, fd.name.value);
        }

        let sig = FuncType {
            recv: recv_ty,
            params: param_tys,
            result,
        };
        let sig_ty = self.cx.types.make_func(sig);
        let obj = self.cx.obj_mut(fn_obj);
        obj.ty = Some(sig_ty);
        obj.kind = ObjKind::Func {
            recv: recv_obj,
            params: param_objs,
        };
    }

    /// Attaches a method to the receiver's base named type, rejecting ref
    /// receivers and duplicate method names.
    fn add_method(&mut self, pos: Pos, recv_ty: TypeId, method: ObjId, name: Symbol) {
        if let TypeKind::Ref { .. } = self.cx.types.kind(recv_ty) {
            self.error(
                pos,
                format!(
                    "method receiver cannot be ref type {}",
                    self.cx.types.display(recv_ty)
                ),
            );
            return;
        }

        let base = match self.cx.types.kind(recv_ty) {
            TypeKind::Pointer { elem } => *elem,
            _ => recv_ty,
        };

        let methods = match self.cx.types.kind(base) {
            TypeKind::Named { methods, .. } => methods.clone(),
            _ => {
                self.error(
                    pos,
                    "method receiver must be a named type or pointer to named type",
                );
                return;
            }
        };

        if methods.iter().any(|&m| self.cx.obj(m).name == name) {
            self.error(
                pos,
                format!(
                    "method {} already declared for {}",
                    name,
                    self.cx.types.display(base)
                ),
            );
            return;
        }
        self.cx.types.add_method(base, method);
    }

    /* Phase 5: function bodies */

    fn check_func_body(&mut self, decl_id: NodeId, fd: &FuncDecl) {
        let Some(body) = &fd.body else {
            return;
        };
        let Some(&fn_obj) = self.func_decls.get(&decl_id) else {
            return;
        };
        let Some(sig_ty) = self.cx.obj(fn_obj).ty else {
            return;
        };
        let TypeKind::Func(sig) = self.cx.types.kind(sig_ty).clone() else {
            return;
        };
        let (recv_obj, param_objs) = match &self.cx.obj(fn_obj).kind {
            ObjKind::Func { recv, params } => (*recv, params.clone()),
            _ => return,
        };

        let saved_result = self.func_result.replace(sig.result);

        // The function scope doubles as the body's block scope.
        self.open_scope(body.id, body.pos, body.rbrace, format!("function {}", fd.name.value));

        if let Some(recv) = recv_obj {
            if !self.cx.obj(recv).name.is_empty() {
                self.cx.insert(self.scope, recv);
            }
        }
        for &p in &param_objs {
            if !self.cx.obj(p).name.is_empty() {
                self.cx.insert(self.scope, p);
            }
        }

        self.stmts(&body.stmts);

        // All control-flow paths must return when a result type exists.
        if sig.result.is_some() && !self.block_must_return(&body.stmts) {
            self.error(body.rbrace, "missing return statement");
        }

        self.close_scope();
        self.func_result = saved_result;
    }

    /* Scope and object plumbing */

    pub(crate) fn open_scope(&mut self, node: NodeId, pos: Pos, end: Pos, comment: String) {
        let s = self.cx.new_scope(Some(self.scope), pos, end, comment);
        self.scope = s;
        self.info.scopes.insert(node, s);
    }

    pub(crate) fn close_scope(&mut self) {
        self.scope = self.cx.scopes[self.scope]
            .parent
            .expect("cannot close the universe scope");
    }

    pub(crate) fn lookup(&self, name: Symbol) -> Option<ObjId> {
        self.cx.lookup_parent(self.scope, name).map(|(obj, _)| obj)
    }

    /// Declares an object in the current scope, reporting redeclarations.
    pub(crate) fn declare(&mut self, name_id: NodeId, pos: Pos, name: Symbol, obj: ObjId) {
        if self.cx.insert(self.scope, obj).is_some() {
            self.error(pos, format!("{name} redeclared in this block"));
            return;
        }
        self.info.defs.insert(name_id, obj);
    }

    pub(crate) fn record_type(&mut self, node: NodeId, x: &Operand) {
        self.info.types.insert(
            node,
            TypeAndValue {
                ty: x.ty,
                value: x.val.clone(),
                mode: x.mode,
            },
        );
    }

    pub(crate) fn record_use(&mut self, name_id: NodeId, obj: ObjId) {
        self.info.uses.insert(name_id, obj);
    }

    /// Rewrites the recorded type of an operand's node after an untyped
    /// operand adopts a concrete type, so no untyped type survives in the
    /// final annotations.
    pub(crate) fn update_expr_type(&mut self, x: &Operand) {
        let Some(node) = x.node else {
            return;
        };
        if let Some(tv) = self.info.types.get_mut(&node) {
            tv.ty = x.ty;
        }
    }

    pub(crate) fn error(&mut self, pos: Pos, msg: impl Into<String>) {
        self.errors += 1;
        self.handler.borrow_mut().report(pos, msg);
    }
}

#[cfg(test)]
mod tests;
