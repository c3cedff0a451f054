//! Call checking: regular calls, method dispatch with auto-addressing, and
//! the three builtins.

use crate::{
    frontend::ast::{Expr, ExprKind, Name},
    middle::{
        check::{Checker, Operand, OperandMode},
        scope::{BuiltinKind, ObjId, ObjKind},
        ty::{FuncType, TypeId, TypeKind},
    },
};

impl Checker<'_> {
    pub(crate) fn call(&mut self, x: &mut Operand, e: &Expr) {
        let ExprKind::Call { fun, args } = &e.kind else {
            unreachable!("call on non-call expression");
        };

        // Method call: the callee is a selector.
        if let ExprKind::Selector { x: recv, sel } = &fun.kind {
            self.method_call(x, e, recv, sel, args);
            return;
        }

        self.expr(x, fun);
        if x.mode == OperandMode::Invalid {
            return;
        }

        if x.mode == OperandMode::Builtin {
            self.builtin_call(x, e, fun, args);
            return;
        }

        self.regular_call(x, e, args);
    }

    fn regular_call(&mut self, x: &mut Operand, e: &Expr, args: &[Expr]) {
        let sig = x.ty.and_then(|t| match self.cx.types.kind(t) {
            TypeKind::Func(sig) => Some(sig.clone()),
            _ => None,
        });
        let Some(sig) = sig else {
            let shown = x
                .ty
                .map(|t| self.cx.types.display(t).to_string())
                .unwrap_or_else(|| "void".to_owned());
            self.error(e.pos, format!("cannot call non-function {shown}"));
            x.mode = OperandMode::Invalid;
            return;
        };

        let checked = self.check_call_args(e, args, &sig);
        self.check_call_arg_escape(e, args, &checked);

        match sig.result {
            Some(r) => {
                x.mode = OperandMode::Value;
                x.ty = Some(r);
            }
            None => {
                x.mode = OperandMode::NoValue;
                x.ty = None;
            }
        }
        x.val = None;
    }

    /// recv.M(args...)
    fn method_call(
        &mut self,
        x: &mut Operand,
        e: &Expr,
        recv: &Expr,
        sel: &Name,
        args: &[Expr],
    ) {
        self.expr(x, recv);
        if x.mode == OperandMode::Invalid {
            return;
        }

        let recv_ty = x.ty.expect("receiver operand without type");
        let Some((method, need_addr)) = self.resolve_method(recv_ty, sel) else {
            self.error(
                sel.pos,
                format!(
                    "{} has no method {}",
                    self.cx.types.display(recv_ty),
                    sel.value
                ),
            );
            x.mode = OperandMode::Invalid;
            return;
        };

        // Auto-addressing requires an addressable receiver.
        if need_addr && x.mode != OperandMode::Variable {
            self.error(
                e.pos,
                format!(
                    "cannot call pointer method on non-addressable {}",
                    self.cx.types.display(recv_ty)
                ),
            );
            x.mode = OperandMode::Invalid;
            return;
        }

        self.record_use(sel.id, method);

        let sig = match self.cx.obj(method).ty.map(|t| self.cx.types.kind(t).clone()) {
            Some(TypeKind::Func(sig)) => sig,
            _ => {
                self.error(e.pos, format!("method {} has no signature", sel.value));
                x.mode = OperandMode::Invalid;
                return;
            }
        };

        let checked = self.check_call_args(e, args, &sig);
        self.check_call_arg_escape(e, args, &checked);

        match sig.result {
            Some(r) => {
                x.mode = OperandMode::Value;
                x.ty = Some(r);
            }
            None => {
                x.mode = OperandMode::NoValue;
                x.ty = None;
            }
        }
        x.val = None;
    }

    /// Looks up a method on `t`, reporting whether auto-addressing is needed
    /// (pointer-receiver method called on a value).
    fn resolve_method(&self, t: TypeId, sel: &Name) -> Option<(ObjId, bool)> {
        let deref = self.cx.types.is_pointer_or_ref(t);
        let method = self.lookup_method_obj(t, sel.value)?;

        let mut need_addr = false;
        if let Some(TypeKind::Func(sig)) = self.cx.obj(method).ty.map(|s| self.cx.types.kind(s)) {
            if let Some(recv) = sig.recv {
                if self.cx.types.is_pointer(recv) && !deref {
                    need_addr = true;
                }
            }
        }

        Some((method, need_addr))
    }

    /// Arity- and assignment-checks call arguments, returning the checked
    /// operands for the escape pass.
    fn check_call_args(&mut self, e: &Expr, args: &[Expr], sig: &FuncType) -> Vec<Operand> {
        let expected = sig.params.len();
        if args.len() != expected {
            self.error(
                e.pos,
                format!(
                    "wrong number of arguments: got {}, want {}",
                    args.len(),
                    expected
                ),
            );
            // Continue checking what we can.
        }

        let mut checked = Vec::with_capacity(args.len());
        for (i, arg) in args.iter().enumerate() {
            let mut a = Operand::invalid();
            self.expr(&mut a, arg);
            if a.mode != OperandMode::Invalid {
                if let Some(&param_ty) = sig.params.get(i) {
                    self.assignment(&mut a, param_ty, "argument");
                }
            }
            checked.push(a);
        }
        checked
    }

    /* Builtins */

    fn builtin_call(&mut self, x: &mut Operand, e: &Expr, fun: &Expr, args: &[Expr]) {
        let ExprKind::Name(name) = fun.kind else {
            self.error(fun.pos, "unexpected builtin expression");
            x.mode = OperandMode::Invalid;
            return;
        };

        let Some(obj) = self.lookup(name) else {
            x.mode = OperandMode::Invalid;
            return;
        };
        let ObjKind::Builtin(kind) = self.cx.obj(obj).kind else {
            self.error(fun.pos, format!("{name} is not a builtin"));
            x.mode = OperandMode::Invalid;
            return;
        };

        match kind {
            BuiltinKind::Println => self.builtin_println(x, args),
            BuiltinKind::New => self.builtin_new(x, e, args),
            BuiltinKind::Panic => self.builtin_panic(x, e, args),
        }
    }

    /// println(args...) — any number of printable operands; no value.
    fn builtin_println(&mut self, x: &mut Operand, args: &[Expr]) {
        for arg in args {
            let mut a = Operand::invalid();
            self.expr(&mut a, arg);
            if a.mode == OperandMode::Invalid {
                continue;
            }

            match a.ty {
                Some(t) if self.is_printable(t) => {
                    // Untyped arguments reach the printer at their default
                    // type.
                    if self.cx.types.is_untyped(t) {
                        let dt = self.cx.types.default_type(t);
                        a.ty = Some(dt);
                        self.update_expr_type(&a);
                        self.check_const_fits(&a, dt);
                    }
                }
                Some(t) => {
                    self.error(
                        arg.pos,
                        format!("cannot print value of type {}", self.cx.types.display(t)),
                    );
                }
                None => {
                    self.error(arg.pos, "cannot print no-value expression");
                }
            }
        }

        x.mode = OperandMode::NoValue;
        x.ty = None;
        x.val = None;
    }

    /// Printable: any concrete basic type, or any pointer/ref (printed as an
    /// address). Arrays and structs stay unprintable.
    fn is_printable(&self, t: TypeId) -> bool {
        match self.cx.types.kind(self.cx.types.underlying(t)) {
            TypeKind::Basic(k) => *k != crate::middle::ty::BasicKind::UntypedNil,
            TypeKind::Pointer { .. } | TypeKind::Ref { .. } => true,
            _ => false,
        }
    }

    /// new(T) — exactly one type argument; produces ref T. This arm serves
    /// the builtin object; the `new` keyword parse reaches `new_expr`
    /// directly.
    fn builtin_new(&mut self, x: &mut Operand, e: &Expr, args: &[Expr]) {
        if args.len() != 1 {
            self.error(e.pos, "new requires exactly one argument");
            x.mode = OperandMode::Invalid;
            return;
        }
        let ty = &args[0];
        self.new_expr(x, ty);
    }

    /// panic(msg) — exactly one string argument; no value.
    fn builtin_panic(&mut self, x: &mut Operand, e: &Expr, args: &[Expr]) {
        if args.len() != 1 {
            self.error(e.pos, "panic requires exactly one argument");
            x.mode = OperandMode::Invalid;
            return;
        }

        let mut a = Operand::invalid();
        self.expr(&mut a, &args[0]);
        if a.mode == OperandMode::Invalid {
            x.mode = OperandMode::Invalid;
            return;
        }

        match a.ty {
            Some(t) if self.cx.types.is_string(t) => {
                if self.cx.types.is_untyped(t) {
                    a.ty = Some(self.cx.types.default_type(t));
                    self.update_expr_type(&a);
                }
            }
            _ => self.error(args[0].pos, "panic argument must be a string"),
        }

        x.mode = OperandMode::NoValue;
        x.ty = None;
        x.val = None;
    }
}
