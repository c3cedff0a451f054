//! Escape rules for `*T`. Conservative: a stack pointer may not outlive its
//! frame, so it may not reach globals, heap-reached storage, returns, or
//! non-builtin call arguments. `ref T` is the only way to share heap data.

use crate::{
    frontend::ast::{Expr, ExprKind, Stmt},
    middle::check::{Checker, Operand, OperandMode},
};

impl Checker<'_> {
    /// Checks an assignment target for a `*T` escape: global variables,
    /// fields reached through a ref, and elements reached through a ref are
    /// all forbidden destinations.
    pub(crate) fn check_pointer_escape(&mut self, lhs: &Expr, rhs: &Operand) {
        if !rhs.ty.is_some_and(|t| self.cx.types.is_pointer(t)) {
            return;
        }

        match &lhs.kind {
            ExprKind::Name(name) => {
                if let Some(obj) = self.lookup(*name) {
                    if self.cx.obj(obj).parent == Some(self.pkg_scope) {
                        self.error(
                            lhs.pos,
                            format!("*T cannot escape to global variable {name}"),
                        );
                    }
                }
            }
            ExprKind::Selector { x: base, .. } => {
                let mut b = Operand::invalid();
                self.expr(&mut b, base);
                if b.ty.is_some_and(|t| self.cx.types.is_ref(t)) {
                    self.error(lhs.pos, "*T cannot escape to heap object field");
                }
            }
            ExprKind::Index { x: base, .. } => {
                let mut b = Operand::invalid();
                self.expr(&mut b, base);
                if b.ty.is_some_and(|t| self.cx.types.is_ref(t)) {
                    self.error(lhs.pos, "*T cannot escape to heap object element");
                }
            }
            _ => {}
        }
    }

    /// Returning `*T` would escape the stack frame.
    pub(crate) fn check_return_escape(&mut self, s: &Stmt, x: &Operand) {
        if !x.ty.is_some_and(|t| self.cx.types.is_pointer(t)) {
            return;
        }
        self.error(
            s.pos,
            "cannot return *T from function (use ref T for heap allocation)",
        );
    }

    /// Passing `*T` to any non-builtin call may let it escape.
    pub(crate) fn check_call_arg_escape(&mut self, e: &Expr, args: &[Expr], checked: &[Operand]) {
        let ExprKind::Call { fun, .. } = &e.kind else {
            return;
        };

        let is_builtin = match &fun.kind {
            ExprKind::Name(name) => self
                .lookup(*name)
                .is_some_and(|obj| matches!(self.cx.obj(obj).kind, crate::middle::scope::ObjKind::Builtin(_))),
            _ => false,
        };
        if is_builtin {
            return;
        }

        for (i, arg) in checked.iter().enumerate() {
            if arg.mode == OperandMode::Invalid {
                continue;
            }
            if !arg.ty.is_some_and(|t| self.cx.types.is_pointer(t)) {
                continue;
            }
            let pos = args.get(i).map(|a| a.pos).unwrap_or(e.pos);
            self.error(
                pos,
                "*T cannot be passed to function (may escape); use ref T for heap data",
            );
        }
    }
}
