//! Statement checking: assignments, declarations, control flow, and the
//! all-paths-return analysis.

use crate::{
    frontend::ast::{
        AssignOp, Decl, DeclKind, ElseBranch, Expr, ExprKind, ForStmt, IfStmt, Stmt, StmtKind,
        VarDecl,
    },
    middle::{
        check::{Checker, Operand, OperandMode},
        scope::ObjKind,
    },
};

impl Checker<'_> {
    pub(crate) fn stmts(&mut self, list: &[Stmt]) {
        for s in list {
            self.stmt(s);
        }
    }

    fn stmt(&mut self, s: &Stmt) {
        match &s.kind {
            StmtKind::Empty => {}

            StmtKind::Expr(e) => {
                // The result, if any, is discarded.
                let mut x = Operand::invalid();
                self.expr(&mut x, e);
            }

            StmtKind::Assign { op, lhs, rhs } => match op {
                AssignOp::Define => self.short_var_decl(lhs, rhs),
                AssignOp::Assign => self.regular_assign(lhs, rhs),
            },

            StmtKind::Block(b) => {
                self.open_scope(b.id, b.pos, b.rbrace, "block".to_owned());
                self.stmts(&b.stmts);
                self.close_scope();
            }

            StmtKind::If(ifs) => self.if_stmt(ifs),

            StmtKind::For(fs) => self.for_stmt(fs),

            StmtKind::Return { result } => self.return_stmt(s, result.as_deref()),

            StmtKind::Branch(kind) => {
                if self.loop_depth == 0 {
                    let what = match kind {
                        crate::frontend::ast::BranchKind::Break => "break",
                        crate::frontend::ast::BranchKind::Continue => "continue",
                    };
                    self.error(s.pos, format!("{what} not in for loop"));
                }
            }

            StmtKind::Decl(d) => self.decl_stmt(d),
        }
    }

    fn if_stmt(&mut self, s: &IfStmt) {
        let mut cond = Operand::invalid();
        self.expr(&mut cond, &s.cond);
        if cond.mode != OperandMode::Invalid
            && !cond.ty.is_some_and(|t| self.cx.types.is_boolean(t))
        {
            self.error(s.cond.pos, "non-boolean condition in if statement");
        }

        self.open_scope(s.then.id, s.then.pos, s.then.rbrace, "if then".to_owned());
        self.stmts(&s.then.stmts);
        self.close_scope();

        match &s.els {
            None => {}
            Some(ElseBranch::Block(b)) => {
                self.open_scope(b.id, b.pos, b.rbrace, "if else".to_owned());
                self.stmts(&b.stmts);
                self.close_scope();
            }
            Some(ElseBranch::If(nested)) => self.if_stmt(nested),
        }
    }

    fn for_stmt(&mut self, s: &ForStmt) {
        self.open_scope(s.body.id, s.body.pos, s.body.rbrace, "for".to_owned());
        self.loop_depth += 1;

        if let Some(cond) = &s.cond {
            let mut c = Operand::invalid();
            self.expr(&mut c, cond);
            if c.mode != OperandMode::Invalid && !c.ty.is_some_and(|t| self.cx.types.is_boolean(t))
            {
                self.error(cond.pos, "non-boolean condition in for statement");
            }
        }

        self.stmts(&s.body.stmts);

        self.loop_depth -= 1;
        self.close_scope();
    }

    fn return_stmt(&mut self, s: &Stmt, result: Option<&Expr>) {
        let Some(func_result) = self.func_result else {
            self.error(s.pos, "return statement outside function");
            return;
        };

        let Some(result) = result else {
            if func_result.is_some() {
                self.error(s.pos, "missing return value");
            }
            return;
        };

        let mut x = Operand::invalid();
        self.expr(&mut x, result);
        if x.mode == OperandMode::Invalid {
            return;
        }

        let Some(result_ty) = func_result else {
            self.error(s.pos, "unexpected return value in void function");
            return;
        };

        // *T may not escape by being returned.
        self.check_return_escape(s, &x);

        self.assignment(&mut x, result_ty, "return statement");
    }

    fn decl_stmt(&mut self, d: &Decl) {
        match &d.kind {
            DeclKind::Var(vd) => self.local_var_decl(d, vd),
            _ => self.error(d.pos, "unexpected declaration in statement context"),
        }
    }

    fn local_var_decl(&mut self, d: &Decl, vd: &VarDecl) {
        let Some(typ) = self.var_decl_type(d.pos, vd) else {
            return;
        };

        let obj = self
            .cx
            .new_object(vd.name.value, vd.name.pos, Some(typ), ObjKind::Var);
        self.declare(vd.name.id, vd.name.pos, vd.name.value, obj);
    }

    /// Checks a top-level variable declaration (phase 4), updating the
    /// object created during collection.
    pub(crate) fn check_global_var_decl(&mut self, pos: crate::frontend::pos::Pos, vd: &VarDecl) {
        let Some(obj) = self.lookup(vd.name.value) else {
            return;
        };
        if !self.cx.obj(obj).is_var() {
            return;
        }

        let Some(typ) = self.var_decl_type(pos, vd) else {
            return;
        };
        self.cx.obj_mut(obj).ty = Some(typ);
    }

    /// Shared type resolution for local and global variable declarations.
    /// Returns the declared or inferred type, or None after reporting.
    fn var_decl_type(
        &mut self,
        decl_pos: crate::frontend::pos::Pos,
        vd: &VarDecl,
    ) -> Option<crate::middle::ty::TypeId> {
        let mut typ = match &vd.ty {
            Some(te) => Some(self.resolve_type(te)?),
            None => None,
        };

        if let Some(init) = &vd.value {
            let mut val = Operand::invalid();
            self.expr(&mut val, init);
            if val.mode == OperandMode::Invalid {
                return None;
            }
            if val.mode == OperandMode::NoValue {
                self.error(
                    init.pos,
                    "cannot use no-value expression as variable initializer",
                );
                return None;
            }

            match typ {
                None => {
                    // Type inference: default untyped initializers.
                    let t = val.ty.expect("value operand without type");
                    let t = self.cx.types.default_type(t);
                    val.ty = Some(t);
                    self.update_expr_type(&val);
                    self.check_const_fits(&val, t);
                    typ = Some(t);
                }
                Some(t) => {
                    self.assignment(&mut val, t, "variable declaration");
                }
            }
        }

        match typ {
            Some(t) => Some(t),
            None => {
                self.error(decl_pos, "missing type or initializer in variable declaration");
                None
            }
        }
    }

    /// x := expr
    fn short_var_decl(&mut self, lhs: &Expr, rhs: &Expr) {
        let ExprKind::Name(name) = lhs.kind else {
            self.error(lhs.pos, "non-name on left side of :=");
            return;
        };

        let mut val = Operand::invalid();
        self.expr(&mut val, rhs);
        if val.mode == OperandMode::Invalid {
            return;
        }
        if val.mode == OperandMode::NoValue {
            self.error(rhs.pos, "cannot use no-value expression in := declaration");
            return;
        }

        let t = val.ty.expect("value operand without type");
        let t = self.cx.types.default_type(t);
        val.ty = Some(t);
        self.update_expr_type(&val);
        self.check_const_fits(&val, t);

        let obj = self.cx.new_object(name, lhs.pos, Some(t), ObjKind::Var);
        self.declare(lhs.id, lhs.pos, name, obj);
    }

    /// lhs = rhs
    fn regular_assign(&mut self, lhs: &Expr, rhs: &Expr) {
        let mut left = Operand::invalid();
        let mut right = Operand::invalid();

        self.expr(&mut left, lhs);
        self.expr(&mut right, rhs);

        if left.mode == OperandMode::Invalid || right.mode == OperandMode::Invalid {
            return;
        }
        if right.mode == OperandMode::NoValue {
            self.error(rhs.pos, "cannot assign no-value expression");
            return;
        }

        if left.mode != OperandMode::Variable {
            self.error(lhs.pos, "cannot assign to expression");
            return;
        }

        // *T may not escape into globals or heap-reached storage.
        if right.ty.is_some_and(|t| self.cx.types.is_pointer(t)) {
            self.check_pointer_escape(lhs, &right);
        }

        let t = left.ty.expect("variable operand without type");
        self.assignment(&mut right, t, "assignment");
    }

    /* All-paths-return analysis */

    /// Whether every control-flow path through the statement list returns.
    /// Conservative: loops are never assumed to terminate in a return.
    pub(crate) fn block_must_return(&self, stmts: &[Stmt]) -> bool {
        stmts.iter().any(|s| self.stmt_must_return(s))
    }

    fn stmt_must_return(&self, s: &Stmt) -> bool {
        match &s.kind {
            StmtKind::Return { .. } => true,
            StmtKind::Block(b) => self.block_must_return(&b.stmts),
            StmtKind::If(ifs) => self.if_must_return(ifs),
            _ => false,
        }
    }

    fn if_must_return(&self, s: &IfStmt) -> bool {
        let Some(els) = &s.els else {
            return false;
        };
        let then_returns = self.block_must_return(&s.then.stmts);
        match els {
            ElseBranch::Block(b) => then_returns && self.block_must_return(&b.stmts),
            ElseBranch::If(nested) => then_returns && self.if_must_return(nested),
        }
    }
}
