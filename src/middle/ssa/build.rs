//! Lowers the typed AST to SSA. Every source variable gets an alloca in the
//! entry block; mem2reg later promotes the well-behaved ones. Internal
//! inconsistencies (missing annotations, missing objects) are checker bugs
//! and panic.

use hashbrown::HashMap;

use crate::{
    frontend::{
        ast::{
            AssignOp, BranchKind, CompositeElem, Decl, DeclKind, ElseBranch, Expr, ExprKind,
            ForStmt, FuncDecl, IfStmt, Name, Stmt, StmtKind,
        },
        pos::Pos,
        token::TokenKind,
    },
    middle::{
        check::Info,
        scope::{ObjId, ObjKind},
        ssa::{Aux, BlockId, BlockKind, Func, Op, ValueId},
        ty::{BasicKind, TypeId, TypeKind},
        TypeCx,
    },
};

/// Builds SSA functions for every function declaration with a body.
pub fn build_file(file: &crate::frontend::ast::File, info: &Info, cx: &mut TypeCx) -> Vec<Func> {
    let mut funcs = Vec::new();
    for decl in &file.decls {
        if let DeclKind::Func(fd) = &decl.kind {
            if fd.body.is_some() {
                funcs.push(build_func(decl, fd, info, cx));
            }
        }
    }
    funcs
}

struct Builder<'a> {
    cx: &'a mut TypeCx,
    info: &'a Info,

    f: Func,
    /// Current block; None while lowering unreachable code.
    cur: Option<BlockId>,

    /// Object → entry-block alloca.
    vars: HashMap<ObjId, ValueId>,

    break_target: Option<BlockId>,
    continue_target: Option<BlockId>,
}

fn build_func(decl: &Decl, fd: &FuncDecl, info: &Info, cx: &mut TypeCx) -> Func {
    let obj = *info
        .defs
        .get(&fd.name.id)
        .unwrap_or_else(|| panic!("no object for func {}", fd.name.value));

    let (recv_obj, param_objs) = match &cx.obj(obj).kind {
        ObjKind::Func { recv, params } => (*recv, params.clone()),
        other => panic!("expected function object, found {other:?}"),
    };
    let sig = match cx.obj(obj).ty.map(|t| cx.types.kind(t).clone()) {
        Some(TypeKind::Func(sig)) => sig,
        _ => panic!("function {} has no signature", fd.name.value),
    };

    let params: Vec<_> = param_objs
        .iter()
        .map(|&p| (cx.obj(p).name, cx.obj(p).ty.expect("untyped parameter")))
        .collect();

    let f = Func::new(fd.name.value, params, sig.result);

    let mut b = Builder {
        cx,
        info,
        f,
        cur: None,
        vars: HashMap::new(),
        break_target: None,
        continue_target: None,
    };
    b.cur = Some(b.f.entry);

    // Receiver: an Arg with index -1, spilled to an entry alloca.
    if let Some(recv) = recv_obj {
        let ty = b.cx.obj(recv).ty.expect("untyped receiver");
        let name = b.cx.obj(recv).name;
        let entry = b.f.entry;
        let arg = b.f.new_value(entry, Op::Arg, Some(ty), &[], decl.pos);
        b.f.value_mut(arg).aux_int = -1;
        b.f.value_mut(arg).aux = Aux::Name(name);

        let alloca = b.entry_alloca(ty, name);
        b.f.new_value(entry, Op::Store, None, &[alloca, arg], decl.pos);
        b.vars.insert(recv, alloca);
    }

    // Parameters, in order.
    for (i, &p) in param_objs.iter().enumerate() {
        let ty = b.cx.obj(p).ty.expect("untyped parameter");
        let name = b.cx.obj(p).name;
        let entry = b.f.entry;
        let arg = b.f.new_value(entry, Op::Arg, Some(ty), &[], decl.pos);
        b.f.value_mut(arg).aux_int = i as i64;
        b.f.value_mut(arg).aux = Aux::Name(name);

        let alloca = b.entry_alloca(ty, name);
        b.f.new_value(entry, Op::Store, None, &[alloca, arg], decl.pos);
        b.vars.insert(p, alloca);
    }

    let body = fd.body.as_ref().expect("build_func on bodyless function");
    b.stmts(&body.stmts);

    // Implicit void return when the body falls off the end.
    if let Some(cur) = b.cur {
        let blk = b.f.block(cur);
        if blk.kind == BlockKind::Plain && blk.succs.is_empty() {
            b.f.block_mut(cur).kind = BlockKind::Return;
        }
    }

    b.f
}

impl Builder<'_> {
    fn cur(&self) -> BlockId {
        self.cur.expect("no current block")
    }

    /// Creates an alloca in the entry block; mem2reg relies on every
    /// variable slot living there.
    fn entry_alloca(&mut self, ty: TypeId, name: crate::frontend::intern::Symbol) -> ValueId {
        let ptr_ty = self.cx.types.make_pointer(ty);
        let entry = self.f.entry;
        let alloca = self.f.new_value(entry, Op::Alloca, Some(ptr_ty), &[], Pos::none());
        self.f.value_mut(alloca).aux = Aux::Name(name);
        alloca
    }

    /* Statements */

    fn stmts(&mut self, list: &[Stmt]) {
        for s in list {
            if self.cur.is_none() {
                // Unreachable code after return/break/continue/panic.
                break;
            }
            self.stmt(s);
        }
    }

    fn stmt(&mut self, s: &Stmt) {
        if self.cur.is_none() {
            return;
        }
        match &s.kind {
            StmtKind::Empty => {}
            StmtKind::Expr(e) => {
                // Evaluate for side effects; discard the result.
                self.expr(e);
            }
            StmtKind::Decl(d) => {
                if let DeclKind::Var(vd) = &d.kind {
                    self.var_decl(s, vd);
                }
            }
            StmtKind::Assign { op, lhs, rhs } => self.assign_stmt(s, *op, lhs, rhs),
            StmtKind::Return { result } => self.return_stmt(s, result.as_deref()),
            StmtKind::If(ifs) => self.if_stmt(ifs),
            StmtKind::For(fs) => self.for_stmt(fs),
            StmtKind::Branch(kind) => self.branch_stmt(*kind),
            StmtKind::Block(b) => self.stmts(&b.stmts),
        }
    }

    /// var x T [= init] — alloca plus store, or a zero fill.
    fn var_decl(&mut self, s: &Stmt, vd: &crate::frontend::ast::VarDecl) {
        let Some(&obj) = self.info.defs.get(&vd.name.id) else {
            return;
        };
        let ty = self.cx.obj(obj).ty.expect("untyped variable");

        let alloca = self.entry_alloca(ty, vd.name.value);
        self.vars.insert(obj, alloca);

        match &vd.value {
            Some(init) => {
                let val = self.expr_val(init);
                let cur = self.cur();
                self.f.new_value(cur, Op::Store, None, &[alloca, val], s.pos);
            }
            None => {
                let size = self.cx.types.size_of(ty);
                let cur = self.cur();
                let zero = self.f.new_value(cur, Op::Zero, None, &[alloca], s.pos);
                self.f.value_mut(zero).aux_int = size;
            }
        }
    }

    fn assign_stmt(&mut self, s: &Stmt, op: AssignOp, lhs: &Expr, rhs: &Expr) {
        match op {
            AssignOp::Define => {
                // x := expr
                if !matches!(lhs.kind, ExprKind::Name(_)) {
                    return;
                }
                let Some(&obj) = self.info.defs.get(&lhs.id) else {
                    return;
                };
                let ty = self.cx.obj(obj).ty.expect("untyped variable");

                let alloca = self.entry_alloca(ty, self.cx.obj(obj).name);
                self.vars.insert(obj, alloca);

                let val = self.expr_val(rhs);
                let cur = self.cur();
                self.f.new_value(cur, Op::Store, None, &[alloca, val], s.pos);
            }
            AssignOp::Assign => {
                let ptr = self.addr(lhs);
                let val = self.expr_val(rhs);
                let cur = self.cur();
                self.f.new_value(cur, Op::Store, None, &[ptr, val], s.pos);
            }
        }
    }

    fn return_stmt(&mut self, _s: &Stmt, result: Option<&Expr>) {
        match result {
            Some(e) => {
                let val = self.expr_val(e);
                // The current block may have changed during evaluation
                // (short-circuit lowering).
                let cur = self.cur();
                self.f.block_mut(cur).kind = BlockKind::Return;
                self.f.set_control(cur, val);
            }
            None => {
                let cur = self.cur();
                self.f.block_mut(cur).kind = BlockKind::Return;
            }
        }
        self.cur = None;
    }

    fn if_stmt(&mut self, s: &IfStmt) {
        let cond = self.expr_val(&s.cond);

        let b_then = self.f.new_block(BlockKind::Plain);
        let b_done = self.f.new_block(BlockKind::Plain);
        let b_else = if s.els.is_some() {
            self.f.new_block(BlockKind::Plain)
        } else {
            b_done
        };

        let cur = self.cur();
        self.f.block_mut(cur).kind = BlockKind::If;
        self.f.set_control(cur, cond);
        self.f.add_succ(cur, b_then);
        self.f.add_succ(cur, b_else);

        // Then branch.
        self.cur = Some(b_then);
        self.stmts(&s.then.stmts);
        if let Some(open) = self.cur {
            self.f.add_succ(open, b_done);
        }

        // Else branch.
        if let Some(els) = &s.els {
            self.cur = Some(b_else);
            match els {
                ElseBranch::Block(b) => self.stmts(&b.stmts),
                ElseBranch::If(nested) => self.if_stmt(nested),
            }
            if let Some(open) = self.cur {
                self.f.add_succ(open, b_done);
            }
        }

        if self.f.block(b_done).preds.is_empty() {
            // Both branches terminated; the join block is dead.
            self.f.remove_block(b_done);
            self.cur = None;
        } else {
            self.cur = Some(b_done);
        }
    }

    fn for_stmt(&mut self, s: &ForStmt) {
        let b_header = self.f.new_block(BlockKind::Plain);
        let b_body = self.f.new_block(BlockKind::Plain);
        let b_exit = self.f.new_block(BlockKind::Plain);

        let cur = self.cur();
        self.f.add_succ(cur, b_header);

        // Header: evaluate the condition.
        self.cur = Some(b_header);
        match &s.cond {
            Some(cond) => {
                let c = self.expr_val(cond);
                let cur = self.cur();
                self.f.block_mut(cur).kind = BlockKind::If;
                self.f.set_control(cur, c);
                self.f.add_succ(cur, b_body);
                self.f.add_succ(cur, b_exit);
            }
            None => {
                // Only reachable from recovered parses.
                let cur = self.cur();
                self.f.add_succ(cur, b_body);
            }
        }

        let saved_break = self.break_target.replace(b_exit);
        let saved_continue = self.continue_target.replace(b_header);

        self.cur = Some(b_body);
        self.stmts(&s.body.stmts);
        if let Some(open) = self.cur {
            // Back edge.
            self.f.add_succ(open, b_header);
        }

        self.break_target = saved_break;
        self.continue_target = saved_continue;

        self.cur = Some(b_exit);
    }

    fn branch_stmt(&mut self, kind: BranchKind) {
        let target = match kind {
            BranchKind::Break => self.break_target,
            BranchKind::Continue => self.continue_target,
        };
        if let Some(t) = target {
            let cur = self.cur();
            self.f.add_succ(cur, t);
        }
        self.cur = None;
    }

    /* Expressions */

    /// Lowers an expression; None for void expressions (println, panic).
    fn expr(&mut self, e: &Expr) -> Option<ValueId> {
        // Constants fold to their opcode directly.
        if let Some(tv) = self.info.types.get(&e.id) {
            if tv.is_constant() {
                return Some(self.const_value(e));
            }
        }

        match &e.kind {
            ExprKind::Name(_) => Some(self.name_expr(e)),
            ExprKind::Literal { .. } => Some(self.const_value(e)),
            ExprKind::Operation { op, x, y } => match y {
                None => Some(self.unary_expr(e, *op, x)),
                Some(y) => self.binary_expr(e, *op, x, y),
            },
            ExprKind::Call { .. } => self.call_expr(e),
            ExprKind::Selector { x, sel } => Some(self.selector_expr(e, x, sel)),
            ExprKind::Index { x, index } => Some(self.index_expr(e, x, index)),
            ExprKind::Composite { ty: _, elems } => Some(self.composite_lit_expr(e, elems)),
            ExprKind::Paren(inner) => self.expr(inner),
            ExprKind::New { .. } => Some(self.new_expr(e)),
            other => panic!("unhandled expression in SSA lowering: {other:?}"),
        }
    }

    fn expr_val(&mut self, e: &Expr) -> ValueId {
        self.expr(e).expect("void expression used as a value")
    }

    /// Materializes a checked constant at its defaulted type.
    fn const_value(&mut self, e: &Expr) -> ValueId {
        let tv = self
            .info
            .types
            .get(&e.id)
            .unwrap_or_else(|| panic!("no type info for constant at {}", e.pos));
        let ty = tv.ty.expect("constant without a type");
        let ty = self.cx.types.default_type(ty);

        let cur = self.cur();
        let value = tv.value.clone();

        // The concrete type decides the opcode; the folded value supplies
        // the payload.
        let under = self.cx.types.underlying(ty);
        match self.cx.types.kind(under).clone() {
            TypeKind::Basic(BasicKind::Int) => {
                let v = self.f.new_value(cur, Op::Const64, Some(ty), &[], e.pos);
                self.f.value_mut(v).aux_int = value
                    .as_ref()
                    .and_then(|c| c.to_i64())
                    .unwrap_or_default();
                v
            }
            TypeKind::Basic(BasicKind::Float) => {
                let v = self.f.new_value(cur, Op::ConstF64, Some(ty), &[], e.pos);
                self.f.value_mut(v).aux_float = value
                    .as_ref()
                    .and_then(|c| c.to_f64())
                    .unwrap_or_default();
                v
            }
            TypeKind::Basic(BasicKind::Bool) => {
                let v = self.f.new_value(cur, Op::ConstBool, Some(ty), &[], e.pos);
                if let Some(crate::middle::constant::ConstValue::Bool(true)) = value {
                    self.f.value_mut(v).aux_int = 1;
                }
                v
            }
            TypeKind::Basic(BasicKind::String) => {
                let v = self.f.new_value(cur, Op::ConstString, Some(ty), &[], e.pos);
                let text = match value {
                    Some(crate::middle::constant::ConstValue::Str(s)) => s,
                    _ => String::new(),
                };
                self.f.value_mut(v).aux = Aux::Str(text);
                v
            }
            // nil, and nil already adopted into a pointer/ref type.
            _ => self.f.new_value(cur, Op::ConstNil, Some(ty), &[], e.pos),
        }
    }

    /// A name reference becomes a load from its alloca.
    fn name_expr(&mut self, e: &Expr) -> ValueId {
        let obj = self
            .info
            .uses
            .get(&e.id)
            .or_else(|| self.info.defs.get(&e.id))
            .copied()
            .unwrap_or_else(|| panic!("no object for name at {}", e.pos));

        let alloca = *self
            .vars
            .get(&obj)
            .unwrap_or_else(|| panic!("no alloca for {} at {}", self.cx.obj(obj).name, e.pos));

        let ty = self.cx.obj(obj).ty.expect("untyped variable");
        let cur = self.cur();
        self.f.new_value(cur, Op::Load, Some(ty), &[alloca], e.pos)
    }

    fn unary_expr(&mut self, e: &Expr, op: TokenKind, x: &Expr) -> ValueId {
        match op {
            TokenKind::Not => {
                let v = self.expr_val(x);
                let bool_ty = self.cx.types.basic(BasicKind::Bool);
                let cur = self.cur();
                self.f.new_value(cur, Op::Not, Some(bool_ty), &[v], e.pos)
            }
            TokenKind::Sub => {
                let v = self.expr_val(x);
                let ty = self.expr_type(x);
                let op = if self.cx.types.is_float(ty) {
                    Op::NegF64
                } else {
                    Op::Neg64
                };
                let cur = self.cur();
                self.f.new_value(cur, op, Some(ty), &[v], e.pos)
            }
            TokenKind::And => {
                // Address-of: the address itself.
                self.addr(x)
            }
            TokenKind::Mul => {
                // Dereference.
                let ptr = self.expr_val(x);
                let ty = self.expr_type(x);
                let elem = self
                    .cx
                    .types
                    .elem(ty)
                    .unwrap_or_else(|| panic!("dereference of non-pointer at {}", e.pos));
                let cur = self.cur();
                self.f.new_value(cur, Op::Load, Some(elem), &[ptr], e.pos)
            }
            other => panic!("unhandled unary operator {other}"),
        }
    }

    fn binary_expr(&mut self, e: &Expr, op: TokenKind, x: &Expr, y: &Expr) -> Option<ValueId> {
        if op.is_logical() {
            return Some(self.short_circuit(e, op, x, y));
        }

        let xv = self.expr_val(x);
        let yv = self.expr_val(y);

        let x_ty = self.expr_type(x);
        let res_ty = self.expr_type(e);

        let ssa_op = self.bin_op(op, x_ty);
        let cur = self.cur();
        Some(self.f.new_value(cur, ssa_op, Some(res_ty), &[xv, yv], e.pos))
    }

    /// Short-circuit lowering for && and ||: evaluate the left operand,
    /// branch, produce the constant on the short path, and merge with a phi.
    fn short_circuit(&mut self, e: &Expr, op: TokenKind, x: &Expr, y: &Expr) -> ValueId {
        let left = self.expr_val(x);

        let b_right = self.f.new_block(BlockKind::Plain);
        let b_short = self.f.new_block(BlockKind::Plain);
        let b_merge = self.f.new_block(BlockKind::Plain);

        let cur = self.cur();
        self.f.block_mut(cur).kind = BlockKind::If;
        self.f.set_control(cur, left);

        let is_and = op == TokenKind::AndAnd;
        if is_and {
            // &&: true → evaluate the right side; false → short-circuit.
            self.f.add_succ(cur, b_right);
            self.f.add_succ(cur, b_short);
        } else {
            // ||: true → short-circuit; false → evaluate the right side.
            self.f.add_succ(cur, b_short);
            self.f.add_succ(cur, b_right);
        }

        let bool_ty = self.cx.types.basic(BasicKind::Bool);

        // Short-circuit block: the operator's absorbing constant.
        let short_val = self
            .f
            .new_value(b_short, Op::ConstBool, Some(bool_ty), &[], e.pos);
        if !is_and {
            self.f.value_mut(short_val).aux_int = 1;
        }
        self.f.add_succ(b_short, b_merge);

        // Right block: evaluate the right operand (which may itself nest).
        self.cur = Some(b_right);
        let right = self.expr_val(y);
        let right_end = self.cur();
        self.f.add_succ(right_end, b_merge);

        // Merge phi; argument order matches the predecessor order
        // (short-circuit block first, then the right-evaluation block).
        self.cur = Some(b_merge);
        self.f
            .new_value(b_merge, Op::Phi, Some(bool_ty), &[short_val, right], e.pos)
    }

    /// Maps a binary operator and operand type to the SSA opcode.
    fn bin_op(&self, tok: TokenKind, operand_ty: TypeId) -> Op {
        if self.cx.types.is_float(operand_ty) {
            return match tok {
                TokenKind::Add => Op::AddF64,
                TokenKind::Sub => Op::SubF64,
                TokenKind::Mul => Op::MulF64,
                TokenKind::Div => Op::DivF64,
                TokenKind::Eql => Op::EqF64,
                TokenKind::Neq => Op::NeqF64,
                TokenKind::Lss => Op::LtF64,
                TokenKind::Leq => Op::LeqF64,
                TokenKind::Gtr => Op::GtF64,
                TokenKind::Geq => Op::GeqF64,
                other => panic!("unhandled float operator {other}"),
            };
        }
        if self.cx.types.is_pointer_or_ref(operand_ty) {
            return match tok {
                TokenKind::Eql => Op::EqPtr,
                TokenKind::Neq => Op::NeqPtr,
                other => panic!("unhandled pointer operator {other}"),
            };
        }
        match tok {
            TokenKind::Add => Op::Add64,
            TokenKind::Sub => Op::Sub64,
            TokenKind::Mul => Op::Mul64,
            TokenKind::Div => Op::Div64,
            TokenKind::Rem => Op::Mod64,
            TokenKind::Eql => Op::Eq64,
            TokenKind::Neq => Op::Neq64,
            TokenKind::Lss => Op::Lt64,
            TokenKind::Leq => Op::Leq64,
            TokenKind::Gtr => Op::Gt64,
            TokenKind::Geq => Op::Geq64,
            other => panic!("unhandled integer operator {other}"),
        }
    }

    /* Calls */

    fn call_expr(&mut self, e: &Expr) -> Option<ValueId> {
        let ExprKind::Call { fun, args } = &e.kind else {
            unreachable!();
        };

        if let ExprKind::Selector { x, sel } = &fun.kind {
            return self.method_call(e, x, sel, args);
        }

        if let Some(tv) = self.info.types.get(&fun.id) {
            if tv.is_builtin() {
                return self.builtin_call(e, fun, args);
            }
        }

        self.regular_call(e, fun, args)
    }

    fn regular_call(&mut self, e: &Expr, fun: &Expr, args: &[Expr]) -> Option<ValueId> {
        let obj = self
            .info
            .uses
            .get(&fun.id)
            .copied()
            .unwrap_or_else(|| panic!("no callee object at {}", e.pos));

        let sig = match self.cx.obj(obj).ty.map(|t| self.cx.types.kind(t).clone()) {
            Some(TypeKind::Func(sig)) => sig,
            _ => panic!("call target is not a function at {}", e.pos),
        };

        let arg_vals: Vec<ValueId> = args.iter().map(|a| self.expr_val(a)).collect();

        let cur = self.cur();
        let v = self
            .f
            .new_value(cur, Op::StaticCall, sig.result, &arg_vals, e.pos);
        self.f.value_mut(v).aux = Aux::Func(obj);

        if sig.result.is_some() {
            Some(v)
        } else {
            None
        }
    }

    /// recv.M(args...) — the receiver is prepended as the first argument,
    /// auto-addressed or auto-dereferenced to match the declared receiver.
    fn method_call(&mut self, e: &Expr, recv: &Expr, sel: &Name, args: &[Expr]) -> Option<ValueId> {
        let method = self
            .info
            .uses
            .get(&sel.id)
            .copied()
            .unwrap_or_else(|| panic!("no method object for {} at {}", sel.value, e.pos));

        let sig = match self
            .cx
            .obj(method)
            .ty
            .map(|t| self.cx.types.kind(t).clone())
        {
            Some(TypeKind::Func(sig)) => sig,
            _ => panic!("method {} has no signature", sel.value),
        };

        let recv_param_ty = sig.recv.expect("method without receiver type");
        let recv_expr_ty = self.expr_type(recv);

        let recv_is_indirect = self.cx.types.is_pointer_or_ref(recv_expr_ty);
        let param_is_indirect = self.cx.types.is_pointer_or_ref(recv_param_ty);

        let recv_val = if param_is_indirect && !recv_is_indirect {
            // Pointer receiver, value expression: take the address.
            self.addr(recv)
        } else if !param_is_indirect && recv_is_indirect {
            // Value receiver, pointer expression: load through it.
            let ptr = self.expr_val(recv);
            let elem = self
                .cx
                .types
                .elem(recv_expr_ty)
                .expect("indirect receiver without element type");
            let cur = self.cur();
            self.f.new_value(cur, Op::Load, Some(elem), &[ptr], e.pos)
        } else {
            self.expr_val(recv)
        };

        let mut arg_vals = Vec::with_capacity(1 + args.len());
        arg_vals.push(recv_val);
        for a in args {
            arg_vals.push(self.expr_val(a));
        }

        let cur = self.cur();
        let v = self
            .f
            .new_value(cur, Op::StaticCall, sig.result, &arg_vals, e.pos);
        self.f.value_mut(v).aux = Aux::Func(method);

        if sig.result.is_some() {
            Some(v)
        } else {
            None
        }
    }

    fn builtin_call(&mut self, e: &Expr, fun: &Expr, args: &[Expr]) -> Option<ValueId> {
        let obj = self
            .info
            .uses
            .get(&fun.id)
            .copied()
            .unwrap_or_else(|| panic!("no builtin object at {}", e.pos));

        let ObjKind::Builtin(kind) = self.cx.obj(obj).kind else {
            panic!("expected builtin object at {}", e.pos);
        };

        match kind {
            crate::middle::scope::BuiltinKind::Println => {
                let arg_vals: Vec<ValueId> = args.iter().map(|a| self.expr_val(a)).collect();
                let cur = self.cur();
                self.f.new_value(cur, Op::Println, None, &arg_vals, e.pos);
                None
            }
            crate::middle::scope::BuiltinKind::New => {
                // Reached only through the builtin object; the `new` keyword
                // parses to a NewExpr handled by new_expr.
                Some(self.new_expr(e))
            }
            crate::middle::scope::BuiltinKind::Panic => {
                let arg_vals: Vec<ValueId> = args.iter().map(|a| self.expr_val(a)).collect();
                let cur = self.cur();
                self.f.new_value(cur, Op::Panic, None, &arg_vals, e.pos);
                self.f.block_mut(cur).kind = BlockKind::Exit;
                self.cur = None;
                None
            }
        }
    }

    /// new(T) → NewAlloc carrying the element type.
    fn new_expr(&mut self, e: &Expr) -> ValueId {
        let ty = self
            .info
            .types
            .get(&e.id)
            .and_then(|tv| tv.ty)
            .unwrap_or_else(|| panic!("no type for new expression at {}", e.pos));

        let cur = self.cur();
        let v = self.f.new_value(cur, Op::NewAlloc, Some(ty), &[], e.pos);
        if let Some(elem) = self.cx.types.elem(ty) {
            self.f.value_mut(v).aux = Aux::Type(elem);
        }
        v
    }

    /* Memory access */

    /// x.field — a StructFieldPtr then a Load.
    fn selector_expr(&mut self, e: &Expr, x: &Expr, sel: &Name) -> ValueId {
        let (field_ptr, field_ty) = self.field_ptr(e, x, sel);
        let cur = self.cur();
        self.f
            .new_value(cur, Op::Load, Some(field_ty), &[field_ptr], e.pos)
    }

    /// x[i] — an ArrayIndexPtr then a Load.
    fn index_expr(&mut self, e: &Expr, x: &Expr, index: &Expr) -> ValueId {
        let (elem_ptr, elem_ty) = self.elem_ptr(e, x, index);
        let cur = self.cur();
        self.f
            .new_value(cur, Op::Load, Some(elem_ty), &[elem_ptr], e.pos)
    }

    /// A composite literal becomes an entry alloca, a zero fill, per-field
    /// stores, and a final whole load.
    fn composite_lit_expr(&mut self, e: &Expr, elems: &[CompositeElem]) -> ValueId {
        let lit_ty = self
            .info
            .types
            .get(&e.id)
            .and_then(|tv| tv.ty)
            .unwrap_or_else(|| panic!("no type for composite literal at {}", e.pos));

        let alloca = self.entry_alloca(lit_ty, crate::frontend::intern::Symbol::empty());
        let size = self.cx.types.size_of(lit_ty);
        let cur = self.cur();
        let zero = self.f.new_value(cur, Op::Zero, None, &[alloca], e.pos);
        self.f.value_mut(zero).aux_int = size;

        let under = self.cx.types.underlying(lit_ty);
        let fields = match self.cx.types.kind(under) {
            TypeKind::Struct { fields } => fields.clone(),
            other => panic!("composite literal of non-struct type {other:?}"),
        };

        for (i, elem) in elems.iter().enumerate() {
            let (field_idx, value) = match elem {
                CompositeElem::Keyed { key, value } => {
                    let ExprKind::Name(key_name) = key.kind else {
                        panic!("non-name key in composite literal");
                    };
                    let idx = fields
                        .iter()
                        .position(|f| f.name == key_name)
                        .unwrap_or_else(|| panic!("unknown field {key_name}"));
                    (idx, value)
                }
                CompositeElem::Positional(value) => (i, value),
            };

            let field_ty = fields[field_idx].ty;
            let val = self.expr_val(value);
            let field_ptr_ty = self.cx.types.make_pointer(field_ty);
            let cur = self.cur();
            let fp = self
                .f
                .new_value(cur, Op::StructFieldPtr, Some(field_ptr_ty), &[alloca], e.pos);
            self.f.value_mut(fp).aux_int = field_idx as i64;
            self.f.new_value(cur, Op::Store, None, &[fp, val], e.pos);
        }

        let cur = self.cur();
        self.f.new_value(cur, Op::Load, Some(lit_ty), &[alloca], e.pos)
    }

    /// Computes the address of an assignable expression.
    fn addr(&mut self, e: &Expr) -> ValueId {
        match &e.kind {
            ExprKind::Name(_) => {
                let obj = self
                    .info
                    .uses
                    .get(&e.id)
                    .or_else(|| self.info.defs.get(&e.id))
                    .copied()
                    .unwrap_or_else(|| panic!("no object for name at {}", e.pos));
                *self
                    .vars
                    .get(&obj)
                    .unwrap_or_else(|| panic!("no alloca for {}", self.cx.obj(obj).name))
            }

            ExprKind::Selector { x, sel } => self.field_ptr(e, x, sel).0,

            ExprKind::Index { x, index } => self.elem_ptr(e, x, index).0,

            ExprKind::Operation {
                op: TokenKind::Mul,
                x,
                y: None,
            } => {
                // *p = val stores through p.
                self.expr_val(x)
            }

            ExprKind::Paren(inner) => self.addr(inner),

            other => panic!("cannot take the address of {other:?}"),
        }
    }

    /// The address of x.field and the field's type.
    fn field_ptr(&mut self, e: &Expr, x: &Expr, sel: &Name) -> (ValueId, TypeId) {
        let x_ty = self.expr_type(x);
        let (field_idx, field_ty) = self
            .resolve_field(x_ty, sel.value)
            .unwrap_or_else(|| panic!("cannot find field {} at {}", sel.value, e.pos));

        let base_ptr = if self.cx.types.is_pointer_or_ref(x_ty) {
            self.expr_val(x)
        } else {
            self.addr(x)
        };

        let ptr_ty = self.cx.types.make_pointer(field_ty);
        let cur = self.cur();
        let fp = self
            .f
            .new_value(cur, Op::StructFieldPtr, Some(ptr_ty), &[base_ptr], e.pos);
        self.f.value_mut(fp).aux_int = field_idx as i64;
        (fp, field_ty)
    }

    /// The address of x[i] and the element type.
    fn elem_ptr(&mut self, e: &Expr, x: &Expr, index: &Expr) -> (ValueId, TypeId) {
        let x_ty = self.expr_type(x);
        let under = self.cx.types.underlying(x_ty);

        let (elem_ty, base_ptr) = match self.cx.types.kind(under).clone() {
            TypeKind::Array { elem, .. } => {
                let ptr = self.addr(x);
                (elem, ptr)
            }
            TypeKind::Pointer { elem } | TypeKind::Ref { elem } => {
                let arr_under = self.cx.types.underlying(elem);
                let TypeKind::Array { elem: arr_elem, .. } = self.cx.types.kind(arr_under).clone()
                else {
                    panic!("indexing through non-array pointer at {}", e.pos);
                };
                let ptr = self.expr_val(x);
                (arr_elem, ptr)
            }
            other => panic!("cannot index {other:?} at {}", e.pos),
        };

        let idx = self.expr_val(index);
        let ptr_ty = self.cx.types.make_pointer(elem_ty);
        let cur = self.cur();
        let ep = self
            .f
            .new_value(cur, Op::ArrayIndexPtr, Some(ptr_ty), &[base_ptr, idx], e.pos);
        (ep, elem_ty)
    }

    /// The concrete (defaulted) type of a checked expression.
    fn expr_type(&self, e: &Expr) -> TypeId {
        let tv = self
            .info
            .types
            .get(&e.id)
            .unwrap_or_else(|| panic!("no type info at {}", e.pos));
        let ty = tv.ty.unwrap_or_else(|| panic!("void expression at {}", e.pos));
        self.cx.types.default_type(ty)
    }

    /// Finds a struct field by name through pointers, refs, and named types.
    fn resolve_field(
        &self,
        ty: TypeId,
        name: crate::frontend::intern::Symbol,
    ) -> Option<(usize, TypeId)> {
        let mut t = self.cx.types.underlying(ty);
        if let TypeKind::Pointer { elem } | TypeKind::Ref { elem } = self.cx.types.kind(t) {
            t = self.cx.types.underlying(*elem);
        }

        if let TypeKind::Struct { fields } = self.cx.types.kind(t) {
            fields
                .iter()
                .enumerate()
                .find(|(_, f)| f.name == name)
                .map(|(i, f)| (i, f.ty))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests;
