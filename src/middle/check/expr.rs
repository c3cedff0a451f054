//! Expression checking and constant folding.

use crate::{
    frontend::{
        ast::{CompositeElem, Expr, ExprKind},
        intern::Symbol,
        token::{LitKind, TokenKind},
    },
    middle::{
        check::{Checker, Operand, OperandMode},
        constant::{ConstError, ConstValue},
        scope::{ObjId, ObjKind},
        ty::{BasicKind, TypeId, TypeKind},
    },
};

impl Checker<'_> {
    /// Evaluates an expression and records its annotation.
    pub(crate) fn expr(&mut self, x: &mut Operand, e: &Expr) {
        self.expr_internal(x, e);
        if x.mode != OperandMode::Invalid {
            self.record_type(e.id, x);
        }
    }

    fn expr_internal(&mut self, x: &mut Operand, e: &Expr) {
        x.mode = OperandMode::Invalid;
        x.pos = e.pos;
        x.ty = None;
        x.val = None;
        x.node = Some(e.id);

        match &e.kind {
            ExprKind::Name(name) => self.ident(x, e, *name),
            ExprKind::Literal { kind, value } => self.basic_lit(x, e, *kind, value),
            ExprKind::Operation { op, x: lhs, y } => match y {
                None => self.unary(x, e, *op, lhs),
                Some(rhs) => self.binary(x, e, *op, lhs, rhs),
            },
            ExprKind::Call { .. } => self.call(x, e),
            ExprKind::Index { x: base, index } => self.index(x, e, base, index),
            ExprKind::Selector { x: base, sel } => self.selector(x, e, base, sel),
            ExprKind::New { ty } => self.new_expr(x, ty),
            ExprKind::Composite { ty, elems } => self.composite_lit(x, e, ty, elems),
            ExprKind::Paren(inner) => {
                // The inner expression records its own annotation; the paren
                // node is annotated identically by the outer wrapper.
                self.expr(x, inner);
                x.node = Some(e.id);
            }
            ExprKind::ArrayType { .. }
            | ExprKind::PointerType { .. }
            | ExprKind::RefType { .. }
            | ExprKind::StructType { .. } => self.typ_expr(x, e),
        }
    }

    fn ident(&mut self, x: &mut Operand, e: &Expr, name: Symbol) {
        let Some(obj) = self.lookup(name) else {
            self.error(e.pos, format!("undefined: {name}"));
            return;
        };
        self.record_use(e.id, obj);

        match &self.cx.obj(obj).kind {
            ObjKind::Var => {
                x.ty = self.cx.obj(obj).ty;
                // true and false are variables of untyped bool in the
                // universe, but behave as constants.
                if name.as_str() == "true" || name.as_str() == "false" {
                    x.mode = OperandMode::Constant;
                    x.val = Some(ConstValue::Bool(name.as_str() == "true"));
                } else {
                    x.mode = OperandMode::Variable;
                }
            }
            ObjKind::TypeName => {
                x.mode = OperandMode::TypeExpr;
                x.ty = self.cx.obj(obj).ty;
            }
            ObjKind::Func { .. } => {
                x.mode = OperandMode::Value;
                x.ty = self.cx.obj(obj).ty;
            }
            ObjKind::Builtin(_) => {
                x.mode = OperandMode::Builtin;
                x.ty = None;
            }
            ObjKind::Nil => {
                x.mode = OperandMode::Constant;
                x.ty = Some(self.cx.types.basic(BasicKind::UntypedNil));
                x.val = None;
            }
        }
    }

    fn basic_lit(&mut self, x: &mut Operand, e: &Expr, kind: LitKind, value: &str) {
        match kind {
            LitKind::Int => match ConstValue::parse_int(value) {
                Some(v) => {
                    x.mode = OperandMode::Constant;
                    x.ty = Some(self.cx.types.basic(BasicKind::UntypedInt));
                    x.val = Some(v);
                }
                None => self.error(e.pos, format!("invalid integer literal: {value}")),
            },
            LitKind::Float => match ConstValue::parse_float(value) {
                Some(v) => {
                    x.mode = OperandMode::Constant;
                    x.ty = Some(self.cx.types.basic(BasicKind::UntypedFloat));
                    x.val = Some(v);
                }
                None => self.error(e.pos, format!("invalid float literal: {value}")),
            },
            LitKind::Str => {
                x.mode = OperandMode::Constant;
                x.ty = Some(self.cx.types.basic(BasicKind::UntypedString));
                x.val = Some(ConstValue::Str(value.to_owned()));
            }
        }
    }

    fn unary(&mut self, x: &mut Operand, e: &Expr, op: TokenKind, operand: &Expr) {
        self.expr(x, operand);
        if x.mode == OperandMode::Invalid {
            return;
        }

        match op {
            TokenKind::Not => {
                let Some(ty) = x.ty else {
                    self.error(e.pos, "operator ! requires boolean operand");
                    x.mode = OperandMode::Invalid;
                    return;
                };
                if !self.cx.types.is_boolean(ty) {
                    self.error(e.pos, "operator ! requires boolean operand");
                    x.mode = OperandMode::Invalid;
                    return;
                }
                if x.mode == OperandMode::Constant {
                    match x.val.as_ref().map(|v| v.not()) {
                        Some(Ok(v)) => x.val = Some(v),
                        _ => x.val = None,
                    }
                } else {
                    x.mode = OperandMode::Value;
                }
                if !self.cx.types.is_untyped(ty) {
                    x.ty = Some(self.cx.types.basic(BasicKind::Bool));
                } else {
                    x.ty = Some(self.cx.types.basic(BasicKind::UntypedBool));
                }
                x.node = Some(e.id);
            }

            TokenKind::Sub => {
                let ok = x.ty.is_some_and(|t| self.cx.types.is_numeric(t));
                if !ok {
                    self.error(e.pos, "operator - requires numeric operand");
                    x.mode = OperandMode::Invalid;
                    return;
                }
                if x.mode == OperandMode::Constant {
                    match x.val.as_ref().map(|v| v.neg()) {
                        Some(Ok(v)) => x.val = Some(v),
                        _ => x.val = None,
                    }
                } else {
                    x.mode = OperandMode::Value;
                }
                x.node = Some(e.id);
            }

            TokenKind::And => {
                // Address-of requires an addressable operand.
                if x.mode != OperandMode::Variable {
                    self.error(e.pos, "cannot take address of expression");
                    x.mode = OperandMode::Invalid;
                    return;
                }
                let ty = x.ty.expect("variable without a type");
                x.mode = OperandMode::Value;
                x.ty = Some(self.cx.types.make_pointer(ty));
                x.node = Some(e.id);
            }

            TokenKind::Mul => {
                // Dereference of a pointer or ref yields a variable.
                let elem = x.ty.and_then(|t| self.cx.types.elem(t));
                match elem {
                    Some(elem) if x.ty.is_some_and(|t| self.cx.types.is_pointer_or_ref(t)) => {
                        x.mode = OperandMode::Variable;
                        x.ty = Some(elem);
                        x.node = Some(e.id);
                    }
                    _ => {
                        let shown = x
                            .ty
                            .map(|t| self.cx.types.display(t).to_string())
                            .unwrap_or_else(|| "void".to_owned());
                        self.error(e.pos, format!("cannot dereference non-pointer type {shown}"));
                        x.mode = OperandMode::Invalid;
                    }
                }
            }

            _ => {
                self.error(e.pos, "unknown unary operator");
                x.mode = OperandMode::Invalid;
            }
        }
    }

    fn binary(&mut self, x: &mut Operand, e: &Expr, op: TokenKind, lhs: &Expr, rhs: &Expr) {
        let mut y = Operand::invalid();
        self.expr(x, lhs);
        self.expr(&mut y, rhs);

        if x.mode == OperandMode::Invalid || y.mode == OperandMode::Invalid {
            x.mode = OperandMode::Invalid;
            return;
        }

        match op.precedence() {
            3 => self.comparison(x, &mut y, op),
            1 | 2 => self.logical(x, &mut y, op),
            _ => self.arithmetic(x, &mut y, op),
        }
        x.node = Some(e.id);
    }

    /// == != < <= > >=
    fn comparison(&mut self, x: &mut Operand, y: &mut Operand, op: TokenKind) {
        let (Some(xt), Some(yt)) = (x.ty, y.ty) else {
            self.error(x.pos, "cannot compare void expressions");
            x.mode = OperandMode::Invalid;
            return;
        };

        if !self.comparable_operands(x, y) {
            self.error(
                x.pos,
                format!(
                    "cannot compare {} and {}",
                    self.cx.types.display(xt),
                    self.cx.types.display(yt)
                ),
            );
            x.mode = OperandMode::Invalid;
            return;
        }

        if op.is_ordering() && !self.cx.types.ordered(xt) {
            self.error(
                x.pos,
                format!("operator {op} not defined for {}", self.cx.types.display(xt)),
            );
            x.mode = OperandMode::Invalid;
            return;
        }

        let both_const = x.mode == OperandMode::Constant && y.mode == OperandMode::Constant;

        // An untyped operand adopts its counterpart's concrete type so that
        // no untyped annotation survives.
        let x_untyped = self.cx.types.is_untyped(xt);
        let y_untyped = self.cx.types.is_untyped(yt);
        if x_untyped && !y_untyped {
            x.ty = Some(yt);
            self.update_expr_type(x);
        } else if y_untyped && !x_untyped {
            y.ty = Some(xt);
            self.update_expr_type(y);
        }

        if both_const {
            if let (Some(a), Some(b)) = (&x.val, &y.val) {
                match ConstValue::compare(op, a, b) {
                    Ok(v) => {
                        x.mode = OperandMode::Constant;
                        x.val = Some(ConstValue::Bool(v));
                        x.ty = Some(self.cx.types.basic(BasicKind::UntypedBool));
                        return;
                    }
                    Err(_) => {
                        // Non-foldable constants (e.g. nil) fall through to a
                        // runtime comparison.
                    }
                }
            }
        }

        x.mode = OperandMode::Value;
        x.val = None;
        x.ty = Some(self.cx.types.basic(BasicKind::Bool));
    }

    /// && ||
    fn logical(&mut self, x: &mut Operand, y: &mut Operand, op: TokenKind) {
        let bool_ok = |c: &Checker, o: &Operand| o.ty.is_some_and(|t| c.cx.types.is_boolean(t));
        if !bool_ok(self, x) || !bool_ok(self, y) {
            self.error(x.pos, format!("operator {op} requires boolean operands"));
            x.mode = OperandMode::Invalid;
            return;
        }

        let both_const = x.mode == OperandMode::Constant && y.mode == OperandMode::Constant;
        let both_untyped =
            self.cx.types.is_untyped(x.ty.unwrap()) && self.cx.types.is_untyped(y.ty.unwrap());

        if both_const {
            if let (Some(ConstValue::Bool(a)), Some(ConstValue::Bool(b))) = (&x.val, &y.val) {
                let v = match op {
                    TokenKind::AndAnd => *a && *b,
                    _ => *a || *b,
                };
                x.mode = OperandMode::Constant;
                x.val = Some(ConstValue::Bool(v));
                x.ty = Some(self.cx.types.basic(BasicKind::UntypedBool));
                return;
            }
        }

        x.mode = OperandMode::Value;
        x.val = None;
        x.ty = Some(if both_untyped {
            self.cx.types.basic(BasicKind::UntypedBool)
        } else {
            self.cx.types.basic(BasicKind::Bool)
        });
    }

    /// + - * / % and the remaining arithmetic-shaped operators.
    fn arithmetic(&mut self, x: &mut Operand, y: &mut Operand, op: TokenKind) {
        let (Some(xt), Some(yt)) = (x.ty, y.ty) else {
            self.error(x.pos, format!("operator {op} requires numeric operands"));
            x.mode = OperandMode::Invalid;
            return;
        };

        // String concatenation.
        if self.cx.types.is_string(xt) && self.cx.types.is_string(yt) {
            if op != TokenKind::Add {
                self.error(x.pos, format!("operator {op} not defined for strings"));
                x.mode = OperandMode::Invalid;
                return;
            }
            let both_const = x.mode == OperandMode::Constant && y.mode == OperandMode::Constant;
            let both_untyped = self.cx.types.is_untyped(xt) && self.cx.types.is_untyped(yt);

            if both_const {
                if let (Some(a), Some(b)) = (&x.val, &y.val) {
                    if let Ok(v) = ConstValue::binary(op, a, b) {
                        x.mode = OperandMode::Constant;
                        x.val = Some(v);
                        x.ty = Some(self.cx.types.basic(BasicKind::UntypedString));
                        return;
                    }
                }
            }

            self.merge_untyped(x, y, xt, yt);
            x.mode = OperandMode::Value;
            x.val = None;
            x.ty = Some(if both_untyped {
                self.cx.types.basic(BasicKind::UntypedString)
            } else {
                self.cx.types.basic(BasicKind::String)
            });
            return;
        }

        if !self.cx.types.is_numeric(xt) || !self.cx.types.is_numeric(yt) {
            self.error(x.pos, format!("operator {op} requires numeric operands"));
            x.mode = OperandMode::Invalid;
            return;
        }

        // % is not defined for floats.
        if op == TokenKind::Rem && (self.cx.types.is_float(xt) || self.cx.types.is_float(yt)) {
            self.error(x.pos, "operator % not defined for float");
            x.mode = OperandMode::Invalid;
            return;
        }

        let both_const = x.mode == OperandMode::Constant && y.mode == OperandMode::Constant;

        // Determine the result type.
        let x_untyped = self.cx.types.is_untyped(xt);
        let y_untyped = self.cx.types.is_untyped(yt);
        let result_ty = if x_untyped && y_untyped {
            if self.cx.types.is_float(xt) || self.cx.types.is_float(yt) {
                self.cx.types.basic(BasicKind::UntypedFloat)
            } else {
                self.cx.types.basic(BasicKind::UntypedInt)
            }
        } else if x_untyped {
            x.ty = Some(yt);
            self.update_expr_type(x);
            yt
        } else if y_untyped {
            y.ty = Some(xt);
            self.update_expr_type(y);
            xt
        } else {
            if !self.cx.types.identical(xt, yt) {
                self.error(
                    x.pos,
                    format!(
                        "mismatched types {} and {}",
                        self.cx.types.display(xt),
                        self.cx.types.display(yt)
                    ),
                );
                x.mode = OperandMode::Invalid;
                return;
            }
            xt
        };

        if both_const {
            if let (Some(a), Some(b)) = (&x.val, &y.val) {
                match ConstValue::binary(op, a, b) {
                    Ok(v) => {
                        x.mode = OperandMode::Constant;
                        x.val = Some(v);
                        x.ty = Some(result_ty);
                        return;
                    }
                    Err(ConstError::DivisionByZero) => {
                        self.error(x.pos, "division by zero");
                        x.mode = OperandMode::Invalid;
                        return;
                    }
                    Err(ConstError::ModuloByZero) => {
                        self.error(x.pos, "modulo by zero");
                        x.mode = OperandMode::Invalid;
                        return;
                    }
                    Err(ConstError::Invalid) => {}
                }
            }
        }

        x.mode = OperandMode::Value;
        x.val = None;
        x.ty = Some(result_ty);
    }

    /// When exactly one side is untyped, rewrite its recorded annotation to
    /// the other side's type.
    fn merge_untyped(&mut self, x: &mut Operand, y: &mut Operand, xt: TypeId, yt: TypeId) {
        let x_untyped = self.cx.types.is_untyped(xt);
        let y_untyped = self.cx.types.is_untyped(yt);
        if x_untyped && !y_untyped {
            x.ty = Some(yt);
            self.update_expr_type(x);
        } else if y_untyped && !x_untyped {
            y.ty = Some(xt);
            self.update_expr_type(y);
        }
    }

    /// Reports whether two operands can be compared.
    pub(crate) fn comparable_operands(&self, x: &Operand, y: &Operand) -> bool {
        let (Some(xt), Some(yt)) = (x.ty, y.ty) else {
            return false;
        };

        // nil compares against any pointer or ref.
        if self.cx.types.is_nil(xt) && self.cx.types.is_pointer_or_ref(yt) {
            return true;
        }
        if self.cx.types.is_nil(yt) && self.cx.types.is_pointer_or_ref(xt) {
            return true;
        }

        if self.cx.types.assignable(xt, yt) || self.cx.types.assignable(yt, xt) {
            return self.cx.types.comparable(xt) || self.cx.types.comparable(yt);
        }

        false
    }

    /// x[i] — the operand must be an array or a pointer/ref to one.
    fn index(&mut self, x: &mut Operand, e: &Expr, base: &Expr, index: &Expr) {
        self.expr(x, base);
        if x.mode == OperandMode::Invalid {
            return;
        }

        let base_ty = x.ty;
        let elem_ty = base_ty.and_then(|t| self.indexed_elem(t));
        let Some(elem_ty) = elem_ty else {
            let shown = base_ty
                .map(|t| self.cx.types.display(t).to_string())
                .unwrap_or_else(|| "void".to_owned());
            self.error(e.pos, format!("cannot index into {shown}"));
            x.mode = OperandMode::Invalid;
            return;
        };

        let mut idx = Operand::invalid();
        self.expr(&mut idx, index);
        if idx.mode == OperandMode::Invalid {
            x.mode = OperandMode::Invalid;
            return;
        }
        if !idx.ty.is_some_and(|t| self.cx.types.is_integer(t)) {
            self.error(index.pos, "index must be an integer");
            x.mode = OperandMode::Invalid;
            return;
        }

        // Array elements are addressable.
        x.mode = OperandMode::Variable;
        x.ty = Some(elem_ty);
        x.val = None;
        x.node = Some(e.id);
    }

    /// The element type reached by indexing `t`: an array, or a pointer/ref
    /// to an array.
    fn indexed_elem(&self, t: TypeId) -> Option<TypeId> {
        match self.cx.types.kind(self.cx.types.underlying(t)) {
            TypeKind::Array { elem, .. } => Some(*elem),
            TypeKind::Pointer { elem } | TypeKind::Ref { elem } => {
                match self.cx.types.kind(self.cx.types.underlying(*elem)) {
                    TypeKind::Array { elem, .. } => Some(*elem),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// x.sel — fields first (auto-dereferencing pointers and refs), then
    /// methods (rejected as values), then an undefined-field error.
    fn selector(
        &mut self,
        x: &mut Operand,
        e: &Expr,
        base: &Expr,
        sel: &crate::frontend::ast::Name,
    ) {
        self.expr(x, base);
        if x.mode == OperandMode::Invalid {
            return;
        }

        let Some(base_ty) = x.ty else {
            self.error(e.pos, "void expression has no fields");
            x.mode = OperandMode::Invalid;
            return;
        };

        if let Some(field_ty) = self.lookup_field(base_ty, sel.value) {
            x.mode = OperandMode::Variable;
            x.ty = Some(field_ty);
            x.val = None;
            x.node = Some(e.id);
            return;
        }

        if self.lookup_method_obj(base_ty, sel.value).is_some() {
            // Method selectors cannot be used as values.
            self.error(
                e.pos,
                format!(
                    "cannot use method {}.{} as value (method expressions not supported)",
                    self.cx.types.display(base_ty),
                    sel.value
                ),
            );
            x.mode = OperandMode::Invalid;
            return;
        }

        self.error(
            sel.pos,
            format!(
                "{} has no field or method {}",
                self.cx.types.display(base_ty),
                sel.value
            ),
        );
        x.mode = OperandMode::Invalid;
    }

    /// Looks up a struct field by name, auto-dereferencing pointers/refs.
    pub(crate) fn lookup_field(&self, t: TypeId, name: Symbol) -> Option<TypeId> {
        let u = self.cx.types.underlying(t);
        match self.cx.types.kind(u) {
            TypeKind::Pointer { elem } | TypeKind::Ref { elem } => self.lookup_field(*elem, name),
            TypeKind::Struct { fields } => {
                fields.iter().find(|f| f.name == name).map(|f| f.ty)
            }
            _ => None,
        }
    }

    /// Looks up a method by name on the base named type of `t`.
    pub(crate) fn lookup_method_obj(&self, t: TypeId, name: Symbol) -> Option<ObjId> {
        let base = match self.cx.types.kind(self.cx.types.underlying(t)) {
            TypeKind::Pointer { elem } | TypeKind::Ref { elem } => *elem,
            _ => t,
        };
        if let TypeKind::Named { methods, .. } = self.cx.types.kind(base) {
            return methods.iter().copied().find(|&m| self.cx.obj(m).name == name);
        }
        None
    }

    /// new(T) produces ref T.
    pub(crate) fn new_expr(&mut self, x: &mut Operand, ty: &Expr) {
        let Some(t) = self.resolve_type(ty) else {
            x.mode = OperandMode::Invalid;
            return;
        };
        x.mode = OperandMode::Value;
        x.ty = Some(self.cx.types.make_ref(t));
        x.val = None;
    }

    /// Type{...} — the type must be a struct; elements are either all keyed
    /// or all positional.
    fn composite_lit(
        &mut self,
        x: &mut Operand,
        e: &Expr,
        ty: &Expr,
        elems: &[CompositeElem],
    ) {
        let Some(lit_ty) = self.resolve_type(ty) else {
            x.mode = OperandMode::Invalid;
            return;
        };

        let u = self.cx.types.underlying(lit_ty);
        let fields = match self.cx.types.kind(u) {
            TypeKind::Struct { fields } => fields.clone(),
            _ => {
                self.error(
                    e.pos,
                    format!(
                        "invalid composite literal type {}",
                        self.cx.types.display(lit_ty)
                    ),
                );
                x.mode = OperandMode::Invalid;
                return;
            }
        };

        if elems.len() > fields.len() {
            self.error(e.pos, "too many values in struct literal");
        }

        let has_keys = matches!(elems.first(), Some(CompositeElem::Keyed { .. }));

        if has_keys {
            let mut seen = hashbrown::HashSet::new();
            for elem in elems {
                let CompositeElem::Keyed { key, value } = elem else {
                    self.error(
                        e.pos,
                        "mixture of field:value and value elements in struct literal",
                    );
                    continue;
                };

                let ExprKind::Name(key_name) = key.kind else {
                    self.error(key.pos, "invalid field name");
                    continue;
                };

                if !seen.insert(key_name) {
                    self.error(key.pos, format!("duplicate field name {key_name}"));
                    continue;
                }

                let Some(field) = fields.iter().find(|f| f.name == key_name) else {
                    self.error(key.pos, format!("unknown field {key_name}"));
                    continue;
                };

                let mut val = Operand::invalid();
                self.expr(&mut val, value);
                if val.mode != OperandMode::Invalid {
                    self.assignment(&mut val, field.ty, "struct literal");
                }
            }
        } else {
            for (i, elem) in elems.iter().enumerate() {
                let CompositeElem::Positional(value) = elem else {
                    self.error(
                        e.pos,
                        "mixture of field:value and value elements in struct literal",
                    );
                    continue;
                };
                if i >= fields.len() {
                    break;
                }
                let mut val = Operand::invalid();
                self.expr(&mut val, value);
                if val.mode != OperandMode::Invalid {
                    self.assignment(&mut val, fields[i].ty, "struct literal");
                }
            }
        }

        x.mode = OperandMode::Value;
        x.ty = Some(lit_ty);
        x.val = None;
        x.node = Some(e.id);
    }

    /// Checks that `x` is assignable to `t`, converting untyped operands and
    /// rejecting the ref-to-pointer conversion.
    pub(crate) fn assignment(&mut self, x: &mut Operand, t: TypeId, context: &str) {
        if x.mode == OperandMode::Invalid {
            return;
        }

        let Some(xt) = x.ty else {
            self.error(x.pos, format!("cannot use void value in {context}"));
            x.mode = OperandMode::Invalid;
            return;
        };

        // ref T never converts to *T; that would hide heap data from the
        // collector.
        if self.cx.types.is_pointer(t) && self.cx.types.is_ref(xt) {
            self.error(
                x.pos,
                format!(
                    "cannot convert {} to {} (would cause use-after-free)",
                    self.cx.types.display(xt),
                    self.cx.types.display(t)
                ),
            );
            x.mode = OperandMode::Invalid;
            return;
        }

        if self.cx.types.assignable(xt, t) {
            if self.cx.types.is_untyped(xt) {
                x.ty = Some(t);
                self.update_expr_type(x);
                self.check_const_fits(x, t);
            }
            return;
        }

        self.error(
            x.pos,
            format!(
                "cannot use {} as {} in {}",
                self.cx.types.display(xt),
                self.cx.types.display(t),
                context
            ),
        );
        x.mode = OperandMode::Invalid;
    }

    /// Reports a folded integer constant that no longer fits int64 once it is
    /// committed to a concrete integer type.
    pub(crate) fn check_const_fits(&mut self, x: &Operand, t: TypeId) {
        if !self.cx.types.is_integer(t) {
            return;
        }
        if let Some(v @ ConstValue::Int(_)) = &x.val {
            if v.to_i64().is_none() {
                let v = v.clone();
                self.error(x.pos, format!("constant {v} overflows int"));
            }
        }
    }
}
