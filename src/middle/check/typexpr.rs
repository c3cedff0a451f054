//! Type-expression resolution.

use crate::{
    frontend::ast::{Expr, ExprKind, Field as AstField},
    middle::{
        check::{Checker, Operand, OperandMode},
        scope::ObjKind,
        ty::{Field, TypeId},
    },
};

impl Checker<'_> {
    /// Resolves a type expression, or None if it was invalid.
    pub(crate) fn resolve_type(&mut self, e: &Expr) -> Option<TypeId> {
        let mut x = Operand::invalid();
        self.typ_expr(&mut x, e);
        if x.mode == OperandMode::Invalid {
            return None;
        }
        x.ty
    }

    /// Evaluates a type expression into `x`.
    pub(crate) fn typ_expr(&mut self, x: &mut Operand, e: &Expr) {
        x.mode = OperandMode::TypeExpr;
        x.pos = e.pos;
        x.node = Some(e.id);

        match &e.kind {
            ExprKind::Name(name) => self.type_name(x, e, *name),
            ExprKind::ArrayType { len, elem } => self.array_type(x, len, elem),
            ExprKind::PointerType { base } => {
                match self.resolve_type(base) {
                    Some(b) => x.ty = Some(self.cx.types.make_pointer(b)),
                    None => x.mode = OperandMode::Invalid,
                }
            }
            ExprKind::RefType { base } => match self.resolve_type(base) {
                Some(b) => x.ty = Some(self.cx.types.make_ref(b)),
                None => x.mode = OperandMode::Invalid,
            },
            ExprKind::StructType { fields } => self.struct_type(x, fields),
            _ => {
                self.error(e.pos, "expected a type");
                x.mode = OperandMode::Invalid;
            }
        }
    }

    fn type_name(&mut self, x: &mut Operand, e: &Expr, name: crate::frontend::intern::Symbol) {
        let Some(obj) = self.lookup(name) else {
            self.error(e.pos, format!("undefined: {name}"));
            x.mode = OperandMode::Invalid;
            return;
        };
        self.record_use(e.id, obj);

        match self.cx.obj(obj).kind {
            ObjKind::TypeName => match self.cx.obj(obj).ty {
                Some(t) => x.ty = Some(t),
                None => {
                    self.error(e.pos, format!("invalid type {name}"));
                    x.mode = OperandMode::Invalid;
                }
            },
            _ => {
                self.error(e.pos, format!("{name} is not a type"));
                x.mode = OperandMode::Invalid;
            }
        }
    }

    /// [N]Elem — the length must be a non-negative constant integer.
    fn array_type(&mut self, x: &mut Operand, len: &Expr, elem: &Expr) {
        let mut length: i64 = -1;

        let mut len_op = Operand::invalid();
        self.expr(&mut len_op, len);
        if len_op.mode == OperandMode::Constant {
            if let Some(n) = self.const_int64(&len_op) {
                if n < 0 {
                    self.error(len.pos, "array length must be non-negative");
                } else {
                    length = n;
                }
            }
        } else if len_op.mode != OperandMode::Invalid {
            self.error(len.pos, "array length must be a constant expression");
        }

        let Some(elem_ty) = self.resolve_type(elem) else {
            x.mode = OperandMode::Invalid;
            return;
        };

        // Fall back to 0 for error recovery.
        if length < 0 {
            length = 0;
        }

        x.ty = Some(self.cx.types.make_array(length, elem_ty));
    }

    /// struct { Fields... } — duplicate field names are rejected and the
    /// layout is computed immediately.
    fn struct_type(&mut self, x: &mut Operand, ast_fields: &[AstField]) {
        let mut fields = Vec::with_capacity(ast_fields.len());
        let mut seen = hashbrown::HashSet::new();

        for f in ast_fields {
            let Some(fty) = self.resolve_type(&f.ty) else {
                x.mode = OperandMode::Invalid;
                return;
            };

            if !seen.insert(f.name.value) {
                self.error(f.name.pos, format!("duplicate field {}", f.name.value));
            }

            fields.push(Field {
                name: f.name.value,
                ty: fty,
                pos: f.pos,
            });
        }

        let st = self.cx.types.make_struct(fields);
        self.cx.types.struct_layout(st);
        x.ty = Some(st);
    }

    /// The i64 value of a constant integer operand; reports overflow.
    pub(crate) fn const_int64(&mut self, x: &Operand) -> Option<i64> {
        use crate::middle::constant::ConstValue;

        match &x.val {
            Some(ConstValue::Int(_)) => {
                let v = x.val.as_ref().unwrap().to_i64();
                if v.is_none() {
                    let val = x.val.as_ref().unwrap().clone();
                    self.error(x.pos, format!("constant {val} overflows int"));
                }
                v
            }
            _ => None,
        }
    }
}
