//! Size and alignment policy. The constants match the C runtime ABI the
//! emitter targets; struct layouts are computed on first demand and cached in
//! the [`TypeTable`].

use crate::middle::ty::{BasicKind, TypeId, TypeKind, TypeTable};

pub const SIZE_BOOL: i64 = 1;
pub const SIZE_INT: i64 = 8;
pub const SIZE_FLOAT: i64 = 8;
/// A string is a `{ptr, i64}` pair.
pub const SIZE_STRING: i64 = 16;
pub const SIZE_PTR: i64 = 8;

pub const ALIGN_BOOL: i64 = 1;
pub const ALIGN_INT: i64 = 8;
pub const ALIGN_FLOAT: i64 = 8;
pub const ALIGN_STRING: i64 = 8;
pub const ALIGN_PTR: i64 = 8;

/// Computed layout of a struct type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructLayout {
    pub size: i64,
    pub align: i64,
    pub offsets: Vec<i64>,
}

impl TypeTable {
    /// The size of type `t` in bytes.
    pub fn size_of(&mut self, t: TypeId) -> i64 {
        let u = self.underlying(t);
        match self.kind(u).clone() {
            TypeKind::Basic(k) => basic_size(k),
            TypeKind::Array { len, elem } => len * self.size_of(elem),
            TypeKind::Struct { .. } => self.struct_layout(u).size,
            TypeKind::Pointer { .. } | TypeKind::Ref { .. } => SIZE_PTR,
            TypeKind::Func(_) => SIZE_PTR,
            // An unresolved named shell has no concrete size.
            TypeKind::Named { .. } => 0,
        }
    }

    /// The alignment of type `t` in bytes.
    pub fn align_of(&mut self, t: TypeId) -> i64 {
        let u = self.underlying(t);
        match self.kind(u).clone() {
            TypeKind::Basic(k) => basic_align(k),
            TypeKind::Array { len, elem } => {
                if len == 0 {
                    1
                } else {
                    self.align_of(elem)
                }
            }
            TypeKind::Struct { .. } => self.struct_layout(u).align,
            TypeKind::Pointer { .. } | TypeKind::Ref { .. } => ALIGN_PTR,
            TypeKind::Func(_) => ALIGN_PTR,
            TypeKind::Named { .. } => 1,
        }
    }

    /// The offset of field `i` in struct type `t`.
    pub fn offset_of(&mut self, t: TypeId, i: usize) -> i64 {
        let u = self.underlying(t);
        self.struct_layout(u).offsets[i]
    }

    /// Computes (or retrieves) the layout of a struct type: fields are placed
    /// in order, each rounded up to its alignment; the total size is padded
    /// to the struct's alignment.
    pub fn struct_layout(&mut self, st: TypeId) -> &StructLayout {
        if !self.layouts.contains_key(&st) {
            let fields = match self.kind(st) {
                TypeKind::Struct { fields } => fields.clone(),
                other => panic!("struct_layout on non-struct type {other:?}"),
            };

            let mut offset: i64 = 0;
            let mut max_align: i64 = 1;
            let mut offsets = Vec::with_capacity(fields.len());

            for f in &fields {
                let field_size = self.size_of(f.ty);
                let field_align = self.align_of(f.ty);

                offset = align_to(offset, field_align);
                offsets.push(offset);
                offset += field_size;

                if field_align > max_align {
                    max_align = field_align;
                }
            }

            let size = align_to(offset, max_align);
            self.layouts.insert(
                st,
                StructLayout {
                    size,
                    align: max_align,
                    offsets,
                },
            );
        }

        &self.layouts[&st]
    }
}

fn basic_size(kind: BasicKind) -> i64 {
    match kind {
        BasicKind::Bool => SIZE_BOOL,
        BasicKind::Int => SIZE_INT,
        BasicKind::Float => SIZE_FLOAT,
        BasicKind::String => SIZE_STRING,
        // Untyped kinds have no concrete size.
        _ => 0,
    }
}

fn basic_align(kind: BasicKind) -> i64 {
    match kind {
        BasicKind::Bool => ALIGN_BOOL,
        BasicKind::Int => ALIGN_INT,
        BasicKind::Float => ALIGN_FLOAT,
        BasicKind::String => ALIGN_STRING,
        _ => 1,
    }
}

/// Rounds `x` up to a multiple of `a` (a power of two).
fn align_to(x: i64, a: i64) -> i64 {
    (x + a - 1) & !(a - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{intern::Symbol, pos::Pos};
    use crate::middle::ty::Field;

    fn field(name: &str, ty: TypeId) -> Field {
        Field {
            name: Symbol::new(name),
            ty,
            pos: Pos::none(),
        }
    }

    #[test]
    fn basic_sizes() {
        let mut t = TypeTable::new();
        let cases = [
            (BasicKind::Bool, 1),
            (BasicKind::Int, 8),
            (BasicKind::Float, 8),
            (BasicKind::String, 16),
        ];
        for (k, want) in cases {
            let ty = t.basic(k);
            assert_eq!(t.size_of(ty), want, "{}", k.name());
        }
        let int = t.basic(BasicKind::Int);
        let ptr = t.make_pointer(int);
        let rf = t.make_ref(int);
        assert_eq!(t.size_of(ptr), 8);
        assert_eq!(t.size_of(rf), 8);
    }

    #[test]
    fn two_int_struct_is_16_bytes() {
        let mut t = TypeTable::new();
        let int = t.basic(BasicKind::Int);
        let st = t.make_struct(vec![field("x", int), field("y", int)]);
        let layout = t.struct_layout(st).clone();
        assert_eq!(layout.offsets, vec![0, 8]);
        assert_eq!(layout.size, 16);
        assert_eq!(layout.align, 8);
    }

    #[test]
    fn padding_between_misaligned_fields() {
        let mut t = TypeTable::new();
        let int = t.basic(BasicKind::Int);
        let boolean = t.basic(BasicKind::Bool);
        // struct { b bool; x int; c bool }
        let st = t.make_struct(vec![field("b", boolean), field("x", int), field("c", boolean)]);
        let layout = t.struct_layout(st).clone();
        assert_eq!(layout.offsets, vec![0, 8, 16]);
        assert_eq!(layout.align, 8);
        // 17 bytes of fields padded to the struct alignment.
        assert_eq!(layout.size, 24);
    }

    #[test]
    fn layout_invariants_hold() {
        let mut t = TypeTable::new();
        let int = t.basic(BasicKind::Int);
        let boolean = t.basic(BasicKind::Bool);
        let string = t.basic(BasicKind::String);
        let inner = t.make_struct(vec![field("a", boolean), field("b", int)]);
        let st = t.make_struct(vec![
            field("p", boolean),
            field("q", string),
            field("r", inner),
            field("s", boolean),
        ]);

        let layout = t.struct_layout(st).clone();
        let fields = match t.kind(st).clone() {
            TypeKind::Struct { fields } => fields,
            _ => unreachable!(),
        };

        let mut prev_end = 0;
        for (i, f) in fields.iter().enumerate() {
            let off = layout.offsets[i];
            assert!(off >= prev_end, "offsets must be monotonic");
            assert_eq!(off % t.align_of(f.ty), 0, "field must be aligned");
            prev_end = off + t.size_of(f.ty);
            assert!(prev_end <= layout.size, "field must fit in the struct");
        }
        assert_eq!(layout.size % layout.align, 0);
    }

    #[test]
    fn arrays_scale_by_element() {
        let mut t = TypeTable::new();
        let int = t.basic(BasicKind::Int);
        let arr = t.make_array(5, int);
        assert_eq!(t.size_of(arr), 40);
        assert_eq!(t.align_of(arr), 8);

        let empty = t.make_array(0, int);
        assert_eq!(t.size_of(empty), 0);
        assert_eq!(t.align_of(empty), 1);
    }

    #[test]
    fn named_delegates_to_underlying() {
        use crate::{index::Index, middle::scope::ObjId};

        let mut t = TypeTable::new();
        let int = t.basic(BasicKind::Int);
        let st = t.make_struct(vec![field("x", int), field("y", int)]);
        let named = t.make_named(Symbol::new("P"), ObjId::new(0));
        t.set_underlying(named, st);
        assert_eq!(t.size_of(named), 16);
        assert_eq!(t.align_of(named), 8);
        assert_eq!(t.offset_of(named, 1), 8);
    }
}
