//! SSA text printer.
//!
//! Format:
//!
//! ```text
//! func add(a int, b int) int:
//!   b0: (entry)
//!     v0 = Arg <int> {a}
//!     v2 = Const64 <int> [42]
//!     v3 = Add64 <int> v0 v2
//!     Return v3
//! ```

use std::fmt::Write;

use itertools::Itertools;

use super::{Aux, Block, Func, Op, Value};
use crate::middle::TypeCx;

/// Renders the SSA form of a function.
pub fn sprint(f: &Func, cx: &TypeCx) -> String {
    let mut out = String::new();

    let _ = write!(out, "func {}(", f.name);
    let params = f
        .params
        .iter()
        .map(|(name, ty)| format!("{} {}", name, cx.types.display(*ty)))
        .join(", ");
    out.push_str(&params);
    out.push(')');
    if let Some(r) = f.result {
        let _ = write!(out, " {}", cx.types.display(r));
    }
    out.push_str(":\n");

    for block in f.blocks.values() {
        print_block(&mut out, f, block, cx);
    }

    out
}

fn print_block(out: &mut String, f: &Func, b: &Block, cx: &TypeCx) {
    let label = if b.id == f.entry { " (entry)" } else { "" };

    let preds = if b.preds.is_empty() {
        String::new()
    } else {
        format!(
            " <- {}",
            b.preds.iter().map(|p| format!("b{}", index_of(*p))).join(" ")
        )
    };

    let _ = writeln!(out, "  b{}:{}{}", index_of(b.id), label, preds);

    for &v in &b.values {
        let _ = writeln!(out, "    {}", format_value(f.value(v), cx));
    }

    let _ = writeln!(out, "    {}", format_terminator(b));
}

fn format_value(v: &Value, cx: &TypeCx) -> String {
    let mut s = String::new();

    // Void ops produce no value, so no "vN = " prefix.
    if v.op.is_void() {
        s.push_str(v.op.name());
    } else {
        let _ = write!(s, "v{} = {}", index_of(v.id), v.op);
    }

    if let Some(ty) = v.ty {
        let _ = write!(s, " <{}>", cx.types.display(ty));
    }

    match v.op {
        Op::Const64 | Op::ConstBool | Op::Zero | Op::StructFieldPtr => {
            let _ = write!(s, " [{}]", v.aux_int);
        }
        Op::ConstF64 => {
            let _ = write!(s, " [{}]", v.aux_float);
        }
        Op::Arg => {
            let _ = write!(s, " [{}]", v.aux_int);
        }
        _ => {
            if v.aux_int != 0 {
                let _ = write!(s, " [{}]", v.aux_int);
            }
        }
    }

    match &v.aux {
        Aux::None => {}
        Aux::Name(sym) => {
            let _ = write!(s, " {{{sym}}}");
        }
        Aux::Str(text) => {
            let _ = write!(s, " {{{text}}}");
        }
        Aux::Func(obj) => {
            let _ = write!(s, " {{{}}}", cx.obj(*obj).name);
        }
        Aux::Type(t) => {
            let _ = write!(s, " {{{}}}", cx.types.display(*t));
        }
    }

    for &arg in &v.args {
        let _ = write!(s, " v{}", index_of(arg));
    }

    s
}

fn format_terminator(b: &Block) -> String {
    use super::BlockKind;

    match b.kind {
        BlockKind::Plain => match b.succs.first() {
            Some(s) => format!("Plain -> b{}", index_of(*s)),
            None => "Plain".to_owned(),
        },
        BlockKind::If => {
            if let (Some(&c), [t, e, ..]) = (b.controls.first(), b.succs.as_slice()) {
                format!("If v{} -> b{} b{}", index_of(c), index_of(*t), index_of(*e))
            } else {
                "If (malformed)".to_owned()
            }
        }
        BlockKind::Return => match b.controls.first() {
            Some(&v) => format!("Return v{}", index_of(v)),
            None => "Return".to_owned(),
        },
        BlockKind::Exit => "Exit".to_owned(),
    }
}

fn index_of<I: crate::index::Index>(id: I) -> usize {
    id.index()
}
