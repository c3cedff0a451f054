//! Shared helpers for in-crate tests: run the pipeline over a source string
//! and hand back the pieces.

use crate::{
    diag::new_handler,
    frontend::{ast::File, parser::Parser},
    middle::{
        check::{check, Info},
        ssa::{build::build_file, Func},
        TypeCx,
    },
};

pub(crate) struct Checked {
    pub file: File,
    pub cx: TypeCx,
    pub info: Info,
    pub errors: Vec<String>,
}

/// Parses and type-checks a source string; syntax and type errors are
/// collected as strings.
pub(crate) fn check_src(src: &str) -> Checked {
    let handler = new_handler();
    let mut parser = Parser::new("test.yoru", src.as_bytes().to_vec(), handler.clone());
    let file = parser.parse();

    let mut cx = TypeCx::new();
    let mut info = Info::default();
    check(&file, &mut cx, handler.clone(), &mut info);

    let errors = handler.borrow().iter().map(|d| d.msg.clone()).collect();
    Checked {
        file,
        cx,
        info,
        errors,
    }
}

/// Parses, checks, and builds SSA; panics if the source does not compile.
pub(crate) fn build_src(src: &str) -> (Vec<Func>, TypeCx, Info) {
    let mut checked = check_src(src);
    assert!(
        checked.errors.is_empty(),
        "source failed to check: {:?}",
        checked.errors
    );
    let funcs = build_file(&checked.file, &checked.info, &mut checked.cx);
    (funcs, checked.cx, checked.info)
}

/// Convenience: the named function from a built list.
pub(crate) fn func_named<'a>(funcs: &'a [Func], name: &str) -> &'a Func {
    funcs
        .iter()
        .find(|f| f.name.as_str() == name)
        .unwrap_or_else(|| panic!("no function named {name}"))
}
