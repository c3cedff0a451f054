//! Source-form AST printer. The output is re-parseable: printing a file and
//! parsing the result preserves the declaration structure. A JSON form is
//! available for tooling.

use std::fmt::Write;

use itertools::Itertools;

use super::{
    AssignOp, Block, BranchKind, CompositeElem, Decl, DeclKind, ElseBranch, Expr, ExprKind, File,
    ForStmt, IfStmt, Stmt, StmtKind,
};
use crate::frontend::token::LitKind;

/// Renders the file as Yoru source text.
pub fn fprint(file: &File) -> String {
    let mut p = Printer {
        out: String::new(),
        indent: 0,
    };
    p.file(file);
    p.out
}

/// Renders the file as pretty-printed JSON.
pub fn fprint_json(file: &File) -> serde_json::Result<String> {
    serde_json::to_string_pretty(file)
}

struct Printer {
    out: String,
    indent: usize,
}

impl Printer {
    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn file(&mut self, file: &File) {
        self.line(&format!("package {}", file.pkg_name.value));
        self.out.push('\n');
        for imp in &file.imports {
            if let Some(path) = &imp.path {
                self.line(&format!("import {}", quote(&path.value)));
            }
        }
        for decl in &file.decls {
            self.out.push('\n');
            self.decl(decl);
        }
    }

    fn decl(&mut self, decl: &Decl) {
        match &decl.kind {
            DeclKind::Type(td) => {
                let eq = if td.alias { "= " } else { "" };
                match &td.ty.kind {
                    ExprKind::StructType { fields } => {
                        self.line(&format!("type {} {}struct {{", td.name.value, eq));
                        self.indent += 1;
                        for f in fields {
                            self.line(&format!("{} {}", f.name.value, expr_str(&f.ty)));
                        }
                        self.indent -= 1;
                        self.line("}");
                    }
                    _ => self.line(&format!("type {} {}{}", td.name.value, eq, expr_str(&td.ty))),
                }
            }
            DeclKind::Var(vd) => self.line(&var_decl_str(vd)),
            DeclKind::Func(fd) => {
                let recv = fd
                    .recv
                    .as_ref()
                    .map(|r| format!("({} {}) ", r.name.value, expr_str(&r.ty)))
                    .unwrap_or_default();
                let params = fd
                    .params
                    .iter()
                    .map(|p| format!("{} {}", p.name.value, expr_str(&p.ty)))
                    .join(", ");
                let result = fd
                    .result
                    .as_ref()
                    .map(|r| format!(" {}", expr_str(r)))
                    .unwrap_or_default();
                self.line(&format!(
                    "func {}{}({}){} {{",
                    recv, fd.name.value, params, result
                ));
                if let Some(body) = &fd.body {
                    self.indent += 1;
                    for s in &body.stmts {
                        self.stmt(s);
                    }
                    self.indent -= 1;
                }
                self.line("}");
            }
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Empty => {}
            StmtKind::Expr(e) => self.line(&expr_str(e)),
            StmtKind::Assign { op, lhs, rhs } => {
                let op = match op {
                    AssignOp::Assign => "=",
                    AssignOp::Define => ":=",
                };
                self.line(&format!("{} {} {}", expr_str(lhs), op, expr_str(rhs)));
            }
            StmtKind::Block(b) => self.block(b),
            StmtKind::If(s) => self.if_stmt(s),
            StmtKind::For(for_stmt) => {
                let ForStmt { cond, body } = for_stmt.as_ref();
                match cond {
                    Some(c) => self.line(&format!("for {} {{", expr_str(c))),
                    None => self.line("for {"),
                }
                self.indent += 1;
                for s in &body.stmts {
                    self.stmt(s);
                }
                self.indent -= 1;
                self.line("}");
            }
            StmtKind::Return { result } => match result {
                Some(e) => self.line(&format!("return {}", expr_str(e))),
                None => self.line("return"),
            },
            StmtKind::Branch(BranchKind::Break) => self.line("break"),
            StmtKind::Branch(BranchKind::Continue) => self.line("continue"),
            StmtKind::Decl(d) => match &d.kind {
                DeclKind::Var(vd) => self.line(&var_decl_str(vd)),
                _ => {}
            },
        }
    }

    fn block(&mut self, block: &Block) {
        self.line("{");
        self.indent += 1;
        for s in &block.stmts {
            self.stmt(s);
        }
        self.indent -= 1;
        self.line("}");
    }

    fn if_stmt(&mut self, s: &IfStmt) {
        self.line(&format!("if {} {{", expr_str(&s.cond)));
        self.indent += 1;
        for st in &s.then.stmts {
            self.stmt(st);
        }
        self.indent -= 1;
        match &s.els {
            None => self.line("}"),
            Some(ElseBranch::Block(b)) => {
                self.line("} else {");
                self.indent += 1;
                for st in &b.stmts {
                    self.stmt(st);
                }
                self.indent -= 1;
                self.line("}");
            }
            Some(ElseBranch::If(nested)) => {
                // Render `} else if ...` by splicing the nested if onto the brace.
                let mut inner = Printer {
                    out: String::new(),
                    indent: self.indent,
                };
                inner.if_stmt(nested);
                let rendered = inner.out;
                let trimmed = rendered.trim_start();
                let mut first = String::from("} else ");
                first.push_str(trimmed.lines().next().unwrap_or(""));
                self.line(&first);
                for l in rendered.lines().skip(1) {
                    self.out.push_str(l);
                    self.out.push('\n');
                }
            }
        }
    }
}

fn var_decl_str(vd: &super::VarDecl) -> String {
    let mut s = format!("var {}", vd.name.value);
    if let Some(ty) = &vd.ty {
        s.push(' ');
        s.push_str(&expr_str(ty));
    }
    if let Some(v) = &vd.value {
        s.push_str(" = ");
        s.push_str(&expr_str(v));
    }
    s
}

/// Renders an expression as source text.
pub fn expr_str(e: &Expr) -> String {
    let mut s = String::new();
    write_expr(&mut s, e);
    s
}

fn write_expr(out: &mut String, e: &Expr) {
    match &e.kind {
        ExprKind::Name(sym) => {
            out.push_str(sym.as_str());
        }
        ExprKind::Literal { kind, value } => match kind {
            LitKind::Str => out.push_str(&quote(value)),
            _ => out.push_str(value),
        },
        ExprKind::Operation { op, x, y } => match y {
            None => {
                let _ = write!(out, "{op}");
                write_expr(out, x);
            }
            Some(y) => {
                write_expr(out, x);
                let _ = write!(out, " {op} ");
                write_expr(out, y);
            }
        },
        ExprKind::Call { fun, args } => {
            write_expr(out, fun);
            out.push('(');
            out.push_str(&args.iter().map(expr_str).join(", "));
            out.push(')');
        }
        ExprKind::Index { x, index } => {
            write_expr(out, x);
            out.push('[');
            write_expr(out, index);
            out.push(']');
        }
        ExprKind::Selector { x, sel } => {
            write_expr(out, x);
            out.push('.');
            out.push_str(sel.value.as_str());
        }
        ExprKind::Paren(inner) => {
            out.push('(');
            write_expr(out, inner);
            out.push(')');
        }
        ExprKind::New { ty } => {
            out.push_str("new(");
            write_expr(out, ty);
            out.push(')');
        }
        ExprKind::Composite { ty, elems } => {
            write_expr(out, ty);
            out.push('{');
            let rendered = elems
                .iter()
                .map(|el| match el {
                    CompositeElem::Positional(v) => expr_str(v),
                    CompositeElem::Keyed { key, value } => {
                        format!("{}: {}", expr_str(key), expr_str(value))
                    }
                })
                .join(", ");
            out.push_str(&rendered);
            out.push('}');
        }
        ExprKind::ArrayType { len, elem } => {
            out.push('[');
            write_expr(out, len);
            out.push(']');
            write_expr(out, elem);
        }
        ExprKind::PointerType { base } => {
            out.push('*');
            write_expr(out, base);
        }
        ExprKind::RefType { base } => {
            out.push_str("ref ");
            write_expr(out, base);
        }
        ExprKind::StructType { fields } => {
            out.push_str("struct { ");
            for f in fields {
                let _ = write!(out, "{} {}; ", f.name.value, expr_str(&f.ty));
            }
            out.push('}');
        }
    }
}

/// Quotes a decoded string value back into literal form.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\0' => out.push_str("\\0"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
