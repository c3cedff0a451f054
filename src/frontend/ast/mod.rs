use serde::Serialize;

use crate::frontend::{
    intern::Symbol,
    pos::Pos,
    token::{LitKind, TokenKind},
};

pub mod print;

/// Identifies an AST node. Assigned densely by the parser; the type checker's
/// side tables are keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId(pub u32);

/// A complete source file.
#[derive(Debug, Serialize)]
pub struct File {
    pub id: NodeId,
    pub pos: Pos,
    pub pkg_name: Name,
    pub imports: Vec<ImportDecl>,
    pub decls: Vec<Decl>,
}

/// An import declaration: `import "path"`. Parsed for recovery purposes;
/// rejected by the checker in this version of the language.
#[derive(Debug, Serialize)]
pub struct ImportDecl {
    pub id: NodeId,
    pub pos: Pos,
    pub path: Option<BasicLit>,
}

#[derive(Debug, Serialize)]
pub struct Decl {
    pub id: NodeId,
    pub pos: Pos,
    pub kind: DeclKind,
}

#[derive(Debug, Serialize)]
pub enum DeclKind {
    /// `type Name Type` (definition) or `type Name = Type` (alias)
    Type(TypeDecl),
    /// `var Name Type = Value`
    Var(VarDecl),
    /// `func (Recv) Name(Params) Result { Body }`
    Func(FuncDecl),
}

#[derive(Debug, Serialize)]
pub struct TypeDecl {
    pub name: Name,
    pub alias: bool,
    pub ty: Expr,
}

#[derive(Debug, Serialize)]
pub struct VarDecl {
    pub name: Name,
    /// Explicit type (None if inferred from the initializer).
    pub ty: Option<Expr>,
    /// Initial value (None for zero-initialization).
    pub value: Option<Expr>,
}

#[derive(Debug, Serialize)]
pub struct FuncDecl {
    /// Receiver; None for plain functions.
    pub recv: Option<Field>,
    pub name: Name,
    pub params: Vec<Field>,
    /// Return type; None for void.
    pub result: Option<Expr>,
    pub body: Option<Block>,
}

/// A named field in a struct, parameter list, or receiver.
#[derive(Debug, Serialize)]
pub struct Field {
    pub id: NodeId,
    pub pos: Pos,
    pub name: Name,
    pub ty: Expr,
}

#[derive(Debug, Serialize)]
pub struct Name {
    pub id: NodeId,
    pub pos: Pos,
    pub value: Symbol,
}

#[derive(Debug, Serialize)]
pub struct BasicLit {
    pub id: NodeId,
    pub pos: Pos,
    pub kind: LitKind,
    /// Literal text; for strings, the decoded content.
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct Block {
    pub id: NodeId,
    pub pos: Pos,
    pub stmts: Vec<Stmt>,
    pub rbrace: Pos,
}

#[derive(Debug, Serialize)]
pub struct Stmt {
    pub id: NodeId,
    pub pos: Pos,
    pub kind: StmtKind,
}

#[derive(Debug, Serialize)]
pub enum StmtKind {
    /// Just a semicolon.
    Empty,
    Expr(Box<Expr>),
    Assign {
        op: AssignOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Block(Box<Block>),
    If(Box<IfStmt>),
    For(Box<ForStmt>),
    Return {
        result: Option<Box<Expr>>,
    },
    Branch(BranchKind),
    /// A variable declaration used as a statement.
    Decl(Box<Decl>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AssignOp {
    Assign, // =
    Define, // :=
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BranchKind {
    Break,
    Continue,
}

#[derive(Debug, Serialize)]
pub struct IfStmt {
    pub cond: Expr,
    pub then: Block,
    pub els: Option<ElseBranch>,
}

#[derive(Debug, Serialize)]
pub enum ElseBranch {
    Block(Block),
    If(Box<IfStmt>),
}

/// `for Cond { Body }`. `cond` is None only while recovering from syntax
/// errors; the bare `for {}` form is rejected at parse time.
#[derive(Debug, Serialize)]
pub struct ForStmt {
    pub cond: Option<Expr>,
    pub body: Block,
}

#[derive(Debug, Serialize)]
pub struct Expr {
    pub id: NodeId,
    pub pos: Pos,
    pub kind: ExprKind,
}

#[derive(Debug, Serialize)]
pub enum ExprKind {
    Name(Symbol),
    Literal {
        kind: LitKind,
        value: String,
    },
    /// Unary when `y` is None, binary otherwise.
    Operation {
        op: TokenKind,
        x: Box<Expr>,
        y: Option<Box<Expr>>,
    },
    Call {
        fun: Box<Expr>,
        args: Vec<Expr>,
    },
    Index {
        x: Box<Expr>,
        index: Box<Expr>,
    },
    Selector {
        x: Box<Expr>,
        sel: Name,
    },
    Paren(Box<Expr>),
    /// Heap allocation: `new(T)`.
    New {
        ty: Box<Expr>,
    },
    /// Struct literal: `T{a: 1, b: 2}` or `T{1, 2}`.
    Composite {
        ty: Box<Expr>,
        elems: Vec<CompositeElem>,
    },

    /* Type expressions */
    ArrayType {
        len: Box<Expr>,
        elem: Box<Expr>,
    },
    PointerType {
        base: Box<Expr>,
    },
    RefType {
        base: Box<Expr>,
    },
    StructType {
        fields: Vec<Field>,
    },
}

#[derive(Debug, Serialize)]
pub enum CompositeElem {
    Positional(Expr),
    Keyed { key: Expr, value: Expr },
}

impl Expr {
    /// Whether this expression is syntactically a type expression.
    pub fn is_type_shape(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::ArrayType { .. }
                | ExprKind::PointerType { .. }
                | ExprKind::RefType { .. }
                | ExprKind::StructType { .. }
        )
    }
}
