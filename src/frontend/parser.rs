use thiserror::Error;

use crate::{
    diag::Handler,
    frontend::{
        ast::{
            AssignOp, BasicLit, Block, BranchKind, CompositeElem, Decl, DeclKind, ElseBranch,
            Expr, ExprKind, Field, File, ForStmt, FuncDecl, IfStmt, ImportDecl, Name, NodeId,
            Stmt, StmtKind, TypeDecl, VarDecl,
        },
        intern::Symbol,
        pos::Pos,
        scanner::Scanner,
        token::{Keyword, LitKind, TokenKind},
    },
};

/// Maximum number of syntax errors before aborting the parse.
const MAX_ERRORS: usize = 10;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{pos}: {msg}")]
pub struct SyntaxError {
    pub pos: Pos,
    pub msg: String,
}

/// Performs syntax analysis on Yoru source code.
pub struct Parser {
    scanner: Scanner,

    /* Current token info (cached from the scanner) */
    tok: TokenKind,
    lit: String,
    pos: Pos,

    /* Error handling */
    handler: Handler,
    errcnt: usize,
    first: Option<SyntaxError>,
    abort: bool,

    next_node_id: u32,
}

impl Parser {
    pub fn new(filename: &str, src: Vec<u8>, handler: Handler) -> Parser {
        let mut p = Parser {
            scanner: Scanner::new(filename, src, handler.clone()),
            tok: TokenKind::Eof,
            lit: String::new(),
            pos: Pos::none(),
            handler,
            errcnt: 0,
            first: None,
            abort: false,
            next_node_id: 0,
        };
        p.next(); // prime with the first token
        p
    }

    pub fn set_asi_enabled(&mut self, enabled: bool) {
        self.scanner.set_asi_enabled(enabled);
    }

    /// The number of syntax errors encountered.
    pub fn errors(&self) -> usize {
        self.errcnt
    }

    pub fn first_error(&self) -> Option<&SyntaxError> {
        self.first.as_ref()
    }

    /* Token navigation */

    fn next(&mut self) {
        self.scanner.next();
        self.tok = self.scanner.token();
        self.lit = self.scanner.literal().to_owned();
        self.pos = self.scanner.pos();
    }

    /// Consumes the current token if it is `tok` and reports whether it did.
    fn got(&mut self, tok: TokenKind) -> bool {
        if self.tok == tok {
            self.next();
            return true;
        }
        false
    }

    /// Consumes the current token if it matches `tok`, otherwise reports an
    /// error and synchronizes.
    fn want(&mut self, tok: TokenKind) {
        if !self.got(tok) {
            self.syntax_error(format!("expected {tok}"));
            self.advance();
        }
    }

    fn want_keyword(&mut self, kw: Keyword) {
        self.want(TokenKind::Keyword(kw));
    }

    /* Error handling */

    fn syntax_error(&mut self, msg: impl Into<String>) {
        self.syntax_error_at(self.pos, msg);
    }

    fn syntax_error_at(&mut self, pos: Pos, msg: impl Into<String>) {
        if self.abort {
            return;
        }
        let msg = msg.into();
        if self.errcnt == 0 {
            self.first = Some(SyntaxError {
                pos,
                msg: msg.clone(),
            });
        }
        self.errcnt += 1;
        self.handler.borrow_mut().report(pos, msg);

        if self.errcnt >= MAX_ERRORS {
            self.abort = true;
            self.handler
                .borrow_mut()
                .report(pos, "too many errors; aborting parse");
            self.errcnt += 1;
            self.tok = TokenKind::Eof;
        }
    }

    /// Skips tokens until a synchronization point, then consumes it to avoid
    /// repeated errors at the same position.
    fn advance(&mut self) {
        fn is_sync(tok: TokenKind) -> bool {
            use Keyword::*;
            matches!(
                tok,
                TokenKind::Semi | TokenKind::Rbrace | TokenKind::Rparen | TokenKind::Rbrack
            ) || matches!(
                tok,
                TokenKind::Keyword(
                    Package | Import | Type | Var | Func | If | For | Return | Break | Continue
                )
            )
        }

        while self.tok != TokenKind::Eof && !is_sync(self.tok) {
            self.next();
        }
        if self.tok != TokenKind::Eof {
            self.next();
        }
    }

    fn node_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        id
    }

    /* Entry point */

    /// Parses a complete source file.
    pub fn parse(&mut self) -> File {
        let id = self.node_id();
        let pos = self.pos;

        self.want_keyword(Keyword::Package);
        let pkg_name = self.name();
        self.want(TokenKind::Semi);

        let mut imports = Vec::new();
        while !self.abort && self.tok == TokenKind::Keyword(Keyword::Import) {
            imports.push(self.import_decl());
        }

        let mut decls = Vec::new();
        while !self.abort && self.tok != TokenKind::Eof {
            // Skip semicolons between declarations (ASI inserts them after }).
            while self.tok == TokenKind::Semi {
                self.next();
            }
            if self.tok == TokenKind::Eof {
                break;
            }
            if let Some(d) = self.decl() {
                decls.push(d);
            }
        }

        File {
            id,
            pos,
            pkg_name,
            imports,
            decls,
        }
    }

    /* Helpers */

    fn name(&mut self) -> Name {
        if self.tok != TokenKind::Name {
            self.syntax_error("expected identifier");
            // Placeholder for error recovery.
            return Name {
                id: self.node_id(),
                pos: self.pos,
                value: Symbol::new("_"),
            };
        }
        let n = Name {
            id: self.node_id(),
            pos: self.pos,
            value: Symbol::new(&self.lit),
        };
        self.next();
        n
    }

    /* Declarations */

    /// import "path"
    fn import_decl(&mut self) -> ImportDecl {
        let id = self.node_id();
        let pos = self.pos;

        self.want_keyword(Keyword::Import);

        if self.tok != TokenKind::Literal || self.scanner.lit_kind() != LitKind::Str {
            self.syntax_error("expected string literal for import path");
            self.advance();
            return ImportDecl {
                id,
                pos,
                path: None,
            };
        }

        let path = BasicLit {
            id: self.node_id(),
            pos: self.pos,
            kind: LitKind::Str,
            value: self.lit.clone(),
        };
        self.next();
        self.want(TokenKind::Semi);

        ImportDecl {
            id,
            pos,
            path: Some(path),
        }
    }

    fn decl(&mut self) -> Option<Decl> {
        match self.tok {
            TokenKind::Keyword(Keyword::Type) => Some(self.type_decl()),
            TokenKind::Keyword(Keyword::Var) => Some(self.var_decl()),
            TokenKind::Keyword(Keyword::Func) => Some(self.func_decl()),
            _ => {
                self.syntax_error("expected declaration");
                self.advance();
                None
            }
        }
    }

    /// type Name Type or type Name = Type
    fn type_decl(&mut self) -> Decl {
        let id = self.node_id();
        let pos = self.pos;

        self.want_keyword(Keyword::Type);
        let name = self.name();
        let alias = self.got(TokenKind::Assign);
        let ty = self.type_();
        self.want(TokenKind::Semi);

        Decl {
            id,
            pos,
            kind: DeclKind::Type(TypeDecl { name, alias, ty }),
        }
    }

    fn type_(&mut self) -> Expr {
        match self.tok {
            TokenKind::Name => {
                let n = self.name();
                Expr {
                    id: n.id,
                    pos: n.pos,
                    kind: ExprKind::Name(n.value),
                }
            }
            TokenKind::Mul => self.pointer_type(),
            TokenKind::Keyword(Keyword::Ref) => self.ref_type(),
            TokenKind::Lbrack => self.array_type(),
            TokenKind::Keyword(Keyword::Struct) => self.struct_type(),
            _ => {
                self.syntax_error("expected type");
                Expr {
                    id: self.node_id(),
                    pos: self.pos,
                    kind: ExprKind::Name(Symbol::new("_")),
                }
            }
        }
    }

    /// *Base
    fn pointer_type(&mut self) -> Expr {
        let id = self.node_id();
        let pos = self.pos;
        self.want(TokenKind::Mul);
        let base = self.type_();
        Expr {
            id,
            pos,
            kind: ExprKind::PointerType {
                base: Box::new(base),
            },
        }
    }

    /// ref Base
    fn ref_type(&mut self) -> Expr {
        let id = self.node_id();
        let pos = self.pos;
        self.want_keyword(Keyword::Ref);
        let base = self.type_();
        Expr {
            id,
            pos,
            kind: ExprKind::RefType {
                base: Box::new(base),
            },
        }
    }

    /// [N]Elem
    fn array_type(&mut self) -> Expr {
        let id = self.node_id();
        let pos = self.pos;
        self.want(TokenKind::Lbrack);
        let len = self.expr();
        self.want(TokenKind::Rbrack);
        let elem = self.type_();
        Expr {
            id,
            pos,
            kind: ExprKind::ArrayType {
                len: Box::new(len),
                elem: Box::new(elem),
            },
        }
    }

    /// struct { Fields... }
    fn struct_type(&mut self) -> Expr {
        let id = self.node_id();
        let pos = self.pos;

        self.want_keyword(Keyword::Struct);
        self.want(TokenKind::Lbrace);

        let mut fields = Vec::new();
        while self.tok != TokenKind::Rbrace && self.tok != TokenKind::Eof {
            fields.push(self.field_decl());
        }

        self.want(TokenKind::Rbrace);
        Expr {
            id,
            pos,
            kind: ExprKind::StructType { fields },
        }
    }

    /// A struct field: Name Type
    fn field_decl(&mut self) -> Field {
        let id = self.node_id();
        let pos = self.pos;
        let name = self.name();
        let ty = self.type_();
        self.want(TokenKind::Semi); // ASI handles newline
        Field { id, pos, name, ty }
    }

    /// var Name Type = Value
    fn var_decl(&mut self) -> Decl {
        let id = self.node_id();
        let pos = self.pos;

        self.want_keyword(Keyword::Var);
        let name = self.name();

        // The type is optional if there is an initializer.
        let ty = if self.tok != TokenKind::Assign {
            Some(self.type_())
        } else {
            None
        };

        let value = if self.got(TokenKind::Assign) {
            Some(self.expr())
        } else {
            None
        };

        self.want(TokenKind::Semi);
        Decl {
            id,
            pos,
            kind: DeclKind::Var(VarDecl { name, ty, value }),
        }
    }

    /// func (recv) Name(params) result { body }
    fn func_decl(&mut self) -> Decl {
        let id = self.node_id();
        let pos = self.pos;

        self.want_keyword(Keyword::Func);

        let recv = if self.tok == TokenKind::Lparen {
            Some(self.receiver())
        } else {
            None
        };

        let name = self.name();
        let params = self.param_list();

        let result = if self.tok != TokenKind::Lbrace {
            Some(self.type_())
        } else {
            None
        };

        let body = self.block();

        Decl {
            id,
            pos,
            kind: DeclKind::Func(FuncDecl {
                recv,
                name,
                params,
                result,
                body: Some(body),
            }),
        }
    }

    /// (name Type)
    fn receiver(&mut self) -> Field {
        let id = self.node_id();
        let pos = self.pos;

        self.want(TokenKind::Lparen);
        let name = self.name();
        let ty = self.type_();
        self.want(TokenKind::Rparen);

        Field { id, pos, name, ty }
    }

    /// (p1 T1, p2 T2, ...)
    fn param_list(&mut self) -> Vec<Field> {
        self.want(TokenKind::Lparen);

        let mut params = Vec::new();
        if self.tok != TokenKind::Rparen {
            loop {
                let id = self.node_id();
                let pos = self.pos;
                let name = self.name();
                let ty = self.type_();
                params.push(Field { id, pos, name, ty });

                if !self.got(TokenKind::Comma) {
                    break;
                }
            }
        }

        self.want(TokenKind::Rparen);
        params
    }

    /* Statements */

    fn stmt(&mut self) -> Stmt {
        match self.tok {
            TokenKind::Lbrace => {
                let id = self.node_id();
                let pos = self.pos;
                let b = self.block();
                Stmt {
                    id,
                    pos,
                    kind: StmtKind::Block(Box::new(b)),
                }
            }
            TokenKind::Keyword(Keyword::If) => self.if_stmt(),
            TokenKind::Keyword(Keyword::For) => self.for_stmt(),
            TokenKind::Keyword(Keyword::Return) => self.return_stmt(),
            TokenKind::Keyword(Keyword::Break) | TokenKind::Keyword(Keyword::Continue) => {
                self.branch_stmt()
            }
            TokenKind::Keyword(Keyword::Var) => {
                let d = self.var_decl();
                Stmt {
                    id: self.node_id(),
                    pos: d.pos,
                    kind: StmtKind::Decl(Box::new(d)),
                }
            }
            TokenKind::Semi => {
                let s = Stmt {
                    id: self.node_id(),
                    pos: self.pos,
                    kind: StmtKind::Empty,
                };
                self.next();
                s
            }
            _ => self.simple_stmt(),
        }
    }

    /// An expression statement or assignment.
    fn simple_stmt(&mut self) -> Stmt {
        let id = self.node_id();
        let pos = self.pos;
        let x = self.expr();

        match self.tok {
            TokenKind::Assign | TokenKind::Define => {
                let op = if self.tok == TokenKind::Define {
                    AssignOp::Define
                } else {
                    AssignOp::Assign
                };
                self.next(); // consume = or :=
                let rhs = self.expr();
                self.want(TokenKind::Semi);
                Stmt {
                    id,
                    pos,
                    kind: StmtKind::Assign {
                        op,
                        lhs: Box::new(x),
                        rhs: Box::new(rhs),
                    },
                }
            }
            _ => {
                self.want(TokenKind::Semi);
                Stmt {
                    id,
                    pos,
                    kind: StmtKind::Expr(Box::new(x)),
                }
            }
        }
    }

    /// { stmts... }
    fn block(&mut self) -> Block {
        let id = self.node_id();
        let pos = self.pos;

        self.want(TokenKind::Lbrace);

        let mut stmts = Vec::new();
        while self.tok != TokenKind::Rbrace && self.tok != TokenKind::Eof {
            stmts.push(self.stmt());
        }

        let rbrace = self.pos;
        self.want(TokenKind::Rbrace);
        // ASI handles the semicolon after }.

        Block {
            id,
            pos,
            stmts,
            rbrace,
        }
    }

    /// if cond { then } [else { ... } | else if ...]
    fn if_stmt(&mut self) -> Stmt {
        let id = self.node_id();
        let pos = self.pos;
        let inner = self.if_stmt_inner();
        Stmt {
            id,
            pos,
            kind: StmtKind::If(Box::new(inner)),
        }
    }

    fn if_stmt_inner(&mut self) -> IfStmt {
        self.want_keyword(Keyword::If);
        let cond = self.expr();
        let then = self.block();

        let els = if self.got(TokenKind::Keyword(Keyword::Else)) {
            if self.tok == TokenKind::Keyword(Keyword::If) {
                Some(ElseBranch::If(Box::new(self.if_stmt_inner())))
            } else {
                Some(ElseBranch::Block(self.block()))
            }
        } else {
            None
        };

        IfStmt { cond, then, els }
    }

    /// for cond { body } — bare `for {}` is rejected.
    fn for_stmt(&mut self) -> Stmt {
        let id = self.node_id();
        let pos = self.pos;

        self.want_keyword(Keyword::For);

        let cond = if self.tok == TokenKind::Lbrace {
            self.syntax_error("expected for condition");
            None
        } else {
            Some(self.expr())
        };

        let body = self.block();
        Stmt {
            id,
            pos,
            kind: StmtKind::For(Box::new(ForStmt { cond, body })),
        }
    }

    /// return [expr]
    fn return_stmt(&mut self) -> Stmt {
        let id = self.node_id();
        let pos = self.pos;

        self.want_keyword(Keyword::Return);

        let result = if self.tok != TokenKind::Semi
            && self.tok != TokenKind::Rbrace
            && self.tok != TokenKind::Eof
        {
            Some(Box::new(self.expr()))
        } else {
            None
        };

        self.want(TokenKind::Semi);
        Stmt {
            id,
            pos,
            kind: StmtKind::Return { result },
        }
    }

    /// break or continue
    fn branch_stmt(&mut self) -> Stmt {
        let id = self.node_id();
        let pos = self.pos;
        let kind = if self.tok == TokenKind::Keyword(Keyword::Break) {
            BranchKind::Break
        } else {
            BranchKind::Continue
        };
        self.next();
        self.want(TokenKind::Semi);
        Stmt {
            id,
            pos,
            kind: StmtKind::Branch(kind),
        }
    }

    /* Expressions */

    fn expr(&mut self) -> Expr {
        self.binary_expr(0)
    }

    /// Precedence climbing with left associativity.
    fn binary_expr(&mut self, prec: u8) -> Expr {
        let mut x = self.unary_expr();

        loop {
            let oprec = self.tok.precedence();
            if oprec <= prec {
                return x;
            }

            let op = self.tok;
            // Binary operations take the position of their left operand.
            let id = self.node_id();
            let pos = x.pos;

            self.next(); // consume the operator

            let y = self.binary_expr(oprec);
            x = Expr {
                id,
                pos,
                kind: ExprKind::Operation {
                    op,
                    x: Box::new(x),
                    y: Some(Box::new(y)),
                },
            };
        }
    }

    fn unary_expr(&mut self) -> Expr {
        match self.tok {
            TokenKind::Not | TokenKind::Sub | TokenKind::Mul | TokenKind::And => {
                let op = self.tok;
                let id = self.node_id();
                let pos = self.pos;
                self.next();
                let x = self.unary_expr();
                Expr {
                    id,
                    pos,
                    kind: ExprKind::Operation {
                        op,
                        x: Box::new(x),
                        y: None,
                    },
                }
            }
            _ => self.primary_expr(),
        }
    }

    /// Primary expressions with the postfix chain: calls, index, selector.
    fn primary_expr(&mut self) -> Expr {
        let mut x = self.operand();

        loop {
            match self.tok {
                TokenKind::Lparen => x = self.call_expr(x),
                TokenKind::Lbrack => x = self.index_expr(x),
                TokenKind::Dot => x = self.selector_expr(x),
                _ => return x,
            }
        }
    }

    fn operand(&mut self) -> Expr {
        match self.tok {
            TokenKind::Name => {
                let id = self.node_id();
                let pos = self.pos;
                let sym = Symbol::new(&self.lit);
                self.next();
                let n = Expr {
                    id,
                    pos,
                    kind: ExprKind::Name(sym),
                };
                // Composite literal: T{...}
                if self.tok == TokenKind::Lbrace {
                    return self.composite_lit(n);
                }
                n
            }
            TokenKind::Keyword(Keyword::Panic) => {
                // panic is lexically a keyword but syntactically a builtin
                // function name.
                let e = Expr {
                    id: self.node_id(),
                    pos: self.pos,
                    kind: ExprKind::Name(Symbol::new("panic")),
                };
                self.next();
                e
            }
            TokenKind::Literal => {
                let e = Expr {
                    id: self.node_id(),
                    pos: self.pos,
                    kind: ExprKind::Literal {
                        kind: self.scanner.lit_kind(),
                        value: self.lit.clone(),
                    },
                };
                self.next();
                e
            }
            TokenKind::Lparen => {
                let id = self.node_id();
                let pos = self.pos;
                self.next();
                let x = self.expr();
                self.want(TokenKind::Rparen);
                Expr {
                    id,
                    pos,
                    kind: ExprKind::Paren(Box::new(x)),
                }
            }
            TokenKind::Keyword(Keyword::New) => self.new_expr(),
            _ => {
                self.syntax_error("expected operand");
                Expr {
                    id: self.node_id(),
                    pos: self.pos,
                    kind: ExprKind::Name(Symbol::new("_")),
                }
            }
        }
    }

    /// Fun(args...)
    fn call_expr(&mut self, fun: Expr) -> Expr {
        let id = self.node_id();
        let pos = fun.pos;

        self.want(TokenKind::Lparen);
        let mut args = Vec::new();
        if self.tok != TokenKind::Rparen {
            args.push(self.expr());
            while self.got(TokenKind::Comma) {
                args.push(self.expr());
            }
        }
        self.want(TokenKind::Rparen);

        Expr {
            id,
            pos,
            kind: ExprKind::Call {
                fun: Box::new(fun),
                args,
            },
        }
    }

    /// X[Index]
    fn index_expr(&mut self, x: Expr) -> Expr {
        let id = self.node_id();
        let pos = x.pos;

        self.want(TokenKind::Lbrack);
        let index = self.expr();
        self.want(TokenKind::Rbrack);

        Expr {
            id,
            pos,
            kind: ExprKind::Index {
                x: Box::new(x),
                index: Box::new(index),
            },
        }
    }

    /// X.Sel
    fn selector_expr(&mut self, x: Expr) -> Expr {
        let id = self.node_id();
        let pos = x.pos;

        self.want(TokenKind::Dot);
        let sel = self.name();

        Expr {
            id,
            pos,
            kind: ExprKind::Selector {
                x: Box::new(x),
                sel,
            },
        }
    }

    /// new(Type)
    fn new_expr(&mut self) -> Expr {
        let id = self.node_id();
        let pos = self.pos;

        self.want_keyword(Keyword::New);
        self.want(TokenKind::Lparen);
        let ty = self.type_();
        self.want(TokenKind::Rparen);

        Expr {
            id,
            pos,
            kind: ExprKind::New { ty: Box::new(ty) },
        }
    }

    /// T{elem, key: value, ...}
    fn composite_lit(&mut self, ty: Expr) -> Expr {
        let id = self.node_id();
        let pos = ty.pos;

        self.want(TokenKind::Lbrace);
        let mut elems = Vec::new();
        while self.tok != TokenKind::Rbrace && self.tok != TokenKind::Eof {
            let elem = self.expr();
            if self.got(TokenKind::Colon) {
                let value = self.expr();
                elems.push(CompositeElem::Keyed { key: elem, value });
            } else {
                elems.push(CompositeElem::Positional(elem));
            }
            if !self.got(TokenKind::Comma) {
                break;
            }
        }
        self.want(TokenKind::Rbrace);

        Expr {
            id,
            pos,
            kind: ExprKind::Composite {
                ty: Box::new(ty),
                elems,
            },
        }
    }
}
