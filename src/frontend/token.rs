use serde::Serialize;
use strum::{Display as StrumDisplay, EnumString};

/// The type of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    Eof,

    /* Words */
    Name,    // identifier: foo, bar, Rectangle
    Literal, // literal value (see LitKind)

    /* Assignment */
    Assign, // =
    Define, // :=

    /* Logical operators */
    OrOr,   // ||
    AndAnd, // &&

    /* Comparison operators */
    Eql, // ==
    Neq, // !=
    Lss, // <
    Leq, // <=
    Gtr, // >
    Geq, // >=

    /* Additive operators */
    Add, // +
    Sub, // -
    Or,  // |
    Xor, // ^

    /* Multiplicative operators */
    Mul, // *
    Div, // /
    Rem, // %
    And, // &
    Shl, // <<
    Shr, // >>

    /* Unary */
    Not, // !

    /* Delimiters */
    Lparen, // (
    Rparen, // )
    Lbrack, // [
    Rbrack, // ]
    Lbrace, // {
    Rbrace, // }
    Comma,  // ,
    Semi,   // ;
    Colon,  // :
    Dot,    // .

    Keyword(Keyword),
}

impl TokenKind {
    /// Binary operator precedence; 0 for non-operators. Higher binds tighter:
    ///
    ///   1: ||
    ///   2: &&
    ///   3: == != < <= > >=
    ///   4: + - | ^
    ///   5: * / % & << >>
    pub fn precedence(self) -> u8 {
        use TokenKind::*;
        match self {
            OrOr => 1,
            AndAnd => 2,
            Eql | Neq | Lss | Leq | Gtr | Geq => 3,
            Add | Sub | Or | Xor => 4,
            Mul | Div | Rem | And | Shl | Shr => 5,
            _ => 0,
        }
    }

    /// Whether this token is one of the ordering comparisons (< <= > >=).
    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            TokenKind::Lss | TokenKind::Leq | TokenKind::Gtr | TokenKind::Geq
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, TokenKind::OrOr | TokenKind::AndAnd)
    }
}

impl core::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use TokenKind::*;
        let s = match self {
            Eof => "EOF",
            Name => "NAME",
            Literal => "LITERAL",
            Assign => "=",
            Define => ":=",
            OrOr => "||",
            AndAnd => "&&",
            Eql => "==",
            Neq => "!=",
            Lss => "<",
            Leq => "<=",
            Gtr => ">",
            Geq => ">=",
            Add => "+",
            Sub => "-",
            Or => "|",
            Xor => "^",
            Mul => "*",
            Div => "/",
            Rem => "%",
            And => "&",
            Shl => "<<",
            Shr => ">>",
            Not => "!",
            Lparen => "(",
            Rparen => ")",
            Lbrack => "[",
            Rbrack => "]",
            Lbrace => "{",
            Rbrace => "}",
            Comma => ",",
            Semi => ";",
            Colon => ":",
            Dot => ".",
            Keyword(kw) => return write!(f, "{kw}"),
        };
        f.write_str(s)
    }
}

/// The 15 reserved words. Predeclared identifiers (`int`, `float`, `bool`,
/// `string`, `true`, `false`, `nil`, `println`) are NOT keywords; they scan
/// as names and resolve through the universe scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, StrumDisplay, Serialize)]
#[strum(serialize_all = "lowercase")]
pub enum Keyword {
    Break,
    Continue,
    Else,
    For,
    Func,
    If,
    Import,
    New,
    Package,
    Panic,
    Ref,
    Return,
    Struct,
    Type,
    Var,
}

/// The kind of a literal token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LitKind {
    Int,    // 123, 0x1F, 0o77, 0b1010
    Float,  // 3.14, 1e10, 2.5e-3
    Str,    // "hello", "line\n"
}

impl core::fmt::Display for LitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            LitKind::Int => "int",
            LitKind::Float => "float",
            LitKind::Str => "string",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_lookup() {
        assert_eq!("for".parse::<Keyword>(), Ok(Keyword::For));
        assert_eq!("ref".parse::<Keyword>(), Ok(Keyword::Ref));
        assert!("int".parse::<Keyword>().is_err());
        assert!("println".parse::<Keyword>().is_err());
        assert!("true".parse::<Keyword>().is_err());
    }

    #[test]
    fn precedence_levels() {
        assert_eq!(TokenKind::OrOr.precedence(), 1);
        assert_eq!(TokenKind::AndAnd.precedence(), 2);
        assert_eq!(TokenKind::Lss.precedence(), 3);
        assert_eq!(TokenKind::Add.precedence(), 4);
        assert_eq!(TokenKind::Shl.precedence(), 5);
        assert_eq!(TokenKind::Semi.precedence(), 0);
        assert_eq!(TokenKind::Keyword(Keyword::If).precedence(), 0);
    }
}
