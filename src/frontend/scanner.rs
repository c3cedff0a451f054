use crate::{
    diag::Handler,
    frontend::{
        pos::Pos,
        source::{
            is_binary_digit, is_digit, is_hex_digit, is_letter, is_octal_digit, is_operator_start,
            is_whitespace, lower, Source,
        },
        token::{LitKind, TokenKind},
    },
};

/// Performs lexical analysis on Yoru source code.
pub struct Scanner {
    src: Source,

    /* Current token info */
    tok: TokenKind,
    lit: String,
    kind: LitKind,
    tok_pos: Pos,

    /// ASI state: whether to insert a semicolon at the next newline or EOF.
    nlsemi: bool,
    /// Whether automatic semicolon insertion is enabled (`--no-asi` clears it).
    asi_enabled: bool,
}

impl Scanner {
    pub fn new(filename: &str, buf: Vec<u8>, handler: Handler) -> Scanner {
        Scanner {
            src: Source::new(filename, buf, handler),
            tok: TokenKind::Eof,
            lit: String::new(),
            kind: LitKind::Int,
            tok_pos: Pos::none(),
            nlsemi: false,
            asi_enabled: true,
        }
    }

    pub fn set_asi_enabled(&mut self, enabled: bool) {
        self.asi_enabled = enabled;
    }

    /// Advances to the next token.
    pub fn next(&mut self) {
        let nlsemi = std::mem::replace(&mut self.nlsemi, false);

        loop {
            self.skip_whitespace();

            // ASI: insert a semicolon before a newline or EOF when armed.
            if self.asi_enabled && nlsemi && (self.src.ch == Some('\n') || self.src.ch.is_none()) {
                self.tok_pos = self.src.pos();
                self.tok = TokenKind::Semi;
                if self.src.ch == Some('\n') {
                    self.lit = "newline".to_owned();
                    self.src.nextch();
                } else {
                    self.lit = "EOF".to_owned();
                }
                return;
            }

            // Newlines are plain whitespace when no semicolon is pending.
            if self.src.ch == Some('\n') {
                self.src.nextch();
                continue;
            }

            self.tok_pos = self.src.pos();

            match self.src.ch {
                None => {
                    self.tok = TokenKind::Eof;
                    self.lit.clear();
                }
                Some(c) if is_letter(c) => self.scan_ident(),
                Some(c) if is_digit(c) => self.scan_number(),
                Some('"') => self.scan_string(),
                Some(c) if is_operator_start(c) => {
                    if self.scan_operator() {
                        // A comment was skipped; rescan.
                        continue;
                    }
                }
                Some(c) => {
                    self.src.error(format!("unexpected character {c:?}"));
                    self.src.nextch();
                    continue;
                }
            }
            break;
        }

        self.nlsemi = self.should_insert_semi();
    }

    pub fn token(&self) -> TokenKind {
        self.tok
    }

    pub fn literal(&self) -> &str {
        &self.lit
    }

    /// Only meaningful when `token() == TokenKind::Literal`.
    pub fn lit_kind(&self) -> LitKind {
        self.kind
    }

    pub fn pos(&self) -> Pos {
        self.tok_pos
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.src.ch {
            if !is_whitespace(c) {
                break;
            }
            self.src.nextch();
        }
    }

    /// Whether a semicolon should be inserted after the current token when a
    /// newline (or EOF) follows.
    fn should_insert_semi(&self) -> bool {
        use crate::frontend::token::Keyword::*;
        match self.tok {
            TokenKind::Name | TokenKind::Literal => true,
            TokenKind::Keyword(Break | Continue | Return) => true,
            TokenKind::Rparen | TokenKind::Rbrack | TokenKind::Rbrace => true,
            _ => false,
        }
    }

    fn scan_ident(&mut self) {
        self.lit.clear();
        while let Some(c) = self.src.ch {
            if !(is_letter(c) || is_digit(c)) {
                break;
            }
            self.lit.push(c);
            self.src.nextch();
        }

        self.tok = match self.lit.parse() {
            Ok(kw) => TokenKind::Keyword(kw),
            Err(_) => TokenKind::Name,
        };
    }

    fn scan_number(&mut self) {
        self.lit.clear();
        self.kind = LitKind::Int;

        if self.src.ch == Some('0') {
            self.lit.push('0');
            self.src.nextch();
            match self.src.ch.map(lower) {
                Some('x') => {
                    self.lit.push(self.src.ch.unwrap());
                    self.src.nextch();
                    self.scan_radix_digits(is_hex_digit, "invalid hex digit");
                }
                Some('o') => {
                    self.lit.push(self.src.ch.unwrap());
                    self.src.nextch();
                    self.scan_radix_digits(is_octal_digit, "invalid octal digit");
                }
                Some('b') => {
                    self.lit.push(self.src.ch.unwrap());
                    self.src.nextch();
                    self.scan_radix_digits(is_binary_digit, "invalid binary digit");
                    // Decimal digits trailing a binary literal (e.g. 0b12).
                    if self.src.ch.is_some_and(is_digit) {
                        self.src.error("invalid binary digit");
                    }
                }
                _ => {
                    // Decimal starting with 0 (leading zeros are allowed).
                    if self.src.ch.is_some_and(is_digit) {
                        self.scan_decimal_digits();
                    }
                    if self.src.ch == Some('.') || self.src.ch.map(lower) == Some('e') {
                        self.scan_fraction();
                    }
                }
            }
        } else {
            self.scan_decimal_digits();
            if self.src.ch == Some('.') || self.src.ch.map(lower) == Some('e') {
                self.scan_fraction();
            }
        }

        self.tok = TokenKind::Literal;
    }

    fn scan_decimal_digits(&mut self) {
        while let Some(c) = self.src.ch {
            if !is_digit(c) {
                break;
            }
            self.lit.push(c);
            self.src.nextch();
        }
    }

    fn scan_radix_digits(&mut self, valid: fn(char) -> bool, err: &str) {
        if !self.src.ch.is_some_and(valid) {
            self.src.error(err);
            return;
        }
        while let Some(c) = self.src.ch {
            if !valid(c) {
                break;
            }
            self.lit.push(c);
            self.src.nextch();
        }
    }

    /// Scans the fractional part of a float (`.` digits and/or exponent).
    fn scan_fraction(&mut self) {
        if self.src.ch == Some('.') {
            self.kind = LitKind::Float;
            self.lit.push('.');
            self.src.nextch();
            self.scan_decimal_digits();
        }

        if self.src.ch.map(lower) == Some('e') {
            self.kind = LitKind::Float;
            self.lit.push(self.src.ch.unwrap());
            self.src.nextch();

            if self.src.ch == Some('+') || self.src.ch == Some('-') {
                self.lit.push(self.src.ch.unwrap());
                self.src.nextch();
            }

            if !self.src.ch.is_some_and(is_digit) {
                self.src.error("exponent has no digits");
                return;
            }
            self.scan_decimal_digits();
        }
    }

    /// Scans a string literal. The resulting literal is the decoded content
    /// (escape sequences are interpreted).
    fn scan_string(&mut self) {
        self.src.nextch(); // skip opening "
        let mut decoded = String::new();

        loop {
            match self.src.ch {
                Some('"') => {
                    self.src.nextch();
                    break;
                }
                Some('\\') => {
                    if let Some(c) = self.scan_escape() {
                        decoded.push(c);
                    }
                }
                Some('\n') | None => {
                    self.src.error("string not terminated");
                    break;
                }
                Some(c) => {
                    decoded.push(c);
                    self.src.nextch();
                }
            }
        }

        self.lit = decoded;
        self.tok = TokenKind::Literal;
        self.kind = LitKind::Str;
    }

    fn scan_escape(&mut self) -> Option<char> {
        self.src.nextch(); // skip backslash

        match self.src.ch {
            Some('n') => {
                self.src.nextch();
                Some('\n')
            }
            Some('t') => {
                self.src.nextch();
                Some('\t')
            }
            Some('r') => {
                self.src.nextch();
                Some('\r')
            }
            Some('\\') => {
                self.src.nextch();
                Some('\\')
            }
            Some('"') => {
                self.src.nextch();
                Some('"')
            }
            Some('0') => {
                self.src.nextch();
                Some('\0')
            }
            Some('x') => {
                self.src.nextch();
                self.scan_hex_escape()
            }
            Some(c) => {
                self.src.error(format!("unknown escape sequence: \\{c}"));
                self.src.nextch();
                None
            }
            None => {
                self.src.error("unknown escape sequence at end of file");
                None
            }
        }
    }

    fn scan_hex_escape(&mut self) -> Option<char> {
        let mut val: u32 = 0;
        for _ in 0..2 {
            match self.src.ch.and_then(|c| c.to_digit(16)) {
                Some(d) => {
                    val = val * 16 + d;
                    self.src.nextch();
                }
                None => {
                    self.src.error("invalid hex escape");
                    return None;
                }
            }
        }
        char::from_u32(val)
    }

    /// Scans an operator or delimiter. Returns true if a comment was skipped
    /// (the caller should rescan).
    fn scan_operator(&mut self) -> bool {
        let ch = self.src.ch.unwrap();
        self.src.nextch();

        let (tok, lit) = match ch {
            '+' => (TokenKind::Add, "+"),
            '-' => (TokenKind::Sub, "-"),
            '*' => (TokenKind::Mul, "*"),
            '/' => {
                if self.src.ch == Some('/') {
                    self.skip_line_comment();
                    return true;
                }
                (TokenKind::Div, "/")
            }
            '%' => (TokenKind::Rem, "%"),
            '&' => {
                if self.src.ch == Some('&') {
                    self.src.nextch();
                    (TokenKind::AndAnd, "&&")
                } else {
                    (TokenKind::And, "&")
                }
            }
            '|' => {
                if self.src.ch == Some('|') {
                    self.src.nextch();
                    (TokenKind::OrOr, "||")
                } else {
                    (TokenKind::Or, "|")
                }
            }
            '^' => (TokenKind::Xor, "^"),
            '<' => match self.src.ch {
                Some('=') => {
                    self.src.nextch();
                    (TokenKind::Leq, "<=")
                }
                Some('<') => {
                    self.src.nextch();
                    (TokenKind::Shl, "<<")
                }
                _ => (TokenKind::Lss, "<"),
            },
            '>' => match self.src.ch {
                Some('=') => {
                    self.src.nextch();
                    (TokenKind::Geq, ">=")
                }
                Some('>') => {
                    self.src.nextch();
                    (TokenKind::Shr, ">>")
                }
                _ => (TokenKind::Gtr, ">"),
            },
            '=' => {
                if self.src.ch == Some('=') {
                    self.src.nextch();
                    (TokenKind::Eql, "==")
                } else {
                    (TokenKind::Assign, "=")
                }
            }
            '!' => {
                if self.src.ch == Some('=') {
                    self.src.nextch();
                    (TokenKind::Neq, "!=")
                } else {
                    (TokenKind::Not, "!")
                }
            }
            ':' => {
                if self.src.ch == Some('=') {
                    self.src.nextch();
                    (TokenKind::Define, ":=")
                } else {
                    (TokenKind::Colon, ":")
                }
            }
            '(' => (TokenKind::Lparen, "("),
            ')' => (TokenKind::Rparen, ")"),
            '[' => (TokenKind::Lbrack, "["),
            ']' => (TokenKind::Rbrack, "]"),
            '{' => (TokenKind::Lbrace, "{"),
            '}' => (TokenKind::Rbrace, "}"),
            ',' => (TokenKind::Comma, ","),
            ';' => (TokenKind::Semi, ";"),
            '.' => (TokenKind::Dot, "."),
            _ => unreachable!("not an operator start: {ch:?}"),
        };

        self.tok = tok;
        self.lit = lit.to_owned();
        false
    }

    fn skip_line_comment(&mut self) {
        // The second slash is the current character.
        self.src.nextch();
        while let Some(c) = self.src.ch {
            if c == '\n' {
                break;
            }
            self.src.nextch();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{diag::new_handler, frontend::token::Keyword};

    fn scan_all(src: &str) -> Vec<(TokenKind, String)> {
        scan_all_asi(src, true).0
    }

    fn scan_all_asi(src: &str, asi: bool) -> (Vec<(TokenKind, String)>, usize) {
        let handler = new_handler();
        let mut s = Scanner::new("test.yoru", src.as_bytes().to_vec(), handler.clone());
        s.set_asi_enabled(asi);
        let mut out = Vec::new();
        loop {
            s.next();
            if s.token() == TokenKind::Eof {
                break;
            }
            out.push((s.token(), s.literal().to_owned()));
        }
        let count = handler.borrow().count();
        (out, count)
    }

    #[test]
    fn idents_and_keywords() {
        let toks = scan_all("func main int println ref");
        assert_eq!(
            toks.iter().map(|(t, _)| *t).collect::<Vec<_>>(),
            vec![
                TokenKind::Keyword(Keyword::Func),
                TokenKind::Name,
                TokenKind::Name,
                TokenKind::Name,
                TokenKind::Keyword(Keyword::Ref),
            ]
        );
        assert_eq!(toks[1].1, "main");
        assert_eq!(toks[3].1, "println");
    }

    #[test]
    fn asi_after_name_literal_and_closers() {
        let toks = scan_all("x\n1\n)\n]\n}\nreturn\n+\n");
        let semis = toks
            .iter()
            .filter(|(t, l)| *t == TokenKind::Semi && l == "newline")
            .count();
        // After x, 1, ), ], }, return — but not after +.
        assert_eq!(semis, 6);
    }

    #[test]
    fn asi_at_eof() {
        let toks = scan_all("x");
        assert_eq!(
            toks,
            vec![
                (TokenKind::Name, "x".to_owned()),
                (TokenKind::Semi, "EOF".to_owned()),
            ]
        );
    }

    #[test]
    fn no_asi_mode_treats_newlines_as_whitespace() {
        let (toks, errs) = scan_all_asi("x\ny\n", false);
        assert_eq!(errs, 0);
        assert_eq!(
            toks,
            vec![
                (TokenKind::Name, "x".to_owned()),
                (TokenKind::Name, "y".to_owned()),
            ]
        );
    }

    #[test]
    fn numbers() {
        let handler = new_handler();
        let mut s = Scanner::new(
            "t.yoru",
            b"42 007 0x1F 0o77 0b1010 3.14 1e10 2.5e-3 0.5".to_vec(),
            handler,
        );
        let mut kinds = Vec::new();
        loop {
            s.next();
            if s.token() == TokenKind::Eof {
                break;
            }
            if s.token() == TokenKind::Literal {
                kinds.push((s.lit_kind(), s.literal().to_owned()));
            }
        }
        use LitKind::*;
        assert_eq!(
            kinds,
            vec![
                (Int, "42".to_owned()),
                (Int, "007".to_owned()),
                (Int, "0x1F".to_owned()),
                (Int, "0o77".to_owned()),
                (Int, "0b1010".to_owned()),
                (Float, "3.14".to_owned()),
                (Float, "1e10".to_owned()),
                (Float, "2.5e-3".to_owned()),
                (Float, "0.5".to_owned()),
            ]
        );
    }

    #[test]
    fn invalid_digits_are_reported() {
        let (_, errs) = scan_all_asi("0xg", true);
        assert_eq!(errs, 1);
        let (_, errs) = scan_all_asi("0b12", true);
        assert_eq!(errs, 1);
        let (_, errs) = scan_all_asi("1e+", true);
        assert_eq!(errs, 1);
    }

    #[test]
    fn strings_and_escapes() {
        let toks = scan_all(r#""hello" "a\nb" "\x41" "q\0r""#);
        assert_eq!(toks[0].1, "hello");
        assert_eq!(toks[1].1, "a\nb");
        assert_eq!(toks[2].1, "A");
        assert_eq!(toks[3].1, "q\0r");
    }

    #[test]
    fn unterminated_string_is_reported_but_closes() {
        let (toks, errs) = scan_all_asi("\"abc\nx", true);
        assert_eq!(errs, 1);
        assert_eq!(toks[0], (TokenKind::Literal, "abc".to_owned()));
        // The string token arms ASI, so the newline becomes a semicolon.
        assert_eq!(toks[1].0, TokenKind::Semi);
        assert_eq!(toks[2], (TokenKind::Name, "x".to_owned()));
    }

    #[test]
    fn line_comments_are_discarded() {
        let toks = scan_all("a // rest of line\nb");
        assert_eq!(toks[0].1, "a");
        assert_eq!(toks[1].0, TokenKind::Semi);
        assert_eq!(toks[2].1, "b");
    }

    #[test]
    fn compound_operators() {
        let toks = scan_all("== != <= >= << >> && || := = < >");
        let kinds: Vec<TokenKind> = toks.iter().map(|(t, _)| *t).collect();
        use TokenKind::*;
        assert_eq!(
            kinds,
            vec![Eql, Neq, Leq, Geq, Shl, Shr, AndAnd, OrOr, Define, Assign, Lss, Gtr]
        );
    }

    #[test]
    fn token_positions_are_monotonic() {
        let handler = new_handler();
        let mut s = Scanner::new("t.yoru", b"a + b\n  c = 1".to_vec(), handler);
        let mut last = (0u32, 0u32);
        loop {
            s.next();
            let p = (s.pos().line(), s.pos().col());
            assert!(p >= last, "position went backwards: {last:?} -> {p:?}");
            last = p;
            if s.token() == TokenKind::Eof {
                break;
            }
        }
    }
}
