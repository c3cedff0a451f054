use serde::{Serialize, Serializer};

use crate::frontend::intern::Symbol;

/// A position in a source file. Line and column are 1-based; the zero value
/// (line 0) is an invalid position used for predeclared objects.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Pos {
    file: Symbol,
    line: u32,
    col: u32,
}

impl Pos {
    pub fn new(file: Symbol, line: u32, col: u32) -> Pos {
        Pos { file, line, col }
    }

    /// The invalid position.
    pub fn none() -> Pos {
        Pos {
            file: Symbol::empty(),
            line: 0,
            col: 0,
        }
    }

    pub fn is_valid(self) -> bool {
        self.line > 0
    }

    pub fn line(self) -> u32 {
        self.line
    }

    pub fn col(self) -> u32 {
        self.col
    }

    pub fn filename(self) -> Symbol {
        self.file
    }
}

impl core::fmt::Display for Pos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.file.is_empty() {
            write!(f, "{}:{}:{}", self.file, self.line, self.col)
        } else {
            write!(f, "{}:{}", self.line, self.col)
        }
    }
}

impl Serialize for Pos {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}
