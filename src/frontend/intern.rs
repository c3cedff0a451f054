use std::sync::RwLock;

use hashbrown::HashMap;
use once_cell::sync::Lazy;
use serde::{Serialize, Serializer};

static INTERNER: Lazy<RwLock<Interner>> = Lazy::new(Default::default);

#[derive(Default)]
struct Interner {
    strings: Vec<&'static str>,
    lookup: HashMap<&'static str, u32>,
}

/// A handle to an interned string. Cheap to copy and compare; resolves back
/// through the process-wide interning table.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(u32);

impl Symbol {
    pub fn new(s: &str) -> Symbol {
        {
            let interner = INTERNER.read().unwrap();
            if let Some(&idx) = interner.lookup.get(s) {
                return Symbol(idx);
            }
        }

        let mut interner = INTERNER.write().unwrap();
        // Re-check under the write lock
        if let Some(&idx) = interner.lookup.get(s) {
            return Symbol(idx);
        }

        let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
        let idx = interner.strings.len() as u32;
        interner.strings.push(leaked);
        interner.lookup.insert(leaked, idx);
        Symbol(idx)
    }

    pub fn empty() -> Symbol {
        Symbol::new("")
    }

    pub fn as_str(self) -> &'static str {
        INTERNER.read().unwrap().strings[self.0 as usize]
    }

    pub fn is_empty(self) -> bool {
        self.as_str().is_empty()
    }
}

impl core::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::fmt::Debug for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl Serialize for Symbol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_dedupes() {
        let a = Symbol::new("foo");
        let b = Symbol::new("foo");
        let c = Symbol::new("bar");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str(), "foo");
        assert_eq!(c.as_str(), "bar");
    }
}
