//! Exact constant arithmetic for checker-time folding. Integers are
//! arbitrary-width; division that does not divide evenly produces an exact
//! rational, so `10/3` keeps full precision until a concrete type forces
//! truncation (int) or rounding (float).

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, ToPrimitive, Zero};

use crate::frontend::token::TokenKind;

#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Int(BigInt),
    Rat(BigRational),
    Bool(bool),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstError {
    DivisionByZero,
    ModuloByZero,
    /// Operands whose kinds do not combine under the operator.
    Invalid,
}

impl ConstValue {
    pub fn int(v: i64) -> ConstValue {
        ConstValue::Int(BigInt::from(v))
    }

    /// Parses an integer literal: decimal (leading zeros allowed), 0x/0X,
    /// 0o/0O, or 0b/0B.
    pub fn parse_int(lit: &str) -> Option<ConstValue> {
        let (radix, digits) = match lit.as_bytes() {
            [b'0', b'x' | b'X', rest @ ..] => (16, rest),
            [b'0', b'o' | b'O', rest @ ..] => (8, rest),
            [b'0', b'b' | b'B', rest @ ..] => (2, rest),
            _ => (10, lit.as_bytes()),
        };
        BigInt::parse_bytes(digits, radix).map(ConstValue::Int)
    }

    /// Parses a float literal into an exact rational via its f64 value.
    pub fn parse_float(lit: &str) -> Option<ConstValue> {
        let f: f64 = lit.parse().ok()?;
        BigRational::from_float(f).map(ConstValue::Rat)
    }

    pub fn is_zero(&self) -> bool {
        match self {
            ConstValue::Int(i) => i.is_zero(),
            ConstValue::Rat(r) => r.is_zero(),
            _ => false,
        }
    }

    /// Arithmetic negation.
    pub fn neg(&self) -> Result<ConstValue, ConstError> {
        match self {
            ConstValue::Int(i) => Ok(ConstValue::Int(-i)),
            ConstValue::Rat(r) => Ok(ConstValue::Rat(-r)),
            _ => Err(ConstError::Invalid),
        }
    }

    /// Logical negation.
    pub fn not(&self) -> Result<ConstValue, ConstError> {
        match self {
            ConstValue::Bool(b) => Ok(ConstValue::Bool(!b)),
            _ => Err(ConstError::Invalid),
        }
    }

    /// Evaluates an arithmetic operator (+ - * / %). `/` on integers yields
    /// an integer when the division is exact, an exact rational otherwise;
    /// `%` is integer-only with truncated (toward zero) semantics.
    pub fn binary(op: TokenKind, x: &ConstValue, y: &ConstValue) -> Result<ConstValue, ConstError> {
        use ConstValue::*;

        // String concatenation.
        if let (Str(a), Str(b)) = (x, y) {
            return match op {
                TokenKind::Add => Ok(Str(format!("{a}{b}"))),
                _ => Err(ConstError::Invalid),
            };
        }

        match (x, y) {
            (Int(a), Int(b)) => match op {
                TokenKind::Add => Ok(Int(a + b)),
                TokenKind::Sub => Ok(Int(a - b)),
                TokenKind::Mul => Ok(Int(a * b)),
                TokenKind::Div => {
                    if b.is_zero() {
                        return Err(ConstError::DivisionByZero);
                    }
                    if (a % b).is_zero() {
                        Ok(Int(a / b))
                    } else {
                        Ok(Rat(BigRational::new(a.clone(), b.clone())))
                    }
                }
                TokenKind::Rem => {
                    if b.is_zero() {
                        return Err(ConstError::ModuloByZero);
                    }
                    Ok(Int(a % b))
                }
                _ => Err(ConstError::Invalid),
            },
            _ => {
                let a = x.as_rat().ok_or(ConstError::Invalid)?;
                let b = y.as_rat().ok_or(ConstError::Invalid)?;
                let r = match op {
                    TokenKind::Add => a + b,
                    TokenKind::Sub => a - b,
                    TokenKind::Mul => a * b,
                    TokenKind::Div => {
                        if b.is_zero() {
                            return Err(ConstError::DivisionByZero);
                        }
                        a / b
                    }
                    _ => return Err(ConstError::Invalid),
                };
                Ok(Rat(r))
            }
        }
    }

    /// Evaluates a comparison operator. Numeric values compare exactly;
    /// strings compare lexicographically; booleans support only equality.
    pub fn compare(op: TokenKind, x: &ConstValue, y: &ConstValue) -> Result<bool, ConstError> {
        use std::cmp::Ordering;

        let ord = match (x, y) {
            (ConstValue::Str(a), ConstValue::Str(b)) => a.cmp(b),
            (ConstValue::Bool(a), ConstValue::Bool(b)) => {
                return match op {
                    TokenKind::Eql => Ok(a == b),
                    TokenKind::Neq => Ok(a != b),
                    _ => Err(ConstError::Invalid),
                };
            }
            _ => {
                let a = x.as_rat().ok_or(ConstError::Invalid)?;
                let b = y.as_rat().ok_or(ConstError::Invalid)?;
                a.cmp(&b)
            }
        };

        match op {
            TokenKind::Eql => Ok(ord == Ordering::Equal),
            TokenKind::Neq => Ok(ord != Ordering::Equal),
            TokenKind::Lss => Ok(ord == Ordering::Less),
            TokenKind::Leq => Ok(ord != Ordering::Greater),
            TokenKind::Gtr => Ok(ord == Ordering::Greater),
            TokenKind::Geq => Ok(ord != Ordering::Less),
            _ => Err(ConstError::Invalid),
        }
    }

    fn as_rat(&self) -> Option<BigRational> {
        match self {
            ConstValue::Int(i) => Some(BigRational::from_integer(i.clone())),
            ConstValue::Rat(r) => Some(r.clone()),
            _ => None,
        }
    }

    /// The value as an i64, truncating rationals toward zero. None when the
    /// value is non-numeric or overflows.
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            ConstValue::Int(i) => i.to_i64(),
            ConstValue::Rat(r) => r.to_integer().to_i64(),
            _ => None,
        }
    }

    /// The value as an f64 (rounding). None for non-numeric values.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            ConstValue::Int(i) => i.to_f64(),
            ConstValue::Rat(r) => r.to_f64(),
            _ => None,
        }
    }

    /// Whether the value is numerically negative.
    pub fn is_negative(&self) -> bool {
        match self {
            ConstValue::Int(i) => i.is_negative(),
            ConstValue::Rat(r) => r.is_negative(),
            _ => false,
        }
    }
}

impl core::fmt::Display for ConstValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstValue::Int(i) => write!(f, "{i}"),
            ConstValue::Rat(r) => write!(f, "{r}"),
            ConstValue::Bool(b) => write!(f, "{b}"),
            ConstValue::Str(s) => write!(f, "{s:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(v: i64) -> ConstValue {
        ConstValue::int(v)
    }

    #[test]
    fn integer_arithmetic_is_exact() {
        let r = ConstValue::binary(TokenKind::Add, &int(2), &int(3)).unwrap();
        assert_eq!(r, int(5));
        let r = ConstValue::binary(TokenKind::Mul, &int(1 << 40), &int(1 << 30)).unwrap();
        // No overflow at 2^70.
        assert_eq!(r.to_i64(), None);
        assert!(!r.is_zero());
    }

    #[test]
    fn exact_division_stays_integer() {
        let r = ConstValue::binary(TokenKind::Div, &int(10), &int(2)).unwrap();
        assert_eq!(r, int(5));
    }

    #[test]
    fn inexact_division_becomes_rational() {
        let r = ConstValue::binary(TokenKind::Div, &int(10), &int(3)).unwrap();
        assert!(matches!(r, ConstValue::Rat(_)));
        // Truncated toward zero as an int; rounded as a float.
        assert_eq!(r.to_i64(), Some(3));
        let f = r.to_f64().unwrap();
        assert!((f - 10.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn division_and_modulo_by_zero() {
        assert_eq!(
            ConstValue::binary(TokenKind::Div, &int(1), &int(0)),
            Err(ConstError::DivisionByZero)
        );
        assert_eq!(
            ConstValue::binary(TokenKind::Rem, &int(1), &int(0)),
            Err(ConstError::ModuloByZero)
        );
    }

    #[test]
    fn modulo_truncates_toward_zero() {
        let r = ConstValue::binary(TokenKind::Rem, &int(-7), &int(2)).unwrap();
        assert_eq!(r, int(-1));
    }

    #[test]
    fn parse_int_radices() {
        assert_eq!(ConstValue::parse_int("42"), Some(int(42)));
        assert_eq!(ConstValue::parse_int("007"), Some(int(7)));
        assert_eq!(ConstValue::parse_int("0x1F"), Some(int(31)));
        assert_eq!(ConstValue::parse_int("0o77"), Some(int(63)));
        assert_eq!(ConstValue::parse_int("0b1010"), Some(int(10)));
    }

    #[test]
    fn comparisons() {
        assert!(ConstValue::compare(TokenKind::Lss, &int(1), &int(2)).unwrap());
        assert!(ConstValue::compare(
            TokenKind::Eql,
            &ConstValue::parse_float("2.5").unwrap(),
            &ConstValue::Rat(BigRational::new(BigInt::from(5), BigInt::from(2)))
        )
        .unwrap());
        assert!(ConstValue::compare(
            TokenKind::Lss,
            &ConstValue::Str("a".into()),
            &ConstValue::Str("b".into())
        )
        .unwrap());
        assert!(
            ConstValue::compare(TokenKind::Lss, &ConstValue::Bool(true), &ConstValue::Bool(false))
                .is_err()
        );
    }

    #[test]
    fn mixed_int_and_float_promote() {
        let r = ConstValue::binary(
            TokenKind::Add,
            &int(1),
            &ConstValue::parse_float("0.5").unwrap(),
        )
        .unwrap();
        assert_eq!(r.to_f64(), Some(1.5));
    }

    #[test]
    fn string_concatenation() {
        let r = ConstValue::binary(
            TokenKind::Add,
            &ConstValue::Str("foo".into()),
            &ConstValue::Str("bar".into()),
        )
        .unwrap();
        assert_eq!(r, ConstValue::Str("foobar".into()));
    }
}
