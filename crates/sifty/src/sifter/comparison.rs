//! Comparison operators for sieves that compare quantities.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{SifterError, SifterResult};

/// A comparison operator written as a symbol: `==`, `!=`, `>`, `>=`, `<`,
/// or `<=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Comparison {
    /// Converts an operator symbol.
    ///
    /// # Errors
    ///
    /// Returns `SifterError::InvalidComparison` for anything else.
    pub fn from_symbol(op: &str) -> SifterResult<Self> {
        match op {
            "==" => Ok(Comparison::Eq),
            "!=" => Ok(Comparison::Ne),
            ">" => Ok(Comparison::Gt),
            ">=" => Ok(Comparison::Ge),
            "<" => Ok(Comparison::Lt),
            "<=" => Ok(Comparison::Le),
            _ => Err(SifterError::InvalidComparison { op: op.to_string() }),
        }
    }

    /// The operator symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            Comparison::Eq => "==",
            Comparison::Ne => "!=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
            Comparison::Lt => "<",
            Comparison::Le => "<=",
        }
    }

    /// Applies the operator as `left OP right`. Incomparable values (such
    /// as NaN) only satisfy `!=`.
    pub fn compare<T: PartialOrd + ?Sized>(&self, left: &T, right: &T) -> bool {
        match left.partial_cmp(right) {
            Some(ordering) => self.holds(ordering),
            None => *self == Comparison::Ne,
        }
    }

    fn holds(&self, ordering: Ordering) -> bool {
        match self {
            Comparison::Eq => ordering == Ordering::Equal,
            Comparison::Ne => ordering != Ordering::Equal,
            Comparison::Gt => ordering == Ordering::Greater,
            Comparison::Ge => ordering != Ordering::Less,
            Comparison::Lt => ordering == Ordering::Less,
            Comparison::Le => ordering != Ordering::Greater,
        }
    }
}

impl FromStr for Comparison {
    type Err = SifterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Comparison::from_symbol(s)
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
