//! Path expressions for reaching into nested records.

use std::fmt;

use serde_json::Value;

use super::matcher::Matcher;
use crate::error::{EvalError, EvalResult, ParseResult, ParserError};

/// A key used by [`PathElement::Item`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathKey {
    /// An object key.
    Str(String),

    /// An array index (negative counts from the end), or an object key
    /// written as an integer.
    Int(i64),

    /// A range of array elements.
    Slice(Slice),
}

/// One step of an [`ItemPath`].
#[derive(Debug, Clone, PartialEq)]
pub enum PathElement {
    /// Exact key, index, or slice lookup. Missing keys and out of range
    /// indices produce nothing.
    Item(PathKey),

    /// Every entry whose key (or array index) matches.
    ItemMatch(Matcher),

    /// Every object value or array element.
    AllItems,
}

impl PathElement {
    /// Converts a literal into a path element.
    ///
    /// Symbols and strings become object keys, numbers become indices, and
    /// the pattern-like matchers select by key match.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::InvalidPathElement` for booleans.
    pub fn from_matcher(matcher: Matcher) -> ParseResult<Self> {
        match matcher {
            Matcher::Symbol(s) | Matcher::Str(s) => Ok(PathElement::Item(PathKey::Str(s))),
            Matcher::Number(n) => Ok(PathElement::Item(PathKey::Int(n))),
            Matcher::Bool(_) => Err(ParserError::InvalidPathElement {
                element: matcher.to_string(),
            }),
            other => Ok(PathElement::ItemMatch(other)),
        }
    }

    fn collect<'a>(&self, value: &'a Value, out: &mut Vec<&'a Value>) -> EvalResult<()> {
        match (self, value) {
            (PathElement::Item(PathKey::Str(key)), Value::Object(map)) => {
                out.extend(map.get(key));
            }
            (PathElement::Item(PathKey::Int(key)), Value::Object(map)) => {
                out.extend(map.get(&key.to_string()));
            }
            (PathElement::Item(PathKey::Int(index)), Value::Array(items)) => {
                let len = items.len() as i64;
                let index = if *index < 0 { len + index } else { *index };
                if (0..len).contains(&index) {
                    out.push(&items[index as usize]);
                }
            }
            (PathElement::Item(PathKey::Slice(slice)), Value::Array(items)) => {
                for index in slice.indices(items.len())? {
                    out.push(&items[index]);
                }
            }
            (PathElement::ItemMatch(matcher), Value::Object(map)) => {
                for (key, val) in map {
                    if matcher.matches(&Value::String(key.clone())) {
                        out.push(val);
                    }
                }
            }
            (PathElement::ItemMatch(matcher), Value::Array(items)) => {
                for (index, val) in items.iter().enumerate() {
                    if matcher.matches(&Value::from(index)) {
                        out.push(val);
                    }
                }
            }
            (PathElement::AllItems, Value::Object(map)) => out.extend(map.values()),
            (PathElement::AllItems, Value::Array(items)) => out.extend(items),
            (element, other) => {
                return Err(EvalError::PathType {
                    element: element.to_string(),
                    found: json_type(other),
                })
            }
        }
        Ok(())
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathElement::Item(PathKey::Str(key)) => write!(f, ".{}", key),
            PathElement::Item(PathKey::Int(index)) => write!(f, "[{}]", index),
            PathElement::Item(PathKey::Slice(slice)) => write!(f, "[{}]", slice),
            PathElement::ItemMatch(matcher) => write!(f, "[{}]", matcher),
            PathElement::AllItems => write!(f, "[]"),
        }
    }
}

// ==================== Slices ====================

/// A `start:stop:step` array slice with Python-style bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Slice {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: Option<i64>,
}

impl Slice {
    /// Parses slice text such as `1:`, `:-1`, or `::2`.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::InvalidSlice` if a bound is not an integer.
    pub fn parse(text: &str) -> ParseResult<Self> {
        let invalid = || ParserError::InvalidSlice {
            text: text.to_string(),
        };

        let mut bounds = Vec::with_capacity(3);
        for part in text.split(':') {
            if part.is_empty() {
                bounds.push(None);
            } else {
                bounds.push(Some(part.parse::<i64>().map_err(|_| invalid())?));
            }
        }

        match bounds.as_slice() {
            [start, stop] => Ok(Self {
                start: *start,
                stop: *stop,
                step: None,
            }),
            [start, stop, step] => Ok(Self {
                start: *start,
                stop: *stop,
                step: *step,
            }),
            _ => Err(invalid()),
        }
    }

    /// Resolves the slice against a sequence length into concrete indices.
    ///
    /// # Errors
    ///
    /// Returns `EvalError::ZeroSliceStep` if the step is zero.
    pub fn indices(&self, len: usize) -> EvalResult<Vec<usize>> {
        let step = self.step.unwrap_or(1);
        if step == 0 {
            return Err(EvalError::ZeroSliceStep);
        }

        let len = len as i64;
        let (lower, upper) = if step > 0 { (0, len) } else { (-1, len - 1) };
        let clamp = |bound: i64| {
            if bound < 0 {
                (bound + len).max(lower)
            } else {
                bound.min(upper)
            }
        };

        let start = self
            .start
            .map(clamp)
            .unwrap_or(if step > 0 { lower } else { upper });
        let stop = self
            .stop
            .map(clamp)
            .unwrap_or(if step > 0 { upper } else { lower });

        let mut indices = Vec::new();
        let mut i = start;
        while (step > 0 && i < stop) || (step < 0 && i > stop) {
            indices.push(i as usize);
            match i.checked_add(step) {
                Some(next) => i = next,
                None => break,
            }
        }
        Ok(indices)
    }
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |bound: Option<i64>| bound.map(|b| b.to_string()).unwrap_or_default();
        write!(f, "{}:{}", show(self.start), show(self.stop))?;
        if self.step.is_some() {
            write!(f, ":{}", show(self.step))?;
        }
        Ok(())
    }
}

/// Returns true for text shaped like a slice: two or three `:`-separated
/// parts, each an optionally signed run of digits.
pub(crate) fn is_slice_like(text: &str) -> bool {
    let parts: Vec<&str> = text.split(':').collect();
    (2..=3).contains(&parts.len())
        && parts.iter().all(|part| {
            let digits = part.strip_prefix(['+', '-']).unwrap_or(part);
            digits.bytes().all(|b| b.is_ascii_digit())
        })
}

// ==================== Item Paths ====================

/// A sequence of path elements evaluated against a record.
///
/// `.keywords[0]` is `[Item("keywords"), Item(0)]`; `.tags[]` selects every
/// tag. Each step is applied to every value reached by the previous step,
/// skipping empty or null intermediates.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemPath {
    elements: Vec<PathElement>,
}

impl ItemPath {
    /// Creates a path from its elements.
    pub fn new(elements: Vec<PathElement>) -> Self {
        Self { elements }
    }

    /// The path elements in order.
    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    /// Collects every value reachable from `data` along this path.
    ///
    /// # Errors
    ///
    /// Returns `EvalError::PathType` when an element is applied to a value
    /// of the wrong shape (for example an index into a string), and
    /// `EvalError::ZeroSliceStep` for a zero-step slice.
    pub fn get<'a>(&self, data: &'a Value) -> EvalResult<Vec<&'a Value>> {
        let mut work = vec![data];
        for element in &self.elements {
            let mut next = Vec::new();
            for value in work.into_iter().filter(|v| is_truthy(v)) {
                element.collect(value, &mut next)?;
            }
            work = next;
        }
        Ok(work)
    }
}

impl fmt::Display for ItemPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for element in &self.elements {
            write!(f, "{}", element)?;
        }
        Ok(())
    }
}

/// JSON truthiness: null, false, zero, and empty containers are false.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Name of a value's JSON type, for error messages.
pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
