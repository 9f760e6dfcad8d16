//! Sieves that compare values found inside records.

use std::fmt;

use serde_json::Value;

use super::sieve::{write_form, Sieve};
use super::state::SiftState;
use crate::error::EvalResult;
use crate::parse::{ItemPath, Matcher};

/// `(item PATH VALUE...)`: records where any value reached by PATH matches
/// any VALUE.
///
/// With no VALUEs, records where PATH reaches any non-null value. A list
/// that starts with an item path, such as `(.keywords[] spicy)`, is
/// shorthand for this sieve.
#[derive(Clone)]
pub struct ItemPathSieve {
    path: ItemPath,
    values: Vec<Matcher>,
}

impl ItemPathSieve {
    pub fn new(path: ItemPath, values: Vec<Matcher>) -> Self {
        Self { path, values }
    }

    pub fn path(&self) -> &ItemPath {
        &self.path
    }

    pub fn values(&self) -> &[Matcher] {
        &self.values
    }
}

impl<C: ?Sized> Sieve<C> for ItemPathSieve {
    fn name(&self) -> &str {
        "item"
    }

    fn check(&self, _ctx: &C, _state: &mut SiftState, record: &Value) -> EvalResult<bool> {
        let found = self.path.get(record)?;

        if self.values.is_empty() {
            return Ok(found.iter().any(|v| !v.is_null()));
        }

        Ok(found
            .iter()
            .any(|v| self.values.iter().any(|m| m.matches(v))))
    }
}

impl fmt::Debug for ItemPathSieve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = std::iter::once(self.path.to_string())
            .chain(self.values.iter().map(ToString::to_string));
        write_form(f, "item", parts)
    }
}

/// A sieve comparing one top-level record field, registered under a
/// caller-chosen name with
/// [`SieveRegistry::register_field`](super::SieveRegistry::register_field).
///
/// `(NAME)` passes records whose field is present and not null.
/// `(NAME P...)` passes records whose field matches any of the patterns.
#[derive(Clone)]
pub struct FieldSieve {
    name: String,
    field: String,
    patterns: Vec<Matcher>,
}

impl FieldSieve {
    pub fn new(name: impl Into<String>, field: impl Into<String>, patterns: Vec<Matcher>) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
            patterns,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn patterns(&self) -> &[Matcher] {
        &self.patterns
    }
}

impl<C: ?Sized> Sieve<C> for FieldSieve {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, _ctx: &C, _state: &mut SiftState, record: &Value) -> EvalResult<bool> {
        let value = record.get(self.field.as_str());

        if self.patterns.is_empty() {
            return Ok(value.is_some_and(|v| !v.is_null()));
        }

        Ok(value.is_some_and(|v| self.patterns.iter().any(|p| p.matches(v))))
    }
}

impl fmt::Debug for FieldSieve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_form(f, &self.name, &self.patterns)
    }
}
