//! Built-in logic combinators and flag sieves.

use std::collections::HashSet;
use std::fmt;

use serde_json::Value;

use super::sieve::{write_form, Sieve};
use super::state::SiftState;
use crate::error::EvalResult;

type Sieves<C> = Vec<Box<dyn Sieve<C>>>;

fn addresses(records: &[&Value]) -> HashSet<*const Value> {
    records.iter().map(|r| *r as *const Value).collect()
}

fn describe<C: ?Sized>(exprs: &[Box<dyn Sieve<C>>]) -> impl Iterator<Item = String> + '_ {
    exprs.iter().map(|e| format!("{:?}", e))
}

/// Runs a logic node against one record.
fn check_one<C: ?Sized, S: Sieve<C> + ?Sized>(
    sieve: &S,
    ctx: &C,
    state: &mut SiftState,
    record: &Value,
) -> EvalResult<bool> {
    Ok(!sieve.run(ctx, state, vec![record])?.is_empty())
}

// ==================== And ====================

/// `(and EXPR...)`: records passing every sub-expression.
///
/// Each sub-expression only sees the survivors of the one before it. With
/// no sub-expressions every record passes.
pub struct And<C: ?Sized> {
    exprs: Sieves<C>,
}

impl<C: ?Sized> And<C> {
    pub fn new(exprs: Sieves<C>) -> Self {
        Self { exprs }
    }

    pub fn exprs(&self) -> &[Box<dyn Sieve<C>>] {
        &self.exprs
    }
}

impl<C: ?Sized> Sieve<C> for And<C> {
    fn name(&self) -> &str {
        "and"
    }

    fn check(&self, ctx: &C, state: &mut SiftState, record: &Value) -> EvalResult<bool> {
        check_one(self, ctx, state, record)
    }

    fn run<'r>(
        &self,
        ctx: &C,
        state: &mut SiftState,
        records: Vec<&'r Value>,
    ) -> EvalResult<Vec<&'r Value>> {
        let mut work = records;
        for expr in &self.exprs {
            if work.is_empty() {
                break;
            }
            work = expr.sift(ctx, state, work)?;
        }
        Ok(work)
    }
}

impl<C: ?Sized> fmt::Debug for And<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_form(f, self.name(), describe(&self.exprs))
    }
}

// ==================== Or ====================

/// `(or EXPR...)`: records passing any sub-expression.
///
/// Each sub-expression only sees records not already matched, and
/// evaluation stops once every record has matched. Results are in match
/// order. With no sub-expressions nothing passes.
pub struct Or<C: ?Sized> {
    exprs: Sieves<C>,
}

impl<C: ?Sized> Or<C> {
    pub fn new(exprs: Sieves<C>) -> Self {
        Self { exprs }
    }

    pub fn exprs(&self) -> &[Box<dyn Sieve<C>>] {
        &self.exprs
    }
}

impl<C: ?Sized> Sieve<C> for Or<C> {
    fn name(&self) -> &str {
        "or"
    }

    fn check(&self, ctx: &C, state: &mut SiftState, record: &Value) -> EvalResult<bool> {
        check_one(self, ctx, state, record)
    }

    fn run<'r>(
        &self,
        ctx: &C,
        state: &mut SiftState,
        records: Vec<&'r Value>,
    ) -> EvalResult<Vec<&'r Value>> {
        let mut remaining = records;
        let mut matched = Vec::new();

        for expr in &self.exprs {
            if remaining.is_empty() {
                break;
            }
            let passed = expr.sift(ctx, state, remaining.clone())?;
            let found = addresses(&passed);
            remaining.retain(|r| !found.contains(&(*r as *const Value)));
            matched.extend(passed);
        }

        Ok(matched)
    }
}

impl<C: ?Sized> fmt::Debug for Or<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_form(f, self.name(), describe(&self.exprs))
    }
}

// ==================== Not ====================

/// `(not EXPR...)`: records passing none of the sub-expressions.
///
/// Each sub-expression removes its matches from the working set, so
/// `(not A B)` keeps records matching neither A nor B.
pub struct Not<C: ?Sized> {
    exprs: Sieves<C>,
}

impl<C: ?Sized> Not<C> {
    pub fn new(exprs: Sieves<C>) -> Self {
        Self { exprs }
    }

    pub fn exprs(&self) -> &[Box<dyn Sieve<C>>] {
        &self.exprs
    }
}

impl<C: ?Sized> Sieve<C> for Not<C> {
    fn name(&self) -> &str {
        "not"
    }

    fn check(&self, ctx: &C, state: &mut SiftState, record: &Value) -> EvalResult<bool> {
        check_one(self, ctx, state, record)
    }

    fn run<'r>(
        &self,
        ctx: &C,
        state: &mut SiftState,
        records: Vec<&'r Value>,
    ) -> EvalResult<Vec<&'r Value>> {
        let mut work = records;
        for expr in &self.exprs {
            if work.is_empty() {
                break;
            }
            let passed = expr.sift(ctx, state, work.clone())?;
            let found = addresses(&passed);
            work.retain(|r| !found.contains(&(*r as *const Value)));
        }
        Ok(work)
    }
}

impl<C: ?Sized> fmt::Debug for Not<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_form(f, self.name(), describe(&self.exprs))
    }
}

// ==================== Flags ====================

/// `(flag NAME EXPR...)`: like `and`, and marks every passing record with
/// NAME.
pub struct Flagger<C: ?Sized> {
    flag: String,
    inner: And<C>,
}

impl<C: ?Sized> Flagger<C> {
    pub fn new(flag: impl Into<String>, exprs: Sieves<C>) -> Self {
        Self {
            flag: flag.into(),
            inner: And::new(exprs),
        }
    }

    pub fn exprs(&self) -> &[Box<dyn Sieve<C>>] {
        self.inner.exprs()
    }
}

impl<C: ?Sized> Sieve<C> for Flagger<C> {
    fn name(&self) -> &str {
        "flag"
    }

    fn check(&self, ctx: &C, state: &mut SiftState, record: &Value) -> EvalResult<bool> {
        check_one(self, ctx, state, record)
    }

    fn run<'r>(
        &self,
        ctx: &C,
        state: &mut SiftState,
        records: Vec<&'r Value>,
    ) -> EvalResult<Vec<&'r Value>> {
        let passed = self.inner.run(ctx, state, records)?;
        for record in &passed {
            state.set_flag(&self.flag, record)?;
        }
        Ok(passed)
    }

    fn flag(&self) -> Option<&str> {
        Some(&self.flag)
    }
}

impl<C: ?Sized> fmt::Debug for Flagger<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = std::iter::once(self.flag.clone()).chain(describe(self.inner.exprs()));
        write_form(f, self.name(), parts)
    }
}

/// `(flagged NAME...)`: records already marked with any of the flags.
///
/// Only flags set by expressions evaluated earlier are visible.
#[derive(Clone)]
pub struct Flagged {
    names: Vec<String>,
}

impl Flagged {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl<C: ?Sized> Sieve<C> for Flagged {
    fn name(&self) -> &str {
        "flagged"
    }

    fn check(&self, _ctx: &C, state: &mut SiftState, record: &Value) -> EvalResult<bool> {
        for name in &self.names {
            if state.is_flagged(name, record)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl fmt::Debug for Flagged {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_form(f, "flagged", &self.names)
    }
}
