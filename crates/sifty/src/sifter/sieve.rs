//! The sieve predicate contract and its constructor arguments.

use std::fmt;

use serde_json::Value;

use super::comparison::Comparison;
use super::state::{RecordId, SiftState};
use crate::error::{EvalResult, SifterError, SifterResult};
use crate::parse::{ItemPath, Matcher, PathElement};

/// A compiled predicate node.
///
/// Implementors usually provide only [`check`](Sieve::check), plus
/// [`prep`](Sieve::prep) when a whole batch can be loaded in one go. The
/// default [`run`](Sieve::run) calls `prep` once and then `check` on every
/// record. `C` is the caller's context, passed through untouched.
///
/// `Debug` should render the sieve in source form, e.g. `(name Pizza)`.
pub trait Sieve<C: ?Sized>: fmt::Debug {
    /// The name this sieve is invoked by.
    fn name(&self) -> &str;

    /// Returns true if the record passes this predicate.
    fn check(&self, ctx: &C, state: &mut SiftState, record: &Value) -> EvalResult<bool>;

    /// Bulk pre-pass over the batch before any `check` call.
    fn prep(&self, _ctx: &C, _state: &mut SiftState, _records: &[&Value]) -> EvalResult<()> {
        Ok(())
    }

    /// Selects the passing subset of `records`, preserving order.
    fn run<'r>(
        &self,
        ctx: &C,
        state: &mut SiftState,
        records: Vec<&'r Value>,
    ) -> EvalResult<Vec<&'r Value>> {
        self.prep(ctx, state, &records)?;

        let mut passed = Vec::with_capacity(records.len());
        for record in records {
            if self.check(ctx, state, record)? {
                passed.push(record);
            }
        }
        Ok(passed)
    }

    /// Runs the sieve, skipping it entirely for an empty batch.
    fn sift<'r>(
        &self,
        ctx: &C,
        state: &mut SiftState,
        records: Vec<&'r Value>,
    ) -> EvalResult<Vec<&'r Value>> {
        if records.is_empty() {
            return Ok(records);
        }
        self.run(ctx, state, records)
    }

    /// The flag this sieve assigns, for top-level flagging sieves.
    fn flag(&self) -> Option<&str> {
        None
    }

    /// Cache namespace used by [`cache`](Sieve::cache) helpers. Sieves
    /// sharing a group share cache maps.
    fn cache_group(&self) -> &str {
        self.name()
    }
}

/// Per-record cache map for a sieve, keyed by its [`cache_group`](Sieve::cache_group).
pub fn record_cache<'s, C: ?Sized>(
    sieve: &dyn Sieve<C>,
    state: &'s mut SiftState,
    record: &Value,
) -> EvalResult<&'s mut serde_json::Map<String, Value>> {
    state.record_cache(sieve.cache_group(), record)
}

/// Writes `(head part part...)`.
pub(crate) fn write_form<I, T>(f: &mut fmt::Formatter<'_>, head: &str, parts: I) -> fmt::Result
where
    I: IntoIterator<Item = T>,
    T: fmt::Display,
{
    write!(f, "({}", head)?;
    for part in parts {
        write!(f, " {}", part)?;
    }
    write!(f, ")")
}

// ==================== Arguments ====================

/// A converted sieve argument.
pub enum Arg<C: ?Sized> {
    /// A literal.
    Matcher(Matcher),

    /// An item path.
    Path(ItemPath),

    /// A nested sieve invocation.
    Sieve(Box<dyn Sieve<C>>),
}

impl<C: ?Sized> Arg<C> {
    /// Short name of the argument's type, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Arg::Matcher(m) => m.kind(),
            Arg::Path(_) => "item path",
            Arg::Sieve(_) => "sieve",
        }
    }

    fn invalid(&self, message: &str) -> SifterError {
        SifterError::invalid_argument(message, format!("{} (type {})", self, self.kind()))
    }

    /// Requires a bare symbol.
    pub fn into_symbol(self) -> SifterResult<String> {
        match self {
            Arg::Matcher(Matcher::Symbol(s)) => Ok(s),
            other => Err(other.invalid("Value must be a symbol")),
        }
    }

    /// Requires an integer, symbol, or quoted string, returned as text.
    pub fn into_string(self) -> SifterResult<String> {
        match self {
            Arg::Matcher(Matcher::Symbol(s)) | Arg::Matcher(Matcher::Str(s)) => Ok(s),
            Arg::Matcher(Matcher::Number(n)) => Ok(n.to_string()),
            other => Err(other.invalid("Value must be a string")),
        }
    }

    /// Requires an integer.
    pub fn into_int(self) -> SifterResult<i64> {
        match self {
            Arg::Matcher(Matcher::Number(n)) => Ok(n),
            other => Err(other.invalid("Value must be an int")),
        }
    }

    /// Requires an integer, symbol, or quoted string, keeping integers as
    /// integers. Suited to arguments naming records by ID or by name.
    pub fn into_int_or_str(self) -> SifterResult<RecordId> {
        match self {
            Arg::Matcher(Matcher::Number(n)) => Ok(RecordId::Int(n)),
            Arg::Matcher(Matcher::Symbol(s)) | Arg::Matcher(Matcher::Str(s)) => Ok(RecordId::Str(s)),
            other => Err(other.invalid("Value must be an int, Number, str, or Symbol")),
        }
    }

    /// Requires a literal.
    pub fn into_matcher(self) -> SifterResult<Matcher> {
        match self {
            Arg::Matcher(m) => Ok(m),
            other => Err(other.invalid("Value must be a string, regex, or glob")),
        }
    }

    /// Requires a nested sieve.
    pub fn into_sieve(self) -> SifterResult<Box<dyn Sieve<C>>> {
        match self {
            Arg::Sieve(sieve) => Ok(sieve),
            other => Err(other.invalid("Value must be a sieve expression")),
        }
    }

    /// Requires an item path; a single key literal becomes a one-step path.
    pub fn into_path(self) -> SifterResult<ItemPath> {
        match self {
            Arg::Path(path) => Ok(path),
            Arg::Matcher(m) => Ok(ItemPath::new(vec![PathElement::from_matcher(m)?])),
            other => Err(other.invalid("Value must be an item path")),
        }
    }

    /// Requires a comparison operator such as `>=`.
    pub fn into_comparison(self) -> SifterResult<Comparison> {
        match self {
            Arg::Matcher(Matcher::Symbol(s)) | Arg::Matcher(Matcher::Str(s)) => {
                Comparison::from_symbol(&s)
            }
            other => Err(SifterError::InvalidComparison {
                op: other.to_string(),
            }),
        }
    }
}

impl<C: ?Sized> fmt::Display for Arg<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Matcher(m) => write!(f, "{}", m),
            Arg::Path(p) => write!(f, "{}", p),
            Arg::Sieve(s) => write!(f, "{:?}", s),
        }
    }
}

impl<C: ?Sized> fmt::Debug for Arg<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// Arguments handed to a sieve constructor.
///
/// Positional arguments keep their source order. `key: value` pairs are
/// collected separately as options.
#[derive(Debug)]
pub struct SieveArgs<C: ?Sized> {
    name: String,
    positional: Vec<Arg<C>>,
    options: Vec<(String, Arg<C>)>,
}

impl<C: ?Sized> SieveArgs<C> {
    /// Creates a set of arguments for the named sieve.
    pub fn new(name: impl Into<String>, positional: Vec<Arg<C>>, options: Vec<(String, Arg<C>)>) -> Self {
        Self {
            name: name.into(),
            positional,
            options,
        }
    }

    /// The name the sieve is being constructed under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The positional arguments.
    pub fn positional(&self) -> &[Arg<C>] {
        &self.positional
    }

    /// Number of positional arguments.
    pub fn len(&self) -> usize {
        self.positional.len()
    }

    /// Returns true if there are no positional arguments.
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty()
    }

    /// Removes and returns the named option, if given.
    pub fn take_option(&mut self, key: &str) -> Option<Arg<C>> {
        let index = self.options.iter().position(|(k, _)| k == key)?;
        Some(self.options.remove(index).1)
    }

    /// Fails if any option remains unconsumed.
    pub fn no_options(&self) -> SifterResult<()> {
        match self.options.first() {
            Some((key, _)) => Err(SifterError::UnexpectedOption {
                sieve: self.name.clone(),
                key: key.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Builds an arity error for this sieve.
    pub fn arity_error(&self, message: impl Into<String>) -> SifterError {
        SifterError::arity(self.name.clone(), message)
    }

    /// Returns the positional arguments, failing if options remain.
    pub fn into_positional(self) -> SifterResult<Vec<Arg<C>>> {
        self.no_options()?;
        Ok(self.positional)
    }

    /// Requires every positional argument to be a symbol. With `expand`,
    /// symbol groups contribute each of their expansions.
    pub fn symbols(self, expand: bool) -> SifterResult<Vec<String>> {
        let mut result = Vec::new();
        for arg in self.into_positional()? {
            match arg {
                Arg::Matcher(Matcher::SymbolGroup(group)) if expand => {
                    result.extend(group.expansions().map(|m| m.to_string()));
                }
                other => result.push(other.into_symbol()?),
            }
        }
        Ok(result)
    }

    /// Requires every positional argument to be a literal.
    pub fn matchers(self) -> SifterResult<Vec<Matcher>> {
        self.into_positional()?
            .into_iter()
            .map(Arg::into_matcher)
            .collect()
    }

    /// Requires every positional argument to be a nested sieve.
    pub fn sieves(self) -> SifterResult<Vec<Box<dyn Sieve<C>>>> {
        self.into_positional()?
            .into_iter()
            .map(Arg::into_sieve)
            .collect()
    }

    /// Requires every positional argument to be an integer or text.
    pub fn int_or_strs(self) -> SifterResult<Vec<RecordId>> {
        self.into_positional()?
            .into_iter()
            .map(Arg::into_int_or_str)
            .collect()
    }
}
