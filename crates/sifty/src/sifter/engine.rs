//! Compilation of parsed programs into sieves, and batch evaluation.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde_json::Value;
use tracing::{debug, trace};

use super::registry::SieveRegistry;
use super::sieve::{Arg, Sieve, SieveArgs};
use super::state::{RecordId, SiftState};
use crate::config::SifterConfig;
use crate::error::{EvalResult, SifterError, SifterResult};
use crate::parse::{convert_token, is_truthy, Expr, Matcher, Parser};

/// Flag collecting the matches of every top-level expression that is not a
/// `(flag ...)` form.
pub const DEFAULT_FLAG: &str = "default";

/// A compiled sifter program together with its flag and cache state.
///
/// Compilation is all-or-nothing: any parse or sieve construction error
/// is returned from [`Sifter::new`] before a record is ever seen.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use sifty_rs::{SieveRegistry, Sifter};
///
/// let mut registry = SieveRegistry::<()>::with_defaults();
/// registry.register_field("type", "type");
///
/// let mut sifter = Sifter::new(&registry, r#"
///     (flag munch (type food))
///     (flag gulp (type drink))
/// "#).unwrap();
///
/// let records = vec![
///     json!({"id": 1, "type": "food"}),
///     json!({"id": 2, "type": "drink"}),
/// ];
/// let results = sifter.evaluate(&(), &records).unwrap();
/// assert_eq!(results["munch"], vec![&records[0]]);
/// assert_eq!(results["gulp"], vec![&records[1]]);
/// assert!(!results.contains_key("default"));
/// ```
pub struct Sifter<C: ?Sized> {
    exprs: Vec<Box<dyn Sieve<C>>>,
    state: SiftState,
}

impl<C: ?Sized + 'static> Sifter<C> {
    /// Compiles `source` against the registry with default settings.
    ///
    /// # Errors
    ///
    /// Returns `SifterError::Parse` for malformed source, or another
    /// `SifterError` for unknown sieves and bad sieve arguments.
    pub fn new(registry: &SieveRegistry<C>, source: &str) -> SifterResult<Self> {
        Self::with_config(registry, source, &SifterConfig::default())
    }

    /// Compiles `source` using the identifier field, parameters, and depth
    /// limit from `config`.
    pub fn with_config(
        registry: &SieveRegistry<C>,
        source: &str,
        config: &SifterConfig,
    ) -> SifterResult<Self> {
        let parsed = Parser::new(source)
            .with_max_depth(config.max_depth)
            .parse_all()?;

        let compiler = Compiler {
            registry,
            params: &config.params,
        };

        let exprs = parsed
            .into_iter()
            .map(|expr| compiler.compile(expr))
            .collect::<SifterResult<Vec<_>>>()?;

        debug!(
            sieves = exprs.len(),
            id_key = %config.id_key,
            "compiled sifter program"
        );

        Ok(Self {
            exprs,
            state: SiftState::new(config.id_key.clone()),
        })
    }
}

impl<C: ?Sized> Sifter<C> {
    /// The compiled top-level sieves, in program order.
    pub fn sieve_exprs(&self) -> &[Box<dyn Sieve<C>>] {
        &self.exprs
    }

    /// Flag and cache state from the most recent evaluation.
    pub fn state(&self) -> &SiftState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SiftState {
        &mut self.state
    }

    /// Clears every flag and cache entry.
    pub fn reset(&mut self) {
        self.state.reset();
    }

    /// Runs the program over a batch of records, returning each flag's
    /// matching records in the order they were flagged.
    ///
    /// Falsy records are ignored. Records sharing an identifier are
    /// collapsed into one, keeping the first position and the last record.
    /// Flags from any previous evaluation are cleared first; caches are
    /// kept until [`reset`](Sifter::reset).
    ///
    /// # Errors
    ///
    /// Returns `EvalError::MissingId` or `EvalError::InvalidId` for records
    /// without a usable identifier, and passes through any error raised by
    /// a sieve.
    pub fn evaluate<'r, I>(
        &mut self,
        ctx: &C,
        records: I,
    ) -> EvalResult<BTreeMap<String, Vec<&'r Value>>>
    where
        I: IntoIterator<Item = &'r Value>,
    {
        let mut records = records.into_iter().peekable();
        if records.peek().is_none() {
            return Ok(BTreeMap::new());
        }

        self.state.clear_flags();

        let mut index: HashMap<RecordId, usize> = HashMap::new();
        let mut work: Vec<&'r Value> = Vec::new();
        for record in records.filter(|r| is_truthy(r)) {
            match index.entry(self.state.record_id(record)?) {
                Entry::Occupied(slot) => work[*slot.get()] = record,
                Entry::Vacant(slot) => {
                    slot.insert(work.len());
                    work.push(record);
                }
            }
        }

        for expr in &self.exprs {
            let passed = expr.sift(ctx, &mut self.state, work.clone())?;
            trace!(
                sieve = expr.name(),
                flag = expr.flag().unwrap_or(DEFAULT_FLAG),
                passed = passed.len(),
                "evaluated top-level sieve"
            );

            if expr.flag().is_none() {
                for record in passed {
                    self.state.set_flag(DEFAULT_FLAG, record)?;
                }
            }
        }

        let mut results = BTreeMap::new();
        for flag in self.state.flag_names() {
            let matched: Vec<&'r Value> = self
                .state
                .flagged_ids(flag)
                .iter()
                .filter_map(|id| index.get(id).map(|&i| work[i]))
                .collect();
            results.insert(flag.to_string(), matched);
        }

        debug!(
            records = work.len(),
            flags = results.len(),
            "sifted records"
        );

        Ok(results)
    }
}

impl<C: ?Sized> fmt::Debug for Sifter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sifter")
            .field("exprs", &self.exprs)
            .field("state", &self.state)
            .finish()
    }
}

// ==================== Compilation ====================

struct Compiler<'a, C: ?Sized> {
    registry: &'a SieveRegistry<C>,
    params: &'a HashMap<String, String>,
}

impl<C: ?Sized + 'static> Compiler<'_, C> {
    /// Compiles one top-level expression, which must be a sieve.
    fn compile(&self, expr: Expr) -> SifterResult<Box<dyn Sieve<C>>> {
        self.convert(expr)?.into_sieve()
    }

    fn convert(&self, expr: Expr) -> SifterResult<Arg<C>> {
        match expr {
            Expr::List(items) => self.convert_list(items).map(Arg::Sieve),
            Expr::Path(path) => Ok(Arg::Path(path)),
            Expr::Matcher(matcher) => self.substitute(matcher).map(Arg::Matcher),
        }
    }

    /// Applies `$NAME` and `{NAME}` parameter substitution.
    fn substitute(&self, matcher: Matcher) -> SifterResult<Matcher> {
        match matcher {
            Matcher::Symbol(sym) => match sym.strip_prefix('$').and_then(|n| self.params.get(n)) {
                Some(value) => Ok(convert_token(value)?),
                None => Ok(Matcher::Symbol(sym)),
            },
            Matcher::Str(text) if text.contains('{') => {
                Ok(Matcher::Str(format_params(&text, self.params)?))
            }
            other => Ok(other),
        }
    }

    fn convert_list(&self, items: Vec<Expr>) -> SifterResult<Box<dyn Sieve<C>>> {
        let mut items = items.into_iter();
        let (name, args) = match items.next() {
            None => return Err(SifterError::EmptyExpression),
            Some(head @ Expr::Path(_)) => {
                let args = std::iter::once(head).chain(items).collect();
                ("item".to_string(), args)
            }
            Some(Expr::Matcher(Matcher::Symbol(name))) => (name, items.collect()),
            Some(other) => {
                return Err(SifterError::invalid_argument(
                    "Sieve names must be symbols",
                    other.to_string(),
                ))
            }
        };

        let (factory, args) = match self.registry.get(&name) {
            Some(factory) => (factory, args),
            None => {
                let (alias, args) = rewrite_alias(&name, args);
                match self.registry.get(&alias) {
                    Some(factory) => (factory, args),
                    None => return Err(SifterError::unknown_sieve(name)),
                }
            }
        };

        let (positional, options) = self.gather_args(args)?;
        trace!(sieve = %name, args = positional.len(), options = options.len(), "building sieve");

        factory(SieveArgs::new(name, positional, options))
    }

    /// Converts arguments, splitting out `key: value` options.
    #[allow(clippy::type_complexity)]
    fn gather_args(&self, args: Vec<Expr>) -> SifterResult<(Vec<Arg<C>>, Vec<(String, Arg<C>)>)> {
        let mut positional = Vec::new();
        let mut options: Vec<(String, Arg<C>)> = Vec::new();

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match self.convert(arg)? {
                Arg::Matcher(Matcher::Symbol(sym)) if sym.ends_with(':') => {
                    let key = sym.trim_end_matches(':').to_string();
                    let value = match args.next() {
                        Some(value) => self.convert(value)?,
                        None => return Err(SifterError::MissingKeywordValue { key }),
                    };
                    options.retain(|(k, _)| *k != key);
                    options.push((key, value));
                }
                other => positional.push(other),
            }
        }

        Ok((positional, options))
    }
}

/// Rewrites the shorthand forms `(not-FOO ...)`, `(!FOO ...)`, and `(FOO?)`.
/// Names that are not shorthand come back unchanged.
fn rewrite_alias(name: &str, args: Vec<Expr>) -> (String, Vec<Expr>) {
    let negated = name.strip_prefix("not-").or_else(|| name.strip_prefix('!'));
    if let Some(inner) = negated {
        let mut sub = vec![Expr::symbol(inner)];
        sub.extend(args);
        return ("not".to_string(), vec![Expr::List(sub)]);
    }

    if let Some(flag) = name.strip_suffix('?') {
        if args.is_empty() {
            return ("flagged".to_string(), vec![Expr::symbol(flag)]);
        }
    }

    (name.to_string(), args)
}

/// Replaces `{NAME}` references with parameter values. `{{` and `}}` stand
/// for literal braces.
fn format_params(text: &str, params: &HashMap<String, String>) -> SifterResult<String> {
    let invalid = |message: &str| SifterError::InvalidFormat {
        text: text.to_string(),
        message: message.to_string(),
    };

    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') => return Err(invalid("unexpected '{' in field name")),
                        Some(c) => name.push(c),
                        None => return Err(invalid("expected '}' before end of string")),
                    }
                }
                match params.get(&name) {
                    Some(value) => out.push_str(value),
                    None => return Err(SifterError::UnknownParam { name }),
                }
            }
            '}' => return Err(invalid("single '}' encountered")),
            c => out.push(c),
        }
    }

    Ok(out)
}
