//! Name to constructor table for sieves.

use std::collections::HashMap;
use std::fmt;

use super::items::{FieldSieve, ItemPathSieve};
use super::logic::{And, Flagged, Flagger, Not, Or};
use super::sieve::{Sieve, SieveArgs};
use crate::error::SifterResult;

/// Builds a sieve from its converted arguments.
pub type SieveFactory<C> = Box<dyn Fn(SieveArgs<C>) -> SifterResult<Box<dyn Sieve<C>>>>;

/// The set of sieves a sifter program may invoke.
///
/// Names are resolved once, at compile time.
///
/// # Example
///
/// ```
/// use sifty_rs::{SieveRegistry, Sifter};
/// use serde_json::json;
///
/// let mut registry = SieveRegistry::<()>::with_defaults();
/// registry.register_field("name", "name");
///
/// let mut sifter = Sifter::new(&registry, "(name Pizza)").unwrap();
/// let records = [json!({"id": 1, "name": "Pizza"}), json!({"id": 2, "name": "Tacos"})];
/// let results = sifter.evaluate(&(), &records).unwrap();
/// assert_eq!(results["default"], vec![&records[0]]);
/// ```
pub struct SieveRegistry<C: ?Sized> {
    factories: HashMap<String, SieveFactory<C>>,
    aliases: HashMap<String, String>,
}

impl<C: ?Sized + 'static> SieveRegistry<C> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            aliases: HashMap::new(),
        }
    }

    /// Creates a registry with the built-in sieves: `and`, `or`, `not`
    /// (alias `!`), `flag`, `flagged` (alias `?`), and `item`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register("and", |args| Ok(Box::new(And::new(args.sieves()?))));
        registry.register("or", |args| Ok(Box::new(Or::new(args.sieves()?))));
        registry.register("not", |args| Ok(Box::new(Not::new(args.sieves()?))));
        registry.alias("!", "not");

        registry.register("flag", |args| {
            let missing = args.arity_error("missing required argument NAME");
            let mut positional = args.into_positional()?.into_iter();
            let flag = positional.next().ok_or(missing)?.into_symbol()?;
            let exprs = positional
                .map(|arg| arg.into_sieve())
                .collect::<SifterResult<Vec<_>>>()?;
            Ok(Box::new(Flagger::new(flag, exprs)))
        });

        registry.register("flagged", |args| {
            if args.is_empty() {
                return Err(args.arity_error("requires at least one flag NAME"));
            }
            Ok(Box::new(Flagged::new(args.symbols(false)?)))
        });
        registry.alias("?", "flagged");

        registry.register("item", |args| {
            let missing = args.arity_error("missing required argument PATH");
            let mut positional = args.into_positional()?.into_iter();
            let path = positional.next().ok_or(missing)?.into_path()?;
            let values = positional
                .map(|arg| arg.into_matcher())
                .collect::<SifterResult<Vec<_>>>()?;
            Ok(Box::new(ItemPathSieve::new(path, values)))
        });

        registry
    }

    /// Registers a constructor under `name`, replacing any previous one.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(SieveArgs<C>) -> SifterResult<Box<dyn Sieve<C>>> + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    /// Makes `alias` resolve to the sieve registered as `target`.
    pub fn alias(&mut self, alias: impl Into<String>, target: impl Into<String>) {
        self.aliases.insert(alias.into(), target.into());
    }

    /// Registers a [`FieldSieve`] comparing the record field `field`.
    pub fn register_field(&mut self, name: impl Into<String>, field: impl Into<String>) {
        let name = name.into();
        let field = field.into();
        let sieve_name = name.clone();
        self.register(name, move |args| {
            Ok(Box::new(FieldSieve::new(
                sieve_name.clone(),
                field.clone(),
                args.matchers()?,
            )))
        });
    }

    /// Looks up the constructor for a name or alias.
    pub fn get(&self, name: &str) -> Option<&SieveFactory<C>> {
        self.factories.get(name).or_else(|| {
            self.aliases
                .get(name)
                .and_then(|target| self.factories.get(target))
        })
    }

    /// Returns true if the name or alias resolves to a constructor.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Every registered name and alias, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .factories
            .keys()
            .chain(self.aliases.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }
}

impl<C: ?Sized + 'static> Default for SieveRegistry<C> {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl<C: ?Sized> fmt::Debug for SieveRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("SieveRegistry")
            .field("sieves", &names)
            .field("aliases", &self.aliases)
            .finish()
    }
}
