//! Compiled sieves and the sifter that evaluates them.
//!
//! A program is a series of top-level sieve expressions. Each is compiled
//! against a [`SieveRegistry`] into a tree of [`Sieve`] nodes, then run over
//! batches of JSON records by a [`Sifter`].
//!
//! # Built-in Sieves
//!
//! - `(and EXPR...)` - passes records passing every expression
//! - `(or EXPR...)` - passes records passing any expression
//! - `(not EXPR...)`, `(! EXPR...)` - passes records passing no expression
//! - `(flag NAME EXPR...)` - like `and`, marking passing records with NAME
//! - `(flagged NAME...)`, `(? NAME...)` - passes records already marked
//! - `(item PATH VALUE...)` - compares values found by an item path
//!
//! # Shorthand
//!
//! - `(not-FOO ARGS...)` and `(!FOO ARGS...)` mean `(not (FOO ARGS...))`
//! - `(FOO?)` means `(flagged FOO)`
//! - `(.path VALUE...)` means `(item .path VALUE...)`
//! - `key: value` inside a list is passed to the sieve as an option
//!
//! # Custom Sieves
//!
//! ```
//! use serde_json::{json, Value};
//! use sifty_rs::sifter::{SiftState, Sieve, SieveRegistry, Sifter};
//! use sifty_rs::EvalResult;
//!
//! #[derive(Debug)]
//! struct Above(i64);
//!
//! impl Sieve<()> for Above {
//!     fn name(&self) -> &str {
//!         "above"
//!     }
//!
//!     fn check(&self, _ctx: &(), _state: &mut SiftState, record: &Value) -> EvalResult<bool> {
//!         Ok(record["size"].as_i64().is_some_and(|size| size > self.0))
//!     }
//! }
//!
//! let mut registry = SieveRegistry::<()>::with_defaults();
//! registry.register("above", |args| {
//!     let limit = args.into_positional()?.remove(0).into_int()?;
//!     Ok(Box::new(Above(limit)))
//! });
//!
//! let mut sifter = Sifter::new(&registry, "(above 10)").unwrap();
//! let records = [json!({"id": 1, "size": 5}), json!({"id": 2, "size": 50})];
//! let results = sifter.evaluate(&(), &records).unwrap();
//! assert_eq!(results["default"], vec![&records[1]]);
//! ```

mod comparison;
mod engine;
mod items;
mod logic;
mod registry;
mod sieve;
mod state;

pub use comparison::Comparison;
pub use engine::{Sifter, DEFAULT_FLAG};
pub use items::{FieldSieve, ItemPathSieve};
pub use logic::{And, Flagged, Flagger, Not, Or};
pub use registry::{SieveFactory, SieveRegistry};
pub use sieve::{record_cache, Arg, Sieve, SieveArgs};
pub use state::{RecordId, SiftState};

#[cfg(test)]
mod tests;
