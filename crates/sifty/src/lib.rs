//! A small s-expression language for selecting and flagging structured
//! records.
//!
//! Programs are written as s-expressions such as
//! `(flag good (or (type food) (not (name Draino))))`, compiled once
//! against a registry of named predicates ("sieves"), and then evaluated
//! over batches of JSON records. Every top-level expression contributes
//! its matches to a named flag; plain expressions feed the `default` flag.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use sifty_rs::{SieveRegistry, Sifter};
//!
//! let mut registry = SieveRegistry::<()>::with_defaults();
//! registry.register_field("name", "name");
//! registry.register_field("type", "type");
//!
//! let mut sifter = Sifter::new(
//!     &registry,
//!     "(flag good (or (type food) (and (type drink) (not (name Draino)))))",
//! )
//! .unwrap();
//!
//! let records = vec![
//!     json!({"id": 1, "name": "Tacos", "type": "food"}),
//!     json!({"id": 2, "name": "Beer", "type": "drink"}),
//!     json!({"id": 3, "name": "Draino", "type": "drink"}),
//! ];
//!
//! let results = sifter.evaluate(&(), &records).unwrap();
//! assert_eq!(results["good"], vec![&records[0], &records[1]]);
//! ```

pub mod config;
pub mod error;
pub mod parse;
pub mod sifter;

pub use config::{SifterConfig, CONFIG_TEMPLATE, DEFAULT_ID_KEY};
pub use error::{
    ConfigError, EvalError, EvalResult, ParseResult, ParserError, SifterError, SifterResult,
};
pub use parse::{ItemPath, Matcher, Parser};
pub use sifter::{
    record_cache, Arg, Comparison, RecordId, SiftState, Sieve, SieveArgs, SieveRegistry, Sifter,
    DEFAULT_FLAG,
};
