//! Source text parsing for sifter programs.
//!
//! Programs are s-expressions whose leaves are typed literals
//! ([`Matcher`]) or item paths ([`ItemPath`]).
//!
//! # Literals
//!
//! - `null`, `None`, `nil` - the null value
//! - `True`, `False` - booleans
//! - `42`, `-7` - integers, which also match numeric strings
//! - `Pizza` - a bare symbol
//! - `node{01..03}`, `hi{foo,bar}` - symbol groups with brace expansion
//! - `"text"` or `'text'` - a quoted string
//! - `/pattern/flags` - a regex, found anywhere in the text
//! - `|pattern|i` - a shell glob, matched against the whole text
//!
//! # Item Paths
//!
//! - `.foo.bar` - nested object keys
//! - `.keywords[0]`, `.keywords[-1]` - array indices
//! - `.keywords[1:]` - array slices
//! - `.keywords[]` - every element
//! - `.{foo,bar}`, `[|f*|]` - every entry whose key matches
//!
//! # Example
//!
//! ```
//! use sifty_rs::parse::{Expr, Matcher, Parser};
//!
//! let exprs = Parser::parse("(type food) .keywords[0]").unwrap();
//! assert_eq!(exprs.len(), 2);
//!
//! let Expr::List(items) = &exprs[0] else { panic!() };
//! assert_eq!(items[0], Expr::Matcher(Matcher::symbol("type")));
//! assert!(matches!(exprs[1], Expr::Path(_)));
//! ```

mod item_path;
mod lexer;
mod matcher;
mod parser;
mod reader;

pub use item_path::{ItemPath, PathElement, PathKey, Slice};
pub use lexer::{convert_escapes, convert_token};
pub use matcher::{Expansions, GlobMatcher, Group, Matcher, RegexMatcher, Series, SymbolGroup};
pub use parser::{Expr, Parser, DEFAULT_MAX_DEPTH};
pub use reader::Reader;

pub(crate) use item_path::{is_truthy, json_type};
