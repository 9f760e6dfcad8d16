//! Error types for parsing, compiling, and evaluating sifter programs.

use thiserror::Error;

/// A specialized Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParserError>;

/// A specialized Result type for sifter compilation.
pub type SifterResult<T> = Result<T, SifterError>;

/// A specialized Result type for sifter evaluation.
pub type EvalResult<T> = Result<T, EvalError>;

/// Errors that can occur while reading source text into an expression tree.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParserError {
    /// A quoted literal was never closed.
    #[error("unterminated matcher: missing closing {quote:?}")]
    UnterminatedQuote {
        /// The quote character that opened the literal.
        quote: char,
    },

    /// A list was never closed.
    #[error("unexpected end of input, missing closing {closer:?}")]
    UnterminatedList {
        /// The closing delimiter that was expected.
        closer: char,
    },

    /// A closing delimiter appeared with no matching opener.
    #[error("unexpected closing {found:?} at position {position}")]
    UnexpectedCloser {
        /// The closing character found.
        found: char,
        /// Byte offset of the character in the source.
        position: usize,
    },

    /// An item index was started but the input ended.
    #[error("unterminated item index, missing closing ']'")]
    UnterminatedIndex,

    /// An item index did not begin with `[`.
    #[error("unknown item index start: {found:?}")]
    InvalidIndexStart {
        /// The character found instead of `[`.
        found: char,
    },

    /// An item index contained more than one element.
    #[error("too many arguments in item index: {count}")]
    TooManyIndexArguments {
        /// Number of elements found inside the brackets.
        count: usize,
    },

    /// A value that cannot be used as an item path element.
    #[error("unexpected path element in item path: {element}")]
    InvalidPathElement {
        /// Rendering of the offending element.
        element: String,
    },

    /// A slice-shaped index whose bounds are not integers.
    #[error("invalid slice: {text:?}")]
    InvalidSlice {
        /// The slice text as written.
        text: String,
    },

    /// Expressions nested deeper than the configured limit.
    #[error("expression nesting exceeds maximum depth of {max}")]
    TooDeep {
        /// The configured nesting limit.
        max: usize,
    },

    /// A regex (or translated glob) literal failed to compile.
    #[error("error compiling regex {pattern:?}: {message}")]
    Regex {
        /// The pattern source.
        pattern: String,
        /// The compiler's complaint.
        message: String,
    },
}

impl ParserError {
    /// Creates a regex compilation error.
    pub fn regex(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        ParserError::Regex {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Returns true if this is a regex compilation error.
    pub fn is_regex(&self) -> bool {
        matches!(self, ParserError::Regex { .. })
    }
}

/// Errors that can occur while compiling a parsed program into sieves.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SifterError {
    /// The source text could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParserError),

    /// An empty sieve invocation `()`.
    #[error("empty expression: ()")]
    EmptyExpression,

    /// No sieve is registered under the given name.
    #[error("no such sieve: {name}")]
    UnknownSieve {
        /// The requested sieve name.
        name: String,
    },

    /// An argument had the wrong type.
    #[error("{message}: {value}")]
    InvalidArgument {
        /// What was expected.
        message: String,
        /// Rendering of the offending value.
        value: String,
    },

    /// A sieve was given the wrong number of arguments.
    #[error("error creating sieve {sieve}: {message}")]
    Arity {
        /// The sieve being constructed.
        sieve: String,
        /// Description of the problem.
        message: String,
    },

    /// A trailing `key:` with no value following it.
    #[error("missing value for keyword argument {key}")]
    MissingKeywordValue {
        /// The keyword name.
        key: String,
    },

    /// A keyword argument the sieve does not accept.
    #[error("sieve {sieve} got an unexpected keyword argument {key}")]
    UnexpectedOption {
        /// The sieve being constructed.
        sieve: String,
        /// The keyword name.
        key: String,
    },

    /// An unrecognized comparison operator symbol.
    #[error("invalid comparison operator: {op:?}")]
    InvalidComparison {
        /// The operator as written.
        op: String,
    },

    /// A `{name}` reference to a parameter that was not supplied.
    #[error("undefined parameter: {name}")]
    UnknownParam {
        /// The parameter name.
        name: String,
    },

    /// A string with unbalanced `{`/`}` formatting braces.
    #[error("invalid format string {text:?}: {message}")]
    InvalidFormat {
        /// The string being formatted.
        text: String,
        /// Description of the problem.
        message: String,
    },
}

impl SifterError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>, value: impl Into<String>) -> Self {
        SifterError::InvalidArgument {
            message: message.into(),
            value: value.into(),
        }
    }

    /// Creates an arity error.
    pub fn arity(sieve: impl Into<String>, message: impl Into<String>) -> Self {
        SifterError::Arity {
            sieve: sieve.into(),
            message: message.into(),
        }
    }

    /// Creates an unknown sieve error.
    pub fn unknown_sieve(name: impl Into<String>) -> Self {
        SifterError::UnknownSieve { name: name.into() }
    }
}

/// Errors that can occur while evaluating a compiled sifter over records.
#[derive(Debug, Error)]
pub enum EvalError {
    /// A record does not carry the identifier field.
    #[error("record is missing identifier field {key:?}")]
    MissingId {
        /// The identifier field name.
        key: String,
    },

    /// A record identifier is neither an integer nor a string.
    #[error("identifier field {key:?} must be an integer or string, found {found}")]
    InvalidId {
        /// The identifier field name.
        key: String,
        /// The JSON type that was found.
        found: &'static str,
    },

    /// An item path element was applied to a value of the wrong type.
    #[error("cannot apply {element} to a {found} value")]
    PathType {
        /// Rendering of the path element.
        element: String,
        /// The JSON type that was found.
        found: &'static str,
    },

    /// A slice with a step of zero.
    #[error("slice step cannot be zero")]
    ZeroSliceStep,

    /// A sieve's own `prep` or `check` failed.
    #[error("sieve {sieve} failed: {source}")]
    Sieve {
        /// Name of the failing sieve.
        sieve: String,
        /// The underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl EvalError {
    /// Wraps an error raised by a sieve implementation.
    pub fn sieve(
        sieve: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        EvalError::Sieve {
            sieve: sieve.into(),
            source: source.into(),
        }
    }
}

/// Errors that can occur while loading a [`SifterConfig`](crate::SifterConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path of the file.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration text is not valid TOML for the schema.
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}
