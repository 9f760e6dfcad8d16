//! Recursive descent s-expression parser.

use std::fmt;

use super::item_path::{is_slice_like, ItemPath, PathElement, PathKey, Slice};
use super::lexer::{convert_token, read_quoted};
use super::matcher::{GlobMatcher, Matcher, RegexMatcher};
use super::reader::Reader;
use crate::error::{ParseResult, ParserError};

/// Default limit on list and index nesting.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Characters that end a bare token, in addition to the active delimiters.
pub(crate) const TOKEN_BREAKS: &str = " [;#|/\"'\n\r\t";

/// Characters that end a bare item path segment.
const PATH_BREAKS: &str = " .[]();#|/\"'\n\r\t";

/// Flag letters accepted after a `/.../` literal.
const REGEX_FLAGS: &str = "aiLmsux";

/// A node of the parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A parenthesized list, usually a sieve invocation.
    List(Vec<Expr>),

    /// A literal value.
    Matcher(Matcher),

    /// An item path such as `.keywords[0]`.
    Path(ItemPath),
}

impl Expr {
    /// Creates a symbol expression.
    pub fn symbol(text: impl Into<String>) -> Self {
        Expr::Matcher(Matcher::symbol(text))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            Expr::Matcher(m) => write!(f, "{}", m),
            Expr::Path(p) => write!(f, "{}", p),
        }
    }
}

/// Parser for sifter source text.
///
/// # Grammar
///
/// ```text
/// script   ::= expr*
/// expr     ::= list | itempath | literal
/// list     ::= "(" expr* ")"
/// itempath ::= ("." segment)+ | segment ("." segment | index)*
/// index    ::= "[" (slice | literal)? "]"
/// literal  ::= bareword | '"' chars '"' | "/" chars "/" flags? | "|" chars "|" "i"?
/// comment  ::= (";" | "#") rest-of-line
/// ```
///
/// # Example
///
/// ```
/// use sifty_rs::parse::{Expr, Parser};
///
/// let exprs = Parser::parse("(name Pizza) ; tasty").unwrap();
/// assert_eq!(exprs.len(), 1);
/// assert!(matches!(exprs[0], Expr::List(_)));
/// ```
pub struct Parser<'a> {
    reader: Reader<'a>,
    depth: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    /// Creates a parser over the given source.
    pub fn new(source: &'a str) -> Self {
        Self {
            reader: Reader::new(source),
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Sets the maximum nesting depth of lists and item indices.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Parses an entire source text into its top-level expressions.
    ///
    /// # Errors
    ///
    /// Returns a `ParserError` for unterminated literals or lists, stray
    /// closers, malformed item paths, bad regex literals, or nesting deeper
    /// than [`DEFAULT_MAX_DEPTH`].
    pub fn parse(source: &str) -> ParseResult<Vec<Expr>> {
        Parser::new(source).parse_all()
    }

    /// Consumes the parser, returning every top-level expression.
    pub fn parse_all(mut self) -> ParseResult<Vec<Expr>> {
        self.parse_exprs(None)
    }

    /// Reads expressions until the closing delimiter, or end of input at
    /// the top level.
    fn parse_exprs(&mut self, delims: Option<(char, char)>) -> ParseResult<Vec<Expr>> {
        let (start, stop) = delims.unwrap_or(('(', ')'));
        let nested = delims.is_some();
        let is_break = move |c: char| c == start || c == stop || TOKEN_BREAKS.contains(c);

        let mut exprs = Vec::new();
        let mut token: Option<String> = None;
        let mut esc = false;

        while let Some(c) = self.reader.read() {
            if esc {
                let t = token.get_or_insert_with(String::new);
                // escaped delimiters lose their backslash, anything else
                // keeps it for escape decoding
                if !is_break(c) {
                    t.push('\\');
                }
                t.push(c);
                esc = false;
                continue;
            }

            if c == '\\' {
                esc = true;
                continue;
            }

            if c == '.' && token.is_none() {
                exprs.push(Expr::Path(self.parse_item_path(None, false)?));
                continue;
            }

            if c == '[' {
                let prefix = token.take();
                exprs.push(Expr::Path(self.parse_item_path(prefix, true)?));
                continue;
            }

            if !is_break(c) {
                token.get_or_insert_with(String::new).push(c);
                continue;
            }

            if let Some(text) = token.take() {
                exprs.push(Expr::Matcher(convert_token(&text)?));
            }

            match c {
                ';' | '#' => self.reader.skip_line(),
                c if c == start => exprs.push(Expr::List(self.parse_nested(start, stop)?)),
                c if c == stop => {
                    if nested {
                        return Ok(exprs);
                    }
                    return Err(ParserError::UnexpectedCloser {
                        found: c,
                        position: self.reader.position() - c.len_utf8(),
                    });
                }
                '"' | '\'' | '/' | '|' => exprs.push(Expr::Matcher(self.parse_quoted(Some(c))?)),
                _ => {}
            }
        }

        if nested {
            return Err(ParserError::UnterminatedList { closer: stop });
        }

        if let Some(text) = token {
            exprs.push(Expr::Matcher(convert_token(&text)?));
        }

        Ok(exprs)
    }

    fn parse_nested(&mut self, start: char, stop: char) -> ParseResult<Vec<Expr>> {
        if self.depth >= self.max_depth {
            return Err(ParserError::TooDeep {
                max: self.max_depth,
            });
        }

        self.depth += 1;
        let result = self.parse_exprs(Some((start, stop)));
        self.depth -= 1;
        result
    }

    /// Parses a quoted literal. With `quote` of `None` the opening quote is
    /// read from the input first.
    pub(crate) fn parse_quoted(&mut self, quote: Option<char>) -> ParseResult<Matcher> {
        let quote = match quote.or_else(|| self.reader.read()) {
            Some(q) => q,
            None => return Err(ParserError::UnterminatedQuote { quote: '"' }),
        };

        let body = read_quoted(&mut self.reader, quote, true)?;

        match quote {
            '/' => {
                let mut flags = String::new();
                while let Some(flag) = self.reader.peek().filter(|c| REGEX_FLAGS.contains(*c)) {
                    self.reader.read();
                    flags.push(flag);
                }
                Ok(Matcher::Regex(RegexMatcher::new(body, flags)?))
            }
            '|' => {
                let ignore_case = self.reader.peek() == Some('i');
                if ignore_case {
                    self.reader.read();
                }
                Ok(Matcher::Glob(GlobMatcher::new(body, ignore_case)?))
            }
            _ => Ok(Matcher::Str(body)),
        }
    }

    /// Parses an item path. `prefix` is a bare token read just before a
    /// `[`; `bracket` is true when that `[` has already been consumed.
    pub(crate) fn parse_item_path(
        &mut self,
        prefix: Option<String>,
        bracket: bool,
    ) -> ParseResult<ItemPath> {
        let mut elements = Vec::new();

        if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
            elements.push(PathElement::from_matcher(convert_token(&prefix)?)?);
        }

        if bracket {
            elements.push(self.parse_index(Some('['))?);
        }

        let mut token: Option<String> = None;
        let mut esc = false;

        while let Some(c) = self.reader.peek() {
            if esc {
                let t = token.get_or_insert_with(String::new);
                if !PATH_BREAKS.contains(c) {
                    t.push('\\');
                }
                t.push(c);
                esc = false;
            } else if c == '\\' {
                esc = true;
            } else if PATH_BREAKS.contains(c) {
                if let Some(text) = token.take() {
                    elements.push(PathElement::from_matcher(convert_token(&text)?)?);
                }

                match c {
                    '[' => {
                        self.reader.read();
                        elements.push(self.parse_index(Some('['))?);
                        continue;
                    }
                    ']' => {
                        let position = self.reader.position();
                        return Err(ParserError::UnexpectedCloser { found: c, position });
                    }
                    '.' => {}
                    _ => break,
                }
            } else {
                token.get_or_insert_with(String::new).push(c);
            }

            self.reader.read();
        }

        if let Some(text) = token {
            elements.push(PathElement::from_matcher(convert_token(&text)?)?);
        }

        Ok(ItemPath::new(elements))
    }

    /// Parses a bracketed index. With `start` of `None` the opening `[` is
    /// read from the input first.
    pub(crate) fn parse_index(&mut self, start: Option<char>) -> ParseResult<PathElement> {
        match start.or_else(|| self.reader.read()) {
            Some('[') => {}
            Some(found) => return Err(ParserError::InvalidIndexStart { found }),
            None => return Err(ParserError::UnterminatedIndex),
        }

        let mut exprs = self.parse_nested('[', ']')?;
        match exprs.len() {
            0 => Ok(PathElement::AllItems),
            1 => index_element(exprs.remove(0)),
            count => Err(ParserError::TooManyIndexArguments { count }),
        }
    }
}

fn index_element(expr: Expr) -> ParseResult<PathElement> {
    match expr {
        Expr::Matcher(Matcher::Symbol(text)) | Expr::Matcher(Matcher::Str(text))
            if is_slice_like(&text) =>
        {
            Ok(PathElement::Item(PathKey::Slice(Slice::parse(&text)?)))
        }
        Expr::Matcher(m) => PathElement::from_matcher(m),
        other => Err(ParserError::InvalidPathElement {
            element: other.to_string(),
        }),
    }
}
