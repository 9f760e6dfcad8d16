//! Typed literal values with matching semantics.

use std::borrow::Cow;
use std::fmt;

use regex::{Regex, RegexBuilder};
use serde_json::Value;

use crate::error::{ParseResult, ParserError};
use crate::parse::parser::TOKEN_BREAKS;

/// A typed literal produced by the lexer.
///
/// Each variant has its own rule for deciding whether it matches a
/// scalar value taken from a record; see [`Matcher::matches`].
#[derive(Debug, Clone, PartialEq)]
pub enum Matcher {
    /// `null`, `None`, or `nil`. Matches only JSON null.
    Null,

    /// An integer literal. Matches equal numbers and numeric strings.
    Number(i64),

    /// A bare word. Matches an equal string.
    Symbol(String),

    /// A bare word with brace groups. Matches any of its expansions.
    SymbolGroup(SymbolGroup),

    /// A `/.../` literal. Matches text the pattern is found in.
    Regex(RegexMatcher),

    /// A `|...|` literal. Matches text the whole pattern matches.
    Glob(GlobMatcher),

    /// A `"..."` or `'...'` literal. Matches an equal string.
    Str(String),

    /// `True` or `False`. Matches an equal boolean.
    Bool(bool),
}

impl Matcher {
    /// Creates a symbol matcher.
    pub fn symbol(text: impl Into<String>) -> Self {
        Matcher::Symbol(text.into())
    }

    /// Creates a quoted string matcher.
    pub fn str(text: impl Into<String>) -> Self {
        Matcher::Str(text.into())
    }

    /// Returns true if this matcher matches the given value.
    pub fn matches(&self, probe: &Value) -> bool {
        match self {
            Matcher::Null => probe.is_null(),
            Matcher::Number(n) => number_matches(*n, probe),
            Matcher::Symbol(s) | Matcher::Str(s) => probe.as_str() == Some(s.as_str()),
            Matcher::Bool(b) => probe.as_bool() == Some(*b),
            Matcher::SymbolGroup(group) => group.matches(probe),
            Matcher::Regex(re) => re.matches(probe),
            Matcher::Glob(glob) => glob.matches(probe),
        }
    }

    /// Returns the symbol text if this is a plain symbol.
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Matcher::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// Short name of the variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Matcher::Null => "null",
            Matcher::Number(_) => "number",
            Matcher::Symbol(_) => "symbol",
            Matcher::SymbolGroup(_) => "symbol group",
            Matcher::Regex(_) => "regex",
            Matcher::Glob(_) => "glob",
            Matcher::Str(_) => "string",
            Matcher::Bool(_) => "bool",
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Null => write!(f, "null"),
            Matcher::Number(n) => write!(f, "{}", n),
            Matcher::Symbol(s) => f.write_str(&escape_symbol(s)),
            Matcher::SymbolGroup(group) => write!(f, "{}", group.source()),
            Matcher::Regex(re) => write!(f, "{}", re),
            Matcher::Glob(glob) => write!(f, "{}", glob),
            Matcher::Str(s) => write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
            Matcher::Bool(true) => write!(f, "True"),
            Matcher::Bool(false) => write!(f, "False"),
        }
    }
}

/// Returns true if the text looks like an integer (`^-?\d+$`).
pub(crate) fn is_number_text(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Converts expanded text into a `Number` when it is numeric, else a `Symbol`.
pub(crate) fn symbol_or_number(text: String) -> Matcher {
    if is_number_text(&text) {
        if let Ok(n) = text.parse::<i64>() {
            return Matcher::Number(n);
        }
    }
    Matcher::Symbol(text)
}

/// Backslash-escapes the characters that would end or regroup a bare token.
fn escape_symbol(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '{' | '(' | ')') || TOKEN_BREAKS.contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn number_matches(n: i64, probe: &Value) -> bool {
    match probe {
        // integers compare exactly, floats only when they hold a whole i64
        Value::Number(num) if num.is_f64() => num.as_f64().is_some_and(|f| {
            let bound = 2f64.powi(63);
            f.fract() == 0.0 && (-bound..bound).contains(&f) && f as i64 == n
        }),
        Value::Number(num) => num.as_i64() == Some(n),
        Value::String(s) if is_number_text(s) => s.parse::<i64>() == Ok(n),
        _ => false,
    }
}

/// Text form of a scalar for regex and glob matching.
fn text_of(probe: &Value) -> Option<Cow<'_, str>> {
    match probe {
        Value::String(s) => Some(Cow::Borrowed(s)),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        _ => None,
    }
}

// ==================== Symbol Groups ====================

/// A symbol with one or more brace-expansion groups.
///
/// `hi{foo,bar}` expands to `hifoo` and `hibar`; `node{01..03}` expands
/// to `node01`, `node02`, `node03`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolGroup {
    src: String,
    groups: Vec<Group>,
}

/// One segment of a [`SymbolGroup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Group {
    /// Literal text or a list of alternatives.
    Choices(Vec<String>),

    /// An integer range.
    Series(Series),
}

/// An inclusive, stepped integer range with optional zero padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Series {
    start: i64,
    stop: i64,
    step: i64,
    width: usize,
}

impl Series {
    /// Creates a series from `start` to `stop` inclusive. A `width` of zero
    /// disables padding. Returns `None` when `step` is zero.
    pub fn new(start: i64, stop: i64, step: i64, width: usize) -> Option<Self> {
        if step == 0 {
            return None;
        }
        Some(Self {
            start,
            stop,
            step,
            width,
        })
    }

    /// Number of values in the series.
    pub fn len(&self) -> usize {
        let (start, stop, step) = (self.start as i128, self.stop as i128, self.step as i128);
        let count = if step > 0 {
            if start > stop {
                0
            } else {
                (stop - start) / step + 1
            }
        } else if start < stop {
            0
        } else {
            (start - stop) / -step + 1
        };
        usize::try_from(count).unwrap_or(usize::MAX)
    }

    /// Returns true if the series produces no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Formats the value at `index`.
    pub fn get(&self, index: usize) -> String {
        let value = self.start as i128 + index as i128 * self.step as i128;
        format!("{:0width$}", value, width = self.width)
    }
}

impl Group {
    /// Number of alternatives in this segment.
    pub fn len(&self) -> usize {
        match self {
            Group::Choices(choices) => choices.len(),
            Group::Series(series) => series.len(),
        }
    }

    /// Returns true if this segment has no alternatives.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The alternative at `index`.
    pub fn get(&self, index: usize) -> Cow<'_, str> {
        match self {
            Group::Choices(choices) => Cow::Borrowed(&choices[index]),
            Group::Series(series) => Cow::Owned(series.get(index)),
        }
    }
}

impl SymbolGroup {
    /// Creates a symbol group from its source text and segments.
    pub fn new(src: impl Into<String>, groups: Vec<Group>) -> Self {
        Self {
            src: src.into(),
            groups,
        }
    }

    /// The source text the group was written as.
    pub fn source(&self) -> &str {
        &self.src
    }

    /// The segments of the group.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Iterates the cartesian product of all segments.
    pub fn expansions(&self) -> Expansions<'_> {
        Expansions {
            groups: &self.groups,
            indices: vec![0; self.groups.len()],
            done: self.groups.iter().any(Group::is_empty),
        }
    }

    /// Returns true if any expansion matches the value.
    pub fn matches(&self, probe: &Value) -> bool {
        self.expansions().any(|m| m.matches(probe))
    }
}

/// Iterator over the expansions of a [`SymbolGroup`].
///
/// Numeric expansions are yielded as [`Matcher::Number`], all others as
/// [`Matcher::Symbol`].
#[derive(Debug, Clone)]
pub struct Expansions<'a> {
    groups: &'a [Group],
    indices: Vec<usize>,
    done: bool,
}

impl Iterator for Expansions<'_> {
    type Item = Matcher;

    fn next(&mut self) -> Option<Matcher> {
        if self.done {
            return None;
        }

        let text: String = self
            .groups
            .iter()
            .zip(&self.indices)
            .map(|(group, &i)| group.get(i))
            .collect();

        // odometer: advance the rightmost segment, carrying leftwards
        self.done = true;
        for k in (0..self.indices.len()).rev() {
            self.indices[k] += 1;
            if self.indices[k] < self.groups[k].len() {
                self.done = false;
                break;
            }
            self.indices[k] = 0;
        }

        Some(symbol_or_number(text))
    }
}

// ==================== Regex ====================

/// A compiled `/pattern/flags` literal.
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    src: String,
    flags: String,
    re: Regex,
}

impl RegexMatcher {
    /// Compiles a pattern with the given flag letters (`a i L m s u x`).
    ///
    /// # Errors
    ///
    /// Returns `ParserError::Regex` if the pattern does not compile or the
    /// flags are unsupported or conflicting.
    pub fn new(src: impl Into<String>, flags: impl Into<String>) -> ParseResult<Self> {
        let src = src.into();
        let flags = flags.into();

        if flags.contains('a') && flags.contains('u') {
            return Err(ParserError::regex(
                src,
                "ASCII and UNICODE flags are incompatible",
            ));
        }

        let mut builder = RegexBuilder::new(&src);
        for flag in flags.chars() {
            match flag {
                'i' => {
                    builder.case_insensitive(true);
                }
                'm' => {
                    builder.multi_line(true);
                }
                's' => {
                    builder.dot_matches_new_line(true);
                }
                'x' => {
                    builder.ignore_whitespace(true);
                }
                // unicode is always on; ascii-only classes are not supported
                'a' | 'u' => {}
                'L' => {
                    return Err(ParserError::regex(
                        src,
                        "cannot use LOCALE flag with a str pattern",
                    ))
                }
                other => {
                    return Err(ParserError::regex(src, format!("unknown flag {:?}", other)))
                }
            }
        }

        let re = builder
            .build()
            .map_err(|e| ParserError::regex(src.as_str(), e.to_string()))?;

        Ok(Self { src, flags, re })
    }

    /// The pattern source.
    pub fn source(&self) -> &str {
        &self.src
    }

    /// The flag letters.
    pub fn flags(&self) -> &str {
        &self.flags
    }

    /// Returns true if the pattern is found anywhere in the text.
    pub fn is_match(&self, text: &str) -> bool {
        self.re.is_match(text)
    }

    /// Returns true if the value is a string or number containing a match.
    pub fn matches(&self, probe: &Value) -> bool {
        text_of(probe).is_some_and(|text| self.is_match(&text))
    }
}

impl PartialEq for RegexMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.src == other.src && self.flags == other.flags
    }
}

impl fmt::Display for RegexMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.src.replace('/', "\\/"), self.flags)
    }
}

// ==================== Glob ====================

/// A `|pattern|` shell-glob literal, matched against the whole text.
#[derive(Debug, Clone)]
pub struct GlobMatcher {
    src: String,
    ignore_case: bool,
    re: Regex,
}

impl GlobMatcher {
    /// Translates and compiles a glob pattern.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::Regex` if the translated pattern is rejected,
    /// which can happen for reversed character ranges such as `[z-a]`.
    pub fn new(src: impl Into<String>, ignore_case: bool) -> ParseResult<Self> {
        let src = src.into();
        let re = RegexBuilder::new(&translate_glob(&src))
            .case_insensitive(ignore_case)
            .build()
            .map_err(|e| ParserError::regex(src.as_str(), e.to_string()))?;

        Ok(Self {
            src,
            ignore_case,
            re,
        })
    }

    /// The glob source.
    pub fn source(&self) -> &str {
        &self.src
    }

    /// Whether matching ignores case.
    pub fn ignore_case(&self) -> bool {
        self.ignore_case
    }

    /// Returns true if the whole text matches the glob.
    pub fn is_match(&self, text: &str) -> bool {
        self.re.is_match(text)
    }

    /// Returns true if the value is a string or number matching the glob.
    pub fn matches(&self, probe: &Value) -> bool {
        text_of(probe).is_some_and(|text| self.is_match(&text))
    }
}

impl PartialEq for GlobMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.src == other.src && self.ignore_case == other.ignore_case
    }
}

impl fmt::Display for GlobMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "|{}|", self.src.replace('|', "\\|"))?;
        if self.ignore_case {
            write!(f, "i")?;
        }
        Ok(())
    }
}

/// Translates a shell glob into an anchored regex.
///
/// `*` matches any run of characters (including `/`), `?` matches one
/// character, `[...]` is a character class negated by a leading `!`, and an
/// unterminated `[` is literal.
pub(crate) fn translate_glob(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let n = chars.len();
    let mut out = String::from("(?s)^(?:");
    let mut last_star = false;
    let mut i = 0;

    while i < n {
        let c = chars[i];
        i += 1;

        if c == '*' {
            if !last_star {
                out.push_str(".*");
            }
            last_star = true;
            continue;
        }
        last_star = false;

        match c {
            '?' => out.push('.'),
            '[' => {
                let mut j = i;
                if j < n && chars[j] == '!' {
                    j += 1;
                }
                if j < n && chars[j] == ']' {
                    j += 1;
                }
                while j < n && chars[j] != ']' {
                    j += 1;
                }

                if j >= n {
                    out.push_str("\\[");
                } else {
                    let mut class = &chars[i..j];
                    i = j + 1;

                    out.push('[');
                    if class.first() == Some(&'!') {
                        out.push('^');
                        class = &class[1..];
                    }
                    for &cc in class {
                        if cc != '-' && cc.is_ascii_punctuation() {
                            out.push('\\');
                        }
                        out.push(cc);
                    }
                    out.push(']');
                }
            }
            other => out.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }

    out.push_str(")$");
    out
}
