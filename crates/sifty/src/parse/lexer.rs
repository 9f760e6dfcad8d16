//! Conversion of raw token text into typed literals.

use super::matcher::{is_number_text, Group, Matcher, Series, SymbolGroup};
use super::reader::Reader;
use crate::error::{ParseResult, ParserError};

/// Converts an unquoted token into a [`Matcher`].
///
/// * `None`, `null`, `nil` become [`Matcher::Null`]
/// * `True` / `False` become [`Matcher::Bool`]
/// * an integer becomes [`Matcher::Number`]
/// * text with an unescaped `{...}` group may become a [`Matcher::SymbolGroup`]
/// * everything else becomes a [`Matcher::Symbol`], with escapes decoded
///
/// # Errors
///
/// Returns `ParserError::UnterminatedQuote` for a `{` group with no closing `}`.
pub fn convert_token(val: &str) -> ParseResult<Matcher> {
    match val {
        "None" | "null" | "nil" => return Ok(Matcher::Null),
        "True" => return Ok(Matcher::Bool(true)),
        "False" => return Ok(Matcher::Bool(false)),
        _ => {}
    }

    if is_number_text(val) {
        // integers wider than i64 stay symbols
        if let Ok(n) = val.parse::<i64>() {
            return Ok(Matcher::Number(n));
        }
    }

    let val = convert_escapes(val);
    if !val.contains('{') {
        return Ok(Matcher::Symbol(val));
    }

    let groups = split_symbol_groups(&val)?;
    if groups.iter().all(|g| g.len() == 1) {
        // only one choice everywhere, so this is really just a symbol
        let merged: String = groups.iter().map(|g| g.get(0)).collect();
        Ok(Matcher::Symbol(merged))
    } else {
        Ok(Matcher::SymbolGroup(SymbolGroup::new(val, groups)))
    }
}

/// Decodes backslash escape sequences embedded in text.
///
/// Supports `\\ \' \" \a \b \f \n \r \t \v`, octal `\NNN`, and hex
/// `\xNN`, `\uNNNN`, `\UNNNNNNNN`. Anything else, including malformed
/// hex and named `\N{...}` escapes, is left as written.
pub fn convert_escapes(val: &str) -> String {
    let chars: Vec<char> = val.chars().collect();
    let n = chars.len();
    let mut out = String::with_capacity(val.len());
    let mut i = 0;

    while i < n {
        let c = chars[i];
        if c != '\\' || i + 1 >= n {
            out.push(c);
            i += 1;
            continue;
        }

        let simple = match chars[i + 1] {
            '\\' => Some('\\'),
            '\'' => Some('\''),
            '"' => Some('"'),
            'a' => Some('\x07'),
            'b' => Some('\x08'),
            'f' => Some('\x0c'),
            'n' => Some('\n'),
            'r' => Some('\r'),
            't' => Some('\t'),
            'v' => Some('\x0b'),
            _ => None,
        };
        if let Some(decoded) = simple {
            out.push(decoded);
            i += 2;
            continue;
        }

        let decoded = match chars[i + 1] {
            'x' => decode_hex(&chars[i + 2..], 2),
            'u' => decode_hex(&chars[i + 2..], 4),
            'U' => decode_hex(&chars[i + 2..], 8),
            '0'..='7' => decode_octal(&chars[i + 1..]),
            _ => None,
        };
        match decoded {
            Some((ch, consumed)) => {
                out.push(ch);
                i += consumed;
            }
            None => {
                out.push('\\');
                i += 1;
            }
        }
    }

    out
}

/// Decodes exactly `width` hex digits. Returns the character and the number
/// of source characters consumed, including the backslash and letter.
fn decode_hex(rest: &[char], width: usize) -> Option<(char, usize)> {
    let digits = rest.get(..width)?;
    if !digits.iter().all(char::is_ascii_hexdigit) {
        return None;
    }
    let text: String = digits.iter().collect();
    let code = u32::from_str_radix(&text, 16).ok()?;
    char::from_u32(code).map(|ch| (ch, width + 2))
}

/// Decodes one to three octal digits.
fn decode_octal(rest: &[char]) -> Option<(char, usize)> {
    let len = rest
        .iter()
        .take(3)
        .take_while(|c| ('0'..='7').contains(*c))
        .count();
    let text: String = rest[..len].iter().collect();
    let code = u32::from_str_radix(&text, 8).ok()?;
    char::from_u32(code).map(|ch| (ch, len + 1))
}

/// Reads the body of a quoted literal up to the matching unescaped `quote`.
///
/// The opening quote must already have been consumed. With
/// `advanced_escapes`, backslash sequences other than an escaped quote are
/// kept and then decoded by [`convert_escapes`]; without it, a backslash
/// simply inlines the next character.
///
/// # Errors
///
/// Returns `ParserError::UnterminatedQuote` if the input ends first.
pub fn read_quoted(
    reader: &mut Reader<'_>,
    quote: char,
    advanced_escapes: bool,
) -> ParseResult<String> {
    let mut token = String::new();
    let mut esc = false;

    loop {
        let c = reader
            .read()
            .ok_or(ParserError::UnterminatedQuote { quote })?;

        if esc {
            if advanced_escapes && c != quote {
                token.push('\\');
            }
            token.push(c);
            esc = false;
        } else if c == quote {
            break;
        } else if c == '\\' {
            esc = true;
        } else {
            token.push(c);
        }
    }

    if advanced_escapes {
        Ok(convert_escapes(&token))
    } else {
        Ok(token)
    }
}

/// Splits a symbol into alternating literal and `{...}` segments.
///
/// A backslash makes the following character literal, so `\{` never starts
/// a group.
///
/// # Errors
///
/// Returns `ParserError::UnterminatedQuote` for a `{` with no closing `}`.
pub fn split_symbol_groups(source: &str) -> ParseResult<Vec<Group>> {
    let mut reader = Reader::new(source);
    let mut groups = Vec::new();
    let mut token: Option<String> = None;
    let mut esc = false;

    while let Some(c) = reader.read() {
        if esc {
            esc = false;
            token.get_or_insert_with(String::new).push(c);
            continue;
        }

        match c {
            '\\' => esc = true,
            '{' => {
                if let Some(literal) = token.take() {
                    groups.push(Group::Choices(vec![literal]));
                }
                let body = read_quoted(&mut reader, '}', true)?;
                groups.push(convert_group(&body));
            }
            _ => token.get_or_insert_with(String::new).push(c),
        }
    }

    if let Some(literal) = token {
        groups.push(Group::Choices(vec![literal]));
    }

    Ok(groups)
}

/// Converts the body of a brace group into its alternatives.
///
/// A body with commas is an alternative list (`\,` keeps a literal comma),
/// a body with `..` is a range, and anything else stays literal braces.
pub fn convert_group(body: &str) -> Group {
    if !body.contains(',') {
        if body.contains("..") {
            return convert_range(body);
        }
        return literal_group(body);
    }

    let mut work: Vec<String> = Vec::new();
    for piece in body.split(',') {
        match work.last_mut().filter(|last| last.ends_with('\\')) {
            Some(last) => {
                last.pop();
                last.push(',');
                last.push_str(piece);
            }
            None => work.push(piece.to_string()),
        }
    }

    if work.len() == 1 {
        literal_group(&work[0])
    } else {
        Group::Choices(work)
    }
}

/// Converts `START..STOP` or `START..STOP..STEP` into an inclusive series.
///
/// Zero-padded bounds pad every value to the widest bound. A malformed
/// range stays literal.
pub fn convert_range(range: &str) -> Group {
    let parts: Vec<&str> = range.split("..").collect();
    let (start, stop, step) = match parts.as_slice() {
        [start, stop] => (*start, *stop, "1"),
        [start, stop, step] => (*start, *stop, *step),
        _ => return literal_group(range),
    };

    let parsed = (
        start.trim().parse::<i64>(),
        stop.trim().parse::<i64>(),
        step.trim().parse::<i64>(),
    );
    let (Ok(istart), Ok(istop), Ok(istep)) = parsed else {
        return literal_group(range);
    };

    let padded = [start, stop]
        .iter()
        .any(|v| v.len() > 1 && v.starts_with('0'));
    let width = if padded { start.len().max(stop.len()) } else { 0 };

    match Series::new(istart, istop, istep, width) {
        Some(series) => Group::Series(series),
        None => literal_group(range),
    }
}

fn literal_group(body: &str) -> Group {
    Group::Choices(vec![format!("{{{}}}", body)])
}
