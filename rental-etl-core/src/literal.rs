//! Restricted parser for stringified list literals such as `['Wifi', 'Pool']`.
//!
//! Only literal syntax is understood: lists, tuples, quoted strings, integers, floats,
//! `True`, `False` and `None`. Anything else (names, calls, operators, dicts) is a parse
//! failure. Nothing is ever evaluated.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use thiserror::Error;

/// Deepest bracket nesting accepted. Real exports nest at most twice.
pub const MAX_DEPTH: usize = 32;

/// A parsed literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    None,
    List(Vec<Literal>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LiteralError {
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("unexpected character {0:?}")]
    UnexpectedChar(char),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("invalid number {0:?}")]
    InvalidNumber(String),
    #[error("name {0:?} is not a literal")]
    NotALiteral(String),
    #[error("invalid escape sequence")]
    InvalidEscape,
    #[error("trailing input after literal")]
    TrailingInput,
    #[error("literal nests deeper than {} levels", MAX_DEPTH)]
    TooDeep,
}

/// Parses exactly one literal from `input`, surrounded by optional whitespace.
pub fn parse_literal(input: &str) -> Result<Literal, LiteralError> {
    let mut parser = Parser {
        chars: input.chars().peekable(),
        depth: 0,
    };
    let value = parser.value()?;
    parser.skip_whitespace();
    match parser.chars.next() {
        None => Ok(value),
        Some(_) => Err(LiteralError::TrailingInput),
    }
}

/// Parses a stringified list (or tuple) into its items.
///
/// Returns an empty vector for any syntax error and for literals that are not sequences.
pub fn parse_list(input: &str) -> Vec<Literal> {
    match parse_literal(input) {
        Ok(Literal::List(items)) => items,
        Ok(other) => {
            tracing::debug!(literal = %other, "Literal is not a list, treating as empty");
            Vec::new()
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to parse list literal, treating as empty");
            Vec::new()
        }
    }
}

/// Strings pass through as-is; other items use their literal spelling.
pub fn into_strings(items: Vec<Literal>) -> Vec<String> {
    items
        .into_iter()
        .map(|item| match item {
            Literal::Str(s) => s,
            other => other.to_string(),
        })
        .collect()
}

/// Renders `items` as a list literal that [`parse_list`] reads back unchanged.
pub fn stringify(items: &[Literal]) -> String {
    Literal::List(items.to_vec()).to_string()
}

/// [`stringify`] for a list of plain strings.
pub fn stringify_strings<S: AsRef<str>>(items: &[S]) -> String {
    let literals: Vec<Literal> = items
        .iter()
        .map(|s| Literal::Str(s.as_ref().to_owned()))
        .collect();
    stringify(&literals)
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Str(s) => write_quoted(f, s),
            Literal::Int(i) => write!(f, "{i}"),
            // Debug keeps a fractional part or exponent, so floats stay floats on re-parse.
            Literal::Float(x) => write!(f, "{x:?}"),
            Literal::Bool(true) => f.write_str("True"),
            Literal::Bool(false) => f.write_str("False"),
            Literal::None => f.write_str("None"),
            Literal::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    write!(f, "{quote}")?;
    for c in s.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c == quote => write!(f, "\\{c}")?,
            c => write!(f, "{c}")?,
        }
    }
    write!(f, "{quote}")
}

struct Parser<'a> {
    chars: Peekable<Chars<'a>>,
    depth: usize,
}

impl Parser<'_> {
    fn skip_whitespace(&mut self) {
        while matches!(self.chars.peek(), Some(c) if c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn value(&mut self) -> Result<Literal, LiteralError> {
        self.skip_whitespace();
        match self.chars.peek().copied() {
            None => Err(LiteralError::UnexpectedEnd),
            Some('[') => {
                self.chars.next();
                self.nested(']').map(|(items, _)| Literal::List(items))
            }
            Some('(') => {
                self.chars.next();
                let (mut items, saw_comma) = self.nested(')')?;
                // `(x)` is just a parenthesised x; `()` and `(x,)` are tuples.
                if items.len() == 1 && !saw_comma {
                    Ok(items.remove(0))
                } else {
                    Ok(Literal::List(items))
                }
            }
            Some(q @ ('\'' | '"')) => {
                self.chars.next();
                self.string(q).map(Literal::Str)
            }
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => self.number(),
            Some(c) if c.is_alphabetic() || c == '_' => self.keyword(),
            Some(c) => Err(LiteralError::UnexpectedChar(c)),
        }
    }

    fn nested(&mut self, close: char) -> Result<(Vec<Literal>, bool), LiteralError> {
        if self.depth == MAX_DEPTH {
            return Err(LiteralError::TooDeep);
        }
        self.depth += 1;
        let result = self.sequence(close);
        self.depth -= 1;
        result
    }

    /// Parses items up to `close`; the opening bracket is already consumed.
    fn sequence(&mut self, close: char) -> Result<(Vec<Literal>, bool), LiteralError> {
        let mut items = Vec::new();
        let mut saw_comma = false;
        loop {
            self.skip_whitespace();
            match self.chars.peek().copied() {
                None => return Err(LiteralError::UnexpectedEnd),
                Some(c) if c == close => {
                    self.chars.next();
                    return Ok((items, saw_comma));
                }
                Some(_) => {}
            }
            items.push(self.value()?);
            self.skip_whitespace();
            match self.chars.next() {
                Some(',') => saw_comma = true,
                Some(c) if c == close => return Ok((items, saw_comma)),
                Some(c) => return Err(LiteralError::UnexpectedChar(c)),
                None => return Err(LiteralError::UnexpectedEnd),
            }
        }
    }

    fn string(&mut self, quote: char) -> Result<String, LiteralError> {
        let mut out = String::new();
        loop {
            match self.chars.next() {
                None | Some('\n') => return Err(LiteralError::UnterminatedString),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => self.escape(&mut out)?,
                Some(c) => out.push(c),
            }
        }
    }

    fn escape(&mut self, out: &mut String) -> Result<(), LiteralError> {
        let c = match self.chars.next() {
            None => return Err(LiteralError::UnterminatedString),
            Some('n') => '\n',
            Some('t') => '\t',
            Some('r') => '\r',
            Some('0') => '\0',
            Some(c @ ('\\' | '\'' | '"')) => c,
            // Escaped line break continues the literal.
            Some('\n') => return Ok(()),
            Some('x') => return self.hex_escape(2, out),
            Some('u') => return self.hex_escape(4, out),
            Some('U') => return self.hex_escape(8, out),
            // Unknown escapes keep their backslash.
            Some(c) => {
                out.push('\\');
                c
            }
        };
        out.push(c);
        Ok(())
    }

    fn hex_escape(&mut self, digits: usize, out: &mut String) -> Result<(), LiteralError> {
        let mut code = 0u32;
        for _ in 0..digits {
            let d = self
                .chars
                .next()
                .and_then(|c| c.to_digit(16))
                .ok_or(LiteralError::InvalidEscape)?;
            code = code * 16 + d;
        }
        let c = char::from_u32(code).ok_or(LiteralError::InvalidEscape)?;
        out.push(c);
        Ok(())
    }

    fn number(&mut self) -> Result<Literal, LiteralError> {
        let mut text = String::new();
        if let Some(sign @ ('-' | '+')) = self.chars.peek().copied() {
            text.push(sign);
            self.chars.next();
        }
        let mut is_float = false;
        while let Some(c) = self.chars.peek().copied() {
            match c {
                '0'..='9' => text.push(c),
                '.' | 'e' | 'E' => {
                    is_float = true;
                    text.push(c);
                }
                '-' | '+' if text.ends_with(['e', 'E']) => text.push(c),
                _ => break,
            }
            self.chars.next();
        }
        if is_float {
            text.parse::<f64>()
                .ok()
                .filter(|x| x.is_finite())
                .map(Literal::Float)
                .ok_or(LiteralError::InvalidNumber(text))
        } else {
            text.parse::<i64>()
                .map(Literal::Int)
                .map_err(|_| LiteralError::InvalidNumber(text))
        }
    }

    fn keyword(&mut self) -> Result<Literal, LiteralError> {
        let mut word = String::new();
        while let Some(c) = self.chars.peek().copied() {
            if c.is_alphanumeric() || c == '_' {
                word.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        match word.as_str() {
            "True" => Ok(Literal::Bool(true)),
            "False" => Ok(Literal::Bool(false)),
            "None" => Ok(Literal::None),
            _ => Err(LiteralError::NotALiteral(word)),
        }
    }
}
