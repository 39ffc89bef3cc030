//! Simple recursive-descent parsing of rule count files
//!
//! ```text
//! // comments run to the end of the line
//! %start S;
//! 12 NP -> DT NN;
//! 23 DT -> "a";
//! ```

use regex::Regex;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::Err;
use crate::counts::RuleCounts;
use crate::grammar::GrammarModel;

impl FromStr for RuleCounts {
  type Err = Err;

  /// Parses a count file. Repeated rules accumulate, and LHS totals are the
  /// sums of their rules' counts.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (counts, rest) = parse_entries(s)?;
    debug_assert!(rest.is_empty());

    if counts.is_empty() {
      Err("empty count file".into())
    } else {
      Ok(counts)
    }
  }
}

impl FromStr for GrammarModel {
  type Err = Err;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let counts: RuleCounts = s.parse()?;
    Ok(Self::from_counts(counts)?)
  }
}

impl GrammarModel {
  pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self, Err> {
    let path = path.as_ref();
    let src = fs::read_to_string(path)
      .map_err(|e| -> Err { format!("reading {}: {}", path.display(), e).into() })?;
    src
      .parse::<Self>()
      .map_err(|e| -> Err { format!("{}: {}", path.display(), e).into() })
  }
}

type Infallible<'a, T> = (T, &'a str);
type ParseResult<'a, T> = Result<(T, &'a str), Err>;

/// helper macro for initializing a regex with lazy_static!
macro_rules! regex_static {
  ($name:ident, $pattern:expr) => {
    lazy_static! {
      static ref $name: Regex = Regex::new($pattern).unwrap();
    }
  };
}

/// The rest of the current line, for error messages
fn context(s: &str) -> &str {
  s.lines().next().unwrap_or("<end of input>")
}

/// Try to consume a regex anchored at the start of `s`, returning None if it doesn't match
fn optional_re<'a>(re: &'static Regex, s: &'a str) -> Infallible<'a, Option<&'a str>> {
  match re.find(s) {
    Some(m) if m.start() == 0 => (Some(m.as_str()), &s[m.end()..]),
    _ => (None, s),
  }
}

/// Try to consume a regex, failing if it doesn't match
fn needed_re<'a>(re: &'static Regex, s: &'a str) -> ParseResult<'a, &'a str> {
  if let (Some(c), rest) = optional_re(re, s) {
    Ok((c, rest))
  } else {
    Err(format!("couldn't match {} at {}", re, context(s)).into())
  }
}

/// Try to consume a char, returning None if it doesn't match
fn optional_char(c: char, s: &str) -> Infallible<'_, Option<char>> {
  match s.strip_prefix(c) {
    Some(rest) => (Some(c), rest),
    None => (None, s),
  }
}

/// Skips whitespace and `//` comments
fn skip_whitespace(s: &str) -> &str {
  regex_static!(WHITESPACE_OR_COMMENT, r"^(?:\s|//[^\n]*)+");
  optional_re(&*WHITESPACE_OR_COMMENT, s).1
}

/// A symbol name: anything up to whitespace, `;` or `"`
fn parse_name(s: &str) -> ParseResult<'_, &str> {
  regex_static!(NAME, r#"^[^\s;"]+"#);
  needed_re(&*NAME, s).map_err(|err| format!("name: {}", err).into())
}

fn parse_count(s: &str) -> ParseResult<'_, i64> {
  regex_static!(COUNT, r"^-?[0-9]+");
  let (digits, s) = needed_re(&*COUNT, s).map_err(|e| -> Err { format!("count: {}", e).into() })?;
  let count = digits
    .parse::<i64>()
    .map_err(|e| -> Err { format!("count {}: {}", digits, e).into() })?;
  Ok((count, s))
}

/// A double-quoted terminal, with `\"` and `\\` escapes
fn parse_terminal(s: &str) -> ParseResult<'_, String> {
  regex_static!(QUOTED, r#"^"((?:[^"\\]|\\.)*)""#);
  let (quoted, rest) =
    needed_re(&*QUOTED, s).map_err(|e| -> Err { format!("terminal: {}", e).into() })?;

  let mut word = String::with_capacity(quoted.len());
  let mut chars = quoted[1..quoted.len() - 1].chars();
  while let Some(c) = chars.next() {
    if c == '\\' {
      match chars.next() {
        Some(escaped @ ('"' | '\\')) => word.push(escaped),
        other => {
          return Err(format!("terminal: bad escape \\{} in {}", other.unwrap_or(' '), quoted).into());
        }
      }
    } else {
      word.push(c);
    }
  }
  Ok((word, rest))
}

enum RhsItem {
  Word(String),
  Symbol(String),
}

/// `%start SYM ...;`
fn parse_directive<'a>(counts: &mut RuleCounts, s: &'a str) -> ParseResult<'a, ()> {
  regex_static!(DIRECTIVE, r"^%[a-z]+");
  let (directive, s) = needed_re(&*DIRECTIVE, s)?;
  if directive != "%start" {
    return Err(format!("unknown directive {}", directive).into());
  }

  let mut rem = s;
  let mut any = false;
  loop {
    rem = skip_whitespace(rem);
    if let (Some(_), s) = optional_char(';', rem) {
      if !any {
        return Err(format!("%start needs at least one symbol at {}", context(rem)).into());
      }
      return Ok(((), s));
    }
    let (name, s) = parse_name(rem).map_err(|e| -> Err { format!("%start: {}", e).into() })?;
    counts.add_start(name);
    any = true;
    rem = s;
  }
}

/// `COUNT LHS -> RHS;`, where RHS is one quoted word or two symbols
fn parse_rule<'a>(counts: &mut RuleCounts, s: &'a str) -> ParseResult<'a, ()> {
  #![allow(clippy::trivial_regex)]
  regex_static!(ARROW, "^->");

  let (count, s) = parse_count(s)?;
  let s = skip_whitespace(s);
  let (lhs, s) = parse_name(s).map_err(|e| -> Err { format!("rule lhs: {}", e).into() })?;
  let s = skip_whitespace(s);
  let (_, s) = needed_re(&*ARROW, s).map_err(|e| -> Err { format!("rule arrow: {}", e).into() })?;

  let mut items = Vec::new();
  let mut rem = s;
  loop {
    rem = skip_whitespace(rem);
    if let (Some(_), s) = optional_char(';', rem) {
      rem = s;
      break;
    }
    if rem.starts_with('"') {
      let (word, s) = parse_terminal(rem)?;
      items.push(RhsItem::Word(word));
      rem = s;
    } else if rem.is_empty() {
      return Err(format!("rule for {}: missing ;", lhs).into());
    } else {
      let (name, s) =
        parse_name(rem).map_err(|e| -> Err { format!("rule rhs: {}", e).into() })?;
      items.push(RhsItem::Symbol(name.to_string()));
      rem = s;
    }
  }

  match items.as_slice() {
    [RhsItem::Word(word)] => counts.add_terminal(lhs, word, count)?,
    [RhsItem::Symbol(left), RhsItem::Symbol(right)] => counts.add_binary(lhs, left, right, count)?,
    [RhsItem::Symbol(sym)] => {
      return Err(format!("unary rule {} -> {} is not in Chomsky normal form", lhs, sym).into());
    }
    _ => {
      return Err(
        format!(
          "rule for {} has {} right-hand items, expected one quoted word or two symbols",
          lhs,
          items.len()
        )
        .into(),
      );
    }
  }

  Ok(((), rem))
}

fn parse_entries(s: &str) -> ParseResult<'_, RuleCounts> {
  let mut counts = RuleCounts::new();
  let mut rem = s;
  loop {
    rem = skip_whitespace(rem);
    if rem.is_empty() {
      return Ok((counts, rem));
    }
    let ((), s) = if rem.starts_with('%') {
      parse_directive(&mut counts, rem)?
    } else {
      parse_rule(&mut counts, rem)?
    };
    rem = s;
  }
}
