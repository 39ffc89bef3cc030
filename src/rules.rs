use std::fmt;

use crate::symbols::{Symbol, Symbols};

/// The right-hand side of a CNF rule, and the key the grammar model is indexed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rhs {
  Terminal(Symbol),
  Binary(Symbol, Symbol),
}

impl Rhs {
  pub fn is_terminal(&self) -> bool {
    matches!(self, Self::Terminal(_))
  }

  pub fn is_binary(&self) -> bool {
    matches!(self, Self::Binary(_, _))
  }

  pub fn display<'a>(&'a self, symbols: &'a Symbols) -> RhsDisplay<'a> {
    RhsDisplay { rhs: self, symbols }
  }
}

pub struct RhsDisplay<'a> {
  rhs: &'a Rhs,
  symbols: &'a Symbols,
}

impl fmt::Display for RhsDisplay<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.rhs {
      Rhs::Terminal(t) => {
        let word = self.symbols.name(*t);
        write!(f, "\"{}\"", word.replace('\\', "\\\\").replace('"', "\\\""))
      }
      Rhs::Binary(l, r) => write!(f, "{} {}", self.symbols.name(*l), self.symbols.name(*r)),
    }
  }
}

/// A CNF rule `lhs -> rhs`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Production {
  pub lhs: Symbol,
  pub rhs: Rhs,
}

impl Production {
  pub fn terminal(lhs: Symbol, word: Symbol) -> Self {
    Self {
      lhs,
      rhs: Rhs::Terminal(word),
    }
  }

  pub fn binary(lhs: Symbol, left: Symbol, right: Symbol) -> Self {
    Self {
      lhs,
      rhs: Rhs::Binary(left, right),
    }
  }

  pub fn display<'a>(&'a self, symbols: &'a Symbols) -> ProductionDisplay<'a> {
    ProductionDisplay {
      production: self,
      symbols,
    }
  }
}

pub struct ProductionDisplay<'a> {
  production: &'a Production,
  symbols: &'a Symbols,
}

impl fmt::Display for ProductionDisplay<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{} -> {}",
      self.symbols.name(self.production.lhs),
      self.production.rhs.display(self.symbols)
    )
  }
}

#[test]
fn test_production_display() {
  let mut symbols = Symbols::new();
  let np = symbols.intern("NP");
  let dt = symbols.intern("DT");
  let nn = symbols.intern("NN");
  let a = symbols.intern("a");

  let bin = Production::binary(np, dt, nn);
  let term = Production::terminal(dt, a);
  assert!(bin.rhs.is_binary());
  assert!(term.rhs.is_terminal());
  assert_eq!(bin.display(&symbols).to_string(), "NP -> DT NN");
  assert_eq!(term.display(&symbols).to_string(), "DT -> \"a\"");

  let quote = symbols.intern("\"");
  let pu = symbols.intern("PU");
  assert_eq!(
    Production::terminal(pu, quote).display(&symbols).to_string(),
    r#"PU -> "\"""#
  );
}
