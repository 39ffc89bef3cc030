use std::collections::HashMap;
use std::fmt;

/// An interned grammar symbol: a non-terminal, a synthetic binarization
/// symbol, or a terminal token. Ids are handed out in first-seen order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(u32);

impl Symbol {
  pub fn index(self) -> usize {
    self.0 as usize
  }
}

impl fmt::Display for Symbol {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// Bidirectional name <-> [`Symbol`] table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Symbols {
  names: Vec<String>,
  ids: HashMap<String, Symbol>,
}

impl Symbols {
  pub fn new() -> Self {
    Self::default()
  }

  /// Returns the id for `name`, allocating a fresh one if it hasn't been seen
  pub fn intern(&mut self, name: &str) -> Symbol {
    if let Some(sym) = self.ids.get(name) {
      return *sym;
    }
    let sym = Symbol(self.names.len() as u32);
    self.names.push(name.to_string());
    self.ids.insert(name.to_string(), sym);
    sym
  }

  pub fn get(&self, name: &str) -> Option<Symbol> {
    self.ids.get(name).copied()
  }

  /// Name of an interned symbol. Symbols from a different table may be out of
  /// range and come back as `<unknown>`.
  pub fn name(&self, sym: Symbol) -> &str {
    self
      .names
      .get(sym.index())
      .map(String::as_str)
      .unwrap_or("<unknown>")
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (Symbol, &str)> {
    self
      .names
      .iter()
      .enumerate()
      .map(|(idx, name)| (Symbol(idx as u32), name.as_str()))
  }
}

#[test]
fn test_intern_is_stable() {
  let mut symbols = Symbols::new();
  let np = symbols.intern("NP");
  let vp = symbols.intern("VP");
  assert_eq!(symbols.intern("NP"), np);
  assert!(np < vp);
  assert_eq!(symbols.name(vp), "VP");
  assert_eq!(symbols.get("VP"), Some(vp));
  assert_eq!(symbols.get("PP"), None);
  assert_eq!(symbols.len(), 2);
  assert_eq!(
    symbols.iter().map(|(_, n)| n).collect::<Vec<_>>(),
    vec!["NP", "VP"]
  );
}
