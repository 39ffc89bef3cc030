use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use tracing::debug;

use crate::counts::RuleCounts;
use crate::error::ConstructionError;
use crate::rules::{Production, Rhs};
use crate::symbols::{Symbol, Symbols};
use crate::utils::log_ratio;

/// How far the probabilities of one LHS may drift from summing to 1
pub const NORMALIZATION_TOLERANCE: f64 = 1e-9;

/// A left-hand side that can produce some RHS, with `ln P(rhs | lhs)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredLhs {
  pub lhs: Symbol,
  pub log_prob: f64,
}

/// A PCFG in Chomsky normal form, indexed by right-hand side.
///
/// Bottom-up parsing holds two finished children and asks which parents could
/// have produced them, so the index is keyed by [`Rhs`] rather than by LHS.
/// The model is immutable after construction and can be shared between
/// threads for concurrent parses.
#[derive(Debug, Clone)]
pub struct GrammarModel {
  symbols: Symbols,
  index: HashMap<Rhs, Vec<ScoredLhs>>,
  start: BTreeSet<Symbol>,
  nonterminals: BTreeSet<Symbol>,
  terminals: BTreeSet<Symbol>,
  rule_count: usize,
}

impl GrammarModel {
  /// Estimates rule probabilities by relative frequency:
  /// `ln P(A -> rhs) = ln count(A -> rhs) - ln count(A)`.
  ///
  /// Fails if a count or total is non-positive, if a production's LHS has no
  /// total, or if an LHS's probabilities don't sum to 1, all of which mean the
  /// counts are corrupt.
  pub fn build(
    symbols: Symbols,
    production_counts: &BTreeMap<Production, i64>,
    lhs_counts: &BTreeMap<Symbol, i64>,
  ) -> Result<Self, ConstructionError> {
    if production_counts.is_empty() {
      return Err(ConstructionError::EmptyGrammar);
    }

    if let Some((lhs, count)) = lhs_counts.iter().find(|(_, count)| **count <= 0) {
      return Err(ConstructionError::NonPositiveLhsTotal {
        lhs: symbols.name(*lhs).to_string(),
        count: *count,
      });
    }

    let mut index: HashMap<Rhs, Vec<ScoredLhs>> = HashMap::new();
    let mut mass: BTreeMap<Symbol, f64> = BTreeMap::new();
    let mut nonterminals = BTreeSet::new();
    let mut terminals = BTreeSet::new();

    for (production, &count) in production_counts.iter() {
      if count <= 0 {
        return Err(ConstructionError::NonPositiveCount {
          production: production.display(&symbols).to_string(),
          count,
        });
      }
      let total = *lhs_counts
        .get(&production.lhs)
        .ok_or_else(|| ConstructionError::MissingLhsTotal {
          lhs: symbols.name(production.lhs).to_string(),
        })?;

      let log_prob = log_ratio(count, total);
      *mass.entry(production.lhs).or_insert(0.0) += log_prob.exp();

      nonterminals.insert(production.lhs);
      match production.rhs {
        Rhs::Terminal(t) => {
          terminals.insert(t);
        }
        Rhs::Binary(l, r) => {
          nonterminals.insert(l);
          nonterminals.insert(r);
        }
      }

      index.entry(production.rhs).or_default().push(ScoredLhs {
        lhs: production.lhs,
        log_prob,
      });
    }

    for (lhs, total) in mass {
      if (total - 1.0).abs() > NORMALIZATION_TOLERANCE {
        return Err(ConstructionError::Unnormalized {
          lhs: symbols.name(lhs).to_string(),
          total,
        });
      }
    }

    debug!(
      rules = production_counts.len(),
      rhs_keys = index.len(),
      nonterminals = nonterminals.len(),
      terminals = terminals.len(),
      "built grammar model"
    );

    Ok(Self {
      symbols,
      index,
      start: BTreeSet::new(),
      nonterminals,
      terminals,
      rule_count: production_counts.len(),
    })
  }

  /// Builds a model from a count table, keeping its start symbols
  pub fn from_counts(counts: RuleCounts) -> Result<Self, ConstructionError> {
    let RuleCounts {
      symbols,
      productions,
      lhs_totals,
      start,
    } = counts;
    let mut model = Self::build(symbols, &productions, &lhs_totals)?;
    if let Some(&sym) = start.iter().find(|&&sym| !model.nonterminals.contains(&sym)) {
      return Err(ConstructionError::UnknownStartSymbol {
        name: model.symbols.name(sym).to_string(),
      });
    }
    model.start = start;
    Ok(model)
  }

  /// Replaces the start symbols. An empty list makes every symbol eligible as a root.
  pub fn with_start_symbols<I, S>(mut self, names: I) -> Result<Self, ConstructionError>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let mut start = BTreeSet::new();
    for name in names {
      let name = name.as_ref();
      match self.symbols.get(name) {
        Some(sym) if self.nonterminals.contains(&sym) => {
          start.insert(sym);
        }
        _ => {
          return Err(ConstructionError::UnknownStartSymbol {
            name: name.to_string(),
          });
        }
      }
    }
    self.start = start;
    Ok(self)
  }

  /// All left-hand sides that produce `rhs`. Unseen keys give an empty slice.
  pub fn lookup(&self, rhs: &Rhs) -> &[ScoredLhs] {
    self.index.get(rhs).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn lookup_terminal(&self, word: Symbol) -> &[ScoredLhs] {
    self.lookup(&Rhs::Terminal(word))
  }

  pub fn lookup_binary(&self, left: Symbol, right: Symbol) -> &[ScoredLhs] {
    self.lookup(&Rhs::Binary(left, right))
  }

  /// Whether `sym` may head a complete parse
  pub fn is_start(&self, sym: Symbol) -> bool {
    self.start.is_empty() || self.start.contains(&sym)
  }

  pub fn start_symbols(&self) -> &BTreeSet<Symbol> {
    &self.start
  }

  pub fn symbols(&self) -> &Symbols {
    &self.symbols
  }

  pub fn nonterminals(&self) -> &BTreeSet<Symbol> {
    &self.nonterminals
  }

  pub fn terminals(&self) -> &BTreeSet<Symbol> {
    &self.terminals
  }

  pub fn rule_count(&self) -> usize {
    self.rule_count
  }

  /// Every scored production, ordered by LHS then RHS
  pub fn rules(&self) -> Vec<(Production, f64)> {
    let mut rules = self
      .index
      .iter()
      .flat_map(|(rhs, scored)| {
        scored.iter().map(move |s| {
          (
            Production {
              lhs: s.lhs,
              rhs: *rhs,
            },
            s.log_prob,
          )
        })
      })
      .collect::<Vec<_>>();
    rules.sort_by(|a, b| a.0.cmp(&b.0));
    rules
  }
}

impl fmt::Display for GrammarModel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "//** start:")?;
    for sym in self.start.iter() {
      write!(f, " {}", self.symbols.name(*sym))?;
    }
    writeln!(f)?;
    writeln!(
      f,
      "//** {} rules, {} nonterminals, {} terminals",
      self.rule_count,
      self.nonterminals.len(),
      self.terminals.len()
    )?;

    for (production, log_prob) in self.rules() {
      writeln!(f, "{:.6} {};", log_prob, production.display(&self.symbols))?;
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn toy_counts() -> RuleCounts {
    let mut counts = RuleCounts::new();
    counts.add_start("NP");
    counts.add_binary("NP", "DT", "NN", 3).unwrap();
    counts.add_binary("NP", "NP", "PP", 1).unwrap();
    counts.add_binary("PP", "IN", "NP", 2).unwrap();
    counts.add_terminal("DT", "a", 23).unwrap();
    counts.add_terminal("DT", "the", 77).unwrap();
    counts.add_terminal("NN", "food", 12).unwrap();
    counts.add_terminal("NN", "knife", 9988).unwrap();
    counts.add_terminal("IN", "with", 4).unwrap();
    counts
  }

  #[test]
  fn test_normalized() {
    let model = GrammarModel::from_counts(toy_counts()).unwrap();

    let mut mass: BTreeMap<Symbol, f64> = BTreeMap::new();
    for (production, log_prob) in model.rules() {
      assert!(log_prob <= 0.0 && log_prob.is_finite());
      *mass.entry(production.lhs).or_insert(0.0) += log_prob.exp();
    }
    assert_eq!(mass.len(), 5);
    for total in mass.values() {
      assert!((total - 1.0).abs() < 1e-9);
    }
  }

  #[test]
  fn test_lookup() {
    let model = GrammarModel::from_counts(toy_counts()).unwrap();
    let sym = |name| model.symbols().get(name).unwrap();

    let dts = model.lookup_terminal(sym("a"));
    assert_eq!(dts.len(), 1);
    assert_eq!(dts[0].lhs, sym("DT"));
    assert!((dts[0].log_prob - (-1.4697)).abs() < 1e-3);

    let nps = model.lookup_binary(sym("DT"), sym("NN"));
    assert_eq!(nps.len(), 1);
    assert_eq!(nps[0].log_prob, (3.0f64).ln() - (4.0f64).ln());

    // unseen keys are empty, not errors
    assert!(model.lookup_binary(sym("NN"), sym("DT")).is_empty());
    assert!(model.lookup_terminal(sym("NP")).is_empty());

    assert_eq!(model.rule_count(), 8);
    assert!(model.is_start(sym("NP")));
    assert!(!model.is_start(sym("PP")));
  }

  #[test]
  fn test_missing_lhs_total() {
    let mut counts = toy_counts();
    let pp = counts.symbols.get("PP").unwrap();
    counts.lhs_totals.remove(&pp);
    assert_eq!(
      GrammarModel::from_counts(counts).unwrap_err(),
      ConstructionError::MissingLhsTotal {
        lhs: "PP".to_string()
      }
    );
  }

  #[test]
  fn test_non_positive_counts() {
    let mut counts = toy_counts();
    let in_ = counts.symbols.get("IN").unwrap();
    let of = counts.symbols.intern("of");
    counts.productions.insert(Production::terminal(in_, of), 0);
    assert!(matches!(
      GrammarModel::from_counts(counts),
      Err(ConstructionError::NonPositiveCount { count: 0, .. })
    ));

    let mut counts = toy_counts();
    let dt = counts.symbols.get("DT").unwrap();
    counts.lhs_totals.insert(dt, -100);
    assert!(matches!(
      GrammarModel::from_counts(counts),
      Err(ConstructionError::NonPositiveLhsTotal { count: -100, .. })
    ));
  }

  #[test]
  fn test_unnormalized() {
    let mut counts = toy_counts();
    let nn = counts.symbols.get("NN").unwrap();
    counts.lhs_totals.insert(nn, 20000);
    assert!(matches!(
      GrammarModel::from_counts(counts),
      Err(ConstructionError::Unnormalized { .. })
    ));
  }

  #[test]
  fn test_empty() {
    assert_eq!(
      GrammarModel::from_counts(RuleCounts::new()).unwrap_err(),
      ConstructionError::EmptyGrammar
    );
  }

  #[test]
  fn test_start_symbols() {
    let model = GrammarModel::from_counts(toy_counts())
      .unwrap()
      .with_start_symbols(["PP", "NP"])
      .unwrap();
    assert_eq!(model.start_symbols().len(), 2);

    let model = model.with_start_symbols(Vec::<String>::new()).unwrap();
    let pp = model.symbols().get("PP").unwrap();
    assert!(model.is_start(pp));

    assert!(matches!(
      model.clone().with_start_symbols(["VP"]),
      Err(ConstructionError::UnknownStartSymbol { .. })
    ));
    // terminals can't head a parse
    assert!(model.with_start_symbols(["food"]).is_err());
  }

  #[test]
  fn test_counted_start_must_be_nonterminal() {
    let mut counts = toy_counts();
    counts.add_start("Sx");
    assert_eq!(
      GrammarModel::from_counts(counts).unwrap_err(),
      ConstructionError::UnknownStartSymbol {
        name: "Sx".to_string()
      }
    );

    let mut counts = toy_counts();
    counts.add_start("knife");
    assert!(matches!(
      GrammarModel::from_counts(counts),
      Err(ConstructionError::UnknownStartSymbol { .. })
    ));
  }

  #[test]
  fn test_shareable() {
    fn assert_sync<T: Send + Sync>() {}
    assert_sync::<GrammarModel>();
  }
}
