use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::ConstructionError;
use crate::rules::Production;
use crate::symbols::{Symbol, Symbols};
use crate::syntree::SynTree;

/// Aggregated rule-usage counts, the input to
/// [`GrammarModel::from_counts`](crate::grammar::GrammarModel::from_counts).
///
/// `lhs_totals` is kept in step with `productions` by [`RuleCounts::add`], so a
/// table built through this API is always normalized. The fields are public
/// so that externally counted tables can be handed over as-is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleCounts {
  pub symbols: Symbols,
  pub productions: BTreeMap<Production, i64>,
  pub lhs_totals: BTreeMap<Symbol, i64>,
  pub start: BTreeSet<Symbol>,
}

impl RuleCounts {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.productions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.productions.is_empty()
  }

  /// Adds `count` observations of `production`.
  ///
  /// Every observation must be positive: a bad count is rejected here rather
  /// than summed into the table, where a later line could cancel it out.
  /// The table is left untouched on error.
  pub fn add(&mut self, production: Production, count: i64) -> Result<(), ConstructionError> {
    if count <= 0 {
      return Err(ConstructionError::NonPositiveCount {
        production: production.display(&self.symbols).to_string(),
        count,
      });
    }

    let overflow = || ConstructionError::CountOverflow {
      production: production.display(&self.symbols).to_string(),
    };
    let rule_total = self
      .productions
      .get(&production)
      .copied()
      .unwrap_or(0)
      .checked_add(count)
      .ok_or_else(overflow)?;
    let lhs_total = self
      .lhs_totals
      .get(&production.lhs)
      .copied()
      .unwrap_or(0)
      .checked_add(count)
      .ok_or_else(overflow)?;

    self.productions.insert(production, rule_total);
    self.lhs_totals.insert(production.lhs, lhs_total);
    Ok(())
  }

  pub fn add_terminal(&mut self, lhs: &str, word: &str, count: i64) -> Result<(), ConstructionError> {
    let lhs = self.symbols.intern(lhs);
    let word = self.symbols.intern(word);
    self.add(Production::terminal(lhs, word), count)
  }

  pub fn add_binary(
    &mut self,
    lhs: &str,
    left: &str,
    right: &str,
    count: i64,
  ) -> Result<(), ConstructionError> {
    let lhs = self.symbols.intern(lhs);
    let left = self.symbols.intern(left);
    let right = self.symbols.intern(right);
    self.add(Production::binary(lhs, left, right), count)
  }

  pub fn add_start(&mut self, name: &str) -> Symbol {
    let sym = self.symbols.intern(name);
    self.start.insert(sym);
    sym
  }

  /// Counts every production used in a collection of already-binarized trees.
  /// The root label of each tree is recorded as a start symbol.
  ///
  /// ```
  /// use treecyk::counts::RuleCounts;
  /// use treecyk::syntree::SynTree;
  ///
  /// let tree = SynTree::branch("NP", (0, 2), vec![
  ///   SynTree::branch("DT", (0, 1), vec![SynTree::leaf("a", 0)]),
  ///   SynTree::branch("NN", (1, 2), vec![SynTree::leaf("food", 1)]),
  /// ]);
  /// let counts = RuleCounts::from_trees([&tree, &tree]).unwrap();
  /// assert_eq!(counts.len(), 3);
  /// assert_eq!(counts.productions.values().sum::<i64>(), 6);
  /// ```
  pub fn from_trees<'a, T, U, I>(trees: I) -> Result<Self, ConstructionError>
  where
    T: AsRef<str> + 'a,
    U: AsRef<str> + 'a,
    I: IntoIterator<Item = &'a SynTree<T, U>>,
  {
    trees
      .into_iter()
      .try_fold(Self::new(), |counts, tree| counts.with_tree(tree))
  }

  /// Folds one tree into the table
  pub fn with_tree<T, U>(mut self, tree: &SynTree<T, U>) -> Result<Self, ConstructionError>
  where
    T: AsRef<str>,
    U: AsRef<str>,
  {
    match tree {
      SynTree::Branch(root, _) => {
        self.add_start(root.value.as_ref());
      }
      SynTree::Leaf(w) => {
        return Err(ConstructionError::NotCnf {
          span: w.span,
          reason: "bare word at the root".to_string(),
        });
      }
    }
    self.count_subtree(tree)?;
    Ok(self)
  }

  fn count_subtree<T, U>(&mut self, tree: &SynTree<T, U>) -> Result<(), ConstructionError>
  where
    T: AsRef<str>,
    U: AsRef<str>,
  {
    let Some((cons, children)) = tree.get_branch() else {
      // words are counted by their parent
      return Ok(());
    };
    let lhs = cons.value.as_ref();

    match children.as_slice() {
      [SynTree::Leaf(w)] => self.add_terminal(lhs, w.value.as_ref(), 1),
      [SynTree::Branch(left, _), SynTree::Branch(right, _)] => {
        self.add_binary(lhs, left.value.as_ref(), right.value.as_ref(), 1)?;
        for child in children {
          self.count_subtree(child)?;
        }
        Ok(())
      }
      _ => Err(ConstructionError::NotCnf {
        span: cons.span,
        reason: format!(
          "{} has {} children, expected one word or two constituents",
          lhs,
          children.len()
        ),
      }),
    }
  }
}

impl fmt::Display for RuleCounts {
  /// Writes the table in the count-file format read by [`crate::parse_counts`]
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for sym in self.start.iter() {
      writeln!(f, "%start {};", self.symbols.name(*sym))?;
    }
    for (production, count) in self.productions.iter() {
      writeln!(f, "{} {};", count, production.display(&self.symbols))?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn np(det: &'static str, noun: &'static str) -> SynTree<&'static str, &'static str> {
    SynTree::branch(
      "NP",
      (0, 2),
      vec![
        SynTree::branch("DT", (0, 1), vec![SynTree::leaf(det, 0)]),
        SynTree::branch("NN", (1, 2), vec![SynTree::leaf(noun, 1)]),
      ],
    )
  }

  #[test]
  fn test_count_trees() {
    let trees = [np("a", "food"), np("the", "food"), np("a", "knife")];
    let counts = RuleCounts::from_trees(trees.iter()).unwrap();

    let sym = |name| counts.symbols.get(name).unwrap();
    assert_eq!(counts.lhs_totals[&sym("NP")], 3);
    assert_eq!(counts.lhs_totals[&sym("DT")], 3);
    assert_eq!(
      counts.productions[&Production::terminal(sym("DT"), sym("a"))],
      2
    );
    assert_eq!(
      counts.productions[&Production::binary(sym("NP"), sym("DT"), sym("NN"))],
      3
    );
    assert_eq!(counts.start, BTreeSet::from([sym("NP")]));
  }

  #[test]
  fn test_totals_track_productions() {
    let mut counts = RuleCounts::new();
    counts.add_terminal("DT", "a", 2).unwrap();
    counts.add_terminal("DT", "the", 5).unwrap();
    counts.add_terminal("DT", "a", 1).unwrap();
    let dt = counts.symbols.get("DT").unwrap();
    assert_eq!(counts.len(), 2);
    assert_eq!(counts.lhs_totals[&dt], 8);
  }

  #[test]
  fn test_reject_non_positive_observation() {
    let mut counts = RuleCounts::new();
    assert!(matches!(
      counts.add_terminal("A", "a", -1),
      Err(ConstructionError::NonPositiveCount { count: -1, .. })
    ));
    assert!(counts.add_terminal("A", "a", 0).is_err());
    assert!(counts.is_empty());
    assert!(counts.lhs_totals.is_empty());

    // a later positive line doesn't make up for the bad one
    counts.add_terminal("A", "a", 2).unwrap();
    let a = counts.symbols.get("A").unwrap();
    assert_eq!(counts.lhs_totals[&a], 2);
  }

  #[test]
  fn test_reject_overflowing_counts() {
    let mut counts = RuleCounts::new();
    counts.add_terminal("A", "a", i64::MAX).unwrap();
    assert!(matches!(
      counts.add_terminal("A", "b", 1),
      Err(ConstructionError::CountOverflow { .. })
    ));
    assert!(matches!(
      counts.add_terminal("A", "a", 1),
      Err(ConstructionError::CountOverflow { .. })
    ));

    let a = counts.symbols.get("A").unwrap();
    assert_eq!(counts.len(), 1);
    assert_eq!(counts.lhs_totals[&a], i64::MAX);
  }

  #[test]
  fn test_reject_non_cnf() {
    let flat = SynTree::branch(
      "NP",
      (0, 3),
      vec![
        SynTree::branch("DT", (0, 1), vec![SynTree::leaf("a", 0)]),
        SynTree::branch("JJ", (1, 2), vec![SynTree::leaf("red", 1)]),
        SynTree::branch("NN", (2, 3), vec![SynTree::leaf("knife", 2)]),
      ],
    );
    let err = RuleCounts::from_trees([&flat]).unwrap_err();
    assert!(matches!(err, ConstructionError::NotCnf { span: (0, 3), .. }));

    let unary: SynTree<&str, &str> = SynTree::branch(
      "S",
      (0, 1),
      vec![SynTree::branch("NN", (0, 1), vec![SynTree::leaf("food", 0)])],
    );
    assert!(RuleCounts::from_trees([&unary]).is_err());

    let bare: SynTree<&str, &str> = SynTree::leaf("food", 0);
    assert!(RuleCounts::from_trees([&bare]).is_err());
  }

  #[test]
  fn test_display_format() {
    let counts = RuleCounts::from_trees([&np("a", "food")]).unwrap();
    assert_eq!(
      counts.to_string(),
      "%start NP;\n1 NP -> DT NN;\n1 DT -> \"a\";\n1 NN -> \"food\";\n"
    );
  }
}
