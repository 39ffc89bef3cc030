#[macro_use]
extern crate lazy_static;

pub mod counts;
pub mod cyk;
pub mod error;
pub mod grammar;
pub mod parse_counts;
pub mod rules;
pub mod symbols;
pub mod syntree;
pub mod utils;

pub use crate::counts::RuleCounts;
pub use crate::cyk::{Backpointer, CellEntry, Chart, ParseTree};
pub use crate::error::{ConstructionError, ParseFailure};
pub use crate::grammar::{GrammarModel, ScoredLhs};
pub use crate::rules::{Production, Rhs};
pub use crate::symbols::{Symbol, Symbols};
pub use crate::syntree::SynTree;
pub use crate::utils::Err;

impl GrammarModel {
  /// Fills the whole CYK chart for `input` without choosing a parse
  pub fn parse_chart(&self, input: &[&str]) -> Chart {
    cyk::parse_chart(self, input)
  }

  /// The most probable parse of `input` and its log-probability
  pub fn parse(&self, input: &[&str]) -> Result<(f64, ParseTree), ParseFailure> {
    cyk::parse(self, input)
  }
}

#[cfg(test)]
fn tree_log_prob(g: &GrammarModel, tree: &ParseTree) -> f64 {
  let sym = |name: &str| g.symbols().get(name).unwrap();
  let mut total = 0.0;
  for (cons, children) in tree.branches() {
    let rhs = match children.as_slice() {
      [SynTree::Leaf(w)] => Rhs::Terminal(sym(&w.value)),
      [SynTree::Branch(l, _), SynTree::Branch(r, _)] => Rhs::Binary(sym(&l.value), sym(&r.value)),
      _ => panic!("not a CNF tree"),
    };
    let lhs = sym(&cons.value);
    total += g.lookup(&rhs).iter().find(|s| s.lhs == lhs).unwrap().log_prob;
  }
  total
}

#[test]
fn test_a_food() {
  let g: GrammarModel = r#"
    %start NP;
    3 NP -> DT NN;
    1 NP -> NP PP;
    1 PP -> IN NP;
    23 DT -> "a";
    77 DT -> "the";
    12 NN -> "food";
    9818 NN -> "knife";
    1 IN -> "with";
  "#
  .parse()
  .unwrap();
  let sym = |name| g.symbols().get(name).unwrap();

  let dt_a = g.lookup_terminal(sym("a"))[0].log_prob;
  let nn_food = g.lookup_terminal(sym("food"))[0].log_prob;
  let np = g.lookup_binary(sym("DT"), sym("NN"))[0].log_prob;
  assert!((dt_a - -1.47).abs() < 0.01);
  assert!((nn_food - -6.71).abs() < 0.01);

  let (score, tree) = g.parse(&["a", "food"]).unwrap();
  assert_eq!(tree.to_bracketed(), "(NP (DT a) (NN food))");
  assert_eq!(tree.leaves(), vec!["a", "food"]);
  assert_eq!(score, np + dt_a + nn_food);
}

#[test]
fn test_toy_grammar() {
  let g: GrammarModel = include_str!("../grammars/toy.counts").parse().unwrap();
  let input = "I eat red hot food with a knife".split(' ').collect::<Vec<_>>();

  let (score, tree) = g.parse(&input).unwrap();
  println!("{}\n{}", score, tree);

  assert_eq!(tree.leaves(), input);
  assert_eq!(tree.get_branch().unwrap().0.value, "S");
  assert!((score - tree_log_prob(&g, &tree)).abs() < 1e-9);
  // ln of the product of the tree's rule probabilities in toy.counts
  assert!((score - -9.724260726575514).abs() < 1e-12, "score {}", score);
  assert_eq!(
    tree.to_bracketed(),
    "(S (NP+PRP I) (VP (VP (VBP eat) (NP (JJ red) (NP|<JJ-NN> (JJ hot) (NN food)))) (PP (IN with) (NP (DT a) (NN knife)))))"
  );

  assert_eq!(g.parse(&["eat", "a", "knife"]), Err(ParseFailure::NoDerivation));
  assert_eq!(
    g.parse(&["I", "eat", "a", "spoon"]),
    Err(ParseFailure::NoDerivation)
  );
}

#[test]
fn test_every_bracketing_is_found() {
  let g: GrammarModel = include_str!("../grammars/xs.counts").parse().unwrap();
  for n in 1..8 {
    let input = vec!["x"; n];
    let (score, tree) = g.parse(&input).unwrap();
    assert_eq!(tree.leaves().len(), n);
    // n terminal rules and n - 1 binary rules, each with probability 1/2
    let expected = (2 * n - 1) as f64 * -(2.0f64).ln();
    assert!((score - expected).abs() < 1e-9);
  }
}

#[test]
fn test_trained_from_trees() {
  let np = |det: &'static str, noun: &'static str, at: usize| {
    SynTree::branch(
      "NP",
      (at, at + 2),
      vec![
        SynTree::branch("DT", (at, at + 1), vec![SynTree::leaf(det, at)]),
        SynTree::branch("NN", (at + 1, at + 2), vec![SynTree::leaf(noun, at + 1)]),
      ],
    )
  };
  let vp = SynTree::branch(
    "VP",
    (2, 4),
    vec![
      SynTree::branch("VBD", (2, 3), vec![SynTree::leaf("bit", 2)]),
      SynTree::branch("NN", (3, 4), vec![SynTree::leaf("man", 3)]),
    ],
  );
  let s = SynTree::branch("S", (0, 4), vec![np("the", "dog", 0), vp]);
  let trees = [s, np("a", "man", 0)];

  let g = GrammarModel::from_counts(RuleCounts::from_trees(trees.iter()).unwrap()).unwrap();
  assert_eq!(g.start_symbols().len(), 2);

  let (_, tree) = g.parse(&["the", "dog", "bit", "man"]).unwrap();
  assert_eq!(
    tree.to_bracketed(),
    "(S (NP (DT the) (NN dog)) (VP (VBD bit) (NN man)))"
  );
  let (_, tree) = g.parse(&["a", "dog"]).unwrap();
  assert_eq!(tree.to_bracketed(), "(NP (DT a) (NN dog))");
}

#[test]
fn test_concurrent_parses() {
  let g: GrammarModel = include_str!("../grammars/toy.counts").parse().unwrap();
  let sentences = [
    "I eat red hot food with a knife",
    "we like the fork",
    "the knife eat a fork with the food",
    "I like",
  ];
  let expected = sentences
    .iter()
    .map(|s| g.parse(&s.split(' ').collect::<Vec<_>>()))
    .collect::<Vec<_>>();

  let results = std::thread::scope(|scope| {
    let handles = sentences
      .iter()
      .map(|s| {
        let g = &g;
        scope.spawn(move || g.parse(&s.split(' ').collect::<Vec<_>>()))
      })
      .collect::<Vec<_>>();
    handles
      .into_iter()
      .map(|h| h.join().unwrap())
      .collect::<Vec<_>>()
  });

  assert_eq!(results, expected);
  assert!(results[..3].iter().all(|r| r.is_ok()));
  assert_eq!(results[3], Err(ParseFailure::NoDerivation));
}
