//! Error types for model construction and parsing.

/// Errors raised while turning rule counts into a [`GrammarModel`](crate::grammar::GrammarModel).
///
/// These all mean the training data is corrupt or empty; there is nothing to
/// recover locally.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConstructionError {
  /// A production's LHS has no entry in the LHS totals.
  #[error("no total count for left-hand side {lhs}")]
  MissingLhsTotal {
    /// Name of the LHS symbol.
    lhs: String,
  },

  /// A production was counted zero or fewer times.
  #[error("non-positive count {count} for production {production}")]
  NonPositiveCount {
    /// The production, rendered as `LHS -> RHS`.
    production: String,
    /// The offending count.
    count: i64,
  },

  /// Accumulating a count overflowed.
  #[error("count for production {production} overflows")]
  CountOverflow {
    /// The production, rendered as `LHS -> RHS`.
    production: String,
  },

  /// An LHS total is zero or negative.
  #[error("non-positive total {count} for left-hand side {lhs}")]
  NonPositiveLhsTotal {
    /// Name of the LHS symbol.
    lhs: String,
    /// The offending total.
    count: i64,
  },

  /// The probabilities of an LHS's productions don't sum to one.
  #[error("productions of {lhs} sum to probability {total}, not 1")]
  Unnormalized {
    /// Name of the LHS symbol.
    lhs: String,
    /// The actual probability mass.
    total: f64,
  },

  /// There were no productions at all.
  #[error("empty grammar: no productions were counted")]
  EmptyGrammar,

  /// A requested start symbol is not a non-terminal of the grammar.
  #[error("unknown start symbol {name}")]
  UnknownStartSymbol {
    /// The requested name.
    name: String,
  },

  /// A training tree contains a node that is neither `A -> B C` nor `A -> word`.
  #[error("tree is not in Chomsky normal form at {span:?}: {reason}")]
  NotCnf {
    /// Span of the offending node.
    span: (usize, usize),
    /// What was wrong with it.
    reason: String,
  },
}

/// Why a parse produced no tree.
///
/// Both variants are ordinary outcomes for a grammar that doesn't cover the
/// input, not defects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParseFailure {
  /// No derivation by an eligible start symbol covers the whole input.
  #[error("no derivation spans the whole input")]
  NoDerivation,

  /// The input had no tokens, so there is no root span.
  #[error("cannot parse an empty token sequence")]
  EmptyInput,
}
