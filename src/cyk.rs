use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, trace};

use crate::error::ParseFailure;
use crate::grammar::GrammarModel;
use crate::symbols::{Symbol, Symbols};
use crate::syntree::SynTree;
use crate::utils::is_impossible;

/// Best parse of a sentence: non-terminal labels over the input words
pub type ParseTree = SynTree<String, String>;

/// How a chart entry was derived
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backpointer {
  /// Directly from `A -> word` over a single-token span
  Terminal,
  /// From `A -> left right`, with `left` over `start..split` and `right` over `split..end`
  Binary {
    split: usize,
    left: Symbol,
    right: Symbol,
  },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellEntry {
  pub log_prob: f64,
  pub backpointer: Backpointer,
}

/// Best entry per non-terminal over one span. A symbol with no entry has no
/// derivation over the span.
pub type Cell = BTreeMap<Symbol, CellEntry>;

/// Keeps `entry` for `sym` if it beats what the cell already holds.
/// Equal scores keep the incumbent, so the first candidate found wins ties.
fn offer(cell: &mut Cell, sym: Symbol, entry: CellEntry) {
  if is_impossible(entry.log_prob) {
    return;
  }
  match cell.get(&sym) {
    Some(existing) if existing.log_prob >= entry.log_prob => {}
    _ => {
      cell.insert(sym, entry);
    }
  }
}

/// Triangular table of cells over the spans `start..end`, `0 <= start < end <= len`
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
  len: usize,
  cells: Vec<Cell>,
}

impl Chart {
  pub fn new(len: usize) -> Self {
    Self {
      len,
      cells: vec![Cell::new(); len * (len + 1) / 2],
    }
  }

  /// Number of input tokens the chart covers
  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  fn idx(&self, start: usize, end: usize) -> usize {
    assert!(
      start < end && end <= self.len,
      "span {}..{} outside chart of length {}",
      start,
      end,
      self.len
    );
    // row `start` is preceded by rows of length len, len - 1, ..., len - start + 1
    start * (2 * self.len - start + 1) / 2 + (end - start - 1)
  }

  /// All entries over `start..end`.
  ///
  /// # Panics
  ///
  /// If `start..end` is empty or reaches past the end of the chart.
  pub fn cell(&self, start: usize, end: usize) -> &Cell {
    &self.cells[self.idx(start, end)]
  }

  /// The entry for `sym` over `start..end`, if it has a derivation there
  ///
  /// # Panics
  ///
  /// If the span is outside the chart, as for [`Chart::cell`].
  pub fn get(&self, start: usize, end: usize, sym: Symbol) -> Option<&CellEntry> {
    self
      .cell(start, end)
      .get(&sym)
      .filter(|e| !is_impossible(e.log_prob))
  }

  /// Score of `sym` over `start..end`, `-inf` if there is no derivation
  ///
  /// # Panics
  ///
  /// If the span is outside the chart, as for [`Chart::cell`].
  pub fn score(&self, start: usize, end: usize, sym: Symbol) -> f64 {
    self
      .get(start, end, sym)
      .map(|e| e.log_prob)
      .unwrap_or(f64::NEG_INFINITY)
  }

  /// Base case: seeds every single-token span from the terminal rules.
  /// Tokens the grammar has never seen leave their cell empty.
  ///
  /// # Panics
  ///
  /// If `input` is not exactly as long as the chart.
  pub fn fill_lexical(&mut self, g: &GrammarModel, input: &[&str]) {
    assert_eq!(input.len(), self.len, "input length doesn't match chart");

    for (i, token) in input.iter().enumerate() {
      let idx = self.idx(i, i + 1);
      let Some(word) = g.symbols().get(token) else {
        trace!(position = i, token, "unknown token");
        continue;
      };
      for scored in g.lookup_terminal(word) {
        offer(
          &mut self.cells[idx],
          scored.lhs,
          CellEntry {
            log_prob: scored.log_prob,
            backpointer: Backpointer::Terminal,
          },
        );
      }
    }
  }

  /// Recurrence: fills `start..end` from every split of it into two shorter spans.
  /// Every shorter span must already be filled.
  ///
  /// # Panics
  ///
  /// If `start..end` is shorter than two tokens or reaches past the end of the chart.
  pub fn fill_span(&mut self, g: &GrammarModel, start: usize, end: usize) {
    assert!(end >= start + 2, "span {}..{} is lexical", start, end);

    let mut cell = Cell::new();
    for split in start + 1..end {
      let left = self.cell(start, split);
      let right = self.cell(split, end);

      for (&b, left_entry) in left.iter() {
        for (&c, right_entry) in right.iter() {
          for scored in g.lookup_binary(b, c) {
            offer(
              &mut cell,
              scored.lhs,
              CellEntry {
                log_prob: scored.log_prob + left_entry.log_prob + right_entry.log_prob,
                backpointer: Backpointer::Binary {
                  split,
                  left: b,
                  right: c,
                },
              },
            );
          }
        }
      }
    }

    trace!(start, end, entries = cell.len(), "filled span");
    let idx = self.idx(start, end);
    self.cells[idx] = cell;
  }

  /// The best entry over the whole input whose symbol may start a parse.
  /// Ties go to the lowest symbol id.
  pub fn best_root(&self, g: &GrammarModel) -> Option<(Symbol, CellEntry)> {
    if self.is_empty() {
      return None;
    }

    let mut best: Option<(Symbol, CellEntry)> = None;
    for (&sym, entry) in self.cell(0, self.len) {
      if !g.is_start(sym) || is_impossible(entry.log_prob) {
        continue;
      }
      match best {
        Some((_, b)) if b.log_prob >= entry.log_prob => {}
        _ => best = Some((sym, *entry)),
      }
    }
    best
  }

  /// Rebuilds the tree justifying `sym` over `start..end` by following backpointers.
  /// Single-token entries become a pre-terminal node over the word.
  ///
  /// # Panics
  ///
  /// If the span is outside the chart, as for [`Chart::cell`].
  pub fn tree(
    &self,
    symbols: &Symbols,
    input: &[&str],
    sym: Symbol,
    start: usize,
    end: usize,
  ) -> Option<ParseTree> {
    let entry = self.get(start, end, sym)?;
    let label = symbols.name(sym).to_string();

    match entry.backpointer {
      Backpointer::Terminal => {
        let word = input.get(start)?;
        Some(SynTree::branch(
          label,
          (start, end),
          vec![SynTree::leaf(word.to_string(), start)],
        ))
      }
      Backpointer::Binary { split, left, right } => {
        let left = self.tree(symbols, input, left, start, split)?;
        let right = self.tree(symbols, input, right, split, end)?;
        Some(SynTree::branch(label, (start, end), vec![left, right]))
      }
    }
  }

  pub fn display<'a>(&'a self, symbols: &'a Symbols) -> ChartDisplay<'a> {
    ChartDisplay {
      chart: self,
      symbols,
    }
  }
}

pub struct ChartDisplay<'a> {
  chart: &'a Chart,
  symbols: &'a Symbols,
}

impl fmt::Display for ChartDisplay<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let n = self.chart.len();
    for width in 1..=n {
      for start in 0..=(n - width) {
        let end = start + width;
        let cell = self.chart.cell(start, end);
        if cell.is_empty() {
          continue;
        }
        writeln!(f, "{}..{}:", start, end)?;
        for (sym, entry) in cell.iter() {
          write!(f, "  {} {:.4}", self.symbols.name(*sym), entry.log_prob)?;
          match entry.backpointer {
            Backpointer::Terminal => writeln!(f)?,
            Backpointer::Binary { split, left, right } => writeln!(
              f,
              " <- {}..{}: {} + {}..{}: {}",
              start,
              split,
              self.symbols.name(left),
              split,
              end,
              self.symbols.name(right)
            )?,
          }
        }
      }
    }
    Ok(())
  }
}

/// Fills a chart for `input`, shortest spans first
pub fn parse_chart(g: &GrammarModel, input: &[&str]) -> Chart {
  let n = input.len();
  let mut chart = Chart::new(n);
  chart.fill_lexical(g, input);

  for width in 2..=n {
    for start in 0..=(n - width) {
      chart.fill_span(g, start, start + width);
    }
  }

  chart
}

/// Finds the highest-scoring parse of `input` and its log-probability
pub fn parse(g: &GrammarModel, input: &[&str]) -> Result<(f64, ParseTree), ParseFailure> {
  if input.is_empty() {
    return Err(ParseFailure::EmptyInput);
  }

  let chart = parse_chart(g, input);
  let (root, entry) = chart.best_root(g).ok_or_else(|| {
    debug!(tokens = input.len(), "no derivation");
    ParseFailure::NoDerivation
  })?;

  let tree = chart
    .tree(g.symbols(), input, root, 0, input.len())
    .ok_or(ParseFailure::NoDerivation)?;

  debug!(
    tokens = input.len(),
    root = g.symbols().name(root),
    log_prob = entry.log_prob,
    "parsed"
  );
  Ok((entry.log_prob, tree))
}
