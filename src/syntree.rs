use std::fmt;

/// A labelled internal node covering `span` (start inclusive, end exclusive)
#[derive(Debug, PartialEq, Clone)]
pub struct Constituent<T> {
  pub value: T,
  pub span: (usize, usize),
}

/// A token of the input, at `span.0`
#[derive(Debug, PartialEq, Clone)]
pub struct Word<U> {
  pub value: U,
  pub span: (usize, usize),
}

/// An owned constituency tree. Every branch owns its children outright, so a
/// tree built from chart backpointers needs no sharing.
#[derive(Debug, PartialEq, Clone)]
pub enum SynTree<T, U> {
  Branch(Constituent<T>, Vec<SynTree<T, U>>),
  Leaf(Word<U>),
}

impl<T, U> SynTree<T, U> {
  pub fn branch(value: T, span: (usize, usize), children: Vec<SynTree<T, U>>) -> Self {
    Self::Branch(Constituent { value, span }, children)
  }

  pub fn leaf(value: U, pos: usize) -> Self {
    Self::Leaf(Word {
      value,
      span: (pos, pos + 1),
    })
  }

  pub fn is_leaf(&self) -> bool {
    matches!(self, Self::Leaf(_))
  }

  pub fn is_branch(&self) -> bool {
    matches!(self, Self::Branch(_, _))
  }

  pub fn get_leaf(&self) -> Option<&Word<U>> {
    match self {
      Self::Leaf(w) => Some(w),
      _ => None,
    }
  }

  pub fn get_branch(&self) -> Option<(&Constituent<T>, &Vec<SynTree<T, U>>)> {
    match self {
      Self::Branch(c, cs) => Some((c, cs)),
      _ => None,
    }
  }

  pub fn span(&self) -> (usize, usize) {
    match self {
      Self::Branch(c, _) => c.span,
      Self::Leaf(w) => w.span,
    }
  }

  /// The words at the leaves, left to right
  pub fn leaves(&self) -> Vec<&U> {
    let mut out = Vec::new();
    self.collect_leaves(&mut out);
    out
  }

  fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a U>) {
    match self {
      Self::Leaf(w) => out.push(&w.value),
      Self::Branch(_, children) => {
        for child in children {
          child.collect_leaves(out);
        }
      }
    }
  }

  /// Depth-first pre-order walk over the branch nodes
  pub fn branches(&self) -> Vec<(&Constituent<T>, &Vec<SynTree<T, U>>)> {
    let mut out = Vec::new();
    let mut stack = vec![self];
    while let Some(node) = stack.pop() {
      if let Self::Branch(c, children) = node {
        out.push((c, children));
        stack.extend(children.iter().rev());
      }
    }
    out
  }
}

impl<T, U> SynTree<T, U>
where
  T: fmt::Display,
  U: fmt::Display,
{
  /// Single-line bracketed form, `(NP (DT a) (NN food))`
  pub fn to_bracketed(&self) -> String {
    match self {
      Self::Leaf(w) => w.value.to_string(),
      Self::Branch(c, children) => {
        let mut s = format!("({}", c.value);
        for child in children {
          s.push(' ');
          s.push_str(&child.to_bracketed());
        }
        s.push(')');
        s
      }
    }
  }
}

impl<T, U> fmt::Display for SynTree<T, U>
where
  T: fmt::Display,
  U: fmt::Display,
{
  /// Indented bracketed form. Nodes whose children are all leaves stay on one line.
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Leaf(w) => write!(f, "{}", w.value),
      Self::Branch(c, children) => {
        if children.iter().all(|t| t.is_leaf()) {
          return write!(f, "{}", self.to_bracketed());
        }
        write!(f, "({}", c.value)?;
        for t in children.iter() {
          let fmt = format!("{}", t);
          for line in fmt.lines() {
            write!(f, "\n  {}", line)?;
          }
        }
        write!(f, ")")
      }
    }
  }
}
