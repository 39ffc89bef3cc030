use criterion::{Criterion, black_box, criterion_group, criterion_main};

use treecyk::GrammarModel;

const GRAMMAR_SRC: &str = include_str!("../grammars/toy.counts");
const XS_SRC: &str = include_str!("../grammars/xs.counts");

fn parse(g: &GrammarModel, input: &[&str]) -> f64 {
  g.parse(input).map(|(log_prob, _)| log_prob).unwrap_or(f64::NEG_INFINITY)
}

fn criterion_benchmark(c: &mut Criterion) {
  let grammar = GRAMMAR_SRC.parse::<GrammarModel>().unwrap();
  let xs = XS_SRC.parse::<GrammarModel>().unwrap();
  let simple_input = "we like the fork".split(' ').collect::<Vec<_>>();
  let complex_input = "I eat red hot food with a knife with the fork"
    .split(' ')
    .collect::<Vec<_>>();
  let ambiguous_input = vec!["x"; 24];

  c.bench_function("parse simple", |b| {
    b.iter(|| parse(black_box(&grammar), black_box(&simple_input)))
  });

  c.bench_function("parse pp attachment", |b| {
    b.iter(|| parse(black_box(&grammar), black_box(&complex_input)))
  });

  c.bench_function("parse 24 ambiguous tokens", |b| {
    b.iter(|| parse(black_box(&xs), black_box(&ambiguous_input)))
  });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
