use std::env;
use std::io;
use std::io::Write;
use std::process;

use tracing::info;
use tracing_subscriber::EnvFilter;

use treecyk::{Err, GrammarModel, ParseFailure};

fn usage(prog_name: &str) -> String {
  format!(
    r"Usage: {} FILE [options]

Reads sentences from stdin, one per line, and prints the most probable parse
of each under the rule counts in FILE.

Options:
  -h, --help          Print this message
  -c, --chart         Print the parse chart (defaults to not printing)
  -g, --grammar       Print the estimated grammar after loading it
  -l, --lowercase     Lowercase input before parsing
  -s, --start SYMBOL  Accept SYMBOL as a root (repeatable, overrides %start)

Set RUST_LOG=debug for parser diagnostics on stderr.",
    prog_name
  )
}

fn parse(g: &GrammarModel, sentence: &str, print_chart: bool) -> Result<(), Err> {
  let sentence = sentence.split_whitespace().collect::<Vec<_>>();

  if print_chart {
    let chart = g.parse_chart(&sentence);
    println!("chart:\n{}", chart.display(g.symbols()));
  }

  match g.parse(&sentence) {
    Ok((log_prob, tree)) => {
      println!("log-probability: {:.4}", log_prob);
      println!("{}", tree);
    }
    Err(ParseFailure::EmptyInput) => {}
    Err(failure) => println!("no parse: {}", failure),
  }
  println!();

  Ok(())
}

struct Args {
  filename: String,
  start: Vec<String>,
  print_chart: bool,
  print_grammar: bool,
  lowercase: bool,
}

impl Args {
  fn make_error_message(msg: &str, prog_name: impl AsRef<str>) -> String {
    format!("argument error: {}.\n\n{}", msg, usage(prog_name.as_ref()))
  }

  fn parse(v: Vec<String>) -> Result<Self, String> {
    let mut iter = v.into_iter();
    let Some(prog_name) = iter.next() else {
      return Err(Self::make_error_message("bad argument vector", "treecyk"));
    };

    let mut filename: Option<String> = None;
    let mut start = Vec::new();
    let mut print_chart = false;
    let mut print_grammar = false;
    let mut lowercase = false;

    while let Some(o) = iter.next() {
      if o == "-h" || o == "--help" {
        println!("{}", usage(&prog_name));
        process::exit(0);
      } else if o == "-c" || o == "--chart" {
        print_chart = true;
      } else if o == "-g" || o == "--grammar" {
        print_grammar = true;
      } else if o == "-l" || o == "--lowercase" {
        lowercase = true;
      } else if o == "-s" || o == "--start" {
        match iter.next() {
          Some(sym) => start.push(sym),
          None => return Err(Self::make_error_message("--start needs a symbol", prog_name)),
        }
      } else if o.starts_with('-') {
        return Err(Self::make_error_message(&format!("unknown option {}", o), prog_name));
      } else if filename.is_none() {
        filename = Some(o);
      } else {
        return Err(Self::make_error_message("invalid arguments", prog_name));
      }
    }

    if let Some(filename) = filename {
      Ok(Self {
        filename,
        start,
        print_chart,
        print_grammar,
        lowercase,
      })
    } else {
      Err(Self::make_error_message("missing filename", prog_name))
    }
  }
}

fn main() -> Result<(), Err> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(io::stderr)
    .init();

  let opts = match Args::parse(env::args().collect()) {
    Ok(opts) => opts,
    Err(msg) => {
      eprintln!("{}", msg);
      process::exit(255);
    }
  };

  let mut g = GrammarModel::read_from_file(&opts.filename)?;
  if !opts.start.is_empty() {
    g = g.with_start_symbols(&opts.start)?;
  }
  info!(
    file = %opts.filename,
    rules = g.rule_count(),
    "loaded grammar"
  );

  if opts.print_grammar {
    println!("{}", g);
  }

  let mut input = String::new();
  loop {
    print!("> ");
    io::stdout().flush()?;

    match io::stdin().read_line(&mut input) {
      Ok(_) => {
        if input.is_empty() {
          // ctrl+d
          return Ok(());
        }
        if opts.lowercase {
          input.make_ascii_lowercase();
        }
        parse(&g, input.trim(), opts.print_chart)?;
        input.clear();
      }
      Err(error) => return Err(error.into()),
    }
  }
}
