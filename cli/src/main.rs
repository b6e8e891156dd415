use std::env;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::process;

use headchart::{read_sentences, Err, Grammar, ParseOutcome, Parser, ParserConfig, TableModel};
use tracing_subscriber::EnvFilter;

fn usage(prog_name: &str) -> String {
  format!(
    r"Usage: {} SENTENCES GRAMMAR_BASE MODEL [options]

SENTENCES is a file of `n w1 t1 ... wn tn` records. GRAMMAR_BASE names the
GRAMMAR_BASE.nts, GRAMMAR_BASE.lexicon and GRAMMAR_BASE.grm files.

Options:
  -h, --help        Print this message
  -b, --beam N      Beam size as a probability ratio (defaults to 10000)
  -p, --no-punc     Don't prune constituents at commas
  -s, --single-tag  Always trust the tagger's tag
  -t, --treebank    Collapse NP wrappers around base NPs in the flat output
  -c, --chart       Print the chart after each sentence",
    prog_name
  )
}

struct Args {
  sentences: String,
  grammar_base: String,
  model: String,
  config: ParserConfig,
  print_chart: bool,
}

impl Args {
  fn make_error_message(msg: &str, prog_name: impl AsRef<str>) -> String {
    format!("argument error: {}.\n\n{}", msg, usage(prog_name.as_ref()))
  }

  fn parse(v: Vec<String>) -> Result<Self, String> {
    if v.is_empty() {
      return Err(Self::make_error_message("bad argument vector", "headchart"));
    }

    let mut iter = v.into_iter();
    let prog_name = iter.next().unwrap_or_else(|| "headchart".to_string());

    let mut positional: Vec<String> = Vec::new();
    let mut config = ParserConfig::default();
    let mut print_chart = false;

    while let Some(o) = iter.next() {
      if o == "-h" || o == "--help" {
        println!("{}", usage(&prog_name));
        process::exit(0);
      } else if o == "-b" || o == "--beam" {
        let size = iter
          .next()
          .and_then(|n| n.parse::<f64>().ok())
          .filter(|n| *n > 1.0)
          .ok_or_else(|| Self::make_error_message("--beam needs a number above 1", &prog_name))?;
        config = config.with_beam_size(size);
      } else if o == "-p" || o == "--no-punc" {
        config.punctuation_pruning = false;
      } else if o == "-s" || o == "--single-tag" {
        config.all_tags = false;
      } else if o == "-t" || o == "--treebank" {
        config.treebank_output = true;
      } else if o == "-c" || o == "--chart" {
        print_chart = true;
      } else if o.starts_with('-') {
        return Err(Self::make_error_message(&format!("unknown option {}", o), prog_name));
      } else {
        positional.push(o);
      }
    }

    match <[String; 3]>::try_from(positional) {
      Ok([sentences, grammar_base, model]) => Ok(Self {
        sentences,
        grammar_base,
        model,
        config,
        print_chart,
      }),
      Err(given) if given.len() < 3 => {
        Err(Self::make_error_message("not enough arguments", prog_name))
      }
      Err(_) => Err(Self::make_error_message("too many arguments", prog_name)),
    }
  }
}

/// `PROB <sentence number> <log probability> 1` for a parse, `PROB 0 0 0` when
/// the flat fallback follows instead. Sentences are numbered from 1.
fn score_line(id: usize, prob: Option<f64>) -> String {
  match prob {
    Some(prob) => format!("PROB {} {} 1", id, prob),
    None => "PROB 0 0 0".to_string(),
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

  let grammar = Grammar::read_from_files(&opts.grammar_base)?;
  let model = TableModel::read_from_file(&opts.model, &grammar)?;
  let src = fs::read_to_string(&opts.sentences)
    .map_err(|e| -> Err { format!("{}: {}", opts.sentences, e).into() })?;
  let records = read_sentences(&src)?;
  tracing::info!(sentences = records.len(), "read sentences");

  let collapse = opts.config.treebank_output;
  let mut parser = Parser::new(&grammar, &model, opts.config);
  let mut out = BufWriter::new(io::stdout().lock());

  for (i, record) in records.into_iter().enumerate() {
    let id = i + 1;
    let fallback = record.render_fallback();
    let outcome = record
      .into_sentence(&grammar)
      .and_then(|sentence| parser.parse(&sentence));

    match outcome {
      Ok(ParseOutcome::Parsed(best)) => {
        writeln!(out, "{}", score_line(id, Some(best.prob)))?;
        writeln!(out, "{}", best.tree)?;
        writeln!(out, "{}", best.tree.flat(collapse))?;
      }
      Ok(ParseOutcome::NoParse) => {
        writeln!(out, "{}", score_line(id, None))?;
        writeln!(out, "{}", fallback)?;
      }
      Err(e) => {
        tracing::warn!(sentence = id, error = %e, "skipping sentence");
        writeln!(out, "{}", score_line(id, None))?;
        writeln!(out, "{}", fallback)?;
      }
    }

    if opts.print_chart {
      writeln!(out, "chart:\n{}", parser.chart())?;
    }
  }

  out.flush()?;
  Ok(())
}
