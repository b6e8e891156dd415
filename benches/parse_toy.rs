use criterion::{black_box, criterion_group, criterion_main, Criterion};

use headchart::{Grammar, ParseOutcome, Parser, ParserConfig, Sentence, TableModel};

const NTS: &str = include_str!("../grammars/toy.nts");
const LEXICON: &str = include_str!("../grammars/toy.lexicon");
const GRM: &str = include_str!("../grammars/toy.grm");
const MODEL: &str = include_str!("../grammars/toy.model");

fn sentence(g: &Grammar, text: &str) -> Sentence {
  let (words, tags): (Vec<&str>, Vec<&str>) = text
    .split(' ')
    .map(|wt| wt.rsplit_once('/').unwrap())
    .unzip();
  Sentence::new(&words, &tags, g).unwrap()
}

fn parse(parser: &mut Parser<'_, TableModel>, s: &Sentence) -> bool {
  matches!(parser.parse(s), Ok(ParseOutcome::Parsed(_)))
}

fn criterion_benchmark(c: &mut Criterion) {
  let grammar = Grammar::from_sources(NTS, LEXICON, GRM).unwrap();
  let model = TableModel::parse(MODEL, &grammar).unwrap();
  let mut parser = Parser::new(&grammar, &model, ParserConfig::default());

  let simple = sentence(&grammar, "John/NNP sleeps/VBZ ./.");
  let transitive = sentence(&grammar, "the/DT big/JJ dog/NN saw/VBD a/DT cat/NN ./.");
  let coordinated = sentence(&grammar, "cats/NNS and/CC dogs/NNS sleep/VB ./.");

  c.bench_function("parse simple", |b| {
    b.iter(|| parse(&mut parser, black_box(&simple)))
  });

  c.bench_function("parse transitive", |b| {
    b.iter(|| parse(&mut parser, black_box(&transitive)))
  });

  c.bench_function("parse coordination", |b| {
    b.iter(|| parse(&mut parser, black_box(&coordinated)))
  });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
