#[macro_use]
extern crate lazy_static;

/// helper macro for initializing a regex with lazy_static!
macro_rules! regex_static {
  ($name:ident, $pattern:expr) => {
    lazy_static! {
      static ref $name: Regex = Regex::new($pattern).unwrap();
    }
  };
}

pub mod beam;
pub mod buckets;
pub mod chart;
pub mod closure;
pub mod config;
pub mod context;
pub mod edge;
pub mod grammar;
pub mod join;
pub mod model;
pub mod parse_grammar;
pub mod parser;
pub mod sentence;
pub mod syntree;
pub mod utils;

pub use crate::config::ParserConfig;
pub use crate::grammar::Grammar;
pub use crate::model::{Event, ProbabilityModel, TableModel};
pub use crate::parser::{BestParse, ParseOutcome, Parser};
pub use crate::sentence::{read_sentences, Sentence, TaggedWords};
pub use crate::syntree::ParseTree;
pub use crate::utils::{Err, InputError};

#[cfg(test)]
mod tests {
  use super::*;

  macro_rules! grammar_file {
    ($filename:expr) => {
      include_str!(concat!("../grammars/", $filename))
    };
  }

  fn toy() -> (Grammar, TableModel) {
    let g = Grammar::from_sources(
      grammar_file!("toy.nts"),
      grammar_file!("toy.lexicon"),
      grammar_file!("toy.grm"),
    )
    .unwrap();
    let m = TableModel::parse(grammar_file!("toy.model"), &g).unwrap();
    (g, m)
  }

  #[test]
  fn smoke_test_toy_grammar() {
    let (g, m) = toy();
    let records = read_sentences(
      "3 John NNP sleeps VBZ . .\n\
       6 the DT dog NN saw VBD a DT cat NN . .\n\
       5 cats NNS and CC dogs NNS sleep VB . .\n",
    )
    .unwrap();

    let mut parser = Parser::new(&g, &m, ParserConfig::default());
    for (i, words) in records.into_iter().enumerate() {
      let sentence = words.into_sentence(&g).unwrap();
      let outcome = parser.parse(&sentence).unwrap();
      let best = outcome.best().unwrap_or_else(|| panic!("sentence {} didn't parse", i + 1));
      assert!(best.prob < 0.0);
      assert!(best.tree.flat(false).starts_with("(TOP~"));
      assert!(best.tree.skeleton().ends_with(" ."));
    }
  }

  #[test]
  fn unparseable_sentences_fall_back() {
    let (g, m) = toy();
    let words = read_sentences("2 big JJ big JJ").unwrap().remove(0);
    let sentence = words.into_sentence(&g).unwrap();
    let mut parser = Parser::new(&g, &m, ParserConfig::default());
    assert_eq!(parser.parse(&sentence).unwrap(), ParseOutcome::NoParse);
    assert_eq!(sentence.render_fallback(), "(TOP big/JJ big/JJ )");
  }
}
