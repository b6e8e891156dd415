/// Knobs for one `Parser`. Everything here is fixed for the life of the parser;
/// per-sentence state lives in the chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ParserConfig {
  /// Log-space window below the best edge of a span
  pub beam_width: f64,
  /// Use commas to forbid constituents that end right after one
  pub punctuation_pruning: bool,
  /// Let the tag dictionary override the tagger for frequent words
  pub all_tags: bool,
  /// Collapse NP-over-NPB wrappers in the flat rendering
  pub treebank_output: bool,
  /// Condition dependencies on head adjacency
  pub use_adjacency: bool,
  /// Condition dependencies on intervening verbs
  pub use_verb: bool,
  pub prob_floor: f64,
  pub max_edges: usize,
  pub max_children: usize,
  pub bucket_capacity: usize,
  pub max_closure_rounds: usize,
  pub max_sentence_len: usize,
}

impl Default for ParserConfig {
  fn default() -> Self {
    Self {
      beam_width: 10_000f64.ln(),
      punctuation_pruning: true,
      all_tags: true,
      treebank_output: false,
      use_adjacency: true,
      use_verb: true,
      prob_floor: -5_000_000.0,
      max_edges: 200_000,
      max_children: 3_000_000,
      bucket_capacity: 100,
      max_closure_rounds: 5,
      max_sentence_len: 120,
    }
  }
}

impl ParserConfig {
  /// Set the beam from a raw probability ratio, e.g. `10000`
  pub fn with_beam_size(mut self, size: f64) -> Self {
    self.beam_width = size.ln();
    self
  }

  /// Soft caps: past these, spans are skipped rather than completed
  pub fn soft_edge_cap(&self) -> usize {
    self.max_edges * 2 / 3
  }

  pub fn soft_child_cap(&self) -> usize {
    self.max_children * 2 / 3
  }
}

#[test]
fn test_beam_size_is_stored_as_log() {
  let c = ParserConfig::default().with_beam_size(100.0);
  assert!((c.beam_width - 100f64.ln()).abs() < 1e-12);
  assert!((ParserConfig::default().beam_width - 9.210340371976184).abs() < 1e-9);
  assert_eq!(c.soft_edge_cap(), 133_333);
}
