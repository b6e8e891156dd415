//! The chart driver: places the part-of-speech axioms, completes every span
//! bottom-up and reads the best root edge off the finished chart.

use crate::beam::AdmissionPolicy;
use crate::chart::{Chart, Span};
use crate::config::ParserConfig;
use crate::context::Direction;
use crate::edge::{Child, Edge, EdgeId};
use crate::grammar::{Grammar, Nt, WordId};
use crate::model::{Dependency, Event, Modifier, ProbCache, ProbabilityModel};
use crate::sentence::{Punctuation, Sentence};
use crate::syntree::ParseTree;
use crate::utils::InputError;

/// The highest-scoring root edge and the tree under it
#[derive(Debug, Clone, PartialEq)]
pub struct BestParse {
  pub edge: EdgeId,
  pub prob: f64,
  pub tree: ParseTree,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
  Parsed(BestParse),
  /// No saturated root edge covers the sentence
  NoParse,
}

impl ParseOutcome {
  pub fn is_parsed(&self) -> bool {
    matches!(self, Self::Parsed(_))
  }

  pub fn best(&self) -> Option<&BestParse> {
    match self {
      Self::Parsed(best) => Some(best),
      Self::NoParse => None,
    }
  }
}

/// A parser bound to one grammar and one model. The chart and the probability
/// cache are reused across sentences, so parse with one `Parser` per thread.
pub struct Parser<'g, M: ProbabilityModel + ?Sized> {
  grammar: &'g Grammar,
  model: &'g M,
  config: ParserConfig,
  chart: Chart,
  cache: ProbCache,
}

impl<'g, M: ProbabilityModel + ?Sized> Parser<'g, M> {
  pub fn new(grammar: &'g Grammar, model: &'g M, config: ParserConfig) -> Self {
    let policy = AdmissionPolicy::new(&config, grammar);
    let chart = Chart::new(policy, grammar.landmarks.top, grammar.num_nts(), &config);
    Self {
      grammar,
      model,
      config,
      chart,
      cache: ProbCache::new(),
    }
  }

  pub fn config(&self) -> &ParserConfig {
    &self.config
  }

  /// The chart of the last sentence parsed
  pub fn chart(&self) -> &Chart {
    &self.chart
  }

  pub fn cache(&self) -> &ProbCache {
    &self.cache
  }

  pub fn parse(&mut self, sentence: &Sentence) -> Result<ParseOutcome, InputError> {
    sentence.check_len(self.config.max_sentence_len)?;
    tracing::debug!(tokens = sentence.len(), "parsing sentence");

    self.chart.reset(sentence.len());
    self.cache.clear();

    let mut session = Session {
      grammar: self.grammar,
      model: self.model,
      config: &self.config,
      sentence,
      chart: &mut self.chart,
      cache: &mut self.cache,
      scratch: Vec::new(),
    };
    session.place_axioms();
    session.complete_all();
    let root = session.best_root();

    let outcome = match root {
      Some(id) => match ParseTree::from_chart(&self.chart, id, sentence, self.grammar) {
        Some(tree) => ParseOutcome::Parsed(BestParse {
          edge: id,
          prob: self.chart.edge(id).prob,
          tree,
        }),
        None => {
          tracing::debug!(edge = %id, "best root edge has a cyclic derivation");
          ParseOutcome::NoParse
        }
      },
      None => ParseOutcome::NoParse,
    };

    tracing::debug!(
      edges = self.chart.len(),
      children = self.chart.num_children(),
      events = self.cache.len(),
      cache_hits = self.cache.hits(),
      parsed = outcome.is_parsed(),
      "finished sentence"
    );
    Ok(outcome)
  }
}

/// Head-side features of a dependency query
#[derive(Debug, Clone, Copy)]
pub(crate) struct HeadSide {
  pub word: WordId,
  pub tag: Nt,
  pub label: Nt,
  pub distance: u32,
  pub subcat: u32,
}

/// Everything one sentence's parse touches, borrowed for its duration
pub(crate) struct Session<'a, M: ?Sized> {
  pub grammar: &'a Grammar,
  pub model: &'a M,
  pub config: &'a ParserConfig,
  pub sentence: &'a Sentence,
  pub chart: &'a mut Chart,
  pub cache: &'a mut ProbCache,
  /// Children of the edge about to be appended
  pub scratch: Vec<Child>,
}

impl<M: ProbabilityModel + ?Sized> Session<'_, M> {
  pub fn query(&mut self, event: Event) -> f64 {
    self.cache.log_prob(self.model, event)
  }

  /// Drop the distance digits the configuration doesn't condition on
  fn mask_distance(&self, distance: u32) -> u32 {
    let left = distance / 100 % 10;
    let adjacent = distance / 10 % 10;
    let verb = distance % 10;
    100 * left
      + if self.config.use_adjacency { 10 * adjacent } else { 0 }
      + if self.config.use_verb { verb } else { 0 }
  }

  pub fn dependency(
    &mut self,
    modifier: Modifier,
    parent: Nt,
    head: HeadSide,
    coordination: Option<(WordId, Nt)>,
    punctuation: Option<Punctuation>,
  ) -> f64 {
    let dep = Dependency {
      modifier,
      head_word: head.word,
      head_tag: head.tag,
      parent,
      head_label: head.label,
      distance: self.mask_distance(head.distance),
      subcat: head.subcat,
      coordination,
      punctuation,
    };
    self.query(Event::Dependency(dep))
  }

  /// `id` as the modifier of a dependency
  pub fn modifier_of(&self, id: EdgeId) -> Modifier {
    let e = self.chart.edge(id);
    Modifier::Word {
      word: self.sentence.word(e.head),
      tag: e.head_tag,
      label: e.label,
    }
  }

  /// Head features of `id` for a dependency on its `direction` side. A base
  /// NP treats its outermost child on that side as the head, at a fixed
  /// adjacent distance with no subcat.
  pub fn head_side(&self, id: EdgeId, direction: Direction) -> HeadSide {
    let e = self.chart.edge(id);
    if self.grammar.landmarks.is_npb(e.label) {
      if let Some(outer) = self.chart.outer_child(id, direction) {
        let c = self.chart.edge(outer);
        return HeadSide {
          word: self.sentence.word(c.head),
          tag: c.head_tag,
          label: c.label,
          distance: match direction {
            Direction::Left => 110,
            Direction::Right => 10,
          },
          subcat: 0,
        };
      }
    }

    let context = match direction {
      Direction::Left => e.left,
      Direction::Right => e.right,
    };
    let (distance, subcat) = context.to_distance_and_subcat(direction);
    HeadSide {
      word: self.sentence.word(e.head),
      tag: e.head_tag,
      label: self.chart.head_child_label(id),
      distance,
      subcat,
    }
  }

  /// Append `edge` over `span` with the children in `scratch`
  pub fn add(&mut self, span: Span, edge: Edge) -> Option<EdgeId> {
    let sentence = self.sentence;
    let model = self.model;
    let cache = &mut *self.cache;
    self.chart.append(span, edge, &self.scratch, |e| {
      cache.log_prob(
        model,
        Event::Prior {
          label: e.label,
          head_word: sentence.word(e.head),
          head_tag: e.head_tag,
        },
      )
    })
  }

  /// One leaf per candidate tag for every token, each closed under unaries
  fn place_axioms(&mut self) {
    for i in 0..self.sentence.len() {
      self.chart.reset_buckets();

      let word = self.sentence.word(i);
      let dictionary = self.grammar.tags_for(word);
      let candidates: Vec<Nt> =
        if self.config.all_tags && self.grammar.is_frequent(word) && !dictionary.is_empty() {
          dictionary.to_vec()
        } else {
          vec![self.sentence.tag(i)]
        };

      self.scratch.clear();
      for tag in candidates {
        self.add((i, i), Edge::leaf(i, tag, self.grammar.is_verb(tag)));
      }
      self.close((i, i));
    }
  }

  fn complete_all(&mut self) {
    let n = self.sentence.len();
    for end in 0..n {
      for start in (0..end).rev() {
        self.complete(start, end);
      }
    }
  }

  /// Split point `m` is pruned when a comma follows it and the span runs on
  /// past that comma, unless the span reaches the end of the sentence or is
  /// itself followed by a comma
  fn pruned_split(&self, m: usize, end: usize) -> bool {
    self.config.punctuation_pruning
      && self.sentence.prunes_at(m)
      && end + 1 != self.sentence.len()
      && self.sentence.comma_after(end).is_none()
  }

  fn complete(&mut self, start: usize, end: usize) {
    if self.chart.len() > self.config.soft_edge_cap()
      || self.chart.num_children() > self.config.soft_child_cap()
    {
      tracing::debug!(
        start,
        end,
        edges = self.chart.len(),
        children = self.chart.num_children(),
        "chart past its soft cap, skipping span"
      );
      return;
    }

    self.chart.reset_buckets();
    let span = (start, end);

    for m in start..end {
      let pruned = self.pruned_split(m, end);

      let right_span = (m + 1, end);
      let mut closed_right = Vec::new();
      let mut open_right = Vec::new();
      for id in self.chart.span_ids(right_span) {
        if self.chart.final_in_beam(id, right_span) {
          if self.chart.edge(id).stop {
            closed_right.push(id);
          } else {
            open_right.push(id);
          }
        }
      }

      let left_span = (start, m);
      let mut closed_left = Vec::new();
      for id in self.chart.span_ids(left_span) {
        if self.chart.final_in_beam(id, left_span) {
          if self.chart.edge(id).stop {
            closed_left.push(id);
          } else if !pruned {
            self.follow(id, span, m, &closed_right);
          }
        }
      }

      for id in open_right {
        if !pruned || self.grammar.landmarks.is_npb(self.chart.edge(id).label) {
          self.precede(id, span, m, &closed_left);
        }
      }

      let conjunction = Some(self.sentence.tag(m + 1)) == self.grammar.landmarks.cc;
      if !pruned && conjunction && m + 1 < end {
        let far_span = (m + 2, end);
        for left in self.chart.span_ids(left_span) {
          if !self.chart.final_in_beam(left, left_span) {
            continue;
          }
          for right in self.chart.span_ids(far_span) {
            if self.chart.final_in_beam(right, far_span) {
              self.coordinate(left, right, span, m);
            }
          }
        }
      }
    }

    self.close(span);
    tracing::trace!(start, end, edges = self.chart.span_ids(span).len(), "completed span");
  }

  /// The most probable saturated root edge over the whole sentence. Ties go to
  /// the earliest.
  fn best_root(&self) -> Option<EdgeId> {
    let n = self.sentence.len();
    let top = self.grammar.landmarks.top;
    let mut best: Option<(EdgeId, f64)> = None;
    for id in self.chart.span_ids((0, n - 1)) {
      let e = self.chart.edge(id);
      if e.label == top && e.stop && best.is_none_or(|(_, p)| e.prob > p) {
        best = Some((id, e.prob));
      }
    }
    best.map(|(id, _)| id)
  }
}
