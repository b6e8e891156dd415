//! The binary operators that grow a span out of two adjacent ones: a head on
//! the left taking a modifier to its right (follow), a head on the right taking
//! one to its left (precede), and coordination across a conjunction.

use crate::chart::Span;
use crate::context::Direction;
use crate::edge::{Child, Edge, EdgeId, EdgeKind};
use crate::model::ProbabilityModel;
use crate::parser::{HeadSide, Session};

/// Nudges attachment scope around coordinated phrases. Small enough to only
/// break ties.
pub const COORDINATION_BIAS: f64 = -1e-19;

/// The edge a join produces: the anchor's head, label and head child carried
/// over, open again
fn extended(anchor: &Edge) -> Edge {
  Edge {
    kind: EdgeKind::Join,
    stop: false,
    valid: true,
    ..*anchor
  }
}

impl<M: ProbabilityModel + ?Sized> Session<'_, M> {
  fn is_npb(&self, id: EdgeId) -> bool {
    self.grammar.landmarks.is_npb(self.chart.edge(id).label)
  }

  /// Whether anything under `id` contains a verb
  fn spans_verb(&self, id: EdgeId) -> bool {
    let e = self.chart.edge(id);
    e.has_verb || e.left.verb || e.right.verb
  }

  /// True when the anchor and its head child share a label up to argument
  /// marking, i.e. the anchor is a projection of a coordinated phrase
  fn same_projection(&self, anchor: EdgeId) -> bool {
    let e = self.chart.edge(anchor);
    !e.is_leaf()
      && self.grammar.arg_stripped(e.label)
        == self.grammar.arg_stripped(self.chart.head_child_label(anchor))
  }

  /// Base NPs restart their distance flags after every attachment
  fn restart_if_base_np(&self, anchor: EdgeId, edge: &mut Edge) {
    if self.is_npb(anchor) {
      for context in [&mut edge.left, &mut edge.right] {
        context.verb = false;
        context.adjacent = true;
      }
      edge.has_verb = false;
    }
  }

  /// `anchor` over `(span.0, split)` takes each saturated partner over
  /// `(split + 1, span.1)` as a right modifier
  pub fn follow(&mut self, anchor: EdgeId, span: Span, split: usize, partners: &[EdgeId]) {
    let a = *self.chart.edge(anchor);
    if !a.is_open() {
      return;
    }

    let head_label = if a.kind == EdgeKind::Unary && self.is_npb(anchor) {
      self
        .chart
        .last_child(anchor)
        .map_or(a.head_tag, |c| self.chart.edge(c).label)
    } else {
      self.chart.head_child_label(anchor)
    };
    let head = self.head_side(anchor, Direction::Right);
    let punctuation = self.sentence.comma_after(split);
    let bias = if self.same_projection(anchor) {
      COORDINATION_BIAS
    } else {
      0.0
    };

    for &partner in partners {
      let p = *self.chart.edge(partner);
      let combined = a.prob + p.prob;
      if !self.chart.within_window(combined, span)
        || !p.stop
        || !self.grammar.is_legal(Direction::Right, a.label, head_label, p.label)
      {
        continue;
      }

      let modifier = self.modifier_of(partner);
      let prob = self.dependency(modifier, a.label, head, None, punctuation) + combined + bias;
      if prob <= self.chart.policy().floor {
        continue;
      }

      let mut edge = extended(&a);
      edge.prob = prob;
      edge.right = a
        .right
        .combine(self.grammar.complement_of(p.label), self.spans_verb(partner));
      edge.has_verb = a.has_verb || p.has_verb;
      self.restart_if_base_np(anchor, &mut edge);

      self.scratch.clear();
      self.scratch.extend_from_slice(self.chart.children(anchor));
      self.scratch.push(Child::Edge(partner));
      self.add(span, edge);
    }
  }

  /// `anchor` over `(split + 1, span.1)` takes each saturated partner over
  /// `(span.0, split)` as a left modifier
  pub fn precede(&mut self, anchor: EdgeId, span: Span, split: usize, partners: &[EdgeId]) {
    let a = *self.chart.edge(anchor);
    if !a.is_open() {
      return;
    }

    let npb = self.is_npb(anchor);
    let head_label = if npb {
      self
        .chart
        .first_child(anchor)
        .map_or(a.head_tag, |c| self.chart.edge(c).label)
    } else {
      self.chart.head_child_label(anchor)
    };
    let mut head = self.head_side(anchor, Direction::Left);
    if npb {
      head.label = head.tag;
    }
    let punctuation = self.sentence.comma_after(split);
    let bias = if self.same_projection(anchor) {
      0.0
    } else {
      COORDINATION_BIAS
    };

    for &partner in partners {
      let p = *self.chart.edge(partner);
      let combined = a.prob + p.prob;
      if !self.grammar.is_legal(Direction::Left, a.label, head_label, p.label)
        || !p.stop
        || !self.chart.within_window(combined, span)
      {
        continue;
      }

      let modifier = self.modifier_of(partner);
      let prob = self.dependency(modifier, a.label, head, None, punctuation) + combined + bias;
      if prob <= self.chart.policy().floor {
        continue;
      }

      let mut edge = extended(&a);
      edge.prob = prob;
      edge.left = a
        .left
        .combine(self.grammar.complement_of(p.label), self.spans_verb(partner));
      edge.has_verb = a.has_verb || p.has_verb;
      self.restart_if_base_np(anchor, &mut edge);

      self.scratch.clear();
      self.scratch.push(Child::Edge(partner));
      self.scratch.extend_from_slice(self.chart.children(anchor));
      self.add(span, edge);
    }
  }

  /// `left` over `(span.0, split)` and `right` over `(split + 2, span.1)`
  /// joined across the conjunction at `split + 1`
  pub fn coordinate(&mut self, left: EdgeId, right: EdgeId, span: Span, split: usize) {
    let l = *self.chart.edge(left);
    let r = *self.chart.edge(right);
    let combined = l.prob + r.prob;
    if !self.chart.within_window(combined, span) {
      return;
    }

    let head_label = self.chart.head_child_label(left);
    if !l.is_open()
      || !r.stop
      || !self.grammar.is_legal(Direction::Right, l.label, head_label, r.label)
    {
      return;
    }
    let Some((conjunction, _)) = self.chart.range((split + 1, split + 1)) else {
      return;
    };

    // right-side features as if the conjunct were an ordinary modifier
    let (distance, subcat) = l.right.to_distance_and_subcat(Direction::Right);
    let head = HeadSide {
      word: self.sentence.word(l.head),
      tag: l.head_tag,
      label: head_label,
      distance,
      subcat,
    };
    let punctuation = self
      .sentence
      .comma_after(split)
      .or_else(|| self.sentence.comma_after(split + 1));
    let coordination = Some((self.sentence.word(split + 1), self.sentence.tag(split + 1)));

    let modifier = self.modifier_of(right);
    let prob = self.dependency(modifier, l.label, head, coordination, punctuation) + combined;
    if prob <= self.chart.policy().floor {
      return;
    }

    let mut edge = extended(&l);
    edge.prob = prob;
    edge.head_label = Some(r.label);
    edge.right = l
      .right
      .combine(self.grammar.complement_of(r.label), self.spans_verb(right));
    edge.has_verb = l.has_verb || r.has_verb;

    self.scratch.clear();
    self.scratch.extend_from_slice(self.chart.children(left));
    self.scratch.push(Child::Edge(conjunction));
    self.scratch.push(Child::Edge(right));
    self.add(span, edge);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::beam::AdmissionPolicy;
  use crate::chart::Chart;
  use crate::config::ParserConfig;
  use crate::grammar::Grammar;
  use crate::model::{Event, Modifier, ProbCache};
  use crate::sentence::Sentence;
  use std::cell::RefCell;

  const NTS: &str = "TOP\nS\nVP\nNP-A\nNPB\nNN\nDT\nVB\nCC\n,\n";
  const GRM: &str = "\
    R VP VB NP-A\n\
    L S VP NP-A\n\
    L NPB NN DT\n\
    R NP-A NPB NP-A\n";

  struct Fixture {
    g: Grammar,
    config: ParserConfig,
    chart: Chart,
    cache: ProbCache,
    sentence: Sentence,
  }

  impl Fixture {
    fn new(text: &str) -> Self {
      let g = Grammar::from_sources(NTS, "", GRM).unwrap();
      let config = ParserConfig::default();
      let (words, tags): (Vec<&str>, Vec<&str>) = text
        .split_whitespace()
        .map(|wt| wt.rsplit_once('/').unwrap())
        .unzip();
      let sentence = Sentence::new(&words, &tags, &g).unwrap();
      let mut chart = Chart::new(
        AdmissionPolicy::new(&config, &g),
        g.landmarks.top,
        g.num_nts(),
        &config,
      );
      chart.reset(sentence.len());
      Self {
        g,
        config,
        chart,
        cache: ProbCache::new(),
        sentence,
      }
    }

    fn nt(&self, name: &str) -> crate::grammar::Nt {
      self.g.nt(name).unwrap()
    }

    fn leaf(&mut self, i: usize) -> EdgeId {
      let tag = self.sentence.tag(i);
      let no_prior = |_: &Edge| 0.0;
      self
        .chart
        .append((i, i), Edge::leaf(i, tag, self.g.is_verb(tag)), &[], no_prior)
        .unwrap()
    }

    /// A unary projection over `child` with empty frames
    fn project(&mut self, span: Span, child: EdgeId, label: &str, stop: bool) -> EdgeId {
      self.project_framed(span, child, label, stop, 0)
    }

    fn project_framed(
      &mut self,
      span: Span,
      child: EdgeId,
      label: &str,
      stop: bool,
      right_frame: u32,
    ) -> EdgeId {
      let c = *self.chart.edge(child);
      let mut e = c;
      e.kind = EdgeKind::Unary;
      e.label = self.nt(label);
      e.head_child = Some(child);
      e.head_label = Some(c.label);
      e.left.reset();
      e.right.reset();
      e.right.set_frame(right_frame);
      e.stop = stop;
      e.prob = c.prob - 0.5;
      self.chart.append(span, e, &[Child::Edge(child)], |_| 0.0).unwrap()
    }

    fn run<M, F>(&mut self, model: &M, f: F)
    where
      M: ProbabilityModel,
      F: FnOnce(&mut Session<'_, M>),
    {
      let mut session = Session {
        grammar: &self.g,
        model,
        config: &self.config,
        sentence: &self.sentence,
        chart: &mut self.chart,
        cache: &mut self.cache,
        scratch: Vec::new(),
      };
      f(&mut session);
    }
  }

  #[test]
  fn follow_attaches_to_the_right_and_discharges_the_complement() {
    let mut fx = Fixture::new("see/VB it/NN");
    let vb = fx.leaf(0);
    let vp = fx.project_framed((0, 0), vb, "VP", false, 10_000);
    let nn = fx.leaf(1);
    let npb = fx.project((1, 1), nn, "NPB", true);
    let np = fx.project((1, 1), npb, "NP-A", true);

    let seen = RefCell::new(Vec::new());
    let model = |e: &Event| {
      seen.borrow_mut().push(*e);
      -1.0
    };
    fx.chart.reset_buckets();
    fx.run(&model, |s| s.follow(vp, (0, 1), 0, &[npb, np]));

    let built: Vec<EdgeId> = fx.chart.span_ids((0, 1)).collect();
    assert_eq!(built.len(), 1, "only NP-A is licensed");
    let e = fx.chart.edge(built[0]);
    assert_eq!(e.kind, EdgeKind::Join);
    assert_eq!(e.label, fx.nt("VP"));
    assert_eq!(e.head, 0);
    assert_eq!(e.right.np, 0);
    assert!(!e.right.adjacent);
    assert!(!e.right.verb);
    assert!(e.has_verb);
    assert_eq!(fx.chart.children(built[0]), &[Child::Edge(vb), Child::Edge(np)]);

    let deps: Vec<_> = seen
      .borrow()
      .iter()
      .filter_map(|e| match e {
        Event::Dependency(d) => Some(*d),
        _ => None,
      })
      .collect();
    assert_eq!(deps.len(), 1);
    assert_eq!(deps[0].distance, 10);
    assert_eq!(deps[0].subcat, 100_000);
    assert_eq!(deps[0].head_label, fx.nt("VB"));
    assert!(matches!(deps[0].modifier, Modifier::Word { label, .. } if label == fx.nt("NP-A")));
  }

  #[test]
  fn closed_anchors_do_not_follow() {
    let mut fx = Fixture::new("see/VB it/NN");
    let vb = fx.leaf(0);
    let vp = fx.project((0, 0), vb, "VP", true);
    let nn = fx.leaf(1);
    let npb = fx.project((1, 1), nn, "NPB", true);
    let np = fx.project((1, 1), npb, "NP-A", true);
    fx.chart.reset_buckets();
    fx.run(&|_: &Event| -1.0, |s| s.follow(vp, (0, 1), 0, &[np]));
    assert_eq!(fx.chart.span_ids((0, 1)).len(), 0);
  }

  #[test]
  fn base_np_precede_uses_the_leftmost_child() {
    let mut fx = Fixture::new("the/DT dog/NN");
    let dt = fx.leaf(0);
    let nn = fx.leaf(1);
    let npb = fx.project((1, 1), nn, "NPB", false);

    let seen = RefCell::new(Vec::new());
    let model = |e: &Event| {
      seen.borrow_mut().push(*e);
      -1.0
    };
    fx.chart.reset_buckets();
    fx.run(&model, |s| s.precede(npb, (0, 1), 0, &[dt]));

    let built: Vec<EdgeId> = fx.chart.span_ids((0, 1)).collect();
    assert_eq!(built.len(), 1);
    assert_eq!(fx.chart.children(built[0]), &[Child::Edge(dt), Child::Edge(nn)]);
    let e = fx.chart.edge(built[0]);
    assert!(e.left.adjacent);
    assert!(!e.has_verb);

    let dep = seen
      .borrow()
      .iter()
      .find_map(|e| match e {
        Event::Dependency(d) => Some(*d),
        _ => None,
      })
      .unwrap();
    assert_eq!(dep.distance, 110);
    assert_eq!(dep.subcat, 0);
    assert_eq!(dep.head_label, fx.nt("NN"));
    // projection bias: NPB and NN differ
    assert_eq!(e.prob, -1.0 + fx.chart.edge(npb).prob + COORDINATION_BIAS);
  }

  #[test]
  fn coordination_carries_the_conjunction() {
    let mut fx = Fixture::new("dogs/NN and/CC cats/NN");
    let a = fx.leaf(0);
    let npb_a = fx.project((0, 0), a, "NPB", true);
    let left = fx.project((0, 0), npb_a, "NP-A", false);
    let cc = fx.leaf(1);
    let b = fx.leaf(2);
    let npb_b = fx.project((2, 2), b, "NPB", true);
    let right = fx.project((2, 2), npb_b, "NP-A", true);

    let seen = RefCell::new(Vec::new());
    let model = |e: &Event| {
      seen.borrow_mut().push(*e);
      -1.0
    };
    fx.chart.reset_buckets();
    fx.run(&model, |s| s.coordinate(left, right, (0, 2), 0));

    let built: Vec<EdgeId> = fx.chart.span_ids((0, 2)).collect();
    assert_eq!(built.len(), 1);
    let e = fx.chart.edge(built[0]);
    assert_eq!(e.head_label, Some(fx.nt("NP-A")));
    assert_eq!(e.head_child, Some(npb_a));
    assert_eq!(
      fx.chart.children(built[0]),
      &[Child::Edge(npb_a), Child::Edge(cc), Child::Edge(right)]
    );

    let dep = seen
      .borrow()
      .iter()
      .find_map(|e| match e {
        Event::Dependency(d) => Some(*d),
        _ => None,
      })
      .unwrap();
    assert_eq!(dep.coordination, Some((fx.sentence.word(1), fx.nt("CC"))));
  }

  #[test]
  fn floor_blocks_joins() {
    let mut fx = Fixture::new("the/DT dog/NN");
    let dt = fx.leaf(0);
    let nn = fx.leaf(1);
    let npb = fx.project((1, 1), nn, "NPB", false);
    fx.chart.reset_buckets();
    fx.run(&|_: &Event| -10_000_000.0, |s| s.precede(npb, (0, 1), 0, &[dt]));
    assert_eq!(fx.chart.span_ids((0, 1)).len(), 0);
  }
}
