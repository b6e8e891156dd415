//! Closing a span under the single-child operations: unary projection,
//! STOP generation and trace insertion, repeated until nothing new survives.

use crate::chart::Span;
use crate::context::Direction;
use crate::edge::{Child, EdgeId, EdgeKind};
use crate::model::{Event, HeadedRewrite, Modifier, ProbabilityModel};
use crate::parser::Session;

impl<M: ProbabilityModel + ?Sized> Session<'_, M> {
  /// Project every saturated edge in `ids` to each of its unary parents, once
  /// per pair of subcat frames
  pub fn unary<I: IntoIterator<Item = EdgeId>>(&mut self, span: Span, ids: I) {
    let grammar = self.grammar;
    for id in ids {
      let child = *self.chart.edge(id);
      if !child.valid || !child.stop || !self.chart.provisional_in_beam(id, span) {
        continue;
      }

      for &parent in grammar.unary_parents(child.label) {
        let mut edge = child;
        edge.stop = false;
        edge.kind = EdgeKind::Unary;
        edge.label = parent;
        edge.head_child = Some(id);
        edge.head_label = Some(child.label);
        if grammar.landmarks.is_npb(parent) {
          edge.has_verb = false;
        }
        edge.left.reset();
        edge.right.reset();

        let rewrite = HeadedRewrite {
          parent,
          child: child.label,
          head_word: self.sentence.word(child.head),
          head_tag: child.head_tag,
        };
        let prob = self.query(Event::Unary(rewrite)) + child.prob;
        let gapped = grammar.has_gap(parent) && !grammar.has_gap(child.label);

        let left_frames = grammar.frames(Direction::Left, parent, child.label);
        let right_frames = grammar.frames(Direction::Right, parent, child.label);
        for &left_frame in left_frames {
          let left_prob = if left_frames.len() == 1 {
            0.0
          } else {
            self.query(Event::Subcat {
              rewrite,
              frame: left_frame,
              direction: Direction::Left,
            })
          };
          edge.left.set_frame(left_frame);

          for &right_frame in right_frames {
            let right_prob = if right_frames.len() == 1 {
              0.0
            } else {
              self.query(Event::Subcat {
                rewrite,
                frame: right_frame,
                direction: Direction::Right,
              })
            };
            edge.right.set_frame(right_frame);
            edge.prob = prob + left_prob + right_prob;

            self.scratch.clear();
            self.scratch.push(Child::Edge(id));
            if !gapped {
              self.add(span, edge);
              continue;
            }

            for site in [Direction::Left, Direction::Right] {
              let mut variant = edge;
              match site {
                Direction::Left => variant.left.gap = 1,
                Direction::Right => variant.right.gap = 1,
              }
              variant.prob += self.query(Event::Gap { rewrite, site });
              self.add(span, variant);
            }
          }
        }
      }
    }
  }

  /// Close off every open edge in `ids` whose requirements are all met by
  /// generating STOP on both sides
  pub fn stop<I: IntoIterator<Item = EdgeId>>(&mut self, span: Span, ids: I) {
    for id in ids {
      let e = *self.chart.edge(id);
      if e.stop || !e.valid || !e.is_saturated() || !self.chart.provisional_in_beam(id, span) {
        continue;
      }

      let right = self.head_side(id, Direction::Right);
      let left = self.head_side(id, Direction::Left);
      let mut edge = e;
      edge.stop = true;
      edge.prob = e.prob
        + self.dependency(Modifier::Stop, e.label, right, None, None)
        + self.dependency(Modifier::Stop, e.label, left, None, None);

      self.scratch.clear();
      self.scratch.extend_from_slice(self.chart.children(id));
      self.add(span, edge);
    }
  }

  /// Discharge a gap on every open edge in the span that still wants an NP on
  /// the same side, by attaching a trace there
  pub fn trace(&mut self, span: Span) {
    for id in self.chart.span_ids(span) {
      let e = *self.chart.edge(id);
      if e.stop || !e.valid || !self.chart.provisional_in_beam(id, span) {
        continue;
      }
      let side = if e.right.gap > 0 && e.right.np > 0 {
        Direction::Right
      } else if e.left.gap > 0 && e.left.np > 0 {
        Direction::Left
      } else {
        continue;
      };

      let head = self.head_side(id, side);
      let mut edge = e;
      let context = match side {
        Direction::Left => &mut edge.left,
        Direction::Right => &mut edge.right,
      };
      context.gap -= 1;
      context.np -= 1;
      context.adjacent = false;
      edge.prob = e.prob + self.dependency(Modifier::Trace, e.label, head, None, None);

      self.scratch.clear();
      if side == Direction::Left {
        self.scratch.push(Child::Trace);
      }
      self.scratch.extend_from_slice(self.chart.children(id));
      if side == Direction::Right {
        self.scratch.push(Child::Trace);
      }
      self.add(span, edge);
    }
  }

  /// Apply unaries, traces and stops to `span` until a round adds nothing or
  /// the round limit is hit. Each round only revisits what the previous one
  /// produced.
  pub fn close(&mut self, span: Span) {
    self.chart.clear_added();
    self.unary(span, self.chart.span_ids(span));
    self.trace(span);
    self.chart.clear_recent();
    self.stop(span, self.chart.span_ids(span));

    let mut round = 1;
    while self.chart.added() && round <= self.config.max_closure_rounds {
      self.chart.clear_added();
      let stopped = self.chart.take_recent();
      self.unary(span, stopped);
      self.trace(span);
      let projected = self.chart.take_recent();
      self.stop(span, projected);
      round += 1;
    }
    self.chart.clear_recent();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::beam::AdmissionPolicy;
  use crate::chart::Chart;
  use crate::config::ParserConfig;
  use crate::edge::Edge;
  use crate::grammar::{Grammar, Nt};
  use crate::model::ProbCache;
  use crate::sentence::Sentence;
  use std::cell::RefCell;

  const NTS: &str = "TOP\nS\nVP\nVP-g\nNP-A\nNPB\nNN\nVB\nA1\nA2\nA3\nA4\nA5\nA6\nA7\nA8\n";

  struct Fixture {
    g: Grammar,
    config: ParserConfig,
    chart: Chart,
    cache: ProbCache,
    sentence: Sentence,
  }

  impl Fixture {
    fn new(grm: &str, text: &str) -> Self {
      let g = Grammar::from_sources(NTS, "", grm).unwrap();
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

    fn nt(&self, name: &str) -> Nt {
      self.g.nt(name).unwrap()
    }

    fn leaf(&mut self, i: usize) -> EdgeId {
      let tag = self.sentence.tag(i);
      let verb = self.g.is_verb(tag);
      self.chart.append((i, i), Edge::leaf(i, tag, verb), &[], |_| 0.0).unwrap()
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

    fn labels(&self, span: Span) -> Vec<(&str, bool)> {
      self
        .chart
        .span_ids(span)
        .map(|id| {
          let e = self.chart.edge(id);
          (self.g.name(e.label), e.stop)
        })
        .collect()
    }
  }

  fn flat(_: &Event) -> f64 {
    -0.1
  }

  #[test]
  fn closure_builds_the_projection_chain() {
    let mut fx = Fixture::new(
      "U NPB NN\nU NP-A NPB\nX NPB NN 0\nY NPB NN 0\nX NP-A NPB 0\nY NP-A NPB 0\n",
      "dog/NN",
    );
    fx.leaf(0);
    fx.run(&flat, |s| s.close((0, 0)));
    assert_eq!(
      fx.labels((0, 0)),
      vec![
        ("NN", true),
        ("NPB", false),
        ("NPB", true),
        ("NP-A", false),
        ("NP-A", true)
      ]
    );
    let stopped_npb = fx.chart.edge(EdgeId(2));
    // unary + two stops
    assert!((stopped_npb.prob - -0.3).abs() < 1e-12);
    assert_eq!(fx.chart.children(EdgeId(4)), &[Child::Edge(EdgeId(2))]);
  }

  #[test]
  fn unary_cycles_terminate() {
    // S and VP project to each other; repeats lose to the edges already there
    let grm = "U S VP\nU VP S\nU VP VB\nX S VP 0\nY S VP 0\nX VP S 0\nY VP S 0\nX VP VB 0\nY VP VB 0\n";
    let mut fx = Fixture::new(grm, "go/VB");
    fx.leaf(0);
    fx.run(&flat, |s| s.close((0, 0)));
    assert!(fx.chart.len() < 20, "{}", fx.chart.len());
    assert!(fx.labels((0, 0)).contains(&("S", true)));
  }

  #[test]
  fn round_limit_bounds_unary_chains() {
    let mut grm = String::from("U A1 VB\nX A1 VB 0\nY A1 VB 0\n");
    for i in 2..=8 {
      grm.push_str(&format!("U A{} A{}\nX A{} A{} 0\nY A{} A{} 0\n", i, i - 1, i, i - 1, i, i - 1));
    }
    let mut fx = Fixture::new(&grm, "go/VB");
    fx.leaf(0);
    fx.run(&flat, |s| s.close((0, 0)));

    let labels = fx.labels((0, 0));
    // one level in the first pass, one more per round
    assert!(labels.contains(&("A6", true)));
    assert!(!labels.iter().any(|&(l, _)| l == "A7"));
  }

  #[test]
  fn missing_frames_mean_no_projection() {
    let mut fx = Fixture::new("U NPB NN\n", "dog/NN");
    fx.leaf(0);
    fx.run(&flat, |s| s.close((0, 0)));
    assert_eq!(fx.labels((0, 0)), vec![("NN", true)]);
  }

  #[test]
  fn subcat_probability_only_with_a_choice() {
    let grm = "U VP VB\nX VP VB 0\nY VP VB 0\nY VP VB 10000\n";
    let mut fx = Fixture::new(grm, "see/VB");
    let vb = fx.leaf(0);

    let seen = RefCell::new(Vec::new());
    let model = |e: &Event| {
      seen.borrow_mut().push(*e);
      -0.5
    };
    fx.run(&model, |s| s.unary((0, 0), [vb]));

    let subcats: Vec<(u32, Direction)> = seen
      .borrow()
      .iter()
      .filter_map(|e| match e {
        Event::Subcat { frame, direction, .. } => Some((*frame, *direction)),
        _ => None,
      })
      .collect();
    assert_eq!(subcats, vec![(0, Direction::Right), (10_000, Direction::Right)]);

    let vps: Vec<&Edge> = fx
      .chart
      .span_ids((0, 0))
      .map(|id| fx.chart.edge(id))
      .filter(|e| e.label == fx.nt("VP"))
      .collect();
    assert_eq!(vps.len(), 2);
    assert_eq!(vps[1].right.np, 1);
    assert!(vps.iter().all(|e| e.kind == EdgeKind::Unary && !e.stop));
    assert!(vps.iter().all(|e| e.left.adjacent && !e.right.verb));
  }

  #[test]
  fn gapped_parents_get_a_variant_per_side() {
    let grm = "U VP-g VB\nX VP-g VB 0\nY VP-g VB 10000\n";
    let mut fx = Fixture::new(grm, "see/VB");
    let vb = fx.leaf(0);

    let seen = RefCell::new(Vec::new());
    let model = |e: &Event| {
      seen.borrow_mut().push(*e);
      -0.5
    };
    fx.run(&model, |s| s.unary((0, 0), [vb]));

    let gapped: Vec<Edge> = fx
      .chart
      .span_ids((0, 0))
      .map(|id| *fx.chart.edge(id))
      .filter(|e| e.label == fx.nt("VP-g"))
      .collect();
    assert_eq!(gapped.len(), 2);
    assert_eq!((gapped[0].left.gap, gapped[0].right.gap), (1, 0));
    assert_eq!((gapped[1].left.gap, gapped[1].right.gap), (0, 1));

    let sites: Vec<Direction> = seen
      .borrow()
      .iter()
      .filter_map(|e| match e {
        Event::Gap { site, .. } => Some(*site),
        _ => None,
      })
      .collect();
    assert_eq!(sites, vec![Direction::Left, Direction::Right]);
  }

  #[test]
  fn trace_discharges_a_right_gap() {
    let grm = "U VP-g VB\nX VP-g VB 0\nY VP-g VB 10000\n";
    let mut fx = Fixture::new(grm, "see/VB");
    let vb = fx.leaf(0);
    fx.run(&flat, |s| {
      s.unary((0, 0), [vb]);
      s.trace((0, 0));
    });

    let traced: Vec<EdgeId> = fx
      .chart
      .span_ids((0, 0))
      .filter(|&id| fx.chart.children(id).contains(&Child::Trace))
      .collect();
    // the left-gap variant has no NP to fill
    assert_eq!(traced.len(), 1);
    let e = fx.chart.edge(traced[0]);
    assert_eq!((e.right.gap, e.right.np), (0, 0));
    assert!(!e.right.adjacent);
    assert_eq!(fx.chart.children(traced[0]), &[Child::Edge(vb), Child::Trace]);
    assert!(e.is_saturated());
  }

  #[test]
  fn stop_needs_empty_contexts() {
    let grm = "U VP VB\nX VP VB 0\nY VP VB 10000\n";
    let mut fx = Fixture::new(grm, "see/VB");
    fx.leaf(0);
    fx.run(&flat, |s| s.close((0, 0)));
    assert_eq!(fx.labels((0, 0)), vec![("VB", true), ("VP", false)]);
  }
}
