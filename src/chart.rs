use std::fmt;
use std::ops::Range;

use crate::beam::AdmissionPolicy;
use crate::buckets::{Admission, LabelBuckets};
use crate::config::ParserConfig;
use crate::context::Direction;
use crate::edge::{BeamFlag, Child, ChildRange, Edge, EdgeId};
use crate::grammar::Nt;

/// Inclusive range of token positions, `(start, end)`
pub type Span = (usize, usize);

/// Span best for a span whose only edges so far are part-of-speech leaves
pub const LEAF_SPAN_BEST: f64 = -10_000.0;

#[derive(Debug, Clone, Copy)]
struct SpanEntry {
  range: Option<(EdgeId, EdgeId)>,
  best: f64,
}

impl SpanEntry {
  const EMPTY: SpanEntry = SpanEntry {
    range: None,
    best: f64::NEG_INFINITY,
  };
}

/// Where each span's edges live in the arena, and the best `prob2` among them.
/// All edges of a span are appended while that span is being completed, so
/// they always form one contiguous run of handles.
#[derive(Debug, Clone, Default)]
pub struct SpanIndex {
  n: usize,
  entries: Vec<SpanEntry>,
}

impl SpanIndex {
  fn reset(&mut self, n: usize) {
    self.n = n;
    self.entries.clear();
    self.entries.resize(n * n, SpanEntry::EMPTY);
  }

  fn slot(&self, (start, end): Span) -> Option<usize> {
    if start <= end && end < self.n {
      Some(start * self.n + end)
    } else {
      None
    }
  }

  fn entry(&self, span: Span) -> SpanEntry {
    self.slot(span).map_or(SpanEntry::EMPTY, |i| self.entries[i])
  }

  pub fn range(&self, span: Span) -> Option<(EdgeId, EdgeId)> {
    self.entry(span).range
  }

  /// Best `prob2` so far. `None` until the span has an edge.
  pub fn best(&self, span: Span) -> Option<f64> {
    let e = self.entry(span);
    e.range.map(|_| e.best)
  }
}

/// Iterator over the handles of one span, fixed at creation
#[derive(Debug, Clone)]
pub struct EdgeIds(Range<u32>);

impl Iterator for EdgeIds {
  type Item = EdgeId;

  fn next(&mut self) -> Option<EdgeId> {
    self.0.next().map(EdgeId)
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    self.0.size_hint()
  }
}

impl ExactSizeIterator for EdgeIds {}

/// The edge arena, its child arena, the span index and the per-label buckets
/// for the span currently being filled.
#[derive(Debug, Clone)]
pub struct Chart {
  edges: Vec<Edge>,
  children: Vec<Child>,
  spans: SpanIndex,
  buckets: LabelBuckets,
  recent: Vec<EdgeId>,
  added: bool,
  policy: AdmissionPolicy,
  root: Nt,
  max_edges: usize,
  max_children: usize,
  full_warned: bool,
}

impl Chart {
  pub fn new(policy: AdmissionPolicy, root: Nt, num_labels: usize, config: &ParserConfig) -> Self {
    Self {
      edges: Vec::new(),
      children: Vec::new(),
      spans: SpanIndex::default(),
      buckets: LabelBuckets::new(num_labels, config.bucket_capacity),
      recent: Vec::new(),
      added: false,
      policy,
      root,
      max_edges: config.max_edges,
      max_children: config.max_children,
      full_warned: false,
    }
  }

  /// Forget everything from the last sentence
  pub fn reset(&mut self, sentence_len: usize) {
    self.edges.clear();
    self.children.clear();
    self.spans.reset(sentence_len);
    self.buckets.reset();
    self.recent.clear();
    self.added = false;
    self.full_warned = false;
  }

  /// Start a new span episode for the dynamic-programming buckets
  pub fn reset_buckets(&mut self) {
    self.buckets.reset();
  }

  pub fn len(&self) -> usize {
    self.edges.len()
  }

  pub fn is_empty(&self) -> bool {
    self.edges.is_empty()
  }

  pub fn num_children(&self) -> usize {
    self.children.len()
  }

  pub fn sentence_len(&self) -> usize {
    self.spans.n
  }

  pub fn policy(&self) -> &AdmissionPolicy {
    &self.policy
  }

  pub fn edge(&self, id: EdgeId) -> &Edge {
    &self.edges[id.index()]
  }

  pub fn edges(&self) -> &[Edge] {
    &self.edges
  }

  pub fn children(&self, id: EdgeId) -> &[Child] {
    &self.children[self.edges[id.index()].children.as_range()]
  }

  pub fn first_child(&self, id: EdgeId) -> Option<EdgeId> {
    self.children(id).first().and_then(|c| c.edge())
  }

  pub fn last_child(&self, id: EdgeId) -> Option<EdgeId> {
    self.children(id).last().and_then(|c| c.edge())
  }

  /// The end child a base NP treats as its current head on `direction`:
  /// the most recently attached modifier on that side
  pub fn outer_child(&self, id: EdgeId, direction: Direction) -> Option<EdgeId> {
    match direction {
      Direction::Left => self.first_child(id),
      Direction::Right => self.last_child(id),
    }
  }

  /// Label of the head child, or the tag for a leaf
  pub fn head_child_label(&self, id: EdgeId) -> Nt {
    let e = self.edge(id);
    match e.head_child {
      Some(h) => self.edge(h).label,
      None => e.head_tag,
    }
  }

  pub fn range(&self, span: Span) -> Option<(EdgeId, EdgeId)> {
    self.spans.range(span)
  }

  pub fn best(&self, span: Span) -> Option<f64> {
    self.spans.best(span)
  }

  /// Handles in `span` as of now. Edges appended later aren't visited.
  pub fn span_ids(&self, span: Span) -> EdgeIds {
    match self.spans.range(span) {
      Some((first, last)) => EdgeIds(first.0..last.0 + 1),
      None => EdgeIds(0..0),
    }
  }

  pub fn provisional_in_beam(&self, id: EdgeId, span: Span) -> bool {
    let best = self.spans.best(span).unwrap_or(f64::NEG_INFINITY);
    self.policy.provisional_in_beam(self.edge(id), best)
  }

  pub fn final_in_beam(&mut self, id: EdgeId, span: Span) -> bool {
    let best = self.spans.best(span).unwrap_or(f64::NEG_INFINITY);
    self.policy.final_in_beam(&mut self.edges[id.index()], best)
  }

  pub fn within_window(&self, combined: f64, span: Span) -> bool {
    self.policy.within_window(combined, self.spans.best(span))
  }

  /// Whether anything was accepted since the flag was last cleared
  pub fn added(&self) -> bool {
    self.added
  }

  pub fn clear_added(&mut self) {
    self.added = false;
  }

  /// Handles accepted since the last call, in acceptance order
  pub fn take_recent(&mut self) -> Vec<EdgeId> {
    std::mem::take(&mut self.recent)
  }

  pub fn clear_recent(&mut self) {
    self.recent.clear();
  }

  fn at_capacity(&self, child_count: usize) -> bool {
    self.edges.len() >= self.max_edges || self.children.len() + child_count > self.max_children
  }

  fn write_children(&mut self, children: &[Child]) -> ChildRange {
    let start = self.children.len() as u32;
    self.children.extend_from_slice(children);
    ChildRange {
      start,
      len: children.len() as u32,
    }
  }

  /// The only way into the chart. Runs the floor, capacity, prior, span-beam
  /// and bucket checks in that order and returns the handle the edge ended up
  /// at, which may be an existing edge it replaced. `prior` is only asked for
  /// edges that survive the floor and capacity checks. A full chart refuses
  /// everything, replacements of an existing edge included.
  pub fn append<F>(&mut self, span: Span, mut edge: Edge, children: &[Child], prior: F) -> Option<EdgeId>
  where
    F: FnOnce(&Edge) -> f64,
  {
    if !edge.is_leaf() && edge.prob < self.policy.floor {
      return None;
    }

    if self.at_capacity(children.len()) {
      if !self.full_warned {
        tracing::warn!(
          edges = self.edges.len(),
          children = self.children.len(),
          "chart is full, rejecting new edges"
        );
        self.full_warned = true;
      }
      return None;
    }

    edge.beam = BeamFlag::Unknown;
    edge.prob2 = if edge.is_leaf() {
      0.0
    } else {
      edge.prob + prior(&edge)
    };

    let full_sentence = span.0 == 0 && span.1 + 1 == self.spans.n;
    let slot = self.spans.slot(span)?;
    let entry = &mut self.spans.entries[slot];
    if entry.range.is_none() {
      entry.best = if edge.is_leaf() { LEAF_SPAN_BEST } else { edge.prob2 };
    } else if edge.label == self.root {
      if !full_sentence {
        return None;
      }
    } else if !edge.is_leaf() {
      if !self.policy.provisional_in_beam(&edge, entry.best) {
        return None;
      }
      if edge.prob2 > entry.best {
        entry.best = edge.prob2;
      }
    }

    let id = match self.buckets.admit(&edge, &self.edges) {
      Admission::Reject => return None,
      Admission::Push => {
        let id = EdgeId(self.edges.len() as u32);
        edge.children = self.write_children(children);
        self.edges.push(edge);
        self.buckets.push(edge.label, id, edge.prob);
        let entry = &mut self.spans.entries[slot];
        entry.range = Some(match entry.range {
          Some((first, _)) => (first, id),
          None => (id, id),
        });
        id
      }
      Admission::Replace(id) => {
        edge.children = self.write_children(children);
        self.edges[id.index()] = edge;
        self.buckets.refresh_min(edge.label, &self.edges);
        id
      }
    };

    self.recent.push(id);
    self.added = true;
    Some(id)
  }
}

impl fmt::Display for Chart {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, e) in self.edges.iter().enumerate() {
      let (ld, ls) = e.left.to_distance_and_subcat(Direction::Left);
      let (rd, rs) = e.right.to_distance_and_subcat(Direction::Right);
      writeln!(
        f,
        "EDGE {} {} {} {} {} {}  L {} {} HV{} R {} {}",
        i,
        e.prob,
        e.prob2,
        e.stop as u8,
        e.kind.code(),
        e.label.0,
        ld,
        ls,
        e.has_verb as u8,
        rd,
        rs
      )?;
    }
    Ok(())
  }
}
