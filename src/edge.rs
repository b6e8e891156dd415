use std::fmt;

use crate::context::FeatureContext;
use crate::grammar::Nt;

/// Handle into the chart's edge arena. Stable for the life of one sentence;
/// dynamic-programming replacement overwrites the edge behind a handle rather
/// than moving it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub u32);

impl EdgeId {
  pub fn index(self) -> usize {
    self.0 as usize
  }
}

impl fmt::Display for EdgeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// How an edge was built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
  /// A part-of-speech axiom over one word
  Leaf,
  /// A parent built over a single head child
  Unary,
  /// A head extended by one modifier (or a coordinated pair)
  Join,
}

impl EdgeKind {
  /// The numeric code used in chart dumps
  pub fn code(self) -> u8 {
    match self {
      Self::Leaf => 0,
      Self::Unary => 1,
      Self::Join => 3,
    }
  }
}

/// Memoized result of the final beam test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeamFlag {
  Unknown,
  In,
  Out,
}

/// One slot in the child arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Child {
  Edge(EdgeId),
  /// The empty element that discharges a gap
  Trace,
}

impl Child {
  pub fn edge(self) -> Option<EdgeId> {
    match self {
      Self::Edge(id) => Some(id),
      Self::Trace => None,
    }
  }
}

/// A contiguous run of the child arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChildRange {
  pub start: u32,
  pub len: u32,
}

impl ChildRange {
  pub fn as_range(self) -> std::ops::Range<usize> {
    self.start as usize..(self.start + self.len) as usize
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
  pub label: Nt,
  /// Position of the head word among the sentence's tokens
  pub head: usize,
  pub head_tag: Nt,
  pub head_child: Option<EdgeId>,
  /// Label of the head child when this edge was built. Leaves have none.
  pub head_label: Option<Nt>,
  pub left: FeatureContext,
  pub right: FeatureContext,
  /// The edge's surface string contains a verb (outside base NPs)
  pub has_verb: bool,
  pub prob: f64,
  /// `prob` plus the prior for this label and head
  pub prob2: f64,
  pub children: ChildRange,
  pub kind: EdgeKind,
  pub stop: bool,
  pub valid: bool,
  pub beam: BeamFlag,
}

impl Edge {
  pub fn leaf(head: usize, tag: Nt, has_verb: bool) -> Self {
    Self {
      label: tag,
      head,
      head_tag: tag,
      head_child: None,
      head_label: None,
      left: FeatureContext::fresh(),
      right: FeatureContext::fresh(),
      has_verb,
      prob: 0.0,
      prob2: 0.0,
      children: ChildRange::default(),
      kind: EdgeKind::Leaf,
      stop: true,
      valid: true,
      beam: BeamFlag::Unknown,
    }
  }

  pub fn is_leaf(&self) -> bool {
    self.kind == EdgeKind::Leaf
  }

  /// Both contexts fully discharged
  pub fn is_saturated(&self) -> bool {
    self.left.is_empty() && self.right.is_empty()
  }

  /// Open heads can still take modifiers
  pub fn is_open(&self) -> bool {
    !self.stop && matches!(self.kind, EdgeKind::Unary | EdgeKind::Join)
  }

  /// Two edges with the same signature are interchangeable for every future
  /// operation, so only the more probable one needs to stay in the chart.
  /// Contexts are compared field by field, which treats the verb flags as
  /// booleans.
  pub fn same_signature(&self, other: &Edge) -> bool {
    self.left == other.left
      && self.right == other.right
      && self.head == other.head
      && self.head_tag == other.head_tag
      && self.kind == other.kind
      && self.valid == other.valid
      && self.stop == other.stop
      && self.head_label == other.head_label
      && self.has_verb == other.has_verb
      && self.label == other.label
  }
}
