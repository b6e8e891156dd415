//! Per-label dynamic-programming buckets for the span currently being filled.

use crate::edge::{Edge, EdgeId};
use crate::grammar::Nt;

/// What the bucket for a candidate's label wants done with it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
  /// New member at a fresh handle
  Push,
  /// Overwrite the edge behind this handle
  Replace(EdgeId),
  Reject,
}

#[derive(Debug, Clone, Default)]
struct Bucket {
  members: Vec<EdgeId>,
  min: Option<(EdgeId, f64)>,
}

#[derive(Debug, Clone)]
pub struct LabelBuckets {
  buckets: Vec<Bucket>,
  touched: Vec<Nt>,
  capacity: usize,
}

impl LabelBuckets {
  pub fn new(num_labels: usize, capacity: usize) -> Self {
    Self {
      buckets: vec![Bucket::default(); num_labels],
      touched: Vec::new(),
      capacity: capacity.max(1),
    }
  }

  /// Start a new span episode. Only buckets that were written to are cleared.
  pub fn reset(&mut self) {
    for label in self.touched.drain(..) {
      let b = &mut self.buckets[label.index()];
      b.members.clear();
      b.min = None;
    }
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  pub fn len(&self, label: Nt) -> usize {
    self.bucket(label).map_or(0, |b| b.members.len())
  }

  pub fn members(&self, label: Nt) -> &[EdgeId] {
    self.bucket(label).map_or(&[][..], |b| b.members.as_slice())
  }

  pub fn min(&self, label: Nt) -> Option<(EdgeId, f64)> {
    self.bucket(label).and_then(|b| b.min)
  }

  fn bucket(&self, label: Nt) -> Option<&Bucket> {
    self.buckets.get(label.index())
  }

  fn bucket_mut(&mut self, label: Nt) -> &mut Bucket {
    let idx = label.index();
    if idx >= self.buckets.len() {
      self.buckets.resize_with(idx + 1, Bucket::default);
    }
    &mut self.buckets[idx]
  }

  /// Decide the fate of `candidate` against the members sharing its label.
  /// The first member with the same signature decides: the candidate replaces
  /// it only when strictly more probable. A full bucket rejects anything below
  /// its minimum outright, and otherwise evicts the minimum.
  pub fn admit(&self, candidate: &Edge, edges: &[Edge]) -> Admission {
    let Some(bucket) = self.bucket(candidate.label) else {
      return Admission::Push;
    };
    if bucket.members.is_empty() {
      return Admission::Push;
    }

    let full = bucket.members.len() >= self.capacity;
    if full {
      if let Some((_, min_prob)) = bucket.min {
        if candidate.prob < min_prob {
          return Admission::Reject;
        }
      }
    }

    for &id in bucket.members.iter() {
      let member = &edges[id.index()];
      if member.same_signature(candidate) {
        return if candidate.prob > member.prob {
          Admission::Replace(id)
        } else {
          Admission::Reject
        };
      }
    }

    match (full, bucket.min) {
      (true, Some((min_id, _))) => Admission::Replace(min_id),
      _ => Admission::Push,
    }
  }

  /// Record a member pushed at a fresh handle
  pub fn push(&mut self, label: Nt, id: EdgeId, prob: f64) {
    let b = self.bucket_mut(label);
    let first = b.members.is_empty();
    b.members.push(id);
    match b.min {
      Some((_, min)) if prob >= min => {}
      _ => b.min = Some((id, prob)),
    }
    if first {
      self.touched.push(label);
    }
  }

  /// Recompute the minimum after a member was overwritten in place. Ties keep
  /// the earliest member.
  pub fn refresh_min(&mut self, label: Nt, edges: &[Edge]) {
    let b = self.bucket_mut(label);
    let mut min: Option<(EdgeId, f64)> = None;
    for &id in b.members.iter() {
      let p = edges[id.index()].prob;
      match min {
        Some((_, m)) if p >= m => {}
        _ => min = Some((id, p)),
      }
    }
    b.min = min;
  }
}
