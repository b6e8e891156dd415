use crate::config::ParserConfig;
use crate::edge::{BeamFlag, Edge, EdgeKind};
use crate::grammar::{Grammar, Nt};

/// Extra slack, in log space, given to unary NP and NP-A edges
pub const NP_PENALTY: f64 = 3.0;

/// Decides which edges may enter the chart and which may be built upon
#[derive(Debug, Clone, PartialEq)]
pub struct AdmissionPolicy {
  /// Absolute log-probability threshold
  pub floor: f64,
  /// Log-space window below the best edge in a span
  pub beam_width: f64,
  pub np: Option<Nt>,
  pub npa: Option<Nt>,
}

impl AdmissionPolicy {
  pub fn new(config: &ParserConfig, grammar: &Grammar) -> Self {
    Self {
      floor: config.prob_floor,
      beam_width: config.beam_width,
      np: grammar.landmarks.np,
      npa: grammar.landmarks.npa,
    }
  }

  fn threshold(&self, edge: &Edge, best: f64) -> f64 {
    let is_np = Some(edge.label) == self.np || Some(edge.label) == self.npa;
    if edge.kind == EdgeKind::Unary && is_np {
      best - self.beam_width - NP_PENALTY
    } else {
      best - self.beam_width
    }
  }

  /// Beam test against the span's best so far. The best can still rise while
  /// the span is being filled, so this is never cached.
  pub fn provisional_in_beam(&self, edge: &Edge, best: f64) -> bool {
    edge.is_leaf() || edge.prob2 >= self.threshold(edge, best)
  }

  /// Beam test once the span is complete. The first answer sticks.
  pub fn final_in_beam(&self, edge: &mut Edge, best: f64) -> bool {
    match edge.beam {
      BeamFlag::In => true,
      BeamFlag::Out => false,
      BeamFlag::Unknown => {
        let inside = self.provisional_in_beam(edge, best);
        edge.beam = if inside { BeamFlag::In } else { BeamFlag::Out };
        inside
      }
    }
  }

  /// Cheap pre-check on the summed probability of two edges about to be
  /// joined, before any model query.
  pub fn within_window(&self, combined: f64, best: Option<f64>) -> bool {
    combined >= self.floor && best.is_none_or(|b| combined >= b - self.beam_width)
  }
}
