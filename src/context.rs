//! Valence contexts: what a head still expects on one side, plus the two
//! distance flags the dependency model conditions on.

use std::fmt;

/// Side of the head a modifier attaches on. `Left` modifiers precede the head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
  Left,
  Right,
}

/// The complement counter a modifier label discharges when it attaches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgKind {
  Np,
  S,
  Sbar,
  Vp,
  Other,
}

/// How a modifier label interacts with the context of the head it attaches to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Complement {
  pub arg: Option<ArgKind>,
  pub gap: bool,
}

/// Largest counter value representable in a single decimal digit of the codes
pub const MAX_COUNT: u8 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FeatureContext {
  /// A verb has been seen between the head and the edge boundary on this side
  pub verb: bool,
  /// Nothing has been attached on this side yet
  pub adjacent: bool,
  pub np: u8,
  pub s: u8,
  pub sbar: u8,
  pub vp: u8,
  pub other: u8,
  pub gap: u8,
}

impl FeatureContext {
  /// The context of a freshly built edge: adjacent, no verb, no requirements
  pub fn fresh() -> Self {
    let mut c = Self::default();
    c.reset();
    c
  }

  /// Zero every counter, leaving the flags alone
  pub fn clear(&mut self) {
    self.np = 0;
    self.s = 0;
    self.sbar = 0;
    self.vp = 0;
    self.other = 0;
    self.gap = 0;
  }

  pub fn reset(&mut self) {
    self.clear();
    self.verb = false;
    self.adjacent = true;
  }

  /// Saturated: every requirement has been discharged
  pub fn is_empty(&self) -> bool {
    self.np == 0 && self.s == 0 && self.sbar == 0 && self.vp == 0 && self.other == 0 && self.gap == 0
  }

  pub fn is_valid(&self) -> bool {
    [self.np, self.s, self.sbar, self.vp, self.other, self.gap]
      .iter()
      .all(|&c| c <= MAX_COUNT)
  }

  /// The complement bag as the model sees it
  pub fn subcat_code(&self) -> u32 {
    100_000 * self.np as u32
      + 10_000 * self.s as u32
      + 1_000 * self.sbar as u32
      + 100 * self.vp as u32
      + 10 * self.other as u32
      + self.gap as u32
  }

  /// Full code, flags included. This is what `decode` inverts.
  pub fn encode(&self) -> u32 {
    self.subcat_code() + 1_000_000 * self.verb as u32 + 10_000_000 * self.adjacent as u32
  }

  pub fn decode(code: u32) -> Self {
    let digit = |place: u32| ((code / place) % 10) as u8;
    Self {
      adjacent: digit(10_000_000) != 0,
      verb: digit(1_000_000) != 0,
      np: digit(100_000),
      s: digit(10_000),
      sbar: digit(1_000),
      vp: digit(100),
      other: digit(10),
      gap: digit(1),
    }
  }

  /// Load the counters from a grammar subcat frame. Frames are five digits
  /// (np, s, sbar, vp, other) and never carry a gap.
  pub fn set_frame(&mut self, frame: u32) {
    let digit = |place: u32| ((frame / place) % 10) as u8;
    self.np = digit(10_000);
    self.s = digit(1_000);
    self.sbar = digit(100);
    self.vp = digit(10);
    self.other = digit(1);
    self.gap = 0;
  }

  /// Discretized distance plus subcat code for a dependency query in
  /// `direction`. The distance code is `1dv` with d = adjacency, v = verb,
  /// and the leading 1 only for left (preceding) modifiers.
  pub fn to_distance_and_subcat(&self, direction: Direction) -> (u32, u32) {
    let mut dist = 0;
    if direction == Direction::Left {
      dist += 100;
    }
    if self.adjacent {
      dist += 10;
    }
    if self.verb {
      dist += 1;
    }
    (dist, self.subcat_code())
  }

  /// Context of the continuing side after a modifier of kind `modifier`
  /// attaches. `other_verb` is whether the modifier (or anything it spans)
  /// contains a verb. Counters already at zero stay at zero.
  pub fn combine(&self, modifier: Complement, other_verb: bool) -> Self {
    let mut c = *self;
    c.verb = other_verb || self.verb;
    c.adjacent = false;

    let counter = match modifier.arg {
      Some(ArgKind::Np) => Some(&mut c.np),
      Some(ArgKind::S) => Some(&mut c.s),
      Some(ArgKind::Sbar) => Some(&mut c.sbar),
      Some(ArgKind::Vp) => Some(&mut c.vp),
      Some(ArgKind::Other) => Some(&mut c.other),
      None => None,
    };
    if let Some(n) = counter {
      *n = n.saturating_sub(1);
    }
    if modifier.gap {
      c.gap = c.gap.saturating_sub(1);
    }
    c
  }
}

impl fmt::Display for FeatureContext {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{}{}:{:06}",
      if self.adjacent { "a" } else { "-" },
      if self.verb { "v" } else { "-" },
      self.subcat_code()
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn np_arg() -> Complement {
    Complement {
      arg: Some(ArgKind::Np),
      gap: false,
    }
  }

  #[test]
  fn encode_decode_round_trip() {
    // every flag combination with a spread of counter values
    for code in 0..100_000_000u32 / 9_973 {
      let c = FeatureContext::decode(code * 9_973);
      assert!(c.is_valid());
      assert_eq!(FeatureContext::decode(c.encode()), c);
    }

    let c = FeatureContext {
      verb: true,
      adjacent: false,
      np: 9,
      s: 0,
      sbar: 3,
      vp: 1,
      other: 2,
      gap: 1,
    };
    assert_eq!(c.encode(), 1_903_121);
    assert_eq!(FeatureContext::decode(c.encode()), c);
  }

  #[test]
  fn frames_leave_flags_and_gap_alone() {
    let mut c = FeatureContext::fresh();
    c.gap = 2;
    c.set_frame(10_010);
    assert_eq!((c.np, c.s, c.sbar, c.vp, c.other, c.gap), (1, 0, 0, 1, 0, 0));
    assert!(c.adjacent);
    assert!(!c.verb);

    c.set_frame(0);
    assert!(c.is_empty());
  }

  #[test]
  fn distance_codes() {
    let mut c = FeatureContext::fresh();
    c.np = 1;
    assert_eq!(c.to_distance_and_subcat(Direction::Left), (110, 100_000));
    assert_eq!(c.to_distance_and_subcat(Direction::Right), (10, 100_000));

    c.adjacent = false;
    c.verb = true;
    assert_eq!(c.to_distance_and_subcat(Direction::Left), (101, 100_000));
    assert_eq!(c.to_distance_and_subcat(Direction::Right).0, 1);
  }

  #[test]
  fn combine_discharges_one_unit() {
    let mut c = FeatureContext::fresh();
    c.np = 2;
    let c2 = c.combine(np_arg(), false);
    assert_eq!(c2.np, 1);
    assert!(!c2.adjacent);
    assert!(!c2.verb);
    // combine returns a copy
    assert_eq!(c.np, 2);

    let c3 = c2.combine(np_arg(), true);
    assert_eq!(c3.np, 0);
    assert!(c3.verb);
    assert!(c3.is_empty());
  }

  #[test]
  fn combine_never_goes_negative() {
    let c = FeatureContext::fresh();
    let kinds = [
      Some(ArgKind::Np),
      Some(ArgKind::S),
      Some(ArgKind::Sbar),
      Some(ArgKind::Vp),
      Some(ArgKind::Other),
      None,
    ];
    for arg in kinds {
      for gap in [false, true] {
        let out = c.combine(Complement { arg, gap }, false);
        assert!(out.is_empty());
        assert!(out.is_valid());
      }
    }
  }

  #[test]
  fn combine_gap_and_argument_together() {
    let mut c = FeatureContext::fresh();
    c.s = 1;
    c.gap = 1;
    let out = c.combine(
      Complement {
        arg: Some(ArgKind::S),
        gap: true,
      },
      false,
    );
    assert_eq!(out.s, 0);
    assert_eq!(out.gap, 0);
  }

  #[test]
  fn verb_flag_is_sticky() {
    let mut c = FeatureContext::fresh();
    c.verb = true;
    let out = c.combine(Complement::default(), false);
    assert!(out.verb);
  }
}
