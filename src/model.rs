//! The probability model as the parser sees it: a log-probability for each
//! generative event, memoized per sentence.

use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::context::Direction;
use crate::grammar::{Grammar, Nt, WordId};
use crate::parse_grammar::content_lines;
use crate::sentence::Punctuation;
use crate::Err;

/// What a dependency event generates next to the head
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
  /// Nothing more on this side
  Stop,
  /// The empty element that fills a gap
  Trace,
  Word { word: WordId, tag: Nt, label: Nt },
}

/// Generation of one modifier (or STOP) beside a head
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dependency {
  pub modifier: Modifier,
  pub head_word: WordId,
  pub head_tag: Nt,
  pub parent: Nt,
  pub head_label: Nt,
  /// Distance code from `FeatureContext::to_distance_and_subcat`
  pub distance: u32,
  pub subcat: u32,
  /// The conjunction between head and modifier, for coordination
  pub coordination: Option<(WordId, Nt)>,
  /// A comma or colon between head and modifier
  pub punctuation: Option<Punctuation>,
}

impl Dependency {
  pub fn direction(&self) -> Direction {
    if self.distance >= 100 {
      Direction::Left
    } else {
      Direction::Right
    }
  }
}

/// The head-side facts shared by unary, subcat and gap events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeadedRewrite {
  pub parent: Nt,
  pub child: Nt,
  pub head_word: WordId,
  pub head_tag: Nt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
  Dependency(Dependency),
  /// A parent built over its head child
  Unary(HeadedRewrite),
  /// The subcat frame a new parent starts with on one side
  Subcat {
    rewrite: HeadedRewrite,
    frame: u32,
    direction: Direction,
  },
  /// Which side of the head a gap is passed to
  Gap {
    rewrite: HeadedRewrite,
    site: Direction,
  },
  /// How likely a constituent with this label and head is to be in the
  /// correct tree, regardless of context
  Prior { label: Nt, head_word: WordId, head_tag: Nt },
}

/// Anything that can score events
pub trait ProbabilityModel {
  fn log_prob(&self, event: &Event) -> f64;
}

impl<F> ProbabilityModel for F
where
  F: Fn(&Event) -> f64 + ?Sized,
{
  fn log_prob(&self, event: &Event) -> f64 {
    self(event)
  }
}

/// Per-sentence memo in front of a model
#[derive(Debug, Default)]
pub struct ProbCache {
  memo: HashMap<Event, f64>,
  hits: usize,
}

impl ProbCache {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn clear(&mut self) {
    self.memo.clear();
    self.hits = 0;
  }

  pub fn log_prob<M: ProbabilityModel + ?Sized>(&mut self, model: &M, event: Event) -> f64 {
    if let Some(&p) = self.memo.get(&event) {
      self.hits += 1;
      return p;
    }
    let p = model.log_prob(&event);
    self.memo.insert(event, p);
    p
  }

  /// Distinct events queried since the last clear
  pub fn len(&self) -> usize {
    self.memo.len()
  }

  pub fn is_empty(&self) -> bool {
    self.memo.is_empty()
  }

  pub fn hits(&self) -> usize {
    self.hits
  }
}

/// Log probability of anything a `TableModel` has no entry for, unless the
/// table says otherwise
pub const DEFAULT_MISS: f64 = -1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ModifierKey {
  Stop,
  Trace,
  Label(Nt),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TableKey {
  Dependency {
    parent: Nt,
    head: Nt,
    modifier: ModifierKey,
    direction: Direction,
  },
  Unary {
    parent: Nt,
    child: Nt,
  },
  Subcat {
    parent: Nt,
    child: Nt,
    direction: Direction,
    frame: u32,
  },
  Gap {
    parent: Nt,
    child: Nt,
    site: Direction,
  },
  Prior(Nt),
}

impl TableKey {
  fn of(event: &Event) -> Self {
    match *event {
      Event::Dependency(d) => TableKey::Dependency {
        parent: d.parent,
        head: d.head_label,
        modifier: match d.modifier {
          Modifier::Stop => ModifierKey::Stop,
          Modifier::Trace => ModifierKey::Trace,
          Modifier::Word { label, .. } => ModifierKey::Label(label),
        },
        direction: d.direction(),
      },
      Event::Unary(r) => TableKey::Unary {
        parent: r.parent,
        child: r.child,
      },
      Event::Subcat {
        rewrite,
        frame,
        direction,
      } => TableKey::Subcat {
        parent: rewrite.parent,
        child: rewrite.child,
        direction,
        frame,
      },
      Event::Gap { rewrite, site } => TableKey::Gap {
        parent: rewrite.parent,
        child: rewrite.child,
        site,
      },
      Event::Prior { label, .. } => TableKey::Prior(label),
    }
  }
}

/// A model keyed on labels alone, ignoring words. Useful for small grammars
/// and for exercising the parser; it does no estimation.
///
/// Text format, one entry per line:
///
/// ```text
/// default <lp>
/// D parent head modifier L|R <lp>     (modifier may be #STOP# or #TRACE#)
/// U parent child <lp>
/// S parent child L|R frame <lp>
/// G parent child L|R <lp>
/// P label <lp>
/// ```
#[derive(Debug, Clone)]
pub struct TableModel {
  table: HashMap<TableKey, f64>,
  default: f64,
}

fn parse_direction(s: &str) -> Direction {
  if s == "L" {
    Direction::Left
  } else {
    Direction::Right
  }
}

fn parse_log_prob(s: &str) -> Result<f64, Err> {
  let p: f64 = s.parse().map_err(|_| -> Err { format!("bad log probability {}", s).into() })?;
  if p.is_nan() || p > 0.0 {
    return Err(format!("log probability {} is not <= 0", s).into());
  }
  Ok(p)
}

impl TableModel {
  pub fn new(default: f64) -> Self {
    Self {
      table: HashMap::new(),
      default,
    }
  }

  pub fn parse(src: &str, g: &Grammar) -> Result<Self, Err> {
    regex_static!(DEFAULT, r"^default\s+(\S+)$");
    regex_static!(DEP, r"^D\s+(\S+)\s+(\S+)\s+(\S+)\s+([LR])\s+(\S+)$");
    regex_static!(UNARY, r"^U\s+(\S+)\s+(\S+)\s+(\S+)$");
    regex_static!(SUBCAT, r"^S\s+(\S+)\s+(\S+)\s+([LR])\s+(\d+)\s+(\S+)$");
    regex_static!(GAP, r"^G\s+(\S+)\s+(\S+)\s+([LR])\s+(\S+)$");
    regex_static!(PRIOR, r"^P\s+(\S+)\s+(\S+)$");

    let mut model = Self::new(DEFAULT_MISS);
    for (lineno, line) in content_lines(src) {
      let at_line = |e: Err| -> Err { format!("line {}: {}", lineno, e).into() };
      let nt = |name: &str| g.require_nt(name).map_err(at_line);
      let lp = |s: &str| parse_log_prob(s).map_err(at_line);

      let (key, p) = if let Some(caps) = DEFAULT.captures(line) {
        model.default = lp(&caps[1])?;
        continue;
      } else if let Some(caps) = DEP.captures(line) {
        let modifier = match &caps[3] {
          "#STOP#" => ModifierKey::Stop,
          "#TRACE#" => ModifierKey::Trace,
          label => ModifierKey::Label(nt(label)?),
        };
        let key = TableKey::Dependency {
          parent: nt(&caps[1])?,
          head: nt(&caps[2])?,
          modifier,
          direction: parse_direction(&caps[4]),
        };
        (key, lp(&caps[5])?)
      } else if let Some(caps) = UNARY.captures(line) {
        let key = TableKey::Unary {
          parent: nt(&caps[1])?,
          child: nt(&caps[2])?,
        };
        (key, lp(&caps[3])?)
      } else if let Some(caps) = SUBCAT.captures(line) {
        let frame = caps[4]
          .parse()
          .map_err(|_| at_line(format!("bad frame {}", &caps[4]).into()))?;
        let key = TableKey::Subcat {
          parent: nt(&caps[1])?,
          child: nt(&caps[2])?,
          direction: parse_direction(&caps[3]),
          frame,
        };
        (key, lp(&caps[5])?)
      } else if let Some(caps) = GAP.captures(line) {
        let key = TableKey::Gap {
          parent: nt(&caps[1])?,
          child: nt(&caps[2])?,
          site: parse_direction(&caps[3]),
        };
        (key, lp(&caps[4])?)
      } else if let Some(caps) = PRIOR.captures(line) {
        (TableKey::Prior(nt(&caps[1])?), lp(&caps[2])?)
      } else {
        return Err(format!("line {}: unrecognized model entry: {}", lineno, line).into());
      };
      model.table.insert(key, p);
    }

    tracing::info!(entries = model.table.len(), default = model.default, "loaded table model");
    Ok(model)
  }

  pub fn read_from_file<P: AsRef<Path>>(path: P, g: &Grammar) -> Result<Self, Err> {
    let path = path.as_ref();
    let src =
      fs::read_to_string(path).map_err(|e| -> Err { format!("{}: {}", path.display(), e).into() })?;
    Self::parse(&src, g)
  }

  pub fn len(&self) -> usize {
    self.table.len()
  }

  pub fn is_empty(&self) -> bool {
    self.table.is_empty()
  }

  pub fn default_log_prob(&self) -> f64 {
    self.default
  }
}

impl ProbabilityModel for TableModel {
  fn log_prob(&self, event: &Event) -> f64 {
    self
      .table
      .get(&TableKey::of(event))
      .copied()
      .unwrap_or(self.default)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::Cell;

  fn grammar() -> Grammar {
    Grammar::new(&["TOP", "S", "NP", "VP", "NN", "VB"]).unwrap()
  }

  fn dep(g: &Grammar, modifier: Modifier, distance: u32) -> Event {
    Event::Dependency(Dependency {
      modifier,
      head_word: WordId::UNKNOWN,
      head_tag: g.nt("VB").unwrap(),
      parent: g.nt("S").unwrap(),
      head_label: g.nt("VP").unwrap(),
      distance,
      subcat: 0,
      coordination: None,
      punctuation: None,
    })
  }

  #[test]
  fn table_lookups_by_label() {
    let g = grammar();
    let m = TableModel::parse(
      "default -20\n\
       D S VP NP L -1.5\n\
       D S VP #STOP# R -0.25\n\
       D S VP #TRACE# R -3\n\
       U S VP -0.5\n\
       S S VP L 10000 -0.75\n\
       G S VP R -2\n\
       P S -4\n",
      &g,
    )
    .unwrap();
    assert_eq!(m.len(), 7);

    let np = Modifier::Word {
      word: WordId(7),
      tag: g.nt("NN").unwrap(),
      label: g.nt("NP").unwrap(),
    };
    assert_eq!(m.log_prob(&dep(&g, np, 110)), -1.5);
    assert_eq!(m.log_prob(&dep(&g, np, 10)), -20.0);
    assert_eq!(m.log_prob(&dep(&g, Modifier::Stop, 11)), -0.25);
    assert_eq!(m.log_prob(&dep(&g, Modifier::Stop, 111)), -20.0);
    assert_eq!(m.log_prob(&dep(&g, Modifier::Trace, 0)), -3.0);

    let rewrite = HeadedRewrite {
      parent: g.nt("S").unwrap(),
      child: g.nt("VP").unwrap(),
      head_word: WordId::UNKNOWN,
      head_tag: g.nt("VB").unwrap(),
    };
    assert_eq!(m.log_prob(&Event::Unary(rewrite)), -0.5);
    let subcat = |frame| Event::Subcat {
      rewrite,
      frame,
      direction: Direction::Left,
    };
    assert_eq!(m.log_prob(&subcat(10_000)), -0.75);
    assert_eq!(m.log_prob(&subcat(0)), -20.0);
    assert_eq!(
      m.log_prob(&Event::Gap {
        rewrite,
        site: Direction::Right
      }),
      -2.0
    );
    let prior = Event::Prior {
      label: g.nt("S").unwrap(),
      head_word: WordId(3),
      head_tag: g.nt("VB").unwrap(),
    };
    assert_eq!(m.log_prob(&prior), -4.0);
  }

  #[test]
  fn bad_entries_are_errors() {
    let g = grammar();
    assert!(TableModel::parse("U S XP -1\n", &g).is_err());
    assert!(TableModel::parse("U S VP 0.5\n", &g).is_err());
    let err = TableModel::parse("P S -1\nQ S\n", &g).unwrap_err();
    assert!(err.to_string().contains("line 2"));
    assert_eq!(TableModel::parse("", &g).unwrap().default_log_prob(), DEFAULT_MISS);
  }

  #[test]
  fn cache_queries_each_event_once() {
    let g = grammar();
    let calls = Cell::new(0);
    let model = |_: &Event| {
      calls.set(calls.get() + 1);
      -1.0
    };

    let mut cache = ProbCache::new();
    let e = dep(&g, Modifier::Stop, 10);
    assert_eq!(cache.log_prob(&model, e), -1.0);
    assert_eq!(cache.log_prob(&model, e), -1.0);
    assert_eq!(calls.get(), 1);
    assert_eq!(cache.hits(), 1);

    cache.log_prob(&model, dep(&g, Modifier::Stop, 110));
    assert_eq!(calls.get(), 2);
    assert_eq!(cache.len(), 2);

    cache.clear();
    assert!(cache.is_empty());
    cache.log_prob(&model, e);
    assert_eq!(calls.get(), 3);
  }
}
