use std::collections::HashMap;
use std::fmt;

use crate::context::{ArgKind, Complement, Direction};
use crate::Err;

/// A nonterminal or part-of-speech tag, as an index into the grammar's name table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Nt(pub u16);

impl Nt {
  pub fn index(self) -> usize {
    self.0 as usize
  }
}

/// A word in the lexicon. Id 0 is every word the lexicon doesn't know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WordId(pub u32);

impl WordId {
  pub const UNKNOWN: WordId = WordId(0);

  pub fn index(self) -> usize {
    self.0 as usize
  }
}

pub const UNKNOWN_WORD: &str = "*UNKNOWN*";

const VERB_TAGS: [&str; 6] = ["VB", "VBD", "VBG", "VBN", "VBP", "VBZ"];

/// Labels the parser treats specially. Only the root is mandatory: rules keyed
/// on an absent label simply never fire.
#[derive(Debug, Clone, PartialEq)]
pub struct Landmarks {
  pub top: Nt,
  pub cc: Option<Nt>,
  pub np: Option<Nt>,
  pub npa: Option<Nt>,
  pub npb: Option<Nt>,
  pub sbara: Option<Nt>,
  pub sa: Option<Nt>,
  pub sga: Option<Nt>,
  pub vpa: Option<Nt>,
  pub lrb: Option<Nt>,
  pub rrb: Option<Nt>,
}

impl Landmarks {
  fn find(ids: &HashMap<String, Nt>) -> Result<Self, Err> {
    let get = |name: &str| ids.get(name).copied();
    Ok(Self {
      top: get("TOP").ok_or("grammar has no TOP nonterminal")?,
      cc: get("CC"),
      np: get("NP"),
      npa: get("NP-A"),
      npb: get("NPB"),
      sbara: get("SBAR-A"),
      sa: get("S-A"),
      sga: get("SG-A"),
      vpa: get("VP-A"),
      lrb: get("-LRB-"),
      rrb: get("-RRB-"),
    })
  }

  pub fn is_npb(&self, label: Nt) -> bool {
    self.npb == Some(label)
  }
}

/// Dense bitset over (parent, head, modifier) triples
#[derive(Debug, Clone)]
struct TripleTable {
  n: usize,
  bits: Vec<u64>,
}

impl TripleTable {
  fn new(n: usize) -> Self {
    Self {
      n,
      bits: vec![0; (n * n * n).div_ceil(64)],
    }
  }

  fn slot(&self, a: Nt, b: Nt, c: Nt) -> Option<usize> {
    let (a, b, c) = (a.index(), b.index(), c.index());
    if a < self.n && b < self.n && c < self.n {
      Some((a * self.n + b) * self.n + c)
    } else {
      None
    }
  }

  fn insert(&mut self, a: Nt, b: Nt, c: Nt) {
    if let Some(i) = self.slot(a, b, c) {
      self.bits[i / 64] |= 1u64 << (i % 64);
    }
  }

  fn contains(&self, a: Nt, b: Nt, c: Nt) -> bool {
    self.slot(a, b, c)
      .is_some_and(|i| self.bits[i / 64] & (1u64 << (i % 64)) != 0)
  }

  fn count(&self) -> usize {
    self.bits.iter().map(|w| w.count_ones() as usize).sum()
  }
}

/// Static lookup tables the chart consults: label maps, legal attachments,
/// unary rewrites, subcat frames, and the lexicon.
#[derive(Debug, Clone)]
pub struct Grammar {
  names: Vec<String>,
  ids: HashMap<String, Nt>,
  arg_map: Vec<Nt>,
  has_arg: Vec<bool>,
  gap_map: Vec<Nt>,
  has_gap: Vec<bool>,
  verbs: Vec<bool>,
  left_table: TripleTable,
  right_table: TripleTable,
  unaries: Vec<Vec<Nt>>,
  left_frames: HashMap<(Nt, Nt), Vec<u32>>,
  right_frames: HashMap<(Nt, Nt), Vec<u32>>,
  words: HashMap<String, WordId>,
  word_names: Vec<String>,
  frequent: Vec<bool>,
  tag_dict: Vec<Vec<Nt>>,
  pub landmarks: Landmarks,
}

impl Grammar {
  /// Build an empty grammar over the given nonterminal and tag names. The
  /// label-derived maps are computed here, the tables start empty.
  pub fn new<S: AsRef<str>>(names: &[S]) -> Result<Self, Err> {
    if names.len() > u16::MAX as usize {
      return Err(format!("too many nonterminals: {}", names.len()).into());
    }

    let names: Vec<String> = names.iter().map(|s| s.as_ref().to_string()).collect();
    let mut ids = HashMap::new();
    for (i, name) in names.iter().enumerate() {
      if ids.insert(name.clone(), Nt(i as u16)).is_some() {
        return Err(format!("duplicate nonterminal {}", name).into());
      }
    }

    let n = names.len();
    let mut arg_map: Vec<Nt> = (0..n).map(|i| Nt(i as u16)).collect();
    let mut has_arg = vec![false; n];
    let mut gap_map = arg_map.clone();
    let mut has_gap = vec![false; n];

    for (i, name) in names.iter().enumerate() {
      if let Some(dash) = name.find('-') {
        if let Some(&stripped) = ids.get(&name[..dash]) {
          arg_map[i] = stripped;
        }
      }
      has_arg[i] = name.match_indices('-').any(|(j, _)| name[j + 1..].starts_with('A'));

      if let Some(base) = name.strip_suffix("-g") {
        has_gap[i] = true;
        if let Some(&stripped) = ids.get(base) {
          gap_map[i] = stripped;
        }
      }
    }

    // the one gapped sentential complement whose name doesn't follow the pattern
    if let Some(&ssag) = ids.get("Ss-A-g") {
      if let Some(&sa) = ids.get("S-A") {
        gap_map[ssag.index()] = sa;
      }
      if let Some(&s) = ids.get("S") {
        arg_map[ssag.index()] = s;
      }
    }

    let verbs = names.iter().map(|name| VERB_TAGS.contains(&name.as_str())).collect();
    let landmarks = Landmarks::find(&ids)?;

    Ok(Self {
      arg_map,
      has_arg,
      gap_map,
      has_gap,
      verbs,
      left_table: TripleTable::new(n),
      right_table: TripleTable::new(n),
      unaries: vec![Vec::new(); n],
      left_frames: HashMap::new(),
      right_frames: HashMap::new(),
      words: HashMap::from([(UNKNOWN_WORD.to_string(), WordId::UNKNOWN)]),
      word_names: vec![UNKNOWN_WORD.to_string()],
      frequent: vec![false],
      tag_dict: vec![Vec::new()],
      landmarks,
      names,
      ids,
    })
  }

  pub fn num_nts(&self) -> usize {
    self.names.len()
  }

  pub fn nt(&self, name: &str) -> Option<Nt> {
    self.ids.get(name).copied()
  }

  pub fn name(&self, nt: Nt) -> &str {
    self.names.get(nt.index()).map_or("?", |s| s.as_str())
  }

  /// Like `nt`, but an unknown name is an error naming it
  pub fn require_nt(&self, name: &str) -> Result<Nt, Err> {
    self
      .nt(name)
      .ok_or_else(|| format!("unknown nonterminal {}", name).into())
  }

  pub fn has_arg(&self, nt: Nt) -> bool {
    self.has_arg.get(nt.index()).copied().unwrap_or(false)
  }

  pub fn has_gap(&self, nt: Nt) -> bool {
    self.has_gap.get(nt.index()).copied().unwrap_or(false)
  }

  /// The label with any `-A`/`-g` style suffixes removed
  pub fn arg_stripped(&self, nt: Nt) -> Nt {
    self.arg_map.get(nt.index()).copied().unwrap_or(nt)
  }

  /// The label with a trailing `-g` removed
  pub fn gap_stripped(&self, nt: Nt) -> Nt {
    self.gap_map.get(nt.index()).copied().unwrap_or(nt)
  }

  pub fn is_verb(&self, tag: Nt) -> bool {
    self.verbs.get(tag.index()).copied().unwrap_or(false)
  }

  /// Which counter `modifier` discharges when it attaches, and whether it
  /// fills a gap
  pub fn complement_of(&self, modifier: Nt) -> Complement {
    let stripped = Some(self.gap_stripped(modifier));
    let lm = &self.landmarks;
    let arg = if lm.npa.is_some() && stripped == lm.npa {
      Some(ArgKind::Np)
    } else if lm.sbara.is_some() && stripped == lm.sbara {
      Some(ArgKind::Sbar)
    } else if (lm.sa.is_some() && stripped == lm.sa) || (lm.sga.is_some() && Some(modifier) == lm.sga)
    {
      Some(ArgKind::S)
    } else if lm.vpa.is_some() && stripped == lm.vpa {
      Some(ArgKind::Vp)
    } else if self.has_arg(self.gap_stripped(modifier)) {
      Some(ArgKind::Other)
    } else {
      None
    };
    Complement {
      arg,
      gap: self.has_gap(modifier),
    }
  }

  pub fn add_rule(&mut self, direction: Direction, parent: Nt, head: Nt, modifier: Nt) {
    match direction {
      Direction::Left => self.left_table.insert(parent, head, modifier),
      Direction::Right => self.right_table.insert(parent, head, modifier),
    }
  }

  /// May `modifier` attach on `direction` of a `head` child under `parent`?
  pub fn is_legal(&self, direction: Direction, parent: Nt, head: Nt, modifier: Nt) -> bool {
    match direction {
      Direction::Left => self.left_table.contains(parent, head, modifier),
      Direction::Right => self.right_table.contains(parent, head, modifier),
    }
  }

  pub fn add_unary(&mut self, parent: Nt, child: Nt) {
    if let Some(parents) = self.unaries.get_mut(child.index()) {
      parents.push(parent);
    }
  }

  /// Parents that may be built directly over `child`, in grammar order
  pub fn unary_parents(&self, child: Nt) -> &[Nt] {
    self.unaries.get(child.index()).map_or(&[][..], |v| v.as_slice())
  }

  pub fn add_frame(&mut self, direction: Direction, parent: Nt, head: Nt, frame: u32) {
    let frames = match direction {
      Direction::Left => &mut self.left_frames,
      Direction::Right => &mut self.right_frames,
    };
    frames.entry((parent, head)).or_default().push(frame);
  }

  /// Subcat frames a `parent` over `head` may start with on `direction`
  pub fn frames(&self, direction: Direction, parent: Nt, head: Nt) -> &[u32] {
    let frames = match direction {
      Direction::Left => &self.left_frames,
      Direction::Right => &self.right_frames,
    };
    frames.get(&(parent, head)).map_or(&[][..], |v| v.as_slice())
  }

  /// Add a lexicon entry. Repeated words accumulate tags; the frequent flag
  /// of the last entry wins.
  pub fn add_word(&mut self, word: &str, tag: Nt, frequent: bool) -> WordId {
    let id = match self.words.get(word) {
      Some(&id) => id,
      None => {
        let id = WordId(self.word_names.len() as u32);
        self.words.insert(word.to_string(), id);
        self.word_names.push(word.to_string());
        self.frequent.push(false);
        self.tag_dict.push(Vec::new());
        id
      }
    };
    self.frequent[id.index()] = frequent;
    let tags = &mut self.tag_dict[id.index()];
    if let Err(pos) = tags.binary_search(&tag) {
      tags.insert(pos, tag);
    }
    id
  }

  pub fn word_id(&self, word: &str) -> WordId {
    self.words.get(word).copied().unwrap_or(WordId::UNKNOWN)
  }

  pub fn word_name(&self, word: WordId) -> &str {
    self.word_names.get(word.index()).map_or(UNKNOWN_WORD, |s| s.as_str())
  }

  pub fn num_words(&self) -> usize {
    self.word_names.len()
  }

  pub fn is_frequent(&self, word: WordId) -> bool {
    self.frequent.get(word.index()).copied().unwrap_or(false)
  }

  /// Tags the lexicon allows for `word`, in ascending id order
  pub fn tags_for(&self, word: WordId) -> &[Nt] {
    self.tag_dict.get(word.index()).map_or(&[][..], |v| v.as_slice())
  }
}

impl fmt::Display for Grammar {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "//** root: {}", self.name(self.landmarks.top))?;
    writeln!(f, "//** nonterminals: {}", self.names.len())?;
    writeln!(f, "//** words: {}", self.word_names.len() - 1)?;
    writeln!(
      f,
      "//** rules: {} left, {} right, {} unary",
      self.left_table.count(),
      self.right_table.count(),
      self.unaries.iter().map(|u| u.len()).sum::<usize>()
    )
  }
}
