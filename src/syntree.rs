use std::fmt;
use std::ops::Range;

use crate::chart::Chart;
use crate::edge::{Child, EdgeId};
use crate::grammar::Grammar;
use crate::sentence::Sentence;

#[derive(Debug, PartialEq, Clone)]
pub struct Constituent<T> {
  pub value: T,
  /// Token positions, end exclusive
  pub span: (usize, usize),
}

impl<T> fmt::Display for Constituent<T>
where
  T: fmt::Display,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}..{}: {}", self.span.0, self.span.1, self.value)
  }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Word<U> {
  pub value: U,
  pub span: (usize, usize),
}

impl<U> fmt::Display for Word<U>
where
  U: fmt::Display,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}..{}: {}", self.span.0, self.span.1, self.value)
  }
}

#[derive(Debug, PartialEq, Clone)]
pub enum SynTree<T, U> {
  Branch(Constituent<T>, Vec<SynTree<T, U>>),
  Leaf(Word<U>),
  /// An empty element standing in for a moved NP
  Trace,
}

impl<T, U> SynTree<T, U> {
  pub fn get_branch(&self) -> Option<(&Constituent<T>, &Vec<SynTree<T, U>>)> {
    match self {
      Self::Branch(c, cs) => Some((c, cs)),
      _ => None,
    }
  }

  /// Traces cover nothing
  pub fn span(&self) -> Option<(usize, usize)> {
    match self {
      Self::Branch(c, _) => Some(c.span),
      Self::Leaf(w) => Some(w.span),
      Self::Trace => None,
    }
  }

  pub fn leaves(&self) -> Vec<&Word<U>> {
    let mut out = Vec::new();
    self.collect_leaves(&mut out);
    out
  }

  fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Word<U>>) {
    match self {
      Self::Branch(_, children) => children.iter().for_each(|c| c.collect_leaves(out)),
      Self::Leaf(w) => out.push(w),
      Self::Trace => {}
    }
  }
}

impl<T, U> fmt::Display for SynTree<T, U>
where
  T: fmt::Display,
  U: fmt::Display,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Leaf(t) => write!(f, "{}", t),
      Self::Trace => write!(f, "TRACE"),
      Self::Branch(t, ts) => {
        write!(f, "({}", t)?;
        if ts.len() == 1 {
          write!(f, " ({}))", ts[0])
        } else {
          for t in ts.iter() {
            let fmt = t.to_string();
            for line in fmt.lines() {
              write!(f, "\n  {}", line)?;
            }
          }
          write!(f, ")")
        }
      }
    }
  }
}

/// A constituent of a finished parse
#[derive(Debug, PartialEq, Clone)]
pub struct Node {
  pub label: String,
  /// The label with argument and gap marks removed, base NPs as plain NP
  pub treebank_label: String,
  pub prob: f64,
  pub head_word: String,
  /// 1-based position of the head among the children
  pub head_index: Option<usize>,
  /// An NP or NP-A whose only child is a base NP
  pub base_np_wrapper: bool,
}

impl fmt::Display for Node {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", self.label, self.prob)
  }
}

/// A word as it appeared in the input, with the punctuation that was stripped
/// around it
#[derive(Debug, PartialEq, Clone)]
pub struct Tagged {
  pub word: String,
  pub tag: String,
  /// Punctuation before the sentence's first word
  pub before: Vec<(String, String)>,
  pub after: Vec<(String, String)>,
}

impl fmt::Display for Tagged {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.word, self.tag)
  }
}

pub type ParseTree = SynTree<Node, Tagged>;

fn raw_punctuation(sentence: &Sentence, positions: Range<usize>) -> Vec<(String, String)> {
  positions
    .map(|i| (sentence.raw_word(i).to_string(), sentence.raw_tag(i).to_string()))
    .collect()
}

fn build(
  chart: &Chart,
  id: EdgeId,
  sentence: &Sentence,
  g: &Grammar,
  visiting: &mut [bool],
) -> Option<ParseTree> {
  let e = chart.edge(id);
  if e.is_leaf() {
    let pos = e.head;
    return Some(SynTree::Leaf(Word {
      span: (pos, pos + 1),
      value: Tagged {
        word: sentence.token_text(pos).to_string(),
        tag: g.name(e.head_tag).to_string(),
        before: if pos == 0 {
          raw_punctuation(sentence, sentence.leading_punctuation())
        } else {
          Vec::new()
        },
        after: raw_punctuation(sentence, sentence.punctuation_after(pos)),
      },
    }));
  }

  // replacement in place can, rarely, tie a derivation into a loop
  if std::mem::replace(&mut visiting[id.index()], true) {
    return None;
  }
  let mut children = Vec::new();
  for &child in chart.children(id) {
    children.push(match child {
      Child::Edge(c) => build(chart, c, sentence, g, visiting)?,
      Child::Trace => SynTree::Trace,
    });
  }
  visiting[id.index()] = false;

  let start = children.iter().filter_map(|c| c.span()).map(|s| s.0).min()?;
  let end = children.iter().filter_map(|c| c.span()).map(|s| s.1).max()?;

  let lm = &g.landmarks;
  let base_np_wrapper = (Some(e.label) == lm.np || Some(e.label) == lm.npa)
    && match chart.children(id) {
      [Child::Edge(only)] => lm.is_npb(chart.edge(*only).label),
      _ => false,
    };
  let treebank_label = match (lm.is_npb(e.label), lm.np) {
    (true, Some(np)) => g.name(np),
    _ => g.name(g.arg_stripped(e.label)),
  };

  Some(SynTree::Branch(
    Constituent {
      span: (start, end),
      value: Node {
        label: g.name(e.label).to_string(),
        treebank_label: treebank_label.to_string(),
        prob: e.prob,
        head_word: sentence.token_text(e.head).to_string(),
        head_index: e.head_child.and_then(|h| {
          chart
            .children(id)
            .iter()
            .position(|&c| c == Child::Edge(h))
            .map(|i| i + 1)
        }),
        base_np_wrapper,
      },
    },
    children,
  ))
}

fn push_punctuation(out: &mut String, punctuation: &[(String, String)]) {
  for (word, tag) in punctuation {
    out.push_str(&format!("{}/PUNC{} ", word, tag));
  }
}

impl ParseTree {
  /// The tree under edge `root`. `None` if the derivation loops.
  pub fn from_chart(chart: &Chart, root: EdgeId, sentence: &Sentence, g: &Grammar) -> Option<Self> {
    let mut visiting = vec![false; chart.len()];
    build(chart, root, sentence, g, &mut visiting)
  }

  /// One line, each constituent as `(LABEL~headword~children~headindex ...)`
  /// and each word as `word/TAG`, with punctuation put back as `word/PUNCtag`.
  /// With `collapse_base_np`, NP wrappers around a lone base NP are dropped.
  pub fn flat(&self, collapse_base_np: bool) -> String {
    let mut out = String::new();
    self.write_flat(&mut out, collapse_base_np);
    out
  }

  fn write_flat(&self, out: &mut String, collapse: bool) {
    match self {
      Self::Trace => out.push_str("T/TRACE "),
      Self::Leaf(w) => {
        push_punctuation(out, &w.value.before);
        out.push_str(&format!("{} ", w.value));
        push_punctuation(out, &w.value.after);
      }
      Self::Branch(c, children) => {
        let bracket = !(collapse && c.value.base_np_wrapper);
        if bracket {
          let head_index = c.value.head_index.map_or(-1, |i| i as i64);
          out.push_str(&format!(
            "({}~{}~{}~{} ",
            c.value.label,
            c.value.head_word,
            children.len(),
            head_index
          ));
        }
        for child in children {
          child.write_flat(out, collapse);
        }
        if bracket {
          out.push_str(") ");
        }
      }
    }
  }

  /// Treebank-style bracketing without the root or the part-of-speech level.
  /// Punctuation goes after the highest constituent ending at the word it
  /// followed.
  pub fn skeleton(&self) -> String {
    let mut parts: Vec<String> = self
      .leaves()
      .first()
      .map(|w| w.value.before.iter().map(|(word, _)| word.clone()).collect())
      .unwrap_or_default();
    match self.get_branch() {
      Some((_, children)) => {
        parts.extend(children.iter().filter_map(|c| c.skeleton_part(true)));
      }
      None => parts.extend(self.skeleton_part(true)),
    }
    parts.join(" ")
  }

  fn skeleton_part(&self, highest: bool) -> Option<String> {
    let mut out = match self {
      Self::Trace => return None,
      Self::Leaf(w) => w.value.word.clone(),
      Self::Branch(c, children) => {
        let children = match (c.value.base_np_wrapper, children.as_slice()) {
          (true, [only]) => only.get_branch().map_or(children, |(_, inner)| inner),
          _ => children,
        };
        let end = c.span.1;
        let inner: Vec<String> = children
          .iter()
          .filter_map(|child| {
            let child_highest = child.span().is_some_and(|s| s.1 != end);
            child.skeleton_part(child_highest)
          })
          .collect();
        format!("({} {})", c.value.treebank_label, inner.join(" "))
      }
    };

    if highest {
      if let Some(last) = self.leaves().last() {
        for (word, _) in &last.value.after {
          out.push(' ');
          out.push_str(word);
        }
      }
    }
    Some(out)
  }
}
