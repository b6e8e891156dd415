//! Loaders for the flat grammar files: `.nts` (one label per line),
//! `.lexicon` (`word tag frequent`) and `.grm` (one rule per line).

use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

use crate::context::Direction;
use crate::grammar::Grammar;
use crate::Err;

/// Lines worth looking at, with 1-based line numbers. Blank lines and `//`
/// comments are skipped.
pub(crate) fn content_lines(src: &str) -> impl Iterator<Item = (usize, &str)> {
  src
    .lines()
    .enumerate()
    .map(|(i, line)| (i + 1, line.trim()))
    .filter(|(_, line)| !line.is_empty() && !line.starts_with("//"))
}

/// Parses a `.nts` file into label names, in file order
pub fn parse_nonterminals(src: &str) -> Result<Vec<String>, Err> {
  regex_static!(NT_LINE, r"^(\S+)(\s+.*)?$");

  let mut names = Vec::new();
  for (lineno, line) in content_lines(src) {
    let caps = NT_LINE
      .captures(line)
      .ok_or_else(|| -> Err { format!("line {}: bad nonterminal: {}", lineno, line).into() })?;
    names.push(caps[1].to_string());
  }
  if names.is_empty() {
    return Err("empty nonterminal list".into());
  }
  Ok(names)
}

/// Adds every `word tag frequent` entry to the grammar's lexicon. Returns the
/// number of entries read.
pub fn parse_lexicon(g: &mut Grammar, src: &str) -> Result<usize, Err> {
  regex_static!(LEX_LINE, r"^(\S+)\s+(\S+)\s+([01])$");

  let mut count = 0;
  for (lineno, line) in content_lines(src) {
    let caps = LEX_LINE
      .captures(line)
      .ok_or_else(|| -> Err { format!("line {}: bad lexicon entry: {}", lineno, line).into() })?;
    let tag = g
      .require_nt(&caps[2])
      .map_err(|e| -> Err { format!("line {}: {}", lineno, e).into() })?;
    g.add_word(&caps[1], tag, &caps[3] == "1");
    count += 1;
  }
  Ok(count)
}

/// Rule counts by kind, for logging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleCounts {
  pub attachments: usize,
  pub unaries: usize,
  pub frames: usize,
}

/// Adds every rule of a `.grm` file to the grammar
pub fn parse_rules(g: &mut Grammar, src: &str) -> Result<RuleCounts, Err> {
  regex_static!(ATTACH, r"^([LR])\s+(\S+)\s+(\S+)\s+(\S+)$");
  regex_static!(UNARY, r"^U\s+(\S+)\s+(\S+)$");
  regex_static!(FRAME, r"^([XY])\s+(\S+)\s+(\S+)\s+(\d+)$");

  let mut counts = RuleCounts::default();
  for (lineno, line) in content_lines(src) {
    let at_line = |e: Err| -> Err { format!("line {}: {}", lineno, e).into() };

    if let Some(caps) = ATTACH.captures(line) {
      let direction = if &caps[1] == "L" { Direction::Left } else { Direction::Right };
      let parent = g.require_nt(&caps[2]).map_err(at_line)?;
      let head = g.require_nt(&caps[3]).map_err(at_line)?;
      let modifier = g.require_nt(&caps[4]).map_err(at_line)?;
      g.add_rule(direction, parent, head, modifier);
      counts.attachments += 1;
    } else if let Some(caps) = UNARY.captures(line) {
      let parent = g.require_nt(&caps[1]).map_err(at_line)?;
      let child = g.require_nt(&caps[2]).map_err(at_line)?;
      g.add_unary(parent, child);
      counts.unaries += 1;
    } else if let Some(caps) = FRAME.captures(line) {
      let direction = if &caps[1] == "X" { Direction::Left } else { Direction::Right };
      let parent = g.require_nt(&caps[2]).map_err(at_line)?;
      let head = g.require_nt(&caps[3]).map_err(at_line)?;
      let frame: u32 = caps[4]
        .parse()
        .map_err(|_| at_line(format!("bad frame {}", &caps[4]).into()))?;
      if frame >= 100_000 {
        return Err(at_line(format!("frame {} has more than five digits", frame).into()));
      }
      g.add_frame(direction, parent, head, frame);
      counts.frames += 1;
    } else {
      return Err(format!("line {}: unrecognized rule: {}", lineno, line).into());
    }
  }
  Ok(counts)
}

impl Grammar {
  /// Build a grammar from the contents of its three files
  pub fn from_sources(nts: &str, lexicon: &str, grm: &str) -> Result<Self, Err> {
    let names = parse_nonterminals(nts).map_err(|e| -> Err { format!("nts: {}", e).into() })?;
    let mut g = Grammar::new(&names)?;
    let words =
      parse_lexicon(&mut g, lexicon).map_err(|e| -> Err { format!("lexicon: {}", e).into() })?;
    let rules = parse_rules(&mut g, grm).map_err(|e| -> Err { format!("grm: {}", e).into() })?;

    tracing::info!(
      nonterminals = names.len(),
      lexicon_entries = words,
      attachments = rules.attachments,
      unaries = rules.unaries,
      frames = rules.frames,
      "loaded grammar"
    );
    Ok(g)
  }

  /// Reads `base.nts`, `base.lexicon` and `base.grm`
  pub fn read_from_files<P: AsRef<Path>>(base: P) -> Result<Self, Err> {
    let base = base.as_ref();
    let read = |ext: &str| -> Result<String, Err> {
      let mut path = base.as_os_str().to_owned();
      path.push(".");
      path.push(ext);
      let path = PathBuf::from(path);
      fs::read_to_string(&path).map_err(|e| format!("{}: {}", path.display(), e).into())
    };
    Self::from_sources(&read("nts")?, &read("lexicon")?, &read("grm")?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const NTS: &str = "TOP\nS\n// comment\n\nNP\nVP\nNN\nVB\n";

  #[test]
  fn loads_all_three_files() {
    let g = Grammar::from_sources(
      NTS,
      "John NN 1\nsleeps VB 0\nsleeps NN 0\n",
      "U TOP S\nU S VP\nL S VP NP\nR S VP NP\nX S VP 10000\nY S VP 0\n",
    )
    .unwrap();
    let nt = |s| g.nt(s).unwrap();

    assert_eq!(g.num_nts(), 6);
    assert!(g.is_legal(Direction::Left, nt("S"), nt("VP"), nt("NP")));
    assert!(g.is_legal(Direction::Right, nt("S"), nt("VP"), nt("NP")));
    assert_eq!(g.unary_parents(nt("VP")), &[nt("S")]);
    assert_eq!(g.frames(Direction::Left, nt("S"), nt("VP")), &[10_000]);
    assert_eq!(g.frames(Direction::Right, nt("S"), nt("VP")), &[0]);

    let john = g.word_id("John");
    assert!(g.is_frequent(john));
    assert_eq!(g.tags_for(g.word_id("sleeps")).len(), 2);
  }

  #[test]
  fn errors_name_the_line() {
    let err = Grammar::from_sources(NTS, "John NN 1\nMary XX 1\n", "").unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("line 2"), "{}", msg);
    assert!(msg.contains("XX"), "{}", msg);

    let err = Grammar::from_sources(NTS, "", "U TOP S\nQ S VP\n").unwrap_err();
    assert!(err.to_string().contains("line 2"));

    let err = Grammar::from_sources(NTS, "", "X S VP 123456\n").unwrap_err();
    assert!(err.to_string().contains("five digits"));

    assert!(Grammar::from_sources("", "", "").is_err());
  }

  #[test]
  fn missing_files_are_errors() {
    assert!(Grammar::read_from_files("/nonexistent/grammar").is_err());
  }
}
