use std::ops::Range;

use crate::grammar::{Grammar, Nt, WordId};
use crate::utils::InputError;
use crate::Err;

const PUNCTUATION_TAGS: [&str; 5] = [",", ".", "``", "''", ":"];

fn is_punctuation(tag: &str) -> bool {
  PUNCTUATION_TAGS.contains(&tag)
}

fn is_comma(word: &str, tag: &str) -> bool {
  word != "..." && (tag == "," || tag == ":")
}

/// A word the parser sees: punctuation has been stripped out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
  pub word: WordId,
  pub tag: Nt,
  /// Index into the raw words
  pub position: usize,
}

/// A comma or colon attached to the token before it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Punctuation {
  pub word: WordId,
  pub tag: Nt,
}

/// A sentence ready for parsing. Built once, immutable for the whole parse.
#[derive(Debug, Clone, PartialEq)]
pub struct Sentence {
  words: Vec<String>,
  tags: Vec<String>,
  tokens: Vec<Token>,
  commas: Vec<Option<Punctuation>>,
  prune_commas: Vec<bool>,
}

impl Sentence {
  pub fn new<S: AsRef<str>>(words: &[S], tags: &[S], g: &Grammar) -> Result<Self, InputError> {
    if words.len() != tags.len() {
      return Err(InputError::Malformed(format!(
        "{} words but {} tags",
        words.len(),
        tags.len()
      )));
    }

    let words: Vec<String> = words.iter().map(|w| w.as_ref().to_string()).collect();
    let tags: Vec<String> = tags.iter().map(|t| t.as_ref().to_string()).collect();
    let tag_id = |position: usize, tag: &str| {
      g.nt(tag).ok_or_else(|| InputError::UnknownTag {
        position,
        tag: tag.to_string(),
      })
    };

    let mut tokens: Vec<Token> = Vec::new();
    let mut commas: Vec<Option<Punctuation>> = Vec::new();
    for (position, (word, tag)) in words.iter().zip(tags.iter()).enumerate() {
      if !is_punctuation(tag) {
        tokens.push(Token {
          word: g.word_id(word),
          tag: tag_id(position, tag.as_str())?,
          position,
        });
        commas.push(None);
      } else if is_comma(word, tag) && !tokens.is_empty() {
        let attached = Punctuation {
          word: g.word_id(word),
          tag: tag_id(position, tag.as_str())?,
        };
        if let Some(last) = commas.last_mut() {
          *last = Some(attached);
        }
      }
    }

    if tokens.is_empty() {
      return Err(InputError::Empty);
    }
    // a comma after the last word neither prunes nor conditions anything
    if let Some(last) = commas.last_mut() {
      *last = None;
    }

    let mut in_brackets = false;
    let prune_commas = tokens
      .iter()
      .zip(commas.iter())
      .map(|(token, comma)| {
        if Some(token.tag) == g.landmarks.lrb {
          in_brackets = true;
        }
        if Some(token.tag) == g.landmarks.rrb {
          in_brackets = false;
        }
        !in_brackets && comma.is_some()
      })
      .collect();

    Ok(Self {
      words,
      tags,
      tokens,
      commas,
      prune_commas,
    })
  }

  /// Number of tokens, i.e. words after punctuation removal
  pub fn len(&self) -> usize {
    self.tokens.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tokens.is_empty()
  }

  pub fn check_len(&self, max: usize) -> Result<(), InputError> {
    if self.len() > max {
      Err(InputError::TooLong {
        len: self.len(),
        max,
      })
    } else {
      Ok(())
    }
  }

  pub fn tokens(&self) -> &[Token] {
    &self.tokens
  }

  pub fn token(&self, i: usize) -> Token {
    self.tokens[i]
  }

  pub fn word(&self, i: usize) -> WordId {
    self.tokens[i].word
  }

  pub fn tag(&self, i: usize) -> Nt {
    self.tokens[i].tag
  }

  /// The comma or colon directly after token `i`, if any
  pub fn comma_after(&self, i: usize) -> Option<Punctuation> {
    self.commas.get(i).copied().flatten()
  }

  /// Whether the comma after token `i` forbids constituents ending at `i`
  pub fn prunes_at(&self, i: usize) -> bool {
    self.prune_commas.get(i).copied().unwrap_or(false)
  }

  pub fn raw_len(&self) -> usize {
    self.words.len()
  }

  pub fn raw_word(&self, position: usize) -> &str {
    &self.words[position]
  }

  pub fn raw_tag(&self, position: usize) -> &str {
    &self.tags[position]
  }

  /// Text of token `i` as it appeared in the input
  pub fn token_text(&self, i: usize) -> &str {
    &self.words[self.tokens[i].position]
  }

  /// Raw positions of the punctuation before the first token
  pub fn leading_punctuation(&self) -> Range<usize> {
    0..self.tokens.first().map_or(0, |t| t.position)
  }

  /// Raw positions of the punctuation between token `i` and the next one
  /// (or the end of the sentence)
  pub fn punctuation_after(&self, i: usize) -> Range<usize> {
    let start = self.tokens[i].position + 1;
    let end = self.tokens.get(i + 1).map_or(self.words.len(), |t| t.position);
    start..end
  }

  /// The parser's answer when it finds nothing: every raw word under a flat root
  pub fn render_fallback(&self) -> String {
    flat_fallback(&self.words, &self.tags)
  }
}

fn flat_fallback(words: &[String], tags: &[String]) -> String {
  let mut out = String::from("(TOP ");
  for (w, t) in words.iter().zip(tags.iter()) {
    out.push_str(&format!("{}/{} ", w, t));
  }
  out.push(')');
  out
}

/// Words and tags as they were read, before any grammar lookups
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedWords {
  pub words: Vec<String>,
  pub tags: Vec<String>,
}

impl TaggedWords {
  pub fn into_sentence(self, g: &Grammar) -> Result<Sentence, InputError> {
    Sentence::new(&self.words, &self.tags, g)
  }

  /// Same as `Sentence::render_fallback`, for records that never became one
  pub fn render_fallback(&self) -> String {
    flat_fallback(&self.words, &self.tags)
  }
}

/// Reads whitespace-separated records of the form `n w1 t1 ... wn tn`
pub fn read_sentences(src: &str) -> Result<Vec<TaggedWords>, Err> {
  let mut fields = src.split_whitespace();
  let mut out = Vec::new();

  while let Some(count) = fields.next() {
    let n: usize = count.parse().map_err(|_| -> Err {
      format!("sentence {}: expected a word count, found {}", out.len() + 1, count).into()
    })?;
    let mut words = Vec::with_capacity(n);
    let mut tags = Vec::with_capacity(n);
    for _ in 0..n {
      match (fields.next(), fields.next()) {
        (Some(w), Some(t)) => {
          words.push(w.to_string());
          tags.push(t.to_string());
        }
        _ => {
          return Err(Box::new(InputError::Malformed(format!(
            "sentence {} ends after {} of {} words",
            out.len() + 1,
            words.len(),
            n
          ))))
        }
      }
    }
    out.push(TaggedWords { words, tags });
  }

  Ok(out)
}
