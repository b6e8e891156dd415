use std::error::Error;
use std::fmt;

/// Boxed static error type
pub type Err = Box<dyn Error + 'static>;

/// Problems with a sentence that make it unparseable. These are caught before
/// any chart state is touched, so the parser never runs on a half-converted
/// sentence.
#[derive(Debug, Clone, PartialEq)]
pub enum InputError {
  /// A tag that isn't in the grammar's nonterminal table
  UnknownTag { position: usize, tag: String },
  /// Nothing is left once punctuation is stripped
  Empty,
  /// More words (after punctuation stripping) than the parser allows
  TooLong { len: usize, max: usize },
  /// Words and tags don't pair up, or a sentence record is truncated
  Malformed(String),
}

impl fmt::Display for InputError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::UnknownTag { position, tag } => {
        write!(f, "tag {} at position {} not found in grammar", tag, position)
      }
      Self::Empty => write!(f, "sentence has no words after punctuation removal"),
      Self::TooLong { len, max } => {
        write!(f, "sentence has {} words, the maximum is {}", len, max)
      }
      Self::Malformed(msg) => write!(f, "malformed sentence: {}", msg),
    }
  }
}

impl Error for InputError {}
