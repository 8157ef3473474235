//! Error types for grammar construction and file loading.

use std::fmt;
use std::io;

/// What went wrong while building a grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Ill-formed source byte: control character, unbalanced quote,
    /// invalid character class.
    Lex,
    /// The parser expected one construct and got another: unexpected
    /// `|`/`)`/`]`, unclosed `[`/`(`, empty alternation.
    Structure,
    /// Well-formed but rejected by the algebra: `x++`, misplaced `...`,
    /// bad macro or keyword spelling, unknown modifier suffix.
    Semantic,
    /// A data type re-registered with a different validator.
    Registration,
}

/// A grammar error with the byte offset into the offending source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarError {
    pub kind: ErrorKind,
    pub msg: String,
    pub offset: usize,
}

impl GrammarError {
    pub fn lex(msg: impl Into<String>, offset: usize) -> Self {
        Self {
            kind: ErrorKind::Lex,
            msg: msg.into(),
            offset,
        }
    }

    pub fn structure(msg: impl Into<String>, offset: usize) -> Self {
        Self {
            kind: ErrorKind::Structure,
            msg: msg.into(),
            offset,
        }
    }

    pub fn semantic(msg: impl Into<String>, offset: usize) -> Self {
        Self {
            kind: ErrorKind::Semantic,
            msg: msg.into(),
            offset,
        }
    }

    pub fn registration(msg: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Registration,
            msg: msg.into(),
            offset: 0,
        }
    }

    /// Rebase the error at `offset`. Constructors report offset 0; the
    /// parser pins the real position in the source line.
    pub fn at(mut self, offset: usize) -> Self {
        if self.offset == 0 {
            self.offset = offset;
        }
        self
    }
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg)
    }
}

impl std::error::Error for GrammarError {}

/// A failure while loading a grammar or help file.
#[derive(Debug)]
pub enum FileError {
    Io {
        path: String,
        error: io::Error,
    },
    Parse {
        path: String,
        line_no: u32,
        line: String,
        error: GrammarError,
    },
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileError::Io { path, error } => write!(f, "failed reading {}: {}", path, error),
            FileError::Parse {
                path,
                line_no,
                line,
                error,
            } => {
                writeln!(f, "{}:{}:{}: {}", path, line_no, error.offset + 1, error.msg)?;
                writeln!(f, "  {}", line)?;
                write!(f, "  {}^", " ".repeat(error.offset))
            }
        }
    }
}

impl std::error::Error for FileError {}
