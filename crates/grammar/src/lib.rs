//! Palisade grammar engine.
//!
//! Parses a compact grammar DSL into a canonical, hash-consed syntax
//! forest, then uses that forest to validate argument vectors, drive tab
//! completion, and look up context-sensitive help.
//!
//! # Overview
//!
//! All state lives in a [`Grammar`] context backed by a caller-supplied
//! arena. Grammar files are line-oriented: each non-comment line is one
//! command form, and the whole file folds into a single alternation.
//! Construction normalizes aggressively, so structurally equal grammars
//! are pointer-equal nodes and `a b | a c` is stored as `a (b|c)`.
//!
//! # Example
//!
//! ```ignore
//! use bumpalo::Bump;
//! use grammar::{parse_source, Grammar};
//!
//! let arena = Bump::new();
//! let mut g = Grammar::new(&arena);
//! let root = parse_source(&mut g, "<builtin>", "show version\nquit\n")?
//!     .expect("non-empty grammar");
//!
//! match g.check(root, &["show", "version"]) {
//!     outcome if outcome.is_complete() => run(),
//!     outcome => report(outcome),
//! }
//! ```
//!
//! # Modules
//!
//! - [`node`] - node variants, the total order, spine iterators
//! - [`pool`] - fingerprinted intern table
//! - [`grammar`] - the engine context and normalizing constructors
//! - [`parse`] - the grammar DSL parser
//! - [`datatypes`] - built-in validators (`INTEGER`, `IPV4ADDR`, ...)
//! - [`matcher`] - validation, single-word matching, match-max
//! - [`complete`] - tab completion
//! - [`help`] - the help binder
//! - [`format`] - canonical unparser

pub mod complete;
pub mod datatypes;
pub mod error;
pub mod format;
#[allow(clippy::module_inception)]
pub mod grammar;
pub mod help;
pub mod matcher;
pub mod node;
pub mod parse;
pub mod pool;

pub use complete::{next_words, Candidate};
pub use error::{ErrorKind, FileError, GrammarError};
pub use format::{print_lines, unparse};
pub use grammar::{common_prefix_len, skip_prefix, Grammar};
pub use help::HelpBinder;
pub use matcher::{Outcome, WordMatch};
pub use node::{HelpKind, Node, NodeKind, NodeRef, Validator, Word};
pub use parse::{merge_line, parse_file, parse_line, parse_source};
