//! Grammar node variants and the strict total order over them.
//!
//! Nodes are immutable, arena-allocated, and hash-consed by the pool, so a
//! `NodeRef` is both a handle and an identity: two structurally equal nodes
//! are always the same reference.

use std::cmp::Ordering;
use std::fmt;

/// A reference to an interned node. Copyable; the owning [`crate::Grammar`]
/// arena keeps it alive.
pub type NodeRef<'a> = &'a Node<'a>;

/// Recognizer callback for a data-type word such as `INTEGER`.
///
/// `parse` returns true when the token is a valid instance of the type;
/// `error` is the message reported when validation fails.
#[derive(Clone, Copy)]
pub struct Validator {
    pub parse: fn(&str) -> bool,
    pub error: &'static str,
}

impl PartialEq for Validator {
    fn eq(&self, other: &Self) -> bool {
        self.parse as usize == other.parse as usize
    }
}

impl Eq for Validator {}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator").field("error", &self.error).finish()
    }
}

/// Tag on a word leaf that stores help text instead of a keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpKind {
    /// An ordinary grammar keyword or data type.
    None,
    /// A long-form help blob.
    Long,
    /// A short-form (summary line) help blob.
    Short,
}

/// A literal token, a named data type (when `validator` is present), or an
/// opaque help blob (when `help` is not [`HelpKind::None`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Word<'a> {
    pub text: &'a str,
    pub validator: Option<Validator>,
    /// `/i` modifier: compare ASCII case-insensitively.
    pub caseless: bool,
    /// `/t` modifier: a successful match requires an interactive terminal.
    pub needs_terminal: bool,
    pub help: HelpKind,
}

impl<'a> Word<'a> {
    /// Match a typed token against this word. With `prefix_ok`, the token
    /// may be any prefix of the stored literal. Validator words always use
    /// the full token.
    pub fn matches(&self, token: &str, prefix_ok: bool) -> bool {
        if let Some(v) = self.validator {
            return (v.parse)(token);
        }
        if self.caseless {
            if self.text.eq_ignore_ascii_case(token) {
                return true;
            }
            prefix_ok
                && self.text.len() >= token.len()
                && self.text[..token.len()].eq_ignore_ascii_case(token)
        } else {
            if self.text == token {
                return true;
            }
            prefix_ok && self.text.starts_with(token)
        }
    }
}

/// The node variants of the syntax DAG. See the crate docs for the normal
/// form each constructor maintains.
#[derive(Debug, Clone, Copy)]
pub enum NodeKind<'a> {
    Word(Word<'a>),
    /// `...`: matches zero or more remaining arguments; always last.
    Varargs,
    /// `[x]`: matches `x` or nothing.
    Optional(NodeRef<'a>),
    /// `x+` (min 1) or `x*` (min 0).
    Plus { child: NodeRef<'a>, min: u8 },
    /// Right-leaning sequence; `first` is never itself a `Concat`.
    /// `len` counts the leaves along the right spine.
    Concat {
        first: NodeRef<'a>,
        rest: NodeRef<'a>,
        len: u32,
    },
    /// Right-leaning ordered alternation; `first` is never an `Alternate`.
    Alternate { first: NodeRef<'a>, rest: NodeRef<'a> },
    /// Named grammar fragment; expands at parse time.
    Macro { name: &'a str, body: NodeRef<'a> },
}

/// An interned grammar node with its content fingerprint.
#[derive(Debug)]
pub struct Node<'a> {
    pub kind: NodeKind<'a>,
    /// 32-bit FNV-1a fingerprint over the variant tag and fields; the
    /// pool's primary key.
    pub fingerprint: u32,
}

impl<'a> Node<'a> {
    pub fn is_varargs(&self) -> bool {
        matches!(self.kind, NodeKind::Varargs)
    }

    pub fn as_word(&self) -> Option<&Word<'a>> {
        match &self.kind {
            NodeKind::Word(w) => Some(w),
            _ => None,
        }
    }

    /// Number of leaves along the right spine: 1 for a non-`Concat`.
    pub fn seq_len(&self) -> u32 {
        match self.kind {
            NodeKind::Concat { len, .. } => len,
            _ => 1,
        }
    }

    /// The first element of a sequence: `first` for a `Concat`, the node
    /// itself otherwise.
    pub fn head(&'a self) -> NodeRef<'a> {
        match self.kind {
            NodeKind::Concat { first, .. } => first,
            _ => self,
        }
    }

    /// Iterate the elements of a `Concat` right spine. A non-`Concat` node
    /// yields just itself.
    pub fn seq(&'a self) -> SeqIter<'a> {
        SeqIter(Some(self))
    }

    /// Iterate the operands of an `Alternate` right spine. A non-`Alternate`
    /// node yields just itself.
    pub fn alternatives(&'a self) -> AltIter<'a> {
        AltIter(Some(self))
    }

    /// Minimum number of tokens this subtree still requires.
    pub fn min_width(&'a self) -> u32 {
        match self.kind {
            NodeKind::Word(_) => 1,
            NodeKind::Varargs | NodeKind::Optional(_) => 0,
            NodeKind::Plus { child, min } => u32::from(min) * child.min_width(),
            NodeKind::Concat { .. } => self.seq().map(|e| e.min_width()).sum(),
            NodeKind::Alternate { .. } => {
                self.alternatives().map(|a| a.min_width()).min().unwrap_or(0)
            }
            NodeKind::Macro { body, .. } => body.min_width(),
        }
    }

    /// The strict total order used to sort alternation operands.
    ///
    /// Varargs sorts first; alternations last; a bare form sorts before the
    /// same form wrapped in `Optional` or `Plus` or extended by `Concat`;
    /// validator words sort before plain words, then bytewise on the
    /// literal. Ties between structurally distinct nodes fall back to
    /// fingerprint identity, which is stable within a process run.
    pub fn order(a: NodeRef<'a>, b: NodeRef<'a>) -> Ordering {
        if std::ptr::eq(a, b) {
            return Ordering::Equal;
        }
        let structural = Self::order_structural(a, b);
        structural.then_with(|| a.fingerprint.cmp(&b.fingerprint)).then_with(|| {
            (a as *const Node<'a> as usize).cmp(&(b as *const Node<'a> as usize))
        })
    }

    fn order_structural(a: NodeRef<'a>, b: NodeRef<'a>) -> Ordering {
        use NodeKind::*;
        if std::ptr::eq(a, b) {
            return Ordering::Equal;
        }
        match (a.kind, b.kind) {
            (Varargs, Varargs) => Ordering::Equal,
            (Varargs, _) => Ordering::Less,
            (_, Varargs) => Ordering::Greater,

            (Alternate { first: af, rest: ar }, Alternate { first: bf, rest: br }) => {
                Self::order_structural(af, bf).then_with(|| Self::order_structural(ar, br))
            }
            (Alternate { .. }, _) => Ordering::Greater,
            (_, Alternate { .. }) => Ordering::Less,

            (Optional(x), Optional(y)) => Self::order_structural(x, y),
            // The bare form sorts before its optional wrapping.
            (Optional(x), _) => match Self::order_structural(x, b) {
                Ordering::Equal => Ordering::Greater,
                o => o,
            },
            (_, Optional(y)) => match Self::order_structural(a, y) {
                Ordering::Equal => Ordering::Less,
                o => o,
            },

            (Concat { first: af, rest: ar, .. }, Concat { first: bf, rest: br, .. }) => {
                Self::order_structural(af, bf).then_with(|| Self::order_structural(ar, br))
            }
            // A lone element sorts before a sequence starting with it.
            (Concat { first, .. }, _) => match Self::order_structural(first, b) {
                Ordering::Equal => Ordering::Greater,
                o => o,
            },
            (_, Concat { first, .. }) => match Self::order_structural(a, first) {
                Ordering::Equal => Ordering::Less,
                o => o,
            },

            (Plus { child: x, .. }, Plus { child: y, .. }) => Self::order_structural(x, y),
            (Plus { child, .. }, _) => match Self::order_structural(child, b) {
                Ordering::Equal => Ordering::Greater,
                o => o,
            },
            (_, Plus { child, .. }) => match Self::order_structural(a, child) {
                Ordering::Equal => Ordering::Less,
                o => o,
            },

            (Word(wa), Word(wb)) => {
                // Validator words sort before plain words.
                let va = wa.validator.is_some();
                let vb = wb.validator.is_some();
                vb.cmp(&va).then_with(|| wa.text.as_bytes().cmp(wb.text.as_bytes()))
            }

            (Macro { name: na, .. }, Macro { name: nb, .. }) => na.cmp(nb),
            (Macro { .. }, _) => Ordering::Greater,
            (_, Macro { .. }) => Ordering::Less,
        }
    }
}

/// Iterator over the elements of a `Concat` right spine.
pub struct SeqIter<'a>(Option<NodeRef<'a>>);

impl<'a> Iterator for SeqIter<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<NodeRef<'a>> {
        let cur = self.0?;
        match cur.kind {
            NodeKind::Concat { first, rest, .. } => {
                self.0 = Some(rest);
                Some(first)
            }
            _ => {
                self.0 = None;
                Some(cur)
            }
        }
    }
}

/// Iterator over the operands of an `Alternate` right spine.
pub struct AltIter<'a>(Option<NodeRef<'a>>);

impl<'a> Iterator for AltIter<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<NodeRef<'a>> {
        let cur = self.0?;
        match cur.kind {
            NodeKind::Alternate { first, rest } => {
                self.0 = Some(rest);
                Some(first)
            }
            _ => {
                self.0 = None;
                Some(cur)
            }
        }
    }
}
