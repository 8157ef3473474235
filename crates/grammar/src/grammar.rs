//! The engine context and the node algebra.
//!
//! A [`Grammar`] owns the node pool, the macro table, and the data-type
//! registry, and provides the normalizing constructors. Every constructor
//! returns an interned reference, so structurally equal results are always
//! the same node, and the normal form invariants hold for every reachable
//! node:
//!
//! - `Concat` and `Alternate` are right-leaning; the left child never has
//!   the same kind as its parent.
//! - `Alternate` operands are sorted in the total order of
//!   [`Node::order`], contain no duplicates, and share no common prefix
//!   (shared prefixes are factored out: `a b | a c` becomes `a (b|c)`).
//! - An empty alternative is represented as `Optional`: `ε | x` becomes
//!   `[x]`, and `Optional(Optional(x))` collapses to `Optional(x)`.
//! - `Varargs` never appears inside `Optional`, `Plus`, or `Alternate`.

use bumpalo::Bump;
use common::{trace_detail, Tracer};
use hashbrown::HashMap;

use crate::datatypes;
use crate::error::GrammarError;
use crate::node::{HelpKind, Node, NodeKind, NodeRef, Validator, Word};
use crate::pool::Pool;

/// True for names reserved for macros and data types: an upper-case
/// letter followed by upper-case letters, digits, or underscores.
pub(crate) fn is_upper_name(s: &str) -> bool {
    let mut bytes = s.bytes();
    match bytes.next() {
        Some(b) if b.is_ascii_uppercase() => {}
        _ => return false,
    }
    bytes.all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_')
}

/// The engine context: node pool, macro table, data-type registry.
///
/// Single-threaded by design; thread one `Grammar` through every call.
/// Dropping it (together with the arena) releases every node at once.
pub struct Grammar<'a> {
    pool: Pool<'a>,
    macros: HashMap<&'a str, NodeRef<'a>>,
    datatypes: HashMap<&'a str, NodeRef<'a>>,
    pub(crate) trace: Tracer,
}

impl<'a> Grammar<'a> {
    /// Create a context with the built-in data types registered.
    pub fn new(arena: &'a Bump) -> Self {
        let mut g = Self {
            pool: Pool::new(arena),
            macros: HashMap::new(),
            datatypes: HashMap::new(),
            trace: Tracer::new("grammar"),
        };
        datatypes::register_builtins(&mut g);
        g
    }

    /// Number of live nodes in the pool.
    pub fn node_count(&self) -> usize {
        self.pool.len()
    }

    // ========================================================================
    // Leaf constructors
    // ========================================================================

    /// Intern a keyword, applying the keyword lexical rules.
    ///
    /// The `/i` (case-insensitive) and `/t` (needs-terminal) suffixes are
    /// stripped and recorded as flags. The remaining text must start with a
    /// lower-case letter and contain only printable ASCII; upper-case names
    /// are reserved for macros and data types and are rejected here.
    pub fn word(&mut self, token: &str) -> Result<NodeRef<'a>, GrammarError> {
        let mut text = token;
        let mut caseless = false;
        let mut needs_terminal = false;
        loop {
            if let Some(rest) = text.strip_suffix("/i") {
                caseless = true;
                text = rest;
            } else if let Some(rest) = text.strip_suffix("/t") {
                needs_terminal = true;
                text = rest;
            } else {
                break;
            }
        }

        if text.is_empty() {
            return Err(GrammarError::lex("empty keyword", 0));
        }
        if let Some(slash) = text.find('/') {
            let suffix = &text[slash..];
            return Err(GrammarError::semantic(
                format!("unknown keyword modifier '{}'", suffix),
                0,
            ));
        }
        if text.bytes().any(|b| !(0x21..=0x7e).contains(&b)) {
            return Err(GrammarError::lex("keyword contains an unprintable byte", 0));
        }
        let first = text.as_bytes()[0];
        if !first.is_ascii_alphabetic() {
            return Err(GrammarError::semantic(
                "keyword must start with a letter",
                0,
            ));
        }
        if text.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(GrammarError::semantic(
                "mixed-case keywords are not allowed",
                0,
            ));
        }

        let text = self.pool.intern_str(text);
        Ok(self.pool.intern(NodeKind::Word(Word {
            text,
            validator: None,
            caseless,
            needs_terminal,
            help: HelpKind::None,
        })))
    }

    /// Intern a word leaf without applying the keyword rules. Used for
    /// typed argv words in match-max reconstruction and for help blobs.
    pub fn force_word(&mut self, text: &str, help: HelpKind) -> NodeRef<'a> {
        let text = self.pool.intern_str(text);
        self.pool.intern(NodeKind::Word(Word {
            text,
            validator: None,
            caseless: false,
            needs_terminal: false,
            help,
        }))
    }

    /// The `...` sentinel.
    pub fn varargs(&mut self) -> NodeRef<'a> {
        self.pool.intern(NodeKind::Varargs)
    }

    // ========================================================================
    // Registries
    // ========================================================================

    /// Register a named data type backed by a validator callback.
    ///
    /// Registering the same name with the same callback is a no-op;
    /// a different callback is a registration error.
    pub fn register_datatype(
        &mut self,
        name: &str,
        validator: Validator,
    ) -> Result<NodeRef<'a>, GrammarError> {
        if !is_upper_name(name) {
            return Err(GrammarError::semantic(
                "data type names must be upper-case",
                0,
            ));
        }
        if let Some(&existing) = self.datatypes.get(name) {
            let same = existing
                .as_word()
                .and_then(|w| w.validator)
                .is_some_and(|v| v == validator);
            if same {
                return Ok(existing);
            }
            return Err(GrammarError::registration(format!(
                "data type {} re-registered with a different validator",
                name
            )));
        }
        let text = self.pool.intern_str(name);
        let node = self.pool.intern(NodeKind::Word(Word {
            text,
            validator: Some(validator),
            caseless: false,
            needs_terminal: false,
            help: HelpKind::None,
        }));
        self.datatypes.insert(text, node);
        Ok(node)
    }

    /// Define a named macro. The body expands wherever the name appears in
    /// later grammar lines.
    pub fn define_macro(
        &mut self,
        name: &str,
        body: NodeRef<'a>,
    ) -> Result<NodeRef<'a>, GrammarError> {
        if !is_upper_name(name) {
            return Err(GrammarError::semantic("macro names must be upper-case", 0));
        }
        if self.datatypes.contains_key(name) {
            return Err(GrammarError::registration(format!(
                "{} is already a registered data type",
                name
            )));
        }
        if let Some(&existing) = self.macros.get(name) {
            match existing.kind {
                NodeKind::Macro { body: old, .. } if std::ptr::eq(old, body) => {
                    return Ok(existing)
                }
                _ => {
                    return Err(GrammarError::semantic(
                        format!("macro {} redefined", name),
                        0,
                    ))
                }
            }
        }
        let name = self.pool.intern_str(name);
        let node = self.pool.intern(NodeKind::Macro { name, body });
        self.macros.insert(name, node);
        Ok(node)
    }

    /// Resolve an upper-case name: a data-type word, or a macro body.
    pub fn lookup_name(&self, name: &str) -> Option<NodeRef<'a>> {
        if let Some(&dt) = self.datatypes.get(name) {
            return Some(dt);
        }
        match self.macros.get(name) {
            Some(&m) => match m.kind {
                NodeKind::Macro { body, .. } => Some(body),
                _ => None,
            },
            None => None,
        }
    }

    // ========================================================================
    // Compound constructors
    // ========================================================================

    /// `[x]`. Collapses `[[x]]` to `[x]`; rejects `...`.
    pub fn optional(&mut self, x: NodeRef<'a>) -> Result<NodeRef<'a>, GrammarError> {
        if x.is_varargs() {
            return Err(GrammarError::semantic("'...' cannot be optional", 0));
        }
        if matches!(x.kind, NodeKind::Optional(_)) {
            return Ok(x);
        }
        Ok(self.pool.intern(NodeKind::Optional(x)))
    }

    /// `x+` (min 1) or `x*` (min 0). Rejects `x++` and `...`.
    pub fn plus(&mut self, x: NodeRef<'a>, min: u8) -> Result<NodeRef<'a>, GrammarError> {
        if x.is_varargs() {
            return Err(GrammarError::semantic("'...' cannot be repeated", 0));
        }
        if matches!(x.kind, NodeKind::Plus { .. }) {
            return Err(GrammarError::semantic("repeat of a repeat", 0));
        }
        Ok(self.plus_node(x, min))
    }

    fn plus_node(&mut self, child: NodeRef<'a>, min: u8) -> NodeRef<'a> {
        self.pool.intern(NodeKind::Plus { child, min })
    }

    /// Sequence `a b`, rewritten right-leaning so the left child of a
    /// `Concat` is never itself a `Concat`.
    pub fn concat(&mut self, a: NodeRef<'a>, b: NodeRef<'a>) -> NodeRef<'a> {
        let elems: Vec<NodeRef<'a>> = a.seq().collect();
        let mut acc = b;
        for &e in elems.iter().rev() {
            acc = self.concat_node(e, acc);
        }
        acc
    }

    fn concat_node(&mut self, first: NodeRef<'a>, rest: NodeRef<'a>) -> NodeRef<'a> {
        let len = 1 + rest.seq_len();
        self.pool.intern(NodeKind::Concat { first, rest, len })
    }

    /// Ordered alternation `a | b`, normalized: duplicates collapse, a
    /// shared prefix factors out, operands sort into the total order, and
    /// an empty side becomes `Optional`.
    pub fn alternate(
        &mut self,
        a: NodeRef<'a>,
        b: NodeRef<'a>,
    ) -> Result<NodeRef<'a>, GrammarError> {
        if std::ptr::eq(a, b) {
            return Ok(a);
        }
        if a.is_varargs() || b.is_varargs() {
            return Err(GrammarError::semantic(
                "'...' cannot appear in an alternation",
                0,
            ));
        }

        // a b | a c  =>  a (b|c)      a | a b  =>  a [b]
        let lcp = common_prefix_len(a, b);
        if lcp > 0 {
            let tail = match (skip_prefix(a, lcp), skip_prefix(b, lcp)) {
                (Some(x), Some(y)) => Some(self.alternate(x, y)?),
                (Some(x), None) | (None, Some(x)) => Some(self.optional(x)?),
                (None, None) => None,
            };
            return Ok(self.concat_prefix(a, lcp, tail));
        }

        let mut alts: Vec<NodeRef<'a>> = a.alternatives().chain(b.alternatives()).collect();
        alts.sort_by(|&x, &y| Node::order(x, y));
        alts.dedup_by(|x, y| std::ptr::eq(*x, *y));
        let alts = self.factor_runs(alts)?;

        let mut acc: Option<NodeRef<'a>> = None;
        for &op in alts.iter().rev() {
            acc = Some(match acc {
                None => op,
                Some(rest) => self.alternate_node(op, rest),
            });
        }
        trace_detail!(self.trace, "alternate -> {} operands", alts.len());
        Ok(acc.unwrap_or(a))
    }

    fn alternate_node(&mut self, first: NodeRef<'a>, rest: NodeRef<'a>) -> NodeRef<'a> {
        self.pool.intern(NodeKind::Alternate { first, rest })
    }

    /// One pass of recursive prefix factoring over a sorted operand array:
    /// adjacent operands sharing their first element are merged into
    /// `first (suffixes...)`, recursing on the stripped suffixes.
    fn factor_runs(
        &mut self,
        alts: Vec<NodeRef<'a>>,
    ) -> Result<Vec<NodeRef<'a>>, GrammarError> {
        let mut out = Vec::with_capacity(alts.len());
        let mut i = 0;
        while i < alts.len() {
            let head = alts[i].head();
            let mut j = i + 1;
            while j < alts.len() && std::ptr::eq(alts[j].head(), head) {
                j += 1;
            }
            if j - i < 2 {
                out.push(alts[i]);
                i += 1;
                continue;
            }

            let mut tail: Option<NodeRef<'a>> = None;
            let mut saw_empty = false;
            for &alt in &alts[i..j] {
                match skip_prefix(alt, 1) {
                    None => saw_empty = true,
                    Some(t) => {
                        tail = Some(match tail {
                            None => t,
                            Some(acc) => self.alternate(acc, t)?,
                        });
                    }
                }
            }
            let entry = match tail {
                Some(t) => {
                    let t = if saw_empty { self.optional(t)? } else { t };
                    self.concat(head, t)
                }
                None => head,
            };
            out.push(entry);
            i = j;
        }
        Ok(out)
    }

    /// Prepend the first `n` leaves of `src` onto `tail`.
    fn concat_prefix(
        &mut self,
        src: NodeRef<'a>,
        n: u32,
        tail: Option<NodeRef<'a>>,
    ) -> NodeRef<'a> {
        let prefix: Vec<NodeRef<'a>> = src.seq().take(n as usize).collect();
        let mut acc = tail;
        for &e in prefix.iter().rev() {
            acc = Some(match acc {
                None => e,
                Some(t) => self.concat(e, t),
            });
        }
        acc.unwrap_or(src)
    }
}

/// Number of leading leaves shared by `a` and `b` along their `Concat`
/// right spines. Identical nodes share their full length.
pub fn common_prefix_len<'a>(a: NodeRef<'a>, b: NodeRef<'a>) -> u32 {
    if std::ptr::eq(a, b) {
        return a.seq_len();
    }
    match (a.kind, b.kind) {
        (
            NodeKind::Concat { first: af, rest: ar, .. },
            NodeKind::Concat { first: bf, rest: br, .. },
        ) => {
            if std::ptr::eq(af, bf) {
                1 + common_prefix_len(ar, br)
            } else {
                0
            }
        }
        (NodeKind::Concat { first, .. }, _) => u32::from(std::ptr::eq(first, b)),
        (_, NodeKind::Concat { first, .. }) => u32::from(std::ptr::eq(a, first)),
        _ => 0,
    }
}

/// Skip the first `n` leaves of `a`; `None` is the empty suffix.
pub fn skip_prefix<'a>(mut a: NodeRef<'a>, mut n: u32) -> Option<NodeRef<'a>> {
    loop {
        if n == 0 {
            return Some(a);
        }
        match a.kind {
            NodeKind::Concat { rest, .. } => {
                a = rest;
                n -= 1;
            }
            _ => return None,
        }
    }
}
