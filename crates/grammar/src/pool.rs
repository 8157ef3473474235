//! The node pool: content-addressed storage of grammar nodes.
//!
//! Every node is keyed by a 32-bit FNV-1a fingerprint over its variant tag
//! and fields. The pool guarantees that at most one node exists for any
//! structural content: a fingerprint hit is always confirmed by a full
//! structural comparison, so fingerprint collisions cannot alias distinct
//! nodes. Because children are interned before their parents, child
//! identity can be compared by pointer.

use bumpalo::Bump;
use common::StringInterner;
use hashbrown::HashMap;

use crate::node::{Node, NodeKind, NodeRef};

const FNV_INIT: u32 = 0x811c9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

struct Fnv(u32);

impl Fnv {
    fn new() -> Self {
        Fnv(FNV_INIT)
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= u32::from(b);
            self.0 = self.0.wrapping_mul(FNV_PRIME);
        }
    }

    fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    fn finish(self) -> u32 {
        self.0
    }
}

/// Compute the content fingerprint of a node-to-be.
pub fn fingerprint(kind: &NodeKind<'_>) -> u32 {
    let mut h = Fnv::new();
    match kind {
        NodeKind::Word(w) => {
            h.write(&[1]);
            h.write(w.text.as_bytes());
            h.write(&[w.caseless as u8, w.needs_terminal as u8, w.help as u8]);
        }
        NodeKind::Varargs => h.write(&[2]),
        NodeKind::Optional(x) => {
            h.write(&[3]);
            h.write_u32(x.fingerprint);
        }
        NodeKind::Plus { child, min } => {
            h.write(&[4]);
            h.write_u32(child.fingerprint);
            h.write(&[*min]);
        }
        NodeKind::Concat { first, rest, .. } => {
            h.write(&[5]);
            h.write_u32(first.fingerprint);
            h.write_u32(rest.fingerprint);
        }
        NodeKind::Alternate { first, rest } => {
            h.write(&[6]);
            h.write_u32(first.fingerprint);
            h.write_u32(rest.fingerprint);
        }
        NodeKind::Macro { name, body } => {
            h.write(&[7]);
            h.write(name.as_bytes());
            h.write_u32(body.fingerprint);
        }
    }
    h.finish()
}

fn structural_eq<'a>(a: &NodeKind<'a>, b: &NodeKind<'a>) -> bool {
    match (a, b) {
        (NodeKind::Word(wa), NodeKind::Word(wb)) => wa == wb,
        (NodeKind::Varargs, NodeKind::Varargs) => true,
        (NodeKind::Optional(x), NodeKind::Optional(y)) => std::ptr::eq(*x, *y),
        (
            NodeKind::Plus { child: x, min: mx },
            NodeKind::Plus { child: y, min: my },
        ) => std::ptr::eq(*x, *y) && mx == my,
        (
            NodeKind::Concat { first: af, rest: ar, .. },
            NodeKind::Concat { first: bf, rest: br, .. },
        ) => std::ptr::eq(*af, *bf) && std::ptr::eq(*ar, *br),
        (
            NodeKind::Alternate { first: af, rest: ar },
            NodeKind::Alternate { first: bf, rest: br },
        ) => std::ptr::eq(*af, *bf) && std::ptr::eq(*ar, *br),
        (
            NodeKind::Macro { name: na, body: ba },
            NodeKind::Macro { name: nb, body: bb },
        ) => na == nb && std::ptr::eq(*ba, *bb),
        _ => false,
    }
}

/// The intern table. Nodes live in the arena; the pool only indexes them.
pub struct Pool<'a> {
    arena: &'a Bump,
    strings: StringInterner<'a>,
    buckets: HashMap<u32, Vec<NodeRef<'a>>>,
    nodes: usize,
}

impl<'a> Pool<'a> {
    pub fn new(arena: &'a Bump) -> Self {
        Self {
            arena,
            strings: StringInterner::new(arena),
            buckets: HashMap::new(),
            nodes: 0,
        }
    }

    /// Intern a string payload (keyword text, help blob, macro name).
    pub fn intern_str(&mut self, s: &str) -> &'a str {
        self.strings.intern(s)
    }

    /// Return the unique node for `kind`, allocating it on first sight.
    pub fn intern(&mut self, kind: NodeKind<'a>) -> NodeRef<'a> {
        if let NodeKind::Concat { first, .. } = kind {
            debug_assert!(!matches!(first.kind, NodeKind::Concat { .. }));
        }
        if let NodeKind::Alternate { first, .. } = kind {
            debug_assert!(!matches!(first.kind, NodeKind::Alternate { .. }));
        }

        let fp = fingerprint(&kind);
        let bucket = self.buckets.entry(fp).or_default();
        if let Some(&found) = bucket.iter().find(|n| structural_eq(&n.kind, &kind)) {
            return found;
        }
        let node: NodeRef<'a> = self.arena.alloc(Node {
            kind,
            fingerprint: fp,
        });
        bucket.push(node);
        self.nodes += 1;
        node
    }

    /// Bare lookup without allocation.
    pub fn lookup(&self, kind: &NodeKind<'a>) -> Option<NodeRef<'a>> {
        let fp = fingerprint(kind);
        self.buckets
            .get(&fp)?
            .iter()
            .copied()
            .find(|n| structural_eq(&n.kind, kind))
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{HelpKind, Word};

    fn plain(text: &str) -> NodeKind<'_> {
        NodeKind::Word(Word {
            text,
            validator: None,
            caseless: false,
            needs_terminal: false,
            help: HelpKind::None,
        })
    }

    #[test]
    fn test_intern_returns_same_node() {
        let arena = Bump::new();
        let mut pool = Pool::new(&arena);
        let t = pool.intern_str("show");
        let a = pool.intern(plain(t));
        let b = pool.intern(plain(t));
        assert!(std::ptr::eq(a, b));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_distinct_flags_intern_distinct_nodes() {
        let arena = Bump::new();
        let mut pool = Pool::new(&arena);
        let t = pool.intern_str("quit");
        let plain_quit = pool.intern(plain(t));
        let ci_quit = pool.intern(NodeKind::Word(Word {
            text: t,
            validator: None,
            caseless: true,
            needs_terminal: false,
            help: HelpKind::None,
        }));
        assert!(!std::ptr::eq(plain_quit, ci_quit));
        assert_ne!(plain_quit.fingerprint, ci_quit.fingerprint);
    }

    #[test]
    fn test_lookup_without_allocation() {
        let arena = Bump::new();
        let mut pool = Pool::new(&arena);
        let t = pool.intern_str("show");
        assert!(pool.lookup(&plain(t)).is_none());
        let a = pool.intern(plain(t));
        assert!(std::ptr::eq(pool.lookup(&plain(t)).unwrap(), a));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_compound_nodes_share_children() {
        let arena = Bump::new();
        let mut pool = Pool::new(&arena);
        let t = pool.intern_str("a");
        let a = pool.intern(plain(t));
        let opt1 = pool.intern(NodeKind::Optional(a));
        let opt2 = pool.intern(NodeKind::Optional(a));
        assert!(std::ptr::eq(opt1, opt2));
        assert_eq!(pool.len(), 2);
    }
}
