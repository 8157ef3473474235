//! Tab completion: enumerate the words that could legally come next.

use common::{split_args, trace_detail};

use crate::grammar::Grammar;
use crate::node::{HelpKind, NodeKind, NodeRef};

/// A word that can appear at the current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate<'a> {
    pub text: &'a str,
    /// True for a plain keyword the user can actually type. Data-type
    /// names (`INTEGER`, ...) and the `...` sentinel are hints, shown in
    /// help listings but suppressed from completion.
    pub literal: bool,
}

fn push_unique<'a>(out: &mut Vec<Candidate<'a>>, cand: Candidate<'a>) {
    if !out.iter().any(|c| c.text == cand.text) {
        out.push(cand);
    }
}

/// `conts` is the continuation stack: the grammars that follow `node`,
/// innermost first. An `Optional` (or a `min = 0` repeat) in first
/// position contributes both its own words and the words after it.
fn walk<'a>(node: NodeRef<'a>, conts: &[NodeRef<'a>], out: &mut Vec<Candidate<'a>>) {
    match node.kind {
        NodeKind::Word(w) => {
            if w.help == HelpKind::None {
                push_unique(
                    out,
                    Candidate {
                        text: w.text,
                        literal: w.validator.is_none(),
                    },
                );
            }
        }

        NodeKind::Varargs => push_unique(
            out,
            Candidate {
                text: "...",
                literal: false,
            },
        ),

        NodeKind::Optional(x) => {
            walk(x, conts, out);
            if let Some((&next, rest)) = conts.split_first() {
                walk(next, rest, out);
            }
        }

        NodeKind::Plus { child, min } => {
            walk(child, conts, out);
            if min == 0 {
                if let Some((&next, rest)) = conts.split_first() {
                    walk(next, rest, out);
                }
            }
        }

        NodeKind::Concat { first, rest, .. } => {
            let mut inner = Vec::with_capacity(conts.len() + 1);
            inner.push(rest);
            inner.extend_from_slice(conts);
            walk(first, &inner, out);
        }

        NodeKind::Alternate { .. } => {
            for op in node.alternatives() {
                walk(op, conts, out);
            }
        }

        NodeKind::Macro { body, .. } => walk(body, conts, out),
    }
}

/// All first-position words of `node`, in canonical order.
pub fn next_words<'a>(node: NodeRef<'a>) -> Vec<Candidate<'a>> {
    let mut out = Vec::new();
    walk(node, &[], &mut out);
    out
}

impl<'a> Grammar<'a> {
    /// Complete the raw input buffer against the grammar.
    ///
    /// All words but the last must match exactly; the last word is tried
    /// exactly and then as a prefix. Each candidate is the full rewritten
    /// line with a trailing space. At most `max` candidates are returned.
    pub fn tab_complete(&mut self, root: NodeRef<'a>, input: &str, max: usize) -> Vec<String> {
        let Ok(argv) = split_args(input) else {
            return Vec::new();
        };
        let Some((&last, middle)) = argv.split_last() else {
            return Vec::new();
        };

        let mut current = Some(root);
        for &word in middle {
            let Some(cur) = current else {
                return Vec::new();
            };
            let Some(found) = self.match_word(word, false, cur, None) else {
                return Vec::new();
            };
            current = found.rest;
        }
        let Some(cur) = current else {
            return Vec::new();
        };

        // Exact: the last word is already complete; offer what follows.
        if let Some(found) = self.match_word(last, false, cur, None) {
            let Some(residual) = found.rest else {
                return Vec::new();
            };
            let mut prefix = String::new();
            for &word in &argv {
                prefix.push_str(word);
                prefix.push(' ');
            }
            let mut tabs = Vec::new();
            for cand in next_words(residual) {
                if !cand.literal {
                    continue;
                }
                tabs.push(format!("{}{} ", prefix, cand.text));
                if tabs.len() == max {
                    break;
                }
            }
            trace_detail!(self.trace, "complete {:?} -> {} candidates", input, tabs.len());
            return tabs;
        }

        // Prefix: rewrite the last word to the full literal.
        if let Some(found) = self.match_word(last, true, cur, None) {
            if let Some(w) = found.matched.as_word() {
                if w.validator.is_none() && w.help == HelpKind::None && max > 0 {
                    let mut line = String::new();
                    for &word in middle {
                        line.push_str(word);
                        line.push(' ');
                    }
                    line.push_str(w.text);
                    line.push(' ');
                    return vec![line];
                }
            }
        }

        Vec::new()
    }
}
