//! Matching argument vectors against a grammar.
//!
//! One walking algorithm serves three clients: full validation
//! ([`Grammar::check`]), single-word consumption ([`Grammar::match_word`],
//! the primitive behind tab completion), and longest-matching-prefix
//! reconstruction ([`Grammar::match_max`], the primitive behind help
//! lookup).
//!
//! Alternatives are tried left-to-right over the canonical tree and the
//! first match wins. A failed match inside `Optional` counts as matching
//! zero words. `Plus` consumes greedily, one child match at a time, and a
//! zero-word consumption terminates the loop. `Varargs` eats every
//! remaining word. Failures record the deepest argument index reached so
//! the final error points at the furthest failure, not the last tried.

use common::trace_detail;

use crate::grammar::Grammar;
use crate::node::{HelpKind, NodeKind, NodeRef};

/// Result of checking an argument vector against a grammar.
///
/// [`Outcome::code`] recovers the signed-integer convention: `argc` for a
/// full command, more than `argc` when input ran out, the index of the
/// first unexpected token when the grammar ran out, and `-(index + 1)` for
/// a mismatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Every argument consumed and the grammar is satisfied.
    Complete {
        /// True when the matched path touched a `/t` word.
        needs_terminal: bool,
    },
    /// All input consumed but the grammar requires more; `missing` is a
    /// non-binding hint of how many more tokens.
    WantMore { missing: usize },
    /// The grammar was exhausted with input left over; `argv[index]` is
    /// the first unexpected token.
    Extra { index: usize },
    /// Syntax mismatch at `argv[index]`.
    Mismatch {
        index: usize,
        word: String,
        /// The validator's own message when the failing node is a
        /// data-type word.
        message: Option<&'static str>,
    },
}

impl Outcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, Outcome::Complete { .. })
    }

    /// The signed-integer code for an `argc`-word input.
    pub fn code(&self, argc: usize) -> isize {
        match self {
            Outcome::Complete { .. } => argc as isize,
            Outcome::WantMore { missing } => (argc + missing) as isize,
            Outcome::Extra { index } => *index as isize,
            Outcome::Mismatch { index, .. } => -((index + 1) as isize),
        }
    }
}

/// One step of the walk.
#[derive(Debug, Clone, Copy)]
enum Step {
    /// Matched; `pos` is the next unconsumed argument.
    Ok { pos: usize, needs_terminal: bool },
    /// Input exhausted with the grammar still requiring `missing` tokens.
    More { missing: u32 },
    Fail,
}

struct Walk<'s, 'a> {
    args: &'s [&'s str],
    /// Deepest failure: argument index and the node that rejected it.
    fail: Option<(usize, NodeRef<'a>)>,
}

impl<'s, 'a> Walk<'s, 'a> {
    fn record_fail(&mut self, pos: usize, node: NodeRef<'a>) {
        if self.fail.map_or(true, |(deep, _)| pos > deep) {
            self.fail = Some((pos, node));
        }
    }

    fn eat(&mut self, node: NodeRef<'a>, pos: usize) -> Step {
        match node.kind {
            NodeKind::Word(w) => {
                if pos == self.args.len() {
                    return Step::More { missing: 1 };
                }
                if w.matches(self.args[pos], false) {
                    Step::Ok {
                        pos: pos + 1,
                        needs_terminal: w.needs_terminal,
                    }
                } else {
                    self.record_fail(pos, node);
                    Step::Fail
                }
            }

            NodeKind::Varargs => Step::Ok {
                pos: self.args.len(),
                needs_terminal: false,
            },

            NodeKind::Optional(x) => {
                if pos == self.args.len() {
                    return Step::Ok {
                        pos,
                        needs_terminal: false,
                    };
                }
                match self.eat(x, pos) {
                    Step::Fail => Step::Ok {
                        pos,
                        needs_terminal: false,
                    },
                    step => step,
                }
            }

            NodeKind::Plus { child, min } => {
                let mut pos = pos;
                let mut count = 0u32;
                let mut needs_terminal = false;
                loop {
                    if pos == self.args.len() {
                        break;
                    }
                    match self.eat(child, pos) {
                        Step::Ok { pos: next, needs_terminal: nt } => {
                            if next == pos {
                                // zero-word consumption terminates the loop
                                break;
                            }
                            pos = next;
                            needs_terminal |= nt;
                            count += 1;
                        }
                        step @ Step::More { .. } => return step,
                        Step::Fail => break,
                    }
                }
                if count >= u32::from(min) {
                    Step::Ok {
                        pos,
                        needs_terminal,
                    }
                } else if pos == self.args.len() {
                    Step::More {
                        missing: child.min_width().max(1),
                    }
                } else {
                    Step::Fail
                }
            }

            NodeKind::Concat { .. } => {
                let mut pos = pos;
                let mut needs_terminal = false;
                let mut elems = node.seq();
                while let Some(elem) = elems.next() {
                    match self.eat(elem, pos) {
                        Step::Ok { pos: next, needs_terminal: nt } => {
                            pos = next;
                            needs_terminal |= nt;
                        }
                        Step::More { missing } => {
                            let rest: u32 = (&mut elems).map(|e| e.min_width()).sum();
                            return Step::More {
                                missing: missing + rest,
                            };
                        }
                        Step::Fail => return Step::Fail,
                    }
                }
                Step::Ok {
                    pos,
                    needs_terminal,
                }
            }

            NodeKind::Alternate { .. } => {
                for op in node.alternatives() {
                    match self.eat(op, pos) {
                        Step::Fail => continue,
                        step => return step,
                    }
                }
                Step::Fail
            }

            NodeKind::Macro { body, .. } => self.eat(body, pos),
        }
    }
}

/// What remains after consuming one word from a subtree.
#[derive(Debug, Clone, Copy)]
pub struct WordMatch<'a> {
    /// The grammar leaf the word matched (the full literal, for prefix
    /// completion).
    pub matched: NodeRef<'a>,
    /// The residual grammar; `None` when nothing remains.
    pub rest: Option<NodeRef<'a>>,
}

impl<'a> Grammar<'a> {
    /// Validate `argv` against the grammar.
    ///
    /// Empty input returns `Complete` without touching any state: there is
    /// nothing to do.
    pub fn check(&self, root: NodeRef<'a>, argv: &[&str]) -> Outcome {
        if argv.is_empty() {
            return Outcome::Complete {
                needs_terminal: false,
            };
        }
        let mut walk = Walk {
            args: argv,
            fail: None,
        };
        let outcome = match walk.eat(root, 0) {
            Step::Ok { pos, needs_terminal } if pos == argv.len() => {
                Outcome::Complete { needs_terminal }
            }
            Step::Ok { pos, .. } => Outcome::Extra { index: pos },
            Step::More { missing } => Outcome::WantMore {
                missing: missing.max(1) as usize,
            },
            Step::Fail => {
                let (index, node) = walk.fail.unwrap_or((0, root));
                Outcome::Mismatch {
                    index,
                    word: argv.get(index).copied().unwrap_or_default().to_string(),
                    message: node.as_word().and_then(|w| w.validator).map(|v| v.error),
                }
            }
        };
        trace_detail!(self.trace, "check {:?} -> {:?}", argv, outcome);
        outcome
    }

    /// Consume one word from `node`, returning the matched leaf and the
    /// residual grammar. `tail` is the grammar that follows `node`;
    /// `prefix_ok` switches from exact to prefix comparison.
    pub fn match_word(
        &mut self,
        token: &str,
        prefix_ok: bool,
        node: NodeRef<'a>,
        tail: Option<NodeRef<'a>>,
    ) -> Option<WordMatch<'a>> {
        match node.kind {
            NodeKind::Word(w) => {
                if w.matches(token, prefix_ok) {
                    Some(WordMatch {
                        matched: node,
                        rest: tail,
                    })
                } else {
                    None
                }
            }

            // Varargs keeps matching whatever remains.
            NodeKind::Varargs => Some(WordMatch {
                matched: node,
                rest: Some(node),
            }),

            NodeKind::Optional(x) => {
                if let Some(found) = self.match_word(token, prefix_ok, x, tail) {
                    return Some(found);
                }
                let next = tail?;
                self.match_word(token, prefix_ok, next, None)
            }

            NodeKind::Concat { first, rest, .. } => {
                let followed = match tail {
                    Some(t) => self.concat(rest, t),
                    None => rest,
                };
                self.match_word(token, prefix_ok, first, Some(followed))
            }

            NodeKind::Alternate { .. } => {
                for op in node.alternatives() {
                    if let Some(found) = self.match_word(token, prefix_ok, op, tail) {
                        return Some(found);
                    }
                }
                None
            }

            NodeKind::Plus { child, .. } => {
                // One repetition consumed; the rest may repeat freely.
                let star = self.star_of(child);
                let followed = match tail {
                    Some(t) => self.concat(star, t),
                    None => star,
                };
                self.match_word(token, prefix_ok, child, Some(followed))
            }

            NodeKind::Macro { body, .. } => self.match_word(token, prefix_ok, body, tail),
        }
    }

    fn star_of(&mut self, child: NodeRef<'a>) -> NodeRef<'a> {
        // Children of Plus are never Plus or Varargs, so this cannot fail.
        self.plus(child, 0).unwrap_or(child)
    }

    /// Consume as many of `argv` as match exactly, and return
    /// `concat(argv[0], … concat(argv[k-1], residual))` with the consumed
    /// words stored as forced leaves. `None` when not even the first word
    /// matches.
    pub fn match_max(&mut self, head: NodeRef<'a>, argv: &[&str]) -> Option<NodeRef<'a>> {
        if argv.is_empty() {
            return Some(head);
        }
        let mut current = Some(head);
        let mut matched = 0usize;
        while matched < argv.len() {
            let Some(cur) = current else { break };
            match self.match_word(argv[matched], false, cur, None) {
                Some(found) => {
                    current = found.rest;
                    matched += 1;
                }
                None => break,
            }
        }
        if matched == 0 {
            return None;
        }
        let mut acc = current;
        for &word in argv[..matched].iter().rev() {
            let leaf = self.force_word(word, HelpKind::None);
            acc = Some(match acc {
                Some(t) => self.concat(leaf, t),
                None => leaf,
            });
        }
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::unparse;
    use crate::parse::parse_line;
    use bumpalo::Bump;

    fn grammar_of<'a>(arena: &'a Bump, line: &str) -> (Grammar<'a>, NodeRef<'a>) {
        let mut g = Grammar::new(arena);
        let node = parse_line(&mut g, line).unwrap().unwrap();
        (g, node)
    }

    #[test]
    fn test_check_full_command() {
        let arena = Bump::new();
        let (g, root) = grammar_of(&arena, "show version");
        let out = g.check(root, &["show", "version"]);
        assert!(out.is_complete());
        assert_eq!(out.code(2), 2);
    }

    #[test]
    fn test_check_want_more() {
        let arena = Bump::new();
        let (g, root) = grammar_of(&arena, "show version");
        let out = g.check(root, &["show"]);
        assert_eq!(out, Outcome::WantMore { missing: 1 });
        assert!(out.code(1) > 1);
    }

    #[test]
    fn test_check_extra_input() {
        let arena = Bump::new();
        let (g, root) = grammar_of(&arena, "quit");
        let out = g.check(root, &["quit", "now"]);
        assert_eq!(out, Outcome::Extra { index: 1 });
        assert_eq!(out.code(2), 1);
    }

    #[test]
    fn test_check_mismatch_indexes_first_bad_word() {
        let arena = Bump::new();
        let (g, root) = grammar_of(&arena, "show (version|status)");
        let out = g.check(root, &["show", "uptime"]);
        assert_eq!(
            out,
            Outcome::Mismatch {
                index: 1,
                word: "uptime".to_string(),
                message: None,
            }
        );
        assert_eq!(out.code(2), -2);
    }

    #[test]
    fn test_check_validator_message() {
        let arena = Bump::new();
        let (g, root) = grammar_of(&arena, "ping IPV4ADDR");
        assert_eq!(g.check(root, &["ping", "10.0.0.1"]).code(2), 2);

        let out = g.check(root, &["ping", "10.0.0.300"]);
        assert_eq!(
            out,
            Outcome::Mismatch {
                index: 1,
                word: "10.0.0.300".to_string(),
                message: Some("Invalid syntax for IP address"),
            }
        );
        assert_eq!(out.code(2), -2);
    }

    #[test]
    fn test_check_empty_input_is_a_no_op() {
        let arena = Bump::new();
        let (g, root) = grammar_of(&arena, "show version");
        let out = g.check(root, &[]);
        assert_eq!(out.code(0), 0);
        assert_eq!(g.check(root, &[]), out);
    }

    #[test]
    fn test_check_case_insensitive_keyword() {
        let arena = Bump::new();
        let (g, root) = grammar_of(&arena, "quit/i");
        assert_eq!(
            g.check(root, &["QUIT"]),
            Outcome::Complete {
                needs_terminal: false
            }
        );
        assert_eq!(
            g.check(root, &["Quit"]),
            Outcome::Complete {
                needs_terminal: false
            }
        );
    }

    #[test]
    fn test_check_needs_terminal_flag() {
        let arena = Bump::new();
        let (g, root) = grammar_of(&arena, "reload/t");
        assert_eq!(
            g.check(root, &["reload"]),
            Outcome::Complete {
                needs_terminal: true
            }
        );
    }

    #[test]
    fn test_check_varargs_tail() {
        let arena = Bump::new();
        let (g, root) = grammar_of(&arena, "echo ...");
        assert_eq!(g.check(root, &["echo", "one", "two", "three"]).code(4), 4);
        assert_eq!(g.check(root, &["echo"]).code(1), 1);
    }

    #[test]
    fn test_check_optional_tail() {
        let arena = Bump::new();
        let (g, root) = grammar_of(&arena, "log [level]");
        assert!(g.check(root, &["log"]).is_complete());
        assert!(g.check(root, &["log", "level"]).is_complete());
        assert_eq!(g.check(root, &["log", "trace"]), Outcome::Extra { index: 1 });
    }

    #[test]
    fn test_check_plus_greedy() {
        let arena = Bump::new();
        let (g, root) = grammar_of(&arena, "add INTEGER+");
        assert!(g.check(root, &["add", "1"]).is_complete());
        assert!(g.check(root, &["add", "1", "2", "3"]).is_complete());
        assert_eq!(g.check(root, &["add"]), Outcome::WantMore { missing: 1 });
        assert_eq!(g.check(root, &["add", "x"]).code(2), -2);
    }

    #[test]
    fn test_check_star_allows_zero() {
        let arena = Bump::new();
        let (g, root) = grammar_of(&arena, "list name*");
        assert!(g.check(root, &["list"]).is_complete());
        assert!(g.check(root, &["list", "name", "name"]).is_complete());
    }

    #[test]
    fn test_check_alternation_is_first_match_wins() {
        let arena = Bump::new();
        let (g, root) = grammar_of(&arena, "set (a|b) done");
        assert!(g.check(root, &["set", "a", "done"]).is_complete());
        assert!(g.check(root, &["set", "b", "done"]).is_complete());
        assert_eq!(g.check(root, &["set", "c", "done"]).code(3), -2);
    }

    #[test]
    fn test_deepest_failure_wins() {
        let arena = Bump::new();
        let mut g = Grammar::new(&arena);
        let a = parse_line(&mut g, "net add INTEGER").unwrap().unwrap();
        let root = crate::parse::merge_line(&mut g, Some(a), "net del INTEGER").unwrap().unwrap();
        // Both branches pass "net"; the failure is at index 2, not index 1.
        let out = g.check(root, &["net", "add", "oops"]);
        assert_eq!(
            out,
            Outcome::Mismatch {
                index: 2,
                word: "oops".to_string(),
                message: Some("Invalid integer"),
            }
        );
    }

    #[test]
    fn test_match_word_returns_residual() {
        let arena = Bump::new();
        let (mut g, root) = grammar_of(&arena, "show (version|status)");
        let m = g.match_word("show", false, root, None).unwrap();
        assert_eq!(m.matched.as_word().unwrap().text, "show");
        assert_eq!(unparse(m.rest.unwrap()), "(status|version)");
    }

    #[test]
    fn test_match_word_prefix_sense() {
        let arena = Bump::new();
        let (mut g, root) = grammar_of(&arena, "show version");
        assert!(g.match_word("sh", false, root, None).is_none());
        let m = g.match_word("sh", true, root, None).unwrap();
        assert_eq!(m.matched.as_word().unwrap().text, "show");
    }

    #[test]
    fn test_match_max_reconstructs_typed_prefix() {
        let arena = Bump::new();
        let (mut g, root) = grammar_of(&arena, "show (version|status)");
        let tree = g.match_max(root, &["show", "version"]).unwrap();
        assert_eq!(unparse(tree), "show version");
        let partial = g.match_max(root, &["show", "nope"]).unwrap();
        assert_eq!(unparse(partial), "show (status|version)");
        assert!(g.match_max(root, &["nope"]).is_none());
    }

    #[test]
    fn test_match_max_keeps_typed_case() {
        let arena = Bump::new();
        let (mut g, root) = grammar_of(&arena, "quit/i now");
        // The typed word is stored as a forced leaf, not the grammar's.
        let tree = g.match_max(root, &["QUIT"]).unwrap();
        assert_eq!(unparse(tree), "QUIT now");
    }
}
