//! Recursive-descent parser for the grammar DSL.
//!
//! One line is one grammar expression:
//!
//! ```text
//! word            literal keyword (/i case-insensitive, /t needs-terminal)
//! UPPER           registered data type or macro reference
//! [x]             optional
//! (a|b|c)         alternation
//! x y             concatenation
//! x+  x*          repeat (at least once / any number of times)
//! ...             varargs; must be last, cannot stand alone
//! NAME=body       macro definition
//! # ;             comment to end of line
//! ```
//!
//! Errors carry the byte offset into the source line; `parse_file` renders
//! them as the offending line with a caret underneath.

use common::trace_detail;

use crate::error::{FileError, GrammarError};
use crate::grammar::{is_upper_name, Grammar};
use crate::node::NodeRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ctx {
    Top,
    Alt,
    Opt,
}

struct LineParser<'g, 'a> {
    g: &'g mut Grammar<'a>,
    src: &'g str,
    pos: usize,
}

impl<'g, 'a> LineParser<'g, 'a> {
    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn scan_token(&mut self) -> &'g str {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() || b"()[]|=+*#;".contains(&b) {
                break;
            }
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    fn parse_seq(&mut self, ctx: Ctx) -> Result<Option<NodeRef<'a>>, GrammarError> {
        let mut acc: Option<NodeRef<'a>> = None;
        let mut varargs_at: Option<usize> = None;

        loop {
            self.skip_ws();
            let start = self.pos;
            let Some(c) = self.peek() else { break };

            let node = match c {
                b'#' | b';' => break,

                b'|' if ctx == Ctx::Alt => break,
                b'|' => return Err(GrammarError::structure("unexpected '|'", start)),
                b')' if ctx == Ctx::Alt => break,
                b')' => return Err(GrammarError::structure("unexpected ')'", start)),
                b']' if ctx == Ctx::Opt => break,
                b']' => return Err(GrammarError::structure("unexpected ']'", start)),

                b'[' => {
                    self.pos += 1;
                    let inner = self.parse_seq(Ctx::Opt)?;
                    if self.peek() != Some(b']') {
                        return Err(GrammarError::structure("no matching ']'", start));
                    }
                    self.pos += 1;
                    let Some(inner) = inner else {
                        return Err(GrammarError::structure("empty '[ ]'", start));
                    };
                    self.g.optional(inner).map_err(|e| e.at(start))?
                }

                b'(' => {
                    self.pos += 1;
                    if matches!(self.peek(), Some(b'|') | Some(b')')) {
                        return Err(GrammarError::structure("empty alternation", start));
                    }
                    let Some(mut alt) = self.parse_seq(Ctx::Alt)? else {
                        return Err(GrammarError::structure("empty alternation", start));
                    };
                    while self.peek() == Some(b'|') {
                        let bar = self.pos;
                        self.pos += 1;
                        let Some(next) = self.parse_seq(Ctx::Alt)? else {
                            return Err(GrammarError::structure("empty alternation", bar));
                        };
                        alt = self.g.alternate(alt, next).map_err(|e| e.at(bar))?;
                    }
                    if self.peek() != Some(b')') {
                        return Err(GrammarError::structure("no matching ')'", start));
                    }
                    self.pos += 1;
                    // (foo) means foo
                    alt
                }

                b'+' | b'*' => {
                    return Err(GrammarError::semantic(
                        format!("unexpected '{}'", c as char),
                        start,
                    ))
                }

                _ => {
                    let token = self.scan_token();
                    if token.is_empty() {
                        return Err(GrammarError::lex("invalid character", start));
                    }

                    if self.peek() == Some(b'=') {
                        if ctx != Ctx::Top {
                            return Err(GrammarError::structure(
                                "macro definitions must be at the top level",
                                start,
                            ));
                        }
                        if acc.is_some() {
                            return Err(GrammarError::structure(
                                "macro definitions must start the line",
                                start,
                            ));
                        }
                        if !is_upper_name(token) {
                            return Err(GrammarError::semantic(
                                "macro names must be upper-case",
                                start,
                            ));
                        }
                        self.pos += 1;
                        let Some(body) = self.parse_seq(Ctx::Top)? else {
                            return Err(GrammarError::structure("empty macro body", start));
                        };
                        self.g.define_macro(token, body).map_err(|e| e.at(start))?;
                        continue;
                    }

                    if token == "..." {
                        if ctx != Ctx::Top {
                            return Err(GrammarError::semantic(
                                "'...' is only allowed at the top level",
                                start,
                            ));
                        }
                        self.g.varargs()
                    } else if token.as_bytes()[0].is_ascii_uppercase() {
                        match self.g.lookup_name(token) {
                            Some(node) => node,
                            None => {
                                return Err(GrammarError::semantic(
                                    format!("unknown data type or macro {}", token),
                                    start,
                                ))
                            }
                        }
                    } else {
                        self.g.word(token).map_err(|e| e.at(start))?
                    }
                }
            };

            let node = match self.peek() {
                Some(b'+') => {
                    self.pos += 1;
                    self.g.plus(node, 1).map_err(|e| e.at(start))?
                }
                Some(b'*') => {
                    self.pos += 1;
                    self.g.plus(node, 0).map_err(|e| e.at(start))?
                }
                _ => node,
            };

            if let Some(at) = varargs_at {
                return Err(GrammarError::semantic("'...' must be the last element", at));
            }
            acc = Some(match acc {
                None => node,
                Some(first) => self.g.concat(first, node),
            });
            if node.is_varargs() {
                varargs_at = Some(start);
            }
        }

        Ok(acc)
    }
}

/// Parse one grammar source line. Blank and comment lines yield `None`;
/// so does a line holding only a macro definition.
pub fn parse_line<'a>(
    g: &mut Grammar<'a>,
    line: &str,
) -> Result<Option<NodeRef<'a>>, GrammarError> {
    let mut parser = LineParser { g, src: line, pos: 0 };
    let node = parser.parse_seq(Ctx::Top)?;
    parser.skip_ws();
    if let Some(c) = parser.peek() {
        if c != b'#' && c != b';' {
            return Err(GrammarError::structure(
                format!("unexpected '{}'", c as char),
                parser.pos,
            ));
        }
    }
    if let Some(n) = node {
        if n.is_varargs() {
            return Err(GrammarError::semantic("'...' cannot stand alone", 0));
        }
    }
    trace_detail!(parser.g.trace, "parse_line {:?} -> {}", line, node.is_some());
    Ok(node)
}

/// Parse a line and fold it into an accumulated alternation. A parse
/// error wins over any later merge error, so the reported location always
/// points into the offending line.
pub fn merge_line<'a>(
    g: &mut Grammar<'a>,
    existing: Option<NodeRef<'a>>,
    line: &str,
) -> Result<Option<NodeRef<'a>>, GrammarError> {
    let parsed = parse_line(g, line)?;
    match (existing, parsed) {
        (None, parsed) => Ok(parsed),
        (existing, None) => Ok(existing),
        (Some(a), Some(b)) => Ok(Some(g.alternate(a, b)?)),
    }
}

/// Parse an in-memory grammar source, line by line. `name` labels errors.
pub fn parse_source<'a>(
    g: &mut Grammar<'a>,
    name: &str,
    text: &str,
) -> Result<Option<NodeRef<'a>>, FileError> {
    let mut head = None;
    for (index, line) in text.lines().enumerate() {
        head = merge_line(g, head, line).map_err(|error| FileError::Parse {
            path: name.to_string(),
            line_no: (index + 1) as u32,
            line: line.to_string(),
            error,
        })?;
    }
    Ok(head)
}

/// Read and parse a grammar file.
pub fn parse_file<'a>(g: &mut Grammar<'a>, path: &str) -> Result<Option<NodeRef<'a>>, FileError> {
    let text = std::fs::read_to_string(path).map_err(|error| FileError::Io {
        path: path.to_string(),
        error,
    })?;
    parse_source(g, path, &text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::format::unparse;
    use bumpalo::Bump;

    fn parsed<'a>(g: &mut Grammar<'a>, line: &str) -> NodeRef<'a> {
        parse_line(g, line).unwrap().unwrap()
    }

    #[test]
    fn test_blank_and_comment_lines() {
        let arena = Bump::new();
        let mut g = Grammar::new(&arena);
        assert!(parse_line(&mut g, "").unwrap().is_none());
        assert!(parse_line(&mut g, "   ").unwrap().is_none());
        assert!(parse_line(&mut g, "# note").unwrap().is_none());
        assert!(parse_line(&mut g, "; note").unwrap().is_none());
        assert!(parse_line(&mut g, "quit # note").unwrap().is_some());
    }

    #[test]
    fn test_nested_optional_collapses() {
        let arena = Bump::new();
        let mut g = Grammar::new(&arena);
        let a = parsed(&mut g, "[[x]]");
        let b = parsed(&mut g, "[x]");
        assert!(std::ptr::eq(a, b));
    }

    #[test]
    fn test_parens_around_single_word() {
        let arena = Bump::new();
        let mut g = Grammar::new(&arena);
        let a = parsed(&mut g, "(foo)");
        let b = parsed(&mut g, "foo");
        assert!(std::ptr::eq(a, b));
    }

    #[test]
    fn test_double_plus_is_rejected() {
        let arena = Bump::new();
        let mut g = Grammar::new(&arena);
        assert_eq!(
            parse_line(&mut g, "x++").unwrap_err().kind,
            ErrorKind::Semantic
        );
        assert_eq!(
            parse_line(&mut g, "x+ +").unwrap_err().kind,
            ErrorKind::Semantic
        );
        assert_eq!(
            parse_line(&mut g, "(x+)+").unwrap_err().kind,
            ErrorKind::Semantic
        );
    }

    #[test]
    fn test_varargs_placement() {
        let arena = Bump::new();
        let mut g = Grammar::new(&arena);
        assert!(parse_line(&mut g, "echo ...").is_ok());
        assert_eq!(
            parse_line(&mut g, "...").unwrap_err().kind,
            ErrorKind::Semantic
        );
        assert_eq!(
            parse_line(&mut g, "echo ... more").unwrap_err().kind,
            ErrorKind::Semantic
        );
        assert!(parse_line(&mut g, "[...]").is_err());
        assert!(parse_line(&mut g, "(a|...)").is_err());
        assert!(parse_line(&mut g, "...+").is_err());
    }

    #[test]
    fn test_structure_errors_point_at_offsets() {
        let arena = Bump::new();
        let mut g = Grammar::new(&arena);
        let err = parse_line(&mut g, "show (version").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Structure);
        assert_eq!(err.offset, 5);

        let err = parse_line(&mut g, "a | b").unwrap_err();
        assert_eq!(err.offset, 2);

        let err = parse_line(&mut g, "a ]").unwrap_err();
        assert_eq!(err.offset, 2);

        let err = parse_line(&mut g, "()").unwrap_err();
        assert_eq!(err.offset, 0);
    }

    #[test]
    fn test_keyword_lexical_rules() {
        let arena = Bump::new();
        let mut g = Grammar::new(&arena);
        assert!(parse_line(&mut g, "show2 ipv4-route").is_ok());
        assert_eq!(
            parse_line(&mut g, "Quit").unwrap_err().kind,
            ErrorKind::Semantic
        );
        assert_eq!(
            parse_line(&mut g, "9lives").unwrap_err().kind,
            ErrorKind::Semantic
        );
        assert_eq!(
            parse_line(&mut g, "quit/x").unwrap_err().kind,
            ErrorKind::Semantic
        );
    }

    #[test]
    fn test_modifier_suffixes() {
        let arena = Bump::new();
        let mut g = Grammar::new(&arena);
        let ci = parsed(&mut g, "quit/i");
        let w = ci.as_word().unwrap();
        assert!(w.caseless);
        assert!(!w.needs_terminal);
        assert_eq!(w.text, "quit");

        let nt = parsed(&mut g, "reload/t");
        assert!(nt.as_word().unwrap().needs_terminal);

        // Distinct flags intern distinct words.
        let plain = parsed(&mut g, "quit");
        assert!(!std::ptr::eq(ci, plain));
    }

    #[test]
    fn test_unknown_uppercase_is_rejected() {
        let arena = Bump::new();
        let mut g = Grammar::new(&arena);
        let err = parse_line(&mut g, "set THING").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Semantic);
        assert_eq!(err.offset, 4);
    }

    #[test]
    fn test_datatype_reference() {
        let arena = Bump::new();
        let mut g = Grammar::new(&arena);
        let node = parsed(&mut g, "ping IPV4ADDR");
        assert_eq!(unparse(node), "ping IPV4ADDR");
    }

    #[test]
    fn test_macro_definition_and_expansion() {
        let arena = Bump::new();
        let mut g = Grammar::new(&arena);
        assert!(parse_line(&mut g, "IFACE=(eth0|eth1)").unwrap().is_none());
        let node = parsed(&mut g, "link IFACE up");
        assert_eq!(unparse(node), "link (eth0|eth1) up");
    }

    #[test]
    fn test_macro_name_must_be_uppercase() {
        let arena = Bump::new();
        let mut g = Grammar::new(&arena);
        assert_eq!(
            parse_line(&mut g, "iface=(eth0|eth1)").unwrap_err().kind,
            ErrorKind::Semantic
        );
    }

    #[test]
    fn test_merge_lines_accumulates_alternation() {
        let arena = Bump::new();
        let mut g = Grammar::new(&arena);
        let head = merge_line(&mut g, None, "foo bar").unwrap();
        let head = merge_line(&mut g, head, "# interlude").unwrap();
        let head = merge_line(&mut g, head, "foo baz").unwrap().unwrap();
        assert_eq!(unparse(head), "foo (bar|baz)");
    }

    #[test]
    fn test_parse_source_reports_line_and_caret() {
        let arena = Bump::new();
        let mut g = Grammar::new(&arena);
        let err = parse_source(&mut g, "cmds.txt", "quit\nshow (version\n").unwrap_err();
        let rendered = err.to_string();
        assert!(rendered.starts_with("cmds.txt:2:6:"), "{}", rendered);
        assert!(rendered.ends_with("       ^"), "{}", rendered);
    }
}
