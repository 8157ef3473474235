//! The help binder: context-sensitive help bound to command paths.
//!
//! A help source file alternates between heading lines (one or more `#`)
//! and prose. Each heading is a plain command path; lines starting with
//! exactly four spaces under it form the short help (the `?` summary),
//! and all other prose up to the next heading is the long help.
//!
//! Internally the binder keeps two parallel grammar forests whose terminal
//! leaves are forced word nodes holding the help text, tagged long or
//! short. Lookup consumes the query path with match-max and scans the
//! residual alternation for a leaf of the wanted kind.

use std::fmt;

use crate::complete::next_words;
use crate::error::{FileError, GrammarError};
use crate::grammar::{skip_prefix, Grammar};
use crate::matcher::Outcome;
use crate::node::{HelpKind, NodeKind, NodeRef};
use crate::parse::parse_line;

/// Parallel long-form and short-form help forests.
#[derive(Default)]
pub struct HelpBinder<'a> {
    long: Option<NodeRef<'a>>,
    short: Option<NodeRef<'a>>,
}

impl<'a> HelpBinder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a help file.
    pub fn load_file(&mut self, g: &mut Grammar<'a>, path: &str) -> Result<(), FileError> {
        let text = std::fs::read_to_string(path).map_err(|error| FileError::Io {
            path: path.to_string(),
            error,
        })?;
        self.load_source(g, path, &text)
    }

    /// Load an in-memory help source. `name` labels errors.
    pub fn load_source(
        &mut self,
        g: &mut Grammar<'a>,
        name: &str,
        text: &str,
    ) -> Result<(), FileError> {
        let mut heading: Option<NodeRef<'a>> = None;
        let mut long_buf = String::new();
        let mut short_buf = String::new();

        for (index, raw) in text.lines().enumerate() {
            let err_here = |error: GrammarError| FileError::Parse {
                path: name.to_string(),
                line_no: (index + 1) as u32,
                line: raw.to_string(),
                error,
            };

            if let Some(stripped) = raw.strip_prefix('#') {
                self.flush(g, heading.take(), &mut long_buf, &mut short_buf);

                let title = stripped.trim_start_matches('#');
                let indent = raw.len() - title.trim_start().len();
                let title = title.trim();
                if title.is_empty() {
                    return Err(err_here(GrammarError::structure("empty heading", 0)));
                }
                if title.contains(['(', '|', ')', '[', ']']) {
                    return Err(err_here(GrammarError::structure(
                        "headings must be plain command paths",
                        indent,
                    )));
                }
                let node = parse_line(g, title).map_err(|e| {
                    let offset = e.offset + indent;
                    err_here(GrammarError {
                        offset,
                        ..e
                    })
                })?;
                let Some(node) = node else {
                    return Err(err_here(GrammarError::structure("empty heading", 0)));
                };
                heading = Some(node);
                continue;
            }

            if heading.is_none() {
                // Prose before the first heading has nothing to bind to.
                continue;
            }

            if raw.starts_with("    ") && !raw.starts_with("     ") {
                short_buf.push_str(&raw[4..]);
                short_buf.push('\n');
                continue;
            }

            long_buf.push_str(raw);
            long_buf.push('\n');
        }

        self.flush(g, heading.take(), &mut long_buf, &mut short_buf);
        Ok(())
    }

    /// Attach the accumulated prose of one heading to the forests.
    fn flush(
        &mut self,
        g: &mut Grammar<'a>,
        heading: Option<NodeRef<'a>>,
        long_buf: &mut String,
        short_buf: &mut String,
    ) {
        if let Some(path) = heading {
            if !long_buf.trim().is_empty() {
                let leaf = g.force_word(long_buf.trim_matches('\n'), HelpKind::Long);
                let entry = g.concat(path, leaf);
                self.long = Some(match self.long {
                    None => entry,
                    // Help leaves never collide with keywords, so this
                    // cannot fail.
                    Some(head) => g.alternate(head, entry).unwrap_or(head),
                });
            }
            if !short_buf.trim().is_empty() {
                let leaf = g.force_word(short_buf.trim_matches('\n'), HelpKind::Short);
                let entry = g.concat(path, leaf);
                self.short = Some(match self.short {
                    None => entry,
                    Some(head) => g.alternate(head, entry).unwrap_or(head),
                });
            }
        }
        long_buf.clear();
        short_buf.clear();
    }

    /// The long-form help bound to exactly this command path.
    pub fn long_help(&self, g: &mut Grammar<'a>, argv: &[&str]) -> Option<&'a str> {
        find_leaf(g, self.long?, argv, HelpKind::Long)
    }

    /// The short-form (summary) help bound to exactly this command path.
    pub fn short_help(&self, g: &mut Grammar<'a>, argv: &[&str]) -> Option<&'a str> {
        find_leaf(g, self.short?, argv, HelpKind::Short)
    }

    /// Print the short help for the path, followed by the path itself as
    /// the prompt tail.
    pub fn print_context_help<W: fmt::Write>(
        &self,
        g: &mut Grammar<'a>,
        argv: &[&str],
        out: &mut W,
    ) -> fmt::Result {
        if let Some(text) = self.short_help(g, argv) {
            writeln!(out, "{}", text.trim_end())?;
        }
        if !argv.is_empty() {
            writeln!(out, "{}", argv.join(" "))?;
        }
        Ok(())
    }

    /// List the words that can follow `argv` in `syntax`, each padded to a
    /// common width and annotated with its short help when one is bound.
    pub fn print_context_help_subcommands<W: fmt::Write>(
        &self,
        g: &mut Grammar<'a>,
        syntax: NodeRef<'a>,
        argv: &[&str],
        out: &mut W,
    ) -> fmt::Result {
        let Some(tail) = residual_at(g, syntax, argv) else {
            return Ok(());
        };
        let words = next_words(tail);
        if words.is_empty() {
            return Ok(());
        }

        let mut summaries: Vec<(&'a str, &'a str)> = Vec::new();
        if let Some(head) = self.short {
            if let Some(help_tail) = residual_at(g, head, argv) {
                for op in help_tail.alternatives() {
                    if let NodeKind::Concat { first, rest, .. } = op.kind {
                        let Some(word) = first.as_word() else { continue };
                        if word.help != HelpKind::None {
                            continue;
                        }
                        // The summary leaf may sit alone or lead the
                        // alternation of deeper entries.
                        let leaf = rest
                            .alternatives()
                            .filter_map(|n| n.as_word())
                            .find(|w| w.help == HelpKind::Short);
                        if let Some(leaf) = leaf {
                            summaries.push((word.text, leaf.text));
                        }
                    }
                }
            }
        }

        let width = words.iter().map(|c| c.text.len()).max().unwrap_or(0);
        for cand in words {
            match summaries.iter().find(|(w, _)| *w == cand.text) {
                Some((_, summary)) => {
                    writeln!(out, "{:<width$}  {}", cand.text, summary.trim_end())?
                }
                None => writeln!(out, "{}", cand.text)?,
            }
        }
        Ok(())
    }
}

/// The grammar that remains after consuming `argv` exactly. `None` when
/// the path does not lead into the forest.
fn residual_at<'a>(
    g: &mut Grammar<'a>,
    head: NodeRef<'a>,
    argv: &[&str],
) -> Option<NodeRef<'a>> {
    if argv.is_empty() {
        return Some(head);
    }
    match g.check(head, argv) {
        Outcome::WantMore { .. } => {}
        _ => return None,
    }
    let tree = g.match_max(head, argv)?;
    skip_prefix(tree, argv.len() as u32)
}

fn find_leaf<'a>(
    g: &mut Grammar<'a>,
    head: NodeRef<'a>,
    argv: &[&str],
    kind: HelpKind,
) -> Option<&'a str> {
    let tail = residual_at(g, head, argv)?;
    for op in tail.alternatives() {
        if let Some(w) = op.as_word() {
            if w.help == kind {
                return Some(w.text);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_source;
    use bumpalo::Bump;
    use indoc::indoc;

    const HELP: &str = indoc! {"
        # show
            Display operational state.
        Top-level inspection commands. Every subcommand is read-only.

        # show version
            Software version.
        Prints the running software version, build id, and uptime.

        ## show status
            Link status summary.
        One line per interface with its admin and operational state.
    "};

    fn setup<'a>(arena: &'a Bump) -> (Grammar<'a>, NodeRef<'a>, HelpBinder<'a>) {
        let mut g = Grammar::new(arena);
        let syntax = parse_source(
            &mut g,
            "cmds",
            "show version\nshow status\nquit\n",
        )
        .unwrap()
        .unwrap();
        let mut help = HelpBinder::new();
        help.load_source(&mut g, "help.md", HELP).unwrap();
        (g, syntax, help)
    }

    #[test]
    fn test_long_help_lookup() {
        let arena = Bump::new();
        let (mut g, _, help) = setup(&arena);
        let text = help.long_help(&mut g, &["show", "version"]).unwrap();
        assert!(text.contains("running software version"), "{}", text);

        let top = help.long_help(&mut g, &["show"]).unwrap();
        assert!(top.contains("read-only"), "{}", top);
    }

    #[test]
    fn test_short_help_lookup() {
        let arena = Bump::new();
        let (mut g, _, help) = setup(&arena);
        assert_eq!(
            help.short_help(&mut g, &["show", "version"]).unwrap().trim_end(),
            "Software version."
        );
        assert_eq!(
            help.short_help(&mut g, &["show", "status"]).unwrap().trim_end(),
            "Link status summary."
        );
    }

    #[test]
    fn test_unknown_path_has_no_help() {
        let arena = Bump::new();
        let (mut g, _, help) = setup(&arena);
        assert!(help.long_help(&mut g, &["quit"]).is_none());
        assert!(help.long_help(&mut g, &["show", "nothing"]).is_none());
    }

    #[test]
    fn test_print_context_help() {
        let arena = Bump::new();
        let (mut g, _, help) = setup(&arena);
        let mut out = String::new();
        help.print_context_help(&mut g, &["show", "version"], &mut out)
            .unwrap();
        assert_eq!(out, "Software version.\nshow version\n");
    }

    #[test]
    fn test_context_help_subcommands_pads_and_annotates() {
        let arena = Bump::new();
        let (mut g, syntax, help) = setup(&arena);
        let mut out = String::new();
        help.print_context_help_subcommands(&mut g, syntax, &["show"], &mut out)
            .unwrap();
        assert_eq!(
            out,
            "status   Link status summary.\nversion  Software version.\n"
        );
    }

    #[test]
    fn test_context_help_subcommands_at_top_level() {
        let arena = Bump::new();
        let (mut g, syntax, help) = setup(&arena);
        let mut out = String::new();
        help.print_context_help_subcommands(&mut g, syntax, &[], &mut out)
            .unwrap();
        // "show" carries a summary; "quit" is listed bare.
        assert!(out.contains("show  Display operational state."), "{}", out);
        assert!(out.lines().any(|l| l.trim() == "quit"), "{}", out);
    }

    #[test]
    fn test_heading_rejects_grammar_syntax() {
        let arena = Bump::new();
        let mut g = Grammar::new(&arena);
        let mut help = HelpBinder::new();
        let err = help
            .load_source(&mut g, "bad.md", "# show (version|status)\n    nope\n")
            .unwrap_err();
        assert!(err.to_string().contains("plain command paths"));
    }
}
