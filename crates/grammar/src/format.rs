//! The canonical unparser.
//!
//! `unparse` renders a node back into grammar DSL source. Because nodes
//! are normalized and interned, parsing the output of `unparse` always
//! yields the original node, so the canonical text doubles as a stable
//! identity for tests and debugging.

use std::fmt::Write;

use crate::node::{NodeKind, NodeRef};

fn write_node(out: &mut String, node: NodeRef<'_>) {
    match node.kind {
        NodeKind::Word(w) => {
            out.push_str(w.text);
            if w.caseless {
                out.push_str("/i");
            }
            if w.needs_terminal {
                out.push_str("/t");
            }
        }

        NodeKind::Varargs => out.push_str("..."),

        NodeKind::Macro { name, body } => {
            out.push_str(name);
            out.push('=');
            write_node(out, body);
        }

        NodeKind::Concat { .. } => {
            for (i, elem) in node.seq().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_node(out, elem);
            }
        }

        NodeKind::Optional(x) => {
            out.push('[');
            write_node(out, x);
            out.push(']');
        }

        NodeKind::Plus { child, min } => {
            let parens = matches!(child.kind, NodeKind::Concat { .. });
            if parens {
                out.push('(');
            }
            write_node(out, child);
            if parens {
                out.push(')');
            }
            out.push(if min == 1 { '+' } else { '*' });
        }

        NodeKind::Alternate { .. } => {
            out.push('(');
            for (i, op) in node.alternatives().enumerate() {
                if i > 0 {
                    out.push('|');
                }
                write_node(out, op);
            }
            out.push(')');
        }
    }
}

/// Render a node as canonical grammar source.
pub fn unparse(node: NodeRef<'_>) -> String {
    let mut out = String::new();
    write_node(&mut out, node);
    out
}

/// Write one top-level alternative per line, the inverse of accumulating
/// a grammar file with `merge_line`.
pub fn print_lines<W: Write>(node: NodeRef<'_>, out: &mut W) -> std::fmt::Result {
    for op in node.alternatives() {
        writeln!(out, "{}", unparse(op))?;
    }
    Ok(())
}
