use bumpalo::Bump;
use std::env;
use std::process;

use grammar::{parse_file, print_lines, Grammar, HelpBinder, NodeRef, Outcome};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(2);
    }

    match args[1].as_str() {
        "print" => run_print_command(&args[2..]),
        "check" => run_check_command(&args[2..]),
        "complete" => run_complete_command(&args[2..]),
        "help" => run_help_command(&args[2..]),
        "--help" | "-h" => print_usage(),
        arg => {
            eprintln!("Unknown command: {}", arg);
            print_usage();
            process::exit(2);
        }
    }
}

fn print_usage() {
    eprintln!("Usage: palisade <command> [options]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  print <syntax-file>                     Print the canonical grammar");
    eprintln!("  check <syntax-file> <word>...           Validate a command");
    eprintln!("  complete <syntax-file> <input>          List tab completions");
    eprintln!("  help <syntax-file> <help-file> [word]...  Show help for a path");
}

fn load_grammar<'a>(g: &mut Grammar<'a>, path: &str) -> NodeRef<'a> {
    match parse_file(g, path) {
        Ok(Some(head)) => head,
        Ok(None) => {
            eprintln!("{}: no grammar lines", path);
            process::exit(1);
        }
        Err(err) => {
            eprintln!("{}", err);
            process::exit(1);
        }
    }
}

fn run_print_command(args: &[String]) {
    let Some(path) = args.first() else {
        eprintln!("Usage: palisade print <syntax-file>");
        process::exit(2);
    };

    let arena = Bump::new();
    let mut g = Grammar::new(&arena);
    let head = load_grammar(&mut g, path);

    let mut out = String::new();
    if print_lines(head, &mut out).is_ok() {
        print!("{}", out);
    }
}

/// The typed line with a caret under the offending word.
fn caret_at(argv: &[&str], index: usize) -> String {
    let line = argv.join(" ");
    let col: usize = argv[..index].iter().map(|w| w.len() + 1).sum();
    format!("  {}\n  {}^", line, " ".repeat(col))
}

fn run_check_command(args: &[String]) {
    if args.len() < 2 {
        eprintln!("Usage: palisade check <syntax-file> <word>...");
        process::exit(2);
    }

    let arena = Bump::new();
    let mut g = Grammar::new(&arena);
    let head = load_grammar(&mut g, &args[0]);

    let argv: Vec<&str> = args[1..].iter().map(|s| s.as_str()).collect();
    match g.check(head, &argv) {
        Outcome::Complete { needs_terminal } => {
            if needs_terminal {
                println!("ok (needs a terminal)");
            } else {
                println!("ok");
            }
        }
        Outcome::WantMore { missing } => {
            println!("incomplete: expected about {} more word(s)", missing);
            process::exit(1);
        }
        Outcome::Extra { index } => {
            eprintln!("{}\nunexpected token '{}'", caret_at(&argv, index), argv[index]);
            process::exit(1);
        }
        Outcome::Mismatch { index, word, message } => {
            eprintln!(
                "{}\n{}: '{}'",
                caret_at(&argv, index),
                message.unwrap_or("invalid syntax"),
                word
            );
            process::exit(1);
        }
    }
}

fn run_complete_command(args: &[String]) {
    if args.len() < 2 {
        eprintln!("Usage: palisade complete <syntax-file> <input>");
        process::exit(2);
    }

    let arena = Bump::new();
    let mut g = Grammar::new(&arena);
    let head = load_grammar(&mut g, &args[0]);

    let input = args[1..].join(" ");
    for candidate in g.tab_complete(head, &input, 32) {
        println!("{}", candidate);
    }
}

fn run_help_command(args: &[String]) {
    if args.len() < 2 {
        eprintln!("Usage: palisade help <syntax-file> <help-file> [word]...");
        process::exit(2);
    }

    let arena = Bump::new();
    let mut g = Grammar::new(&arena);
    let head = load_grammar(&mut g, &args[0]);

    let mut help = HelpBinder::new();
    if let Err(err) = help.load_file(&mut g, &args[1]) {
        eprintln!("{}", err);
        process::exit(1);
    }

    let argv: Vec<&str> = args[2..].iter().map(|s| s.as_str()).collect();
    if let Some(text) = help.long_help(&mut g, &argv) {
        println!("{}", text.trim_end());
        println!();
    }

    let mut listing = String::new();
    if help
        .print_context_help_subcommands(&mut g, head, &argv, &mut listing)
        .is_ok()
        && !listing.is_empty()
    {
        print!("{}", listing);
    }
}
