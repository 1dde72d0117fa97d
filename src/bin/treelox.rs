//! Lox interpreter command line.
//!
//! When called without argument it drops into an interactive
//! read-evaluate-print loop; EOF leaves the loop with status 0 and errors
//! only terminate the offending line.
//!
//! When called with a script file, it runs the file once and exits
//! non-zero on the first error: 65 for syntax and resolve errors, 70 for
//! runtime errors.

use std::env;
use std::fs;
use std::io;
use std::process;

use anyhow::Context;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use treelox::interpreter::{Interpreter, LoxError};

fn main() -> Result<(), anyhow::Error> {
    env_logger::init();

    let args = env::args().skip(1).collect::<Vec<_>>();
    match args.as_slice() {
        [] => run_prompt()?,
        [path] => run_file(path)?,
        _ => {
            eprintln!("usage: treelox [script]");
            process::exit(64);
        }
    }
    Ok(())
}

fn exit_code(err: &LoxError) -> i32 {
    match err {
        LoxError::Syntax(_) | LoxError::Resolve(_) => 65,
        LoxError::Runtime(_) => 70,
    }
}

fn run_file(path: &str) -> Result<(), anyhow::Error> {
    let source =
        fs::read_to_string(path).with_context(|| format!("failed to open {}", path))?;

    let mut stdout = io::stdout();
    let mut interp = Interpreter::new(&mut stdout);
    if let Err(e) = interp.run(&source) {
        eprintln!("{}", e);
        process::exit(exit_code(&e));
    }
    Ok(())
}

fn run_prompt() -> Result<(), anyhow::Error> {
    let mut editor = DefaultEditor::new()?;
    let mut stdout = io::stdout();
    let mut interp = Interpreter::new(&mut stdout);

    loop {
        match editor.readline("> ") {
            Ok(line) => {
                let _ = editor.add_history_entry(line.as_str());
                if let Err(e) = interp.run(&line) {
                    eprintln!("{}", e);
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
