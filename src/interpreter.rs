//! API to control the interpreter.

use std::io::prelude::*;
use std::rc::Rc;

use log::debug;
use thiserror::Error;

use crate::ctx::Context;
use crate::diag::{ResolveErrors, RuntimeError, SyntaxError};
use crate::eval::Evaluator;
use crate::parser::Parser;
use crate::printer;
use crate::resolver::Resolver;

/// Tree-walk interpreter.
///
/// Globals and resolved scope information persist across calls, so a REPL
/// can feed one line at a time and definitions stay visible.
///
/// # Example
///
/// Invoke the interpreter a first time to define a function then an
/// additional time to call it:
///
/// ```
/// # use treelox::interpreter::{Interpreter, LoxError};
///
/// let mut output: Vec<u8> = Vec::new();
/// let mut interp = Interpreter::new(&mut output);
///
/// let func_def = r#"
///     fun max(x, y) {
///         if (x > y) {
///             return x;
///         }
///         return y;
///     }
/// "#;
/// interp.run(func_def)?;
/// interp.run("print max(10, 20);")?;
///
/// assert_eq!(output, b"20\n");
/// # Ok::<(), LoxError>(())
/// ```
#[derive(Debug)]
pub struct Interpreter<'t, W: Write> {
    ctx: Rc<Context>,
    evaluator: Evaluator<'t, W>,
}

/// Errors the interpreter can raise, one variant per pipeline phase.
#[derive(Debug, Error)]
pub enum LoxError {
    /// Error occurring during lexical or syntactic analysis.
    #[error("{0}")]
    Syntax(#[from] SyntaxError),

    /// Static scope violations found before evaluation started.
    #[error("{0}")]
    Resolve(#[from] ResolveErrors),

    /// Error occurring during evaluation.
    #[error("{0}")]
    Runtime(#[from] RuntimeError),
}

impl<W: Write> Interpreter<'_, W> {
    pub fn new(output: &mut W) -> Interpreter<'_, W> {
        let ctx = Context::new();
        Interpreter {
            ctx: ctx.clone(),
            evaluator: Evaluator::new(output, ctx),
        }
    }

    /// Run a program: parse, resolve, evaluate.  Nothing is evaluated
    /// unless both static phases accept the whole input.
    pub fn run(&mut self, source: &str) -> Result<(), LoxError> {
        let mut parser = Parser::new(source, self.ctx.clone());
        let prg = parser.parse_program()?;
        debug!("parsed {} statement(s):\n{}", prg.len(), printer::program(&prg));

        let locals = Resolver::new(self.ctx.clone()).resolve(&prg)?;
        debug!("resolved {} local reference(s)", locals.len());
        self.evaluator.add_locals(locals);

        self.evaluator.eval_program(&prg)?;
        Ok(())
    }
}
