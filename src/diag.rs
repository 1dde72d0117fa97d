//! Diagnostics shared by every pipeline stage.
//!
//! All three error families render themselves in the reporting format the
//! driver prints verbatim: syntax and resolve errors as
//! `[line N] Error at '<lexeme>': <message>`, runtime errors as the
//! message followed by `[line N]` on its own line.

use std::fmt;
use std::io;

use thiserror::Error;

/// Location of a token's first character in the source text.
///
/// Lines and columns both start at one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Position {
        Position { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[line {}]", self.line)
    }
}

/// Error raised by the scanner or the parser.  The pipeline aborts at the
/// first one.
#[derive(Debug, Error, PartialEq)]
#[error("{pos} Error at '{lexeme}': {kind}")]
pub struct SyntaxError {
    pub pos: Position,
    pub lexeme: String,
    pub kind: SyntaxErrorKind,
}

impl SyntaxError {
    pub fn new(pos: Position, lexeme: impl Into<String>, kind: SyntaxErrorKind) -> SyntaxError {
        SyntaxError {
            pos,
            lexeme: lexeme.into(),
            kind,
        }
    }
}

#[derive(Debug, Error, PartialEq, Clone)]
pub enum SyntaxErrorKind {
    #[error("unexpected character")]
    UnexpectedChar,
    #[error("unterminated string")]
    UnterminatedString,
    #[error("cannot parse number literal")]
    BadNumberLiteral,
    #[error("expected '{0}'")]
    Expected(String),
    #[error("expected expression")]
    ExpectedExpression,
    #[error("expected identifier")]
    ExpectedIdentifier,
    #[error("invalid assignment target")]
    InvalidAssignmentTarget,
    #[error("can't have more than 255 parameters")]
    TooManyParameters,
    #[error("can't have more than 255 arguments")]
    TooManyArguments,
}

/// Static scope rule violation found by the resolver.
#[derive(Debug, Error, PartialEq)]
#[error("{pos} Error at '{lexeme}': {kind}")]
pub struct ResolveError {
    pub pos: Position,
    pub lexeme: String,
    pub kind: ResolveErrorKind,
}

impl ResolveError {
    pub fn new(pos: Position, lexeme: impl Into<String>, kind: ResolveErrorKind) -> ResolveError {
        ResolveError {
            pos,
            lexeme: lexeme.into(),
            kind,
        }
    }
}

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ResolveErrorKind {
    #[error("uninitialized variable")]
    UninitializedRead,
    #[error("Can't use 'this' out of class")]
    ThisOutsideClass,
    #[error("Can't use 'super' outside of a class.")]
    SuperOutsideClass,
    #[error("Can't use 'super' in a class with no superclass.")]
    SuperWithoutSuperclass,
    #[error("A class can't inherit from itself.")]
    InheritFromSelf,
}

/// The resolver keeps going after an error, so it reports everything it
/// found in one batch, one finding per line.
#[derive(Debug, PartialEq)]
pub struct ResolveErrors(pub Vec<ResolveError>);

impl fmt::Display for ResolveErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for ResolveErrors {}

/// Error raised during evaluation.  Unwinds to the driver and terminates
/// the program (in the REPL: the current input).
#[derive(Debug, Error, PartialEq)]
#[error("{kind}\n{pos}")]
pub struct RuntimeError {
    pub pos: Position,
    pub kind: RuntimeErrorKind,
}

impl RuntimeError {
    pub fn new(pos: Position, kind: RuntimeErrorKind) -> RuntimeError {
        RuntimeError { pos, kind }
    }
}

#[derive(Debug, Error, PartialEq, Clone)]
pub enum RuntimeErrorKind {
    #[error("undefined variable {0}")]
    UndefinedVariable(String),
    #[error("operand of - must be a number")]
    NegOperandNotNumber,
    #[error("operands of + must be two strings or two numbers")]
    AddOperandsMismatch,
    #[error("operands of {0} must be two numbers")]
    NumberOperandsRequired(&'static str),
    #[error("not a function")]
    NotCallable,
    #[error("too many arguments")]
    TooManyArguments,
    #[error("too few arguments")]
    TooFewArguments,
    #[error("only instances have fields")]
    NotAnInstance,
    #[error("undefined property '{0}'")]
    UndefinedProperty(String),
    #[error("superclass must be a class")]
    SuperclassNotClass,
    #[error("can't return a value from an initializer")]
    ReturnValueFromInit,
    #[error("can't return from top-level code")]
    TopLevelReturn,
    #[error("argument of sleep must be a non-negative number")]
    BadSleepArgument,
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<io::Error> for RuntimeErrorKind {
    fn from(e: io::Error) -> RuntimeErrorKind {
        RuntimeErrorKind::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_error_format() {
        let err = SyntaxError::new(
            Position::new(3, 7),
            ";",
            SyntaxErrorKind::Expected(")".to_string()),
        );
        assert_eq!(err.to_string(), "[line 3] Error at ';': expected ')'");
    }

    #[test]
    fn resolve_error_format() {
        let err = ResolveError::new(Position::new(1, 7), "this", ResolveErrorKind::ThisOutsideClass);
        assert_eq!(
            err.to_string(),
            "[line 1] Error at 'this': Can't use 'this' out of class"
        );
    }

    #[test]
    fn resolve_errors_join_with_newlines() {
        let errs = ResolveErrors(vec![
            ResolveError::new(Position::new(1, 1), "X", ResolveErrorKind::InheritFromSelf),
            ResolveError::new(Position::new(2, 1), "super", ResolveErrorKind::SuperOutsideClass),
        ]);
        assert_eq!(
            errs.to_string(),
            "[line 1] Error at 'X': A class can't inherit from itself.\n\
             [line 2] Error at 'super': Can't use 'super' outside of a class."
        );
    }

    #[test]
    fn runtime_error_format() {
        let err = RuntimeError::new(Position::new(4, 2), RuntimeErrorKind::TooFewArguments);
        assert_eq!(err.to_string(), "too few arguments\n[line 4]");
    }
}
