//! Lexical analyzer.

use std::iter::Peekable;
use std::rc::Rc;
use std::str::Chars;

use crate::ctx::Context;
use crate::diag::{Position, SyntaxError, SyntaxErrorKind};
use crate::token::Token;

/// Turns source text into a sequence of tokens, one `get_token` call at a
/// time.  The final token is always `Token::Eof`.
pub struct Scanner<'s> {
    input: Peekable<Chars<'s>>,
    pos: Position,
    ctx: Rc<Context>,

    // Buffer used when scanning longer tokens.  Allocated here to reuse
    // memory.
    buf: String,
}

impl<'s> Scanner<'s> {
    /// Creates a new scanner operating on `source`.
    pub fn new(source: &'s str, ctx: Rc<Context>) -> Scanner<'s> {
        Scanner {
            input: source.chars().peekable(),
            pos: Position::new(1, 1),
            ctx,
            buf: String::new(),
        }
    }

    /// Scan the next token and return it together with the position of its
    /// first character.
    pub fn get_token(&mut self) -> Result<(Position, Token), SyntaxError> {
        loop {
            let start = self.pos;
            let ch = match self.bump() {
                None => return Ok((start, Token::Eof)),
                Some(ch) => ch,
            };
            let token = match ch {
                ' ' | '\t' | '\r' | '\n' => continue,
                '(' => Token::LeftParen,
                ')' => Token::RightParen,
                '{' => Token::LeftCurly,
                '}' => Token::RightCurly,
                ',' => Token::Comma,
                '.' => Token::Dot,
                '-' => Token::Minus,
                '+' => Token::Plus,
                ';' => Token::Semicolon,
                '*' => Token::Star,
                '/' => {
                    if self.input.peek() == Some(&'/') {
                        self.skip_comment();
                        continue;
                    }
                    Token::Slash
                }
                '!' => self.one_or_two('=', Token::BangEqual, Token::Bang),
                '=' => self.one_or_two('=', Token::EqualEqual, Token::Equal),
                '<' => self.one_or_two('=', Token::LessEqual, Token::Less),
                '>' => self.one_or_two('=', Token::GreaterEqual, Token::Greater),
                '"' => self.scan_string(start)?,
                '0'..='9' => self.scan_number(ch, start)?,
                'a'..='z' | 'A'..='Z' | '_' => self.scan_identifier(ch),
                _ => {
                    return Err(SyntaxError::new(
                        start,
                        ch.to_string(),
                        SyntaxErrorKind::UnexpectedChar,
                    ));
                }
            };
            return Ok((start, token));
        }
    }

    /// Consume the next character, keeping the line and column counters in
    /// step.
    fn bump(&mut self) -> Option<char> {
        let ch = self.input.next()?;
        if ch == '\n' {
            self.pos.line += 1;
            self.pos.column = 1;
        } else {
            self.pos.column += 1;
        }
        Some(ch)
    }

    fn one_or_two(&mut self, second: char, double: Token, single: Token) -> Token {
        if self.input.peek() == Some(&second) {
            self.bump();
            double
        } else {
            single
        }
    }

    fn skip_comment(&mut self) {
        while let Some(&ch) = self.input.peek() {
            if ch == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn scan_number(&mut self, first_digit: char, start: Position) -> Result<Token, SyntaxError> {
        self.buf.clear();
        self.buf.push(first_digit);
        while let Some(ch) = self.input.peek() {
            if !ch.is_ascii_digit() {
                break;
            }
            self.buf.push(*ch);
            self.bump();
        }

        // A dot only belongs to the number when a digit follows; `1.x` is
        // the number 1 followed by a property access.
        if self.input.peek() == Some(&'.') && self.second_ahead_is_digit() {
            self.buf.push('.');
            self.bump();
            while let Some(ch) = self.input.peek() {
                if !ch.is_ascii_digit() {
                    break;
                }
                self.buf.push(*ch);
                self.bump();
            }
        }

        let n = self.buf.parse::<f64>().map_err(|_| {
            SyntaxError::new(start, self.buf.clone(), SyntaxErrorKind::BadNumberLiteral)
        })?;
        Ok(Token::Number(n))
    }

    fn second_ahead_is_digit(&self) -> bool {
        let mut ahead = self.input.clone();
        ahead.next();
        matches!(ahead.next(), Some(ch) if ch.is_ascii_digit())
    }

    /// Scan a string literal.  There are no escape sequences; the literal
    /// may span lines and runs to the next double quote.
    fn scan_string(&mut self, start: Position) -> Result<Token, SyntaxError> {
        self.buf.clear();
        loop {
            match self.bump() {
                None => {
                    return Err(SyntaxError::new(
                        start,
                        "\"",
                        SyntaxErrorKind::UnterminatedString,
                    ));
                }
                Some('"') => return Ok(Token::Str(Rc::from(self.buf.as_str()))),
                Some(ch) => self.buf.push(ch),
            }
        }
    }

    fn scan_identifier(&mut self, first_char: char) -> Token {
        self.buf.clear();
        self.buf.push(first_char);
        while let Some(&ch) = self.input.peek() {
            if !(ch.is_ascii_alphanumeric() || ch == '_') {
                break;
            }
            self.buf.push(ch);
            self.bump();
        }

        let sym = self.ctx.symbol(&self.buf);
        match self.ctx.keyword(&sym) {
            Some(token) => token,
            None => Token::Identifier(sym),
        }
    }
}

impl std::fmt::Debug for Scanner<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner").field("pos", &self.pos).finish()
    }
}

impl Iterator for Scanner<'_> {
    type Item = Result<Token, SyntaxError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.get_token() {
            Ok((_, Token::Eof)) => None,
            Ok((_, t)) => Some(Ok(t)),
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(input: &str) -> Result<Vec<Token>, SyntaxError> {
        let ctx = Context::new();
        scan_with_ctx(input, ctx)
    }

    fn scan_with_ctx(input: &str, ctx: Rc<Context>) -> Result<Vec<Token>, SyntaxError> {
        Scanner::new(input, ctx).collect()
    }

    #[test]
    fn scan_single_token() -> Result<(), SyntaxError> {
        assert_eq!(scan("+")?, vec![Token::Plus]);
        Ok(())
    }

    #[test]
    fn fixed_tokens() -> Result<(), SyntaxError> {
        assert_eq!(
            scan("+-*/() = == != ! <> <= >= ;,.{}")?,
            vec![
                Token::Plus,
                Token::Minus,
                Token::Star,
                Token::Slash,
                Token::LeftParen,
                Token::RightParen,
                Token::Equal,
                Token::EqualEqual,
                Token::BangEqual,
                Token::Bang,
                Token::Less,
                Token::Greater,
                Token::LessEqual,
                Token::GreaterEqual,
                Token::Semicolon,
                Token::Comma,
                Token::Dot,
                Token::LeftCurly,
                Token::RightCurly,
            ]
        );
        Ok(())
    }

    #[test]
    fn blanks_are_ignored() -> Result<(), SyntaxError> {
        assert_eq!(scan(" \t\n+")?, vec![Token::Plus]);
        Ok(())
    }

    #[test]
    fn numbers() -> Result<(), SyntaxError> {
        assert_eq!(scan("1")?, vec![Token::Number(1.0)]);
        assert_eq!(scan("42")?, vec![Token::Number(42.0)]);
        assert_eq!(scan("4.2")?, vec![Token::Number(4.2)]);
        Ok(())
    }

    #[test]
    fn trailing_dot_is_not_part_of_number() -> Result<(), SyntaxError> {
        let ctx = Context::new();
        assert_eq!(
            scan_with_ctx("1.foo", ctx.clone())?,
            vec![
                Token::Number(1.0),
                Token::Dot,
                Token::Identifier(ctx.symbol("foo"))
            ]
        );
        Ok(())
    }

    #[test]
    fn scan_several_tokens_without_blanks() -> Result<(), SyntaxError> {
        assert_eq!(
            scan("42+24")?,
            vec![Token::Number(42.0), Token::Plus, Token::Number(24.0)]
        );
        Ok(())
    }

    #[test]
    fn string_literal() -> Result<(), SyntaxError> {
        assert_eq!(scan(r#""hi there""#)?, vec![Token::Str(Rc::from("hi there"))]);
        Ok(())
    }

    #[test]
    fn string_may_span_lines() -> Result<(), SyntaxError> {
        let ctx = Context::new();
        let mut s = Scanner::new("\"a\nb\" c", ctx.clone());
        assert_eq!(s.get_token()?, (Position::new(1, 1), Token::Str(Rc::from("a\nb"))));
        assert_eq!(
            s.get_token()?,
            (Position::new(2, 4), Token::Identifier(ctx.symbol("c")))
        );
        Ok(())
    }

    #[test]
    fn unterminated_string() {
        match scan("\"oops") {
            Err(e) => {
                assert_eq!(e.kind, SyntaxErrorKind::UnterminatedString);
                assert_eq!(e.pos, Position::new(1, 1));
            }
            r => panic!("unexpected output: {:?}", r),
        }
    }

    #[test]
    fn scanner_keeps_track_of_positions() -> Result<(), SyntaxError> {
        let ctx = Context::new();
        let mut s = Scanner::new("1\n2 3\n 4", ctx);
        assert_eq!(s.get_token()?, (Position::new(1, 1), Token::Number(1.0)));
        assert_eq!(s.get_token()?, (Position::new(2, 1), Token::Number(2.0)));
        assert_eq!(s.get_token()?, (Position::new(2, 3), Token::Number(3.0)));
        assert_eq!(s.get_token()?, (Position::new(3, 2), Token::Number(4.0)));
        assert_eq!(s.get_token()?, (Position::new(3, 3), Token::Eof));
        Ok(())
    }

    #[test]
    fn identifiers() -> Result<(), SyntaxError> {
        let ctx = Context::new();
        assert_eq!(
            scan_with_ctx("f foo _foo t42", ctx.clone())?,
            vec![
                Token::Identifier(ctx.symbol("f")),
                Token::Identifier(ctx.symbol("foo")),
                Token::Identifier(ctx.symbol("_foo")),
                Token::Identifier(ctx.symbol("t42"))
            ]
        );
        Ok(())
    }

    #[test]
    fn keywords() -> Result<(), SyntaxError> {
        assert_eq!(
            scan("and class else false fun for if nil or print return super this true var while")?,
            vec![
                Token::And,
                Token::Class,
                Token::Else,
                Token::False,
                Token::Fun,
                Token::For,
                Token::If,
                Token::Nil,
                Token::Or,
                Token::Print,
                Token::Return,
                Token::Super,
                Token::This,
                Token::True,
                Token::Var,
                Token::While,
            ]
        );
        Ok(())
    }

    #[test]
    fn comments_are_ignored() -> Result<(), SyntaxError> {
        assert_eq!(scan("true // false\nnil")?, vec![Token::True, Token::Nil]);
        Ok(())
    }

    #[test]
    fn unexpected_character() {
        match scan("@") {
            Err(e) => {
                assert_eq!(e.kind, SyntaxErrorKind::UnexpectedChar);
                assert_eq!(e.lexeme, "@");
            }
            r => panic!("unexpected output: {:?}", r),
        }
    }
}
