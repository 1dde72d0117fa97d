//! Recursive-descent parser.
//!
//! Single pass over the token stream with one token of lookahead, no
//! backtracking.  Tokens are pulled from the scanner on demand; the first
//! malformed construct aborts the parse.

use std::rc::Rc;

use crate::ast::{ClassDef, Expr, FunDef, NameRef, Stmt};
use crate::ctx::{Context, Symbol};
use crate::diag::{Position, SyntaxError, SyntaxErrorKind};
use crate::scanner::Scanner;
use crate::token::Token;

/// Parameter and argument lists are capped so a call frame can never be
/// pathologically wide.
const MAX_ARITY: usize = 255;

#[derive(Debug)]
pub struct Parser<'s> {
    scanner: Scanner<'s>,
    ctx: Rc<Context>,
    current_token: Token,
    current_pos: Position,
}

impl<'s> Parser<'s> {
    pub fn new(source: &'s str, ctx: Rc<Context>) -> Parser<'s> {
        Parser {
            scanner: Scanner::new(source, ctx.clone()),
            ctx,
            current_token: Token::Eof, // we haven't scanned anything yet
            current_pos: Position::new(1, 1),
        }
    }

    pub fn parse_program(&mut self) -> Result<Vec<Stmt>, SyntaxError> {
        let mut prg = vec![];
        self.advance()?;
        loop {
            match self.current_token {
                Token::Eof => break,
                _ => prg.push(self.declaration()?),
            }
        }
        Ok(prg)
    }

    #[allow(dead_code)]
    fn parse_expression(&mut self) -> Result<Expr, SyntaxError> {
        self.advance()?;
        self.expression()
    }

    fn declaration(&mut self) -> Result<Stmt, SyntaxError> {
        match self.current_token {
            Token::Var => self.var_decl(),
            Token::Fun => self.fun_decl(),
            Token::Class => self.class_decl(),
            _ => self.statement(),
        }
    }

    /// Parse a variable declaration.  Current token is `var`.
    fn var_decl(&mut self) -> Result<Stmt, SyntaxError> {
        self.advance()?;
        let name = self.identifier()?;
        let init = match self.current_token {
            Token::Equal => {
                self.advance()?;
                Some(Box::new(self.expression()?))
            }
            _ => None,
        };
        self.consume(Token::Semicolon)?;
        Ok(Stmt::VarDecl(name, init))
    }

    /// Parse a function declaration.  Current token is `fun`.
    fn fun_decl(&mut self) -> Result<Stmt, SyntaxError> {
        self.advance()?;
        let def = self.function()?;
        Ok(Stmt::FunDecl(Rc::new(def)))
    }

    /// Parse a named function: `IDENT "(" parameters? ")" block`.  Shared
    /// between `fun` declarations and class methods.
    fn function(&mut self) -> Result<FunDef, SyntaxError> {
        let name = self.identifier()?;
        self.consume(Token::LeftParen)?;
        let mut params = vec![];
        if Token::RightParen != self.current_token {
            loop {
                if params.len() >= MAX_ARITY {
                    return Err(self.error(SyntaxErrorKind::TooManyParameters));
                }
                params.push(self.identifier()?);
                if Token::Comma != self.current_token {
                    break;
                }
                self.consume(Token::Comma)?;
            }
        }
        self.consume(Token::RightParen)?;
        let body = self.block_body()?;
        Ok(FunDef { name, params, body })
    }

    /// Parse a class declaration.  Current token is `class`.
    fn class_decl(&mut self) -> Result<Stmt, SyntaxError> {
        self.advance()?;
        let name = self.identifier()?;
        let superclass = match self.current_token {
            Token::Less => {
                self.advance()?;
                Some(self.name_ref()?)
            }
            _ => None,
        };
        self.consume(Token::LeftCurly)?;
        let mut methods = vec![];
        while Token::RightCurly != self.current_token {
            methods.push(Rc::new(self.function()?));
        }
        self.advance()?;
        Ok(Stmt::ClassDecl(Rc::new(ClassDef {
            name,
            superclass,
            methods,
        })))
    }

    fn statement(&mut self) -> Result<Stmt, SyntaxError> {
        match self.current_token {
            Token::Print => {
                let pos = self.current_pos;
                self.advance()?;
                let expr = Box::new(self.expression()?);
                self.consume(Token::Semicolon)?;
                Ok(Stmt::Print(expr, pos))
            }
            Token::LeftCurly => Ok(Stmt::Block(self.block_body()?)),
            Token::If => {
                self.advance()?;
                self.consume(Token::LeftParen)?;
                let cond = Box::new(self.expression()?);
                self.consume(Token::RightParen)?;
                let then_branch = Box::new(self.statement()?);
                let else_branch = if let Token::Else = self.current_token {
                    self.advance()?;
                    Box::new(self.statement()?)
                } else {
                    Box::new(Stmt::Nop)
                };
                Ok(Stmt::If(cond, then_branch, else_branch))
            }
            Token::While => {
                self.advance()?;
                self.consume(Token::LeftParen)?;
                let cond = Box::new(self.expression()?);
                self.consume(Token::RightParen)?;
                let body = Box::new(self.statement()?);
                Ok(Stmt::While(cond, body))
            }
            Token::For => self.for_stmt(),
            Token::Return => {
                let pos = self.current_pos;
                self.advance()?;
                let value = if self.current_token == Token::Semicolon {
                    None
                } else {
                    Some(Box::new(self.expression()?))
                };
                self.consume(Token::Semicolon)?;
                Ok(Stmt::Return(value, pos))
            }
            Token::Semicolon => {
                self.advance()?;
                Ok(Stmt::Nop)
            }
            _ => {
                let expr = Box::new(self.expression()?);
                self.consume(Token::Semicolon)?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    /// Parse a `for` statement and rewrite it as a `while` loop:
    /// `for (init; cond; inc) body` becomes
    /// `{ init; while (cond) { body; inc; } }`, with the missing pieces
    /// omitted and a missing condition read as `true`.
    fn for_stmt(&mut self) -> Result<Stmt, SyntaxError> {
        self.advance()?;
        self.consume(Token::LeftParen)?;

        let init = match self.current_token {
            Token::Semicolon => {
                self.advance()?;
                None
            }
            Token::Var => Some(self.var_decl()?),
            _ => {
                let expr = Box::new(self.expression()?);
                self.consume(Token::Semicolon)?;
                Some(Stmt::Expr(expr))
            }
        };

        let cond = if self.current_token == Token::Semicolon {
            Expr::Bool(true)
        } else {
            self.expression()?
        };
        self.consume(Token::Semicolon)?;

        let inc = if self.current_token == Token::RightParen {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(Token::RightParen)?;

        let body = self.statement()?;

        let body = match inc {
            Some(inc) => Stmt::Block(vec![body, Stmt::Expr(Box::new(inc))]),
            None => body,
        };
        let looped = Stmt::While(Box::new(cond), Box::new(body));
        Ok(match init {
            Some(init) => Stmt::Block(vec![init, looped]),
            None => looped,
        })
    }

    /// Parse a braced statement list, returning the statements without a
    /// wrapping node.  Function bodies use this directly so parameters and
    /// body share one scope.
    fn block_body(&mut self) -> Result<Vec<Stmt>, SyntaxError> {
        self.consume(Token::LeftCurly)?;
        let mut stmts = vec![];
        loop {
            match self.current_token {
                Token::RightCurly => {
                    self.advance()?;
                    break;
                }
                _ => stmts.push(self.declaration()?),
            }
        }
        Ok(stmts)
    }

    fn expression(&mut self) -> Result<Expr, SyntaxError> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr, SyntaxError> {
        let lhs = self.or_expr()?;
        if Token::Equal == self.current_token {
            let eq_pos = self.current_pos;
            self.advance()?;
            let rhs = self.assignment()?;
            match lhs {
                Expr::Var(name) => Ok(Expr::Assign(name, Box::new(rhs))),
                Expr::Get(object, name, pos) => {
                    Ok(Expr::Set(object, name, Box::new(rhs), pos))
                }
                _ => Err(SyntaxError::new(
                    eq_pos,
                    "=",
                    SyntaxErrorKind::InvalidAssignmentTarget,
                )),
            }
        } else {
            Ok(lhs)
        }
    }

    fn or_expr(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.and_expr()?;
        while Token::Or == self.current_token {
            self.advance()?;
            expr = Expr::Or(Box::new(expr), Box::new(self.and_expr()?));
        }
        Ok(expr)
    }

    fn and_expr(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.equality()?;
        while Token::And == self.current_token {
            self.advance()?;
            expr = Expr::And(Box::new(expr), Box::new(self.equality()?));
        }
        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.comparison()?;
        loop {
            match self.current_token {
                Token::EqualEqual => {
                    self.advance()?;
                    expr = Expr::Equal(Box::new(expr), Box::new(self.comparison()?));
                }
                Token::BangEqual => {
                    self.advance()?;
                    expr = Expr::NotEqual(Box::new(expr), Box::new(self.comparison()?));
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.term()?;
        loop {
            let pos = self.current_pos;
            match self.current_token {
                Token::Less => {
                    self.advance()?;
                    expr = Expr::Less(Box::new(expr), Box::new(self.term()?), pos);
                }
                Token::LessEqual => {
                    self.advance()?;
                    expr = Expr::LessEqual(Box::new(expr), Box::new(self.term()?), pos);
                }
                Token::Greater => {
                    self.advance()?;
                    expr = Expr::Greater(Box::new(expr), Box::new(self.term()?), pos);
                }
                Token::GreaterEqual => {
                    self.advance()?;
                    expr = Expr::GreaterEqual(Box::new(expr), Box::new(self.term()?), pos);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn term(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.factor()?;
        loop {
            let pos = self.current_pos;
            match self.current_token {
                Token::Plus => {
                    self.advance()?;
                    expr = Expr::Add(Box::new(expr), Box::new(self.factor()?), pos);
                }
                Token::Minus => {
                    self.advance()?;
                    expr = Expr::Sub(Box::new(expr), Box::new(self.factor()?), pos);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.unary()?;
        loop {
            let pos = self.current_pos;
            match self.current_token {
                Token::Star => {
                    self.advance()?;
                    expr = Expr::Mul(Box::new(expr), Box::new(self.unary()?), pos);
                }
                Token::Slash => {
                    self.advance()?;
                    expr = Expr::Div(Box::new(expr), Box::new(self.unary()?), pos);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr, SyntaxError> {
        match self.current_token {
            Token::Minus => {
                let pos = self.current_pos;
                self.advance()?;
                Ok(Expr::Neg(Box::new(self.unary()?), pos))
            }
            Token::Bang => {
                self.advance()?;
                Ok(Expr::Not(Box::new(self.unary()?)))
            }
            _ => self.call(),
        }
    }

    fn call(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.primary()?;
        loop {
            let pos = self.current_pos;
            match self.current_token {
                Token::LeftParen => {
                    self.advance()?;
                    let mut args = vec![];
                    if Token::RightParen != self.current_token {
                        loop {
                            if args.len() >= MAX_ARITY {
                                return Err(self.error(SyntaxErrorKind::TooManyArguments));
                            }
                            args.push(self.expression()?);
                            if Token::Comma != self.current_token {
                                break;
                            }
                            self.consume(Token::Comma)?;
                        }
                    }
                    self.consume(Token::RightParen)?;
                    expr = Expr::Call(Box::new(expr), args, pos);
                }
                Token::Dot => {
                    self.advance()?;
                    let name = self.identifier()?;
                    expr = Expr::Get(Box::new(expr), name, pos);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, SyntaxError> {
        match self.current_token.clone() {
            Token::Identifier(sym) => {
                let expr = Expr::Var(NameRef {
                    sym,
                    pos: self.current_pos,
                    id: self.ctx.next_expr_id(),
                });
                self.advance()?;
                Ok(expr)
            }
            Token::Nil => {
                self.advance()?;
                Ok(Expr::Nil)
            }
            Token::Number(n) => {
                self.advance()?;
                Ok(Expr::Number(n))
            }
            Token::Str(s) => {
                self.advance()?;
                Ok(Expr::Str(s))
            }
            Token::True => {
                self.advance()?;
                Ok(Expr::Bool(true))
            }
            Token::False => {
                self.advance()?;
                Ok(Expr::Bool(false))
            }
            Token::This => {
                let name = NameRef {
                    sym: self.ctx.sym_this(),
                    pos: self.current_pos,
                    id: self.ctx.next_expr_id(),
                };
                self.advance()?;
                Ok(Expr::This(name))
            }
            Token::Super => {
                let keyword = NameRef {
                    sym: self.ctx.sym_super(),
                    pos: self.current_pos,
                    id: self.ctx.next_expr_id(),
                };
                self.advance()?;
                self.consume(Token::Dot)?;
                let method = self.identifier()?;
                Ok(Expr::Super(keyword, method))
            }
            Token::LeftParen => {
                self.advance()?;
                let expr = self.expression()?;
                self.consume(Token::RightParen)?;
                Ok(Expr::Group(Box::new(expr)))
            }
            _ => Err(self.error(SyntaxErrorKind::ExpectedExpression)),
        }
    }

    /// Consume an identifier token and return its symbol.
    fn identifier(&mut self) -> Result<Symbol, SyntaxError> {
        if let Token::Identifier(id) = self.current_token.clone() {
            self.advance()?;
            Ok(id)
        } else {
            Err(self.error(SyntaxErrorKind::ExpectedIdentifier))
        }
    }

    /// Consume an identifier and wrap it as a name reference with a fresh
    /// expression id.
    fn name_ref(&mut self) -> Result<NameRef, SyntaxError> {
        let pos = self.current_pos;
        let sym = self.identifier()?;
        Ok(NameRef {
            sym,
            pos,
            id: self.ctx.next_expr_id(),
        })
    }

    fn advance(&mut self) -> Result<&Token, SyntaxError> {
        let (pos, token) = self.scanner.get_token()?;
        self.current_token = token;
        self.current_pos = pos;
        Ok(&self.current_token)
    }

    fn consume(&mut self, expected: Token) -> Result<(), SyntaxError> {
        if self.current_token == expected {
            self.advance()?;
            Ok(())
        } else {
            Err(self.error(SyntaxErrorKind::Expected(expected.to_string())))
        }
    }

    fn error(&self, kind: SyntaxErrorKind) -> SyntaxError {
        SyntaxError::new(self.current_pos, self.current_token.to_string(), kind)
    }
}
