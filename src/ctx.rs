//! Interpreter-wide shared state: interned symbols, the keyword table,
//! and expression-id allocation.

use std::borrow::Borrow;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use crate::ast::ExprId;
use crate::token::Token;

/// An identifier or property name, interned once per context and compared
/// by address afterwards, so symbol equality and hashing never touch the
/// character data at lookup time.
#[derive(Debug, Hash, Clone)]
pub struct Symbol(Rc<str>);

impl Symbol {
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Symbol {}

/// Global mostly read-only state shared by every pipeline stage and
/// persisting across interpreter sessions.
///
/// Owns the symbol table and the keyword table (a lazy static does not
/// work here because Symbol and so Token is not Sync).  Also hands out
/// the parse-time expression ids the resolver keys its locals map on; the
/// counter lives here so ids stay unique across REPL lines.
#[derive(Debug)]
pub struct Context {
    symbols: RefCell<HashSet<Symbol>>,
    keywords: HashMap<Symbol, Token>,
    next_expr_id: Cell<ExprId>,
    sym_this: Symbol,
    sym_super: Symbol,
    sym_init: Symbol,
}

impl Context {
    /// Creates a new context.
    ///
    /// Returns a Rc because the context is shared between various data
    /// structures.
    pub fn new() -> Rc<Self> {
        let mut symbols = HashSet::new();

        let mut keywords = HashMap::new();
        for (name, token) in KEYWORDS.iter().cloned() {
            keywords.insert(intern(&mut symbols, name), token);
        }

        let sym_this = intern(&mut symbols, "this");
        let sym_super = intern(&mut symbols, "super");
        let sym_init = intern(&mut symbols, "init");

        Rc::new(Context {
            symbols: RefCell::new(symbols),
            keywords,
            next_expr_id: Cell::new(0),
            sym_this,
            sym_super,
            sym_init,
        })
    }

    /// Intern the given string if needed and return its associated symbol.
    pub fn symbol(&self, name: &str) -> Symbol {
        intern(&mut self.symbols.borrow_mut(), name)
    }

    /// Return the token associated with the given symbol if it is a keyword.
    pub fn keyword(&self, id: &Symbol) -> Option<Token> {
        self.keywords.get(id).cloned()
    }

    /// Hand out a fresh expression id, unique for the lifetime of this
    /// context.
    pub fn next_expr_id(&self) -> ExprId {
        let id = self.next_expr_id.get();
        self.next_expr_id.set(id + 1);
        id
    }

    pub fn sym_this(&self) -> Symbol {
        self.sym_this.clone()
    }

    pub fn sym_super(&self) -> Symbol {
        self.sym_super.clone()
    }

    pub fn sym_init(&self) -> Symbol {
        self.sym_init.clone()
    }
}

fn intern(symbols: &mut HashSet<Symbol>, name: &str) -> Symbol {
    if let Some(sym) = symbols.get(name) {
        sym.clone()
    } else {
        let sym = Symbol(Rc::from(name));
        symbols.insert(sym.clone());
        sym
    }
}

const KEYWORDS: [(&str, Token); 16] = [
    ("and", Token::And),
    ("class", Token::Class),
    ("else", Token::Else),
    ("false", Token::False),
    ("fun", Token::Fun),
    ("for", Token::For),
    ("if", Token::If),
    ("nil", Token::Nil),
    ("or", Token::Or),
    ("print", Token::Print),
    ("return", Token::Return),
    ("super", Token::Super),
    ("this", Token::This),
    ("true", Token::True),
    ("var", Token::Var),
    ("while", Token::While),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_the_same_name_yields_one_symbol() {
        let ctx = Context::new();
        let sym1 = ctx.symbol("foo");
        let sym2 = ctx.symbol("foo");
        assert_eq!(sym1, sym2);
        assert_eq!(sym1.name(), "foo");
        assert_ne!(sym1, ctx.symbol("bar"));
    }

    #[test]
    fn keyword_symbols_map_to_their_tokens() {
        let ctx = Context::new();
        assert_eq!(ctx.keyword(&ctx.symbol("while")), Some(Token::While));
        assert_eq!(ctx.keyword(&ctx.symbol("whilst")), None);
    }

    #[test]
    fn cached_symbols_match_interned_ones() {
        let ctx = Context::new();
        assert_eq!(ctx.sym_this(), ctx.symbol("this"));
        assert_eq!(ctx.sym_super(), ctx.symbol("super"));
        assert_eq!(ctx.sym_init(), ctx.symbol("init"));
    }

    #[test]
    fn expression_ids_never_repeat() {
        let ctx = Context::new();
        let first = ctx.next_expr_id();
        let second = ctx.next_expr_id();
        assert_ne!(first, second);
        assert_eq!(second + 1, ctx.next_expr_id());
    }
}
