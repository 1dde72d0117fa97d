//! Static scope resolution.
//!
//! Walks the AST once before evaluation and computes, for every name
//! reference that binds locally, the number of enclosing scopes between
//! the reference and its binding.  The scope stack mirrors exactly the
//! environments the evaluator will create: blocks, function bodies
//! (parameters and body share one scope), the `super` and `this` scopes
//! around class methods, and the synthetic block produced by `for`
//! desugaring.  Globals are never recorded; the evaluator falls back to
//! the global environment for anything absent from the locals map.

use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{ClassDef, Expr, ExprId, FunDef, NameRef, Stmt};
use crate::ctx::{Context, Symbol};
use crate::diag::{ResolveError, ResolveErrorKind, ResolveErrors};

#[derive(Debug, Clone, Copy, PartialEq)]
enum ClassKind {
    NoClass,
    Class,
    Subclass,
}

#[derive(Debug)]
pub struct Resolver {
    ctx: Rc<Context>,

    // Innermost scope last.  The flag is false between declaration and
    // definition, when reading the name is illegal.
    scopes: Vec<HashMap<Symbol, bool>>,
    locals: HashMap<ExprId, usize>,
    errors: Vec<ResolveError>,
    current_class: ClassKind,
}

impl Resolver {
    pub fn new(ctx: Rc<Context>) -> Resolver {
        Resolver {
            ctx,
            scopes: vec![],
            locals: HashMap::new(),
            errors: vec![],
            current_class: ClassKind::NoClass,
        }
    }

    /// Resolve a whole program, accumulating every violation instead of
    /// stopping at the first.
    pub fn resolve(mut self, prg: &[Stmt]) -> Result<HashMap<ExprId, usize>, ResolveErrors> {
        for stmt in prg {
            self.resolve_stmt(stmt);
        }
        if self.errors.is_empty() {
            Ok(self.locals)
        } else {
            Err(ResolveErrors(self.errors))
        }
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Nop => (),
            Stmt::Expr(e) => self.resolve_expr(e),
            Stmt::Print(e, _) => self.resolve_expr(e),
            Stmt::VarDecl(name, init) => {
                self.declare(name);
                if let Some(init) = init {
                    self.resolve_expr(init);
                }
                self.define(name);
            }
            Stmt::FunDecl(def) => {
                // Defined before the body resolves so the function can
                // call itself.
                self.declare(&def.name);
                self.define(&def.name);
                self.resolve_function(def);
            }
            Stmt::ClassDecl(def) => self.resolve_class(def),
            Stmt::Block(stmts) => {
                self.begin_scope();
                for s in stmts {
                    self.resolve_stmt(s);
                }
                self.end_scope();
            }
            Stmt::If(cond, then_branch, else_branch) => {
                self.resolve_expr(cond);
                self.resolve_stmt(then_branch);
                self.resolve_stmt(else_branch);
            }
            Stmt::While(cond, body) => {
                self.resolve_expr(cond);
                self.resolve_stmt(body);
            }
            Stmt::Return(value, _) => {
                if let Some(value) = value {
                    self.resolve_expr(value);
                }
            }
        }
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Nil | Expr::Bool(_) | Expr::Number(_) | Expr::Str(_) => (),
            Expr::Var(name) => self.resolve_var(name),
            Expr::Assign(name, value) => {
                self.resolve_expr(value);
                self.resolve_local(name);
            }
            Expr::Not(e) | Expr::Neg(e, _) | Expr::Group(e) => self.resolve_expr(e),
            Expr::Add(l, r, _)
            | Expr::Sub(l, r, _)
            | Expr::Mul(l, r, _)
            | Expr::Div(l, r, _)
            | Expr::Less(l, r, _)
            | Expr::LessEqual(l, r, _)
            | Expr::Greater(l, r, _)
            | Expr::GreaterEqual(l, r, _)
            | Expr::Equal(l, r)
            | Expr::NotEqual(l, r)
            | Expr::And(l, r)
            | Expr::Or(l, r) => {
                self.resolve_expr(l);
                self.resolve_expr(r);
            }
            Expr::Call(callee, args, _) => {
                self.resolve_expr(callee);
                for arg in args {
                    self.resolve_expr(arg);
                }
            }
            Expr::Get(object, _, _) => self.resolve_expr(object),
            Expr::Set(object, _, value, _) => {
                self.resolve_expr(object);
                self.resolve_expr(value);
            }
            Expr::This(keyword) => {
                if self.current_class == ClassKind::NoClass {
                    self.error(keyword, ResolveErrorKind::ThisOutsideClass);
                } else {
                    self.resolve_local(keyword);
                }
            }
            Expr::Super(keyword, _) => match self.current_class {
                ClassKind::NoClass => self.error(keyword, ResolveErrorKind::SuperOutsideClass),
                ClassKind::Class => {
                    self.error(keyword, ResolveErrorKind::SuperWithoutSuperclass)
                }
                ClassKind::Subclass => self.resolve_local(keyword),
            },
        }
    }

    /// Resolve a variable read.  Reading a name whose innermost binding is
    /// still being initialized (`var a = a;`) is an error.
    fn resolve_var(&mut self, name: &NameRef) {
        if let Some(scope) = self.scopes.last() {
            if scope.get(&name.sym) == Some(&false) {
                self.error(name, ResolveErrorKind::UninitializedRead);
                return;
            }
        }
        self.resolve_local(name);
    }

    /// Walk the scope stack innermost outward and record how many scopes
    /// were skipped.  A name found nowhere is a global and stays
    /// unrecorded.
    fn resolve_local(&mut self, name: &NameRef) {
        for (distance, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.sym) {
                self.locals.insert(name.id, distance);
                return;
            }
        }
    }

    fn resolve_function(&mut self, def: &FunDef) {
        self.begin_scope();
        for param in &def.params {
            self.declare(param);
            self.define(param);
        }
        for stmt in &def.body {
            self.resolve_stmt(stmt);
        }
        self.end_scope();
    }

    fn resolve_class(&mut self, def: &ClassDef) {
        let enclosing = self.current_class;
        self.current_class = if def.superclass.is_some() {
            ClassKind::Subclass
        } else {
            ClassKind::Class
        };

        self.declare(&def.name);
        self.define(&def.name);

        if let Some(superclass) = &def.superclass {
            if superclass.sym == def.name {
                self.error(superclass, ResolveErrorKind::InheritFromSelf);
            }
            self.resolve_var(superclass);
            self.begin_scope();
            self.bind(self.ctx.sym_super());
        }

        self.begin_scope();
        self.bind(self.ctx.sym_this());

        for method in &def.methods {
            self.resolve_function(method);
        }

        self.end_scope();
        if def.superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing;
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Symbol) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.clone(), false);
        }
    }

    fn define(&mut self, name: &Symbol) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.clone(), true);
        }
    }

    /// Insert an implicitly defined name (`this`, `super`) into the
    /// innermost scope.
    fn bind(&mut self, name: Symbol) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, true);
        }
    }

    fn error(&mut self, name: &NameRef, kind: ResolveErrorKind) {
        self.errors
            .push(ResolveError::new(name.pos, name.sym.name(), kind));
    }
}
