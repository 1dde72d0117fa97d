//! Tree-walking evaluator.
//!
//! Statements are visited for their side effects, expressions for their
//! values.  The current environment travels down the recursion as a
//! parameter, so scope exit is the same thing as returning from the
//! visit, on every path.  `return` travels back up as a dedicated control
//! signal sharing the error channel without being an error.

use std::collections::HashMap;
use std::io::prelude::*;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, trace};

use crate::ast::{ClassDef, Expr, ExprId, NameRef, Stmt};
use crate::ctx::{Context, Symbol};
use crate::diag::{Position, RuntimeError, RuntimeErrorKind};
use crate::env::Env;
use crate::value::{Class, Function, FunctionBody, Instance, Value};

/// What travels up through evaluator frames: a real error, or a `return`
/// looking for its function-call boundary.  A bare `return;` carries no
/// value; initializers need the distinction.
#[derive(Debug)]
pub enum Unwind {
    Err(RuntimeError),
    Return {
        value: Option<Value>,
        pos: Position,
    },
}

impl From<RuntimeError> for Unwind {
    fn from(e: RuntimeError) -> Unwind {
        Unwind::Err(e)
    }
}

#[derive(Debug)]
pub struct Evaluator<'t, W: Write> {
    output: &'t mut W,
    ctx: Rc<Context>,
    globals: Rc<Env>,

    // Resolver output, accumulated across runs of one session.
    locals: HashMap<ExprId, usize>,
}

impl<'a, W: Write> Evaluator<'a, W> {
    pub fn new(output: &'a mut W, ctx: Rc<Context>) -> Evaluator<'a, W> {
        let globals = Env::new();
        for (name, arity, body) in BUILTINS {
            let sym = ctx.symbol(name);
            debug!("binding builtin function {}/{}", name, arity);
            globals.define(&sym, Value::Function(Rc::new(Function::builtin(sym.clone(), *arity, *body))));
        }
        Evaluator {
            output,
            ctx,
            globals,
            locals: HashMap::new(),
        }
    }

    /// Merge a resolver's locals map into this evaluator.  Expression ids
    /// are unique per context, so entries never collide.
    pub fn add_locals(&mut self, locals: HashMap<ExprId, usize>) {
        self.locals.extend(locals);
    }

    pub fn eval_program(&mut self, stmts: &[Stmt]) -> Result<(), RuntimeError> {
        let globals = self.globals.clone();
        for stmt in stmts {
            match self.eval_stmt(stmt, &globals) {
                Ok(()) => (),
                Err(Unwind::Err(e)) => return Err(e),
                Err(Unwind::Return { pos, .. }) => {
                    return Err(RuntimeError::new(pos, RuntimeErrorKind::TopLevelReturn));
                }
            }
        }
        Ok(())
    }

    fn eval_stmts(&mut self, stmts: &[Stmt], env: &Rc<Env>) -> Result<(), Unwind> {
        for stmt in stmts {
            self.eval_stmt(stmt, env)?;
        }
        Ok(())
    }

    fn eval_stmt(&mut self, stmt: &Stmt, env: &Rc<Env>) -> Result<(), Unwind> {
        match stmt {
            Stmt::Nop => (),
            Stmt::Expr(e) => {
                self.eval_expr(e, env)?;
            }
            Stmt::Print(e, pos) => {
                let v = self.eval_expr(e, env)?;
                writeln!(self.output, "{}", v)
                    .map_err(|e| RuntimeError::new(*pos, e.into()))?;
            }
            Stmt::VarDecl(name, init) => {
                let v = match init {
                    Some(init) => self.eval_expr(init, env)?,
                    None => Value::Nil,
                };
                env.define(name, v);
            }
            Stmt::FunDecl(def) => {
                let fun = Function::user(def.clone(), env.clone(), false);
                env.define(&def.name, Value::Function(Rc::new(fun)));
            }
            Stmt::ClassDecl(def) => self.eval_class_decl(def, env)?,
            Stmt::Block(stmts) => {
                self.eval_stmts(stmts, &Env::with_parent(env.clone()))?;
            }
            Stmt::If(cond, then_branch, else_branch) => {
                if self.eval_expr(cond, env)?.is_truthy() {
                    self.eval_stmt(then_branch, env)?;
                } else {
                    self.eval_stmt(else_branch, env)?;
                }
            }
            Stmt::While(cond, body) => {
                while self.eval_expr(cond, env)?.is_truthy() {
                    self.eval_stmt(body, env)?;
                }
            }
            Stmt::Return(value, pos) => {
                let value = match value {
                    Some(e) => Some(self.eval_expr(e, env)?),
                    None => None,
                };
                return Err(Unwind::Return { value, pos: *pos });
            }
        };
        Ok(())
    }

    fn eval_class_decl(&mut self, def: &Rc<ClassDef>, env: &Rc<Env>) -> Result<(), Unwind> {
        let superclass = match &def.superclass {
            Some(name) => match self.lookup(name, env)? {
                Value::Class(c) => Some(c),
                _ => {
                    return Err(RuntimeError::new(
                        name.pos,
                        RuntimeErrorKind::SuperclassNotClass,
                    )
                    .into());
                }
            },
            None => None,
        };

        // Method closures hang off an extra scope naming the superclass;
        // the receiver scope is added per bind.  The resolver assumes this
        // exact layout.
        let method_env = match &superclass {
            Some(superclass) => {
                let super_env = Env::with_parent(env.clone());
                super_env.define(&self.ctx.sym_super(), Value::Class(superclass.clone()));
                super_env
            }
            None => env.clone(),
        };

        let init_sym = self.ctx.sym_init();
        let mut methods = HashMap::new();
        for method in &def.methods {
            let is_initializer = method.name == init_sym;
            let fun = Function::user(method.clone(), method_env.clone(), is_initializer);
            methods.insert(method.name.clone(), Rc::new(fun));
        }

        let class = Class {
            name: def.name.clone(),
            superclass,
            methods,
        };
        env.define(&def.name, Value::Class(Rc::new(class)));
        Ok(())
    }

    fn eval_expr(&mut self, expr: &Expr, env: &Rc<Env>) -> Result<Value, Unwind> {
        match expr {
            Expr::Nil => Ok(Value::Nil),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Var(name) => self.lookup(name, env),
            Expr::Assign(name, rhs) => {
                let v = self.eval_expr(rhs, env)?;
                let found = match self.locals.get(&name.id) {
                    Some(&distance) => env.set_at(distance, &name.sym, v.clone()),
                    None => self.globals.set_at(0, &name.sym, v.clone()),
                };
                if found {
                    Ok(v)
                } else {
                    Err(self.undefined_variable(name))
                }
            }
            Expr::Not(e) => {
                let v = self.eval_expr(e, env)?;
                Ok(Value::Bool(!v.is_truthy()))
            }
            Expr::Neg(e, pos) => match self.eval_expr(e, env)? {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(RuntimeError::new(*pos, RuntimeErrorKind::NegOperandNotNumber).into()),
            },
            Expr::Add(lhs, rhs, pos) => {
                let l = self.eval_expr(lhs, env)?;
                let r = self.eval_expr(rhs, env)?;
                match (l, r) {
                    (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l + r)),
                    (Value::Str(l), Value::Str(r)) => {
                        Ok(Value::Str(Rc::from(format!("{}{}", l, r))))
                    }
                    _ => Err(
                        RuntimeError::new(*pos, RuntimeErrorKind::AddOperandsMismatch).into(),
                    ),
                }
            }
            Expr::Sub(lhs, rhs, pos) => self.num_binop(lhs, rhs, env, *pos, "-", |l, r| l - r),
            Expr::Mul(lhs, rhs, pos) => self.num_binop(lhs, rhs, env, *pos, "*", |l, r| l * r),
            Expr::Div(lhs, rhs, pos) => self.num_binop(lhs, rhs, env, *pos, "/", |l, r| l / r),
            Expr::Less(lhs, rhs, pos) => self.num_cmp(lhs, rhs, env, *pos, "<", |l, r| l < r),
            Expr::LessEqual(lhs, rhs, pos) => {
                self.num_cmp(lhs, rhs, env, *pos, "<=", |l, r| l <= r)
            }
            Expr::Greater(lhs, rhs, pos) => {
                self.num_cmp(lhs, rhs, env, *pos, ">", |l, r| l > r)
            }
            Expr::GreaterEqual(lhs, rhs, pos) => {
                self.num_cmp(lhs, rhs, env, *pos, ">=", |l, r| l >= r)
            }
            Expr::Equal(lhs, rhs) => {
                let l = self.eval_expr(lhs, env)?;
                let r = self.eval_expr(rhs, env)?;
                Ok(Value::Bool(l == r))
            }
            Expr::NotEqual(lhs, rhs) => {
                let l = self.eval_expr(lhs, env)?;
                let r = self.eval_expr(rhs, env)?;
                Ok(Value::Bool(l != r))
            }
            Expr::And(lhs, rhs) => {
                let l = self.eval_expr(lhs, env)?;
                if l.is_truthy() {
                    self.eval_expr(rhs, env)
                } else {
                    Ok(l)
                }
            }
            Expr::Or(lhs, rhs) => {
                let l = self.eval_expr(lhs, env)?;
                if l.is_truthy() {
                    Ok(l)
                } else {
                    self.eval_expr(rhs, env)
                }
            }
            Expr::Group(e) => self.eval_expr(e, env),
            Expr::Call(callee, args, pos) => {
                let callee = self.eval_expr(callee, env)?;
                let mut evaluated = Vec::with_capacity(args.len());
                for arg in args {
                    evaluated.push(self.eval_expr(arg, env)?);
                }
                match callee {
                    Value::Function(f) => self.call_function(&f, evaluated, *pos),
                    Value::Class(c) => self.instantiate(&c, evaluated, *pos),
                    _ => Err(RuntimeError::new(*pos, RuntimeErrorKind::NotCallable).into()),
                }
            }
            Expr::Get(object, name, pos) => {
                let object = self.eval_expr(object, env)?;
                let instance = match object {
                    Value::Instance(instance) => instance,
                    _ => {
                        return Err(
                            RuntimeError::new(*pos, RuntimeErrorKind::NotAnInstance).into()
                        );
                    }
                };
                if let Some(v) = instance.get_field(name) {
                    return Ok(v);
                }
                if let Some(method) = instance.class.find_method(name) {
                    let bound =
                        method.bind(&self.ctx.sym_this(), Value::Instance(instance.clone()));
                    return Ok(Value::Function(Rc::new(bound)));
                }
                Err(RuntimeError::new(
                    *pos,
                    RuntimeErrorKind::UndefinedProperty(name.name().to_owned()),
                )
                .into())
            }
            Expr::Set(object, name, value, pos) => {
                let object = self.eval_expr(object, env)?;
                let instance = match object {
                    Value::Instance(instance) => instance,
                    _ => {
                        return Err(
                            RuntimeError::new(*pos, RuntimeErrorKind::NotAnInstance).into()
                        );
                    }
                };
                let v = self.eval_expr(value, env)?;
                instance.set_field(name, v.clone());
                Ok(v)
            }
            Expr::This(keyword) => self.lookup(keyword, env),
            Expr::Super(keyword, method) => self.eval_super(keyword, method, env),
        }
    }

    /// `super.method`: the superclass sits at the resolved distance, the
    /// receiver one scope beneath it.
    fn eval_super(
        &mut self,
        keyword: &NameRef,
        method: &Symbol,
        env: &Rc<Env>,
    ) -> Result<Value, Unwind> {
        let distance = match self.locals.get(&keyword.id) {
            Some(&d) => d,
            None => return Err(self.undefined_variable(keyword)),
        };
        let superclass = match env.get_at(distance, &keyword.sym) {
            Some(Value::Class(c)) => c,
            _ => return Err(self.undefined_variable(keyword)),
        };
        let receiver = distance
            .checked_sub(1)
            .and_then(|d| env.get_at(d, &self.ctx.sym_this()));
        let receiver = match receiver {
            Some(v) => v,
            None => return Err(self.undefined_variable(keyword)),
        };
        match superclass.find_method(method) {
            Some(m) => Ok(Value::Function(Rc::new(
                m.bind(&self.ctx.sym_this(), receiver),
            ))),
            None => Err(RuntimeError::new(
                keyword.pos,
                RuntimeErrorKind::UndefinedProperty(method.name().to_owned()),
            )
            .into()),
        }
    }

    /// Resolve a name: locally at the recorded distance, globally
    /// otherwise.
    fn lookup(&self, name: &NameRef, env: &Rc<Env>) -> Result<Value, Unwind> {
        let v = match self.locals.get(&name.id) {
            Some(&distance) => env.get_at(distance, &name.sym),
            None => self.globals.get_at(0, &name.sym),
        };
        v.ok_or_else(|| self.undefined_variable(name))
    }

    fn undefined_variable(&self, name: &NameRef) -> Unwind {
        RuntimeError::new(
            name.pos,
            RuntimeErrorKind::UndefinedVariable(name.sym.name().to_owned()),
        )
        .into()
    }

    fn num_binop(
        &mut self,
        lhs: &Expr,
        rhs: &Expr,
        env: &Rc<Env>,
        pos: Position,
        op: &'static str,
        f: fn(f64, f64) -> f64,
    ) -> Result<Value, Unwind> {
        let l = self.eval_expr(lhs, env)?;
        let r = self.eval_expr(rhs, env)?;
        match (l, r) {
            (Value::Number(l), Value::Number(r)) => Ok(Value::Number(f(l, r))),
            _ => Err(
                RuntimeError::new(pos, RuntimeErrorKind::NumberOperandsRequired(op)).into(),
            ),
        }
    }

    fn num_cmp(
        &mut self,
        lhs: &Expr,
        rhs: &Expr,
        env: &Rc<Env>,
        pos: Position,
        op: &'static str,
        f: fn(f64, f64) -> bool,
    ) -> Result<Value, Unwind> {
        let l = self.eval_expr(lhs, env)?;
        let r = self.eval_expr(rhs, env)?;
        match (l, r) {
            (Value::Number(l), Value::Number(r)) => Ok(Value::Bool(f(l, r))),
            _ => Err(
                RuntimeError::new(pos, RuntimeErrorKind::NumberOperandsRequired(op)).into(),
            ),
        }
    }

    /// Invoke a callable with already-evaluated arguments.  The argument
    /// count must match the arity exactly, on either side.
    fn call_function(
        &mut self,
        fun: &Function,
        args: Vec<Value>,
        pos: Position,
    ) -> Result<Value, Unwind> {
        if args.len() > fun.arity {
            return Err(RuntimeError::new(pos, RuntimeErrorKind::TooManyArguments).into());
        }
        if args.len() < fun.arity {
            return Err(RuntimeError::new(pos, RuntimeErrorKind::TooFewArguments).into());
        }
        match &fun.body {
            FunctionBody::Builtin(body) => {
                body(&args).map_err(|kind| RuntimeError::new(pos, kind).into())
            }
            FunctionBody::User {
                def,
                closure,
                is_initializer,
            } => {
                trace!("calling <fn {}>", fun.name);
                let frame = Env::with_parent(closure.clone());
                for (param, arg) in def.params.iter().zip(args) {
                    frame.define(param, arg);
                }
                match self.eval_stmts(&def.body, &frame) {
                    Ok(()) => {
                        if *is_initializer {
                            Ok(self.init_receiver(closure))
                        } else {
                            Ok(Value::Nil)
                        }
                    }
                    Err(Unwind::Return { value, pos: ret_pos }) => {
                        if *is_initializer {
                            match value {
                                Some(_) => Err(RuntimeError::new(
                                    ret_pos,
                                    RuntimeErrorKind::ReturnValueFromInit,
                                )
                                .into()),
                                None => Ok(self.init_receiver(closure)),
                            }
                        } else {
                            Ok(value.unwrap_or(Value::Nil))
                        }
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }

    /// An initializer always yields its receiver, which was bound as
    /// `this` directly in the initializer's closure.
    fn init_receiver(&self, closure: &Rc<Env>) -> Value {
        closure
            .get_at(0, &self.ctx.sym_this())
            .unwrap_or(Value::Nil)
    }

    /// Calling a class allocates an instance and runs `init` on it when
    /// one is declared anywhere up the inheritance chain.
    fn instantiate(
        &mut self,
        class: &Rc<Class>,
        args: Vec<Value>,
        pos: Position,
    ) -> Result<Value, Unwind> {
        let init_sym = self.ctx.sym_init();
        let arity = class.arity(&init_sym);
        if args.len() > arity {
            return Err(RuntimeError::new(pos, RuntimeErrorKind::TooManyArguments).into());
        }
        if args.len() < arity {
            return Err(RuntimeError::new(pos, RuntimeErrorKind::TooFewArguments).into());
        }
        let instance = Instance::new(class.clone());
        if let Some(init) = class.find_method(&init_sym) {
            let bound = init.bind(&self.ctx.sym_this(), Value::Instance(instance.clone()));
            self.call_function(&bound, args, pos)?;
        }
        Ok(Value::Instance(instance))
    }
}

type Builtin = fn(&[Value]) -> Result<Value, RuntimeErrorKind>;

const BUILTINS: &[(&str, usize, Builtin)] = &[
    ("clock", 0, builtin_clock),
    ("sleep", 1, builtin_sleep),
];

fn builtin_clock(_args: &[Value]) -> Result<Value, RuntimeErrorKind> {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => Ok(Value::Number(elapsed.as_secs_f64())),
        Err(e) => Err(RuntimeErrorKind::Io(e.to_string())),
    }
}

fn builtin_sleep(args: &[Value]) -> Result<Value, RuntimeErrorKind> {
    match args[0] {
        Value::Number(secs) if secs >= 0.0 && secs.is_finite() => {
            thread::sleep(Duration::from_secs_f64(secs));
            Ok(Value::Nil)
        }
        _ => Err(RuntimeErrorKind::BadSleepArgument),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos() -> Position {
        Position::new(1, 1)
    }

    fn num(n: f64) -> Box<Expr> {
        Box::new(Expr::Number(n))
    }

    fn nref(ctx: &Context, name: &str, id: ExprId) -> NameRef {
        NameRef {
            sym: ctx.symbol(name),
            pos: pos(),
            id,
        }
    }

    fn eval_expr(expr: &Expr) -> Result<Value, RuntimeError> {
        let ctx = Context::new();
        eval_expr_with_ctx(ctx, expr)
    }

    fn eval_expr_with_ctx(ctx: Rc<Context>, expr: &Expr) -> Result<Value, RuntimeError> {
        let mut out: Vec<u8> = Vec::new();
        let mut evaluator = Evaluator::new(&mut out, ctx);
        let globals = evaluator.globals.clone();
        let val = evaluator.eval_expr(expr, &globals).map_err(|e| match e {
            Unwind::Err(e) => e,
            Unwind::Return { .. } => panic!("unexpected return"),
        })?;
        assert!(out.is_empty());
        Ok(val)
    }

    fn eval_prg(prg: &[Stmt]) -> Result<String, RuntimeError> {
        let ctx = Context::new();
        eval_prg_with_ctx(ctx, prg)
    }

    fn eval_prg_with_ctx(ctx: Rc<Context>, prg: &[Stmt]) -> Result<String, RuntimeError> {
        let mut out: Vec<u8> = Vec::new();
        let mut e = Evaluator::new(&mut out, ctx.clone());
        e.globals.define(
            &ctx.symbol("__test_ultimate_answer__"),
            Value::Function(Rc::new(Function::builtin(
                ctx.symbol("__test_ultimate_answer__"),
                0,
                |_| Ok(Value::Number(42.0)),
            ))),
        );
        e.eval_program(prg)?;
        Ok(String::from_utf8(out).expect("error while converting output"))
    }

    #[test]
    fn literals() -> Result<(), RuntimeError> {
        assert_eq!(eval_expr(&Expr::Number(1.0))?, Value::Number(1.0));
        assert_eq!(eval_expr(&Expr::Nil)?, Value::Nil);
        assert_eq!(
            eval_expr(&Expr::Str(Rc::from("hi")))?,
            Value::Str(Rc::from("hi"))
        );
        Ok(())
    }

    #[test]
    fn unary_minus() -> Result<(), RuntimeError> {
        assert_eq!(
            eval_expr(&Expr::Neg(num(1.0), pos()))?,
            Value::Number(-1.0)
        );
        Ok(())
    }

    #[test]
    fn unary_minus_on_bool() {
        match eval_expr(&Expr::Neg(Box::new(Expr::Bool(true)), pos())) {
            Err(RuntimeError {
                kind: RuntimeErrorKind::NegOperandNotNumber,
                ..
            }) => (),
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn logical_not_uses_truthiness() -> Result<(), RuntimeError> {
        assert_eq!(
            eval_expr(&Expr::Not(Box::new(Expr::Bool(true))))?,
            Value::Bool(false)
        );
        assert_eq!(eval_expr(&Expr::Not(Box::new(Expr::Nil)))?, Value::Bool(true));
        // 0 and "" are truthy
        assert_eq!(eval_expr(&Expr::Not(num(0.0)))?, Value::Bool(false));
        assert_eq!(
            eval_expr(&Expr::Not(Box::new(Expr::Str(Rc::from("")))))?,
            Value::Bool(false)
        );
        Ok(())
    }

    #[test]
    fn arithmetic() -> Result<(), RuntimeError> {
        assert_eq!(
            eval_expr(&Expr::Add(num(1.0), num(2.0), pos()))?,
            Value::Number(3.0)
        );
        assert_eq!(
            eval_expr(&Expr::Sub(num(1.0), num(3.0), pos()))?,
            Value::Number(-2.0)
        );
        assert_eq!(
            eval_expr(&Expr::Mul(num(2.0), num(3.0), pos()))?,
            Value::Number(6.0)
        );
        assert_eq!(
            eval_expr(&Expr::Div(num(6.0), num(2.0), pos()))?,
            Value::Number(3.0)
        );
        Ok(())
    }

    #[test]
    fn nested_arithmetic() -> Result<(), RuntimeError> {
        assert_eq!(
            eval_expr(&Expr::Add(
                num(1.0),
                Box::new(Expr::Mul(num(2.0), num(3.0), pos())),
                pos()
            ))?,
            Value::Number(7.0)
        );
        Ok(())
    }

    #[test]
    fn string_concatenation() -> Result<(), RuntimeError> {
        assert_eq!(
            eval_expr(&Expr::Add(
                Box::new(Expr::Str(Rc::from("hi"))),
                Box::new(Expr::Str(Rc::from(" there"))),
                pos()
            ))?,
            Value::Str(Rc::from("hi there"))
        );
        Ok(())
    }

    #[test]
    fn adding_number_and_string_fails() {
        match eval_expr(&Expr::Add(
            num(1.0),
            Box::new(Expr::Str(Rc::from("a"))),
            pos(),
        )) {
            Err(RuntimeError {
                kind: RuntimeErrorKind::AddOperandsMismatch,
                ..
            }) => (),
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn comparisons() -> Result<(), RuntimeError> {
        assert_eq!(
            eval_expr(&Expr::Less(num(1.0), num(2.0), pos()))?,
            Value::Bool(true)
        );
        assert_eq!(
            eval_expr(&Expr::LessEqual(num(2.0), num(2.0), pos()))?,
            Value::Bool(true)
        );
        assert_eq!(
            eval_expr(&Expr::Greater(num(1.0), num(2.0), pos()))?,
            Value::Bool(false)
        );
        assert_eq!(
            eval_expr(&Expr::GreaterEqual(num(1.0), num(2.0), pos()))?,
            Value::Bool(false)
        );
        Ok(())
    }

    #[test]
    fn comparing_non_numbers_fails() {
        match eval_expr(&Expr::Less(
            Box::new(Expr::Str(Rc::from("a"))),
            Box::new(Expr::Str(Rc::from("b"))),
            pos(),
        )) {
            Err(RuntimeError {
                kind: RuntimeErrorKind::NumberOperandsRequired("<"),
                ..
            }) => (),
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn equality_across_kinds() -> Result<(), RuntimeError> {
        assert_eq!(
            eval_expr(&Expr::Equal(num(2.0), num(2.0)))?,
            Value::Bool(true)
        );
        assert_eq!(
            eval_expr(&Expr::Equal(
                Box::new(Expr::Str(Rc::from("a"))),
                Box::new(Expr::Str(Rc::from("a")))
            ))?,
            Value::Bool(true)
        );
        // Different kinds are never equal, and never an error.
        assert_eq!(
            eval_expr(&Expr::Equal(num(1.0), Box::new(Expr::Bool(true))))?,
            Value::Bool(false)
        );
        assert_eq!(
            eval_expr(&Expr::NotEqual(num(1.0), Box::new(Expr::Nil)))?,
            Value::Bool(true)
        );
        Ok(())
    }

    #[test]
    fn division_by_zero_yields_infinity() -> Result<(), RuntimeError> {
        match eval_expr(&Expr::Div(num(1.0), num(0.0), pos()))? {
            Value::Number(n) => assert!(n.is_infinite()),
            out => panic!("unexpected output: {:?}", out),
        }
        Ok(())
    }

    #[test]
    fn logical_operators_return_the_deciding_operand() -> Result<(), RuntimeError> {
        assert_eq!(
            eval_expr(&Expr::Or(Box::new(Expr::Str(Rc::from("l"))), num(2.0)))?,
            Value::Str(Rc::from("l"))
        );
        assert_eq!(
            eval_expr(&Expr::Or(Box::new(Expr::Bool(false)), num(2.0)))?,
            Value::Number(2.0)
        );
        assert_eq!(
            eval_expr(&Expr::And(Box::new(Expr::Nil), num(2.0)))?,
            Value::Nil
        );
        assert_eq!(
            eval_expr(&Expr::And(Box::new(Expr::Bool(true)), num(2.0)))?,
            Value::Number(2.0)
        );
        Ok(())
    }

    #[test]
    fn short_circuit_skips_right_operand() -> Result<(), RuntimeError> {
        // The right operand would assign; check it never ran.
        let ctx = Context::new();
        let prg = vec![
            Stmt::VarDecl(ctx.symbol("a"), Some(num(0.0))),
            Stmt::Expr(Box::new(Expr::And(
                Box::new(Expr::Bool(false)),
                Box::new(Expr::Assign(nref(&ctx, "a", 0), num(1.0))),
            ))),
            Stmt::Expr(Box::new(Expr::Or(
                Box::new(Expr::Bool(true)),
                Box::new(Expr::Assign(nref(&ctx, "a", 1), num(2.0))),
            ))),
            Stmt::Print(Box::new(Expr::Var(nref(&ctx, "a", 2))), pos()),
        ];
        assert_eq!(eval_prg_with_ctx(ctx, &prg)?, "0\n");
        Ok(())
    }

    #[test]
    fn print_stmt() -> Result<(), RuntimeError> {
        assert_eq!(eval_prg(&[Stmt::Print(num(42.0), pos())])?, "42\n");
        Ok(())
    }

    #[test]
    fn set_and_get_global_var() -> Result<(), RuntimeError> {
        let ctx = Context::new();
        let prg = vec![
            Stmt::VarDecl(ctx.symbol("foo"), Some(num(42.0))),
            Stmt::Print(Box::new(Expr::Var(nref(&ctx, "foo", 0))), pos()),
        ];
        assert_eq!(eval_prg_with_ctx(ctx, &prg)?, "42\n");
        Ok(())
    }

    #[test]
    fn var_without_initializer_is_nil() -> Result<(), RuntimeError> {
        let ctx = Context::new();
        let prg = vec![
            Stmt::VarDecl(ctx.symbol("foo"), None),
            Stmt::Print(Box::new(Expr::Var(nref(&ctx, "foo", 0))), pos()),
        ];
        assert_eq!(eval_prg_with_ctx(ctx, &prg)?, "nil\n");
        Ok(())
    }

    #[test]
    fn assign_to_unknown_var() {
        let ctx = Context::new();
        let prg = vec![Stmt::Expr(Box::new(Expr::Assign(
            nref(&ctx, "foo", 0),
            num(42.0),
        )))];
        match eval_prg_with_ctx(ctx, &prg) {
            Err(RuntimeError {
                kind: RuntimeErrorKind::UndefinedVariable(name),
                ..
            }) if name == "foo" => (),
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn read_unknown_var() {
        let ctx = Context::new();
        let prg = vec![Stmt::Print(Box::new(Expr::Var(nref(&ctx, "foo", 0))), pos())];
        match eval_prg_with_ctx(ctx, &prg) {
            Err(RuntimeError {
                kind: RuntimeErrorKind::UndefinedVariable(name),
                ..
            }) if name == "foo" => (),
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn call_builtin_function() -> Result<(), RuntimeError> {
        let ctx = Context::new();
        let prg = vec![Stmt::Print(
            Box::new(Expr::Call(
                Box::new(Expr::Var(nref(&ctx, "__test_ultimate_answer__", 0))),
                vec![],
                pos(),
            )),
            pos(),
        )];
        assert_eq!(eval_prg_with_ctx(ctx, &prg)?, "42\n");
        Ok(())
    }

    #[test]
    fn call_with_too_many_arguments() {
        let ctx = Context::new();
        let prg = vec![Stmt::Expr(Box::new(Expr::Call(
            Box::new(Expr::Var(nref(&ctx, "__test_ultimate_answer__", 0))),
            vec![Expr::Bool(true)],
            pos(),
        )))];
        match eval_prg_with_ctx(ctx, &prg) {
            Err(RuntimeError {
                kind: RuntimeErrorKind::TooManyArguments,
                ..
            }) => (),
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn call_with_too_few_arguments() {
        let ctx = Context::new();
        let prg = vec![Stmt::Expr(Box::new(Expr::Call(
            Box::new(Expr::Var(nref(&ctx, "sleep", 0))),
            vec![],
            pos(),
        )))];
        match eval_prg_with_ctx(ctx, &prg) {
            Err(RuntimeError {
                kind: RuntimeErrorKind::TooFewArguments,
                ..
            }) => (),
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn calling_a_number_fails() {
        let prg = vec![Stmt::Expr(Box::new(Expr::Call(num(1.0), vec![], pos())))];
        match eval_prg(&prg) {
            Err(RuntimeError {
                kind: RuntimeErrorKind::NotCallable,
                ..
            }) => (),
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn sleep_rejects_negative_seconds() {
        let ctx = Context::new();
        let prg = vec![Stmt::Expr(Box::new(Expr::Call(
            Box::new(Expr::Var(nref(&ctx, "sleep", 0))),
            vec![Expr::Number(-1.0)],
            pos(),
        )))];
        match eval_prg_with_ctx(ctx, &prg) {
            Err(RuntimeError {
                kind: RuntimeErrorKind::BadSleepArgument,
                ..
            }) => (),
            out => panic!("unexpected output: {:?}", out),
        }
    }

    #[test]
    fn clock_returns_a_number() -> Result<(), RuntimeError> {
        match builtin_clock(&[]).map_err(|kind| RuntimeError::new(pos(), kind))? {
            Value::Number(n) => assert!(n > 0.0),
            out => panic!("unexpected output: {:?}", out),
        }
        Ok(())
    }

    #[test]
    fn return_at_top_level_is_an_error() {
        let prg = vec![Stmt::Return(None, pos())];
        match eval_prg(&prg) {
            Err(RuntimeError {
                kind: RuntimeErrorKind::TopLevelReturn,
                ..
            }) => (),
            out => panic!("unexpected output: {:?}", out),
        }
    }
}
