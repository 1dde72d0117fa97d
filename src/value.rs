//! Runtime values and the callable object model.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::FunDef;
use crate::ctx::Symbol;
use crate::diag::RuntimeErrorKind;
use crate::env::Env;

#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Function(Rc<Function>),
    Class(Rc<Class>),
    Instance(Rc<Instance>),
}

impl Value {
    /// `nil` and `false` are falsy, every other value is truthy,
    /// including `0` and `""`.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }
}

/// Value equality: operands of the same kind compare by value, callables
/// and instances by identity, operands of different kinds are never equal.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(l), Value::Bool(r)) => l == r,
            (Value::Number(l), Value::Number(r)) => l == r,
            (Value::Str(l), Value::Str(r)) => l == r,
            (Value::Function(l), Value::Function(r)) => Rc::ptr_eq(l, r),
            (Value::Class(l), Value::Class(r)) => Rc::ptr_eq(l, r),
            (Value::Instance(l), Value::Instance(r)) => Rc::ptr_eq(l, r),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
            Value::Function(fun) => write!(f, "<fn {}>", fun.name),
            Value::Class(class) => write!(f, "{}", class.name),
            Value::Instance(instance) => write!(f, "{} instance", instance.class.name),
        }
    }
}

pub struct Function {
    pub name: Symbol,
    pub arity: usize,
    pub body: FunctionBody,
}

pub enum FunctionBody {
    Builtin(fn(&[Value]) -> Result<Value, RuntimeErrorKind>),
    User {
        def: Rc<FunDef>,
        closure: Rc<Env>,
        is_initializer: bool,
    },
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

impl Function {
    pub fn builtin(
        name: Symbol,
        arity: usize,
        body: fn(&[Value]) -> Result<Value, RuntimeErrorKind>,
    ) -> Function {
        Function {
            name,
            arity,
            body: FunctionBody::Builtin(body),
        }
    }

    pub fn user(def: Rc<FunDef>, closure: Rc<Env>, is_initializer: bool) -> Function {
        Function {
            name: def.name.clone(),
            arity: def.params.len(),
            body: FunctionBody::User {
                def,
                closure,
                is_initializer,
            },
        }
    }

    /// Pair a method with a receiver: the bound copy closes over a fresh
    /// environment where `this` names the receiver.
    pub fn bind(&self, this_sym: &Symbol, receiver: Value) -> Function {
        match &self.body {
            FunctionBody::User {
                def,
                closure,
                is_initializer,
            } => {
                let env = Env::with_parent(closure.clone());
                env.define(this_sym, receiver);
                Function {
                    name: self.name.clone(),
                    arity: self.arity,
                    body: FunctionBody::User {
                        def: def.clone(),
                        closure: env,
                        is_initializer: *is_initializer,
                    },
                }
            }
            // Builtins never sit in a method table; binding one is a no-op.
            FunctionBody::Builtin(body) => Function {
                name: self.name.clone(),
                arity: self.arity,
                body: FunctionBody::Builtin(*body),
            },
        }
    }
}

#[derive(Debug)]
pub struct Class {
    pub name: Symbol,
    pub superclass: Option<Rc<Class>>,
    pub methods: HashMap<Symbol, Rc<Function>>,
}

impl Class {
    /// Look a method up on this class or the nearest ancestor declaring it.
    pub fn find_method(&self, name: &Symbol) -> Option<Rc<Function>> {
        self.methods.get(name).cloned().or_else(|| {
            self.superclass
                .as_ref()
                .and_then(|superclass| superclass.find_method(name))
        })
    }

    /// Calling a class takes as many arguments as its initializer, or none.
    pub fn arity(&self, init_sym: &Symbol) -> usize {
        self.find_method(init_sym).map_or(0, |init| init.arity)
    }
}

#[derive(Debug)]
pub struct Instance {
    pub class: Rc<Class>,
    fields: RefCell<HashMap<Symbol, Value>>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Rc<Instance> {
        Rc::new(Instance {
            class,
            fields: RefCell::new(HashMap::new()),
        })
    }

    pub fn get_field(&self, name: &Symbol) -> Option<Value> {
        self.fields.borrow().get(name).cloned()
    }

    pub fn set_field(&self, name: &Symbol, val: Value) {
        self.fields.borrow_mut().insert(name.clone(), val);
    }
}
