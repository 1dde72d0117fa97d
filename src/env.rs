//! Lexical environment chain.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::ctx::Symbol;
use crate::value::Value;

/// A node in the scope chain: a mutable name→value table plus a link to
/// the enclosing node.  Access is by resolved distance: the caller names
/// exactly which node holds the binding, and only that node is consulted.
#[derive(Debug)]
pub struct Env {
    parent: Option<Rc<Env>>,
    bindings: RefCell<HashMap<Symbol, Value>>,
}

impl Env {
    pub fn new() -> Rc<Env> {
        Rc::new(Env {
            parent: None,
            bindings: RefCell::new(HashMap::new()),
        })
    }

    pub fn with_parent(parent: Rc<Env>) -> Rc<Env> {
        Rc::new(Env {
            parent: Some(parent),
            bindings: RefCell::new(HashMap::new()),
        })
    }

    /// Create or overwrite a binding in this node.
    pub fn define(&self, sym: &Symbol, val: Value) {
        self.bindings.borrow_mut().insert(sym.clone(), val);
    }

    /// Read a binding after walking exactly `distance` parent links.
    /// Only the node at that distance is consulted.
    pub fn get_at(&self, distance: usize, sym: &Symbol) -> Option<Value> {
        match distance {
            0 => self.bindings.borrow().get(sym).cloned(),
            _ => self.parent.as_ref()?.get_at(distance - 1, sym),
        }
    }

    /// Assign to an existing binding after walking exactly `distance`
    /// parent links.  Returns false when no such binding exists.
    pub fn set_at(&self, distance: usize, sym: &Symbol, val: Value) -> bool {
        match distance {
            0 => match self.bindings.borrow_mut().get_mut(sym) {
                Some(slot) => {
                    *slot = val;
                    true
                }
                None => false,
            },
            _ => match &self.parent {
                Some(parent) => parent.set_at(distance - 1, sym, val),
                None => false,
            },
        }
    }
}
