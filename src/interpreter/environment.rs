use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::value::Value;

/// One variable frame with an optional lexical parent. Blocks, loop
/// iterations and calls each run in their own frame; a closure declared
/// inside a block keeps that frame alive through its captured environment,
/// so the bindings it closed over survive the block's exit.
///
/// A closure stored in the frame it captured forms an Rc cycle; script runs
/// are short-lived processes and the cycle is left uncollected.
#[derive(Debug, Clone)]
pub struct Environment {
    vars: Rc<RefCell<HashMap<String, Value>>>,
    parent: Option<Rc<Environment>>,
}

impl Environment {
    pub fn new() -> Self {
        Self {
            vars: Rc::new(RefCell::new(HashMap::new())),
            parent: None,
        }
    }

    pub fn with_parent(parent: Rc<Environment>) -> Self {
        Self {
            vars: Rc::new(RefCell::new(HashMap::new())),
            parent: Some(parent),
        }
    }

    /// Declare a variable in this frame, shadowing any outer binding with
    /// the same name.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.vars.borrow_mut().insert(name.into(), value);
    }

    /// Look a name up in this frame, then through the parent chain.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.vars.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|parent| parent.get(name))
    }

    /// Overwrite an existing binding wherever it lives. Returns false when
    /// the name is not bound anywhere; the evaluator turns that into
    /// NOT_FOUND_ERROR.
    pub fn assign(&self, name: &str, value: Value) -> bool {
        if self.vars.borrow().contains_key(name) {
            self.vars.borrow_mut().insert(name.to_string(), value);
            return true;
        }
        match &self.parent {
            Some(parent) => parent.assign(name, value),
            None => false,
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
