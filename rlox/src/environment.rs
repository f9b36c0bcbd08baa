use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::LoxError;
use crate::token::Token;
use crate::value::Value;

/// One frame of the environment chain: a name→value map plus a pointer to
/// the enclosing frame. Closures hold `Rc` handles to the frame they were
/// declared in, so writes through any holder are visible to all.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Self {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Write into the current frame, shadowing any outer binding.
    pub fn define(&mut self, name: String, value: Value) {
        self.values.insert(name, value);
    }

    /// Walk outward; first frame with the key wins.
    pub fn get(&self, name: &str, site: &Token) -> Result<Value, LoxError> {
        if let Some(value) = self.values.get(name) {
            return Ok(value.clone());
        }

        if let Some(enclosing) = &self.enclosing {
            return enclosing.borrow().get(name, site);
        }

        Err(LoxError::runtime(
            format!("Undefined variable '{}'.", name),
            site,
        ))
    }

    /// Walk outward and overwrite the first frame containing the key.
    /// Assignment never creates a binding.
    pub fn assign(&mut self, name: &str, value: Value, site: &Token) -> Result<(), LoxError> {
        if self.values.contains_key(name) {
            self.values.insert(name.to_string(), value);
            return Ok(());
        }

        if let Some(enclosing) = &self.enclosing {
            return enclosing.borrow_mut().assign(name, value, site);
        }

        Err(LoxError::runtime(
            format!("Undefined variable '{}'.", name),
            site,
        ))
    }

    /// Read from the frame exactly `distance` hops outward. The distance
    /// comes from the resolver; a chain shorter than the distance is a
    /// resolver/interpreter mismatch and reported rather than misread.
    pub fn get_at(&self, distance: usize, name: &str, site: &Token) -> Result<Value, LoxError> {
        if distance == 0 {
            return match self.values.get(name) {
                Some(value) => Ok(value.clone()),
                None => Err(LoxError::runtime(
                    format!("Undefined variable '{}'.", name),
                    site,
                )),
            };
        }

        match &self.enclosing {
            Some(enclosing) => enclosing.borrow().get_at(distance - 1, name, site),
            None => Err(LoxError::runtime(
                format!("Resolved variable '{}' is out of scope.", name),
                site,
            )),
        }
    }

    /// Write into the frame exactly `distance` hops outward.
    pub fn assign_at(
        &mut self,
        distance: usize,
        name: &str,
        value: Value,
        site: &Token,
    ) -> Result<(), LoxError> {
        if distance == 0 {
            if self.values.contains_key(name) {
                self.values.insert(name.to_string(), value);
                return Ok(());
            }
            return Err(LoxError::runtime(
                format!("Undefined variable '{}'.", name),
                site,
            ));
        }

        match &self.enclosing {
            Some(enclosing) => enclosing
                .borrow_mut()
                .assign_at(distance - 1, name, value, site),
            None => Err(LoxError::runtime(
                format!("Resolved variable '{}' is out of scope.", name),
                site,
            )),
        }
    }

    /// Every name visible from this frame outward, for REPL completion.
    pub fn variable_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.values.keys().cloned().collect();

        if let Some(enclosing) = &self.enclosing {
            for name in enclosing.borrow().variable_names() {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }

        names
    }
}
