use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use crate::ast::Stmt;
use crate::environment::Environment;
use crate::token::{Literal, Token};
use crate::INITIALIZER_NAME;

/// A runtime value. Literals compare by value; functions, classes,
/// instances, lists and dicts compare by identity.
#[derive(Debug, Clone)]
pub enum Value {
    Literal(Literal),
    Function(Rc<Function>),
    Class(Rc<LoxClass>),
    Instance(Rc<Instance>),
    List(Rc<RefCell<Vec<Value>>>),
    Dict(Rc<RefCell<BTreeMap<String, Value>>>),
}

impl Value {
    pub fn nil() -> Self {
        Value::Literal(Literal::Nil)
    }

    pub fn number(n: f64) -> Self {
        Value::Literal(Literal::Number(n))
    }

    pub fn bool(b: bool) -> Self {
        Value::Literal(Literal::Bool(b))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::Literal(Literal::String(s.into()))
    }

    /// Only `nil` and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Literal(Literal::Nil) => false,
            Value::Literal(Literal::Bool(b)) => *b,
            _ => true,
        }
    }
}

#[derive(Debug)]
pub enum Function {
    Lox(LoxFunction),
    Native(NativeFunction),
}

impl Function {
    pub fn arity(&self) -> usize {
        match self {
            Function::Lox(f) => f.params.len(),
            Function::Native(f) => f.arity,
        }
    }
}

/// A user-declared function or method, carrying the environment captured at
/// its declaration site.
#[derive(Clone)]
pub struct LoxFunction {
    pub name: Token,
    pub params: Vec<Token>,
    pub body: Rc<Vec<Stmt>>,
    pub closure: Rc<RefCell<Environment>>,
    pub is_initializer: bool,
}

impl LoxFunction {
    /// Produce a copy whose closure is a one-frame extension of the
    /// original, with `this` bound to the instance.
    pub fn bind(&self, instance: &Rc<Instance>) -> LoxFunction {
        let env = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
            &self.closure,
        ))));
        env.borrow_mut()
            .define("this".to_string(), Value::Instance(Rc::clone(instance)));
        LoxFunction {
            name: self.name.clone(),
            params: self.params.clone(),
            body: Rc::clone(&self.body),
            closure: env,
            is_initializer: self.is_initializer,
        }
    }
}

// The closure handle would drag the whole environment chain (and, through
// it, every cycle of class -> method -> closure -> class) into Debug
// output, so only the shape is shown.
impl fmt::Debug for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxFunction")
            .field("name", &self.name.lexeme)
            .field("params", &self.params.len())
            .field("is_initializer", &self.is_initializer)
            .finish()
    }
}

pub struct NativeFunction {
    pub name: String,
    pub arity: usize,
    pub func: fn(&[Value]) -> Result<Value, String>,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

#[derive(Debug)]
pub struct LoxClass {
    pub name: String,
    pub superclass: Option<Rc<LoxClass>>,
    pub methods: HashMap<String, LoxFunction>,
}

impl LoxClass {
    /// Method lookup walks the inheritance chain, nearest class first.
    pub fn find_method(&self, name: &str) -> Option<&LoxFunction> {
        if let Some(method) = self.methods.get(name) {
            return Some(method);
        }
        match &self.superclass {
            Some(superclass) => superclass.find_method(name),
            None => None,
        }
    }

    /// A class's call arity is its initializer's arity, 0 when absent.
    pub fn arity(&self) -> usize {
        self.find_method(INITIALIZER_NAME)
            .map_or(0, |init| init.params.len())
    }
}

pub struct Instance {
    pub class: Rc<LoxClass>,
    fields: RefCell<HashMap<String, Value>>,
}

impl Instance {
    pub fn new(class: Rc<LoxClass>) -> Rc<Instance> {
        Rc::new(Instance {
            class,
            fields: RefCell::new(HashMap::new()),
        })
    }

    /// Field lookup only; method lookup and binding happen at the `get`
    /// site in the interpreter.
    pub fn field(&self, name: &str) -> Option<Value> {
        self.fields.borrow().get(name).cloned()
    }

    pub fn set_field(&self, name: &Token, value: Value) {
        self.fields.borrow_mut().insert(name.lexeme.clone(), value);
    }
}

// Fields may refer back to the instance itself; keep Debug shallow.
impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("class", &self.class.name)
            .finish()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Literal(literal) => write!(f, "{}", literal),
            Value::Function(function) => write!(f, "{}", function),
            Value::Class(class) => write!(f, "<cls {}>", class.name),
            Value::Instance(instance) => write!(f, "<inst {}>", instance.class.name),
            Value::List(elements) => {
                write!(f, "[")?;
                for (i, element) in elements.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, "]")
            }
            Value::Dict(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Lox(function) => write!(f, "<fn {}>", function.name.lexeme),
            Function::Native(function) => write!(f, "<native fn {}>", function.name),
        }
    }
}

impl From<Literal> for Value {
    fn from(literal: Literal) -> Self {
        Value::Literal(literal)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Literal(a), Value::Literal(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}
