use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::ast::{Expr, Stmt};
use crate::environment::Environment;
use crate::error::LoxError;
use crate::resolver::Resolutions;
use crate::token::{Literal, Token, TokenType};
use crate::value::{Function, Instance, LoxClass, LoxFunction, NativeFunction, Value};
use crate::INITIALIZER_NAME;

fn native_clock(_args: &[Value]) -> Result<Value, String> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| Value::number(elapsed.as_nanos() as f64))
        .map_err(|_| "System clock is before the Unix epoch.".to_string())
}

// Strings count Unicode scalar values, not bytes.
fn native_len(args: &[Value]) -> Result<Value, String> {
    match &args[0] {
        Value::Literal(Literal::String(s)) => Ok(Value::number(s.chars().count() as f64)),
        Value::List(elements) => Ok(Value::number(elements.borrow().len() as f64)),
        _ => Err("len() expects a string or a list.".to_string()),
    }
}

pub struct Interpreter {
    /// Root frame, pinned for unresolved (global) lookups.
    globals: Rc<RefCell<Environment>>,
    /// Current frame; swapped on block entry and function calls.
    environment: Rc<RefCell<Environment>>,
    /// Resolver side table: reference span -> lexical depth.
    locals: Resolutions,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        let globals = Rc::new(RefCell::new(Environment::new()));
        for (name, arity, func) in [
            ("clock", 0, native_clock as fn(&[Value]) -> Result<Value, String>),
            ("len", 1, native_len),
        ] {
            globals.borrow_mut().define(
                name.to_string(),
                Value::Function(Rc::new(Function::Native(NativeFunction {
                    name: name.to_string(),
                    arity,
                    func,
                }))),
            );
        }
        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
        }
    }

    /// Merge in a resolver table. Merging (rather than replacing) keeps
    /// depths recorded for closures from earlier REPL submissions alive.
    pub fn set_resolutions(&mut self, resolutions: Resolutions) {
        self.locals.extend(resolutions);
    }

    pub fn variable_names(&self) -> Vec<String> {
        self.environment.borrow().variable_names()
    }

    pub fn execute(&mut self, stmt: &Stmt, output: &mut dyn Write) -> Result<(), LoxError> {
        match stmt {
            Stmt::Print { expression } => {
                let value = self.evaluate(expression, output)?;
                writeln!(output, "{}", value)?;
                Ok(())
            }
            Stmt::Expression { expression } => {
                self.evaluate(expression, output)?;
                Ok(())
            }
            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr, output)?,
                    None => Value::nil(),
                };
                self.environment
                    .borrow_mut()
                    .define(name.lexeme.clone(), value);
                Ok(())
            }
            Stmt::Block { statements } => {
                let env = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
                    &self.environment,
                ))));
                self.execute_block(statements, env, output)
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition, output)?.is_truthy() {
                    self.execute(then_branch, output)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt, output)
                } else {
                    Ok(())
                }
            }
            Stmt::While { condition, body } => {
                loop {
                    if !self.evaluate(condition, output)?.is_truthy() {
                        break;
                    }
                    match self.execute(body, output) {
                        Ok(()) => {}
                        Err(LoxError::Break) => break,
                        Err(e) => return Err(e),
                    }
                }
                Ok(())
            }
            Stmt::Break { .. } => Err(LoxError::Break),
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr, output)?,
                    None => Value::nil(),
                };
                Err(LoxError::Return(value))
            }
            Stmt::Function { name, params, body } => {
                let function = LoxFunction {
                    name: name.clone(),
                    params: params.clone(),
                    body: Rc::new(body.clone()),
                    closure: Rc::clone(&self.environment),
                    is_initializer: false,
                };
                self.environment.borrow_mut().define(
                    name.lexeme.clone(),
                    Value::Function(Rc::new(Function::Lox(function))),
                );
                Ok(())
            }
            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods, output),
        }
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Stmt],
        output: &mut dyn Write,
    ) -> Result<(), LoxError> {
        let superclass = match superclass {
            Some(expr) => match self.evaluate(expr, output)? {
                Value::Class(class) => Some(class),
                _ => {
                    let site = match expr {
                        Expr::Variable { name } => name,
                        _ => name,
                    };
                    return Err(LoxError::runtime("Superclass must be a class.", site));
                }
            },
            None => None,
        };

        // Two-step define/assign lets methods refer to the class by name
        self.environment
            .borrow_mut()
            .define(name.lexeme.clone(), Value::nil());

        // With a superclass, methods close over an extra frame binding
        // `super`
        let method_env = match &superclass {
            Some(class) => {
                let env = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
                    &self.environment,
                ))));
                env.borrow_mut()
                    .define("super".to_string(), Value::Class(Rc::clone(class)));
                env
            }
            None => Rc::clone(&self.environment),
        };

        let mut method_table = HashMap::new();
        for method in methods {
            if let Stmt::Function {
                name: method_name,
                params,
                body,
            } = method
            {
                let function = LoxFunction {
                    name: method_name.clone(),
                    params: params.clone(),
                    body: Rc::new(body.clone()),
                    closure: Rc::clone(&method_env),
                    is_initializer: method_name.lexeme == INITIALIZER_NAME,
                };
                method_table.insert(method_name.lexeme.clone(), function);
            }
        }

        let class = Rc::new(LoxClass {
            name: name.lexeme.clone(),
            superclass,
            methods: method_table,
        });
        self.environment
            .borrow_mut()
            .assign(&name.lexeme, Value::Class(class), name)?;
        Ok(())
    }

    /// Run statements in `env`, restoring the previous environment on every
    /// exit path (completion, runtime error, return, break).
    fn execute_block(
        &mut self,
        statements: &[Stmt],
        env: Rc<RefCell<Environment>>,
        output: &mut dyn Write,
    ) -> Result<(), LoxError> {
        let previous = std::mem::replace(&mut self.environment, env);
        let result = statements
            .iter()
            .try_for_each(|stmt| self.execute(stmt, output));
        self.environment = previous;
        result
    }

    pub fn evaluate(&mut self, expr: &Expr, output: &mut dyn Write) -> Result<Value, LoxError> {
        match expr {
            Expr::Literal { value } => Ok(Value::Literal(value.clone())),
            Expr::Grouping { expression } => self.evaluate(expression, output),
            Expr::Unary { operator, right } => {
                let right_val = self.evaluate(right, output)?;
                match operator.token_type {
                    TokenType::Minus => match right_val {
                        Value::Literal(Literal::Number(n)) => Ok(Value::number(-n)),
                        _ => Err(LoxError::runtime("Operand must be a number.", operator)),
                    },
                    TokenType::Bang => Ok(Value::bool(!right_val.is_truthy())),
                    _ => unreachable!("invalid unary operator"),
                }
            }
            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left_val = self.evaluate(left, output)?;
                let right_val = self.evaluate(right, output)?;
                binary_op(&left_val, operator, &right_val)
            }
            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left_val = self.evaluate(left, output)?;

                if operator.token_type == TokenType::Or {
                    if left_val.is_truthy() {
                        return Ok(left_val);
                    }
                } else if !left_val.is_truthy() {
                    return Ok(left_val);
                }

                self.evaluate(right, output)
            }
            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition, output)?.is_truthy() {
                    self.evaluate(then_branch, output)
                } else {
                    self.evaluate(else_branch, output)
                }
            }
            Expr::Variable { name } => self.look_up_variable(name),
            Expr::Assign { name, value } => {
                let value = self.evaluate(value, output)?;
                match self.locals.get(&name.span) {
                    Some(&distance) => self.environment.borrow_mut().assign_at(
                        distance,
                        &name.lexeme,
                        value.clone(),
                        name,
                    )?,
                    None => self
                        .globals
                        .borrow_mut()
                        .assign(&name.lexeme, value.clone(), name)?,
                }
                Ok(value)
            }
            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee_value = self.evaluate(callee, output)?;
                let mut args = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.evaluate(argument, output)?);
                }
                self.call_value(callee_value, &args, paren, output)
            }
            Expr::Get { object, name } => {
                let object = self.evaluate(object, output)?;
                match object {
                    Value::Instance(instance) => {
                        if let Some(value) = instance.field(&name.lexeme) {
                            return Ok(value);
                        }
                        if let Some(method) = instance.class.find_method(&name.lexeme) {
                            return Ok(Value::Function(Rc::new(Function::Lox(
                                method.bind(&instance),
                            ))));
                        }
                        Err(LoxError::runtime(
                            format!("Undefined property '{}'.", name.lexeme),
                            name,
                        ))
                    }
                    _ => Err(LoxError::runtime("Only instances have properties.", name)),
                }
            }
            Expr::Set {
                object,
                name,
                value,
            } => {
                let object = self.evaluate(object, output)?;
                match object {
                    Value::Instance(instance) => {
                        let value = self.evaluate(value, output)?;
                        instance.set_field(name, value.clone());
                        Ok(value)
                    }
                    _ => Err(LoxError::runtime("Only instances have fields.", name)),
                }
            }
            Expr::This { keyword } => self.look_up_variable(keyword),
            Expr::Super { keyword, method } => {
                let distance = match self.locals.get(&keyword.span) {
                    Some(&distance) => distance,
                    None => {
                        return Err(LoxError::runtime(
                            "'super' cannot be resolved here.",
                            keyword,
                        ));
                    }
                };
                let superclass = self
                    .environment
                    .borrow()
                    .get_at(distance, "super", keyword)?;
                // `this` lives one frame inside the `super` frame
                let this_distance = match distance.checked_sub(1) {
                    Some(d) => d,
                    None => {
                        return Err(LoxError::runtime(
                            "'super' cannot be resolved here.",
                            keyword,
                        ));
                    }
                };
                let object = self
                    .environment
                    .borrow()
                    .get_at(this_distance, "this", keyword)?;
                match (superclass, object) {
                    (Value::Class(superclass), Value::Instance(instance)) => {
                        match superclass.find_method(&method.lexeme) {
                            Some(m) => Ok(Value::Function(Rc::new(Function::Lox(
                                m.bind(&instance),
                            )))),
                            None => Err(LoxError::runtime(
                                format!("Undefined property '{}'.", method.lexeme),
                                method,
                            )),
                        }
                    }
                    _ => Err(LoxError::runtime(
                        "'super' cannot be resolved here.",
                        keyword,
                    )),
                }
            }
            Expr::List { elements, .. } => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.evaluate(element, output)?);
                }
                Ok(Value::List(Rc::new(RefCell::new(values))))
            }
            Expr::Dict { brace, entries } => {
                let mut map = BTreeMap::new();
                for (key_expr, value_expr) in entries {
                    let key = match self.evaluate(key_expr, output)? {
                        Value::Literal(Literal::String(s)) => s,
                        _ => return Err(LoxError::runtime("Dict keys must be strings.", brace)),
                    };
                    let value = self.evaluate(value_expr, output)?;
                    if map.insert(key.clone(), value).is_some() {
                        return Err(LoxError::runtime(
                            format!("Duplicate key '{}' in dict literal.", key),
                            brace,
                        ));
                    }
                }
                Ok(Value::Dict(Rc::new(RefCell::new(map))))
            }
            Expr::Index {
                object,
                bracket,
                index,
            } => {
                let object = self.evaluate(object, output)?;
                let index = self.evaluate(index, output)?;
                match object {
                    Value::List(elements) => {
                        let n = match index {
                            Value::Literal(Literal::Number(n)) => n,
                            _ => {
                                return Err(LoxError::runtime(
                                    "List index must be a number.",
                                    bracket,
                                ));
                            }
                        };
                        if n.fract() != 0.0 {
                            return Err(LoxError::runtime(
                                "List index must be an integer.",
                                bracket,
                            ));
                        }
                        let elements = elements.borrow();
                        if n < 0.0 || n >= elements.len() as f64 {
                            return Err(LoxError::runtime(
                                format!("List index {} out of range.", n),
                                bracket,
                            ));
                        }
                        Ok(elements[n as usize].clone())
                    }
                    Value::Dict(entries) => {
                        let key = match index {
                            Value::Literal(Literal::String(s)) => s,
                            _ => {
                                return Err(LoxError::runtime(
                                    "Dict keys must be strings.",
                                    bracket,
                                ));
                            }
                        };
                        match entries.borrow().get(&key) {
                            Some(value) => Ok(value.clone()),
                            None => Err(LoxError::runtime(
                                format!("Undefined key '{}'.", key),
                                bracket,
                            )),
                        }
                    }
                    _ => Err(LoxError::runtime(
                        "Only lists and dicts can be indexed.",
                        bracket,
                    )),
                }
            }
        }
    }

    fn look_up_variable(&self, name: &Token) -> Result<Value, LoxError> {
        match self.locals.get(&name.span) {
            Some(&distance) => self
                .environment
                .borrow()
                .get_at(distance, &name.lexeme, name),
            None => self.globals.borrow().get(&name.lexeme, name),
        }
    }

    fn call_value(
        &mut self,
        callee: Value,
        args: &[Value],
        paren: &Token,
        output: &mut dyn Write,
    ) -> Result<Value, LoxError> {
        match callee {
            Value::Function(function) => {
                if function.arity() != args.len() {
                    return Err(LoxError::runtime(
                        format!(
                            "Expected {} arguments but got {}.",
                            function.arity(),
                            args.len()
                        ),
                        paren,
                    ));
                }
                match function.as_ref() {
                    Function::Lox(f) => self.call_function(f, args, output),
                    Function::Native(f) => {
                        (f.func)(args).map_err(|message| LoxError::runtime(message, paren))
                    }
                }
            }
            Value::Class(class) => {
                if class.arity() != args.len() {
                    return Err(LoxError::runtime(
                        format!("Expected {} arguments but got {}.", class.arity(), args.len()),
                        paren,
                    ));
                }
                let instance = Instance::new(Rc::clone(&class));
                if let Some(init) = class.find_method(INITIALIZER_NAME) {
                    let bound = init.bind(&instance);
                    self.call_function(&bound, args, output)?;
                }
                Ok(Value::Instance(instance))
            }
            _ => Err(LoxError::runtime(
                "Can only call functions and classes.",
                paren,
            )),
        }
    }

    fn call_function(
        &mut self,
        function: &LoxFunction,
        args: &[Value],
        output: &mut dyn Write,
    ) -> Result<Value, LoxError> {
        let env = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
            &function.closure,
        ))));
        for (param, arg) in function.params.iter().zip(args) {
            env.borrow_mut().define(param.lexeme.clone(), arg.clone());
        }

        let returned = match self.execute_block(&function.body, env, output) {
            Ok(()) => Value::nil(),
            Err(LoxError::Return(value)) => value,
            Err(mut e) => {
                // Grow the traceback as the error unwinds through frames
                if let LoxError::Runtime { stack, .. } = &mut e {
                    stack.push(function.name.lexeme.clone());
                }
                return Err(e);
            }
        };

        // An initializer always yields the bound instance, even on a bare
        // `return;`
        if function.is_initializer {
            return function.closure.borrow().get_at(0, "this", &function.name);
        }
        Ok(returned)
    }
}

fn binary_op(left: &Value, operator: &Token, right: &Value) -> Result<Value, LoxError> {
    match operator.token_type {
        TokenType::Minus => {
            let (a, b) = require_numbers(left, right, operator)?;
            Ok(Value::number(a - b))
        }
        TokenType::Star => {
            let (a, b) = require_numbers(left, right, operator)?;
            Ok(Value::number(a * b))
        }
        TokenType::Slash => {
            let (a, b) = require_numbers(left, right, operator)?;
            if b == 0.0 {
                return Err(LoxError::runtime("Division by zero.", operator));
            }
            Ok(Value::number(a / b))
        }
        TokenType::Plus => match (left, right) {
            (Value::Literal(Literal::Number(a)), Value::Literal(Literal::Number(b))) => {
                Ok(Value::number(a + b))
            }
            (Value::Literal(Literal::String(a)), Value::Literal(Literal::String(b))) => {
                Ok(Value::string(format!("{}{}", a, b)))
            }
            _ => Err(LoxError::runtime(
                "Operands must be two numbers or two strings.",
                operator,
            )),
        },
        TokenType::Greater | TokenType::GreaterEqual | TokenType::Less | TokenType::LessEqual => {
            match (left, right) {
                (Value::Literal(Literal::Number(a)), Value::Literal(Literal::Number(b))) => {
                    Ok(Value::bool(compare(operator.token_type, a, b)))
                }
                (Value::Literal(Literal::String(a)), Value::Literal(Literal::String(b))) => {
                    Ok(Value::bool(compare(operator.token_type, a, b)))
                }
                _ => Err(LoxError::runtime(
                    "Operands must be two numbers or two strings.",
                    operator,
                )),
            }
        }
        TokenType::EqualEqual => Ok(Value::bool(left == right)),
        TokenType::BangEqual => Ok(Value::bool(left != right)),
        _ => unreachable!("invalid binary operator"),
    }
}

fn compare<T: PartialOrd>(operator: TokenType, a: T, b: T) -> bool {
    match operator {
        TokenType::Greater => a > b,
        TokenType::GreaterEqual => a >= b,
        TokenType::Less => a < b,
        TokenType::LessEqual => a <= b,
        _ => unreachable!("invalid comparison operator"),
    }
}

fn require_numbers(
    left: &Value,
    right: &Value,
    operator: &Token,
) -> Result<(f64, f64), LoxError> {
    match (left, right) {
        (Value::Literal(Literal::Number(a)), Value::Literal(Literal::Number(b))) => Ok((*a, *b)),
        _ => Err(LoxError::runtime("Operands must be numbers.", operator)),
    }
}
