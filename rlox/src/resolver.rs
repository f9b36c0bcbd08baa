use std::collections::HashMap;

use crate::ast::{Expr, Stmt};
use crate::error::LoxError;
use crate::token::{Span, Token};
use crate::INITIALIZER_NAME;

/// Side table mapping each variable-reference site (keyed by the byte span
/// of its token) to the number of scopes between the reference and its
/// binding. References absent from the table are globals, looked up
/// dynamically at runtime.
pub type Resolutions = HashMap<Span, usize>;

/// Function context, for validating `return`.
#[derive(Clone, Copy, PartialEq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
}

/// Class context, for validating `this` and `super`.
#[derive(Clone, Copy, PartialEq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

pub struct Resolver {
    /// Stack of scopes; each maps a name to whether its initializer has
    /// finished (declared vs. defined).
    scopes: Vec<HashMap<String, bool>>,
    resolutions: Resolutions,
    current_function: FunctionType,
    current_class: ClassType,
    errors: Vec<LoxError>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    pub fn new() -> Self {
        Self {
            scopes: Vec::new(),
            resolutions: HashMap::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            errors: Vec::new(),
        }
    }

    pub fn resolve(mut self, statements: &[Stmt]) -> Result<Resolutions, Vec<LoxError>> {
        for stmt in statements {
            self.resolve_stmt(stmt);
        }
        if self.errors.is_empty() {
            Ok(self.resolutions)
        } else {
            Err(self.errors)
        }
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(&name.lexeme) {
                self.errors.push(LoxError::resolution(
                    format!(
                        "Already a variable named '{}' in this scope.",
                        name.lexeme
                    ),
                    name,
                ));
                return;
            }
            scope.insert(name.lexeme.clone(), false);
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    fn resolve_local(&mut self, name: &Token) {
        for (distance, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                self.resolutions.insert(name.span.clone(), distance);
                return;
            }
        }
        // Not found in any local scope: global, resolved at runtime
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block { statements } => {
                self.begin_scope();
                for s in statements {
                    self.resolve_stmt(s);
                }
                self.end_scope();
            }
            Stmt::Var { name, initializer } => {
                self.declare(name);
                if let Some(init) = initializer {
                    self.resolve_expr(init);
                }
                self.define(name);
            }
            Stmt::Function { name, params, body } => {
                self.declare(name);
                self.define(name);
                self.resolve_function(params, body, FunctionType::Function);
            }
            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.errors.push(LoxError::resolution(
                        "Cannot return from top-level code.",
                        keyword,
                    ));
                }
                if let Some(v) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.errors.push(LoxError::resolution(
                            "Cannot return a value from an initializer.",
                            keyword,
                        ));
                    }
                    self.resolve_expr(v);
                }
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(eb) = else_branch {
                    self.resolve_stmt(eb);
                }
            }
            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }
            Stmt::Print { expression } | Stmt::Expression { expression } => {
                self.resolve_expr(expression);
            }
            // The parser already rejects break outside a loop
            Stmt::Break { .. } => {}
            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                self.declare(name);
                self.define(name);

                let enclosing_class = self.current_class;
                self.current_class = ClassType::Class;

                if let Some(superclass_expr) = superclass {
                    if let Expr::Variable {
                        name: superclass_name,
                    } = superclass_expr
                    {
                        if superclass_name.lexeme == name.lexeme {
                            self.errors.push(LoxError::resolution(
                                "A class cannot inherit from itself.",
                                superclass_name,
                            ));
                        }
                    }
                    self.resolve_expr(superclass_expr);

                    self.current_class = ClassType::Subclass;

                    // A scope holding `super` wraps the `this` scope and
                    // every method
                    self.begin_scope();
                    if let Some(scope) = self.scopes.last_mut() {
                        scope.insert("super".to_string(), true);
                    }
                }

                self.begin_scope();
                if let Some(scope) = self.scopes.last_mut() {
                    scope.insert("this".to_string(), true);
                }

                for method in methods {
                    if let Stmt::Function { name, params, body } = method {
                        let fn_type = if name.lexeme == INITIALIZER_NAME {
                            FunctionType::Initializer
                        } else {
                            FunctionType::Method
                        };
                        self.resolve_function(params, body, fn_type);
                    }
                }

                self.end_scope(); // this

                if superclass.is_some() {
                    self.end_scope(); // super
                }

                self.current_class = enclosing_class;
            }
        }
    }

    fn resolve_function(&mut self, params: &[Token], body: &[Stmt], fn_type: FunctionType) {
        let enclosing_function = self.current_function;
        self.current_function = fn_type;

        self.begin_scope();
        for param in params {
            self.declare(param);
            self.define(param);
        }
        for stmt in body {
            self.resolve_stmt(stmt);
        }
        self.end_scope();

        self.current_function = enclosing_function;
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Variable { name } => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&name.lexeme) == Some(&false) {
                        self.errors.push(LoxError::resolution(
                            "Cannot read local variable in its own initializer.",
                            name,
                        ));
                    }
                }
                self.resolve_local(name);
            }
            Expr::Assign { name, value } => {
                self.resolve_expr(value);
                self.resolve_local(name);
            }
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            Expr::Unary { right, .. } => {
                self.resolve_expr(right);
            }
            Expr::Grouping { expression } => {
                self.resolve_expr(expression);
            }
            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_expr(then_branch);
                self.resolve_expr(else_branch);
            }
            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }
            Expr::Literal { .. } => {}
            Expr::Get { object, .. } => {
                self.resolve_expr(object);
            }
            Expr::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }
            Expr::This { keyword } => {
                if self.current_class == ClassType::None {
                    self.errors.push(LoxError::resolution(
                        "Cannot use 'this' outside of a class.",
                        keyword,
                    ));
                }
                self.resolve_local(keyword);
            }
            Expr::Super { keyword, .. } => {
                match self.current_class {
                    ClassType::None => {
                        self.errors.push(LoxError::resolution(
                            "Cannot use 'super' outside of a class.",
                            keyword,
                        ));
                    }
                    ClassType::Class => {
                        self.errors.push(LoxError::resolution(
                            "Cannot use 'super' in a class with no superclass.",
                            keyword,
                        ));
                    }
                    ClassType::Subclass => {}
                }
                self.resolve_local(keyword);
            }
            Expr::List { elements, .. } => {
                for element in elements {
                    self.resolve_expr(element);
                }
            }
            Expr::Dict { entries, .. } => {
                for (key, value) in entries {
                    self.resolve_expr(key);
                    self.resolve_expr(value);
                }
            }
            Expr::Index { object, index, .. } => {
                self.resolve_expr(object);
                self.resolve_expr(index);
            }
        }
    }
}
