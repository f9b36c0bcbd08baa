mod ast;
mod environment;
mod error;
mod interpreter;
mod parser;
mod resolver;
mod scanner;
mod token;
mod value;

use std::io::Write;

pub use ast::{Expr, Stmt};
pub use error::LoxError;
pub use parser::Parser;
pub use resolver::{Resolutions, Resolver};
pub use scanner::{is_identifier_char, is_identifier_start, Scanner, KEYWORDS};
pub use token::{Literal, Span, Token, TokenType};
pub use value::Value;

/// Native functions installed in the global frame at startup.
pub const NATIVE_FUNCTIONS: &[&str] = &["clock", "len"];

/// Name of the method invoked automatically on instantiation.
pub const INITIALIZER_NAME: &str = "init";

/// The interpreter facade. One `Lox` holds one global environment, so a
/// REPL can feed it successive submissions and keep definitions alive.
pub struct Lox {
    interpreter: interpreter::Interpreter,
}

impl Default for Lox {
    fn default() -> Self {
        Self::new()
    }
}

impl Lox {
    pub fn new() -> Self {
        Self {
            interpreter: interpreter::Interpreter::new(),
        }
    }

    /// Names currently visible in the interpreter, for REPL completion.
    pub fn variable_names(&self) -> Vec<String> {
        self.interpreter.variable_names()
    }

    /// Scan, parse, resolve and interpret `source`, writing program output
    /// to `stdout`. Returns every error found; an empty vector means the
    /// program ran to completion. Each stage is fatal: later stages only
    /// run when earlier ones produced no errors, and a runtime error halts
    /// the remaining statements.
    pub fn run<O: Write>(&mut self, source: &str, mut stdout: O) -> Vec<LoxError> {
        let mut errors = Vec::new();

        let mut tokens = Vec::new();
        for result in Scanner::new(source) {
            match result {
                Ok(token) => tokens.push(token),
                Err(e) => errors.push(e),
            }
        }

        if !errors.is_empty() {
            return errors;
        }

        let mut parser = Parser::new(tokens);
        let statements = parser.parse();
        errors.extend(parser.take_errors());

        if !errors.is_empty() {
            return errors;
        }

        let resolutions = match Resolver::new().resolve(&statements) {
            Ok(resolutions) => resolutions,
            Err(errs) => return errs,
        };

        self.interpreter.set_resolutions(resolutions);

        for stmt in &statements {
            if let Err(e) = self.interpreter.execute(stmt, &mut stdout) {
                errors.push(e);
                break;
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_capture(source: &str) -> (String, Vec<LoxError>) {
        let mut lox = Lox::new();
        let mut stdout = Vec::new();
        let errors = lox.run(source, &mut stdout);
        (String::from_utf8(stdout).expect("output is utf-8"), errors)
    }

    #[test]
    fn run_empty_source_returns_no_errors() {
        let (output, errors) = run_capture("");
        assert!(errors.is_empty());
        assert!(output.is_empty());
    }

    #[test]
    fn run_comment_only_returns_no_errors() {
        let (_, errors) = run_capture("// just a comment");
        assert!(errors.is_empty());
    }

    #[test]
    fn run_executes_print_statement() {
        let (output, errors) = run_capture("print 1 + 2;");
        assert!(errors.is_empty());
        assert_eq!(output, "3\n");
    }

    #[test]
    fn run_collects_scanner_errors() {
        let (_, errors) = run_capture("@$");
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| matches!(e, LoxError::Scan { .. })));
    }

    #[test]
    fn scan_errors_suppress_later_stages() {
        // The `print` would also fail to parse, but scanning stops first
        let (output, errors) = run_capture("@\nprint ;");
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], LoxError::Scan { .. }));
        assert!(output.is_empty());
    }

    #[test]
    fn run_collects_parser_errors() {
        let (_, errors) = run_capture("1 +");
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], LoxError::Parse { .. }));
    }

    #[test]
    fn run_collects_resolution_errors() {
        let (_, errors) = run_capture("return 1;");
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], LoxError::Resolution { .. }));
    }

    #[test]
    fn run_collects_runtime_errors() {
        let (_, errors) = run_capture("print -\"x\";");
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], LoxError::Runtime { .. }));
    }

    #[test]
    fn runtime_error_halts_remaining_statements() {
        let (output, errors) = run_capture("print 1; print missing; print 2;");
        assert_eq!(output, "1\n");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn runtime_error_keeps_stdout_clean_before_the_failure() {
        let (output, errors) = run_capture("print \"a\" - 1;");
        assert!(output.is_empty());
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn repl_persists_variables_across_runs() {
        let mut lox = Lox::new();
        let mut stdout = Vec::new();

        assert!(lox.run("var x = 42;", &mut stdout).is_empty());

        stdout.clear();
        assert!(lox.run("print x;", &mut stdout).is_empty());
        assert_eq!(String::from_utf8(stdout).unwrap(), "42\n");
    }

    #[test]
    fn repl_persists_functions_and_classes_across_runs() {
        let mut lox = Lox::new();
        let mut stdout = Vec::new();

        assert!(lox
            .run("fun double(n) { return n * 2; }", &mut stdout)
            .is_empty());
        assert!(lox.run("class P {}", &mut stdout).is_empty());

        stdout.clear();
        assert!(lox.run("print double(21); print P;", &mut stdout).is_empty());
        assert_eq!(String::from_utf8(stdout).unwrap(), "42\n<cls P>\n");
    }

    #[test]
    fn repl_closures_survive_across_runs() {
        let mut lox = Lox::new();
        let mut stdout = Vec::new();

        let errors = lox.run(
            "fun make() { var i = 0; fun inc() { i = i + 1; return i; } return inc; } var c = make();",
            &mut stdout,
        );
        assert!(errors.is_empty());

        stdout.clear();
        assert!(lox.run("print c(); print c();", &mut stdout).is_empty());
        assert_eq!(String::from_utf8(stdout).unwrap(), "1\n2\n");
    }

    #[test]
    fn errors_do_not_poison_subsequent_runs() {
        let mut lox = Lox::new();
        let mut stdout = Vec::new();

        assert_eq!(lox.run("@", &mut stdout).len(), 1);

        stdout.clear();
        assert!(lox.run("print 42;", &mut stdout).is_empty());
        assert_eq!(String::from_utf8(stdout).unwrap(), "42\n");
    }

    #[test]
    fn variable_names_reports_definitions_and_natives() {
        let mut lox = Lox::new();
        let _ = lox.run("var answer = 42;", &mut Vec::new());
        let names = lox.variable_names();
        assert!(names.contains(&"answer".to_string()));
        for native in NATIVE_FUNCTIONS {
            assert!(names.contains(&native.to_string()));
        }
    }
}
