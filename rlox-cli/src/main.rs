mod completer;
mod report;
mod state;

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser as ArgParser;
use rlox::{Lox, LoxError, Parser, Scanner};
use rustyline::error::ReadlineError;
use rustyline::Editor;

use completer::LoxHelper;
use report::report_error;
use state::ReplState;

#[derive(ArgParser)]
#[command(name = "rlox")]
#[command(about = "Tree-walking interpreter for the Lox language", long_about = None)]
struct Args {
    /// One of: tokenize, parse, evaluate, interpret. Omit for a REPL.
    command: Option<String>,

    /// Script file to operate on
    script: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match args.command.as_deref() {
        None => {
            if io::stdin().is_terminal() {
                run_repl()
            } else {
                run_stdin()
            }
        }
        Some(command @ ("tokenize" | "parse" | "evaluate" | "interpret")) => {
            let Some(path) = args.script else {
                eprintln!("Usage: rlox {} <file>", command);
                return ExitCode::from(1);
            };
            match command {
                "tokenize" => tokenize_file(&path),
                "parse" => parse_file(&path),
                _ => interpret_file(&path),
            }
        }
        Some(unknown) => {
            eprintln!("Unknown command: {}", unknown);
            ExitCode::from(1)
        }
    }
}

fn read_source(path: &Path) -> Result<String, ExitCode> {
    fs::read_to_string(path).map_err(|e| {
        eprintln!("Error reading {}: {}", path.display(), e);
        ExitCode::from(1)
    })
}

/// Errors found before interpretation exit 65; runtime errors exit 70.
fn report_and_exit(errors: &[LoxError], source: &str, path: Option<&Path>) -> ExitCode {
    let filename = path.map(|p| p.to_string_lossy().into_owned());
    for error in errors {
        report_error(error, source, filename.as_deref(), io::stderr());
    }
    let runtime = errors
        .iter()
        .any(|e| matches!(e, LoxError::Runtime { .. }));
    ExitCode::from(if runtime { 70 } else { 65 })
}

/// Dump every token, one per line. Lexical errors go to stderr and the
/// dump continues with the rest of the stream.
fn tokenize_file(path: &Path) -> ExitCode {
    let source = match read_source(path) {
        Ok(source) => source,
        Err(code) => return code,
    };

    let mut had_error = false;
    for result in Scanner::new(&source) {
        match result {
            Ok(token) => println!("{}", token),
            Err(e) => {
                eprintln!("{}", e);
                had_error = true;
            }
        }
    }

    if had_error {
        ExitCode::from(65)
    } else {
        ExitCode::SUCCESS
    }
}

/// Print the parenthesized AST form of each statement.
fn parse_file(path: &Path) -> ExitCode {
    let source = match read_source(path) {
        Ok(source) => source,
        Err(code) => return code,
    };

    let mut tokens = Vec::new();
    let mut scan_errors = Vec::new();
    for result in Scanner::new(&source) {
        match result {
            Ok(token) => tokens.push(token),
            Err(e) => scan_errors.push(e),
        }
    }
    if !scan_errors.is_empty() {
        return report_and_exit(&scan_errors, &source, Some(path));
    }

    let mut parser = Parser::new(tokens);
    let statements = parser.parse();
    let errors = parser.take_errors();
    if !errors.is_empty() {
        return report_and_exit(&errors, &source, Some(path));
    }

    for stmt in &statements {
        println!("{}", stmt);
    }
    ExitCode::SUCCESS
}

fn interpret_file(path: &Path) -> ExitCode {
    let source = match read_source(path) {
        Ok(source) => source,
        Err(code) => return code,
    };

    let mut lox = Lox::new();
    let errors = lox.run(&source, io::stdout());
    if errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        report_and_exit(&errors, &source, Some(path))
    }
}

fn run_stdin() -> ExitCode {
    let mut source = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut source) {
        eprintln!("Error reading stdin: {}", e);
        return ExitCode::from(1);
    }

    let mut lox = Lox::new();
    let errors = lox.run(&source, io::stdout());
    if errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        report_and_exit(&errors, &source, None)
    }
}

/// Interactive session: errors are reported per submission and the
/// interpreter (and its globals) lives on.
fn run_repl() -> ExitCode {
    let mut rl: Editor<LoxHelper, rustyline::history::DefaultHistory> =
        match Editor::with_config(rustyline::Config::default()) {
            Ok(editor) => editor,
            Err(e) => {
                eprintln!("Failed to start the REPL: {}", e);
                return ExitCode::from(1);
            }
        };
    rl.set_helper(Some(LoxHelper::new()));

    let mut lox = Lox::new();
    let mut state = ReplState::new();

    loop {
        match rl.readline(&state.prompt()) {
            Ok(line) => {
                let _ = rl.add_history_entry(&line);

                if state.process_line(&line) {
                    let buffer = state.take_buffer();
                    let source = if ReplState::should_auto_print(&buffer) {
                        ReplState::wrap_for_print(&buffer)
                    } else {
                        buffer
                    };
                    let errors = lox.run(&source, io::stdout());
                    for error in &errors {
                        report_error(error, &source, None, io::stderr());
                    }

                    if let Some(helper) = rl.helper() {
                        helper.set_variables(lox.variable_names());
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                if state.is_empty() {
                    break;
                }
                state.cancel();
                println!();
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("REPL error: {:?}", err);
                break;
            }
        }
    }

    ExitCode::SUCCESS
}
