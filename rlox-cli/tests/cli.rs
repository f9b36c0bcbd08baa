use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

fn rlox() -> Command {
    Command::cargo_bin("rlox").expect("binary builds")
}

fn script(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(file, "{}", contents).expect("write script");
    file
}

// === tokenize ===

#[test]
fn tokenize_dumps_tokens_one_per_line() {
    let file = script("print (1 + 2.5);\n");
    rlox()
        .arg("tokenize")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::eq(
            "PRINT print null\n\
             LEFT_PAREN ( null\n\
             NUMBER 1 1.0\n\
             PLUS + null\n\
             NUMBER 2.5 2.5\n\
             RIGHT_PAREN ) null\n\
             SEMICOLON ; null\n\
             EOF  null\n",
        ));
}

#[test]
fn tokenize_prints_string_literals_unquoted() {
    let file = script("\"hi\"");
    rlox()
        .arg("tokenize")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("STRING \"hi\" hi"));
}

#[test]
fn tokenize_reports_lexical_errors_and_exits_65() {
    let file = script("var x = @;\n");
    rlox()
        .arg("tokenize")
        .arg(file.path())
        .assert()
        .code(65)
        .stderr(predicate::str::contains("Unexpected character: @"))
        // The dump continues past the error
        .stdout(predicate::str::contains("EOF  null"));
}

// === parse ===

#[test]
fn parse_prints_ast_pretty_form() {
    let file = script("1 + 2 * 3;\n");
    rlox()
        .arg("parse")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::eq("(expr (+ 1 (* 2 3)))\n"));
}

#[test]
fn parse_error_exits_65() {
    let file = script("print ;\n");
    rlox()
        .arg("parse")
        .arg(file.path())
        .assert()
        .code(65)
        .stderr(predicate::str::contains("Expect expression"));
}

// === evaluate / interpret ===

#[test]
fn evaluate_runs_program_and_exits_0() {
    let file = script("print 40 + 2;\n");
    rlox()
        .arg("evaluate")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::eq("42\n"))
        .stderr(predicate::str::is_empty());
}

#[test]
fn interpret_is_an_alias_for_evaluate() {
    let file = script("print \"ok\";\n");
    rlox()
        .arg("interpret")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::eq("ok\n"));
}

#[test]
fn evaluate_parse_error_exits_65() {
    let file = script("print 1\n");
    rlox().arg("evaluate").arg(file.path()).assert().code(65);
}

#[test]
fn evaluate_resolution_error_exits_65() {
    let file = script("return 1;\n");
    rlox()
        .arg("evaluate")
        .arg(file.path())
        .assert()
        .code(65)
        .stderr(predicate::str::contains("top-level"));
}

#[test]
fn evaluate_runtime_error_exits_70_with_clean_stdout() {
    let file = script("print \"a\" - 1;\n");
    rlox()
        .arg("evaluate")
        .arg(file.path())
        .assert()
        .code(70)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("[line 1]"))
        .stderr(predicate::str::contains("Operands must be numbers"));
}

#[test]
fn evaluate_output_before_runtime_error_is_kept() {
    let file = script("print 1;\nprint missing;\n");
    rlox()
        .arg("evaluate")
        .arg(file.path())
        .assert()
        .code(70)
        .stdout(predicate::eq("1\n"))
        .stderr(predicate::str::contains("Undefined variable 'missing'"));
}

#[test]
fn classes_closures_and_lists_work_end_to_end() {
    let file = script(
        r#"
        class Counter {
            init() { this.n = 0; }
            tick() {
                this.n = this.n + 1;
                return this.n;
            }
        }
        var c = Counter();
        c.tick();
        c.tick();
        var xs = [c.tick(), len("abc")];
        print xs;
        "#,
    );
    rlox()
        .arg("evaluate")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::eq("[3, 3]\n"));
}

// === argument handling ===

#[test]
fn unknown_command_exits_1() {
    rlox()
        .arg("frobnicate")
        .arg("file.lox")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown command: frobnicate"));
}

#[test]
fn missing_operand_exits_1_with_usage() {
    rlox()
        .arg("tokenize")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Usage: rlox tokenize"));
}

#[test]
fn missing_file_exits_1() {
    rlox()
        .arg("evaluate")
        .arg("no_such_file.lox")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error reading"));
}

#[test]
fn help_flag_shows_commands() {
    rlox()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("tokenize"));
}

// === stdin mode ===

#[test]
fn piped_program_runs() {
    rlox()
        .write_stdin("print 1 + 2;\n")
        .assert()
        .success()
        .stdout(predicate::eq("3\n"));
}

#[test]
fn piped_program_keeps_state_within_one_submission() {
    rlox()
        .write_stdin("var x = 2;\nvar y = x * 3;\nprint y;\n")
        .assert()
        .success()
        .stdout(predicate::eq("6\n"));
}

#[test]
fn piped_runtime_error_exits_70() {
    rlox()
        .write_stdin("print -\"x\";\n")
        .assert()
        .code(70)
        .stderr(predicate::str::contains("Operand must be a number"));
}

#[test]
fn piped_scan_error_exits_65() {
    rlox()
        .write_stdin("@\n")
        .assert()
        .code(65)
        .stderr(predicate::str::contains("Unexpected character"));
}
