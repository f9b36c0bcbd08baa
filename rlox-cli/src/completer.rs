use std::borrow::Cow;
use std::cell::RefCell;

use rustyline::completion::{Completer, Pair};
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};

use rlox::{is_identifier_char, Scanner, TokenType, KEYWORDS};

/// Rustyline helper providing keyword/variable completion and
/// scanner-driven syntax highlighting for the REPL.
pub struct LoxHelper {
    variables: RefCell<Vec<String>>,
}

impl LoxHelper {
    pub fn new() -> Self {
        Self {
            variables: RefCell::new(Vec::new()),
        }
    }

    /// Refresh completion candidates after a submission.
    pub fn set_variables(&self, vars: Vec<String>) {
        *self.variables.borrow_mut() = vars;
    }

    /// Start of the identifier under the cursor.
    fn find_word_start(line: &str, pos: usize) -> usize {
        let before_cursor = &line[..pos];
        for (i, c) in before_cursor.char_indices().rev() {
            if !is_identifier_char(c) {
                return i + c.len_utf8();
            }
        }
        0
    }

    fn get_completions(prefix: &str, variables: &[String]) -> Vec<String> {
        if prefix.is_empty() {
            return Vec::new();
        }

        let mut completions = Vec::new();

        for (keyword, _) in KEYWORDS {
            if keyword.starts_with(prefix) {
                completions.push((*keyword).to_string());
            }
        }

        for var in variables {
            if var.starts_with(prefix) {
                completions.push(var.clone());
            }
        }

        completions
    }

    /// Recolor a line by running the scanner over it and wrapping token
    /// spans in ANSI codes. Scan errors are skipped; the characters they
    /// cover come back as the gap before the next token.
    pub fn highlight_line(line: &str, variables: &[String]) -> String {
        if line.is_empty() {
            return String::new();
        }

        const KEYWORD: &str = "\x1b[35m"; // magenta
        const STRING: &str = "\x1b[32m"; // green
        const NUMBER: &str = "\x1b[33m"; // yellow
        const VARIABLE: &str = "\x1b[36m"; // cyan
        const RESET: &str = "\x1b[0m";

        let mut result = String::new();
        let mut pos = 0usize;

        for token_result in Scanner::new(line) {
            let token = match token_result {
                Ok(token) => token,
                Err(_) => continue,
            };
            if token.token_type == TokenType::Eof {
                break;
            }

            if token.span.start > pos {
                result.push_str(&line[pos..token.span.start]);
            }

            let color = match token.token_type {
                TokenType::String => Some(STRING),
                TokenType::Number => Some(NUMBER),
                TokenType::Identifier => {
                    if variables.contains(&token.lexeme) {
                        Some(VARIABLE)
                    } else {
                        None
                    }
                }
                TokenType::And
                | TokenType::Break
                | TokenType::Class
                | TokenType::Else
                | TokenType::False
                | TokenType::For
                | TokenType::Fun
                | TokenType::If
                | TokenType::Nil
                | TokenType::Or
                | TokenType::Print
                | TokenType::Return
                | TokenType::Super
                | TokenType::This
                | TokenType::True
                | TokenType::Var
                | TokenType::While => Some(KEYWORD),
                _ => None,
            };

            if let Some(c) = color {
                result.push_str(c);
                result.push_str(&line[token.span.clone()]);
                result.push_str(RESET);
            } else {
                result.push_str(&line[token.span.clone()]);
            }
            pos = token.span.end;
        }

        if pos < line.len() {
            result.push_str(&line[pos..]);
        }

        result
    }
}

impl Helper for LoxHelper {}

impl Highlighter for LoxHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        let variables = self.variables.borrow();
        Cow::Owned(Self::highlight_line(line, &variables))
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        true
    }
}

impl Hinter for LoxHelper {
    type Hint = String;
}

impl Validator for LoxHelper {}

impl Completer for LoxHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let start = Self::find_word_start(line, pos);
        let prefix = &line[start..pos];
        let variables = self.variables.borrow();
        let candidates = Self::get_completions(prefix, &variables)
            .into_iter()
            .map(|completion| Pair {
                display: completion.clone(),
                replacement: completion,
            })
            .collect();
        Ok((start, candidates))
    }
}
