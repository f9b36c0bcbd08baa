use rlox::KEYWORDS;

/// Multi-line REPL state. Submissions are buffered until braces balance,
/// so blocks, functions and classes can be typed across lines. Braces
/// inside string literals do not count (dict literals made bare braces
/// common enough to matter).
pub struct ReplState {
    buffer: String,
    brace_depth: usize,
    in_string: bool,
}

impl ReplState {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            brace_depth: 0,
            in_string: false,
        }
    }

    pub fn prompt(&self) -> String {
        if self.brace_depth == 0 && !self.in_string {
            "> ".to_string()
        } else {
            format!("..{} ", self.brace_depth)
        }
    }

    /// Returns true when the buffer is ready to execute.
    pub fn process_line(&mut self, line: &str) -> bool {
        for c in line.chars() {
            if self.in_string {
                if c == '"' {
                    self.in_string = false;
                }
                continue;
            }
            match c {
                '"' => self.in_string = true,
                '{' => self.brace_depth += 1,
                '}' => self.brace_depth = self.brace_depth.saturating_sub(1),
                _ => {}
            }
        }

        self.buffer.push_str(line);
        self.buffer.push('\n');

        self.brace_depth == 0 && !self.in_string
    }

    pub fn take_buffer(&mut self) -> String {
        self.brace_depth = 0;
        self.in_string = false;
        std::mem::take(&mut self.buffer)
    }

    pub fn cancel(&mut self) {
        self.buffer.clear();
        self.brace_depth = 0;
        self.in_string = false;
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// A bare expression (no trailing semicolon, not a block, not a
    /// keyword-led statement) gets wrapped in `print …;`.
    pub fn should_auto_print(input: &str) -> bool {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return false;
        }
        if trimmed.starts_with("//") {
            return false;
        }

        // Drop a trailing line comment before inspecting the code
        let code = if let Some(idx) = trimmed.find("//") {
            trimmed[..idx].trim()
        } else {
            trimmed
        };

        if code.is_empty() {
            return false;
        }
        if code.ends_with('}') {
            return false;
        }
        if code.ends_with(';') {
            return false;
        }

        // Keyword-led input is an (incomplete) statement; let the parser
        // report it properly instead of wrapping
        for (keyword, _) in KEYWORDS {
            if let Some(after_keyword) = code.strip_prefix(keyword) {
                if after_keyword.is_empty() || after_keyword.starts_with(' ') {
                    return false;
                }
            }
        }

        true
    }

    pub fn wrap_for_print(input: &str) -> String {
        format!("print {};", input.trim())
    }
}
