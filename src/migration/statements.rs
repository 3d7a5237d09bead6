// ABOUTME: SQL script tokenizer that splits a dump into executable statements
// ABOUTME: Single forward scan over an explicit state machine; quotes and comments aware

/// Tokenizer switches
///
/// `dollar_quotes` controls whether `$$ ... $$` / `$tag$ ... $tag$` bodies are
/// recognized as strings. It is on by default because function definitions in
/// our own dumps use dollar quoting and contain semicolons. Turning it off
/// reproduces the older, narrower splitter, where a semicolon inside such a
/// body ends the statement early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitOptions {
    pub dollar_quotes: bool,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            dollar_quotes: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Normal,
    /// `backslash_escapes` is set for `E'...'` strings
    InSingleQuote { backslash_escapes: bool },
    InDoubleQuote,
    InLineComment,
    InBlockComment { depth: usize },
    InDollarQuote { tag: String },
}

struct Scanner {
    options: SplitOptions,
    state: State,
    current: String,
    statements: Vec<String>,
}

impl Scanner {
    fn new(options: SplitOptions) -> Self {
        Self {
            options,
            state: State::Normal,
            current: String::new(),
            statements: Vec::new(),
        }
    }

    fn flush(&mut self) {
        let stmt = self.current.trim();
        if !is_blank_or_punctuation(stmt) {
            self.statements.push(stmt.to_string());
        }
        self.current.clear();
    }

    fn feed_line(&mut self, line: &str) {
        // Comment-only lines contribute nothing, not even the newline.
        if self.state == State::Normal && line.trim_start().starts_with("--") {
            return;
        }

        let chars: Vec<char> = line.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            let next = chars.get(i + 1).copied();

            match &self.state {
                State::Normal => match c {
                    '-' if next == Some('-') => {
                        self.state = State::InLineComment;
                        break;
                    }
                    '/' if next == Some('*') => {
                        self.state = State::InBlockComment { depth: 1 };
                        i += 2;
                        continue;
                    }
                    '\'' => {
                        let backslash_escapes = i > 0
                            && matches!(chars[i - 1], 'E' | 'e')
                            && (i < 2 || !is_ident_char(chars[i - 2]));
                        self.current.push(c);
                        self.state = State::InSingleQuote { backslash_escapes };
                    }
                    '"' => {
                        self.current.push(c);
                        self.state = State::InDoubleQuote;
                    }
                    '$' if self.options.dollar_quotes
                        && (i == 0 || !is_ident_char(chars[i - 1])) =>
                    {
                        match dollar_tag_at(&chars, i) {
                            Some(tag) => {
                                let delimiter_len = tag.chars().count() + 2;
                                self.current.extend(&chars[i..i + delimiter_len]);
                                self.state = State::InDollarQuote { tag };
                                i += delimiter_len;
                                continue;
                            }
                            None => self.current.push(c),
                        }
                    }
                    ';' => {
                        self.current.push(c);
                        self.flush();
                    }
                    _ => self.current.push(c),
                },
                State::InSingleQuote { backslash_escapes } => {
                    if *backslash_escapes && c == '\\' {
                        self.current.push(c);
                        if let Some(escaped) = next {
                            self.current.push(escaped);
                        }
                        i += 2;
                        continue;
                    }
                    self.current.push(c);
                    if c == '\'' {
                        if next == Some('\'') {
                            self.current.push('\'');
                            i += 2;
                            continue;
                        }
                        self.state = State::Normal;
                    }
                }
                State::InDoubleQuote => {
                    self.current.push(c);
                    if c == '"' {
                        if next == Some('"') {
                            self.current.push('"');
                            i += 2;
                            continue;
                        }
                        self.state = State::Normal;
                    }
                }
                State::InBlockComment { depth } => {
                    let depth = *depth;
                    if c == '*' && next == Some('/') {
                        if depth == 1 {
                            self.state = State::Normal;
                            self.current.push(' ');
                        } else {
                            self.state = State::InBlockComment { depth: depth - 1 };
                        }
                        i += 2;
                        continue;
                    }
                    if c == '/' && next == Some('*') {
                        self.state = State::InBlockComment { depth: depth + 1 };
                        i += 2;
                        continue;
                    }
                }
                State::InDollarQuote { tag } => {
                    if c == '$' && closes_dollar_quote(&chars, i, tag) {
                        let delimiter_len = tag.chars().count() + 2;
                        self.current.extend(&chars[i..i + delimiter_len]);
                        self.state = State::Normal;
                        i += delimiter_len;
                        continue;
                    }
                    self.current.push(c);
                }
                State::InLineComment => break,
            }

            i += 1;
        }

        match self.state {
            State::InLineComment => {
                self.state = State::Normal;
                self.current.push('\n');
            }
            State::InBlockComment { .. } => {}
            _ => self.current.push('\n'),
        }
    }

    fn finish(mut self) -> Vec<String> {
        self.flush();
        self.statements
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_blank_or_punctuation(text: &str) -> bool {
    text.chars()
        .all(|c| c.is_whitespace() || c.is_ascii_punctuation())
}

/// Tag of a dollar-quote opener starting at `start` (`$$` yields an empty tag)
fn dollar_tag_at(chars: &[char], start: usize) -> Option<String> {
    let mut end = start + 1;
    while end < chars.len() && is_ident_char(chars[end]) {
        if end == start + 1 && chars[end].is_ascii_digit() {
            // `$1` is a positional parameter, not a tag
            return None;
        }
        end += 1;
    }
    (chars.get(end) == Some(&'$')).then(|| chars[start + 1..end].iter().collect())
}

fn closes_dollar_quote(chars: &[char], start: usize, tag: &str) -> bool {
    let mut idx = start + 1;
    for expected in tag.chars() {
        if chars.get(idx) != Some(&expected) {
            return false;
        }
        idx += 1;
    }
    chars.get(idx) == Some(&'$')
}

/// Split a SQL script into statements with the default options
///
/// Each statement keeps its terminating semicolon and is trimmed. Comment-only
/// lines and block comments are dropped; semicolons inside quoted strings,
/// quoted identifiers and dollar-quoted bodies do not split.
///
/// # Examples
///
/// ```
/// # use pgvault::migration::statements::split_statements;
/// let statements = split_statements("INSERT INTO t VALUES ('a;b');\n-- note\nSELECT 1;");
/// assert_eq!(statements, vec!["INSERT INTO t VALUES ('a;b');", "SELECT 1;"]);
/// ```
pub fn split_statements(sql: &str) -> Vec<String> {
    split_statements_with(sql, SplitOptions::default())
}

/// Split a SQL script into statements
pub fn split_statements_with(sql: &str, options: SplitOptions) -> Vec<String> {
    let mut scanner = Scanner::new(options);
    for line in sql.split('\n') {
        scanner.feed_line(line);
    }
    scanner.finish()
}
