//! psql-style control instructions embedded in fixture statements.
//!
//! A fixture statement may interleave backslash commands with SQL, e.g. a
//! `\set filename ...` line followed by `COPY t FROM :'filename';`, or a
//! query terminated by `\gset`. The text is split into [`Instruction`]s that
//! the executor runs in order; variable references are resolved at execution
//! time so that earlier `\set` lines are visible to later SQL.

use std::collections::BTreeMap;

pub type Variables = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Sql(String),
    /// SQL sent by `\g` (`gset_prefix == None`) or `\gset [prefix]`.
    Query {
        sql: String,
        gset_prefix: Option<String>,
    },
    Meta(MetaCommand),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaCommand {
    pub name: String,
    pub args: Vec<MetaArg>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaArg {
    pieces: Vec<ArgPiece>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ArgPiece {
    Literal(String),
    Variable { name: String, quoting: Quoting },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quoting {
    Raw,
    Literal,
    Identifier,
}

impl Quoting {
    #[must_use]
    pub fn apply(self, value: &str) -> String {
        match self {
            Self::Raw => value.to_string(),
            Self::Literal => quote_literal(value),
            Self::Identifier => format!("\"{}\"", value.replace('"', "\"\"")),
        }
    }
}

impl MetaCommand {
    #[must_use]
    pub fn render(&self) -> String {
        format!("\\{}", self.name)
    }

    /// Arguments with variables substituted. Unknown variables resolve to an
    /// empty string, matching psql.
    #[must_use]
    pub fn resolved_args(&self, variables: &Variables) -> Vec<String> {
        self.args.iter().map(|arg| arg.resolve(variables)).collect()
    }
}

impl MetaArg {
    fn push_literal(&mut self, ch: char) {
        if let Some(ArgPiece::Literal(text)) = self.pieces.last_mut() {
            text.push(ch);
            return;
        }
        self.pieces.push(ArgPiece::Literal(ch.to_string()));
    }

    fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    #[must_use]
    pub fn resolve(&self, variables: &Variables) -> String {
        let mut resolved = String::new();
        for piece in &self.pieces {
            match piece {
                ArgPiece::Literal(text) => resolved.push_str(text),
                ArgPiece::Variable { name, quoting } => {
                    if let Some(value) = variables.get(name) {
                        resolved.push_str(&quoting.apply(value));
                    }
                }
            }
        }
        resolved
    }
}

/// Splits a fixture statement into SQL and backslash instructions.
#[must_use]
pub fn split_instructions(text: &str) -> Vec<Instruction> {
    let chars = text.chars().collect::<Vec<_>>();
    let mut instructions = Vec::new();
    let mut buffer = String::new();
    let mut scanner = SqlScanner::default();
    let mut index = 0;
    let mut saw_meta = false;

    while index < chars.len() {
        if scanner.is_plain() && chars[index] == '\\' {
            if chars.get(index + 1) == Some(&'\\') {
                index += 2;
                continue;
            }

            saw_meta = true;
            let (command, next_index) = parse_meta(&chars, index);
            index = next_index;
            if command.name == "g" || command.name == "gset" {
                let sql = std::mem::take(&mut buffer).trim().to_string();
                if sql.is_empty() {
                    instructions.push(Instruction::Meta(command));
                    continue;
                }
                let gset_prefix = (command.name == "gset").then(|| {
                    command
                        .args
                        .first()
                        .map(|arg| arg.resolve(&Variables::new()))
                        .unwrap_or_default()
                });
                instructions.push(Instruction::Query { sql, gset_prefix });
            } else {
                instructions.push(Instruction::Meta(command));
            }
            continue;
        }

        let len = scanner.consume(&chars, index);
        buffer.extend(&chars[index..index + len]);
        index += len;
    }

    if !buffer.trim().is_empty() {
        let sql = if saw_meta {
            buffer.trim().to_string()
        } else {
            buffer
        };
        instructions.push(Instruction::Sql(sql));
    }

    instructions
}

/// Replaces `:name`, `:'name'` and `:"name"` outside of quotes and comments.
/// Unknown names and `::` casts are left untouched.
#[must_use]
pub fn interpolate(sql: &str, variables: &Variables) -> String {
    if variables.is_empty() || !sql.contains(':') {
        return sql.to_string();
    }

    let chars = sql.chars().collect::<Vec<_>>();
    let mut interpolated = String::with_capacity(sql.len());
    let mut scanner = SqlScanner::default();
    let mut index = 0;

    while index < chars.len() {
        if scanner.is_plain()
            && chars[index] == ':'
            && (index == 0 || chars[index - 1] != ':')
            && let Some((name, quoting, len)) = variable_reference(&chars, index)
            && let Some(value) = variables.get(&name)
        {
            interpolated.push_str(&quoting.apply(value));
            index += len;
            continue;
        }

        let len = scanner.consume(&chars, index);
        interpolated.extend(&chars[index..index + len]);
        index += len;
    }

    interpolated
}

fn parse_meta(chars: &[char], start: usize) -> (MetaCommand, usize) {
    let mut index = start + 1;
    let mut name = String::new();
    while let Some(&ch) = chars.get(index) {
        if ch.is_whitespace() || ch == '\\' {
            break;
        }
        name.push(ch);
        index += 1;
    }

    let mut args = Vec::new();
    let mut current = MetaArg::default();
    while let Some(&ch) = chars.get(index) {
        match ch {
            '\n' => {
                index += 1;
                break;
            }
            '\\' => {
                if chars.get(index + 1) == Some(&'\\') {
                    index += 2;
                }
                break;
            }
            ch if ch.is_whitespace() => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
                index += 1;
            }
            '\'' => {
                let (text, next_index) = read_quoted_arg(chars, index + 1);
                current.pieces.push(ArgPiece::Literal(text));
                index = next_index;
            }
            ':' => {
                if let Some((name, quoting, len)) = variable_reference(chars, index) {
                    current.pieces.push(ArgPiece::Variable { name, quoting });
                    index += len;
                } else {
                    current.push_literal(ch);
                    index += 1;
                }
            }
            ch => {
                current.push_literal(ch);
                index += 1;
            }
        }
    }
    if !current.is_empty() {
        args.push(current);
    }

    (MetaCommand { name, args }, index)
}

fn read_quoted_arg(chars: &[char], start: usize) -> (String, usize) {
    let mut text = String::new();
    let mut index = start;
    while let Some(&ch) = chars.get(index) {
        match ch {
            '\'' if chars.get(index + 1) == Some(&'\'') => {
                text.push('\'');
                index += 2;
            }
            '\'' => return (text, index + 1),
            '\\' => {
                match chars.get(index + 1) {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some(&other) => text.push(other),
                    None => text.push('\\'),
                }
                index += 2;
            }
            ch => {
                text.push(ch);
                index += 1;
            }
        }
    }
    (text, index)
}

fn variable_reference(chars: &[char], colon: usize) -> Option<(String, Quoting, usize)> {
    match chars.get(colon + 1)? {
        ':' => None,
        quote @ ('\'' | '"') => {
            let quoting = if *quote == '\'' {
                Quoting::Literal
            } else {
                Quoting::Identifier
            };
            let name = read_variable_name(chars, colon + 2);
            if name.is_empty() || chars.get(colon + 2 + name.chars().count()) != Some(quote) {
                return None;
            }
            let len = name.chars().count() + 3;
            Some((name, quoting, len))
        }
        ch if is_variable_char(*ch) => {
            let name = read_variable_name(chars, colon + 1);
            let len = name.chars().count() + 1;
            Some((name, Quoting::Raw, len))
        }
        _ => None,
    }
}

fn read_variable_name(chars: &[char], start: usize) -> String {
    chars[start.min(chars.len())..]
        .iter()
        .take_while(|ch| is_variable_char(**ch))
        .collect()
}

fn is_variable_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

fn quote_literal(value: &str) -> String {
    let escaped = value.replace('\'', "''");
    if escaped.contains('\\') {
        format!("E'{}'", escaped.replace('\\', "\\\\"))
    } else {
        format!("'{escaped}'")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum Lexical {
    #[default]
    Plain,
    Single {
        backslash_escapes: bool,
    },
    Double,
    Dollar(String),
    LineComment,
    BlockComment(usize),
}

/// Tracks just enough SQL lexical state to tell whether a character sits
/// inside a string, quoted identifier, dollar-quoted body or comment.
#[derive(Debug, Default)]
struct SqlScanner {
    state: Lexical,
}

impl SqlScanner {
    fn is_plain(&self) -> bool {
        self.state == Lexical::Plain
    }

    fn consume(&mut self, chars: &[char], index: usize) -> usize {
        let ch = chars[index];
        let next = chars.get(index + 1).copied();
        let (len, transition) = match &self.state {
            Lexical::Plain => match ch {
                '\'' => (
                    1,
                    Some(Lexical::Single {
                        backslash_escapes: is_escape_string_prefix(chars, index),
                    }),
                ),
                '"' => (1, Some(Lexical::Double)),
                '-' if next == Some('-') => (2, Some(Lexical::LineComment)),
                '/' if next == Some('*') => (2, Some(Lexical::BlockComment(1))),
                '$' => match dollar_tag(chars, index) {
                    Some(tag) => (tag.chars().count(), Some(Lexical::Dollar(tag))),
                    None => (1, None),
                },
                _ => (1, None),
            },
            Lexical::Single { backslash_escapes } => match ch {
                '\\' if *backslash_escapes => (2, None),
                '\'' if next == Some('\'') => (2, None),
                '\'' => (1, Some(Lexical::Plain)),
                _ => (1, None),
            },
            Lexical::Double => match ch {
                '"' if next == Some('"') => (2, None),
                '"' => (1, Some(Lexical::Plain)),
                _ => (1, None),
            },
            Lexical::Dollar(tag) => {
                if matches_at(chars, index, tag) {
                    (tag.chars().count(), Some(Lexical::Plain))
                } else {
                    (1, None)
                }
            }
            Lexical::LineComment => {
                if ch == '\n' {
                    (1, Some(Lexical::Plain))
                } else {
                    (1, None)
                }
            }
            Lexical::BlockComment(depth) => match ch {
                '*' if next == Some('/') => {
                    if *depth <= 1 {
                        (2, Some(Lexical::Plain))
                    } else {
                        (2, Some(Lexical::BlockComment(depth - 1)))
                    }
                }
                '/' if next == Some('*') => (2, Some(Lexical::BlockComment(depth + 1))),
                _ => (1, None),
            },
        };

        if let Some(state) = transition {
            self.state = state;
        }
        len.min(chars.len() - index)
    }
}

fn is_escape_string_prefix(chars: &[char], quote: usize) -> bool {
    if quote == 0 || !matches!(chars[quote - 1], 'e' | 'E') {
        return false;
    }
    quote < 2 || !is_variable_char(chars[quote - 2])
}

fn dollar_tag(chars: &[char], start: usize) -> Option<String> {
    if start > 0 && is_variable_char(chars[start - 1]) {
        return None;
    }
    let mut tag = String::from("$");
    let mut index = start + 1;
    while let Some(&ch) = chars.get(index) {
        if ch == '$' {
            tag.push('$');
            return Some(tag);
        }
        if !is_variable_char(ch) || (index == start + 1 && ch.is_ascii_digit()) {
            return None;
        }
        tag.push(ch);
        index += 1;
    }
    None
}

fn matches_at(chars: &[char], index: usize, tag: &str) -> bool {
    let mut offset = index;
    for expected in tag.chars() {
        if chars.get(offset) != Some(&expected) {
            return false;
        }
        offset += 1;
    }
    true
}
