//! Tokenizer for first-order formula text.

use crate::error::FormulaError;

/// Formula tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Ident(String),

    LParen,
    RParen,
    Comma,
    Dot,

    Not,     // - ¬ ~
    And,     // & ∧
    Or,      // | ∨
    Implies, // -> →
    Iff,     // <-> ↔
    Eq,      // =
    Neq,     // !=
    Forall,  // all forall ∀
    Exists,  // exists exist some ∃

    Eof,
}

impl Token {
    /// Human-readable token name for error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("identifier `{name}`"),
            Token::LParen => "`(`".into(),
            Token::RParen => "`)`".into(),
            Token::Comma => "`,`".into(),
            Token::Dot => "`.`".into(),
            Token::Not => "negation".into(),
            Token::And => "`&`".into(),
            Token::Or => "`|`".into(),
            Token::Implies => "`->`".into(),
            Token::Iff => "`<->`".into(),
            Token::Eq => "`=`".into(),
            Token::Neq => "`!=`".into(),
            Token::Forall => "`all`".into(),
            Token::Exists => "`exists`".into(),
            Token::Eof => "end of input".into(),
        }
    }
}

/// A token with its byte range in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    pub token: Token,
    pub start: usize,
    pub end: usize,
}

/// Split `source` into tokens, ending with a single [`Token::Eof`].
pub fn tokenize(source: &str) -> Result<Vec<Spanned>, FormulaError> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let spanned = lexer.next_token()?;
        let done = spanned.token == Token::Eof;
        tokens.push(spanned);
        if done {
            return Ok(tokens);
        }
    }
}

struct Lexer<'a> {
    input: &'a str,
    position: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Lexer { input, position: 0 }
    }

    fn next_token(&mut self) -> Result<Spanned, FormulaError> {
        self.skip_whitespace();
        let start = self.position;
        let remaining = &self.input[start..];

        let Some(ch) = remaining.chars().next() else {
            return Ok(Spanned {
                token: Token::Eof,
                start,
                end: start,
            });
        };

        let (token, len) = match ch {
            '(' => (Token::LParen, 1),
            ')' => (Token::RParen, 1),
            ',' => (Token::Comma, 1),
            '.' => (Token::Dot, 1),
            '&' => (Token::And, 1),
            '|' => (Token::Or, 1),
            '=' => (Token::Eq, 1),
            '~' => (Token::Not, 1),
            '¬' => (Token::Not, ch.len_utf8()),
            '∧' => (Token::And, ch.len_utf8()),
            '∨' => (Token::Or, ch.len_utf8()),
            '→' => (Token::Implies, ch.len_utf8()),
            '↔' => (Token::Iff, ch.len_utf8()),
            '∀' => (Token::Forall, ch.len_utf8()),
            '∃' => (Token::Exists, ch.len_utf8()),
            '-' if remaining.starts_with("->") => (Token::Implies, 2),
            '-' => (Token::Not, 1),
            '<' if remaining.starts_with("<->") => (Token::Iff, 3),
            '!' if remaining.starts_with("!=") => (Token::Neq, 2),
            c if is_ident_start(c) => {
                let len = remaining
                    .char_indices()
                    .find(|&(_, c)| !is_ident_continue(c))
                    .map_or(remaining.len(), |(i, _)| i);
                let word = &remaining[..len];
                let token = match word {
                    "all" | "forall" => Token::Forall,
                    "exists" | "exist" | "some" => Token::Exists,
                    _ => Token::Ident(word.to_string()),
                };
                (token, len)
            }
            other => {
                return Err(FormulaError::Parse {
                    message: format!("unexpected character `{other}`"),
                    src: self.input.to_string(),
                    span: (start, other.len_utf8()).into(),
                });
            }
        };

        self.position += len;
        Ok(Spanned {
            token,
            start,
            end: start + len,
        })
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.input[self.position..];
        let trimmed = rest.trim_start();
        self.position += rest.len() - trimmed.len();
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
