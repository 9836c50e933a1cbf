use log::trace;
use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

#[derive(Diagnostic, Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("invalid token {ch:?}")]
    InvalidCharacter {
        ch: char,
        #[label("this input character")]
        span: SourceSpan,
    },

    #[error("malformed number: digits followed by {next:?}")]
    #[diagnostic(help("a number must be followed by an operator, `)`, whitespace or the end of the line"))]
    MalformedNumber {
        next: char,
        #[label("this numeric literal")]
        span: SourceSpan,
    },

    #[error("integer literal {literal} does not fit in 64 bits")]
    IntegerOverflow {
        literal: String,
        #[label("this numeric literal")]
        span: SourceSpan,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub slice: &'a str,
    pub offset: usize,
    pub kind: TokenKind,
}

impl<'a> Token<'a> {
    fn new(slice: &'a str, offset: usize, kind: TokenKind) -> Self {
        Self {
            slice,
            offset,
            kind,
        }
    }

    pub fn span(&self) -> SourceSpan {
        (self.offset..self.offset + self.slice.len()).into()
    }
}

impl<'a> std::fmt::Display for Token<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            TokenKind::EndOfInput => write!(f, "<eof>"),
            _ => write!(f, "{}", self.slice),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Integer(i64),
    Plus,
    Minus,
    Star,
    Slash,
    LeftParen,
    RightParen,
    EndOfInput,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Integer(n) => write!(f, "integer {n}"),
            TokenKind::Plus => write!(f, "`+`"),
            TokenKind::Minus => write!(f, "`-`"),
            TokenKind::Star => write!(f, "`*`"),
            TokenKind::Slash => write!(f, "`/`"),
            TokenKind::LeftParen => write!(f, "`(`"),
            TokenKind::RightParen => write!(f, "`)`"),
            TokenKind::EndOfInput => write!(f, "end of input"),
        }
    }
}

/// Pull-based tokenizer over a single input line.
///
/// The cursor only moves forward. Once the input is exhausted every call to
/// [`Lexer::next_token`] returns an `EndOfInput` token.
#[derive(Debug)]
pub struct Lexer<'a> {
    rest: &'a str,
    byte: usize,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            rest: input,
            byte: 0,
            finished: false,
        }
    }

    pub fn next_token(&mut self) -> Result<Token<'a>, LexError> {
        let trimmed = self.rest.trim_start();
        self.byte += self.rest.len() - trimmed.len();
        self.rest = trimmed;

        let offset = self.byte;
        let Some(c) = self.rest.chars().next() else {
            return Ok(Token::new(&self.rest[..0], offset, TokenKind::EndOfInput));
        };

        let kind = match c {
            '0'..='9' => return self.integer(),
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            _ => {
                self.bump(c.len_utf8());
                return Err(LexError::InvalidCharacter {
                    ch: c,
                    span: (offset..self.byte).into(),
                });
            }
        };

        let slice = self.bump(1);
        let token = Token::new(slice, offset, kind);
        trace!("lexed {:?} at {}", token.kind, offset);
        Ok(token)
    }

    fn integer(&mut self) -> Result<Token<'a>, LexError> {
        let offset = self.byte;
        let end = self
            .rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(self.rest.len());
        let literal = self.bump(end);

        if let Some(next) = self.rest.chars().next() {
            if !(next.is_whitespace() || matches!(next, '+' | '-' | '*' | '/' | ')')) {
                return Err(LexError::MalformedNumber {
                    next,
                    span: (offset..self.byte + next.len_utf8()).into(),
                });
            }
        }

        let value = literal
            .parse::<i64>()
            .map_err(|_| LexError::IntegerOverflow {
                literal: literal.to_string(),
                span: (offset..self.byte).into(),
            })?;

        trace!("lexed integer {value} at {offset}");
        Ok(Token::new(literal, offset, TokenKind::Integer(value)))
    }

    fn bump(&mut self, len: usize) -> &'a str {
        let (taken, rest) = self.rest.split_at(len);
        self.rest = rest;
        self.byte += len;
        taken
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token<'a>, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let item = self.next_token();
        self.finished = match &item {
            Ok(token) => token.kind == TokenKind::EndOfInput,
            Err(_) => true,
        };
        Some(item)
    }
}
