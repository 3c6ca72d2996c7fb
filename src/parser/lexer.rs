//! Logos-based lexer for the sample language
//!
//! Produces every token, trivia included; the parser decides what to skip.

use logos::Logos;

use crate::base::{PointLocation, SegmentLocation};

/// A token with its kind, text, and byte offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub offset: usize,
}

impl Token<'_> {
    /// Offset of the last byte of the token
    pub fn end_offset(&self) -> usize {
        self.offset + self.text.len().max(1) - 1
    }
}

/// Lexer wrapping the logos-generated tokenizer
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, LogosToken>,
    offset: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            inner: LogosToken::lexer(input),
            offset: 0,
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let logos_token = self.inner.next()?;
        let text = self.inner.slice();
        let offset = self.offset;
        self.offset += text.len();

        let kind = match logos_token {
            Ok(t) => t.into(),
            Err(()) => TokenKind::Error,
        };

        Some(Token { kind, text, offset })
    }
}

/// Tokenize an entire string into a Vec
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    Lexer::new(input).collect()
}

/// Token kinds of the sample language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Whitespace,
    LineComment,
    BlockComment,
    Class,
    Ident,
    Number,
    String,
    LBrace,
    RBrace,
    LParen,
    RParen,
    Comma,
    Semicolon,
    /// Any other single character
    Punct,
    Error,
}

impl TokenKind {
    pub fn is_trivia(self) -> bool {
        matches!(self, Self::Whitespace | Self::LineComment | Self::BlockComment)
    }

    /// Grammar symbol of the token
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Whitespace => "WS",
            Self::LineComment => "COMMENT",
            Self::BlockComment => "BLOCK_COMMENT",
            Self::Class => "CLASS",
            Self::Ident => "ID",
            Self::Number => "NUMBER",
            Self::String => "STRING",
            Self::LBrace => "LBRACE",
            Self::RBrace => "RBRACE",
            Self::LParen => "LPAR",
            Self::RParen => "RPAR",
            Self::Comma => "COMMA",
            Self::Semicolon => "SEMICOLON",
            Self::Punct => "PUNCT",
            Self::Error => crate::base::constants::ERROR,
        }
    }
}

/// Logos token enum - maps to TokenKind
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
pub enum LogosToken {
    // =========================================================================
    // TRIVIA
    // =========================================================================
    #[regex(r"[ \t\r\n\f]+")]
    Whitespace,

    #[regex(r"//[^\n]*")]
    LineComment,

    #[regex(r"/\*([^*]|\*+[^*/])*\*+/")]
    BlockComment,

    // =========================================================================
    // WORDS AND LITERALS
    // =========================================================================
    #[token("class")]
    Class,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,

    #[regex(r"[0-9]+(\.[0-9]+)?")]
    Number,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    String,

    // =========================================================================
    // PUNCTUATION
    // =========================================================================
    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token(",")]
    Comma,

    #[token(";")]
    Semicolon,

    #[regex(r"[^ \t\r\n\fa-zA-Z0-9_{}(),;]")]
    Punct,
}

impl From<LogosToken> for TokenKind {
    fn from(token: LogosToken) -> Self {
        match token {
            LogosToken::Whitespace => Self::Whitespace,
            LogosToken::LineComment => Self::LineComment,
            LogosToken::BlockComment => Self::BlockComment,
            LogosToken::Class => Self::Class,
            LogosToken::Ident => Self::Ident,
            LogosToken::Number => Self::Number,
            LogosToken::String => Self::String,
            LogosToken::LBrace => Self::LBrace,
            LogosToken::RBrace => Self::RBrace,
            LogosToken::LParen => Self::LParen,
            LogosToken::RParen => Self::RParen,
            LogosToken::Comma => Self::Comma,
            LogosToken::Semicolon => Self::Semicolon,
            LogosToken::Punct => Self::Punct,
        }
    }
}

// ============================================================================
// Line index
// ============================================================================

/// Byte offset to line/column conversion. Lines and columns start at 1.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { line_starts }
    }

    pub fn point(&self, offset: usize) -> PointLocation {
        let line = self.line_starts.partition_point(|start| *start <= offset);
        let column = offset - self.line_starts[line.saturating_sub(1)] + 1;
        PointLocation::new(line, column, offset)
    }

    pub fn segment(&self, token: &Token<'_>) -> SegmentLocation {
        SegmentLocation::new(self.point(token.offset), self.point(token.end_offset()))
    }
}
