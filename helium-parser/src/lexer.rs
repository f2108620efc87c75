// helium-parser - Lexer for Helium
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Lexer (tokeniser) for Helium source code.
//!
//! Converts a source string into a flat vector of positioned tokens. The
//! scanner keeps a one-byte lookahead; multi-character operators are matched
//! against the lookahead before the single-character fallthrough.

use std::fmt;

use itertools::Itertools;
use smol_str::SmolStr;

use crate::pos::Position;
use crate::report;

/// The kind of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Symbol,
    Integer,
    Float,
    Bool,
    String,
    Null,
    Operator,
    /// The assignment arrow `<-`.
    Assign,
    /// The call marker `@`.
    Call,
    /// The function marker `$`.
    Function,
    Loop,
    If,
    Else,
    Return,
    Include,
    /// The argument separator `,`.
    Separator,
    Colon,
    Dot,
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftSquare,
    RightSquare,
    Newline,
    Whitespace,
    Comment,
    Eof,
}

/// A token with its source text and frozen starting position.
#[derive(Debug, Clone)]
pub struct Token {
    pub value: SmolStr,
    pub kind: TokenKind,
    pub pos: Position,
}

impl Token {
    fn new(value: &str, kind: TokenKind, pos: Position) -> Self {
        Token {
            value: SmolStr::new(value),
            kind,
            pos,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:03}, {:03}) {:<12} {}",
            self.pos.line + 1,
            self.pos.column + 1,
            format!("{:?}", self.kind),
            self.value
        )
    }
}

/// Render a token stream one token per line, for tracing.
pub fn display_tokens(tokens: &[Token]) -> String {
    tokens.iter().map(|token| token.to_string()).join("\n")
}

/// Lexer error with position information.
#[derive(Debug, Clone)]
pub struct LexError {
    pub message: String,
    pub pos: Position,
    pub line_text: String,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        report::write_diagnostic(f, &self.message, &self.pos, &self.line_text)
    }
}

impl std::error::Error for LexError {}

/// Scan a complete source and return all non-whitespace, non-comment tokens
/// in source order, terminated by exactly one `Eof` token.
pub fn lexify(source: &str, origin: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer::new(source, origin);
    let mut tokens = Vec::new();

    loop {
        let token = lexer.next_token()?;
        match token.kind {
            TokenKind::Whitespace | TokenKind::Comment => continue,
            TokenKind::Eof => {
                tokens.push(token);
                break;
            }
            _ => tokens.push(token),
        }
    }

    Ok(tokens)
}

/// The lexer scans bytes with a one-byte lookahead.
///
/// Source is treated as bytes; positions count bytes. `\n` terminates a
/// line, CR is plain whitespace.
pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    /// Byte index of `lookahead`.
    offset: usize,
    /// Next unconsumed byte, `0` at end of input.
    lookahead: u8,
    /// Position of `lookahead`.
    pos: Position,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, origin: &str) -> Self {
        Lexer {
            source,
            bytes: source.as_bytes(),
            offset: 0,
            lookahead: source.as_bytes().first().copied().unwrap_or(0),
            pos: Position::start(origin),
        }
    }

    /// Scan the next token. Whitespace and comments are returned as tokens
    /// of their own kind so [`lexify`] can filter them.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        let start = self.pos.clone();
        let c = self.lookahead;

        if c == 0 {
            return Ok(Token::new("", TokenKind::Eof, start));
        }

        if c.is_ascii_alphabetic() || c == b'_' {
            return Ok(self.scan_symbol(start));
        }

        if c.is_ascii_digit() {
            return Ok(self.scan_number(start));
        }

        if c == b'"' {
            return self.scan_string(start);
        }

        // Multi-character operators take priority over their first byte.
        if self.check_pattern(b"<-") {
            return Ok(Token::new("<-", TokenKind::Assign, start));
        }
        for pattern in ["<=", ">=", "==", "!=", "&&", "||"] {
            if self.check_pattern(pattern.as_bytes()) {
                return Ok(Token::new(pattern, TokenKind::Operator, start));
            }
        }

        self.advance();
        let kind = match c {
            b'\n' => TokenKind::Newline,
            b' ' | b'\t' | b'\r' => {
                while matches!(self.lookahead, b' ' | b'\t' | b'\r') {
                    self.advance();
                }
                return Ok(Token::new("", TokenKind::Whitespace, start));
            }
            b'#' => {
                while self.lookahead != b'\n' && self.lookahead != 0 {
                    self.advance();
                }
                return Ok(Token::new("", TokenKind::Comment, start));
            }
            b'+' | b'-' | b'*' | b'/' | b'%' | b'<' | b'>' | b'&' | b'|' | b'^' | b'~' | b'!' => {
                TokenKind::Operator
            }
            b'{' => TokenKind::LeftBrace,
            b'}' => TokenKind::RightBrace,
            b'(' => TokenKind::LeftParen,
            b')' => TokenKind::RightParen,
            b'[' => TokenKind::LeftSquare,
            b']' => TokenKind::RightSquare,
            b',' => TokenKind::Separator,
            b':' => TokenKind::Colon,
            b'.' => TokenKind::Dot,
            b'@' => TokenKind::Call,
            b'$' => TokenKind::Function,
            _ => {
                let glyph = self.source[start.char_offset as usize..]
                    .chars()
                    .next()
                    .unwrap_or('\0');
                return Err(self.error(start, format!("failed to identify symbol '{}'", glyph)));
            }
        };

        // Only single ASCII glyphs reach this point.
        let glyph = &self.source[start.char_offset as usize..start.char_offset as usize + 1];
        Ok(Token::new(glyph, kind, start))
    }

    fn scan_symbol(&mut self, start: Position) -> Token {
        let from = self.offset;
        self.advance();
        while self.lookahead.is_ascii_alphanumeric() || self.lookahead == b'_' {
            self.advance();
        }

        let value = &self.source[from..self.offset];
        let kind = match value {
            "true" | "false" => TokenKind::Bool,
            "null" => TokenKind::Null,
            "return" => TokenKind::Return,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "loop" => TokenKind::Loop,
            "include" => TokenKind::Include,
            // Spelled-out alias for the `$` function marker.
            "fn" => TokenKind::Function,
            _ => TokenKind::Symbol,
        };

        Token::new(value, kind, start)
    }

    fn scan_number(&mut self, start: Position) -> Token {
        let from = self.offset;
        self.advance();
        while self.lookahead.is_ascii_digit() {
            self.advance();
        }

        // A dot only extends the literal when a digit follows it, so
        // table access like `t.x` stays unambiguous.
        let mut kind = TokenKind::Integer;
        if self.lookahead == b'.' && self.peek_second().is_ascii_digit() {
            self.advance();
            while self.lookahead.is_ascii_digit() {
                self.advance();
            }
            kind = TokenKind::Float;
        }

        Token::new(&self.source[from..self.offset], kind, start)
    }

    fn scan_string(&mut self, start: Position) -> Result<Token, LexError> {
        self.advance();
        let from = self.offset;

        loop {
            match self.lookahead {
                0 => return Err(self.error(start, "unterminated string literal")),
                b'"' => {
                    let value = &self.source[from..self.offset];
                    self.advance();
                    return Ok(Token::new(value, TokenKind::String, start));
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// Consume `pattern` if the source continues with it.
    fn check_pattern(&mut self, pattern: &[u8]) -> bool {
        if !self.bytes[self.offset..].starts_with(pattern) {
            return false;
        }
        for _ in 0..pattern.len() {
            self.advance();
        }
        true
    }

    fn advance(&mut self) -> u8 {
        let c = self.lookahead;
        if c == 0 {
            return 0;
        }

        self.offset += 1;
        self.lookahead = self.bytes.get(self.offset).copied().unwrap_or(0);

        if c == b'\n' {
            self.pos.line += 1;
            self.pos.column = 0;
            self.pos.line_offset = self.offset as u32;
        } else {
            self.pos.column += 1;
        }
        self.pos.char_offset = self.offset as u32;

        c
    }

    fn peek_second(&self) -> u8 {
        self.bytes.get(self.offset + 1).copied().unwrap_or(0)
    }

    fn error(&self, pos: Position, message: impl Into<String>) -> LexError {
        LexError {
            message: message.into(),
            line_text: report::line_at(self.source, pos.line_offset),
            pos,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Token> {
        lexify(source, "test.he").unwrap()
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_assignment() {
        assert_eq!(
            kinds("x <- 1"),
            vec![
                TokenKind::Symbol,
                TokenKind::Assign,
                TokenKind::Integer,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            kinds("true false null return if else loop include fn other"),
            vec![
                TokenKind::Bool,
                TokenKind::Bool,
                TokenKind::Null,
                TokenKind::Return,
                TokenKind::If,
                TokenKind::Else,
                TokenKind::Loop,
                TokenKind::Include,
                TokenKind::Function,
                TokenKind::Symbol,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_multi_character_operators() {
        let tokens = lex("<= >= == != && || <-");
        let values: Vec<&str> = tokens.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(values, vec!["<=", ">=", "==", "!=", "&&", "||", "<-", ""]);
        assert_eq!(tokens[6].kind, TokenKind::Assign);
        for token in &tokens[..6] {
            assert_eq!(token.kind, TokenKind::Operator);
        }
    }

    #[test]
    fn test_numbers() {
        let tokens = lex("12 3.5 4.");
        assert_eq!(tokens[0].kind, TokenKind::Integer);
        assert_eq!(tokens[0].value, "12");
        assert_eq!(tokens[1].kind, TokenKind::Float);
        assert_eq!(tokens[1].value, "3.5");
        // A trailing dot is not part of the number.
        assert_eq!(tokens[2].kind, TokenKind::Integer);
        assert_eq!(tokens[2].value, "4");
        assert_eq!(tokens[3].kind, TokenKind::Dot);
    }

    #[test]
    fn test_string_value_excludes_quotes() {
        let tokens = lex("\"hello world\"");
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].value, "hello world");
    }

    #[test]
    fn test_whitespace_and_comments_are_filtered() {
        let tokens = lex("x \t# trailing comment\ny");
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Symbol,
                TokenKind::Newline,
                TokenKind::Symbol,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_single_trailing_eof() {
        let tokens = lex("x <- 1\n");
        let eofs = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Eof)
            .count();
        assert_eq!(eofs, 1);
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn test_positions() {
        let tokens = lex("a\nbb");
        assert_eq!((tokens[0].pos.line, tokens[0].pos.column), (0, 0));
        assert_eq!(tokens[0].pos.char_offset, 0);
        assert_eq!(tokens[1].kind, TokenKind::Newline);
        assert_eq!((tokens[1].pos.line, tokens[1].pos.column), (0, 1));
        assert_eq!((tokens[2].pos.line, tokens[2].pos.column), (1, 0));
        assert_eq!(tokens[2].pos.char_offset, 2);
        assert_eq!(tokens[2].pos.line_offset, 2);
    }

    #[test]
    fn test_brackets_and_punctuation() {
        assert_eq!(
            kinds("{}()[],:.@$"),
            vec![
                TokenKind::LeftBrace,
                TokenKind::RightBrace,
                TokenKind::LeftParen,
                TokenKind::RightParen,
                TokenKind::LeftSquare,
                TokenKind::RightSquare,
                TokenKind::Separator,
                TokenKind::Colon,
                TokenKind::Dot,
                TokenKind::Call,
                TokenKind::Function,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unknown_character() {
        let err = lexify("x <- ?", "test.he").unwrap_err();
        assert!(err.message.contains("failed to identify symbol"));
        assert_eq!((err.pos.line, err.pos.column), (0, 5));
    }

    #[test]
    fn test_unterminated_string() {
        let err = lexify("x <- \"abc", "test.he").unwrap_err();
        assert!(err.message.contains("unterminated string"));
        assert_eq!(err.pos.column, 5);
    }

    #[test]
    fn test_diagnostic_format() {
        let err = lexify("x <- ?", "test.he").unwrap_err();
        let rendered = err.to_string();
        assert_eq!(
            rendered,
            "[err] failed to identify symbol '?' (1, 6) in test.he:\n\
             \t|\n\
             \t| 0001 x <- ?\n\
             \t| ~~~~~~~~~~^"
        );
    }
}
