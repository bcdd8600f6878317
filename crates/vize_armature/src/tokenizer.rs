//! Render-function tokenizer.
//!
//! Splits render-function source into a flat token list. The language is a
//! small, closed subset of JavaScript: no regular expressions, no template
//! interpolation, no assignment operators beyond declarations.

use vize_carton::CompactString;

use crate::ParseError;

/// Character codes for fast comparison
pub mod char_codes {
    pub const TAB: u8 = 0x09;
    pub const NEWLINE: u8 = 0x0A;
    pub const CARRIAGE_RETURN: u8 = 0x0D;
    pub const SPACE: u8 = 0x20;
    pub const EXCLAMATION_MARK: u8 = 0x21;
    pub const DOUBLE_QUOTE: u8 = 0x22;
    pub const DOLLAR: u8 = 0x24;
    pub const AMP: u8 = 0x26;
    pub const SINGLE_QUOTE: u8 = 0x27;
    pub const LEFT_PAREN: u8 = 0x28;
    pub const RIGHT_PAREN: u8 = 0x29;
    pub const PLUS: u8 = 0x2B;
    pub const COMMA: u8 = 0x2C;
    pub const DOT: u8 = 0x2E;
    pub const SLASH: u8 = 0x2F;
    pub const ZERO: u8 = 0x30;
    pub const NINE: u8 = 0x39;
    pub const COLON: u8 = 0x3A;
    pub const SEMI: u8 = 0x3B;
    pub const EQ: u8 = 0x3D;
    pub const GT: u8 = 0x3E;
    pub const QUESTION_MARK: u8 = 0x3F;
    pub const LEFT_SQUARE: u8 = 0x5B;
    pub const BACKSLASH: u8 = 0x5C;
    pub const RIGHT_SQUARE: u8 = 0x5D;
    pub const UNDERSCORE: u8 = 0x5F;
    pub const GRAVE_ACCENT: u8 = 0x60;
    pub const LEFT_BRACE: u8 = 0x7B;
    pub const PIPE: u8 = 0x7C;
    pub const RIGHT_BRACE: u8 = 0x7D;
}

use char_codes::*;

/// Punctuators and operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punct {
    LeftParen,
    RightParen,
    LeftSquare,
    RightSquare,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Semi,
    Colon,
    Question,
    Arrow,
    Plus,
    Bang,
    Assign,
    StrictEq,
    StrictNotEq,
    AndAnd,
    OrOr,
}

/// Token payload
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(CompactString),
    Str(String),
    Num(f64),
    Punct(Punct),
    Eof,
}

/// A token with its starting byte offset
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

/// Byte-oriented tokenizer
pub struct Tokenizer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    index: usize,
}

#[inline]
fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == UNDERSCORE || c == DOLLAR
}

#[inline]
fn is_ident_part(c: u8) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            index: 0,
        }
    }

    /// Tokenize the whole input. The last token is always [`TokenKind::Eof`].
    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia()?;
            let offset = self.index;
            let Some(&c) = self.bytes.get(self.index) else {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    offset,
                });
                return Ok(tokens);
            };
            let kind = match c {
                DOUBLE_QUOTE | SINGLE_QUOTE => self.read_quoted(c)?,
                GRAVE_ACCENT => self.read_backtick()?,
                ZERO..=NINE => self.read_number()?,
                c if is_ident_start(c) => self.read_ident(),
                _ => TokenKind::Punct(self.read_punct()?),
            };
            tokens.push(Token { kind, offset });
        }
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.index + ahead).copied()
    }

    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        while let Some(c) = self.peek_at(0) {
            match c {
                SPACE | TAB | NEWLINE | CARRIAGE_RETURN => self.index += 1,
                SLASH if self.peek_at(1) == Some(SLASH) => {
                    while let Some(c) = self.peek_at(0) {
                        if c == NEWLINE {
                            break;
                        }
                        self.index += 1;
                    }
                }
                SLASH if self.peek_at(1) == Some(b'*') => {
                    let start = self.index;
                    match self.source[self.index + 2..].find("*/") {
                        Some(end) => self.index += end + 4,
                        None => return Err(ParseError::new("unterminated comment", start)),
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn read_ident(&mut self) -> TokenKind {
        let start = self.index;
        while self.peek_at(0).is_some_and(is_ident_part) {
            self.index += 1;
        }
        TokenKind::Ident(CompactString::from(&self.source[start..self.index]))
    }

    fn read_number(&mut self) -> Result<TokenKind, ParseError> {
        let start = self.index;
        while self
            .peek_at(0)
            .is_some_and(|c| c.is_ascii_digit() || c == DOT)
        {
            self.index += 1;
        }
        self.source[start..self.index]
            .parse::<f64>()
            .map(TokenKind::Num)
            .map_err(|_| ParseError::new("invalid number literal", start))
    }

    fn read_quoted(&mut self, quote: u8) -> Result<TokenKind, ParseError> {
        let start = self.index;
        self.index += 1;
        let mut value = String::new();
        loop {
            let Some(c) = self.peek_at(0) else {
                return Err(ParseError::new("unterminated string literal", start));
            };
            if c == quote {
                self.index += 1;
                return Ok(TokenKind::Str(value));
            }
            if c == BACKSLASH {
                value.push(self.read_escape(start)?);
                continue;
            }
            if c == NEWLINE {
                return Err(ParseError::new("line break in string literal", start));
            }
            let ch = self.source[self.index..]
                .chars()
                .next()
                .ok_or_else(|| ParseError::new("unterminated string literal", start))?;
            value.push(ch);
            self.index += ch.len_utf8();
        }
    }

    fn read_escape(&mut self, start: usize) -> Result<char, ParseError> {
        // Skip the backslash.
        self.index += 1;
        let Some(c) = self.peek_at(0) else {
            return Err(ParseError::new("unterminated string literal", start));
        };
        self.index += 1;
        let ch = match c {
            b'n' => '\n',
            b'r' => '\r',
            b't' => '\t',
            b'0' => '\0',
            b'u' => {
                let digits = self
                    .source
                    .get(self.index..self.index + 4)
                    .ok_or_else(|| ParseError::new("invalid unicode escape", self.index))?;
                let code = u32::from_str_radix(digits, 16)
                    .map_err(|_| ParseError::new("invalid unicode escape", self.index))?;
                self.index += 4;
                char::from_u32(code)
                    .ok_or_else(|| ParseError::new("invalid unicode escape", self.index))?
            }
            _ => {
                // Any other escaped character stands for itself.
                self.index -= 1;
                let ch = self.source[self.index..]
                    .chars()
                    .next()
                    .ok_or_else(|| ParseError::new("unterminated string literal", start))?;
                self.index += ch.len_utf8();
                ch
            }
        };
        Ok(ch)
    }

    /// Backtick literals are taken verbatim: `${` is plain text and only
    /// `` \` `` and `\\` are unescaped.
    fn read_backtick(&mut self) -> Result<TokenKind, ParseError> {
        let start = self.index;
        self.index += 1;
        let mut value = String::new();
        loop {
            let Some(c) = self.peek_at(0) else {
                return Err(ParseError::new("unterminated template literal", start));
            };
            match c {
                GRAVE_ACCENT => {
                    self.index += 1;
                    return Ok(TokenKind::Str(value));
                }
                BACKSLASH if matches!(self.peek_at(1), Some(GRAVE_ACCENT | BACKSLASH)) => {
                    value.push(self.peek_at(1).map(char::from).unwrap_or('\\'));
                    self.index += 2;
                }
                _ => {
                    let ch = self.source[self.index..]
                        .chars()
                        .next()
                        .ok_or_else(|| ParseError::new("unterminated template literal", start))?;
                    value.push(ch);
                    self.index += ch.len_utf8();
                }
            }
        }
    }

    fn read_punct(&mut self) -> Result<Punct, ParseError> {
        let start = self.index;
        let c = self.bytes[self.index];
        let next = self.peek_at(1);
        let (punct, len) = match c {
            LEFT_PAREN => (Punct::LeftParen, 1),
            RIGHT_PAREN => (Punct::RightParen, 1),
            LEFT_SQUARE => (Punct::LeftSquare, 1),
            RIGHT_SQUARE => (Punct::RightSquare, 1),
            LEFT_BRACE => (Punct::LeftBrace, 1),
            RIGHT_BRACE => (Punct::RightBrace, 1),
            COMMA => (Punct::Comma, 1),
            DOT => (Punct::Dot, 1),
            SEMI => (Punct::Semi, 1),
            COLON => (Punct::Colon, 1),
            QUESTION_MARK => (Punct::Question, 1),
            PLUS => (Punct::Plus, 1),
            EQ if next == Some(GT) => (Punct::Arrow, 2),
            EQ if next == Some(EQ) && self.peek_at(2) == Some(EQ) => (Punct::StrictEq, 3),
            EQ => (Punct::Assign, 1),
            EXCLAMATION_MARK if next == Some(EQ) && self.peek_at(2) == Some(EQ) => {
                (Punct::StrictNotEq, 3)
            }
            EXCLAMATION_MARK => (Punct::Bang, 1),
            AMP if next == Some(AMP) => (Punct::AndAnd, 2),
            PIPE if next == Some(PIPE) => (Punct::OrOr, 2),
            _ => {
                let ch = self.source[start..].chars().next().unwrap_or('?');
                return Err(ParseError::new(
                    format!("unexpected character `{}`", ch),
                    start,
                ));
            }
        };
        self.index += len;
        Ok(punct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Tokenizer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_call() {
        assert_eq!(
            kinds(r#"_v("hi")"#),
            vec![
                TokenKind::Ident("_v".into()),
                TokenKind::Punct(Punct::LeftParen),
                TokenKind::Str("hi".into()),
                TokenKind::Punct(Punct::RightParen),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("a === b !== !c && d || e => f = 1.5"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Punct(Punct::StrictEq),
                TokenKind::Ident("b".into()),
                TokenKind::Punct(Punct::StrictNotEq),
                TokenKind::Punct(Punct::Bang),
                TokenKind::Ident("c".into()),
                TokenKind::Punct(Punct::AndAnd),
                TokenKind::Ident("d".into()),
                TokenKind::Punct(Punct::OrOr),
                TokenKind::Ident("e".into()),
                TokenKind::Punct(Punct::Arrow),
                TokenKind::Ident("f".into()),
                TokenKind::Punct(Punct::Assign),
                TokenKind::Num(1.5),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#""a\"b\nA" 'it\'s'"#),
            vec![
                TokenKind::Str("a\"b\nA".into()),
                TokenKind::Str("it's".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_backtick_is_verbatim() {
        assert_eq!(
            kinds("`<p>${name}</p>`"),
            vec![TokenKind::Str("<p>${name}</p>".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(
            kinds("// note\na /* b */"),
            vec![TokenKind::Ident("a".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn test_errors() {
        assert!(Tokenizer::new("\"open").tokenize().is_err());
        assert!(Tokenizer::new("a # b").tokenize().is_err());
        assert!(Tokenizer::new("/* open").tokenize().is_err());
    }
}
