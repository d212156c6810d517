//! Tokens of a CMap program and the stream interface the interpreter reads them through.

use encoding_rs::WINDOWS_1252;
use std::fmt;
use std::iter::Peekable;

/// A lexical token of a CMap program.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Integer(i64),
    Real(f64),
    /// Name object, stored without the leading `/`.
    Name(String),
    /// Hexadecimal string, stored as decoded bytes.
    HexString(Vec<u8>),
    /// Literal string, stored as raw bytes with escapes resolved.
    LiteralString(Vec<u8>),
    Array(Vec<Token>),
    Dictionary(Vec<(String, Token)>),
    /// Bare keyword such as `begincmap`, `def` or `endbfrange`.
    Operator(String),
    Boolean(bool),
    Null,
    /// A lexeme the scanner could not make sense of.
    Invalid { offset: usize, lexeme: String },
}

impl Token {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Token::Integer(_) | Token::Real(_))
    }

    /// Integer value of a numeric token. Reals are accepted when they have no fractional part.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Token::Integer(value) => Some(value),
            Token::Real(value) if value.fract() == 0.0 => Some(value as i64),
            _ => None,
        }
    }

    pub fn as_hex_string(&self) -> Option<&[u8]> {
        match self {
            Token::HexString(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Token::Name(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_operator(&self) -> Option<&str> {
        match self {
            Token::Operator(keyword) => Some(keyword),
            _ => None,
        }
    }

    /// Text of a string token. Literal and hex strings in CMap headers are plain ASCII
    /// in practice, anything else is read as Windows-1252.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Token::LiteralString(bytes) | Token::HexString(bytes) => {
                let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
                Some(text.into_owned())
            }
            _ => None,
        }
    }

    /// Short type name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Token::Integer(_) => "integer",
            Token::Real(_) => "real",
            Token::Name(_) => "name",
            Token::HexString(_) => "hex string",
            Token::LiteralString(_) => "literal string",
            Token::Array(_) => "array",
            Token::Dictionary(_) => "dictionary",
            Token::Operator(_) => "operator",
            Token::Boolean(_) => "boolean",
            Token::Null => "null",
            Token::Invalid { .. } => "invalid lexeme",
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Integer(value) => write!(f, "integer {}", value),
            Token::Real(value) => write!(f, "real {}", value),
            Token::Name(name) => write!(f, "name /{}", name),
            Token::HexString(bytes) => {
                f.write_str("hex string <")?;
                for byte in bytes {
                    write!(f, "{:02X}", byte)?;
                }
                f.write_str(">")
            }
            Token::LiteralString(bytes) => write!(f, "literal string ({})", String::from_utf8_lossy(bytes)),
            Token::Array(items) => write!(f, "array of {} items", items.len()),
            Token::Dictionary(entries) => write!(f, "dictionary of {} entries", entries.len()),
            Token::Operator(keyword) => write!(f, "operator {}", keyword),
            Token::Boolean(value) => write!(f, "boolean {}", value),
            Token::Null => f.write_str("null"),
            Token::Invalid { offset, lexeme } => write!(f, "invalid lexeme {:?} at offset {}", lexeme, offset),
        }
    }
}

/// Forward-only source of tokens with one token of lookahead.
pub trait TokenStream {
    /// Consume and return the next token, `None` once the stream is exhausted.
    fn next_token(&mut self) -> Option<Token>;

    /// Look at the next token without consuming it.
    fn peek_token(&mut self) -> Option<&Token>;

    fn is_exhausted(&mut self) -> bool {
        self.peek_token().is_none()
    }
}

impl<I: Iterator<Item = Token>> TokenStream for Peekable<I> {
    fn next_token(&mut self) -> Option<Token> {
        self.next()
    }

    fn peek_token(&mut self) -> Option<&Token> {
        self.peek()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_tokens() {
        assert!(Token::Integer(3).is_numeric());
        assert!(Token::Real(1.5).is_numeric());
        assert!(!Token::Name("WMode".into()).is_numeric());
        assert_eq!(Token::Real(12.0).as_i64(), Some(12));
        assert_eq!(Token::Real(12.5).as_i64(), None);
    }

    #[test]
    fn display_hex_string() {
        let token = Token::HexString(vec![0x00, 0x41]);
        assert_eq!(token.to_string(), "hex string <0041>");
    }

    #[test]
    fn literal_string_as_text() {
        let token = Token::LiteralString(b"Adobe".to_vec());
        assert_eq!(token.as_text().as_deref(), Some("Adobe"));
        assert_eq!(Token::Integer(1).as_text(), None);
    }

    #[test]
    fn peekable_iterator_is_a_token_stream() {
        let mut stream = vec![Token::Integer(1), Token::Operator("def".into())]
            .into_iter()
            .peekable();
        assert_eq!(stream.peek_token(), Some(&Token::Integer(1)));
        assert_eq!(stream.next_token(), Some(Token::Integer(1)));
        assert_eq!(stream.next_token(), Some(Token::Operator("def".into())));
        assert!(stream.is_exhausted());
    }
}
