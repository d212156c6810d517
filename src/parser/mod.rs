use crate::token::{Token, TokenStream};
use std::str::{self, FromStr};

use nom::branch::alt;
use nom::bytes::complete::{tag, take, take_while, take_while1, take_while_m_n};
use nom::character::complete::{digit0, digit1, one_of};
use nom::combinator::{map, map_opt, map_res, opt, recognize};
use nom::error::{ErrorKind, ParseError};
use nom::multi::{fold_many0, many0};
use nom::sequence::{delimited, pair, preceded, terminated};
use nom::{AsChar, IResult, Input, Parser};
use nom_locate::LocatedSpan;

pub(crate) type ParserInput<'a> = LocatedSpan<&'a [u8], &'a str>;
pub(crate) type NomError<'a> = nom::error::Error<ParserInput<'a>>;
pub(crate) type NomResult<'a, O, E = NomError<'a>> = IResult<ParserInput<'a>, O, E>;

/// Maximum nesting of arrays, dictionaries and parenthesised strings.
const MAX_BRACKET: usize = 100;

pub(crate) fn eol(input: ParserInput) -> NomResult<ParserInput> {
    alt((tag(&b"\r\n"[..]), tag(&b"\n"[..]), tag(&b"\r"[..]))).parse(input)
}

/// `%` up to the end of the line. A comment may also run to the end of input.
pub(crate) fn comment(input: ParserInput) -> NomResult<()> {
    map(
        (tag(&b"%"[..]), take_while(|c: u8| !b"\r\n".contains(&c)), opt(eol)),
        |_| (),
    )
    .parse(input)
}

#[inline]
fn is_whitespace(c: u8) -> bool {
    b" \t\n\r\0\x0C".contains(&c)
}

#[inline]
fn is_delimiter(c: u8) -> bool {
    b"()<>[]{}/%".contains(&c)
}

#[inline]
fn is_regular(c: u8) -> bool {
    !is_whitespace(c) && !is_delimiter(c)
}

#[inline]
fn is_direct_literal_string(c: u8) -> bool {
    !b"()\\\r\n".contains(&c)
}

fn white_space(input: ParserInput) -> NomResult<()> {
    map(take_while(is_whitespace), |_| ()).parse(input)
}

pub(crate) fn space(input: ParserInput) -> NomResult<()> {
    fold_many0(
        alt((map(take_while1(is_whitespace), |_| ()), comment)),
        || {},
        |_, _| (),
    )
    .parse(input)
}

fn utf8<'a>(span: ParserInput<'a>) -> Result<&'a str, str::Utf8Error> {
    str::from_utf8(*span.fragment())
}

fn integer(input: ParserInput) -> NomResult<i64> {
    map_res(recognize(pair(opt(one_of("+-")), digit1)), |digits: ParserInput| {
        utf8(digits).map_err(|_| ErrorKind::Digit).and_then(|s| i64::from_str(s).map_err(|_| ErrorKind::Digit))
    })
    .parse(input)
}

fn real(input: ParserInput) -> NomResult<f64> {
    let number = recognize(pair(
        opt(one_of("+-")),
        alt((
            map((digit1, tag(&b"."[..]), digit0), |_| ()),
            map(pair(tag(&b"."[..]), digit1), |_| ()),
        )),
    ));
    map_res(number, |digits: ParserInput| {
        utf8(digits).map_err(|_| ErrorKind::Float).and_then(|s| f64::from_str(s).map_err(|_| ErrorKind::Float))
    })
    .parse(input)
}

#[inline]
fn hex_digit(input: ParserInput) -> NomResult<u8> {
    map_opt(take(1usize), |c: ParserInput| {
        let c = c[0];
        if c.is_hex_digit() { (c as char).to_digit(16).map(|d| d as u8) } else { None }
    })
    .parse(input)
}

fn hex_char(input: ParserInput) -> NomResult<u8> {
    map(pair(hex_digit, hex_digit), |(high, low)| (high << 4) | low).parse(input)
}

fn name(input: ParserInput) -> NomResult<String> {
    map(
        preceded(
            tag(&b"/"[..]),
            many0(alt((
                preceded(tag(&b"#"[..]), hex_char),
                map_opt(take(1usize), |c: ParserInput| {
                    if c[0] != b'#' && is_regular(c[0]) { Some(c[0]) } else { None }
                }),
            ))),
        ),
        |bytes| String::from_utf8_lossy(&bytes).into_owned(),
    )
    .parse(input)
}

fn oct_char(input: ParserInput) -> NomResult<u8> {
    map_res(
        take_while_m_n(1, 3, AsChar::is_oct_digit),
        // Overflow is ignored, as for any other PDF string.
        |digits: ParserInput| {
            utf8(digits)
                .map_err(|_| ErrorKind::OctDigit)
                .and_then(|s| u16::from_str_radix(s, 8).map_err(|_| ErrorKind::OctDigit))
                .map(|o| o as u8)
        },
    )
    .parse(input)
}

fn escape_sequence(input: ParserInput) -> NomResult<Option<u8>> {
    preceded(
        tag(&b"\\"[..]),
        alt((
            map(oct_char, Some),
            map(eol, |_| None),
            map(tag(&b"n"[..]), |_| Some(b'\n')),
            map(tag(&b"r"[..]), |_| Some(b'\r')),
            map(tag(&b"t"[..]), |_| Some(b'\t')),
            map(tag(&b"b"[..]), |_| Some(b'\x08')),
            map(tag(&b"f"[..]), |_| Some(b'\x0C')),
            map(take(1usize), |c: ParserInput| Some(c[0])),
        )),
    )
    .parse(input)
}

fn inner_literal_string<'a>(input: ParserInput<'a>, depth: usize) -> NomResult<'a, Vec<u8>> {
    fold_many0(
        alt((
            map(take_while1(is_direct_literal_string), |s: ParserInput<'a>| s.to_vec()),
            map(escape_sequence, |e: Option<u8>| e.into_iter().collect::<Vec<u8>>()),
            map(eol, |s: ParserInput<'a>| s.to_vec()),
            |i: ParserInput<'a>| nested_literal_string(i, depth),
        )),
        Vec::new,
        |mut out: Vec<u8>, segment| {
            out.extend(segment);
            out
        },
    )
    .parse(input)
}

fn nested_literal_string<'a>(input: ParserInput<'a>, depth: usize) -> NomResult<'a, Vec<u8>> {
    if depth == 0 {
        return Err(nom::Err::Error(NomError::from_error_kind(input, ErrorKind::TooLarge)));
    }
    map(
        delimited(
            tag(&b"("[..]),
            |i: ParserInput<'a>| inner_literal_string(i, depth - 1),
            tag(&b")"[..]),
        ),
        |mut content| {
            content.insert(0, b'(');
            content.push(b')');
            content
        },
    )
    .parse(input)
}

fn literal_string<'a>(input: ParserInput<'a>) -> NomResult<'a, Vec<u8>> {
    delimited(
        tag(&b"("[..]),
        |i: ParserInput<'a>| inner_literal_string(i, MAX_BRACKET),
        tag(&b")"[..]),
    )
    .parse(input)
}

/// `<...>` with embedded whitespace allowed. A trailing odd nibble is padded with zero.
fn hexadecimal_string(input: ParserInput) -> NomResult<Vec<u8>> {
    map(
        delimited(
            tag(&b"<"[..]),
            terminated(
                fold_many0(
                    preceded(white_space, hex_digit),
                    || -> (Vec<u8>, Option<u8>) { (Vec::new(), None) },
                    |(mut out, pending), c| match pending {
                        None => (out, Some(c)),
                        Some(high) => {
                            out.push((high << 4) | c);
                            (out, None)
                        }
                    },
                ),
                white_space,
            ),
            tag(&b">"[..]),
        ),
        |(mut bytes, pending)| {
            if let Some(high) = pending {
                bytes.push(high << 4);
            }
            bytes
        },
    )
    .parse(input)
}

fn keyword(input: ParserInput) -> NomResult<Token> {
    map(take_while1(is_regular), |word: ParserInput| match *word.fragment() {
        b"true" => Token::Boolean(true),
        b"false" => Token::Boolean(false),
        b"null" => Token::Null,
        other => Token::Operator(String::from_utf8_lossy(other).into_owned()),
    })
    .parse(input)
}

fn array<'a>(input: ParserInput<'a>, depth: usize) -> NomResult<'a, Vec<Token>> {
    if depth == 0 {
        return Err(nom::Err::Error(NomError::from_error_kind(input, ErrorKind::TooLarge)));
    }
    delimited(
        pair(tag(&b"["[..]), space),
        many0(terminated(|i: ParserInput<'a>| direct_token(i, depth - 1), space)),
        tag(&b"]"[..]),
    )
    .parse(input)
}

fn dictionary<'a>(input: ParserInput<'a>, depth: usize) -> NomResult<'a, Vec<(String, Token)>> {
    if depth == 0 {
        return Err(nom::Err::Error(NomError::from_error_kind(input, ErrorKind::TooLarge)));
    }
    delimited(
        pair(tag(&b"<<"[..]), space),
        fold_many0(
            pair(
                terminated(name, space),
                terminated(|i: ParserInput<'a>| direct_token(i, depth - 1), space),
            ),
            Vec::new,
            |mut entries, entry| {
                entries.push(entry);
                entries
            },
        ),
        tag(&b">>"[..]),
    )
    .parse(input)
}

fn direct_token<'a>(input: ParserInput<'a>, depth: usize) -> NomResult<'a, Token> {
    alt((
        map(real, Token::Real),
        map(integer, Token::Integer),
        map(name, Token::Name),
        map(literal_string, Token::LiteralString),
        map(|i: ParserInput<'a>| dictionary(i, depth), Token::Dictionary),
        map(hexadecimal_string, Token::HexString),
        map(|i: ParserInput<'a>| array(i, depth), Token::Array),
        keyword,
    ))
    .parse(input)
}

/// Split off a lexeme that no token rule accepts: a bracketed group up to its
/// closing delimiter, otherwise a single byte.
fn invalid_lexeme(input: ParserInput) -> (ParserInput, String) {
    let closing = match input.first() {
        Some(b'<') => Some(b'>'),
        Some(b'[') => Some(b']'),
        Some(b'(') => Some(b')'),
        _ => None,
    };
    let len = closing
        .and_then(|close| input.iter().position(|&c| c == close).map(|pos| pos + 1))
        .unwrap_or(if closing.is_some() { input.len() } else { 1 });
    let (rest, lexeme) = input.take_split(len.min(input.len()));
    (rest, String::from_utf8_lossy(*lexeme.fragment()).into_owned())
}

fn byte_order_mark(input: ParserInput) -> NomResult<Option<ParserInput>> {
    opt(tag("\u{FEFF}".as_bytes())).parse(input)
}

/// Scanner turning the bytes of a CMap program into [`Token`]s.
///
/// Unknown lexemes never stop the scanner, they come out as [`Token::Invalid`]
/// so that the interpreter decides whether to skip them or fail.
pub struct Lexer<'a> {
    input: ParserInput<'a>,
    peeked: Option<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(data: &'a [u8]) -> Lexer<'a> {
        let input = ParserInput::new_extra(data, "cmap");
        let input = match byte_order_mark(input) {
            Ok((rest, _)) => rest,
            Err(_) => input,
        };
        Lexer { input, peeked: None }
    }

    /// Byte offset of the scanner in the input.
    pub fn offset(&self) -> usize {
        self.input.location_offset()
    }

    fn lex(&mut self) -> Option<Token> {
        loop {
            if let Ok((rest, ())) = space(self.input) {
                self.input = rest;
            }
            match self.input.first() {
                None => return None,
                // procedure braces carry no meaning for the CMap interpreter
                Some(b'{') | Some(b'}') => {
                    let (rest, _) = invalid_lexeme(self.input);
                    self.input = rest;
                }
                Some(_) => break,
            }
        }
        match direct_token(self.input, MAX_BRACKET) {
            Ok((rest, token)) => {
                self.input = rest;
                Some(token)
            }
            Err(_) => {
                let offset = self.offset();
                let (rest, lexeme) = invalid_lexeme(self.input);
                self.input = rest;
                Some(Token::Invalid { offset, lexeme })
            }
        }
    }
}

impl TokenStream for Lexer<'_> {
    fn next_token(&mut self) -> Option<Token> {
        self.peeked.take().or_else(|| self.lex())
    }

    fn peek_token(&mut self) -> Option<&Token> {
        if self.peeked.is_none() {
            self.peeked = self.lex();
        }
        self.peeked.as_ref()
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.next_token()
    }
}
