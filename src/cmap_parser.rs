use crate::cmap_builder::CMapBuilder;
use crate::cmap_metadata::parse_name;
use crate::cmap_section::{parse_bf_char, parse_bf_range, parse_cid_char, parse_cid_range, parse_codespace_range};
use crate::encodings::cmap::CMap;
use crate::token::{Token, TokenStream};
use crate::{Error, Result};
use log::{trace, warn};

/// Operators the interpreter acts on, any other keyword is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    BeginCodespaceRange,
    BeginBfChar,
    BeginBfRange,
    BeginCidChar,
    BeginCidRange,
    UseCMap,
}

impl Operator {
    fn from_keyword(keyword: &str) -> Option<Operator> {
        match keyword {
            "begincodespacerange" => Some(Operator::BeginCodespaceRange),
            "beginbfchar" => Some(Operator::BeginBfChar),
            "beginbfrange" => Some(Operator::BeginBfRange),
            "begincidchar" => Some(Operator::BeginCidChar),
            "begincidrange" => Some(Operator::BeginCidRange),
            "usecmap" => Some(Operator::UseCMap),
            _ => None,
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            Operator::BeginCodespaceRange => "begincodespacerange",
            Operator::BeginBfChar => "beginbfchar",
            Operator::BeginBfRange => "beginbfrange",
            Operator::BeginCidChar => "begincidchar",
            Operator::BeginCidRange => "begincidrange",
            Operator::UseCMap => "usecmap",
        }
    }
}

/// Interpret a CMap program read from `stream`.
///
/// In lenient mode malformed entries are skipped with a warning. A block operator that
/// is not preceded by its entry count and `usecmap` fail the parse in both modes.
/// Tokens outside of blocks that are not operators or names, invalid lexemes included,
/// are ignored.
pub fn parse<S: TokenStream>(stream: &mut S, lenient: bool) -> Result<CMap> {
    let mut builder = CMapBuilder::new();
    let mut previous: Option<Token> = None;

    while let Some(token) = stream.next_token() {
        previous = match token {
            Token::Operator(keyword) => match Operator::from_keyword(&keyword) {
                Some(operator) => dispatch(operator, previous.take(), stream, &mut builder, lenient)?,
                None => {
                    trace!("ignoring `{}`", keyword);
                    Some(Token::Operator(keyword))
                }
            },
            Token::Name(name) => parse_name(&name, stream, &mut builder).or(Some(Token::Name(name))),
            Token::Invalid { offset, lexeme } => {
                warn!("skipping invalid lexeme {:?} at offset {}", lexeme, offset);
                None
            }
            token => Some(token),
        };
    }

    Ok(builder.build())
}

// Returns the token the interpreter should consider as preceding the next one.
fn dispatch<S: TokenStream>(
    operator: Operator, previous: Option<Token>, stream: &mut S, builder: &mut CMapBuilder, lenient: bool,
) -> Result<Option<Token>> {
    if operator == Operator::UseCMap {
        return Err(Error::Unimplemented("usecmap"));
    }
    let declared = match previous {
        Some(Token::Integer(count)) => count,
        Some(Token::Real(count)) => count as i64,
        other => {
            return Err(Error::MissingEntryCount {
                operator: operator.keyword(),
                found: other.map_or_else(|| "nothing".to_string(), |token| token.to_string()),
            });
        }
    };
    match operator {
        Operator::BeginCodespaceRange => parse_codespace_range(declared, stream, builder, lenient),
        Operator::BeginBfChar => parse_bf_char(declared, stream, builder, lenient),
        Operator::BeginBfRange => parse_bf_range(declared, stream, builder, lenient),
        Operator::BeginCidChar => parse_cid_char(declared, stream, builder, lenient),
        Operator::BeginCidRange => parse_cid_range(declared, stream, builder, lenient),
        Operator::UseCMap => Err(Error::Unimplemented("usecmap")),
    }
}
