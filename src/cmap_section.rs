/*
Mapping blocks of a CMap program. Each block is `n begin<kind> ... end<kind>` where the
entries are made of 2 or 3 operands:
- codespacerange: <low> <high>
- bfchar: <code> <dst> or <code> /glyphname
- bfrange: <low> <high> <dst>, <low> <high> /glyphname or <low> <high> [<dst> ...]
- cidchar: <code> cid
- cidrange: <low> <high> cid
The entry count `n` is only a hint, a block runs until its end keyword.
 */

use crate::cmap_builder::{CMapBuilder, Destination};
use crate::encodings::cmap::Code;
use crate::token::{Token, TokenStream};
use crate::{Error, Result};
use log::{debug, trace, warn};

const BLOCK_OPERATORS: [&str; 17] = [
    "begincodespacerange",
    "endcodespacerange",
    "beginbfchar",
    "endbfchar",
    "beginbfrange",
    "endbfrange",
    "begincidchar",
    "endcidchar",
    "begincidrange",
    "endcidrange",
    "beginnotdefchar",
    "endnotdefchar",
    "beginnotdefrange",
    "endnotdefrange",
    "begincmap",
    "endcmap",
    "usecmap",
];

pub(crate) fn is_block_operator(keyword: &str) -> bool {
    BLOCK_OPERATORS.contains(&keyword)
}

#[derive(Debug, Clone, Copy)]
struct Block {
    name: &'static str,
    end: &'static str,
}

const CODESPACE_RANGE: Block = Block {
    name: "codespacerange",
    end: "endcodespacerange",
};
const BF_CHAR: Block = Block {
    name: "bfchar",
    end: "endbfchar",
};
const BF_RANGE: Block = Block {
    name: "bfrange",
    end: "endbfrange",
};
const CID_CHAR: Block = Block {
    name: "cidchar",
    end: "endcidchar",
};
const CID_RANGE: Block = Block {
    name: "cidrange",
    end: "endcidrange",
};

enum Peeked {
    Exhausted,
    End,
    Interrupted(String),
    Invalid,
    Operand,
}

enum RangeDestination {
    Single(Destination),
    Array(Vec<Destination>),
}

/// Reads the operands of one block from the shared token stream.
struct BlockReader<'s, S> {
    block: Block,
    stream: &'s mut S,
    lenient: bool,
    finished: bool,
    entries: i64,
    // last token consumed without being used, it may be the count of a following block
    skipped: Option<Token>,
}

impl<'s, S: TokenStream> BlockReader<'s, S> {
    fn new(block: Block, stream: &'s mut S, lenient: bool) -> Self {
        trace!("begin{}", block.name);
        BlockReader {
            block,
            stream,
            lenient,
            finished: false,
            entries: 0,
            skipped: None,
        }
    }

    fn finished(&self) -> bool {
        self.finished
    }

    fn next(&mut self) -> Result<Option<Token>> {
        loop {
            if self.finished {
                return Ok(None);
            }
            let peeked = match self.stream.peek_token() {
                None => Peeked::Exhausted,
                Some(Token::Operator(keyword)) if keyword == self.block.end => Peeked::End,
                Some(Token::Operator(keyword)) if is_block_operator(keyword) => Peeked::Interrupted(keyword.clone()),
                Some(Token::Invalid { .. }) => Peeked::Invalid,
                Some(_) => Peeked::Operand,
            };
            match peeked {
                Peeked::Exhausted => {
                    debug!("stream ended inside {} block", self.block.name);
                    self.finished = true;
                }
                Peeked::End => {
                    self.stream.next_token();
                    self.skipped = None;
                    self.finished = true;
                }
                Peeked::Interrupted(keyword) => {
                    if !self.lenient {
                        return Err(Error::malformed(
                            self.block.name,
                            format!("found `{}` before `{}`", keyword, self.block.end),
                        ));
                    }
                    warn!("{} block ended by `{}` instead of `{}`", self.block.name, keyword, self.block.end);
                    self.finished = true;
                }
                Peeked::Invalid => {
                    if let Some(Token::Invalid { offset, lexeme }) = self.stream.next_token() {
                        if !self.lenient {
                            return Err(Error::Syntax {
                                offset,
                                message: format!("unexpected {:?} in {} block", lexeme, self.block.name),
                            });
                        }
                        warn!("skipping invalid lexeme {:?} at offset {} in {} block", lexeme, offset, self.block.name);
                    }
                }
                Peeked::Operand => return Ok(self.stream.next_token()),
            }
        }
    }

    /// Next operand of the current entry. `None` abandons the entry, either because the
    /// block is over or because the token did not fit and was skipped.
    fn operand<T>(&mut self, expected: &str, convert: impl FnOnce(&Token) -> Option<T>) -> Result<Option<T>> {
        let Some(token) = self.next()? else {
            return Ok(None);
        };
        match convert(&token) {
            Some(value) => {
                self.skipped = None;
                Ok(Some(value))
            }
            None => {
                if !self.lenient {
                    return Err(Error::malformed(
                        self.block.name,
                        format!("expected {} but found {}", expected, token),
                    ));
                }
                warn!("expected {} in {} block but found {}, skipping", expected, self.block.name, token);
                self.skipped = Some(token);
                Ok(None)
            }
        }
    }

    fn accept(&mut self, entry: Result<()>) -> Result<()> {
        match entry {
            Ok(()) => {
                self.entries += 1;
                Ok(())
            }
            Err(err) if self.lenient => {
                warn!("{}, skipping", err);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn finish(self, declared: i64) -> Option<Token> {
        if declared != self.entries {
            debug!(
                "{} block declares {} entries but has {}",
                self.block.name, declared, self.entries
            );
        }
        trace!("end{}: {} entries", self.block.name, self.entries);
        self.skipped
    }
}

fn code(token: &Token) -> Option<Code> {
    token.as_hex_string().and_then(Code::from_bytes)
}

fn cid(token: &Token) -> Option<u32> {
    token.as_i64().and_then(|value| u32::try_from(value).ok())
}

fn destination(token: &Token) -> Option<Destination> {
    match token {
        Token::HexString(bytes) => Some(Destination::Hex(bytes.clone())),
        Token::Name(name) => Some(Destination::Name(name.clone())),
        _ => None,
    }
}

fn range_destination(token: &Token) -> Option<RangeDestination> {
    match token {
        Token::Array(items) => items
            .iter()
            .map(destination)
            .collect::<Option<Vec<_>>>()
            .map(RangeDestination::Array),
        _ => destination(token).map(RangeDestination::Single),
    }
}

const CODE: &str = "1 to 4 byte hex string";
const CID: &str = "CID";
const DESTINATION: &str = "hex string or glyph name";
const RANGE_DESTINATION: &str = "hex string, glyph name or array";

/// Parse the body of a `begincodespacerange` block.
///
/// Returns the last token the block skipped over when it ended right after it, so that
/// the caller can use it as the count of a following block.
pub(crate) fn parse_codespace_range<S: TokenStream>(
    declared: i64, stream: &mut S, builder: &mut CMapBuilder, lenient: bool,
) -> Result<Option<Token>> {
    let mut reader = BlockReader::new(CODESPACE_RANGE, stream, lenient);
    while !reader.finished() {
        let Some(low) = reader.operand(CODE, code)? else { continue };
        let Some(high) = reader.operand(CODE, code)? else { continue };
        reader.accept(builder.add_codespace_range(low, high))?;
    }
    Ok(reader.finish(declared))
}

pub(crate) fn parse_bf_char<S: TokenStream>(
    declared: i64, stream: &mut S, builder: &mut CMapBuilder, lenient: bool,
) -> Result<Option<Token>> {
    let mut reader = BlockReader::new(BF_CHAR, stream, lenient);
    while !reader.finished() {
        let Some(src) = reader.operand(CODE, code)? else { continue };
        let Some(dst) = reader.operand(DESTINATION, destination)? else { continue };
        builder.add_bf_char(src, dst);
        reader.accept(Ok(()))?;
    }
    Ok(reader.finish(declared))
}

pub(crate) fn parse_bf_range<S: TokenStream>(
    declared: i64, stream: &mut S, builder: &mut CMapBuilder, lenient: bool,
) -> Result<Option<Token>> {
    let mut reader = BlockReader::new(BF_RANGE, stream, lenient);
    while !reader.finished() {
        let Some(low) = reader.operand(CODE, code)? else { continue };
        let Some(high) = reader.operand(CODE, code)? else { continue };
        let Some(dst) = reader.operand(RANGE_DESTINATION, range_destination)? else { continue };
        let entry = match dst {
            RangeDestination::Single(dst) => builder.add_bf_range(low, high, dst),
            RangeDestination::Array(dsts) => builder.add_bf_range_array(low, high, dsts),
        };
        reader.accept(entry)?;
    }
    Ok(reader.finish(declared))
}

pub(crate) fn parse_cid_char<S: TokenStream>(
    declared: i64, stream: &mut S, builder: &mut CMapBuilder, lenient: bool,
) -> Result<Option<Token>> {
    let mut reader = BlockReader::new(CID_CHAR, stream, lenient);
    while !reader.finished() {
        let Some(src) = reader.operand(CODE, code)? else { continue };
        let Some(cid) = reader.operand(CID, cid)? else { continue };
        builder.add_cid_char(src, cid);
        reader.accept(Ok(()))?;
    }
    Ok(reader.finish(declared))
}

pub(crate) fn parse_cid_range<S: TokenStream>(
    declared: i64, stream: &mut S, builder: &mut CMapBuilder, lenient: bool,
) -> Result<Option<Token>> {
    let mut reader = BlockReader::new(CID_RANGE, stream, lenient);
    while !reader.finished() {
        let Some(low) = reader.operand(CODE, code)? else { continue };
        let Some(high) = reader.operand(CODE, code)? else { continue };
        let Some(cid) = reader.operand(CID, cid)? else { continue };
        reader.accept(builder.add_cid_range(low, high, cid))?;
    }
    Ok(reader.finish(declared))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Lexer;

    fn build<'a, F>(content: &'a str, lenient: bool, parse: F) -> Result<crate::CMap>
    where
        F: FnOnce(i64, &mut Lexer<'a>, &mut CMapBuilder, bool) -> Result<Option<Token>>,
    {
        let mut lexer = Lexer::new(content.as_bytes());
        let mut builder = CMapBuilder::new();
        parse(1, &mut lexer, &mut builder, lenient)?;
        Ok(builder.build())
    }

    #[test]
    fn codespace_ranges() {
        let cmap = build("<00> <80> <8140> <9FFC> endcodespacerange", false, parse_codespace_range).unwrap();
        assert_eq!(cmap.codespace_ranges().len(), 2);
        assert_eq!(cmap.codespace_ranges()[1].code_len(), 2);
    }

    #[test]
    fn bf_char_with_hex_and_name() {
        let cmap = build("<03> <0020> <04> /A <05> <00660066> endbfchar", false, parse_bf_char).unwrap();
        assert_eq!(cmap.unicode(Code::new(0x03, 1)).as_deref(), Some(" "));
        assert_eq!(cmap.unicode(Code::new(0x04, 1)).as_deref(), Some("A"));
        assert_eq!(cmap.unicode(Code::new(0x05, 1)).as_deref(), Some("ff"));
    }

    #[test]
    fn bf_range_with_array() {
        let content = "<0000> <0002> [<0041> /B <00660069>] <0010> <0011> <0061> endbfrange";
        let cmap = build(content, false, parse_bf_range).unwrap();
        assert_eq!(cmap.decode_text(&[0, 0, 0, 1, 0, 2, 0, 0x10, 0, 0x11]), "ABfiab");
    }

    #[test]
    fn cid_blocks() {
        let cmap = build("<20> 1 <21> 2 endcidchar", false, parse_cid_char).unwrap();
        assert_eq!(cmap.decode_cids(&[0x20, 0x21, 0x22]), vec![1, 2, 0]);

        let cmap = build("<0000> <00FF> 100 endcidrange", false, parse_cid_range).unwrap();
        assert_eq!(cmap.cid(Code::new(0x00FF, 2)), Some(355));
    }

    #[test]
    fn unexpected_token_is_skipped_in_lenient_mode() {
        let content = "<20> /Foo <21> 2 endcidchar";
        let cmap = build(content, true, parse_cid_char).unwrap();
        assert_eq!(cmap.cid(Code::new(0x20, 1)), None);
        assert_eq!(cmap.cid(Code::new(0x21, 1)), Some(2));

        let err = build(content, false, parse_cid_char).unwrap_err();
        assert!(matches!(err, Error::MalformedEntry { block: "cidchar", .. }));
    }

    #[test]
    fn exhausted_stream_ends_block() {
        let cmap = build("<20> 1 <21>", false, parse_cid_char).unwrap();
        assert_eq!(cmap.cid(Code::new(0x20, 1)), Some(1));
        assert_eq!(cmap.cid(Code::new(0x21, 1)), None);
    }

    #[test]
    fn block_operator_interrupts_block() {
        let mut lexer = Lexer::new(b"<20> 1 2 begincidrange <00> <01> 5 endcidrange");
        let mut builder = CMapBuilder::new();
        let skipped = parse_cid_char(1, &mut lexer, &mut builder, true).unwrap();
        assert_eq!(skipped, Some(Token::Integer(2)));
        assert_eq!(lexer.peek_token(), Some(&Token::Operator("begincidrange".into())));

        let mut lexer = Lexer::new(b"<20> 1 begincidrange");
        let err = parse_cid_char(1, &mut lexer, &mut CMapBuilder::new(), false).unwrap_err();
        assert!(matches!(err, Error::MalformedEntry { .. }));
    }

    #[test]
    fn invalid_lexeme_is_a_syntax_error_in_strict_mode() {
        let err = build("<20> 1 <2G> 2 endcidchar", false, parse_cid_char).unwrap_err();
        assert!(matches!(err, Error::Syntax { .. }));

        let cmap = build("<20> 1 <2G> <21> 2 endcidchar", true, parse_cid_char).unwrap();
        assert_eq!(cmap.cid(Code::new(0x21, 1)), Some(2));
    }

    #[test]
    fn malformed_range_is_dropped_in_lenient_mode() {
        let content = "<10> <01> 5 <20> <21> 7 endcidrange";
        let cmap = build(content, true, parse_cid_range).unwrap();
        assert_eq!(cmap.cid(Code::new(0x05, 1)), None);
        assert_eq!(cmap.cid(Code::new(0x21, 1)), Some(8));
        assert!(build(content, false, parse_cid_range).is_err());
    }

    #[test]
    fn cid_range_past_u32_max_is_dropped() {
        let content = "<00> <02> 4294967295 <10> <11> 4294967294 endcidrange";
        let cmap = build(content, true, parse_cid_range).unwrap();
        assert_eq!(cmap.cid(Code::new(0x00, 1)), None);
        assert_eq!(cmap.cid(Code::new(0x01, 1)), None);
        assert_eq!(cmap.cid(Code::new(0x11, 1)), Some(u32::MAX));

        let err = build(content, false, parse_cid_range).unwrap_err();
        assert!(matches!(err, Error::MalformedEntry { block: "cidrange", .. }));
    }
}
