use pdf_cmap::{parse, CMap, Code, Error, Lexer, Token};

mod utils;

fn bf_char_cmap(entries: &str) -> Vec<u8> {
    utils::cmap_resource(
        "Malformed",
        2,
        &format!(
            "1 begincodespacerange <00> <FF> endcodespacerange\n2 beginbfchar\n{}\nendbfchar",
            entries
        ),
    )
}

#[test]
fn malformed_pair_is_skipped() {
    utils::init_logger();
    let content = bf_char_cmap("<20> <0041> <BAD /garbage>");

    let cmap = CMap::parse(&content, true).unwrap();
    assert_eq!(cmap.unicode(Code::new(0x20, 1)).as_deref(), Some("A"));
    assert_eq!(cmap.unicode_code_count(), 1);

    assert!(matches!(CMap::parse(&content, false), Err(Error::Syntax { .. })));
}

#[test]
fn wrong_operand_type() {
    let content = bf_char_cmap("<20> 65 <21> <0042>");

    let cmap = CMap::parse(&content, true).unwrap();
    assert_eq!(cmap.decode_text(&[0x20, 0x21]), "\u{FFFD}B");

    match CMap::parse(&content, false) {
        Err(Error::MalformedEntry { block, reason }) => {
            assert_eq!(block, "bfchar");
            assert_eq!(reason, "expected hex string or glyph name but found integer 65");
        }
        other => panic!("unexpected result {:?}", other.map(|_| ())),
    }
}

#[test]
fn truncated_program() {
    // stream stops in the middle of a bfrange entry
    let content = b"/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
3 beginbfrange
<0000> <0005> <0041>
<0010> <0012>";
    for lenient in [true, false] {
        let cmap = CMap::parse(content, lenient).unwrap();
        assert_eq!(cmap.decode_text(&[0x00, 0x05]), "F");
        assert_eq!(cmap.unicode(Code::new(0x0010, 2)), None);
    }
}

#[test]
fn codespace_range_with_mismatched_bounds() {
    let blocks = "2 begincodespacerange <00> <FFFF> <0000> <7FFF> endcodespacerange";
    let content = utils::cmap_resource("Codespace", 1, blocks);

    let cmap = CMap::parse(&content, true).unwrap();
    assert_eq!(cmap.codespace_ranges().len(), 1);
    assert_eq!(cmap.codespace_ranges()[0].code_len(), 2);

    assert!(matches!(
        CMap::parse(&content, false),
        Err(Error::MalformedEntry { block: "codespacerange", .. })
    ));
}

#[test]
fn overflowing_destination_is_dropped() {
    let blocks = "1 beginbfrange <00> <03> <FFFE> <10> <11> <0061> endbfrange";
    let content = utils::cmap_resource("Overflow", 2, blocks);

    let cmap = CMap::parse(&content, true).unwrap();
    assert_eq!(cmap.unicode(Code::new(0x00, 1)), None);
    assert_eq!(cmap.decode_text(&[0x10, 0x11]), "ab");

    assert!(CMap::parse(&content, false).is_err());
}

#[test]
fn missing_count_is_fatal_in_both_modes() {
    let content = utils::cmap_resource("NoCount", 1, "begincidrange <00> <10> 1 endcidrange");
    for lenient in [true, false] {
        match CMap::parse(&content, lenient) {
            Err(Error::MissingEntryCount { operator, found }) => {
                assert_eq!(operator, "begincidrange");
                assert_eq!(found, "operator def");
            }
            other => panic!("unexpected result {:?}", other.map(|_| ())),
        }
    }
}

#[test]
fn interpreter_reads_any_token_stream() {
    let tokens = vec![
        Token::Integer(1),
        Token::Operator("begincodespacerange".into()),
        Token::HexString(vec![0x00]),
        Token::HexString(vec![0xFF]),
        Token::Operator("endcodespacerange".into()),
        Token::Integer(3),
        Token::Operator("begincidrange".into()),
        Token::HexString(vec![0x00, 0x00]),
        Token::HexString(vec![0x00, 0x02]),
        Token::Integer(10),
        Token::Operator("endcidrange".into()),
    ];
    let cmap = parse(&mut tokens.into_iter().peekable(), false).unwrap();
    assert_eq!(cmap.codespace_ranges().len(), 1);
    assert_eq!(cmap.cid(Code::new(0x0000, 2)), Some(10));
    assert_eq!(cmap.cid(Code::new(0x0001, 2)), Some(11));
    assert_eq!(cmap.cid(Code::new(0x0002, 2)), Some(12));
}

#[test]
fn lexer_and_token_stream_agree() {
    let content = b"1 begincidchar <20> 5 endcidchar";
    let tokens: Vec<Token> = Lexer::new(content).collect();
    let from_lexer = parse(&mut Lexer::new(content), false).unwrap();
    let from_tokens = parse(&mut tokens.into_iter().peekable(), false).unwrap();
    assert_eq!(from_lexer.cid(Code::new(0x20, 1)), from_tokens.cid(Code::new(0x20, 1)));
}
