use super::{increment_utf16be, utf16be_to_string};
use crate::Result;

use log::{debug, error};
use rangemap::RangeInclusiveMap;
use std::fmt;
use std::fs;
use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A character code as it appears in a shown string.
///
/// Codes vary from 1 byte to 4 bytes so they are always in limits of u32.
/// The byte length is part of the identity: the 2 byte code <0000> is not the
/// single byte code <00> even though they have the same integer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Code {
    value: u32,
    len: u8,
}

impl Code {
    pub const MAX_LEN: u8 = 4;

    pub const fn new(value: u32, len: u8) -> Code {
        Code { value, len }
    }

    /// Big-endian code made of 1 to 4 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Code> {
        if bytes.is_empty() || bytes.len() > Code::MAX_LEN as usize {
            return None;
        }
        let value = bytes.iter().fold(0u32, |acc, &byte| (acc << 8) | byte as u32);
        Some(Code::new(value, bytes.len() as u8))
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u8 {
        self.len
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<{:0width$X}>", self.value, width = self.len as usize * 2)
    }
}

/// Valid codes of one byte length: `low..=high`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CodespaceRange {
    low: Code,
    high: Code,
}

impl CodespaceRange {
    /// Both bounds must have the same byte length and `low <= high`.
    pub fn new(low: Code, high: Code) -> Option<CodespaceRange> {
        if low.len() != high.len() || low.value() > high.value() {
            return None;
        }
        Some(CodespaceRange { low, high })
    }

    pub fn low(&self) -> Code {
        self.low
    }

    pub fn high(&self) -> Code {
        self.high
    }

    pub fn code_len(&self) -> u8 {
        self.low.len()
    }

    pub fn contains(&self, code: Code) -> bool {
        code.len() == self.code_len() && (self.low.value()..=self.high.value()).contains(&code.value())
    }
}

impl fmt::Display for CodespaceRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.low, self.high)
    }
}

/// `/CIDSystemInfo` of a CMap: the character collection its CIDs index into.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CidSystemInfo {
    pub registry: String,
    pub ordering: String,
    pub supplement: i64,
}

impl fmt::Display for CidSystemInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{}-{}", self.registry, self.ordering, self.supplement)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum WritingMode {
    #[default]
    Horizontal,
    Vertical,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub(crate) enum BfRangeTarget {
    // don't store the actual codepoint but rather an offset to the source code
    // so that consecutive ranges can be mapped to the same value in the range map
    UTF16CodePoint { offset: u32 },
    // UTF16-BE encoding is used, the last code unit is incremented from `start`
    HexString { start: u32, bytes: Vec<u8> },
    ArrayOfStrings { start: u32, strings: Vec<String> },
}

impl BfRangeTarget {
    fn resolve(&self, code: u32) -> Option<String> {
        match self {
            BfRangeTarget::UTF16CodePoint { offset } => {
                let unit = u32::wrapping_add(code, *offset) as u16;
                Some(utf16be_to_string(&unit.to_be_bytes()))
            }
            BfRangeTarget::HexString { start, bytes } => {
                Some(utf16be_to_string(&increment_utf16be(bytes, code - start)))
            }
            BfRangeTarget::ArrayOfStrings { start, strings } => strings.get((code - start) as usize).cloned(),
        }
    }
}

/// A parsed CMap program.
///
/// Character and CID mappings are each implemented by 4 maps, one for every
/// code length. A map stores ranges of source codes so that a range declared
/// as `<0000> <FFFF> <0000>` costs a single entry. Inserting a range over an
/// existing one replaces the overlapped codes, which gives "last one wins".
#[derive(Debug, Default)]
pub struct CMap {
    codespace_ranges: Vec<CodespaceRange>,
    bf_ranges: [RangeInclusiveMap<u32, BfRangeTarget>; 4],
    // CID = code + offset (wrapping)
    cid_ranges: [RangeInclusiveMap<u32, u32>; 4],
    name: Option<String>,
    version: Option<String>,
    cmap_type: Option<i64>,
    writing_mode: WritingMode,
    cid_system_info: Option<CidSystemInfo>,
}

impl CMap {
    pub const REPLACEMENT_CHAR: char = '\u{FFFD}';

    pub(crate) fn new() -> CMap {
        CMap::default()
    }

    /// Parse a CMap program from its (decompressed) stream content.
    pub fn parse(content: &[u8], lenient: bool) -> Result<CMap> {
        let mut lexer = crate::Lexer::new(content);
        crate::cmap_parser::parse(&mut lexer, lenient)
    }

    /// Load and parse a CMap program from a file.
    pub fn load<P: AsRef<Path>>(path: P, lenient: bool) -> Result<CMap> {
        let content = fs::read(path)?;
        Self::parse(&content, lenient)
    }

    pub fn codespace_ranges(&self) -> &[CodespaceRange] {
        &self.codespace_ranges
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn cmap_type(&self) -> Option<i64> {
        self.cmap_type
    }

    pub fn writing_mode(&self) -> WritingMode {
        self.writing_mode
    }

    pub fn cid_system_info(&self) -> Option<&CidSystemInfo> {
        self.cid_system_info.as_ref()
    }

    pub fn has_unicode_mappings(&self) -> bool {
        self.bf_ranges.iter().any(|map| !map.is_empty())
    }

    pub fn has_cid_mappings(&self) -> bool {
        self.cid_ranges.iter().any(|map| !map.is_empty())
    }

    /// Number of codes that have a Unicode mapping.
    pub fn unicode_code_count(&self) -> u64 {
        self.bf_ranges.iter().flat_map(|map| map.iter()).map(|(range, _)| range_size(range)).sum()
    }

    /// Number of codes that have a CID mapping.
    pub fn cid_code_count(&self) -> u64 {
        self.cid_ranges.iter().flat_map(|map| map.iter()).map(|(range, _)| range_size(range)).sum()
    }

    pub fn unicode(&self, code: Code) -> Option<String> {
        let map = self.bf_ranges.get(map_index(code.len())?)?;
        map.get(&code.value()).and_then(|target| target.resolve(code.value()))
    }

    pub fn unicode_or_replacement(&self, code: Code) -> String {
        self.unicode(code).unwrap_or_else(|| Self::REPLACEMENT_CHAR.to_string())
    }

    pub fn cid(&self, code: Code) -> Option<u32> {
        let map = self.cid_ranges.get(map_index(code.len())?)?;
        map.get(&code.value()).map(|offset| u32::wrapping_add(code.value(), *offset))
    }

    /// Split the bytes of a shown string into codes according to the codespace ranges.
    pub fn codes<'a>(&'a self, bytes: &'a [u8]) -> Codes<'a> {
        Codes { cmap: self, bytes }
    }

    /// Text of a shown string, unmapped codes become U+FFFD.
    pub fn decode_text(&self, bytes: &[u8]) -> String {
        self.codes(bytes).map(|code| self.unicode_or_replacement(code)).collect()
    }

    /// CIDs of a shown string, unmapped codes select CID 0 (`.notdef`).
    pub fn decode_cids(&self, bytes: &[u8]) -> Vec<u32> {
        self.codes(bytes).map(|code| self.cid(code).unwrap_or(0)).collect()
    }

    fn next_code(&self, bytes: &[u8]) -> Code {
        let (min_len, max_len) = self.code_len_bounds();
        let max_len = max_len.min(bytes.len());
        for len in min_len..=max_len {
            if let Some(code) = Code::from_bytes(&bytes[..len]) {
                if self.is_valid_code(code) {
                    return code;
                }
            }
        }
        let len = min_len.min(bytes.len());
        debug!("no codespace range matches {:02X?}, reading a {} byte code", &bytes[..max_len], len);
        Code::from_bytes(&bytes[..len]).unwrap_or(Code::new(bytes[0] as u32, 1))
    }

    fn is_valid_code(&self, code: Code) -> bool {
        if self.codespace_ranges.is_empty() {
            return code.len() as usize == self.fallback_code_len();
        }
        self.codespace_ranges.iter().any(|range| range.contains(code))
    }

    fn code_len_bounds(&self) -> (usize, usize) {
        let lens = self.codespace_ranges.iter().map(|range| range.code_len() as usize);
        match (lens.clone().min(), lens.max()) {
            (Some(min), Some(max)) => (min, max),
            _ => {
                let len = self.fallback_code_len();
                (len, len)
            }
        }
    }

    // Without codespace ranges, the shortest code length that has mappings.
    fn fallback_code_len(&self) -> usize {
        (0..4)
            .find(|&i| !self.bf_ranges[i].is_empty() || !self.cid_ranges[i].is_empty())
            .map_or(1, |i| i + 1)
    }

    pub(crate) fn add_codespace_range(&mut self, range: CodespaceRange) {
        self.codespace_ranges.push(range);
    }

    pub(crate) fn put(&mut self, low: Code, high: u32, target: BfRangeTarget) {
        match map_index(low.len()) {
            Some(index) => self.bf_ranges[index].insert(low.value()..=high, target),
            None => error!("Code length should be between 1 and 4 bytes, got {}, ignoring", low.len()),
        }
    }

    pub(crate) fn put_cid(&mut self, low: Code, high: u32, cid: u32) {
        match map_index(low.len()) {
            Some(index) => self.cid_ranges[index].insert(low.value()..=high, u32::wrapping_sub(cid, low.value())),
            None => error!("Code length should be between 1 and 4 bytes, got {}, ignoring", low.len()),
        }
    }

    pub(crate) fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    pub(crate) fn set_version(&mut self, version: Option<String>) {
        self.version = version;
    }

    pub(crate) fn set_cmap_type(&mut self, cmap_type: Option<i64>) {
        self.cmap_type = cmap_type;
    }

    pub(crate) fn set_writing_mode(&mut self, writing_mode: WritingMode) {
        self.writing_mode = writing_mode;
    }

    pub(crate) fn set_cid_system_info(&mut self, info: Option<CidSystemInfo>) {
        self.cid_system_info = info;
    }
}

fn map_index(code_len: u8) -> Option<usize> {
    match code_len {
        1..=Code::MAX_LEN => Some(code_len as usize - 1),
        _ => None,
    }
}

fn range_size(range: &std::ops::RangeInclusive<u32>) -> u64 {
    (*range.end() as u64) - (*range.start() as u64) + 1
}

/// Iterator over the codes of a shown string, see [`CMap::codes`].
pub struct Codes<'a> {
    cmap: &'a CMap,
    bytes: &'a [u8],
}

impl Iterator for Codes<'_> {
    type Item = Code;

    fn next(&mut self) -> Option<Code> {
        if self.bytes.is_empty() {
            return None;
        }
        let code = self.cmap.next_code(self.bytes);
        self.bytes = &self.bytes[code.len() as usize..];
        Some(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(low: &[u8], high: &[u8]) -> CodespaceRange {
        CodespaceRange::new(Code::from_bytes(low).unwrap(), Code::from_bytes(high).unwrap()).unwrap()
    }

    #[test]
    fn put_char_can_be_retrieved() {
        let mut cmap = CMap::new();
        let code = Code::new(0x01, 2);
        cmap.put(code, 0x01, BfRangeTarget::UTF16CodePoint { offset: 0x1234 - 0x01 });

        assert_eq!(cmap.unicode(code), Some("\u{1234}".to_string()));
    }

    #[test]
    fn char_can_be_retrieved_only_by_appropriate_len() {
        let mut cmap = CMap::new();
        cmap.put_cid(Code::new(0x1, 4), 0x1, 77);

        for len in 1..=3 {
            assert_eq!(cmap.cid(Code::new(0x1, len)), None);
        }
        assert_eq!(cmap.cid(Code::new(0x1, 4)), Some(77));
    }

    #[test]
    fn wrong_code_len_does_not_panic() {
        let mut cmap = CMap::new();
        cmap.put_cid(Code::new(0x1, 5), 0x1, 1);
        cmap.put_cid(Code::new(0x1, 0), 0x1, 1);
        assert_eq!(cmap.cid(Code::new(0x1, 0)), None);
        assert_eq!(cmap.unicode(Code::new(0x1, 5)), None);
    }

    #[test]
    fn overwritten_part_of_array_range_keeps_positions() {
        let mut cmap = CMap::new();
        let strings = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        cmap.put(Code::new(0x10, 1), 0x12, BfRangeTarget::ArrayOfStrings { start: 0x10, strings });
        cmap.put(Code::new(0x10, 1), 0x10, BfRangeTarget::UTF16CodePoint { offset: 0x5A - 0x10 });

        assert_eq!(cmap.unicode(Code::new(0x10, 1)).as_deref(), Some("Z"));
        assert_eq!(cmap.unicode(Code::new(0x11, 1)).as_deref(), Some("b"));
        assert_eq!(cmap.unicode(Code::new(0x12, 1)).as_deref(), Some("c"));
    }

    #[test]
    fn hex_string_target_increments_last_code_unit() {
        let mut cmap = CMap::new();
        let target = BfRangeTarget::HexString {
            start: 0x20,
            bytes: vec![0x00, 0x66, 0x00, 0x41],
        };
        cmap.put(Code::new(0x20, 1), 0x22, target);
        assert_eq!(cmap.unicode(Code::new(0x22, 1)).as_deref(), Some("fC"));
        assert_eq!(cmap.unicode_or_replacement(Code::new(0x23, 1)), "\u{FFFD}");
    }

    #[test]
    fn codes_follow_codespace_ranges() {
        // Shift-JIS like layout: single bytes up to 0x80, double bytes from 0x8140
        let mut cmap = CMap::new();
        cmap.add_codespace_range(range(&[0x00], &[0x80]));
        cmap.add_codespace_range(range(&[0x81, 0x40], &[0x9F, 0xFC]));

        let codes: Vec<Code> = cmap.codes(&[0x41, 0x81, 0x40, 0x7F]).collect();
        assert_eq!(codes, vec![Code::new(0x41, 1), Code::new(0x8140, 2), Code::new(0x7F, 1)]);
    }

    #[test]
    fn unmatched_bytes_use_shortest_code_length() {
        let mut cmap = CMap::new();
        cmap.add_codespace_range(range(&[0x00, 0x00], &[0x7F, 0xFF]));
        cmap.add_codespace_range(range(&[0x80, 0x00, 0x00], &[0xFF, 0xFF, 0xFF]));

        let codes: Vec<Code> = cmap.codes(&[0x00, 0x41, 0x80]).collect();
        assert_eq!(codes, vec![Code::new(0x0041, 2), Code::new(0x80, 1)]);
    }

    #[test]
    fn codes_without_codespace_use_mapped_length() {
        let mut cmap = CMap::new();
        cmap.put_cid(Code::new(0x0041, 2), 0x0041, 5);
        let cids = cmap.decode_cids(&[0x00, 0x41, 0x00, 0x42]);
        assert_eq!(cids, vec![5, 0]);
    }

    #[test]
    fn code_display() {
        assert_eq!(Code::new(0x41, 1).to_string(), "<41>");
        assert_eq!(Code::new(0x41, 2).to_string(), "<0041>");
        assert_eq!(range(&[0x00], &[0xff]).to_string(), "<00> <FF>");
    }

    #[test]
    fn codespace_range_rejects_mismatched_bounds() {
        assert!(CodespaceRange::new(Code::new(0, 1), Code::new(0xffff, 2)).is_none());
        assert!(CodespaceRange::new(Code::new(0x20, 1), Code::new(0x10, 1)).is_none());
    }
}
