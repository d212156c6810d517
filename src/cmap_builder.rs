use crate::encodings::cmap::{BfRangeTarget, CMap, CidSystemInfo, Code, CodespaceRange, WritingMode};
use crate::encodings::{can_increment_utf16be, glyph_name_to_text, string_to_utf16be, utf16be_to_string};
use crate::{Error, Result};

/// Right-hand side of a `bfchar` or `bfrange` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// UTF-16BE bytes
    Hex(Vec<u8>),
    /// Glyph name, without the leading `/`
    Name(String),
}

impl Destination {
    fn utf16be(&self) -> Vec<u8> {
        match self {
            Destination::Hex(bytes) if bytes.len() % 2 == 1 => {
                let mut padded = Vec::with_capacity(bytes.len() + 1);
                padded.push(0);
                padded.extend_from_slice(bytes);
                padded
            }
            Destination::Hex(bytes) => bytes.clone(),
            Destination::Name(name) => string_to_utf16be(&glyph_name_to_text(name)),
        }
    }

    fn text(&self) -> String {
        match self {
            Destination::Hex(_) => utf16be_to_string(&self.utf16be()),
            Destination::Name(name) => glyph_name_to_text(name),
        }
    }
}

#[derive(Debug)]
enum Entry {
    Unicode { low: Code, high: u32, dst: Destination },
    UnicodeArray { low: Code, high: u32, dsts: Vec<Destination> },
    Cid { low: Code, high: u32, cid: u32 },
}

/// Staging area a CMap is assembled in while its program is interpreted.
///
/// Entries are only appended. Overlapping entries are resolved by [`CMapBuilder::build`]
/// in declaration order, the last declaration of a code wins.
#[derive(Debug, Default)]
pub struct CMapBuilder {
    codespace_ranges: Vec<CodespaceRange>,
    entries: Vec<Entry>,
    name: Option<String>,
    version: Option<String>,
    cmap_type: Option<i64>,
    writing_mode: WritingMode,
    registry: Option<String>,
    ordering: Option<String>,
    supplement: Option<i64>,
}

impl CMapBuilder {
    pub fn new() -> CMapBuilder {
        CMapBuilder::default()
    }

    pub fn add_codespace_range(&mut self, low: Code, high: Code) -> Result<()> {
        let range = CodespaceRange::new(low, high).ok_or_else(|| {
            Error::malformed("codespacerange", format!("{} {} is not a range of same length codes", low, high))
        })?;
        self.codespace_ranges.push(range);
        Ok(())
    }

    pub fn add_bf_char(&mut self, code: Code, dst: Destination) {
        self.entries.push(Entry::Unicode {
            low: code,
            high: code.value(),
            dst,
        });
    }

    /// Map `low..=high` to `dst`, `dst` + 1, ... by incrementing its last UTF-16 code unit.
    pub fn add_bf_range(&mut self, low: Code, high: Code, dst: Destination) -> Result<()> {
        let span = check_range("bfrange", low, high)?;
        if !can_increment_utf16be(&dst.utf16be(), span) {
            return Err(Error::malformed(
                "bfrange",
                format!("destination of {} {} runs out of its code unit range", low, high),
            ));
        }
        self.entries.push(Entry::Unicode {
            low,
            high: high.value(),
            dst,
        });
        Ok(())
    }

    /// Map `low..=high` to the destinations of an array, one per code.
    pub fn add_bf_range_array(&mut self, low: Code, high: Code, dsts: Vec<Destination>) -> Result<()> {
        let span = check_range("bfrange", low, high)?;
        if dsts.len() as u64 != span as u64 + 1 {
            return Err(Error::malformed(
                "bfrange",
                format!("{} destinations given for {} codes", dsts.len(), span as u64 + 1),
            ));
        }
        self.entries.push(Entry::UnicodeArray {
            low,
            high: high.value(),
            dsts,
        });
        Ok(())
    }

    pub fn add_cid_char(&mut self, code: Code, cid: u32) {
        self.entries.push(Entry::Cid {
            low: code,
            high: code.value(),
            cid,
        });
    }

    /// Map `low..=high` to `cid`, `cid` + 1, ...
    pub fn add_cid_range(&mut self, low: Code, high: Code, cid: u32) -> Result<()> {
        let span = check_range("cidrange", low, high)?;
        if cid.checked_add(span).is_none() {
            return Err(Error::malformed(
                "cidrange",
                format!("CIDs of {} {} run past {} starting at {}", low, high, u32::MAX, cid),
            ));
        }
        self.entries.push(Entry::Cid {
            low,
            high: high.value(),
            cid,
        });
        Ok(())
    }

    pub fn set_name(&mut self, name: String) {
        self.name = Some(name);
    }

    pub fn set_version(&mut self, version: String) {
        self.version = Some(version);
    }

    pub fn set_cmap_type(&mut self, cmap_type: i64) {
        self.cmap_type = Some(cmap_type);
    }

    pub fn set_writing_mode(&mut self, writing_mode: WritingMode) {
        self.writing_mode = writing_mode;
    }

    pub fn set_registry(&mut self, registry: String) {
        self.registry = Some(registry);
    }

    pub fn set_ordering(&mut self, ordering: String) {
        self.ordering = Some(ordering);
    }

    pub fn set_supplement(&mut self, supplement: i64) {
        self.supplement = Some(supplement);
    }

    pub fn set_cid_system_info(&mut self, info: CidSystemInfo) {
        self.registry = Some(info.registry);
        self.ordering = Some(info.ordering);
        self.supplement = Some(info.supplement);
    }

    pub fn build(self) -> CMap {
        let mut cmap = CMap::new();
        for range in self.codespace_ranges {
            cmap.add_codespace_range(range);
        }
        for entry in self.entries {
            match entry {
                Entry::Unicode { low, high, dst } => {
                    let bytes = dst.utf16be();
                    let target = if bytes.len() == 2 {
                        let unit = u16::from_be_bytes([bytes[0], bytes[1]]) as u32;
                        BfRangeTarget::UTF16CodePoint {
                            offset: u32::wrapping_sub(unit, low.value()),
                        }
                    } else {
                        BfRangeTarget::HexString {
                            start: low.value(),
                            bytes,
                        }
                    };
                    cmap.put(low, high, target);
                }
                Entry::UnicodeArray { low, high, dsts } => {
                    let strings = dsts.iter().map(Destination::text).collect();
                    cmap.put(
                        low,
                        high,
                        BfRangeTarget::ArrayOfStrings {
                            start: low.value(),
                            strings,
                        },
                    );
                }
                Entry::Cid { low, high, cid } => cmap.put_cid(low, high, cid),
            }
        }
        cmap.set_name(self.name);
        cmap.set_version(self.version);
        cmap.set_cmap_type(self.cmap_type);
        cmap.set_writing_mode(self.writing_mode);
        if self.registry.is_some() || self.ordering.is_some() || self.supplement.is_some() {
            cmap.set_cid_system_info(Some(CidSystemInfo {
                registry: self.registry.unwrap_or_default(),
                ordering: self.ordering.unwrap_or_default(),
                supplement: self.supplement.unwrap_or_default(),
            }));
        }
        cmap
    }
}

// Number of codes after `low` in the range.
fn check_range(block: &'static str, low: Code, high: Code) -> Result<u32> {
    if low.len() != high.len() {
        return Err(Error::malformed(block, format!("{} and {} differ in length", low, high)));
    }
    if high.value() < low.value() {
        return Err(Error::malformed(block, format!("high code {} is below low code {}", high, low)));
    }
    Ok(high.value() - low.value())
}
