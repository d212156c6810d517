pub mod cmap;

use encoding_rs::UTF_16BE;
use lazy_static::lazy_static;
use std::collections::HashMap;

lazy_static! {
    // Adobe Glyph List names back to the character they are named after.
    static ref GLYPH_NAME_TO_CHAR: HashMap<String, char> = {
        let mut map = HashMap::new();
        for cp in 0x20..=0xFFFFu32 {
            let Some(ch) = char::from_u32(cp) else { continue };
            if let Some(name) = glyph_names::glyph_name(cp) {
                if !name.starts_with("uni") {
                    map.entry(name.to_string()).or_insert(ch);
                }
            }
        }
        map
    };
}

pub(crate) fn utf16be_to_string(bytes: &[u8]) -> String {
    let (text, _) = UTF_16BE.decode_without_bom_handling(bytes);
    text.into_owned()
}

pub(crate) fn string_to_utf16be(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_be_bytes).collect()
}

/// Whether the trailing code unit of `bytes` can be incremented by `offset` without overflow.
///
/// A trailing low surrogate has to stay a low surrogate.
pub(crate) fn can_increment_utf16be(bytes: &[u8], offset: u32) -> bool {
    match trailing_unit(bytes) {
        Some(unit @ 0xDC00..=0xDFFF) => unit as u32 + offset <= 0xDFFF,
        Some(unit) => unit as u32 + offset <= u16::MAX as u32,
        None => offset == 0,
    }
}

/// Add `offset` to the trailing UTF-16BE code unit of `bytes`.
pub(crate) fn increment_utf16be(bytes: &[u8], offset: u32) -> Vec<u8> {
    let mut incremented = bytes.to_vec();
    if let Some(unit) = trailing_unit(bytes) {
        let len = incremented.len();
        let unit = (unit as u32).wrapping_add(offset) as u16;
        incremented[len - 2..].copy_from_slice(&unit.to_be_bytes());
    }
    incremented
}

fn trailing_unit(bytes: &[u8]) -> Option<u16> {
    match bytes {
        [.., high, low] => Some(u16::from_be_bytes([*high, *low])),
        _ => None,
    }
}

/// Text a glyph name destination stands for.
///
/// `uniXXXX` (one or more UTF-16 code units) and `uXXXX` to `uXXXXXX` name a
/// code point directly, other names are looked up in the Adobe Glyph List.
/// Unknown names are kept as they are.
pub fn glyph_name_to_text(name: &str) -> String {
    // suffixes such as `.sc` or `.alt` name variants of the same character
    let base = name.split('.').next().unwrap_or(name);
    if let Some(text) = uni_name(base).or_else(|| u_name(base)) {
        return text;
    }
    match GLYPH_NAME_TO_CHAR.get(base) {
        Some(ch) => ch.to_string(),
        None => name.to_string(),
    }
}

fn uni_name(name: &str) -> Option<String> {
    let hex = name.strip_prefix("uni")?;
    if hex.is_empty() || hex.len() % 4 != 0 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let units = hex
        .as_bytes()
        .chunks(4)
        .map(|chunk| std::str::from_utf8(chunk).ok().and_then(|s| u16::from_str_radix(s, 16).ok()))
        .collect::<Option<Vec<u16>>>()?;
    String::from_utf16(&units).ok()
}

fn u_name(name: &str) -> Option<String> {
    let hex = name.strip_prefix('u')?;
    if !(4..=6).contains(&hex.len()) || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let cp = u32::from_str_radix(hex, 16).ok()?;
    char::from_u32(cp).map(String::from)
}
