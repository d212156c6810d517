use crate::cmap_builder::CMapBuilder;
use crate::encodings::cmap::{CidSystemInfo, WritingMode};
use crate::token::{Token, TokenStream};
use log::{debug, trace};

/// Interpret a name met outside of any block, such as `/CMapName /Adobe-Identity-UCS def`.
///
/// Recognized names take the following token as their value when it has the expected
/// type, anything else is left in the stream. Returns the consumed value.
pub(crate) fn parse_name<S: TokenStream>(name: &str, stream: &mut S, builder: &mut CMapBuilder) -> Option<Token> {
    let value = stream.peek_token()?;
    let accepted = match name {
        "CMapName" => value.as_name().map(|cmap_name| builder.set_name(cmap_name.to_string())),
        "CMapVersion" => version(value).map(|version| builder.set_version(version)),
        "CMapType" => value.as_i64().map(|cmap_type| builder.set_cmap_type(cmap_type)),
        "WMode" => value.as_i64().map(|mode| builder.set_writing_mode(writing_mode(mode))),
        "Registry" => value.as_text().map(|registry| builder.set_registry(registry)),
        "Ordering" => value.as_text().map(|ordering| builder.set_ordering(ordering)),
        "Supplement" => value.as_i64().map(|supplement| builder.set_supplement(supplement)),
        "CIDSystemInfo" => cid_system_info(value).map(|info| builder.set_cid_system_info(info)),
        _ => None,
    };
    match accepted {
        Some(()) => {
            let value = stream.next_token();
            trace!("/{} {:?}", name, value);
            value
        }
        None => {
            debug!("ignoring /{}", name);
            None
        }
    }
}

fn version(value: &Token) -> Option<String> {
    match value {
        Token::Integer(version) => Some(version.to_string()),
        Token::Real(version) => Some(version.to_string()),
        _ => value.as_text(),
    }
}

fn writing_mode(mode: i64) -> WritingMode {
    match mode {
        1 => WritingMode::Vertical,
        _ => WritingMode::Horizontal,
    }
}

// Either a dictionary or an array whose first element is one.
fn cid_system_info(value: &Token) -> Option<CidSystemInfo> {
    let entries = match value {
        Token::Dictionary(entries) => entries,
        Token::Array(items) => match items.first() {
            Some(Token::Dictionary(entries)) => entries,
            _ => return None,
        },
        _ => return None,
    };
    let mut info = CidSystemInfo::default();
    for (key, value) in entries {
        match key.as_str() {
            "Registry" => info.registry = value.as_text().unwrap_or_default(),
            "Ordering" => info.ordering = value.as_text().unwrap_or_default(),
            "Supplement" => info.supplement = value.as_i64().unwrap_or_default(),
            _ => {}
        }
    }
    Some(info)
}
