//! Entity decoding for the XML fragments read from captions and Office files

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NUMERIC_ENTITY: Regex = Regex::new(r"&#(x?)([0-9a-fA-F]+);").unwrap();
}

/// Decode the predefined XML entities and numeric character references
pub(crate) fn unescape_entities(text: &str) -> String {
    let numeric = NUMERIC_ENTITY.replace_all(text, |caps: &regex::Captures| {
        let radix = if caps[1].is_empty() { 10 } else { 16 };
        u32::from_str_radix(&caps[2], radix)
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });
    numeric
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
