//! Escaping of table and column names for IRIs and file names.
//!
//! SQLite identifiers may contain any character. The same escaping is used
//! for IRI local names and output file stems: every byte outside the
//! RFC 3986 unreserved set is percent-encoded. The encoding is injective, so
//! two different tables never map to the same file, and the result never
//! contains a path separator.

use std::fmt::Write as _;

/// Percent-encodes every byte outside `A-Z a-z 0-9 - . _ ~`.
///
/// # Examples
///
/// ```
/// use dbcroissant_core::escape_component;
///
/// assert_eq!(escape_component("var"), "var");
/// assert_eq!(escape_component("my table"), "my%20table");
/// assert_eq!(escape_component("../etc"), "..%2Fetc");
/// ```
pub fn escape_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if is_unreserved(byte) {
            out.push(byte as char);
        } else {
            let _ = write!(&mut out, "%{byte:02X}");
        }
    }
    out
}

fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~')
}

/// Returns `true` if `local` can be written after `prefix:` in Turtle
/// without escapes.
///
/// Deliberately narrower than the Turtle grammar: ASCII letters, digits,
/// `_` and `-`, not starting with `-` or a digit.
pub fn is_turtle_local_name(local: &str) -> bool {
    let mut chars = local.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
