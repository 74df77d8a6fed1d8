// SPDX-License-Identifier: MIT

//! Stable completion keys for checklist entries
//!
//! Keys are `/`-joined paths such as `collectibles/cans/eidos-7-can`. They are
//! what progress files and exports store, so the escaping rules must not drift.

const STAR: char = '\u{2605}';

/// Whether `c` survives escaping unchanged
///
/// Kept: ASCII lowercase letters, digits, and every code point from `_`
/// through `★`. The range covers most accented letters and symbols, which
/// existing progress files already contain.
fn is_kept(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || ('_'..=STAR).contains(&c)
}

/// Turn a display title into a key segment
pub fn escape_key(title: &str) -> String {
    let lowered = title
        .to_lowercase()
        .replace("\u{2019}s", "")
        .replace('\u{2019}', "-");

    let mut escaped = String::with_capacity(lowered.len());
    for c in lowered.chars() {
        let c = if c == STAR {
            '*'
        } else if c.is_whitespace() || !is_kept(c) {
            '-'
        } else {
            c
        };
        // collapse dash runs as they appear
        if c == '-' && escaped.ends_with('-') {
            continue;
        }
        escaped.push(c);
    }

    escaped.trim_matches('-').to_string()
}

/// Join `data_key` and the non-empty `segments` with `/`
pub fn make_key<'a, I>(data_key: &'a str, segments: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    std::iter::once(data_key)
        .chain(segments)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
