// SPDX-License-Identifier: MIT

//! Quoted string literal scanning
//!
//! Finds the quoted regions of an expression so the lexer can treat their
//! contents as opaque text. A quote preceded by a backslash is not a
//! delimiter. The first unmatched quote of a kind opens a literal and the next
//! quote of the same kind closes it; quotes of other kinds in between belong
//! to the literal. A quote that never closes is skipped.

/// Recognized quote characters
pub const QUOTE_CHARS: [char; 3] = ['"', '\'', '`'];

/// A quoted region of the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiteralSpan {
    /// Delimiter used on both ends
    pub quote: char,
    /// Byte offset of the opening delimiter
    pub start: usize,
    /// Byte offset of the closing delimiter
    pub end: usize,
}

impl LiteralSpan {
    /// Raw text between the delimiters
    pub fn content<'a>(&self, input: &'a str) -> &'a str {
        &input[self.start + 1..self.end]
    }

    /// Byte offset just past the closing delimiter
    pub fn after(&self) -> usize {
        self.end + self.quote.len_utf8()
    }
}

/// Scan `input` for quoted literals, in order of appearance
pub fn scan_literals(input: &str) -> Vec<LiteralSpan> {
    let marks = delimiters(input);
    let mut spans = Vec::new();

    let mut i = 0;
    while i < marks.len() {
        let (open_at, quote) = marks[i];
        match (i + 1..marks.len()).find(|&j| marks[j].1 == quote) {
            Some(j) => {
                spans.push(LiteralSpan {
                    quote,
                    start: open_at,
                    end: marks[j].0,
                });
                i = j + 1;
            }
            None => i += 1,
        }
    }

    spans
}

/// Unescaped quote characters with their byte offsets
fn delimiters(input: &str) -> Vec<(usize, char)> {
    let mut marks = Vec::new();
    let mut prev = None;
    for (idx, c) in input.char_indices() {
        if QUOTE_CHARS.contains(&c) && prev != Some('\\') {
            marks.push((idx, c));
        }
        prev = Some(c);
    }
    marks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(input: &str) -> Vec<&str> {
        scan_literals(input)
            .iter()
            .map(|s| s.content(input))
            .collect()
    }

    #[test]
    fn test_single_and_double_quotes() {
        let input = r#"a == 'x' && b == "y""#;
        let spans = scan_literals(input);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].quote, '\'');
        assert_eq!(spans[0].start, 5);
        assert_eq!(spans[0].end, 7);
        assert_eq!(spans[1].quote, '"');
        assert_eq!(contents(input), vec!["x", "y"]);
    }

    #[test]
    fn test_backtick_literal() {
        assert_eq!(contents("f == `tpl`"), vec!["tpl"]);
    }

    #[test]
    fn test_escaped_quotes_are_not_delimiters() {
        let input = r#"He said \"hi\" to 'bob'"#;
        assert_eq!(contents(input), vec!["bob"]);

        let input = r#"f == "He said \"hi\" to 'bob'""#;
        assert_eq!(contents(input), vec![r#"He said \"hi\" to 'bob'"#]);
    }

    #[test]
    fn test_other_quotes_inside_literal() {
        let input = r#"f == "it's" && g == 'ok'"#;
        assert_eq!(contents(input), vec!["it's", "ok"]);
    }

    #[test]
    fn test_unterminated_quote_yields_no_span() {
        assert!(scan_literals("f == 'abc").is_empty());
        assert!(scan_literals("\"").is_empty());
    }

    #[test]
    fn test_unterminated_quote_skipped_before_later_pair() {
        let input = r#"f == "abc && g == 'x'"#;
        assert_eq!(contents(input), vec!["x"]);
    }

    #[test]
    fn test_leading_quote() {
        let input = "'a' == f";
        let spans = scan_literals(input);
        assert_eq!(spans[0].start, 0);
        assert_eq!(spans[0].after(), 3);
    }

    #[test]
    fn test_empty_literal() {
        let input = "f == ''";
        assert_eq!(contents(input), vec![""]);
    }

    #[test]
    fn test_no_quotes() {
        assert!(scan_literals("gameMode >= 1 && region < 3").is_empty());
    }
}
