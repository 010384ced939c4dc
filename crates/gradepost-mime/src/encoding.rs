//! MIME encoding utilities.
//!
//! Supports Base64, Quoted-Printable, RFC 2047 header words and RFC 2231
//! parameter values. Every encoder emits CRLF line endings.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt::Write as _;

/// Maximum line length for encoded bodies (RFC 2045).
pub const MAX_LINE_LENGTH: usize = 76;

/// Preferred header line length (RFC 5322 §2.1.1).
const FOLD_WIDTH: usize = 78;

/// Longest header line SMTP must carry, without CRLF.
const MAX_HEADER_LINE: usize = 998;

/// Bytes of input per RFC 2047 encoded word, keeping each word under 75
/// characters.
const ENCODED_WORD_CHUNK: usize = 45;

/// Encodes data as Base64 on a single line.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Encodes data as Base64 wrapped at 76 columns, each line ending in CRLF.
#[must_use]
pub fn encode_base64_lines(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut out = String::with_capacity(encoded.len() + 2 * (encoded.len() / MAX_LINE_LENGTH + 1));

    for (i, c) in encoded.chars().enumerate() {
        if i > 0 && i % MAX_LINE_LENGTH == 0 {
            out.push_str("\r\n");
        }
        out.push(c);
    }
    if !out.is_empty() {
        out.push_str("\r\n");
    }
    out
}

/// Encodes text using Quoted-Printable encoding (RFC 2045).
///
/// Line breaks in the input (LF or CRLF) become CRLF hard breaks; lines
/// longer than 76 characters get `=` soft breaks; whitespace at the end
/// of a line is escaped.
#[must_use]
pub fn encode_quoted_printable(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n");
    let mut out = String::with_capacity(normalized.len() + normalized.len() / 8);
    let mut lines = normalized.split('\n').peekable();

    while let Some(line) = lines.next() {
        encode_quoted_printable_line(line.as_bytes(), &mut out);
        if lines.peek().is_some() {
            out.push_str("\r\n");
        }
    }
    out
}

fn encode_quoted_printable_line(line: &[u8], out: &mut String) {
    let mut width = 0;

    for (i, &byte) in line.iter().enumerate() {
        let last = i + 1 == line.len();
        let literal = match byte {
            b'!'..=b'<' | b'>'..=b'~' => true,
            b' ' | b'\t' => !last,
            _ => false,
        };
        let token_len = if literal { 1 } else { 3 };
        // Leave room for the soft-break `=` unless nothing follows.
        let limit = if last {
            MAX_LINE_LENGTH
        } else {
            MAX_LINE_LENGTH - 1
        };

        if width + token_len > limit {
            out.push_str("=\r\n");
            width = 0;
        }
        if literal {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "={byte:02X}");
        }
        width += token_len;
    }
}

/// Returns true if a header value must be RFC 2047 encoded.
#[must_use]
pub fn needs_encoding(text: &str) -> bool {
    text.chars().any(|c| !c.is_ascii() || c.is_ascii_control()) || text.contains("=?")
}

/// Prepares free text for a header whose name and `: ` take `offset`
/// columns.
///
/// Plain ASCII is folded at spaces to stay within 78 columns where a word
/// allows it. Text with non-ASCII or control characters, or with a word no
/// header line could hold, becomes RFC 2047 encoded words instead.
#[must_use]
pub fn encode_header_text(text: &str, offset: usize) -> String {
    let fits = text
        .split(' ')
        .all(|word| offset + word.len() <= MAX_HEADER_LINE);
    if needs_encoding(text) || !fits {
        encode_rfc2047(text)
    } else {
        fold(text, offset)
    }
}

fn fold(text: &str, offset: usize) -> String {
    let mut out = String::with_capacity(text.len() + 3 * (text.len() / FOLD_WIDTH));
    let mut width = offset;
    let mut line_has_text = false;

    for (i, word) in text.split(' ').enumerate() {
        if i > 0 {
            // The space stays as the leading whitespace of the next line.
            if line_has_text && !word.is_empty() && width + 1 + word.len() > FOLD_WIDTH {
                out.push_str("\r\n");
                width = 0;
                line_has_text = false;
            }
            out.push(' ');
            width += 1;
        }
        out.push_str(word);
        width += word.len();
        line_has_text |= !word.is_empty();
    }
    out
}

/// Encodes text as RFC 2047 `B` encoded words joined by folding whitespace.
///
/// Splits never fall inside a UTF-8 sequence.
#[must_use]
pub fn encode_rfc2047(text: &str) -> String {
    let mut words = Vec::new();
    let mut chunk = String::new();
    for c in text.chars() {
        if chunk.len() + c.len_utf8() > ENCODED_WORD_CHUNK {
            words.push(encoded_word(&chunk));
            chunk.clear();
        }
        chunk.push(c);
    }
    if !chunk.is_empty() {
        words.push(encoded_word(&chunk));
    }

    words.join("\r\n ")
}

fn encoded_word(chunk: &str) -> String {
    format!("=?utf-8?B?{}?=", encode_base64(chunk.as_bytes()))
}

/// Encodes a parameter value as an RFC 2231 extended value
/// (`utf-8''percent-encoded`).
#[must_use]
pub fn encode_rfc2231(value: &str) -> String {
    let mut out = String::from("utf-8''");
    for &byte in value.as_bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "%{byte:02X}");
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_base64_single_line() {
        assert_eq!(encode_base64(b"Hello, World!"), "SGVsbG8sIFdvcmxkIQ==");
    }

    #[test]
    fn test_base64_lines_wrap_at_76() {
        let encoded = encode_base64_lines(&[0u8; 100]);
        let lines: Vec<&str> = encoded.split("\r\n").collect();
        assert_eq!(lines.len(), 3); // two lines plus the empty tail
        assert_eq!(lines[0].len(), 76);
        assert_eq!(lines[1].len(), 136 - 76);
        assert_eq!(lines[2], "");
    }

    #[test]
    fn test_base64_lines_empty() {
        assert_eq!(encode_base64_lines(b""), "");
    }

    #[test]
    fn test_quoted_printable_passthrough() {
        assert_eq!(encode_quoted_printable("Hello, World!"), "Hello, World!");
    }

    #[test]
    fn test_quoted_printable_umlauts_and_equals() {
        assert_eq!(encode_quoted_printable("Grüße"), "Gr=C3=BC=C3=9Fe");
        assert_eq!(encode_quoted_printable("a=b"), "a=3Db");
    }

    #[test]
    fn test_quoted_printable_line_breaks() {
        assert_eq!(
            encode_quoted_printable("Hallo \r\nWelt\n"),
            "Hallo=20\r\nWelt\r\n"
        );
    }

    #[test]
    fn test_quoted_printable_soft_breaks() {
        let long = "x".repeat(200);
        let encoded = encode_quoted_printable(&long);
        let lines: Vec<&str> = encoded.split("\r\n").collect();
        assert_eq!(lines[0].len(), 76);
        assert!(lines[0].ends_with('='));
        let rejoined: String = lines.iter().map(|l| l.trim_end_matches('=')).collect();
        assert_eq!(rejoined, long);
    }

    #[test]
    fn test_header_text_short_ascii_untouched() {
        assert_eq!(
            encode_header_text("Individual submission correction", 9),
            "Individual submission correction"
        );
        assert_eq!(encode_header_text("", 9), "");
    }

    #[test]
    fn test_header_text_long_ascii_is_folded_at_spaces() {
        let subject = "Individual submission correction ".repeat(40);
        let subject = subject.trim_end();
        let folded = encode_header_text(subject, "Subject: ".len());

        let lines: Vec<&str> = folded.split("\r\n").collect();
        assert!(lines.len() > 1);
        assert!("Subject: ".len() + lines[0].len() <= FOLD_WIDTH);
        for line in &lines[1..] {
            assert!(line.starts_with(' '));
            assert!(line.len() <= FOLD_WIDTH);
        }
        assert_eq!(folded.replace("\r\n", ""), subject);
    }

    #[test]
    fn test_header_text_unbreakable_word_is_encoded() {
        let word = "x".repeat(1200);
        let encoded = encode_header_text(&word, "Subject: ".len());
        assert!(encoded.starts_with("=?utf-8?B?"));
        assert!(encoded.split("\r\n").all(|line| line.len() <= 76));
    }

    #[test]
    fn test_header_text_non_ascii_is_encoded() {
        assert_eq!(encode_header_text("Müller", 9), "=?utf-8?B?TcO8bGxlcg==?=");
    }

    #[test]
    fn test_rfc2047_encodes_non_ascii() {
        assert_eq!(encode_rfc2047("Müller"), "=?utf-8?B?TcO8bGxlcg==?=");
    }

    #[test]
    fn test_rfc2047_splits_long_values() {
        let encoded = encode_rfc2047(&"ü".repeat(60));
        let words: Vec<&str> = encoded.split("\r\n ").collect();
        assert_eq!(words.len(), 3);
        assert!(words.iter().all(|w| w.len() <= 75));
    }

    #[test]
    fn test_rfc2231() {
        assert_eq!(encode_rfc2231("report.pdf"), "utf-8''report.pdf");
        assert_eq!(
            encode_rfc2231("Abgabe Müller.pdf"),
            "utf-8''Abgabe%20M%C3%BCller.pdf"
        );
    }

    proptest! {
        #[test]
        fn quoted_printable_lines_stay_short_and_ascii(text in "\\PC{0,400}") {
            let encoded = encode_quoted_printable(&text);
            for line in encoded.split("\r\n") {
                prop_assert!(line.len() <= MAX_LINE_LENGTH);
                prop_assert!(line.is_ascii());
                prop_assert!(!line.ends_with(' ') && !line.ends_with('\t'));
            }
        }
    }
}
