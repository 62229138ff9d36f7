//! Best-effort plain text recovery from PDF bytes.
//!
//! This is not a PDF parser. The bytes are viewed as windows-1252 text, content
//! streams are located by their `stream`/`endstream` keywords, and only the
//! literal-string text operators are understood:
//!
//! - `(Hello) Tj` shows one string
//! - `[(Hel) -20 (lo)] TJ` shows every string in the array, kerning ignored
//!
//! Compressed (Flate etc.) streams are not inflated, so most of their text is
//! invisible here; a whole-document scan for printable parenthesized runs is
//! the only fallback. Extraction never fails: when too little text comes back
//! a bracketed placeholder naming the file is returned instead.

use std::sync::LazyLock;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use regex::bytes::Regex;
use tracing::{debug, info, warn};

use crate::contract::{ErrorPayload, ParsePdfRequest, ParsePdfResponse, TextRecovery};

/// Output is cut to this many characters.
pub const MAX_CONTENT_CHARS: usize = 50_000;
/// Less recovered text than this yields the placeholder.
pub const MIN_TEXT_CHARS: usize = 50;
/// Largest decoded PDF accepted by [`handle_parse_pdf`].
pub const MAX_PDF_BYTES: usize = 5 * 1024 * 1024;

pub const PLACEHOLDER_PREFIX: &str = "[PDF tekst nije mogao biti u potpunosti ekstrahovan.";

static STREAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s-u)stream\s*(.*?)\s*endstream").expect("stream pattern is valid")
});

static PRINTABLE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u)\(([\x20-\x7E]+)\)").expect("printable run pattern is valid"));

/// Default [`TextRecovery`]: `Tj`/`TJ` operators inside content streams, with
/// a printable-run scan of the whole file when no stream yields anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct OperatorScan;

impl TextRecovery for OperatorScan {
    fn recover_fragments(&self, pdf: &[u8]) -> Vec<String> {
        let mut fragments = Vec::new();
        let mut streams = 0usize;
        for caps in STREAM.captures_iter(pdf) {
            streams += 1;
            if let Some(content) = caps.get(1) {
                scan_text_operators(content.as_bytes(), &mut fragments);
            }
        }
        debug!(streams, fragments = fragments.len(), "[PDF] Scanned content streams");

        if fragments.is_empty() {
            fragments = printable_runs(pdf);
            debug!(fragments = fragments.len(), "[PDF] Fell back to printable run scan");
        }
        fragments
    }
}

/// Extract text with the default [`OperatorScan`] strategy.
pub fn extract_text(pdf: &[u8], file_name: &str) -> String {
    extract_text_with(&OperatorScan, pdf, file_name)
}

/// Extract text with a caller-chosen recovery strategy.
///
/// Always returns a non-empty string of at most [`MAX_CONTENT_CHARS`] characters.
pub fn extract_text_with<R>(recovery: &R, pdf: &[u8], file_name: &str) -> String
where
    R: TextRecovery + ?Sized,
{
    let fragments = recovery.recover_fragments(pdf);
    let joined = fragments
        .iter()
        .map(|f| decode_pdf_escapes(f))
        .collect::<Vec<_>>()
        .join(" ");
    let text = clean_text(&joined);
    let chars = text.chars().count();

    let result = if chars < MIN_TEXT_CHARS {
        warn!(file_name, chars, "[PDF] Too little text recovered; returning placeholder");
        placeholder(file_name, &text)
    } else {
        text
    };
    truncate_chars(&result, MAX_CONTENT_CHARS)
}

/// Diagnostic text used in place of content when extraction comes up short.
pub fn placeholder(file_name: &str, partial: &str) -> String {
    let name = match file_name.trim() {
        "" => "nepoznat fajl",
        n => n,
    };
    let partial = if partial.is_empty() {
        "nepoznat sadržaj"
    } else {
        partial
    };
    format!("{PLACEHOLDER_PREFIX} PDF fajl \"{name}\": {partial}]")
}

pub fn is_placeholder(text: &str) -> bool {
    text.starts_with(PLACEHOLDER_PREFIX)
}

#[derive(Debug, thiserror::Error)]
pub enum ParsePdfError {
    #[error("PDF sadržaj nije prosleđen")]
    MissingContent,

    #[error("PDF je veći od 5MB ({size} bajtova)")]
    TooLarge { size: usize },

    #[error("neispravan base64 sadržaj: {0}")]
    Decode(#[from] base64::DecodeError),
}

impl ParsePdfError {
    /// HTTP-style status code for this failure.
    pub fn status(&self) -> u16 {
        match self {
            ParsePdfError::MissingContent => 400,
            ParsePdfError::TooLarge { .. } => 413,
            ParsePdfError::Decode(_) => 500,
        }
    }

    pub fn payload(&self) -> ErrorPayload {
        ErrorPayload {
            error: self.to_string(),
        }
    }
}

/// Decode a base64 request and extract its text.
///
/// Caller identity and role checks are expected to have happened already.
pub fn handle_parse_pdf(request: &ParsePdfRequest) -> Result<ParsePdfResponse, ParsePdfError> {
    let encoded: String = request
        .pdf_base64
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    if encoded.is_empty() {
        warn!(file_name = %request.file_name, "[PDF] Request carried no PDF content");
        return Err(ParsePdfError::MissingContent);
    }

    // Decoded length is at least this minus two padding bytes.
    let estimated = encoded.len() / 4 * 3;
    if estimated > MAX_PDF_BYTES + 2 {
        warn!(estimated, file_name = %request.file_name, "[PDF] Encoded payload over size ceiling");
        return Err(ParsePdfError::TooLarge { size: estimated });
    }

    let pdf = BASE64.decode(encoded.as_bytes()).map_err(|e| {
        warn!(error = %e, file_name = %request.file_name, "[PDF] Invalid base64 payload");
        ParsePdfError::Decode(e)
    })?;
    parse_pdf_bytes(&pdf, &request.file_name)
}

/// Size-check already decoded PDF bytes and extract their text.
pub fn parse_pdf_bytes(pdf: &[u8], file_name: &str) -> Result<ParsePdfResponse, ParsePdfError> {
    if pdf.len() > MAX_PDF_BYTES {
        warn!(size = pdf.len(), file_name, "[PDF] Payload over size ceiling");
        return Err(ParsePdfError::TooLarge { size: pdf.len() });
    }

    info!(file_name, size = pdf.len(), "[PDF] Parsing PDF");
    let content = extract_text(pdf, file_name);
    info!(chars = content.chars().count(), "[PDF] Extracted characters from PDF");

    Ok(ParsePdfResponse {
        content,
        file_name: file_name.to_string(),
    })
}

/// Operand waiting for its operator.
enum Operand {
    Str(String),
    Array(Vec<String>),
}

fn is_pdf_whitespace(b: u8) -> bool {
    matches!(b, b'\0' | b'\t' | b'\n' | b'\x0C' | b'\r' | b' ')
}

fn is_pdf_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

/// Decode as windows-1252, the table browsers use for the `latin1` label.
/// Only 0x80..=0x9F differ from ISO-8859-1; unassigned bytes keep their C1 code point.
fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| windows_1252(b)).collect()
}

fn windows_1252(b: u8) -> char {
    match b {
        0x80 => '\u{20AC}',
        0x82 => '\u{201A}',
        0x83 => '\u{0192}',
        0x84 => '\u{201E}',
        0x85 => '\u{2026}',
        0x86 => '\u{2020}',
        0x87 => '\u{2021}',
        0x88 => '\u{02C6}',
        0x89 => '\u{2030}',
        0x8A => '\u{0160}',
        0x8B => '\u{2039}',
        0x8C => '\u{0152}',
        0x8E => '\u{017D}',
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201C}',
        0x94 => '\u{201D}',
        0x95 => '\u{2022}',
        0x96 => '\u{2013}',
        0x97 => '\u{2014}',
        0x98 => '\u{02DC}',
        0x99 => '\u{2122}',
        0x9A => '\u{0161}',
        0x9B => '\u{203A}',
        0x9C => '\u{0153}',
        0x9E => '\u{017E}',
        0x9F => '\u{0178}',
        _ => b as char,
    }
}

/// Walk one content stream and push the strings shown by `Tj` and `TJ`.
fn scan_text_operators(content: &[u8], out: &mut Vec<String>) {
    let mut pending: Option<Operand> = None;
    let mut pos = 0;

    while pos < content.len() {
        let b = content[pos];
        if is_pdf_whitespace(b) {
            pos += 1;
            continue;
        }
        match b {
            b'(' => {
                let (s, next) = read_literal(content, pos);
                pending = Some(Operand::Str(s));
                pos = next;
            }
            b'[' => {
                let (items, next) = read_array(content, pos);
                pending = Some(Operand::Array(items));
                pos = next;
            }
            b'%' => {
                while pos < content.len() && content[pos] != b'\n' && content[pos] != b'\r' {
                    pos += 1;
                }
            }
            _ if is_pdf_delimiter(b) => {
                pending = None;
                pos += 1;
            }
            _ => {
                let start = pos;
                while pos < content.len()
                    && !is_pdf_whitespace(content[pos])
                    && !is_pdf_delimiter(content[pos])
                {
                    pos += 1;
                }
                match (&content[start..pos], pending.take()) {
                    (b"Tj", Some(Operand::Str(s))) => out.push(s),
                    (b"TJ", Some(Operand::Array(items))) => out.extend(items),
                    _ => {}
                }
            }
        }
    }
}

/// Read a literal string starting at `(`; escapes are kept verbatim.
/// Returns the raw inner text and the position after the closing `)`.
fn read_literal(content: &[u8], start: usize) -> (String, usize) {
    let mut depth = 0usize;
    let mut raw = Vec::new();
    let mut i = start;

    while i < content.len() {
        let b = content[i];
        match b {
            b'\\' => {
                raw.push(b);
                if let Some(&next) = content.get(i + 1) {
                    raw.push(next);
                }
                i += 2;
                continue;
            }
            b'(' => {
                depth += 1;
                if depth == 1 {
                    i += 1;
                    continue;
                }
            }
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return (latin1(&raw), i + 1);
                }
            }
            _ => {}
        }
        raw.push(b);
        i += 1;
    }
    (latin1(&raw), content.len())
}

/// Read an array starting at `[`, keeping only its literal strings.
fn read_array(content: &[u8], start: usize) -> (Vec<String>, usize) {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut i = start;

    while i < content.len() {
        match content[i] {
            b'(' => {
                let (s, next) = read_literal(content, i);
                items.push(s);
                i = next;
                continue;
            }
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return (items, i + 1);
                }
            }
            _ => {}
        }
        i += 1;
    }
    (items, content.len())
}

/// Parenthesized printable ASCII runs longer than 3 chars containing a letter.
fn printable_runs(pdf: &[u8]) -> Vec<String> {
    PRINTABLE_RUN
        .captures_iter(pdf)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_bytes())
        .filter(|inner| inner.len() > 3 && inner.iter().any(u8::is_ascii_alphabetic))
        .map(latin1)
        .collect()
}

/// Decode `\n`, `\r`, `\t`, `\\`, `\(` and `\)`; other escapes stay as written.
pub fn decode_pdf_escapes(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(e @ ('\\' | '(' | ')')) => out.push(e),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Printable ASCII, Latin Extended-A and Cyrillic survive.
fn is_kept_char(c: char) -> bool {
    matches!(c, '\u{20}'..='\u{7E}' | '\u{0100}'..='\u{017F}' | '\u{0400}'..='\u{04FF}')
}

/// Blank out unsupported characters, collapse whitespace, trim.
fn clean_text(joined: &str) -> String {
    let kept: String = joined
        .chars()
        .map(|c| if is_kept_char(c) { c } else { ' ' })
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragments(content: &str) -> Vec<String> {
        let mut out = Vec::new();
        scan_text_operators(content.as_bytes(), &mut out);
        out
    }

    #[test]
    fn win_ansi_bytes_decode_to_serbian_latin() {
        assert_eq!(latin1(b"\x8Aebet \x9Akolska \x8Eeljezo \x9E"), "Šebet školska Željezo ž");
        assert_eq!(latin1(b"\xE9\x41"), "éA");
        assert_eq!(latin1(b"\x81"), "\u{81}");
    }

    #[test]
    fn single_string_show() {
        assert_eq!(fragments("BT /F1 12 Tf (Hello) Tj (World)Tj ET"), vec!["Hello", "World"]);
    }

    #[test]
    fn array_show_ignores_kerning() {
        assert_eq!(fragments("[(Hel) -20 (lo) 3.5 (!)] TJ"), vec!["Hel", "lo", "!"]);
    }

    #[test]
    fn operators_interleave_in_stream_order() {
        assert_eq!(
            fragments("(a) Tj [(b) 1 (c)] TJ (d) Tj"),
            vec!["a", "b", "c", "d"]
        );
    }

    #[test]
    fn strings_without_show_operator_are_ignored() {
        assert!(fragments("(x) 5 Tj (y) Td [(z)] Tj (w) TJ").is_empty());
    }

    #[test]
    fn nested_and_escaped_parens_stay_inside_string() {
        assert_eq!(
            fragments(r"(f(x) = \(y\)) Tj [(a\]b) (c]d)] TJ"),
            vec![r"f(x) = \(y\)", r"a\]b", "c]d"]
        );
    }

    #[test]
    fn unterminated_string_does_not_panic() {
        assert!(fragments("(never closed Tj").is_empty());
        assert!(fragments("[(a) (b").is_empty());
        assert!(fragments("(trailing backslash \\").is_empty());
    }

    #[test]
    fn escapes_decode_to_literal_characters() {
        assert_eq!(decode_pdf_escapes(r"a\nb\tc\\d\(e\)f\rg"), "a\nb\tc\\d(e)f\rg");
        assert_eq!(decode_pdf_escapes(r"\101 and \q"), r"\101 and \q");
        assert_eq!(decode_pdf_escapes("end\\"), "end\\");
    }

    #[test]
    fn clean_text_blanks_unsupported_and_collapses() {
        assert_eq!(clean_text("  a\n\n b\u{00E9}c \u{0160}ta \u{0416}  "), "a b c \u{0160}ta \u{0416}");
    }

    #[test]
    fn printable_runs_need_letters_and_length() {
        let runs = printable_runs(b"(123 456)\n(abc)\n(Word)\n(ok go)");
        assert_eq!(runs, vec!["Word", "ok go"]);
    }

    #[test]
    fn printable_run_spans_to_last_paren_on_a_line() {
        let runs = printable_runs(b"(Hello) Tj (World) Tj");
        assert_eq!(runs, vec!["Hello) Tj (World"]);
    }

    #[test]
    fn truncate_counts_chars_not_bytes() {
        assert_eq!(truncate_chars("\u{0160}\u{0160}\u{0160}", 2), "\u{0160}\u{0160}");
        assert_eq!(truncate_chars("ab", 5), "ab");
    }

    #[test]
    fn placeholder_names_file_and_partial_text() {
        let p = placeholder("clanak.pdf", "");
        assert!(is_placeholder(&p));
        assert!(p.contains("\"clanak.pdf\""));
        assert!(p.contains("nepoznat sadržaj"));
        assert!(placeholder("  ", "abc").contains("nepoznat fajl"));
    }

    #[test]
    fn status_codes_follow_failure_kind() {
        assert_eq!(ParsePdfError::MissingContent.status(), 400);
        assert_eq!(ParsePdfError::TooLarge { size: 1 }.status(), 413);
    }
}
