//! Post-processing: deterministic cleanup of extracted plain text.
//!
//! PDF text layers and OCR output carry artefacts that do not belong in the
//! `.txt` output: CRLF line endings, typographic ligatures, zero-width
//! characters, runs of padding spaces and long stretches of blank lines.
//!
//! ## Rule Order
//!
//! Line endings are normalised first so every later rule can assume `\n`.
//! Character-level rules run before the whitespace rules because removing
//! an invisible character can leave a line with only trailing blanks.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to extracted text.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 3. Expand common ligatures (`ﬁ` → `fi`, ...)
/// 4. Replace non-breaking spaces with plain spaces
/// 5. Collapse runs of spaces inside a line
/// 6. Trim trailing spaces per line (form feeds between pages survive)
/// 7. Collapse 3+ consecutive newlines down to one blank line
/// 8. Ensure the text ends with exactly one newline
pub fn clean_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = expand_ligatures(&s);
    let s = s.replace(['\u{00A0}', '\u{202F}'], " ");
    let s = collapse_spaces(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    ensure_final_newline(&s)
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 3: Expand ligatures ─────────────────────────────────────────────────

const LIGATURES: &[(char, &str)] = &[
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
];

fn expand_ligatures(input: &str) -> String {
    if !input.chars().any(|c| ('\u{FB00}'..='\u{FB04}').contains(&c)) {
        return input.to_string();
    }
    let mut out = input.to_string();
    for (lig, expanded) in LIGATURES {
        out = out.replace(*lig, expanded);
    }
    out
}

// ── Rule 5: Collapse runs of spaces ──────────────────────────────────────────

static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").unwrap());

fn collapse_spaces(input: &str) -> String {
    input
        .lines()
        .map(|line| {
            // Leading indentation is kept as-is.
            let body_start = line.len() - line.trim_start_matches(' ').len();
            let (indent, body) = line.split_at(body_start);
            format!("{indent}{}", RE_SPACES.replace_all(body, " "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 6: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end_matches([' ', '\t']))
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 7: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Rule 8: Ensure text ends with single newline ─────────────────────────────

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{}\n", trimmed)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_remove_invisible() {
        assert_eq!(remove_invisible_chars("Ja\u{200B}ne\u{FEFF}"), "Jane");
    }

    #[test]
    fn test_expand_ligatures() {
        assert_eq!(expand_ligatures("e\u{FB03}cient pro\u{FB01}le"), "efficient profile");
        assert_eq!(expand_ligatures("plain"), "plain");
    }

    #[test]
    fn test_collapse_spaces_keeps_indent() {
        assert_eq!(collapse_spaces("  Senior    Engineer"), "  Senior Engineer");
    }

    #[test]
    fn test_trim_trailing_keeps_form_feed() {
        assert_eq!(trim_trailing_whitespace("a  \n\u{000C}\nb\t"), "a\n\u{000C}\nb");
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_ensure_final_newline() {
        assert_eq!(ensure_final_newline("hello"), "hello\n");
        assert_eq!(ensure_final_newline("hello\n\n\n"), "hello\n");
        assert_eq!(ensure_final_newline(""), "\n");
    }

    #[test]
    fn test_clean_text_full_pipeline() {
        let input = "Jane\u{00A0}Doe  \r\n\r\n\r\n\r\nSo\u{00AD}ftware   Engineer\r\n";
        assert_eq!(clean_text(input), "Jane Doe\n\nSoftware Engineer\n");
    }
}
