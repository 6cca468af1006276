//! Participant field validation: email syntax and display-name formatting.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::InvalidInputError;

/// Maximum number of words kept from a participant's name.
pub const MAX_NAME_WORDS: usize = 3;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("email pattern is a valid regex")
});

/// Syntactic email check: `local@domain.tld`, no DNS lookup.
pub fn validate_email(candidate: &str) -> bool {
    EMAIL_PATTERN.is_match(candidate)
}

/// Normalize a raw name for printing on a certificate.
///
/// Collapses whitespace, keeps the first [`MAX_NAME_WORDS`] words and
/// title-cases each of them. `None` means the cell held no text.
pub fn format_name(candidate: Option<&str>) -> Result<String, InvalidInputError> {
    let raw = candidate.ok_or(InvalidInputError::NotText)?;

    let words: Vec<String> = raw
        .split_whitespace()
        .take(MAX_NAME_WORDS)
        .map(title_case)
        .collect();

    if words.is_empty() {
        return Err(InvalidInputError::EmptyName);
    }
    Ok(words.join(" "))
}

/// Upper-case letters that start a word part, lower-case the rest.
///
/// A part ends at digits, punctuation or control characters. Combining marks
/// and other symbols continue the current part, so `e\u{301}lodie` stays
/// one part.
fn title_case(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut prev_is_letter = false;
    for ch in word.chars() {
        if ch.is_alphabetic() {
            if prev_is_letter {
                out.extend(ch.to_lowercase());
            } else {
                // Multi-char uppercase forms (e.g. "ß" -> "SS") keep only the
                // first char upper so the result is stable on a second pass.
                let mut upper = ch.to_uppercase();
                if let Some(first) = upper.next() {
                    out.push(first);
                }
                for rest in upper {
                    out.extend(rest.to_lowercase());
                }
            }
            prev_is_letter = true;
        } else {
            out.push(ch);
            prev_is_letter = !breaks_word(ch);
        }
    }
    out
}

fn breaks_word(ch: char) -> bool {
    ch.is_whitespace()
        || ch.is_numeric()
        || ch.is_control()
        || ch.is_ascii_punctuation()
        // Latin-1 punctuation, general punctuation (dashes, curly quotes).
        || matches!(
            ch,
            '\u{A1}'..='\u{BF}' | '\u{2010}'..='\u{2027}' | '\u{2030}'..='\u{205E}'
        )
}

/// Map a formatted name to a file stem that stays inside the output directory.
pub fn file_stem(formatted: &str) -> String {
    let stem: String = formatted
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let stem = stem.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if stem.is_empty() {
        "_".to_string()
    } else {
        stem.to_string()
    }
}
