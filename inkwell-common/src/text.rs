use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\r\n]+|\s+").unwrap());

static DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[^\w\s:;'",()&#.?!\-]"#).unwrap());

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

const PREVIEW_LENGTH: usize = 300;
const WORDS_PER_MINUTE: f64 = 250.0;

/// Normalizes a search term (usually a title and author) before it is
/// stored or searched for.
///
/// Line breaks and whitespace runs collapse to a single space, anything
/// that is not a word character, whitespace, or punctuation commonly found
/// in book titles is dropped, and the result is trimmed.
pub fn clean_search_term<'s>(term: impl Into<Option<&'s str>>) -> String {
    let term = match term.into() {
        Some(term) if !term.is_empty() => term,
        _ => return String::new(),
    };

    let collapsed = WHITESPACE_RUN.replace_all(term, " ");
    let stripped = DISALLOWED.replace_all(&collapsed, "");

    stripped.trim().to_string()
}

/// ASCII title casing: the first letter of every whitespace separated word
/// is upper cased and the rest of the word lower cased.
///
/// Non ASCII characters pass through untouched, there is no locale lookup.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut word_start = true;

    for c in text.chars() {
        if c.is_whitespace() {
            word_start = true;
            out.push(c);
        } else if word_start {
            word_start = false;
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c.to_ascii_lowercase());
        }
    }

    out
}

pub fn strip_html(text: &str) -> String {
    HTML_TAG.replace_all(text, "").into_owned()
}

/// First 300 characters of the review with markup removed, `...` appended
/// when it was cut.
pub fn preview_text(review: &str) -> String {
    let clean = strip_html(review);

    if clean.chars().count() > PREVIEW_LENGTH {
        let mut preview = clean.chars().take(PREVIEW_LENGTH).collect::<String>();
        preview.push_str("...");
        preview
    } else {
        clean
    }
}

pub fn reading_time_minutes(review: &str) -> u32 {
    let words = review.split_whitespace().count();

    (words as f64 / WORDS_PER_MINUTE).round() as u32
}
