use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

const SENTENCE_DELIMITER: &str = ". ";

/// Split on `". "`, drop blank and repeated sentences (first occurrence
/// wins) and join the rest back together. Trailing periods are not part of
/// a sentence, so `"A. B. A."` cleans to `"A. B"`.
pub fn clean_text(text: &str) -> String {
    let mut seen = HashSet::new();
    let sentences: Vec<&str> = text
        .trim()
        .split(SENTENCE_DELIMITER)
        .map(|sentence| {
            sentence
                .trim_start()
                .trim_end_matches(|c: char| c == '.' || c.is_whitespace())
        })
        .filter(|sentence| !sentence.is_empty())
        .filter(|sentence| seen.insert(*sentence))
        .collect();

    sentences.join(SENTENCE_DELIMITER)
}

/// Borrow at most `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Lower-case, collapse everything that is not `a-z0-9` into single
/// hyphens and trim hyphens from both ends.
pub fn slugify(text: &str) -> String {
    let lower = text.to_lowercase();
    match slug_separator() {
        Some(re) => re.replace_all(&lower, "-").trim_matches('-').to_string(),
        None => lower,
    }
}

/// Convert an HTML fragment to plain text on a single line. Plain input is
/// only whitespace-normalised.
pub fn strip_html(text: &str) -> String {
    if !text.contains('<') && !text.contains('&') {
        return collapse_whitespace(text);
    }

    let rendered = match html2text::from_read(text.as_bytes(), 10_000) {
        Ok(t) => t,
        Err(e) => {
            tracing::debug!("Failed to convert HTML to text: {}", e);
            return collapse_whitespace(text);
        }
    };

    // Drop link footnotes ("[1]: https://...") and inline "[text][1]" markers
    let body: Vec<&str> = rendered
        .lines()
        .filter(|line| !footnote_line().is_some_and(|re| re.is_match(line)))
        .collect();
    let body = body.join(" ");
    let body = match link_marker() {
        Some(re) => re.replace_all(&body, "$1").to_string(),
        None => body,
    };

    collapse_whitespace(&body)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn slug_separator() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").ok()).as_ref()
}

fn footnote_line() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\[\d+\]:\s").ok()).as_ref()
}

fn link_marker() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\]]*)\]\[\d+\]").ok()).as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_repeated_sentences_in_first_seen_order() {
        assert_eq!(clean_text("A. B. A."), "A. B");
        assert_eq!(
            clean_text("Rain today. Sun tomorrow. Rain today. Wind later."),
            "Rain today. Sun tomorrow. Wind later"
        );
    }

    #[test]
    fn drops_blank_sentences() {
        assert_eq!(clean_text("  One. . Two.  "), "One. Two");
        assert_eq!(clean_text(""), "");
        assert_eq!(clean_text(" . "), "");
    }

    #[test]
    fn whitespace_between_trailing_periods_is_stripped() {
        assert_eq!(clean_text("A.\t."), "A");
        assert_eq!(clean_text("Done.\n. Done"), "Done");
    }

    #[test]
    fn near_duplicates_survive() {
        assert_eq!(clean_text("The cat sat. The cat sat down."), "The cat sat. The cat sat down");
    }

    #[test]
    fn cleaning_is_idempotent() {
        let samples = [
            "A. B. A.",
            "Markets rallied.  Markets rallied. Stocks rose...",
            "no delimiter at all",
            "Trailing space. ",
            ". Leading delimiter. x",
            "A.\t.",
            "Done.\n.",
            "Mixed . \t. tail. .",
        ];
        for sample in samples {
            let once = clean_text(sample);
            assert_eq!(clean_text(&once), once, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 50), "short");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn slugs_are_hyphenated_lowercase() {
        assert_eq!(slugify("Food and Drink"), "food-and-drink");
        assert_eq!(slugify("  Stock / Crypto & Finance! "), "stock-crypto-finance");
    }

    #[test]
    fn html_is_flattened_to_text() {
        let html = "<p>Quick <b>pasta</b> dinner.</p><p>Serves 4 &amp; takes 20 minutes.</p>";
        let text = strip_html(html);
        assert!(text.contains("pasta"));
        assert!(text.contains("Serves 4 & takes 20 minutes."));
        assert!(!text.contains('<'));
        assert!(!text.contains('\n'));
    }

    #[test]
    fn plain_text_only_has_whitespace_collapsed() {
        assert_eq!(strip_html("  many\n  spaces\there "), "many spaces here");
    }
}
