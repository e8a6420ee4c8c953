/// Keyword table in priority order: when text matches keywords of several
/// topics, the earlier entry wins. A keyword matches a whole word or its
/// plural; a trailing `*` marks a stem that matches any word starting with
/// it.
pub const TOPIC_KEYWORDS: &[(&str, &[&str])] = &[
    ("world-news", &["breaking", "headline", "report*", "journalist"]),
    ("music", &["song", "album", "artist", "track"]),
    ("sports-and-fitness", &["game", "match", "team", "fitness", "athlete"]),
    ("stock-crypto-finance", &["market", "stock", "crypto*", "investment", "economy"]),
    ("food-and-drink", &["recipe", "meal", "ingredient", "cooking"]),
    ("technology", &["ai", "tech", "gadget", "software", "hardware"]),
    ("plants-and-gardening", &["plant*", "soil", "water", "grow", "harvest*"]),
    ("environment", &["climate", "recycl*", "sustainability", "biodiversity"]),
    ("trivia-and-fun", &["fact", "joke", "trivia", "laugh*", "weird"]),
];

/// Slug of the first topic with a keyword matching one of the words in
/// `text` (case-insensitive).
pub fn match_topic_slug(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() {
        return None;
    }

    TOPIC_KEYWORDS
        .iter()
        .find(|(_, keywords)| {
            keywords
                .iter()
                .any(|keyword| words.iter().any(|word| keyword_matches(keyword, word)))
        })
        .map(|(slug, _)| *slug)
}

fn keyword_matches(keyword: &str, word: &str) -> bool {
    if let Some(stem) = keyword.strip_suffix('*') {
        return word.starts_with(stem);
    }
    match word.strip_prefix(keyword) {
        Some(rest) => matches!(rest, "" | "s" | "es"),
        None => false,
    }
}
