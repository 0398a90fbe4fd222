//! Review text normalization.
//!
//! Every backend sees review text only after it has passed through
//! [`normalize`]. The same transform must have been applied to the training
//! corpus, otherwise the encoder sees a different token distribution at
//! serving time than it was fitted on and accuracy drops without any error.
//!
//! # Pipeline
//!
//! 1. Missing input becomes the empty string.
//! 2. Lowercase.
//! 3. Delete URL-like runs (`http…` / `www…` up to the next whitespace or
//!    U+001C..U+001F separator).
//! 4. Replace anything that is not `a-z` or whitespace with a space.
//! 5. Collapse whitespace and trim.
//! 6. Split into tokens.
//! 7. Drop stopwords and tokens of two characters or fewer.
//! 8. Join with single spaces.
//!
//! The output contains only lowercase ASCII letters and single spaces, so
//! running it through the pipeline again is a no-op.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Tokens of this length or shorter are dropped.
pub const MIN_TOKEN_LEN_EXCLUSIVE: usize = 2;

/// English stopword list (the NLTK `english` corpus).
///
/// Entries containing apostrophes can never match a normalized token; they
/// are kept so the list stays byte-for-byte the one used at training time.
const ENGLISH_STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan", "shan't",
    "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't", "wouldn",
    "wouldn't",
];

static STOPWORDS: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| ENGLISH_STOPWORDS.iter().copied().collect());

// A URL run also ends at U+001C..U+001F, which the training-side regex
// engine treats as whitespace and `\s` here does not.
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"http[^\s\x1c-\x1f]+|www[^\s\x1c-\x1f]+").expect("URL pattern is valid")
});

/// Returns `true` if `word` is in the English stopword set.
pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(word)
}

/// Normalize a possibly-missing review text.
///
/// Returns the empty string for `None` and for any input with no surviving
/// tokens. Never fails.
pub fn normalize(text: Option<&str>) -> String {
    let Some(text) = text else {
        return String::new();
    };

    let lowered = text.to_lowercase();
    let without_urls = URL_PATTERN.replace_all(&lowered, "");

    let letters_only: String = without_urls
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    letters_only
        .split_whitespace()
        .filter(|token| token.len() > MIN_TOKEN_LEN_EXCLUSIVE && !is_stopword(token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// [`normalize`] for text that is known to be present.
pub fn normalize_str(text: &str) -> String {
    normalize(Some(text))
}
