//! Post text normalization.
//!
//! Turns raw post text into a lowercase, symbol-free, single-spaced string
//! whose whitespace-separated words are the candidate tokens for the word
//! cloud. The rules run in a fixed order and each one operates on the
//! output of the previous one.

use regex::Regex;
use std::sync::LazyLock;

/// Marker at the start of a repost. Reposts contribute no tokens.
pub const RETWEET_MARKER: &str = "RT @";

static EMAILS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+@\w+\.\w+").unwrap());
static MENTIONS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)(rt )?@\w+").unwrap());
static LINKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z][a-z0-9+.\-]*://\S*").unwrap());
static SYMBOLS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s]").unwrap());
static MULTISPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Returns `true` if the post is a repost and must be excluded from the batch.
pub fn is_retweet(text: &str) -> bool {
    text.starts_with(RETWEET_MARKER)
}

/// Cleans the text of a single post.
///
/// Steps, in order:
/// 1. decode HTML entities, then lowercase
/// 2. drop email addresses (`user@domain.tld`)
/// 3. drop mentions, with or without a leading `rt `
/// 4. drop URLs (`scheme://` up to the next whitespace)
/// 5. replace anything that is neither a word character nor whitespace
/// 6. collapse whitespace and trim
///
/// The function is idempotent: `normalize(&normalize(x)) == normalize(x)`.
///
/// # Example
///
/// ```rust
/// use tweetcloud::text::normalize;
///
/// let cleaned = normalize("RT @rustlang: Fearless concurrency &amp; more https://t.co/x1 !!");
/// assert_eq!(cleaned, "fearless concurrency more");
/// ```
pub fn normalize(raw: &str) -> String {
    let text = decode_html_entities(raw).to_lowercase();
    let text = EMAILS.replace_all(&text, " ");
    let text = MENTIONS.replace_all(&text, " ");
    let text = LINKS.replace_all(&text, " ");
    let text = SYMBOLS.replace_all(&text, " ");
    let text = MULTISPACES.replace_all(&text, " ");
    text.trim().to_string()
}

/// Decodes the HTML entities the Twitter API emits in post text.
///
/// Covers the full HTML5 named entity table plus decimal (`&#39;`) and hex
/// (`&#x27;`) character references. Anything unrecognised is kept verbatim.
pub fn decode_html_entities(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}
