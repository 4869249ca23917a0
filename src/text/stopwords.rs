//! Language-aware stopword filtering over a batch of posts.

use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use super::normalize::{is_retweet, normalize};
use crate::twitter::Post;

/// Words shorter than this (in characters) never reach the word cloud.
pub const MIN_TOKEN_LENGTH: usize = 2;

const BUILTIN: [(&str, &str); 5] = [
    ("de", include_str!("../../assets/stopwords-de.txt")),
    ("en", include_str!("../../assets/stopwords-en.txt")),
    ("es", include_str!("../../assets/stopwords-es.txt")),
    ("fr", include_str!("../../assets/stopwords-fr.txt")),
    ("it", include_str!("../../assets/stopwords-it.txt")),
];

/// Stopword sets keyed by language code.
///
/// Loaded once at startup and shared read-only for the lifetime of the process.
#[derive(Debug, Default, Clone)]
pub struct StopwordDictionary {
    by_lang: HashMap<String, HashSet<String>>,
}

impl StopwordDictionary {
    /// The lists compiled into the binary (`de`, `en`, `es`, `fr`, `it`).
    pub fn builtin() -> Self {
        let mut dict = Self::default();
        for (lang, list) in BUILTIN {
            dict.insert(lang, parse_list(list));
        }
        dict
    }

    /// Loads every `stopwords-<lang>.txt` file found in `dir`, one word per line.
    pub fn load_dir(dir: &Path) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        info!("Loading stopword lists from {}", dir.display());

        let mut dict = Self::default();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let lang = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_prefix("stopwords-"))
                .and_then(|n| n.strip_suffix(".txt"));

            if let Some(lang) = lang {
                let words = parse_list(&std::fs::read_to_string(&path)?);
                debug!("Loaded {} stopwords for '{}'", words.len(), lang);
                dict.insert(lang, words);
            }
        }

        if dict.by_lang.is_empty() {
            warn!(
                "No stopwords-<lang>.txt files in {}, posts will not be filtered",
                dir.display()
            );
        }
        Ok(dict)
    }

    pub fn insert(&mut self, lang: &str, words: HashSet<String>) {
        self.by_lang.insert(lang.to_string(), words);
    }

    pub fn get(&self, lang: &str) -> Option<&HashSet<String>> {
        self.by_lang.get(lang)
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.by_lang.keys().map(String::as_str)
    }
}

fn parse_list(list: &str) -> HashSet<String> {
    list.lines()
        .map(str::trim)
        .filter(|w| !w.is_empty() && !w.starts_with('#'))
        .map(str::to_lowercase)
        .collect()
}

/// Per-batch count of declared languages, in first-seen order.
#[derive(Debug, Default)]
pub struct LanguageTally {
    counts: Vec<(String, usize)>,
}

impl LanguageTally {
    pub fn record(&mut self, lang: &str) {
        match self.counts.iter_mut().find(|(l, _)| l == lang) {
            Some((_, count)) => *count += 1,
            None => self.counts.push((lang.to_string(), 1)),
        }
    }

    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    /// The most-tallied language. On a tie the language seen first wins.
    pub fn leader(&self) -> Option<&str> {
        let mut leader: Option<&(String, usize)> = None;
        for entry in &self.counts {
            if leader.map_or(true, |(_, max)| entry.1 > *max) {
                leader = Some(entry);
            }
        }
        leader.map(|(lang, _)| lang.as_str())
    }
}

/// Turns a batch of posts into the token stream for the renderer.
///
/// Reposts are skipped entirely. Each remaining post is normalized and its
/// words are filtered with the stopword set chosen for that post:
///
/// - declared language with a dictionary: that dictionary (and the language is tallied)
/// - declared language without a dictionary: no filtering
/// - no declared language, two or more languages tallied so far: the leading language
/// - otherwise: no filtering
///
/// Words shorter than [`MIN_TOKEN_LENGTH`] are always dropped.
pub fn filter_batch(posts: &[Post], dictionary: &StopwordDictionary) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut tally = LanguageTally::default();

    for post in posts {
        if is_retweet(&post.text) {
            continue;
        }

        let stopwords = match post.lang.as_deref() {
            Some(lang) => {
                let dict = dictionary.get(lang);
                if dict.is_some() {
                    tally.record(lang);
                }
                dict
            }
            None if tally.distinct() > 1 => tally.leader().and_then(|lang| dictionary.get(lang)),
            None => None,
        };

        let cleaned = normalize(&post.text);
        tokens.extend(
            cleaned
                .split_whitespace()
                .filter(|word| word.chars().count() >= MIN_TOKEN_LENGTH)
                .filter(|word| stopwords.map_or(true, |set| !set.contains(*word)))
                .map(str::to_string),
        );
    }

    debug!(
        "Filtered {} posts into {} tokens",
        posts.len(),
        tokens.len()
    );
    tokens
}
