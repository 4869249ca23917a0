//! Text processing for the word cloud: normalization and stopword filtering.

mod normalize;
mod stopwords;

pub use normalize::{decode_html_entities, is_retweet, normalize, RETWEET_MARKER};
pub use stopwords::{filter_batch, LanguageTally, StopwordDictionary, MIN_TOKEN_LENGTH};
