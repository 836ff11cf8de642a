//! Lemmatization of page and query text
//!
//! This module handles:
//! - Splitting text into Latin and Cyrillic words
//! - Dropping function words per language
//! - Reducing words to their normal forms

mod lemmatizer;
mod morphology;

pub use lemmatizer::{word_spans, Lemmatizer, WordSpan, MAX_WORD_LEN, MIN_WORD_LEN};
pub use morphology::{
    load_function_words, parse_function_words, Language, Morphology, MorphologyError,
    SnowballMorphology, WordClass,
};
