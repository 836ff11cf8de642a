use super::morphology::{
    load_function_words, Language, Morphology, MorphologyError, SnowballMorphology, WordClass,
};
use crate::config::LemmatizerConfig;
use std::collections::HashMap;

/// Shortest token that is analysed
pub const MIN_WORD_LEN: usize = 3;

/// Longest token that is analysed
pub const MAX_WORD_LEN: usize = 45;

const RUSSIAN_BLACKLIST: &[WordClass] = &[
    WordClass::Preposition,
    WordClass::Conjunction,
    WordClass::Interjection,
    WordClass::Particle,
    WordClass::Pronoun,
];

const ENGLISH_BLACKLIST: &[WordClass] = &[WordClass::Conjunction, WordClass::Particle];

/// A word of a text with its position in chars
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordSpan {
    /// Lower-cased word
    pub word: String,
    /// Char offset of the first letter
    pub start: usize,
    /// Char offset one past the last letter
    pub end: usize,
}

/// Returns true for the letters words are made of
fn is_word_char(c: char) -> bool {
    c.is_ascii_lowercase() || ('а'..='я').contains(&c)
}

/// Splits text into lower-cased words with their char offsets
///
/// Every char outside `a-z` and `а-я` separates words. Offsets index the
/// chars of `text`; lower-casing Latin and Cyrillic letters keeps one char
/// per char.
pub fn word_spans(text: &str) -> Vec<WordSpan> {
    let mut spans = Vec::new();
    let mut current = String::new();
    let mut start = 0;

    for (idx, ch) in text.chars().enumerate() {
        let mut lower = ch.to_lowercase();
        let single = match (lower.next(), lower.next()) {
            (Some(l), None) if is_word_char(l) => Some(l),
            _ => None,
        };

        match single {
            Some(l) => {
                if current.is_empty() {
                    start = idx;
                }
                current.push(l);
            }
            None => {
                if !current.is_empty() {
                    spans.push(WordSpan {
                        word: std::mem::take(&mut current),
                        start,
                        end: idx,
                    });
                }
            }
        }
    }

    if !current.is_empty() {
        let end = start + current.chars().count();
        spans.push(WordSpan {
            word: current,
            start,
            end,
        });
    }

    spans
}

/// Turns text into lemma occurrence counts
///
/// Holds one read-only morphology per language and is shared between crawl
/// workers behind an `Arc`.
pub struct Lemmatizer {
    russian: Box<dyn Morphology>,
    english: Box<dyn Morphology>,
}

impl Default for Lemmatizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Lemmatizer {
    /// Creates a lemmatizer with the built-in Snowball morphologies
    pub fn new() -> Self {
        Self::with_morphologies(
            Box::new(SnowballMorphology::russian()),
            Box::new(SnowballMorphology::english()),
        )
    }

    /// Creates a lemmatizer from explicit morphologies
    pub fn with_morphologies(russian: Box<dyn Morphology>, english: Box<dyn Morphology>) -> Self {
        Self { russian, english }
    }

    /// Creates a lemmatizer, loading extra function words if configured
    ///
    /// # Arguments
    ///
    /// * `config` - Lemmatizer configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Lemmatizer)` - Ready lemmatizer
    /// * `Err(MorphologyError)` - The function-word file is missing or malformed
    pub fn from_config(config: &LemmatizerConfig) -> Result<Self, MorphologyError> {
        let mut russian = SnowballMorphology::russian();
        let mut english = SnowballMorphology::english();

        if let Some(path) = &config.function_words {
            let entries = load_function_words(path)?;
            tracing::info!(
                "Loaded {} extra function words from {}",
                entries.len(),
                path.display()
            );

            for (word, class) in entries {
                match Language::of(&word) {
                    Some(Language::Russian) => russian.add_function_word(&word, class),
                    Some(Language::English) => english.add_function_word(&word, class),
                    None => {}
                }
            }
        }

        Ok(Self::with_morphologies(
            Box::new(russian),
            Box::new(english),
        ))
    }

    /// Counts the lemmas of a text
    pub fn collect_lemmas(&self, text: &str) -> HashMap<String, u32> {
        let mut counts = HashMap::new();

        for span in word_spans(text) {
            if let Some(lemma) = self.analyse(&span.word) {
                *counts.entry(lemma).or_insert(0) += 1;
            }
        }

        counts
    }

    /// Returns the lemma of a single word, if it has one
    pub fn lemma_of(&self, word: &str) -> Option<String> {
        let lower = word.to_lowercase();
        if !lower.chars().all(is_word_char) {
            return None;
        }
        self.analyse(&lower)
    }

    fn analyse(&self, word: &str) -> Option<String> {
        let len = word.chars().count();
        if !(MIN_WORD_LEN..=MAX_WORD_LEN).contains(&len) {
            return None;
        }

        let (morphology, blacklist) = match Language::of(word)? {
            Language::Russian => (self.russian.as_ref(), RUSSIAN_BLACKLIST),
            Language::English => (self.english.as_ref(), ENGLISH_BLACKLIST),
        };

        if morphology
            .word_classes(word)
            .iter()
            .any(|class| blacklist.contains(class))
        {
            return None;
        }

        morphology.normal_forms(word).into_iter().next()
    }
}
