//! Per-language morphology
//!
//! Normal forms come from the Snowball stemmers; grammatical classes of
//! uninflected function words come from compiled-in tables that can be
//! extended from a file at startup.

use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while building morphology dictionaries
#[derive(Debug, Error)]
pub enum MorphologyError {
    #[error("Failed to read function words from {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed function word entry at line {line}: '{content}'")]
    Malformed { line: usize, content: String },

    #[error("Unknown word class '{0}'")]
    UnknownClass(String),
}

/// Languages with a morphology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Russian,
    English,
}

impl Language {
    /// Detects the language of a lower-case token from its script
    ///
    /// Returns None for mixed or foreign scripts.
    pub fn of(token: &str) -> Option<Self> {
        if token.is_empty() {
            return None;
        }
        if token.chars().all(|c| ('а'..='я').contains(&c)) {
            Some(Self::Russian)
        } else if token.chars().all(|c| c.is_ascii_lowercase()) {
            Some(Self::English)
        } else {
            None
        }
    }
}

/// Grammatical class of a function word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WordClass {
    Preposition,
    Conjunction,
    Interjection,
    Particle,
    Pronoun,
}

impl WordClass {
    /// Parses a class tag, accepting both Russian and English tag names
    pub fn from_tag(tag: &str) -> Result<Self, MorphologyError> {
        match tag.trim().to_uppercase().as_str() {
            "ПРЕДЛ" | "PREP" => Ok(Self::Preposition),
            "СОЮЗ" | "CONJ" => Ok(Self::Conjunction),
            "МЕЖД" | "INT" => Ok(Self::Interjection),
            "ЧАСТ" | "PART" => Ok(Self::Particle),
            "МС" | "PN" | "PRON" => Ok(Self::Pronoun),
            other => Err(MorphologyError::UnknownClass(other.to_string())),
        }
    }
}

impl fmt::Display for WordClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::Preposition => "PREP",
            Self::Conjunction => "CONJ",
            Self::Interjection => "INT",
            Self::Particle => "PART",
            Self::Pronoun => "PRON",
        };
        write!(f, "{}", tag)
    }
}

/// Morphological analysis of single lower-case words
pub trait Morphology: Send + Sync {
    /// Dictionary forms of the word, most likely first
    fn normal_forms(&self, word: &str) -> Vec<String>;

    /// Grammatical classes the word may belong to
    fn word_classes(&self, word: &str) -> Vec<WordClass>;
}

const RUSSIAN_PREPOSITIONS: &[&str] = &[
    "без", "безо", "близ", "вблизи", "ввиду", "вдоль", "вместо", "вне", "внутри", "возле",
    "вокруг", "вопреки", "впереди", "вроде", "вследствие", "для", "до", "за", "из", "изо",
    "кроме", "между", "меж", "мимо", "на", "над", "надо", "наподобие", "напротив", "о", "об",
    "обо", "около", "от", "ото", "перед", "передо", "по", "под", "подо", "после", "посреди",
    "при", "про", "против", "ради", "сквозь", "среди", "согласно", "благодаря", "через", "у",
    "с", "со", "в", "во", "к", "ко",
];

const RUSSIAN_CONJUNCTIONS: &[&str] = &[
    "и", "а", "но", "или", "либо", "что", "чтобы", "чтоб", "если", "когда", "как", "будто",
    "словно", "хотя", "хоть", "пока", "тоже", "также", "зато", "однако", "причем", "притом",
    "потому", "поэтому", "ибо", "итак", "нежели", "дабы", "едва", "да", "тогда", "затем",
];

const RUSSIAN_PARTICLES: &[&str] = &[
    "не", "ни", "бы", "же", "ли", "ведь", "вот", "вон", "даже", "уже", "только", "лишь",
    "разве", "неужели", "пусть", "пускай", "именно", "почти", "вряд", "авось", "нибудь",
    "таки", "исключительно",
];

const RUSSIAN_INTERJECTIONS: &[&str] = &[
    "ах", "ох", "эх", "ой", "ай", "увы", "ура", "эй", "ага", "ого", "ух", "фу", "тьфу",
    "браво", "алло", "ну", "хм", "ахти", "батюшки", "господи",
];

const RUSSIAN_PRONOUNS: &[&str] = &[
    "я", "ты", "он", "она", "оно", "мы", "вы", "они", "меня", "тебя", "его", "ее", "него",
    "нее", "нас", "вас", "нами", "вами", "их", "них", "мне", "тебе", "ему", "ей", "нему",
    "ней", "нам", "вам",
    "им", "ним", "мной", "мною", "тобой", "тобою", "ими", "ними", "себя", "себе", "собой",
    "мой", "моя", "мое", "мои", "моего", "моей", "моему", "моих", "твой", "твоя", "твое",
    "твои", "твоего", "твоей", "свой", "своя", "свое", "свои", "своего", "своей", "своих",
    "наш", "наша", "наше", "наши", "нашего", "нашей", "наших", "ваш", "ваша", "ваше", "ваши",
    "вашего", "вашей", "ваших", "этот", "эта", "это", "эти", "этого", "этой", "этому",
    "этих", "тот", "та", "те", "того", "той", "тому", "тех", "кто", "кого", "кому", "кем",
    "чего", "чему", "какой", "какая", "какое", "какие", "который", "которая", "которое",
    "которые", "которого", "которой", "которых", "весь", "вся", "все", "всего", "всей",
    "всех", "сам", "сама", "само", "сами", "самого", "самой", "каждый", "каждая", "каждое",
    "никто", "ничто", "ничего", "некто", "нечто", "такой", "такая", "такое", "такие", "чей",
    "чья", "чьи", "сколько", "столько",
];

const ENGLISH_CONJUNCTIONS: &[&str] = &[
    "and", "but", "or", "nor", "for", "yet", "so", "because", "although", "though", "while",
    "whereas", "unless", "until", "since", "whether", "if", "than", "that", "lest", "both",
    "either", "neither", "however", "therefore", "whenever", "wherever",
];

const ENGLISH_PARTICLES: &[&str] = &["not", "to", "up", "out", "off", "away", "down"];

/// Morphology backed by a Snowball stemmer and function-word tables
pub struct SnowballMorphology {
    stemmer: Stemmer,
    function_words: HashMap<String, Vec<WordClass>>,
}

impl SnowballMorphology {
    /// Russian morphology with the built-in function words
    pub fn russian() -> Self {
        let mut morphology = Self::empty(Algorithm::Russian);
        morphology.add_all(RUSSIAN_PREPOSITIONS, WordClass::Preposition);
        morphology.add_all(RUSSIAN_CONJUNCTIONS, WordClass::Conjunction);
        morphology.add_all(RUSSIAN_PARTICLES, WordClass::Particle);
        morphology.add_all(RUSSIAN_INTERJECTIONS, WordClass::Interjection);
        morphology.add_all(RUSSIAN_PRONOUNS, WordClass::Pronoun);
        morphology
    }

    /// English morphology with the built-in function words
    pub fn english() -> Self {
        let mut morphology = Self::empty(Algorithm::English);
        morphology.add_all(ENGLISH_CONJUNCTIONS, WordClass::Conjunction);
        morphology.add_all(ENGLISH_PARTICLES, WordClass::Particle);
        morphology
    }

    fn empty(algorithm: Algorithm) -> Self {
        Self {
            stemmer: Stemmer::create(algorithm),
            function_words: HashMap::new(),
        }
    }

    fn add_all(&mut self, words: &[&str], class: WordClass) {
        for word in words {
            self.add_function_word(word, class);
        }
    }

    /// Registers an extra function word
    pub fn add_function_word(&mut self, word: &str, class: WordClass) {
        let classes = self.function_words.entry(word.to_lowercase()).or_default();
        if !classes.contains(&class) {
            classes.push(class);
        }
    }
}

impl Morphology for SnowballMorphology {
    fn normal_forms(&self, word: &str) -> Vec<String> {
        let stem = self.stemmer.stem(word);
        if stem.is_empty() {
            vec![word.to_string()]
        } else {
            vec![stem.into_owned()]
        }
    }

    fn word_classes(&self, word: &str) -> Vec<WordClass> {
        self.function_words.get(word).cloned().unwrap_or_default()
    }
}

/// Reads extra function words from a file
///
/// Each non-empty line that is not a `#` comment holds a word and a class
/// tag separated by whitespace, e.g. `однако СОЮЗ` or `whereas CONJ`.
pub fn load_function_words(path: &Path) -> Result<Vec<(String, WordClass)>, MorphologyError> {
    let content = std::fs::read_to_string(path).map_err(|source| MorphologyError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_function_words(&content)
}

/// Parses the function-word file format
pub fn parse_function_words(content: &str) -> Result<Vec<(String, WordClass)>, MorphologyError> {
    let mut entries = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut parts = line.split_whitespace();
        let (word, tag) = match (parts.next(), parts.next(), parts.next()) {
            (Some(word), Some(tag), None) => (word, tag),
            _ => {
                return Err(MorphologyError::Malformed {
                    line: idx + 1,
                    content: line.to_string(),
                })
            }
        };

        let word = word.to_lowercase();
        if Language::of(&word).is_none() {
            return Err(MorphologyError::Malformed {
                line: idx + 1,
                content: line.to_string(),
            });
        }

        entries.push((word, WordClass::from_tag(tag)?));
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_detection() {
        assert_eq!(Language::of("лошадь"), Some(Language::Russian));
        assert_eq!(Language::of("horse"), Some(Language::English));
        assert_eq!(Language::of("horseлошадь"), None);
        assert_eq!(Language::of(""), None);
    }

    #[test]
    fn test_normal_forms_share_stem() {
        let russian = SnowballMorphology::russian();
        assert_eq!(
            russian.normal_forms("лошади"),
            russian.normal_forms("лошадью")
        );

        let english = SnowballMorphology::english();
        assert_eq!(english.normal_forms("apples"), english.normal_forms("apple"));
        assert_eq!(english.normal_forms("running"), vec!["run".to_string()]);
    }

    #[test]
    fn test_function_word_classes() {
        let russian = SnowballMorphology::russian();
        assert_eq!(russian.word_classes("между"), vec![WordClass::Preposition]);
        assert_eq!(russian.word_classes("однако"), vec![WordClass::Conjunction]);
        assert!(russian.word_classes("лошадь").is_empty());

        let english = SnowballMorphology::english();
        assert_eq!(english.word_classes("because"), vec![WordClass::Conjunction]);
        assert_eq!(english.word_classes("not"), vec![WordClass::Particle]);
        assert!(english.word_classes("horse").is_empty());
    }

    #[test]
    fn test_word_class_tags() {
        assert_eq!(WordClass::from_tag("СОЮЗ").unwrap(), WordClass::Conjunction);
        assert_eq!(WordClass::from_tag("part").unwrap(), WordClass::Particle);
        assert_eq!(WordClass::from_tag("МС").unwrap(), WordClass::Pronoun);
        assert!(matches!(
            WordClass::from_tag("NOUN"),
            Err(MorphologyError::UnknownClass(_))
        ));
    }

    #[test]
    fn test_parse_function_words() {
        let content = "# extra words\nзато СОЮЗ\n\nwhereas CONJ\n";
        let entries = parse_function_words(content).unwrap();
        assert_eq!(
            entries,
            vec![
                ("зато".to_string(), WordClass::Conjunction),
                ("whereas".to_string(), WordClass::Conjunction),
            ]
        );
    }

    #[test]
    fn test_parse_function_words_malformed() {
        assert!(matches!(
            parse_function_words("justaword"),
            Err(MorphologyError::Malformed { line: 1, .. })
        ));
        assert!(matches!(
            parse_function_words("ok CONJ\nmix3d CONJ"),
            Err(MorphologyError::Malformed { line: 2, .. })
        ));
        assert!(matches!(
            parse_function_words("word NOUN"),
            Err(MorphologyError::UnknownClass(_))
        ));
    }

    #[test]
    fn test_load_function_words_missing_file() {
        let result = load_function_words(Path::new("/nonexistent/words.txt"));
        assert!(matches!(result, Err(MorphologyError::Io { .. })));
    }
}
