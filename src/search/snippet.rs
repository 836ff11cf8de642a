//! Snippet extraction
//!
//! A snippet is one window of the page's visible text around the densest
//! run of query hits, with every hit wrapped in `<b>` tags.

use crate::config::SearchConfig;
use crate::lemma::{word_spans, Lemmatizer, WordSpan};
use std::collections::HashSet;

const ELLIPSIS: &str = "...";

/// Finds the longest run of hits whose neighbouring starts are closer than
/// `density` chars
///
/// Returns the index range of the run within `hits`; the first run wins a
/// tie. `hits` must be ordered by start offset and non-empty.
fn longest_run(hits: &[&WordSpan], density: usize) -> (usize, usize) {
    let mut best = (0, 0);
    let mut run_start = 0;

    for i in 1..hits.len() {
        if hits[i].start - hits[i - 1].start >= density {
            run_start = i;
        }
        if i - run_start > best.1 - best.0 {
            best = (run_start, i);
        }
    }

    best
}

/// Builds the snippet of a page for a set of query lemmas
///
/// # Arguments
///
/// * `text` - Visible text of the page
/// * `query_lemmas` - Lemmas of the query
/// * `lemmatizer` - Lemmatizer used to recognise hits
/// * `config` - Window sizes
///
/// # Returns
///
/// The window around the best run, with `...` marking truncated ends.
/// Without hits the start of the text is returned.
pub fn build_snippet(
    text: &str,
    query_lemmas: &HashSet<String>,
    lemmatizer: &Lemmatizer,
    config: &SearchConfig,
) -> String {
    let chars: Vec<char> = text.chars().collect();
    let spans = word_spans(text);
    let hits: Vec<&WordSpan> = spans
        .iter()
        .filter(|span| {
            lemmatizer
                .lemma_of(&span.word)
                .map_or(false, |lemma| query_lemmas.contains(&lemma))
        })
        .collect();

    let (start, end) = if hits.is_empty() {
        (0, chars.len().min(config.single_hit_context * 2))
    } else {
        let (first, last) = longest_run(&hits, config.snippet_density);
        let context = if first == last {
            config.single_hit_context
        } else {
            config.run_context
        };
        (
            hits[first].start.saturating_sub(context),
            (hits[last].end + context).min(chars.len()),
        )
    };

    let mut snippet = String::new();
    if start > 0 {
        snippet.push_str(ELLIPSIS);
    }

    let mut pos = start;
    for hit in hits.iter().filter(|hit| hit.start >= start && hit.end <= end) {
        snippet.extend(&chars[pos..hit.start]);
        snippet.push_str("<b>");
        snippet.extend(&chars[hit.start..hit.end]);
        snippet.push_str("</b>");
        pos = hit.end;
    }
    snippet.extend(&chars[pos..end]);

    if end < chars.len() {
        snippet.push_str(ELLIPSIS);
    }

    snippet
}
