use crate::crawler::ParsedPage;
use crate::storage::{PageRecord, Storage, StorageResult};

/// Upper-cases the first letter of a word
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Resolves the display title of a page
///
/// The parsed `<title>` (or `span[title]`) wins; otherwise the page's most
/// frequent lemma is shown capitalized, ties going to the alphabetically
/// first lemma. A page without lemmas falls back to its URL.
pub fn page_title<S: Storage>(
    storage: &S,
    page: &PageRecord,
    parsed: &ParsedPage,
) -> StorageResult<String> {
    if let Some(title) = &parsed.title {
        return Ok(title.clone());
    }

    let mut best: Option<(u32, String)> = None;
    for posting in storage.postings_for_page(page.id)? {
        let lemma = storage.get_lemma(posting.lemma_id)?.lemma;
        let better = match &best {
            None => true,
            Some((rank, current)) => {
                posting.rank > *rank || (posting.rank == *rank && lemma < *current)
            }
        };
        if better {
            best = Some((posting.rank, lemma));
        }
    }

    Ok(match best {
        Some((_, lemma)) => capitalize(&lemma),
        None => page.path.clone(),
    })
}
