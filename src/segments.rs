use unicode_segmentation::UnicodeSegmentation;

/// Period-delimited sentences, trimmed, keeping only those longer than `min_len` chars.
pub fn split_sentences(text: &str, min_len: usize) -> Vec<String> {
    text.split('.')
        .map(str::trim)
        .filter(|s| s.chars().count() > min_len)
        .map(str::to_string)
        .collect()
}

/// First `max` user-perceived characters of `text`. Never splits a grapheme cluster.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.grapheme_indices(true).nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Like `truncate_chars`, but appends `...` when something was cut.
pub fn truncate_with_ellipsis(text: &str, max: usize) -> String {
    let cut = truncate_chars(text, max);
    if cut.len() < text.len() { format!("{cut}...") } else { cut.to_string() }
}

/// Collapse whitespace and keep at most `max_words` words, marking the cut with `...`.
pub fn limit_words(text: &str, max_words: usize) -> (String, usize) {
    let words: Vec<&str> = text.split_whitespace().collect();
    let total = words.len();
    if total > max_words {
        (format!("{}...", words[..max_words].join(" ")), total)
    } else {
        (words.join(" "), total)
    }
}
