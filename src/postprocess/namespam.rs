//! Name-spam collapse (`spec.md` §4.5): two passes over a long field —
//! consecutive duplicate words, then consecutive duplicate 2-word and
//! 3-word phrases, each reduced to a single occurrence.

/// Splits on whitespace while preserving the exact separator text between
/// tokens, so joining survivors reconstructs the original spacing/newlines.
fn split_preserving_whitespace(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_space = false;
    for c in text.chars() {
        let is_space = c.is_whitespace();
        if current.is_empty() || is_space == in_space {
            current.push(c);
        } else {
            tokens.push(std::mem::take(&mut current));
            current.push(c);
        }
        in_space = is_space;
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn is_word_token(t: &str) -> bool {
    !t.chars().next().map(char::is_whitespace).unwrap_or(true)
}

fn normalize(t: &str) -> String {
    t.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase()
}

/// Collapses consecutive duplicate words (> 2 chars, case-insensitive) to one.
pub fn collapse_duplicate_words(text: &str) -> String {
    let tokens = split_preserving_whitespace(text);
    let mut out = Vec::with_capacity(tokens.len());
    let mut last_word: Option<String> = None;
    for tok in tokens {
        if is_word_token(&tok) {
            let norm = normalize(&tok);
            if norm.chars().count() > 2 && last_word.as_deref() == Some(norm.as_str()) {
                continue;
            }
            last_word = Some(norm);
        }
        out.push(tok);
    }
    out.concat()
}

/// Collapses consecutive duplicate n-word phrases (case-insensitive) to one,
/// for `n` = 2 then `n` = 3, applied after [`collapse_duplicate_words`].
pub fn collapse_duplicate_phrases(text: &str) -> String {
    let once = collapse_phrase_len(text, 2);
    collapse_phrase_len(&once, 3)
}

fn collapse_phrase_len(text: &str, n: usize) -> String {
    let tokens = split_preserving_whitespace(text);
    let word_positions: Vec<usize> = tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| is_word_token(t))
        .map(|(i, _)| i)
        .collect();

    if word_positions.len() < n * 2 {
        return text.to_string();
    }

    let mut drop = vec![false; tokens.len()];
    let mut wi = 0;
    while wi + 2 * n <= word_positions.len() {
        let phrase_a: Vec<String> =
            word_positions[wi..wi + n].iter().map(|&p| normalize(&tokens[p])).collect();
        let phrase_b: Vec<String> =
            word_positions[wi + n..wi + 2 * n].iter().map(|&p| normalize(&tokens[p])).collect();
        if phrase_a == phrase_b {
            // Drop the whole second-occurrence span (its word tokens and any
            // whitespace between them) plus the one separator joining it to
            // the first occurrence, so no double space remains.
            let span_start = word_positions[wi + n];
            let span_end = word_positions[wi + 2 * n - 1];
            for p in span_start..=span_end {
                drop[p] = true;
            }
            if span_start > 0 {
                drop[span_start - 1] = true;
            }
            wi += n;
        } else {
            wi += 1;
        }
    }

    tokens
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !drop[*i])
        .map(|(_, t)| t)
        .collect::<Vec<_>>()
        .concat()
}

/// Applies both passes in the declared order.
pub fn collapse_name_spam(text: &str) -> String {
    collapse_duplicate_phrases(&collapse_duplicate_words(text))
}
