//! Post-Processors (`spec.md` §4.5): pure, idempotent functions applied to a
//! stage's output after validation passes, in the fixed order declared by
//! each [`crate::registry::ChunkSpec`].

pub mod faq;
pub mod namespam;
pub mod paragraphs;
pub mod pronoun;
pub mod quotes;
pub mod timestamps;
pub mod vocabulary;

/// Leading-name removal (stage 2 highlights, stage 7 best moments). If an
/// entry begins with a cast name followed by space, comma, or a
/// locale-specific separator character, the leading name (and separator) is
/// removed.
pub fn remove_leading_name(entry: &str, cast_full_names: &[String]) -> String {
    const SEPARATORS: &[char] = &[' ', ',', '、', '，'];
    for name in cast_full_names {
        if let Some(rest) = entry.strip_prefix(name.as_str()) {
            if let Some(first) = rest.chars().next() {
                if SEPARATORS.contains(&first) {
                    return rest[first.len_utf8()..].trim_start().to_string();
                }
            } else {
                return String::new();
            }
        }
    }
    entry.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_leading_name_with_separator() {
        let names = vec!["Alex Doe".to_string()];
        assert_eq!(remove_leading_name("Alex Doe, smiles warmly", &names), "smiles warmly");
        assert_eq!(remove_leading_name("Alex Doe walks away", &names), "walks away");
    }

    #[test]
    fn leaves_unrelated_text_unchanged() {
        let names = vec!["Alex Doe".to_string()];
        assert_eq!(remove_leading_name("A quiet morning scene", &names), "A quiet morning scene");
    }

    #[test]
    fn is_idempotent() {
        let names = vec!["Alex Doe".to_string()];
        let once = remove_leading_name("Alex Doe, smiles warmly", &names);
        let twice = remove_leading_name(&once, &names);
        assert_eq!(once, twice);
    }
}
