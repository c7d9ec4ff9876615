//! FAQ integrity (`spec.md` §4.5, stage 6): applied after vocabulary
//! substitution, drops entries whose question collapses onto a cast name,
//! is too short, or carries no interrogative marker.

use crate::chunks::FAQItem;

/// Every known cast-name token: each cast's full name plus its individual
/// whitespace-separated tokens (mirrors the token set built for the
/// mixed-language name repair in [`crate::sanitize`]).
pub fn cast_name_tokens(full_names: &[String]) -> std::collections::HashSet<String> {
    let mut tokens = std::collections::HashSet::new();
    for name in full_names {
        tokens.insert(name.to_lowercase());
        for tok in name.split_whitespace() {
            tokens.insert(tok.to_lowercase());
        }
    }
    tokens
}

pub fn enforce_faq_integrity(
    faqs: Vec<FAQItem>,
    cast_full_names: &[String],
    interrogative_markers: &[String],
) -> Vec<FAQItem> {
    let tokens = cast_name_tokens(cast_full_names);
    faqs.into_iter()
        .filter(|faq| {
            let normalized = faq.question.trim().trim_end_matches('?').trim().to_lowercase();
            if tokens.contains(&normalized) {
                return false;
            }
            if faq.question.chars().count() < 15 {
                return false;
            }
            let lower = faq.question.to_lowercase();
            interrogative_markers.iter().any(|m| lower.contains(m.as_str()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn faq(q: &str) -> FAQItem {
        FAQItem { question: q.to_string(), answer: "answer".to_string() }
    }

    fn markers() -> Vec<String> {
        vec!["?".into(), "what".into(), "why".into(), "how".into()]
    }

    #[test]
    fn drops_question_equal_to_cast_name() {
        let faqs = vec![faq("Alex Doe?"), faq("What is the main theme of this film?")];
        let result = enforce_faq_integrity(faqs, &["Alex Doe".to_string()], &markers());
        assert_eq!(result.len(), 1);
        assert!(result[0].question.contains("main theme"));
    }

    #[test]
    fn drops_too_short_question() {
        let faqs = vec![faq("Why?")];
        let result = enforce_faq_integrity(faqs, &[], &markers());
        assert!(result.is_empty());
    }

    #[test]
    fn drops_question_without_interrogative_marker() {
        let faqs = vec![faq("This is a long enough statement.")];
        let result = enforce_faq_integrity(faqs, &[], &markers());
        assert!(result.is_empty());
    }

    #[test]
    fn keeps_well_formed_question() {
        let faqs = vec![faq("How does the story end for everyone involved?")];
        let result = enforce_faq_integrity(faqs, &[], &markers());
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn is_idempotent() {
        let faqs = vec![faq("Alex Doe?"), faq("How does the story end for everyone involved?")];
        let once = enforce_faq_integrity(faqs, &["Alex Doe".to_string()], &markers());
        let twice = enforce_faq_integrity(once.clone(), &["Alex Doe".to_string()], &markers());
        assert_eq!(once, twice);
    }
}
