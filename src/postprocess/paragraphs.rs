//! Paragraph-marker expansion (`spec.md` §4.5): prompts instruct the LLM to
//! emit a literal `[PARA]` marker between paragraphs; this replaces each
//! marker with a paragraph break and collapses runs of ≥ 3 consecutive
//! newlines to exactly 2.

const MARKER: &str = "[PARA]";

pub fn expand_paragraph_markers(text: &str) -> String {
    let replaced = text.replace(MARKER, "\n\n");
    collapse_excess_newlines(&replaced)
}

fn collapse_excess_newlines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut run = 0usize;
    for c in text.chars() {
        if c == '\n' {
            run += 1;
            if run <= 2 {
                out.push(c);
            }
        } else {
            run = 0;
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_marker_with_paragraph_break() {
        let result = expand_paragraph_markers("first part[PARA]second part");
        assert_eq!(result, "first part\n\nsecond part");
        assert!(!result.contains("[PARA]"));
    }

    #[test]
    fn collapses_three_or_more_newlines_to_two() {
        let result = expand_paragraph_markers("a[PARA][PARA]b");
        assert_eq!(result, "a\n\nb");
        assert!(!result.contains("\n\n\n"));
    }

    #[test]
    fn leaves_single_and_double_newlines_alone() {
        assert_eq!(expand_paragraph_markers("a\nb\n\nc"), "a\nb\n\nc");
    }

    #[test]
    fn is_idempotent() {
        let once = expand_paragraph_markers("a[PARA][PARA][PARA]b");
        let twice = expand_paragraph_markers(&once);
        assert_eq!(once, twice);
    }
}
