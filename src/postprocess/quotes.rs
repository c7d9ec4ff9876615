//! Top-quote gating (`spec.md` §4.5, stage 3): drop any quote with a
//! timestamp past the safety cutoff.

use crate::chunks::TopQuote;

pub fn gate_top_quotes(quotes: Vec<TopQuote>, cutoff_secs: f64) -> Vec<TopQuote> {
    quotes.into_iter().filter(|q| q.timestamp <= cutoff_secs).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(ts: f64) -> TopQuote {
        TopQuote { text: "line".into(), timestamp: ts, emotion: "joy".into(), context: "ctx".into() }
    }

    #[test]
    fn drops_quotes_past_cutoff() {
        let quotes = vec![quote(120.0), quote(700.0)];
        let result = gate_top_quotes(quotes, 600.0);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].timestamp, 120.0);
    }

    #[test]
    fn keeps_quote_exactly_at_cutoff() {
        let result = gate_top_quotes(vec![quote(600.0)], 600.0);
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn is_idempotent() {
        let once = gate_top_quotes(vec![quote(100.0), quote(900.0)], 600.0);
        let twice = gate_top_quotes(once.clone(), 600.0);
        assert_eq!(once, twice);
    }
}
