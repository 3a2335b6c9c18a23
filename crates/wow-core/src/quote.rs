//! Thread-safe round-robin selection over a fixed quote corpus.

use std::sync::atomic::{AtomicI64, Ordering};

/// The quotations a verified client may receive, selected round-robin.
pub const DEFAULT_QUOTES: &[&str] = &[
    "The only true wisdom is in knowing you know nothing.",
    "He who has a why to live can bear almost any how.",
    "The unexamined life is not worth living.",
    "Knowing yourself is the beginning of all wisdom.",
    "It is during our darkest moments that we must focus to see the light.",
];

/// Round-robin quote selector over a fixed, non-empty slice. Safe for
/// concurrent readers; the specific quote any one caller observes is not
/// guaranteed to be contiguous with another's.
pub struct QuoteSource {
    quotes: Vec<&'static str>,
    counter: AtomicI64,
}

impl QuoteSource {
    /// # Panics
    ///
    /// Panics if `quotes` is empty.
    #[must_use]
    pub fn new(quotes: &[&'static str]) -> Self {
        assert!(!quotes.is_empty(), "quote corpus must not be empty");
        Self { quotes: quotes.to_vec(), counter: AtomicI64::new(-1) }
    }

    /// Advances the counter and returns the next quote.
    #[must_use]
    pub fn next(&self) -> &'static str {
        let v = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let index = (v.unsigned_abs() as usize) % self.quotes.len();
        self.quotes[index]
    }
}

impl Default for QuoteSource {
    fn default() -> Self {
        Self::new(DEFAULT_QUOTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycles_through_every_quote_in_order() {
        let source = QuoteSource::new(&["a", "b", "c"]);
        assert_eq!(source.next(), "a");
        assert_eq!(source.next(), "b");
        assert_eq!(source.next(), "c");
        assert_eq!(source.next(), "a");
    }

    #[test]
    fn single_quote_corpus_always_returns_it() {
        let source = QuoteSource::new(&["only"]);
        for _ in 0..5 {
            assert_eq!(source.next(), "only");
        }
    }

    #[test]
    #[should_panic(expected = "must not be empty")]
    fn empty_corpus_panics() {
        let _ = QuoteSource::new(&[]);
    }
}
