//! Latest-price store shared by the polling phase

use super::{Instrument, Quote, Venue};
use dashmap::{mapref::entry::Entry, DashMap};
use std::collections::HashMap;
use tracing::trace;

type BoardKey = (Instrument, Venue);

/// Latest quote per (instrument, venue)
///
/// Writers only lock the shard holding their key, so concurrent fetch completions
/// for different keys never contend. Readers work on a [`PriceSnapshot`].
#[derive(Debug, Default)]
pub struct PriceBoard {
    quotes: DashMap<BoardKey, Quote>,
}

impl PriceBoard {
    /// Create an empty board
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `quote` unless the current entry for its key was observed later.
    ///
    /// Returns `true` when the quote was installed.
    pub fn update(&self, quote: Quote) -> bool {
        let key = (quote.instrument.clone(), quote.venue.clone());

        match self.quotes.entry(key) {
            Entry::Occupied(mut entry) => {
                if entry.get().observed_at > quote.observed_at {
                    trace!(
                        instrument = %quote.instrument,
                        venue = %quote.venue,
                        "Discarding out-of-order quote"
                    );
                    return false;
                }
                entry.insert(quote);
                true
            }
            Entry::Vacant(entry) => {
                entry.insert(quote);
                true
            }
        }
    }

    /// Current quote for a key
    pub fn get(&self, instrument: &Instrument, venue: &Venue) -> Option<Quote> {
        self.quotes
            .get(&(instrument.clone(), venue.clone()))
            .map(|entry| entry.value().clone())
    }

    /// Point-in-time copy of every entry
    pub fn snapshot(&self) -> PriceSnapshot {
        let quotes = self
            .quotes
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        PriceSnapshot { quotes }
    }

    /// Number of keys with a quote
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    /// Whether no quote has been installed yet
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

/// Immutable view of the board handed to the scanner
#[derive(Debug, Clone, Default)]
pub struct PriceSnapshot {
    quotes: HashMap<BoardKey, Quote>,
}

impl PriceSnapshot {
    /// Build a snapshot directly from quotes; later entries win on key collisions
    pub fn from_quotes(quotes: impl IntoIterator<Item = Quote>) -> Self {
        let quotes = quotes
            .into_iter()
            .map(|quote| ((quote.instrument.clone(), quote.venue.clone()), quote))
            .collect();

        Self { quotes }
    }

    /// Quote for a key
    pub fn quote(&self, instrument: &Instrument, venue: &Venue) -> Option<&Quote> {
        self.quotes.get(&(instrument.clone(), venue.clone()))
    }

    /// Ask price for a key
    pub fn ask(&self, instrument: &Instrument, venue: &Venue) -> Option<f64> {
        self.quote(instrument, venue).map(|quote| quote.ask_price)
    }

    /// All quotes ordered by instrument then venue
    pub fn quotes(&self) -> Vec<&Quote> {
        let mut quotes: Vec<&Quote> = self.quotes.values().collect();
        quotes.sort_by(|a, b| {
            a.instrument
                .cmp(&b.instrument)
                .then_with(|| a.venue.cmp(&b.venue))
        });
        quotes
    }

    /// Number of quotes in the snapshot
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    /// Whether the snapshot holds no quote
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}
