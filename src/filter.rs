//! Item quality filter and per-feed de-duplication.
//!
//! [`ContentFilter`] is pure: it decides validity from an item alone and never
//! fails on missing data.  [`SeenIds`] is the stateful half, one per feed, and
//! [`ContentFilter::screen`] combines both into the numbers the circuit
//! breaker needs.

use std::collections::HashSet;

use regex::{RegexSet, RegexSetBuilder};

use crate::source::FeedItem;

/// Drops dead items (no engagement at all) and items from denylisted authors.
#[derive(Debug, Clone)]
pub struct ContentFilter {
    denylist: RegexSet,
}

impl ContentFilter {
    /// Compile `patterns` into a case-insensitive denylist.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, regex::Error> {
        let denylist = RegexSetBuilder::new(patterns.iter().map(|p| p.as_ref()))
            .case_insensitive(true)
            .build()?;
        Ok(Self { denylist })
    }

    /// A filter with an empty denylist; only the engagement rule applies.
    pub fn without_denylist() -> Self {
        Self {
            denylist: RegexSet::empty(),
        }
    }

    pub fn is_denylisted(&self, author: &str) -> bool {
        self.denylist.is_match(author)
    }

    pub fn is_valid(&self, item: &FeedItem) -> bool {
        if item.engagement.is_dead() {
            return false;
        }
        match item.author.as_deref() {
            Some(author) => !self.is_denylisted(author),
            None => true,
        }
    }

    /// The valid subset of `items`, in original order.
    pub fn filter(&self, items: &[FeedItem]) -> Vec<FeedItem> {
        items.iter().filter(|i| self.is_valid(i)).cloned().collect()
    }

    /// Dedupe against `seen`, then filter.  Valid items are recorded in `seen`.
    ///
    /// Duplicates count as neither raw nor valid: re-delivering something
    /// already shown says nothing about whether the source is drying up.
    pub fn screen(&self, items: Vec<FeedItem>, seen: &mut SeenIds) -> ScreenedPage {
        let mut out = ScreenedPage::default();
        for item in items {
            if seen.contains(&item.id) {
                out.duplicates += 1;
                continue;
            }
            out.raw_count += 1;
            if self.is_valid(&item) {
                seen.insert(&item.id);
                out.items.push(item);
            }
        }
        out
    }
}

/// Result of [`ContentFilter::screen`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScreenedPage {
    pub items: Vec<FeedItem>,
    /// Items on the page that were not duplicates.
    pub raw_count: usize,
    pub duplicates: usize,
}

impl ScreenedPage {
    pub fn valid_count(&self) -> usize {
        self.items.len()
    }
}

/// Ids already appended to one feed.
#[derive(Debug, Clone, Default)]
pub struct SeenIds(HashSet<String>);

impl SeenIds {
    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    pub fn insert(&mut self, id: &str) -> bool {
        self.0.insert(id.to_string())
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
