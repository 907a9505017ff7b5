//! Quotes and the linkage policy between built objects and loader quotes.

use std::sync::atomic::{AtomicU64, Ordering};

/// A mutable market quote that may be shared between the loader and the
/// objects built from it.
#[derive(Debug, Default)]
pub struct SimpleQuote {
    bits: AtomicU64,
}

impl SimpleQuote {
    pub fn new(value: f64) -> Self {
        Self { bits: AtomicU64::new(value.to_bits()) }
    }

    pub fn value(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    pub fn set_value(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Release);
    }
}

/// Whether built objects keep a live link to loader quotes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QuoteLinkage {
    /// Objects see the quote value as of build time.
    #[default]
    Frozen,
    /// Objects share the loader's quote and observe later changes.
    Live,
}
