//! Trade watermark: the highest trade id seen so far.
//!
//! The engine keeps no trade ledger. Everything older than the watermark is
//! forgotten; the next poll asks the exchange only for trades newer than it.

/// Highest trade id observed, if any.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TradeWatermark {
    most_recent: Option<u64>,
}

impl TradeWatermark {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(id: u64) -> Self {
        Self {
            most_recent: Some(id),
        }
    }

    /// The id to pass as `newer_than` on the next poll.
    pub fn most_recent(&self) -> Option<u64> {
        self.most_recent
    }

    /// Advance to the largest of `ids` if it is newer. Returns whether the
    /// watermark moved.
    pub fn observe<I: IntoIterator<Item = u64>>(&mut self, ids: I) -> bool {
        match (ids.into_iter().max(), self.most_recent) {
            (Some(max), Some(current)) if max <= current => false,
            (Some(max), _) => {
                self.most_recent = Some(max);
                true
            }
            (None, _) => false,
        }
    }
}
