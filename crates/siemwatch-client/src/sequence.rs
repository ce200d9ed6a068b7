//! Ordering of overlapping requests to the same view.
//!
//! Requests are never cancelled, so responses for one view can resolve out of
//! order. Each request takes a sequence number when it is issued and the view
//! decides on arrival whether the response may still be applied.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseOrdering {
    /// Drop a response older than the newest one already applied.
    #[default]
    LatestRequest,
    /// Apply every response as it resolves; the last to arrive wins even if
    /// it answers an older request.
    LastResolved,
}

/// Per-view sequence counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestSequence {
    issued: u64,
    applied: u64,
}

impl RequestSequence {
    /// Number for a new request.
    pub fn issue(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    /// Whether the response to request `seq` may be applied, recording it if so.
    pub fn accept(&mut self, seq: u64, ordering: ResponseOrdering) -> bool {
        match ordering {
            ResponseOrdering::LastResolved => {
                self.applied = self.applied.max(seq);
                true
            }
            ResponseOrdering::LatestRequest if seq > self.applied => {
                self.applied = seq;
                true
            }
            ResponseOrdering::LatestRequest => false,
        }
    }

    pub fn issued(&self) -> u64 {
        self.issued
    }

    pub fn applied(&self) -> u64 {
        self.applied
    }

    /// True while a request newer than the last applied one is outstanding.
    pub fn in_flight(&self) -> bool {
        self.issued > self.applied
    }
}
