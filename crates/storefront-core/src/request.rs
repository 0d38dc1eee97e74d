//! Request tokens for async state slots.
//!
//! Every slot that is filled by an async fetch (auth status, the category
//! list, the product page) owns a [`RequestTracker`]. Issuing a fetch hands
//! out a fresh [`RequestToken`]; when the response arrives the slot asks the
//! tracker whether that token is still the latest one and drops the response
//! otherwise. Superseded requests are never aborted, only ignored.

use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque, monotonically increasing tag for one issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Issues request tokens for a single state slot.
///
/// Uses an atomic counter so it can live behind a shared reference
/// (the auth session is driven through `&self`).
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: AtomicU64,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a new token, superseding every token issued before it.
    pub fn issue(&self) -> RequestToken {
        RequestToken(self.latest.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Returns true if `token` is the most recently issued one.
    pub fn is_latest(&self, token: RequestToken) -> bool {
        self.latest.load(Ordering::Acquire) == token.0
    }

    /// Returns the most recently issued token, if any.
    pub fn latest(&self) -> Option<RequestToken> {
        match self.latest.load(Ordering::Acquire) {
            0 => None,
            n => Some(RequestToken(n)),
        }
    }
}
