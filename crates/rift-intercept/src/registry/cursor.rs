//! Per-entry response cursor.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Lock-free cursor over an entry's responses.
///
/// Each call to [`ResponseCursor::next`] hands out the current index and
/// advances. Once the last response is reached the cursor sticks there, so the
/// final response repeats forever.
#[derive(Default)]
pub struct ResponseCursor(AtomicUsize);

fn advance(index: usize, response_count: usize) -> usize {
    (index + 1).min(response_count.saturating_sub(1))
}

impl ResponseCursor {
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicUsize::new(0))
    }

    /// Index of the response to serve now; advances for the next call.
    #[must_use]
    pub fn next(&self, response_count: usize) -> usize {
        if response_count == 0 {
            return 0;
        }
        let old = self
            .0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |idx| {
                let idx = idx.min(response_count - 1);
                Some(advance(idx, response_count))
            })
            .unwrap_or_else(|e| {
                debug_assert!(false, "we never return None from fetch_update");
                e
            });
        old.min(response_count - 1)
    }

    #[must_use]
    pub fn peek(&self, response_count: usize) -> usize {
        self.0
            .load(Ordering::Acquire)
            .min(response_count.saturating_sub(1))
    }

    pub fn reset(&self) {
        self.0.store(0, Ordering::Release);
    }
}

impl fmt::Debug for ResponseCursor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ResponseCursor")
            .field("index", &self.0.load(Ordering::Relaxed))
            .finish()
    }
}
