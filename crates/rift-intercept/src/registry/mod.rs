//! Entry registry, matcher and capture log.
//!
//! This module provides:
//! - `Session`: registry of entries per destination plus the captured-request log
//! - `Entry`: a registered expectation with its ordered responses and cursor
//! - `RequestKey` / `CapturedRequest`: what the matcher sees and what tests inspect
//!
//! ## Module Structure
//!
//! - `types`: Method, Scheme, Location, RequestKey, CapturedRequest
//! - `query`: order-independent query normalization
//! - `cursor`: sticky per-entry response cursor
//! - `entry`: Entry and its matching rule
//! - `matcher`: request resolution
//! - `session`: Session lifecycle, registration and capture

mod cursor;
mod entry;
mod matcher;
mod query;
mod session;
mod types;


pub use cursor::ResponseCursor;
pub use entry::{Entry, EntryKind};
pub use matcher::find_entry;
pub use query::{normalize_query, query_pairs};
pub use session::Session;
pub use types::{CapturedRequest, Location, Method, RequestKey, Scheme};
