//! Resolution of outbound requests to registered entries.

use std::sync::Arc;
use tracing::{debug, warn};

use super::entry::Entry;
use super::session::Session;
use super::types::RequestKey;
use crate::error::{InterceptError, Result};
use crate::response::Response;

/// First entry, in registration order, that answers the request.
pub fn find_entry<'a>(entries: &'a [Arc<Entry>], key: &RequestKey) -> Option<&'a Arc<Entry>> {
    entries.iter().find(|entry| entry.matches(key))
}

impl Session {
    /// Resolve a request to a response, advancing the matching entry's cursor.
    ///
    /// Fails with [`InterceptError::NoMatch`] when nothing at the destination
    /// answers the request.
    pub fn resolve(&self, key: &RequestKey) -> Result<Response> {
        let resolved = self.with_entries(&key.host, key.port, |entries| {
            find_entry(entries, key).map(|entry| {
                let index = entry.peek_index();
                let response = entry.next_response();
                (index, response)
            })
        });

        match resolved {
            Some((index, Some(response))) => {
                debug!(
                    "Matched {} {}:{}{} -> response #{} (status {})",
                    key.method,
                    key.host,
                    key.port,
                    key.path,
                    index,
                    response.status()
                );
                Ok(response)
            }
            Some((_, None)) => {
                debug!(
                    "Matched {} {}:{}{} -> entry without responses, default 200",
                    key.method, key.host, key.port, key.path
                );
                Ok(self.response().build())
            }
            None => {
                warn!(
                    "No entry for {} {}:{}{}?{}",
                    key.method, key.host, key.port, key.path, key.query
                );
                Err(InterceptError::NoMatch {
                    method: key.method.to_string(),
                    host: key.host.clone(),
                    port: key.port,
                    path: key.path.clone(),
                })
            }
        }
    }
}
