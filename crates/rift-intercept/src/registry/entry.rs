//! Registered expectations.

use super::cursor::ResponseCursor;
use super::types::{Location, Method, RequestKey, Scheme};
use crate::response::Response;

/// How an entry recognizes requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Matches on method, path and query
    Http,
    /// Matches any payload sent to the destination
    Raw,
}

/// A registered expectation: where requests go, what they look like, and the
/// ordered responses handed out to them.
#[derive(Debug)]
pub struct Entry {
    kind: EntryKind,
    method: Method,
    location: Location,
    responses: Vec<Response>,
    cursor: ResponseCursor,
}

impl Entry {
    pub fn new(method: Method, location: Location, responses: Vec<Response>) -> Self {
        Self {
            kind: EntryKind::Http,
            method,
            location,
            responses,
            cursor: ResponseCursor::new(),
        }
    }

    pub fn raw(location: Location, responses: Vec<Response>) -> Self {
        Self {
            kind: EntryKind::Raw,
            method: Method::RAW,
            location,
            responses,
            cursor: ResponseCursor::new(),
        }
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn scheme(&self) -> Scheme {
        self.location.scheme
    }

    pub fn host(&self) -> &str {
        &self.location.host
    }

    pub fn port(&self) -> u16 {
        self.location.port
    }

    pub fn path(&self) -> &str {
        &self.location.path
    }

    /// Normalized query string
    pub fn query(&self) -> &str {
        &self.location.query
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn responses(&self) -> &[Response] {
        &self.responses
    }

    /// Whether this entry answers the request.
    pub fn matches(&self, key: &RequestKey) -> bool {
        match self.kind {
            EntryKind::Raw => true,
            EntryKind::Http => {
                self.method == key.method
                    && self.location.path == key.path
                    && self.location.query == key.query
            }
        }
    }

    /// Hand out the response at the cursor and advance it. Returns `None` for
    /// an entry registered without responses.
    pub fn next_response(&self) -> Option<Response> {
        if self.responses.is_empty() {
            return None;
        }
        let index = self.cursor.next(self.responses.len());
        self.responses.get(index).cloned()
    }

    /// Index the next call to [`Entry::next_response`] will use.
    pub fn peek_index(&self) -> usize {
        self.cursor.peek(self.responses.len())
    }

    pub fn reset_cursor(&self) {
        self.cursor.reset();
    }

    pub(crate) fn release_bodies(&self) {
        for response in &self.responses {
            response.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(method: Method, url: &str, responses: Vec<Response>) -> Entry {
        Entry::new(method, Location::parse(url).unwrap(), responses)
    }

    #[test]
    fn test_http_entry_matching() {
        let e = entry(Method::GET, "http://testme.org/get?a=1&b=2", vec![]);

        assert!(e.matches(&RequestKey::new("GET", "testme.org", 80, "/get", "b=2&a=1")));
        assert!(!e.matches(&RequestKey::new("POST", "testme.org", 80, "/get", "a=1&b=2")));
        assert!(!e.matches(&RequestKey::new("GET", "testme.org", 80, "/other", "a=1&b=2")));
        assert!(!e.matches(&RequestKey::new("GET", "testme.org", 80, "/get", "a=1")));
    }

    #[test]
    fn test_raw_entry_matches_anything() {
        let e = Entry::raw(Location::parse("tcp://redis.local:6379").unwrap(), vec![]);
        assert!(e.matches(&RequestKey::new(Method::RAW, "redis.local", 6379, "/", "")));
        assert!(e.matches(&RequestKey::new("GET", "redis.local", 6379, "/x", "y=1")));
    }

    #[test]
    fn test_last_response_sticks() {
        let e = entry(
            Method::GET,
            "http://testme.org/",
            vec![Response::with_status(404), Response::new()],
        );
        let statuses: Vec<u16> = (0..4)
            .map(|_| e.next_response().unwrap().status())
            .collect();
        assert_eq!(statuses, vec![404, 200, 200, 200]);
    }

    #[test]
    fn test_no_responses() {
        let e = entry(Method::GET, "http://testme.org/", vec![]);
        assert!(e.next_response().is_none());
    }
}
