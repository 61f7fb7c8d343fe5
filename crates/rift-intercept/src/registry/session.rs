//! Session: the registry of entries and the capture log for one mocking scope.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use super::entry::{Entry, EntryKind};
use super::types::{CapturedRequest, Location, Method, Scheme};
use crate::clock::{Clock, SystemClock};
use crate::codec::Protocol;
use crate::config::InterceptConfig;
use crate::error::{InterceptError, Result};
use crate::headers::Headers;
use crate::response::{Body, Response, ResponseBuilder, Synthesis};

type Destination = (String, u16);

#[derive(Default)]
struct SessionState {
    /// Entries by destination, in registration order
    entries: HashMap<Destination, Vec<Arc<Entry>>>,
    /// Captured requests in arrival order
    requests: Vec<CapturedRequest>,
}

/// Registry of expectations and observed requests for one mocking scope.
///
/// A test harness owns one session (usually behind an `Arc`) and passes it to
/// the interceptor. All state lives behind a single lock, so every
/// registration, capture and reset is observed either fully or not at all.
pub struct Session {
    state: RwLock<SessionState>,
    active: AtomicBool,
    config: InterceptConfig,
    clock: Arc<dyn Clock>,
}

impl Session {
    pub fn new() -> Self {
        Self::with_config(InterceptConfig::default())
    }

    pub fn with_config(config: InterceptConfig) -> Self {
        Self {
            state: RwLock::new(SessionState::default()),
            active: AtomicBool::new(false),
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source used for response dates and capture timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &InterceptConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Response builder wired to this session's clock and configuration.
    pub fn response(&self) -> ResponseBuilder {
        Response::builder()
            .clock(Arc::clone(&self.clock))
            .synthesis(Synthesis::from(&self.config))
    }

    // ===== Registration =====

    /// Register an entry answering `method url` with `responses` in order.
    /// With no responses the entry answers with an empty `200`.
    pub fn register<I>(&self, method: impl Into<Method>, url: &str, responses: I) -> Result<()>
    where
        I: IntoIterator<Item = Response>,
    {
        let method = method.into();
        let location = Location::parse(url)?;
        if location.scheme == Scheme::Tcp {
            return Err(InterceptError::parse(
                url,
                "tcp destinations take raw entries, use register_raw",
            ));
        }
        let responses = self.adopt(responses);
        debug!(
            "Registering {} {}://{}:{}{} ({} responses)",
            method,
            location.scheme,
            location.host,
            location.port,
            location.path,
            responses.len()
        );
        self.push(Entry::new(method, location, responses));
        Ok(())
    }

    /// Register exactly one entry with exactly one response.
    pub fn single_register(
        &self,
        method: impl Into<Method>,
        url: &str,
        body: Option<Body>,
        headers: Option<Headers>,
        status: u16,
    ) -> Result<()> {
        let mut builder = self.response().status(status);
        if let Some(body) = body {
            builder = builder.body(body);
        }
        if let Some(headers) = headers {
            builder = builder.merge_headers(headers.iter());
        }
        self.register(method, url, [builder.build()])
    }

    /// Register an opaque-payload entry. Every payload sent to the destination
    /// is answered with the response bodies in order.
    pub fn register_raw<I>(&self, url: &str, responses: I) -> Result<()>
    where
        I: IntoIterator<Item = Response>,
    {
        let location = Location::parse(url)?;
        let responses = self.adopt(responses);
        debug!(
            "Registering raw entry for {}:{} ({} responses)",
            location.host,
            location.port,
            responses.len()
        );
        self.push(Entry::raw(location, responses));
        Ok(())
    }

    fn adopt<I>(&self, responses: I) -> Vec<Response>
    where
        I: IntoIterator<Item = Response>,
    {
        responses
            .into_iter()
            .map(|mut r| {
                r.apply_config(&self.config);
                r
            })
            .collect()
    }

    fn push(&self, entry: Entry) {
        let destination = entry.location().destination();
        let mut state = self.state.write();
        state
            .entries
            .entry(destination)
            .or_default()
            .push(Arc::new(entry));
    }

    /// Entries registered for a destination, in registration order.
    pub fn entries(&self, host: &str, port: u16) -> Vec<Arc<Entry>> {
        let state = self.state.read();
        state
            .entries
            .get(&(host.to_ascii_lowercase(), port))
            .cloned()
            .unwrap_or_default()
    }

    /// Total number of registered entries.
    pub fn entry_count(&self) -> usize {
        self.state.read().entries.values().map(Vec::len).sum()
    }

    /// Protocol spoken at a destination: raw only when every entry there is raw.
    pub fn destination_protocol(&self, host: &str, port: u16) -> Protocol {
        let state = self.state.read();
        match state.entries.get(&(host.to_ascii_lowercase(), port)) {
            Some(entries)
                if !entries.is_empty() && entries.iter().all(|e| e.kind() == EntryKind::Raw) =>
            {
                Protocol::Raw
            }
            _ => Protocol::Http,
        }
    }

    pub(crate) fn with_entries<T>(
        &self,
        host: &str,
        port: u16,
        f: impl FnOnce(&[Arc<Entry>]) -> T,
    ) -> T {
        let state = self.state.read();
        let entries = state
            .entries
            .get(&(host.to_ascii_lowercase(), port))
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        f(entries)
    }

    // ===== Capture log =====

    /// Append a request to the capture log (no-op when recording is disabled).
    pub fn record_request(&self, request: CapturedRequest) {
        if !self.config.record_requests {
            return;
        }
        debug!(
            "Captured {} {}:{}{} ({} body bytes)",
            request.method,
            request.host,
            request.port,
            request.path,
            request.body.len()
        );
        self.state.write().requests.push(request);
    }

    pub fn last_request(&self) -> Option<CapturedRequest> {
        self.state.read().requests.last().cloned()
    }

    /// All captured requests in arrival order.
    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.state.read().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.read().requests.len()
    }

    // ===== Lifecycle =====

    /// Clear all entries and captured requests, releasing unread body sources.
    /// Safe to call on an empty session.
    pub fn reset(&self) {
        let mut state = self.state.write();
        let entry_count: usize = state.entries.values().map(Vec::len).sum();
        for entry in state.entries.values().flatten() {
            entry.release_bodies();
        }
        state.entries.clear();
        let request_count = state.requests.len();
        state.requests.clear();
        if entry_count > 0 || request_count > 0 {
            info!(
                "Session reset ({} entries, {} captured requests cleared)",
                entry_count, request_count
            );
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn activate(&self) {
        self.active.store(true, Ordering::SeqCst);
    }

    pub fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("Session")
            .field("destinations", &state.entries.len())
            .field("requests", &state.requests.len())
            .field("active", &self.is_active())
            .field("config", &self.config)
            .finish()
    }
}
