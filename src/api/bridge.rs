//! Request bridge between the transport and the control loop.
//!
//! Uses an `embassy-sync` bounded channel to hand routed requests to the
//! control loop, which answers each one through a per-request signal.  The
//! control loop drains the channel between ticks, so requests are serviced
//! in the same context that owns the service state.
//!
//! ```text
//! ┌──────────────┐   Exchange    ┌──────────────┐
//! │  HTTP task   │──────────────▶│ Control loop │
//! │  (blocking)  │◀──────────────│  (core 1)    │
//! └──────────────┘  Signal<resp> └──────────────┘
//! ```
//!
//! A full queue or a late answer is reported as `Busy` (503).  Each request
//! is either claimed by the control loop or abandoned by its submitter,
//! never both: a 503 always means the request was not applied, and once the
//! control loop has claimed a request the submitter waits for its answer.

use core::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use log::{debug, warn};

use crate::app::commands::RequestError;

use super::{ApiRequest, ApiResponse};

/// Queued requests before new ones are turned away.
pub const REQUEST_DEPTH: usize = 4;

/// How long the transport waits for an answer by default.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_millis(500);

/// Sleep between checks for an answer.
const POLL_INTERVAL: Duration = Duration::from_millis(2);

const PENDING: u8 = 0;
const CLAIMED: u8 = 1;
const ABANDONED: u8 = 2;

/// Reply slot plus the claim flag deciding who owns the outcome.
struct Ticket {
    state: AtomicU8,
    reply: Signal<CriticalSectionRawMutex, ApiResponse>,
}

impl Ticket {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(PENDING),
            reply: Signal::new(),
        }
    }

    /// Control loop side: take the request if nobody gave up on it.
    fn claim(&self) -> bool {
        self.transition(CLAIMED)
    }

    /// Submitter side: give up if the control loop has not claimed it.
    fn abandon(&self) -> bool {
        self.transition(ABANDONED)
    }

    fn transition(&self, to: u8) -> bool {
        self.state
            .compare_exchange(PENDING, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// One request in flight.
struct Exchange {
    request: ApiRequest,
    deadline: Instant,
    ticket: Arc<Ticket>,
}

/// Shared by the transport and the control loop.
pub struct RequestBridge {
    requests: Channel<CriticalSectionRawMutex, Exchange, REQUEST_DEPTH>,
}

impl RequestBridge {
    pub const fn new() -> Self {
        Self {
            requests: Channel::new(),
        }
    }

    /// Queue `request` and block until the control loop answers or
    /// `timeout` passes.  A request the control loop already claimed is
    /// waited out past `timeout`, so the answer matches what was applied.
    pub fn submit(&self, request: ApiRequest, timeout: Duration) -> ApiResponse {
        let ticket = Arc::new(Ticket::new());
        let deadline = Instant::now() + timeout;
        let path = request.path();

        let exchange = Exchange {
            request,
            deadline,
            ticket: Arc::clone(&ticket),
        };
        if self.requests.try_send(exchange).is_err() {
            warn!("{path}: request queue full");
            return RequestError::Busy.into();
        }

        loop {
            if let Some(response) = ticket.reply.try_take() {
                return response;
            }
            if Instant::now() >= deadline && ticket.abandon() {
                warn!("{path}: no answer within {} ms", timeout.as_millis());
                return RequestError::Busy.into();
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    /// Answer every queued request with `handler`.  Requests past their
    /// deadline or already abandoned by the submitter are dropped without
    /// running.  Returns how many were answered.
    pub fn serve_pending(&self, mut handler: impl FnMut(&ApiRequest) -> ApiResponse) -> usize {
        let mut served = 0;
        while let Ok(exchange) = self.requests.try_receive() {
            let ticket = &exchange.ticket;
            if Instant::now() >= exchange.deadline || !ticket.claim() {
                debug!("{}: dropped, submitter timed out", exchange.request.path());
                continue;
            }
            ticket.reply.signal(handler(&exchange.request));
            served += 1;
        }
        served
    }

    /// Requests waiting for the control loop.
    pub fn pending(&self) -> usize {
        self.requests.len()
    }
}

impl Default for RequestBridge {
    fn default() -> Self {
        Self::new()
    }
}
