//! Request coordination: wires an inbound message through classification,
//! the dedup cache, and the fetch orchestrator, and hands artifacts to the
//! transport-side sink.
//!
//! State machine per request:
//! `Received → {Rejected | CacheHit | Fetching} → {Delivered | Failed}`.
//! Rejections are silent; every fetch failure surfaces as one generic
//! message with no cache or counter mutation.

pub mod coordinator;
pub mod request;
pub mod sink;

pub use {
    coordinator::{Outcome, Pipeline, RejectReason},
    request::{Command, DownloadRequest, InboundMessage, Origin},
    sink::MediaSink,
};

/// The one user-visible failure text. Extraction errors, missing output,
/// and timeouts all collapse into this; the distinction lives in logs only.
pub const FETCH_FAILED_MSG: &str = "Error downloading";
