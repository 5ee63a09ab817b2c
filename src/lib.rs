//! Gateway and client for the e-filing / video archiving integration.
//!
//! Every cross-system request passes an API key check and a per-key
//! fixed-window rate limit before reaching a handler. The same crate holds
//! the outbound client each system uses to call the other, and the
//! verification contract that confirms a foreign work request id exists
//! before anything links to it.

pub mod auth;
pub mod client;
pub mod config;
pub mod gateway;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod peer_health;
pub mod rate_limit;
pub mod records;
pub mod server;
pub mod state;
pub mod verification;

pub use client::{Envelope, PeerClient};
pub use gateway::{Gateway, GatewayError};
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use records::{DirectoryLookup, InMemoryRecords, WorkRequestLookup};
pub use verification::VerificationResult;
