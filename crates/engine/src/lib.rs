//! Media delivery engine.
//!
//! Resolves an asset to the cheapest transmittable source (override id,
//! cached file id, remote URL, local bytes), sends it through a [`Transport`]
//! with bounded retries and a text fallback, remembers issued file ids in a
//! durable [`IdentifierCache`], and arms at-most-once delayed follow-ups.

pub mod cache;
pub mod deliver;
pub mod engine;
pub mod error;
pub mod followup;
pub mod resolve;
pub mod retry;
pub mod timer;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

pub use {
    cache::IdentifierCache,
    deliver::{DeliveryExecutor, Outcome},
    engine::Engine,
    error::{Error, Result},
    followup::{FollowupScheduler, FollowupTask},
    resolve::{Candidate, Resolver, Tier},
    retry::{Classify, RetryClass, RetryPolicy},
    timer::{Timer, TokioTimer},
    transport::{MediaSource, Transport, TransportError},
};
