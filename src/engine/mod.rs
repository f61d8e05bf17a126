//! Core engine: the per-account decision cycle and the round loop.
//!
//! - `policy`: picks and executes one action per profile snapshot
//! - `retry`: bounded retry with fixed backoff
//! - `orchestrator`: admission gate, launch jitter, rounds
//! - `worker`: production wiring of HTTP client and session engine

pub mod policy;
pub mod retry;
pub mod orchestrator;
pub mod worker;

pub use orchestrator::{AccountWorker, LaunchDelay, Orchestrator};
pub use policy::DecisionPolicy;
pub use retry::RetryPolicy;
pub use worker::FrenzyWorker;
