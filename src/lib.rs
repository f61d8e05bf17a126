//! ANGLER: concurrent multi-account Fishing Frenzy session runner
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod proxy;
pub mod api;
pub mod session;
pub mod engine;
pub mod storage;
