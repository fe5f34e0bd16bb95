//! Core types, business rules and trait definitions for Admit.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod activity;
pub mod applicant;
pub mod derive;
pub mod english;
pub mod error;
pub mod report;
pub mod review;
pub mod role;
pub mod scores;
pub mod store;
pub mod view;

pub use error::{Error, Result};
