//! Core types and trait definitions for Vigil.
//!
//! Vigil extracts symptoms and vitals from free-text messages, files them
//! under a subject and calendar day, and feeds a bounded window of that
//! history back to the response generator.
//!
//! This crate is deliberately free of HTTP and database dependencies. Storage
//! backends implement [`store::FactStore`]; language-model clients implement
//! [`collab::Extractor`] and [`collab::Responder`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod assistant;
pub mod clock;
pub mod collab;
pub mod engine;
pub mod error;
pub mod extraction;
pub mod lock;
pub mod memory;
pub mod record;
pub mod store;
pub mod subject;
pub mod window;

pub use error::{Error, Result};

#[cfg(test)]
mod tests;
