//! Blocking client for the shortdiary API.
//!
//! # Overview
//! `Client` authenticates with HTTP Basic auth, lists and fetches posts, and
//! hands out `Entry` values that save themselves back through the client.
//!
//! # Design
//! - Every operation is one synchronous request; nothing is cached.
//! - Requests and responses cross a `Transport` trait as plain data, so the
//!   status and error mapping in `Client` is tested without a network.
//! - `Entry` borrows its `Client`; it cannot outlive it.
//! - Post records are mapped field by field; unknown fields are ignored.

pub mod client;
pub mod config;
pub mod entry;
pub mod error;
pub mod http;

#[cfg(test)]
mod test_support;

pub use client::Client;
pub use config::{Config, API_ROOT};
pub use entry::Entry;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
